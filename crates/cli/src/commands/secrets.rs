//! Secret lookups against the item store.

use std::io::{self, Write};

use atelier_core::store::ItemStoreClient;

use super::CliError;

/// Print `key=value` for each requested secret, masked unless `reveal`.
///
/// Keys the store does not know are printed as `key=<missing>`.
///
/// # Errors
///
/// Returns error if the store request fails.
pub async fn get(store: &ItemStoreClient, keys: &[String], reveal: bool) -> Result<(), CliError> {
    let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
    let secrets = store.get_secrets(&refs).await?;

    let mut out = io::stdout().lock();
    for key in keys {
        let shown = match secrets.get(key) {
            Some(value) if reveal => value.clone(),
            Some(value) => mask(value),
            None => "<missing>".to_string(),
        };
        writeln!(out, "{key}={shown}")?;
    }
    Ok(())
}

/// Keep the last four characters of long values, hide the rest.
fn mask(value: &str) -> String {
    let count = value.chars().count();
    if count <= 8 {
        return "*".repeat(count);
    }
    let tail: String = value.chars().skip(count - 4).collect();
    format!("{}{tail}", "*".repeat(count - 4))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask() {
        assert_eq!(mask(""), "");
        assert_eq!(mask("short"), "*****");
        assert_eq!(mask("AKIAEXAMPLE1234"), "***********1234");
    }
}
