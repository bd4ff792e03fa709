//! Console setup helpers.
//!
//! # Usage
//!
//! ```bash
//! # Hash a password and put the result in ADMIN_PASSWORD_HASH
//! printf '%s' 'a long passphrase' | atelier-cli admin hash-password
//! ```

use std::io::{self, BufRead, Write};

use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};

use super::CliError;

/// Shortest console password accepted.
const MIN_PASSWORD_CHARS: usize = 12;

/// Read a password from the first line of stdin and print its Argon2 hash.
///
/// # Errors
///
/// Returns error if stdin cannot be read or the password is too short.
pub fn hash_password_from_stdin() -> Result<(), CliError> {
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;

    let hash = hash_password(line.trim_end_matches(['\r', '\n']))?;
    writeln!(io::stdout().lock(), "{hash}")?;
    tracing::info!("Set ADMIN_PASSWORD_HASH to the printed value");
    Ok(())
}

/// Hash a password with default Argon2 settings and a random salt.
fn hash_password(password: &str) -> Result<String, CliError> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(CliError::Password(format!(
            "password must be at least {MIN_PASSWORD_CHARS} characters"
        )));
    }

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CliError::Password(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use argon2::{PasswordHash, PasswordVerifier};

    #[test]
    fn test_hash_password_verifies() {
        let hash = hash_password("kiln-opens-at-dawn").unwrap();
        assert!(hash.starts_with("$argon2id$"));

        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(
            Argon2::default()
                .verify_password(b"kiln-opens-at-dawn", &parsed)
                .is_ok()
        );
    }

    #[test]
    fn test_short_password_rejected() {
        assert!(matches!(
            hash_password("clay"),
            Err(CliError::Password(_))
        ));
    }
}
