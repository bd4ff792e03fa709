//! Raw item commands.
//!
//! Output goes to stdout so it can be piped; progress goes to the log.

use std::io::{self, Write};
use std::path::Path;

use atelier_core::store::ItemStoreClient;
use atelier_core::{Item, ItemId, ItemType};

use super::CliError;

/// Print one line per item: id, slug and title.
///
/// # Errors
///
/// Returns error if the type is unknown or the store request fails.
pub async fn list(store: &ItemStoreClient, item_type: &str) -> Result<(), CliError> {
    let item_type: ItemType = item_type.parse()?;
    let mut items = store.items_by_type(item_type).await?;
    items.sort_by_key(Item::display_title);

    write_rows(&mut io::stdout().lock(), &items)?;
    tracing::info!(count = items.len(), item_type = %item_type, "Listed items");
    Ok(())
}

/// Print one item as pretty JSON.
///
/// # Errors
///
/// Returns error if the item does not exist or the store request fails.
pub async fn get(store: &ItemStoreClient, id: &str) -> Result<(), CliError> {
    let item = store
        .get_item(&ItemId::new(id))
        .await?
        .ok_or_else(|| CliError::NotFound(id.to_string()))?;

    let mut out = io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, &item)?;
    writeln!(out)?;
    Ok(())
}

/// Delete one item after confirmation.
///
/// # Errors
///
/// Returns error without `--yes`, if the item does not exist, or if the
/// store rejects the delete.
pub async fn delete(store: &ItemStoreClient, id: &str, confirmed: bool) -> Result<(), CliError> {
    if !confirmed {
        return Err(CliError::NotConfirmed("delete"));
    }

    let id = ItemId::new(id);
    let item = store
        .get_item(&id)
        .await?
        .ok_or_else(|| CliError::NotFound(id.to_string()))?;

    store.delete_item(&id).await?;
    tracing::info!(id = %id, item_type = %item.item_type, title = %item.display_title(), "Item deleted");
    Ok(())
}

/// Write items of one type, or of every type, as a JSON array.
///
/// # Errors
///
/// Returns error if the type is unknown, a store request fails, or the
/// output cannot be written.
pub async fn export(
    store: &ItemStoreClient,
    item_type: Option<&str>,
    out: Option<&Path>,
) -> Result<(), CliError> {
    let types = match item_type {
        Some(raw) => vec![raw.parse::<ItemType>()?],
        None => ItemType::ALL.to_vec(),
    };

    let mut items = Vec::new();
    for item_type in types {
        items.extend(store.items_by_type(item_type).await?);
    }

    let json = serde_json::to_string_pretty(&items)?;
    match out {
        Some(path) => tokio::fs::write(path, json).await?,
        None => writeln!(io::stdout().lock(), "{json}")?,
    }

    tracing::info!(count = items.len(), "Exported items");
    Ok(())
}

/// Save every item in a JSON array file.
///
/// Items are written one at a time; the first failure stops the import.
///
/// # Errors
///
/// Returns error if the file cannot be read or parsed, or a save fails.
pub async fn import(store: &ItemStoreClient, file: &Path) -> Result<(), CliError> {
    let content = tokio::fs::read_to_string(file).await?;
    let items = parse_export(&content)?;
    tracing::info!(count = items.len(), path = %file.display(), "Importing items");

    for item in &items {
        store.save_item(item).await?;
        tracing::debug!(id = %item.id, "Item saved");
    }

    tracing::info!(count = items.len(), "Import finished");
    Ok(())
}

/// Parse an export file.
fn parse_export(content: &str) -> Result<Vec<Item>, CliError> {
    Ok(serde_json::from_str(content)?)
}

/// Tab-separated rows: id, slug (or `-`), title.
fn write_rows(out: &mut impl Write, items: &[Item]) -> io::Result<()> {
    for item in items {
        writeln!(
            out,
            "{}\t{}\t{}",
            item.id,
            item.slug.as_deref().unwrap_or("-"),
            item.display_title()
        )?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_write_rows() {
        let items = parse_export(
            r#"[
                {"id": "w1", "type": "workshop", "slug": "raku-firing", "title": "Raku firing"},
                {"id": "s1", "type": "newsletter", "email": "meera@example.in"}
            ]"#,
        )
        .unwrap();

        let mut out = Vec::new();
        write_rows(&mut out, &items).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "w1\traku-firing\tRaku firing\ns1\t-\tmeera@example.in\n"
        );
    }

    #[test]
    fn test_parse_export_rejects_non_array() {
        assert!(matches!(
            parse_export(r#"{"id": "w1", "type": "workshop"}"#),
            Err(CliError::Json(_))
        ));
    }
}
