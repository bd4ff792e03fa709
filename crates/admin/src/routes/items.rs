//! Generic item editor.
//!
//! Every item type except orders is edited through one key-value form built
//! from [`ItemType::admin_fields`]. Fields the form does not show are kept
//! as they are, and the result must still read as the type's typed record
//! before it is saved.

use std::collections::HashMap;

use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde_json::Value;
use tracing::instrument;

use atelier_core::{
    AccountConfig, BlogPost, CartEntry, CatalogEntry, Customer, Item, ItemId, ItemType, Order,
    Record, Slide, Subscriber,
};

use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::routes::{MessageQuery, render};
use crate::state::AppState;

/// Checkbox fields.
const FLAG_FIELDS: &[&str] = &["featured", "draft", "active"];

/// One row of the item list.
#[derive(Debug, Clone)]
pub struct ItemRow {
    pub id: String,
    pub title: String,
    pub slug: Option<String>,
}

/// One input of the editor.
#[derive(Debug, Clone)]
pub struct FieldView {
    pub name: &'static str,
    pub value: String,
    pub input_type: &'static str,
    pub long: bool,
    pub flag: bool,
    pub checked: bool,
    pub image: bool,
}

#[derive(Template)]
#[template(path = "items/index.html")]
struct ItemsIndexTemplate {
    current_path: String,
    item_type: ItemType,
    rows: Vec<ItemRow>,
    message: Option<&'static str>,
}

#[derive(Template)]
#[template(path = "items/form.html")]
struct ItemFormTemplate {
    current_path: String,
    item_type: ItemType,
    id: Option<String>,
    fields: Vec<FieldView>,
    error: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/items/{item_type}", get(index).post(save))
        .route("/items/{item_type}/new", get(new_item))
        .route("/items/{item_type}/{id}/edit", get(edit))
        .route("/items/{item_type}/{id}/delete", post(delete))
}

/// GET /items/{type}
#[instrument(skip(state, _admin, query))]
async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(raw_type): Path<String>,
    Query(query): Query<MessageQuery>,
) -> Result<Html<String>, AppError> {
    let item_type = editable_type(&raw_type)?;

    let mut rows: Vec<ItemRow> = state
        .store()
        .items_by_type(item_type)
        .await?
        .into_iter()
        .map(|item| ItemRow {
            title: item.display_title(),
            slug: item.slug.clone(),
            id: item.id.into_inner(),
        })
        .collect();
    rows.sort_by_key(|row| row.title.to_lowercase());

    let message = match query.success.as_deref() {
        Some("saved") => Some("Saved."),
        Some("deleted") => Some("Deleted."),
        _ => None,
    };

    render(&ItemsIndexTemplate {
        current_path: format!("/items/{item_type}"),
        item_type,
        rows,
        message,
    })
}

/// GET /items/{type}/new
async fn new_item(
    RequireAdmin(_admin): RequireAdmin,
    Path(raw_type): Path<String>,
) -> Result<Html<String>, AppError> {
    let item_type = editable_type(&raw_type)?;
    let item = Item::new(ItemId::generate(), item_type);
    render(&form_template(&item, false, None))
}

/// GET /items/{type}/{id}/edit
#[instrument(skip(state, _admin))]
async fn edit(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path((raw_type, id)): Path<(String, String)>,
) -> Result<Html<String>, AppError> {
    let item_type = editable_type(&raw_type)?;
    let item = load(&state, item_type, &ItemId::new(id)).await?;
    render(&form_template(&item, true, None))
}

/// POST /items/{type}
///
/// Creates an item when the form has no `id`, updates it otherwise.
#[instrument(skip(state, _admin, form))]
async fn save(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(raw_type): Path<String>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let item_type = editable_type(&raw_type)?;
    let existing_id = form
        .get("id")
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .map(ItemId::new);

    let mut item = match &existing_id {
        Some(id) => load(&state, item_type, id).await?,
        None => {
            let mut item = Item::new(ItemId::generate(), item_type);
            item.set_field("createdAt", Value::String(Utc::now().to_rfc3339()));
            item
        }
    };
    apply_form(&mut item, &form);

    let mut problem = validate(&item).err();
    if problem.is_none()
        && let Some(slug) = &item.slug
        && let Some(other) = state.store().get_by_slug(slug).await?
        && other.id != item.id
    {
        problem = Some(format!("The slug \"{slug}\" is already used by another item."));
    }

    if let Some(error) = problem {
        let page = render(&form_template(&item, existing_id.is_some(), Some(error)))?;
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
    }

    state.store().save_item(&item).await?;
    tracing::info!(item_id = %item.id, item_type = %item_type, "Item saved");

    Ok(Redirect::to(&format!("/items/{item_type}?success=saved")).into_response())
}

/// POST /items/{type}/{id}/delete
#[instrument(skip(state, _admin))]
async fn delete(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path((raw_type, id)): Path<(String, String)>,
) -> Result<Redirect, AppError> {
    let item_type = editable_type(&raw_type)?;
    let item = load(&state, item_type, &ItemId::new(id)).await?;

    state.store().delete_item(&item.id).await?;
    tracing::info!(item_id = %item.id, item_type = %item_type, "Item deleted");

    Ok(Redirect::to(&format!("/items/{item_type}?success=deleted")))
}

/// Parse a type from the path. Orders have their own pages.
fn editable_type(raw: &str) -> Result<ItemType, AppError> {
    raw.parse::<ItemType>()
        .ok()
        .filter(|t| *t != ItemType::Order)
        .ok_or_else(|| AppError::NotFound(format!("item type {raw}")))
}

/// Fetch an item, treating one of another type as missing.
async fn load(state: &AppState, item_type: ItemType, id: &ItemId) -> Result<Item, AppError> {
    state
        .store()
        .get_item(id)
        .await?
        .filter(|item| item.item_type == item_type)
        .ok_or_else(|| AppError::NotFound(format!("{item_type} {id}")))
}

fn is_flag_field(field: &str) -> bool {
    FLAG_FIELDS.contains(&field)
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "on" | "yes" | "1"
    )
}

fn input_type(field: &str) -> &'static str {
    match field {
        "publishedAt" | "date" => "date",
        "time" => "time",
        "stock" | "quantity" | "position" => "number",
        "email" | "contactEmail" => "email",
        _ => "text",
    }
}

/// Copy the editor's fields onto the item.
///
/// Unchecked checkboxes are absent from the form and stored as `false`.
fn apply_form(item: &mut Item, form: &HashMap<String, String>) {
    for &field in item.item_type.admin_fields() {
        if is_flag_field(field) {
            let checked = form.get(field).is_some_and(|v| is_truthy(v));
            item.set_field(field, Value::Bool(checked));
            continue;
        }
        let Some(raw) = form.get(field) else {
            continue;
        };
        let value = if field == "email" {
            raw.trim().to_lowercase()
        } else {
            raw.trim().to_string()
        };
        item.set_field(field, Value::String(value));
    }
}

/// Check that the item still reads as its typed record.
fn validate(item: &Item) -> Result<(), String> {
    if item.item_type.admin_fields().contains(&"title")
        && item.str_field("title").is_none_or(|t| t.trim().is_empty())
    {
        return Err("Title is required.".to_string());
    }

    let item = item.clone();
    let result = match item.item_type {
        ItemType::Course | ItemType::Workshop | ItemType::Product => {
            CatalogEntry::from_item(item).map(drop)
        }
        ItemType::Blog => BlogPost::from_item(item).map(drop),
        ItemType::User => Customer::from_item(item).map(drop),
        ItemType::Cart => CartEntry::from_item(item).map(drop),
        ItemType::Newsletter => Subscriber::from_item(item).map(drop),
        ItemType::Slider => Slide::from_item(item).map(drop),
        ItemType::AccountConfig => AccountConfig::from_item(item).map(drop),
        ItemType::Order => Order::from_item(item).map(drop),
    };
    result.map_err(|e| e.to_string())
}

fn fields_for(item: &Item) -> Vec<FieldView> {
    item.item_type
        .admin_fields()
        .iter()
        .map(|&name| {
            let value = item.str_field(name).unwrap_or_default();
            let flag = is_flag_field(name);
            FieldView {
                name,
                checked: flag && is_truthy(&value),
                value,
                input_type: input_type(name),
                long: ItemType::is_long_field(name),
                flag,
                image: name == "image",
            }
        })
        .collect()
}

fn form_template(item: &Item, existing: bool, error: Option<String>) -> ItemFormTemplate {
    ItemFormTemplate {
        current_path: format!("/items/{}", item.item_type),
        item_type: item.item_type,
        id: existing.then(|| item.id.to_string()),
        fields: fields_for(item),
        error,
    }
}
