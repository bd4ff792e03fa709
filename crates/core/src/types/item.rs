//! The polymorphic item envelope used by the item store.
//!
//! Every record in the store shares one shape: an `id`, a `type`
//! discriminator and an open set of fields. [`Item`] keeps that shape
//! verbatim so nothing the store returns is lost on a round trip, and
//! [`Record`] layers typed views on top.

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::id::ItemId;
use super::price::Price;

/// Discriminator of an item store record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Course,
    Workshop,
    Product,
    Blog,
    Order,
    User,
    Cart,
    Newsletter,
    Slider,
    AccountConfig,
}

/// Unknown `type` value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown item type: {0}")]
pub struct ItemTypeError(pub String);

impl ItemType {
    /// Every item type the store holds.
    pub const ALL: [Self; 10] = [
        Self::Course,
        Self::Workshop,
        Self::Product,
        Self::Blog,
        Self::Order,
        Self::User,
        Self::Cart,
        Self::Newsletter,
        Self::Slider,
        Self::AccountConfig,
    ];

    /// Types that can be put in a cart and bought.
    pub const CATALOG: [Self; 3] = [Self::Course, Self::Workshop, Self::Product];

    /// Wire value of the `type` field.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Course => "course",
            Self::Workshop => "workshop",
            Self::Product => "product",
            Self::Blog => "blog",
            Self::Order => "order",
            Self::User => "user",
            Self::Cart => "cart",
            Self::Newsletter => "newsletter",
            Self::Slider => "slider",
            Self::AccountConfig => "accountconfig",
        }
    }

    /// Plural label for navigation and headings.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Course => "Courses",
            Self::Workshop => "Workshops",
            Self::Product => "Products",
            Self::Blog => "Blog posts",
            Self::Order => "Orders",
            Self::User => "Users",
            Self::Cart => "Cart lines",
            Self::Newsletter => "Newsletter subscribers",
            Self::Slider => "Home sliders",
            Self::AccountConfig => "Account settings",
        }
    }

    /// Whether items of this type are sold through the cart.
    #[must_use]
    pub const fn is_catalog(&self) -> bool {
        matches!(self, Self::Course | Self::Workshop | Self::Product)
    }

    /// Storefront path segment for catalog types (`/courses/...`).
    #[must_use]
    pub const fn path_segment(&self) -> Option<&'static str> {
        match self {
            Self::Course => Some("courses"),
            Self::Workshop => Some("workshops"),
            Self::Product => Some("products"),
            Self::Blog => Some("blog"),
            _ => None,
        }
    }

    /// Fields the admin editor offers for this type, in display order.
    ///
    /// Fields not listed here are preserved untouched when an item is saved.
    #[must_use]
    pub const fn admin_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Course => &[
                "title",
                "slug",
                "price",
                "duration",
                "level",
                "image",
                "summary",
                "description",
                "stock",
                "featured",
            ],
            Self::Workshop => &[
                "title",
                "slug",
                "price",
                "date",
                "time",
                "venue",
                "image",
                "summary",
                "description",
                "stock",
                "featured",
            ],
            Self::Product => &[
                "title",
                "slug",
                "price",
                "image",
                "summary",
                "description",
                "stock",
                "featured",
            ],
            Self::Blog => &[
                "title",
                "slug",
                "author",
                "image",
                "summary",
                "content",
                "publishedAt",
                "draft",
            ],
            Self::Order => &["status", "trackingNumber", "note"],
            Self::User => &["name", "email", "phone"],
            Self::Cart => &["userId", "productId", "quantity"],
            Self::Newsletter => &["email", "active"],
            Self::Slider => &["title", "subtitle", "image", "link", "position"],
            Self::AccountConfig => &[
                "studioName",
                "contactEmail",
                "contactPhone",
                "address",
                "instagram",
                "shippingFee",
            ],
        }
    }

    /// Fields edited with a multi-line textarea.
    #[must_use]
    pub fn is_long_field(field: &str) -> bool {
        matches!(field, "description" | "content" | "summary" | "address" | "note")
    }
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ItemType {
    type Err = ItemTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ItemTypeError(s.to_string()))
    }
}

/// A raw item store record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Store-wide unique id.
    pub id: ItemId,
    /// Discriminator.
    #[serde(rename = "type")]
    pub item_type: ItemType,
    /// Human-readable URL key, when the type has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    /// Every other field, untouched.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Item {
    /// Create an empty item of the given type.
    #[must_use]
    pub fn new(id: ItemId, item_type: ItemType) -> Self {
        Self {
            id,
            item_type,
            slug: None,
            fields: Map::new(),
        }
    }

    /// Read a field as text. Numbers and booleans are stringified.
    #[must_use]
    pub fn str_field(&self, name: &str) -> Option<String> {
        if name == "slug" {
            return self.slug.clone();
        }
        match self.fields.get(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            other => Some(other.to_string()),
        }
    }

    /// Read a field as a decimal amount.
    #[must_use]
    pub fn decimal_field(&self, name: &str) -> Option<Decimal> {
        self.fields
            .get(name)
            .and_then(|v| Price::parse_amount(v).ok())
    }

    /// Set a field. Setting `slug` updates the dedicated slot.
    pub fn set_field(&mut self, name: &str, value: Value) {
        if name == "slug" {
            self.slug = value.as_str().map(str::to_owned).filter(|s| !s.is_empty());
            return;
        }
        self.fields.insert(name.to_string(), value);
    }

    /// Title used in listings, falling back to the name, then the id.
    #[must_use]
    pub fn display_title(&self) -> String {
        self.str_field("title")
            .or_else(|| self.str_field("name"))
            .or_else(|| self.str_field("email"))
            .unwrap_or_else(|| self.id.to_string())
    }
}

/// Errors converting between [`Item`] and typed records.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The item carries a different `type` than the record expects.
    #[error("expected item of type {expected}, found {found}")]
    TypeMismatch {
        /// Type the record represents.
        expected: ItemType,
        /// Type found on the item.
        found: ItemType,
    },
    /// Field values did not match the record's shape.
    #[error("malformed {item_type} item {id}: {source}")]
    Malformed {
        /// Type of the offending item.
        item_type: ItemType,
        /// Id of the offending item.
        id: String,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

/// A typed view over items of one [`ItemType`].
///
/// Implementors are plain serde structs whose fields mirror the item's
/// flattened fields; `id`, `type` and `slug` are handled here.
///
/// [`Record::into_item`] writes only what the struct serializes. Records
/// that are read, changed and saved back keep a flattened `extra` map.
pub trait Record: Serialize + DeserializeOwned {
    /// Type discriminator this record maps to.
    const TYPE: ItemType;

    /// Id of the underlying item.
    fn id(&self) -> &ItemId;

    /// Convert a raw item into this record.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::TypeMismatch` when the item has another type and
    /// `RecordError::Malformed` when its fields do not deserialize.
    fn from_item(item: Item) -> Result<Self, RecordError> {
        if item.item_type != Self::TYPE {
            return Err(RecordError::TypeMismatch {
                expected: Self::TYPE,
                found: item.item_type,
            });
        }
        let id = item.id.to_string();
        serde_json::to_value(&item)
            .and_then(serde_json::from_value)
            .map_err(|source| RecordError::Malformed {
                item_type: Self::TYPE,
                id,
                source,
            })
    }

    /// Convert this record back into a raw item.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::Malformed` if the record does not serialize to
    /// a JSON object.
    fn into_item(self) -> Result<Item, RecordError> {
        let id = self.id().to_string();
        let malformed = |source| RecordError::Malformed {
            item_type: Self::TYPE,
            id: id.clone(),
            source,
        };
        let mut value = serde_json::to_value(&self).map_err(malformed)?;
        if let Value::Object(map) = &mut value {
            map.insert("type".to_string(), Value::String(Self::TYPE.as_str().into()));
        }
        serde_json::from_value(value).map_err(malformed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_item_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&ItemType::AccountConfig).unwrap(),
            "\"accountconfig\""
        );
        assert_eq!("workshop".parse::<ItemType>(), Ok(ItemType::Workshop));
        assert!("Workshop".parse::<ItemType>().is_err());
    }

    #[test]
    fn test_item_keeps_unknown_fields() {
        let raw = json!({
            "id": "p1",
            "type": "product",
            "slug": "raku-bowl",
            "title": "Raku bowl",
            "price": "1200",
            "legacyColour": "smoke"
        });
        let item: Item = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(item.slug.as_deref(), Some("raku-bowl"));
        assert_eq!(item.str_field("legacyColour").as_deref(), Some("smoke"));
        assert_eq!(item.decimal_field("price"), Some(Decimal::from(1200)));
        assert_eq!(serde_json::to_value(&item).unwrap(), raw);
    }

    #[test]
    fn test_set_field_slug_slot() {
        let mut item = Item::new(ItemId::new("b1"), ItemType::Blog);
        item.set_field("slug", json!("first-firing"));
        item.set_field("title", json!("First firing"));
        assert_eq!(item.slug.as_deref(), Some("first-firing"));
        assert!(!item.fields.contains_key("slug"));
        assert_eq!(item.display_title(), "First firing");

        item.set_field("slug", json!(""));
        assert_eq!(item.slug, None);
    }

    #[test]
    fn test_admin_fields_cover_catalog_essentials() {
        for t in ItemType::CATALOG {
            let fields = t.admin_fields();
            assert!(fields.contains(&"title"));
            assert!(fields.contains(&"price"));
            assert!(fields.contains(&"slug"));
        }
    }
}
