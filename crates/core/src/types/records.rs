//! Typed records stored in the item store.
//!
//! Field names follow the store's camelCase convention. Values written by the
//! admin console arrive as form strings (`"12"`, `"on"`), so numeric and
//! boolean fields deserialize leniently.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::email::Email;
use super::id::{ItemId, ProductId, UserId};
use super::item::{Item, ItemType, Record, RecordError};
use super::price::Price;
use super::status::OrderStatus;

/// A course, workshop or product listed in the storefront.
///
/// The three catalog types share one shape; workshop-only and course-only
/// fields are optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: ItemId,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub price: Decimal,
    #[serde(default, deserialize_with = "lenient::text")]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub image: Option<String>,
    /// Remaining seats or units; `None` means unlimited.
    #[serde(default, deserialize_with = "lenient::count")]
    pub stock: Option<u32>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub featured: bool,
    #[serde(default, deserialize_with = "lenient::text")]
    pub duration: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub level: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub time: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub venue: Option<String>,
}

impl CatalogEntry {
    /// Read a catalog entry from any of the three catalog item types.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::TypeMismatch` for non-catalog items.
    pub fn from_item(item: Item) -> Result<Self, RecordError> {
        if !item.item_type.is_catalog() {
            return Err(RecordError::TypeMismatch {
                expected: ItemType::Product,
                found: item.item_type,
            });
        }
        let (item_type, id) = (item.item_type, item.id.to_string());
        serde_json::to_value(&item)
            .and_then(serde_json::from_value)
            .map_err(|source| RecordError::Malformed {
                item_type,
                id,
                source,
            })
    }

    /// Price as a currency value.
    #[must_use]
    pub const fn unit_price(&self) -> Price {
        Price::inr(self.price)
    }

    /// URL key: the slug when set, otherwise the id.
    #[must_use]
    pub fn url_key(&self) -> &str {
        self.slug.as_deref().unwrap_or_else(|| self.id.as_str())
    }

    /// Whether at least `quantity` units can still be sold.
    #[must_use]
    pub fn has_stock_for(&self, quantity: u32) -> bool {
        self.stock.is_none_or(|stock| stock >= quantity)
    }

    /// Product id used for cart lines.
    #[must_use]
    pub fn product_id(&self) -> ProductId {
        ProductId::new(self.id.as_str())
    }
}

/// A blog post. `content` is trusted HTML authored in the admin console.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: ItemId,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub author: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub summary: Option<String>,
    #[serde(default)]
    pub content: String,
    /// Publication date as entered (`YYYY-MM-DD`).
    #[serde(default, deserialize_with = "lenient::text")]
    pub published_at: Option<String>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub draft: bool,
}

impl Record for BlogPost {
    const TYPE: ItemType = ItemType::Blog;

    fn id(&self) -> &ItemId {
        &self.id
    }
}

impl BlogPost {
    /// URL key: the slug when set, otherwise the id.
    #[must_use]
    pub fn url_key(&self) -> &str {
        self.slug.as_deref().unwrap_or_else(|| self.id.as_str())
    }
}

/// One purchased line on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub item_type: ItemType,
    pub title: String,
    #[serde(deserialize_with = "lenient::decimal")]
    pub unit_price: Decimal,
    #[serde(deserialize_with = "lenient::quantity")]
    pub quantity: u32,
}

impl OrderLine {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        Price::inr(self.unit_price).times(self.quantity)
    }
}

/// Where physical products ship to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    "India".to_string()
}

/// A paid (or historically pending) order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: ItemId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub customer_name: String,
    pub email: Email,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<ShippingAddress>,
    pub lines: Vec<OrderLine>,
    #[serde(deserialize_with = "lenient::decimal")]
    pub subtotal: Decimal,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub shipping_fee: Decimal,
    #[serde(deserialize_with = "lenient::decimal")]
    pub total: Decimal,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub razorpay_order_id: Option<String>,
    #[serde(default)]
    pub razorpay_payment_id: Option<String>,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Record for Order {
    const TYPE: ItemType = ItemType::Order;

    fn id(&self) -> &ItemId {
        &self.id
    }
}

impl Order {
    /// Total as a currency value.
    #[must_use]
    pub const fn total_price(&self) -> Price {
        Price::inr(self.total)
    }

    /// Shipping fee as a currency value.
    #[must_use]
    pub const fn shipping_price(&self) -> Price {
        Price::inr(self.shipping_fee)
    }

    /// Subtotal as a currency value.
    #[must_use]
    pub const fn subtotal_price(&self) -> Price {
        Price::inr(self.subtotal)
    }

    /// Number of units across all lines.
    #[must_use]
    pub fn unit_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

/// A storefront customer account (`user` items).
///
/// Accounts created at guest checkout have no password until the customer
/// registers with the same email.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: ItemId,
    #[serde(default)]
    pub name: String,
    pub email: Email,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Store fields not named above, written back untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record for Customer {
    const TYPE: ItemType = ItemType::User;

    fn id(&self) -> &ItemId {
        &self.id
    }
}

impl Customer {
    /// Typed user id.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        UserId::new(self.id.as_str())
    }
}

/// One line of a logged-in user's server-side cart (`cart` items).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartEntry {
    pub id: ItemId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub item_type: ItemType,
    pub title: String,
    #[serde(deserialize_with = "lenient::decimal")]
    pub unit_price: Decimal,
    #[serde(deserialize_with = "lenient::quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub image: Option<String>,
}

impl Record for CartEntry {
    const TYPE: ItemType = ItemType::Cart;

    fn id(&self) -> &ItemId {
        &self.id
    }
}

/// A newsletter subscriber (`newsletter` items).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    pub id: ItemId,
    pub email: Email,
    #[serde(default = "default_true", deserialize_with = "lenient::flag")]
    pub active: bool,
    #[serde(default)]
    pub subscribed_at: Option<DateTime<Utc>>,
    /// Store fields not named above, written back untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

const fn default_true() -> bool {
    true
}

impl Record for Subscriber {
    const TYPE: ItemType = ItemType::Newsletter;

    fn id(&self) -> &ItemId {
        &self.id
    }
}

/// A home page hero slide.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    pub id: ItemId,
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub image: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub link: Option<String>,
    #[serde(default, deserialize_with = "lenient::count")]
    pub position: Option<u32>,
}

impl Record for Slide {
    const TYPE: ItemType = ItemType::Slider;

    fn id(&self) -> &ItemId {
        &self.id
    }
}

/// Studio-wide settings (a single `accountconfig` item).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountConfig {
    pub id: ItemId,
    #[serde(default, deserialize_with = "lenient::text")]
    pub studio_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub contact_email: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub contact_phone: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub instagram: Option<String>,
    /// Flat fee added to orders containing physical products.
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub shipping_fee: Decimal,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            id: ItemId::new("accountconfig"),
            studio_name: None,
            contact_email: None,
            contact_phone: None,
            address: None,
            instagram: None,
            shipping_fee: Decimal::ZERO,
        }
    }
}

impl Record for AccountConfig {
    const TYPE: ItemType = ItemType::AccountConfig;

    fn id(&self) -> &ItemId {
        &self.id
    }
}

/// Deserializers that accept the loose values the admin forms store.
mod lenient {
    use rust_decimal::Decimal;
    use serde::{Deserialize, Deserializer, de::Error};
    use serde_json::Value;

    use crate::types::price::Price;

    pub fn decimal<'de, D: Deserializer<'de>>(d: D) -> Result<Decimal, D::Error> {
        let value = Value::deserialize(d)?;
        Price::parse_amount(&value).map_err(D::Error::custom)
    }

    /// Empty strings read as absent.
    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s),
            Value::Null => None,
            other => Some(other.to_string()),
        })
    }

    pub fn count<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
        match Value::deserialize(d)? {
            Value::Null => Ok(None),
            Value::String(s) if s.trim().is_empty() => Ok(None),
            Value::String(s) => s.trim().parse().map(Some).map_err(D::Error::custom),
            Value::Number(n) => n
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid count: {n}"))),
            other => Err(D::Error::custom(format!("invalid count: {other}"))),
        }
    }

    pub fn quantity<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        count(d)?.ok_or_else(|| D::Error::custom("missing quantity"))
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Bool(b) => b,
            Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "on" | "yes" | "1"),
            Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
            _ => false,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(value: serde_json::Value) -> Item {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_catalog_entry_from_admin_strings() {
        let entry = CatalogEntry::from_item(item(json!({
            "id": "w1",
            "type": "workshop",
            "slug": "wheel-weekend",
            "title": "Wheel weekend",
            "price": "3,500",
            "stock": "8",
            "featured": "on",
            "venue": "",
            "date": "2026-11-14"
        })))
        .unwrap();

        assert_eq!(entry.item_type, ItemType::Workshop);
        assert_eq!(entry.price, Decimal::from(3500));
        assert_eq!(entry.stock, Some(8));
        assert!(entry.featured);
        assert_eq!(entry.venue, None);
        assert_eq!(entry.url_key(), "wheel-weekend");
        assert!(entry.has_stock_for(8));
        assert!(!entry.has_stock_for(9));
    }

    #[test]
    fn test_catalog_entry_rejects_blog() {
        let result = CatalogEntry::from_item(item(json!({"id": "b", "type": "blog"})));
        assert!(matches!(result, Err(RecordError::TypeMismatch { .. })));
    }

    #[test]
    fn test_unlimited_stock() {
        let entry = CatalogEntry::from_item(item(json!({
            "id": "c1", "type": "course", "title": "Glazing", "price": 900
        })))
        .unwrap();
        assert_eq!(entry.stock, None);
        assert!(entry.has_stock_for(1000));
        assert_eq!(entry.url_key(), "c1");
    }

    #[test]
    fn test_record_type_mismatch() {
        let result = BlogPost::from_item(item(json!({"id": "p", "type": "product"})));
        assert!(matches!(
            result,
            Err(RecordError::TypeMismatch {
                expected: ItemType::Blog,
                found: ItemType::Product
            })
        ));
    }

    #[test]
    fn test_cart_entry_into_item_sets_type() {
        let entry = CartEntry {
            id: ItemId::cart_line(&UserId::new("u1"), &ProductId::new("p9")),
            user_id: UserId::new("u1"),
            product_id: ProductId::new("p9"),
            item_type: ItemType::Product,
            title: "Glaze kit".to_string(),
            unit_price: Decimal::from(450),
            quantity: 2,
            image: None,
        };
        let item = entry.clone().into_item().unwrap();
        assert_eq!(item.item_type, ItemType::Cart);
        assert_eq!(item.id.as_str(), "cart-u1-p9");
        assert_eq!(item.str_field("userId").as_deref(), Some("u1"));
        assert_eq!(CartEntry::from_item(item).unwrap(), entry);
    }

    #[test]
    fn test_subscriber_defaults_active() {
        let sub = Subscriber::from_item(item(json!({
            "id": "n1", "type": "newsletter", "email": "Reader@Example.com"
        })))
        .unwrap();
        assert!(sub.active);
        assert_eq!(sub.email.as_str(), "reader@example.com");
    }

    #[test]
    fn test_customer_round_trip_keeps_unknown_fields() {
        let raw = item(json!({
            "id": "u1",
            "type": "user",
            "name": "Meera",
            "email": "meera@example.in",
            "createdAt": "2026-01-04T10:00:00Z",
            "address": {"city": "Pune"},
            "role": "wholesale"
        }));
        let customer = Customer::from_item(raw).unwrap();
        let renamed = Customer {
            name: "Meera Iyer".to_string(),
            ..customer
        };

        let saved = renamed.into_item().unwrap();
        assert_eq!(saved.item_type, ItemType::User);
        assert_eq!(saved.str_field("name").as_deref(), Some("Meera Iyer"));
        assert_eq!(saved.fields["address"], json!({"city": "Pune"}));
        assert_eq!(saved.str_field("role").as_deref(), Some("wholesale"));
    }

    #[test]
    fn test_subscriber_round_trip_keeps_unknown_fields() {
        let sub = Subscriber::from_item(item(json!({
            "id": "n1", "type": "newsletter", "email": "a@b.in", "active": false, "source": "fair"
        })))
        .unwrap();
        let saved = Subscriber { active: true, ..sub }.into_item().unwrap();
        assert_eq!(saved.fields["active"], json!(true));
        assert_eq!(saved.str_field("source").as_deref(), Some("fair"));
    }

    #[test]
    fn test_quantity_accepts_form_strings() {
        let entry = CartEntry::from_item(item(json!({
            "id": "cart-u1-p1",
            "type": "cart",
            "userId": "u1",
            "productId": "p1",
            "itemType": "product",
            "title": "Glaze kit",
            "unitPrice": "450",
            "quantity": " 3 "
        })))
        .unwrap();
        assert_eq!(entry.quantity, 3);

        let line: OrderLine = serde_json::from_value(json!({
            "productId": "p1", "itemType": "product", "title": "Glaze kit",
            "unitPrice": 450, "quantity": "2"
        }))
        .unwrap();
        assert_eq!(line.quantity, 2);

        let blank = CartEntry::from_item(item(json!({
            "id": "cart-u1-p1", "type": "cart", "userId": "u1", "productId": "p1",
            "itemType": "product", "title": "Glaze kit", "unitPrice": "450", "quantity": ""
        })));
        assert!(blank.is_err());
    }

    #[test]
    fn test_malformed_order_reports_id() {
        let err = Order::from_item(item(json!({"id": "o7", "type": "order"}))).unwrap_err();
        assert!(err.to_string().contains("o7"));
    }
}
