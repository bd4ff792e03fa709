//! Cart lines, totals and guest/server reconciliation.
//!
//! The storefront keeps two kinds of carts: a guest cart serialized into the
//! visitor's session, and a per-user cart persisted as one `cart` item per
//! product (`cart-{userId}-{productId}`). Both use [`Cart`]; this module owns
//! the arithmetic and the merge rule applied at login.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{CartEntry, CatalogEntry, ItemId, ItemType, Price, ProductId, UserId};

/// One product in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub item_type: ItemType,
    pub title: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub image: Option<String>,
}

impl CartLine {
    /// A line for `quantity` units of a catalog entry.
    #[must_use]
    pub fn for_entry(entry: &CatalogEntry, quantity: u32) -> Self {
        Self {
            product_id: entry.product_id(),
            item_type: entry.item_type,
            title: entry.title.clone(),
            unit_price: entry.price,
            quantity,
            image: entry.image.clone(),
        }
    }

    /// Price of one unit.
    #[must_use]
    pub const fn price(&self) -> Price {
        Price::inr(self.unit_price)
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        Price::inr(self.unit_price).times(self.quantity)
    }

    /// Persisted form of this line for `user_id`.
    #[must_use]
    pub fn to_entry(&self, user_id: &UserId) -> CartEntry {
        CartEntry {
            id: ItemId::cart_line(user_id, &self.product_id),
            user_id: user_id.clone(),
            product_id: self.product_id.clone(),
            item_type: self.item_type,
            title: self.title.clone(),
            unit_price: self.unit_price,
            quantity: self.quantity,
            image: self.image.clone(),
        }
    }
}

impl From<CartEntry> for CartLine {
    fn from(entry: CartEntry) -> Self {
        Self {
            product_id: entry.product_id,
            item_type: entry.item_type,
            title: entry.title,
            unit_price: entry.unit_price,
            quantity: entry.quantity,
            image: entry.image,
        }
    }
}

/// An ordered collection of cart lines, at most one per product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Build a cart from persisted entries. Duplicate products keep the
    /// last entry seen.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = CartEntry>) -> Self {
        let mut cart = Self::new();
        for entry in entries {
            let line = CartLine::from(entry);
            let quantity = line.quantity;
            let product_id = line.product_id.clone();
            if cart.line(&product_id).is_some() {
                cart.set_quantity(&product_id, quantity);
            } else if quantity > 0 {
                cart.lines.push(line);
            }
        }
        cart
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Consume the cart, returning its lines.
    #[must_use]
    pub fn into_lines(self) -> Vec<CartLine> {
        self.lines
    }

    /// Look up the line for a product.
    #[must_use]
    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.product_id == product_id)
    }

    /// Add a line. An existing product has its quantity increased and its
    /// title, price and image refreshed; a zero quantity is ignored.
    ///
    /// Returns the product's resulting quantity.
    pub fn add(&mut self, line: CartLine) -> u32 {
        if line.quantity == 0 {
            return self.line(&line.product_id).map_or(0, |l| l.quantity);
        }
        if let Some(existing) = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == line.product_id)
        {
            existing.quantity = existing.quantity.saturating_add(line.quantity);
            existing.title = line.title;
            existing.unit_price = line.unit_price;
            existing.image = line.image;
            return existing.quantity;
        }
        let quantity = line.quantity;
        self.lines.push(line);
        quantity
    }

    /// Overwrite a product's quantity; zero removes the line.
    ///
    /// Returns `false` when the product is not in the cart.
    pub fn set_quantity(&mut self, product_id: &ProductId, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove(product_id).is_some();
        }
        match self.lines.iter_mut().find(|l| &l.product_id == product_id) {
            Some(line) => {
                line.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Remove a product's line.
    pub fn remove(&mut self, product_id: &ProductId) -> Option<CartLine> {
        let index = self.lines.iter().position(|l| &l.product_id == product_id)?;
        Some(self.lines.remove(index))
    }

    /// Sum of line totals.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Total number of units.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0u32, |acc, l| acc.saturating_add(l.quantity))
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Whether any line is a physical product (and so needs shipping).
    #[must_use]
    pub fn needs_shipping(&self) -> bool {
        self.lines.iter().any(|l| l.item_type == ItemType::Product)
    }

    /// Persisted entries for every line of `user_id`'s cart.
    #[must_use]
    pub fn to_entries(&self, user_id: &UserId) -> Vec<CartEntry> {
        self.lines.iter().map(|l| l.to_entry(user_id)).collect()
    }
}

/// Result of merging a guest cart into a user's server cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// The merged cart.
    pub cart: Cart,
    /// Lines that differ from the server cart and must be written back.
    pub changed: Vec<CartLine>,
}

/// Merge a guest cart into a user's server-held cart.
///
/// Products present in only one cart are kept as-is. For products present in
/// both, the guest quantity wins: the guest cart holds the visitor's most
/// recent edits, and updates are last-write-wins. Server lines keep their
/// position; guest-only lines are appended in guest order.
#[must_use]
pub fn reconcile(guest: &Cart, server: &Cart) -> Reconciliation {
    let mut cart = server.clone();
    let mut changed = Vec::new();

    for line in guest.lines() {
        match cart.lines.iter_mut().find(|l| l.product_id == line.product_id) {
            Some(existing) if existing == line => {}
            Some(existing) => {
                *existing = line.clone();
                changed.push(line.clone());
            }
            None => {
                cart.lines.push(line.clone());
                changed.push(line.clone());
            }
        }
    }

    Reconciliation { cart, changed }
}
