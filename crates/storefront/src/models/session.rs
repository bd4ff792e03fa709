//! Session-related types.
//!
//! Types stored in the visitor's session between requests.

use serde::{Deserialize, Serialize};

use atelier_core::{Customer, Email, UserId};

/// Session-stored customer identity.
///
/// Minimal data stored in the session to identify the logged-in customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Id of the customer's `user` item.
    pub id: UserId,
    /// Customer's email address.
    pub email: Email,
    /// Display name.
    pub name: String,
}

impl From<&Customer> for CurrentUser {
    fn from(customer: &Customer) -> Self {
        Self {
            id: customer.user_id(),
            email: customer.email.clone(),
            name: customer.name.clone(),
        }
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in customer.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the cart of a visitor who is not logged in.
    pub const GUEST_CART: &str = "guest_cart";

    /// Key for the order staged at checkout and awaiting payment.
    pub const PENDING_ORDER: &str = "pending_order";

    /// Key for the id of the last confirmed order (thank-you page access).
    pub const LAST_ORDER: &str = "last_order";
}
