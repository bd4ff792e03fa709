//! Business logic services for storefront.

pub mod auth;
pub mod cart;
pub mod handoff;
pub mod notifications;
pub mod orders;
pub mod razorpay;

pub use auth::{AuthError, AuthService};
pub use cart::{CartError, CartService};
pub use handoff::{HandoffError, HandoffSigner, HandoffToken};
pub use notifications::Notifier;
pub use orders::{CheckoutError, OrderError, OrderService, PendingOrder};
pub use razorpay::{RazorpayClient, RazorpayError};
