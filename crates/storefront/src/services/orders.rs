//! Checkout staging and payment confirmation.
//!
//! Checkout turns the cart into a [`PendingOrder`] kept in the session. The
//! payment page creates a gateway order for its exact amount. When the
//! gateway reports success the signature is verified here before anything is
//! written to the item store.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use atelier_core::cart::Cart;
use atelier_core::store::{ItemStoreClient, StoreError};
use atelier_core::{
    Customer, Email, EmailError, ItemId, Order, OrderLine, OrderStatus, Price, PriceError,
    ShippingAddress, UserId,
};

use crate::models::CurrentUser;
use crate::services::notifications::Notifier;
use crate::services::razorpay::{RazorpayClient, RazorpayError};

/// Checkout validation failures, shown inline on the checkout page.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("Your cart is empty.")]
    EmptyCart,
    #[error("Please enter your name.")]
    MissingName,
    #[error("Please enter a valid email address.")]
    InvalidEmail(#[from] EmailError),
    #[error("Please enter your {0} for delivery.")]
    MissingAddress(&'static str),
    #[error("The order total is not payable.")]
    Amount(#[from] PriceError),
}

/// Errors confirming a payment.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Gateway call or signature check failed.
    #[error("payment error: {0}")]
    Razorpay(#[from] RazorpayError),

    /// The callback names a different gateway order than the one staged.
    #[error("payment does not match the staged order")]
    GatewayMismatch,

    /// Item store write failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Checkout form data.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutForm {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub line1: String,
    #[serde(default)]
    pub line2: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub note: String,
}

/// Gateway success callback fields.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfirmation {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

/// An order staged at checkout and awaiting payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOrder {
    /// Becomes the order item's id and the gateway receipt.
    pub order_ref: String,
    pub user_id: Option<UserId>,
    pub customer_name: String,
    pub email: Email,
    pub phone: Option<String>,
    pub address: Option<ShippingAddress>,
    pub lines: Vec<OrderLine>,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
    pub note: Option<String>,
    /// Set once the payment page has created a gateway order.
    pub gateway_order_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn required(value: &str, field: &'static str) -> Result<String, CheckoutError> {
    non_empty(value).ok_or(CheckoutError::MissingAddress(field))
}

/// Validate the checkout form and stage an order for `cart`.
///
/// The shipping fee applies only when the cart holds physical products, and
/// only then is a delivery address required.
///
/// # Errors
///
/// Returns the first validation failure.
pub fn stage(
    form: &CheckoutForm,
    cart: &Cart,
    shipping_fee: Decimal,
    user: Option<&CurrentUser>,
) -> Result<PendingOrder, CheckoutError> {
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }
    let customer_name = non_empty(&form.name).ok_or(CheckoutError::MissingName)?;
    let email = Email::parse(&form.email)?;

    let needs_shipping = cart.needs_shipping();
    let address = if needs_shipping {
        Some(ShippingAddress {
            line1: required(&form.line1, "address")?,
            line2: non_empty(&form.line2),
            city: required(&form.city, "city")?,
            state: required(&form.state, "state")?,
            postal_code: required(&form.postal_code, "PIN code")?,
            country: "India".to_string(),
        })
    } else {
        None
    };

    let lines: Vec<OrderLine> = cart
        .lines()
        .iter()
        .map(|l| OrderLine {
            product_id: l.product_id.clone(),
            item_type: l.item_type,
            title: l.title.clone(),
            unit_price: l.unit_price,
            quantity: l.quantity,
        })
        .collect();

    let subtotal = cart.subtotal().amount;
    let shipping_fee = if needs_shipping {
        shipping_fee.max(Decimal::ZERO)
    } else {
        Decimal::ZERO
    };

    let pending = PendingOrder {
        order_ref: ItemId::generate().into_inner(),
        user_id: user.map(|u| u.id.clone()),
        customer_name,
        email,
        phone: non_empty(&form.phone),
        address,
        lines,
        subtotal,
        shipping_fee,
        total: subtotal + shipping_fee,
        note: non_empty(&form.note),
        gateway_order_id: None,
        created_at: Utc::now(),
    };

    // Reject totals the gateway cannot charge before the customer gets there.
    pending.amount_paise()?;
    Ok(pending)
}

impl PendingOrder {
    /// Total as a currency value.
    #[must_use]
    pub const fn total_price(&self) -> Price {
        Price::inr(self.total)
    }

    /// Total in paise.
    ///
    /// # Errors
    ///
    /// Returns error if the total is negative or does not fit.
    pub fn amount_paise(&self) -> Result<i64, PriceError> {
        self.total_price().to_minor_units()
    }

    /// The paid order record.
    #[must_use]
    pub fn into_order(self, user_id: Option<UserId>, payment: &PaymentConfirmation) -> Order {
        Order {
            id: ItemId::new(self.order_ref),
            user_id,
            customer_name: self.customer_name,
            email: self.email,
            phone: self.phone,
            address: self.address,
            lines: self.lines,
            subtotal: self.subtotal,
            shipping_fee: self.shipping_fee,
            total: self.total,
            status: OrderStatus::Paid,
            razorpay_order_id: Some(payment.razorpay_order_id.clone()),
            razorpay_payment_id: Some(payment.razorpay_payment_id.clone()),
            tracking_number: None,
            note: self.note,
            created_at: Utc::now(),
        }
    }
}

/// Performs the writes that follow a successful payment.
pub struct OrderService<'a> {
    store: &'a ItemStoreClient,
    razorpay: &'a RazorpayClient,
    notifier: &'a Notifier,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(
        store: &'a ItemStoreClient,
        razorpay: &'a RazorpayClient,
        notifier: &'a Notifier,
    ) -> Self {
        Self {
            store,
            razorpay,
            notifier,
        }
    }

    /// Confirm a staged order after the gateway reports success.
    ///
    /// Verifies the payment signature, then writes the order as `paid`,
    /// creates a password-less customer for unknown emails, lowers stock and
    /// sends the order emails. Stock and mail failures are logged only.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::GatewayMismatch` or `OrderError::Razorpay` when
    /// the payment cannot be trusted, and `OrderError::Store` when the order
    /// or customer cannot be written.
    #[instrument(skip(self, pending, payment), fields(order_ref = %pending.order_ref))]
    pub async fn confirm(
        &self,
        pending: PendingOrder,
        payment: &PaymentConfirmation,
    ) -> Result<Order, OrderError> {
        if pending.gateway_order_id.as_deref() != Some(payment.razorpay_order_id.as_str()) {
            return Err(OrderError::GatewayMismatch);
        }
        self.razorpay.verify_payment_signature(
            &payment.razorpay_order_id,
            &payment.razorpay_payment_id,
            &payment.razorpay_signature,
        )?;

        let user_id = match pending.user_id.clone() {
            Some(id) => id,
            None => self.ensure_customer(&pending).await?,
        };

        let order = pending.into_order(Some(user_id), payment);
        self.store.save_record(order.clone()).await?;
        tracing::info!(order_id = %order.id, total = %order.total, "Order paid");

        self.lower_stock(&order).await;
        self.notifier.order_placed(&order).await;

        Ok(order)
    }

    /// Id of the customer holding the order's email, created if missing.
    async fn ensure_customer(&self, pending: &PendingOrder) -> Result<UserId, OrderError> {
        let existing = self
            .store
            .find_records::<Customer>("email", pending.email.as_str())
            .await?;
        if let Some(customer) = existing.into_iter().next() {
            return Ok(customer.user_id());
        }

        let customer = Customer {
            id: ItemId::generate(),
            name: pending.customer_name.clone(),
            email: pending.email.clone(),
            phone: pending.phone.clone(),
            password_hash: None,
            created_at: Utc::now(),
            extra: serde_json::Map::new(),
        };
        self.store.save_record(customer.clone()).await?;
        tracing::info!(user_id = %customer.id, "Customer created at checkout");
        Ok(customer.user_id())
    }

    /// Decrement tracked stock for each purchased line.
    async fn lower_stock(&self, order: &Order) {
        for line in &order.lines {
            let id = ItemId::from(&line.product_id);
            let mut item = match self.store.get_item(&id).await {
                Ok(Some(item)) => item,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(product_id = %id, error = %e, "Could not read stock");
                    continue;
                }
            };
            let Some(stock) = item.decimal_field("stock") else {
                continue;
            };
            let remaining = (stock - Decimal::from(line.quantity)).max(Decimal::ZERO);
            item.set_field("stock", serde_json::Value::String(remaining.to_string()));
            if let Err(e) = self.store.save_item(&item).await {
                tracing::warn!(product_id = %id, error = %e, "Could not update stock");
            }
        }
    }
}
