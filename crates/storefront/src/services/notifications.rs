//! Transactional emails sent by the storefront.
//!
//! Each message has an HTML and a plain text Askama template and goes out
//! through the mail endpoint.

use askama::Template;
use thiserror::Error;

use atelier_core::Order;
use atelier_core::mail::{MailClient, MailError};

use crate::config::StudioConfig;

/// HTML order confirmation for the customer.
#[derive(Template)]
#[template(path = "emails/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    studio_name: &'a str,
    order: &'a Order,
    order_url: &'a str,
}

/// Plain text order confirmation for the customer.
#[derive(Template)]
#[template(path = "emails/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    studio_name: &'a str,
    order: &'a Order,
    order_url: &'a str,
}

/// HTML new-order alert for the studio.
#[derive(Template)]
#[template(path = "emails/new_order.html")]
struct NewOrderHtml<'a> {
    order: &'a Order,
}

/// Plain text new-order alert for the studio.
#[derive(Template)]
#[template(path = "emails/new_order.txt")]
struct NewOrderText<'a> {
    order: &'a Order,
}

/// Errors that can occur when sending a notification.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// Mail endpoint error.
    #[error("Mail error: {0}")]
    Mail(#[from] MailError),
}

/// Sends order emails.
#[derive(Clone)]
pub struct Notifier {
    mail: MailClient,
    studio: StudioConfig,
    base_url: String,
}

impl Notifier {
    #[must_use]
    pub const fn new(mail: MailClient, studio: StudioConfig, base_url: String) -> Self {
        Self {
            mail,
            studio,
            base_url,
        }
    }

    /// Send the customer confirmation and the studio alert for a paid order.
    ///
    /// Failures are logged and swallowed; the order is already written.
    pub async fn order_placed(&self, order: &Order) {
        if let Err(e) = self.send_confirmation(order).await {
            tracing::error!(order_id = %order.id, error = %e, "Order confirmation email failed");
        }
        if let Some(to) = &self.studio.notify_email
            && let Err(e) = self.send_studio_alert(order, to).await
        {
            tracing::error!(order_id = %order.id, error = %e, "New order alert failed");
        }
    }

    async fn send_confirmation(&self, order: &Order) -> Result<(), NotificationError> {
        let order_url = format!("{}/orders/{}/thank-you", self.base_url, order.id);
        let studio_name = self.studio.name.as_str();

        let html = OrderConfirmationHtml {
            studio_name,
            order,
            order_url: &order_url,
        }
        .render()?;
        let text = OrderConfirmationText {
            studio_name,
            order,
            order_url: &order_url,
        }
        .render()?;

        let subject = format!("{studio_name}: order {} confirmed", short_ref(order));
        let mail = self.mail.compose(order.email.as_str(), subject, text, html);
        self.mail.send(&mail).await?;
        Ok(())
    }

    async fn send_studio_alert(&self, order: &Order, to: &str) -> Result<(), NotificationError> {
        let html = NewOrderHtml { order }.render()?;
        let text = NewOrderText { order }.render()?;

        let subject = format!(
            "New order {} from {} ({})",
            short_ref(order),
            order.customer_name,
            order.total_price().display()
        );
        let mail = self.mail.compose(to, subject, text, html);
        self.mail.send(&mail).await?;
        Ok(())
    }
}

/// First eight characters of the order id, upper-cased, for subjects.
fn short_ref(order: &Order) -> String {
    order.id.as_str().chars().take(8).collect::<String>().to_uppercase()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use atelier_core::{Email, ItemId, ItemType, OrderLine, OrderStatus, ProductId};
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn order() -> Order {
        Order {
            id: ItemId::new("3f2a9c1e77b04d1f"),
            user_id: None,
            customer_name: "Asha Rao".to_string(),
            email: Email::parse("asha@example.in").unwrap(),
            phone: None,
            address: None,
            lines: vec![OrderLine {
                product_id: ProductId::new("c1"),
                item_type: ItemType::Course,
                title: "Wheel & Kiln".to_string(),
                unit_price: Decimal::from(2500),
                quantity: 2,
            }],
            subtotal: Decimal::from(5000),
            shipping_fee: Decimal::ZERO,
            total: Decimal::from(5000),
            status: OrderStatus::Paid,
            razorpay_order_id: Some("order_1".to_string()),
            razorpay_payment_id: Some("pay_1".to_string()),
            tracking_number: None,
            note: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_short_ref() {
        assert_eq!(short_ref(&order()), "3F2A9C1E");
    }

    #[test]
    fn test_confirmation_templates_render() {
        let order = order();
        let html = OrderConfirmationHtml {
            studio_name: "Atelier",
            order: &order,
            order_url: "https://atelier.test/orders/x/thank-you",
        }
        .render()
        .unwrap();
        assert!(html.contains("Wheel &amp; Kiln"));
        assert!(html.contains("₹5,000.00"));

        let text = OrderConfirmationText {
            studio_name: "Atelier",
            order: &order,
            order_url: "https://atelier.test/orders/x/thank-you",
        }
        .render()
        .unwrap();
        assert!(text.contains("Wheel & Kiln x 2"));
    }
}
