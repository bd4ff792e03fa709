//! Order status emails sent to customers from the admin console.

use askama::Template;
use thiserror::Error;

use atelier_core::Order;
use atelier_core::mail::{MailClient, MailError};

#[derive(Template)]
#[template(path = "emails/order_status.html")]
struct OrderStatusHtml<'a> {
    studio_name: &'a str,
    short_ref: &'a str,
    order: &'a Order,
}

#[derive(Template)]
#[template(path = "emails/order_status.txt")]
struct OrderStatusText<'a> {
    studio_name: &'a str,
    short_ref: &'a str,
    order: &'a Order,
}

/// Errors that can occur when sending a status email.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    #[error("Mail error: {0}")]
    Mail(#[from] MailError),
}

/// Sends order status emails.
#[derive(Clone)]
pub struct StatusNotifier {
    mail: MailClient,
    studio_name: String,
}

impl StatusNotifier {
    #[must_use]
    pub const fn new(mail: MailClient, studio_name: String) -> Self {
        Self { mail, studio_name }
    }

    /// Tell the customer their order moved to its current status.
    ///
    /// # Errors
    ///
    /// Returns error if a template fails to render or the send fails.
    pub async fn status_changed(&self, order: &Order) -> Result<(), NotificationError> {
        let short_ref = short_ref(order);
        let studio_name = self.studio_name.as_str();

        let html = OrderStatusHtml {
            studio_name,
            short_ref: &short_ref,
            order,
        }
        .render()?;
        let text = OrderStatusText {
            studio_name,
            short_ref: &short_ref,
            order,
        }
        .render()?;

        let subject = format!(
            "{studio_name}: order {short_ref} is {}",
            order.status.label().to_lowercase()
        );
        let mail = self.mail.compose(order.email.as_str(), subject, text, html);
        self.mail.send(&mail).await?;

        tracing::info!(order_id = %order.id, status = %order.status, "Status email sent");
        Ok(())
    }
}

/// First eight characters of the order id, upper-cased.
fn short_ref(order: &Order) -> String {
    order.id.as_str().chars().take(8).collect::<String>().to_uppercase()
}
