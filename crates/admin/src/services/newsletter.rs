//! Newsletter broadcast.
//!
//! Sends one email per active subscriber, one after another, pausing between
//! sends so the mail endpoint is not flooded. A failed send is logged and
//! counted; it never stops the loop.

use std::future::Future;
use std::time::Duration;

use askama::Template;
use tokio::task::JoinHandle;

use atelier_core::Subscriber;
use atelier_core::mail::{MailClient, MailError};

/// HTML body for a broadcast.
#[derive(Template)]
#[template(path = "emails/newsletter.html")]
struct NewsletterHtml<'a> {
    studio_name: &'a str,
    subject: &'a str,
    paragraphs: Vec<&'a str>,
}

/// A composed newsletter issue.
#[derive(Debug, Clone)]
pub struct Issue {
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl Issue {
    /// Compose an issue from a subject and a plain text body.
    ///
    /// Blank lines in the body separate paragraphs in the HTML version.
    ///
    /// # Errors
    ///
    /// Returns error if the HTML template fails to render.
    pub fn compose(studio_name: &str, subject: &str, body: &str) -> Result<Self, askama::Error> {
        let paragraphs = body
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        let html = NewsletterHtml {
            studio_name,
            subject,
            paragraphs,
        }
        .render()?;

        Ok(Self {
            subject: subject.to_string(),
            text: body.trim().to_string(),
            html,
        })
    }
}

/// Outcome of a broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub sent: usize,
    pub failed: usize,
}

/// Addresses of subscribers who have not opted out, without duplicates.
#[must_use]
pub fn recipients(subscribers: &[Subscriber]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    subscribers
        .iter()
        .filter(|s| s.active)
        .map(|s| s.email.as_str().to_string())
        .filter(|email| seen.insert(email.clone()))
        .collect()
}

/// Start a broadcast on a background task.
///
/// The report is logged when the task finishes and returned through the
/// join handle.
pub fn spawn_broadcast(
    mail: MailClient,
    issue: Issue,
    recipients: Vec<String>,
    delay: Duration,
) -> JoinHandle<BroadcastReport> {
    tokio::spawn(async move {
        let total = recipients.len();
        tracing::info!(subject = %issue.subject, total, "Newsletter broadcast started");

        let report = deliver_all(recipients, delay, |to| {
            let message = mail.compose(
                to,
                issue.subject.clone(),
                issue.text.clone(),
                issue.html.clone(),
            );
            let mail = mail.clone();
            async move { mail.send(&message).await }
        })
        .await;

        tracing::info!(
            subject = %issue.subject,
            sent = report.sent,
            failed = report.failed,
            "Newsletter broadcast finished"
        );
        report
    })
}

/// Send to each recipient in order, sleeping `delay` between sends.
pub async fn deliver_all<F, Fut>(
    recipients: Vec<String>,
    delay: Duration,
    mut send: F,
) -> BroadcastReport
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<(), MailError>>,
{
    let mut report = BroadcastReport::default();

    for (index, to) in recipients.into_iter().enumerate() {
        if index > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match send(to.clone()).await {
            Ok(()) => report.sent += 1,
            Err(e) => {
                report.failed += 1;
                tracing::warn!(to = %to, error = %e, "Newsletter send failed");
            }
        }
    }

    report
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use atelier_core::{Email, ItemId};
    use std::sync::{Arc, Mutex};

    fn subscriber(email: &str, active: bool) -> Subscriber {
        Subscriber {
            id: ItemId::generate(),
            email: Email::parse(email).unwrap(),
            active,
            subscribed_at: None,
            extra: serde_json::Map::new(),
        }
    }

    #[test]
    fn test_recipients_skips_inactive_and_duplicates() {
        let subscribers = vec![
            subscriber("meera@example.in", true),
            subscriber("ravi@example.in", false),
            subscriber("Meera@Example.in", true),
            subscriber("kabir@example.in", true),
        ];
        assert_eq!(
            recipients(&subscribers),
            vec!["meera@example.in", "kabir@example.in"]
        );
    }

    #[test]
    fn test_compose_splits_paragraphs() {
        let issue = Issue::compose(
            "Atelier",
            "March at the studio",
            "New raku firing dates.\n\nGlaze night is back & open.\n",
        )
        .unwrap();
        assert_eq!(issue.text, "New raku firing dates.\n\nGlaze night is back & open.");
        assert!(issue.html.contains("<p>New raku firing dates.</p>"));
        assert!(issue.html.contains("Glaze night is back &amp; open."));
    }

    #[tokio::test]
    async fn test_deliver_all_counts_failures_and_continues() {
        let attempted = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&attempted);

        let report = deliver_all(
            vec![
                "a@example.in".to_string(),
                "bounce@example.in".to_string(),
                "c@example.in".to_string(),
            ],
            Duration::ZERO,
            move |to| {
                log.lock().unwrap().push(to.clone());
                async move {
                    if to.starts_with("bounce") {
                        Err(MailError::Api {
                            status: 550,
                            message: "mailbox unavailable".to_string(),
                        })
                    } else {
                        Ok(())
                    }
                }
            },
        )
        .await;

        assert_eq!(report, BroadcastReport { sent: 2, failed: 1 });
        assert_eq!(attempted.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_deliver_all_waits_between_sends() {
        let start = std::time::Instant::now();
        let report = deliver_all(
            vec!["a@example.in".to_string(), "b@example.in".to_string()],
            Duration::from_millis(50),
            |_| async { Ok(()) },
        )
        .await;

        assert_eq!(report.sent, 2);
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
