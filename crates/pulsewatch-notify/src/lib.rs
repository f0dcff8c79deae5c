//! pulsewatch-notify — the notification capability.
//!
//! The monitoring engine never talks to a mail server; it talks to a
//! [`Notifier`] injected at the boundary. Delivery is fire-and-forget:
//! [`dispatch`] swallows (and logs) every delivery error, because a
//! broken mail pipe must never affect classification or probing.

use async_trait::async_trait;
use tracing::{info, warn};

/// Signature line appended to every outgoing message body.
const SIGNATURE: &str = "\n\nSent by the Pulsewatch monitor";

/// Delivery capability for operator notifications.
///
/// `target` is whatever address the concrete transport understands
/// (an email address for a mail transport). Implementations report
/// delivery problems through the error; they should not panic and
/// should not block indefinitely.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, target: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// Fire-and-forget dispatch.
///
/// Skips quietly when there is no target. Appends the signature line,
/// then delivers; a delivery error is logged and dropped.
pub async fn dispatch(
    notifier: &dyn Notifier,
    target: Option<&str>,
    subject: &str,
    body: &str,
) {
    let Some(target) = target.filter(|t| !t.is_empty()) else {
        return;
    };
    info!(subject, "sending notification");
    let body = format!("{body}{SIGNATURE}");
    if let Err(e) = notifier.notify(target, subject, &body).await {
        warn!(subject, error = %e, "notification delivery failed");
    }
}

/// Default notifier when no mail transport is wired: logs the subject
/// and drops the message.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, target: &str, subject: &str, _body: &str) -> anyhow::Result<()> {
        info!(target, subject, "notification (no transport configured)");
        Ok(())
    }
}
