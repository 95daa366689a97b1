//! Queue backend contract — injected for testability.

use std::collections::HashMap;
use std::time::Duration;

use lcfleet_core::ProviderError;

/// Acknowledgment of a successful send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendAck {
    /// Service-assigned message id.
    pub message_id: String,
    /// Checksum of the body as computed by the service.
    pub body_checksum: String,
}

/// One delivery of a message, before the body is decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub id: String,
    /// Opaque proof of this specific delivery; required to acknowledge it.
    pub receipt_token: String,
    pub body: String,
    pub body_checksum: String,
    pub attributes: HashMap<String, String>,
}

/// The raw primitives of a managed message-queue service.
///
/// The service owns delivery arbitration: a received message is hidden
/// from other consumers until its visibility window elapses, and an
/// unacknowledged message is redelivered. Implementations perform one
/// service call per method (receive blocks up to `wait` for its
/// long-poll); failure policy lives in [`crate::WorkQueue`].
pub trait QueueBackend: Send + Sync {
    /// Create (or idempotently re-create) a named queue; returns its URL.
    fn create_queue(
        &self,
        name: &str,
        attributes: &HashMap<String, String>,
    ) -> impl Future<Output = Result<String, ProviderError>> + Send;

    /// Delete a queue by URL.
    fn delete_queue(&self, url: &str) -> impl Future<Output = Result<(), ProviderError>> + Send;

    /// Submit a message body; `delay` postpones its visibility.
    fn send(
        &self,
        url: &str,
        body: &str,
        delay: Duration,
    ) -> impl Future<Output = Result<SendAck, ProviderError>> + Send;

    /// Long-poll for up to `max_items` messages, blocking at most `wait`.
    /// A timeout is an empty vec, not an error.
    fn receive(
        &self,
        url: &str,
        max_items: u32,
        wait: Duration,
    ) -> impl Future<Output = Result<Vec<RawMessage>, ProviderError>> + Send;

    /// Delete the delivery identified by `receipt_token`. Deleting an
    /// already-deleted delivery is a no-op.
    fn delete_message(
        &self,
        url: &str,
        receipt_token: &str,
    ) -> impl Future<Output = Result<(), ProviderError>> + Send;
}
