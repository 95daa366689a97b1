//! In-memory queue backend with delay and visibility-window semantics.
//!
//! Faithful enough for tests and local development: delayed messages stay
//! hidden until their delay elapses, received messages are hidden for the
//! visibility window and redelivered if not acknowledged, and receipt
//! tokens are per-delivery.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

use lcfleet_core::ProviderError;

use crate::backend::{QueueBackend, RawMessage, SendAck};

const POLL_STEP: Duration = Duration::from_millis(5);

/// Queue attribute selecting the visibility window, in seconds.
pub const ATTR_VISIBILITY_SECS: &str = "visibility_timeout_secs";

const DEFAULT_VISIBILITY: Duration = Duration::from_secs(30);

#[derive(Debug)]
struct StoredMessage {
    id: String,
    body: String,
    body_checksum: String,
    /// Hidden from consumers until this instant.
    visible_at: Instant,
    /// Receipt token of the delivery currently in flight, if any.
    receipt_token: Option<String>,
    receive_count: u32,
}

#[derive(Debug)]
struct QueueState {
    name: String,
    visibility: Duration,
    messages: Vec<StoredMessage>,
    next_serial: u64,
}

/// A managed message queue held entirely in memory. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryQueue {
    queues: Arc<Mutex<HashMap<String, QueueState>>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn url_for(name: &str) -> String {
        format!("memq://{name}")
    }

    /// Number of messages currently stored (visible or not).
    pub fn depth(&self, url: &str) -> usize {
        self.queues
            .lock()
            .expect("queue map poisoned")
            .get(url)
            .map(|q| q.messages.len())
            .unwrap_or(0)
    }
}

fn checksum(body: &str) -> String {
    hex::encode(Sha256::digest(body.as_bytes()))
}

impl QueueBackend for MemoryQueue {
    async fn create_queue(
        &self,
        name: &str,
        attributes: &HashMap<String, String>,
    ) -> Result<String, ProviderError> {
        let url = Self::url_for(name);
        let visibility = attributes
            .get(ATTR_VISIBILITY_SECS)
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_VISIBILITY);

        let mut queues = self.queues.lock().expect("queue map poisoned");
        // Re-creating an existing name returns the same queue.
        queues.entry(url.clone()).or_insert_with(|| QueueState {
            name: name.to_string(),
            visibility,
            messages: Vec::new(),
            next_serial: 0,
        });
        Ok(url)
    }

    async fn delete_queue(&self, url: &str) -> Result<(), ProviderError> {
        self.queues
            .lock()
            .expect("queue map poisoned")
            .remove(url)
            .map(|_| ())
            .ok_or_else(|| ProviderError::NotFound(url.to_string()))
    }

    async fn send(&self, url: &str, body: &str, delay: Duration) -> Result<SendAck, ProviderError> {
        let mut queues = self.queues.lock().expect("queue map poisoned");
        let queue = queues
            .get_mut(url)
            .ok_or_else(|| ProviderError::NotFound(url.to_string()))?;

        queue.next_serial += 1;
        let id = format!("{}-msg-{}", queue.name, queue.next_serial);
        let body_checksum = checksum(body);
        queue.messages.push(StoredMessage {
            id: id.clone(),
            body: body.to_string(),
            body_checksum: body_checksum.clone(),
            visible_at: Instant::now() + delay,
            receipt_token: None,
            receive_count: 0,
        });

        Ok(SendAck {
            message_id: id,
            body_checksum,
        })
    }

    async fn receive(
        &self,
        url: &str,
        max_items: u32,
        wait: Duration,
    ) -> Result<Vec<RawMessage>, ProviderError> {
        let deadline = Instant::now() + wait;
        loop {
            {
                let mut queues = self.queues.lock().expect("queue map poisoned");
                let queue = queues
                    .get_mut(url)
                    .ok_or_else(|| ProviderError::NotFound(url.to_string()))?;

                let now = Instant::now();
                let visibility = queue.visibility;
                let mut delivered = Vec::new();
                for msg in queue
                    .messages
                    .iter_mut()
                    .filter(|m| m.visible_at <= now)
                    .take(max_items as usize)
                {
                    queue.next_serial += 1;
                    let receipt = format!("rcpt-{}-{}", msg.id, queue.next_serial);
                    msg.visible_at = now + visibility;
                    msg.receipt_token = Some(receipt.clone());
                    msg.receive_count += 1;

                    let mut attributes = HashMap::new();
                    attributes.insert(
                        "approximate_receive_count".to_string(),
                        msg.receive_count.to_string(),
                    );
                    delivered.push(RawMessage {
                        id: msg.id.clone(),
                        receipt_token: receipt,
                        body: msg.body.clone(),
                        body_checksum: msg.body_checksum.clone(),
                        attributes,
                    });
                }

                if !delivered.is_empty() {
                    return Ok(delivered);
                }
            }

            if Instant::now() >= deadline {
                // Long-poll timed out: success with zero items.
                return Ok(Vec::new());
            }
            tokio::time::sleep(POLL_STEP).await;
        }
    }

    async fn delete_message(&self, url: &str, receipt_token: &str) -> Result<(), ProviderError> {
        let mut queues = self.queues.lock().expect("queue map poisoned");
        let queue = queues
            .get_mut(url)
            .ok_or_else(|| ProviderError::NotFound(url.to_string()))?;

        // Unknown receipts (already-acknowledged deliveries) are a no-op.
        queue
            .messages
            .retain(|m| m.receipt_token.as_deref() != Some(receipt_token));
        Ok(())
    }
}
