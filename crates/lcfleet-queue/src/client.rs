//! The work-queue client: canonical encoding + failure policy.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use lcfleet_core::{FailMode, JobDescriptor};

use crate::backend::QueueBackend;
use crate::error::{QueueError, QueueResult};

/// Handle to a created queue: the service URL plus the caller's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueHandle {
    pub url: String,
    pub name: String,
}

/// Acknowledgment of a successful enqueue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnqueueReceipt {
    pub message_id: String,
    pub body_checksum: String,
}

/// One delivered job, owned by the receiving worker until acknowledged.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueMessage {
    pub id: String,
    /// Proof of this delivery; present it to [`WorkQueue::acknowledge`].
    pub receipt_token: String,
    pub body_checksum: String,
    pub attributes: HashMap<String, String>,
    pub item: JobDescriptor,
}

/// Client for the job hand-off queue.
///
/// Ordinary reusable value holding its backend; no global state. Under
/// [`FailMode::Soft`] (the default) provider failures are logged and
/// reported as sentinels; [`FailMode::Hard`] propagates them. Provider
/// rejections are typed errors in either mode.
#[derive(Debug, Clone)]
pub struct WorkQueue<B> {
    backend: B,
    fail_mode: FailMode,
}

impl<B: QueueBackend> WorkQueue<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            fail_mode: FailMode::Soft,
        }
    }

    pub fn with_fail_mode(mut self, fail_mode: FailMode) -> Self {
        self.fail_mode = fail_mode;
        self
    }

    /// Create a named queue. Re-creating an existing name is idempotent
    /// at the service; differing attributes on re-create are undefined
    /// and not this layer's concern.
    pub async fn create_queue(
        &self,
        name: &str,
        attributes: Option<&HashMap<String, String>>,
    ) -> QueueResult<Option<QueueHandle>> {
        static EMPTY: std::sync::LazyLock<HashMap<String, String>> =
            std::sync::LazyLock::new(HashMap::new);
        let attrs = attributes.unwrap_or(&EMPTY);

        match self.backend.create_queue(name, attrs).await {
            Ok(url) => Ok(Some(QueueHandle {
                url,
                name: name.to_string(),
            })),
            Err(e) => self.absorb(
                QueueError::Create {
                    name: name.to_string(),
                    source: e,
                },
                "could not create queue",
            ),
        }
    }

    /// Delete a queue. Returns `false` on a soft-swallowed failure.
    pub async fn delete_queue(&self, handle: &QueueHandle) -> QueueResult<bool> {
        match self.backend.delete_queue(&handle.url).await {
            Ok(()) => Ok(true),
            Err(e) => Ok(self
                .absorb::<()>(
                    QueueError::Delete {
                        url: handle.url.clone(),
                        source: e,
                    },
                    "could not delete queue",
                )?
                .is_some()),
        }
    }

    /// Serialize a job descriptor to its canonical encoding and submit
    /// it. `delay` postpones visibility to consumers.
    pub async fn enqueue(
        &self,
        handle: &QueueHandle,
        job: &JobDescriptor,
        delay: Duration,
    ) -> QueueResult<Option<EnqueueReceipt>> {
        // An unserializable descriptor is a caller bug, never soft-failed.
        let body = job.to_canonical_json()?;

        match self.backend.send(&handle.url, &body, delay).await {
            Ok(ack) => {
                debug!(queue = %handle.url, message_id = %ack.message_id, "job enqueued");
                Ok(Some(EnqueueReceipt {
                    message_id: ack.message_id,
                    body_checksum: ack.body_checksum,
                }))
            }
            Err(e) => self.absorb(
                QueueError::Enqueue {
                    url: handle.url.clone(),
                    source: e,
                },
                "could not enqueue job",
            ),
        }
    }

    /// Long-poll for up to `max_items` jobs, blocking at most `wait`.
    ///
    /// A timed-out poll is `Some(vec![])` — success with zero items — and
    /// is distinct from a failed poll (`None` under soft-fail, an error
    /// under hard-fail). A message whose body does not decode as a
    /// [`JobDescriptor`] is logged and skipped; it never aborts the rest
    /// of the batch.
    pub async fn dequeue(
        &self,
        handle: &QueueHandle,
        max_items: u32,
        wait: Duration,
    ) -> QueueResult<Option<Vec<QueueMessage>>> {
        let raw = match self.backend.receive(&handle.url, max_items, wait).await {
            Ok(raw) => raw,
            Err(e) => {
                return self.absorb(
                    QueueError::Dequeue {
                        url: handle.url.clone(),
                        source: e,
                    },
                    "could not dequeue jobs",
                );
            }
        };

        let mut messages = Vec::with_capacity(raw.len());
        for msg in raw {
            match JobDescriptor::from_json(&msg.body) {
                Ok(item) => messages.push(QueueMessage {
                    id: msg.id,
                    receipt_token: msg.receipt_token,
                    body_checksum: msg.body_checksum,
                    attributes: msg.attributes,
                    item,
                }),
                Err(e) => {
                    warn!(
                        queue = %handle.url,
                        message_id = %msg.id,
                        error = %e,
                        "skipping message with undecodable body"
                    );
                }
            }
        }
        Ok(Some(messages))
    }

    /// Acknowledge one delivery, deleting it from the queue so it is
    /// never redelivered. Acknowledging an already-deleted delivery is a
    /// no-op under the default soft-fail policy.
    pub async fn acknowledge(&self, handle: &QueueHandle, receipt_token: &str) -> QueueResult<()> {
        match self.backend.delete_message(&handle.url, receipt_token).await {
            Ok(()) => Ok(()),
            Err(e) => self
                .absorb::<()>(
                    QueueError::Acknowledge {
                        url: handle.url.clone(),
                        source: e,
                    },
                    "could not acknowledge delivery",
                )
                .map(|_| ()),
        }
    }

    /// Apply the two-tier failure policy to an already-classified error.
    fn absorb<T>(&self, err: QueueError, context: &str) -> QueueResult<Option<T>> {
        let rejection = matches!(
            &err,
            QueueError::Create { source, .. }
            | QueueError::Delete { source, .. }
            | QueueError::Enqueue { source, .. }
            | QueueError::Dequeue { source, .. }
            | QueueError::Acknowledge { source, .. }
                if source.is_rejection()
        );
        if rejection || self.fail_mode.is_hard() {
            return Err(err);
        }
        error!(error = %err, "{context}");
        Ok(None)
    }
}
