//! lcfleet-queue — the work-queue side of the job hand-off.
//!
//! A producer serializes a [`JobDescriptor`] to canonical JSON and
//! enqueues it; any number of workers long-poll the same queue, each
//! receiving a message with a receipt token that it must present to
//! acknowledge (delete) that delivery. An unacknowledged message becomes
//! visible again after the queue's visibility window — delivery is
//! at-least-once, never at-most-once, and idempotence is the caller's
//! concern.
//!
//! Which worker gets which job is the queue service's arbitration; this
//! crate only defines the contract each side honors.
//!
//! [`JobDescriptor`]: lcfleet_core::JobDescriptor

pub mod backend;
pub mod client;
pub mod error;
pub mod memory;

pub use backend::{QueueBackend, RawMessage, SendAck};
pub use client::{EnqueueReceipt, QueueHandle, QueueMessage, WorkQueue};
pub use error::{QueueError, QueueResult};
pub use memory::MemoryQueue;
