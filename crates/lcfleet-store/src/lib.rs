//! lcfleet-store — the object-store side of the job hand-off.
//!
//! Job inputs and outputs are named blobs in provider buckets. This crate
//! wraps a pluggable [`ObjectStoreBackend`] with the lcfleet failure
//! policy:
//!
//! - `fetch` tries the primary key, then each alternate extension in the
//!   caller's order, and reports `NotFound` only after exhausting them
//! - `store` uploads under the local file's basename and returns the
//!   `store://` locator
//! - `remove` returns the provider's delete marker
//!
//! All calls are single-attempt; there is no retry beyond the
//! alternate-extension chain. [`MemoryObjectStore`] backs the tests and
//! local development.

pub mod backend;
pub mod client;
pub mod error;
pub mod memory;

pub use backend::{DeleteAck, ObjectStoreBackend};
pub use client::ObjectStore;
pub use error::{StoreError, StoreResult};
pub use memory::MemoryObjectStore;
