//! lcfleet-worker — the consuming side of the job hand-off.
//!
//! A worker process long-polls one per-action queue, and for each
//! delivered job: resolves the input through the object store, invokes
//! the processing callback, writes the result back to the job's
//! `outbucket`, optionally enqueues a result descriptor to its
//! `outqueue`, and acknowledges the original message. A failed job is
//! left unacknowledged, so the visibility window hands it to another
//! worker.
//!
//! Workers share nothing in-process: each holds its own client handles,
//! and correctness across N concurrent workers rests entirely on the
//! queue's single-visible-delivery-until-acknowledged guarantee.
//!
//! The scientific processing function itself is an opaque
//! [`JobProcessor`] implementation supplied by the caller.

pub mod processor;
pub mod telemetry;
pub mod worker;

pub use processor::JobProcessor;
pub use worker::{Worker, WorkerConfig};
