//! The opaque processing callback a worker runs per job.

use std::path::{Path, PathBuf};

use lcfleet_core::JobDescriptor;

/// The scientific processing function, treated as an external
/// collaborator: it receives the job, the fetched input file, and a
/// scratch directory, and returns the path of the result file to upload.
///
/// Implementations interpret `job.action`, `job.args`, and `job.kwargs`
/// themselves; the worker never looks inside them.
pub trait JobProcessor: Send + Sync {
    fn process(
        &self,
        job: &JobDescriptor,
        input: &Path,
        scratch: &Path,
    ) -> impl Future<Output = anyhow::Result<PathBuf>> + Send;
}
