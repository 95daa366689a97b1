//! Object-store backend contract — injected for testability.

use std::path::Path;

use lcfleet_core::ProviderError;

/// Acknowledgment of a delete, as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteAck {
    /// Whether the provider placed a delete marker for the object.
    pub delete_marker: bool,
}

/// The raw get/put/delete primitives of a bucketed blob store.
///
/// Implementations perform exactly one provider call per method; fallback
/// chains and failure policy live in [`crate::ObjectStore`].
pub trait ObjectStoreBackend: Send + Sync {
    /// Download `bucket/key` to the local path `dest`.
    fn download(
        &self,
        bucket: &str,
        key: &str,
        dest: &Path,
    ) -> impl Future<Output = Result<(), ProviderError>> + Send;

    /// Upload the local file at `local` to `bucket/key`.
    fn upload(
        &self,
        local: &Path,
        bucket: &str,
        key: &str,
    ) -> impl Future<Output = Result<(), ProviderError>> + Send;

    /// Delete `bucket/key`.
    fn delete(
        &self,
        bucket: &str,
        key: &str,
    ) -> impl Future<Output = Result<DeleteAck, ProviderError>> + Send;
}
