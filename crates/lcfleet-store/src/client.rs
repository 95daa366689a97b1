//! The object-store client: backend + failure policy + fallback chain.

use std::path::{Path, PathBuf};

use tracing::{error, info};

use lcfleet_core::{FailMode, ObjectLocator, ProviderError};

use crate::backend::ObjectStoreBackend;
use crate::error::{StoreError, StoreResult};

/// Client for fetching, storing, and removing named blobs.
///
/// Ordinary reusable value: construct one and thread it through as many
/// calls as needed. Under [`FailMode::Soft`] (the default) provider
/// failures are logged and reported as `Ok(None)`; under
/// [`FailMode::Hard`] they propagate as [`StoreError`]. Provider
/// rejections are typed errors in either mode.
#[derive(Debug, Clone)]
pub struct ObjectStore<B> {
    backend: B,
    fail_mode: FailMode,
}

impl<B: ObjectStoreBackend> ObjectStore<B> {
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

    /// Fetch `bucket/key` to `dest`.
    ///
    /// On a miss, each extension in `altexts` is tried in order — the
    /// extension is substituted in both the key and the destination
    /// filename — and the first hit wins. Exhausting the chain is
    /// `NotFound`: `Ok(None)` under soft-fail, an error under hard-fail.
    pub async fn fetch(
        &self,
        bucket: &str,
        key: &str,
        dest: &Path,
        altexts: Option<&[&str]>,
    ) -> StoreResult<Option<PathBuf>> {
        let primary = match self.backend.download(bucket, key, dest).await {
            Ok(()) => return Ok(Some(dest.to_path_buf())),
            Err(e) if e.is_rejection() => return Err(e.into()),
            Err(e) => e,
        };

        for alt in altexts.unwrap_or_default() {
            let alt_key = swap_extension(key, alt);
            let alt_dest = swap_path_extension(dest, alt);
            match self.backend.download(bucket, &alt_key, &alt_dest).await {
                Ok(()) => {
                    info!(%bucket, key = %alt_key, "fetched alternate-extension variant");
                    return Ok(Some(alt_dest));
                }
                Err(e) if e.is_rejection() => return Err(e.into()),
                Err(_) => continue,
            }
        }

        error!(%bucket, %key, error = %primary, "could not fetch object");
        match self.fail_mode {
            // A missing key with an exhausted fallback chain is NotFound;
            // any other failure keeps its cause.
            FailMode::Hard => match primary {
                ProviderError::NotFound(_) => Err(StoreError::NotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                }),
                source => Err(StoreError::Fetch {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    source,
                }),
            },
            FailMode::Soft => Ok(None),
        }
    }

    /// Fetch an object addressed by a `store://` locator, downloading it
    /// into `dest_dir` under the key's basename.
    pub async fn fetch_locator(
        &self,
        locator: &ObjectLocator,
        dest_dir: &Path,
        altexts: Option<&[&str]>,
    ) -> StoreResult<Option<PathBuf>> {
        let dest = dest_dir.join(locator.basename());
        self.fetch(&locator.bucket, &locator.key, &dest, altexts)
            .await
    }

    /// Upload a local file to `bucket`; the destination key is the file's
    /// basename. Returns the `store://` locator of the uploaded object.
    pub async fn store(&self, local: &Path, bucket: &str) -> StoreResult<Option<ObjectLocator>> {
        let key = local
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        match self.backend.upload(local, bucket, &key).await {
            Ok(()) => Ok(Some(ObjectLocator::new(bucket, key))),
            Err(e) if e.is_rejection() => Err(e.into()),
            Err(e) => {
                error!(path = %local.display(), %bucket, error = %e, "could not upload object");
                match self.fail_mode {
                    FailMode::Hard => Err(StoreError::Upload {
                        path: local.display().to_string(),
                        bucket: bucket.to_string(),
                        source: e,
                    }),
                    FailMode::Soft => Ok(None),
                }
            }
        }
    }

    /// Delete `bucket/key`; returns the provider's delete marker.
    pub async fn remove(&self, bucket: &str, key: &str) -> StoreResult<Option<bool>> {
        match self.backend.delete(bucket, key).await {
            Ok(ack) => Ok(Some(ack.delete_marker)),
            Err(e) if e.is_rejection() => Err(e.into()),
            Err(e) => {
                error!(%bucket, %key, error = %e, "could not delete object");
                match self.fail_mode {
                    FailMode::Hard => Err(StoreError::Delete {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                        source: e,
                    }),
                    FailMode::Soft => Ok(None),
                }
            }
        }
    }
}

/// Replace the final extension of `name` with `alt` (which carries its
/// own leading dot, or is empty to strip the extension entirely).
fn swap_extension(name: &str, alt: &str) -> String {
    match name.rfind('.') {
        Some(dot) => format!("{}{alt}", &name[..dot]),
        None => format!("{name}{alt}"),
    }
}

fn swap_path_extension(path: &Path, alt: &str) -> PathBuf {
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match path.parent() {
        Some(parent) => parent.join(swap_extension(&file, alt)),
        None => PathBuf::from(swap_extension(&file, alt)),
    }
}
