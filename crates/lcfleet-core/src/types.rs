//! Domain types shared across the lcfleet crates.
//!
//! A [`JobDescriptor`] is the unit of work handed from a producer to a
//! worker through the queue. It is serialized to canonical JSON for
//! transport and is immutable once enqueued. Inputs and outputs are
//! addressed by [`ObjectLocator`] (`store://bucket/key`).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The `store://` URL scheme used for object-store addressing.
pub const LOCATOR_SCHEME: &str = "store://";

/// One unit of work: which object to process, what to do with it, and
/// where the results go.
///
/// Consumed verbatim by the worker; this layer never interprets `action`,
/// `args`, or `kwargs` — they are the opaque contract between the producer
/// and the processing callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptor {
    /// Locator of the input object, e.g. `store://lightcurves/lc1.csv`.
    pub target: String,
    /// The processing action, e.g. `runpf`. By convention the queue that
    /// carries this job has the action as its name suffix; the convention
    /// is never validated here.
    pub action: String,
    /// Positional arguments for the action.
    #[serde(default)]
    pub args: Vec<serde_json::Value>,
    /// Keyword arguments for the action.
    #[serde(default)]
    pub kwargs: serde_json::Map<String, serde_json::Value>,
    /// Bucket the result object is written to.
    pub outbucket: String,
    /// Optional queue a result descriptor is enqueued to after processing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outqueue: Option<String>,
}

impl JobDescriptor {
    /// Serialize to the canonical queue-transport encoding.
    pub fn to_canonical_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from a queue message body.
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    /// Parse the `target` field as an object locator.
    pub fn target_locator(&self) -> Result<ObjectLocator, LocatorError> {
        self.target.parse()
    }
}

/// Error parsing a `store://bucket/key` locator.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LocatorError {
    #[error("locator does not start with `{LOCATOR_SCHEME}`: {0}")]
    MissingScheme(String),
    #[error("locator has no key component: {0}")]
    MissingKey(String),
}

/// Address of one object in the store: a bucket plus a key within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectLocator {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocator {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// The final path component of the key, used as the local filename
    /// when an object is fetched by locator.
    pub fn basename(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

impl std::str::FromStr for ObjectLocator {
    type Err = LocatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix(LOCATOR_SCHEME)
            .ok_or_else(|| LocatorError::MissingScheme(s.to_string()))?;
        let (bucket, key) = rest
            .split_once('/')
            .ok_or_else(|| LocatorError::MissingKey(s.to_string()))?;
        if bucket.is_empty() || key.is_empty() {
            return Err(LocatorError::MissingKey(s.to_string()));
        }
        Ok(Self::new(bucket, key))
    }
}

impl std::fmt::Display for ObjectLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{LOCATOR_SCHEME}{}/{}", self.bucket, self.key)
    }
}

/// Build the conventional queue name for an action: `<prefix>-<action>`.
///
/// Producer/consumer contract only — nothing in the queue layer checks
/// that a queue's messages match its action suffix.
pub fn queue_name_for_action(prefix: &str, action: &str) -> String {
    format!("{prefix}-{action}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_job() -> JobDescriptor {
        JobDescriptor {
            target: "store://lightcurves/lc1.csv".to_string(),
            action: "runpf".to_string(),
            args: vec![],
            kwargs: serde_json::Map::new(),
            outbucket: "results".to_string(),
            outqueue: None,
        }
    }

    #[test]
    fn job_round_trips_through_canonical_json() {
        let job = test_job();
        let body = job.to_canonical_json().unwrap();
        let back = JobDescriptor::from_json(&body).unwrap();
        assert_eq!(back, job);
    }

    #[test]
    fn absent_outqueue_is_omitted_from_encoding() {
        let body = test_job().to_canonical_json().unwrap();
        assert!(!body.contains("outqueue"));
    }

    #[test]
    fn missing_args_and_kwargs_default_to_empty() {
        let body = r#"{"target":"store://b/k","action":"runpf","outbucket":"results"}"#;
        let job = JobDescriptor::from_json(body).unwrap();
        assert!(job.args.is_empty());
        assert!(job.kwargs.is_empty());
        assert_eq!(job.outqueue, None);
    }

    #[test]
    fn locator_parse_and_display() {
        let loc: ObjectLocator = "store://lightcurves/tess/lc1.csv".parse().unwrap();
        assert_eq!(loc.bucket, "lightcurves");
        assert_eq!(loc.key, "tess/lc1.csv");
        assert_eq!(loc.basename(), "lc1.csv");
        assert_eq!(loc.to_string(), "store://lightcurves/tess/lc1.csv");
    }

    #[test]
    fn locator_rejects_bad_inputs() {
        assert!(matches!(
            "https://x/y".parse::<ObjectLocator>(),
            Err(LocatorError::MissingScheme(_))
        ));
        assert!(matches!(
            "store://bucketonly".parse::<ObjectLocator>(),
            Err(LocatorError::MissingKey(_))
        ));
        assert!(matches!(
            "store:///nokey".parse::<ObjectLocator>(),
            Err(LocatorError::MissingKey(_))
        ));
    }

    #[test]
    fn queue_name_carries_action_suffix() {
        assert_eq!(queue_name_for_action("lcfleet-queue", "runpf"), "lcfleet-queue-runpf");
    }
}
