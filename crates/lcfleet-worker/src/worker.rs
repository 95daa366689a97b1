//! The worker loop: dequeue, fetch, process, store, acknowledge.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use lcfleet_core::JobDescriptor;
use lcfleet_queue::{QueueBackend, QueueHandle, QueueMessage, WorkQueue};
use lcfleet_store::{ObjectStore, ObjectStoreBackend};

use crate::processor::JobProcessor;

/// Tunables for one worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Jobs to pull per long-poll.
    pub max_items: u32,
    /// Long-poll wait per dequeue.
    pub wait: Duration,
    /// Alternate extensions tried when the primary input key misses.
    pub altexts: Vec<String>,
    /// When set, jobs whose `action` differs are dropped (acknowledged
    /// without processing) instead of being redelivered forever.
    pub expected_action: Option<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_items: 1,
            wait: Duration::from_secs(5),
            altexts: Vec::new(),
            expected_action: None,
        }
    }
}

/// One queue consumer. Holds its own client handles and shares no
/// in-process state with other workers.
pub struct Worker<S, Q, P> {
    store: ObjectStore<S>,
    queue: WorkQueue<Q>,
    in_queue: QueueHandle,
    processor: P,
    workdir: PathBuf,
    config: WorkerConfig,
}

impl<S, Q, P> Worker<S, Q, P>
where
    S: ObjectStoreBackend,
    Q: QueueBackend,
    P: JobProcessor,
{
    pub fn new(
        store: ObjectStore<S>,
        queue: WorkQueue<Q>,
        in_queue: QueueHandle,
        processor: P,
        workdir: PathBuf,
    ) -> Self {
        Self {
            store,
            queue,
            in_queue,
            processor,
            workdir,
            config: WorkerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    /// One dequeue/process cycle. Returns the number of jobs completed
    /// and acknowledged; every failure is logged, never raised, so the
    /// loop around this call cannot be aborted by a single bad job.
    pub async fn run_once(&self) -> usize {
        let messages = match self
            .queue
            .dequeue(&self.in_queue, self.config.max_items, self.config.wait)
            .await
        {
            Ok(Some(messages)) => messages,
            // Failed poll (already logged by the client) or hard error.
            Ok(None) => return 0,
            Err(e) => {
                error!(queue = %self.in_queue.url, error = %e, "dequeue failed");
                return 0;
            }
        };

        let mut completed = 0;
        for message in messages {
            if let Some(expected) = &self.config.expected_action {
                if &message.item.action != expected {
                    // A mismatched action on a dedicated queue is a
                    // producer bug; drop it rather than spin on redelivery.
                    error!(
                        message_id = %message.id,
                        action = %message.item.action,
                        %expected,
                        "dropping job with mismatched action"
                    );
                    self.ack(&message).await;
                    continue;
                }
            }

            match self.process_message(&message).await {
                Ok(()) => {
                    self.ack(&message).await;
                    completed += 1;
                }
                Err(e) => {
                    // Leave unacknowledged: the visibility window will
                    // hand the job to another worker.
                    warn!(
                        message_id = %message.id,
                        target = %message.item.target,
                        error = %e,
                        "job failed; leaving message for redelivery"
                    );
                }
            }
        }
        completed
    }

    /// Consume the queue until `shutdown` is signalled.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(queue = %self.in_queue.url, "worker loop starting");
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!(queue = %self.in_queue.url, "worker loop shutting down");
                    break;
                }
                completed = self.run_once() => {
                    if completed > 0 {
                        debug!(completed, "batch complete");
                    }
                }
            }
        }
    }

    async fn process_message(&self, message: &QueueMessage) -> anyhow::Result<()> {
        let job = &message.item;
        let locator = job.target_locator().context("unparseable job target")?;

        let scratch = self.workdir.join(&message.id);
        tokio::fs::create_dir_all(&scratch)
            .await
            .context("could not create scratch directory")?;

        let altexts: Vec<&str> = self.config.altexts.iter().map(String::as_str).collect();
        let altexts = (!altexts.is_empty()).then_some(altexts.as_slice());
        let input = self
            .store
            .fetch_locator(&locator, &scratch, altexts)
            .await?
            .with_context(|| format!("input object missing: {locator}"))?;

        let result = self
            .processor
            .process(job, &input, &scratch)
            .await
            .context("processing failed")?;

        let result_locator = self
            .store
            .store(&result, &job.outbucket)
            .await?
            .with_context(|| format!("could not store result in {}", job.outbucket))?;
        info!(
            message_id = %message.id,
            result = %result_locator,
            "job processed"
        );

        if let Some(outqueue) = &job.outqueue {
            self.announce_result(job, &result_locator.to_string(), outqueue)
                .await?;
        }

        // Scratch cleanup is best-effort.
        if let Err(e) = tokio::fs::remove_dir_all(&scratch).await {
            debug!(scratch = %scratch.display(), error = %e, "could not remove scratch directory");
        }
        Ok(())
    }

    /// Enqueue a result descriptor to the job's outqueue.
    async fn announce_result(
        &self,
        job: &JobDescriptor,
        result_target: &str,
        outqueue: &str,
    ) -> anyhow::Result<()> {
        let handle = self
            .queue
            .create_queue(outqueue, None)
            .await?
            .with_context(|| format!("could not open outqueue {outqueue}"))?;

        let descriptor = JobDescriptor {
            target: result_target.to_string(),
            action: job.action.clone(),
            args: Vec::new(),
            kwargs: Default::default(),
            outbucket: job.outbucket.clone(),
            outqueue: None,
        };
        self.queue
            .enqueue(&handle, &descriptor, Duration::ZERO)
            .await?
            .with_context(|| format!("could not enqueue result to {outqueue}"))?;
        Ok(())
    }

    async fn ack(&self, message: &QueueMessage) {
        if let Err(e) = self
            .queue
            .acknowledge(&self.in_queue, &message.receipt_token)
            .await
        {
            warn!(message_id = %message.id, error = %e, "could not acknowledge message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::Path;

    use lcfleet_queue::memory::ATTR_VISIBILITY_SECS;
    use lcfleet_queue::MemoryQueue;
    use lcfleet_store::MemoryObjectStore;

    /// Counts rows in the input and writes `<stem>-pf.json` to scratch.
    struct RowCounter;

    impl JobProcessor for RowCounter {
        fn process(
            &self,
            _job: &JobDescriptor,
            input: &Path,
            scratch: &Path,
        ) -> impl Future<Output = anyhow::Result<PathBuf>> + Send {
            async move {
                let data = tokio::fs::read_to_string(input).await?;
                let stem = input
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let out = scratch.join(format!("{stem}-pf.json"));
                let report = serde_json::json!({ "rows": data.lines().count() });
                tokio::fs::write(&out, report.to_string()).await?;
                Ok(out)
            }
        }
    }

    struct AlwaysFails;

    impl JobProcessor for AlwaysFails {
        fn process(
            &self,
            _job: &JobDescriptor,
            _input: &Path,
            _scratch: &Path,
        ) -> impl Future<Output = anyhow::Result<PathBuf>> + Send {
            async { Err(anyhow::anyhow!("solver diverged")) }
        }
    }

    struct Harness {
        store_backend: MemoryObjectStore,
        queue_backend: MemoryQueue,
        in_queue: QueueHandle,
        _workdir: tempfile::TempDir,
    }

    async fn harness(visibility_secs: &str) -> Harness {
        let queue_backend = MemoryQueue::new();
        let client = WorkQueue::new(queue_backend.clone());
        let mut attrs = HashMap::new();
        attrs.insert(ATTR_VISIBILITY_SECS.to_string(), visibility_secs.to_string());
        let in_queue = client
            .create_queue("lcfleet-queue-runpf", Some(&attrs))
            .await
            .unwrap()
            .unwrap();
        Harness {
            store_backend: MemoryObjectStore::new(),
            queue_backend,
            in_queue,
            _workdir: tempfile::tempdir().unwrap(),
        }
    }

    impl Harness {
        fn worker<P: JobProcessor>(&self, processor: P) -> Worker<MemoryObjectStore, MemoryQueue, P> {
            Worker::new(
                ObjectStore::new(self.store_backend.clone()),
                WorkQueue::new(self.queue_backend.clone()),
                self.in_queue.clone(),
                processor,
                self._workdir.path().to_path_buf(),
            )
        }

        async fn submit(&self, job: &JobDescriptor) {
            WorkQueue::new(self.queue_backend.clone())
                .enqueue(&self.in_queue, job, Duration::ZERO)
                .await
                .unwrap()
                .unwrap();
        }
    }

    fn runpf_job() -> JobDescriptor {
        JobDescriptor {
            target: "store://lightcurves/lc1.csv".to_string(),
            action: "runpf".to_string(),
            args: vec![],
            kwargs: serde_json::Map::new(),
            outbucket: "results".to_string(),
            outqueue: None,
        }
    }

    fn short_wait() -> WorkerConfig {
        WorkerConfig {
            wait: Duration::from_millis(100),
            ..WorkerConfig::default()
        }
    }

    #[tokio::test]
    async fn processes_a_job_end_to_end() {
        let h = harness("3600").await;
        h.store_backend
            .put_object("lightcurves", "lc1.csv", b"t,mag\n1,2\n".to_vec());
        h.submit(&runpf_job()).await;

        let worker = h.worker(RowCounter).with_config(short_wait());
        assert_eq!(worker.run_once().await, 1);

        assert!(h.store_backend.contains("results", "lc1-pf.json"));
        // Acknowledged: nothing left to redeliver.
        assert_eq!(h.queue_backend.depth(&h.in_queue.url), 0);
    }

    #[tokio::test]
    async fn result_descriptor_lands_on_the_outqueue() {
        let h = harness("3600").await;
        h.store_backend
            .put_object("lightcurves", "lc1.csv", b"t,mag\n".to_vec());
        let mut job = runpf_job();
        job.outqueue = Some("lcfleet-queue-runpf-done".to_string());
        h.submit(&job).await;

        let worker = h.worker(RowCounter).with_config(short_wait());
        assert_eq!(worker.run_once().await, 1);

        let client = WorkQueue::new(h.queue_backend.clone());
        let done = client
            .create_queue("lcfleet-queue-runpf-done", None)
            .await
            .unwrap()
            .unwrap();
        let messages = client
            .dequeue(&done, 1, Duration::from_millis(100))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].item.target, "store://results/lc1-pf.json");
        assert_eq!(messages[0].item.action, "runpf");
        assert!(messages[0].item.outqueue.is_none());
    }

    #[tokio::test]
    async fn failed_job_is_left_for_redelivery() {
        let h = harness("0").await;
        h.store_backend
            .put_object("lightcurves", "lc1.csv", b"t,mag\n".to_vec());
        h.submit(&runpf_job()).await;

        let worker = h.worker(AlwaysFails).with_config(short_wait());
        assert_eq!(worker.run_once().await, 0);

        // Unacknowledged: the message survives and becomes visible again.
        assert_eq!(h.queue_backend.depth(&h.in_queue.url), 1);
        assert_eq!(worker.run_once().await, 0);
    }

    #[tokio::test]
    async fn missing_input_leaves_the_message() {
        let h = harness("3600").await;
        h.submit(&runpf_job()).await;

        let worker = h.worker(RowCounter).with_config(short_wait());
        assert_eq!(worker.run_once().await, 0);
        assert_eq!(h.queue_backend.depth(&h.in_queue.url), 1);
    }

    #[tokio::test]
    async fn mismatched_action_is_dropped_not_retried() {
        let h = harness("0").await;
        let mut job = runpf_job();
        job.action = "periodfind".to_string();
        h.submit(&job).await;

        let config = WorkerConfig {
            expected_action: Some("runpf".to_string()),
            ..short_wait()
        };
        let worker = h.worker(RowCounter).with_config(config);
        assert_eq!(worker.run_once().await, 0);
        // Acknowledged on drop, so it cannot poison the queue.
        assert_eq!(h.queue_backend.depth(&h.in_queue.url), 0);
    }

    #[tokio::test]
    async fn alternate_extensions_reach_the_processor() {
        let h = harness("3600").await;
        h.store_backend
            .put_object("lightcurves", "lc1.fits", b"t,mag\n1,2\n".to_vec());
        h.submit(&runpf_job()).await;

        let config = WorkerConfig {
            altexts: vec![".fits".to_string()],
            ..short_wait()
        };
        let worker = h.worker(RowCounter).with_config(config);
        assert_eq!(worker.run_once().await, 1);
        assert!(h.store_backend.contains("results", "lc1-pf.json"));
    }

    #[tokio::test]
    async fn run_stops_on_shutdown_signal() {
        let h = harness("3600").await;
        let worker = h.worker(RowCounter).with_config(WorkerConfig {
            wait: Duration::from_millis(10),
            ..WorkerConfig::default()
        });

        let (tx, rx) = watch::channel(false);
        let loop_task = async { worker.run(rx).await };
        let stop_task = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            tx.send(true).unwrap();
        };
        tokio::time::timeout(Duration::from_secs(5), async {
            tokio::join!(loop_task, stop_task)
        })
        .await
        .expect("worker loop did not stop on shutdown");
    }
}
