//! End-to-end hand-off scenario: one producer, one consumer, one queue.

use std::collections::HashMap;
use std::time::Duration;

use lcfleet_core::{queue_name_for_action, JobDescriptor};
use lcfleet_queue::memory::ATTR_VISIBILITY_SECS;
use lcfleet_queue::{MemoryQueue, WorkQueue};

#[tokio::test]
async fn runpf_job_hand_off() {
    let client = WorkQueue::new(MemoryQueue::new());

    // Per-action queue, window long enough that the unexpired case is
    // unambiguous.
    let mut attrs = HashMap::new();
    attrs.insert(ATTR_VISIBILITY_SECS.to_string(), "3600".to_string());
    let handle = client
        .create_queue(&queue_name_for_action("queue", "runpf"), Some(&attrs))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(handle.name, "queue-runpf");

    let job = JobDescriptor {
        target: "store://bucket/lc1.csv".to_string(),
        action: "runpf".to_string(),
        args: vec![],
        kwargs: serde_json::Map::new(),
        outbucket: "results".to_string(),
        outqueue: None,
    };
    client
        .enqueue(&handle, &job, Duration::ZERO)
        .await
        .unwrap()
        .unwrap();

    // One message, payload equal to the original record, non-empty receipt.
    let messages = client
        .dequeue(&handle, 1, Duration::from_millis(200))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].item, job);
    assert!(!messages[0].receipt_token.is_empty());

    client
        .acknowledge(&handle, &messages[0].receipt_token)
        .await
        .unwrap();

    // Acknowledged: a second immediate dequeue comes back empty.
    let again = client
        .dequeue(&handle, 1, Duration::from_millis(50))
        .await
        .unwrap()
        .unwrap();
    assert!(again.is_empty());
}
