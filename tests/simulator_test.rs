//! Integration tests for the producer/consumer simulation.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use asyncq::config::SimConfig;
use asyncq::error::{Error, Result};
use asyncq::model::{DelayRange, Message, Phase, WorkItem};
use asyncq::queue::WorkQueue;
use asyncq::sim::{SimulatedWork, Simulator, WorkHandler, consume, produce};

fn fast_config(producers: usize, consumers: usize, items: u32) -> SimConfig {
    SimConfig {
        producers,
        consumers,
        items_per_producer: items,
        queue_capacity: 0,
        produce_delay: DelayRange::new(1, 20),
        process_delay: DelayRange::new(1, 20),
    }
}

/// Counts every item it sees.
#[derive(Clone, Default)]
struct Counting(Arc<AtomicUsize>);

impl WorkHandler for Counting {
    async fn handle(&self, _consumer: &str, _item: &WorkItem) -> Result<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Ok(())
    }
}

/// Fails on one specific label.
struct FailOn(&'static str);

impl WorkHandler for FailOn {
    async fn handle(&self, _consumer: &str, item: &WorkItem) -> Result<()> {
        if item.label() == self.0 {
            return Err(Error::Handler {
                item: item.label(),
                reason: "burnt".to_string(),
            });
        }
        Ok(())
    }
}

/// Panics on the first item.
struct Explodes;

impl WorkHandler for Explodes {
    async fn handle(&self, _consumer: &str, item: &WorkItem) -> Result<()> {
        panic!("cannot process {item}");
    }
}

// ---------------------------------------------------------------------------
// Full runs
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn default_run_acknowledges_items_and_sentinels() {
    // 2 producers x 5 items, 3 consumers.
    let report = Simulator::new(SimConfig::default()).run().await.unwrap();

    assert_eq!(report.items_produced(), 10);
    assert_eq!(report.items_consumed(), 10);
    assert_eq!(report.sentinels_sent, 3);
    assert_eq!(report.acknowledged, 13);
    assert_eq!(report.tasks_completed(), 5);
    assert_eq!(report.phase, Phase::Done);

    // One sentinel reached each consumer; none was left behind or seen twice.
    assert_eq!(report.sentinels_received(), report.sentinels_sent);
    for consumer in &report.consumers {
        assert_eq!(consumer.sentinels, 1, "{} sentinel count", consumer.name);
    }
    let names: Vec<_> = report.producers.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["Producer-1", "Producer-2"]);
    let names: Vec<_> = report.consumers.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["Consumer-1", "Consumer-2", "Consumer-3"]);
}

#[tokio::test(start_paused = true)]
async fn every_produced_item_is_consumed_exactly_once() {
    let report = Simulator::new(fast_config(4, 3, 12)).run().await.unwrap();

    let mut seen: HashMap<String, usize> = HashMap::new();
    for consumer in &report.consumers {
        for item in &consumer.consumed {
            *seen.entry(item.label()).or_default() += 1;
        }
    }

    let produced: Vec<&String> = report.producers.iter().flat_map(|p| &p.produced).collect();
    assert_eq!(produced.len(), 48);
    assert_eq!(seen.len(), 48);
    for label in produced {
        assert_eq!(seen.get(label), Some(&1), "{label} not consumed exactly once");
    }
}

#[tokio::test(start_paused = true)]
async fn per_producer_order_is_preserved_for_each_consumer() {
    let report = Simulator::new(fast_config(3, 2, 20)).run().await.unwrap();

    for consumer in &report.consumers {
        let mut last: HashMap<&str, u32> = HashMap::new();
        for item in &consumer.consumed {
            if let Some(prev) = last.insert(item.producer.as_str(), item.seq) {
                assert!(
                    prev < item.seq,
                    "{} saw {}-{} after {}-{}",
                    consumer.name,
                    item.producer,
                    item.seq,
                    item.producer,
                    prev
                );
            }
        }
    }

    for producer in &report.producers {
        let expected: Vec<String> = (0..20).map(|i| format!("{}-{i}", producer.name)).collect();
        assert_eq!(producer.produced, expected);
    }
}

#[tokio::test(start_paused = true)]
async fn bounded_queue_run_completes() {
    let mut config = fast_config(3, 2, 10);
    config.queue_capacity = 1;

    let report = Simulator::new(config).run().await.unwrap();
    assert_eq!(report.items_consumed(), 30);
    assert_eq!(report.acknowledged, 32);
}

#[tokio::test(start_paused = true)]
async fn run_without_producers_only_drains_sentinels() {
    let report = Simulator::new(fast_config(0, 4, 5)).run().await.unwrap();
    assert_eq!(report.items_consumed(), 0);
    assert_eq!(report.sentinels_sent, 4);
    assert_eq!(report.sentinels_received(), 4);
    assert_eq!(report.acknowledged, 4);
}

#[tokio::test(start_paused = true)]
async fn custom_handler_sees_every_item() {
    let counting = Counting::default();
    let report = Simulator::new(fast_config(2, 3, 7))
        .run_with(counting.clone())
        .await
        .unwrap();

    assert_eq!(counting.0.load(Ordering::SeqCst), 14);
    assert_eq!(report.acknowledged, 17);
}

// ---------------------------------------------------------------------------
// Faults and validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn zero_consumers_is_rejected_up_front() {
    let err = Simulator::new(fast_config(2, 0, 5)).run().await.unwrap_err();
    assert!(matches!(err, Error::Config(_)), "got {err:?}");
}

#[tokio::test]
async fn inverted_delay_is_rejected_up_front() {
    let mut config = fast_config(1, 1, 1);
    config.process_delay = DelayRange::new(10, 1);
    let err = Simulator::new(config).run().await.unwrap_err();
    assert!(matches!(err, Error::Config(_)), "got {err:?}");
}

#[tokio::test(start_paused = true)]
async fn handler_error_aborts_the_run() {
    let err = Simulator::new(fast_config(2, 2, 5))
        .run_with(FailOn("Producer-2-3"))
        .await
        .unwrap_err();

    match err {
        Error::Handler { item, .. } => assert_eq!(item, "Producer-2-3"),
        other => panic!("expected Handler error, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn handler_panic_surfaces_as_task_error() {
    let err = Simulator::new(fast_config(1, 1, 3))
        .run_with(Explodes)
        .await
        .unwrap_err();

    match err {
        Error::Task(join) => assert!(join.is_panic()),
        other => panic!("expected Task error, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Roles in isolation
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn producer_puts_labeled_items_in_sequence() {
    let queue = Arc::new(WorkQueue::unbounded());
    let report = produce(
        Arc::clone(&queue),
        "Producer-9".to_string(),
        3,
        DelayRange::fixed(10),
    )
    .await;

    assert_eq!(report.produced, ["Producer-9-0", "Producer-9-1", "Producer-9-2"]);
    for expected in 0..3 {
        match queue.try_get() {
            Some(Message::Item(item)) => assert_eq!(item.seq, expected),
            other => panic!("expected item {expected}, got {other:?}"),
        }
    }
    assert_eq!(queue.unfinished(), 3);
}

#[tokio::test(start_paused = true)]
async fn consumer_stops_at_sentinel_and_leaves_later_messages() {
    let queue = Arc::new(WorkQueue::unbounded());
    queue.put(Message::Item(WorkItem::new("P", 0))).await;
    queue.put(Message::Shutdown).await;
    queue.put(Message::Item(WorkItem::new("P", 1))).await;

    let report = consume(
        Arc::clone(&queue),
        "Consumer-1".to_string(),
        Arc::new(SimulatedWork::new(DelayRange::fixed(5))),
    )
    .await
    .unwrap();

    assert_eq!(report.consumed.len(), 1);
    assert_eq!(report.sentinels, 1);
    // Item + sentinel acknowledged; the trailing item is still queued.
    assert_eq!(queue.total_acknowledged(), 2);
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.unfinished(), 1);
}

#[tokio::test]
async fn consumer_takes_exactly_one_sentinel() {
    let queue = Arc::new(WorkQueue::unbounded());
    queue.put(Message::Shutdown).await;
    queue.put(Message::Shutdown).await;

    let report = consume(
        Arc::clone(&queue),
        "Consumer-1".to_string(),
        Arc::new(SimulatedWork::new(DelayRange::fixed(0))),
    )
    .await
    .unwrap();

    assert!(report.consumed.is_empty());
    assert_eq!(report.sentinels, 1);
    // The second sentinel is still waiting for another consumer.
    assert_eq!(queue.try_get(), Some(Message::Shutdown));
    assert_eq!(queue.total_acknowledged(), 1);
}
