//! Producer role: emits a fixed number of labeled items at random intervals.

use std::sync::Arc;

use opentelemetry::KeyValue;
use tracing::info;

use crate::model::{DelayRange, Message, ProducerReport, WorkItem};
use crate::queue::WorkQueue;
use crate::telemetry::metrics;

/// Put `count` items labeled `{name}-{seq}` on the queue, sleeping a random
/// `delay` before each one.
///
/// Items from one producer enter the queue in sequence order.
pub async fn produce(
    queue: Arc<WorkQueue<Message>>,
    name: String,
    count: u32,
    delay: DelayRange,
) -> ProducerReport {
    let counter = metrics::items_produced();
    let mut produced = Vec::with_capacity(count as usize);

    for seq in 0..count {
        tokio::time::sleep(delay.sample()).await;

        let item = WorkItem::new(name.as_str(), seq);
        let label = item.label();
        queue.put(Message::Item(item)).await;

        info!("{name} produced: {label}");
        counter.add(1, &[KeyValue::new("producer", name.clone())]);
        produced.push(label);
    }

    ProducerReport { name, produced }
}
