//! Consumer role: drains the shared queue until it receives a sentinel.

use std::sync::Arc;
use std::time::Instant;

use opentelemetry::KeyValue;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::model::{ConsumerReport, DelayRange, Message, WorkItem};
use crate::queue::WorkQueue;
use crate::telemetry::metrics;

/// The processing step a consumer runs for each work item.
pub trait WorkHandler: Send + Sync + 'static {
    fn handle(&self, consumer: &str, item: &WorkItem) -> impl Future<Output = Result<()>> + Send;
}

/// Default handler: pretend to work by sleeping for a random delay.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedWork {
    pub delay: DelayRange,
}

impl SimulatedWork {
    pub fn new(delay: DelayRange) -> Self {
        Self { delay }
    }
}

impl WorkHandler for SimulatedWork {
    async fn handle(&self, _consumer: &str, _item: &WorkItem) -> Result<()> {
        let pause = self.delay.sample();
        tokio::time::sleep(pause).await;
        Ok(())
    }
}

/// Pull messages until a `Shutdown` sentinel arrives.
///
/// Every retrieved message is acknowledged exactly once, including the
/// sentinel and an item whose handler failed. A handler error ends the
/// consumer and is returned to the caller.
pub async fn consume<H: WorkHandler>(
    queue: Arc<WorkQueue<Message>>,
    name: String,
    handler: Arc<H>,
) -> Result<ConsumerReport> {
    let consumed_counter = metrics::items_consumed();
    let ack_counter = metrics::acknowledged();
    let duration = metrics::processing_duration_ms();
    let mut consumed = Vec::new();
    let mut sentinels = 0;

    loop {
        let item = match queue.get().await {
            Message::Shutdown => {
                queue.task_done()?;
                sentinels += 1;
                ack_counter.add(1, &[KeyValue::new("kind", "sentinel")]);
                debug!(consumer = %name, consumed = consumed.len(), "received shutdown sentinel");
                break;
            }
            Message::Item(item) => item,
        };

        info!("{name} consumed: {item}");
        let started = Instant::now();
        let outcome = handler.handle(&name, &item).await;
        queue.task_done()?;
        ack_counter.add(1, &[KeyValue::new("kind", "item")]);

        if let Err(e) = outcome {
            warn!(consumer = %name, item = %item, "handler failed: {e}");
            return Err(e);
        }

        duration.record(
            started.elapsed().as_secs_f64() * 1000.0,
            &[KeyValue::new("consumer", name.clone())],
        );
        consumed_counter.add(1, &[KeyValue::new("consumer", name.clone())]);
        consumed.push(item);
    }

    Ok(ConsumerReport {
        name,
        consumed,
        sentinels,
    })
}
