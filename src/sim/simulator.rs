//! Simulator: owns the producer/consumer lifecycle.
//!
//! running  -> all producers finish
//! draining -> one sentinel per consumer, all consumers exit
//! joined   -> the queue reports zero outstanding acknowledgments
//! done
//!
//! The first failing task aborts the rest of the run.

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{Instrument, Span, info};

use crate::config::SimConfig;
use crate::error::Result;
use crate::model::{ConsumerReport, Message, Phase, ProducerReport, RunId, SimulationReport};
use crate::queue::WorkQueue;
use crate::telemetry::metrics;
use crate::telemetry::run::{record_phase, start_role_span, start_run_span};

use super::consumer::{SimulatedWork, WorkHandler, consume};
use super::producer::produce;

/// Tasks tag their result with their spawn index so reports come back in
/// spawn order regardless of completion order.
type Indexed<T> = Result<(usize, T)>;

/// Drives one producer/consumer run.
#[derive(Debug, Clone)]
pub struct Simulator {
    config: SimConfig,
}

impl Simulator {
    pub fn new(config: SimConfig) -> Self {
        Self { config }
    }

    /// Run with the default [`SimulatedWork`] handler.
    pub async fn run(&self) -> Result<SimulationReport> {
        self.run_with(SimulatedWork::new(self.config.process_delay))
            .await
    }

    /// Run with a custom processing step.
    pub async fn run_with<H: WorkHandler>(&self, handler: H) -> Result<SimulationReport> {
        self.config.validate()?;

        let run_id = RunId::new();
        let span = start_run_span(run_id, self.config.producers, self.config.consumers);

        self.drive(run_id, Arc::new(handler), span.clone())
            .instrument(span)
            .await
    }

    async fn drive<H: WorkHandler>(
        &self,
        run_id: RunId,
        handler: Arc<H>,
        span: Span,
    ) -> Result<SimulationReport> {
        let cfg = &self.config;
        let started = Instant::now();
        let queue: Arc<WorkQueue<Message>> = Arc::new(WorkQueue::bounded(cfg.queue_capacity));

        span.record("sim.phase", tracing::field::display(Phase::Running));
        info!(
            producers = cfg.producers,
            consumers = cfg.consumers,
            items_per_producer = cfg.items_per_producer,
            capacity = cfg.queue_capacity,
            "simulation started"
        );

        let mut producers: JoinSet<Indexed<ProducerReport>> = JoinSet::new();
        for idx in 0..cfg.producers {
            let name = format!("Producer-{}", idx + 1);
            let role_span = start_role_span("producer", &name);
            let fut = produce(
                Arc::clone(&queue),
                name,
                cfg.items_per_producer,
                cfg.produce_delay,
            );
            producers.spawn(async move { Ok((idx, fut.await)) }.instrument(role_span));
        }

        let mut consumers: JoinSet<Indexed<ConsumerReport>> = JoinSet::new();
        for idx in 0..cfg.consumers {
            let name = format!("Consumer-{}", idx + 1);
            let role_span = start_role_span("consumer", &name);
            let fut = consume(Arc::clone(&queue), name, Arc::clone(&handler));
            consumers.spawn(async move { fut.await.map(|r| (idx, r)) }.instrument(role_span));
        }

        let mut producer_slots = empty_slots(cfg.producers);
        let mut consumer_slots = empty_slots(cfg.consumers);

        // Wait for every producer. A consumer can only exit this early by
        // failing, so watch them too rather than discovering it later.
        while !producers.is_empty() {
            tokio::select! {
                Some(joined) = producers.join_next() => {
                    let (idx, report) = joined??;
                    producer_slots[idx] = Some(report);
                }
                Some(joined) = consumers.join_next() => {
                    let (idx, report) = joined??;
                    consumer_slots[idx] = Some(report);
                }
            }
        }

        record_phase(&span, Phase::Running, Phase::Draining)?;

        // Exactly one sentinel per consumer. On a bounded queue these puts
        // can wait on consumers, so keep reaping consumers meanwhile.
        let sentinels = cfg.consumers as u32;
        let send_sentinels = async {
            for _ in 0..sentinels {
                queue.put(Message::Shutdown).await;
            }
        };
        tokio::pin!(send_sentinels);
        let mut sent = false;

        while !sent || !consumers.is_empty() {
            tokio::select! {
                () = &mut send_sentinels, if !sent => {
                    sent = true;
                    metrics::sentinels_sent().add(u64::from(sentinels), &[]);
                    info!(sentinels, "shutdown sentinels sent");
                }
                Some(joined) = consumers.join_next() => {
                    let (idx, report) = joined??;
                    consumer_slots[idx] = Some(report);
                }
            }
        }

        queue.join().await;
        record_phase(&span, Phase::Draining, Phase::Joined)?;

        let report = SimulationReport {
            run_id,
            producers: producer_slots.into_iter().flatten().collect(),
            consumers: consumer_slots.into_iter().flatten().collect(),
            sentinels_sent: sentinels,
            acknowledged: queue.total_acknowledged(),
            elapsed_ms: started.elapsed().as_millis() as u64,
            phase: Phase::Done,
        };
        record_phase(&span, Phase::Joined, Phase::Done)?;

        info!(
            produced = report.items_produced(),
            consumed = report.items_consumed(),
            acknowledged = report.acknowledged,
            elapsed_ms = report.elapsed_ms,
            "All done!!"
        );
        Ok(report)
    }
}

fn empty_slots<T>(n: usize) -> Vec<Option<T>> {
    (0..n).map(|_| None).collect()
}
