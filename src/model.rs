//! Core data model.
//!
//! A work item is an opaque label (producer name + sequence index). Items
//! travel through the queue wrapped in a [`Message`]; the `Shutdown`
//! variant is the sentinel that tells one consumer to stop.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Work Item
// ---------------------------------------------------------------------------

/// A unit of work generated by a producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Name of the producer that generated this item.
    pub producer: String,

    /// Position in the producer's stream, starting at 0.
    pub seq: u32,

    pub produced_at: DateTime<Utc>,
}

impl WorkItem {
    pub fn new(producer: impl Into<String>, seq: u32) -> Self {
        Self {
            producer: producer.into(),
            seq,
            produced_at: Utc::now(),
        }
    }

    /// The `"{producer}-{seq}"` label.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for WorkItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.producer, self.seq)
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// What actually sits in the shared queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Item(WorkItem),
    /// No more work will arrive for the consumer that receives this.
    Shutdown,
}

// ---------------------------------------------------------------------------
// Run identity
// ---------------------------------------------------------------------------

/// Newtype for simulation run IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short display: first 8 chars of UUID
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Delay
// ---------------------------------------------------------------------------

/// A uniform random delay, in milliseconds, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// A range that always yields the same delay.
    pub const fn fixed(ms: u64) -> Self {
        Self::new(ms, ms)
    }

    pub fn validate(&self, what: &str) -> Result<()> {
        if self.min_ms > self.max_ms {
            return Err(Error::Config(format!(
                "{what}: min_ms ({}) is greater than max_ms ({})",
                self.min_ms, self.max_ms
            )));
        }
        Ok(())
    }

    /// Draw one delay. Never call this with the thread RNG held across an await.
    pub fn sample(&self) -> Duration {
        if self.min_ms >= self.max_ms {
            return Duration::from_millis(self.min_ms);
        }
        Duration::from_millis(rand::rng().random_range(self.min_ms..=self.max_ms))
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Lifecycle of a simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Producers and consumers are running.
    Running,
    /// Producers finished, sentinels sent, consumers winding down.
    Draining,
    /// All consumers exited and the queue reported zero outstanding work.
    Joined,
    Done,
}

impl Phase {
    /// Can transition from self to `to`?
    pub fn can_transition_to(self, to: Phase) -> bool {
        use Phase::*;
        matches!(
            (self, to),
            (Running, Draining) | (Draining, Joined) | (Joined, Done)
        )
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::Running => "running",
            Phase::Draining => "draining",
            Phase::Joined => "joined",
            Phase::Done => "done",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// What one producer did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProducerReport {
    pub name: String,
    /// Labels in the order they were put.
    pub produced: Vec<String>,
}

/// What one consumer did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerReport {
    pub name: String,
    /// Items in the order this consumer retrieved them.
    pub consumed: Vec<WorkItem>,
    /// Sentinels this consumer received and acknowledged.
    pub sentinels: u32,
}

/// Outcome of a full simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub run_id: RunId,
    pub producers: Vec<ProducerReport>,
    pub consumers: Vec<ConsumerReport>,
    pub sentinels_sent: u32,
    /// Acknowledgments recorded by the queue, sentinels included.
    pub acknowledged: u64,
    pub elapsed_ms: u64,
    pub phase: Phase,
}

impl SimulationReport {
    pub fn items_produced(&self) -> usize {
        self.producers.iter().map(|p| p.produced.len()).sum()
    }

    pub fn items_consumed(&self) -> usize {
        self.consumers.iter().map(|c| c.consumed.len()).sum()
    }

    /// Sentinels received across all consumers.
    pub fn sentinels_received(&self) -> u32 {
        self.consumers.iter().map(|c| c.sentinels).sum()
    }

    /// Tasks that ran to completion (producers + consumers).
    pub fn tasks_completed(&self) -> usize {
        self.producers.len() + self.consumers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_item_label_joins_producer_and_seq() {
        let item = WorkItem::new("Producer-1", 3);
        assert_eq!(item.label(), "Producer-1-3");
    }

    #[test]
    fn delay_sample_stays_in_range() {
        let delay = DelayRange::new(100, 500);
        for _ in 0..100 {
            let d = delay.sample().as_millis() as u64;
            assert!((100..=500).contains(&d), "sampled {d}ms");
        }
        assert_eq!(DelayRange::fixed(7).sample(), Duration::from_millis(7));
    }

    #[test]
    fn inverted_delay_is_rejected() {
        assert!(DelayRange::new(5, 1).validate("produce_delay").is_err());
        assert!(DelayRange::new(1, 5).validate("produce_delay").is_ok());
    }

    #[test]
    fn phases_only_move_forward() {
        assert!(Phase::Running.can_transition_to(Phase::Draining));
        assert!(Phase::Draining.can_transition_to(Phase::Joined));
        assert!(Phase::Joined.can_transition_to(Phase::Done));
        assert!(!Phase::Running.can_transition_to(Phase::Joined));
        assert!(!Phase::Done.can_transition_to(Phase::Running));
    }
}
