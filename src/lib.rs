//! # asyncq
//!
//! An async work queue with completion tracking and the producer/consumer
//! simulation built on it.
//!
//! Producers put labeled items at random intervals, consumers drain the
//! queue until they receive a shutdown sentinel, and the simulator waits
//! until every item has been acknowledged. The `kitchen` module holds
//! smaller cooperative-concurrency demos: timeouts, cancellation, task
//! groups, and offloading blocking work.

pub mod config;
pub mod error;
pub mod kitchen;
pub mod model;
pub mod queue;
pub mod sim;
pub mod telemetry;
