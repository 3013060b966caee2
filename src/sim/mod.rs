//! Producer/consumer simulation: roles, processing seam, and coordinator.

pub mod consumer;
pub mod producer;
pub mod simulator;

pub use consumer::{SimulatedWork, WorkHandler, consume};
pub use producer::produce;
pub use simulator::Simulator;
