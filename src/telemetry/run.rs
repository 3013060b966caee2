//! Simulation span helpers.
//!
//! One span per run, one child span per producer/consumer task.

use tracing::Span;

use crate::error::{Error, Result};
use crate::model::{Phase, RunId};

/// Start a span covering a whole simulation run.
///
/// The `sim.phase` field is declared empty and is filled in by
/// [`record_phase`].
pub fn start_run_span(run_id: RunId, producers: usize, consumers: usize) -> Span {
    tracing::info_span!(
        "sim.run",
        "sim.run_id" = %run_id,
        "sim.producers" = producers,
        "sim.consumers" = consumers,
        "sim.phase" = tracing::field::Empty,
    )
}

/// Start a span for one producer or consumer task.
pub fn start_role_span(role: &str, name: &str) -> Span {
    tracing::info_span!("sim.role", "sim.role" = role, "sim.name" = name)
}

/// Record a phase change on the run span and emit an `info` event inside it.
///
/// Phases only move forward one step at a time; anything else is rejected
/// and leaves the span untouched.
pub fn record_phase(span: &Span, from: Phase, to: Phase) -> Result<()> {
    if !from.can_transition_to(to) {
        return Err(Error::Other(format!(
            "invalid phase transition: {from} -> {to}"
        )));
    }
    span.record("sim.phase", tracing::field::display(to));
    span.in_scope(|| {
        tracing::info!(from = %from, to = %to, "phase_transition");
    });
    Ok(())
}
