//! Lifecycle control for a single ConoHa VPS instance.
//!
//! [`orchestrator::LifecycleController`] owns the identity session and the running-time
//! accounting; chat surfaces (CLI, shell, interaction webhook) go through
//! [`orchestrator::dispatch`].

pub mod accumulator;
pub mod cli;
pub mod clock;
pub mod conoha;
pub mod discord;
pub mod error;
pub mod interaction;
pub mod logging;
pub mod model;
pub mod orchestrator;
mod text_summary;
#[cfg(test)]
mod testing;
