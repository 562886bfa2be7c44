//! Application-level orchestration.
//!
//! This module owns the instance lifecycle (session, start/stop/status, running-time
//! accounting) and the dispatch of chat commands onto it. CLI, shell and interaction
//! layers call into this module and only render the replies.

mod controller;
mod dispatch;
mod session;

pub use controller::{LifecycleController, StartOutcome, StopOutcome};
pub use dispatch::{dispatch, ChatCommand, Reply, FAILURE_MESSAGE};
pub use session::Session;
