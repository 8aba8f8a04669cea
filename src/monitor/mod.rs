//! The monitoring control loop.
//!
//! The controller owns the scoring pipeline, the collaborators, and the
//! open session, and runs the single tick loop that drives everything.
//! Observers watch its state through [`MonitorLink`]; commands (settings
//! updates, adaptive multiplier, stop) flow in the other way and are
//! applied between ticks.

pub mod controller;
pub mod status;

pub use controller::{Command, MonitorLink, MonitoringController};
pub use status::{MonitorPhase, MonitorStatus};
