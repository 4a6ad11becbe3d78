//! Decision core for the teacher training application portal.
//!
//! Candidates move through multi-step wizards to pick courses, providers use
//! wizards to reject, change offers, and set up partner permissions, and the
//! submission and task-view rules decide what can be submitted and what a
//! provider should look at first.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
