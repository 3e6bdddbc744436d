//! # Communications interface crate.
//!
//! Provides the data exchanged between the worker unit coordinator and the harness that feeds it
//! sensor snapshots and executes its commands.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Poses and locations
pub mod geom;

/// Inbound carrier, pose and unit snapshot messages
pub mod tick;

/// Outbound unit commands
pub mod cmd;
