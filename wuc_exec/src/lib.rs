//! # Worker unit coordinator library.
//!
//! This library allows other crates in the workspace (and the benchmarks) to access the
//! coordinator's components.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Coordinate transforms between a frame and its parent
pub mod tf;

/// World map - incrementally built cost grid with an exploration frontier
pub mod map;

/// Navigation - lane constrained path planning
pub mod nav;

/// Tasks and the carrier task queue which allocates them to units
pub mod tasks;

/// Planning-side proxy of a worker unit
pub mod unit;

/// Fleet coordinator - ingests ticks and produces unit commands
pub mod coord;
