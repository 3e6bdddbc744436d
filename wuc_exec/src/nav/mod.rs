//! # Navigation
//!
//! This module provides path planning for the worker units.
//!
//! The traversable width beneath the carrier is split into lanes, fixed X intervals which a unit
//! may not leave while travelling. [`PathPlanner`] runs an A* search over the discovered cells of
//! the [`WorldMap`](crate::map::WorldMap) within a single lane, and exposes the lane aware
//! distance used to score task assignments.

// ------------------------------------------------------------------------------------------------
// MODS
// ------------------------------------------------------------------------------------------------

mod lanes;
mod params;
mod path_planner;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use lanes::Lanes;
pub use params::{EdgeCostMode, PathPlannerParams};
pub use path_planner::PathPlanner;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::geom::Location;

use crate::map::Cell;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NavError {
    #[error("Start {0} and goal {1} are not within the same lane")]
    DifferentLanes(Location, Location),

    #[error("The start cell {0} has not been discovered")]
    StartOutsideMap(Cell),

    #[error("The goal cell {0} has not been discovered")]
    GoalOutsideMap(Cell),

    #[error("No path exists to the goal cell {0}")]
    NoPathToTarget(Cell),

    #[error("Search towards the goal cell {0} exceeded {1} expansions")]
    SearchLimitReached(Cell, usize),
}
