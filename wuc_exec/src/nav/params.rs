//! Parameters for the path planner

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathPlannerParams {
    /// Half-open `[start, end)` X intervals of each lane, in the carrier frame. An empty list
    /// places the whole width in a single lane.
    ///
    /// Units: millimeters
    pub lane_spans: Vec<(i64, i64)>,

    /// Multiplier applied to the distance of any travel against the carrier's forward direction.
    pub reverse_travel_penalty: f64,

    /// How the sign of a cell's cost is treated when moving through it.
    ///
    /// Only [`EdgeCostMode::Magnitude`] guarantees the search finds a path whenever one exists.
    pub edge_cost_mode: EdgeCostMode,

    /// Maximum number of cells the A* search may expand before giving up.
    pub max_expansions: usize,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeCostMode {
    /// Costs take the sign of the row displacement (or column displacement for east-west moves),
    /// so travelling backwards through a cell is rewarded by the same amount that travelling
    /// forwards is penalised. Edge weights may be negative.
    ///
    /// Uniform costs put a negative cycle in every 2x2 block of cells, so a search which has to
    /// detour may run until `max_expansions` without finding a path.
    Signed,

    /// Costs are always the magnitude of the cell's cost, edge weights are never negative.
    Magnitude,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for PathPlannerParams {
    fn default() -> Self {
        Self {
            lane_spans: vec![(1000, 7000), (7000, 13000), (13000, 19000)],
            reverse_travel_penalty: 2.0,
            edge_cost_mode: EdgeCostMode::Magnitude,
            max_expansions: 200_000,
        }
    }
}
