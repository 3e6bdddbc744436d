//! Parameters for the world map

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapParams {
    /// Side length of each square grid cell.
    ///
    /// Units: millimeters
    pub grid_resolution_mm: i64,

    /// How the exploration frontier is maintained as new cells are discovered.
    pub frontier_policy: FrontierPolicy,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Frontier maintenance policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum FrontierPolicy {
    /// Monotonic sweep along the carrier's travel direction. Only the leading rows of discovered
    /// cells are kept in the frontier, cells more than `tolerance_rows` behind the leading row
    /// are dropped and never return.
    Sweep { tolerance_rows: i64 },

    /// A cell is in the frontier while it is missing some of its 8 neighbours, and leaves it once
    /// more than 6 of them have been discovered.
    NeighborCount,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for MapParams {
    fn default() -> Self {
        Self {
            grid_resolution_mm: 1000,
            frontier_policy: FrontierPolicy::default(),
        }
    }
}

impl Default for FrontierPolicy {
    fn default() -> Self {
        FrontierPolicy::Sweep { tolerance_rows: 0 }
    }
}
