//! Lane lookup

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The set of lanes partitioning the traversable width.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Lanes {
    spans: Vec<(i64, i64)>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Lanes {
    pub fn new(spans: Vec<(i64, i64)>) -> Self {
        Self { spans }
    }

    /// Index of the lane containing the X coordinate, `None` if it lies outside every lane.
    ///
    /// With no lanes configured every coordinate is in lane 0.
    pub fn lane_of(&self, x_mm: i64) -> Option<usize> {
        if self.spans.is_empty() {
            return Some(0);
        }

        self.spans
            .iter()
            .position(|(start, end)| *start <= x_mm && x_mm < *end)
    }

    /// Returns the shared lane of the two X coordinates, if they share one.
    pub fn common_lane(&self, a_mm: i64, b_mm: i64) -> Option<usize> {
        match (self.lane_of(a_mm), self.lane_of(b_mm)) {
            (Some(a), Some(b)) if a == b => Some(a),
            _ => None,
        }
    }

    pub fn spans(&self) -> &[(i64, i64)] {
        &self.spans
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
