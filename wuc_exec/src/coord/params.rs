//! Parameters for the fleet coordinator

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::{
    map::MapParams,
    nav::{Lanes, PathPlannerParams},
    tasks::QueueParams,
};

use super::CoordError;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// All coordinator parameters, as loaded from `wuc.toml`.
///
/// Each component reads its own table, any table or key missing from the file takes its default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordParams {
    pub map: MapParams,
    pub planner: PathPlannerParams,
    pub queue: QueueParams,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CoordParams {
    /// Check the parameters describe a usable configuration.
    pub fn validate(&self) -> Result<(), CoordError> {
        if self.map.grid_resolution_mm <= 0 {
            return Err(CoordError::InvalidParams(format!(
                "grid_resolution_mm must be positive, found {}",
                self.map.grid_resolution_mm
            )));
        }

        if self.queue.max_assignments_per_unit == 0 {
            return Err(CoordError::InvalidParams(
                "max_assignments_per_unit must be at least 1".into(),
            ));
        }

        if let Some((start, end)) = self
            .planner
            .lane_spans
            .iter()
            .find(|(start, end)| start >= end)
        {
            return Err(CoordError::InvalidParams(format!(
                "lane span [{}, {}) is empty",
                start, end
            )));
        }

        let service = self.queue.service_location;
        if self.queue.service_preemption
            && Lanes::new(self.planner.lane_spans.clone())
                .lane_of(service.x)
                .is_none()
        {
            return Err(CoordError::InvalidParams(format!(
                "service_location {} is outside every lane",
                service
            )));
        }

        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
