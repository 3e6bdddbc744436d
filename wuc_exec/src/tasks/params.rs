//! Parameters for the carrier queue

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::geom::Location;
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueParams {
    /// Maximum length of any unit's to-do list after allocation.
    pub max_assignments_per_unit: usize,

    /// Units at or below this charge are sent for service, if preemption is enabled.
    ///
    /// Units: percent
    pub charge_threshold_percent: f64,

    /// Units with a bin at or above this fill level are sent for service, if preemption is
    /// enabled.
    ///
    /// Units: percent
    pub bin_threshold_percent: f64,

    /// Discoveries below this certainty are ignored.
    pub discovery_certainty_threshold: f64,

    /// Score added per task already in a candidate unit's to-do list.
    ///
    /// Units: millimeters
    pub queue_length_penalty: f64,

    /// If true units needing charge or emptying are preempted with a service task.
    pub service_preemption: bool,

    /// Carrier-frame location of the service point. Must lie inside a lane when preemption is
    /// enabled.
    pub service_location: Location,

    /// Seed for the per tick shuffle of the unit order.
    pub shuffle_seed: u64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for QueueParams {
    fn default() -> Self {
        Self {
            max_assignments_per_unit: 3,
            charge_threshold_percent: 25.0,
            bin_threshold_percent: 99.0,
            discovery_certainty_threshold: 0.3,
            queue_length_penalty: 1000.0,
            service_preemption: false,
            service_location: Location::new(4000, 0),
            shuffle_seed: 0,
        }
    }
}
