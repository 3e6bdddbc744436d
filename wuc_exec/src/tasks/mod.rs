//! # Tasks
//!
//! Work that can be handed to a unit, and the [`CarrierQueue`] which tracks discovered items and
//! allocates tasks to units.
//!
//! Task locations are carrier-frame locations. Retrieve and Explore tasks sit at fixed points on
//! the ground, so their locations are rebased whenever the carrier moves. Service tasks are at a
//! fixed point on the carrier and are never rebased.

// ------------------------------------------------------------------------------------------------
// MODS
// ------------------------------------------------------------------------------------------------

mod params;
mod queue;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use params::QueueParams;
pub use queue::{AllocReport, CarrierQueue, QueueError};

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt;

use comms_if::{
    geom::Location,
    tick::{ItemId, SkillId},
};
use serde::{Deserialize, Serialize};

use crate::map::Cell;

// ------------------------------------------------------------------------------------------------
// TYPES
// ------------------------------------------------------------------------------------------------

/// Unique identifier of a task, allocated sequentially by the [`CarrierQueue`].
pub type TaskId = u64;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,

    /// Carrier-frame location the unit must travel to.
    pub location: Location,

    pub state: TaskState,

    pub kind: TaskKind,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    /// Waiting to be started by the unit it's assigned to (or waiting for assignment).
    Queued,

    /// Commands for this task have been issued.
    Active,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaskKind {
    /// Pick up a discovered item.
    Retrieve {
        item_id: ItemId,
        item_type: String,

        /// Units: millilitres
        volume: f64,

        /// End effectors able to pick the item.
        skills: Vec<SkillId>,
    },

    /// Return to the service point to recharge and empty the bin.
    Service { charge_pct: f64, bin_pct: f64 },

    /// Travel to the centre of a frontier cell.
    Explore { cell: Cell },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Task {
    /// True if the task's location is fixed to the ground rather than to the carrier.
    pub fn is_ground_fixed(&self) -> bool {
        !matches!(self.kind, TaskKind::Service { .. })
    }

    /// Move the task's location to account for the carrier moving forward by `dy_mm`.
    pub fn rebase(&mut self, dy_mm: i64) {
        if self.is_ground_fixed() {
            self.location.y -= dy_mm;
        }
    }

    /// The item this task retrieves, if it's a retrieve task.
    pub fn item_id(&self) -> Option<ItemId> {
        match self.kind {
            TaskKind::Retrieve { item_id, .. } => Some(item_id),
            _ => None,
        }
    }

    pub fn is_explore(&self) -> bool {
        matches!(self.kind, TaskKind::Explore { .. })
    }

    pub fn is_service(&self) -> bool {
        matches!(self.kind, TaskKind::Service { .. })
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TaskKind::Retrieve {
                item_id, item_type, ..
            } => write!(
                f,
                "Retrieve#{}({} {} at {})",
                self.id, item_type, item_id, self.location
            ),
            TaskKind::Service {
                charge_pct,
                bin_pct,
            } => write!(
                f,
                "Service#{}({:.0}% charge, {:.0}% full)",
                self.id, charge_pct, bin_pct
            ),
            TaskKind::Explore { cell } => {
                write!(f, "Explore#{}({} at {})", self.id, cell, self.location)
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
