//! # Unit commands
//!
//! Low level commands handed to a unit's motion execution layer. Commands are executed open-loop
//! in order, each relative to the unit's pose when it is issued.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::tick::ItemId;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A command for a single unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Translate by the given displacement, expressed along the carrier axes.
    Move {
        /// Units: millimeters
        dx_mm: i64,

        /// Units: millimeters
        dy_mm: i64,
    },

    /// Turn on the spot by the given angle, positive anticlockwise.
    Rotate {
        /// Units: degrees
        da_deg: f64,
    },

    /// Pick up the item at the unit's current position.
    Pick {
        item_id: ItemId,

        /// Units: millilitres
        volume: f64,
    },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Move { dx_mm, dy_mm } => write!(f, "Move({}, {})", dx_mm, dy_mm),
            Command::Rotate { da_deg } => write!(f, "Rotate({:.1})", da_deg),
            Command::Pick { item_id, volume } => write!(f, "Pick({}, {})", item_id, volume),
        }
    }
}
