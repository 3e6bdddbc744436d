//! # Inbound tick messages
//!
//! Everything the coordinator learns about the world arrives as a [`Tick`]: a carrier motion
//! notification, a batch of unit poses, or a single unit's sensor snapshot. All positions inside a
//! tick are expressed in the carrier frame, except discovery locations which are relative to the
//! reporting unit.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};
use thiserror::Error;

use crate::geom::{Location, Pose};

// ------------------------------------------------------------------------------------------------
// TYPES
// ------------------------------------------------------------------------------------------------

/// Identifies a worker unit.
pub type UnitId = u32;

/// Identifies a collectible item reported by a unit's detector.
pub type ItemId = u64;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An end-effector / capability tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkillId(pub String);

/// Offset of a cell in a unit's local grid patch from the cell containing the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellOffset {
    pub row: i64,
    pub col: i64,
}

/// Direction dependent traversal weights of a single cell.
///
/// Components are ordered east-west, NE-SW diagonal, north-south, NW-SE diagonal.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CostVector(pub [f64; 4]);

/// One cell of a unit's local grid patch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalCell {
    pub offset: CellOffset,
    pub costs: CostVector,
}

/// A candidate item seen by a unit's detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discovery {
    pub item_id: ItemId,

    /// Position of the item in the reporting unit's frame.
    pub location: Location,

    /// Classification label of the item.
    pub item_type: String,

    /// Units: millilitres
    pub volume: f64,

    /// Detector confidence, between 0 and 1.
    pub certainty: f64,

    /// End effectors able to pick this item.
    pub skills: Vec<SkillId>,
}

/// Motion of the carrier since the last notification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CarrierMotion {
    /// Displacement along the carrier's forward axis.
    ///
    /// Units: millimeters
    pub dy_mm: i64,

    /// Units: millimeters/second
    pub speed_mms: f64,
}

/// Periodic status and sensor snapshot from a single unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub unit_id: UnitId,
    pub charge_pct: f64,
    pub bin_pct: f64,
    pub skill: SkillId,

    #[serde(default)]
    pub local_grid: Vec<LocalCell>,

    #[serde(default)]
    pub discoveries: Vec<Discovery>,

    /// Set once the unit has executed all commands of its current task.
    #[serde(default)]
    pub ready: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// An inbound message for the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Tick {
    /// The carrier has moved.
    Carrier(CarrierMotion),

    /// Latest carrier-frame pose of every unit.
    Poses(BTreeMap<UnitId, Pose>),

    /// One unit's snapshot.
    Unit(UnitSnapshot),
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum TickParseError {
    #[error("Tick contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("Tick contains an invalid value: {0}")]
    InvalidValue(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Tick {
    /// Parse a tick from a JSON packet, rejecting non-finite costs and out-of-range certainties.
    pub fn from_json(json_str: &str) -> Result<Self, TickParseError> {
        let tick: Tick = serde_json::from_str(json_str).map_err(TickParseError::InvalidJson)?;

        if let Tick::Unit(ref snapshot) = tick {
            if let Some(cell) = snapshot
                .local_grid
                .iter()
                .find(|c| c.costs.0.iter().any(|v| !v.is_finite()))
            {
                return Err(TickParseError::InvalidValue(format!(
                    "unit {} reported a non-finite cost at offset ({}, {})",
                    snapshot.unit_id, cell.offset.row, cell.offset.col
                )));
            }

            if let Some(d) = snapshot
                .discoveries
                .iter()
                .find(|d| !(0.0..=1.0).contains(&d.certainty))
            {
                return Err(TickParseError::InvalidValue(format!(
                    "discovery of item {} has certainty {} outside [0, 1]",
                    d.item_id, d.certainty
                )));
            }
        }

        Ok(tick)
    }
}

impl CostVector {
    pub const EAST_WEST: usize = 0;
    pub const NE_SW: usize = 1;
    pub const NORTH_SOUTH: usize = 2;
    pub const NW_SE: usize = 3;

    pub fn new(east_west: f64, ne_sw: f64, north_south: f64, nw_se: f64) -> Self {
        Self([east_west, ne_sw, north_south, nw_se])
    }

    /// A cost vector with the same weight in every direction.
    pub fn uniform(cost: f64) -> Self {
        Self([cost; 4])
    }
}

impl CellOffset {
    pub fn new(row: i64, col: i64) -> Self {
        Self { row, col }
    }
}

impl From<&str> for SkillId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for SkillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_carrier() {
        let tick = Tick::from_json(r#"{"Carrier": {"dy_mm": 250, "speed_mms": 500.0}}"#).unwrap();

        assert_eq!(
            tick,
            Tick::Carrier(CarrierMotion {
                dy_mm: 250,
                speed_mms: 500.0
            })
        );
    }

    #[test]
    fn test_parse_poses() {
        let tick =
            Tick::from_json(r#"{"Poses": {"1": {"x": 10, "y": 20, "a": 90.0}}}"#).unwrap();

        match tick {
            Tick::Poses(poses) => assert_eq!(poses[&1], Pose::new(10, 20, 90.0)),
            t => panic!("Expected a pose batch, got {:?}", t),
        }
    }

    #[test]
    fn test_parse_unit_defaults() {
        let tick = Tick::from_json(
            r#"{"Unit": {"unit_id": 3, "charge_pct": 80.0, "bin_pct": 5.0, "skill": "gripper"}}"#,
        )
        .unwrap();

        match tick {
            Tick::Unit(s) => {
                assert_eq!(s.skill, SkillId::from("gripper"));
                assert!(s.local_grid.is_empty());
                assert!(s.discoveries.is_empty());
                assert!(!s.ready);
            }
            t => panic!("Expected a unit snapshot, got {:?}", t),
        }
    }

    #[test]
    fn test_reject_bad_certainty() {
        let json = r#"{"Unit": {"unit_id": 3, "charge_pct": 80.0, "bin_pct": 5.0,
            "skill": "gripper", "discoveries": [{"item_id": 7, "location": {"x": 0, "y": 0},
            "item_type": "can", "volume": 330.0, "certainty": 1.5, "skills": ["gripper"]}]}}"#;

        assert!(matches!(
            Tick::from_json(json),
            Err(TickParseError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_reject_invalid_json() {
        assert!(matches!(
            Tick::from_json("{\"Carrier\": "),
            Err(TickParseError::InvalidJson(_))
        ));
    }
}
