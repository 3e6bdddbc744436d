//! Compiles planned waypoints into unit commands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{cmd::Command, geom::Pose};
use util::maths::get_ang_dist_deg;

use crate::tasks::{Task, TaskKind};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Heading changes smaller than this are not worth a rotate command.
///
/// Units: degrees
const MIN_ROTATION_DEG: f64 = 1e-6;

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Convert a path (starting at the unit's current pose) into the commands which carry out `task`.
///
/// Each waypoint becomes a rotate to the waypoint's heading, if the heading changes, followed by a
/// move along the carrier axes. Waypoints at the same position as the previous one only turn the
/// unit in place.
/// Retrieve tasks end with a pick of the item.
pub fn compile(waypoints: &[Pose], task: &Task) -> Vec<Command> {
    let mut commands = Vec::new();

    if let Some(start) = waypoints.first() {
        let mut previous = *start;
        let mut heading = start.a;

        for wp in waypoints.iter().skip(1) {
            let dx_mm = wp.x - previous.x;
            let dy_mm = wp.y - previous.y;

            let da_deg = get_ang_dist_deg(heading, wp.a);
            if da_deg.abs() >= MIN_ROTATION_DEG {
                commands.push(Command::Rotate { da_deg });
            }
            heading = wp.a;

            if dx_mm == 0 && dy_mm == 0 {
                continue;
            }

            commands.push(Command::Move { dx_mm, dy_mm });
            previous = *wp;
        }
    }

    if let TaskKind::Retrieve {
        item_id, volume, ..
    } = task.kind
    {
        commands.push(Command::Pick { item_id, volume });
    }

    commands
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
