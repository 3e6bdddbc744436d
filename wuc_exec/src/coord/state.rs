//! Module state implementation for the coordinator

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::tick::Tick;
use log::info;
use util::{module::State, params, session::Session};

use super::{CoordError, CoordParams, Coordinator, Plan, StatusReport};

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl State for Coordinator {
    type InitData = &'static str;
    type InitError = CoordError;

    type InputData = Vec<Tick>;
    type OutputData = Plan;
    type StatusReport = StatusReport;
    type ProcError = CoordError;

    /// Initialise the coordinator.
    ///
    /// Expected init data is the path to the parameter file, relative to the params directory.
    /// Any existing map, tasks and units are discarded.
    fn init(&mut self, init_data: Self::InitData, _session: &Session) -> Result<(), CoordError> {
        let params: CoordParams = params::load(init_data)?;

        *self = Coordinator::new(params)?;

        info!(
            "Coordinator initialised with {} mm cells and {} lanes",
            self.params().map.grid_resolution_mm,
            self.params().planner.lane_spans.len()
        );

        Ok(())
    }

    /// Apply a batch of ticks, in order, then plan.
    fn proc(&mut self, ticks: &Vec<Tick>) -> Result<(Plan, StatusReport), CoordError> {
        for tick in ticks {
            self.apply_tick(tick)?;
        }

        Ok(self.get_plan())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::{
        cmd::Command,
        geom::Pose,
        tick::{CarrierMotion, UnitSnapshot},
    };

    #[test]
    fn test_proc_batch() {
        let mut coord = Coordinator::default();

        let ticks = vec![
            Tick::Carrier(CarrierMotion {
                dy_mm: 0,
                speed_mms: 20.0,
            }),
            Tick::Poses(vec![(1, Pose::new(2500, 500, 90.0))].into_iter().collect()),
            Tick::from_json(
                r#"{"Unit": {
                    "unit_id": 1, "charge_pct": 80.0, "bin_pct": 5.0, "skill": "gripper",
                    "discoveries": [{
                        "item_id": 40, "location": {"x": 400, "y": 0}, "item_type": "can",
                        "volume": 330.0, "certainty": 0.95, "skills": ["gripper"]
                    }]
                }}"#,
            )
            .unwrap(),
        ];

        let (plan, report) = coord.proc(&ticks).unwrap();

        // Item 40 sits in the unit's own cell, so no map is needed to reach it
        assert_eq!(report.alloc.assigned, vec![(40, 1)]);
        assert_eq!(
            plan[&1],
            vec![
                Command::Move {
                    dx_mm: 0,
                    dy_mm: 400
                },
                Command::Pick {
                    item_id: 40,
                    volume: 330.0
                }
            ]
        );

        // Snapshots from units missing from every pose batch are rejected
        let mut coord = Coordinator::default();
        let bad = vec![Tick::Unit(UnitSnapshot {
            unit_id: 9,
            charge_pct: 0.0,
            bin_pct: 0.0,
            skill: "gripper".into(),
            local_grid: vec![],
            discoveries: vec![],
            ready: true,
        })];
        assert!(matches!(coord.proc(&bad), Err(CoordError::UnknownUnit(9))));
    }
}
