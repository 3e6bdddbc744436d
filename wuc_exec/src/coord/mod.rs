//! # Fleet coordinator
//!
//! The [`Coordinator`] owns the world map, the path planner, the carrier queue and the record of
//! every unit. Each tick the harness feeds it the carrier motion, the latest unit poses and each
//! unit's snapshot, then asks for a plan: the allocator runs, and every unit which is free to start
//! the task at the head of its to-do list gets a path compiled into commands.
//!
//! Only one tick may be processed at a time. The executable guarantees this by keeping the
//! coordinator inside a single worker thread, see [`worker`].

// ------------------------------------------------------------------------------------------------
// MODS
// ------------------------------------------------------------------------------------------------

mod cmd;
mod params;
mod state;
pub mod worker;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use cmd::compile;
pub use params::CoordParams;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::BTreeMap;

use comms_if::{
    cmd::Command,
    geom::Pose,
    tick::{CarrierMotion, ItemId, Tick, UnitId, UnitSnapshot},
};
use log::{debug, info, trace, warn};
use serde::Serialize;
use util::params::LoadError;

use crate::{
    map::WorldMap,
    nav::PathPlanner,
    tasks::{AllocReport, CarrierQueue, QueueError, TaskState},
    unit::Unit,
};

// ------------------------------------------------------------------------------------------------
// TYPES
// ------------------------------------------------------------------------------------------------

/// New commands for each unit, only units given new commands this tick are present.
pub type Plan = BTreeMap<UnitId, Vec<Command>>;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Coordinator {
    params: CoordParams,

    map: WorldMap,

    planner: PathPlanner,

    queue: CarrierQueue,

    units: BTreeMap<UnitId, Unit>,

    /// Number of plans produced so far.
    tick: u64,

    /// Latest reported carrier speed.
    ///
    /// Units: millimeters/second
    carrier_speed_mms: f64,
}

/// Summary of one planning tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusReport {
    pub tick: u64,

    pub alloc: AllocReport,

    /// Units whose head task could not be planned this tick, with the reason.
    pub failed_plans: BTreeMap<UnitId, String>,

    pub num_pending: usize,
    pub num_active: usize,
    pub num_finished: usize,
    pub num_cells: usize,
    pub num_frontier: usize,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CoordError {
    #[error("Received a snapshot from unit {0} which has not been seen in any pose batch")]
    UnknownUnit(UnitId),

    #[error("Task bookkeeping is out of sync: {0}")]
    TaskDesync(QueueError),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Could not load the coordinator parameters: {0}")]
    ParamLoadError(LoadError),

    #[error("Could not send to the worker thread, it has stopped")]
    WorkerSendError,

    #[error("Could not receive from the worker thread, it has stopped")]
    WorkerRecvError,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Coordinator {
    /// Create a new coordinator with an empty map and no units.
    pub fn new(params: CoordParams) -> Result<Self, CoordError> {
        params.validate()?;
        Ok(Self::from_valid_params(params))
    }

    fn from_valid_params(params: CoordParams) -> Self {
        Self {
            map: WorldMap::new(params.map.clone()),
            planner: PathPlanner::new(params.planner.clone()),
            queue: CarrierQueue::new(params.queue.clone()),
            units: BTreeMap::new(),
            tick: 0,
            carrier_speed_mms: 0.0,
            params,
        }
    }

    /// The carrier has moved forward, rebase the map and every ground-fixed task.
    pub fn sync_carrier(&mut self, motion: &CarrierMotion) {
        self.carrier_speed_mms = motion.speed_mms;

        self.map.notify_movement(motion.dy_mm);
        self.queue.notify_movement(motion.dy_mm, &mut self.units);

        trace!(
            "Carrier moved {} mm at {} mm/s",
            motion.dy_mm,
            motion.speed_mms
        );
    }

    /// Update the pose of each unit, creating records for units seen for the first time.
    pub fn sync_poses(&mut self, poses: &BTreeMap<UnitId, Pose>) {
        for (id, pose) in poses {
            match self.units.get_mut(id) {
                Some(unit) => unit.pose = *pose,
                None => {
                    info!("New unit {} at {}", id, pose);
                    self.units.insert(*id, Unit::new(*id, *pose));
                }
            }
        }
    }

    /// Ingest a unit's snapshot.
    ///
    /// Updates the unit's status, merges its local grid into the map and registers its
    /// discoveries. If the unit reports it is ready, the task at the head of its to-do list is
    /// complete and is removed.
    pub fn sync_unit(&mut self, snapshot: &UnitSnapshot) -> Result<(), CoordError> {
        let unit = self
            .units
            .get_mut(&snapshot.unit_id)
            .ok_or(CoordError::UnknownUnit(snapshot.unit_id))?;

        unit.charge_pct = snapshot.charge_pct;
        unit.bin_pct = snapshot.bin_pct;
        unit.skill = Some(snapshot.skill.clone());

        self.map.expand(&unit.pose, &snapshot.local_grid);

        let num_new = self
            .queue
            .notify_discoveries(&unit.pose, &snapshot.discoveries);
        if num_new > 0 {
            debug!("Unit {} discovered {} new items", unit.id, num_new);
        }

        if snapshot.ready {
            if let Some(task) = unit.pop_task() {
                debug!("Unit {} finished {}", unit.id, task);
                self.queue.complete(task)?;
            }
        }

        Ok(())
    }

    /// Apply a single inbound tick.
    pub fn apply_tick(&mut self, tick: &Tick) -> Result<(), CoordError> {
        match tick {
            Tick::Carrier(motion) => self.sync_carrier(motion),
            Tick::Poses(poses) => self.sync_poses(poses),
            Tick::Unit(snapshot) => self.sync_unit(snapshot)?,
        }

        Ok(())
    }

    /// Allocate tasks and produce commands for every unit ready to start a new task.
    ///
    /// A unit gets commands when it has no commands in flight and the head of its to-do list is
    /// still queued. If no path can be found the unit is skipped and will be retried next tick.
    /// Only trips to the service point may leave the unit's lane.
    pub fn get_plan(&mut self) -> (Plan, StatusReport) {
        let tick = self.tick;
        self.tick += 1;

        let alloc = self
            .queue
            .allocate(&mut self.units, &self.map, &self.planner, tick);

        let mut plan = Plan::new();
        let mut failed_plans = BTreeMap::new();

        for (id, unit) in self.units.iter_mut() {
            if !unit.commands.is_empty() {
                continue;
            }

            let task = match unit.todo.front_mut() {
                Some(t) if t.state == TaskState::Queued => t,
                _ => continue,
            };

            let planned = if task.is_service() {
                self.planner
                    .plan_across_lanes(&self.map, &unit.pose, &task.location)
            } else {
                self.planner.plan(&self.map, &unit.pose, &task.location)
            };

            let waypoints = match planned {
                Ok(w) => w,
                Err(e) => {
                    warn!("Cannot plan {} for unit {}: {}", task, id, e);
                    failed_plans.insert(*id, e.to_string());
                    continue;
                }
            };

            let commands = compile(&waypoints, task);
            task.state = TaskState::Active;

            trace!(
                "Unit {} starting {} with {} commands",
                id,
                task,
                commands.len()
            );

            unit.commands = commands.clone();
            plan.insert(*id, commands);
        }

        let report = StatusReport {
            tick,
            alloc,
            failed_plans,
            num_pending: self.queue.num_pending(),
            num_active: self.queue.num_active(),
            num_finished: self.queue.num_finished(),
            num_cells: self.map.num_cells(),
            num_frontier: self.map.frontier().len(),
        };

        (plan, report)
    }

    pub fn params(&self) -> &CoordParams {
        &self.params
    }

    pub fn map(&self) -> &WorldMap {
        &self.map
    }

    pub fn planner(&self) -> &PathPlanner {
        &self.planner
    }

    pub fn queue(&self) -> &CarrierQueue {
        &self.queue
    }

    pub fn units(&self) -> &BTreeMap<UnitId, Unit> {
        &self.units
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    pub fn carrier_speed_mms(&self) -> f64 {
        self.carrier_speed_mms
    }

    /// The unit whose to-do list holds the given item, if any.
    pub fn assignee(&self, item_id: ItemId) -> Option<UnitId> {
        self.units
            .values()
            .find(|u| u.todo.iter().any(|t| t.item_id() == Some(item_id)))
            .map(|u| u.id)
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::from_valid_params(CoordParams::default())
    }
}

impl From<LoadError> for CoordError {
    fn from(e: LoadError) -> Self {
        Self::ParamLoadError(e)
    }
}

impl From<QueueError> for CoordError {
    fn from(e: QueueError) -> Self {
        Self::TaskDesync(e)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        map::{FrontierPolicy, MapParams},
        nav::PathPlannerParams,
        tasks::QueueParams,
    };
    use comms_if::{
        geom::Location,
        tick::{CellOffset, CostVector, Discovery, LocalCell, SkillId},
    };
    use std::ops::RangeInclusive;

    /// 2 m cells, a single 6 m wide lane starting at the carrier origin.
    fn params() -> CoordParams {
        CoordParams {
            map: MapParams {
                grid_resolution_mm: 2000,
                frontier_policy: FrontierPolicy::default(),
            },
            planner: PathPlannerParams {
                lane_spans: vec![(0, 6000)],
                ..Default::default()
            },
            queue: QueueParams::default(),
        }
    }

    fn poses(list: &[(UnitId, Pose)]) -> Tick {
        Tick::Poses(list.iter().copied().collect())
    }

    /// A local grid patch of uniform cost cells.
    fn patch(rows: RangeInclusive<i64>, cols: RangeInclusive<i64>) -> Vec<LocalCell> {
        rows.flat_map(|row| {
            cols.clone().map(move |col| LocalCell {
                offset: CellOffset::new(row, col),
                costs: CostVector::uniform(1.0),
            })
        })
        .collect()
    }

    fn snapshot(unit_id: UnitId, skill: &str) -> UnitSnapshot {
        UnitSnapshot {
            unit_id,
            charge_pct: 90.0,
            bin_pct: 10.0,
            skill: SkillId::from(skill),
            local_grid: vec![],
            discoveries: vec![],
            ready: false,
        }
    }

    fn discovery(item_id: ItemId, x: i64, y: i64, certainty: f64) -> Discovery {
        Discovery {
            item_id,
            location: Location::new(x, y),
            item_type: "can".into(),
            volume: 330.0,
            certainty,
            skills: vec![SkillId::from("gripper")],
        }
    }

    #[test]
    fn test_invalid_params() {
        let mut p = params();
        p.map.grid_resolution_mm = -5;
        assert!(matches!(
            Coordinator::new(p),
            Err(CoordError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_unknown_unit() {
        let mut coord = Coordinator::new(params()).unwrap();

        assert!(matches!(
            coord.apply_tick(&Tick::Unit(snapshot(3, "gripper"))),
            Err(CoordError::UnknownUnit(3))
        ));
    }

    #[test]
    fn test_retrieve_straight_ahead() {
        let mut coord = Coordinator::new(params()).unwrap();

        coord
            .apply_tick(&poses(&[(0, Pose::new(0, 0, 90.0))]))
            .unwrap();

        // Item 2 m dead ahead, reported in the unit's frame (X along its heading)
        let mut snap = snapshot(0, "gripper");
        snap.local_grid = patch(0..=1, 0..=0);
        snap.discoveries = vec![discovery(7, 2000, 0, 0.9)];
        coord.apply_tick(&Tick::Unit(snap)).unwrap();

        assert_eq!(
            coord.queue().pending().next().map(|t| t.location),
            Some(Location::new(0, 2000))
        );

        let waypoints = coord
            .planner()
            .plan(coord.map(), &Pose::new(0, 0, 90.0), &Location::new(0, 2000))
            .unwrap();
        assert_eq!(
            waypoints,
            vec![Pose::new(0, 0, 90.0), Pose::new(0, 2000, 90.0)]
        );

        let (plan, report) = coord.get_plan();

        assert_eq!(report.alloc.assigned, vec![(7, 0)]);
        assert_eq!(
            plan[&0],
            vec![
                Command::Move {
                    dx_mm: 0,
                    dy_mm: 2000
                },
                Command::Pick {
                    item_id: 7,
                    volume: 330.0
                }
            ]
        );
        assert_eq!(coord.unit(0).unwrap().todo[0].state, TaskState::Active);

        // Commands in flight, nothing new until the unit reports
        let (plan, _) = coord.get_plan();
        assert!(plan.is_empty());

        let mut done = snapshot(0, "gripper");
        done.ready = true;
        coord.apply_tick(&Tick::Unit(done)).unwrap();

        assert!(coord.queue().is_finished(7));
        assert!(coord.unit(0).unwrap().todo.is_empty());
        assert!(coord.unit(0).unwrap().commands.is_empty());
    }

    #[test]
    fn test_failed_plan_is_retried() {
        let mut coord = Coordinator::new(params()).unwrap();

        coord
            .apply_tick(&poses(&[(0, Pose::new(1000, 1000, 90.0))]))
            .unwrap();

        // Item ahead, but the map doesn't reach it yet
        let mut snap = snapshot(0, "gripper");
        snap.local_grid = patch(0..=0, 0..=0);
        snap.discoveries = vec![discovery(1, 4000, 0, 1.0)];
        coord.apply_tick(&Tick::Unit(snap)).unwrap();

        let (plan, report) = coord.get_plan();
        assert!(plan.is_empty());
        assert!(report.failed_plans.contains_key(&0));
        assert_eq!(coord.unit(0).unwrap().todo[0].state, TaskState::Queued);

        let mut snap = snapshot(0, "gripper");
        snap.local_grid = patch(0..=2, 0..=0);
        coord.apply_tick(&Tick::Unit(snap)).unwrap();

        let (plan, report) = coord.get_plan();
        assert!(report.failed_plans.is_empty());
        assert_eq!(plan[&0].last(), Some(&Command::Pick { item_id: 1, volume: 330.0 }));
    }

    #[test]
    fn test_carrier_motion_rebases_tasks() {
        let mut coord = Coordinator::new(params()).unwrap();

        coord
            .apply_tick(&poses(&[(0, Pose::new(1000, 0, 90.0))]))
            .unwrap();

        let mut snap = snapshot(0, "suction");
        snap.discoveries = vec![discovery(1, 5000, 0, 1.0)];
        coord.apply_tick(&Tick::Unit(snap)).unwrap();

        assert_eq!(
            coord.queue().pending().next().map(|t| t.location),
            Some(Location::new(1000, 5000))
        );

        coord
            .apply_tick(&Tick::Carrier(CarrierMotion {
                dy_mm: 1000,
                speed_mms: 50.0,
            }))
            .unwrap();

        assert_eq!(
            coord.queue().pending().next().map(|t| t.location),
            Some(Location::new(1000, 4000))
        );
        assert_eq!(coord.map().carrier_offset_mm(), 1000);
        assert_eq!(coord.carrier_speed_mms(), 50.0);

        // Nobody can pick it
        let (_, report) = coord.get_plan();
        assert_eq!(report.alloc.unservable, vec![1]);
        assert_eq!(report.num_pending, 1);

        // As archived by the executable
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["alloc"]["unservable"][0], 1);
        assert_eq!(json["num_pending"], 1);
    }

    #[test]
    fn test_skilled_unit_wins() {
        let mut coord = Coordinator::new(params()).unwrap();

        coord
            .apply_tick(&poses(&[
                (0, Pose::new(1000, 1000, 90.0)),
                (1, Pose::new(5000, 1000, 90.0)),
            ]))
            .unwrap();

        let mut snap = snapshot(0, "suction");
        snap.local_grid = patch(0..=2, 0..=2);
        snap.discoveries = vec![discovery(4, 2000, 0, 0.8)];
        coord.apply_tick(&Tick::Unit(snap)).unwrap();
        coord.apply_tick(&Tick::Unit(snapshot(1, "gripper"))).unwrap();

        let (plan, report) = coord.get_plan();

        assert_eq!(report.alloc.assigned, vec![(4, 1)]);
        assert_eq!(coord.assignee(4), Some(1));
        assert!(plan.contains_key(&1));
    }

    #[test]
    fn test_explore_when_idle() {
        let mut coord = Coordinator::new(params()).unwrap();

        coord
            .apply_tick(&poses(&[(0, Pose::new(3000, 1000, 90.0))]))
            .unwrap();

        let mut snap = snapshot(0, "gripper");
        snap.local_grid = patch(-1..=1, -1..=1);
        coord.apply_tick(&Tick::Unit(snap)).unwrap();

        let (plan, report) = coord.get_plan();

        // Straight ahead to the centre of the leading row
        assert_eq!(report.alloc.explore.len(), 1);
        assert_eq!(
            plan[&0],
            vec![Command::Move {
                dx_mm: 0,
                dy_mm: 2000
            }]
        );

        // The explore target is dropped and replaced on the next tick, along with its commands
        let (plan, report) = coord.get_plan();
        assert_eq!(report.alloc.explore.len(), 1);
        assert_eq!(plan[&0].len(), 1);
    }

    #[test]
    fn test_at_most_once_over_ticks() {
        let mut coord = Coordinator::new(params()).unwrap();

        coord
            .apply_tick(&poses(&[
                (0, Pose::new(1000, 1000, 90.0)),
                (1, Pose::new(3000, 1000, 90.0)),
                (2, Pose::new(5000, 1000, 90.0)),
            ]))
            .unwrap();

        for tick in 0..30u64 {
            for id in 0..3 {
                let mut snap = snapshot(id, "gripper");
                snap.local_grid = patch(-1..=3, -2..=2);
                snap.discoveries = vec![discovery(
                    tick * 3 + id as u64,
                    2000 + 500 * (tick as i64 % 3),
                    0,
                    0.9,
                )];
                snap.ready = tick % 4 == 3;
                coord.apply_tick(&Tick::Unit(snap)).unwrap();
            }

            coord
                .apply_tick(&Tick::Carrier(CarrierMotion {
                    dy_mm: 0,
                    speed_mms: 0.0,
                }))
                .unwrap();

            coord.get_plan();

            let mut owners: BTreeMap<ItemId, usize> = BTreeMap::new();
            for t in coord.queue().pending().chain(coord.queue().finished()) {
                *owners.entry(t.item_id().unwrap()).or_default() += 1;
            }
            for unit in coord.units().values() {
                assert!(unit.todo.len() <= 3);
                for t in unit.todo.iter().filter_map(|t| t.item_id()) {
                    *owners.entry(t).or_default() += 1;
                }
            }

            assert!(owners.values().all(|n| *n == 1));
        }

        assert!(coord.queue().num_finished() > 0);
    }

    #[test]
    fn test_lane_paths_stay_in_lane() {
        let mut p = params();
        p.planner.lane_spans = vec![(0, 4000), (4000, 8000)];
        let mut coord = Coordinator::new(p).unwrap();

        coord
            .apply_tick(&poses(&[(0, Pose::new(1000, 1000, 90.0))]))
            .unwrap();

        let mut snap = snapshot(0, "gripper");
        snap.local_grid = patch(0..=3, 0..=3);
        // Unit frame, so these land at (6000, 5000) and (2000, 5000)
        snap.discoveries = vec![
            discovery(1, 4000, -5000, 1.0),
            discovery(2, 4000, -1000, 1.0),
        ];
        coord.apply_tick(&Tick::Unit(snap)).unwrap();

        let (plan, report) = coord.get_plan();

        // Item 1 is in the other lane, item 2 is ahead in this one
        assert_eq!(report.alloc.assigned, vec![(2, 0)]);
        assert!(coord.queue().is_pending(1));

        let lanes = coord.planner().lanes();
        let waypoints = coord
            .planner()
            .plan(coord.map(), &Pose::new(1000, 1000, 90.0), &Location::new(2000, 5000))
            .unwrap();
        assert!(waypoints
            .iter()
            .all(|w| lanes.lane_of(w.x) == Some(0)));

        assert!(plan.contains_key(&0));
    }

    #[test]
    fn test_service_trip() {
        let mut p = params();
        p.planner.lane_spans = vec![(0, 4000), (4000, 8000)];
        p.queue.service_preemption = true;
        p.queue.service_location = Location::new(1000, 1000);
        let mut coord = Coordinator::new(p).unwrap();

        coord
            .apply_tick(&poses(&[(0, Pose::new(5000, 1000, 90.0))]))
            .unwrap();

        // Low on charge in lane 1, the service point is in lane 0
        let mut snap = snapshot(0, "gripper");
        snap.charge_pct = 20.0;
        snap.local_grid = patch(0..=0, -2..=1);
        coord.apply_tick(&Tick::Unit(snap)).unwrap();

        let (plan, report) = coord.get_plan();

        assert_eq!(report.alloc.preempted, vec![0]);
        assert!(report.failed_plans.is_empty());
        assert!(coord.unit(0).unwrap().todo[0].is_service());
        assert_eq!(coord.unit(0).unwrap().todo[0].state, TaskState::Active);

        let commands = &plan[&0];
        assert!(!commands
            .iter()
            .any(|c| matches!(c, Command::Pick { .. })));

        let (dx, dy) = commands.iter().fold((0, 0), |(x, y), c| match c {
            Command::Move { dx_mm, dy_mm } => (x + dx_mm, y + dy_mm),
            _ => (x, y),
        });
        assert_eq!((dx, dy), (-4000, 0));
    }
}
