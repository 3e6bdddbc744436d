//! # Carrier queue
//!
//! Tracks every item discovered by the fleet and allocates tasks to units.
//!
//! Each retrieve task lives in exactly one place: the pending pool while unassigned, a single
//! unit's to-do list once assigned (its item is then recorded as active), or the finished pool
//! once the unit reports it done. Finished items are kept so that repeat discoveries of the same
//! item are ignored.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::{BTreeMap, BTreeSet, HashSet};

use comms_if::{
    geom::{Location, Pose},
    tick::{Discovery, ItemId, UnitId},
};
use log::{debug, info, warn};
use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::{
    map::{Cell, WorldMap},
    nav::PathPlanner,
    tf,
    unit::Unit,
};

use super::{QueueParams, Task, TaskId, TaskKind, TaskState};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CarrierQueue {
    params: QueueParams,

    /// Unassigned retrieve tasks
    pending: BTreeMap<ItemId, Task>,

    /// Items whose retrieve task is in some unit's to-do list
    active: BTreeSet<ItemId>,

    /// Completed retrieve tasks
    finished: BTreeMap<ItemId, Task>,

    next_task_id: TaskId,
}

/// Outcome of a single allocation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AllocReport {
    /// Retrieve tasks assigned this pass, and the unit they went to.
    pub assigned: Vec<(ItemId, UnitId)>,

    /// Items which no unit has the skill to pick.
    pub unservable: Vec<ItemId>,

    /// Explore targets handed out this pass.
    pub explore: Vec<(UnitId, Cell)>,

    /// Units which were sent for service.
    pub preempted: Vec<UnitId>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueueError {
    #[error("Item {0} was reported as retrieved but it is not assigned to any unit")]
    NotActive(ItemId),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CarrierQueue {
    pub fn new(params: QueueParams) -> Self {
        Self {
            params,
            pending: BTreeMap::new(),
            active: BTreeSet::new(),
            finished: BTreeMap::new(),
            next_task_id: 0,
        }
    }

    /// Rebase all ground-fixed task locations after the carrier moved forward by `dy_mm`.
    ///
    /// This covers the pending and finished pools as well as the tasks in each unit's to-do list.
    pub fn notify_movement(&mut self, dy_mm: i64, units: &mut BTreeMap<UnitId, Unit>) {
        for task in self
            .pending
            .values_mut()
            .chain(self.finished.values_mut())
        {
            task.rebase(dy_mm);
        }

        for unit in units.values_mut() {
            for task in unit.todo.iter_mut() {
                task.rebase(dy_mm);
            }
        }
    }

    /// Create retrieve tasks for new discoveries made by a unit at `unit_pose`.
    ///
    /// Discoveries below the certainty threshold, or of items already known, are ignored. Returns
    /// the number of tasks created.
    pub fn notify_discoveries(&mut self, unit_pose: &Pose, discoveries: &[Discovery]) -> usize {
        let mut num_created = 0;

        for discovery in discoveries {
            if discovery.certainty < self.params.discovery_certainty_threshold {
                continue;
            }

            if self.is_known(discovery.item_id) {
                continue;
            }

            let location: Location = tf::absolute(unit_pose, &discovery.location);
            let id = self.next_id();

            let task = Task {
                id,
                location,
                state: TaskState::Queued,
                kind: TaskKind::Retrieve {
                    item_id: discovery.item_id,
                    item_type: discovery.item_type.clone(),
                    volume: discovery.volume,
                    skills: discovery.skills.clone(),
                },
            };

            debug!("New task {}", task);

            self.pending.insert(discovery.item_id, task);
            num_created += 1;
        }

        num_created
    }

    /// Record a task popped from a unit's to-do list as finished.
    ///
    /// Only retrieve tasks are tracked, others are simply dropped.
    pub fn complete(&mut self, task: Task) -> Result<(), QueueError> {
        let item_id = match task.item_id() {
            Some(i) => i,
            None => return Ok(()),
        };

        if !self.active.remove(&item_id) {
            return Err(QueueError::NotActive(item_id));
        }

        info!("Item {} retrieved", item_id);

        self.finished.insert(item_id, task);

        Ok(())
    }

    /// Run one allocation pass over all units.
    ///
    /// `tick` seeds the shuffle of the unit order together with the configured seed, so that
    /// ties are not always won by the same unit.
    pub fn allocate(
        &mut self,
        units: &mut BTreeMap<UnitId, Unit>,
        map: &WorldMap,
        planner: &PathPlanner,
        tick: u64,
    ) -> AllocReport {
        let mut report = AllocReport::default();

        // ---- SHUFFLE ----

        let mut order: Vec<UnitId> = units.keys().copied().collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.params.shuffle_seed.wrapping_add(tick));
        order.shuffle(&mut rng);

        // ---- DROP EXPLORE ----

        // Explore targets are recomputed every pass
        for unit in units.values_mut() {
            if unit.todo.front().map_or(false, |t| t.is_explore()) {
                unit.pop_task();
            }
        }

        // ---- SERVICE ----

        if self.params.service_preemption {
            self.assign_service_tasks(units, &order, &mut report);
        }

        // ---- RETRIEVE ----

        let mut task_order: Vec<(i64, ItemId)> = self
            .pending
            .iter()
            .map(|(id, t)| (t.location.y, *id))
            .collect();
        task_order.sort_unstable();

        for (_, item_id) in task_order {
            let task = match self.pending.get(&item_id) {
                Some(t) => t,
                None => continue,
            };

            let skills = match task.kind {
                TaskKind::Retrieve { ref skills, .. } => skills,
                _ => continue,
            };

            let candidates: Vec<UnitId> = order
                .iter()
                .copied()
                .filter(|id| units.get(id).map_or(false, |u| u.has_skill(skills)))
                .collect();

            if candidates.is_empty() {
                warn!(
                    "No unit can retrieve {}, one of {:?} is required",
                    task,
                    skills.iter().map(|s| s.0.as_str()).collect::<Vec<_>>()
                );
                report.unservable.push(item_id);
                continue;
            }

            let mut best: Option<(UnitId, f64)> = None;

            for unit_id in candidates {
                let unit = match units.get(&unit_id) {
                    Some(u) => u,
                    None => continue,
                };

                // Backpressure
                if unit.todo.len() >= self.params.max_assignments_per_unit {
                    continue;
                }

                let distance = match planner.distance(&unit.effective_start(), &task.location) {
                    Some(d) => d,
                    None => continue,
                };

                let score =
                    distance + self.params.queue_length_penalty * unit.todo.len() as f64;

                if best.map_or(true, |(_, s)| score < s) {
                    best = Some((unit_id, score));
                }
            }

            if let Some((unit_id, _)) = best {
                if let (Some(unit), Some(mut task)) =
                    (units.get_mut(&unit_id), self.pending.remove(&item_id))
                {
                    task.state = TaskState::Queued;
                    unit.todo.push_back(task);
                    self.active.insert(item_id);
                    report.assigned.push((item_id, unit_id));
                }
            }
        }

        // ---- EXPLORE ----

        let mut claimed: HashSet<Cell> = HashSet::new();

        for unit_id in order.iter() {
            let unit = match units.get_mut(unit_id) {
                Some(u) => u,
                None => continue,
            };

            if !unit.todo.is_empty() {
                continue;
            }

            let origin = unit.pose.location();
            let mut nearest: Option<(Cell, Location, f64)> = None;

            for cell in map.frontier() {
                if claimed.contains(cell) {
                    continue;
                }

                let centre = map.get_center_location(cell);

                let distance = match planner.distance(&origin, &centre) {
                    Some(d) => d,
                    None => continue,
                };

                if nearest.map_or(true, |(_, _, d)| distance < d) {
                    nearest = Some((*cell, centre, distance));
                }
            }

            if let Some((cell, centre, _)) = nearest {
                let id = self.next_task_id;
                self.next_task_id += 1;

                unit.todo.push_back(Task {
                    id,
                    location: centre,
                    state: TaskState::Queued,
                    kind: TaskKind::Explore { cell },
                });

                claimed.insert(cell);
                report.explore.push((*unit_id, cell));
            }
        }

        debug!(
            "Allocation: {} assigned, {} unservable, {} exploring, {} preempted, {} pending",
            report.assigned.len(),
            report.unservable.len(),
            report.explore.len(),
            report.preempted.len(),
            self.pending.len()
        );

        report
    }

    /// True if the item has been seen before, whatever the state of its task.
    pub fn is_known(&self, item_id: ItemId) -> bool {
        self.pending.contains_key(&item_id)
            || self.active.contains(&item_id)
            || self.finished.contains_key(&item_id)
    }

    pub fn is_pending(&self, item_id: ItemId) -> bool {
        self.pending.contains_key(&item_id)
    }

    pub fn is_active(&self, item_id: ItemId) -> bool {
        self.active.contains(&item_id)
    }

    pub fn is_finished(&self, item_id: ItemId) -> bool {
        self.finished.contains_key(&item_id)
    }

    /// Iterate over the unassigned tasks, in item order.
    pub fn pending(&self) -> impl Iterator<Item = &Task> {
        self.pending.values()
    }

    /// Iterate over the finished tasks, in item order.
    pub fn finished(&self) -> impl Iterator<Item = &Task> {
        self.finished.values()
    }

    pub fn num_pending(&self) -> usize {
        self.pending.len()
    }

    pub fn num_active(&self) -> usize {
        self.active.len()
    }

    pub fn num_finished(&self) -> usize {
        self.finished.len()
    }

    fn next_id(&mut self) -> TaskId {
        let id = self.next_task_id;
        self.next_task_id += 1;
        id
    }

    /// Put a service task at the head of every unit which is low on charge or has a full bin.
    ///
    /// A retrieve task displaced from the head goes back to the pending pool.
    fn assign_service_tasks(
        &mut self,
        units: &mut BTreeMap<UnitId, Unit>,
        order: &[UnitId],
        report: &mut AllocReport,
    ) {
        for unit_id in order {
            let unit = match units.get_mut(unit_id) {
                Some(u) => u,
                None => continue,
            };

            if unit.charge_pct > self.params.charge_threshold_percent
                && unit.bin_pct < self.params.bin_threshold_percent
            {
                continue;
            }

            if unit.todo.front().map_or(false, |t| t.is_service()) {
                continue;
            }

            if unit.todo.front().and_then(|t| t.item_id()).is_some() {
                if let Some(mut displaced) = unit.pop_task() {
                    if let Some(item_id) = displaced.item_id() {
                        info!("Unit {} preempted, requeuing {}", unit_id, displaced);

                        displaced.state = TaskState::Queued;
                        self.active.remove(&item_id);
                        self.pending.insert(item_id, displaced);
                    }
                }
            }

            let id = self.next_task_id;
            self.next_task_id += 1;

            unit.commands.clear();
            unit.todo.push_front(Task {
                id,
                location: self.params.service_location,
                state: TaskState::Queued,
                kind: TaskKind::Service {
                    charge_pct: unit.charge_pct,
                    bin_pct: unit.bin_pct,
                },
            });

            report.preempted.push(*unit_id);
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
