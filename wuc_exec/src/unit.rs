//! # Worker unit
//!
//! The coordinator's record of a single worker unit. The pose and status are overwritten by each
//! sync, the to-do and command queues are only changed by the coordinator and its task queue.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::VecDeque;

use comms_if::{
    cmd::Command,
    geom::{Location, Pose},
    tick::{SkillId, UnitId},
};
use serde::Serialize;

use crate::tasks::Task;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Unit {
    pub id: UnitId,

    /// Latest carrier-frame pose.
    pub pose: Pose,

    /// Units: percent
    pub charge_pct: f64,

    /// Units: percent
    pub bin_pct: f64,

    /// The fitted end effector, `None` until the unit first reports.
    pub skill: Option<SkillId>,

    /// Tasks assigned to this unit, the head being the one in progress.
    pub todo: VecDeque<Task>,

    /// Commands issued for the head task which the unit hasn't yet reported complete.
    pub commands: Vec<Command>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Unit {
    /// Create a unit record as first seen in a pose batch: fully charged, empty bin, no skill.
    pub fn new(id: UnitId, pose: Pose) -> Self {
        Self {
            id,
            pose,
            charge_pct: 100.0,
            bin_pct: 0.0,
            skill: None,
            todo: VecDeque::new(),
            commands: Vec::new(),
        }
    }

    /// True if the unit's end effector is in the given list.
    pub fn has_skill(&self, skills: &[SkillId]) -> bool {
        match self.skill {
            Some(ref s) => skills.contains(s),
            None => false,
        }
    }

    /// Where the unit will be once its to-do list is complete: the location of its last task,
    /// or its current position if it has none.
    pub fn effective_start(&self) -> Location {
        match self.todo.back() {
            Some(t) => t.location,
            None => self.pose.location(),
        }
    }

    /// Remove the head of the to-do list, dropping any commands issued for it.
    pub fn pop_task(&mut self) -> Option<Task> {
        self.commands.clear();
        self.todo.pop_front()
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::tasks::{TaskKind, TaskState};

    #[test]
    fn test_new_unit() {
        let unit = Unit::new(4, Pose::new(10, 20, 90.0));

        assert_eq!(unit.charge_pct, 100.0);
        assert_eq!(unit.bin_pct, 0.0);
        assert!(unit.skill.is_none());
        assert!(!unit.has_skill(&[SkillId::from("gripper")]));
        assert_eq!(unit.effective_start(), Location::new(10, 20));
    }

    #[test]
    fn test_effective_start() {
        let mut unit = Unit::new(4, Pose::new(10, 20, 90.0));
        unit.skill = Some(SkillId::from("gripper"));
        unit.todo.push_back(Task {
            id: 3,
            location: Location::new(3000, 7000),
            state: TaskState::Queued,
            kind: TaskKind::Retrieve {
                item_id: 9,
                item_type: "can".into(),
                volume: 330.0,
                skills: vec![SkillId::from("gripper")],
            },
        });
        unit.commands.push(Command::Rotate { da_deg: 10.0 });

        assert!(unit.has_skill(&[SkillId::from("suction"), SkillId::from("gripper")]));
        assert_eq!(unit.effective_start(), Location::new(3000, 7000));

        assert_eq!(unit.pop_task().map(|t| t.id), Some(3));
        assert!(unit.commands.is_empty());
        assert_eq!(unit.pop_task(), None);
    }
}
