//! # Tick script interpreter module
//!
//! This module provides an interpreter for coordinator scripts, allowing a
//! recorded or hand-written sequence of ticks to be replayed against the
//! coordinator.
//!
//! A script is a sequence of entries of the form `<time_s>: <tick json>;`,
//! for example:
//!
//! ```text
//! 0.0: {"Poses": {"1": {"x": 0, "y": 0, "a": 90.0}}};
//! 0.5: {"Carrier": {"dy_mm": 100, "speed_mms": 200.0}};
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use regex::RegexBuilder;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Internal
use crate::session::get_elapsed_seconds;
use comms_if::tick::{Tick, TickParseError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A tick which is scripted to occur at a specific time.
struct ScriptedTick {
    /// The time the tick is supposed to be delivered at
    exec_time_s: f64,

    /// The tick to deliver
    tick: Tick,
}

/// A script interpreter.
///
/// After initialising with the path to the script to run use
/// `.get_pending_ticks` to acquire a list of ticks that need delivering.
pub struct ScriptInterpreter {
    script_path: Option<PathBuf>,
    ticks: VecDeque<ScriptedTick>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0:?}")]
    ScriptNotFound(PathBuf),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("Could not build the script pattern: {0}")]
    PatternError(regex::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error(
        "Script contains an invalid timestamp: {0}. \
        Should be a float (like 1.0)"
    )]
    InvalidTimestamp(String),

    #[error("Script timestamps must not decrease, found {1} s after {0} s")]
    TimestampOutOfOrder(f64, f64),

    #[error("Script contains an invalid tick at {0} s: {1}")]
    InvalidTick(f64, TickParseError),
}

pub enum PendingTicks {
    None,
    Some(Vec<Tick>),
    EndOfScript,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptInterpreter {
    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {
        let path = PathBuf::from(script_path.as_ref());

        if !path.exists() {
            return Err(ScriptError::ScriptNotFound(path));
        }

        let script = fs::read_to_string(&path).map_err(ScriptError::ScriptLoadError)?;

        let mut interp = Self::from_script_str(&script)?;
        interp.script_path = Some(path);

        Ok(interp)
    }

    /// Create a new interpreter from the contents of a script.
    pub fn from_script_str(script: &str) -> Result<Self, ScriptError> {
        let mut tick_queue: VecDeque<ScriptedTick> = VecDeque::new();

        // Go through the script executing __the magic regex__.
        let re = RegexBuilder::new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);")
            .multi_line(true)
            .build()
            .map_err(ScriptError::PatternError)?;

        for cap in re.captures_iter(script) {
            let (time_str, payload) = match (cap.get(1), cap.get(3)) {
                (Some(t), Some(p)) => (t.as_str(), p.as_str()),
                _ => continue,
            };

            let exec_time_s: f64 = time_str
                .parse()
                .map_err(|e| ScriptError::InvalidTimestamp(format!("{}", e)))?;

            if let Some(last) = tick_queue.back() {
                if exec_time_s < last.exec_time_s {
                    return Err(ScriptError::TimestampOutOfOrder(
                        last.exec_time_s,
                        exec_time_s,
                    ));
                }
            }

            // The scripts contain JSON only.
            let tick = Tick::from_json(payload)
                .map_err(|e| ScriptError::InvalidTick(exec_time_s, e))?;

            tick_queue.push_back(ScriptedTick { exec_time_s, tick });
        }

        if tick_queue.is_empty() {
            return Err(ScriptError::ScriptEmpty);
        }

        Ok(ScriptInterpreter {
            script_path: None,
            ticks: tick_queue,
        })
    }

    /// Return the ticks that are due at the current session time.
    pub fn get_pending_ticks(&mut self) -> PendingTicks {
        self.get_pending_ticks_at(get_elapsed_seconds())
    }

    /// Return the ticks that are due at `current_time_s`, or `None` if no ticks need delivering
    /// yet.
    pub fn get_pending_ticks_at(&mut self, current_time_s: f64) -> PendingTicks {
        // If the queue is empty the script is over
        if self.ticks.is_empty() {
            return PendingTicks::EndOfScript;
        }

        let mut tick_vec: Vec<Tick> = vec![];

        while let Some(front) = self.ticks.front() {
            if front.exec_time_s > current_time_s {
                break;
            }

            if let Some(t) = self.ticks.pop_front() {
                tick_vec.push(t.tick);
            }
        }

        if tick_vec.is_empty() {
            PendingTicks::None
        } else {
            PendingTicks::Some(tick_vec)
        }
    }

    /// Path of the script file, if the interpreter was loaded from one.
    pub fn script_path(&self) -> Option<&Path> {
        self.script_path.as_deref()
    }

    /// Get the number of ticks remaining in the script
    pub fn get_num_ticks(&self) -> usize {
        self.ticks.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.ticks.back() {
            Some(t) => t.exec_time_s,
            None => 0f64,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const SCRIPT: &str = r#"
        0.0: {"Poses": {"1": {"x": 0, "y": 0, "a": 90.0}}};
        0.5: {"Carrier": {"dy_mm": 100, "speed_mms": 200.0}};
        0.5: {"Unit": {"unit_id": 1, "charge_pct": 90.0, "bin_pct": 0.0, "skill": "gripper"}};
        2.0: {"Carrier": {"dy_mm": 300, "speed_mms": 200.0}};
    "#;

    #[test]
    fn test_pending_ticks() {
        let mut interp = ScriptInterpreter::from_script_str(SCRIPT).unwrap();

        assert_eq!(interp.get_num_ticks(), 4);
        assert_eq!(interp.get_duration(), 2.0);
        assert!(interp.script_path().is_none());

        match interp.get_pending_ticks_at(0.0) {
            PendingTicks::Some(t) => assert_eq!(t.len(), 1),
            _ => panic!("Expected the pose tick to be pending"),
        }

        assert!(matches!(interp.get_pending_ticks_at(0.2), PendingTicks::None));

        match interp.get_pending_ticks_at(1.0) {
            PendingTicks::Some(t) => {
                assert_eq!(t.len(), 2);
                assert!(matches!(t[0], Tick::Carrier(_)));
                assert!(matches!(t[1], Tick::Unit(_)));
            }
            _ => panic!("Expected two ticks to be pending"),
        }

        assert!(matches!(
            interp.get_pending_ticks_at(5.0),
            PendingTicks::Some(_)
        ));
        assert!(matches!(
            interp.get_pending_ticks_at(6.0),
            PendingTicks::EndOfScript
        ));
    }

    #[test]
    fn test_empty_script() {
        assert!(matches!(
            ScriptInterpreter::from_script_str("# nothing here\n"),
            Err(ScriptError::ScriptEmpty)
        ));
    }

    #[test]
    fn test_out_of_order() {
        let script = r#"
            1.0: {"Carrier": {"dy_mm": 1, "speed_mms": 1.0}};
            0.5: {"Carrier": {"dy_mm": 1, "speed_mms": 1.0}};
        "#;

        assert!(matches!(
            ScriptInterpreter::from_script_str(script),
            Err(ScriptError::TimestampOutOfOrder(_, _))
        ));
    }

    #[test]
    fn test_invalid_tick() {
        assert!(matches!(
            ScriptInterpreter::from_script_str(r#"0.0: {"Bogus": 1};"#),
            Err(ScriptError::InvalidTick(_, _))
        ));
    }

    #[test]
    fn test_missing_script() {
        assert!(matches!(
            ScriptInterpreter::new("/definitely/not/a/script.wucs"),
            Err(ScriptError::ScriptNotFound(_))
        ));
    }
}
