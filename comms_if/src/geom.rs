//! # Geometry primitives
//!
//! Poses and locations exchanged between the coordinator and the worker units. Positions are in
//! millimeters, headings in degrees measured anticlockwise from the +X axis of the frame the
//! value is expressed in.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::fmt;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A position and heading within some frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    /// Units: millimeters
    pub x: i64,

    /// Units: millimeters
    pub y: i64,

    /// Heading.
    ///
    /// Units: degrees
    pub a: f64,
}

/// A position within some frame, with no orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Location {
    /// Units: millimeters
    pub x: i64,

    /// Units: millimeters
    pub y: i64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Pose {
    pub fn new(x: i64, y: i64, a: f64) -> Self {
        Self { x, y, a }
    }

    /// The position of this pose, dropping the heading.
    pub fn location(&self) -> Location {
        Location::new(self.x, self.y)
    }

    /// Euclidean distance between the positions of self and `other`.
    pub fn distance(&self, other: &Location) -> f64 {
        self.location().distance(other)
    }
}

impl Location {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance between self and `other`.
    pub fn distance(&self, other: &Location) -> f64 {
        let dx = (other.x - self.x) as f64;
        let dy = (other.y - self.y) as f64;
        dx.hypot(dy)
    }

    /// Heading from self towards `other` in degrees, in the range [-180, 180].
    pub fn heading_to(&self, other: &Location) -> f64 {
        ((other.y - self.y) as f64)
            .atan2((other.x - self.x) as f64)
            .to_degrees()
    }
}

impl From<Pose> for Location {
    fn from(pose: Pose) -> Self {
        pose.location()
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pose({}, {}, {:.1})", self.x, self.y, self.a)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Location({}, {})", self.x, self.y)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
