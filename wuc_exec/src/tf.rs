//! # Coordinate transforms
//!
//! Conversions between a frame and its parent, for example between a unit's own frame and the
//! carrier frame. A frame is described by a [`Pose`] in its parent: the position of its origin and
//! the rotation of its X axis, anticlockwise in degrees.
//!
//! Positions are integer millimeters so results are rounded to the nearest millimeter, meaning
//! that a round trip through [`absolute`] and [`relative`] is exact to within one millimeter.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::geom::{Location, Pose};
use nalgebra::{Isometry2, Point2, Vector2};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Types which can be moved between a frame and its parent.
pub trait Transform: Sized {
    /// Express self, which is given relative to `frame`, in the frame's parent.
    fn get_absolute(&self, frame: &Pose) -> Self;

    /// Express self, which is given in the parent of `frame`, relative to `frame`.
    fn relative_to(&self, frame: &Pose) -> Self;
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Express the `relative` value, given in `frame`, in the frame's parent.
pub fn absolute<T: Transform>(frame: &Pose, relative: &T) -> T {
    relative.get_absolute(frame)
}

/// Express the `absolute` value, given in the parent of `frame`, relative to `frame`.
pub fn relative<T: Transform>(frame: &Pose, absolute: &T) -> T {
    absolute.relative_to(frame)
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Transform for Location {
    fn get_absolute(&self, frame: &Pose) -> Self {
        from_point(isometry(frame) * to_point(self))
    }

    fn relative_to(&self, frame: &Pose) -> Self {
        from_point(isometry(frame).inverse_transform_point(&to_point(self)))
    }
}

impl Transform for Pose {
    fn get_absolute(&self, frame: &Pose) -> Self {
        let loc = self.location().get_absolute(frame);
        Pose::new(loc.x, loc.y, frame.a + self.a)
    }

    fn relative_to(&self, frame: &Pose) -> Self {
        let loc = self.location().relative_to(frame);
        Pose::new(loc.x, loc.y, self.a - frame.a)
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn isometry(frame: &Pose) -> Isometry2<f64> {
    Isometry2::new(
        Vector2::new(frame.x as f64, frame.y as f64),
        frame.a.to_radians(),
    )
}

fn to_point(loc: &Location) -> Point2<f64> {
    Point2::new(loc.x as f64, loc.y as f64)
}

fn from_point(point: Point2<f64>) -> Location {
    Location::new(point.x.round() as i64, point.y.round() as i64)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
