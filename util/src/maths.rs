//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. Due to floating point round-off it can result in
/// `r == rhs.abs()` when `lhs` is much smaller than `rhs.abs()` in magnitude
/// and negative.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float,
{
    let r = lhs % rhs;
    if r < T::zero() {
        r + rhs.abs()
    } else {
        r
    }
}

/// Wrap an angle in degrees into the range (-180, 180].
pub fn wrap_deg_180<T>(angle: T) -> T
where
    T: Float,
{
    let half_turn = T::from(180.0).unwrap_or_else(T::zero);
    let full_turn = half_turn + half_turn;

    let wrapped = rem_euclid(angle + half_turn, full_turn) - half_turn;

    if wrapped <= -half_turn {
        wrapped + full_turn
    } else {
        wrapped
    }
}

/// Get the shortest signed rotation in degrees which takes heading `from` onto heading `to`.
///
/// The result is in the range (-180, 180], positive anticlockwise.
pub fn get_ang_dist_deg<T>(from: T, to: T) -> T
where
    T: Float,
{
    wrap_deg_180(to - from)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_rem_euclid() {
        assert_eq!(rem_euclid(7.0, 4.0), 3.0);
        assert_eq!(rem_euclid(-1.0, 4.0), 3.0);
        assert_eq!(rem_euclid(-8.0, 4.0), 0.0);
    }

    #[test]
    fn test_wrap_deg_180() {
        assert_eq!(wrap_deg_180(0f64), 0f64);
        assert_eq!(wrap_deg_180(180f64), 180f64);
        assert_eq!(wrap_deg_180(-180f64), 180f64);
        assert_eq!(wrap_deg_180(270f64), -90f64);
        assert_eq!(wrap_deg_180(-270f64), 90f64);
        assert_eq!(wrap_deg_180(720f64 + 45f64), 45f64);
    }

    #[test]
    fn test_get_ang_dist_deg() {
        assert_eq!(get_ang_dist_deg(90f64, 0f64), -90f64);
        assert_eq!(get_ang_dist_deg(170f64, -170f64), 20f64);
        assert_eq!(get_ang_dist_deg(-170f64, 170f64), -20f64);
        assert_eq!(get_ang_dist_deg(0f64, 180f64), 180f64);
    }
}
