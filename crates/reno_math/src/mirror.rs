//! Tolerance comparisons for locating mirrored bones.
//!
//! Two points mirror each other across a world plane when exactly one
//! coordinate is negated and the other two coincide.

use glam::DVec3;

/// A world axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    fn component(self, v: DVec3) -> f64 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
            Axis::Z => v.z,
        }
    }
}

/// Returns true if `a` and `b` differ by at most `tolerance`.
pub fn approx_eq(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}

/// Find the single axis across which `a` and `b` are reflections of each other.
///
/// The mirrored component must be equal-and-opposite but not equal (points on
/// the mirror plane are not their own reflections), and the remaining two
/// components must be equal. Returns `None` when no axis, or more than one,
/// qualifies.
pub fn mirror_axis(a: DVec3, b: DVec3, tolerance: f64) -> Option<Axis> {
    let mut mirrored = None;
    for axis in Axis::ALL {
        let (ca, cb) = (axis.component(a), axis.component(b));
        if approx_eq(ca, cb, tolerance) {
            continue;
        }
        if !approx_eq(ca, -cb, tolerance) || mirrored.is_some() {
            return None;
        }
        mirrored = Some(axis);
    }
    mirrored
}
