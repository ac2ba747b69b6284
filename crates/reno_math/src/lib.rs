// Re-export glam for convenience
pub use glam::*;

// Reno math types
mod color;
mod mirror;
pub use color::Rgba;
pub use mirror::{approx_eq, mirror_axis, Axis};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dvec3_keeps_f64_precision() {
        let v = DVec3::new(0.1234567890123, -2.0, 3.5);
        assert_eq!(v.x.to_string(), "0.1234567890123");
        assert_eq!(v.y.to_string(), "-2");
    }

    #[test]
    fn test_dvec3_operations() {
        let a = DVec3::new(1.0, 2.0, 3.0);
        let b = DVec3::new(4.0, 5.0, 6.0);
        assert_eq!(a + b, DVec3::new(5.0, 7.0, 9.0));
    }
}
