use super::Vector2d;
use std::f64::consts::TAU;

/// The unit vector pointing along a heading.
///
/// The engine uses screen coordinates where the y axis points down,
/// so a heading of zero points along positive x and a heading of
/// `PI / 2` points along negative y.
pub fn heading_vector(angle: f64) -> Vector2d {
    Vector2d::new(angle.cos(), -angle.sin())
}

/// The heading of a vector in screen coordinates (y axis down).
pub fn vector_heading(v: Vector2d) -> f64 {
    wrap_angle(f64::atan2(-v.y, v.x))
}

/// Wraps an angle into the range `[0, TAU)`.
pub fn wrap_angle(angle: f64) -> f64 {
    let a = angle % TAU;
    if a < 0.0 {
        a + TAU
    } else {
        a
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn heading_roundtrip() {
        for angle in [0.0, 0.5, FRAC_PI_2, PI, 4.0, 6.0] {
            assert_approx_eq!(vector_heading(heading_vector(angle)), angle, 1e-9);
        }
    }

    #[test]
    fn wrap() {
        assert_approx_eq!(wrap_angle(-FRAC_PI_2), 1.5 * PI, 1e-9);
        assert_approx_eq!(wrap_angle(2.5 * PI), 0.5 * PI, 1e-9);
    }
}
