use super::curve::ParametricCurve2d;
use super::{Point2d, Vector2d};
use crate::util::Interval;
use cgmath::prelude::*;

/// A cubic bezier curve
#[derive(Copy, Clone, Debug)]
pub struct CubicBezier2d {
    points: [Point2d; 4],
}

impl CubicBezier2d {
    pub const fn new(points: &[Point2d; 4]) -> Self {
        Self { points: *points }
    }

    /// Creates a bezier from two end points and the tangent directions at them,
    /// placing the control points a third of the chord length along each tangent.
    pub fn from_tangents(start: Point2d, start_dir: Vector2d, end: Point2d, end_dir: Vector2d) -> Self {
        let pull = (end - start).magnitude() / 3.0;
        Self {
            points: [start, start + pull * start_dir, end - pull * end_dir, end],
        }
    }
}

impl ParametricCurve2d for CubicBezier2d {
    fn sample(&self, t: f64) -> Point2d {
        let t1 = 1.0 - t;
        Point2d::from_vec(
            t1 * t1 * t1 * self.points[0].to_vec()
                + 3.0 * t1 * t1 * t * self.points[1].to_vec()
                + 3.0 * t1 * t * t * self.points[2].to_vec()
                + t * t * t * self.points[3].to_vec(),
        )
    }

    fn bounds(&self) -> Interval<f64> {
        Interval { min: 0.0, max: 1.0 }
    }

    fn sample_dt(&self, t: f64) -> Vector2d {
        let t1 = 1.0 - t;
        (-3.0 * t1 * t1) * self.points[0].to_vec()
            + (9.0 * t * t - 12.0 * t + 3.0) * self.points[1].to_vec()
            + (-9.0 * t * t + 6.0 * t) * self.points[2].to_vec()
            + (3.0 * t * t) * self.points[3].to_vec()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn collinear_control_points_sample_linearly() {
        let curve = CubicBezier2d::new(&[
            Point2d::new(0.0, 0.0),
            Point2d::new(10.0, 0.0),
            Point2d::new(20.0, 0.0),
            Point2d::new(30.0, 0.0),
        ]);
        assert_approx_eq!(curve.sample(0.5).x, 15.0, 1e-9);
        assert_approx_eq!(curve.sample(0.5).y, 0.0, 1e-9);
    }

    #[test]
    fn tangent_fit_hits_endpoints() {
        let curve = CubicBezier2d::from_tangents(
            Point2d::new(0.0, 0.0),
            Vector2d::new(1.0, 0.0),
            Point2d::new(100.0, 50.0),
            Vector2d::new(0.0, 1.0),
        );
        let start = curve.sample(0.0);
        let end = curve.sample(1.0);
        assert_approx_eq!(start.x, 0.0, 1e-9);
        assert_approx_eq!(start.y, 0.0, 1e-9);
        assert_approx_eq!(end.x, 100.0, 1e-9);
        assert_approx_eq!(end.y, 50.0, 1e-9);

        // Tangent directions are preserved at the ends.
        let d0 = curve.sample_dt(0.0).normalize();
        let d1 = curve.sample_dt(1.0).normalize();
        assert_approx_eq!(d0.x, 1.0, 1e-9);
        assert_approx_eq!(d1.y, 1.0, 1e-9);
    }
}
