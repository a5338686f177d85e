use crate::math::{heading_vector, Point2d, Vector2d};
use crate::util::Interval;
use cgmath::prelude::*;

/// An oriented rectangle in screen coordinates (y axis points down).
///
/// The corner points and bounding box are derived from the pose and
/// half-extents, and are recomputed whenever the pose changes; they are
/// never mutated independently.
#[derive(Clone, Debug)]
pub struct Shape {
    /// The centre of the rectangle.
    pos: Point2d,
    /// The heading of the long (x) axis.
    angle: f64,
    /// Half-extents along the heading and across it.
    half_dims: Vector2d,
    /// Corner points: front-left, front-right, rear-right, rear-left.
    corners: [Point2d; 4],
    /// The axis-aligned bounding intervals.
    x_bounds: Interval<f64>,
    y_bounds: Interval<f64>,
}

impl Shape {
    /// Creates a new shape from a centre, heading, and full extents.
    pub fn new(x: f64, y: f64, angle: f64, xdim: f64, ydim: f64) -> Self {
        let mut shape = Self {
            pos: Point2d::new(x, y),
            angle,
            half_dims: Vector2d::new(0.5 * xdim, 0.5 * ydim),
            corners: [Point2d::new(0.0, 0.0); 4],
            x_bounds: Interval::default(),
            y_bounds: Interval::default(),
        };
        shape.recompute();
        shape
    }

    /// The centre of the shape.
    pub fn pos(&self) -> Point2d {
        self.pos
    }

    pub fn x(&self) -> f64 {
        self.pos.x
    }

    pub fn y(&self) -> f64 {
        self.pos.y
    }

    /// The heading of the shape's long axis.
    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// Half-extents along and across the heading.
    pub fn half_dims(&self) -> Vector2d {
        self.half_dims
    }

    /// The corner points in order front-left, front-right, rear-right, rear-left.
    pub fn corners(&self) -> &[Point2d; 4] {
        &self.corners
    }

    /// The axis-aligned bounding intervals of the shape.
    pub fn bounds(&self) -> (Interval<f64>, Interval<f64>) {
        (self.x_bounds, self.y_bounds)
    }

    /// The mid-point of the shape's leading edge.
    pub fn front_center(&self) -> Point2d {
        self.pos + self.half_dims.x * heading_vector(self.angle)
    }

    /// The mid-point of the shape's trailing edge.
    pub fn rear_center(&self) -> Point2d {
        self.pos - self.half_dims.x * heading_vector(self.angle)
    }

    /// Moves the shape to a new pose, recomputing corners and bounds.
    pub fn set_pose(&mut self, x: f64, y: f64, angle: f64) {
        self.pos = Point2d::new(x, y);
        self.angle = angle;
        self.recompute();
    }

    /// Returns true if the point lies inside the rectangle (boundary inclusive).
    pub fn contains_point(&self, point: Point2d) -> bool {
        let d = point - self.pos;
        let along = heading_vector(self.angle);
        let across = Vector2d::new(self.angle.sin(), self.angle.cos());
        d.dot(along).abs() <= self.half_dims.x && d.dot(across).abs() <= self.half_dims.y
    }

    /// Returns true if the two rectangles overlap.
    ///
    /// Separating axis test over both rectangles' axes, with an
    /// axis-aligned bounding box pre-rejection.
    pub fn intersects(&self, other: &Shape) -> bool {
        if !self.x_bounds.overlaps(&other.x_bounds) || !self.y_bounds.overlaps(&other.y_bounds) {
            return false;
        }
        self.separating_axes()
            .into_iter()
            .chain(other.separating_axes())
            .all(|axis| {
                Self::project(&self.corners, axis).overlaps(&Self::project(&other.corners, axis))
            })
    }

    /// The centre-to-centre distance to another shape.
    pub fn dist_to(&self, other: &Shape) -> f64 {
        (other.pos - self.pos).magnitude()
    }

    fn separating_axes(&self) -> [Vector2d; 2] {
        [
            heading_vector(self.angle),
            Vector2d::new(self.angle.sin(), self.angle.cos()),
        ]
    }

    fn project(corners: &[Point2d; 4], axis: Vector2d) -> Interval<f64> {
        let mut bounds = Interval::disc(corners[0].to_vec().dot(axis), 0.0);
        for corner in &corners[1..] {
            bounds.expand(corner.to_vec().dot(axis));
        }
        bounds
    }

    fn recompute(&mut self) {
        let along = self.half_dims.x * heading_vector(self.angle);
        let across = self.half_dims.y * Vector2d::new(self.angle.sin(), self.angle.cos());
        self.corners = [
            self.pos + along + across,
            self.pos + along - across,
            self.pos - along - across,
            self.pos - along + across,
        ];
        self.x_bounds = Interval::disc(self.corners[0].x, 0.0);
        self.y_bounds = Interval::disc(self.corners[0].y, 0.0);
        for corner in &self.corners[1..] {
            self.x_bounds.expand(corner.x);
            self.y_bounds.expand(corner.y);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn corners_follow_pose() {
        let mut shape = Shape::new(0.0, 0.0, 0.0, 40.0, 20.0);
        assert_approx_eq!(shape.front_center().x, 20.0, 1e-9);

        shape.set_pose(100.0, 50.0, FRAC_PI_2);
        // Heading of PI/2 points along negative y in screen coordinates.
        assert_approx_eq!(shape.front_center().x, 100.0, 1e-9);
        assert_approx_eq!(shape.front_center().y, 30.0, 1e-9);
        let (xb, yb) = shape.bounds();
        assert_approx_eq!(xb.length(), 20.0, 1e-9);
        assert_approx_eq!(yb.length(), 40.0, 1e-9);
    }

    #[test]
    fn containment() {
        let shape = Shape::new(10.0, 10.0, 0.0, 20.0, 10.0);
        assert!(shape.contains_point(Point2d::new(10.0, 10.0)));
        assert!(shape.contains_point(Point2d::new(19.9, 14.9)));
        assert!(!shape.contains_point(Point2d::new(21.0, 10.0)));
    }

    #[test]
    fn overlap() {
        let a = Shape::new(0.0, 0.0, 0.0, 40.0, 20.0);
        let b = Shape::new(30.0, 0.0, 1.0, 40.0, 20.0);
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));

        let c = Shape::new(1000.0, 0.0, 1.0, 40.0, 20.0);
        assert!(!a.intersects(&c));
    }

    #[test]
    fn rotated_near_miss() {
        // Two rectangles whose bounding boxes overlap but which do not touch.
        let a = Shape::new(0.0, 0.0, 0.0, 40.0, 4.0);
        let b = Shape::new(24.0, 24.0, std::f64::consts::FRAC_PI_4, 40.0, 4.0);
        assert!(!a.intersects(&b));
    }
}
