//! Planar geometry kernel
//!
//! Pure functions over points, segments, and polygons: segment intersection,
//! point-in-polygon, pose transforms, and ray casting. Every other module
//! treats these results as exact; the floating-point tolerance below is the
//! only one in the crate.

use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// Floating-point tolerance for intersection and containment tests
pub const EPSILON: f32 = 1e-6;

/// A point (or vector) in the maze plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A wall or polygon edge between two points
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Segment {
    pub a: Point,
    pub b: Point,
}

impl Segment {
    pub fn new(a: Point, b: Point) -> Self {
        Self { a, b }
    }

    /// Squared length, used to reject degenerate segments
    fn length_sq(&self) -> f32 {
        let dx = self.b.x - self.a.x;
        let dy = self.b.y - self.a.y;
        dx * dx + dy * dy
    }
}

/// Robot pose: position plus heading, heading normalized to [0, 2π)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x: f32,
    pub y: f32,
    pub heading: f32,
}

impl Pose {
    pub fn new(x: f32, y: f32, heading: f32) -> Self {
        Self {
            x,
            y,
            heading: normalize_heading(heading),
        }
    }

    /// Transform a body-frame point into the world frame
    pub fn transform(&self, local: Point) -> Point {
        let cos = self.heading.cos();
        let sin = self.heading.sin();
        Point {
            x: self.x + local.x * cos - local.y * sin,
            y: self.y + local.x * sin + local.y * cos,
        }
    }
}

/// Normalize an angle to [0, 2π)
pub fn normalize_heading(angle: f32) -> f32 {
    let a = angle.rem_euclid(TAU);
    // rem_euclid can return TAU itself when the input is a tiny negative
    if a >= TAU { a - TAU } else { a }
}

fn cross(ax: f32, ay: f32, bx: f32, by: f32) -> f32 {
    ax * by - ay * bx
}

/// Intersection point of two segments, if any.
///
/// Parallel, collinear, and zero-length inputs all yield `None`.
pub fn segment_intersection(s1: &Segment, s2: &Segment) -> Option<Point> {
    if s1.length_sq() < EPSILON * EPSILON || s2.length_sq() < EPSILON * EPSILON {
        return None;
    }

    let rx = s1.b.x - s1.a.x;
    let ry = s1.b.y - s1.a.y;
    let sx = s2.b.x - s2.a.x;
    let sy = s2.b.y - s2.a.y;

    let denom = cross(rx, ry, sx, sy);
    if denom.abs() < EPSILON {
        return None;
    }

    let qpx = s2.a.x - s1.a.x;
    let qpy = s2.a.y - s1.a.y;
    let t = cross(qpx, qpy, sx, sy) / denom;
    let u = cross(qpx, qpy, rx, ry) / denom;

    if (-EPSILON..=1.0 + EPSILON).contains(&t) && (-EPSILON..=1.0 + EPSILON).contains(&u) {
        Some(Point {
            x: s1.a.x + t * rx,
            y: s1.a.y + t * ry,
        })
    } else {
        None
    }
}

/// Even-odd (ray crossing) point-in-polygon test
pub fn point_in_polygon(p: Point, polygon: &[Point]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let pi = polygon[i];
        let pj = polygon[j];
        if (pi.y > p.y) != (pj.y > p.y) {
            let x_cross = (pj.x - pi.x) * (p.y - pi.y) / (pj.y - pi.y) + pi.x;
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Instantiate a body-shape template at a pose (rotate then translate)
pub fn polygon_from_pose(template: &[Point], pose: &Pose) -> Vec<Point> {
    template.iter().map(|p| pose.transform(*p)).collect()
}

/// Edges of a closed polygon, including the wrap-around edge
pub fn polygon_edges(polygon: &[Point]) -> Vec<Segment> {
    let n = polygon.len();
    (0..n)
        .map(|i| Segment::new(polygon[i], polygon[(i + 1) % n]))
        .collect()
}

/// True if any edge of `polygon` crosses `segment`, or the segment lies
/// entirely inside the polygon.
pub fn polygon_intersects_segment(polygon: &[Point], segment: &Segment) -> bool {
    for edge in polygon_edges(polygon) {
        if segment_intersection(&edge, segment).is_some() {
            return true;
        }
    }
    // A short wall fully swallowed by the footprint crosses no edge
    point_in_polygon(segment.a, polygon)
}

/// Cast a ray and return the distance to the nearest obstacle.
///
/// Returns `max_range` if nothing is hit within range.
pub fn cast_ray(origin: Point, heading: f32, max_range: f32, obstacles: &[Segment]) -> f32 {
    let ray = Segment::new(
        origin,
        Point {
            x: origin.x + heading.cos() * max_range,
            y: origin.y + heading.sin() * max_range,
        },
    );

    let mut nearest = max_range;
    for wall in obstacles {
        if let Some(hit) = segment_intersection(&ray, wall) {
            let d = origin.distance(hit);
            if d < nearest {
                nearest = d;
            }
        }
    }
    nearest
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_segment_intersection_crossing() {
        let s1 = Segment::new(Point::new(0.0, 0.0), Point::new(2.0, 2.0));
        let s2 = Segment::new(Point::new(0.0, 2.0), Point::new(2.0, 0.0));
        let hit = segment_intersection(&s1, &s2).unwrap();
        assert!((hit.x - 1.0).abs() < 1e-4);
        assert!((hit.y - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_segment_intersection_disjoint() {
        let s1 = Segment::new(Point::new(0.0, 0.0), Point::new(1.0, 0.0));
        let s2 = Segment::new(Point::new(0.0, 1.0), Point::new(1.0, 1.0));
        assert!(segment_intersection(&s1, &s2).is_none());
    }

    #[test]
    fn test_zero_length_segment_no_intersection() {
        let degenerate = Segment::new(Point::new(1.0, 1.0), Point::new(1.0, 1.0));
        let s = Segment::new(Point::new(0.0, 0.0), Point::new(2.0, 2.0));
        assert!(segment_intersection(&degenerate, &s).is_none());
        assert!(segment_intersection(&s, &degenerate).is_none());
    }

    #[test]
    fn test_point_in_polygon() {
        let square = vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 4.0),
            Point::new(0.0, 4.0),
        ];
        assert!(point_in_polygon(Point::new(2.0, 2.0), &square));
        assert!(!point_in_polygon(Point::new(5.0, 2.0), &square));
        assert!(!point_in_polygon(Point::new(-1.0, -1.0), &square));
    }

    #[test]
    fn test_polygon_from_pose_rotation() {
        let template = vec![Point::new(1.0, 0.0)];
        let pose = Pose::new(0.0, 0.0, FRAC_PI_2);
        let world = polygon_from_pose(&template, &pose);
        assert!(world[0].x.abs() < 1e-5);
        assert!((world[0].y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_polygon_from_pose_translation() {
        let template = vec![Point::new(1.0, 1.0)];
        let pose = Pose::new(10.0, 20.0, 0.0);
        let world = polygon_from_pose(&template, &pose);
        assert!((world[0].x - 11.0).abs() < 1e-5);
        assert!((world[0].y - 21.0).abs() < 1e-5);
    }

    #[test]
    fn test_cast_ray_hits_nearest_wall() {
        let walls = vec![
            Segment::new(Point::new(5.0, -1.0), Point::new(5.0, 1.0)),
            Segment::new(Point::new(8.0, -1.0), Point::new(8.0, 1.0)),
        ];
        let d = cast_ray(Point::new(0.0, 0.0), 0.0, 20.0, &walls);
        assert!((d - 5.0).abs() < 1e-3);
    }

    #[test]
    fn test_cast_ray_clips_to_max_range() {
        let walls = vec![Segment::new(Point::new(50.0, -1.0), Point::new(50.0, 1.0))];
        let d = cast_ray(Point::new(0.0, 0.0), 0.0, 10.0, &walls);
        assert_eq!(d, 10.0);
    }

    #[test]
    fn test_cast_ray_direction_matters() {
        let walls = vec![Segment::new(Point::new(5.0, -1.0), Point::new(5.0, 1.0))];
        // Facing away from the wall
        let d = cast_ray(Point::new(0.0, 0.0), PI, 20.0, &walls);
        assert_eq!(d, 20.0);
    }

    #[test]
    fn test_polygon_intersects_segment() {
        let square = vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(0.0, 2.0),
        ];
        let crossing = Segment::new(Point::new(1.0, -1.0), Point::new(1.0, 3.0));
        let outside = Segment::new(Point::new(5.0, 0.0), Point::new(5.0, 2.0));
        let enclosed = Segment::new(Point::new(0.5, 1.0), Point::new(1.5, 1.0));
        assert!(polygon_intersects_segment(&square, &crossing));
        assert!(!polygon_intersects_segment(&square, &outside));
        assert!(polygon_intersects_segment(&square, &enclosed));
    }

    #[test]
    fn test_normalize_heading_range() {
        assert!((normalize_heading(-FRAC_PI_2) - 3.0 * FRAC_PI_2).abs() < 1e-5);
        assert!(normalize_heading(TAU).abs() < 1e-5);
        assert!((normalize_heading(3.0 * PI) - PI).abs() < 1e-4);
        for angle in [-7.3, -0.1, 0.0, 1.0, 6.2, 12.9] {
            let n = normalize_heading(angle);
            assert!((0.0..TAU).contains(&n), "angle {} -> {}", angle, n);
        }
    }
}
