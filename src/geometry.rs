//! Geometry helpers on normalized image coordinates
//!
//! All coordinates are relative to the image size, in (0, 1), with the
//! origin at the top-left corner.

use serde::{Deserialize, Serialize};

/// A point in normalized image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned box given by its center and extent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub center_x: f64,
    pub center_y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn center(&self) -> Point {
        Point::new(self.center_x, self.center_y)
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Intersection-over-union of two boxes.
///
/// The intersection is computed from centers and extents rather than from
/// corners: the overlap along each axis is the sum of the half extents minus
/// the center offset, clamped to `[0, min(extent)]`. Degenerate boxes
/// (non-positive area) never overlap anything.
pub fn overlap_ratio(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let area_a = a.area();
    let area_b = b.area();
    if area_a <= 0.0 || area_b <= 0.0 {
        return 0.0;
    }

    let inter_w = axis_overlap(a.center_x, a.width, b.center_x, b.width);
    let inter_h = axis_overlap(a.center_y, a.height, b.center_y, b.height);
    let inter = inter_w * inter_h;

    let union = area_a + area_b - inter;
    if union <= 0.0 {
        return 0.0;
    }
    inter / union
}

fn axis_overlap(center_a: f64, extent_a: f64, center_b: f64, extent_b: f64) -> f64 {
    let possible = extent_a / 2.0 + extent_b / 2.0 - (center_a - center_b).abs();
    possible.max(0.0).min(extent_a.min(extent_b))
}

pub fn euclidean(p: Point, q: Point) -> f64 {
    (p.x - q.x).hypot(p.y - q.y)
}

/// Perpendicular distance from `point` to the infinite line through `a` and `b`.
///
/// If `a` and `b` coincide the line is undefined and the distance to `a` is returned.
pub fn point_to_line_distance(point: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len = dx.hypot(dy);
    if len == 0.0 {
        return euclidean(point, a);
    }
    (dy * (point.x - a.x) - dx * (point.y - a.y)).abs() / len
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn bbox(center_x: f64, center_y: f64, width: f64, height: f64) -> BoundingBox {
        BoundingBox {
            center_x,
            center_y,
            width,
            height,
        }
    }

    #[test]
    fn test_overlap_identical() {
        let a = bbox(0.5, 0.5, 0.1, 0.2);
        assert_relative_eq!(overlap_ratio(&a, &a), 1.0);
    }

    #[test]
    fn test_overlap_disjoint() {
        let a = bbox(0.2, 0.2, 0.1, 0.1);
        let b = bbox(0.8, 0.8, 0.1, 0.1);
        assert_eq!(overlap_ratio(&a, &b), 0.0);
    }

    #[test]
    fn test_overlap_half_shift() {
        // Shifted by half the width: intersection 0.05*0.1, union 0.015
        let a = bbox(0.5, 0.5, 0.1, 0.1);
        let b = bbox(0.55, 0.5, 0.1, 0.1);
        assert_relative_eq!(overlap_ratio(&a, &b), 0.005 / 0.015, epsilon = 1e-12);
    }

    #[test]
    fn test_overlap_contained() {
        // Small box fully inside the big one: clamp keeps the small extent
        let big = bbox(0.5, 0.5, 0.4, 0.4);
        let small = bbox(0.52, 0.48, 0.1, 0.1);
        assert_relative_eq!(overlap_ratio(&big, &small), 0.01 / 0.16, epsilon = 1e-12);
        assert_relative_eq!(overlap_ratio(&small, &big), 0.01 / 0.16, epsilon = 1e-12);
    }

    #[test]
    fn test_overlap_degenerate() {
        let a = bbox(0.5, 0.5, 0.0, 0.1);
        let b = bbox(0.5, 0.5, 0.1, 0.1);
        assert_eq!(overlap_ratio(&a, &b), 0.0);
    }

    #[test]
    fn test_point_to_line_distance() {
        let origin = Point::new(0.0, 0.0);
        let diag = Point::new(1.0, 1.0);
        assert_relative_eq!(point_to_line_distance(Point::new(0.5, 0.5), origin, diag), 0.0);
        assert_relative_eq!(
            point_to_line_distance(Point::new(1.0, 0.0), origin, diag),
            std::f64::consts::FRAC_1_SQRT_2,
            epsilon = 1e-12
        );
        // The line extends past its defining points
        assert_relative_eq!(
            point_to_line_distance(Point::new(3.0, 3.0), origin, diag),
            0.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_point_to_line_distance_degenerate() {
        let a = Point::new(0.2, 0.2);
        assert_relative_eq!(
            point_to_line_distance(Point::new(0.5, 0.6), a, a),
            0.5,
            epsilon = 1e-12
        );
    }
}
