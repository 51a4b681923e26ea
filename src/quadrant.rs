//! Quadrant partitioning by the image diagonals
//!
//! The two diagonals split the photo into four triangles, one per seat at
//! the table. Points close to either diagonal are ambiguous and land in the
//! margin band instead.

use crate::geometry::{point_to_line_distance, Point};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default half-width of the margin band around the diagonals
pub const DEFAULT_MARGIN_WIDTH: f64 = 0.05;

/// Region of the image a detection falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quadrant {
    Top,
    Bottom,
    Left,
    Right,
    Margin,
}

impl Quadrant {
    /// The four seat quadrants, in the order core finding visits them
    pub const SEATS: [Quadrant; 4] = [Quadrant::Top, Quadrant::Bottom, Quadrant::Left, Quadrant::Right];

    /// The hand seated in this quadrant; none for the margin
    pub fn hand(self) -> Option<Hand> {
        match self {
            Quadrant::Top => Some(Hand::North),
            Quadrant::Bottom => Some(Hand::South),
            Quadrant::Left => Some(Hand::West),
            Quadrant::Right => Some(Hand::East),
            Quadrant::Margin => None,
        }
    }
}

/// One of the four bridge players
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Hand {
    North,
    East,
    South,
    West,
}

impl Hand {
    /// Clockwise from North, the order hands are written in a PBN deal
    pub const ALL: [Hand; 4] = [Hand::North, Hand::East, Hand::South, Hand::West];

    pub fn index(self) -> usize {
        match self {
            Hand::North => 0,
            Hand::East => 1,
            Hand::South => 2,
            Hand::West => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Hand::North => "north",
            Hand::East => "east",
            Hand::South => "south",
            Hand::West => "west",
        }
    }
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Distance from a point to the nearer of the two image diagonals
pub fn distance_to_diagonals(point: Point) -> f64 {
    let main = point_to_line_distance(point, Point::new(0.0, 0.0), Point::new(1.0, 1.0));
    let anti = point_to_line_distance(point, Point::new(0.0, 1.0), Point::new(1.0, 0.0));
    main.min(anti)
}

/// Whether a point lies within `margin_width` of a diagonal (inclusive)
pub fn is_marginal(point: Point, margin_width: f64) -> bool {
    distance_to_diagonals(point) <= margin_width
}

/// Classify a point in normalized coordinates (origin top-left).
///
/// Any point exactly on a diagonal is within the margin band, so the four
/// seat tests below are exhaustive for the remaining points.
pub fn classify(point: Point, margin_width: f64) -> Quadrant {
    if is_marginal(point, margin_width) {
        return Quadrant::Margin;
    }

    let Point { x, y } = point;
    let below_main = y > x;
    let below_anti = 1.0 - y < x;
    match (below_main, below_anti) {
        (true, true) => Quadrant::Bottom,
        (false, false) => Quadrant::Top,
        (false, true) => Quadrant::Right,
        (true, false) => Quadrant::Left,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_seats() {
        assert_eq!(classify(Point::new(0.5, 0.1), DEFAULT_MARGIN_WIDTH), Quadrant::Top);
        assert_eq!(classify(Point::new(0.5, 0.9), DEFAULT_MARGIN_WIDTH), Quadrant::Bottom);
        assert_eq!(classify(Point::new(0.1, 0.5), DEFAULT_MARGIN_WIDTH), Quadrant::Left);
        assert_eq!(classify(Point::new(0.9, 0.5), DEFAULT_MARGIN_WIDTH), Quadrant::Right);
        assert_eq!(classify(Point::new(0.5, 0.5), DEFAULT_MARGIN_WIDTH), Quadrant::Margin);
        assert_eq!(classify(Point::new(0.2, 0.22), DEFAULT_MARGIN_WIDTH), Quadrant::Margin);
    }

    #[test]
    fn test_margin_boundary_is_inclusive() {
        // (0.5, 0.2) is 0.3/sqrt(2) from the main diagonal and 0.3/sqrt(2) from the anti-diagonal
        let point = Point::new(0.5, 0.2);
        let dist = distance_to_diagonals(point);
        assert!(is_marginal(point, dist));
        assert_eq!(classify(point, dist), Quadrant::Margin);
        assert_eq!(classify(point, dist - 1e-9), Quadrant::Top);
    }

    #[test]
    fn test_quadrants_exclusive_and_exhaustive() {
        let steps = 99;
        for i in 1..steps {
            for j in 1..steps {
                let x = i as f64 / steps as f64;
                let y = j as f64 / steps as f64;
                let point = Point::new(x, y);
                let q = classify(point, DEFAULT_MARGIN_WIDTH);
                if q == Quadrant::Margin {
                    assert!(is_marginal(point, DEFAULT_MARGIN_WIDTH));
                    continue;
                }
                let matches = [
                    y > x && 1.0 - y < x,
                    y < x && 1.0 - y > x,
                    y < x && 1.0 - y < x,
                    y > x && 1.0 - y > x,
                ];
                assert_eq!(matches.iter().filter(|m| **m).count(), 1, "point {:?}", point);
            }
        }
    }

    #[test]
    fn test_quadrant_to_hand() {
        assert_eq!(Quadrant::Top.hand(), Some(Hand::North));
        assert_eq!(Quadrant::Bottom.hand(), Some(Hand::South));
        assert_eq!(Quadrant::Left.hand(), Some(Hand::West));
        assert_eq!(Quadrant::Right.hand(), Some(Hand::East));
        assert_eq!(Quadrant::Margin.hand(), None);
    }
}
