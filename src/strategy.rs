//! Pluggable strategies consumed by the converter
//!
//! A [`CoreFinder`] decides which detections of one quadrant form the tight
//! cluster of genuine card symbols for that seat. A [`Linkage`] measures how
//! close a candidate detection is to the cards a hand already holds.

use crate::density::cluster_2d;
use crate::geometry::{euclidean, Point};
use clap::ValueEnum;

/// Marks the dense, trustworthy detections of one quadrant
pub trait CoreFinder {
    /// Returns one flag per input point, `true` for core members
    fn find_core(&self, points: &[Point]) -> Vec<bool>;
}

/// Distance from a candidate point to a hand's assigned points
pub trait Linkage {
    /// Non-negative distance; `f64::INFINITY` when `references` is empty
    fn distance(&self, point: Point, references: &[Point]) -> f64;
}

/// Core = the largest density cluster of the quadrant
#[derive(Debug, Clone, Copy)]
pub struct DensityCoreFinder {
    pub eps: f64,
    pub min_samples: usize,
}

impl Default for DensityCoreFinder {
    fn default() -> Self {
        Self {
            eps: 0.08,
            min_samples: 3,
        }
    }
}

impl CoreFinder for DensityCoreFinder {
    fn find_core(&self, points: &[Point]) -> Vec<bool> {
        let labels = cluster_2d(points, self.eps, self.min_samples);

        let mut sizes: Vec<usize> = Vec::new();
        for label in labels.iter().flatten() {
            if *label >= sizes.len() {
                sizes.resize(label + 1, 0);
            }
            sizes[*label] += 1;
        }

        // Largest cluster, earliest discovered on ties
        let largest = sizes
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, usize)>, (c, &n)| match best {
                Some((_, best_n)) if best_n >= n => best,
                _ => Some((c, n)),
            })
            .map(|(c, _)| c);

        labels
            .iter()
            .map(|label| largest.is_some() && *label == largest)
            .collect()
    }
}

/// Core = points within `factor` times the median distance to the quadrant's median point
#[derive(Debug, Clone, Copy)]
pub struct MedianRadiusCoreFinder {
    pub factor: f64,
}

impl Default for MedianRadiusCoreFinder {
    fn default() -> Self {
        Self { factor: 2.0 }
    }
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

impl CoreFinder for MedianRadiusCoreFinder {
    fn find_core(&self, points: &[Point]) -> Vec<bool> {
        let mut xs: Vec<f64> = points.iter().map(|p| p.x).collect();
        let mut ys: Vec<f64> = points.iter().map(|p| p.y).collect();
        let (Some(mx), Some(my)) = (median(&mut xs), median(&mut ys)) else {
            return Vec::new();
        };
        let center = Point::new(mx, my);

        let dists: Vec<f64> = points.iter().map(|p| euclidean(*p, center)).collect();
        let mut sorted = dists.clone();
        let radius = median(&mut sorted).unwrap_or(0.0) * self.factor;

        dists.iter().map(|d| *d <= radius).collect()
    }
}

/// Distance to the centroid of the references
#[derive(Debug, Clone, Copy, Default)]
pub struct CentroidLinkage;

impl Linkage for CentroidLinkage {
    fn distance(&self, point: Point, references: &[Point]) -> f64 {
        if references.is_empty() {
            return f64::INFINITY;
        }
        let n = references.len() as f64;
        let cx = references.iter().map(|p| p.x).sum::<f64>() / n;
        let cy = references.iter().map(|p| p.y).sum::<f64>() / n;
        euclidean(point, Point::new(cx, cy))
    }
}

/// Distance to the nearest reference
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleLinkage;

impl Linkage for SingleLinkage {
    fn distance(&self, point: Point, references: &[Point]) -> f64 {
        references
            .iter()
            .map(|r| euclidean(point, *r))
            .fold(f64::INFINITY, f64::min)
    }
}

/// Mean distance to all references
#[derive(Debug, Clone, Copy, Default)]
pub struct AverageLinkage;

impl Linkage for AverageLinkage {
    fn distance(&self, point: Point, references: &[Point]) -> f64 {
        if references.is_empty() {
            return f64::INFINITY;
        }
        references.iter().map(|r| euclidean(point, *r)).sum::<f64>() / references.len() as f64
    }
}

/// Selector for the built-in core finders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CoreFinderKind {
    #[default]
    Density,
    MedianRadius,
}

impl CoreFinderKind {
    pub fn build(self) -> Box<dyn CoreFinder> {
        match self {
            CoreFinderKind::Density => Box::new(DensityCoreFinder::default()),
            CoreFinderKind::MedianRadius => Box::new(MedianRadiusCoreFinder::default()),
        }
    }
}

/// Selector for the built-in linkages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LinkageKind {
    #[default]
    Single,
    Centroid,
    Average,
}

impl LinkageKind {
    pub fn build(self) -> Box<dyn Linkage> {
        match self {
            LinkageKind::Single => Box::new(SingleLinkage),
            LinkageKind::Centroid => Box::new(CentroidLinkage),
            LinkageKind::Average => Box::new(AverageLinkage),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn fan(x0: f64, y: f64, n: usize) -> Vec<Point> {
        (0..n).map(|i| Point::new(x0 + 0.02 * i as f64, y)).collect()
    }

    #[test]
    fn test_density_core_keeps_largest_cluster() {
        let mut points = fan(0.3, 0.1, 5);
        points.extend(fan(0.6, 0.3, 3));
        points.push(Point::new(0.5, 0.45));

        let core = DensityCoreFinder::default().find_core(&points);
        assert_eq!(core, vec![true, true, true, true, true, false, false, false, false]);
    }

    #[test]
    fn test_density_core_empty_and_sparse() {
        assert!(DensityCoreFinder::default().find_core(&[]).is_empty());
        let sparse = [Point::new(0.1, 0.1), Point::new(0.9, 0.1)];
        assert_eq!(DensityCoreFinder::default().find_core(&sparse), vec![false, false]);
    }

    #[test]
    fn test_median_radius_core_drops_outlier() {
        let mut points = fan(0.3, 0.1, 6);
        points.push(Point::new(0.45, 0.4));
        let core = MedianRadiusCoreFinder::default().find_core(&points);
        assert_eq!(core, vec![true, true, true, true, true, true, false]);
    }

    #[test]
    fn test_linkages() {
        let refs = [Point::new(0.0, 0.0), Point::new(0.2, 0.0)];
        let p = Point::new(0.1, 0.1);
        assert_relative_eq!(CentroidLinkage.distance(p, &refs), 0.1, epsilon = 1e-12);
        assert_relative_eq!(SingleLinkage.distance(p, &refs), 0.02f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(AverageLinkage.distance(p, &refs), 0.02f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_linkage_empty_references() {
        let p = Point::new(0.5, 0.5);
        for kind in [LinkageKind::Single, LinkageKind::Centroid, LinkageKind::Average] {
            assert_eq!(kind.build().distance(p, &[]), f64::INFINITY);
        }
    }
}
