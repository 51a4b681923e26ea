//! Density clustering
//!
//! A minimal DBSCAN: fixed neighbourhood radius and minimum cluster size,
//! with clusters numbered in the order they are discovered while scanning
//! the input. The 1-D variant finds the modal spacing between duplicate
//! card symbols; the 2-D variant backs the density core finder.

use crate::geometry::{euclidean, Point};
use log::warn;

/// Slack added to the radius so values exactly `eps` apart in decimal
/// (0.15 and 0.16) remain neighbours despite binary rounding.
const RADIUS_TOLERANCE: f64 = 1e-9;

/// Parameters for the densest-band search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DensityParams {
    /// Neighbourhood radius
    pub eps: f64,
    /// Minimum neighbourhood size (the point itself included) for a core point
    pub min_samples: usize,
}

impl Default for DensityParams {
    fn default() -> Self {
        Self {
            eps: 0.01,
            min_samples: 3,
        }
    }
}

/// The first dense cluster found among a set of scalar values
#[derive(Debug, Clone, PartialEq)]
pub struct DenseBand {
    /// Indices (into the input slice) of the members of cluster 0
    pub indices: Vec<usize>,
    /// Values of the members of cluster 0, in input order
    pub values: Vec<f64>,
    /// Number of clusters found in total
    pub cluster_count: usize,
}

impl DenseBand {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Run DBSCAN over `n` items given a neighbourhood predicate.
///
/// Returns one label per item: `Some(cluster)` or `None` for noise.
fn dbscan<F>(n: usize, min_samples: usize, is_neighbour: F) -> Vec<Option<usize>>
where
    F: Fn(usize, usize) -> bool,
{
    let neighbours: Vec<Vec<usize>> = (0..n)
        .map(|i| (0..n).filter(|&j| is_neighbour(i, j)).collect())
        .collect();
    let is_core: Vec<bool> = neighbours.iter().map(|nb| nb.len() >= min_samples).collect();

    let mut labels: Vec<Option<usize>> = vec![None; n];
    let mut next_cluster = 0;

    for start in 0..n {
        if labels[start].is_some() || !is_core[start] {
            continue;
        }

        let cluster = next_cluster;
        next_cluster += 1;
        labels[start] = Some(cluster);

        let mut stack = vec![start];
        while let Some(i) = stack.pop() {
            if !is_core[i] {
                continue;
            }
            for &j in &neighbours[i] {
                if labels[j].is_none() {
                    labels[j] = Some(cluster);
                    stack.push(j);
                }
            }
        }
    }

    labels
}

/// Cluster scalar values; see [`dbscan`] for the label convention.
pub fn cluster_1d(values: &[f64], params: &DensityParams) -> Vec<Option<usize>> {
    let radius = params.eps + RADIUS_TOLERANCE;
    dbscan(values.len(), params.min_samples, |i, j| {
        (values[i] - values[j]).abs() <= radius
    })
}

/// Cluster points in the plane with Euclidean neighbourhoods.
pub fn cluster_2d(points: &[Point], eps: f64, min_samples: usize) -> Vec<Option<usize>> {
    let radius = eps + RADIUS_TOLERANCE;
    dbscan(points.len(), min_samples, |i, j| {
        euclidean(points[i], points[j]) <= radius
    })
}

/// Find the densest band among `values`.
///
/// Cluster 0 is taken as the modal spacing; noise and any later cluster are
/// discarded. Several clusters make the mode ambiguous, which is only warned about.
pub fn find_densest(values: &[f64], params: &DensityParams) -> DenseBand {
    let labels = cluster_1d(values, params);
    let cluster_count = labels.iter().flatten().max().map_or(0, |&c| c + 1);

    if cluster_count > 1 {
        warn!(
            "Found {} dense clusters among {} distances, using the first",
            cluster_count,
            values.len()
        );
    }

    let indices: Vec<usize> = labels
        .iter()
        .enumerate()
        .filter(|(_, label)| **label == Some(0))
        .map(|(i, _)| i)
        .collect();
    let values = indices.iter().map(|&i| values[i]).collect();

    DenseBand {
        indices,
        values,
        cluster_count,
    }
}

/// Keep values inside the inclusive band `[low, high]`, remembering their positions.
pub fn restrict_to_band(values: &[f64], low: f64, high: f64) -> Vec<(usize, f64)> {
    values
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, v)| (low..=high).contains(v))
        .collect()
}
