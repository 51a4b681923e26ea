//! Deduplication of repeated detections of the same card class
//!
//! A physical card usually shows two symbols (top-left and bottom-right
//! corners), so the detector often reports a label twice. The simple rule
//! keeps the most confident detection per label. The smart rule also keeps
//! pairs whose separation matches the modal symbol spacing learned from the
//! image itself, leaving the choice between them to quadrant assignment.

use crate::density::{find_densest, restrict_to_band, DensityParams};
use crate::detection::Detection;
use crate::geometry::euclidean;
use log::{debug, info};
use std::collections::{BTreeSet, HashMap};

/// Which dedup rule to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupMode {
    #[default]
    Simple,
    Smart,
}

/// Parameters for smart dedup
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmartDedupParams {
    /// Only pairs of detections at least this confident are measured
    pub min_confidence: f64,
    /// Plausible symbol spacing on one card, inclusive
    pub band: (f64, f64),
    /// Density clustering of the in-band distances
    pub density: DensityParams,
}

impl Default for SmartDedupParams {
    fn default() -> Self {
        Self {
            min_confidence: 0.7,
            band: (0.1, 0.3),
            density: DensityParams::default(),
        }
    }
}

/// Distance between two detections carrying the same label
#[derive(Debug, Clone, PartialEq)]
pub struct PairDistance {
    /// Index of the first detection in the input slice
    pub first: usize,
    /// Index of the second detection (always greater than `first`)
    pub second: usize,
    pub distance: f64,
}

/// Keep only the highest-confidence detection per label.
///
/// Ties go to the later detection, as a stable ascending sort keeping the
/// last would. The survivors keep their input order.
pub fn dedup_simple(detections: &[Detection]) -> Vec<Detection> {
    best_per_label(detections)
        .into_iter()
        .map(|i| detections[i].clone())
        .collect()
}

fn best_per_label(detections: &[Detection]) -> BTreeSet<usize> {
    let mut best: HashMap<&str, usize> = HashMap::new();
    for (i, det) in detections.iter().enumerate() {
        match best.get(det.name.as_str()) {
            Some(&prev) if detections[prev].score() > det.score() => {}
            _ => {
                best.insert(det.name.as_str(), i);
            }
        }
    }
    best.into_values().collect()
}

/// Pairwise distances between same-label detections with confidence at least `min_confidence`
pub fn same_label_pair_distances(detections: &[Detection], min_confidence: f64) -> Vec<PairDistance> {
    let confident: Vec<usize> = (0..detections.len())
        .filter(|&i| detections[i].score() >= min_confidence)
        .collect();

    let mut pairs = Vec::new();
    for (a, &i) in confident.iter().enumerate() {
        for &j in &confident[a + 1..] {
            if detections[i].name == detections[j].name {
                pairs.push(PairDistance {
                    first: i,
                    second: j,
                    distance: euclidean(detections[i].center(), detections[j].center()),
                });
            }
        }
    }
    pairs
}

/// Indices of duplicated detections taking part in at least one pair at the modal spacing
fn good_duplicates(detections: &[Detection], params: &SmartDedupParams) -> BTreeSet<usize> {
    let pairs = same_label_pair_distances(detections, params.min_confidence);
    let distances: Vec<f64> = pairs.iter().map(|p| p.distance).collect();

    let (low, high) = params.band;
    let in_band = restrict_to_band(&distances, low, high);
    let band_values: Vec<f64> = in_band.iter().map(|(_, d)| *d).collect();
    let densest = find_densest(&band_values, &params.density);
    debug!(
        "{} same-label pairs, {} in band, {} at modal spacing {:?}",
        pairs.len(),
        in_band.len(),
        densest.indices.len(),
        densest.values
    );

    let mut label_counts: HashMap<&str, usize> = HashMap::new();
    for det in detections {
        *label_counts.entry(det.name.as_str()).or_insert(0) += 1;
    }

    let mut good = BTreeSet::new();
    for &band_idx in &densest.indices {
        let pair = &pairs[in_band[band_idx].0];
        if label_counts[detections[pair.first].name.as_str()] > 1 {
            good.insert(pair.first);
            good.insert(pair.second);
        }
    }
    good
}

/// Dedup keeping both members of duplicate pairs spaced like the two symbols of one card.
///
/// Labels without such a pair end up with their single most confident detection.
pub fn dedup_smart(detections: &[Detection], params: &SmartDedupParams) -> Vec<Detection> {
    let good = good_duplicates(detections, params);
    let mut keep = best_per_label(detections);
    let before = keep.len();
    keep.extend(good.iter().copied());

    info!(
        "Smart dedup kept {} detections ({} extra from good duplicates) out of {}",
        keep.len(),
        keep.len() - before,
        detections.len()
    );

    keep.into_iter().map(|i| detections[i].clone()).collect()
}

/// Apply the dedup rule selected by `mode`
pub fn dedup(detections: &[Detection], mode: DedupMode, params: &SmartDedupParams) -> Vec<Detection> {
    match mode {
        DedupMode::Simple => dedup_simple(detections),
        DedupMode::Smart => dedup_smart(detections, params),
    }
}
