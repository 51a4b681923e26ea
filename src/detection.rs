//! Card detections and the detector's JSON output
//!
//! Two layouts are accepted: the Darknet/YOLO result file (a list of frames,
//! each carrying an `objects` array) and a plain array of objects as used for
//! hand-labelled ground truth. Only the first frame of a result file is read,
//! since every image holds a single deal.

use crate::card::{is_card_label, CARD_CLASSES};
use crate::geometry::{BoundingBox, Point};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// One labelled, located, confidence-scored card symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Card class label (e.g. `10s`)
    pub name: String,
    pub center_x: f64,
    pub center_y: f64,
    pub width: f64,
    pub height: f64,
    /// Detector confidence; absent for ground truth
    pub confidence: Option<f64>,
}

impl Detection {
    pub fn new(name: &str, center_x: f64, center_y: f64, confidence: f64) -> Self {
        Self {
            name: name.to_string(),
            center_x,
            center_y,
            width: 0.0,
            height: 0.0,
            confidence: Some(confidence),
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.center_x, self.center_y)
    }

    pub fn bbox(&self) -> BoundingBox {
        BoundingBox {
            center_x: self.center_x,
            center_y: self.center_y,
            width: self.width,
            height: self.height,
        }
    }

    /// Confidence used for ranking; ground truth counts as certain
    pub fn score(&self) -> f64 {
        self.confidence.unwrap_or(1.0)
    }
}

#[derive(Debug, Deserialize)]
struct RelativeCoordinates {
    center_x: f64,
    center_y: f64,
    #[serde(default)]
    width: f64,
    #[serde(default)]
    height: f64,
}

#[derive(Debug, Deserialize)]
struct RawObject {
    name: String,
    relative_coordinates: RelativeCoordinates,
    #[serde(default)]
    confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    objects: Vec<RawObject>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawResult {
    Frames(Vec<RawFrame>),
    Objects(Vec<RawObject>),
}

impl From<RawObject> for Detection {
    fn from(raw: RawObject) -> Self {
        Detection {
            name: raw.name,
            center_x: raw.relative_coordinates.center_x,
            center_y: raw.relative_coordinates.center_y,
            width: raw.relative_coordinates.width,
            height: raw.relative_coordinates.height,
            confidence: raw.confidence,
        }
    }
}

/// Parse detector output from a JSON string
pub fn parse_detections(json: &str) -> Result<Vec<Detection>> {
    let raw: RawResult = serde_json::from_str(json).context("Failed to parse detection JSON")?;
    let objects = match raw {
        // An empty array parses as an empty frame list: no detections
        RawResult::Frames(frames) => frames
            .into_iter()
            .next()
            .map(|frame| frame.objects)
            .unwrap_or_default(),
        RawResult::Objects(objects) => objects,
    };
    Ok(objects.into_iter().map(Detection::from).collect())
}

/// Read detector output from a JSON file
pub fn read_detections(path: &Path) -> Result<Vec<Detection>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_detections(&content).with_context(|| format!("In {}", path.display()))
}

/// Missing and over-detected card classes before any dedup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionReport {
    /// Deck labels never detected, in deck order
    pub missing: Vec<String>,
    /// Labels detected more than twice, in deck order
    pub over_detected: Vec<String>,
}

/// Count labels and report what a full deck lacks or has too much of.
///
/// A card normally shows two symbols, so up to two detections per label are expected.
pub fn report_missing_and_over_detected(detections: &[Detection]) -> DetectionReport {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for det in detections {
        *counts.entry(det.name.as_str()).or_insert(0) += 1;
    }

    let mut report = DetectionReport::default();
    for label in CARD_CLASSES {
        match counts.get(label).copied().unwrap_or(0) {
            0 => report.missing.push(label.to_string()),
            n if n > 2 => report.over_detected.push(label.to_string()),
            _ => {}
        }
    }

    let unknown: Vec<&str> = counts
        .keys()
        .copied()
        .filter(|name| !is_card_label(name))
        .collect();
    if !unknown.is_empty() {
        log::warn!("Detections with unknown labels: {:?}", unknown);
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    const DARKNET_JSON: &str = r#"[
      {
        "frame_id": 1,
        "filename": "deal1.jpg",
        "objects": [
          {"class_id": 8, "name": "10s",
           "relative_coordinates": {"center_x": 0.41, "center_y": 0.12, "width": 0.03, "height": 0.05},
           "confidence": 0.97},
          {"class_id": 51, "name": "Ah",
           "relative_coordinates": {"center_x": 0.85, "center_y": 0.5, "width": 0.03, "height": 0.05},
           "confidence": 0.64}
        ]
      }
    ]"#;

    #[test]
    fn test_parse_darknet_frames() {
        let dets = parse_detections(DARKNET_JSON).unwrap();
        assert_eq!(dets.len(), 2);
        assert_eq!(dets[0].name, "10s");
        assert_eq!(dets[0].center_x, 0.41);
        assert_eq!(dets[0].height, 0.05);
        assert_eq!(dets[0].confidence, Some(0.97));
        assert_eq!(dets[1].name, "Ah");
    }

    #[test]
    fn test_parse_ground_truth_list() {
        let json = r#"[
          {"name": "Kd", "relative_coordinates": {"center_x": 0.2, "center_y": 0.6, "width": 0.02, "height": 0.04}}
        ]"#;
        let dets = parse_detections(json).unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].confidence, None);
        assert_eq!(dets[0].score(), 1.0);
    }

    #[test]
    fn test_parse_empty_and_malformed() {
        assert!(parse_detections("[]").unwrap().is_empty());
        assert!(parse_detections("{\"objects\": 3}").is_err());
    }

    #[test]
    fn test_read_detections_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.json");
        std::fs::write(&path, DARKNET_JSON).unwrap();

        let dets = read_detections(&path).unwrap();
        assert_eq!(dets.len(), 2);
        assert!(read_detections(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_report_missing_and_over_detected() {
        let mut dets = vec![
            Detection::new("As", 0.5, 0.1, 0.9),
            Detection::new("As", 0.52, 0.1, 0.8),
            Detection::new("As", 0.54, 0.1, 0.7),
            Detection::new("Kh", 0.1, 0.5, 0.9),
        ];
        dets.push(Detection::new("Kh", 0.12, 0.5, 0.9));

        let report = report_missing_and_over_detected(&dets);
        assert_eq!(report.over_detected, vec!["As".to_string()]);
        assert_eq!(report.missing.len(), 50);
        assert!(!report.missing.contains(&"Kh".to_string()));
        assert_eq!(report.missing[0], "2s");
    }
}
