//! Deal Converter
//!
//! Turns playing-card detections on a photographed bridge deal into four
//! hands of thirteen cards.
//!
//! This library provides:
//! - `detection`: Detector output reading and per-label diagnostics
//! - `dedup`: Simple and smart deduplication of repeated card symbols
//! - `quadrant`: Diagonal partition of the photo into seats plus a margin band
//! - `strategy`: Pluggable core finders and linkage distances
//! - `converter`: The staged assignment engine and its `DealConverter` front
//! - `output`: PBN and CSV serialization of an assigned deal
//! - `solver`: Double-dummy trick table of a complete deal
//! - `evaluation`: Precision and recall of detections against ground truth
//!
//! Binaries:
//! - `deal-convert`: Batch conversion, detection report and detector evaluation

pub mod card;
pub mod converter;
pub mod dedup;
pub mod density;
pub mod detection;
pub mod evaluation;
pub mod geometry;
pub mod output;
pub mod quadrant;
pub mod solver;
pub mod strategy;

pub use converter::{
    AssignedCard, ConverterConfig, DealAssignment, DealConverter, Deficiency, MissingCardInference,
    NoInference,
};
pub use dedup::DedupMode;
pub use detection::Detection;
pub use quadrant::{Hand, Quadrant};
pub use strategy::{CoreFinder, CoreFinderKind, Linkage, LinkageKind};

// Re-export commonly used types from dependencies
pub use bridge_parsers::{Card, Rank, Suit};
