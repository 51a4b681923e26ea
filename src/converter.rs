//! Deal conversion: from deduplicated detections to four hands
//!
//! Each stage is a function from one annotated card table to the next:
//!
//! 1. [`tag_quadrants`] places every detection in a quadrant or the margin
//! 2. [`mark_core`] asks the core finder which detections of each quadrant are trustworthy
//! 3. [`assign_core`] seats every core detection with the quadrant's hand
//! 4. [`resolve_core_conflicts`] removes label clashes involving core detections
//! 5. [`assign_remaining`] greedily hands out everything else by linkage distance
//! 6. [`finalize`] collects the assignment and what it lacks
//!
//! [`DealConverter`] strings the stages together and guards their order.

use crate::card::{is_card_label, CARD_CLASSES, HAND_SIZE};
use crate::dedup::{dedup, DedupMode, SmartDedupParams};
use crate::detection::{read_detections, report_missing_and_over_detected, Detection, DetectionReport};
use crate::geometry::Point;
use crate::output::format_pbn;
use crate::quadrant::{classify, Hand, Quadrant, DEFAULT_MARGIN_WIDTH};
use crate::strategy::{CoreFinder, Linkage};
use anyhow::{anyhow, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Configuration for deal conversion
#[derive(Debug, Clone)]
pub struct ConverterConfig {
    /// Half-width of the band around the diagonals treated as ambiguous
    pub margin_width: f64,
    /// Cards per full hand
    pub hand_size: usize,
    /// Dedup rule
    pub dedup: DedupMode,
    /// Parameters of the smart dedup rule
    pub smart: SmartDedupParams,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            margin_width: DEFAULT_MARGIN_WIDTH,
            hand_size: HAND_SIZE,
            dedup: DedupMode::Simple,
            smart: SmartDedupParams::default(),
        }
    }
}

impl ConverterConfig {
    /// Config using smart dedup
    pub fn smart() -> Self {
        Self {
            dedup: DedupMode::Smart,
            ..Self::default()
        }
    }

    pub fn with_margin_width(mut self, margin_width: f64) -> Self {
        self.margin_width = margin_width;
        self
    }

    pub fn with_hand_size(mut self, hand_size: usize) -> Self {
        self.hand_size = hand_size;
        self
    }
}

/// A detection with the annotations accumulated by the stages
#[derive(Debug, Clone, PartialEq)]
pub struct CardState {
    pub detection: Detection,
    pub quadrant: Quadrant,
    pub is_core: bool,
    pub hand: Option<Hand>,
}

impl CardState {
    pub fn center(&self) -> Point {
        self.detection.center()
    }

    pub fn name(&self) -> &str {
        &self.detection.name
    }
}

/// One card of the final assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignedCard {
    pub name: String,
    pub hand: Hand,
    pub center_x: f64,
    pub center_y: f64,
    pub confidence: Option<f64>,
}

/// Why an assignment falls short of a full deal
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Deficiency {
    /// Deck labels not assigned to any hand
    pub missing: Vec<String>,
    /// Hands holding fewer cards than a full hand, with their card count
    pub short_hands: Vec<(Hand, usize)>,
    /// Labels of detections left without a hand
    pub unassigned: Vec<String>,
}

/// Result of assigning detections to hands
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DealAssignment {
    pub cards: Vec<AssignedCard>,
    /// Detections that could not be placed
    pub unassigned: Vec<Detection>,
    /// `None` when every hand is full and every deck label is present
    pub deficiency: Option<Deficiency>,
}

impl DealAssignment {
    pub fn is_complete(&self) -> bool {
        self.deficiency.is_none()
    }

    /// Card counts indexed by [`Hand::index`]
    pub fn hand_sizes(&self) -> [usize; 4] {
        let mut sizes = [0; 4];
        for card in &self.cards {
            sizes[card.hand.index()] += 1;
        }
        sizes
    }

    pub fn hand_cards(&self, hand: Hand) -> Vec<&AssignedCard> {
        self.cards.iter().filter(|c| c.hand == hand).collect()
    }
}

/// Labels involved in conflicts with core detections
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConflictReport {
    /// Core detections whose label is also core in another quadrant, demoted to non-core
    pub demoted: Vec<(String, Quadrant)>,
    /// Core detections repeating a label already core in the same quadrant, removed
    pub collapsed: Vec<(String, Quadrant)>,
    /// Non-core detections dropped because a core detection holds their label
    pub dropped: Vec<(String, Quadrant)>,
}

/// Extension point for filling an incomplete deal.
///
/// Called only when greedy assignment leaves hands short or labels missing.
/// Suggested cards are accepted when their label is missing and their hand
/// still has room.
pub trait MissingCardInference {
    fn infer(&self, assigned: &[AssignedCard], deficiency: &Deficiency) -> Vec<AssignedCard>;
}

/// Leaves an incomplete deal as it is
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInference;

impl MissingCardInference for NoInference {
    fn infer(&self, _assigned: &[AssignedCard], deficiency: &Deficiency) -> Vec<AssignedCard> {
        debug!("No inference for {} missing cards", deficiency.missing.len());
        Vec::new()
    }
}

// ============================================================================
// Stages
// ============================================================================

/// Place every detection in a quadrant; nothing is core or seated yet.
pub fn tag_quadrants(detections: Vec<Detection>, margin_width: f64) -> Vec<CardState> {
    detections
        .into_iter()
        .map(|detection| CardState {
            quadrant: classify(detection.center(), margin_width),
            detection,
            is_core: false,
            hand: None,
        })
        .collect()
}

/// Run the core finder on each seat quadrant. Margin detections are never core.
pub fn mark_core(mut cards: Vec<CardState>, finder: &dyn CoreFinder) -> Vec<CardState> {
    for quadrant in Quadrant::SEATS {
        let members: Vec<usize> = (0..cards.len())
            .filter(|&i| cards[i].quadrant == quadrant)
            .collect();
        let points: Vec<Point> = members.iter().map(|&i| cards[i].center()).collect();

        let flags = finder.find_core(&points);
        assert_eq!(
            flags.len(),
            points.len(),
            "Core finder returned {} flags for {} points",
            flags.len(),
            points.len()
        );

        for (&i, is_core) in members.iter().zip(flags) {
            cards[i].is_core = is_core;
        }
        debug!(
            "{:?}: {} of {} detections are core",
            quadrant,
            members.iter().filter(|&&i| cards[i].is_core).count(),
            members.len()
        );
    }
    cards
}

/// Seat every core detection with the hand of its quadrant.
///
/// Panics if a core detection sits in the margin: core finding only ever
/// looks at seat quadrants, so that is a bug rather than bad input.
pub fn assign_core(cards: Vec<CardState>) -> Vec<CardState> {
    cards
        .into_iter()
        .map(|mut card| {
            card.hand = if card.is_core {
                assert!(
                    card.quadrant != Quadrant::Margin,
                    "Unexpected margin core card: {}",
                    card.name()
                );
                card.quadrant.hand()
            } else {
                None
            };
            card
        })
        .collect()
}

/// Remove label clashes involving core detections.
///
/// A label held by core detections in two different quadrants is a
/// contradiction core status cannot settle, so every such instance is demoted
/// and left to the remainder phase. Core detections repeating a label within
/// one quadrant agree on the hand; the first is kept and the rest collapse
/// into it. Afterwards a non-core detection whose label is held by a core
/// detection is dropped.
pub fn resolve_core_conflicts(cards: Vec<CardState>) -> (Vec<CardState>, ConflictReport) {
    let mut core_quadrants: HashMap<String, HashSet<Quadrant>> = HashMap::new();
    for card in cards.iter().filter(|c| c.is_core) {
        core_quadrants
            .entry(card.name().to_string())
            .or_default()
            .insert(card.quadrant);
    }

    let mut report = ConflictReport::default();
    let mut cards = cards;
    for card in cards.iter_mut() {
        if card.is_core && core_quadrants[card.name()].len() > 1 {
            card.is_core = false;
            card.hand = None;
            report.demoted.push((card.name().to_string(), card.quadrant));
        }
    }
    info!(
        "Demoting {} duplicates across core quadrants: {:?}",
        report.demoted.len(),
        report.demoted
    );

    let core_labels: HashSet<String> = cards
        .iter()
        .filter(|c| c.is_core)
        .map(|c| c.name().to_string())
        .collect();

    let mut seen_core: HashSet<String> = HashSet::new();
    let mut kept = Vec::with_capacity(cards.len());
    for card in cards {
        if card.is_core {
            if seen_core.insert(card.name().to_string()) {
                kept.push(card);
            } else {
                report.collapsed.push((card.name().to_string(), card.quadrant));
            }
        } else if core_labels.contains(card.name()) {
            report.dropped.push((card.name().to_string(), card.quadrant));
        } else {
            kept.push(card);
        }
    }
    info!(
        "Collapsing {} repeated symbols inside core: {:?}",
        report.collapsed.len(),
        report.collapsed
    );
    info!(
        "Dropping {} duplicates outside core: {:?}",
        report.dropped.len(),
        report.dropped
    );

    (kept, report)
}

fn hand_counts(cards: &[CardState]) -> [usize; 4] {
    let mut counts = [0; 4];
    for hand in cards.iter().filter_map(|c| c.hand) {
        counts[hand.index()] += 1;
    }
    counts
}

/// Greedily seat unassigned detections with the closest hand that has room.
///
/// Each round scans hands in [`Hand::ALL`] order and remaining detections in
/// table order, and seats the single closest pair; the first minimum wins
/// ties. Once a label is seated, other unassigned detections with that label
/// are discarded. Stops when every hand is full, nothing is left, or no hand
/// with room holds a card to measure against.
pub fn assign_remaining(mut cards: Vec<CardState>, linkage: &dyn Linkage, hand_size: usize) -> Vec<CardState> {
    let mut remaining: Vec<usize> = (0..cards.len()).filter(|&i| cards[i].hand.is_none()).collect();
    let mut discarded: HashSet<usize> = HashSet::new();

    loop {
        let counts = hand_counts(&cards);
        let eligible: Vec<Hand> = Hand::ALL
            .into_iter()
            .filter(|h| counts[h.index()] < hand_size)
            .collect();
        if eligible.is_empty() || remaining.is_empty() {
            break;
        }

        let mut closest: Option<(usize, Hand, f64)> = None;
        for &hand in &eligible {
            let references: Vec<Point> = cards
                .iter()
                .filter(|c| c.hand == Some(hand))
                .map(CardState::center)
                .collect();

            for (pos, &i) in remaining.iter().enumerate() {
                let distance = linkage.distance(cards[i].center(), &references);
                if distance.is_finite() && closest.map_or(true, |(_, _, best)| distance < best) {
                    closest = Some((pos, hand, distance));
                }
            }
        }

        let Some((pos, hand, distance)) = closest else {
            warn!(
                "No hand with room has cards to measure against, {} detections left",
                remaining.len()
            );
            break;
        };

        let i = remaining.remove(pos);
        cards[i].hand = Some(hand);
        info!(
            "Found a closest obj({}, {:?}) to '{}': {:.4}",
            cards[i].name(),
            cards[i].quadrant,
            hand,
            distance
        );

        let label = cards[i].name().to_string();
        remaining.retain(|&j| {
            let same = cards[j].detection.name == label;
            if same {
                debug!("Discarding duplicate {} ({:?}) after seating", label, cards[j].quadrant);
                discarded.insert(j);
            }
            !same
        });
    }

    cards
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !discarded.contains(i))
        .map(|(_, card)| card)
        .collect()
}

fn compute_deficiency(cards: &[AssignedCard], unassigned: &[Detection], hand_size: usize) -> Option<Deficiency> {
    let assigned: HashSet<&str> = cards.iter().map(|c| c.name.as_str()).collect();
    let missing: Vec<String> = CARD_CLASSES
        .iter()
        .filter(|label| !assigned.contains(*label))
        .map(|label| label.to_string())
        .collect();

    let mut sizes = [0usize; 4];
    for card in cards {
        sizes[card.hand.index()] += 1;
    }
    let short_hands: Vec<(Hand, usize)> = Hand::ALL
        .into_iter()
        .filter(|h| sizes[h.index()] < hand_size)
        .map(|h| (h, sizes[h.index()]))
        .collect();

    if missing.is_empty() && short_hands.is_empty() {
        return None;
    }
    Some(Deficiency {
        missing,
        short_hands,
        unassigned: unassigned.iter().map(|d| d.name.clone()).collect(),
    })
}

/// Split the card table into seated cards and leftovers, and measure what is lacking.
pub fn finalize(cards: Vec<CardState>, hand_size: usize) -> DealAssignment {
    let mut assigned = Vec::new();
    let mut unassigned = Vec::new();
    for card in cards {
        match card.hand {
            Some(hand) => assigned.push(AssignedCard {
                name: card.detection.name,
                hand,
                center_x: card.detection.center_x,
                center_y: card.detection.center_y,
                confidence: card.detection.confidence,
            }),
            None => unassigned.push(card.detection),
        }
    }

    let deficiency = compute_deficiency(&assigned, &unassigned, hand_size);
    DealAssignment {
        cards: assigned,
        unassigned,
        deficiency,
    }
}

/// Run the assignment stages on already deduplicated detections.
pub fn assign_deal(
    detections: Vec<Detection>,
    config: &ConverterConfig,
    core_finder: &dyn CoreFinder,
    linkage: &dyn Linkage,
) -> DealAssignment {
    let cards = tag_quadrants(detections, config.margin_width);
    let cards = mark_core(cards, core_finder);
    let cards = assign_core(cards);
    let (cards, _) = resolve_core_conflicts(cards);
    let cards = assign_remaining(cards, linkage, config.hand_size);
    finalize(cards, config.hand_size)
}

// ============================================================================
// Converter
// ============================================================================

/// Converts one image's detections into a deal.
///
/// Call [`load`](Self::load) (or [`read_json`](Self::read_json)), then
/// [`dedup`](Self::dedup), then [`assign`](Self::assign). Calling a stage
/// before its inputs exist is an error and does no work.
pub struct DealConverter {
    config: ConverterConfig,
    core_finder: Box<dyn CoreFinder>,
    linkage: Box<dyn Linkage>,
    inference: Box<dyn MissingCardInference>,
    detections: Option<Vec<Detection>>,
    deduped: Option<Vec<Detection>>,
    assignment: Option<DealAssignment>,
}

impl DealConverter {
    pub fn new(core_finder: Box<dyn CoreFinder>, linkage: Box<dyn Linkage>) -> Self {
        Self {
            config: ConverterConfig::default(),
            core_finder,
            linkage,
            inference: Box::new(NoInference),
            detections: None,
            deduped: None,
            assignment: None,
        }
    }

    pub fn with_config(mut self, config: ConverterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_inference(mut self, inference: Box<dyn MissingCardInference>) -> Self {
        self.inference = inference;
        self
    }

    /// Take a fresh set of detections, discarding any earlier results.
    ///
    /// Labels outside the deck are dropped with a warning.
    pub fn load(&mut self, detections: Vec<Detection>) {
        let (known, unknown): (Vec<Detection>, Vec<Detection>) =
            detections.into_iter().partition(|d| is_card_label(&d.name));
        if !unknown.is_empty() {
            warn!(
                "Ignoring {} detections with unknown labels: {:?}",
                unknown.len(),
                unknown.iter().map(|d| d.name.as_str()).collect::<Vec<_>>()
            );
        }
        info!("Loaded {} detections", known.len());
        self.detections = Some(known);
        self.deduped = None;
        self.assignment = None;
    }

    pub fn read_json(&mut self, path: &Path) -> Result<()> {
        let detections = read_detections(path)?;
        self.load(detections);
        Ok(())
    }

    fn loaded(&self) -> Result<&[Detection]> {
        self.detections
            .as_deref()
            .ok_or_else(|| anyhow!("No detections loaded"))
    }

    /// Report missing and over-detected labels of the loaded detections
    pub fn report_missing_and_fp(&self) -> Result<DetectionReport> {
        let report = report_missing_and_over_detected(self.loaded()?);
        info!("Missing cards: {:?}", report.missing);
        info!("Over-detected cards: {:?}", report.over_detected);
        Ok(report)
    }

    /// Deduplicate the loaded detections with the configured rule
    pub fn dedup(&mut self) -> Result<&[Detection]> {
        let deduped = dedup(self.loaded()?, self.config.dedup, &self.config.smart);
        info!(
            "{:?} dedup kept {} of {} detections",
            self.config.dedup,
            deduped.len(),
            self.loaded()?.len()
        );
        self.assignment = None;
        let deduped = self.deduped.insert(deduped);
        Ok(deduped.as_slice())
    }

    /// Assign the deduplicated detections to hands.
    ///
    /// When the result is incomplete the missing-card inference hook gets a chance to fill it.
    pub fn assign(&mut self) -> Result<&DealAssignment> {
        let deduped = self
            .deduped
            .clone()
            .ok_or_else(|| anyhow!("Detections must be deduplicated before assignment"))?;

        let mut assignment = assign_deal(
            deduped,
            &self.config,
            self.core_finder.as_ref(),
            self.linkage.as_ref(),
        );

        if let Some(deficiency) = assignment.deficiency.clone() {
            let suggested = self.inference.infer(&assignment.cards, &deficiency);
            if !suggested.is_empty() {
                self.accept_inferred(&mut assignment, &deficiency, suggested);
            }
        }

        match &assignment.deficiency {
            None => info!("Assigned a complete deal"),
            Some(d) => warn!(
                "Incomplete deal: missing {:?}, short hands {:?}, unassigned {:?}",
                d.missing, d.short_hands, d.unassigned
            ),
        }
        Ok(&*self.assignment.insert(assignment))
    }

    fn accept_inferred(&self, assignment: &mut DealAssignment, deficiency: &Deficiency, suggested: Vec<AssignedCard>) {
        let mut missing: HashSet<&str> = deficiency.missing.iter().map(String::as_str).collect();
        let mut sizes = assignment.hand_sizes();

        for card in suggested {
            if !missing.contains(card.name.as_str()) || sizes[card.hand.index()] >= self.config.hand_size {
                warn!("Rejecting inferred card {} for {}", card.name, card.hand);
                continue;
            }
            info!("Inferred {} for {}", card.name, card.hand);
            missing.remove(card.name.as_str());
            sizes[card.hand.index()] += 1;
            assignment.cards.push(card);
        }

        assignment.deficiency =
            compute_deficiency(&assignment.cards, &assignment.unassigned, self.config.hand_size);
    }

    pub fn assignment(&self) -> Option<&DealAssignment> {
        self.assignment.as_ref()
    }

    /// The assigned deal in PBN notation; requires a complete assignment
    pub fn format_pbn(&self) -> Result<String> {
        let assignment = self
            .assignment
            .as_ref()
            .ok_or_else(|| anyhow!("Deal must be assigned before formatting"))?;
        format_pbn(&assignment.cards)
    }
}
