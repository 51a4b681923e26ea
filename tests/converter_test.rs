//! End-to-end tests of deal conversion on synthetic layouts
//!
//! Each hand is laid out as a fan of thirteen symbols in its own quadrant,
//! the way cards are spread on the table when a deal is photographed.

use deal_converter::card::CARD_CLASSES;
use deal_converter::converter::{assign_deal, ConverterConfig, DealConverter};
use deal_converter::detection::Detection;
use deal_converter::output::{read_assignment_csv, write_assignment_csv};
use deal_converter::quadrant::Hand;
use deal_converter::strategy::{CoreFinderKind, DensityCoreFinder, LinkageKind, SingleLinkage};
use std::collections::HashSet;

/// Spades north, clubs east, diamonds south, hearts west
const SUIT_PER_HAND_PBN: &str =
    "N:AKQJT98765432... ...AKQJT98765432 ..AKQJT98765432. .AKQJT98765432..";

fn fan_position(hand: Hand, k: usize) -> (f64, f64) {
    let offset = 0.32 + 0.03 * k as f64;
    match hand {
        Hand::North => (offset, 0.1),
        Hand::East => (0.9, offset),
        Hand::South => (offset, 0.9),
        Hand::West => (0.1, offset),
    }
}

/// One detection per card, each suit fanned out in front of one hand
fn full_deal() -> Vec<Detection> {
    CARD_CLASSES
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let (x, y) = fan_position(Hand::ALL[i / 13], i % 13);
            Detection::new(name, x, y, 0.9)
        })
        .collect()
}

fn converter(core_finder: CoreFinderKind, linkage: LinkageKind) -> DealConverter {
    DealConverter::new(core_finder.build(), linkage.build())
}

#[test]
fn test_clean_deal_converts() {
    let mut converter = converter(CoreFinderKind::Density, LinkageKind::Single);
    converter.load(full_deal());

    let report = converter.report_missing_and_fp().unwrap();
    assert!(report.missing.is_empty());
    assert!(report.over_detected.is_empty());

    assert_eq!(converter.dedup().unwrap().len(), 52);
    let assignment = converter.assign().unwrap();
    assert!(assignment.is_complete());
    assert_eq!(assignment.hand_sizes(), [13, 13, 13, 13]);
    assert!(assignment.unassigned.is_empty());

    let labels: HashSet<&str> = assignment.cards.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(labels.len(), 52);

    assert_eq!(converter.format_pbn().unwrap(), SUIT_PER_HAND_PBN);
}

#[test]
fn test_every_strategy_combination_converts() {
    for core_finder in [CoreFinderKind::Density, CoreFinderKind::MedianRadius] {
        for linkage in [LinkageKind::Single, LinkageKind::Centroid, LinkageKind::Average] {
            let mut converter = converter(core_finder, linkage);
            converter.load(full_deal());
            converter.dedup().unwrap();
            let assignment = converter.assign().unwrap();
            assert!(
                assignment.is_complete(),
                "{:?} with {:?} left {:?}",
                core_finder,
                linkage,
                assignment.deficiency
            );
            assert_eq!(converter.format_pbn().unwrap(), SUIT_PER_HAND_PBN);
        }
    }
}

#[test]
fn test_margin_card_joins_nearest_hand() {
    let mut dets = full_deal();
    // 2s sits next to the image center, inside the margin band
    dets[0].center_x = 0.5;
    dets[0].center_y = 0.45;

    let mut converter = converter(CoreFinderKind::Density, LinkageKind::Single);
    converter.load(dets);
    converter.dedup().unwrap();
    let assignment = converter.assign().unwrap();

    assert!(assignment.is_complete());
    let two = assignment.cards.iter().find(|c| c.name == "2s").unwrap();
    assert_eq!(two.hand, Hand::North);
}

#[test]
fn test_core_detection_beats_stray_duplicate() {
    let mut dets = full_deal();
    // A second As, isolated in the east quadrant
    dets.push(Detection::new("As", 0.75, 0.5, 0.5));

    let assignment = assign_deal(
        dets,
        &ConverterConfig::default(),
        &DensityCoreFinder::default(),
        &SingleLinkage,
    );
    assert!(assignment.is_complete());
    assert_eq!(assignment.cards.len(), 52);
    let aces: Vec<_> = assignment.cards.iter().filter(|c| c.name == "As").collect();
    assert_eq!(aces.len(), 1);
    assert_eq!(aces[0].hand, Hand::North);
}

#[test]
fn test_missing_card_is_reported() {
    let mut dets = full_deal();
    dets.remove(0);

    let mut converter = converter(CoreFinderKind::Density, LinkageKind::Single);
    converter.load(dets);
    converter.dedup().unwrap();
    let assignment = converter.assign().unwrap();

    assert!(!assignment.is_complete());
    let deficiency = assignment.deficiency.as_ref().unwrap();
    assert_eq!(deficiency.missing, vec!["2s".to_string()]);
    assert_eq!(deficiency.short_hands, vec![(Hand::North, 12)]);
    assert!(deficiency.unassigned.is_empty());
    assert!(converter.format_pbn().is_err());
}

#[test]
fn test_smart_dedup_keeps_second_symbols() {
    let mut dets = full_deal();
    // Every west card also shows its second corner symbol 0.12 to the right
    let seconds: Vec<Detection> = dets
        .iter()
        .filter(|d| d.center_x == 0.1)
        .map(|d| Detection::new(&d.name, 0.22, d.center_y, 0.85))
        .collect();
    assert_eq!(seconds.len(), 13);
    dets.extend(seconds);

    let mut simple = converter(CoreFinderKind::Density, LinkageKind::Single);
    simple.load(dets.clone());
    assert_eq!(simple.dedup().unwrap().len(), 52);

    let mut smart = converter(CoreFinderKind::Density, LinkageKind::Single)
        .with_config(ConverterConfig::smart());
    smart.load(dets);
    assert_eq!(smart.dedup().unwrap().len(), 65);

    let assignment = smart.assign().unwrap();
    assert!(assignment.is_complete());
    assert_eq!(smart.format_pbn().unwrap(), SUIT_PER_HAND_PBN);
}

#[test]
fn test_smart_dedup_pairs_inside_one_core() {
    let mut dets = full_deal();
    // Second corner symbol of each west card, close enough to join the west core
    let seconds: Vec<Detection> = dets
        .iter()
        .filter(|d| d.center_x == 0.1)
        .map(|d| Detection::new(&d.name, 0.15, d.center_y + 0.09, 0.85))
        .collect();
    dets.extend(seconds);

    let mut converter = converter(CoreFinderKind::Density, LinkageKind::Single)
        .with_config(ConverterConfig::smart());
    converter.load(dets);
    assert_eq!(converter.dedup().unwrap().len(), 65);

    let assignment = converter.assign().unwrap();
    assert!(assignment.is_complete(), "{:?}", assignment.deficiency);
    assert_eq!(assignment.hand_sizes(), [13, 13, 13, 13]);
    assert!(assignment.hand_cards(Hand::West).iter().all(|c| c.center_x == 0.1));
    assert_eq!(converter.format_pbn().unwrap(), SUIT_PER_HAND_PBN);
}

#[test]
fn test_assignment_csv_file() {
    let mut converter = converter(CoreFinderKind::Density, LinkageKind::Single);
    converter.load(full_deal());
    converter.dedup().unwrap();
    let assignment = converter.assign().unwrap().clone();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deal.csv");
    write_assignment_csv(&path, &assignment.cards).unwrap();

    let cards = read_assignment_csv(&path).unwrap();
    assert_eq!(cards, assignment.cards);
}
