//! Serialization of an assigned deal
//!
//! PBN deal strings feed the double-dummy solver; the CSV table keeps every
//! assigned card with its position for later inspection.

use crate::card::{parse_label, rank_strength, suit_index, HAND_SIZE};
use crate::converter::AssignedCard;
use crate::quadrant::Hand;
use anyhow::{anyhow, bail, Context, Result};
use bridge_parsers::Rank;
use std::collections::HashSet;
use std::path::Path;

const CSV_HEADERS: [&str; 5] = ["name", "hand", "center_x", "center_y", "confidence"];

/// Format a complete assignment as a PBN deal: `N:<north> <east> <south> <west>`.
///
/// Each hand lists spades, hearts, diamonds and clubs separated by dots, ranks
/// high to low with the ten written `T`. Fails unless every hand holds exactly
/// 13 distinct cards.
pub fn format_pbn(cards: &[AssignedCard]) -> Result<String> {
    let mut suits: [[Vec<Rank>; 4]; 4] = Default::default();
    let mut seen = HashSet::new();

    for card in cards {
        if !seen.insert(card.name.as_str()) {
            bail!("Card {} assigned twice", card.name);
        }
        let parsed = parse_label(&card.name)?;
        suits[card.hand.index()][suit_index(parsed.suit)].push(parsed.rank);
    }

    let mut hands = Vec::with_capacity(4);
    for hand in Hand::ALL {
        let holding = &mut suits[hand.index()];
        let count: usize = holding.iter().map(Vec::len).sum();
        if count != HAND_SIZE {
            bail!("{} holds {} cards, expected {}", hand, count, HAND_SIZE);
        }

        let suit_strings: Vec<String> = holding
            .iter_mut()
            .map(|ranks| {
                ranks.sort_by_key(|r| std::cmp::Reverse(rank_strength(*r)));
                ranks.iter().map(|r| r.to_char()).collect()
            })
            .collect();
        hands.push(suit_strings.join("."));
    }

    Ok(format!("N:{}", hands.join(" ")))
}

/// Write the assigned cards as CSV with header `name,hand,center_x,center_y,confidence`
pub fn write_assignment_csv(path: &Path, cards: &[AssignedCard]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record(CSV_HEADERS)?;

    for card in cards {
        writer.write_record([
            card.name.clone(),
            card.hand.name().to_string(),
            card.center_x.to_string(),
            card.center_y.to_string(),
            card.confidence.map(|c| c.to_string()).unwrap_or_default(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

fn parse_hand(name: &str) -> Option<Hand> {
    Hand::ALL.into_iter().find(|h| h.name() == name)
}

/// Read a table written by [`write_assignment_csv`]
pub fn read_assignment_csv(path: &Path) -> Result<Vec<AssignedCard>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut cards = Vec::new();
    for result in reader.records() {
        let record = result.context("Failed to read CSV row")?;
        let field = |i: usize| record.get(i).unwrap_or("").trim();

        let hand = parse_hand(field(1)).ok_or_else(|| anyhow!("Invalid hand: {}", field(1)))?;
        let confidence = match field(4) {
            "" => None,
            c => Some(c.parse::<f64>().with_context(|| format!("Invalid confidence: {}", c))?),
        };
        cards.push(AssignedCard {
            name: field(0).to_string(),
            hand,
            center_x: field(2).parse().with_context(|| format!("Invalid center_x: {}", field(2)))?,
            center_y: field(3).parse().with_context(|| format!("Invalid center_y: {}", field(3)))?,
            confidence,
        });
    }
    Ok(cards)
}
