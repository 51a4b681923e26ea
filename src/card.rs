//! The 52-card deck as the detector labels it
//!
//! Detector class labels are rank followed by a lowercase suit letter,
//! with the ten written as `10` (e.g. `10s`, `Qh`, `2c`).

use anyhow::{anyhow, Result};
use bridge_parsers::{Card, Rank, Suit};
use regex::Regex;

/// Number of cards in a full hand
pub const HAND_SIZE: usize = 13;

/// All detector class labels, in detector class order
pub const CARD_CLASSES: [&str; 52] = [
    "2s", "3s", "4s", "5s", "6s", "7s", "8s", "9s", "10s", "Js", "Qs", "Ks", "As",
    "2c", "3c", "4c", "5c", "6c", "7c", "8c", "9c", "10c", "Jc", "Qc", "Kc", "Ac",
    "2d", "3d", "4d", "5d", "6d", "7d", "8d", "9d", "10d", "Jd", "Qd", "Kd", "Ad",
    "2h", "3h", "4h", "5h", "6h", "7h", "8h", "9h", "10h", "Jh", "Qh", "Kh", "Ah",
];

lazy_static::lazy_static! {
    static ref LABEL_PATTERN: Regex = Regex::new(r"^(10|[2-9JQKA])([shdc])$").unwrap();
}

/// Whether `label` is one of the 52 detector classes
pub fn is_card_label(label: &str) -> bool {
    CARD_CLASSES.contains(&label)
}

/// Parse a detector label such as `10s` or `Kh` into a card
pub fn parse_label(label: &str) -> Result<Card> {
    let caps = LABEL_PATTERN
        .captures(label.trim())
        .ok_or_else(|| anyhow!("Invalid card label: {}", label))?;

    let rank_char = match &caps[1] {
        "10" => 'T',
        r => r.chars().next().unwrap_or('?'),
    };
    let rank = Rank::from_char(rank_char).ok_or_else(|| anyhow!("Invalid rank in label: {}", label))?;

    let suit = match &caps[2] {
        "s" => Suit::Spades,
        "h" => Suit::Hearts,
        "d" => Suit::Diamonds,
        "c" => Suit::Clubs,
        _ => return Err(anyhow!("Invalid suit in label: {}", label)),
    };

    Ok(Card::new(suit, rank))
}

/// Position of a suit in PBN hand order (spades first)
pub fn suit_index(suit: Suit) -> usize {
    match suit {
        Suit::Spades => 0,
        Suit::Hearts => 1,
        Suit::Diamonds => 2,
        Suit::Clubs => 3,
    }
}

/// Rank strength, 12 for the ace down to 0 for the two
pub fn rank_strength(rank: Rank) -> u8 {
    match rank {
        Rank::Ace => 12,
        Rank::King => 11,
        Rank::Queen => 10,
        Rank::Jack => 9,
        Rank::Ten => 8,
        Rank::Nine => 7,
        Rank::Eight => 6,
        Rank::Seven => 5,
        Rank::Six => 4,
        Rank::Five => 3,
        Rank::Four => 2,
        Rank::Three => 1,
        Rank::Two => 0,
    }
}
