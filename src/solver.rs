//! Double-dummy trick table for a complete deal

use crate::quadrant::Hand;
use anyhow::{anyhow, Result};
use bridge_solver::{CutoffCache, Hands, PatternCache, Solver};
use bridge_solver::{CLUB, DIAMOND, EAST, HEART, NOTRUMP, NORTH, SOUTH, SPADE, WEST};
use std::fmt;

/// Denomination of a contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strain {
    NoTrump,
    Spades,
    Hearts,
    Diamonds,
    Clubs,
}

impl Strain {
    pub const ALL: [Strain; 5] = [
        Strain::NoTrump,
        Strain::Spades,
        Strain::Hearts,
        Strain::Diamonds,
        Strain::Clubs,
    ];

    fn trump(self) -> usize {
        match self {
            Strain::NoTrump => NOTRUMP,
            Strain::Spades => SPADE,
            Strain::Hearts => HEART,
            Strain::Diamonds => DIAMOND,
            Strain::Clubs => CLUB,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Strain::NoTrump => "NT",
            Strain::Spades => "S",
            Strain::Hearts => "H",
            Strain::Diamonds => "D",
            Strain::Clubs => "C",
        }
    }

    fn index(self) -> usize {
        match self {
            Strain::NoTrump => 0,
            Strain::Spades => 1,
            Strain::Hearts => 2,
            Strain::Diamonds => 3,
            Strain::Clubs => 4,
        }
    }
}

fn seat(hand: Hand) -> usize {
    match hand {
        Hand::North => NORTH,
        Hand::East => EAST,
        Hand::South => SOUTH,
        Hand::West => WEST,
    }
}

/// Tricks taken by each declarer in each strain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DdTable {
    tricks: [[u8; 4]; 5],
}

impl DdTable {
    pub fn tricks(&self, strain: Strain, declarer: Hand) -> u8 {
        self.tricks[strain.index()][declarer.index()]
    }
}

impl fmt::Display for DdTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>3}", "")?;
        for hand in Hand::ALL {
            write!(f, " {:>2}", &hand.name()[..1].to_uppercase())?;
        }
        for strain in Strain::ALL {
            writeln!(f)?;
            write!(f, "{:>3}", strain.symbol())?;
            for hand in Hand::ALL {
                write!(f, " {:>2}", self.tricks(strain, hand))?;
            }
        }
        Ok(())
    }
}

/// Solve one position with shared caches, returning NS tricks
fn solve_position(
    hands: &Hands,
    trump: usize,
    leader: usize,
    cutoff_cache: &mut CutoffCache,
    pattern_cache: &mut PatternCache,
) -> u8 {
    if hands.num_tricks() == 0 {
        return 0;
    }
    let solver = Solver::new(*hands, trump, leader);
    solver.solve_with_caches(cutoff_cache, pattern_cache)
}

/// Compute the double-dummy table of a PBN deal (`N:<north> <east> <south> <west>`).
///
/// The opening lead comes from the declarer's left-hand opponent.
pub fn solve_deal(pbn: &str) -> Result<DdTable> {
    let hands = Hands::from_pbn(pbn).ok_or_else(|| anyhow!("Failed to parse deal: {}", pbn))?;
    let total = hands.num_tricks() as u8;

    let mut tricks = [[0u8; 4]; 5];
    for strain in Strain::ALL {
        // Caches are only valid for a single trump suit
        let mut cutoff_cache = CutoffCache::new(16);
        let mut pattern_cache = PatternCache::new(16);

        for declarer in Hand::ALL {
            let declarer_seat = seat(declarer);
            let leader = (declarer_seat + 1) % 4;
            let ns = solve_position(&hands, strain.trump(), leader, &mut cutoff_cache, &mut pattern_cache);
            let declarer_is_ns = declarer_seat == NORTH || declarer_seat == SOUTH;
            tricks[strain.index()][declarer.index()] = if declarer_is_ns {
                ns
            } else {
                total.saturating_sub(ns)
            };
        }
        log::debug!("{}: {:?}", strain.symbol(), tricks[strain.index()]);
    }

    Ok(DdTable { tricks })
}
