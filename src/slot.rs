// This module defines the addressable decision points of the tournament.
// Slots are closed enums in memory; the string grammar ("SOUTH__R0__G0__winner")
// exists only at the persistence boundary, via the encode/decode pair below.

use serde::{Deserialize, Serialize};

use crate::field::Region;

/// Rounds played inside a region: Round of 64, Round of 32, Sweet 16, Elite 8.
pub const REGION_ROUNDS: u8 = 4;

/// Games per regional round, indexed by round.
pub const GAMES_PER_ROUND: [u8; 4] = [8, 4, 2, 1];

/// Decided games in the whole tournament: 4 regions x 15, two semifinals, one final.
pub const TOTAL_GAMES: usize = 63;

/// First-round seed matchups, in bracket order top to bottom. This ordering is
/// tournament structure, not configuration: game 0 of every region is 1 v 16.
pub const FIRST_ROUND_PAIRINGS: [(u8, u8); 8] =
    [(1, 16), (8, 9), (5, 12), (4, 13), (6, 11), (3, 14), (7, 10), (2, 15)];

/// Which regional champions meet in each national semifinal. The left half of
/// the bracket (semifinal 0) is South/West, the right half is East/Midwest.
pub const SEMIFINAL_HALVES: [[Region; 2]; 2] = [
    [Region::South, Region::West],
    [Region::East, Region::Midwest],
];

/// An addressable pick: one game's winner, or the champion marker that mirrors
/// the final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot {
    RegionGame { region: Region, round: u8, game: u8 },
    Semifinal { slot: u8 },
    Final,
    Champion,
}

impl Slot {
    /// String form used by the persisted flat pick map.
    pub fn encode(&self) -> String {
        match self {
            Slot::RegionGame { region, round, game } => {
                format!("{}__R{}__G{}__winner", region.as_str(), round, game)
            }
            Slot::Semifinal { slot } => format!("FF__G{}__winner", slot),
            Slot::Final => "FINAL__winner".to_string(),
            Slot::Champion => "CHAMPION".to_string(),
        }
    }

    /// Parse a persisted slot key. Returns `None` for anything outside the
    /// grammar, including structurally valid keys with out-of-range indices.
    pub fn decode(key: &str) -> Option<Slot> {
        if key == "CHAMPION" {
            return Some(Slot::Champion);
        }
        let game_part = key.strip_suffix("__winner")?;
        GameId::decode(game_part).map(Slot::from)
    }

    /// The game this slot decides; `None` for the champion marker, which is
    /// derived from the final rather than played.
    pub fn game_id(&self) -> Option<GameId> {
        match *self {
            Slot::RegionGame { region, round, game } => {
                Some(GameId::RegionGame { region, round, game })
            }
            Slot::Semifinal { slot } => Some(GameId::Semifinal { slot }),
            Slot::Final => Some(GameId::Final),
            Slot::Champion => None,
        }
    }
}

impl From<GameId> for Slot {
    fn from(id: GameId) -> Slot {
        match id {
            GameId::RegionGame { region, round, game } => {
                Slot::RegionGame { region, round, game }
            }
            GameId::Semifinal { slot } => Slot::Semifinal { slot },
            GameId::Final => Slot::Final,
        }
    }
}

/// A playable tournament game, as keyed by the finalized-results feed.
/// Identical to [`Slot`] minus the champion marker and the `__winner` suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameId {
    RegionGame { region: Region, round: u8, game: u8 },
    Semifinal { slot: u8 },
    Final,
}

impl GameId {
    pub fn encode(&self) -> String {
        match self {
            GameId::RegionGame { region, round, game } => {
                format!("{}__R{}__G{}", region.as_str(), round, game)
            }
            GameId::Semifinal { slot } => format!("FF__G{}", slot),
            GameId::Final => "FINAL".to_string(),
        }
    }

    pub fn decode(id: &str) -> Option<GameId> {
        if id == "FINAL" {
            return Some(GameId::Final);
        }
        let mut parts = id.split("__");
        let head = parts.next()?;
        if head == "FF" {
            let slot = parse_indexed(parts.next()?, 'G')?;
            if parts.next().is_some() || slot > 1 {
                return None;
            }
            return Some(GameId::Semifinal { slot });
        }
        let region = Region::parse(head)?;
        let round = parse_indexed(parts.next()?, 'R')?;
        let game = parse_indexed(parts.next()?, 'G')?;
        if parts.next().is_some() {
            return None;
        }
        if round >= REGION_ROUNDS || game >= GAMES_PER_ROUND[round as usize] {
            return None;
        }
        Some(GameId::RegionGame { region, round, game })
    }

    /// The pick slot that predicts this game's winner.
    pub fn winner_slot(&self) -> Slot {
        Slot::from(*self)
    }

    /// Display stage for the worst-bracket standings breakdown.
    pub fn stage(&self) -> Stage {
        match self {
            GameId::RegionGame { round: 0 | 1, .. } => Stage::FirstWeekend,
            GameId::RegionGame { .. } => Stage::SecondWeekend,
            GameId::Semifinal { .. } | GameId::Final => Stage::FinalFour,
        }
    }

    /// All 63 games in play order: each region round by round, then the
    /// semifinals, then the final.
    pub fn all() -> Vec<GameId> {
        let mut ids = Vec::with_capacity(TOTAL_GAMES);
        for region in Region::ALL {
            for round in 0..REGION_ROUNDS {
                for game in 0..GAMES_PER_ROUND[round as usize] {
                    ids.push(GameId::RegionGame { region, round, game });
                }
            }
        }
        ids.push(GameId::Semifinal { slot: 0 });
        ids.push(GameId::Semifinal { slot: 1 });
        ids.push(GameId::Final);
        ids
    }
}

/// Tournament stages used to break down worst-bracket standings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    FirstWeekend,
    SecondWeekend,
    FinalFour,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::FirstWeekend, Stage::SecondWeekend, Stage::FinalFour];

    pub fn label(&self) -> &'static str {
        match self {
            Stage::FirstWeekend => "Rounds of 64 and 32",
            Stage::SecondWeekend => "Sweet 16 and Elite Eight",
            Stage::FinalFour => "Final Four and Championship",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Stage::FirstWeekend => 0,
            Stage::SecondWeekend => 1,
            Stage::FinalFour => 2,
        }
    }
}

/// Parse "R3" / "G7" style components: a single letter tag and an index.
fn parse_indexed(part: &str, tag: char) -> Option<u8> {
    let digits = part.strip_prefix(tag)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
