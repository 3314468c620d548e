// This module scores saved brackets against the finalized results and builds
// the ranked standings for the two challenge formats: best bracket (reward
// correct winners) and worst bracket (reward correct losers).

use std::cmp::Ordering;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::ScoringSettings;
use crate::field::{Field, Team};
use crate::picks::PickMap;
use crate::results::ResultsSet;
use crate::slot::{GameId, TOTAL_GAMES};

/// The two competitive formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Challenge {
    Best,
    Worst,
}

impl Challenge {
    pub fn parse(s: &str) -> Option<Challenge> {
        match s.to_ascii_lowercase().as_str() {
            "best" => Some(Challenge::Best),
            "worst" => Some(Challenge::Worst),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Challenge::Best => "Best Bracket",
            Challenge::Worst => "Worst Bracket",
        }
    }
}

/// A saved bracket as handed over by the persistence collaborator: identity
/// plus the stored flat pick object, verbatim. The pick object is sanitized
/// here, per entry, so one corrupted row never takes down the whole board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub user_name: String,
    pub bracket_name: String,
    #[serde(default)]
    pub picks: Value,
}

/// Why a bracket cannot enter a challenge yet. Both conditions are
/// user-recoverable by finishing the bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EntryError {
    #[error("champion not selected")]
    ChampionNotSelected,
    #[error("tiebreaker missing")]
    TiebreakerMissing,
}

/// Entry gate for a challenge. On a consistent map a present champion implies
/// a fully-filled bracket (the final survives pruning only when both
/// semifinal winners exist, and so on down), so the champion check suffices;
/// the tie-break guess is additionally required for the best-bracket format.
pub fn validate_entry(picks: &PickMap, challenge: Challenge) -> Result<(), EntryError> {
    if picks.champion().is_none() {
        return Err(EntryError::ChampionNotSelected);
    }
    if challenge == Challenge::Best && picks.tiebreaker_total().is_none() {
        return Err(EntryError::TiebreakerMissing);
    }
    Ok(())
}

/// One ranked standings row, shaped for the leaderboard endpoint to emit
/// verbatim. `champion`/`tiebreaker_diff` are populated for the best-bracket
/// format, `stage_counts` for the worst-bracket breakdown.
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardRow {
    pub rank: u32,
    pub user_name: String,
    pub bracket_name: String,
    pub score: u32,
    pub numerator: u32,
    pub denominator: u32,
    pub percentage: f64,
    pub total_possible: u32,
    pub champion: Option<Team>,
    pub tiebreaker_diff: Option<f64>,
    pub stage_counts: Option<[u32; 3]>,
}

/// Per-entry outcome counts against the finalized results.
#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    correct: u32,
    wrong: u32,
    stage_wrong: [u32; 3],
}

fn tally(picks: &PickMap, results: &ResultsSet) -> Tally {
    let mut tally = Tally::default();
    for id in GameId::all() {
        let actual = match results.winner(id) {
            Some(team) => team,
            None => continue,
        };
        let picked = match picks.game_winner(id) {
            Some(team) => team,
            None => continue,
        };
        if picked == actual {
            tally.correct += 1;
        } else {
            tally.wrong += 1;
            tally.stage_wrong[id.stage().index()] += 1;
        }
    }
    tally
}

/// Score a single saved bracket. Never fails: malformed stored picks are
/// sanitized down to an empty map and score zero.
pub fn score_entry(
    field: &Field,
    results: &ResultsSet,
    entry: &Entry,
    challenge: Challenge,
    settings: &ScoringSettings,
) -> LeaderboardRow {
    let mut picks = PickMap::from_stored_json(&entry.picks);
    picks.normalize(field);

    let tally = tally(&picks, results);
    let points = settings.points_per_pick;
    let numerator = match challenge {
        Challenge::Best => tally.correct,
        Challenge::Worst => tally.wrong,
    };
    let score = numerator * points;
    let remaining = results.remaining_count() as u32;

    let (champion, tiebreaker_diff, stage_counts) = match challenge {
        Challenge::Best => {
            let diff = match (results.championship_total(), picks.tiebreaker_total()) {
                (Some(actual), Some(guess)) => Some((guess - actual as f64).abs()),
                _ => None,
            };
            (picks.champion().cloned(), diff, None)
        }
        Challenge::Worst => (None, None, Some(tally.stage_wrong)),
    };

    LeaderboardRow {
        rank: 0,
        user_name: entry.user_name.clone(),
        bracket_name: entry.bracket_name.clone(),
        score,
        numerator,
        denominator: TOTAL_GAMES as u32,
        percentage: numerator as f64 / TOTAL_GAMES as f64 * 100.0,
        total_possible: score + remaining * points,
        champion,
        tiebreaker_diff,
        stage_counts,
    }
}

/// Build the full ranked standings for one challenge.
///
/// Entries are scored in parallel (each against the same immutable results
/// snapshot); sorting and rank assignment stay sequential. Ties on the
/// (score, tie-break) tuple share a dense rank: [30, 30, 20] ranks [1, 1, 2].
pub fn leaderboard(
    field: &Field,
    results: &ResultsSet,
    entries: &[Entry],
    challenge: Challenge,
    settings: &ScoringSettings,
) -> Vec<LeaderboardRow> {
    let min_len = (entries.len() / num_cpus::get().max(1)).max(1);
    let mut rows: Vec<LeaderboardRow> = entries
        .par_iter()
        .with_min_len(min_len)
        .map(|entry| score_entry(field, results, entry, challenge, settings))
        .collect();

    rows.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| match challenge {
                Challenge::Best => cmp_tiebreaker(a.tiebreaker_diff, b.tiebreaker_diff),
                Challenge::Worst => Ordering::Equal,
            })
            .then_with(|| a.user_name.cmp(&b.user_name))
            .then_with(|| a.bracket_name.cmp(&b.bracket_name))
    });

    let mut rank = 0u32;
    let mut prev_key: Option<(u32, Option<u64>)> = None;
    for row in rows.iter_mut() {
        let diff_key = match challenge {
            Challenge::Best => row.tiebreaker_diff.map(f64::to_bits),
            Challenge::Worst => None,
        };
        let key = (row.score, diff_key);
        if prev_key != Some(key) {
            rank += 1;
            prev_key = Some(key);
        }
        row.rank = rank;
    }

    rows
}

/// A known tie-break distance beats a missing one; smaller distances win.
fn cmp_tiebreaker(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
