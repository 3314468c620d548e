// This module holds the finalized game results published by the results
// admin. Results are append-only: a game gains a winner once and the set only
// ever grows, though nothing here assumes a winner can never be corrected.

use chrono::{DateTime, Utc};
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::field::Team;
use crate::slot::{GameId, TOTAL_GAMES};

/// One finalized outcome as delivered by the ingestion collaborator.
/// `score_total` is the combined final score, recorded only for the
/// championship game (it feeds the tie-break).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizedResult {
    pub id: String,
    pub winner: Option<Team>,
    #[serde(default)]
    pub score_total: Option<i64>,
}

/// The known outcomes of the tournament so far, keyed by game.
///
/// Only ids matching the tournament grammar are kept; anything else in the
/// feed (exhibition games, typos) is ignored with a warning. The snapshot
/// carries its load time so callers can decide when to re-pull.
#[derive(Debug, Clone)]
pub struct ResultsSet {
    winners: FnvHashMap<GameId, Team>,
    championship_total: Option<i64>,
    pub last_updated: DateTime<Utc>,
}

impl Default for ResultsSet {
    fn default() -> Self {
        ResultsSet::new()
    }
}

impl ResultsSet {
    pub fn new() -> ResultsSet {
        ResultsSet {
            winners: FnvHashMap::default(),
            championship_total: None,
            last_updated: Utc::now(),
        }
    }

    pub fn from_results(results: Vec<FinalizedResult>) -> ResultsSet {
        let mut set = ResultsSet::new();
        for result in results {
            set.record(result);
        }
        set
    }

    /// Fold one finalized result into the set.
    pub fn record(&mut self, result: FinalizedResult) {
        let id = match GameId::decode(&result.id) {
            Some(id) => id,
            None => {
                warn!(id = %result.id, "ignoring result for unrecognized game id");
                return;
            }
        };
        if let Some(winner) = result.winner {
            if winner.is_valid() {
                self.winners.insert(id, winner);
            } else {
                warn!(id = %result.id, "ignoring result with malformed winner");
            }
        }
        if id == GameId::Final {
            if let Some(total) = result.score_total {
                self.championship_total = Some(total);
            }
        }
        self.last_updated = Utc::now();
    }

    pub fn winner(&self, id: GameId) -> Option<&Team> {
        self.winners.get(&id)
    }

    /// Number of tournament games with a finalized winner.
    pub fn decided_count(&self) -> usize {
        self.winners.len()
    }

    /// Games still to be played (or still unreported).
    pub fn remaining_count(&self) -> usize {
        TOTAL_GAMES - self.decided_count()
    }

    /// The championship game's combined score, once known.
    pub fn championship_total(&self) -> Option<i64> {
        self.championship_total
    }

    /// Whether the snapshot is older than `hours` and worth re-pulling.
    pub fn is_stale(&self, hours: i64) -> bool {
        let age = Utc::now() - self.last_updated;
        age.num_hours() >= hours
    }
}
