// This module owns the sparse pick map and the invalidation pass that keeps it
// internally consistent: every stored winner must occupy its matchup as derived
// from earlier picks, and the champion always mirrors the final.

use fnv::FnvHashMap;
use rand::Rng;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::field::{Field, Region, Team};
use crate::slot::{GameId, Slot, REGION_ROUNDS};
use crate::tree;

/// Key for the championship combined-score guess in the stored flat form.
pub const TIEBREAKER_KEY: &str = "TIEBREAKER_TOTAL";

/// A user's sparse assignment of winners to slots, plus the tie-break guess.
///
/// Mutations go through [`PickMap::apply_pick`], which returns a new map and
/// leaves the receiver untouched so the caller can keep prior snapshots for
/// undo. The map is consistent after every public mutation: invariants are
/// restored by the pruning pass, never checked by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PickMap {
    winners: FnvHashMap<Slot, Team>,
    tiebreaker_total: Option<f64>,
}

impl PickMap {
    pub fn new() -> PickMap {
        PickMap::default()
    }

    pub fn winner(&self, slot: Slot) -> Option<&Team> {
        self.winners.get(&slot)
    }

    /// The predicted winner of a game (the champion marker is not a game).
    pub fn game_winner(&self, id: GameId) -> Option<&Team> {
        self.winner(id.winner_slot())
    }

    pub fn champion(&self) -> Option<&Team> {
        self.winner(Slot::Champion)
    }

    pub fn tiebreaker_total(&self) -> Option<f64> {
        self.tiebreaker_total
    }

    /// Record the championship combined-score guess. Non-finite values are
    /// refused the same way the load boundary drops them.
    pub fn set_tiebreaker_total(&mut self, total: f64) {
        if total.is_finite() {
            self.tiebreaker_total = Some(total);
        } else {
            warn!(total, "ignoring non-finite tiebreaker");
        }
    }

    pub fn clear_tiebreaker_total(&mut self) {
        self.tiebreaker_total = None;
    }

    /// Number of stored winner picks (the tiebreaker is not counted).
    pub fn len(&self) -> usize {
        self.winners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.winners.is_empty()
    }

    /// Store a winner without revalidating the rest of the map. Callers that
    /// write out of dependency order must run [`PickMap::prune`] afterwards.
    pub fn set_winner(&mut self, slot: Slot, team: Team) {
        self.winners.insert(slot, team);
    }

    /// Apply one pick and return the resulting consistent map.
    ///
    /// The proposed team is expected to be one of the slot's current
    /// occupants (the UI only offers legal choices); the write itself is not
    /// rejected, but the pruning pass removes every downstream pick the
    /// change invalidated, and an illegal write at `slot` is itself removed.
    pub fn apply_pick(&self, field: &Field, slot: Slot, team: Team) -> PickMap {
        let mut next = self.clone();
        next.winners.insert(slot, team);
        next.prune(field);
        next
    }

    /// Remove one pick and return the resulting consistent map.
    pub fn remove_pick(&self, field: &Field, slot: Slot) -> PickMap {
        let mut next = self.clone();
        next.winners.remove(&slot);
        next.prune(field);
        next
    }

    /// The invalidation pass: one forward sweep over the whole bracket.
    ///
    /// Regions are pruned round by round in increasing order, because a
    /// round's pairings are derived from the previous round's (already
    /// pruned) picks; then the semifinals, the final, and the champion
    /// mirror. Each stage depends only on strictly earlier stages, so a
    /// single pass suffices and the result is a fixed point.
    pub fn prune(&mut self, field: &Field) {
        for region in Region::ALL {
            for round in 0..REGION_ROUNDS {
                let pairs = tree::round_pairs(field, region, round, self);
                for (game, pair) in pairs.iter().enumerate() {
                    let slot = Slot::RegionGame { region, round, game: game as u8 };
                    self.drop_if(slot, |picked| !tree::pair_contains(pair, picked));
                }
            }
        }

        // A semifinal pick needs both feeding champions present, not merely
        // the picked one: half-known matchups are shown, never picked.
        let semis = tree::final_four_pairs(self);
        for (i, pair) in semis.iter().enumerate() {
            let slot = Slot::Semifinal { slot: i as u8 };
            self.drop_if(slot, |picked| match pair {
                (Some(a), Some(b)) => picked != a && picked != b,
                _ => true,
            });
        }

        let championship = tree::final_pair(self);
        self.drop_if(Slot::Final, |picked| match &championship {
            (Some(a), Some(b)) => picked != a && picked != b,
            _ => true,
        });

        // The champion is never independently chosen: it mirrors the final.
        match self.winners.get(&Slot::Final).cloned() {
            Some(final_winner) => {
                self.winners.insert(Slot::Champion, final_winner);
            }
            None => {
                self.winners.remove(&Slot::Champion);
            }
        }
    }

    fn drop_if(&mut self, slot: Slot, invalid: impl FnOnce(&Team) -> bool) {
        let stale = match self.winners.get(&slot) {
            Some(picked) => invalid(picked),
            None => false,
        };
        if stale {
            debug!(slot = %slot.encode(), "pruning unreachable pick");
            self.winners.remove(&slot);
        }
    }

    /// Sanitize a map that crossed a trust boundary (storage, another tab):
    /// drop malformed teams and non-finite tiebreakers, then prune. Never
    /// fails; the result is always consistent.
    pub fn normalize(&mut self, field: &Field) {
        self.winners.retain(|slot, team| {
            let keep = team.is_valid();
            if !keep {
                warn!(slot = %slot.encode(), seed = team.seed, "dropping malformed stored pick");
            }
            keep
        });
        if let Some(total) = self.tiebreaker_total {
            if !total.is_finite() {
                warn!("dropping non-finite stored tiebreaker");
                self.tiebreaker_total = None;
            }
        }
        self.prune(field);
    }

    /// Serialize to the persisted flat-object form: slot keys to team values,
    /// plus the numeric tiebreaker.
    pub fn to_stored_json(&self) -> Value {
        let mut map = Map::with_capacity(self.winners.len() + 1);
        for (slot, team) in &self.winners {
            map.insert(slot.encode(), json!({ "seed": team.seed, "name": team.name }));
        }
        if let Some(total) = self.tiebreaker_total {
            map.insert(TIEBREAKER_KEY.to_string(), json!(total));
        }
        Value::Object(map)
    }

    /// Rebuild from the persisted flat object, dropping anything that does
    /// not fit the slot grammar or the team shape. Does not prune; use
    /// [`PickMap::load_stored`] at trust boundaries.
    pub fn from_stored_json(value: &Value) -> PickMap {
        let mut picks = PickMap::new();
        let object = match value.as_object() {
            Some(o) => o,
            None => {
                if !value.is_null() {
                    warn!("stored pick map is not a JSON object; treating as empty");
                }
                return picks;
            }
        };
        for (key, entry) in object {
            if key == TIEBREAKER_KEY {
                match entry.as_f64() {
                    Some(total) if total.is_finite() => picks.tiebreaker_total = Some(total),
                    _ => warn!("dropping non-numeric stored tiebreaker"),
                }
                continue;
            }
            let slot = match Slot::decode(key) {
                Some(slot) => slot,
                None => {
                    warn!(key = %key, "dropping stored entry with unrecognized slot key");
                    continue;
                }
            };
            match serde_json::from_value::<Team>(entry.clone()) {
                Ok(team) => {
                    picks.winners.insert(slot, team);
                }
                Err(_) => warn!(key = %key, "dropping stored entry with malformed team"),
            }
        }
        picks
    }

    /// Parse and sanitize a stored pick map in one step. Unparsable input is
    /// an empty map, never an error.
    pub fn load_stored(raw: &str, field: &Field) -> PickMap {
        let value: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(err) => {
                warn!(%err, "stored pick map is unparsable; treating as empty");
                return PickMap::new();
            }
        };
        let mut picks = PickMap::from_stored_json(&value);
        picks.normalize(field);
        picks
    }
}

/// Fill a bracket uniformly at random, in dependency order: every pick is
/// made only after its matchup is fully determined, so the result satisfies
/// both invariants with no pruning needed.
pub fn random_fill(field: &Field) -> PickMap {
    let mut rng = rand::thread_rng();
    let mut picks = PickMap::new();

    for region in Region::ALL {
        for round in 0..REGION_ROUNDS {
            let pairs = tree::round_pairs(field, region, round, &picks);
            for (game, pair) in pairs.into_iter().enumerate() {
                if let (Some(a), Some(b)) = pair {
                    let winner = if rng.gen_bool(0.5) { a } else { b };
                    picks.set_winner(
                        Slot::RegionGame { region, round, game: game as u8 },
                        winner,
                    );
                }
            }
        }
    }

    let semis = tree::final_four_pairs(&picks);
    for (i, pair) in semis.into_iter().enumerate() {
        if let (Some(a), Some(b)) = pair {
            let winner = if rng.gen_bool(0.5) { a } else { b };
            picks.set_winner(Slot::Semifinal { slot: i as u8 }, winner);
        }
    }

    if let (Some(a), Some(b)) = tree::final_pair(&picks) {
        let winner = if rng.gen_bool(0.5) { a } else { b };
        picks.set_winner(Slot::Final, winner.clone());
        picks.set_winner(Slot::Champion, winner);
    }

    picks
}

/// Caller-owned undo stack: an append-only list of pick-map snapshots,
/// capped so a long session cannot grow without bound.
#[derive(Debug, Clone)]
pub struct PickHistory {
    snapshots: Vec<PickMap>,
    cap: usize,
}

impl PickHistory {
    pub fn new(cap: usize) -> PickHistory {
        PickHistory { snapshots: Vec::new(), cap: cap.max(1) }
    }

    /// Record a snapshot, evicting the oldest once the cap is reached.
    pub fn push(&mut self, picks: PickMap) {
        if self.snapshots.len() == self.cap {
            self.snapshots.remove(0);
        }
        self.snapshots.push(picks);
    }

    /// Pop and return the most recent snapshot.
    pub fn undo(&mut self) -> Option<PickMap> {
        self.snapshots.pop()
    }

    pub fn latest(&self) -> Option<&PickMap> {
        self.snapshots.last()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::TOTAL_GAMES;

    fn team(region: Region, seed: u8) -> Team {
        Team::new(seed, format!("{} {}", region.as_str(), seed))
    }

    fn region_slot(region: Region, round: u8, game: u8) -> Slot {
        Slot::RegionGame { region, round, game }
    }

    /// Check both map invariants directly against the tree engine: every
    /// stored pick occupies its derived matchup, and the champion mirrors
    /// the final.
    fn assert_consistent(field: &Field, picks: &PickMap) {
        for region in Region::ALL {
            for round in 0..REGION_ROUNDS {
                let pairs = tree::round_pairs(field, region, round, picks);
                for (game, pair) in pairs.iter().enumerate() {
                    if let Some(picked) = picks.winner(region_slot(region, round, game as u8)) {
                        assert!(
                            tree::pair_contains(pair, picked),
                            "{:?} r{} g{} pick {:?} not in {:?}",
                            region,
                            round,
                            game,
                            picked,
                            pair
                        );
                    }
                }
            }
        }
        let semis = tree::final_four_pairs(picks);
        for (i, pair) in semis.iter().enumerate() {
            if let Some(picked) = picks.winner(Slot::Semifinal { slot: i as u8 }) {
                assert!(tree::pair_contains(pair, picked));
            }
        }
        if let Some(picked) = picks.winner(Slot::Final) {
            assert!(tree::pair_contains(&tree::final_pair(picks), picked));
        }
        assert_eq!(picks.winner(Slot::Champion).is_some(), picks.winner(Slot::Final).is_some());
        if let (Some(champ), Some(final_winner)) =
            (picks.winner(Slot::Champion), picks.winner(Slot::Final))
        {
            assert_eq!(champ, final_winner);
        }
    }

    /// A complete bracket: every region filled by the favored seed, the two
    /// 1-seed semifinal winners, and the South 1 seed taking the title.
    fn full_bracket(field: &Field) -> PickMap {
        let mut picks = PickMap::new();
        for region in Region::ALL {
            for round in 0..REGION_ROUNDS {
                let pairs = tree::round_pairs(field, region, round, &picks);
                for (game, pair) in pairs.into_iter().enumerate() {
                    let (a, b) = (pair.0.unwrap(), pair.1.unwrap());
                    let winner = if a.seed <= b.seed { a } else { b };
                    picks.set_winner(region_slot(region, round, game as u8), winner);
                }
            }
        }
        picks.set_winner(Slot::Semifinal { slot: 0 }, team(Region::South, 1));
        picks.set_winner(Slot::Semifinal { slot: 1 }, team(Region::East, 1));
        picks.set_winner(Slot::Final, team(Region::South, 1));
        picks.set_winner(Slot::Champion, team(Region::South, 1));
        picks
    }

    #[test]
    fn apply_pick_is_copy_on_write() {
        let field = Field::sample();
        let empty = PickMap::new();
        let one = empty.apply_pick(&field, region_slot(Region::South, 0, 0), team(Region::South, 1));
        assert!(empty.is_empty());
        assert_eq!(one.len(), 1);
    }

    #[test]
    fn prune_is_idempotent() {
        let field = Field::sample();
        let mut picks = full_bracket(&field);
        picks.prune(&field);
        let once = picks.clone();
        picks.prune(&field);
        assert_eq!(picks, once);
    }

    #[test]
    fn full_bracket_is_consistent() {
        let field = Field::sample();
        let picks = full_bracket(&field);
        assert_consistent(&field, &picks);
        assert_eq!(picks.len(), TOTAL_GAMES + 1); // 63 winners + champion
    }

    #[test]
    fn changing_an_early_pick_cascades() {
        let field = Field::sample();
        let picks = full_bracket(&field);

        // Flip round-0 game 0 of South from the 1 seed to the 16 seed. Every
        // later South pick rode on the 1 seed, as did the left semifinal, the
        // final, and the champion.
        let flipped =
            picks.apply_pick(&field, region_slot(Region::South, 0, 0), team(Region::South, 16));

        assert_eq!(
            flipped.winner(region_slot(Region::South, 0, 0)),
            Some(&team(Region::South, 16))
        );
        assert!(flipped.winner(region_slot(Region::South, 1, 0)).is_none());
        assert!(flipped.winner(region_slot(Region::South, 2, 0)).is_none());
        assert!(flipped.winner(region_slot(Region::South, 3, 0)).is_none());
        assert!(flipped.winner(Slot::Semifinal { slot: 0 }).is_none());
        assert!(flipped.winner(Slot::Final).is_none());
        assert!(flipped.winner(Slot::Champion).is_none());

        // Untouched branches survive: game 1 of round 0, and the whole East
        // half of the draw.
        assert_eq!(
            flipped.winner(region_slot(Region::South, 0, 1)),
            Some(&team(Region::South, 8))
        );
        assert_eq!(
            flipped.winner(Slot::Semifinal { slot: 1 }),
            Some(&team(Region::East, 1))
        );
        assert_consistent(&field, &flipped);
    }

    #[test]
    fn changing_a_pick_on_the_losing_branch_leaves_winners_alone() {
        let field = Field::sample();
        let picks = full_bracket(&field);

        // South round-0 game 1 was 8 over 9; flipping it to 9 invalidates the
        // round-1 pick only if that pick was the 8 seed. full_bracket advanced
        // the 1 seed out of round 1, so round 1 survives.
        let flipped =
            picks.apply_pick(&field, region_slot(Region::South, 0, 1), team(Region::South, 9));
        assert_eq!(
            flipped.winner(region_slot(Region::South, 1, 0)),
            Some(&team(Region::South, 1))
        );
        assert_eq!(flipped.winner(Slot::Champion), Some(&team(Region::South, 1)));
        assert_consistent(&field, &flipped);
    }

    #[test]
    fn semifinal_pick_requires_both_champions() {
        let field = Field::sample();
        let mut picks = PickMap::new();
        // Only the South champion is known; a semifinal pick of that champion
        // is still premature and must be pruned.
        picks.set_winner(region_slot(Region::South, 3, 0), team(Region::South, 1));
        picks.set_winner(Slot::Semifinal { slot: 0 }, team(Region::South, 1));
        picks.prune(&field);
        assert!(picks.winner(Slot::Semifinal { slot: 0 }).is_none());
        // the regional pick itself was legal only if rounds 0-2 backed it;
        // they did not, so it is gone too
        assert!(picks.winner(region_slot(Region::South, 3, 0)).is_none());
    }

    #[test]
    fn champion_mirrors_final() {
        let field = Field::sample();
        let mut picks = full_bracket(&field);

        // Disagreeing champion gets overwritten by the final's winner.
        picks.set_winner(Slot::Champion, team(Region::West, 1));
        picks.prune(&field);
        assert_eq!(picks.winner(Slot::Champion), Some(&team(Region::South, 1)));

        // A champion with no final cannot stand.
        let mut orphan = PickMap::new();
        orphan.set_winner(Slot::Champion, team(Region::South, 1));
        orphan.prune(&field);
        assert!(orphan.winner(Slot::Champion).is_none());
    }

    #[test]
    fn normalize_drops_malformed_entries() {
        let field = Field::sample();
        let mut picks = PickMap::new();
        picks.set_winner(region_slot(Region::South, 0, 0), Team::new(99, "Imposter"));
        picks.set_winner(region_slot(Region::South, 0, 1), Team::new(8, ""));
        picks.set_winner(region_slot(Region::West, 0, 0), team(Region::West, 1));
        picks.tiebreaker_total = Some(f64::NAN);
        picks.normalize(&field);
        assert_eq!(picks.len(), 1);
        assert_eq!(picks.winner(region_slot(Region::West, 0, 0)), Some(&team(Region::West, 1)));
        assert!(picks.tiebreaker_total().is_none());
    }

    #[test]
    fn stored_json_roundtrip() {
        let field = Field::sample();
        let mut picks = full_bracket(&field);
        picks.set_tiebreaker_total(145.0);

        let stored = picks.to_stored_json();
        let raw = serde_json::to_string(&stored).unwrap();
        let reloaded = PickMap::load_stored(&raw, &field);
        assert_eq!(reloaded, picks);
    }

    #[test]
    fn stored_keys_use_the_flat_grammar() {
        let field = Field::sample();
        let picks = PickMap::new()
            .apply_pick(&field, region_slot(Region::South, 0, 0), team(Region::South, 1));
        let stored = picks.to_stored_json();
        let object = stored.as_object().unwrap();
        assert!(object.contains_key("SOUTH__R0__G0__winner"));
        assert_eq!(object["SOUTH__R0__G0__winner"]["seed"], 1);
    }

    #[test]
    fn load_stored_survives_garbage() {
        let field = Field::sample();
        assert!(PickMap::load_stored("not json at all", &field).is_empty());
        assert!(PickMap::load_stored("[1, 2, 3]", &field).is_empty());

        let mixed = r#"{
            "SOUTH__R0__G0__winner": {"seed": 1, "name": "SOUTH 1"},
            "SOUTH__R9__G0__winner": {"seed": 2, "name": "Bad Key"},
            "SOUTH__R0__G1__winner": {"seed": "eight"},
            "TIEBREAKER_TOTAL": "plenty"
        }"#;
        let picks = PickMap::load_stored(mixed, &field);
        assert_eq!(picks.len(), 1);
        assert!(picks.tiebreaker_total().is_none());
    }

    #[test]
    fn random_fill_needs_no_pruning() {
        let field = Field::sample();
        for _ in 0..20 {
            let picks = random_fill(&field);
            assert_eq!(picks.len(), TOTAL_GAMES + 1);
            let unpruned = picks.clone();
            let mut pruned = picks;
            pruned.prune(&field);
            assert_eq!(pruned, unpruned);
            assert_consistent(&field, &pruned);
        }
    }

    #[test]
    fn random_fill_skips_undetermined_games() {
        // A field with a hole in it: 1v16 of South cannot be picked, and
        // nothing downstream of that game can either.
        let mut field = Field::new();
        for region in Region::ALL {
            for seed in 1..=16 {
                if region == Region::South && seed == 16 {
                    continue;
                }
                field.insert(region, team(region, seed));
            }
        }
        let picks = random_fill(&field);
        assert!(picks.winner(region_slot(Region::South, 0, 0)).is_none());
        assert!(picks.winner(region_slot(Region::South, 1, 0)).is_none());
        // the 8v9 game is unaffected
        assert!(picks.winner(region_slot(Region::South, 0, 1)).is_some());
        let mut pruned = picks.clone();
        pruned.prune(&field);
        assert_eq!(pruned, picks);
    }

    #[test]
    fn history_caps_snapshots() {
        let field = Field::sample();
        let mut history = PickHistory::new(3);
        let mut current = PickMap::new();
        for game in 0..5u8 {
            history.push(current.clone());
            current = current.apply_pick(
                &field,
                region_slot(Region::South, 0, game),
                tree::round_pairs(&field, Region::South, 0, &current)[game as usize]
                    .0
                    .clone()
                    .unwrap(),
            );
        }
        assert_eq!(history.len(), 3);
        // most recent snapshot had 4 picks
        assert_eq!(history.undo().unwrap().len(), 4);
        assert_eq!(history.undo().unwrap().len(), 3);
        assert_eq!(history.undo().unwrap().len(), 2);
        assert!(history.undo().is_none());
    }
}
