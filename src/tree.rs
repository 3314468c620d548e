// This module derives every matchup in the bracket from the base seeding and
// the current pick map. Nothing here is stored: round pairings are recomputed
// on demand, and anything not yet determined degrades to None.

use crate::field::{Field, Region, Team};
use crate::picks::PickMap;
use crate::slot::{Slot, FIRST_ROUND_PAIRINGS, GAMES_PER_ROUND, REGION_ROUNDS, SEMIFINAL_HALVES};

/// One matchup. Either side may be undetermined (hole in the field, or the
/// feeding game has no pick yet).
pub type Pair = (Option<Team>, Option<Team>);

/// The matchups contesting `round` of `region`, in bracket order.
///
/// Round 0 comes straight from the seed slots via the fixed pairing table.
/// Round r > 0 pairs consecutive winners of round r-1, where each winner is
/// whatever the pick map currently stores for that game (unset picks leave a
/// hole). Pure function of its inputs; rounds outside 0..=3 yield no games.
pub fn round_pairs(field: &Field, region: Region, round: u8, picks: &PickMap) -> Vec<Pair> {
    if round >= REGION_ROUNDS {
        return Vec::new();
    }
    if round == 0 {
        return FIRST_ROUND_PAIRINGS
            .iter()
            .map(|&(a, b)| (field.team(region, a).cloned(), field.team(region, b).cloned()))
            .collect();
    }
    let prev_round = round - 1;
    let winners: Vec<Option<Team>> = (0..GAMES_PER_ROUND[prev_round as usize])
        .map(|game| {
            picks
                .winner(Slot::RegionGame { region, round: prev_round, game })
                .cloned()
        })
        .collect();
    winners
        .chunks(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect()
}

/// The champion a region currently sends to the Final Four, if picked.
pub fn regional_champion(picks: &PickMap, region: Region) -> Option<Team> {
    picks
        .winner(Slot::RegionGame { region, round: REGION_ROUNDS - 1, game: 0 })
        .cloned()
}

/// The two national semifinals. Halves are fixed tournament structure:
/// South/West on the left, East/Midwest on the right.
pub fn final_four_pairs(picks: &PickMap) -> [Pair; 2] {
    SEMIFINAL_HALVES.map(|[a, b]| (regional_champion(picks, a), regional_champion(picks, b)))
}

/// The championship matchup, from the stored semifinal winners.
pub fn final_pair(picks: &PickMap) -> Pair {
    (
        picks.winner(Slot::Semifinal { slot: 0 }).cloned(),
        picks.winner(Slot::Semifinal { slot: 1 }).cloned(),
    )
}

/// The matchup a slot addresses, evaluated against the current picks.
/// The champion slot shares the final's matchup since it mirrors the final.
pub fn pair_for_slot(field: &Field, picks: &PickMap, slot: Slot) -> Pair {
    match slot {
        Slot::RegionGame { region, round, game } => round_pairs(field, region, round, picks)
            .into_iter()
            .nth(game as usize)
            .unwrap_or((None, None)),
        Slot::Semifinal { slot } => {
            let pairs = final_four_pairs(picks);
            pairs.get(slot as usize).cloned().unwrap_or((None, None))
        }
        Slot::Final | Slot::Champion => final_pair(picks),
    }
}

/// Whether `team` currently occupies a side of `pair`.
pub fn pair_contains(pair: &Pair, team: &Team) -> bool {
    pair.0.as_ref() == Some(team) || pair.1.as_ref() == Some(team)
}
