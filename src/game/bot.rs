//! Greedy-minimal decision policy for computer-controlled seats.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::card::{Card, Rank};
use super::combo::{Combo, ComboType};
use super::rules::{validate, MoveKind};

/// Reserved for future policy weighting; every level currently plays the
/// same greedy line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

/// Pick a play for a bot seat, or `None` to pass.
///
/// Leading seats always get `Some`: a leader may not pass, and the lowest
/// card is always a legal lead (on the match's first play the leading seat
/// holds the opener, which is its lowest card). When following, the
/// cheapest legal beat wins; a chop is only chosen when no plain beat
/// exists. Pure and synchronous so it can run inside the turn handler.
pub fn decide(
    hand: &[Card],
    prev: Option<&Combo>,
    first_play: bool,
    opener: Card,
    _difficulty: Difficulty,
) -> Option<Vec<Card>> {
    let mut sorted = hand.to_vec();
    sorted.sort();
    let Some(prev) = prev else {
        return sorted.first().map(|&c| vec![c]);
    };

    let mut candidates = shape_candidates(&sorted, prev);
    candidates.extend(chop_candidates(&sorted));
    candidates
        .into_iter()
        .filter_map(|cards| {
            validate(&cards, Some(prev), first_play, opener)
                .ok()
                .map(|outcome| (outcome, cards))
        })
        .min_by_key(|(outcome, _)| (matches!(outcome.kind, MoveKind::Chop), outcome.combo.top))
        .map(|(_, cards)| cards)
}

/// Candidate sets of the same shape and length as the pile top.
fn shape_candidates(sorted: &[Card], prev: &Combo) -> Vec<Vec<Card>> {
    match prev.kind {
        ComboType::Single => sorted.iter().map(|&c| vec![c]).collect(),
        ComboType::Pair => rank_sets(sorted, 2),
        ComboType::Triple => rank_sets(sorted, 3),
        ComboType::Quad => rank_sets(sorted, 4),
        ComboType::Run => runs(sorted, prev.size),
        ComboType::PairsBomb => pair_runs(sorted, 3),
        ComboType::QuadPairsBomb => pair_runs(sorted, 4),
    }
}

/// Every chop shape the hand can produce; the validator decides which of
/// them actually apply against the current pile top.
fn chop_candidates(sorted: &[Card]) -> Vec<Vec<Card>> {
    let mut out = rank_sets(sorted, 4);
    out.extend(pair_runs(sorted, 3));
    out.extend(pair_runs(sorted, 4));
    out
}

fn by_rank(sorted: &[Card]) -> BTreeMap<u8, Vec<Card>> {
    let mut groups: BTreeMap<u8, Vec<Card>> = BTreeMap::new();
    for &card in sorted {
        groups.entry(card.rank.value()).or_default().push(card);
    }
    groups
}

/// For every rank held at least `n` times, the `n` cheapest of that rank.
fn rank_sets(sorted: &[Card], n: usize) -> Vec<Vec<Card>> {
    by_rank(sorted)
        .values()
        .filter(|cards| cards.len() >= n)
        .map(|cards| cards[..n].to_vec())
        .collect()
}

/// Runs of exactly `len` ranks, using the cheapest card of each rank.
fn runs(sorted: &[Card], len: usize) -> Vec<Vec<Card>> {
    let singles: Vec<(u8, Card)> = by_rank(sorted)
        .into_iter()
        .filter(|(value, _)| *value < Rank::Two.value())
        .map(|(value, cards)| (value, cards[0]))
        .collect();
    consecutive_windows(&singles, len)
        .into_iter()
        .map(|window| window.iter().map(|(_, c)| *c).collect())
        .collect()
}

/// Consecutive-pair windows of `pairs` ranks, two cheapest cards per rank.
fn pair_runs(sorted: &[Card], pairs: usize) -> Vec<Vec<Card>> {
    let doubles: Vec<(u8, Vec<Card>)> = by_rank(sorted)
        .into_iter()
        .filter(|(value, cards)| *value < Rank::Two.value() && cards.len() >= 2)
        .map(|(value, cards)| (value, cards[..2].to_vec()))
        .collect();
    let mut out = Vec::new();
    if doubles.len() < pairs {
        return out;
    }
    for start in 0..=(doubles.len() - pairs) {
        let window = &doubles[start..start + pairs];
        if window.windows(2).all(|w| w[1].0 == w[0].0 + 1) {
            out.push(window.iter().flat_map(|(_, cards)| cards.clone()).collect());
        }
    }
    out
}

fn consecutive_windows(items: &[(u8, Card)], len: usize) -> Vec<Vec<(u8, Card)>> {
    let mut out = Vec::new();
    if items.len() < len {
        return out;
    }
    for start in 0..=(items.len() - len) {
        let window = &items[start..start + len];
        if window.windows(2).all(|w| w[1].0 == w[0].0 + 1) {
            out.push(window.to_vec());
        }
    }
    out
}
