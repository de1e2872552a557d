//! Shape classifier for card sets.

use serde::{Deserialize, Serialize};

use super::card::Card;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComboType {
    Single,
    Pair,
    Triple,
    Quad,
    Run,
    PairsBomb,
    QuadPairsBomb,
}

/// A classified play shape. `top` is the highest-scored member and is what
/// beat comparisons look at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Combo {
    pub kind: ComboType,
    pub size: usize,
    pub top: Card,
}

/// Label a card set as a legal shape, or `None` if it is not one.
/// Pure and state-free: the same cards always classify the same way.
pub fn classify(cards: &[Card]) -> Option<Combo> {
    if cards.is_empty() {
        return None;
    }
    let mut sorted = cards.to_vec();
    sorted.sort();
    // The same physical card twice is never a legal set.
    if sorted.windows(2).any(|w| w[0] == w[1]) {
        return None;
    }
    let top = *sorted.last().expect("non-empty");
    let len = sorted.len();

    if len == 1 {
        return Some(Combo {
            kind: ComboType::Single,
            size: 1,
            top,
        });
    }

    if sorted.iter().all(|c| c.rank == sorted[0].rank) {
        let kind = match len {
            2 => ComboType::Pair,
            3 => ComboType::Triple,
            4 => ComboType::Quad,
            _ => return None,
        };
        return Some(Combo {
            kind,
            size: len,
            top,
        });
    }

    if len >= 3 && is_run(&sorted) {
        return Some(Combo {
            kind: ComboType::Run,
            size: len,
            top,
        });
    }

    if len == 6 {
        return consecutive_pairs(&sorted, 3);
    }
    if len == 8 {
        return consecutive_pairs(&sorted, 4);
    }

    None
}

/// Strictly consecutive distinct ranks, twos excluded.
fn is_run(sorted: &[Card]) -> bool {
    if sorted.iter().any(|c| c.rank.is_top()) {
        return false;
    }
    sorted
        .windows(2)
        .all(|w| w[1].rank.value() == w[0].rank.value() + 1)
}

/// Exactly `pairs` back-to-back pairs of consecutive rank, the top pair
/// below the twos. Three pairs make the small bomb, four the big one.
fn consecutive_pairs(sorted: &[Card], pairs: usize) -> Option<Combo> {
    debug_assert_eq!(sorted.len(), pairs * 2);
    let mut ranks = Vec::with_capacity(pairs);
    for chunk in sorted.chunks(2) {
        if chunk[0].rank != chunk[1].rank {
            return None;
        }
        ranks.push(chunk[0].rank);
    }
    if ranks
        .windows(2)
        .any(|w| w[1].value() != w[0].value() + 1)
    {
        return None;
    }
    if ranks.last().expect("non-empty").is_top() {
        return None;
    }
    let kind = if pairs == 3 {
        ComboType::PairsBomb
    } else {
        ComboType::QuadPairsBomb
    };
    Some(Combo {
        kind,
        size: pairs * 2,
        top: *sorted.last().expect("non-empty"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::card::{Rank, Suit};

    fn card(rank: Rank, suit: Suit) -> Card {
        Card { rank, suit }
    }

    fn pair(rank: Rank) -> Vec<Card> {
        vec![card(rank, Suit::Spades), card(rank, Suit::Clubs)]
    }

    #[test]
    fn classify_single() {
        let combo = classify(&[card(Rank::Seven, Suit::Hearts)]).unwrap();
        assert_eq!(combo.kind, ComboType::Single);
        assert_eq!(combo.top, card(Rank::Seven, Suit::Hearts));
    }

    #[test]
    fn classify_pair_triple_quad() {
        assert_eq!(classify(&pair(Rank::Nine)).unwrap().kind, ComboType::Pair);
        let triple = vec![
            card(Rank::Five, Suit::Spades),
            card(Rank::Five, Suit::Clubs),
            card(Rank::Five, Suit::Hearts),
        ];
        assert_eq!(classify(&triple).unwrap().kind, ComboType::Triple);
        let quad: Vec<Card> = Suit::ALL.iter().map(|&s| card(Rank::King, s)).collect();
        assert_eq!(classify(&quad).unwrap().kind, ComboType::Quad);
    }

    #[test]
    fn classify_run() {
        let run = vec![
            card(Rank::Four, Suit::Hearts),
            card(Rank::Five, Suit::Spades),
            card(Rank::Six, Suit::Clubs),
        ];
        let combo = classify(&run).unwrap();
        assert_eq!(combo.kind, ComboType::Run);
        assert_eq!(combo.size, 3);
        assert_eq!(combo.top, card(Rank::Six, Suit::Clubs));
    }

    #[test]
    fn run_never_contains_a_two() {
        let run = vec![
            card(Rank::King, Suit::Spades),
            card(Rank::Ace, Suit::Spades),
            card(Rank::Two, Suit::Spades),
        ];
        assert_eq!(classify(&run), None);
    }

    #[test]
    fn two_card_gap_is_not_a_run() {
        let cards = vec![
            card(Rank::Four, Suit::Spades),
            card(Rank::Five, Suit::Spades),
            card(Rank::Seven, Suit::Spades),
        ];
        assert_eq!(classify(&cards), None);
    }

    #[test]
    fn classify_pairs_bomb() {
        let mut cards = pair(Rank::Five);
        cards.extend(pair(Rank::Six));
        cards.extend(pair(Rank::Seven));
        let combo = classify(&cards).unwrap();
        assert_eq!(combo.kind, ComboType::PairsBomb);
        assert_eq!(combo.size, 6);
    }

    #[test]
    fn classify_quad_pairs_bomb() {
        let mut cards = pair(Rank::Five);
        cards.extend(pair(Rank::Six));
        cards.extend(pair(Rank::Seven));
        cards.extend(pair(Rank::Eight));
        assert_eq!(classify(&cards).unwrap().kind, ComboType::QuadPairsBomb);
    }

    #[test]
    fn pairs_bomb_may_not_top_out_at_two() {
        let mut cards = pair(Rank::King);
        cards.extend(pair(Rank::Ace));
        cards.extend(pair(Rank::Two));
        assert_eq!(classify(&cards), None);
    }

    #[test]
    fn non_consecutive_pairs_are_invalid() {
        let mut cards = pair(Rank::Five);
        cards.extend(pair(Rank::Six));
        cards.extend(pair(Rank::Eight));
        assert_eq!(classify(&cards), None);
    }

    #[test]
    fn six_distinct_consecutive_cards_are_a_run_not_a_bomb() {
        let cards: Vec<Card> = [
            Rank::Four,
            Rank::Five,
            Rank::Six,
            Rank::Seven,
            Rank::Eight,
            Rank::Nine,
        ]
        .iter()
        .map(|&r| card(r, Suit::Spades))
        .collect();
        assert_eq!(classify(&cards).unwrap().kind, ComboType::Run);
    }

    #[test]
    fn duplicate_card_is_invalid() {
        let cards = vec![card(Rank::Five, Suit::Spades), card(Rank::Five, Suit::Spades)];
        assert_eq!(classify(&cards), None);
    }

    #[test]
    fn five_of_a_rank_is_impossible_and_invalid() {
        // Five same-rank cards cannot come from one deck, but the classifier
        // must still answer without panicking.
        let cards = vec![
            card(Rank::Five, Suit::Spades),
            card(Rank::Five, Suit::Clubs),
            card(Rank::Five, Suit::Diamonds),
            card(Rank::Five, Suit::Hearts),
            card(Rank::Six, Suit::Spades),
        ];
        assert_eq!(classify(&cards), None);
    }

    #[test]
    fn empty_set_is_invalid() {
        assert_eq!(classify(&[]), None);
    }
}
