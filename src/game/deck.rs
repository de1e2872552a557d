//! Deck construction and dealing.

use rand::seq::SliceRandom;
use rand::Rng;

use super::card::{Card, Rank, Suit};

pub const DECK_SIZE: usize = 52;
pub const HAND_SIZE: usize = 13;
pub const MAX_SEATS: usize = 4;

/// The 52 unique cards in canonical id order.
pub fn build_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity(DECK_SIZE);
    for rank in Rank::ALL {
        for suit in Suit::ALL {
            deck.push(Card { rank, suit });
        }
    }
    deck
}

/// One completed deal: a sorted 13-card hand per seat, plus the card that
/// anchors the match opening.
#[derive(Clone, Debug)]
pub struct Deal {
    pub hands: Vec<Vec<Card>>,
    /// Lowest dealt card; the first play of the match must include it.
    pub opener: Card,
    /// The seat holding the opener leads the match.
    pub starting_seat: usize,
}

/// Shuffle a fresh deck (Fisher-Yates via `SliceRandom`) and deal 13
/// contiguous cards to each seat in seating order.
pub fn deal<R: Rng>(seats: usize, rng: &mut R) -> Deal {
    debug_assert!((2..=MAX_SEATS).contains(&seats));
    let mut deck = build_deck();
    deck.shuffle(rng);
    let hands: Vec<Vec<Card>> = (0..seats)
        .map(|seat| {
            let mut hand = deck[seat * HAND_SIZE..(seat + 1) * HAND_SIZE].to_vec();
            hand.sort();
            hand
        })
        .collect();
    let (starting_seat, opener) = hands
        .iter()
        .enumerate()
        .map(|(seat, hand)| (seat, hand[0]))
        .min_by_key(|&(_, card)| card)
        .expect("at least two seats");
    Deal {
        hands,
        opener,
        starting_seat,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn deck_has_52_unique_cards() {
        let deck = build_deck();
        assert_eq!(deck.len(), DECK_SIZE);
        let ids: HashSet<u8> = deck.iter().map(Card::id).collect();
        assert_eq!(ids.len(), DECK_SIZE);
    }

    #[test]
    fn every_seat_gets_13_distinct_cards() {
        let mut rng = StdRng::seed_from_u64(7);
        for seats in 2..=MAX_SEATS {
            let deal = deal(seats, &mut rng);
            assert_eq!(deal.hands.len(), seats);
            let mut all = HashSet::new();
            for hand in &deal.hands {
                assert_eq!(hand.len(), HAND_SIZE);
                for card in hand {
                    assert!(all.insert(card.id()), "card dealt twice: {card}");
                }
            }
        }
    }

    #[test]
    fn starting_seat_holds_the_opener() {
        let mut rng = StdRng::seed_from_u64(42);
        let deal = deal(4, &mut rng);
        assert!(deal.hands[deal.starting_seat].contains(&deal.opener));
        for hand in &deal.hands {
            for card in hand {
                assert!(*card >= deal.opener);
            }
        }
    }

    #[test]
    fn four_seat_deal_opens_on_the_three_of_spades() {
        // All 52 cards go out, so the global minimum is always dealt.
        let mut rng = StdRng::seed_from_u64(3);
        let deal = deal(4, &mut rng);
        assert_eq!(deal.opener.code(), "S3");
    }

    #[test]
    fn hands_come_back_sorted() {
        let mut rng = StdRng::seed_from_u64(11);
        let deal = deal(3, &mut rng);
        for hand in &deal.hands {
            assert!(hand.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
