//! Move legality: plain beats and the chop escalation table.

use thiserror::Error;

use super::card::Card;
use super::combo::{classify, Combo, ComboType};

/// How an accepted play relates to the pile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveKind {
    /// Opening a fresh round onto an empty pile.
    Lead,
    /// Same shape, same size, strictly higher top card.
    Beat,
    /// Cross-shape escalation over a top-rank single/pair or a bomb.
    Chop,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveOutcome {
    pub combo: Combo,
    pub kind: MoveKind,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoveError {
    #[error("those cards do not form a playable combination")]
    InvalidCombo,
    #[error("the first play of the match must include the {0}")]
    OpenerRequired(Card),
    #[error("play does not match the {0:?} on the pile")]
    WrongShape(ComboType),
    #[error("play must use the same number of cards as the pile")]
    WrongLength,
    #[error("play must be strictly higher than the {0} on the pile")]
    TooWeak(Card),
}

/// Decide whether `cards` may be played over `prev` (the pile top, if any).
///
/// Pure query: callers apply the result. `opener` is the lowest dealt card,
/// which the very first play of a match must include.
pub fn validate(
    cards: &[Card],
    prev: Option<&Combo>,
    first_play: bool,
    opener: Card,
) -> Result<MoveOutcome, MoveError> {
    let combo = classify(cards).ok_or(MoveError::InvalidCombo)?;
    if first_play && !cards.contains(&opener) {
        return Err(MoveError::OpenerRequired(opener));
    }
    let Some(prev) = prev else {
        return Ok(MoveOutcome {
            combo,
            kind: MoveKind::Lead,
        });
    };
    if combo.kind == prev.kind && combo.size == prev.size {
        if combo.top > prev.top {
            return Ok(MoveOutcome {
                combo,
                kind: MoveKind::Beat,
            });
        }
        return Err(MoveError::TooWeak(prev.top));
    }
    if chop_beats(prev, &combo) {
        return Ok(MoveOutcome {
            combo,
            kind: MoveKind::Chop,
        });
    }
    if combo.kind == prev.kind {
        return Err(MoveError::WrongLength);
    }
    Err(MoveError::WrongShape(prev.kind))
}

/// The chop table. A lone two falls to a quad or either pairs bomb; a pair
/// of twos only to a quad or the big bomb; the big bomb tops any quad or
/// small bomb outright, but never the reverse.
fn chop_beats(prev: &Combo, next: &Combo) -> bool {
    use ComboType::*;
    match prev.kind {
        Single if prev.top.rank.is_top() => {
            matches!(next.kind, Quad | PairsBomb | QuadPairsBomb)
        }
        Pair if prev.top.rank.is_top() => matches!(next.kind, Quad | QuadPairsBomb),
        Quad => next.kind == QuadPairsBomb,
        PairsBomb => next.kind == QuadPairsBomb,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::card::{Rank, Suit};

    fn card(rank: Rank, suit: Suit) -> Card {
        Card { rank, suit }
    }

    fn opener() -> Card {
        card(Rank::Three, Suit::Spades)
    }

    fn quad(rank: Rank) -> Vec<Card> {
        Suit::ALL.iter().map(|&s| card(rank, s)).collect()
    }

    fn pairs_bomb(start: Rank, pairs: u8) -> Vec<Card> {
        let mut cards = Vec::new();
        for step in 0..pairs {
            let value = start.value() + step;
            let rank = Rank::ALL[(value - 3) as usize];
            cards.push(card(rank, Suit::Spades));
            cards.push(card(rank, Suit::Clubs));
        }
        cards
    }

    fn top_of(cards: &[Card]) -> Combo {
        classify(cards).unwrap()
    }

    #[test]
    fn lead_accepts_any_legal_shape() {
        let outcome = validate(&[card(Rank::Ace, Suit::Hearts)], None, false, opener()).unwrap();
        assert_eq!(outcome.kind, MoveKind::Lead);
    }

    #[test]
    fn invalid_shape_is_rejected_first() {
        let cards = vec![card(Rank::Four, Suit::Spades), card(Rank::Five, Suit::Spades)];
        assert_eq!(
            validate(&cards, None, false, opener()),
            Err(MoveError::InvalidCombo)
        );
    }

    #[test]
    fn first_play_must_include_the_opener() {
        let err = validate(&[card(Rank::Four, Suit::Spades)], None, true, opener()).unwrap_err();
        assert_eq!(err, MoveError::OpenerRequired(opener()));
        let ok = validate(&[opener()], None, true, opener()).unwrap();
        assert_eq!(ok.kind, MoveKind::Lead);
    }

    #[test]
    fn first_play_may_wrap_the_opener_in_a_run() {
        let run = vec![
            opener(),
            card(Rank::Four, Suit::Clubs),
            card(Rank::Five, Suit::Hearts),
        ];
        let outcome = validate(&run, None, true, opener()).unwrap();
        assert_eq!(outcome.kind, MoveKind::Lead);
        assert_eq!(outcome.combo.kind, ComboType::Run);
    }

    #[test]
    fn higher_single_beats_lower() {
        let prev = top_of(&[card(Rank::Nine, Suit::Hearts)]);
        let outcome = validate(
            &[card(Rank::Ten, Suit::Spades)],
            Some(&prev),
            false,
            opener(),
        )
        .unwrap();
        assert_eq!(outcome.kind, MoveKind::Beat);
    }

    #[test]
    fn equal_rank_lower_suit_is_too_weak() {
        let prev = top_of(&[card(Rank::Nine, Suit::Hearts)]);
        let err = validate(
            &[card(Rank::Nine, Suit::Spades)],
            Some(&prev),
            false,
            opener(),
        )
        .unwrap_err();
        assert!(matches!(err, MoveError::TooWeak(_)));
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let prev = top_of(&pairs(Rank::Nine));
        let err = validate(
            &[card(Rank::Ten, Suit::Spades)],
            Some(&prev),
            false,
            opener(),
        )
        .unwrap_err();
        assert_eq!(err, MoveError::WrongShape(ComboType::Pair));
    }

    fn pairs(rank: Rank) -> Vec<Card> {
        vec![card(rank, Suit::Spades), card(rank, Suit::Clubs)]
    }

    #[test]
    fn longer_run_does_not_beat_shorter_run() {
        let prev = top_of(&[
            card(Rank::Four, Suit::Spades),
            card(Rank::Five, Suit::Spades),
            card(Rank::Six, Suit::Spades),
        ]);
        let next = vec![
            card(Rank::Seven, Suit::Clubs),
            card(Rank::Eight, Suit::Clubs),
            card(Rank::Nine, Suit::Clubs),
            card(Rank::Ten, Suit::Clubs),
        ];
        assert_eq!(
            validate(&next, Some(&prev), false, opener()),
            Err(MoveError::WrongLength)
        );
    }

    #[test]
    fn quad_chops_a_lone_two() {
        let prev = top_of(&[card(Rank::Two, Suit::Hearts)]);
        let outcome = validate(&quad(Rank::Six), Some(&prev), false, opener()).unwrap();
        assert_eq!(outcome.kind, MoveKind::Chop);
    }

    #[test]
    fn small_bomb_chops_a_lone_two_but_not_a_pair_of_twos() {
        let bomb = pairs_bomb(Rank::Four, 3);
        let lone = top_of(&[card(Rank::Two, Suit::Spades)]);
        assert!(validate(&bomb, Some(&lone), false, opener()).is_ok());
        let two_pair = top_of(&pairs(Rank::Two));
        assert!(matches!(
            validate(&bomb, Some(&two_pair), false, opener()),
            Err(MoveError::WrongShape(_))
        ));
    }

    #[test]
    fn big_bomb_chops_a_pair_of_twos() {
        let prev = top_of(&pairs(Rank::Two));
        let outcome = validate(&pairs_bomb(Rank::Four, 4), Some(&prev), false, opener()).unwrap();
        assert_eq!(outcome.kind, MoveKind::Chop);
    }

    #[test]
    fn chopped_quad_requires_a_strictly_higher_quad() {
        let prev = top_of(&quad(Rank::Nine));
        let err = validate(&quad(Rank::Six), Some(&prev), false, opener()).unwrap_err();
        assert!(matches!(err, MoveError::TooWeak(_)));
        let outcome = validate(&quad(Rank::Ten), Some(&prev), false, opener()).unwrap();
        assert_eq!(outcome.kind, MoveKind::Beat);
    }

    #[test]
    fn big_bomb_tops_quads_and_small_bombs_outright() {
        let big = pairs_bomb(Rank::Four, 4);
        let over_quad = top_of(&quad(Rank::Ace));
        assert_eq!(
            validate(&big, Some(&over_quad), false, opener())
                .unwrap()
                .kind,
            MoveKind::Chop
        );
        let over_small = top_of(&pairs_bomb(Rank::Jack, 3));
        assert_eq!(
            validate(&big, Some(&over_small), false, opener())
                .unwrap()
                .kind,
            MoveKind::Chop
        );
    }

    #[test]
    fn small_bomb_never_answers_the_big_bomb() {
        let prev = top_of(&pairs_bomb(Rank::Four, 4));
        let err = validate(&pairs_bomb(Rank::Jack, 3), Some(&prev), false, opener()).unwrap_err();
        assert!(matches!(err, MoveError::WrongShape(_)));
    }

    #[test]
    fn quad_does_not_chop_an_ordinary_single() {
        let prev = top_of(&[card(Rank::Ace, Suit::Hearts)]);
        let err = validate(&quad(Rank::Six), Some(&prev), false, opener()).unwrap_err();
        assert!(matches!(err, MoveError::WrongShape(_)));
    }
}
