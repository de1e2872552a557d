//! Turn rotation and round resolution.
//!
//! The trickiest corner of the match: leaders finishing mid-round,
//! all-but-one passing, and removed seats must never leave the turn
//! pointer on a finished player.

use std::mem;

use tracing::warn;

use super::state::{RoomState, RoomStatus};

impl RoomState {
    /// Next eligible seat clockwise from `from`: finished seats are always
    /// skipped, passed seats only when `allow_passed` is false. If no seat
    /// qualifies the starting index is returned as a safe fallback.
    pub fn advance_turn(&self, from: usize, allow_passed: bool) -> usize {
        let n = self.players.len();
        if n == 0 {
            return from;
        }
        for step in 1..=n {
            let seat = (from + step) % n;
            let player = &self.players[seat];
            if !player.is_active() {
                continue;
            }
            if !allow_passed && player.has_passed {
                continue;
            }
            return seat;
        }
        warn!(room = %self.code, from, "rotation found no eligible seat; holding turn");
        from
    }

    /// True when the round leader stands unbeaten: every other seat has
    /// either passed or finished.
    pub fn round_is_closed(&self) -> bool {
        if self.pile.is_empty() {
            return false;
        }
        let Some(leader) = self.last_to_play.as_deref() else {
            return false;
        };
        self.players
            .iter()
            .all(|p| !p.is_active() || p.has_passed || p.id == leader)
    }

    /// Archive the pile and hand the lead to the round winner, if the round
    /// is over. Idempotent: once the pile is archived this is a no-op, so
    /// already-reset pass flags are never disturbed.
    pub fn resolve_round_if_closed(&mut self) -> bool {
        if !self.round_is_closed() {
            return false;
        }
        self.close_round();
        true
    }

    fn close_round(&mut self) {
        let closed = mem::take(&mut self.pile);
        if !closed.is_empty() {
            self.history.push(closed);
        }
        for p in &mut self.players {
            p.has_passed = false;
        }
        let closer = self.last_to_play.take().and_then(|id| self.seat_of(&id));
        self.current_seat = match closer {
            Some(seat) if self.players[seat].is_active() => seat,
            // The winner already emptied their hand; the lead moves on,
            // pass flags no longer apply.
            Some(seat) => self.advance_turn(seat, true),
            // The winner left the room entirely.
            None => self.advance_turn(self.current_seat, true),
        };
    }

    /// Reassert that the turn pointer names an unranked seat (or the state
    /// is terminal). Called after every mutation that can strand it.
    pub fn repair_current_seat(&mut self) {
        if self.status != RoomStatus::Playing || self.players.is_empty() {
            return;
        }
        if self.current_seat >= self.players.len() {
            warn!(room = %self.code, seat = self.current_seat, "turn pointer out of range; repairing");
            self.current_seat = 0;
        }
        if self.players[self.current_seat].is_active() {
            return;
        }
        warn!(room = %self.code, seat = self.current_seat, "turn pointer on a finished seat; repairing");
        self.current_seat = self.advance_turn(self.current_seat, true);
    }
}

#[cfg(test)]
mod tests {
    use crate::game::card::{Card, Rank, Suit};
    use crate::game::combo::classify;
    use crate::room::player::Player;
    use crate::room::state::{PlayRecord, RoomState, RoomStatus};

    fn card(rank: Rank, suit: Suit) -> Card {
        Card { rank, suit }
    }

    fn room_of(seats: usize) -> RoomState {
        let mut st = RoomState::new("ROTATE".into(), "rotate".into(), true, 0);
        for i in 0..seats {
            let mut bot = Player::bot(format!("p{i}"), format!("p{i}"));
            bot.hand = vec![card(Rank::Ace, Suit::Spades)];
            st.players.push(bot);
        }
        st.status = RoomStatus::Playing;
        st.opener = Some(card(Rank::Three, Suit::Spades));
        st
    }

    fn standing_play(st: &mut RoomState, seat: usize, rank: Rank) {
        let cards = vec![card(rank, Suit::Hearts)];
        let combo = classify(&cards).unwrap();
        st.pile.push(PlayRecord {
            player_id: st.players[seat].id.clone(),
            cards,
            combo,
        });
        st.last_to_play = Some(st.players[seat].id.clone());
    }

    #[test]
    fn advance_skips_finished_seats() {
        let mut st = room_of(4);
        st.players[1].finished_rank = Some(1);
        assert_eq!(st.advance_turn(0, false), 2);
    }

    #[test]
    fn advance_skips_passed_seats_unless_allowed() {
        let mut st = room_of(4);
        st.players[1].has_passed = true;
        assert_eq!(st.advance_turn(0, false), 2);
        assert_eq!(st.advance_turn(0, true), 1);
    }

    #[test]
    fn advance_wraps_around() {
        let mut st = room_of(4);
        st.players[0].has_passed = true;
        st.players[3].finished_rank = Some(1);
        // from seat 2: seat 3 finished, seat 0 passed, seat 1 eligible
        assert_eq!(st.advance_turn(2, false), 1);
    }

    #[test]
    fn advance_falls_back_to_start_when_nobody_qualifies() {
        let mut st = room_of(3);
        for p in &mut st.players {
            p.finished_rank = Some(1);
        }
        assert_eq!(st.advance_turn(1, false), 1);
    }

    #[test]
    fn round_closes_once_all_others_pass() {
        let mut st = room_of(4);
        standing_play(&mut st, 0, Rank::Nine);
        st.players[1].has_passed = true;
        st.players[2].has_passed = true;
        assert!(!st.round_is_closed());
        st.players[3].has_passed = true;
        assert!(st.round_is_closed());
        assert!(st.resolve_round_if_closed());
        assert!(st.pile.is_empty());
        assert_eq!(st.history.len(), 1);
        assert_eq!(st.current_seat, 0);
        assert!(st.players.iter().all(|p| !p.has_passed));
    }

    #[test]
    fn round_resolution_is_idempotent() {
        let mut st = room_of(4);
        standing_play(&mut st, 0, Rank::Nine);
        for seat in 1..4 {
            st.players[seat].has_passed = true;
        }
        assert!(st.resolve_round_if_closed());
        // A second resolution must not fire again or touch pass flags.
        st.players[2].has_passed = true;
        assert!(!st.resolve_round_if_closed());
        assert!(st.players[2].has_passed);
        assert_eq!(st.history.len(), 1);
    }

    #[test]
    fn finished_leader_passes_the_lead_on() {
        let mut st = room_of(4);
        standing_play(&mut st, 1, Rank::Nine);
        st.players[1].finished_rank = Some(1);
        st.players[1].hand.clear();
        for seat in [0, 2, 3] {
            st.players[seat].has_passed = true;
        }
        assert!(st.resolve_round_if_closed());
        // Lead continues clockwise from the finished winner, pass flags
        // ignored.
        assert_eq!(st.current_seat, 2);
        assert!(st.players[st.current_seat].is_active());
    }

    #[test]
    fn leader_who_left_the_room_does_not_block_closure() {
        let mut st = room_of(3);
        standing_play(&mut st, 0, Rank::Nine);
        st.last_to_play = Some("ghost".into());
        st.players[0].has_passed = true;
        st.players[1].has_passed = true;
        st.players[2].has_passed = true;
        st.current_seat = 2;
        assert!(st.resolve_round_if_closed());
        assert!(st.pile.is_empty());
        assert!(st.players[st.current_seat].is_active());
    }

    #[test]
    fn repair_moves_off_a_finished_seat() {
        let mut st = room_of(3);
        st.players[0].finished_rank = Some(1);
        st.current_seat = 0;
        st.repair_current_seat();
        assert_eq!(st.current_seat, 1);
    }

    #[test]
    fn repair_is_a_no_op_on_a_valid_seat() {
        let mut st = room_of(3);
        st.current_seat = 2;
        st.repair_current_seat();
        assert_eq!(st.current_seat, 2);
    }
}
