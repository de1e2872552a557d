//! Authoritative per-room match state and its mutators.
//!
//! Everything here is synchronous; the session layer serializes access by
//! holding the room mutex for the whole of one event.

use std::mem;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

use crate::game::card::Card;
use crate::game::combo::Combo;
use crate::game::deck;
use crate::game::rules::{self, MoveError, MoveOutcome};
use crate::protocol::{PlayView, PublicPlayer, RoomSnapshot};
use crate::room::player::Player;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Lobby,
    Playing,
    Finished,
}

/// One accepted move, as it sits in the pile.
#[derive(Clone, Debug)]
pub struct PlayRecord {
    pub player_id: String,
    pub cards: Vec<Card>,
    pub combo: Combo,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("room not found")]
    RoomNotFound,
    #[error("session expired")]
    SessionExpired,
    #[error("you are not seated in this room")]
    NotInRoom,
    #[error("not your turn")]
    NotYourTurn,
    #[error("only the host can do that")]
    NotHost,
    #[error("room is full")]
    RoomFull,
    #[error("match already started")]
    AlreadyStarted,
    #[error("need at least two seats to start")]
    NotEnoughPlayers,
    #[error("match is not in progress")]
    NotPlaying,
    #[error("unknown card code")]
    UnknownCard,
    #[error("you do not hold those cards")]
    CardsNotOwned,
    #[error("the round leader must play")]
    LeaderMustPlay,
    #[error("no bot with that id")]
    NoSuchBot,
    #[error(transparent)]
    Move(#[from] MoveError),
}

#[derive(Debug)]
pub struct RoomState {
    pub code: String,
    pub name: String,
    pub is_public: bool,
    pub status: RoomStatus,
    /// Seating order; fixed once the match starts, defines turn order.
    pub players: Vec<Player>,
    pub current_seat: usize,
    pub pile: Vec<PlayRecord>,
    pub history: Vec<Vec<PlayRecord>>,
    /// Round leader: the seat whose play currently stands unbeaten.
    pub last_to_play: Option<String>,
    pub finished_order: Vec<String>,
    pub first_play: bool,
    /// Lowest dealt card; fixed at deal time.
    pub opener: Option<Card>,
    pub turn_duration_ms: u64,
    pub turn_deadline_ms: Option<u64>,
    /// Bumped whenever turn ownership (re)starts. Timer and bot tasks
    /// capture it when armed and no-op if it has moved on by fire time.
    pub turn_token: u64,
    /// Last token the session layer armed timers for; keeps re-broadcasts
    /// from arming a second timer against the same turn.
    pub armed_token: u64,
    /// MatchFinished has been broadcast for this deal.
    pub settled: bool,
    pub grace_ms: u64,
    pub bot_delay_ms: u64,
}

fn now_unix_ms() -> u64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as u64
}

impl RoomState {
    pub fn new(code: String, name: String, is_public: bool, turn_duration_ms: u64) -> Self {
        Self {
            code,
            name,
            is_public,
            status: RoomStatus::Lobby,
            players: Vec::new(),
            current_seat: 0,
            pile: Vec::new(),
            history: Vec::new(),
            last_to_play: None,
            finished_order: Vec::new(),
            first_play: false,
            opener: None,
            turn_duration_ms,
            turn_deadline_ms: None,
            turn_token: 0,
            armed_token: 0,
            settled: false,
            grace_ms: crate::config::grace_period_ms(),
            bot_delay_ms: crate::config::bot_delay_ms(),
        }
    }

    pub fn seat_of(&self, player_id: &str) -> Option<usize> {
        self.players.iter().position(|p| p.id == player_id)
    }

    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(self.current_seat)
    }

    pub fn humans(&self) -> usize {
        self.players.iter().filter(|p| !p.is_bot).count()
    }

    /// Keep exactly one human host while any human remains.
    pub fn ensure_host(&mut self) {
        if self.players.iter().any(|p| p.is_host && !p.is_bot) {
            return;
        }
        for p in &mut self.players {
            p.is_host = false;
        }
        if let Some(p) = self.players.iter_mut().find(|p| !p.is_bot) {
            p.is_host = true;
        }
    }

    /// Deal a fresh deck, fix seating, and move to Playing.
    pub fn start<R: Rng>(&mut self, rng: &mut R) -> Result<(), ActionError> {
        if self.status != RoomStatus::Lobby {
            return Err(ActionError::AlreadyStarted);
        }
        if self.players.len() < 2 {
            return Err(ActionError::NotEnoughPlayers);
        }
        let deal = deck::deal(self.players.len(), rng);
        for (player, hand) in self.players.iter_mut().zip(deal.hands) {
            player.hand = hand;
            player.has_passed = false;
            player.finished_rank = None;
        }
        self.opener = Some(deal.opener);
        self.current_seat = deal.starting_seat;
        self.pile.clear();
        self.history.clear();
        self.finished_order.clear();
        self.last_to_play = None;
        self.first_play = true;
        self.settled = false;
        self.status = RoomStatus::Playing;
        self.begin_turn();
        Ok(())
    }

    /// Start a new turn: stale any outstanding timers and set the deadline.
    pub fn begin_turn(&mut self) {
        self.turn_token += 1;
        self.turn_deadline_ms = if self.status == RoomStatus::Playing && self.turn_duration_ms > 0
        {
            Some(now_unix_ms() + self.turn_duration_ms)
        } else {
            None
        };
    }

    /// Apply a play by the seat that owns the current turn.
    pub fn apply_play(&mut self, seat: usize, cards: Vec<Card>) -> Result<MoveOutcome, ActionError> {
        if self.status != RoomStatus::Playing {
            return Err(ActionError::NotPlaying);
        }
        if seat != self.current_seat {
            return Err(ActionError::NotYourTurn);
        }
        let Some(opener) = self.opener else {
            return Err(ActionError::NotPlaying);
        };
        let prev = self.pile.last().map(|p| p.combo);
        let outcome = rules::validate(&cards, prev.as_ref(), self.first_play, opener)?;
        {
            let hand = &self.players[seat].hand;
            if !cards.iter().all(|c| hand.contains(c)) {
                return Err(ActionError::CardsNotOwned);
            }
        }
        let player = &mut self.players[seat];
        player.hand.retain(|c| !cards.contains(c));
        let player_id = player.id.clone();
        self.pile.push(PlayRecord {
            player_id: player_id.clone(),
            cards,
            combo: outcome.combo,
        });
        self.last_to_play = Some(player_id.clone());
        self.first_play = false;
        if self.players[seat].hand.is_empty() {
            let rank = (self.finished_order.len() + 1) as u8;
            self.players[seat].finished_rank = Some(rank);
            self.finished_order.push(player_id);
        }
        self.advance_after_action(seat);
        Ok(outcome)
    }

    /// Apply a pass by the seat that owns the current turn.
    pub fn apply_pass(&mut self, seat: usize) -> Result<(), ActionError> {
        if self.status != RoomStatus::Playing {
            return Err(ActionError::NotPlaying);
        }
        if seat != self.current_seat {
            return Err(ActionError::NotYourTurn);
        }
        if self.pile.is_empty() {
            return Err(ActionError::LeaderMustPlay);
        }
        self.players[seat].has_passed = true;
        self.advance_after_action(seat);
        Ok(())
    }

    fn advance_after_action(&mut self, from: usize) {
        if self.finish_if_done() {
            return;
        }
        if !self.resolve_round_if_closed() {
            self.current_seat = self.advance_turn(from, false);
        }
        self.repair_current_seat();
        self.begin_turn();
    }

    /// Terminal check: once at most one seat is unranked, rank the
    /// stragglers, archive the pile, and finish the match.
    pub fn finish_if_done(&mut self) -> bool {
        if self.status == RoomStatus::Finished {
            return true;
        }
        if self.status != RoomStatus::Playing {
            return false;
        }
        let unranked: Vec<usize> = (0..self.players.len())
            .filter(|&i| self.players[i].is_active())
            .collect();
        if unranked.len() > 1 {
            return false;
        }
        for seat in unranked {
            let rank = (self.finished_order.len() + 1) as u8;
            self.players[seat].finished_rank = Some(rank);
            let id = self.players[seat].id.clone();
            self.finished_order.push(id);
        }
        if !self.pile.is_empty() {
            self.history.push(mem::take(&mut self.pile));
        }
        self.status = RoomStatus::Finished;
        self.turn_deadline_ms = None;
        self.last_to_play = None;
        true
    }

    /// Remove a seat entirely (lobby leave or grace expiry) and restore
    /// every turn/host invariant around the gap it leaves.
    pub fn remove_seat(&mut self, seat: usize) -> Player {
        let was_current = self.status == RoomStatus::Playing && seat == self.current_seat;
        let next_id = if was_current {
            let next = self.advance_turn(seat, false);
            (next != seat).then(|| self.players[next].id.clone())
        } else {
            None
        };
        let removed = self.players.remove(seat);
        if self.players.is_empty() {
            return removed;
        }
        self.ensure_host();
        if self.status == RoomStatus::Playing {
            if let Some(id) = next_id {
                if let Some(next_seat) = self.seat_of(&id) {
                    self.current_seat = next_seat;
                }
            } else if seat < self.current_seat {
                self.current_seat -= 1;
            }
            if self.current_seat >= self.players.len() {
                self.current_seat = 0;
            }
            if !self.finish_if_done() {
                // The departed seat may have been the last holdout of the
                // round, or the turn pointer may now sit on a finished seat.
                self.resolve_round_if_closed();
                self.repair_current_seat();
                self.begin_turn();
            }
        }
        removed
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_id: self.code.clone(),
            name: self.name.clone(),
            status: self.status,
            players: self.players.iter().map(public_player).collect(),
            current_player_id: if self.status == RoomStatus::Playing {
                self.current_player().map(|p| p.id.clone())
            } else {
                None
            },
            pile: self.pile.iter().map(play_view).collect(),
            round_history: self
                .history
                .iter()
                .map(|round| round.iter().map(play_view).collect())
                .collect(),
            last_to_play: self.last_to_play.clone(),
            finished_order: self.finished_order.clone(),
            first_play: self.first_play,
            opener: self.opener.map(|c| c.code()),
            turn_deadline_ms: self.turn_deadline_ms,
            turn_duration_ms: self.turn_duration_ms,
        }
    }
}

fn public_player(p: &Player) -> PublicPlayer {
    PublicPlayer {
        id: p.id.clone(),
        name: p.name.clone(),
        avatar: p.avatar.clone(),
        hand_count: p.hand.len(),
        is_host: p.is_host,
        has_passed: p.has_passed,
        finished_rank: p.finished_rank,
        is_bot: p.is_bot,
        difficulty: p.difficulty,
        is_offline: p.is_offline,
    }
}

fn play_view(record: &PlayRecord) -> PlayView {
    PlayView {
        player_id: record.player_id.clone(),
        cards: record.cards.iter().map(|c| c.code()).collect(),
        combo: record.combo.kind,
    }
}
