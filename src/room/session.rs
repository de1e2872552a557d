//! Session lifecycle controller.
//!
//! Every inbound event is handled to completion while holding the room's
//! mutex, which gives each room the serialization guarantee the match
//! state relies on. Turn timers, reconnect grace timers, and delayed bot
//! turns are tokio tasks that sleep first, then re-acquire the room and
//! compare the token they were armed against; a stale firing is a no-op.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::game::bot;
use crate::game::card::Card;
use crate::protocol::{ClientMessage, ServerMessage, Standing};
use crate::room::manager::RoomManager;
use crate::room::player::{bot_name, Player};
use crate::room::state::{ActionError, RoomState, RoomStatus};
use crate::settlement;

/// One live websocket.
pub struct ConnCtx {
    pub id: Uuid,
    pub tx: UnboundedSender<ServerMessage>,
}

/// The seat a connection is currently bound to.
#[derive(Clone, Debug)]
pub struct ConnBinding {
    pub room_id: String,
    pub player_id: String,
}

pub fn handle_message(
    rooms: &RoomManager,
    conn: &ConnCtx,
    binding: &mut Option<ConnBinding>,
    msg: ClientMessage,
) {
    let result = match msg {
        ClientMessage::Ping => {
            let _ = conn.tx.send(ServerMessage::Pong);
            Ok(())
        }
        ClientMessage::CreateRoom {
            player_id,
            name,
            avatar,
            public,
            room_name,
            turn_duration_ms,
        } => create_room(
            rooms,
            conn,
            binding,
            player_id,
            name,
            avatar,
            public,
            room_name,
            turn_duration_ms,
        ),
        ClientMessage::JoinRoom {
            room_id,
            player_id,
            name,
            avatar,
        } => join_room(rooms, conn, binding, room_id, player_id, name, avatar),
        ClientMessage::AddBot { room_id } => add_bot(rooms, binding, &room_id),
        ClientMessage::RemoveBot { room_id, bot_id } => {
            remove_bot(rooms, binding, &room_id, &bot_id)
        }
        ClientMessage::SetBotDifficulty {
            room_id,
            bot_id,
            difficulty,
        } => set_bot_difficulty(rooms, binding, &room_id, &bot_id, difficulty),
        ClientMessage::StartMatch { room_id } => start_match(rooms, binding, &room_id),
        ClientMessage::Play { room_id, cards } => play(rooms, binding, &room_id, cards),
        ClientMessage::Pass { room_id } => pass_turn(rooms, binding, &room_id),
        ClientMessage::ListRooms => {
            let _ = conn.tx.send(ServerMessage::RoomsList {
                rooms: rooms.summaries(),
            });
            Ok(())
        }
        ClientMessage::RequestResync => resync(rooms, conn, binding),
        ClientMessage::Reconnect { room_id, player_id } => {
            reconnect(rooms, conn, binding, room_id, player_id)
        }
        ClientMessage::Emote { room_id, emote } => relay_emote(rooms, binding, &room_id, emote),
    };
    if let Err(err) = result {
        let reply = match err {
            ActionError::SessionExpired => ServerMessage::SessionExpired,
            other => ServerMessage::Error {
                message: other.to_string(),
            },
        };
        let _ = conn.tx.send(reply);
    }
}

#[allow(clippy::too_many_arguments)]
fn create_room(
    rooms: &RoomManager,
    conn: &ConnCtx,
    binding: &mut Option<ConnBinding>,
    player_id: String,
    name: String,
    avatar: String,
    public: bool,
    room_name: Option<String>,
    turn_duration_ms: Option<u64>,
) -> Result<(), ActionError> {
    // Switching rooms implicitly leaves the previous one.
    if let Some(previous) = binding.take() {
        handle_disconnect(rooms, Some(previous), conn.id);
    }
    let room_name = room_name.unwrap_or_else(|| format!("{}'s table", name));
    let turn_ms = turn_duration_ms.unwrap_or_else(crate::config::default_turn_ms);
    let (code, room) = rooms.create(room_name, public, turn_ms);
    {
        let mut st = room.state.lock();
        let mut host = Player::human(player_id.clone(), name, avatar, conn.id, conn.tx.clone());
        host.is_host = true;
        st.players.push(host);
    }
    info!(room = %code, player = %player_id, "room created");
    *binding = Some(ConnBinding {
        room_id: code.clone(),
        player_id,
    });
    let _ = conn.tx.send(ServerMessage::RoomCreated {
        room_id: code.clone(),
    });
    post_mutation(rooms, &code);
    Ok(())
}

fn join_room(
    rooms: &RoomManager,
    conn: &ConnCtx,
    binding: &mut Option<ConnBinding>,
    room_id: String,
    player_id: String,
    name: String,
    avatar: String,
) -> Result<(), ActionError> {
    let room_id = room_id.trim().to_uppercase();
    let room = rooms.get(&room_id).ok_or(ActionError::RoomNotFound)?;
    if let Some(previous) = binding.take() {
        if previous.room_id != room_id {
            handle_disconnect(rooms, Some(previous), conn.id);
        }
    }
    {
        let mut st = room.state.lock();
        if let Some(seat) = st.seat_of(&player_id) {
            // Idempotent rejoin: the same persistent id reclaims its seat.
            let player = &mut st.players[seat];
            player.name = name;
            player.avatar = avatar;
            player.conn_id = Some(conn.id);
            player.tx = Some(conn.tx.clone());
            if player.is_offline {
                player.is_offline = false;
                player.offline_token += 1;
            }
        } else {
            if st.status != RoomStatus::Lobby {
                return Err(ActionError::AlreadyStarted);
            }
            if st.players.len() >= crate::game::deck::MAX_SEATS {
                return Err(ActionError::RoomFull);
            }
            st.players
                .push(Player::human(player_id.clone(), name, avatar, conn.id, conn.tx.clone()));
            st.ensure_host();
        }
    }
    *binding = Some(ConnBinding {
        room_id: room_id.clone(),
        player_id,
    });
    post_mutation(rooms, &room_id);
    Ok(())
}

fn require_host(st: &RoomState, player_id: &str) -> Result<(), ActionError> {
    let seat = st.seat_of(player_id).ok_or(ActionError::NotInRoom)?;
    if !st.players[seat].is_host {
        return Err(ActionError::NotHost);
    }
    Ok(())
}

fn bound<'a>(
    binding: &'a Option<ConnBinding>,
    room_id: &str,
) -> Result<&'a ConnBinding, ActionError> {
    match binding {
        Some(b) if b.room_id == room_id => Ok(b),
        _ => Err(ActionError::NotInRoom),
    }
}

fn add_bot(
    rooms: &RoomManager,
    binding: &Option<ConnBinding>,
    room_id: &str,
) -> Result<(), ActionError> {
    let b = bound(binding, room_id)?;
    let room = rooms.get(room_id).ok_or(ActionError::RoomNotFound)?;
    {
        let mut st = room.state.lock();
        require_host(&st, &b.player_id)?;
        if st.status != RoomStatus::Lobby {
            return Err(ActionError::AlreadyStarted);
        }
        if st.players.len() >= crate::game::deck::MAX_SEATS {
            return Err(ActionError::RoomFull);
        }
        let seed: u64 = rand::random();
        let bot_id = format!("bot-{:08x}", seed as u32);
        st.players.push(Player::bot(bot_id, bot_name(seed)));
    }
    post_mutation(rooms, room_id);
    Ok(())
}

fn remove_bot(
    rooms: &RoomManager,
    binding: &Option<ConnBinding>,
    room_id: &str,
    bot_id: &str,
) -> Result<(), ActionError> {
    let b = bound(binding, room_id)?;
    let room = rooms.get(room_id).ok_or(ActionError::RoomNotFound)?;
    {
        let mut st = room.state.lock();
        require_host(&st, &b.player_id)?;
        if st.status != RoomStatus::Lobby {
            return Err(ActionError::AlreadyStarted);
        }
        let seat = st
            .seat_of(bot_id)
            .filter(|&s| st.players[s].is_bot)
            .ok_or(ActionError::NoSuchBot)?;
        st.remove_seat(seat);
    }
    post_mutation(rooms, room_id);
    Ok(())
}

fn set_bot_difficulty(
    rooms: &RoomManager,
    binding: &Option<ConnBinding>,
    room_id: &str,
    bot_id: &str,
    difficulty: crate::game::bot::Difficulty,
) -> Result<(), ActionError> {
    let b = bound(binding, room_id)?;
    let room = rooms.get(room_id).ok_or(ActionError::RoomNotFound)?;
    {
        let mut st = room.state.lock();
        require_host(&st, &b.player_id)?;
        if st.status != RoomStatus::Lobby {
            return Err(ActionError::AlreadyStarted);
        }
        let seat = st
            .seat_of(bot_id)
            .filter(|&s| st.players[s].is_bot)
            .ok_or(ActionError::NoSuchBot)?;
        st.players[seat].difficulty = difficulty;
    }
    post_mutation(rooms, room_id);
    Ok(())
}

fn start_match(
    rooms: &RoomManager,
    binding: &Option<ConnBinding>,
    room_id: &str,
) -> Result<(), ActionError> {
    let b = bound(binding, room_id)?;
    let room = rooms.get(room_id).ok_or(ActionError::RoomNotFound)?;
    {
        let mut st = room.state.lock();
        require_host(&st, &b.player_id)?;
        st.start(&mut rand::thread_rng())?;
    }
    info!(room = %room_id, "match started");
    post_mutation(rooms, room_id);
    Ok(())
}

fn play(
    rooms: &RoomManager,
    binding: &Option<ConnBinding>,
    room_id: &str,
    codes: Vec<String>,
) -> Result<(), ActionError> {
    let b = bound(binding, room_id)?;
    let room = rooms.get(room_id).ok_or(ActionError::RoomNotFound)?;
    let cards: Vec<Card> = codes
        .iter()
        .map(|code| Card::from_code(code).ok_or(ActionError::UnknownCard))
        .collect::<Result<_, _>>()?;
    {
        let mut st = room.state.lock();
        let seat = st.seat_of(&b.player_id).ok_or(ActionError::NotInRoom)?;
        st.apply_play(seat, cards)?;
    }
    post_mutation(rooms, room_id);
    Ok(())
}

fn pass_turn(
    rooms: &RoomManager,
    binding: &Option<ConnBinding>,
    room_id: &str,
) -> Result<(), ActionError> {
    let b = bound(binding, room_id)?;
    let room = rooms.get(room_id).ok_or(ActionError::RoomNotFound)?;
    {
        let mut st = room.state.lock();
        let seat = st.seat_of(&b.player_id).ok_or(ActionError::NotInRoom)?;
        st.apply_pass(seat)?;
    }
    post_mutation(rooms, room_id);
    Ok(())
}

fn resync(
    rooms: &RoomManager,
    conn: &ConnCtx,
    binding: &Option<ConnBinding>,
) -> Result<(), ActionError> {
    let b = binding.as_ref().ok_or(ActionError::SessionExpired)?;
    let room = rooms.get(&b.room_id).ok_or(ActionError::SessionExpired)?;
    let st = room.state.lock();
    if st.seat_of(&b.player_id).is_none() {
        return Err(ActionError::SessionExpired);
    }
    let _ = conn.tx.send(ServerMessage::RoomState {
        snapshot: st.snapshot(),
    });
    if let Some(seat) = st.seat_of(&b.player_id) {
        let _ = conn.tx.send(ServerMessage::HandSnapshot {
            room_id: st.code.clone(),
            cards: st.players[seat].hand.iter().map(|c| c.code()).collect(),
        });
    }
    Ok(())
}

fn reconnect(
    rooms: &RoomManager,
    conn: &ConnCtx,
    binding: &mut Option<ConnBinding>,
    room_id: String,
    player_id: String,
) -> Result<(), ActionError> {
    let room_id = room_id.trim().to_uppercase();
    let room = rooms.get(&room_id).ok_or(ActionError::SessionExpired)?;
    {
        let mut st = room.state.lock();
        let seat = st.seat_of(&player_id).ok_or(ActionError::SessionExpired)?;
        let player = &mut st.players[seat];
        player.conn_id = Some(conn.id);
        player.tx = Some(conn.tx.clone());
        player.is_offline = false;
        // Invalidate any pending grace timer.
        player.offline_token += 1;
    }
    info!(room = %room_id, player = %player_id, "player reconnected");
    *binding = Some(ConnBinding {
        room_id: room_id.clone(),
        player_id,
    });
    post_mutation(rooms, &room_id);
    Ok(())
}

fn relay_emote(
    rooms: &RoomManager,
    binding: &Option<ConnBinding>,
    room_id: &str,
    emote: String,
) -> Result<(), ActionError> {
    let b = bound(binding, room_id)?;
    let room = rooms.get(room_id).ok_or(ActionError::RoomNotFound)?;
    let st = room.state.lock();
    if st.seat_of(&b.player_id).is_none() {
        return Err(ActionError::NotInRoom);
    }
    // Pure pass-through: no game-state effect.
    let event = ServerMessage::EmoteEvent {
        room_id: room_id.to_string(),
        player_id: b.player_id.clone(),
        emote,
    };
    for player in &st.players {
        player.send(&event);
    }
    Ok(())
}

/// Transport-level disconnect, inferred from the socket closing.
pub fn handle_disconnect(rooms: &RoomManager, binding: Option<ConnBinding>, conn_id: Uuid) {
    let Some(b) = binding else { return };
    let Some(room) = rooms.get(&b.room_id) else {
        return;
    };
    let mut delete_room = false;
    let mut grace_token = None;
    {
        let mut st = room.state.lock();
        let Some(seat) = st.seat_of(&b.player_id) else {
            return;
        };
        if st.players[seat].conn_id != Some(conn_id) {
            // A newer socket already owns this seat.
            return;
        }
        st.players[seat].conn_id = None;
        st.players[seat].tx = None;
        match st.status {
            RoomStatus::Lobby | RoomStatus::Finished => {
                st.remove_seat(seat);
                delete_room = st.humans() == 0;
            }
            RoomStatus::Playing => {
                let player = &mut st.players[seat];
                player.is_offline = true;
                player.offline_token += 1;
                grace_token = Some((player.offline_token, st.grace_ms));
                debug!(room = %b.room_id, player = %b.player_id, "grace period started");
            }
        }
    }
    if delete_room {
        info!(room = %b.room_id, "room empty of humans; deleting");
        rooms.remove(&b.room_id);
        return;
    }
    post_mutation(rooms, &b.room_id);
    if let Some((token, grace_ms)) = grace_token {
        let rooms = rooms.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(grace_ms)).await;
            fire_grace_timer(&rooms, &b.room_id, &b.player_id, token);
        });
    }
}

/// Broadcast one consistent snapshot, settle a freshly finished match, and
/// re-arm the turn timer / bot scheduler if a new turn began. Called after
/// every accepted mutation.
pub fn post_mutation(rooms: &RoomManager, code: &str) {
    let Some(room) = rooms.get(code) else { return };
    let mut arm: Option<(u64, u64, bool, u64)> = None;
    {
        let mut st = room.state.lock();
        let snapshot = st.snapshot();
        for player in &st.players {
            player.send(&ServerMessage::RoomState {
                snapshot: snapshot.clone(),
            });
        }
        for player in &st.players {
            if !player.is_bot {
                player.send(&ServerMessage::HandSnapshot {
                    room_id: st.code.clone(),
                    cards: player.hand.iter().map(|c| c.code()).collect(),
                });
            }
        }
        match st.status {
            RoomStatus::Finished if !st.settled => {
                st.settled = true;
                let standings = build_standings(&st);
                let done = ServerMessage::MatchFinished {
                    room_id: st.code.clone(),
                    standings,
                };
                for player in &st.players {
                    player.send(&done);
                }
                info!(room = %code, "match finished");
            }
            RoomStatus::Playing if st.armed_token != st.turn_token => {
                st.armed_token = st.turn_token;
                let is_bot = st.current_player().map(|p| p.is_bot).unwrap_or(false);
                arm = Some((st.turn_token, st.turn_duration_ms, is_bot, st.bot_delay_ms));
            }
            _ => {}
        }
    }
    if let Some((token, duration_ms, is_bot, bot_delay_ms)) = arm {
        if duration_ms > 0 {
            let rooms = rooms.clone();
            let code = code.to_string();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(duration_ms)).await;
                fire_turn_timer(&rooms, &code, token);
            });
        }
        if is_bot {
            let rooms = rooms.clone();
            let code = code.to_string();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(bot_delay_ms)).await;
                fire_bot_turn(&rooms, &code, token);
            });
        }
    }
}

fn build_standings(st: &RoomState) -> Vec<Standing> {
    let seats = st.finished_order.len().max(st.players.len());
    st.finished_order
        .iter()
        .enumerate()
        .map(|(idx, player_id)| {
            let rank = (idx + 1) as u8;
            Standing {
                player_id: player_id.clone(),
                name: st
                    .seat_of(player_id)
                    .map(|s| st.players[s].name.clone())
                    .unwrap_or_else(|| player_id.clone()),
                rank,
                reward: settlement::settle(rank, seats),
            }
        })
        .collect()
}

/// Turn-timer firing. Returns true if the idle turn was resolved; a stale
/// token (the turn already moved on) is a silent no-op.
pub fn fire_turn_timer(rooms: &RoomManager, code: &str, token: u64) -> bool {
    let Some(room) = rooms.get(code) else {
        return false;
    };
    let acted = {
        let mut st = room.state.lock();
        if st.status != RoomStatus::Playing || st.turn_token != token {
            false
        } else {
            debug!(room = %code, seat = st.current_seat, "turn timer fired");
            resolve_idle_turn(&mut st);
            true
        }
    };
    if acted {
        post_mutation(rooms, code);
    }
    acted
}

/// Auto-resolution for an idle seat: pass when a pile stands, otherwise
/// lead the cheapest legal play. Not an error from the player's point of
/// view; the result broadcasts as a normal state change.
fn resolve_idle_turn(st: &mut RoomState) {
    let seat = st.current_seat;
    if st.pile.is_empty() {
        let Some(card) = st.players[seat].hand.iter().min().copied() else {
            warn!(room = %st.code, seat, "idle seat has no cards; repairing");
            st.repair_current_seat();
            st.begin_turn();
            return;
        };
        if let Err(err) = st.apply_play(seat, vec![card]) {
            warn!(room = %st.code, seat, %err, "idle lead failed; re-arming");
            st.begin_turn();
        }
    } else if let Err(err) = st.apply_pass(seat) {
        warn!(room = %st.code, seat, %err, "idle pass failed; re-arming");
        st.begin_turn();
    }
}

/// Delayed bot turn. Returns true if the bot acted; stale tokens no-op.
pub fn fire_bot_turn(rooms: &RoomManager, code: &str, token: u64) -> bool {
    let Some(room) = rooms.get(code) else {
        return false;
    };
    let acted = {
        let mut st = room.state.lock();
        if st.status != RoomStatus::Playing || st.turn_token != token {
            false
        } else {
            let seat = st.current_seat;
            let (hand, difficulty, is_bot) = {
                let p = &st.players[seat];
                (p.hand.clone(), p.difficulty, p.is_bot)
            };
            if !is_bot {
                false
            } else {
                let prev = st.pile.last().map(|p| p.combo);
                let opener = st.opener;
                let choice = opener.and_then(|opener| {
                    bot::decide(&hand, prev.as_ref(), st.first_play, opener, difficulty)
                });
                let result = match choice {
                    Some(cards) => st.apply_play(seat, cards).map(|_| ()),
                    None => st.apply_pass(seat),
                };
                if let Err(err) = result {
                    warn!(room = %code, seat, %err, "bot move rejected; passing");
                    let _ = st.apply_pass(seat);
                }
                true
            }
        }
    };
    if acted {
        post_mutation(rooms, code);
    }
    acted
}

/// Grace-period expiry. Removes the seat only if the player is still
/// offline under the same token it was armed with.
pub fn fire_grace_timer(rooms: &RoomManager, code: &str, player_id: &str, token: u64) -> bool {
    let Some(room) = rooms.get(code) else {
        return false;
    };
    let mut delete_room = false;
    let acted = {
        let mut st = room.state.lock();
        let Some(seat) = st.seat_of(player_id) else {
            return false;
        };
        let player = &st.players[seat];
        if !player.is_offline || player.offline_token != token {
            false
        } else {
            info!(room = %code, player = %player_id, "grace period expired; removing seat");
            st.remove_seat(seat);
            delete_room = st.humans() == 0;
            true
        }
    };
    if delete_room {
        info!(room = %code, "room empty of humans; deleting");
        rooms.remove(code);
        return true;
    }
    if acted {
        post_mutation(rooms, code);
    }
    acted
}
