//! Registry of live rooms.
//!
//! Owns create/lookup/delete; timer tasks re-resolve rooms through here so
//! teardown deterministically wins races against late firings.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::game::deck;
use crate::protocol::RoomSummary;
use crate::room::state::RoomState;
use crate::util::id::room_code;

pub struct Room {
    pub state: Mutex<RoomState>,
}

#[derive(Clone, Default)]
pub struct RoomManager {
    rooms: Arc<DashMap<String, Arc<Room>>>,
}

impl RoomManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a room under a fresh code.
    pub fn create(&self, name: String, is_public: bool, turn_duration_ms: u64) -> (String, Arc<Room>) {
        loop {
            let code = room_code();
            match self.rooms.entry(code.clone()) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(slot) => {
                    let room = Arc::new(Room {
                        state: Mutex::new(RoomState::new(
                            code.clone(),
                            name.clone(),
                            is_public,
                            turn_duration_ms,
                        )),
                    });
                    slot.insert(room.clone());
                    return (code, room);
                }
            }
        }
    }

    pub fn get(&self, code: &str) -> Option<Arc<Room>> {
        self.rooms.get(code).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, code: &str) {
        self.rooms.remove(code);
    }

    /// The room currently seating `player_id`, if any.
    pub fn find_player(&self, player_id: &str) -> Option<(String, Arc<Room>)> {
        self.rooms.iter().find_map(|entry| {
            let seated = entry.value().state.lock().seat_of(player_id).is_some();
            seated.then(|| (entry.key().clone(), entry.value().clone()))
        })
    }

    /// Discovery listing: public rooms only.
    pub fn summaries(&self) -> Vec<RoomSummary> {
        let mut rooms: Vec<RoomSummary> = self
            .rooms
            .iter()
            .filter_map(|entry| {
                let st = entry.value().state.lock();
                if !st.is_public {
                    return None;
                }
                Some(RoomSummary {
                    room_id: st.code.clone(),
                    name: st.name.clone(),
                    players: st.players.len(),
                    capacity: deck::MAX_SEATS,
                    host: st
                        .players
                        .iter()
                        .find(|p| p.is_host)
                        .map(|p| p.name.clone()),
                    started: st.status != crate::room::state::RoomStatus::Lobby,
                })
            })
            .collect();
        rooms.sort_by(|a, b| a.room_id.cmp(&b.room_id));
        rooms
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
