//! Wire protocol: the discrete named events exchanged with clients.

use serde::{Deserialize, Serialize};

use crate::game::bot::Difficulty;
use crate::game::combo::ComboType;
use crate::room::state::RoomStatus;
use crate::settlement::Reward;

fn default_public() -> bool {
    true
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    CreateRoom {
        player_id: String,
        name: String,
        #[serde(default)]
        avatar: String,
        #[serde(default = "default_public")]
        public: bool,
        #[serde(default)]
        room_name: Option<String>,
        #[serde(default)]
        turn_duration_ms: Option<u64>,
    },
    JoinRoom {
        room_id: String,
        player_id: String,
        name: String,
        #[serde(default)]
        avatar: String,
    },
    AddBot {
        room_id: String,
    },
    RemoveBot {
        room_id: String,
        bot_id: String,
    },
    SetBotDifficulty {
        room_id: String,
        bot_id: String,
        difficulty: Difficulty,
    },
    StartMatch {
        room_id: String,
    },
    Play {
        room_id: String,
        cards: Vec<String>,
    },
    Pass {
        room_id: String,
    },
    ListRooms,
    RequestResync,
    Reconnect {
        room_id: String,
        player_id: String,
    },
    Emote {
        room_id: String,
        emote: String,
    },
    Ping,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        connection_id: String,
    },
    RoomCreated {
        room_id: String,
    },
    RoomState {
        snapshot: RoomSnapshot,
    },
    /// Private: only ever sent to the owning player.
    HandSnapshot {
        room_id: String,
        cards: Vec<String>,
    },
    RoomsList {
        rooms: Vec<RoomSummary>,
    },
    MatchFinished {
        room_id: String,
        standings: Vec<Standing>,
    },
    EmoteEvent {
        room_id: String,
        player_id: String,
        emote: String,
    },
    /// The client's saved session no longer maps to live state and should
    /// be discarded.
    SessionExpired,
    Error {
        message: String,
    },
    Pong,
}

/// Public view of one seat. Hands travel as counts only.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PublicPlayer {
    pub id: String,
    pub name: String,
    pub avatar: String,
    pub hand_count: usize,
    pub is_host: bool,
    pub has_passed: bool,
    pub finished_rank: Option<u8>,
    pub is_bot: bool,
    pub difficulty: Difficulty,
    pub is_offline: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayView {
    pub player_id: String,
    pub cards: Vec<String>,
    pub combo: ComboType,
}

/// One consistent snapshot, broadcast to every member on every accepted
/// mutation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub room_id: String,
    pub name: String,
    pub status: RoomStatus,
    pub players: Vec<PublicPlayer>,
    pub current_player_id: Option<String>,
    pub pile: Vec<PlayView>,
    pub round_history: Vec<Vec<PlayView>>,
    pub last_to_play: Option<String>,
    pub finished_order: Vec<String>,
    pub first_play: bool,
    /// Card code the first play of the match must include.
    pub opener: Option<String>,
    pub turn_deadline_ms: Option<u64>,
    pub turn_duration_ms: u64,
}

/// Discovery listing entry for public rooms.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoomSummary {
    pub room_id: String,
    pub name: String,
    pub players: usize,
    pub capacity: usize,
    pub host: Option<String>,
    pub started: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Standing {
    pub player_id: String,
    pub name: String,
    pub rank: u8,
    pub reward: Reward,
}
