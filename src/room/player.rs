//! Seated players, human and bot.

use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::game::bot::Difficulty;
use crate::game::card::Card;
use crate::protocol::ServerMessage;

#[derive(Debug)]
pub struct Player {
    /// Client-supplied persistent token, stable across reconnects within one
    /// match. This is NOT the websocket identity.
    pub id: String,
    pub name: String,
    pub avatar: String,
    pub hand: Vec<Card>,
    pub is_host: bool,
    pub has_passed: bool,
    pub finished_rank: Option<u8>,
    pub is_bot: bool,
    pub difficulty: Difficulty,
    pub is_offline: bool,
    /// Bumped on every disconnect; a grace timer only evicts the seat if the
    /// token it captured is still current.
    pub offline_token: u64,
    /// The websocket currently bound to this seat, if any.
    pub conn_id: Option<Uuid>,
    pub tx: Option<UnboundedSender<ServerMessage>>,
}

impl Player {
    pub fn human(
        id: String,
        name: String,
        avatar: String,
        conn_id: Uuid,
        tx: UnboundedSender<ServerMessage>,
    ) -> Self {
        Self {
            id,
            name,
            avatar,
            hand: Vec::new(),
            is_host: false,
            has_passed: false,
            finished_rank: None,
            is_bot: false,
            difficulty: Difficulty::default(),
            is_offline: false,
            offline_token: 0,
            conn_id: Some(conn_id),
            tx: Some(tx),
        }
    }

    pub fn bot(id: String, name: String) -> Self {
        Self {
            id,
            name,
            avatar: "bot".to_string(),
            hand: Vec::new(),
            is_host: false,
            has_passed: false,
            finished_rank: None,
            is_bot: true,
            difficulty: Difficulty::default(),
            is_offline: false,
            offline_token: 0,
            conn_id: None,
            tx: None,
        }
    }

    /// Still competing for a finishing rank.
    pub fn is_active(&self) -> bool {
        self.finished_rank.is_none()
    }

    pub fn send(&self, msg: &ServerMessage) {
        if let Some(tx) = &self.tx {
            // Ignore failure: the reader side may have just disconnected.
            let _ = tx.send(msg.clone());
        }
    }
}

const BOT_ADJECTIVES: &[&str] = &[
    "Sly", "Quiet", "Grinning", "Patient", "Hasty", "Stubborn", "Gentle", "Crafty", "Sleepy",
    "Daring",
];

const BOT_NOUNS: &[&str] = &[
    "Heron", "Badger", "Mantis", "Lynx", "Magpie", "Turtle", "Gecko", "Weasel", "Crane", "Mole",
];

/// Deterministic friendly name for a bot seat.
pub fn bot_name(seed: u64) -> String {
    let adjective = BOT_ADJECTIVES[(seed as usize) % BOT_ADJECTIVES.len()];
    let noun = BOT_NOUNS[(seed.rotate_left(13) as usize) % BOT_NOUNS.len()];
    format!("{} {}", adjective, noun)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bots_have_no_connection() {
        let bot = Player::bot("bot-1".into(), bot_name(1));
        assert!(bot.is_bot);
        assert!(bot.tx.is_none());
        assert!(bot.conn_id.is_none());
        assert!(bot.is_active());
    }

    #[test]
    fn bot_names_are_deterministic() {
        assert_eq!(bot_name(5), bot_name(5));
    }
}
