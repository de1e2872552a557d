//! Configuration from the environment, with sane defaults.

use std::env;
use std::net::{Ipv4Addr, SocketAddr};

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Socket address to bind the server to. Reads `PORT`, defaults to 8080,
/// binds to 0.0.0.0.
pub fn server_addr() -> SocketAddr {
    let port = env_u64("PORT", 8080) as u16;
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))
}

/// Turn length applied when a room is created without one. 0 disables the
/// turn timer entirely.
pub fn default_turn_ms() -> u64 {
    env_u64("TURN_DURATION_MS", 30_000)
}

/// How long a disconnected human's seat is held open for reconnection.
pub fn grace_period_ms() -> u64 {
    env_u64("GRACE_PERIOD_MS", 30_000)
}

/// Artificial delay before a bot seat acts, so bot rounds stay watchable.
pub fn bot_delay_ms() -> u64 {
    env_u64("BOT_DELAY_MS", 900)
}
