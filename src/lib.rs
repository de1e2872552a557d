pub mod config;
pub mod game;
pub mod http;
pub mod protocol;
pub mod room;
pub mod settlement;
pub mod telemetry;
pub mod util;
pub mod ws;
