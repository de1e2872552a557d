//! HTTP sidecar: health probe and public-room discovery.

use axum::extract::State;
use axum::Json;

use crate::protocol::RoomSummary;
use crate::room::manager::RoomManager;

#[derive(Clone)]
pub struct AppState {
    pub rooms: RoomManager,
}

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn list_rooms(State(state): State<AppState>) -> Json<Vec<RoomSummary>> {
    Json(state.rooms.summaries())
}
