use axum::http::{header, Method};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use thirteen_backend::http::routes::{self, AppState};
use thirteen_backend::room::manager::RoomManager;
use thirteen_backend::{config, telemetry, ws};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();

    let state = AppState {
        rooms: RoomManager::new(),
    };

    let app = Router::new()
        .route("/healthz", get(routes::healthz))
        .route("/api/rooms", get(routes::list_rooms))
        .route("/ws", get(ws::connection::ws_handler))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE])
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config::server_addr();
    info!("listening on http://{}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
