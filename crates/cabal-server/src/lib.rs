pub mod api;
pub mod config;
pub mod error;
pub mod health;
pub mod state;

use std::time::Duration;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::ServerConfig;
use state::AppState;

/// Build the Axum router and application state from a config.
pub fn build_app(config: ServerConfig) -> (Router<()>, AppState) {
    let state = AppState::new(config);
    (router(state.clone()), state)
}

/// Build the router around an existing state.
pub fn router(state: AppState) -> Router<()> {
    let api_routes = Router::new()
        .route("/rooms", post(api::create_room))
        .route("/rooms/join", post(api::join_room))
        .route("/rooms/{code}", get(api::get_game_state))
        .route("/rooms/{code}/start", post(api::start_game))
        .route("/rooms/{code}/team", post(api::select_team))
        .route("/rooms/{code}/team-vote", post(api::vote_team))
        .route("/rooms/{code}/vote", post(api::vote_quest))
        .route("/rooms/{code}/guess-seer", post(api::guess_seer))
        .route("/rooms/{code}/chat", post(api::send_chat))
        .route("/rooms/{code}/kick", post(api::kick_player))
        .route("/rooms/{code}/leave", post(api::leave_room));

    let mut app = Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = cors_layer(&state.config.cors_origins) {
        app = app.layer(cors);
    }

    app.with_state(state)
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter(|o| o.as_str() != "*")
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            },
        })
        .collect();
    if allowed.is_empty() {
        return None;
    }
    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any),
    )
}

/// Background task that removes rooms idle for longer than
/// `rooms.idle_timeout_secs`.
pub fn spawn_idle_room_reaper(state: AppState) -> tokio::task::JoinHandle<()> {
    let max_idle = Duration::from_secs(state.config.rooms.idle_timeout_secs);
    let period = Duration::from_secs(state.config.rooms.idle_check_interval_secs);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = state.rooms.write().await.cleanup_idle_rooms(max_idle);
            if removed > 0 {
                tracing::info!(removed, "Cleaned up idle rooms");
            }
        }
    })
}
