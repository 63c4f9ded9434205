//! Room handlers: creating, joining and configuring rooms

use crate::protocol::ServerMessage;
use crate::state::AppState;
use crate::types::GameOptions;
use std::sync::Arc;

pub async fn handle_create_room(
    state: &Arc<AppState>,
    conn: &str,
    name: String,
    room: String,
    lang: Option<String>,
) -> Option<ServerMessage> {
    tracing::info!("Create room request: {} by {}", room, name);
    match state.create_room(conn, &name, &room, lang.as_deref()).await {
        Ok(joined) => Some(joined),
        Err(e) => {
            tracing::info!("Create room {} failed: {}", room, e);
            Some(e.into())
        }
    }
}

pub async fn handle_join_room(
    state: &Arc<AppState>,
    conn: &str,
    name: String,
    room: String,
) -> Option<ServerMessage> {
    tracing::info!("Join room request: {} by {}", room, name);
    match state.join_room(conn, &name, &room).await {
        Ok(joined) => Some(joined),
        Err(e) => {
            tracing::info!("Join room {} failed: {}", room, e);
            Some(e.into())
        }
    }
}

pub async fn handle_set_options(
    state: &Arc<AppState>,
    conn: &str,
    options: GameOptions,
) -> Option<ServerMessage> {
    state.set_options(conn, options).await.err().map(Into::into)
}

pub async fn handle_start_game(state: &Arc<AppState>, conn: &str) -> Option<ServerMessage> {
    state.start_game(conn).await.err().map(Into::into)
}
