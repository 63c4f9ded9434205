//! In-game handlers
//!
//! Each handler takes the room lock for the whole action, so actions of one
//! room apply strictly one at a time.

use crate::game::{DisputeAction, GameError};
use crate::protocol::ServerMessage;
use crate::state::AppState;
use crate::types::Stage;
use std::sync::Arc;

/// Unwrap the room's running game or answer `badRequest`
macro_rules! game_or_error {
    ($room:expr) => {
        match $room.game.as_mut() {
            Some(game) => game,
            None => return Some(GameError::BadRequest.into()),
        }
    };
}

pub async fn handle_submit_response(state: &Arc<AppState>, conn: &str, text: String) -> Option<ServerMessage> {
    let (handle, player_id) = in_room!(state, conn);
    let mut guard = handle.lock().await;
    let game = game_or_error!(guard);

    match game.submit_response(&player_id, &text) {
        Ok(response) => {
            tracing::info!("{} submitted '{}'", player_id, response);
            Some(ServerMessage::ResponseAccepted { response })
        }
        Err(e) => Some(e.into()),
    }
}

pub async fn handle_vote_skip(state: &Arc<AppState>, conn: &str, vote: bool) -> Option<ServerMessage> {
    let (handle, player_id) = in_room!(state, conn);
    let mut guard = handle.lock().await;
    let room = &mut *guard;
    let game = game_or_error!(room);

    let tally = match game.vote_skip(&player_id, vote, &room.roster) {
        Ok(tally) => tally,
        Err(e) => return Some(e.into()),
    };
    tracing::info!("{} voted skip={} ({} votes)", player_id, vote, tally.count);

    room.broadcast(ServerMessage::SkipTally {
        count: tally.count,
        skip: tally.skip,
    });
    if tally.skip {
        tracing::info!("Room {}: majority voted to skip the prompt", room.name);
        state.begin_prompt(room).await;
    }
    None
}

pub async fn handle_choose_action_type(state: &Arc<AppState>, conn: &str, strike: bool) -> Option<ServerMessage> {
    let (handle, player_id) = in_room!(state, conn);
    let mut guard = handle.lock().await;
    let game = game_or_error!(guard);

    match game.choose_action_type(&player_id, strike) {
        Ok(selection_type) => {
            guard.broadcast(ServerMessage::ActionTypeChosen { selection_type });
            None
        }
        Err(e) => Some(e.into()),
    }
}

pub async fn handle_select_response(
    state: &Arc<AppState>,
    conn: &str,
    response: String,
) -> Option<ServerMessage> {
    let (handle, player_id) = in_room!(state, conn);
    let mut guard = handle.lock().await;
    let room = &mut *guard;
    let game = game_or_error!(room);

    let stage = match game.select_response(&player_id, &response, &room.roster) {
        Ok(stage) => stage,
        Err(e) => return Some(e.into()),
    };

    let matching = (stage == Stage::ResponseMatching).then(|| ServerMessage::matching_state(game));
    room.broadcast(ServerMessage::ResponseSelected {
        selector: player_id,
        response,
        stage,
    });
    if let Some(msg) = matching {
        room.broadcast(msg);
    }
    None
}

pub async fn handle_vote_dispute(state: &Arc<AppState>, conn: &str, approve: bool) -> Option<ServerMessage> {
    let (handle, player_id) = in_room!(state, conn);
    let mut guard = handle.lock().await;
    let room = &mut *guard;
    let game = game_or_error!(room);

    match game.vote_dispute(&player_id, approve, &room.roster) {
        Ok(DisputeAction::NoOp) => {
            tracing::info!("{} voted {} on the sike", player_id, if approve { "up" } else { "down" });
            None
        }
        Ok(action) => {
            state.settle_dispute(room, action).await;
            None
        }
        Err(e) => Some(e.into()),
    }
}

pub async fn handle_confirm_match(
    state: &Arc<AppState>,
    conn: &str,
    response: Option<String>,
) -> Option<ServerMessage> {
    let (handle, player_id) = in_room!(state, conn);
    let mut guard = handle.lock().await;
    let room = &mut *guard;
    let game = game_or_error!(room);

    match game.confirm_match(&player_id, response.as_deref(), &room.roster) {
        Ok(judgement) => {
            if judgement.selector_scored {
                tracing::info!("Selector scores from {}'s judgment", player_id);
            }
            let progress = ServerMessage::matching_state(game);
            room.broadcast(progress);
            None
        }
        Err(e) => Some(e.into()),
    }
}
