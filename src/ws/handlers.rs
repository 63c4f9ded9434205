//! WebSocket message dispatch
//!
//! Entry point for client messages. Room management goes to the lobby
//! handlers, everything played inside a running game to the player handlers.
//! Direct replies are returned; room-wide updates go out on the room broadcast.

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use std::sync::Arc;

use super::{lobby, player};

/// Handle client messages and return optional response
pub async fn handle_message(msg: ClientMessage, conn: &str, state: &Arc<AppState>) -> Option<ServerMessage> {
    match msg {
        // Room messages
        ClientMessage::CreateRoom { name, room, lang } => {
            lobby::handle_create_room(state, conn, name, room, lang).await
        }

        ClientMessage::JoinRoom { name, room } => lobby::handle_join_room(state, conn, name, room).await,

        ClientMessage::SetOptions { options } => lobby::handle_set_options(state, conn, options).await,

        ClientMessage::StartGame => lobby::handle_start_game(state, conn).await,

        // Game messages
        ClientMessage::SubmitResponse { text } => player::handle_submit_response(state, conn, text).await,

        ClientMessage::VoteSkip { vote } => player::handle_vote_skip(state, conn, vote).await,

        ClientMessage::ChooseActionType { strike } => {
            player::handle_choose_action_type(state, conn, strike).await
        }

        ClientMessage::SelectResponse { response } => {
            player::handle_select_response(state, conn, response).await
        }

        ClientMessage::VoteDispute { approve } => player::handle_vote_dispute(state, conn, approve).await,

        ClientMessage::ConfirmMatch { response } => {
            player::handle_confirm_match(state, conn, response).await
        }
    }
}
