use crate::game::{DisputeAction, GameError, GameState};
pub use crate::game::{MatchStatus, RoundSnapshot};
use crate::state::RoomError;
use crate::types::*;
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    CreateRoom {
        name: String,
        room: String,
        #[serde(default)]
        lang: Option<String>,
    },
    JoinRoom {
        name: String,
        room: String,
    },
    // Leader-only messages
    SetOptions {
        options: GameOptions,
    },
    StartGame,
    // In-game messages
    SubmitResponse {
        text: String,
    },
    VoteSkip {
        vote: bool,
    },
    ChooseActionType {
        strike: bool,
    },
    SelectResponse {
        response: String,
    },
    VoteDispute {
        approve: bool,
    },
    /// `response` is the player's own matching response; omit it for no match
    ConfirmMatch {
        #[serde(default)]
        response: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        connection_id: ConnectionId,
        server_now: String,
    },
    RoomJoined {
        room: RoomName,
        player_id: PlayerId,
        lang: String,
        players: Vec<RoomPlayer>,
        options: GameOptions,
        /// Present when joining a game already in progress
        #[serde(default, skip_serializing_if = "Option::is_none")]
        game: Option<RoundSnapshot>,
    },
    RoomUpdate {
        players: Vec<RoomPlayer>,
    },
    OptionsUpdated {
        options: GameOptions,
    },
    ResponseAccepted {
        response: String,
    },
    SkipTally {
        count: usize,
        skip: bool,
    },
    BeginPrompt {
        prompt: String,
        timer: u32,
        /// Round this prompt will count as once selection begins
        round: u32,
        deadline: String,
    },
    NextSelection {
        selector: PlayerId,
        selection_type: SelectionType,
        round: u32,
    },
    ActionTypeChosen {
        selection_type: SelectionType,
    },
    ResponseSelected {
        selector: PlayerId,
        response: String,
        stage: Stage,
    },
    DisputeUpdate {
        action: DisputeAction,
    },
    MatchingState {
        response: String,
        players: Vec<MatchStatus>,
    },
    MatchingComplete {
        scores: Vec<ScoreEntry>,
    },
    GameOver {
        scores: Vec<ScoreEntry>,
    },
    Error {
        code: String,
        msg: String,
    },
}

impl ServerMessage {
    /// Snapshot of response matching for everyone but the selector
    pub fn matching_state(game: &GameState) -> Self {
        ServerMessage::MatchingState {
            response: game.selected_response().unwrap_or_default().to_string(),
            players: game.match_statuses(),
        }
    }
}

impl From<GameError> for ServerMessage {
    fn from(e: GameError) -> Self {
        ServerMessage::Error {
            code: e.code().to_string(),
            msg: e.to_string(),
        }
    }
}

impl From<RoomError> for ServerMessage {
    fn from(e: RoomError) -> Self {
        ServerMessage::Error {
            code: e.code().to_string(),
            msg: e.to_string(),
        }
    }
}
