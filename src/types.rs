use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type PlayerId = String;
pub type ConnectionId = String;
pub type RoomName = String;
pub type PromptId = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Lobby,
    ResponseCollection,
    ResponseSelection,
    SikeDispute,
    ResponseMatching,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SelectionType {
    Strike,
    Sike,
    /// Selector still has to pick strike or sike
    Choice,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SikeVote {
    #[default]
    Unset,
    Up,
    Down,
}

/// Per-room options, set by the leader before a game starts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameOptions {
    /// Seconds players get to write responses
    pub prompt_timer: u32,
    pub num_rounds: u32,
    /// Whether other players may contest a sike
    pub sike_dispute: bool,
    /// How many times a contested sike may be re-selected
    pub sike_retries: u32,
    pub prompt_skipping: bool,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            prompt_timer: 30,
            num_rounds: 8,
            sike_dispute: false,
            sike_retries: 0,
            prompt_skipping: false,
        }
    }
}

impl GameOptions {
    pub fn validate(&self) -> Result<(), String> {
        if self.prompt_timer == 0 {
            return Err("prompt_timer must be at least 1 second".to_string());
        }
        if self.num_rounds == 0 {
            return Err("num_rounds must be at least 1".to_string());
        }
        Ok(())
    }
}

/// A player's progress through the current round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerRoundState {
    pub id: PlayerId,
    /// Responses in submission order
    pub responses: Vec<String>,
    /// Responses already consumed by a selection (always a subset of `responses`)
    pub used: Vec<String>,
    pub selected: Option<String>,
    pub sike_vote: SikeVote,
    pub matched: Option<String>,
    pub matching_complete: bool,
    pub vote_skip_prompt: bool,
    pub points: u32,
}

impl PlayerRoundState {
    pub fn new(id: PlayerId) -> Self {
        Self {
            id,
            responses: Vec::new(),
            used: Vec::new(),
            selected: None,
            sike_vote: SikeVote::Unset,
            matched: None,
            matching_complete: false,
            vote_skip_prompt: false,
            points: 0,
        }
    }

    /// True while at least one response has not been consumed
    pub fn has_unused(&self) -> bool {
        self.responses.len() > self.used.len()
    }

    pub fn unused_responses(&self) -> impl Iterator<Item = &String> {
        self.responses.iter().filter(|r| !self.used.contains(r))
    }

    pub fn is_unused(&self, response: &str) -> bool {
        self.responses.iter().any(|r| r == response) && !self.used.iter().any(|r| r == response)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreEntry {
    pub id: PlayerId,
    pub score: u32,
}

/// A seat in a room, owned by the session layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomPlayer {
    pub id: PlayerId,
    pub name: String,
    pub leader: bool,
    pub active: bool,
}
