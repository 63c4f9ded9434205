//! Per-room round state machine
//!
//! A [`GameState`] drives one game from prompt collection through selector
//! rotation, sike disputes and response matching. Player actions come in
//! through the action methods, which validate before mutating; stage
//! boundaries are crossed by explicit transition methods the dispatcher calls.
//! Follow-on work triggered by disconnects is published as [`GameEvent`]s.

mod collection;
mod dispute;
mod matching;
mod recovery;
mod rotation;
mod selection;
mod snapshot;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::similarity::{EditDistanceSimilarity, SimilarityProvider};
use crate::types::*;

pub use collection::SkipTally;
pub use dispute::DisputeAction;
pub use matching::MatchJudgement;
pub use snapshot::{MatchStatus, RoundSnapshot};

/// Errors returned by player actions. None of them mutate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("Response is empty")]
    EmptyResponse,

    #[error("Response was already submitted")]
    DuplicateResponse,

    #[error("Action not allowed right now")]
    BadRequest,

    #[error("Not a player in this game")]
    Spectator,

    #[error("Already handled")]
    DuplicateRequest,
}

impl GameError {
    /// Stable wire code
    pub fn code(&self) -> &'static str {
        match self {
            GameError::EmptyResponse => "emptyResponse",
            GameError::DuplicateResponse => "duplicateResponse",
            GameError::BadRequest => "badRequest",
            GameError::Spectator => "spectator",
            GameError::DuplicateRequest => "duplicateRequest",
        }
    }
}

pub type GameResult<T> = Result<T, GameError>;

/// Activity lookup owned by the session layer
pub trait Roster {
    fn is_active(&self, id: &str) -> bool;
}

/// Events the dispatcher has to act on, mostly caused by disconnects.
///
/// `generation` is the state's generation at emission; a dispatcher must
/// ignore events whose generation no longer matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GameEvent {
    PromptSkipped { generation: u64 },
    SelectionUnsuccessful { generation: u64 },
    DisputeComplete { generation: u64, action: DisputeAction },
    MatchingComplete { generation: u64, selector_active: bool },
}

impl GameEvent {
    pub fn generation(&self) -> u64 {
        match self {
            GameEvent::PromptSkipped { generation }
            | GameEvent::SelectionUnsuccessful { generation }
            | GameEvent::DisputeComplete { generation, .. }
            | GameEvent::MatchingComplete { generation, .. } => *generation,
        }
    }
}

pub struct GameState {
    id: String,
    pub options: GameOptions,
    pub locale: String,
    stage: Stage,
    round: u32,
    prompt: String,
    players: Vec<PlayerRoundState>,
    index: HashMap<PlayerId, usize>,
    initial_selector: usize,
    selector: usize,
    selection_type: SelectionType,
    selection_type_choice: bool,
    remaining_sike_retries: u32,
    used_prompts: HashSet<PromptId>,
    generation: u64,
    rng: StdRng,
    similarity: Arc<dyn SimilarityProvider>,
    events: broadcast::Sender<GameEvent>,
}

impl GameState {
    /// Create a game for a fixed, ordered list of players
    pub fn new(player_ids: &[PlayerId], options: GameOptions, locale: &str) -> Self {
        let (events, _rx) = broadcast::channel(32);
        let players: Vec<PlayerRoundState> = player_ids
            .iter()
            .map(|id| PlayerRoundState::new(id.clone()))
            .collect();
        let index = players
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.clone(), i))
            .collect();
        let remaining_sike_retries = options.sike_retries;

        Self {
            id: ulid::Ulid::new().to_string(),
            options,
            locale: locale.to_string(),
            stage: Stage::Lobby,
            round: 0,
            prompt: String::new(),
            players,
            index,
            initial_selector: 0,
            selector: 0,
            selection_type: SelectionType::Strike,
            selection_type_choice: false,
            remaining_sike_retries,
            used_prompts: HashSet::new(),
            generation: 0,
            rng: StdRng::from_os_rng(),
            similarity: Arc::new(EditDistanceSimilarity),
            events,
        }
    }

    /// Use a specific random source for selection type draws
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_similarity(mut self, similarity: Arc<dyn SimilarityProvider>) -> Self {
        self.similarity = similarity;
        self
    }

    /// Subscribe to events published by this game
    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }

    /// Unique per game, so timers and listeners can tell games in one room apart
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn players(&self) -> &[PlayerRoundState] {
        &self.players
    }

    pub fn player(&self, id: &str) -> Option<&PlayerRoundState> {
        self.index.get(id).map(|&i| &self.players[i])
    }

    pub fn selection_type(&self) -> SelectionType {
        self.selection_type
    }

    /// Whether the selector was (or still is) asked to pick strike or sike
    pub fn selection_type_choice(&self) -> bool {
        self.selection_type_choice
    }

    pub fn remaining_sike_retries(&self) -> u32 {
        self.remaining_sike_retries
    }

    pub fn initial_selector_index(&self) -> usize {
        self.initial_selector
    }

    pub fn selector_index(&self) -> usize {
        self.selector
    }

    pub fn selector_id(&self) -> Option<&PlayerId> {
        self.players.get(self.selector).map(|p| &p.id)
    }

    pub fn is_selector(&self, id: &str) -> bool {
        self.selector_id().is_some_and(|s| s == id)
    }

    /// The response currently being judged
    pub fn selected_response(&self) -> Option<&str> {
        self.players
            .get(self.selector)
            .and_then(|p| p.selected.as_deref())
    }

    /// End the game and rank players by points; ties keep seating order
    pub fn game_over(&mut self) -> Vec<ScoreEntry> {
        self.stage = Stage::Lobby;
        self.generation += 1;

        let mut scores: Vec<ScoreEntry> = self
            .players
            .iter()
            .map(|p| ScoreEntry {
                id: p.id.clone(),
                score: p.points,
            })
            .collect();
        scores.sort_by(|a, b| b.score.cmp(&a.score));

        tracing::info!("Game over after {} rounds", self.round);
        scores
    }

    /// Current scores in seating order
    pub fn scores(&self) -> Vec<ScoreEntry> {
        self.players
            .iter()
            .map(|p| ScoreEntry {
                id: p.id.clone(),
                score: p.points,
            })
            .collect()
    }

    fn player_index(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Active players other than `excluded`
    fn num_voters(&self, roster: &impl Roster, excluded: Option<&str>) -> usize {
        self.players
            .iter()
            .filter(|p| excluded != Some(p.id.as_str()) && roster.is_active(&p.id))
            .count()
    }

    fn emit(&self, event: GameEvent) {
        tracing::debug!("Game event: {:?}", event);
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::collections::HashSet;

    /// Roster where every listed player is active until deactivated
    #[derive(Debug, Default)]
    pub struct TestRoster {
        pub inactive: HashSet<String>,
    }

    impl TestRoster {
        pub fn deactivate(&mut self, id: &str) {
            self.inactive.insert(id.to_string());
        }
    }

    impl Roster for TestRoster {
        fn is_active(&self, id: &str) -> bool {
            !self.inactive.contains(id)
        }
    }

    pub fn ids(names: &[&str]) -> Vec<PlayerId> {
        names.iter().map(|n| n.to_string()).collect()
    }

    pub fn game(names: &[&str], options: GameOptions) -> GameState {
        GameState::new(&ids(names), options, "en").with_rng(StdRng::seed_from_u64(7))
    }

    /// Put a game straight into response collection without a prompt provider
    pub fn collecting(names: &[&str], options: GameOptions) -> GameState {
        let mut game = game(names, options);
        game.stage = Stage::ResponseCollection;
        game.prompt = "Test prompt".to_string();
        game
    }

    pub fn give(game: &mut GameState, id: &str, responses: &[&str]) {
        let i = game.player_index(id).unwrap();
        game.players[i]
            .responses
            .extend(responses.iter().map(|r| r.to_string()));
    }

    pub fn set_used(game: &mut GameState, id: &str, used: &[&str]) {
        let i = game.player_index(id).unwrap();
        game.players[i].used = used.iter().map(|r| r.to_string()).collect();
    }

    pub fn force_type(game: &mut GameState, selection_type: SelectionType) {
        game.selection_type = selection_type;
        game.selection_type_choice = selection_type == SelectionType::Choice;
    }

    pub fn assert_used_subset(game: &GameState) {
        for p in game.players() {
            for u in &p.used {
                assert!(p.responses.contains(u), "{} used {:?} not in responses", p.id, u);
            }
        }
    }
}
