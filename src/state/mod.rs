mod flow;
mod room;

pub use room::{Room, RoomError, RoomRoster};

use crate::config::ServerConfig;
use crate::prompts::{PromptDeck, PromptProvider};
use crate::protocol::ServerMessage;
use crate::similarity::{EditDistanceSimilarity, SimilarityProvider};
use crate::types::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};

/// Room and seat a connection is bound to
#[derive(Debug, Clone)]
pub struct Session {
    pub room: RoomName,
    pub player_id: PlayerId,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub rooms: Arc<RwLock<HashMap<RoomName, Arc<Mutex<Room>>>>>,
    pub connections: Arc<RwLock<HashMap<ConnectionId, Session>>>,
    /// Room receivers opened at join time, until the connection picks them up
    pending_subscriptions: Arc<Mutex<HashMap<ConnectionId, broadcast::Receiver<ServerMessage>>>>,
    pub prompts: Arc<dyn PromptProvider>,
    pub similarity: Arc<dyn SimilarityProvider>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default(), Arc::new(PromptDeck::standard()))
    }

    pub fn with_config(config: ServerConfig, prompts: Arc<dyn PromptProvider>) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            connections: Arc::new(RwLock::new(HashMap::new())),
            pending_subscriptions: Arc::new(Mutex::new(HashMap::new())),
            prompts,
            similarity: Arc::new(EditDistanceSimilarity),
            config: Arc::new(config),
        }
    }

    pub fn with_similarity(mut self, similarity: Arc<dyn SimilarityProvider>) -> Self {
        self.similarity = similarity;
        self
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
