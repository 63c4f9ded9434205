//! Game flow between player actions
//!
//! Prompt timers, rotation and game-over are driven from here. Every entry
//! point expects the room lock to be held by the caller.

use super::{AppState, Room, RoomError};
use crate::broadcast;
use crate::game::{DisputeAction, GameEvent, GameState};
use crate::protocol::ServerMessage;

impl AppState {
    /// Start a new game with everyone currently seated (leader only)
    pub async fn start_game(&self, conn: &str) -> Result<(), RoomError> {
        let (handle, player_id) = self.session(conn).await?;
        let mut room = handle.lock().await;
        if !room.roster.is_leader(&player_id) {
            return Err(RoomError::NotLeader);
        }
        if room.is_playing() {
            return Err(RoomError::GameInProgress);
        }

        let game = GameState::new(&room.roster.ids(), room.options.clone(), &room.lang)
            .with_similarity(self.similarity.clone());
        broadcast::spawn_game_event_listener(
            self.clone(),
            room.handle(),
            game.id().to_string(),
            game.subscribe(),
        );
        room.game = Some(game);

        tracing::info!(
            "Room {} starting game with {} players",
            room.name,
            room.roster.players().len()
        );
        self.begin_prompt(&mut room).await;
        Ok(())
    }

    /// Draw the next prompt and start the response timer, or end the game
    pub(crate) async fn begin_prompt(&self, room: &mut Room) {
        let Some(game) = room.game.as_mut() else {
            return;
        };
        if !game.begin_new_prompt(self.prompts.as_ref()).await {
            self.end_game(room);
            return;
        }

        let timer = game.options.prompt_timer;
        let deadline = chrono::Utc::now() + chrono::Duration::seconds(i64::from(timer));
        let msg = ServerMessage::BeginPrompt {
            prompt: game.prompt().to_string(),
            timer,
            round: game.round() + 1,
            deadline: deadline.to_rfc3339(),
        };
        let game_id = game.id().to_string();
        let generation = game.generation();

        room.broadcast(msg);
        broadcast::spawn_prompt_timer(self.clone(), room.handle(), game_id, generation, timer);
    }

    /// Response collection is over: hand selection to the first selector
    pub(crate) async fn begin_selection(&self, room: &mut Room) {
        let Some(game) = room.game.as_mut() else {
            return;
        };
        if game.begin_selection(&room.roster) {
            announce_selector(room);
        } else {
            self.begin_prompt(room).await;
        }
    }

    /// Move on to the next selector, or to the next prompt once everyone had a turn
    pub(crate) async fn continue_selection(&self, room: &mut Room) {
        let Some(game) = room.game.as_mut() else {
            return;
        };
        if game.next_selection(&room.roster) {
            announce_selector(room);
        } else {
            self.begin_prompt(room).await;
        }
    }

    /// Apply a decided sike dispute
    pub(crate) async fn settle_dispute(&self, room: &mut Room, action: DisputeAction) {
        room.broadcast(ServerMessage::DisputeUpdate { action });
        match action {
            DisputeAction::BeginMatching => {
                if let Some(game) = room.game.as_ref() {
                    room.broadcast(ServerMessage::matching_state(game));
                }
            }
            DisputeAction::ReSelect => announce_selector(room),
            DisputeAction::NextSelection => self.continue_selection(room).await,
            DisputeAction::NoOp => {}
        }
    }

    /// React to an event published by the room's game.
    ///
    /// Events from another game or an earlier generation are dropped: the
    /// transition they ask for already happened some other way.
    pub async fn handle_game_event(&self, room: &mut Room, game_id: &str, event: GameEvent) {
        let Some(game) = room.game.as_ref() else {
            return;
        };
        if game.id() != game_id || game.generation() != event.generation() {
            tracing::debug!(
                "Room {}: dropping stale {:?} (now at generation {})",
                room.name,
                event,
                game.generation()
            );
            return;
        }

        match event {
            GameEvent::PromptSkipped { .. } => {
                tracing::info!("Room {}: prompt skipped", room.name);
                self.begin_prompt(room).await;
            }
            GameEvent::SelectionUnsuccessful { .. } => {
                tracing::info!("Room {}: selector left, moving on", room.name);
                self.continue_selection(room).await;
            }
            GameEvent::DisputeComplete { action, .. } => {
                self.settle_dispute(room, action).await;
            }
            GameEvent::MatchingComplete { selector_active, .. } => {
                if !selector_active {
                    tracing::info!("Room {}: matching finished without the selector", room.name);
                }
                room.broadcast(ServerMessage::MatchingComplete { scores: game.scores() });
                self.continue_selection(room).await;
            }
        }
    }

    fn end_game(&self, room: &mut Room) {
        let Some(game) = room.game.as_mut() else {
            return;
        };
        let scores = game.game_over();
        tracing::info!("Room {} game over: {:?}", room.name, scores);
        room.broadcast(ServerMessage::GameOver { scores });
    }
}

/// Tell the room who selects next and with which selection type
fn announce_selector(room: &Room) {
    let Some(game) = room.game.as_ref() else {
        return;
    };
    let Some(selector) = game.selector_id() else {
        return;
    };
    room.broadcast(ServerMessage::NextSelection {
        selector: selector.clone(),
        selection_type: game.selection_type(),
        round: game.round(),
    });
}
