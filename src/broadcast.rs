use crate::game::GameEvent;
use crate::state::{AppState, Room};
use crate::types::Stage;
use std::sync::Weak;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::Mutex;

/// Grace period after the advertised deadline for responses still in flight
const PROMPT_GRACE: Duration = Duration::from_secs(1);

/// Spawn the response collection timer for one prompt.
///
/// When it fires after the room moved past that prompt (skip vote, game over,
/// a new game) it does nothing.
pub fn spawn_prompt_timer(
    state: AppState,
    room: Weak<Mutex<Room>>,
    game_id: String,
    generation: u64,
    seconds: u32,
) {
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(u64::from(seconds)) + PROMPT_GRACE).await;

        let Some(handle) = room.upgrade() else {
            return;
        };
        let mut room = handle.lock().await;
        let current = room
            .game
            .as_ref()
            .map(|g| (g.id() == game_id, g.generation(), g.stage()));
        if current != Some((true, generation, Stage::ResponseCollection)) {
            tracing::debug!(
                "Room {}: prompt timer for generation {} is stale",
                room.name,
                generation
            );
            return;
        }

        tracing::info!("Room {}: time is up, beginning selection", room.name);
        state.begin_selection(&mut room).await;
    });
}

/// Spawn a task that feeds a game's events back into the room's flow.
/// It ends when the game is dropped or the room is gone.
pub fn spawn_game_event_listener(
    state: AppState,
    room: Weak<Mutex<Room>>,
    game_id: String,
    mut events: broadcast::Receiver<GameEvent>,
) {
    tokio::spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Game event listener skipped {} events", skipped);
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            let Some(handle) = room.upgrade() else {
                break;
            };
            let mut guard = handle.lock().await;
            state.handle_game_event(&mut guard, &game_id, event).await;
        }
        tracing::debug!("Game event listener for {} finished", game_id);
    });
}
