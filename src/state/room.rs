use super::{AppState, Session};
use crate::game::{GameState, Roster};
use crate::protocol::ServerMessage;
use crate::types::*;
use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, Mutex};
use ulid::Ulid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("Room name is already in use")]
    RoomTaken,

    #[error("Player name must not be empty")]
    BadName,

    #[error("Room name must not be empty")]
    BadRoom,

    #[error("Room does not exist")]
    NoRoom,

    #[error("Someone in this room already uses that name")]
    NameTaken,

    #[error("Only the room leader can do that")]
    NotLeader,

    #[error("Not in a room")]
    NotInRoom,

    #[error("Options out of range")]
    BadOptions,

    #[error("A game is already running")]
    GameInProgress,
}

impl RoomError {
    pub fn code(&self) -> &'static str {
        match self {
            RoomError::RoomTaken => "roomTaken",
            RoomError::BadName => "badName",
            RoomError::BadRoom => "badRoom",
            RoomError::NoRoom => "noRoom",
            RoomError::NameTaken => "nameTaken",
            RoomError::NotLeader => "notLeader",
            RoomError::NotInRoom => "notInRoom",
            RoomError::BadOptions => "badOptions",
            RoomError::GameInProgress => "gameInProgress",
        }
    }
}

/// Seats of a room in join order. Seats are never removed, only deactivated.
#[derive(Debug, Clone, Default)]
pub struct RoomRoster {
    players: Vec<RoomPlayer>,
}

impl RoomRoster {
    pub fn players(&self) -> &[RoomPlayer] {
        &self.players
    }

    pub fn ids(&self) -> Vec<PlayerId> {
        self.players.iter().map(|p| p.id.clone()).collect()
    }

    pub fn get(&self, id: &str) -> Option<&RoomPlayer> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn is_leader(&self, id: &str) -> bool {
        self.get(id).is_some_and(|p| p.leader)
    }

    pub fn any_active(&self) -> bool {
        self.players.iter().any(|p| p.active)
    }

    fn by_name_mut(&mut self, name: &str) -> Option<&mut RoomPlayer> {
        self.players.iter_mut().find(|p| p.name == name)
    }

    fn push(&mut self, player: RoomPlayer) {
        self.players.push(player);
    }

    /// Mark a seat inactive and pass leadership to the first active seat
    fn deactivate(&mut self, id: &str) -> bool {
        let Some(i) = self.players.iter().position(|p| p.id == id) else {
            return false;
        };
        self.players[i].active = false;

        if self.players[i].leader {
            if let Some(next) = self.players.iter().position(|p| p.active) {
                self.players[i].leader = false;
                self.players[next].leader = true;
                tracing::info!("{} is the new leader", self.players[next].name);
            }
        }
        true
    }
}

impl Roster for RoomRoster {
    fn is_active(&self, id: &str) -> bool {
        self.get(id).is_some_and(|p| p.active)
    }
}

pub struct Room {
    pub name: RoomName,
    pub lang: String,
    pub roster: RoomRoster,
    pub options: GameOptions,
    /// `None` until the leader starts the first game
    pub game: Option<GameState>,
    /// Set once the room is dropped from the registry
    closed: bool,
    tx: broadcast::Sender<ServerMessage>,
    this: Weak<Mutex<Room>>,
}

impl Room {
    fn new(name: RoomName, lang: String, this: Weak<Mutex<Room>>) -> Self {
        let (tx, _rx) = broadcast::channel(100);
        Self {
            name,
            lang,
            roster: RoomRoster::default(),
            options: GameOptions::default(),
            game: None,
            closed: false,
            tx,
            this,
        }
    }

    /// Send to every connection in the room
    pub fn broadcast(&self, msg: ServerMessage) {
        // Ignore send errors (nobody listening is fine)
        let _ = self.tx.send(msg);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.tx.subscribe()
    }

    pub(super) fn handle(&self) -> Weak<Mutex<Room>> {
        self.this.clone()
    }

    pub fn is_playing(&self) -> bool {
        self.game.as_ref().is_some_and(|g| g.stage() != Stage::Lobby)
    }

    fn joined(&self, player_id: &str) -> ServerMessage {
        ServerMessage::RoomJoined {
            room: self.name.clone(),
            player_id: player_id.to_string(),
            lang: self.lang.clone(),
            players: self.roster.players().to_vec(),
            options: self.options.clone(),
            game: self
                .game
                .as_ref()
                .filter(|_| self.is_playing())
                .map(|g| g.snapshot(player_id)),
        }
    }

    fn update(&self) -> ServerMessage {
        ServerMessage::RoomUpdate {
            players: self.roster.players().to_vec(),
        }
    }
}

fn clean(raw: &str) -> Option<String> {
    let s = raw.trim();
    (!s.is_empty()).then(|| s.to_string())
}

impl AppState {
    /// Look up the room and player bound to a connection
    pub async fn session(&self, conn: &str) -> Result<(Arc<Mutex<Room>>, PlayerId), RoomError> {
        let session = self
            .connections
            .read()
            .await
            .get(conn)
            .cloned()
            .ok_or(RoomError::NotInRoom)?;
        let room = self
            .rooms
            .read()
            .await
            .get(&session.room)
            .cloned()
            .ok_or(RoomError::NotInRoom)?;
        Ok((room, session.player_id))
    }

    pub async fn get_room(&self, name: &str) -> Option<Arc<Mutex<Room>>> {
        self.rooms.read().await.get(&name.to_lowercase()).cloned()
    }

    /// Receiver for the broadcasts of the connection's room.
    ///
    /// The first call after a join hands out the receiver opened while
    /// joining, so nothing broadcast since then is missed.
    pub async fn subscribe_room(&self, conn: &str) -> Option<broadcast::Receiver<ServerMessage>> {
        if let Some(rx) = self.pending_subscriptions.lock().await.remove(conn) {
            return Some(rx);
        }
        let (room, _) = self.session(conn).await.ok()?;
        let room = room.lock().await;
        Some(room.subscribe())
    }

    pub async fn create_room(
        &self,
        conn: &str,
        name: &str,
        room_name: &str,
        lang: Option<&str>,
    ) -> Result<ServerMessage, RoomError> {
        let name = clean(name).ok_or(RoomError::BadName)?;
        let room_name = clean(room_name).ok_or(RoomError::BadRoom)?.to_lowercase();
        let lang = lang
            .and_then(clean)
            .map(|l| l.to_lowercase())
            .unwrap_or_else(|| self.config.default_lang.clone());

        if self.get_room(&room_name).await.is_some() {
            return Err(RoomError::RoomTaken);
        }
        self.leave(conn).await;

        let player_id = Ulid::new().to_string();
        let room = {
            let mut rooms = self.rooms.write().await;
            if rooms.contains_key(&room_name) {
                return Err(RoomError::RoomTaken);
            }
            let room = Arc::new_cyclic(|this| {
                Mutex::new(Room::new(room_name.clone(), lang.clone(), this.clone()))
            });
            rooms.insert(room_name.clone(), room.clone());
            room
        };

        let mut room = room.lock().await;
        room.roster.push(RoomPlayer {
            id: player_id.clone(),
            name: name.clone(),
            leader: true,
            active: true,
        });
        self.bind(conn, &room_name, &player_id, room.subscribe()).await;

        tracing::info!("{} created room {} ({})", name, room_name, lang);
        Ok(room.joined(&player_id))
    }

    /// Join an existing room. A disconnected player rejoining under the same
    /// name takes back their seat and player id.
    pub async fn join_room(&self, conn: &str, name: &str, room_name: &str) -> Result<ServerMessage, RoomError> {
        let room_name = clean(room_name).ok_or(RoomError::BadRoom)?.to_lowercase();
        let name = clean(name).ok_or(RoomError::BadName)?;
        let handle = self.get_room(&room_name).await.ok_or(RoomError::NoRoom)?;

        self.leave(conn).await;

        let mut room = handle.lock().await;
        if room.closed {
            return Err(RoomError::NoRoom);
        }
        let player_id = match room.roster.by_name_mut(&name) {
            Some(existing) if existing.active => return Err(RoomError::NameTaken),
            Some(existing) => {
                existing.active = true;
                tracing::info!("{} rejoined room {}", name, room_name);
                existing.id.clone()
            }
            None => {
                let id = Ulid::new().to_string();
                room.roster.push(RoomPlayer {
                    id: id.clone(),
                    name: name.clone(),
                    leader: false,
                    active: true,
                });
                tracing::info!("{} joined room {}", name, room_name);
                id
            }
        };
        room.broadcast(room.update());
        self.bind(conn, &room_name, &player_id, room.subscribe()).await;

        if room.is_playing() {
            tracing::info!("{} joined room {} mid-game", name, room_name);
        }
        Ok(room.joined(&player_id))
    }

    pub async fn set_options(&self, conn: &str, options: GameOptions) -> Result<(), RoomError> {
        let (handle, player_id) = self.session(conn).await?;
        let mut room = handle.lock().await;
        if !room.roster.is_leader(&player_id) {
            return Err(RoomError::NotLeader);
        }
        if let Err(e) = options.validate() {
            tracing::warn!("Rejected options for room {}: {}", room.name, e);
            return Err(RoomError::BadOptions);
        }

        tracing::info!("Room {} options: {:?}", room.name, options);
        room.options = options.clone();
        room.broadcast(ServerMessage::OptionsUpdated { options });
        Ok(())
    }

    /// Drop a connection: its seat goes inactive, leadership moves on, and an
    /// empty room is deleted. A running game recovers from the missing player.
    pub async fn disconnect(&self, conn: &str) {
        self.leave(conn).await;
    }

    async fn leave(&self, conn: &str) {
        self.pending_subscriptions.lock().await.remove(conn);
        let Some(session) = self.connections.write().await.remove(conn) else {
            return;
        };
        let Some(handle) = self.get_room(&session.room).await else {
            return;
        };

        let mut room = handle.lock().await;
        if !room.roster.deactivate(&session.player_id) {
            return;
        }
        tracing::info!("Player {} left room {}", session.player_id, room.name);

        if !room.roster.any_active() {
            room.closed = true;
            let mut rooms = self.rooms.write().await;
            if rooms.get(&session.room).is_some_and(|r| Arc::ptr_eq(r, &handle)) {
                rooms.remove(&session.room);
            }
            tracing::info!("Room {} is empty, deleting", room.name);
            return;
        }

        room.broadcast(room.update());
        let room = &mut *room;
        if let Some(game) = room.game.as_mut() {
            game.disconnect(&session.player_id, &room.roster);
        }
    }

    async fn bind(&self, conn: &str, room: &str, player_id: &str, rx: broadcast::Receiver<ServerMessage>) {
        self.connections.write().await.insert(
            conn.to_string(),
            Session {
                room: room.to_string(),
                player_id: player_id.to_string(),
            },
        );
        self.pending_subscriptions.lock().await.insert(conn.to_string(), rx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joined_id(msg: ServerMessage) -> PlayerId {
        match msg {
            ServerMessage::RoomJoined { player_id, .. } => player_id,
            other => panic!("expected RoomJoined, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_room_validates() {
        let state = AppState::new();
        assert_eq!(state.create_room("c1", " ", "den", None).await, Err(RoomError::BadName));
        assert_eq!(state.create_room("c1", "Ada", "", None).await, Err(RoomError::BadRoom));

        state.create_room("c1", "Ada", "Den", None).await.unwrap();
        assert!(state.get_room("den").await.is_some());
        assert_eq!(state.create_room("c2", "Bob", "DEN", None).await, Err(RoomError::RoomTaken));
    }

    #[tokio::test]
    async fn test_create_room_uses_default_lang() {
        let state = AppState::new();
        match state.create_room("c1", "Ada", "den", None).await.unwrap() {
            ServerMessage::RoomJoined { lang, players, .. } => {
                assert_eq!(lang, "en");
                assert!(players[0].leader);
            }
            other => panic!("unexpected {:?}", other),
        }
        match state.create_room("c2", "Ece", "oda", Some("TR")).await.unwrap() {
            ServerMessage::RoomJoined { lang, .. } => assert_eq!(lang, "tr"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_join_room_errors() {
        let state = AppState::new();
        state.create_room("c1", "Ada", "den", None).await.unwrap();

        assert_eq!(state.join_room("c2", "Bob", "").await, Err(RoomError::BadRoom));
        assert_eq!(state.join_room("c2", "", "den").await, Err(RoomError::BadName));
        assert_eq!(state.join_room("c2", "Bob", "attic").await, Err(RoomError::NoRoom));
        assert_eq!(state.join_room("c2", "Ada", "den").await, Err(RoomError::NameTaken));
        assert!(state.join_room("c2", "Bob", "Den").await.is_ok());
    }

    #[tokio::test]
    async fn test_rejoin_reclaims_player_id() {
        let state = AppState::new();
        state.create_room("c1", "Ada", "den", None).await.unwrap();
        let bob = joined_id(state.join_room("c2", "Bob", "den").await.unwrap());

        state.disconnect("c2").await;
        let room = state.get_room("den").await.unwrap();
        assert!(!room.lock().await.roster.is_active(&bob));

        let again = joined_id(state.join_room("c3", "Bob", "den").await.unwrap());
        assert_eq!(again, bob);
        assert!(room.lock().await.roster.is_active(&bob));
        assert_eq!(room.lock().await.roster.players().len(), 2);
    }

    #[tokio::test]
    async fn test_leader_handover_and_room_deletion() {
        let state = AppState::new();
        let ada = joined_id(state.create_room("c1", "Ada", "den", None).await.unwrap());
        let bob = joined_id(state.join_room("c2", "Bob", "den").await.unwrap());

        state.disconnect("c1").await;
        {
            let room = state.get_room("den").await.unwrap();
            let room = room.lock().await;
            assert!(!room.roster.is_leader(&ada));
            assert!(room.roster.is_leader(&bob));
        }

        state.disconnect("c2").await;
        assert!(state.get_room("den").await.is_none());
        assert!(state.session("c2").await.is_err());
    }

    #[tokio::test]
    async fn test_set_options_leader_only() {
        let state = AppState::new();
        state.create_room("c1", "Ada", "den", None).await.unwrap();
        state.join_room("c2", "Bob", "den").await.unwrap();

        let options = GameOptions {
            num_rounds: 3,
            ..GameOptions::default()
        };
        assert_eq!(state.set_options("c2", options.clone()).await, Err(RoomError::NotLeader));
        assert_eq!(state.set_options("c3", options.clone()).await, Err(RoomError::NotInRoom));

        let bad = GameOptions {
            prompt_timer: 0,
            ..GameOptions::default()
        };
        assert_eq!(state.set_options("c1", bad).await, Err(RoomError::BadOptions));

        state.set_options("c1", options).await.unwrap();
        let room = state.get_room("den").await.unwrap();
        assert_eq!(room.lock().await.options.num_rounds, 3);
    }

    #[tokio::test]
    async fn test_join_broadcasts_room_update() {
        let state = AppState::new();
        state.create_room("c1", "Ada", "den", None).await.unwrap();
        let mut rx = state.subscribe_room("c1").await.unwrap();

        state.join_room("c2", "Bob", "den").await.unwrap();
        match rx.recv().await.unwrap() {
            ServerMessage::RoomUpdate { players } => assert_eq!(players.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_receiver_opened_at_join_sees_earlier_broadcasts() {
        let state = AppState::new();
        state.create_room("c1", "Ada", "den", None).await.unwrap();
        state.join_room("c2", "Bob", "den").await.unwrap();

        // broadcast before the joiner asks for its receiver
        let options = GameOptions {
            num_rounds: 2,
            ..GameOptions::default()
        };
        state.set_options("c1", options.clone()).await.unwrap();

        let mut rx = state.subscribe_room("c2").await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), ServerMessage::OptionsUpdated { options });
    }

    #[tokio::test]
    async fn test_join_running_game_includes_round() {
        let state = AppState::new();
        match state.create_room("c1", "Ada", "den", None).await.unwrap() {
            ServerMessage::RoomJoined { game, .. } => assert!(game.is_none()),
            other => panic!("unexpected {:?}", other),
        }
        state.start_game("c1").await.unwrap();

        match state.join_room("c2", "Bob", "den").await.unwrap() {
            ServerMessage::RoomJoined { game: Some(snap), .. } => {
                assert_eq!(snap.stage, Stage::ResponseCollection);
                assert_eq!(snap.round, 1);
                assert!(!snap.prompt.is_empty());
                // not seated when the game started
                assert!(snap.you.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_busy_room_does_not_block_other_rooms() {
        let state = AppState::new();
        state.create_room("c1", "Ada", "den", None).await.unwrap();
        let bob = joined_id(state.join_room("c2", "Bob", "den").await.unwrap());
        state.create_room("c3", "Cy", "attic", None).await.unwrap();

        let den = state.get_room("den").await.unwrap();
        let busy = den.lock().await;
        let leaving = tokio::spawn({
            let state = state.clone();
            async move { state.disconnect("c2").await }
        });
        tokio::task::yield_now().await;

        let lookup = tokio::time::timeout(std::time::Duration::from_secs(1), state.session("c3")).await;
        assert!(lookup.is_ok_and(|found| found.is_ok()));

        drop(busy);
        leaving.await.unwrap();
        assert!(!den.lock().await.roster.is_active(&bob));
    }

    #[tokio::test]
    async fn test_closed_room_cannot_be_joined() {
        let state = AppState::new();
        state.create_room("c1", "Ada", "den", None).await.unwrap();
        let den = state.get_room("den").await.unwrap();

        state.disconnect("c1").await;
        assert!(den.lock().await.closed);
        assert_eq!(state.join_room("c2", "Bob", "den").await, Err(RoomError::NoRoom));
    }

    #[test]
    fn test_room_error_codes() {
        assert_eq!(RoomError::RoomTaken.code(), "roomTaken");
        assert_eq!(RoomError::NotInRoom.code(), "notInRoom");
        assert_eq!(RoomError::GameInProgress.code(), "gameInProgress");
    }
}
