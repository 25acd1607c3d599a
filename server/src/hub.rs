//! The coordinator: sole owner of the client registry and the world.
//!
//! Everything that changes shared state arrives here as a message and is
//! handled to completion, broadcasts included, before the next one is read:
//! - connection events (register, unregister, client payloads) share one
//!   queue, so each connection's events keep their order
//! - AI input from the controllers of the current game
//! - game events (ticks, spawned coins) from the driver and coin spawner
//!
//! Background tasks of a game are stamped with its generation. Anything that
//! arrives from an older generation is ignored, so a torn-down game can never
//! touch the world that replaced it.

use crate::ai::{AiController, AiTiming};
use crate::coins::CoinSpawner;
use crate::config::ServerConfig;
use crate::connection::{ConnectionHandle, Frame, Inbound, SessionId};
use crate::error::{ServerError, ServerResult};
use crate::shutdown::{self, ShutdownSignal};
use crate::simulation;
use crate::world::{GamePhase, Positions, World};
use arena_shared::{ClientMessage, Coin, InputState, ServerMessage};
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use tokio::sync::{mpsc, watch};

const EVENT_QUEUE_CAPACITY: usize = 1024;
const AI_QUEUE_CAPACITY: usize = 256;
const GAME_QUEUE_CAPACITY: usize = 64;

#[derive(Debug)]
pub enum HubEvent {
    Register(ConnectionHandle),
    Unregister(SessionId),
    ClientData(Inbound),
}

impl From<Inbound> for HubEvent {
    fn from(inbound: Inbound) -> Self {
        HubEvent::ClientData(inbound)
    }
}

/// Synthetic input for the AI char at table index `id`.
#[derive(Debug, Clone)]
pub struct AiInput {
    pub generation: u64,
    pub id: usize,
    pub input: InputState,
}

#[derive(Debug)]
pub enum GameEvent {
    Tick { generation: u64, ticks: u32 },
    CoinSpawned { generation: u64, coin: Coin },
}

/// Entry point into the hub for connection tasks.
#[derive(Debug, Clone)]
pub struct HubHandle {
    events: mpsc::Sender<HubEvent>,
}

impl HubHandle {
    pub async fn register(&self, handle: ConnectionHandle) -> ServerResult<()> {
        self.events
            .send(HubEvent::Register(handle))
            .await
            .map_err(|_| ServerError::HubClosed)
    }

    pub async fn unregister(&self, id: SessionId) -> ServerResult<()> {
        self.events
            .send(HubEvent::Unregister(id))
            .await
            .map_err(|_| ServerError::HubClosed)
    }

    /// Queue that connection read pumps deliver payloads into.
    pub fn sender(&self) -> mpsc::Sender<HubEvent> {
        self.events.clone()
    }
}

struct Client {
    handle: ConnectionHandle,
    slot: usize,
}

struct ActiveGame {
    generation: u64,
    signal: ShutdownSignal,
}

pub struct Hub {
    config: ServerConfig,
    world: World,
    rng: StdRng,

    clients: HashMap<SessionId, Client>,
    /// Sessions that were refused a slot. They get no broadcasts and stay
    /// open until the peer goes away.
    pending: HashMap<SessionId, ConnectionHandle>,
    /// Sessions whose outbound queue overflowed during the current event.
    stalled: Vec<SessionId>,

    events: mpsc::Receiver<HubEvent>,
    ai_tx: mpsc::Sender<AiInput>,
    ai_rx: mpsc::Receiver<AiInput>,
    game_tx: mpsc::Sender<GameEvent>,
    game_rx: mpsc::Receiver<GameEvent>,
    positions: watch::Sender<Positions>,

    active: Option<ActiveGame>,
    generation: u64,
}

impl Hub {
    pub fn new(config: ServerConfig) -> (Self, HubHandle) {
        Self::with_rng(config, StdRng::from_entropy())
    }

    pub fn with_rng(config: ServerConfig, rng: StdRng) -> (Self, HubHandle) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let (ai_tx, ai_rx) = mpsc::channel(AI_QUEUE_CAPACITY);
        let (game_tx, game_rx) = mpsc::channel(GAME_QUEUE_CAPACITY);
        let (positions, _) = watch::channel(Positions::new());

        let hub = Self {
            config,
            world: World::new(),
            rng,
            clients: HashMap::new(),
            pending: HashMap::new(),
            stalled: Vec::new(),
            events: events_rx,
            ai_tx,
            ai_rx,
            game_tx,
            game_rx,
            positions,
            active: None,
            generation: 0,
        };
        (hub, HubHandle { events: events_tx })
    }

    /// Runs until every `HubHandle` and event sender is gone.
    pub async fn run(mut self) {
        info!("hub started");
        loop {
            tokio::select! {
                event = self.events.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
                Some(input) = self.ai_rx.recv() => self.handle_ai_input(input),
                Some(event) = self.game_rx.recv() => self.handle_game_event(event),
            }
            self.reap_stalled();
        }
        self.stop_game();
        info!("hub stopped");
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    fn handle_event(&mut self, event: HubEvent) {
        match event {
            HubEvent::Register(handle) => self.register(handle),
            HubEvent::Unregister(id) => self.disconnect(id),
            HubEvent::ClientData(inbound) => self.handle_client_data(inbound),
        }
    }

    fn register(&mut self, handle: ConnectionHandle) {
        let id = handle.id();

        let Some(slot) = self.world.player_slots().next_free() else {
            info!("session {} refused: all slots full", id);
            self.reject(handle, "all slots full");
            return;
        };
        if self.world.is_running() {
            info!("session {} refused: game already running", id);
            self.reject(handle, "game already running");
            return;
        }

        let is_host = self.world.host_slot().is_none();
        if is_host {
            self.world.set_host_slot(Some(slot));
        }
        let (px, py) = self.world.join(slot, &mut self.rng);
        self.clients.insert(id, Client { handle, slot });
        info!(
            "session {} joined as slot {}{}",
            id,
            slot,
            if is_host { " (host)" } else { "" }
        );

        self.send_to(
            id,
            &ServerMessage::ConnectResponse {
                slot: slot as u32,
                is_host,
                px,
                py,
            },
        );
        let lobby = self.lobby();
        self.broadcast(&lobby);
    }

    fn reject(&mut self, handle: ConnectionHandle, reason: &str) {
        let message = ServerMessage::ConnectError {
            message: reason.to_string(),
        };
        if let Some(frame) = encode(&message) {
            if handle.send(frame).is_err() {
                return;
            }
        }
        self.pending.insert(handle.id(), handle);
    }

    fn lobby(&self) -> ServerMessage {
        ServerMessage::UpdateLobby {
            connected_slots: self.world.player_slots().to_vec(),
            host_slot: self.world.host_slot().map(|slot| slot as u32),
        }
    }

    /// Removes a session. Dropping its handle closes the socket.
    fn disconnect(&mut self, id: SessionId) {
        if self.pending.remove(&id).is_some() {
            debug!("refused session {} closed", id);
            return;
        }
        let Some(client) = self.clients.remove(&id) else {
            return;
        };

        let slot = client.slot;
        drop(client);
        self.world.leave(slot);
        info!("slot {} disconnected (session {})", slot, id);
        self.broadcast(&ServerMessage::PlayerDisconnected { slot: slot as u32 });

        if self.world.host_slot() == Some(slot) {
            let new_host = self.world.player_slots().lowest_occupied();
            self.world.set_host_slot(new_host);
            if let Some(new_host) = new_host {
                info!("slot {} is the new host", new_host);
                self.broadcast(&ServerMessage::NewHost {
                    slot: new_host as u32,
                });
            }
        }

        if self.world.is_running() && self.clients.is_empty() {
            info!("everyone left, tearing down the game");
            self.stop_game();
            self.world = World::new();
            self.publish_positions();
        }
    }

    fn handle_client_data(&mut self, inbound: Inbound) {
        let id = inbound.session;
        let message = match ClientMessage::decode(&inbound.payload) {
            Ok(message) => message,
            Err(e) => {
                warn!("session {} sent an invalid message: {}", id, e);
                self.disconnect(id);
                return;
            }
        };

        let Some(slot) = self.clients.get(&id).map(|client| client.slot) else {
            debug!("ignoring message from unregistered session {}", id);
            return;
        };

        match message {
            ClientMessage::Input(input) => {
                if let Some(update) = self.world.apply_input(slot, &input) {
                    self.broadcast(&ServerMessage::UpdateEntity(update));
                }
            }
            ClientMessage::StartGame => self.start_game(slot),
            ClientMessage::WorldUpdate => {
                let snapshot = ServerMessage::UpdateEntities(self.world.snapshot());
                self.broadcast(&snapshot);
            }
        }
    }

    fn start_game(&mut self, slot: usize) {
        if self.world.host_slot() != Some(slot) {
            warn!("slot {} tried to start the game but is not host", slot);
            return;
        }
        if self.world.is_running() {
            debug!("start requested while a game is running");
            return;
        }
        if self.world.phase() == GamePhase::Ended {
            self.world = World::from_lobby(&self.world, &mut self.rng);
        }

        self.broadcast(&ServerMessage::GameStart);
        let ai_ids = self.world.setup(&mut self.rng);
        self.world.start();
        self.publish_positions();

        self.generation += 1;
        let generation = self.generation;
        let (signal, shutdown) = shutdown::channel();

        let timing = AiTiming {
            think_max: self.config.ai_think_max(),
            walk_max: self.config.ai_walk_max(),
        };
        let ai_count = ai_ids.len();
        for id in ai_ids {
            let controller = AiController::new(
                id,
                generation,
                self.ai_tx.clone(),
                self.positions.subscribe(),
                shutdown.clone(),
                timing,
                StdRng::seed_from_u64(self.rng.gen()),
            );
            tokio::spawn(controller.run());
        }

        let spawner = CoinSpawner::new(
            generation,
            self.game_tx.clone(),
            shutdown.clone(),
            self.config.coin_interval_max(),
            StdRng::seed_from_u64(self.rng.gen()),
        );
        tokio::spawn(spawner.run());
        tokio::spawn(simulation::run(
            generation,
            self.config.tick_duration(),
            self.game_tx.clone(),
            shutdown,
        ));

        self.active = Some(ActiveGame { generation, signal });
        info!(
            "game {} started with {} players and {} ai",
            generation,
            self.clients.len(),
            ai_count
        );
    }

    fn is_current(&self, generation: u64) -> bool {
        self.active
            .as_ref()
            .map_or(false, |game| game.generation == generation)
    }

    fn handle_ai_input(&mut self, input: AiInput) {
        if !self.is_current(input.generation) || !self.world.is_ai(input.id) {
            return;
        }
        if let Some(update) = self.world.apply_input(input.id, &input.input) {
            self.broadcast(&ServerMessage::UpdateEntity(update));
        }
    }

    fn handle_game_event(&mut self, event: GameEvent) {
        match event {
            GameEvent::Tick { generation, ticks } => {
                if !self.is_current(generation) {
                    return;
                }
                for _ in 0..ticks {
                    let messages = self.world.update();
                    for message in &messages {
                        self.broadcast(message);
                    }
                    if !self.world.is_running() {
                        break;
                    }
                }
                self.publish_positions();

                if self.world.phase() == GamePhase::Ended {
                    info!("game {} ended", generation);
                    self.stop_game();
                }
            }
            GameEvent::CoinSpawned { generation, coin } => {
                if !self.is_current(generation) || !self.world.is_running() {
                    return;
                }
                let announcement = self.world.add_coin(coin);
                self.broadcast(&announcement);
            }
        }
    }

    fn stop_game(&mut self) {
        if let Some(game) = self.active.take() {
            game.signal.fire();
            debug!("stopped background tasks of game {}", game.generation);
        }
        self.world.stop();
    }

    fn publish_positions(&self) {
        self.positions.send_replace(self.world.positions());
    }

    fn send_to(&mut self, id: SessionId, message: &ServerMessage) {
        let Some(client) = self.clients.get(&id) else {
            return;
        };
        let Some(frame) = encode(message) else {
            return;
        };
        if let Err(e) = client.handle.send(frame) {
            warn!("dropping session {}: {}", id, e);
            self.stalled.push(id);
        }
    }

    /// Queues `message` for every registered session.
    fn broadcast(&mut self, message: &ServerMessage) {
        let Some(frame) = encode(message) else {
            return;
        };
        debug!("broadcast {} to {} clients", message.kind(), self.clients.len());

        for (id, client) in &self.clients {
            if let Err(e) = client.handle.send(Frame::clone(&frame)) {
                warn!("dropping slot {}: {}", client.slot, e);
                self.stalled.push(*id);
            }
        }
    }

    /// Disconnects every session that could not keep up.
    fn reap_stalled(&mut self) {
        while !self.stalled.is_empty() {
            let stalled = std::mem::take(&mut self.stalled);
            for id in stalled {
                self.disconnect(id);
            }
        }
    }
}

fn encode(message: &ServerMessage) -> Option<Frame> {
    match message.encode() {
        Ok(bytes) => Some(Frame::from(bytes)),
        Err(e) => {
            error!("failed to encode {}: {}", message.kind(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_shared::{MAX_CHARS, MAX_CLIENTS};

    struct Peer {
        id: SessionId,
        rx: mpsc::Receiver<Frame>,
    }

    impl Peer {
        fn drain(&mut self) -> Vec<ServerMessage> {
            let mut messages = Vec::new();
            while let Ok(frame) = self.rx.try_recv() {
                messages.push(ServerMessage::decode(&frame).unwrap());
            }
            messages
        }

        fn is_closed(&mut self) -> bool {
            self.drain();
            matches!(
                self.rx.try_recv(),
                Err(mpsc::error::TryRecvError::Disconnected)
            )
        }
    }

    fn hub() -> Hub {
        let mut config = ServerConfig::default();
        config.ai_think_max_ms = 60_000;
        config.coin_interval_max_ms = 60_000;
        let (hub, _handle) = Hub::with_rng(config, StdRng::seed_from_u64(21));
        hub
    }

    fn connect(hub: &mut Hub, id: SessionId) -> Peer {
        connect_with_capacity(hub, id, 256)
    }

    fn connect_with_capacity(hub: &mut Hub, id: SessionId, capacity: usize) -> Peer {
        let (handle, rx) = ConnectionHandle::detached(id, capacity);
        hub.handle_event(HubEvent::Register(handle));
        hub.reap_stalled();
        Peer { id, rx }
    }

    fn send(hub: &mut Hub, peer: &Peer, message: ClientMessage) {
        let payload = message.encode().unwrap();
        hub.handle_event(HubEvent::ClientData(Inbound {
            session: peer.id,
            payload,
        }));
        hub.reap_stalled();
    }

    fn leave(hub: &mut Hub, peer: &Peer) {
        hub.handle_event(HubEvent::Unregister(peer.id));
        hub.reap_stalled();
    }

    fn lobby_bitmap(slots: &[usize]) -> Vec<bool> {
        (0..MAX_CLIENTS).map(|slot| slots.contains(&slot)).collect()
    }

    #[test]
    fn test_two_clients_join_lobby() {
        let mut hub = hub();
        let mut first = connect(&mut hub, 1);
        let mut second = connect(&mut hub, 2);

        let messages = first.drain();
        assert!(matches!(
            messages[0],
            ServerMessage::ConnectResponse { slot: 0, is_host: true, .. }
        ));
        assert_eq!(
            messages.last(),
            Some(&ServerMessage::UpdateLobby {
                connected_slots: lobby_bitmap(&[0, 1]),
                host_slot: Some(0),
            })
        );

        let messages = second.drain();
        assert!(matches!(
            messages[0],
            ServerMessage::ConnectResponse { slot: 1, is_host: false, .. }
        ));
        assert_eq!(
            messages[1],
            ServerMessage::UpdateLobby {
                connected_slots: lobby_bitmap(&[0, 1]),
                host_slot: Some(0),
            }
        );
        assert_eq!(hub.client_count(), 2);
    }

    #[test]
    fn test_spawn_position_matches_world() {
        let mut hub = hub();
        let mut peer = connect(&mut hub, 1);
        match peer.drain().first() {
            Some(ServerMessage::ConnectResponse { px, py, .. }) => {
                let char = hub.world().char(0).unwrap();
                assert_eq!((char.px, char.py), (*px, *py));
            }
            other => panic!("expected ConnectResponse, got {:?}", other),
        }
    }

    #[test]
    fn test_ninth_client_is_refused() {
        let mut hub = hub();
        let mut peers: Vec<Peer> = (0..MAX_CLIENTS as u64)
            .map(|id| connect(&mut hub, id))
            .collect();
        let mut extra = connect(&mut hub, 100);

        assert_eq!(
            extra.drain(),
            vec![ServerMessage::ConnectError {
                message: "all slots full".to_string()
            }]
        );
        assert_eq!(hub.client_count(), MAX_CLIENTS);
        assert!(!extra.is_closed());

        // Refused sessions are not broadcast to.
        send(&mut hub, &peers[0], ClientMessage::WorldUpdate);
        assert!(extra.drain().is_empty());
        assert!(matches!(
            peers[1].drain().last(),
            Some(ServerMessage::UpdateEntities(_))
        ));

        leave(&mut hub, &extra);
        assert!(extra.is_closed());
    }

    #[tokio::test]
    async fn test_join_refused_while_running() {
        let mut hub = hub();
        let host = connect(&mut hub, 1);
        let _other = connect(&mut hub, 2);
        send(&mut hub, &host, ClientMessage::StartGame);
        assert!(hub.world().is_running());

        let mut late = connect(&mut hub, 3);
        assert_eq!(
            late.drain(),
            vec![ServerMessage::ConnectError {
                message: "game already running".to_string()
            }]
        );
        assert_eq!(hub.client_count(), 2);
    }

    #[tokio::test]
    async fn test_start_game_fills_world() {
        let mut hub = hub();
        let host = connect(&mut hub, 1);
        let mut other = connect(&mut hub, 2);
        other.drain();

        send(&mut hub, &host, ClientMessage::StartGame);
        assert_eq!(other.drain(), vec![ServerMessage::GameStart]);
        assert!(hub.world().is_running());
        assert!((0..MAX_CHARS).all(|id| hub.world().char(id).is_some()));
        assert!(!hub.world().is_ai(1));
        assert!(hub.world().is_ai(2));

        send(&mut hub, &host, ClientMessage::WorldUpdate);
        match other.drain().as_slice() {
            [ServerMessage::UpdateEntities(entities)] => assert_eq!(entities.len(), MAX_CHARS),
            other => panic!("expected a snapshot, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_only_host_can_start() {
        let mut hub = hub();
        let _host = connect(&mut hub, 1);
        let other = connect(&mut hub, 2);

        send(&mut hub, &other, ClientMessage::StartGame);
        assert!(!hub.world().is_running());
    }

    #[test]
    fn test_input_broadcasts_entity_update() {
        let mut hub = hub();
        let mut peer = connect(&mut hub, 1);
        peer.drain();

        let input = InputState {
            right: true,
            ..InputState::released()
        };
        send(&mut hub, &peer, ClientMessage::Input(input));
        match peer.drain().as_slice() {
            [ServerMessage::UpdateEntity(update)] => {
                assert_eq!(update.index, 0);
                assert_eq!((update.fx, update.vx), (1, 1));
            }
            other => panic!("expected UpdateEntity, got {:?}", other),
        }
    }

    #[test]
    fn test_host_disconnect_reassigns_lowest_slot() {
        let mut hub = hub();
        let host = connect(&mut hub, 1);
        let mut second = connect(&mut hub, 2);
        let mut third = connect(&mut hub, 3);
        second.drain();
        third.drain();

        leave(&mut hub, &host);
        let expected = vec![
            ServerMessage::PlayerDisconnected { slot: 0 },
            ServerMessage::NewHost { slot: 1 },
        ];
        assert_eq!(second.drain(), expected);
        assert_eq!(third.drain(), expected);
        assert_eq!(hub.world().host_slot(), Some(1));

        // Slot 0 is handed out again, without host rights.
        let mut again = connect(&mut hub, 4);
        assert!(matches!(
            again.drain()[0],
            ServerMessage::ConnectResponse { slot: 0, is_host: false, .. }
        ));
    }

    #[test]
    fn test_non_host_disconnect_keeps_host() {
        let mut hub = hub();
        let mut host = connect(&mut hub, 1);
        let second = connect(&mut hub, 2);
        host.drain();

        leave(&mut hub, &second);
        assert_eq!(host.drain(), vec![ServerMessage::PlayerDisconnected { slot: 1 }]);
        assert!(hub.world().char(1).is_none());
    }

    #[test]
    fn test_last_client_leaving_clears_host() {
        let mut hub = hub();
        let host = connect(&mut hub, 1);
        leave(&mut hub, &host);
        assert_eq!(hub.world().host_slot(), None);

        let mut next = connect(&mut hub, 2);
        assert!(matches!(
            next.drain()[0],
            ServerMessage::ConnectResponse { slot: 0, is_host: true, .. }
        ));
    }

    #[test]
    fn test_slow_consumer_is_disconnected() {
        let mut hub = hub();
        // Room for exactly its own ConnectResponse and UpdateLobby.
        let mut slow = connect_with_capacity(&mut hub, 1, 2);
        let mut fast = connect(&mut hub, 2);

        assert!(slow.is_closed());
        assert_eq!(hub.client_count(), 1);
        assert_eq!(
            fast.drain()[2..],
            [
                ServerMessage::PlayerDisconnected { slot: 0 },
                ServerMessage::NewHost { slot: 1 },
            ]
        );
    }

    #[test]
    fn test_invalid_payload_disconnects_sender() {
        let mut hub = hub();
        let mut bad = connect(&mut hub, 1);
        let mut good = connect(&mut hub, 2);
        good.drain();

        hub.handle_event(HubEvent::ClientData(Inbound {
            session: bad.id,
            payload: vec![0xff; 4],
        }));
        hub.reap_stalled();

        assert!(bad.is_closed());
        assert_eq!(hub.client_count(), 1);
        assert_eq!(good.drain()[0], ServerMessage::PlayerDisconnected { slot: 0 });
    }

    #[tokio::test]
    async fn test_single_player_game_ends_and_restarts() {
        let mut hub = hub();
        let mut host = connect(&mut hub, 1);
        host.drain();

        send(&mut hub, &host, ClientMessage::StartGame);
        let generation = hub.generation;
        hub.handle_game_event(GameEvent::Tick {
            generation,
            ticks: 5,
        });

        let messages = host.drain();
        assert_eq!(messages[0], ServerMessage::GameStart);
        assert!(matches!(
            messages.last(),
            Some(ServerMessage::GameEnd { survivor_slot: 0, .. })
        ));
        assert_eq!(hub.world().phase(), GamePhase::Ended);
        assert!(hub.active.is_none());

        send(&mut hub, &host, ClientMessage::StartGame);
        assert_eq!(host.drain()[0], ServerMessage::GameStart);
        assert!(hub.world().is_running());
        assert_eq!(hub.generation, generation + 1);
    }

    #[tokio::test]
    async fn test_game_with_only_dead_players_can_restart() {
        let mut hub = hub();
        let host = connect(&mut hub, 1);
        let mut victim = connect(&mut hub, 2);
        let third = connect(&mut hub, 3);
        send(&mut hub, &host, ClientMessage::StartGame);
        let generation = hub.generation;

        hub.world.char_mut(1).unwrap().is_dead = true;
        leave(&mut hub, &host);
        leave(&mut hub, &third);
        assert_eq!(hub.world().host_slot(), Some(1));

        hub.handle_game_event(GameEvent::Tick {
            generation,
            ticks: 1,
        });
        assert_eq!(hub.world().phase(), GamePhase::Ended);
        assert!(hub.active.is_none());
        assert!(!victim
            .drain()
            .iter()
            .any(|m| matches!(m, ServerMessage::GameEnd { .. })));

        let mut newcomer = connect(&mut hub, 4);
        assert!(matches!(
            newcomer.drain()[0],
            ServerMessage::ConnectResponse { slot: 0, is_host: false, .. }
        ));

        victim.drain();
        send(&mut hub, &victim, ClientMessage::StartGame);
        assert_eq!(victim.drain()[0], ServerMessage::GameStart);
        assert!(hub.world().is_running());
        assert_eq!(hub.generation, generation + 1);
    }

    #[tokio::test]
    async fn test_stale_generation_is_ignored() {
        let mut hub = hub();
        let host = connect(&mut hub, 1);
        let mut other = connect(&mut hub, 2);
        send(&mut hub, &host, ClientMessage::StartGame);
        other.drain();

        let stale = hub.generation - 1;
        hub.handle_game_event(GameEvent::CoinSpawned {
            generation: stale,
            coin: Coin::new_at(100.0, 100.0),
        });
        hub.handle_ai_input(AiInput {
            generation: stale,
            id: 5,
            input: InputState {
                left: true,
                ..InputState::released()
            },
        });
        assert!(other.drain().is_empty());
        assert!(hub.world().coins().is_empty());

        hub.handle_game_event(GameEvent::CoinSpawned {
            generation: hub.generation,
            coin: Coin::new_at(100.0, 100.0),
        });
        assert!(matches!(
            other.drain().as_slice(),
            [ServerMessage::NewCoin { index: 0, .. }]
        ));
    }

    #[tokio::test]
    async fn test_ai_input_only_drives_ai() {
        let mut hub = hub();
        let host = connect(&mut hub, 1);
        let mut other = connect(&mut hub, 2);
        send(&mut hub, &host, ClientMessage::StartGame);
        other.drain();

        let left = InputState {
            left: true,
            ..InputState::released()
        };
        let generation = hub.generation;
        hub.handle_ai_input(AiInput {
            generation,
            id: 1,
            input: left,
        });
        assert!(other.drain().is_empty());

        hub.handle_ai_input(AiInput {
            generation,
            id: 7,
            input: left,
        });
        match other.drain().as_slice() {
            [ServerMessage::UpdateEntity(update)] => {
                assert_eq!(update.index, 7);
                assert_eq!(update.vx, -1);
            }
            other => panic!("expected UpdateEntity, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_everyone_leaving_tears_down_game() {
        let mut hub = hub();
        let host = connect(&mut hub, 1);
        let other = connect(&mut hub, 2);
        send(&mut hub, &host, ClientMessage::StartGame);
        let generation = hub.generation;

        leave(&mut hub, &host);
        assert!(hub.world().is_running());
        leave(&mut hub, &other);

        assert_eq!(hub.world().phase(), GamePhase::NotStarted);
        assert!(hub.world().char(5).is_none());
        assert!(hub.active.is_none());

        hub.handle_game_event(GameEvent::Tick {
            generation,
            ticks: 1,
        });
        assert_eq!(hub.world().phase(), GamePhase::NotStarted);
    }
}
