//! Session state and authoritative tick loop
//!
//! One task owns the whole game state. Inbound events are queued on an
//! mpsc channel and applied one at a time at the start of each tick, so no
//! two mutations of the grid or the player registry ever interleave.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::util::time::{millis_to_ticks, tick_delta, SIMULATION_TPS, SNAPSHOT_TPS, TICK_DURATION_MICROS};
use crate::ws::protocol::{ArenaInfo, GameEvent, ServerMsg};

use super::blast::BlastEngine;
use super::bomb::{Bomb, BombTimers, ExplosionTimers, DEFAULT_BOMB_POWER, DEFAULT_EXPLOSION_MS, DEFAULT_FUSE_MS};
use super::coords::{WorldPos, TILE_SIZE};
use super::grid::GridIndex;
use super::map::{ArenaBounds, MapError, MapLayout};
use super::movement::{MovementInput, MovementResolver, Velocity};
use super::players::{PlayerId, PlayerRegistry, PLAYER_SIZE};
use super::snapshot::SnapshotBuilder;
use super::{SessionEvent, SessionInput};

/// Gameplay tunables for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub bomb_power: u32,
    pub fuse_ticks: u64,
    pub explosion_ticks: u64,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            bomb_power: config.bomb_power,
            fuse_ticks: millis_to_ticks(config.fuse_ms),
            explosion_ticks: millis_to_ticks(config.explosion_ms),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            bomb_power: DEFAULT_BOMB_POWER,
            fuse_ticks: millis_to_ticks(DEFAULT_FUSE_MS),
            explosion_ticks: millis_to_ticks(DEFAULT_EXPLOSION_MS),
        }
    }
}

/// Complete game state of one session (owned by the session task)
pub struct SessionState {
    pub tick: u64,
    pub cols: i32,
    pub rows: i32,
    pub grid: GridIndex,
    pub players: PlayerRegistry,
    pub bombs: BombTimers,
    pub explosions: ExplosionTimers,
    pub bounds: ArenaBounds,
    spawns: [WorldPos; 4],
    resolver: MovementResolver,
    settings: SessionSettings,
}

impl SessionState {
    /// Build a fresh session on a layout. Fails if the layout is corrupt.
    pub fn new(layout: &MapLayout, mut settings: SessionSettings) -> Result<Self, MapError> {
        let grid = layout.build_index()?;

        // No arm can reach further than the arena is wide
        let max_reach = layout.cols.max(layout.rows).max(0) as u32;
        if settings.bomb_power > max_reach {
            warn!(
                bomb_power = settings.bomb_power,
                max_reach,
                "Bomb power exceeds arena size, clamping"
            );
            settings.bomb_power = max_reach;
        }

        info!(
            cols = layout.cols,
            rows = layout.rows,
            walls = grid.wall_count(),
            chests = grid.chest_count(),
            "Arena ready"
        );

        Ok(Self {
            tick: 0,
            cols: layout.cols,
            rows: layout.rows,
            grid,
            players: PlayerRegistry::new(),
            bombs: BombTimers::new(),
            explosions: ExplosionTimers::new(),
            bounds: layout.world_bounds(),
            spawns: layout.spawn_points(),
            resolver: MovementResolver::default(),
            settings,
        })
    }

    pub fn arena_info(&self) -> ArenaInfo {
        ArenaInfo {
            cols: self.cols,
            rows: self.rows,
            tile_size: TILE_SIZE,
            walls: self.grid.walls(),
            chests: self.grid.chests(),
            spawns: self.spawns.to_vec(),
        }
    }

    /// Apply one inbound event
    pub fn apply(&mut self, event: SessionEvent) -> Vec<GameEvent> {
        match event {
            SessionEvent::Join { player_id, spawn } => self.handle_join(player_id, spawn),
            SessionEvent::Movement { player_id, input } => {
                self.handle_movement(&player_id, input);
                Vec::new()
            }
            SessionEvent::MovementEnd { player_id } => {
                self.handle_movement_end(player_id);
                Vec::new()
            }
            SessionEvent::DropBomb { player_id } => self.handle_drop_bomb(&player_id),
            SessionEvent::Disconnect { player_id } => self.handle_disconnect(&player_id),
        }
    }

    fn handle_join(&mut self, player_id: PlayerId, spawn: WorldPos) -> Vec<GameEvent> {
        if !spawn.x.is_finite() || !spawn.y.is_finite() {
            warn!(player_id = %player_id, "Dropping join with non-finite spawn");
            return Vec::new();
        }

        let spawn = self.bounds.clamp(spawn, PLAYER_SIZE / 2.0);
        if self.players.add(player_id.clone(), spawn, self.tick).is_some() {
            debug!(player_id = %player_id, "Duplicate join replaced existing player");
        }

        info!(
            player_id = %player_id,
            x = spawn.x,
            y = spawn.y,
            player_count = self.players.len(),
            "Player joined session"
        );

        vec![GameEvent::PlayerJoined {
            player_id,
            x: spawn.x,
            y: spawn.y,
        }]
    }

    fn handle_movement(&mut self, player_id: &str, input: MovementInput) {
        let Some(velocity) = self.resolver.resolve(input) else {
            warn!(player_id = %player_id, ?input, "Dropping movement with invalid input");
            return;
        };

        if !self.players.set_velocity(player_id, velocity) {
            debug!(player_id = %player_id, "Movement for absent player ignored");
        }
    }

    fn handle_movement_end(&mut self, player_id: Option<PlayerId>) {
        let target = match player_id {
            Some(id) => Some(id),
            None => self.players.sole_player().map(|p| p.id.clone()),
        };

        match target {
            Some(id) => {
                if !self.players.set_velocity(&id, Velocity::ZERO) {
                    debug!(player_id = %id, "Movement end for absent player ignored");
                }
            }
            None => debug!("Movement end without player id and no sole player"),
        }
    }

    fn handle_drop_bomb(&mut self, player_id: &str) -> Vec<GameEvent> {
        let Some(player) = self.players.get(player_id) else {
            debug!(player_id = %player_id, "Bomb drop from absent player ignored");
            return Vec::new();
        };

        let cell = player.cell();
        let bomb = self.bombs.place(
            player.id.clone(),
            cell,
            self.settings.bomb_power,
            self.tick,
            self.settings.fuse_ticks,
        );

        debug!(
            player_id = %player_id,
            bomb_id = %bomb.id,
            cell = %cell,
            detonate_tick = bomb.detonate_tick,
            "Bomb placed"
        );

        vec![GameEvent::BombPlaced {
            bomb_id: bomb.id,
            owner: bomb.owner,
            cell,
            power: bomb.power,
            detonate_tick: bomb.detonate_tick,
        }]
    }

    fn handle_disconnect(&mut self, player_id: &str) -> Vec<GameEvent> {
        match self.players.remove(player_id) {
            Some(_) => {
                info!(
                    player_id = %player_id,
                    player_count = self.players.len(),
                    "Player left session"
                );
                if self.players.is_empty() {
                    info!(tick = self.tick, "Session empty");
                }
                vec![GameEvent::PlayerLeft {
                    player_id: player_id.to_string(),
                    reason: "disconnected".to_string(),
                }]
            }
            None => {
                debug!(player_id = %player_id, "Disconnect for absent player ignored");
                Vec::new()
            }
        }
    }

    /// Run a single simulation tick: move players, detonate due bombs,
    /// expire explosion markers
    pub fn advance(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        self.tick += 1;

        self.players.integrate(tick_delta(), self.bounds);

        if !self.bombs.is_empty() {
            for bomb in self.bombs.take_due(self.tick) {
                events.extend(self.detonate(bomb));
            }
        }

        let expired = self.explosions.take_expired(self.tick);
        if !expired.is_empty() {
            events.push(GameEvent::ExplosionExpired { cells: expired });
        }

        events
    }

    fn detonate(&mut self, bomb: Bomb) -> Vec<GameEvent> {
        let report = BlastEngine::detonate(&mut self.grid, &mut self.players, bomb.origin, bomb.power);
        let cells = report.affected_coords();

        self.explosions
            .add(cells.iter().copied(), self.tick + self.settings.explosion_ticks);

        info!(
            bomb_id = %bomb.id,
            owner = %bomb.owner,
            origin = %report.origin,
            power = report.power,
            cells = cells.len(),
            chests_destroyed = report.destroyed_chests.len(),
            players_eliminated = report.eliminated.len(),
            "Bomb detonated"
        );

        let mut events = vec![GameEvent::Detonation {
            bomb_id: bomb.id,
            origin: bomb.origin,
            cells,
            destroyed_chests: report.destroyed_chests,
            eliminated: report.eliminated.clone(),
        }];

        events.extend(report.eliminated.into_iter().map(|player_id| GameEvent::PlayerLeft {
            player_id,
            reason: "eliminated".to_string(),
        }));

        events
    }
}

/// Counters and arena view shared with HTTP and WebSocket handlers
pub struct SessionShared {
    tick: AtomicU64,
    player_count: AtomicUsize,
    pending_bombs: AtomicUsize,
    arena: RwLock<ArenaInfo>,
}

impl SessionShared {
    fn new(state: &SessionState) -> Self {
        Self {
            tick: AtomicU64::new(state.tick),
            player_count: AtomicUsize::new(state.players.len()),
            pending_bombs: AtomicUsize::new(state.bombs.len()),
            arena: RwLock::new(state.arena_info()),
        }
    }
}

/// Handle to the running session
#[derive(Clone)]
pub struct SessionHandle {
    pub input_tx: mpsc::Sender<SessionInput>,
    pub events_tx: broadcast::Sender<ServerMsg>,
    shared: Arc<SessionShared>,
}

impl SessionHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<ServerMsg> {
        self.events_tx.subscribe()
    }

    pub fn tick(&self) -> u64 {
        self.shared.tick.load(Ordering::Relaxed)
    }

    /// True once the session loop has stopped accepting input
    pub fn is_closed(&self) -> bool {
        self.input_tx.is_closed()
    }

    pub fn player_count(&self) -> usize {
        self.shared.player_count.load(Ordering::Relaxed)
    }

    /// Bombs placed and not yet detonated
    pub fn pending_bombs(&self) -> usize {
        self.shared.pending_bombs.load(Ordering::Relaxed)
    }

    /// Current arena layout, including chests still standing
    pub fn arena(&self) -> ArenaInfo {
        self.shared.arena.read().clone()
    }
}

/// The authoritative game session
pub struct GameSession {
    state: SessionState,
    input_rx: mpsc::Receiver<SessionInput>,
    events_tx: broadcast::Sender<ServerMsg>,
    snapshot_builder: SnapshotBuilder,
    shared: Arc<SessionShared>,
}

impl GameSession {
    /// Create a new session around prepared state
    pub fn new(state: SessionState) -> (Self, SessionHandle) {
        let (input_tx, input_rx) = mpsc::channel(256);
        let (events_tx, _) = broadcast::channel(64);
        let shared = Arc::new(SessionShared::new(&state));

        let handle = SessionHandle {
            input_tx,
            events_tx: events_tx.clone(),
            shared: shared.clone(),
        };

        let session = Self {
            state,
            input_rx,
            events_tx,
            snapshot_builder: SnapshotBuilder::new(SIMULATION_TPS / SNAPSHOT_TPS),
            shared,
        };

        (session, handle)
    }

    /// Run the authoritative tick loop until every handle is dropped
    pub async fn run(mut self) {
        info!("Session started");

        let mut tick_interval = interval(Duration::from_micros(TICK_DURATION_MICROS));
        tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tick_interval.tick().await;

            // Drain input queue
            let (mut events, open) = self.process_inputs();

            // Run simulation tick
            events.extend(self.state.advance());
            self.publish(events);

            if self.snapshot_builder.should_send() {
                let _ = self.events_tx.send(self.snapshot_builder.build(&self.state));
            }

            if !open {
                info!(tick = self.state.tick, "Session input closed, stopping");
                break;
            }
        }
    }

    /// Apply all pending inputs in arrival order.
    /// Returns the produced events and whether the input channel is still open.
    fn process_inputs(&mut self) -> (Vec<GameEvent>, bool) {
        let mut events = Vec::new();
        loop {
            match self.input_rx.try_recv() {
                Ok(input) => {
                    debug!(
                        connection_id = %input.connection_id,
                        received_at = input.received_at,
                        event = ?input.event,
                        "Applying event"
                    );
                    events.extend(self.state.apply(input.event));
                }
                Err(TryRecvError::Empty) => return (events, true),
                Err(TryRecvError::Disconnected) => return (events, false),
            }
        }
    }

    fn publish(&mut self, events: Vec<GameEvent>) {
        self.shared.tick.store(self.state.tick, Ordering::Relaxed);
        self.shared
            .player_count
            .store(self.state.players.len(), Ordering::Relaxed);
        self.shared
            .pending_bombs
            .store(self.state.bombs.len(), Ordering::Relaxed);

        if events.is_empty() {
            return;
        }

        let chests_changed = events.iter().any(|e| {
            matches!(e, GameEvent::Detonation { destroyed_chests, .. } if !destroyed_chests.is_empty())
        });
        if chests_changed {
            self.shared.arena.write().chests = self.state.grid.chests();
        }

        let roster_changed = events.iter().any(|e| {
            matches!(e, GameEvent::PlayerJoined { .. } | GameEvent::PlayerLeft { .. })
        });
        if roster_changed {
            self.snapshot_builder.force_next();
        }

        // Nobody listening is not an error
        let _ = self.events_tx.send(ServerMsg::Events {
            tick: self.state.tick,
            events,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::coords::GridCoord;
    use crate::game::movement::{Axis, KeyState};

    fn open_layout() -> MapLayout {
        MapLayout {
            cols: 12,
            rows: 12,
            walls: vec![],
            chests: vec![],
        }
    }

    fn settings(fuse_ticks: u64) -> SessionSettings {
        SessionSettings {
            bomb_power: 2,
            fuse_ticks,
            explosion_ticks: 3,
        }
    }

    fn join(state: &mut SessionState, id: &str, cell: GridCoord) -> Vec<GameEvent> {
        state.apply(SessionEvent::Join {
            player_id: id.to_string(),
            spawn: cell.center(),
        })
    }

    fn run_until_detonation(state: &mut SessionState) -> Vec<GameEvent> {
        for _ in 0..1000 {
            let events = state.advance();
            if events.iter().any(|e| matches!(e, GameEvent::Detonation { .. })) {
                return events;
            }
        }
        panic!("bomb never detonated");
    }

    #[test]
    fn join_then_disconnect_leaves_nothing() {
        let mut state = SessionState::new(&open_layout(), settings(5)).unwrap();
        let joined = join(&mut state, "p1", GridCoord::new(1, 1));
        assert!(matches!(joined[0], GameEvent::PlayerJoined { .. }));

        let left = state.apply(SessionEvent::Disconnect {
            player_id: "p1".into(),
        });
        assert_eq!(
            left,
            vec![GameEvent::PlayerLeft {
                player_id: "p1".into(),
                reason: "disconnected".into(),
            }]
        );
        assert!(state.players.get("p1").is_none());

        // Repeating it is a quiet no-op
        assert!(state
            .apply(SessionEvent::Disconnect {
                player_id: "p1".into()
            })
            .is_empty());
    }

    #[test]
    fn movement_sets_velocity_and_end_clears_it() {
        let mut state = SessionState::new(&open_layout(), settings(5)).unwrap();
        join(&mut state, "p1", GridCoord::new(3, 3));

        state.apply(SessionEvent::Movement {
            player_id: "p1".into(),
            input: MovementInput::Angle(90.0),
        });
        assert_eq!(state.players.get("p1").unwrap().velocity, Velocity::new(200.0, 0.0));

        let start = state.players.get("p1").unwrap().pos;
        state.advance();
        let moved = state.players.get("p1").unwrap().pos;
        assert!((moved.x - start.x - 200.0 * tick_delta()).abs() < 1e-3);
        assert_eq!(moved.y, start.y);

        state.apply(SessionEvent::MovementEnd {
            player_id: Some("p1".into()),
        });
        assert_eq!(state.players.get("p1").unwrap().velocity, Velocity::ZERO);
    }

    #[test]
    fn key_input_is_accepted_in_process() {
        let mut state = SessionState::new(&open_layout(), settings(5)).unwrap();
        join(&mut state, "local", GridCoord::new(3, 3));

        state.apply(SessionEvent::Movement {
            player_id: "local".into(),
            input: MovementInput::Keys(KeyState {
                horizontal: Axis::Back,
                vertical: Axis::Neutral,
            }),
        });
        assert_eq!(
            state.players.get("local").unwrap().velocity,
            Velocity::new(-200.0, 0.0)
        );
    }

    #[test]
    fn movement_end_without_id_addresses_sole_player() {
        let mut state = SessionState::new(&open_layout(), settings(5)).unwrap();
        join(&mut state, "solo", GridCoord::new(3, 3));
        state.apply(SessionEvent::Movement {
            player_id: "solo".into(),
            input: MovementInput::Angle(0.0),
        });

        state.apply(SessionEvent::MovementEnd { player_id: None });
        assert_eq!(state.players.get("solo").unwrap().velocity, Velocity::ZERO);
    }

    #[test]
    fn movement_end_without_id_is_ignored_with_many_players() {
        let mut state = SessionState::new(&open_layout(), settings(5)).unwrap();
        join(&mut state, "a", GridCoord::new(3, 3));
        join(&mut state, "b", GridCoord::new(5, 3));
        state.apply(SessionEvent::Movement {
            player_id: "a".into(),
            input: MovementInput::Angle(180.0),
        });

        state.apply(SessionEvent::MovementEnd { player_id: None });
        assert_eq!(state.players.get("a").unwrap().velocity, Velocity::new(0.0, -200.0));
    }

    #[test]
    fn events_for_absent_players_are_noops() {
        let mut state = SessionState::new(&open_layout(), settings(5)).unwrap();
        assert!(state
            .apply(SessionEvent::Movement {
                player_id: "ghost".into(),
                input: MovementInput::Angle(90.0),
            })
            .is_empty());
        assert!(state
            .apply(SessionEvent::DropBomb {
                player_id: "ghost".into()
            })
            .is_empty());
        assert!(state.bombs.is_empty());
    }

    #[test]
    fn invalid_angle_leaves_velocity_alone() {
        let mut state = SessionState::new(&open_layout(), settings(5)).unwrap();
        join(&mut state, "p", GridCoord::new(3, 3));
        state.apply(SessionEvent::Movement {
            player_id: "p".into(),
            input: MovementInput::Angle(f32::NAN),
        });
        assert_eq!(state.players.get("p").unwrap().velocity, Velocity::ZERO);
    }

    #[test]
    fn bomb_detonates_after_fuse_at_player_cell() {
        let layout = MapLayout {
            cols: 12,
            rows: 12,
            walls: vec![(5, 3)],
            chests: vec![(3, 1)],
        };
        let mut state = SessionState::new(&layout, settings(4)).unwrap();
        join(&mut state, "bomber", GridCoord::new(3, 3));
        join(&mut state, "bystander", GridCoord::new(8, 8));

        let placed = state.apply(SessionEvent::DropBomb {
            player_id: "bomber".into(),
        });
        let GameEvent::BombPlaced { cell, detonate_tick, .. } = &placed[0] else {
            panic!("expected bomb placement, got {placed:?}");
        };
        assert_eq!(*cell, GridCoord::new(3, 3));
        assert_eq!(*detonate_tick, 4);

        for _ in 0..3 {
            assert!(state.advance().is_empty());
        }
        let events = state.advance();
        assert_eq!(state.tick, 4);

        let GameEvent::Detonation {
            origin,
            destroyed_chests,
            eliminated,
            cells,
            ..
        } = &events[0]
        else {
            panic!("expected detonation, got {events:?}");
        };
        assert_eq!(*origin, GridCoord::new(3, 3));
        assert_eq!(destroyed_chests, &vec![GridCoord::new(3, 1)]);
        assert_eq!(eliminated, &vec!["bomber".to_string()]);
        assert!(!cells.contains(&GridCoord::new(5, 3)));
        assert!(cells.contains(&GridCoord::new(4, 3)));
        assert!(events.contains(&GameEvent::PlayerLeft {
            player_id: "bomber".into(),
            reason: "eliminated".into(),
        }));

        assert!(state.players.get("bomber").is_none());
        assert!(state.players.get("bystander").is_some());
        assert_eq!(state.grid.chest_count(), 0);
    }

    #[test]
    fn dead_player_cannot_drop_bombs() {
        let mut state = SessionState::new(&open_layout(), settings(1)).unwrap();
        join(&mut state, "p", GridCoord::new(3, 3));
        state.apply(SessionEvent::DropBomb { player_id: "p".into() });
        run_until_detonation(&mut state);

        assert!(state
            .apply(SessionEvent::DropBomb { player_id: "p".into() })
            .is_empty());
    }

    #[test]
    fn bomb_outlives_its_owner() {
        let mut state = SessionState::new(&open_layout(), settings(3)).unwrap();
        join(&mut state, "owner", GridCoord::new(3, 3));
        join(&mut state, "victim", GridCoord::new(4, 3));
        state.apply(SessionEvent::DropBomb {
            player_id: "owner".into(),
        });
        state.apply(SessionEvent::Disconnect {
            player_id: "owner".into(),
        });

        let events = run_until_detonation(&mut state);
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::Detonation { eliminated, .. } if eliminated == &vec!["victim".to_string()]
        )));
    }

    #[test]
    fn explosion_markers_expire_after_lifetime() {
        let mut state = SessionState::new(&open_layout(), settings(1)).unwrap();
        join(&mut state, "p", GridCoord::new(5, 5));
        state.apply(SessionEvent::DropBomb { player_id: "p".into() });
        run_until_detonation(&mut state);
        assert!(!state.explosions.live().is_empty());

        state.advance();
        state.advance();
        let events = state.advance();
        let GameEvent::ExplosionExpired { cells } = &events[0] else {
            panic!("expected expiry, got {events:?}");
        };
        assert_eq!(cells.len(), 9);
        assert!(state.explosions.live().is_empty());
    }

    #[test]
    fn bomb_power_is_clamped_to_arena_extent() {
        let mut oversized = settings(5);
        oversized.bomb_power = 64;
        let mut state = SessionState::new(&open_layout(), oversized).unwrap();
        join(&mut state, "p1", GridCoord::new(3, 3));

        let events = state.apply(SessionEvent::DropBomb {
            player_id: "p1".into(),
        });
        assert!(matches!(
            events.as_slice(),
            [GameEvent::BombPlaced { power: 12, .. }]
        ));

        let events = run_until_detonation(&mut state);
        let Some(GameEvent::Detonation { cells, .. }) = events.first() else {
            panic!("expected detonation first");
        };
        // Four arms of twelve steps around the shared origin cell
        assert_eq!(cells.len(), 4 * 12 + 1);
    }

    #[test]
    fn corrupt_layout_is_rejected() {
        let layout = MapLayout {
            cols: 5,
            rows: 5,
            walls: vec![(2, 2), (2, 2)],
            chests: vec![],
        };
        assert!(SessionState::new(&layout, SessionSettings::default()).is_err());
    }

    #[tokio::test]
    async fn session_loop_publishes_results() {
        let mut state = SessionState::new(&open_layout(), settings(2)).unwrap();
        state.apply(SessionEvent::Join {
            player_id: "seed".into(),
            spawn: GridCoord::new(8, 8).center(),
        });
        let (session, handle) = GameSession::new(state);
        let mut rx = handle.subscribe();
        let task = tokio::spawn(session.run());

        let connection_id = uuid::Uuid::new_v4();
        for event in [
            SessionEvent::Join {
                player_id: "p1".into(),
                spawn: GridCoord::new(2, 2).center(),
            },
            SessionEvent::DropBomb {
                player_id: "p1".into(),
            },
        ] {
            handle
                .input_tx
                .send(SessionInput {
                    connection_id,
                    event,
                    received_at: 0,
                })
                .await
                .unwrap();
        }

        let detonation = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Ok(ServerMsg::Events { events, .. }) = rx.recv().await {
                    if let Some(d) = events
                        .into_iter()
                        .find(|e| matches!(e, GameEvent::Detonation { .. }))
                    {
                        return d;
                    }
                }
            }
        })
        .await
        .expect("detonation published");

        let GameEvent::Detonation { eliminated, .. } = detonation else {
            unreachable!()
        };
        assert_eq!(eliminated, vec!["p1".to_string()]);
        assert_eq!(handle.player_count(), 1);
        assert_eq!(handle.pending_bombs(), 0);

        drop(rx);
        drop(handle);
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("session stops once handles are gone")
            .unwrap();
    }
}
