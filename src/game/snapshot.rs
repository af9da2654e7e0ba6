//! Snapshot building for the presentation layer

use crate::ws::protocol::{BombSnapshot, PlayerSnapshot, ServerMsg};

use super::SessionState;

/// Builds periodic full-state snapshots
pub struct SnapshotBuilder {
    /// Tick counter since last snapshot
    ticks_since_snapshot: u32,
    /// Snapshot interval in ticks
    snapshot_interval: u32,
}

impl SnapshotBuilder {
    pub fn new(snapshot_interval: u32) -> Self {
        Self {
            ticks_since_snapshot: 0,
            snapshot_interval: snapshot_interval.max(1),
        }
    }

    /// Check if it's time to send a snapshot
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_snapshot += 1;
        if self.ticks_since_snapshot >= self.snapshot_interval {
            self.ticks_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    /// Force snapshot on next check (used after joins, leaves and detonations)
    pub fn force_next(&mut self) {
        self.ticks_since_snapshot = self.snapshot_interval;
    }

    /// Build a snapshot message
    pub fn build(&self, state: &SessionState) -> ServerMsg {
        let mut players: Vec<PlayerSnapshot> = Vec::with_capacity(state.players.len());
        state.players.for_each(|p| {
            players.push(PlayerSnapshot {
                player_id: p.id.clone(),
                x: p.pos.x,
                y: p.pos.y,
                vel_x: p.velocity.x,
                vel_y: p.velocity.y,
                joined_tick: p.joined_tick,
            })
        });
        players.sort_by(|a, b| a.player_id.cmp(&b.player_id));

        let bombs = state
            .bombs
            .pending()
            .iter()
            .map(|b| BombSnapshot {
                bomb_id: b.id,
                cell: b.origin,
                placed_tick: b.placed_tick,
                detonate_tick: b.detonate_tick,
            })
            .collect();

        let mut explosions: Vec<_> = state.explosions.live().iter().map(|e| e.coord).collect();
        explosions.sort_unstable();
        explosions.dedup();

        ServerMsg::Snapshot {
            tick: state.tick,
            players,
            bombs,
            explosions,
            chests_remaining: state.grid.chest_count(),
        }
    }
}
