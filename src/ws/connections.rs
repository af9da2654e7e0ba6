//! Registry of live WebSocket connections and the players they own
//!
//! A player id is owned by at most one connection: the one it last joined
//! through. Closing a connection only releases the ids it still owns.

use std::collections::BTreeSet;

use dashmap::DashMap;
use uuid::Uuid;

use crate::game::players::PlayerId;
use crate::util::time::unix_millis;

#[derive(Debug, Clone)]
struct ConnectionEntry {
    connected_at: u64,
    players: BTreeSet<PlayerId>,
}

/// Connections keyed by connection id, with a player → connection owner index
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: DashMap<Uuid, ConnectionEntry>,
    owners: DashMap<PlayerId, Uuid>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, connection_id: Uuid) {
        self.connections.insert(
            connection_id,
            ConnectionEntry {
                connected_at: unix_millis(),
                players: BTreeSet::new(),
            },
        );
    }

    /// Hand ownership of a player to the connection it just joined through
    pub fn track_player(&self, connection_id: Uuid, player_id: &str) {
        match self.connections.get_mut(&connection_id) {
            Some(mut entry) => {
                entry.players.insert(player_id.to_string());
            }
            None => return,
        }

        let previous = self.owners.insert(player_id.to_string(), connection_id);
        if let Some(previous) = previous.filter(|prev| *prev != connection_id) {
            if let Some(mut entry) = self.connections.get_mut(&previous) {
                entry.players.remove(player_id);
            }
        }
    }

    /// Forget a player that left, whichever connection owns it
    pub fn untrack_player(&self, player_id: &str) {
        if let Some((_, owner)) = self.owners.remove(player_id) {
            if let Some(mut entry) = self.connections.get_mut(&owner) {
                entry.players.remove(player_id);
            }
        }
    }

    /// Connection currently owning a player
    pub fn owner_of(&self, player_id: &str) -> Option<Uuid> {
        self.owners.get(player_id).map(|owner| *owner)
    }

    /// Remove a connection, returning the players it still owned
    pub fn unregister(&self, connection_id: Uuid) -> Vec<PlayerId> {
        let Some((_, entry)) = self.connections.remove(&connection_id) else {
            return Vec::new();
        };

        entry
            .players
            .into_iter()
            .filter(|player_id| {
                self.owners
                    .remove_if(player_id, |_, owner| *owner == connection_id)
                    .is_some()
            })
            .collect()
    }

    /// Milliseconds since the epoch at which the connection was accepted
    pub fn connected_at(&self, connection_id: Uuid) -> Option<u64> {
        self.connections.get(&connection_id).map(|e| e.connected_at)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregister_returns_players_still_owned() {
        let registry = ConnectionRegistry::new();
        let conn = Uuid::new_v4();
        registry.register(conn);
        registry.track_player(conn, "b");
        registry.track_player(conn, "a");
        registry.track_player(conn, "gone");
        registry.untrack_player("gone");

        assert_eq!(registry.len(), 1);
        assert!(registry.connected_at(conn).is_some());
        assert_eq!(registry.unregister(conn), vec!["a".to_string(), "b".to_string()]);
        assert!(registry.is_empty());
        assert_eq!(registry.owner_of("a"), None);
        assert!(registry.unregister(conn).is_empty());
    }

    #[test]
    fn rejoin_moves_ownership_to_new_connection() {
        let registry = ConnectionRegistry::new();
        let (old, new) = (Uuid::new_v4(), Uuid::new_v4());
        registry.register(old);
        registry.register(new);

        registry.track_player(old, "p");
        registry.track_player(new, "p");
        assert_eq!(registry.owner_of("p"), Some(new));

        assert!(registry.unregister(old).is_empty());
        assert_eq!(registry.owner_of("p"), Some(new));
        assert_eq!(registry.unregister(new), vec!["p".to_string()]);
    }

    #[test]
    fn disconnect_from_another_connection_clears_owner() {
        let registry = ConnectionRegistry::new();
        let (owner, other) = (Uuid::new_v4(), Uuid::new_v4());
        registry.register(owner);
        registry.register(other);
        registry.track_player(owner, "p");

        // `disconnect` for p arrives on a socket that never joined it
        registry.untrack_player("p");
        assert_eq!(registry.owner_of("p"), None);
        assert!(registry.unregister(owner).is_empty());
    }

    #[test]
    fn tracking_unknown_connection_is_ignored() {
        let registry = ConnectionRegistry::new();
        registry.track_player(Uuid::new_v4(), "p");
        assert!(registry.is_empty());
        assert_eq!(registry.owner_of("p"), None);
    }
}
