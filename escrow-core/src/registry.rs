use crate::error::{EscrowError, Result};
use crate::types::{Game, GameId};
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct RegistryInner {
    games: HashMap<GameId, Game>,
    next_id: GameId,
}

/// Owns the game records and the identifier allocator.
///
/// Identifiers start at 0, increment by 1 per successful insertion and are
/// never reused. There is no public deletion: resolved games stay queryable.
#[derive(Debug, Default)]
pub struct GameRegistry {
    inner: RwLock<RegistryInner>,
}

impl GameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next identifier and store the record built from it.
    /// Allocation and insertion share one critical section.
    pub fn insert(&self, build: impl FnOnce(GameId) -> Game) -> GameId {
        let mut inner = self.inner.write();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.games.insert(id, build(id));
        id
    }

    pub fn get(&self, id: GameId) -> Result<Game> {
        self.inner
            .read()
            .games
            .get(&id)
            .cloned()
            .ok_or(EscrowError::NotFound(id))
    }

    /// Single-writer mutation of one record under the write lock.
    pub fn update<T>(&self, id: GameId, f: impl FnOnce(&mut Game) -> T) -> Result<T> {
        let mut inner = self.inner.write();
        let game = inner.games.get_mut(&id).ok_or(EscrowError::NotFound(id))?;
        Ok(f(game))
    }

    pub fn list(&self) -> Vec<Game> {
        let inner = self.inner.read();
        let mut games: Vec<Game> = inner.games.values().cloned().collect();
        games.sort_by_key(|g| g.id);
        games
    }

    pub fn next_id(&self) -> GameId {
        self.inner.read().next_id
    }

    /// Drop a record whose creation is being rolled back. The allocated
    /// identifier stays burned.
    pub(crate) fn remove(&self, id: GameId) {
        self.inner.write().games.remove(&id);
    }

    /// Reload records and the counter from persisted state.
    pub fn hydrate(&self, games: Vec<Game>, next_id: GameId) {
        let mut inner = self.inner.write();
        let highest = games.iter().map(|g| g.id + 1).max().unwrap_or(0);
        inner.next_id = next_id.max(highest);
        inner.games = games.into_iter().map(|g| (g.id, g)).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountId, AssetRef};
    use chrono::Utc;

    fn record(id: GameId) -> Game {
        Game {
            id,
            player1: AccountId::new("alice"),
            player2: None,
            wager: 100,
            asset: AssetRef::Native,
            created_at: Utc::now(),
            resolved_at: None,
            winner: None,
            state_commitment: None,
        }
    }

    #[test]
    fn identifiers_are_sequential_from_zero() {
        let registry = GameRegistry::new();

        for expected in 0..3 {
            assert_eq!(registry.next_id(), expected);
            let id = registry.insert(record);
            assert_eq!(id, expected);
        }
        assert_eq!(registry.next_id(), 3);
    }

    #[test]
    fn unknown_id_is_not_found() {
        let registry = GameRegistry::new();
        assert!(matches!(registry.get(42), Err(EscrowError::NotFound(42))));
    }

    #[test]
    fn removed_identifiers_are_not_reused() {
        let registry = GameRegistry::new();
        let id = registry.insert(record);
        registry.remove(id);

        assert!(matches!(registry.get(id), Err(EscrowError::NotFound(_))));
        assert_eq!(registry.insert(record), id + 1);
    }

    #[test]
    fn hydrate_restores_counter_past_loaded_games() {
        let registry = GameRegistry::new();
        registry.hydrate(vec![record(0), record(1)], 2);

        assert_eq!(registry.next_id(), 2);
        assert_eq!(registry.insert(record), 2);
    }
}
