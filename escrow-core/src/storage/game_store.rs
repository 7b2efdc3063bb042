use crate::error::{EscrowError, Result};
use crate::storage::Storage;
use crate::types::{AccountId, AssetRef, Game, GameId};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

pub struct GameStore<'a> {
    storage: &'a Storage,
}

impl<'a> GameStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub async fn save_game(&self, game: &Game) -> Result<()> {
        let conn = self.storage.get_connection().await;

        let asset_json = serde_json::to_string(&game.asset)?;

        conn.execute(
            "INSERT OR REPLACE INTO games
             (id, player1, player2, wager, asset, created_at, resolved_at, winner, state_commitment)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                game.id as i64,
                game.player1.as_str(),
                game.player2.as_ref().map(|p| p.as_str().to_string()),
                game.wager as i64,
                asset_json,
                game.created_at.timestamp(),
                game.resolved_at.map(|t| t.timestamp()),
                game.winner.as_ref().map(|p| p.as_str().to_string()),
                game.state_commitment.as_deref(),
            ],
        )?;

        Ok(())
    }

    pub async fn load_games(&self) -> Result<Vec<Game>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(
            "SELECT id, player1, player2, wager, asset, created_at, resolved_at, winner, state_commitment
             FROM games ORDER BY id ASC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, Option<i64>>(6)?,
                row.get::<_, Option<String>>(7)?,
                row.get::<_, Option<Vec<u8>>>(8)?,
            ))
        })?;

        let mut games = Vec::new();
        for row in rows {
            let (id, player1, player2, wager, asset_json, created_at, resolved_at, winner, commitment) =
                row?;
            let asset: AssetRef = serde_json::from_str(&asset_json)?;

            games.push(Game {
                id: id as GameId,
                player1: AccountId::new(player1),
                player2: player2.map(AccountId::new),
                wager: wager as u64,
                asset,
                created_at: timestamp_to_datetime(created_at)?,
                resolved_at: resolved_at.map(timestamp_to_datetime).transpose()?,
                winner: winner.map(AccountId::new),
                state_commitment: commitment,
            });
        }

        Ok(games)
    }

    pub async fn save_next_id(&self, next_id: GameId) -> Result<()> {
        let conn = self.storage.get_connection().await;

        conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES ('next_game_id', ?1)",
            params![next_id as i64],
        )?;

        Ok(())
    }

    pub async fn load_next_id(&self) -> Result<GameId> {
        let conn = self.storage.get_connection().await;

        let value: Option<i64> = conn
            .query_row("SELECT value FROM meta WHERE key = 'next_game_id'", [], |row| {
                row.get(0)
            })
            .optional()?;

        Ok(value.unwrap_or(0) as GameId)
    }
}

fn timestamp_to_datetime(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| EscrowError::internal(format!("Invalid timestamp in storage: {}", secs)))
}
