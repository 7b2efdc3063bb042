use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type GameId = u64;

/// Participant or fee-recipient identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Distinguishes native currency from a specific fungible-token asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetRef {
    Native,
    Token(String),
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetRef::Native => f.write_str("native"),
            AssetRef::Token(symbol) => f.write_str(symbol),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    /// Player1 has deposited, awaiting the second player.
    Created,
    /// Both stakes locked, awaiting resolution.
    Active,
    /// Payout issued. Terminal.
    Resolved,
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameStatus::Created => f.write_str("created"),
            GameStatus::Active => f.write_str("active"),
            GameStatus::Resolved => f.write_str("resolved"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub player1: AccountId,
    pub player2: Option<AccountId>,
    pub wager: u64,
    pub asset: AssetRef,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub winner: Option<AccountId>,
    /// Binding of the participant pair, set when the game activates.
    /// Asserted by the cooperative resolution path.
    pub state_commitment: Option<Vec<u8>>,
}

impl Game {
    /// Lifecycle state, derived from the record so it cannot drift.
    pub fn status(&self) -> GameStatus {
        if self.resolved_at.is_some() {
            GameStatus::Resolved
        } else if self.player2.is_some() {
            GameStatus::Active
        } else {
            GameStatus::Created
        }
    }

    pub fn is_participant(&self, account: &AccountId) -> bool {
        *account == self.player1 || self.player2.as_ref() == Some(account)
    }
}

/// Observable signals, journaled by the engine and mirrored to the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscrowEvent {
    GameCreated {
        id: GameId,
        creator: AccountId,
        wager: u64,
        asset: AssetRef,
    },
    GameJoined {
        id: GameId,
        joiner: AccountId,
    },
    GameResolved {
        id: GameId,
        winner: AccountId,
        net: u64,
    },
    DisputeOpened {
        id: GameId,
        opener: AccountId,
    },
    AdminResolutionApplied {
        id: GameId,
        winner: AccountId,
    },
}
