use crate::types::GameId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EscrowError>;

#[derive(Error, Debug)]
pub enum EscrowError {
    #[error("Invalid wager: {0}")]
    InvalidWager(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Game {0} is not active")]
    GameNotActive(GameId),

    #[error("Invalid resolution: {0}")]
    InvalidResolution(String),

    #[error("Dispute timeout not reached: {remaining_secs}s remaining")]
    DisputeTimeoutNotReached { remaining_secs: i64 },

    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    #[error("Game not found: {0}")]
    NotFound(GameId),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EscrowError {
    pub fn invalid_wager(msg: impl Into<String>) -> Self {
        Self::InvalidWager(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn invalid_resolution(msg: impl Into<String>) -> Self {
        Self::InvalidResolution(msg.into())
    }

    pub fn transfer_failed(msg: impl Into<String>) -> Self {
        Self::TransferFailed(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
