//! Two-party wager escrow engine.
//!
//! Custodies equal stakes from two players, arbitrates the winner through a
//! pluggable outcome verifier (or an admin override), and disburses the pot
//! minus the platform fee. Asset movement sits behind the [`CustodyAdapter`]
//! seam so native currency and fungible tokens share one lifecycle.

pub mod custody;
pub mod engine;
pub mod error;
pub mod registry;
pub mod storage;
pub mod types;
pub mod verify;

pub use custody::{CustodyAdapter, LedgerSnapshot, MemoryCustody};
pub use engine::{EscrowEngine, DISPUTE_TIMEOUT_HOURS, FEE_PERCENT};
pub use error::{EscrowError, Result};
pub use types::{AccountId, AssetRef, EscrowEvent, Game, GameId, GameStatus};
pub use verify::{participant_binding, BindingVerifier, OutcomeVerifier};
