use crate::custody::CustodyAdapter;
use crate::error::{EscrowError, Result};
use crate::registry::GameRegistry;
use crate::storage::{GameStore, Storage};
use crate::types::{AccountId, AssetRef, EscrowEvent, Game, GameId, GameStatus};
use crate::verify::{participant_binding, OutcomeVerifier};
use chrono::{Duration, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// Platform fee taken from the pot on resolution, in percent.
pub const FEE_PERCENT: u64 = 10;

/// Hours a game must age before a participant can escalate it.
pub const DISPUTE_TIMEOUT_HOURS: i64 = 2;

/// The wager escrow engine: custodies two equal stakes per game, arbitrates
/// the winner and disburses the pot minus the platform fee.
///
/// The admin identity is bound at construction and doubles as the fee
/// recipient. Every public operation is all-or-nothing: on error, game state
/// is restored and any locked stake from this call is returned.
pub struct EscrowEngine {
    registry: GameRegistry,
    custody: Arc<dyn CustodyAdapter>,
    verifier: Arc<dyn OutcomeVerifier>,
    admin: AccountId,
    storage: Option<Arc<Storage>>,
    in_flight: Mutex<HashSet<GameId>>,
    events: RwLock<Vec<EscrowEvent>>,
}

/// Marker for a state-mutating operation on one game. A second operation on
/// the same identifier while one is executing, including a reentrant call
/// made from inside a custody transfer, is rejected.
struct OpGuard<'a> {
    engine: &'a EscrowEngine,
    id: GameId,
}

impl Drop for OpGuard<'_> {
    fn drop(&mut self) {
        self.engine.in_flight.lock().remove(&self.id);
    }
}

impl EscrowEngine {
    pub fn new(
        custody: Arc<dyn CustodyAdapter>,
        verifier: Arc<dyn OutcomeVerifier>,
        admin: AccountId,
    ) -> Self {
        Self {
            registry: GameRegistry::new(),
            custody,
            verifier,
            admin,
            storage: None,
            in_flight: Mutex::new(HashSet::new()),
            events: RwLock::new(Vec::new()),
        }
    }

    /// Open an engine whose games persist under `data_dir`.
    pub async fn open(
        data_dir: &Path,
        custody: Arc<dyn CustodyAdapter>,
        verifier: Arc<dyn OutcomeVerifier>,
        admin: AccountId,
    ) -> Result<Self> {
        let storage = Arc::new(Storage::new(&data_dir.join("escrow.db")).await?);
        let store = GameStore::new(&storage);
        let games = store.load_games().await?;
        let next_id = store.load_next_id().await?;

        let mut engine = Self::new(custody, verifier, admin);
        engine.registry.hydrate(games, next_id);
        engine.storage = Some(storage);
        Ok(engine)
    }

    pub fn admin(&self) -> &AccountId {
        &self.admin
    }

    pub fn game(&self, id: GameId) -> Result<Game> {
        self.registry.get(id)
    }

    pub fn games(&self) -> Vec<Game> {
        self.registry.list()
    }

    /// Signals emitted by this engine instance, oldest first.
    pub fn events(&self) -> Vec<EscrowEvent> {
        self.events.read().clone()
    }

    /// Lock the creator's stake and register a new game awaiting a second
    /// player. Returns the allocated identifier.
    pub async fn create_game(
        &self,
        creator: &AccountId,
        wager: u64,
        asset: AssetRef,
        attached: u64,
    ) -> Result<GameId> {
        validate_stake(wager, &asset, attached)?;

        self.custody.deposit(creator, wager, &asset).await?;

        let id = self.registry.insert(|id| Game {
            id,
            player1: creator.clone(),
            player2: None,
            wager,
            asset: asset.clone(),
            created_at: Utc::now(),
            resolved_at: None,
            winner: None,
            state_commitment: None,
        });

        let game = self.registry.get(id)?;
        if let Err(e) = self.persist(&game).await {
            self.registry.remove(id);
            self.refund(creator, wager, &asset, "create").await;
            return Err(e);
        }

        tracing::info!("Game {} created by {} ({} {})", id, creator, wager, asset);
        self.emit(EscrowEvent::GameCreated {
            id,
            creator: creator.clone(),
            wager,
            asset,
        });
        Ok(id)
    }

    /// Lock the second stake and activate the game.
    pub async fn join_game(&self, id: GameId, joiner: &AccountId, attached: u64) -> Result<()> {
        let _op = self.begin_op(id)?;

        let game = self.registry.get(id)?;
        if game.status() != GameStatus::Created {
            return Err(EscrowError::GameNotActive(id));
        }
        validate_attachment(game.wager, &game.asset, attached)?;

        self.custody.deposit(joiner, game.wager, &game.asset).await?;

        let binding = participant_binding(id, &game.player1, joiner);
        self.registry.update(id, |g| {
            g.player2 = Some(joiner.clone());
            g.state_commitment = Some(binding);
        })?;

        let updated = self.registry.get(id)?;
        if let Err(e) = self.persist(&updated).await {
            self.registry.update(id, |g| {
                g.player2 = None;
                g.state_commitment = None;
            })?;
            self.refund(joiner, game.wager, &game.asset, "join").await;
            return Err(e);
        }

        tracing::info!("Player {} joined game {}", joiner, id);
        self.emit(EscrowEvent::GameJoined {
            id,
            joiner: joiner.clone(),
        });
        Ok(())
    }

    /// Cooperative resolution: the submitted proof must satisfy the outcome
    /// verifier before the pot is disbursed. Pays out exactly once.
    pub async fn resolve_game(&self, id: GameId, winner: &AccountId, proof: &[u8]) -> Result<()> {
        let _op = self.begin_op(id)?;

        let game = self.registry.get(id)?;
        if game.status() != GameStatus::Active {
            return Err(EscrowError::GameNotActive(id));
        }
        if !game.is_participant(winner) {
            return Err(EscrowError::invalid_resolution(format!(
                "{} is not a participant of game {}",
                winner, id
            )));
        }
        if !self.verifier.verify(&game, winner, proof) {
            return Err(EscrowError::invalid_resolution("state commitment mismatch"));
        }

        self.settle(id, winner).await
    }

    /// Timeout-gated escalation signal. Changes no game state and triggers
    /// no payout.
    pub fn open_dispute(&self, caller: &AccountId, id: GameId) -> Result<()> {
        let game = self.registry.get(id)?;
        if !game.is_participant(caller) {
            return Err(EscrowError::unauthorized(format!(
                "{} is not a participant of game {}",
                caller, id
            )));
        }
        if game.status() == GameStatus::Resolved {
            return Err(EscrowError::GameNotActive(id));
        }

        let timeout = Duration::hours(DISPUTE_TIMEOUT_HOURS);
        let elapsed = Utc::now() - game.created_at;
        if elapsed < timeout {
            return Err(EscrowError::DisputeTimeoutNotReached {
                remaining_secs: (timeout - elapsed).num_seconds(),
            });
        }

        tracing::warn!("Dispute opened on game {} by {}", id, caller);
        self.emit(EscrowEvent::DisputeOpened {
            id,
            opener: caller.clone(),
        });
        Ok(())
    }

    /// Privileged resolution: bypasses outcome verification entirely.
    /// Only the admin identity bound at construction may call this.
    pub async fn admin_resolve(
        &self,
        caller: &AccountId,
        id: GameId,
        winner: &AccountId,
    ) -> Result<()> {
        if *caller != self.admin {
            return Err(EscrowError::unauthorized(format!(
                "{} is not the platform admin",
                caller
            )));
        }

        let _op = self.begin_op(id)?;

        let game = self.registry.get(id)?;
        if game.status() != GameStatus::Active {
            return Err(EscrowError::GameNotActive(id));
        }
        if !game.is_participant(winner) {
            return Err(EscrowError::invalid_resolution(format!(
                "{} is not a participant of game {}",
                winner, id
            )));
        }

        self.settle(id, winner).await?;

        tracing::warn!("Admin override resolved game {} for {}", id, winner);
        self.emit(EscrowEvent::AdminResolutionApplied {
            id,
            winner: winner.clone(),
        });
        Ok(())
    }

    /// Disburse the pot: mark the game resolved, then pay the winner and
    /// the fee recipient. Any transfer failure restores the record.
    async fn settle(&self, id: GameId, winner: &AccountId) -> Result<()> {
        let game = self.registry.get(id)?;
        if game.resolved_at.is_some() {
            return Err(EscrowError::GameNotActive(id));
        }

        let total_pot = game
            .wager
            .checked_mul(2)
            .ok_or_else(|| EscrowError::internal("pot overflows u64"))?;
        let fee = total_pot * FEE_PERCENT / 100;
        let net = total_pot - fee;

        // The record turns Resolved and is persisted before any value
        // leaves custody, so a reentrant call observes a terminal game.
        let resolved_at = Utc::now();
        self.registry.update(id, |g| {
            g.resolved_at = Some(resolved_at);
            g.winner = Some(winner.clone());
        })?;

        let resolved = self.registry.get(id)?;
        if let Err(e) = self.persist(&resolved).await {
            self.revert_resolution(id)?;
            return Err(e);
        }

        if let Err(e) = self.disburse(&game, winner, net, fee).await {
            self.revert_resolution(id)?;
            let reverted = self.registry.get(id)?;
            if let Err(pe) = self.persist(&reverted).await {
                tracing::error!("Failed to persist rollback of game {}: {}", id, pe);
            }
            return Err(e);
        }

        tracing::info!(
            "Game {} resolved: {} receives {} {} (fee {})",
            id,
            winner,
            net,
            game.asset,
            fee
        );
        self.emit(EscrowEvent::GameResolved {
            id,
            winner: winner.clone(),
            net,
        });
        Ok(())
    }

    async fn disburse(&self, game: &Game, winner: &AccountId, net: u64, fee: u64) -> Result<()> {
        self.custody.payout(winner, net, &game.asset).await?;
        self.custody.payout(&self.admin, fee, &game.asset).await?;
        Ok(())
    }

    fn revert_resolution(&self, id: GameId) -> Result<()> {
        self.registry.update(id, |g| {
            g.resolved_at = None;
            g.winner = None;
        })
    }

    /// Return a stake locked earlier in this call. Failure here is logged,
    /// not propagated: the original error is the one the caller must see.
    async fn refund(&self, account: &AccountId, amount: u64, asset: &AssetRef, during: &str) {
        if let Err(e) = self.custody.payout(account, amount, asset).await {
            tracing::error!("Failed to refund {} after aborted {}: {}", account, during, e);
        }
    }

    fn begin_op(&self, id: GameId) -> Result<OpGuard<'_>> {
        let mut in_flight = self.in_flight.lock();
        if !in_flight.insert(id) {
            return Err(EscrowError::GameNotActive(id));
        }
        Ok(OpGuard { engine: self, id })
    }

    fn emit(&self, event: EscrowEvent) {
        self.events.write().push(event);
    }

    async fn persist(&self, game: &Game) -> Result<()> {
        if let Some(storage) = &self.storage {
            let store = GameStore::new(storage);
            store.save_game(game).await?;
            store.save_next_id(self.registry.next_id()).await?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn backdate_game(&self, id: GameId, created_at: chrono::DateTime<Utc>) {
        self.registry
            .update(id, |g| g.created_at = created_at)
            .expect("game exists");
    }
}

fn validate_stake(wager: u64, asset: &AssetRef, attached: u64) -> Result<()> {
    if wager == 0 {
        return Err(EscrowError::invalid_wager("wager must be positive"));
    }
    if wager > u64::MAX / 2 {
        return Err(EscrowError::invalid_wager("wager too large to pay out"));
    }
    validate_attachment(wager, asset, attached)
}

/// Native deposits must attach exactly the wager; token deposits are pulled
/// by the custody adapter and must attach nothing.
fn validate_attachment(wager: u64, asset: &AssetRef, attached: u64) -> Result<()> {
    match asset {
        AssetRef::Native if attached != wager => Err(EscrowError::invalid_wager(format!(
            "attached {} does not match wager {}",
            attached, wager
        ))),
        AssetRef::Token(_) if attached != 0 => Err(EscrowError::invalid_wager(
            "token games must not attach native value",
        )),
        _ => Ok(()),
    }
}
