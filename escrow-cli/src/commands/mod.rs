use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Table};
use escrow_core::{
    AccountId, AssetRef, EscrowEngine, Game, GameId, GameStatus, LedgerSnapshot, MemoryCustody,
    FEE_PERCENT,
};
use std::path::Path;

fn parse_asset(asset: &str) -> AssetRef {
    if asset.eq_ignore_ascii_case("native") {
        AssetRef::Native
    } else {
        AssetRef::Token(asset.to_uppercase())
    }
}

/// Exact native attachment for a well-behaved caller; tokens attach nothing.
fn attachment_for(game: &Game) -> u64 {
    match game.asset {
        AssetRef::Native => game.wager,
        AssetRef::Token(_) => 0,
    }
}

pub fn load_ledger(path: &Path) -> Result<MemoryCustody> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let snapshot: LedgerSnapshot = serde_json::from_str(&content)?;
        Ok(MemoryCustody::restore(snapshot))
    } else {
        Ok(MemoryCustody::new())
    }
}

pub fn save_ledger(path: &Path, custody: &MemoryCustody) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(&custody.snapshot())?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn fund(custody: &MemoryCustody, account: &str, amount: u64, asset: &str) -> Result<()> {
    let account = AccountId::new(account);
    let asset = parse_asset(asset);
    custody.credit(&account, amount, &asset);

    println!(
        "Credited {} {} to {} (balance: {})",
        amount,
        asset,
        account,
        custody.balance(&account, &asset)
    );
    Ok(())
}

pub fn balance(custody: &MemoryCustody, account: &str, asset: &str) -> Result<()> {
    let account = AccountId::new(account);
    let asset = parse_asset(asset);

    println!("{}: {} {}", account, custody.balance(&account, &asset), asset);
    Ok(())
}

pub async fn create_game(
    engine: &EscrowEngine,
    creator: &str,
    wager: u64,
    asset: &str,
) -> Result<()> {
    let creator = AccountId::new(creator);
    let asset = parse_asset(asset);
    let attached = match asset {
        AssetRef::Native => wager,
        AssetRef::Token(_) => 0,
    };

    let id = engine
        .create_game(&creator, wager, asset.clone(), attached)
        .await?;

    println!("Created game {}", id);
    println!("Stake: {} {} per side", wager, asset);
    println!("Waiting for a second player...");
    println!();
    println!("Share this command with your opponent:");
    println!("escrow join {} <their-account>", id);
    Ok(())
}

pub async fn join_game(engine: &EscrowEngine, game_id: GameId, joiner: &str) -> Result<()> {
    let joiner = AccountId::new(joiner);
    let game = engine.game(game_id)?;

    engine
        .join_game(game_id, &joiner, attachment_for(&game))
        .await?;

    println!("Joined game {} with {} {}", game_id, game.wager, game.asset);
    println!("Game is now active. Resolve it with:");
    println!("escrow resolve {} <winner> $(escrow commitment {})", game_id, game_id);
    Ok(())
}

pub fn show_commitment(engine: &EscrowEngine, game_id: GameId) -> Result<()> {
    let game = engine.game(game_id)?;

    match game.state_commitment {
        Some(commitment) => println!("{}", hex::encode(commitment)),
        None => println!("Game {} has no commitment yet (no second player)", game_id),
    }
    Ok(())
}

pub async fn resolve_game(
    engine: &EscrowEngine,
    game_id: GameId,
    winner: &str,
    proof: &str,
) -> Result<()> {
    let winner = AccountId::new(winner);
    let proof = hex::decode(proof.trim())?;

    engine.resolve_game(game_id, &winner, &proof).await?;

    let game = engine.game(game_id)?;
    let total_pot = game.wager * 2;
    let fee = total_pot * FEE_PERCENT / 100;
    println!("Game {} resolved", game_id);
    println!("{} receives {} {}", winner, total_pot - fee, game.asset);
    println!("Platform fee: {} {}", fee, game.asset);
    Ok(())
}

pub fn open_dispute(engine: &EscrowEngine, game_id: GameId, caller: &str) -> Result<()> {
    let caller = AccountId::new(caller);
    engine.open_dispute(&caller, game_id)?;

    println!("Dispute opened on game {}", game_id);
    println!("An operator can now apply an override with 'escrow admin-resolve'");
    Ok(())
}

pub async fn admin_resolve(engine: &EscrowEngine, game_id: GameId, winner: &str) -> Result<()> {
    let winner = AccountId::new(winner);

    let confirmed = dialoguer::Confirm::new()
        .with_prompt(format!(
            "Override game {} and pay the pot to {}?",
            game_id, winner
        ))
        .default(false)
        .interact()?;
    if !confirmed {
        println!("Aborted");
        return Ok(());
    }

    let admin = engine.admin().clone();
    engine.admin_resolve(&admin, game_id, &winner).await?;

    println!("Game {} resolved by admin override; {} paid out", game_id, winner);
    Ok(())
}

pub fn show_status(engine: &EscrowEngine, game_id: GameId) -> Result<()> {
    let game = engine.game(game_id)?;

    println!("Game {}", game.id);
    println!("  Status:   {}", game.status());
    println!("  Player 1: {}", game.player1);
    println!(
        "  Player 2: {}",
        game.player2
            .as_ref()
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    println!("  Wager:    {} {} per side", game.wager, game.asset);
    println!("  Created:  {}", game.created_at);
    if let Some(resolved_at) = game.resolved_at {
        println!("  Resolved: {}", resolved_at);
    }
    if let Some(winner) = &game.winner {
        println!("  Winner:   {}", winner);
    }
    Ok(())
}

pub fn list_games(engine: &EscrowEngine) -> Result<()> {
    let games = engine.games();
    if games.is_empty() {
        println!("No games yet. Start one with 'escrow create'.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        "ID", "Status", "Player 1", "Player 2", "Wager", "Asset", "Winner",
    ]);

    for game in games {
        table.add_row(vec![
            game.id.to_string(),
            game.status().to_string(),
            game.player1.to_string(),
            game.player2
                .as_ref()
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string()),
            game.wager.to_string(),
            game.asset.to_string(),
            game.winner
                .as_ref()
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }

    println!("{}", table);

    let open = engine
        .games()
        .iter()
        .filter(|g| g.status() != GameStatus::Resolved)
        .count();
    println!("{} game(s) awaiting players or resolution", open);
    Ok(())
}
