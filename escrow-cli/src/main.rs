mod commands;

use clap::{Parser, Subcommand};
use escrow_core::{AccountId, BindingVerifier, EscrowEngine, EscrowError};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "escrow")]
#[command(about = "Two-player wager escrow: stake, arbitrate, pay out")]
#[command(version)]
struct Cli {
    /// Data directory for the game database and ledger
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Admin / fee-recipient identity for this escrow instance
    #[arg(long, global = true, default_value = "admin")]
    admin: String,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed an account balance in the local ledger
    Fund {
        /// Account to credit
        account: String,
        /// Amount in smallest units
        amount: u64,
        /// Asset: "native" or a token symbol
        #[arg(long, default_value = "native")]
        asset: String,
    },
    /// Show an account balance
    Balance {
        /// Account to inspect
        account: String,
        /// Asset: "native" or a token symbol
        #[arg(long, default_value = "native")]
        asset: String,
    },
    /// Create a game and lock the creator's stake
    Create {
        /// Creator account
        creator: String,
        /// Wager each side must stake, in smallest units
        wager: u64,
        /// Asset: "native" or a token symbol
        #[arg(long, default_value = "native")]
        asset: String,
    },
    /// Join a game as the second player
    Join {
        /// Game ID to join
        game_id: u64,
        /// Joining account
        joiner: String,
    },
    /// Print the state commitment an active game expects at resolution
    Commitment {
        /// Game ID
        game_id: u64,
    },
    /// Cooperatively resolve a game
    Resolve {
        /// Game ID
        game_id: u64,
        /// Winning account
        winner: String,
        /// State commitment (hex encoded)
        proof: String,
    },
    /// Open a dispute on an aging game
    Dispute {
        /// Game ID
        game_id: u64,
        /// Disputing participant
        caller: String,
    },
    /// Resolve a game by admin override, no proof required
    AdminResolve {
        /// Game ID
        game_id: u64,
        /// Winning account
        winner: String,
    },
    /// Show one game
    Status {
        /// Game ID
        game_id: u64,
    },
    /// List all games
    List,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "escrow={},escrow_core={}",
            log_level, log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Get data directory
    let data_dir = cli.data_dir.unwrap_or_else(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("escrow")
    });
    tokio::fs::create_dir_all(&data_dir).await?;

    // Ledger persists between invocations; game records live in sqlite
    let ledger_path = data_dir.join("ledger.json");
    let custody = Arc::new(commands::load_ledger(&ledger_path)?);
    let engine = EscrowEngine::open(
        &data_dir,
        custody.clone(),
        Arc::new(BindingVerifier),
        AccountId::new(&cli.admin),
    )
    .await?;

    // Execute command
    let result = match cli.command {
        Commands::Fund {
            account,
            amount,
            asset,
        } => commands::fund(&custody, &account, amount, &asset),
        Commands::Balance { account, asset } => commands::balance(&custody, &account, &asset),
        Commands::Create {
            creator,
            wager,
            asset,
        } => commands::create_game(&engine, &creator, wager, &asset).await,
        Commands::Join { game_id, joiner } => commands::join_game(&engine, game_id, &joiner).await,
        Commands::Commitment { game_id } => commands::show_commitment(&engine, game_id),
        Commands::Resolve {
            game_id,
            winner,
            proof,
        } => commands::resolve_game(&engine, game_id, &winner, &proof).await,
        Commands::Dispute { game_id, caller } => commands::open_dispute(&engine, game_id, &caller),
        Commands::AdminResolve { game_id, winner } => {
            commands::admin_resolve(&engine, game_id, &winner).await
        }
        Commands::Status { game_id } => commands::show_status(&engine, game_id),
        Commands::List => commands::list_games(&engine),
    };

    if let Err(e) = result {
        match e.downcast_ref::<EscrowError>() {
            Some(EscrowError::NotFound(id)) => {
                eprintln!("Error: game {} does not exist", id);
                eprintln!("Use 'escrow list' to see known games");
            }
            Some(EscrowError::DisputeTimeoutNotReached { remaining_secs }) => {
                eprintln!(
                    "Error: dispute window not open yet ({}s remaining)",
                    remaining_secs
                );
            }
            Some(EscrowError::TransferFailed(msg)) => {
                eprintln!("Error: transfer failed: {}", msg);
                eprintln!("Use 'escrow fund' to seed local balances");
            }
            _ => eprintln!("Error: {}", e),
        }
        std::process::exit(1);
    }

    commands::save_ledger(&ledger_path, &custody)?;
    Ok(())
}
