//! Cairn daemon: runs an in-memory node and offers fee and nonce utilities.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;

use cairn_node::{init_logging, CairnNode, NodeConfig, ShutdownController, SyncedClock};
use cairn_nullables::NullRepository;
use cairn_transactions::Transaction;
use cairn_types::{LedgerParams, TransactionType};
use cairn_work::WorkGenerator;

#[derive(Parser)]
#[command(name = "cairn-daemon", about = "Cairn ledger node daemon")]
struct Cli {
    /// Path to a TOML configuration file. CLI flags and env vars override it.
    #[arg(long, env = "CAIRN_CONFIG")]
    config: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "CAIRN_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "CAIRN_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the node until SIGINT/SIGTERM.
    Run {
        /// Seconds between unconfirmed-pool sweeps.
        #[arg(long, env = "CAIRN_SWEEP_INTERVAL")]
        sweep_interval: Option<u64>,

        /// Print Prometheus metrics on shutdown.
        #[arg(long, env = "CAIRN_ENABLE_METRICS")]
        metrics: bool,
    },
    /// Minimum fee for a hex-encoded transaction.
    Fee {
        /// The encoded transaction, hex.
        tx_hex: String,
    },
    /// Find a proof-of-work nonce for a hex-encoded, not yet signed transaction
    /// and print it re-encoded with the nonce filled in.
    Nonce {
        tx_hex: String,

        /// Leading zero bits required; defaults to the configured difficulty
        /// for the transaction's type.
        #[arg(long)]
        difficulty: Option<u32>,
    },
    /// Print the effective configuration as TOML.
    Config,
}

fn load_config(cli: &Cli) -> anyhow::Result<NodeConfig> {
    let mut config = match &cli.config {
        Some(path) => NodeConfig::from_toml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => NodeConfig::default(),
    };
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.log_format = format.clone();
    }
    Ok(config)
}

fn decode_transaction(tx_hex: &str) -> anyhow::Result<Transaction> {
    let bytes = hex::decode(tx_hex.trim()).context("transaction is not valid hex")?;
    Transaction::from_bytes(&bytes).context("transaction does not decode")
}

/// The configured difficulty for a nonce-secured type. CHAT takes the
/// unfunded target, which also satisfies the funded one.
fn default_difficulty(tx_type: TransactionType, params: &LedgerParams) -> Option<u32> {
    let pow = &params.pow;
    match tx_type {
        TransactionType::Chat => Some(pow.chat_unfunded_difficulty.max(pow.chat_funded_difficulty)),
        TransactionType::Message => Some(pow.message_difficulty),
        TransactionType::Presence => Some(pow.presence_difficulty),
        TransactionType::Publicize => Some(pow.publicize_difficulty),
        _ => None,
    }
}

async fn run_node(config: NodeConfig) -> anyhow::Result<()> {
    let clock = Arc::new(SyncedClock::trusting_host());
    let node = Arc::new(CairnNode::new(NullRepository::new(), config.clone(), clock));
    let shutdown = ShutdownController::new();

    tracing::info!(
        sweep_interval_secs = config.sweep_interval_secs,
        submit_timeout_ms = config.submit_timeout_ms,
        "starting Cairn node with in-memory storage"
    );
    let sweeper = node.spawn_sweeper(config.sweep_interval(), shutdown.subscribe());

    shutdown
        .wait_for_signal()
        .await
        .context("installing signal handlers")?;
    sweeper.await.context("sweep task")?;

    if config.enable_metrics {
        println!("{}", node.metrics().render()?);
    }
    tracing::info!("Cairn node stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(&cli)?;
    init_logging(config.log_format()?, &config.log_level);

    match cli.command {
        Command::Run {
            sweep_interval,
            metrics,
        } => {
            if let Some(secs) = sweep_interval {
                if secs == 0 {
                    bail!("--sweep-interval must be positive");
                }
                config.sweep_interval_secs = secs;
            }
            config.enable_metrics |= metrics;
            run_node(config).await
        }
        Command::Fee { tx_hex } => {
            let tx = decode_transaction(&tx_hex)?;
            let len = tx.encoded_len()?;
            println!(
                "{} bytes, {}: minimum fee {}",
                len,
                tx.tx_type(),
                config.ledger.recommended_fee(len).max(config.ledger.unit_fee)
            );
            Ok(())
        }
        Command::Nonce { tx_hex, difficulty } => {
            let mut tx = decode_transaction(&tx_hex)?;
            let Some(difficulty) =
                difficulty.or_else(|| default_difficulty(tx.tx_type(), &config.ledger))
            else {
                bail!("{} transactions carry no nonce", tx.tx_type());
            };

            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.work_threads.max(1))
                .build()
                .context("building work thread pool")?;
            let data = tx.pow_bytes()?;
            let buffer_bytes = config.ledger.pow.buffer_bytes;
            let nonce = pool.install(|| WorkGenerator::new().generate(&data, buffer_bytes, difficulty))?;

            tx.body.set_nonce(nonce);
            tracing::info!(nonce, difficulty, "nonce found");
            println!("{}", hex::encode(tx.to_bytes()?));
            Ok(())
        }
        Command::Config => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}
