use clap::{Parser, Subcommand};
use dvm::{DvmConfig, JobOrchestrator, OllamaGenerator, unix_now};
use nostr_client::RelayPool;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::prelude::*;

/// How long in-flight jobs get to publish after ctrl-c.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "dvm", about = "NIP-90 text generation service", version)]
struct Cli {
    /// Config file path (default: ~/.config/dvm/config.toml)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Connect to relays and answer job requests until ctrl-c
    Run {
        /// Relay URL (repeatable, replaces configured relays)
        #[arg(long = "relay")]
        relays: Vec<String>,
    },
    /// Print the service public key
    Pubkey,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = DvmConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Pubkey => {
            let keys = config.load_secret_key()?;
            println!("{}", keys.public_key_hex());
            Ok(())
        }
        Command::Run { relays } => {
            if !relays.is_empty() {
                config = config.with_relays(relays);
            }
            init_tracing(&config.log_filter);
            run(config).await
        }
    }
}

async fn run(config: DvmConfig) -> anyhow::Result<()> {
    config.validate()?;
    let keys = config.load_secret_key()?;
    let pubkey = keys.public_key_hex();

    let pool = Arc::new(RelayPool::new(config.pool_config(&pubkey, unix_now()))?);
    let generator = Arc::new(OllamaGenerator::new(&config.generation)?);
    let orchestrator = Arc::new(JobOrchestrator::new(
        keys,
        config.orchestrator_settings(),
        generator,
        pool.clone(),
    ));

    pool.start(orchestrator)?;
    info!(
        %pubkey,
        relays = config.relays.len(),
        kinds = ?config.request_kinds,
        model = %config.generation.model,
        "dvm running"
    );

    tokio::signal::ctrl_c().await?;
    info!("ctrl-c received, shutting down");
    pool.shutdown(DRAIN_TIMEOUT).await;
    Ok(())
}

fn init_tracing(fallback: &str) {
    use tracing_subscriber::{EnvFilter, fmt};
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
