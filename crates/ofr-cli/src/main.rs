use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::replay::ReplayArgs;

#[derive(Parser)]
#[command(name = "ofr")]
#[command(about = "Order-flow replay and lifecycle validation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay an order log window by window at the configured cadence
    Replay {
        /// Layered config paths in merge order (base -> overrides)
        #[arg(long = "config", required = true)]
        config_paths: Vec<PathBuf>,

        /// Override window.mode (time | count)
        #[arg(long)]
        mode: Option<String>,

        /// Stop after N ticks (overrides pacing.max_ticks)
        #[arg(long)]
        ticks: Option<u64>,

        /// Advance windows without folding them into the ledger
        #[arg(long, default_value_t = false)]
        preview: bool,

        /// Keep ticking on the flushed tail instead of stopping
        #[arg(long = "loop-tail", default_value_t = false)]
        loop_tail: bool,

        /// Fail when the config has keys the selected mode does not read
        #[arg(long = "strict-config", default_value_t = false)]
        strict_config: bool,

        /// Print one JSON object per tick instead of key=value lines
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Load an order log and print its shape and palette
    Inspect {
        /// Path to a .json or .csv order log
        #[arg(long)]
        source: PathBuf,

        /// Force the input format (json | csv)
        #[arg(long)]
        format: Option<String>,

        /// Also print the first N rows
        #[arg(long, default_value_t = 0)]
        head: usize,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Verify the hash chain of an anomaly export
    VerifyAnomalies {
        /// Path to the JSONL export
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Replay {
            config_paths,
            mode,
            ticks,
            preview,
            loop_tail,
            strict_config,
            json,
        } => {
            let mode = mode.as_deref().map(commands::parse_config_mode).transpose()?;
            commands::replay::run_replay(ReplayArgs {
                config_paths,
                mode,
                ticks,
                preview,
                loop_tail,
                strict_config,
                json,
            })
            .await?;
        }

        Commands::Inspect {
            source,
            format,
            head,
        } => {
            commands::inspect::run_inspect(&source, format.as_deref(), head)?;
        }

        Commands::ConfigHash { paths } => {
            let loaded = ofr_config::load_layered_yaml(&paths)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::VerifyAnomalies { path } => match ofr_audit::verify_hash_chain(&path)? {
            ofr_audit::VerifyResult::Valid { lines } => {
                println!("chain_valid=true lines={}", lines);
            }
            ofr_audit::VerifyResult::Broken { line, reason } => {
                println!("chain_valid=false line={}", line);
                anyhow::bail!("CHAIN_BROKEN at line {}: {}", line, reason);
            }
        },
    }

    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
