//! Sugarchain node tooling.
//!
//! Entry point for the sugar-node binary. Drives the difficulty and
//! proof-of-work rules over header files.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use sugar_consensus::{block_proof, check_proof_of_work, difficulty, Hash256, Network};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod config;
mod replay;

use config::NodeConfig;

/// Sugarchain difficulty and proof-of-work tooling.
#[derive(Parser, Debug)]
#[command(name = "sugar-node")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "sugar-node.toml")]
    config: PathBuf,

    /// Network (main, test, regtest); overrides the config file
    #[arg(short, long)]
    network: Option<Network>,

    /// Log level; overrides the config file (default info)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the effective configuration as TOML
    Policy {
        /// Also write it to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Compute the bits required of the block after a header file's tip
    NextWork {
        /// JSON header file
        headers: PathBuf,
        /// Candidate block timestamp
        #[arg(long)]
        time: Option<i64>,
    },
    /// Check a PoW hash against compact bits
    CheckPow {
        /// PoW hash, display hex
        hash: String,
        /// Compact bits, hex
        bits: String,
    },
    /// Recompute every header's bits and report the first mismatch
    Replay {
        /// JSON header file
        headers: PathBuf,
    },
    /// Show display difficulty and work for compact bits
    Difficulty {
        /// Compact bits, hex
        bits: String,
    },
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Load configuration
    let config = NodeConfig::load(&args.config, &args)?;

    // Initialize logging
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Sugarchain node tooling v{}", env!("CARGO_PKG_VERSION"));
    info!("Network: {}", config.network);

    let policy = config.policy()?;
    info!("Retarget algorithm: {}", policy.algorithm);

    match args.command {
        Command::Policy { output } => {
            let resolved = config.resolved()?;
            print!("{}", resolved.to_toml()?);
            if let Some(path) = output {
                resolved.save(&path)?;
                info!("Configuration written to {}", path.display());
            }
        }
        Command::NextWork { headers, time } => {
            let records = replay::load_headers(&headers)?;
            let chain = replay::build_chain(&records);
            let bits = replay::next_work(&chain, time, &policy)
                .context("Failed to compute next work")?;
            println!("height {} bits {:#010x}", chain.len(), bits);
        }
        Command::CheckPow { hash, bits } => {
            let hash = Hash256::from_hex(&hash)
                .with_context(|| format!("Invalid PoW hash '{}'", hash))?;
            let bits = replay::parse_bits(&bits)?;
            if check_proof_of_work(hash.to_u256(), bits, &policy) {
                println!("valid");
            } else {
                println!("invalid");
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Replay { headers } => {
            let records = replay::load_headers(&headers)?;
            let chain = replay::build_chain(&records);
            let report = replay::replay(&chain, &policy).context("Replay failed")?;
            match report.first_mismatch {
                None => println!("ok: {} headers checked", report.checked),
                Some(m) => {
                    println!(
                        "mismatch at height {}: expected {:#010x}, found {:#010x} ({} headers checked)",
                        m.height, m.expected, m.actual, report.checked
                    );
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Command::Difficulty { bits } => {
            let bits = replay::parse_bits(&bits)?;
            println!("difficulty {}", difficulty(bits));
            println!("work {:#x}", block_proof(bits));
        }
    }

    Ok(ExitCode::SUCCESS)
}
