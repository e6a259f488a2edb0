//! TSS Simulator CLI
//!
//! Runs key generation, signing and verification over the in-process
//! simulated network.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;
use tss_sim_core::{Orchestrator, SimulationConfig};

#[derive(Parser)]
#[command(name = "tss-sim")]
#[command(about = "Threshold ECDSA simulator over an in-process network", version)]
struct Cli {
    /// Directory holding keygen-*.json and sig-*.json files
    #[arg(short, long, global = true, default_value = ".")]
    dir: PathBuf,

    /// Operation deadline in seconds (0 waits forever)
    #[arg(short, long, global = true, default_value_t = 300)]
    timeout: u64,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate key shares for n parties with threshold t
    #[command(alias = "g")]
    Generate {
        /// Number of parties
        n: usize,
        /// Threshold (t + 1 parties are needed to sign)
        t: usize,
    },

    /// Sign a message with t + 1 of the stored key shares
    #[command(alias = "s")]
    Sign {
        /// Number of parties that took part in key generation
        n: usize,
        /// Threshold used during key generation
        t: usize,
        /// Message to sign
        message: String,
    },

    /// Verify the stored signature over a message
    #[command(alias = "v")]
    Verify {
        /// Message that was signed
        message: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .pretty()
        .init();

    let config = SimulationConfig::default()
        .with_output_dir(cli.dir)
        .with_operation_timeout((cli.timeout > 0).then_some(cli.timeout));
    let orchestrator = Orchestrator::new(config)?;

    match cli.command {
        Commands::Generate { n, t } => {
            info!("Generating key pair with {} shares and threshold {}", n, t);
            let paths = orchestrator.generate(n, t).await?;

            println!("\nKey generation completed!\n");
            for path in &paths {
                println!("  - {}", path.display());
            }
        }
        Commands::Sign { n, t, message } => {
            info!("Signing message {:?}", message);
            let signature = orchestrator.sign(n, t, &message).await?;

            println!("\nSigning completed by {} parties!\n", t + 1);
            println!("r: {}", signature.r);
            println!("s: {}", signature.s);
            println!("recovery id: {}", signature.recovery_id);
        }
        Commands::Verify { message } => {
            if orchestrator.verify(&message).await? {
                println!("V Signature is valid V");
            } else {
                println!("X Signature is invalid X");
            }
        }
    }

    Ok(())
}
