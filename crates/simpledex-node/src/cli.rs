use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// SimpleDEX - constant-product AMM engine
#[derive(Parser)]
#[command(name = "simpledex")]
#[command(about = "SimpleDEX engine driver and utilities")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a sample configuration file
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,
    },

    /// Seed the ledger from config and execute a scenario
    Run {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,

        /// Scenario JSON file
        #[arg(short, long)]
        scenario: PathBuf,

        /// Write the final report to this file as well as stdout
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Price a swap against given reserves without any state
    Quote {
        /// Reserve of the input token
        #[arg(long)]
        reserve_in: String,

        /// Reserve of the output token
        #[arg(long)]
        reserve_out: String,

        /// Amount swapped in
        #[arg(long)]
        amount_in: String,

        /// Decimals shared by both tokens
        #[arg(long, default_value = "18")]
        decimals: u8,

        /// Swap fee per mille
        #[arg(long, default_value = "3")]
        fee: u64,
    },

    /// Generate a random scenario for the accounts and tokens in a config
    GenScenario {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,

        /// Number of random steps after seeding liquidity
        #[arg(long, default_value = "50")]
        steps: usize,

        /// RNG seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,

        /// Output file (JSON)
        #[arg(short, long, default_value = "scenario.json")]
        out: PathBuf,
    },
}
