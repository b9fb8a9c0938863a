use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use simpledex_amm::math::get_amount_out;
use simpledex_core::{format_amount, parse_amount, serialize};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod cli;
mod config;
mod node;
mod scenario;
mod scengen;

use cli::{Cli, Commands};
use config::{generate_sample_config, NodeConfig};
use node::Node;
use scenario::Scenario;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { output } => {
            init_config(&output)?;
        }
        Commands::Run {
            config,
            scenario,
            report,
        } => {
            run_scenario(config, scenario, report).await?;
        }
        Commands::Quote {
            reserve_in,
            reserve_out,
            amount_in,
            decimals,
            fee,
        } => {
            quote(&reserve_in, &reserve_out, &amount_in, decimals, fee)?;
        }
        Commands::GenScenario {
            config,
            steps,
            seed,
            out,
        } => {
            scengen::handle_gen_scenario(&config, steps, seed, &out)?;
        }
    }

    Ok(())
}

/// Initialize a new configuration file
fn init_config(output: &Path) -> Result<()> {
    info!("Generating sample configuration");

    let config = generate_sample_config();
    config.save(output)?;

    info!("Configuration saved to {:?}", output);

    println!("\nConfiguration file created: {}", output.display());
    println!("Edit the file to customize tokens and genesis accounts.");
    println!("\nTo generate and run a scenario:");
    println!("  simpledex gen-scenario --config {} --out scenario.json", output.display());
    println!("  simpledex run --config {} --scenario scenario.json", output.display());

    Ok(())
}

/// Run a scenario file against a freshly seeded or restored engine
async fn run_scenario(config_path: PathBuf, scenario_path: PathBuf, report_path: Option<PathBuf>) -> Result<()> {
    info!("Loading configuration from {:?}", config_path);

    let config = if config_path.exists() {
        NodeConfig::load(&config_path)?
    } else {
        error!(
            "Configuration file not found: {:?}. Run 'simpledex init' to create one.",
            config_path
        );
        return Err(anyhow::anyhow!("Configuration file not found"));
    };
    let persist = config.persist;

    let scenario = Scenario::load(&scenario_path)?;
    info!("Loaded {} steps from {:?}", scenario.steps.len(), scenario_path);

    let node = Node::new(config)?;
    let summary = node.run(&scenario).await?;

    if persist {
        let root = node.persist()?;
        info!("State persisted, root {}", root);
    }

    let report = serialize::to_json_pretty(&node.report(summary)?)?;
    println!("{}", report);
    if let Some(path) = report_path {
        std::fs::write(&path, &report)?;
        info!("Report saved to {:?}", path);
    }

    Ok(())
}

/// Price a swap offline
fn quote(reserve_in: &str, reserve_out: &str, amount_in: &str, decimals: u8, fee: u64) -> Result<()> {
    let amount_out = get_amount_out(
        parse_amount(amount_in, decimals)?,
        parse_amount(reserve_in, decimals)?,
        parse_amount(reserve_out, decimals)?,
        fee,
    )?;
    println!("{}", format_amount(amount_out, decimals)?);
    Ok(())
}
