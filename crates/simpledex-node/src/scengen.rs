use std::path::Path;

use anyhow::{anyhow, bail, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::config::NodeConfig;
use crate::scenario::{Scenario, Step, ALL_LIQUIDITY};

/// Liquidity seeded into every generated pair, in token units
const SEED_LIQUIDITY: &str = "1000";

pub fn handle_gen_scenario(config_path: &Path, steps: usize, seed: Option<u64>, out: &Path) -> Result<()> {
    let config = NodeConfig::load(config_path)?;
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let scenario = generate_scenario(&config, steps, &mut rng)?;
    scenario.save(out)?;

    info!("Wrote {} steps to {:?}", scenario.steps.len(), out);
    Ok(())
}

/// Seed a pool for each neighbouring pair of tokens, then append `steps`
/// random operations over those pools
pub fn generate_scenario<R: Rng>(config: &NodeConfig, steps: usize, rng: &mut R) -> Result<Scenario> {
    if config.tokens.len() < 2 {
        bail!("Need at least two tokens to generate a scenario");
    }
    let accounts: Vec<&str> = config.genesis.iter().map(|a| a.name.as_str()).collect();
    let owner = *accounts
        .first()
        .ok_or_else(|| anyhow!("Need at least one genesis account"))?;

    let pairs: Vec<(&str, &str)> = config
        .tokens
        .windows(2)
        .map(|w| (w[0].symbol.as_str(), w[1].symbol.as_str()))
        .collect();

    let mut scenario = Scenario::default();
    for (x, y) in &pairs {
        scenario.steps.push(Step::AddLiquidity {
            provider: owner.to_string(),
            token_x: x.to_string(),
            token_y: y.to_string(),
            amount_x: SEED_LIQUIDITY.to_string(),
            amount_y: SEED_LIQUIDITY.to_string(),
        });
    }

    for _ in 0..steps {
        let &(x, y) = pairs.choose(rng).ok_or_else(|| anyhow!("no pairs"))?;
        let (x, y) = if rng.gen_bool(0.5) { (x, y) } else { (y, x) };
        let actor = accounts.choose(rng).copied().unwrap_or(owner);

        let step = match rng.gen_range(0..10) {
            0..=5 => Step::Swap {
                trader: actor.to_string(),
                token_in: x.to_string(),
                token_out: y.to_string(),
                amount_in: random_amount(rng),
                min_out: None,
            },
            6 | 7 => Step::AddLiquidity {
                provider: actor.to_string(),
                token_x: x.to_string(),
                token_y: y.to_string(),
                amount_x: random_amount(rng),
                amount_y: random_amount(rng),
            },
            8 => Step::RemoveLiquidity {
                provider: actor.to_string(),
                token_x: x.to_string(),
                token_y: y.to_string(),
                liquidity: if rng.gen_bool(0.25) {
                    ALL_LIQUIDITY.to_string()
                } else {
                    random_amount(rng)
                },
                min_x: None,
                min_y: None,
            },
            _ => Step::Transfer {
                from: actor.to_string(),
                to: accounts.choose(rng).copied().unwrap_or(owner).to_string(),
                token: x.to_string(),
                amount: random_amount(rng),
            },
        };
        scenario.steps.push(step);
    }

    Ok(scenario)
}

/// A decimal amount between 1 and 50 with one fractional digit
fn random_amount<R: Rng>(rng: &mut R) -> String {
    format!("{}.{}", rng.gen_range(1..=50), rng.gen_range(0..10))
}
