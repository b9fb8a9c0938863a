use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use simpledex_core::serialize;

/// Liquidity value meaning "the provider's whole position"
pub const ALL_LIQUIDITY: &str = "all";

/// An ordered list of operations to run against the engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scenario {
    pub steps: Vec<Step>,
}

/// One scenario operation
///
/// Accounts are config account names, tokens are symbols and amounts are
/// decimal strings in token units. Liquidity is expressed in units of
/// `token_x`'s decimals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Approve {
        account: String,
        token: String,
        amount: String,
    },
    Transfer {
        from: String,
        to: String,
        token: String,
        amount: String,
    },
    AddLiquidity {
        provider: String,
        token_x: String,
        token_y: String,
        amount_x: String,
        amount_y: String,
    },
    RemoveLiquidity {
        provider: String,
        token_x: String,
        token_y: String,
        liquidity: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_x: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_y: Option<String>,
    },
    Swap {
        trader: String,
        token_in: String,
        token_out: String,
        amount_in: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_out: Option<String>,
    },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Approve { .. } => "approve",
            Step::Transfer { .. } => "transfer",
            Step::AddLiquidity { .. } => "add_liquidity",
            Step::RemoveLiquidity { .. } => "remove_liquidity",
            Step::Swap { .. } => "swap",
        }
    }
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serialize::from_json(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serialize::to_json_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
