use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use simpledex_amm::engine::DEFAULT_CUSTODY_LABEL;
use simpledex_amm::DexConfig;
use simpledex_core::{
    format_amount, parse_amount, serialize, Address, Amount, DEFAULT_FEE_PER_MILLE,
};
use simpledex_state::MemoryLedger;

/// Approval value meaning "unlimited"
pub const MAX_APPROVAL: &str = "max";

/// Node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Swap fee per mille
    pub fee_per_mille: u64,

    /// Label the custody account address is derived from
    pub custody_label: String,

    /// Node data directory
    pub data_dir: PathBuf,

    /// Persist engine state to `data_dir` after a run and reload it on start
    pub persist: bool,

    /// Tokens known to the node
    pub tokens: Vec<TokenConfig>,

    /// Accounts seeded into a fresh ledger
    pub genesis: Vec<GenesisAccount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    pub symbol: String,
    pub decimals: u8,
}

/// A seeded account: balances and approvals keyed by token symbol
///
/// Amounts are decimal strings in token units. An approval of `"max"` is
/// unlimited.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenesisAccount {
    pub name: String,
    #[serde(default)]
    pub balances: BTreeMap<String, String>,
    #[serde(default)]
    pub approvals: BTreeMap<String, String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            fee_per_mille: DEFAULT_FEE_PER_MILLE,
            custody_label: DEFAULT_CUSTODY_LABEL.to_string(),
            data_dir: PathBuf::from("./simpledex-data"),
            persist: false,
            tokens: Vec::new(),
            genesis: Vec::new(),
        }
    }
}

/// Ledger address of a token symbol
pub fn token_address(symbol: &str) -> Address {
    Address::derive(&format!("token:{}", symbol))
}

/// Ledger address of a named account
pub fn account_address(name: &str) -> Address {
    Address::derive(&format!("account:{}", name))
}

impl NodeConfig {
    /// Load config from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: NodeConfig = serialize::from_json(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serialize::to_json_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.dex_config().validate()?;
        let mut seen = BTreeMap::new();
        for token in &self.tokens {
            if seen.insert(token.symbol.as_str(), ()).is_some() {
                bail!("Duplicate token symbol {}", token.symbol);
            }
        }
        for account in &self.genesis {
            for symbol in account.balances.keys().chain(account.approvals.keys()) {
                self.token(symbol)?;
            }
        }
        Ok(())
    }

    pub fn dex_config(&self) -> DexConfig {
        DexConfig {
            fee_per_mille: self.fee_per_mille,
            custody: Address::derive(&self.custody_label),
        }
    }

    pub fn token(&self, symbol: &str) -> Result<&TokenConfig> {
        self.tokens
            .iter()
            .find(|t| t.symbol == symbol)
            .ok_or_else(|| anyhow!("Unknown token {}", symbol))
    }

    /// Token config for a ledger address
    pub fn token_by_address(&self, address: &Address) -> Option<&TokenConfig> {
        self.tokens
            .iter()
            .find(|t| token_address(&t.symbol) == *address)
    }

    /// Parse a decimal amount of `symbol` into base units
    pub fn parse_token_amount(&self, symbol: &str, value: &str) -> Result<Amount> {
        let token = self.token(symbol)?;
        Ok(parse_amount(value, token.decimals)?)
    }

    /// Render base units of `symbol` as a decimal string
    pub fn format_token_amount(&self, symbol: &str, amount: Amount) -> Result<String> {
        let token = self.token(symbol)?;
        Ok(format_amount(amount, token.decimals)?)
    }

    /// Parse an approval value, accepting `"max"`
    pub fn parse_approval(&self, symbol: &str, value: &str) -> Result<Amount> {
        if value.eq_ignore_ascii_case(MAX_APPROVAL) {
            self.token(symbol)?;
            return Ok(Amount::MAX);
        }
        self.parse_token_amount(symbol, value)
    }

    /// Build a ledger holding the genesis balances and approvals
    pub fn genesis_ledger(&self) -> Result<MemoryLedger> {
        let ledger = MemoryLedger::new();
        let custody = self.dex_config().custody;
        for account in &self.genesis {
            let owner = account_address(&account.name);
            for (symbol, value) in &account.balances {
                let amount = self.parse_token_amount(symbol, value)?;
                ledger.mint(&token_address(symbol), &owner, amount)?;
            }
            for (symbol, value) in &account.approvals {
                let amount = self.parse_approval(symbol, value)?;
                ledger.approve(&token_address(symbol), &owner, &custody, amount);
            }
        }
        Ok(ledger)
    }

    /// Path of the persisted state file
    pub fn state_path(&self) -> PathBuf {
        self.data_dir.join("state.bin")
    }
}

/// Generate a sample configuration for testing
pub fn generate_sample_config() -> NodeConfig {
    let tokens = vec![
        TokenConfig {
            symbol: "TKA".to_string(),
            decimals: 18,
        },
        TokenConfig {
            symbol: "TKB".to_string(),
            decimals: 18,
        },
        TokenConfig {
            symbol: "USD".to_string(),
            decimals: 6,
        },
    ];

    let genesis = ["owner", "alice", "bob"]
        .iter()
        .map(|name| GenesisAccount {
            name: name.to_string(),
            balances: tokens
                .iter()
                .map(|t| (t.symbol.clone(), "1000000".to_string()))
                .collect(),
            approvals: tokens
                .iter()
                .map(|t| (t.symbol.clone(), MAX_APPROVAL.to_string()))
                .collect(),
        })
        .collect();

    NodeConfig {
        tokens,
        genesis,
        ..NodeConfig::default()
    }
}
