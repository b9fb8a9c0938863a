use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde::Serialize;
use simpledex_amm::{Dex, EventBroadcaster, EventLog, FanOut};
use simpledex_core::{Address, Amount, DexEvent, Hash, Pool};
use simpledex_state::{FileStorage, Ledger, MemoryLedger, Snapshot, StateStore};
use tokio::sync::{broadcast::error::RecvError, oneshot};
use tracing::{info, warn};

use crate::config::{account_address, token_address, NodeConfig};
use crate::scenario::{Scenario, Step, ALL_LIQUIDITY};

/// Capacity of the event channel the watcher task reads from
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Engine plus ledger driven from a config file
pub struct Node {
    config: NodeConfig,
    dex: Dex<MemoryLedger>,
    broadcaster: Arc<EventBroadcaster>,
    log: Arc<EventLog>,
}

/// Counts of scenario steps by outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub applied: usize,
    pub rejected: usize,
}

/// Final state after a run
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub applied: usize,
    pub rejected: usize,
    pub events: usize,
    pub pools: Vec<PoolReport>,
    /// Account name -> token symbol -> balance
    pub balances: BTreeMap<String, BTreeMap<String, String>>,
    pub state_root: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolReport {
    pub pool_id: String,
    pub pair: String,
    pub reserves: BTreeMap<String, String>,
    pub total_liquidity: String,
    /// Symbol whose decimals liquidity amounts are shown in
    pub liquidity_unit: String,
    pub providers: BTreeMap<String, String>,
}

impl Node {
    /// Create a node from configuration
    ///
    /// With persistence enabled and a state file present, the ledger and
    /// pools are restored from it; otherwise the ledger starts from genesis.
    pub fn new(config: NodeConfig) -> Result<Self> {
        let state_path = config.state_path();
        let (ledger, pools) = if config.persist && state_path.exists() {
            let store = StateStore::new(FileStorage::new(&state_path)?);
            let snapshot = store.load()?;
            info!(
                "Restored {} accounts and {} pools from {:?}",
                snapshot.accounts.len(),
                snapshot.pools.len(),
                state_path
            );
            (MemoryLedger::from_accounts(snapshot.accounts), snapshot.pools)
        } else {
            (config.genesis_ledger()?, Vec::new())
        };

        let broadcaster = Arc::new(EventBroadcaster::new(EVENT_CHANNEL_CAPACITY));
        let log = Arc::new(EventLog::new());
        let mut sink = FanOut::default();
        sink.push(broadcaster.clone());
        sink.push(log.clone());

        let dex = Dex::new(config.dex_config(), ledger)?.with_sink(Arc::new(sink));
        dex.restore_pools(pools)?;

        Ok(Node {
            config,
            dex,
            broadcaster,
            log,
        })
    }

    pub fn dex(&self) -> &Dex<MemoryLedger> {
        &self.dex
    }

    pub fn events(&self) -> Vec<DexEvent> {
        self.log.events()
    }

    /// Execute every step, logging events from a watcher task as they occur
    ///
    /// A rejected step is logged and skipped; it never aborts the run.
    pub async fn run(&self, scenario: &Scenario) -> Result<RunSummary> {
        let mut rx = self.broadcaster.subscribe();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let watcher = tokio::spawn(async move {
            loop {
                tokio::select! {
                    received = rx.recv() => match received {
                        Ok(event) => log_event(&event),
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("Event watcher lagged, skipped {} events", skipped)
                        }
                        Err(RecvError::Closed) => break,
                    },
                    _ = &mut shutdown_rx => {
                        while let Ok(event) = rx.try_recv() {
                            log_event(&event);
                        }
                        break;
                    }
                }
            }
        });

        let mut summary = RunSummary::default();
        for (index, step) in scenario.steps.iter().enumerate() {
            match self.apply(step) {
                Ok(outcome) => {
                    summary.applied += 1;
                    info!("Step {} {}: {}", index, step.name(), outcome);
                }
                Err(e) => {
                    summary.rejected += 1;
                    warn!("Step {} {} rejected: {}", index, step.name(), e);
                }
            }
        }

        // The watcher may already be gone if the channel closed
        let _ = shutdown_tx.send(());
        watcher.await?;

        info!(
            "Scenario finished: {} applied, {} rejected",
            summary.applied, summary.rejected
        );
        Ok(summary)
    }

    /// Apply one step, returning a short description of the outcome
    pub fn apply(&self, step: &Step) -> Result<String> {
        let config = &self.config;
        match step {
            Step::Approve {
                account,
                token,
                amount,
            } => {
                let amount = config.parse_approval(token, amount)?;
                self.dex.ledger().approve(
                    &token_address(token),
                    &account_address(account),
                    &self.dex.custody(),
                    amount,
                );
                Ok(format!("{} approved {}", account, token))
            }

            Step::Transfer {
                from,
                to,
                token,
                amount,
            } => {
                let value = config.parse_token_amount(token, amount)?;
                self.dex.ledger().transfer(
                    &token_address(token),
                    &account_address(from),
                    &account_address(to),
                    value,
                )?;
                Ok(format!("{} {} from {} to {}", amount, token, from, to))
            }

            Step::AddLiquidity {
                provider,
                token_x,
                token_y,
                amount_x,
                amount_y,
            } => {
                let ax = config.parse_token_amount(token_x, amount_x)?;
                let ay = config.parse_token_amount(token_y, amount_y)?;
                let (tx, ty) = (token_address(token_x), token_address(token_y));
                let minted = self
                    .dex
                    .add_liquidity(&account_address(provider), &tx, &ty, ax, ay)?;
                let unit = self.liquidity_symbol(&tx, &ty)?;
                Ok(format!(
                    "minted {} liquidity ({} units)",
                    config.format_token_amount(&unit, minted)?,
                    unit
                ))
            }

            Step::RemoveLiquidity {
                provider,
                token_x,
                token_y,
                liquidity,
                min_x,
                min_y,
            } => {
                let owner = account_address(provider);
                let (tx, ty) = (token_address(token_x), token_address(token_y));
                let liquidity = if liquidity.eq_ignore_ascii_case(ALL_LIQUIDITY) {
                    self.dex.position_of(&owner, &tx, &ty)?
                } else {
                    let unit = self.liquidity_symbol(&tx, &ty)?;
                    config.parse_token_amount(&unit, liquidity)?
                };
                let min_x = parse_optional(config, token_x, min_x.as_deref())?;
                let min_y = parse_optional(config, token_y, min_y.as_deref())?;

                let (out_x, out_y) = self
                    .dex
                    .remove_liquidity_with_min(&owner, &tx, &ty, liquidity, min_x, min_y)?;
                Ok(format!(
                    "received {} {} and {} {}",
                    config.format_token_amount(token_x, out_x)?,
                    token_x,
                    config.format_token_amount(token_y, out_y)?,
                    token_y
                ))
            }

            Step::Swap {
                trader,
                token_in,
                token_out,
                amount_in,
                min_out,
            } => {
                let value = config.parse_token_amount(token_in, amount_in)?;
                let min_out = parse_optional(config, token_out, min_out.as_deref())?;
                let out = self.dex.swap_with_min(
                    &account_address(trader),
                    &token_address(token_in),
                    &token_address(token_out),
                    value,
                    min_out,
                )?;
                Ok(format!(
                    "{} {} for {} {}",
                    amount_in,
                    token_in,
                    config.format_token_amount(token_out, out)?,
                    token_out
                ))
            }
        }
    }

    /// Symbol of the token a pair's liquidity is denominated in
    ///
    /// Fixed by the deposit that bootstrapped the pool, so it does not
    /// depend on the order the caller names the tokens in.
    fn liquidity_symbol(&self, token_x: &Address, token_y: &Address) -> Result<String> {
        let token = self
            .dex
            .liquidity_token(token_x, token_y)?
            .ok_or_else(|| anyhow!("No liquidity in pool"))?;
        self.symbol_of(&token)
    }

    fn symbol_of(&self, token: &Address) -> Result<String> {
        self.config
            .token_by_address(token)
            .map(|t| t.symbol.clone())
            .ok_or_else(|| anyhow!("Unknown token {}", token))
    }

    /// Current ledger accounts and non-empty pools
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.dex.ledger().snapshot(), self.dex.pools())
    }

    /// Write the current state to the data directory
    pub fn persist(&self) -> Result<Hash> {
        let mut store = StateStore::new(FileStorage::new(self.config.state_path())?);
        Ok(store.persist(&self.snapshot())?)
    }

    pub fn report(&self, summary: RunSummary) -> Result<Report> {
        let snapshot = self.snapshot();
        let state_root = snapshot.state_root()?;

        let mut balances = BTreeMap::new();
        let mut holders: Vec<(String, Address)> = self
            .config
            .genesis
            .iter()
            .map(|account| (account.name.clone(), account_address(&account.name)))
            .collect();
        holders.push(("custody".to_string(), self.dex.custody()));
        for (name, address) in holders {
            let mut held = BTreeMap::new();
            for token in &self.config.tokens {
                let balance = self
                    .dex
                    .ledger()
                    .balance_of(&token_address(&token.symbol), &address);
                held.insert(
                    token.symbol.clone(),
                    self.config.format_token_amount(&token.symbol, balance)?,
                );
            }
            balances.insert(name, held);
        }

        let pools = snapshot
            .pools
            .iter()
            .map(|pool| self.pool_report(pool))
            .collect::<Result<Vec<_>>>()?;

        Ok(Report {
            applied: summary.applied,
            rejected: summary.rejected,
            events: self.log.len(),
            pools,
            balances,
            state_root: state_root.to_hex(),
        })
    }

    fn pool_report(&self, pool: &Pool) -> Result<PoolReport> {
        let s0 = self.symbol_of(&pool.pair.token0())?;
        let s1 = self.symbol_of(&pool.pair.token1())?;
        let unit = match pool.liquidity_token {
            Some(token) => self.symbol_of(&token)?,
            None => s0.clone(),
        };

        let mut reserves = BTreeMap::new();
        reserves.insert(s0.clone(), self.config.format_token_amount(&s0, pool.reserve0)?);
        reserves.insert(s1.clone(), self.config.format_token_amount(&s1, pool.reserve1)?);

        let mut providers = BTreeMap::new();
        for position in pool.positions() {
            let name = self
                .config
                .genesis
                .iter()
                .find(|a| account_address(&a.name) == position.provider)
                .map_or_else(|| position.provider.to_hex(), |a| a.name.clone());
            providers.insert(name, self.config.format_token_amount(&unit, position.liquidity)?);
        }

        Ok(PoolReport {
            pool_id: pool.pair.pool_id().to_hex(),
            pair: format!("{}/{}", s0, s1),
            reserves,
            total_liquidity: self.config.format_token_amount(&unit, pool.total_liquidity)?,
            liquidity_unit: unit,
            providers,
        })
    }
}

fn parse_optional(config: &NodeConfig, symbol: &str, value: Option<&str>) -> Result<Amount> {
    match value {
        Some(value) => config.parse_token_amount(symbol, value),
        None => Ok(Amount::ZERO),
    }
}

fn log_event(event: &DexEvent) {
    match serde_json::to_string(event) {
        Ok(json) => info!("Event {}", json),
        Err(e) => warn!("Failed to encode {} event: {}", event.name(), e),
    }
}
