// Copyright 2025 RISC Zero, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Commands of the AfroVibe CLI.

pub mod funder;
pub mod paymaster;
pub mod staking;

use std::sync::Arc;

use afrovibe_staking::{
    Session, TrackedTransaction, TrackerConfig, TransactionTracker, TxKind, TxStatus,
};
use alloy::primitives::{utils::format_units, TxHash, U256};
use anyhow::{bail, ensure, Context, Result};
use clap::Subcommand;

use crate::config::{CliLedger, GlobalConfig};
pub use funder::FunderCommands;
pub use paymaster::PaymasterCommands;
pub use staking::StakingCommands;

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Commands for the staking contract.
    #[command(subcommand)]
    Staking(Box<StakingCommands>),

    /// Commands for the paymaster funder contract.
    #[command(subcommand)]
    Funder(Box<FunderCommands>),

    /// Commands for the paymaster contract.
    #[command(subcommand)]
    Paymaster(Box<PaymasterCommands>),
}

impl Command {
    /// Run the command.
    pub async fn run(&self, global_config: &GlobalConfig) -> Result<()> {
        match self {
            Self::Staking(cmd) => cmd.run(global_config).await,
            Self::Funder(cmd) => cmd.run(global_config).await,
            Self::Paymaster(cmd) => cmd.run(global_config).await,
        }
    }
}

/// Follow `tx_hash` until it settles, failing if it reverts or outlives the configured timeout.
pub(crate) async fn await_settlement(
    global_config: &GlobalConfig,
    ledger: Arc<CliLedger>,
    session: &Session,
    tx_hash: TxHash,
    kind: TxKind,
    amount: Option<U256>,
) -> Result<TrackedTransaction> {
    let tracker = TransactionTracker::new(ledger, TrackerConfig::default());
    let mut handle = tracker.track(session, tx_hash, kind, amount);

    let timeout = global_config.tx_timeout();
    tracing::debug!(?timeout, %tx_hash, "Waiting for transaction receipt");
    let tx = match tokio::time::timeout(timeout, handle.wait()).await {
        Ok(Some(tx)) => tx,
        Ok(None) => bail!("stopped tracking transaction {tx_hash} before it settled"),
        Err(_) => {
            handle.cancel();
            bail!("transaction {tx_hash} did not settle within {}s", timeout.as_secs());
        }
    };

    // fees are paid in the native token, which has 18 decimals
    let fee = format_amount(tx.fee_consumed.unwrap_or_default(), 18)?;
    ensure!(
        tx.status == TxStatus::Confirmed,
        "{kind:?} transaction failed: tx_hash = {tx_hash}, fee = {fee}"
    );
    tracing::info!(%tx_hash, %fee, "{kind:?} transaction confirmed");
    Ok(tx)
}

/// Format `amount`, given in the smallest unit of a token with `decimals` decimals.
pub(crate) fn format_amount(amount: U256, decimals: u8) -> Result<String> {
    format_units(amount, decimals).context("failed to format token amount")
}
