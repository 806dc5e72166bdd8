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

use afrovibe_staking::{validation::parse_amount, TxKind};
use anyhow::{bail, Result};
use clap::Args;

use crate::{
    commands::{await_settlement, format_amount},
    config::GlobalConfig,
};

/// Command to stake tokens.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct StakingStake {
    /// Amount of tokens to stake.
    ///
    /// This is specified in whole tokens, e.g., to stake 1.5 tokens, use `--amount 1.5`.
    #[clap(long)]
    pub amount: String,
    /// Lock period in days, between 1 and 365.
    #[clap(long, default_value_t = 30)]
    pub lock_days: u64,
    /// Do not approve the staking contract to pull the tokens first. An allowance must already
    /// be in place.
    #[clap(long)]
    pub no_approve: bool,
}

impl StakingStake {
    /// Run the [StakingStake] command.
    pub async fn run(&self, global_config: &GlobalConfig) -> Result<()> {
        let token = global_config.require_deployment()?.stake_token_address;
        let (ledger, session) = global_config.connect_session().await?;
        let gateway = global_config.staking_gateway(ledger.clone()).await?;

        let decimals = gateway.token_decimals(token).await?;
        let amount = parse_amount("stake", &self.amount, decimals)?;
        if !gateway.has_balance(token, session.account(), amount).await? {
            bail!("Insufficient balance: {} tokens required", format_amount(amount, decimals)?);
        }

        if !self.no_approve {
            let tx_hash = gateway.approve_stake_token(&session, token, amount).await?;
            tracing::info!(%tx_hash, "Sent approval for staking");
            let kind = TxKind::Approve;
            await_settlement(global_config, ledger.clone(), &session, tx_hash, kind, None).await?;
        }

        let tx_hash = gateway.stake(&session, amount, self.lock_days).await?;
        tracing::info!(%tx_hash, "Sent transaction for staking");
        let tx = await_settlement(
            global_config,
            ledger,
            &session,
            tx_hash,
            TxKind::Stake,
            Some(amount),
        )
        .await?;

        tracing::info!(
            "Staking completed: owner = {}, amount = {} tokens, locked for {} days",
            session.account(),
            format_amount(tx.amount.unwrap_or(amount), decimals)?,
            self.lock_days
        );
        Ok(())
    }
}
