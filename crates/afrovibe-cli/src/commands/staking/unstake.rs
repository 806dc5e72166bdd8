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

use afrovibe_staking::TxKind;
use alloy::primitives::U256;
use anyhow::Result;
use clap::Args;

use crate::{
    commands::{await_settlement, format_amount},
    config::GlobalConfig,
};

/// Command to unstake a position.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct StakingUnstake {
    /// Index of the position to withdraw, as listed by `staking positions`.
    #[clap(long)]
    pub index: u64,
    /// Sonic points to redeem against the early withdrawal penalty.
    #[clap(long, default_value_t = U256::ZERO)]
    pub points: U256,
}

impl StakingUnstake {
    /// Run the [StakingUnstake] command.
    pub async fn run(&self, global_config: &GlobalConfig) -> Result<()> {
        let token = global_config.require_deployment()?.stake_token_address;
        let (ledger, session) = global_config.connect_session().await?;
        let gateway = global_config.staking_gateway(ledger.clone()).await?;

        let available = gateway.sonic_points(session.account()).await?;
        if self.points > available {
            tracing::warn!(%available, requested = %self.points, "Requested more points than held");
        }

        let tx_hash = gateway.unstake(&session, self.index, self.points).await?;
        tracing::info!(%tx_hash, "Sent transaction for unstaking");
        let tx =
            await_settlement(global_config, ledger, &session, tx_hash, TxKind::Unstake, None)
                .await?;

        match tx.amount {
            Some(amount) => {
                let decimals = gateway.token_decimals(token).await?;
                tracing::info!(
                    "Unstaking completed: index = {}, amount = {} tokens",
                    self.index,
                    format_amount(amount, decimals)?
                );
            }
            None => tracing::info!("Unstaking completed: index = {}", self.index),
        }
        Ok(())
    }
}
