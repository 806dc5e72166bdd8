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

use afrovibe_staking::SECONDS_PER_DAY;
use alloy::primitives::Address;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;

use super::resolve_account;
use crate::{
    commands::format_amount,
    config::{parse_account, GlobalConfig},
};

/// Command to list the active positions of an account.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct StakingPositions {
    /// Account to list positions for. Defaults to the address of the configured private key.
    #[clap(value_parser = parse_account)]
    pub account: Option<Address>,
}

impl StakingPositions {
    /// Run the [StakingPositions] command.
    pub async fn run(&self, global_config: &GlobalConfig) -> Result<()> {
        let account = resolve_account(global_config, self.account)?;
        let token = global_config.require_deployment()?.stake_token_address;
        let ledger = global_config.connect_ledger().await?;
        let gateway = global_config.staking_gateway(ledger).await?;

        let (positions, points, decimals) = tokio::try_join!(
            gateway.positions(account),
            gateway.sonic_points(account),
            gateway.token_decimals(token),
        )?;
        let now = u64::try_from(Utc::now().timestamp()).context("system clock before epoch")?;

        tracing::info!("Sonic points: {points}");
        if positions.is_empty() {
            tracing::info!("No active positions for {account}");
            return Ok(());
        }
        for position in &positions {
            let unlocks_at = DateTime::from_timestamp(position.end_time as i64, 0)
                .context("failed to create DateTime")?;
            let state = match position.is_unlocked(now) {
                true => "unlocked".to_string(),
                false => {
                    let days_left = (position.end_time - now).div_ceil(SECONDS_PER_DAY);
                    format!("{days_left} days left")
                }
            };
            tracing::info!(
                "Position {}: {} tokens locked for {} days, unlocks {} UTC ({state}), \
                 accumulated rewards {} tokens",
                position.index,
                format_amount(position.principal, decimals)?,
                position.lock_period_days,
                unlocks_at.format("%Y-%m-%d %H:%M:%S"),
                format_amount(position.accumulated_claimable_rewards, decimals)?,
            );
        }
        Ok(())
    }
}
