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

use afrovibe_staking::{
    compute_rewards, quote_position, AprFeed, HttpAprFeed, RewardError, RewardQuote,
};
use alloy::primitives::Address;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use clap::Args;

use super::resolve_account;
use crate::config::{parse_account, GlobalConfig};

/// Command to quote the rewards of a position.
///
/// Quotes a position read from the ledger by default. With `--principal`, quotes a hypothetical
/// position without connecting to the ledger.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct StakingCalculateRewards {
    /// Account holding the position. Defaults to the address of the configured private key.
    #[clap(value_parser = parse_account, conflicts_with = "principal")]
    pub account: Option<Address>,
    /// Index of the position.
    #[clap(long, default_value_t = 0, conflicts_with = "principal")]
    pub index: u64,
    /// Variable APR as a fraction, e.g. `0.05`. Fetched from the APR feed when omitted.
    #[clap(long)]
    pub apr: Option<f64>,
    /// Principal of a hypothetical position, in whole tokens.
    #[clap(long, requires = "elapsed_days")]
    pub principal: Option<f64>,
    /// Lock period of the hypothetical position, in days.
    #[clap(long, default_value_t = 30, requires = "principal")]
    pub lock_days: u64,
    /// Days the hypothetical position has been staked.
    #[clap(long, requires = "principal")]
    pub elapsed_days: Option<u64>,
    /// Fixed-rate rewards already claimable on the hypothetical position, in whole tokens.
    #[clap(long, default_value_t = 0.0, requires = "principal")]
    pub fixed_rewards: f64,
}

/// [AprFeed] always returning the same sample.
struct FixedApr(f64);

#[async_trait]
impl AprFeed for FixedApr {
    async fn variable_apr(&self) -> Result<f64, RewardError> {
        Ok(self.0)
    }
}

impl StakingCalculateRewards {
    /// Run the [StakingCalculateRewards] command.
    pub async fn run(&self, global_config: &GlobalConfig) -> Result<()> {
        let feed: Box<dyn AprFeed> = match self.apr {
            Some(apr) => Box::new(FixedApr(apr)),
            None => Box::new(HttpAprFeed::new(global_config.require_apr_url()?)),
        };

        let quote = match self.principal {
            Some(principal) => self.quote_hypothetical(feed.as_ref(), principal).await?,
            None => self.quote_ledger_position(global_config, feed.as_ref()).await?,
        };

        tracing::info!(
            "Variable APR {:.2}% over {} days: variable yield {:.6}, fixed rewards {:.6}, \
             total yield {:.4}%",
            quote.variable_apr * 100.0,
            quote.elapsed_days,
            quote.variable_yield,
            quote.fixed_claimable,
            quote.total_yield_percent
        );
        println!("{}", serde_json::to_string_pretty(&quote)?);
        Ok(())
    }

    async fn quote_hypothetical(&self, feed: &dyn AprFeed, principal: f64) -> Result<RewardQuote> {
        let apr = feed.variable_apr().await?;
        let elapsed_days = self.elapsed_days.unwrap_or_default();
        Ok(compute_rewards(principal, self.lock_days, elapsed_days, apr, self.fixed_rewards)?)
    }

    async fn quote_ledger_position(
        &self,
        global_config: &GlobalConfig,
        feed: &dyn AprFeed,
    ) -> Result<RewardQuote> {
        let account = resolve_account(global_config, self.account)?;
        let token = global_config.require_deployment()?.stake_token_address;
        let ledger = global_config.connect_ledger().await?;
        let gateway = global_config.staking_gateway(ledger).await?;

        let now = u64::try_from(Utc::now().timestamp()).context("system clock before epoch")?;
        quote_position(&gateway, feed, token, account, self.index, now)
            .await
            .with_context(|| format!("failed to quote position {} of {account}", self.index))
    }
}
