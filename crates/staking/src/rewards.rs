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

//! Projected yield of a stake position.
//!
//! A position earns two kinds of rewards: a variable-rate yield from the liquid staking token,
//! auto-compounded daily at an externally reported APR, and fixed-rate rewards accrued by the
//! staking contract and claimable separately.

use alloy::primitives::{utils::format_units, Address, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::{
    error::GatewayError,
    gateway::StakingGateway,
    ledger::Ledger,
    validation::MAX_LOCK_PERIOD_DAYS,
    SECONDS_PER_DAY,
};

/// Lowest variable APR accepted from the feed.
pub const MIN_VARIABLE_APR: f64 = 0.035;
/// Highest variable APR accepted from the feed.
pub const MAX_VARIABLE_APR: f64 = 0.07;

const DAYS_PER_YEAR: f64 = 365.0;

#[derive(Error, Debug)]
pub enum RewardError {
    #[error("variable APR {0} outside of [{MIN_VARIABLE_APR}, {MAX_VARIABLE_APR}]")]
    InvalidRate(f64),

    #[error("no stake position to compute rewards for")]
    NoPosition,

    #[error("lock period must be between 1 and {MAX_LOCK_PERIOD_DAYS} days, got {0}")]
    InvalidLockPeriod(u64),

    #[error("invalid fixed reward amount {0}")]
    InvalidAmount(f64),

    #[error("failed to convert amount: {0}")]
    Conversion(String),

    #[error("failed to fetch variable APR: {0}")]
    AprFeed(#[from] reqwest::Error),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Derived yield figures, recomputed on demand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RewardQuote {
    pub principal: f64,
    pub variable_apr: f64,
    pub elapsed_days: u64,
    /// Principal plus compounded variable yield.
    pub effective_balance: f64,
    pub variable_yield: f64,
    pub fixed_claimable: f64,
    pub total_rewards: f64,
    pub total_yield_percent: f64,
}

/// Compute the rewards of a position holding `principal` for `elapsed_days`.
///
/// `principal` and `fixed_reward_amount` are decimal amounts of the staked asset. The variable
/// yield compounds daily at `variable_apr / 365`.
pub fn compute_rewards(
    principal: f64,
    lock_period_days: u64,
    elapsed_days: u64,
    variable_apr: f64,
    fixed_reward_amount: f64,
) -> Result<RewardQuote, RewardError> {
    if !(MIN_VARIABLE_APR..=MAX_VARIABLE_APR).contains(&variable_apr) {
        return Err(RewardError::InvalidRate(variable_apr));
    }
    if !principal.is_finite() || principal <= 0.0 {
        return Err(RewardError::NoPosition);
    }
    if !(1..=MAX_LOCK_PERIOD_DAYS).contains(&lock_period_days) {
        return Err(RewardError::InvalidLockPeriod(lock_period_days));
    }
    if !fixed_reward_amount.is_finite() || fixed_reward_amount < 0.0 {
        return Err(RewardError::InvalidAmount(fixed_reward_amount));
    }

    let daily_rate = variable_apr / DAYS_PER_YEAR;
    let effective_balance = principal * (1.0 + daily_rate).powf(elapsed_days as f64);
    let variable_yield = effective_balance - principal;
    let total_rewards = variable_yield + fixed_reward_amount;

    Ok(RewardQuote {
        principal,
        variable_apr,
        elapsed_days,
        effective_balance,
        variable_yield,
        fixed_claimable: fixed_reward_amount,
        total_rewards,
        total_yield_percent: total_rewards / principal * 100.0,
    })
}

/// Convert a smallest-unit `amount` into a decimal using the asset's declared `decimals`.
pub fn to_decimal(amount: U256, decimals: u8) -> Result<f64, RewardError> {
    let formatted =
        format_units(amount, decimals).map_err(|e| RewardError::Conversion(e.to_string()))?;
    formatted.parse::<f64>().map_err(|e| RewardError::Conversion(format!("{formatted}: {e}")))
}

/// Source of variable APR samples.
#[async_trait]
pub trait AprFeed: Send + Sync {
    async fn variable_apr(&self) -> Result<f64, RewardError>;
}

#[derive(Deserialize)]
struct AprSample {
    apr: f64,
}

/// [AprFeed] reading `{ "apr": <fraction> }` from an HTTP endpoint.
#[derive(Clone, Debug)]
pub struct HttpAprFeed {
    client: reqwest::Client,
    url: Url,
}

impl HttpAprFeed {
    pub fn new(url: Url) -> Self {
        Self { client: reqwest::Client::new(), url }
    }

    pub fn with_client(client: reqwest::Client, url: Url) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl AprFeed for HttpAprFeed {
    async fn variable_apr(&self) -> Result<f64, RewardError> {
        let sample: AprSample = self
            .client
            .get(self.url.clone())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        tracing::debug!(url = %self.url, apr = sample.apr, "fetched variable APR");
        Ok(sample.apr)
    }
}

/// Quote the rewards of `account`'s position at `index` as of `now` (unix seconds).
///
/// Fixed rewards come from the contract's claimable rewards accessor when it has one, and from
/// the position's accumulated rewards otherwise. Amounts are converted using the decimals
/// declared by `token`.
pub async fn quote_position<L: Ledger>(
    gateway: &StakingGateway<L>,
    feed: &dyn AprFeed,
    token: Address,
    account: Address,
    index: u64,
    now: u64,
) -> Result<RewardQuote, RewardError> {
    let position = gateway.position(account, index).await?;
    if !position.is_active() {
        return Err(RewardError::NoPosition);
    }

    let claimable = async {
        match gateway.capabilities().claimable_rewards {
            true => gateway.claimable_rewards(account, index).await,
            false => Ok(position.accumulated_claimable_rewards),
        }
    };
    let (claimable, decimals) = tokio::try_join!(claimable, gateway.token_decimals(token))?;
    let variable_apr = feed.variable_apr().await?;

    let elapsed_days = now.saturating_sub(position.start_time) / SECONDS_PER_DAY;
    let quote = compute_rewards(
        to_decimal(position.principal, decimals)?,
        position.lock_period_days,
        elapsed_days,
        variable_apr,
        to_decimal(claimable, decimals)?,
    )?;
    tracing::debug!(%account, index, ?quote, "quoted position rewards");
    Ok(quote)
}

#[cfg(test)]
mod tests {
    use alloy::primitives::utils::parse_ether;

    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
    }

    #[test]
    fn rejects_rate_outside_of_bounds() {
        for apr in [0.0, 0.0349, 0.0701, 0.5, -0.05, f64::NAN, f64::INFINITY] {
            let result = compute_rewards(1000.0, 365, 90, apr, 0.0);
            assert!(matches!(result, Err(RewardError::InvalidRate(_))), "accepted apr {apr}");
        }
        assert!(compute_rewards(1000.0, 365, 90, MIN_VARIABLE_APR, 0.0).is_ok());
        assert!(compute_rewards(1000.0, 365, 90, MAX_VARIABLE_APR, 0.0).is_ok());
    }

    #[test]
    fn rejects_missing_position() {
        for principal in [0.0, -1.0, f64::NAN] {
            assert!(matches!(
                compute_rewards(principal, 30, 10, 0.05, 0.0),
                Err(RewardError::NoPosition)
            ));
        }
    }

    #[test]
    fn rejects_invalid_inputs() {
        assert!(matches!(
            compute_rewards(1000.0, 0, 10, 0.05, 0.0),
            Err(RewardError::InvalidLockPeriod(0))
        ));
        assert!(matches!(
            compute_rewards(1000.0, 366, 10, 0.05, 0.0),
            Err(RewardError::InvalidLockPeriod(366))
        ));
        assert!(matches!(
            compute_rewards(1000.0, 30, 10, 0.05, -1.0),
            Err(RewardError::InvalidAmount(_))
        ));
    }

    #[test]
    fn compounds_daily() {
        let quote = compute_rewards(1000.0, 365, 90, 0.05, 0.0).unwrap();
        assert_close(quote.variable_yield, 12.404224830408339);
        assert_close(quote.effective_balance, 1012.4042248304083);
        assert_eq!(quote, compute_rewards(1000.0, 365, 90, 0.05, 0.0).unwrap());

        let none_elapsed = compute_rewards(1000.0, 30, 0, 0.05, 0.0).unwrap();
        assert_eq!(none_elapsed.variable_yield, 0.0);
        assert_eq!(none_elapsed.total_yield_percent, 0.0);
    }

    #[test]
    fn total_yield_includes_fixed_rewards() {
        let quote = compute_rewards(1000.0, 365, 90, 0.05, 2.5).unwrap();
        assert_eq!(quote.fixed_claimable, 2.5);
        assert_eq!(quote.total_rewards, quote.variable_yield + 2.5);
        assert_eq!(quote.total_yield_percent, (quote.variable_yield + 2.5) / 1000.0 * 100.0);
        assert_close(quote.total_yield_percent, 1.490422483040834);
    }

    #[test]
    fn converts_using_declared_decimals() {
        assert_eq!(to_decimal(parse_ether("2.5").unwrap(), 18).unwrap(), 2.5);
        assert_eq!(to_decimal(U256::from(1_500_000u64), 6).unwrap(), 1.5);
        assert_eq!(to_decimal(U256::ZERO, 18).unwrap(), 0.0);
    }
}
