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
use alloy::primitives::Address;
use anyhow::Result;
use clap::Args;

use crate::{
    commands::{await_settlement, format_amount},
    config::{parse_account, GlobalConfig},
};

/// Command to delegate tokens to a validator.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct StakingDelegate {
    /// Validator to delegate to.
    #[clap(long, value_parser = parse_account)]
    pub validator: Address,
    /// Amount of tokens to delegate, in whole tokens.
    #[clap(long)]
    pub amount: String,
}

impl StakingDelegate {
    /// Run the [StakingDelegate] command.
    pub async fn run(&self, global_config: &GlobalConfig) -> Result<()> {
        let token = global_config.require_deployment()?.stake_token_address;
        let (ledger, session) = global_config.connect_session().await?;
        let gateway = global_config.staking_gateway(ledger.clone()).await?;

        let decimals = gateway.token_decimals(token).await?;
        let amount = parse_amount("delegation", &self.amount, decimals)?;
        let tx_hash = gateway.delegate_to_validator(&session, self.validator, amount).await?;
        tracing::info!(%tx_hash, "Sent transaction for delegation");
        let tx = await_settlement(
            global_config,
            ledger,
            &session,
            tx_hash,
            TxKind::Delegate,
            Some(amount),
        )
        .await?;

        tracing::info!(
            "Delegation completed: validator = {}, amount = {} tokens",
            self.validator,
            format_amount(tx.amount.unwrap_or(amount), decimals)?
        );
        Ok(())
    }
}
