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

/// Command to bridge tokens.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct StakingBridge {
    /// Amount of tokens to bridge, in whole tokens.
    #[clap(long)]
    pub amount: String,
    /// Recipient on the destination chain.
    #[clap(long, value_parser = parse_account)]
    pub recipient: Address,
    /// Token to bridge. Defaults to the staked token of the deployment.
    #[clap(long, value_parser = parse_account)]
    pub token: Option<Address>,
    /// Bridge towards Ethereum. Without this flag tokens are bridged from Ethereum.
    #[clap(long)]
    pub to_ethereum: bool,
}

impl StakingBridge {
    /// Run the [StakingBridge] command.
    pub async fn run(&self, global_config: &GlobalConfig) -> Result<()> {
        let token = match self.token {
            Some(token) => token,
            None => global_config.require_deployment()?.stake_token_address,
        };
        let (ledger, session) = global_config.connect_session().await?;
        let gateway = global_config.staking_gateway(ledger.clone()).await?;

        let decimals = gateway.token_decimals(token).await?;
        let amount = parse_amount("bridge", &self.amount, decimals)?;
        let tx_hash = gateway
            .bridge_tokens(&session, token, amount, self.recipient, self.to_ethereum)
            .await?;
        tracing::info!(%tx_hash, "Sent transaction for bridging");
        let tx = await_settlement(
            global_config,
            ledger,
            &session,
            tx_hash,
            TxKind::Bridge,
            Some(amount),
        )
        .await?;

        tracing::info!(
            "Bridging completed: recipient = {}, amount = {} tokens",
            self.recipient,
            format_amount(tx.amount.unwrap_or(amount), decimals)?
        );
        Ok(())
    }
}
