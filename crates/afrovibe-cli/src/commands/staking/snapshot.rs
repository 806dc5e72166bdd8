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

use std::sync::Arc;

use afrovibe_staking::{GraphQlIndex, Reconciler};
use alloy::primitives::Address;
use anyhow::Result;
use clap::Args;

use super::resolve_account;
use crate::config::{parse_account, GlobalConfig};

/// Command to reconcile ledger and index data for an account.
///
/// Prints the snapshot as JSON. When the index service cannot be reached, the snapshot holds
/// ledger data only and says why.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct StakingSnapshot {
    /// Account to snapshot. Defaults to the address of the configured private key.
    #[clap(value_parser = parse_account)]
    pub account: Option<Address>,
}

impl StakingSnapshot {
    /// Run the [StakingSnapshot] command.
    pub async fn run(&self, global_config: &GlobalConfig) -> Result<()> {
        let account = resolve_account(global_config, self.account)?;
        let index = GraphQlIndex::new(global_config.require_subgraph_url()?);
        let ledger = global_config.connect_ledger().await?;
        let gateway = global_config.staking_gateway(ledger).await?;

        let reconciler = Reconciler::new(Arc::new(gateway), Arc::new(index));
        let snapshot = reconciler.user_snapshot(account).await?;
        if let Some(unavailable) = &snapshot.index_unavailable {
            tracing::warn!("Index unavailable, showing ledger data only: {}", unavailable.reason);
        }
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        Ok(())
    }
}
