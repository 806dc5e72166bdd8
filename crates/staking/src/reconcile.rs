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

//! Merges authoritative ledger reads with the eventually consistent index.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use serde::Serialize;

use crate::{
    error::GatewayError,
    gateway::{StakePosition, StakingGateway},
    index::{IndexService, IndexedDelegation, IndexedProposal, IndexedStake, IndexedUpgradeProposal},
    ledger::Ledger,
};

/// Which read produced [UserSnapshot::total_staked].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TotalStakedSource {
    /// Sum of the stake records returned by the index.
    Index,
    /// Bulk accessor or per-position summation on the ledger.
    Ledger,
}

/// The index could not be queried. The snapshot carries ledger data only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexUnavailable {
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSnapshot {
    pub account: Address,
    pub sonic_points: U256,
    pub total_staked: U256,
    pub total_staked_source: TotalStakedSource,
    /// Total staked according to the ledger, regardless of the source used for `total_staked`.
    pub ledger_total_staked: U256,
    pub positions: Vec<StakePosition>,
    /// Stake records of the index's first page. The index query sets no ordering, so these are
    /// not necessarily the newest stakes.
    pub recent_stakes: Vec<IndexedStake>,
    pub delegations: Vec<IndexedDelegation>,
    pub proposals: Vec<IndexedProposal>,
    pub upgrade_proposals: Vec<IndexedUpgradeProposal>,
    pub index_unavailable: Option<IndexUnavailable>,
}

pub struct Reconciler<L> {
    gateway: Arc<StakingGateway<L>>,
    index: Arc<dyn IndexService>,
}

impl<L: Ledger> Reconciler<L> {
    pub fn new(gateway: Arc<StakingGateway<L>>, index: Arc<dyn IndexService>) -> Self {
        Self { gateway, index }
    }

    /// Snapshot of `account`.
    ///
    /// Ledger failures fail the snapshot. Index failures are reported through
    /// [UserSnapshot::index_unavailable], with the index lists left empty and the total taken
    /// from the ledger.
    pub async fn user_snapshot(&self, account: Address) -> Result<UserSnapshot, GatewayError> {
        let gateway = &self.gateway;
        let bulk_total = async {
            match gateway.capabilities().total_staked {
                true => gateway.total_staked(account).await.map(Some),
                false => Ok(None),
            }
        };
        let ledger_reads = async {
            tokio::try_join!(gateway.sonic_points(account), gateway.positions(account), bulk_total)
        };
        let (ledger, index) = tokio::join!(ledger_reads, self.index.user_activity(account));
        let (sonic_points, positions, bulk_total) = ledger?;

        let ledger_total_staked =
            bulk_total.unwrap_or_else(|| positions.iter().map(|position| position.principal).sum());

        let snapshot = match index {
            Ok(activity) => {
                let index_total = activity.total_staked();
                if index_total != ledger_total_staked {
                    tracing::debug!(
                        %account,
                        %index_total,
                        %ledger_total_staked,
                        "index total differs from ledger"
                    );
                }
                UserSnapshot {
                    account,
                    sonic_points,
                    total_staked: index_total,
                    total_staked_source: TotalStakedSource::Index,
                    ledger_total_staked,
                    positions,
                    recent_stakes: activity.stakes,
                    delegations: activity.delegations,
                    proposals: activity.proposals,
                    upgrade_proposals: activity.upgrade_proposals,
                    index_unavailable: None,
                }
            }
            Err(err) => {
                tracing::warn!(%account, "index unavailable, using ledger data only: {err}");
                UserSnapshot {
                    account,
                    sonic_points,
                    total_staked: ledger_total_staked,
                    total_staked_source: TotalStakedSource::Ledger,
                    ledger_total_staked,
                    positions,
                    recent_stakes: vec![],
                    delegations: vec![],
                    proposals: vec![],
                    upgrade_proposals: vec![],
                    index_unavailable: Some(IndexUnavailable { reason: err.to_string() }),
                }
            }
        };
        Ok(snapshot)
    }
}
