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

//! Client of the index service mirroring staking events.
//!
//! The index is eventually consistent with the ledger. It is used for lists the contracts do not
//! expose (stakes, delegations, governance proposals), never for authoritative balances.

use std::{str::FromStr, time::Duration};

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::retry::{execute, Backoff, Classify, ErrorClass, RetryPolicy};

/// Records returned per list.
///
/// The query sets no ordering, so a list holds the first records in the index's default order
/// (by entity ID), not necessarily the newest.
pub const DEFAULT_PAGE_SIZE: u32 = 5;

/// Retry schedule for index queries. Only transport failures are retried.
pub const DEFAULT_INDEX_RETRY: RetryPolicy = RetryPolicy {
    transient: Backoff::new(3, Duration::from_millis(1000)),
    non_transient: Backoff::new(1, Duration::ZERO),
};

const USER_ACTIVITY_QUERY: &str = r#"query UserActivity($user: Bytes!, $first: Int!) {
  stakes(where: { user: $user }, first: $first) {
    id
    user
    amount
    lockPeriod
  }
  delegateds(where: { user: $user }, first: $first) {
    user
    validator
    amount
  }
  proposals(first: $first) {
    id
    proposalId
    descriptionHash
    timestamp
  }
  upgradeProposals(first: $first) {
    id
    newImplementation
    timelockEnd
    validated
    cancelled
  }
}"#;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("index request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("index query failed: {}", .0.join("; "))]
    GraphQl(Vec<String>),

    #[error("index response is missing data")]
    MissingData,
}

impl Classify for IndexError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::Http(_) => ErrorClass::Transient,
            Self::GraphQl(_) => ErrorClass::NonTransient,
            Self::MissingData => ErrorClass::Fatal,
        }
    }
}

/// Big integers are transported as decimal strings.
mod decimal {
    use super::*;

    pub fn serialize<S: serde::Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        U256::from_str(&value).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub struct IndexedStake {
    pub id: String,
    pub user: Address,
    #[serde(with = "decimal")]
    pub amount: U256,
    #[serde(with = "decimal")]
    pub lock_period: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedDelegation {
    pub user: Address,
    pub validator: Address,
    #[serde(with = "decimal")]
    pub amount: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub struct IndexedProposal {
    pub id: String,
    #[serde(with = "decimal")]
    pub proposal_id: U256,
    pub description_hash: B256,
    #[serde(with = "decimal")]
    pub timestamp: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub struct IndexedUpgradeProposal {
    pub id: String,
    pub new_implementation: Address,
    #[serde(with = "decimal")]
    pub timelock_end: U256,
    pub validated: bool,
    pub cancelled: bool,
}

/// One page of the activity of an account as seen by the index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub struct IndexActivity {
    pub stakes: Vec<IndexedStake>,
    #[serde(rename(deserialize = "delegateds"))]
    pub delegations: Vec<IndexedDelegation>,
    pub proposals: Vec<IndexedProposal>,
    pub upgrade_proposals: Vec<IndexedUpgradeProposal>,
}

impl IndexActivity {
    /// Sum of the amounts of the returned stake records.
    pub fn total_staked(&self) -> U256 {
        self.stakes.iter().map(|stake| stake.amount).sum()
    }
}

#[async_trait]
pub trait IndexService: Send + Sync {
    /// First page of the activity of `account`, in the index's default order.
    async fn user_activity(&self, account: Address) -> Result<IndexActivity, IndexError>;
}

#[derive(Deserialize)]
struct GraphQlResponse {
    data: Option<IndexActivity>,
    #[serde(default)]
    errors: Vec<GraphQlMessage>,
}

#[derive(Deserialize)]
struct GraphQlMessage {
    message: String,
}

/// [IndexService] backed by a GraphQL subgraph endpoint.
#[derive(Clone, Debug)]
pub struct GraphQlIndex {
    client: reqwest::Client,
    url: Url,
    page_size: u32,
    retry: RetryPolicy,
}

impl GraphQlIndex {
    pub fn new(url: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            page_size: DEFAULT_PAGE_SIZE,
            retry: DEFAULT_INDEX_RETRY,
        }
    }

    pub fn with_retry(self, retry: RetryPolicy) -> Self {
        Self { retry, ..self }
    }

    pub fn with_page_size(self, page_size: u32) -> Self {
        Self { page_size, ..self }
    }

    async fn query(&self, account: Address) -> Result<IndexActivity, IndexError> {
        let body = serde_json::json!({
            "query": USER_ACTIVITY_QUERY,
            "variables": {
                "user": account.to_string().to_lowercase(),
                "first": self.page_size,
            },
        });
        let response: GraphQlResponse = self
            .client
            .post(self.url.clone())
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !response.errors.is_empty() {
            return Err(IndexError::GraphQl(
                response.errors.into_iter().map(|error| error.message).collect(),
            ));
        }
        response.data.ok_or(IndexError::MissingData)
    }
}

#[async_trait]
impl IndexService for GraphQlIndex {
    async fn user_activity(&self, account: Address) -> Result<IndexActivity, IndexError> {
        let activity = execute(&self.retry, move || self.query(account))
            .await
            .map_err(|err| err.into_inner())?;
        tracing::debug!(
            %account,
            stakes = activity.stakes.len(),
            delegations = activity.delegations.len(),
            "fetched index activity"
        );
        Ok(activity)
    }
}
