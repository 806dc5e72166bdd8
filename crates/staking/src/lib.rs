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

//! Client-side engine for the AfroVibe staking contracts.
//!
//! The crate wraps the remote staking, paymaster and paymaster-funder contracts behind typed
//! gateways, retries flaky remote calls with exponential backoff, tracks submitted transactions
//! until they settle, computes projected rewards and reconciles ledger reads with the index
//! service.

pub mod contracts;
pub mod deployments;
pub mod error;
pub mod gateway;
pub mod index;
pub mod ledger;
pub mod reconcile;
pub mod retry;
pub mod rewards;
pub mod session;
pub mod tracker;
pub mod validation;

pub use deployments::{ChainIdMismatch, Deployment};
pub use error::{ErrorKind, GatewayError, ValidationError};
pub use gateway::{
    funder::{FundingBounds, PaymasterFunderGateway, Role},
    paymaster::{ListChange, PaymasterGateway, SponsorshipLimits},
    Capabilities, GatewayConfig, StakePosition, StakingGateway,
};
pub use index::{GraphQlIndex, IndexActivity, IndexError, IndexService};
pub use ledger::{Ledger, LedgerError, LedgerReceipt, ProviderLedger};
pub use reconcile::{IndexUnavailable, Reconciler, TotalStakedSource, UserSnapshot};
pub use retry::{execute, Backoff, Classify, ErrorClass, RetryError, RetryPolicy};
pub use rewards::{compute_rewards, quote_position, AprFeed, HttpAprFeed, RewardError, RewardQuote};
pub use session::Session;
pub use tracker::{
    EvictionPolicy, TrackHandle, TrackedTransaction, TrackerConfig, TransactionTracker, TxHistory,
    TxKind, TxStatus,
};

/// Number of seconds in a day, used to convert lock periods to timestamps.
pub const SECONDS_PER_DAY: u64 = 86_400;
