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

//! Commands of the AfroVibe CLI for the staking contract.

mod bridge;
mod calculate_rewards;
mod claim_rewards;
mod delegate;
mod governance;
mod positions;
mod snapshot;
mod stake;
mod unstake;

pub use bridge::StakingBridge;
pub use calculate_rewards::StakingCalculateRewards;
pub use claim_rewards::StakingClaimRewards;
pub use delegate::StakingDelegate;
pub use governance::{
    StakingConfirmUpgrade, StakingCreateProposal, StakingProposeUpgrade, StakingVerifyVoter,
};
pub use positions::StakingPositions;
pub use snapshot::StakingSnapshot;
pub use stake::StakingStake;
pub use unstake::StakingUnstake;

use alloy::primitives::Address;
use anyhow::Result;
use clap::Subcommand;

use crate::config::GlobalConfig;

/// Commands for the staking contract.
#[derive(Subcommand, Clone, Debug)]
pub enum StakingCommands {
    /// Lock tokens for a fixed period.
    Stake(StakingStake),
    /// Withdraw a position, optionally redeeming Sonic points.
    Unstake(StakingUnstake),
    /// Claim the accumulated fixed-rate rewards.
    ClaimRewards(StakingClaimRewards),
    /// Bridge tokens to or from Ethereum.
    Bridge(StakingBridge),
    /// Delegate tokens to a validator.
    Delegate(StakingDelegate),
    /// Create a governance proposal.
    CreateProposal(StakingCreateProposal),
    /// Prove eligibility to vote on a proposal.
    VerifyVoter(StakingVerifyVoter),
    /// Propose a new implementation of the staking contract.
    ProposeUpgrade(StakingProposeUpgrade),
    /// Confirm a pending upgrade proposal.
    ConfirmUpgrade(StakingConfirmUpgrade),
    /// List the active positions of an account.
    Positions(StakingPositions),
    /// Quote the rewards of a position.
    CalculateRewards(StakingCalculateRewards),
    /// Reconcile ledger and index data for an account.
    Snapshot(StakingSnapshot),
}

impl StakingCommands {
    /// Run the command.
    pub async fn run(&self, global_config: &GlobalConfig) -> Result<()> {
        match self {
            Self::Stake(cmd) => cmd.run(global_config).await,
            Self::Unstake(cmd) => cmd.run(global_config).await,
            Self::ClaimRewards(cmd) => cmd.run(global_config).await,
            Self::Bridge(cmd) => cmd.run(global_config).await,
            Self::Delegate(cmd) => cmd.run(global_config).await,
            Self::CreateProposal(cmd) => cmd.run(global_config).await,
            Self::VerifyVoter(cmd) => cmd.run(global_config).await,
            Self::ProposeUpgrade(cmd) => cmd.run(global_config).await,
            Self::ConfirmUpgrade(cmd) => cmd.run(global_config).await,
            Self::Positions(cmd) => cmd.run(global_config).await,
            Self::CalculateRewards(cmd) => cmd.run(global_config).await,
            Self::Snapshot(cmd) => cmd.run(global_config).await,
        }
    }
}

/// `account` if given, otherwise the address of the configured private key.
fn resolve_account(global_config: &GlobalConfig, account: Option<Address>) -> Result<Address> {
    match account {
        Some(account) => Ok(account),
        None => Ok(global_config.require_private_key()?.address()),
    }
}
