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
    contracts::{find_tx_log, IStaking},
    validation::{parse_bytes32, parse_proof},
    Ledger, TxKind, ValidationError,
};
use alloy::primitives::{Address, B256, U256};
use anyhow::Result;
use clap::Args;

use crate::{
    commands::await_settlement,
    config::{parse_account, GlobalConfig},
};

fn parse_root(value: &str) -> Result<B256, ValidationError> {
    parse_bytes32("merkle root", value)
}

/// Command to create a governance proposal.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct StakingCreateProposal {
    /// Free-text description. Only its keccak256 hash is stored on-chain.
    #[clap(long)]
    pub description: String,
    /// Root of the merkle tree of eligible voters, 0x-prefixed.
    #[clap(long, value_parser = parse_root)]
    pub merkle_root: B256,
    /// Unix timestamp at which voter eligibility was snapshotted.
    #[clap(long)]
    pub snapshot_timestamp: u64,
}

impl StakingCreateProposal {
    /// Run the [StakingCreateProposal] command.
    pub async fn run(&self, global_config: &GlobalConfig) -> Result<()> {
        let (ledger, session) = global_config.connect_session().await?;
        let gateway = global_config.staking_gateway(ledger.clone()).await?;

        let tx_hash = gateway
            .create_proposal(&session, &self.description, self.merkle_root, self.snapshot_timestamp)
            .await?;
        tracing::info!(%tx_hash, "Sent transaction for proposal creation");
        let kind = TxKind::CreateProposal;
        await_settlement(global_config, ledger.clone(), &session, tx_hash, kind, None).await?;

        // the tracker only records amounts, the proposal ID comes from the receipt
        let receipt = ledger.receipt(tx_hash).await?;
        let event = receipt
            .as_ref()
            .and_then(|r| find_tx_log::<IStaking::ProposalCreated>(r, gateway.address()));
        match event {
            Some(event) => tracing::info!("Proposal created: proposal_id = {}", event.proposalId),
            None => tracing::info!("Proposal created"),
        }
        Ok(())
    }
}

/// Command to prove eligibility to vote on a proposal.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct StakingVerifyVoter {
    /// ID of the proposal.
    #[clap(long)]
    pub proposal_id: U256,
    /// Merkle proof, as a comma separated list of 0x-prefixed 32 byte nodes.
    #[clap(long)]
    pub proof: String,
}

impl StakingVerifyVoter {
    /// Run the [StakingVerifyVoter] command.
    pub async fn run(&self, global_config: &GlobalConfig) -> Result<()> {
        let proof = parse_proof(&self.proof)?;
        let (ledger, session) = global_config.connect_session().await?;
        let gateway = global_config.staking_gateway(ledger.clone()).await?;

        let tx_hash = gateway.verify_proposal_voter(&session, self.proposal_id, &proof).await?;
        tracing::info!(%tx_hash, "Sent transaction for voter verification");
        await_settlement(global_config, ledger, &session, tx_hash, TxKind::VerifyVoter, None)
            .await?;
        tracing::info!("Voter verified for proposal {}", self.proposal_id);
        Ok(())
    }
}

/// Command to propose an upgrade of the staking contract.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct StakingProposeUpgrade {
    /// Address of the new implementation.
    #[clap(long, value_parser = parse_account)]
    pub implementation: Address,
    /// Free-text description. Only its keccak256 hash is stored on-chain.
    #[clap(long)]
    pub description: String,
}

impl StakingProposeUpgrade {
    /// Run the [StakingProposeUpgrade] command.
    pub async fn run(&self, global_config: &GlobalConfig) -> Result<()> {
        let (ledger, session) = global_config.connect_session().await?;
        let gateway = global_config.staking_gateway(ledger.clone()).await?;

        let tx_hash =
            gateway.propose_upgrade(&session, self.implementation, &self.description).await?;
        tracing::info!(%tx_hash, "Sent transaction for upgrade proposal");
        await_settlement(global_config, ledger, &session, tx_hash, TxKind::ProposeUpgrade, None)
            .await?;
        tracing::info!("Upgrade to {} proposed", self.implementation);
        Ok(())
    }
}

/// Command to confirm a pending upgrade.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct StakingConfirmUpgrade {
    /// ID of the upgrade proposal.
    #[clap(long)]
    pub proposal_id: U256,
}

impl StakingConfirmUpgrade {
    /// Run the [StakingConfirmUpgrade] command.
    pub async fn run(&self, global_config: &GlobalConfig) -> Result<()> {
        let (ledger, session) = global_config.connect_session().await?;
        let gateway = global_config.staking_gateway(ledger.clone()).await?;

        let tx_hash = gateway.confirm_upgrade(&session, self.proposal_id).await?;
        tracing::info!(%tx_hash, "Sent transaction for upgrade confirmation");
        await_settlement(global_config, ledger, &session, tx_hash, TxKind::ConfirmUpgrade, None)
            .await?;
        tracing::info!("Upgrade proposal {} confirmed", self.proposal_id);
        Ok(())
    }
}
