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

//! Typed gateways over the remote staking and paymaster-funder contracts.
//!
//! Every state-mutating operation validates its arguments locally, estimates gas (retrying
//! per the [RetryPolicy]), applies a safety margin to the estimate and sends the transaction
//! exactly once. The transaction hash is returned immediately; use the
//! [TransactionTracker](crate::tracker::TransactionTracker) to follow it to finality.

mod capabilities;
pub mod funder;
pub mod paymaster;

pub use capabilities::{Capabilities, Operation, IMPLEMENTATION_SLOT};

use std::sync::Arc;

use alloy::{
    network::TransactionBuilder,
    primitives::{keccak256, Address, TxHash, B256, U256},
    rpc::types::TransactionRequest,
    sol_types::SolCall,
};
use futures_util::{stream, StreamExt, TryStreamExt};
use serde::Serialize;

use crate::{
    contracts::{IStaking, IERC20},
    error::GatewayError,
    ledger::Ledger,
    retry::{execute, RetryPolicy},
    session::Session,
    validation::{
        ensure_description, ensure_lock_period, ensure_non_zero_address, ensure_positive,
        ensure_proof,
    },
    SECONDS_PER_DAY,
};

/// Gas limit margin applied over the raw estimate, in percent.
pub const DEFAULT_GAS_MARGIN_PERCENT: u64 = 120;

/// Position reads kept in flight at once when listing an account's positions.
pub const MAX_CONCURRENT_POSITION_READS: usize = 4;

const REQUIRED_OPERATIONS: [Operation; 12] = [
    Operation::of::<IStaking::stakeCall>(),
    Operation::of::<IStaking::unstakeCall>(),
    Operation::of::<IStaking::claimRewardsCall>(),
    Operation::of::<IStaking::bridgeTokensCall>(),
    Operation::of::<IStaking::delegateToValidatorCall>(),
    Operation::of::<IStaking::createProposalCall>(),
    Operation::of::<IStaking::verifyProposalVoterCall>(),
    Operation::of::<IStaking::proposeUpgradeCall>(),
    Operation::of::<IStaking::confirmUpgradeCall>(),
    Operation::of::<IStaking::sonicPointsCall>(),
    Operation::of::<IStaking::stakeCountCall>(),
    Operation::of::<IStaking::stakesCall>(),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayConfig {
    pub retry: RetryPolicy,
    pub gas_margin_percent: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self { retry: RetryPolicy::default(), gas_margin_percent: DEFAULT_GAS_MARGIN_PERCENT }
    }
}

/// One locked deposit of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StakePosition {
    pub owner: Address,
    /// Ordinal among the owner's positions, stable for the position's life.
    pub index: u64,
    pub principal: U256,
    pub lock_period_days: u64,
    pub start_time: u64,
    pub end_time: u64,
    pub accumulated_claimable_rewards: U256,
}

impl StakePosition {
    /// Unstaked positions are zeroed by the contract.
    pub fn is_active(&self) -> bool {
        !self.principal.is_zero()
    }

    pub fn is_unlocked(&self, now: u64) -> bool {
        now >= self.end_time
    }
}

/// Submission and read plumbing shared by the gateways.
#[derive(Debug)]
pub(crate) struct ContractClient<L> {
    ledger: Arc<L>,
    address: Address,
    config: GatewayConfig,
}

impl<L: Ledger> ContractClient<L> {
    pub(crate) fn new(ledger: Arc<L>, address: Address, config: GatewayConfig) -> Self {
        Self { ledger, address, config }
    }

    pub(crate) async fn read<C: SolCall>(&self, call: C) -> Result<C::Return, GatewayError> {
        self.read_at(self.address, call).await
    }

    pub(crate) async fn read_at<C: SolCall>(
        &self,
        to: Address,
        call: C,
    ) -> Result<C::Return, GatewayError> {
        let tx = TransactionRequest::default().with_to(to).with_input(call.abi_encode());
        let (ledger, tx) = (&self.ledger, &tx);
        let output = execute(&self.config.retry, move || async move {
            ledger.call(tx.clone()).await.map_err(|e| GatewayError::ledger(C::SIGNATURE, e))
        })
        .await?;
        C::abi_decode_returns(&output)
            .map_err(|e| GatewayError::Decode { method: C::SIGNATURE, message: e.to_string() })
    }

    pub(crate) async fn submit<C: SolCall>(
        &self,
        session: &Session,
        call: C,
    ) -> Result<TxHash, GatewayError> {
        self.submit_to(session, self.address, call).await
    }

    pub(crate) async fn submit_to<C: SolCall>(
        &self,
        session: &Session,
        to: Address,
        call: C,
    ) -> Result<TxHash, GatewayError> {
        self.send(session, to, call, None).await
    }

    /// Submit a call to a payable function, attaching `value` of the native token.
    pub(crate) async fn submit_with_value<C: SolCall>(
        &self,
        session: &Session,
        call: C,
        value: U256,
    ) -> Result<TxHash, GatewayError> {
        self.send(session, self.address, call, Some(value)).await
    }

    /// Estimate, apply the gas margin and send. The send itself is never retried since a
    /// failed broadcast may still have reached the mempool.
    async fn send<C: SolCall>(
        &self,
        session: &Session,
        to: Address,
        call: C,
        value: Option<U256>,
    ) -> Result<TxHash, GatewayError> {
        let mut tx = TransactionRequest::default()
            .with_from(session.account())
            .with_to(to)
            .with_input(call.abi_encode());
        if let Some(value) = value {
            tx = tx.with_value(value);
        }

        let (ledger, request) = (&self.ledger, &tx);
        let estimate = execute(&self.config.retry, move || async move {
            ledger
                .estimate_gas(request.clone())
                .await
                .map_err(|e| GatewayError::ledger(C::SIGNATURE, e))
        })
        .await?;
        let gas_limit = estimate.saturating_mul(self.config.gas_margin_percent) / 100;

        tracing::trace!(
            "Calling {} with gas limit {gas_limit} (estimate {estimate})",
            C::SIGNATURE
        );
        let tx_hash = self
            .ledger
            .send_transaction(tx.with_gas_limit(gas_limit))
            .await
            .map_err(|e| GatewayError::ledger(C::SIGNATURE, e))?;
        tracing::info!(%tx_hash, "Sent transaction for {}", C::SIGNATURE);
        Ok(tx_hash)
    }
}

pub(crate) fn to_u64(method: &'static str, value: U256) -> Result<u64, GatewayError> {
    value
        .try_into()
        .map_err(|_| GatewayError::Decode { method, message: format!("{value} overflows u64") })
}

/// Gateway to the staking contract.
#[derive(Debug)]
pub struct StakingGateway<L> {
    client: ContractClient<L>,
    capabilities: Capabilities,
}

impl<L: Ledger> StakingGateway<L> {
    /// Connect to the staking contract at `address`.
    ///
    /// Fails with [GatewayError::UnsupportedContract] if the deployed code lacks any required
    /// operation. Optional operations are recorded in [Capabilities].
    pub async fn connect(
        ledger: Arc<L>,
        address: Address,
        config: GatewayConfig,
    ) -> Result<Self, GatewayError> {
        let code =
            capabilities::negotiate(ledger.as_ref(), address, &REQUIRED_OPERATIONS, &config.retry)
                .await?;
        let capabilities = Capabilities {
            total_staked: capabilities::supports(
                &code,
                Operation::of::<IStaking::getTotalStakedCall>(),
            ),
            claimable_rewards: capabilities::supports(
                &code,
                Operation::of::<IStaking::calculateAfrovibeRewardsCall>(),
            ),
            paused: capabilities::supports(&code, Operation::of::<IStaking::pausedCall>()),
        };
        if !capabilities.total_staked {
            tracing::warn!(
                %address,
                "getTotalStaked not available; falling back to per-position summation"
            );
        }
        tracing::debug!(%address, ?capabilities, "connected to staking contract");

        Ok(Self { client: ContractClient::new(ledger, address, config), capabilities })
    }

    pub fn address(&self) -> Address {
        self.client.address
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn ledger(&self) -> &Arc<L> {
        &self.client.ledger
    }

    /// Lock `amount` for `lock_period_days` (1 to 365 days).
    pub async fn stake(
        &self,
        session: &Session,
        amount: U256,
        lock_period_days: u64,
    ) -> Result<TxHash, GatewayError> {
        let amount = ensure_positive("stake", amount)?;
        let lock_period = ensure_lock_period(lock_period_days)?;
        self.client
            .submit(session, IStaking::stakeCall { amount, lockPeriod: U256::from(lock_period) })
            .await
    }

    /// Approve the staking contract to pull `amount` of `token` from the session account.
    pub async fn approve_stake_token(
        &self,
        session: &Session,
        token: Address,
        amount: U256,
    ) -> Result<TxHash, GatewayError> {
        let token = ensure_non_zero_address("token", token)?;
        let amount = ensure_positive("approval", amount)?;
        self.client
            .submit_to(session, token, IERC20::approveCall { spender: self.client.address, amount })
            .await
    }

    /// Withdraw the position at `index`, redeeming `points_to_use` Sonic points.
    pub async fn unstake(
        &self,
        session: &Session,
        index: u64,
        points_to_use: U256,
    ) -> Result<TxHash, GatewayError> {
        self.client
            .submit(
                session,
                IStaking::unstakeCall { index: U256::from(index), pointsToUse: points_to_use },
            )
            .await
    }

    pub async fn claim_rewards(&self, session: &Session) -> Result<TxHash, GatewayError> {
        self.client.submit(session, IStaking::claimRewardsCall {}).await
    }

    /// Bridge `amount` of `token` to `recipient`, towards Ethereum when `to_ethereum` is set.
    pub async fn bridge_tokens(
        &self,
        session: &Session,
        token: Address,
        amount: U256,
        recipient: Address,
        to_ethereum: bool,
    ) -> Result<TxHash, GatewayError> {
        let token = ensure_non_zero_address("token", token)?;
        let amount = ensure_positive("bridge", amount)?;
        let recipient = ensure_non_zero_address("recipient", recipient)?;
        self.client
            .submit(
                session,
                IStaking::bridgeTokensCall { token, amount, recipient, toEthereum: to_ethereum },
            )
            .await
    }

    pub async fn delegate_to_validator(
        &self,
        session: &Session,
        validator: Address,
        amount: U256,
    ) -> Result<TxHash, GatewayError> {
        let validator = ensure_non_zero_address("validator", validator)?;
        let amount = ensure_positive("delegation", amount)?;
        self.client.submit(session, IStaking::delegateToValidatorCall { validator, amount }).await
    }

    /// Create a governance proposal. The description is submitted as its keccak256 hash.
    pub async fn create_proposal(
        &self,
        session: &Session,
        description: &str,
        merkle_root: B256,
        snapshot_timestamp: u64,
    ) -> Result<TxHash, GatewayError> {
        let description_hash = keccak256(ensure_description(description)?);
        if snapshot_timestamp == 0 {
            return Err(crate::ValidationError::InvalidValue {
                field: "snapshot timestamp",
                reason: "must be positive".into(),
            }
            .into());
        }
        self.client
            .submit(
                session,
                IStaking::createProposalCall {
                    descriptionHash: description_hash,
                    merkleRoot: merkle_root,
                    snapshotTimestamp: U256::from(snapshot_timestamp),
                },
            )
            .await
    }

    /// Prove the session account is an eligible voter of `proposal_id`.
    pub async fn verify_proposal_voter(
        &self,
        session: &Session,
        proposal_id: U256,
        proof: &[B256],
    ) -> Result<TxHash, GatewayError> {
        ensure_proof(proof)?;
        self.client
            .submit(
                session,
                IStaking::verifyProposalVoterCall {
                    proposalId: proposal_id,
                    proof: proof.to_vec(),
                },
            )
            .await
    }

    pub async fn propose_upgrade(
        &self,
        session: &Session,
        new_implementation: Address,
        description: &str,
    ) -> Result<TxHash, GatewayError> {
        let new_implementation = ensure_non_zero_address("implementation", new_implementation)?;
        let description_hash = keccak256(ensure_description(description)?);
        self.client
            .submit(
                session,
                IStaking::proposeUpgradeCall {
                    newImplementation: new_implementation,
                    descriptionHash: description_hash,
                },
            )
            .await
    }

    pub async fn confirm_upgrade(
        &self,
        session: &Session,
        proposal_id: U256,
    ) -> Result<TxHash, GatewayError> {
        self.client.submit(session, IStaking::confirmUpgradeCall { proposalId: proposal_id }).await
    }

    pub async fn sonic_points(&self, account: Address) -> Result<U256, GatewayError> {
        self.client.read(IStaking::sonicPointsCall { user: account }).await
    }

    pub async fn stake_count(&self, account: Address) -> Result<u64, GatewayError> {
        let count = self.client.read(IStaking::stakeCountCall { user: account }).await?;
        to_u64(IStaking::stakeCountCall::SIGNATURE, count)
    }

    pub async fn position(
        &self,
        account: Address,
        index: u64,
    ) -> Result<StakePosition, GatewayError> {
        let method = IStaking::stakesCall::SIGNATURE;
        let stake = self
            .client
            .read(IStaking::stakesCall { user: account, index: U256::from(index) })
            .await?;
        let lock_period_days = to_u64(method, stake.lockPeriod)?;
        let start_time = to_u64(method, stake.startTime)?;
        let end_time = match to_u64(method, stake.endTime)? {
            0 => start_time.saturating_add(lock_period_days.saturating_mul(SECONDS_PER_DAY)),
            end => end,
        };
        Ok(StakePosition {
            owner: account,
            index,
            principal: stake.amount,
            lock_period_days,
            start_time,
            end_time,
            accumulated_claimable_rewards: stake.accumulatedRewards,
        })
    }

    /// All active positions of `account`, in index order.
    pub async fn positions(&self, account: Address) -> Result<Vec<StakePosition>, GatewayError> {
        let count = self.stake_count(account).await?;
        let positions: Vec<StakePosition> = stream::iter(0..count)
            .map(|index| self.position(account, index))
            .buffered(MAX_CONCURRENT_POSITION_READS)
            .try_collect()
            .await?;
        Ok(positions.into_iter().filter(StakePosition::is_active).collect())
    }

    /// Total amount staked by `account`.
    ///
    /// Uses the bulk accessor when the contract has one, otherwise sums the positions.
    pub async fn total_staked(&self, account: Address) -> Result<U256, GatewayError> {
        if self.capabilities.total_staked {
            return self.client.read(IStaking::getTotalStakedCall { user: account }).await;
        }
        let positions = self.positions(account).await?;
        Ok(positions.iter().map(|position| position.principal).sum())
    }

    /// Fixed-rate rewards claimable for the position at `index`, in the token's smallest unit.
    pub async fn claimable_rewards(
        &self,
        account: Address,
        index: u64,
    ) -> Result<U256, GatewayError> {
        self.require(
            self.capabilities.claimable_rewards,
            IStaking::calculateAfrovibeRewardsCall::SIGNATURE,
        )?;
        self.client
            .read(IStaking::calculateAfrovibeRewardsCall {
                user: account,
                stakeIndex: U256::from(index),
            })
            .await
    }

    pub async fn is_paused(&self) -> Result<bool, GatewayError> {
        self.require(self.capabilities.paused, IStaking::pausedCall::SIGNATURE)?;
        self.client.read(IStaking::pausedCall {}).await
    }

    /// Decimal precision declared by the ERC-20 `token`.
    pub async fn token_decimals(&self, token: Address) -> Result<u8, GatewayError> {
        self.client.read_at(token, IERC20::decimalsCall {}).await
    }

    pub async fn token_balance(
        &self,
        token: Address,
        account: Address,
    ) -> Result<U256, GatewayError> {
        self.client.read_at(token, IERC20::balanceOfCall { account }).await
    }

    /// Whether `account` holds at least `amount` of `token`.
    pub async fn has_balance(
        &self,
        token: Address,
        account: Address,
        amount: U256,
    ) -> Result<bool, GatewayError> {
        Ok(self.token_balance(token, account).await? >= amount)
    }

    fn require(&self, supported: bool, method: &'static str) -> Result<(), GatewayError> {
        if !supported {
            return Err(GatewayError::UnsupportedOperation { address: self.address(), method });
        }
        Ok(())
    }
}
