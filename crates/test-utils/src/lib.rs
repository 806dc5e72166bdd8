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

//! Test utilities for the AfroVibe staking engine.
//!
//! Provides an in-memory [MockLedger](ledger::MockLedger) with scripted contract responses, a
//! test context wiring it to the staking, token, paymaster and funder deployments, and mock HTTP
//! servers for the index and APR services.

pub mod ledger;
pub mod servers;

use std::sync::Arc;

use afrovibe_staking::{
    contracts::{IAfroVibePaymaster, IPaymasterFunder, IStaking, IERC20},
    Deployment, GatewayConfig, PaymasterFunderGateway, PaymasterGateway, RetryPolicy, Session,
    StakingGateway,
};
use alloy::{
    primitives::{address, Address, U256},
    sol_types::SolCall,
};
use anyhow::Context;

pub use ledger::MockLedger;

/// Chain ID of the Sonic Blaze testnet.
pub const CHAIN_ID: u64 = 57054;

pub const STAKING_ADDRESS: Address = address!("0x5a1e000000000000000000000000000000000001");
pub const STAKE_TOKEN_ADDRESS: Address = address!("0x5a1e000000000000000000000000000000000002");
pub const PAYMASTER_FUNDER_ADDRESS: Address =
    address!("0x5a1e000000000000000000000000000000000003");
pub const PAYMASTER_ADDRESS: Address = address!("0x5a1e000000000000000000000000000000000004");
/// Implementations behind the paymaster and funder proxies.
pub const PAYMASTER_IMPLEMENTATION_ADDRESS: Address =
    address!("0x5a1e000000000000000000000000000000000014");
pub const PAYMASTER_FUNDER_IMPLEMENTATION_ADDRESS: Address =
    address!("0x5a1e000000000000000000000000000000000013");
pub const ACCOUNT: Address = address!("0xacc0000000000000000000000000000000000001");

/// Selectors of the operations every staking deployment must expose.
pub fn required_staking_selectors() -> Vec<[u8; 4]> {
    vec![
        IStaking::stakeCall::SELECTOR,
        IStaking::unstakeCall::SELECTOR,
        IStaking::claimRewardsCall::SELECTOR,
        IStaking::bridgeTokensCall::SELECTOR,
        IStaking::delegateToValidatorCall::SELECTOR,
        IStaking::createProposalCall::SELECTOR,
        IStaking::verifyProposalVoterCall::SELECTOR,
        IStaking::proposeUpgradeCall::SELECTOR,
        IStaking::confirmUpgradeCall::SELECTOR,
        IStaking::sonicPointsCall::SELECTOR,
        IStaking::stakeCountCall::SELECTOR,
        IStaking::stakesCall::SELECTOR,
    ]
}

/// Required selectors plus every optional accessor.
pub fn full_staking_selectors() -> Vec<[u8; 4]> {
    let mut selectors = required_staking_selectors();
    selectors.extend([
        IStaking::getTotalStakedCall::SELECTOR,
        IStaking::calculateAfrovibeRewardsCall::SELECTOR,
        IStaking::pausedCall::SELECTOR,
    ]);
    selectors
}

pub fn funder_selectors() -> Vec<[u8; 4]> {
    vec![
        IPaymasterFunder::fundCall::SELECTOR,
        IPaymasterFunder::initiateUpdateMaxFundingAmountCall::SELECTOR,
        IPaymasterFunder::executeUpdateMaxFundingAmountCall::SELECTOR,
        IPaymasterFunder::initiateEmergencyWithdrawCall::SELECTOR,
        IPaymasterFunder::executeEmergencyWithdrawCall::SELECTOR,
        IPaymasterFunder::grantFunderRoleCall::SELECTOR,
        IPaymasterFunder::revokeFunderRoleCall::SELECTOR,
        IPaymasterFunder::pauseCall::SELECTOR,
        IPaymasterFunder::unpauseCall::SELECTOR,
        IPaymasterFunder::FUNDER_ROLECall::SELECTOR,
        IPaymasterFunder::PAUSER_ROLECall::SELECTOR,
        IPaymasterFunder::DEFAULT_ADMIN_ROLECall::SELECTOR,
        IPaymasterFunder::hasRoleCall::SELECTOR,
        IPaymasterFunder::minFundingAmountCall::SELECTOR,
        IPaymasterFunder::maxFundingAmountCall::SELECTOR,
        IPaymasterFunder::maxContractBalanceCall::SELECTOR,
        IPaymasterFunder::getPaymasterBalanceCall::SELECTOR,
        IPaymasterFunder::getFundingHistoryLengthCall::SELECTOR,
        IPaymasterFunder::fundingHistoryCall::SELECTOR,
        IPaymasterFunder::timelockActionsCall::SELECTOR,
        IPaymasterFunder::pausedCall::SELECTOR,
        IPaymasterFunder::sonicSTokenCall::SELECTOR,
    ]
}

pub fn paymaster_selectors() -> Vec<[u8; 4]> {
    vec![
        IAfroVibePaymaster::depositCall::SELECTOR,
        IAfroVibePaymaster::depositTokenCall::SELECTOR,
        IAfroVibePaymaster::proposeTargetUpdateCall::SELECTOR,
        IAfroVibePaymaster::proposeActionTypeUpdateCall::SELECTOR,
        IAfroVibePaymaster::proposeSelectorUpdateCall::SELECTOR,
        IAfroVibePaymaster::proposeTokenUpdateCall::SELECTOR,
        IAfroVibePaymaster::updateAuthorizedFunderCall::SELECTOR,
        IAfroVibePaymaster::updateMaxGasCostCall::SELECTOR,
        IAfroVibePaymaster::updateMinDepositThresholdCall::SELECTOR,
        IAfroVibePaymaster::maxGasCostCall::SELECTOR,
        IAfroVibePaymaster::minDepositThresholdCall::SELECTOR,
        IAfroVibePaymaster::validTargetsCall::SELECTOR,
        IAfroVibePaymaster::validActionTypesCall::SELECTOR,
        IAfroVibePaymaster::validSelectorsCall::SELECTOR,
        IAfroVibePaymaster::validTokensCall::SELECTOR,
        IAfroVibePaymaster::authorizedFundersCall::SELECTOR,
    ]
}

/// A stake position as scripted on the mock ledger.
#[derive(Clone, Copy, Debug)]
pub struct ScriptedStake {
    pub amount: U256,
    pub lock_period_days: u64,
    pub start_time: u64,
    pub accumulated_rewards: U256,
}

impl ScriptedStake {
    pub fn new(amount: U256, lock_period_days: u64, start_time: u64) -> Self {
        Self { amount, lock_period_days, start_time, accumulated_rewards: U256::ZERO }
    }
}

#[derive(Clone)]
pub struct TestCtx {
    pub ledger: Arc<MockLedger>,
    pub deployment: Deployment,
    pub session: Session,
}

/// Creates a new [TestCtx] whose staking contract exposes every operation.
pub fn test_ctx() -> anyhow::Result<TestCtx> {
    test_ctx_with(&full_staking_selectors())
}

/// Creates a new [TestCtx] whose staking contract exposes `staking_selectors` only.
///
/// The paymaster and the funder are deployed behind EIP-1967 proxies.
pub fn test_ctx_with(staking_selectors: &[[u8; 4]]) -> anyhow::Result<TestCtx> {
    let ledger = Arc::new(MockLedger::new());
    ledger.deploy(STAKING_ADDRESS, staking_selectors);
    ledger.deploy(
        STAKE_TOKEN_ADDRESS,
        &[
            IERC20::balanceOfCall::SELECTOR,
            IERC20::decimalsCall::SELECTOR,
            IERC20::approveCall::SELECTOR,
        ],
    );
    ledger.deploy(PAYMASTER_FUNDER_IMPLEMENTATION_ADDRESS, &funder_selectors());
    ledger.deploy_proxy(PAYMASTER_FUNDER_ADDRESS, PAYMASTER_FUNDER_IMPLEMENTATION_ADDRESS);
    ledger.deploy(PAYMASTER_IMPLEMENTATION_ADDRESS, &paymaster_selectors());
    ledger.deploy_proxy(PAYMASTER_ADDRESS, PAYMASTER_IMPLEMENTATION_ADDRESS);
    ledger.on_call::<IERC20::decimalsCall>(STAKE_TOKEN_ADDRESS, 18);
    ledger.on_call::<IPaymasterFunder::sonicSTokenCall>(
        PAYMASTER_FUNDER_ADDRESS,
        STAKE_TOKEN_ADDRESS,
    );

    let deployment = Deployment::builder()
        .chain_id(CHAIN_ID)
        .staking_address(STAKING_ADDRESS)
        .stake_token_address(STAKE_TOKEN_ADDRESS)
        .paymaster_funder_address(PAYMASTER_FUNDER_ADDRESS)
        .paymaster_address(PAYMASTER_ADDRESS)
        .build()
        .context("failed to build deployment")?;

    Ok(TestCtx { ledger, deployment, session: Session::new(ACCOUNT, CHAIN_ID) })
}

impl TestCtx {
    pub fn account(&self) -> Address {
        self.session.account()
    }

    /// Gateway config retrying with the default budgets.
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig::default()
    }

    /// Gateway config that never retries, for tests not exercising the backoff schedule.
    pub fn gateway_config_without_retry(&self) -> GatewayConfig {
        GatewayConfig { retry: RetryPolicy::never(), ..GatewayConfig::default() }
    }

    pub async fn staking_gateway(
        &self,
        config: GatewayConfig,
    ) -> anyhow::Result<StakingGateway<MockLedger>> {
        StakingGateway::connect(self.ledger.clone(), self.deployment.staking_address, config)
            .await
            .context("failed to connect to staking contract")
    }

    pub async fn funder_gateway(
        &self,
        config: GatewayConfig,
    ) -> anyhow::Result<PaymasterFunderGateway<MockLedger>> {
        let address = self
            .deployment
            .paymaster_funder_address
            .context("deployment has no paymaster funder")?;
        PaymasterFunderGateway::connect(self.ledger.clone(), address, config)
            .await
            .context("failed to connect to paymaster funder contract")
    }

    pub async fn paymaster_gateway(
        &self,
        config: GatewayConfig,
    ) -> anyhow::Result<PaymasterGateway<MockLedger>> {
        let address =
            self.deployment.paymaster_address.context("deployment has no paymaster")?;
        PaymasterGateway::connect(self.ledger.clone(), address, config)
            .await
            .context("failed to connect to paymaster contract")
    }

    /// Script the positions of `account`, index by index, and its points balance.
    pub fn script_account(&self, account: Address, sonic_points: U256, stakes: &[ScriptedStake]) {
        let staking = self.deployment.staking_address;
        self.ledger.on_exact_call(
            staking,
            IStaking::sonicPointsCall { user: account },
            sonic_points,
        );
        self.ledger.on_exact_call(
            staking,
            IStaking::stakeCountCall { user: account },
            U256::from(stakes.len()),
        );
        for (index, stake) in stakes.iter().enumerate() {
            let end_time = match stake.amount.is_zero() {
                true => 0,
                false => stake.start_time + stake.lock_period_days * 86_400,
            };
            self.ledger.on_exact_call(
                staking,
                IStaking::stakesCall { user: account, index: U256::from(index) },
                IStaking::stakesReturn {
                    amount: stake.amount,
                    lockPeriod: U256::from(stake.lock_period_days),
                    startTime: U256::from(stake.start_time),
                    endTime: U256::from(end_time),
                    accumulatedRewards: stake.accumulated_rewards,
                },
            );
        }
        let total = stakes.iter().map(|stake| stake.amount).sum::<U256>();
        self.ledger.on_exact_call(staking, IStaking::getTotalStakedCall { user: account }, total);
    }
}
