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

//! Gateway to the paymaster that sponsors gas for allow-listed user actions.
//!
//! Sponsorship is restricted to allow-listed targets, action types, function selectors and
//! tokens. Changes to those lists are proposals that go through the contract's timelock; the
//! gas cost ceiling, deposit threshold and authorized funders are updated directly.

use std::sync::Arc;

use alloy::primitives::{keccak256, Address, FixedBytes, TxHash, B256, U256};
use serde::Serialize;

use super::{capabilities, ContractClient, GatewayConfig, Operation};
use crate::{
    contracts::{IAfroVibePaymaster, IERC20},
    error::GatewayError,
    ledger::Ledger,
    session::Session,
    validation::{ensure_non_zero_address, ensure_positive},
};

const REQUIRED_OPERATIONS: &[Operation] = &[
    Operation::of::<IAfroVibePaymaster::depositCall>(),
    Operation::of::<IAfroVibePaymaster::depositTokenCall>(),
    Operation::of::<IAfroVibePaymaster::proposeTargetUpdateCall>(),
    Operation::of::<IAfroVibePaymaster::proposeActionTypeUpdateCall>(),
    Operation::of::<IAfroVibePaymaster::proposeSelectorUpdateCall>(),
    Operation::of::<IAfroVibePaymaster::proposeTokenUpdateCall>(),
    Operation::of::<IAfroVibePaymaster::updateAuthorizedFunderCall>(),
    Operation::of::<IAfroVibePaymaster::updateMaxGasCostCall>(),
    Operation::of::<IAfroVibePaymaster::updateMinDepositThresholdCall>(),
    Operation::of::<IAfroVibePaymaster::maxGasCostCall>(),
    Operation::of::<IAfroVibePaymaster::minDepositThresholdCall>(),
    Operation::of::<IAfroVibePaymaster::validTargetsCall>(),
    Operation::of::<IAfroVibePaymaster::validActionTypesCall>(),
    Operation::of::<IAfroVibePaymaster::validSelectorsCall>(),
    Operation::of::<IAfroVibePaymaster::validTokensCall>(),
    Operation::of::<IAfroVibePaymaster::authorizedFundersCall>(),
];

/// Whether a proposal or update adds to or removes from an allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ListChange {
    Add,
    Remove,
}

impl ListChange {
    fn is_add(self) -> bool {
        matches!(self, Self::Add)
    }
}

/// Sponsorship limits of the paymaster, in the native token's smallest unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SponsorshipLimits {
    pub max_gas_cost: U256,
    pub min_deposit_threshold: U256,
}

/// Identifier of a sponsored action type such as `POST` or `LIKE`.
pub fn compute_action_type_hash(action: &str) -> B256 {
    keccak256(action)
}

/// Function selector of `signature`, e.g. `swap(address,uint256)`.
pub fn compute_selector(signature: &str) -> FixedBytes<4> {
    FixedBytes::from_slice(&keccak256(signature)[..4])
}

#[derive(Debug)]
pub struct PaymasterGateway<L> {
    client: ContractClient<L>,
}

impl<L: Ledger> PaymasterGateway<L> {
    pub async fn connect(
        ledger: Arc<L>,
        address: Address,
        config: GatewayConfig,
    ) -> Result<Self, GatewayError> {
        capabilities::negotiate(ledger.as_ref(), address, REQUIRED_OPERATIONS, &config.retry)
            .await?;
        tracing::debug!(%address, "connected to paymaster contract");
        Ok(Self { client: ContractClient::new(ledger, address, config) })
    }

    pub fn address(&self) -> Address {
        self.client.address
    }

    /// Deposit `amount` of the native token.
    pub async fn deposit(&self, session: &Session, amount: U256) -> Result<TxHash, GatewayError> {
        let amount = ensure_positive("deposit", amount)?;
        self.client.submit_with_value(session, IAfroVibePaymaster::depositCall {}, amount).await
    }

    /// Deposit `amount` of the ERC-20 `token`. The paymaster must be approved to pull it.
    pub async fn deposit_token(
        &self,
        session: &Session,
        token: Address,
        amount: U256,
    ) -> Result<TxHash, GatewayError> {
        let token = ensure_non_zero_address("token", token)?;
        let amount = ensure_positive("deposit", amount)?;
        self.client.submit(session, IAfroVibePaymaster::depositTokenCall { token, amount }).await
    }

    /// Approve the paymaster to pull `amount` of `token` from the session account.
    pub async fn approve_deposit_token(
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

    pub async fn propose_target_update(
        &self,
        session: &Session,
        target: Address,
        change: ListChange,
    ) -> Result<TxHash, GatewayError> {
        let target = ensure_non_zero_address("target", target)?;
        let call = IAfroVibePaymaster::proposeTargetUpdateCall { target, isAdd: change.is_add() };
        self.client.submit(session, call).await
    }

    pub async fn propose_action_type_update(
        &self,
        session: &Session,
        action_type: B256,
        change: ListChange,
    ) -> Result<TxHash, GatewayError> {
        let call = IAfroVibePaymaster::proposeActionTypeUpdateCall {
            actionType: action_type,
            isAdd: change.is_add(),
        };
        self.client.submit(session, call).await
    }

    pub async fn propose_selector_update(
        &self,
        session: &Session,
        selector: FixedBytes<4>,
        change: ListChange,
    ) -> Result<TxHash, GatewayError> {
        let call =
            IAfroVibePaymaster::proposeSelectorUpdateCall { selector, isAdd: change.is_add() };
        self.client.submit(session, call).await
    }

    pub async fn propose_token_update(
        &self,
        session: &Session,
        token: Address,
        change: ListChange,
    ) -> Result<TxHash, GatewayError> {
        let token = ensure_non_zero_address("token", token)?;
        let call = IAfroVibePaymaster::proposeTokenUpdateCall { token, isAdd: change.is_add() };
        self.client.submit(session, call).await
    }

    pub async fn update_authorized_funder(
        &self,
        session: &Session,
        funder: Address,
        change: ListChange,
    ) -> Result<TxHash, GatewayError> {
        let funder = ensure_non_zero_address("funder", funder)?;
        let call =
            IAfroVibePaymaster::updateAuthorizedFunderCall { funder, isAdd: change.is_add() };
        self.client.submit(session, call).await
    }

    pub async fn update_max_gas_cost(
        &self,
        session: &Session,
        max_gas_cost: U256,
    ) -> Result<TxHash, GatewayError> {
        let max_gas_cost = ensure_positive("max gas cost", max_gas_cost)?;
        let call = IAfroVibePaymaster::updateMaxGasCostCall { newMaxGasCost: max_gas_cost };
        self.client.submit(session, call).await
    }

    pub async fn update_min_deposit_threshold(
        &self,
        session: &Session,
        threshold: U256,
    ) -> Result<TxHash, GatewayError> {
        let threshold = ensure_positive("deposit threshold", threshold)?;
        self.client
            .submit(
                session,
                IAfroVibePaymaster::updateMinDepositThresholdCall { newThreshold: threshold },
            )
            .await
    }

    pub async fn max_gas_cost(&self) -> Result<U256, GatewayError> {
        self.client.read(IAfroVibePaymaster::maxGasCostCall {}).await
    }

    pub async fn min_deposit_threshold(&self) -> Result<U256, GatewayError> {
        self.client.read(IAfroVibePaymaster::minDepositThresholdCall {}).await
    }

    pub async fn sponsorship_limits(&self) -> Result<SponsorshipLimits, GatewayError> {
        let (max_gas_cost, min_deposit_threshold) =
            tokio::try_join!(self.max_gas_cost(), self.min_deposit_threshold())?;
        Ok(SponsorshipLimits { max_gas_cost, min_deposit_threshold })
    }

    pub async fn is_valid_target(&self, target: Address) -> Result<bool, GatewayError> {
        let target = ensure_non_zero_address("target", target)?;
        self.client.read(IAfroVibePaymaster::validTargetsCall { target }).await
    }

    pub async fn is_valid_action_type(&self, action_type: B256) -> Result<bool, GatewayError> {
        self.client.read(IAfroVibePaymaster::validActionTypesCall { actionType: action_type }).await
    }

    pub async fn is_valid_selector(&self, selector: FixedBytes<4>) -> Result<bool, GatewayError> {
        self.client.read(IAfroVibePaymaster::validSelectorsCall { selector }).await
    }

    pub async fn is_valid_token(&self, token: Address) -> Result<bool, GatewayError> {
        let token = ensure_non_zero_address("token", token)?;
        self.client.read(IAfroVibePaymaster::validTokensCall { token }).await
    }

    pub async fn is_authorized_funder(&self, funder: Address) -> Result<bool, GatewayError> {
        let funder = ensure_non_zero_address("funder", funder)?;
        self.client.read(IAfroVibePaymaster::authorizedFundersCall { funder }).await
    }

    /// Decimals of a deposit token.
    pub async fn token_decimals(&self, token: Address) -> Result<u8, GatewayError> {
        let token = ensure_non_zero_address("token", token)?;
        self.client.read_at(token, IERC20::decimalsCall {}).await
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::fixed_bytes;

    use super::*;

    #[test]
    fn action_type_and_selector_hashes() {
        assert_eq!(compute_selector("transfer(address,uint256)"), fixed_bytes!("0xa9059cbb"));
        assert_eq!(compute_selector("approve(address,uint256)"), fixed_bytes!("0x095ea7b3"));
        // a selector is the head of the signature's hash
        let hash = compute_action_type_hash("swap(address,uint256)");
        assert_eq!(compute_selector("swap(address,uint256)").as_slice(), &hash[..4]);
        assert_ne!(compute_action_type_hash("POST"), compute_action_type_hash("LIKE"));
    }
}
