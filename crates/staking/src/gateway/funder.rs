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

//! Gateway to the paymaster-funder contract that keeps the sponsoring paymaster topped up.

use std::sync::Arc;

use alloy::{
    primitives::{keccak256, Address, TxHash, B256, U256},
    sol_types::{SolCall, SolValue},
};
use serde::Serialize;

use super::{capabilities, to_u64, ContractClient, GatewayConfig, Operation};
use crate::{
    contracts::{IPaymasterFunder, IERC20},
    error::{GatewayError, ValidationError},
    ledger::Ledger,
    session::Session,
    validation::{ensure_non_zero_address, ensure_positive},
};

const REQUIRED_OPERATIONS: &[Operation] = &[
    Operation::of::<IPaymasterFunder::fundCall>(),
    Operation::of::<IPaymasterFunder::initiateUpdateMaxFundingAmountCall>(),
    Operation::of::<IPaymasterFunder::executeUpdateMaxFundingAmountCall>(),
    Operation::of::<IPaymasterFunder::initiateEmergencyWithdrawCall>(),
    Operation::of::<IPaymasterFunder::executeEmergencyWithdrawCall>(),
    Operation::of::<IPaymasterFunder::grantFunderRoleCall>(),
    Operation::of::<IPaymasterFunder::revokeFunderRoleCall>(),
    Operation::of::<IPaymasterFunder::pauseCall>(),
    Operation::of::<IPaymasterFunder::unpauseCall>(),
    Operation::of::<IPaymasterFunder::FUNDER_ROLECall>(),
    Operation::of::<IPaymasterFunder::PAUSER_ROLECall>(),
    Operation::of::<IPaymasterFunder::DEFAULT_ADMIN_ROLECall>(),
    Operation::of::<IPaymasterFunder::hasRoleCall>(),
    Operation::of::<IPaymasterFunder::minFundingAmountCall>(),
    Operation::of::<IPaymasterFunder::maxFundingAmountCall>(),
    Operation::of::<IPaymasterFunder::maxContractBalanceCall>(),
    Operation::of::<IPaymasterFunder::getPaymasterBalanceCall>(),
    Operation::of::<IPaymasterFunder::getFundingHistoryLengthCall>(),
    Operation::of::<IPaymasterFunder::fundingHistoryCall>(),
    Operation::of::<IPaymasterFunder::timelockActionsCall>(),
    Operation::of::<IPaymasterFunder::pausedCall>(),
    Operation::of::<IPaymasterFunder::sonicSTokenCall>(),
];

/// Timelocked action name for a max funding amount update.
pub const UPDATE_MAX_FUNDING_ACTION: &str = "updateMaxFundingAmount";
/// Timelocked action name for an emergency withdrawal.
pub const EMERGENCY_WITHDRAW_ACTION: &str = "emergencyWithdraw";

/// Access-control roles of the funder contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Role {
    Funder,
    Admin,
    Pauser,
}

/// Per-call funding limits enforced by the funder contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FundingBounds {
    pub min: U256,
    pub max: U256,
}

impl FundingBounds {
    /// Reject `amount` locally when the contract would revert on it.
    pub fn check(&self, amount: U256) -> Result<U256, ValidationError> {
        if amount < self.min || amount > self.max {
            return Err(ValidationError::AmountOutOfRange {
                field: "funding",
                amount,
                min: self.min,
                max: self.max,
            });
        }
        Ok(amount)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FundingRecord {
    pub funder: Address,
    pub amount: U256,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelockAction {
    pub action: String,
    pub amount: U256,
    /// Time after which the action can be executed.
    pub timestamp: u64,
    pub executed: bool,
}

/// Identifier of a timelocked action, as derived by the funder contract.
pub fn compute_action_id(action: &str, amount: U256, timestamp: u64) -> B256 {
    keccak256((action.to_string(), amount, U256::from(timestamp)).abi_encode_params())
}

pub struct PaymasterFunderGateway<L> {
    client: ContractClient<L>,
}

impl<L: Ledger> PaymasterFunderGateway<L> {
    pub async fn connect(
        ledger: Arc<L>,
        address: Address,
        config: GatewayConfig,
    ) -> Result<Self, GatewayError> {
        capabilities::negotiate(ledger.as_ref(), address, REQUIRED_OPERATIONS, &config.retry)
            .await?;
        tracing::debug!(%address, "connected to paymaster funder contract");
        Ok(Self { client: ContractClient::new(ledger, address, config) })
    }

    pub fn address(&self) -> Address {
        self.client.address
    }

    /// Fund the paymaster with `amount` of the funding token.
    ///
    /// The amount is checked against the contract's funding bounds before submission.
    pub async fn fund(&self, session: &Session, amount: U256) -> Result<TxHash, GatewayError> {
        let amount = ensure_positive("funding", amount)?;
        let amount = self.funding_bounds().await?.check(amount)?;
        self.client.submit(session, IPaymasterFunder::fundCall { amount }).await
    }

    /// Approve `spender` to pull `amount` of the funding token from the session account.
    pub async fn approve_funding_token(
        &self,
        session: &Session,
        spender: Address,
        amount: U256,
    ) -> Result<TxHash, GatewayError> {
        let spender = ensure_non_zero_address("spender", spender)?;
        let amount = ensure_positive("approval", amount)?;
        let token = self.funding_token().await?;
        self.client.submit_to(session, token, IERC20::approveCall { spender, amount }).await
    }

    pub async fn initiate_update_max_funding_amount(
        &self,
        session: &Session,
        new_amount: U256,
    ) -> Result<TxHash, GatewayError> {
        let new_amount = ensure_positive("max funding", new_amount)?;
        self.client
            .submit(
                session,
                IPaymasterFunder::initiateUpdateMaxFundingAmountCall { newAmount: new_amount },
            )
            .await
    }

    pub async fn execute_update_max_funding_amount(
        &self,
        session: &Session,
        action_id: B256,
    ) -> Result<TxHash, GatewayError> {
        self.client
            .submit(
                session,
                IPaymasterFunder::executeUpdateMaxFundingAmountCall { actionId: action_id },
            )
            .await
    }

    pub async fn initiate_emergency_withdraw(
        &self,
        session: &Session,
        to: Address,
        amount: U256,
    ) -> Result<TxHash, GatewayError> {
        let to = ensure_non_zero_address("recipient", to)?;
        let amount = ensure_positive("withdrawal", amount)?;
        self.client
            .submit(session, IPaymasterFunder::initiateEmergencyWithdrawCall { to, amount })
            .await
    }

    pub async fn execute_emergency_withdraw(
        &self,
        session: &Session,
        action_id: B256,
        to: Address,
    ) -> Result<TxHash, GatewayError> {
        let to = ensure_non_zero_address("recipient", to)?;
        self.client
            .submit(
                session,
                IPaymasterFunder::executeEmergencyWithdrawCall { actionId: action_id, to },
            )
            .await
    }

    pub async fn grant_funder_role(
        &self,
        session: &Session,
        account: Address,
    ) -> Result<TxHash, GatewayError> {
        let account = ensure_non_zero_address("account", account)?;
        self.client.submit(session, IPaymasterFunder::grantFunderRoleCall { account }).await
    }

    pub async fn revoke_funder_role(
        &self,
        session: &Session,
        account: Address,
    ) -> Result<TxHash, GatewayError> {
        let account = ensure_non_zero_address("account", account)?;
        self.client.submit(session, IPaymasterFunder::revokeFunderRoleCall { account }).await
    }

    pub async fn pause(&self, session: &Session) -> Result<TxHash, GatewayError> {
        self.client.submit(session, IPaymasterFunder::pauseCall {}).await
    }

    pub async fn unpause(&self, session: &Session) -> Result<TxHash, GatewayError> {
        self.client.submit(session, IPaymasterFunder::unpauseCall {}).await
    }

    /// Identifier the contract uses for `role`.
    pub async fn role_id(&self, role: Role) -> Result<B256, GatewayError> {
        match role {
            Role::Funder => self.client.read(IPaymasterFunder::FUNDER_ROLECall {}).await,
            Role::Admin => self.client.read(IPaymasterFunder::DEFAULT_ADMIN_ROLECall {}).await,
            Role::Pauser => self.client.read(IPaymasterFunder::PAUSER_ROLECall {}).await,
        }
    }

    pub async fn has_role(&self, role: Role, account: Address) -> Result<bool, GatewayError> {
        let role = self.role_id(role).await?;
        self.client.read(IPaymasterFunder::hasRoleCall { role, account }).await
    }

    pub async fn is_funder(&self, account: Address) -> Result<bool, GatewayError> {
        self.has_role(Role::Funder, account).await
    }

    pub async fn is_admin(&self, account: Address) -> Result<bool, GatewayError> {
        self.has_role(Role::Admin, account).await
    }

    pub async fn is_pauser(&self, account: Address) -> Result<bool, GatewayError> {
        self.has_role(Role::Pauser, account).await
    }

    pub async fn min_funding_amount(&self) -> Result<U256, GatewayError> {
        self.client.read(IPaymasterFunder::minFundingAmountCall {}).await
    }

    pub async fn max_funding_amount(&self) -> Result<U256, GatewayError> {
        self.client.read(IPaymasterFunder::maxFundingAmountCall {}).await
    }

    pub async fn max_contract_balance(&self) -> Result<U256, GatewayError> {
        self.client.read(IPaymasterFunder::maxContractBalanceCall {}).await
    }

    pub async fn funding_bounds(&self) -> Result<FundingBounds, GatewayError> {
        let (min, max) = tokio::try_join!(self.min_funding_amount(), self.max_funding_amount())?;
        Ok(FundingBounds { min, max })
    }

    /// Paymaster the contract tops up.
    pub async fn paymaster(&self) -> Result<Address, GatewayError> {
        self.client.read(IPaymasterFunder::paymasterCall {}).await
    }

    pub async fn paymaster_balance(&self) -> Result<U256, GatewayError> {
        self.client.read(IPaymasterFunder::getPaymasterBalanceCall {}).await
    }

    pub async fn funding_history_length(&self) -> Result<u64, GatewayError> {
        let length = self.client.read(IPaymasterFunder::getFundingHistoryLengthCall {}).await?;
        to_u64(IPaymasterFunder::getFundingHistoryLengthCall::SIGNATURE, length)
    }

    pub async fn funding_history(&self, index: u64) -> Result<FundingRecord, GatewayError> {
        let record = self
            .client
            .read(IPaymasterFunder::fundingHistoryCall { index: U256::from(index) })
            .await?;
        Ok(FundingRecord {
            funder: record.funder,
            amount: record.amount,
            timestamp: to_u64(
                IPaymasterFunder::fundingHistoryCall::SIGNATURE,
                record.timestamp,
            )?,
        })
    }

    pub async fn is_paused(&self) -> Result<bool, GatewayError> {
        self.client.read(IPaymasterFunder::pausedCall {}).await
    }

    /// ERC-20 token the paymaster is funded with.
    pub async fn funding_token(&self) -> Result<Address, GatewayError> {
        self.client.read(IPaymasterFunder::sonicSTokenCall {}).await
    }

    pub async fn funding_token_decimals(&self) -> Result<u8, GatewayError> {
        let token = self.funding_token().await?;
        self.client.read_at(token, IERC20::decimalsCall {}).await
    }

    pub async fn timelock_action(&self, action_id: B256) -> Result<TimelockAction, GatewayError> {
        let action =
            self.client.read(IPaymasterFunder::timelockActionsCall { actionId: action_id }).await?;
        Ok(TimelockAction {
            action: action.action,
            amount: action.amount,
            timestamp: to_u64(
                IPaymasterFunder::timelockActionsCall::SIGNATURE,
                action.timestamp,
            )?,
            executed: action.executed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_id_matches_abi_encoding() {
        let amount = U256::from(1_000u64);
        let encoded = (UPDATE_MAX_FUNDING_ACTION.to_string(), amount, U256::from(1_700_000_000u64))
            .abi_encode_params();
        // head: string offset, amount, timestamp; tail: length then padded bytes
        assert_eq!(encoded.len(), 32 * 5);
        assert_eq!(&encoded[..32], &U256::from(0x60).to_be_bytes::<32>());
        assert_eq!(
            &encoded[96..128],
            &U256::from(UPDATE_MAX_FUNDING_ACTION.len()).to_be_bytes::<32>()
        );
        assert_eq!(
            compute_action_id(UPDATE_MAX_FUNDING_ACTION, amount, 1_700_000_000),
            keccak256(&encoded)
        );
        assert_ne!(
            compute_action_id(EMERGENCY_WITHDRAW_ACTION, amount, 1_700_000_000),
            compute_action_id(UPDATE_MAX_FUNDING_ACTION, amount, 1_700_000_000)
        );
    }

    #[test]
    fn funding_bounds_are_inclusive() {
        let bounds = FundingBounds { min: U256::from(10), max: U256::from(100) };
        assert_eq!(bounds.check(U256::from(10)), Ok(U256::from(10)));
        assert_eq!(bounds.check(U256::from(100)), Ok(U256::from(100)));
        assert_eq!(
            bounds.check(U256::from(101)),
            Err(ValidationError::AmountOutOfRange {
                field: "funding",
                amount: U256::from(101),
                min: U256::from(10),
                max: U256::from(100),
            })
        );
        assert!(bounds.check(U256::from(9)).is_err());
    }
}
