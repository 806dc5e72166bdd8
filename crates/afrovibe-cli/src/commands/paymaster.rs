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

//! Commands of the AfroVibe CLI for the paymaster contract.

use std::sync::Arc;

use afrovibe_staking::{
    gateway::paymaster::{compute_action_type_hash, compute_selector},
    validation::{parse_amount, parse_bytes32, parse_selector},
    ListChange, PaymasterGateway, Session, TxKind, ValidationError,
};
use alloy::primitives::{Address, FixedBytes, TxHash, B256};
use anyhow::Result;
use clap::{Args, Subcommand};

use crate::{
    commands::{await_settlement, format_amount},
    config::{parse_account, CliLedger, GlobalConfig},
};

/// A 0x-prefixed action type hash, or an action name such as `POST` to hash.
fn parse_action_type(value: &str) -> Result<B256, ValidationError> {
    match value.starts_with("0x") {
        true => parse_bytes32("action type", value),
        false => Ok(compute_action_type_hash(value)),
    }
}

/// A 0x-prefixed selector, or a function signature such as `post(bytes32,string)` to hash.
fn parse_function_selector(value: &str) -> Result<FixedBytes<4>, ValidationError> {
    match value.starts_with("0x") {
        true => parse_selector(value),
        false if value.contains('(') && value.ends_with(')') => Ok(compute_selector(value)),
        false => Err(ValidationError::InvalidValue {
            field: "selector",
            reason: format!("expected 0x-prefixed bytes4 or a function signature, got {value}"),
        }),
    }
}

/// Commands for the paymaster contract.
#[derive(Subcommand, Clone, Debug)]
pub enum PaymasterCommands {
    /// Deposit native tokens to sponsor gas.
    Deposit(PaymasterDeposit),
    /// Deposit ERC-20 tokens to sponsor gas.
    DepositToken(PaymasterDepositToken),
    /// Propose adding or removing a sponsored target contract.
    ProposeTarget(PaymasterProposeTarget),
    /// Propose adding or removing a sponsored action type.
    ProposeActionType(PaymasterProposeActionType),
    /// Propose adding or removing a sponsored function selector.
    ProposeSelector(PaymasterProposeSelector),
    /// Propose adding or removing an accepted deposit token.
    ProposeToken(PaymasterProposeToken),
    /// Authorize an account to deposit, or revoke its authorization.
    AuthorizeFunder(PaymasterAuthorizeFunder),
    /// Set the maximum gas cost sponsored per operation.
    SetMaxGasCost(PaymasterSetMaxGasCost),
    /// Set the minimum deposit.
    SetMinDepositThreshold(PaymasterSetMinDepositThreshold),
    /// Show the sponsorship limits and, optionally, allow-list membership.
    Status(PaymasterStatus),
    /// Compute the hash of an action type without connecting to the ledger.
    ActionTypeHash(PaymasterActionTypeHash),
    /// Compute a function selector without connecting to the ledger.
    Selector(PaymasterSelector),
}

impl PaymasterCommands {
    /// Run the command.
    pub async fn run(&self, global_config: &GlobalConfig) -> Result<()> {
        match self {
            Self::Deposit(cmd) => cmd.run(global_config).await,
            Self::DepositToken(cmd) => cmd.run(global_config).await,
            Self::ProposeTarget(cmd) => cmd.run(global_config).await,
            Self::ProposeActionType(cmd) => cmd.run(global_config).await,
            Self::ProposeSelector(cmd) => cmd.run(global_config).await,
            Self::ProposeToken(cmd) => cmd.run(global_config).await,
            Self::AuthorizeFunder(cmd) => cmd.run(global_config).await,
            Self::SetMaxGasCost(cmd) => cmd.run(global_config).await,
            Self::SetMinDepositThreshold(cmd) => cmd.run(global_config).await,
            Self::Status(cmd) => cmd.run(global_config).await,
            Self::ActionTypeHash(cmd) => cmd.run(),
            Self::Selector(cmd) => cmd.run(),
        }
    }
}

/// Signing ledger, session and paymaster gateway for a state-changing command.
async fn connect(
    global_config: &GlobalConfig,
) -> Result<(Arc<CliLedger>, Session, PaymasterGateway<CliLedger>)> {
    let (ledger, session) = global_config.connect_session().await?;
    let paymaster = global_config.paymaster_gateway(ledger.clone()).await?;
    Ok((ledger, session, paymaster))
}

/// Wait for an allow-list proposal or parameter update to settle.
async fn settle_admin(
    global_config: &GlobalConfig,
    ledger: Arc<CliLedger>,
    session: &Session,
    tx_hash: TxHash,
) -> Result<()> {
    let kind = TxKind::PaymasterAdmin;
    await_settlement(global_config, ledger, session, tx_hash, kind, None).await?;
    Ok(())
}

fn list_change(remove: bool) -> ListChange {
    match remove {
        true => ListChange::Remove,
        false => ListChange::Add,
    }
}

/// Command to deposit native tokens.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct PaymasterDeposit {
    /// Amount to deposit, in whole native tokens.
    #[clap(long)]
    pub amount: String,
}

impl PaymasterDeposit {
    /// Run the [PaymasterDeposit] command.
    pub async fn run(&self, global_config: &GlobalConfig) -> Result<()> {
        let (ledger, session, paymaster) = connect(global_config).await?;
        // the native token has 18 decimals
        let amount = parse_amount("deposit", &self.amount, 18)?;

        let tx_hash = paymaster.deposit(&session, amount).await?;
        tracing::info!(%tx_hash, "Sent transaction for deposit");
        let kind = TxKind::Deposit;
        let tx =
            await_settlement(global_config, ledger, &session, tx_hash, kind, Some(amount)).await?;
        let deposited = format_amount(tx.amount.unwrap_or(amount), 18)?;
        tracing::info!("Deposited {deposited} native tokens");
        Ok(())
    }
}

/// Command to deposit ERC-20 tokens.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct PaymasterDepositToken {
    /// Token to deposit.
    #[clap(long, value_parser = parse_account)]
    pub token: Address,
    /// Amount to deposit, in whole tokens.
    #[clap(long)]
    pub amount: String,
    /// Do not approve the paymaster to pull the tokens first.
    #[clap(long)]
    pub no_approve: bool,
}

impl PaymasterDepositToken {
    /// Run the [PaymasterDepositToken] command.
    pub async fn run(&self, global_config: &GlobalConfig) -> Result<()> {
        let (ledger, session, paymaster) = connect(global_config).await?;
        let decimals = paymaster.token_decimals(self.token).await?;
        let amount = parse_amount("deposit", &self.amount, decimals)?;

        if !self.no_approve {
            let tx_hash = paymaster.approve_deposit_token(&session, self.token, amount).await?;
            tracing::info!(%tx_hash, "Sent approval for deposit");
            let kind = TxKind::Approve;
            await_settlement(global_config, ledger.clone(), &session, tx_hash, kind, None).await?;
        }

        let tx_hash = paymaster.deposit_token(&session, self.token, amount).await?;
        tracing::info!(%tx_hash, "Sent transaction for token deposit");
        let kind = TxKind::Deposit;
        let tx =
            await_settlement(global_config, ledger, &session, tx_hash, kind, Some(amount)).await?;
        tracing::info!(
            "Deposited {} tokens of {}",
            format_amount(tx.amount.unwrap_or(amount), decimals)?,
            self.token
        );
        Ok(())
    }
}

/// Command to propose a target contract update.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct PaymasterProposeTarget {
    /// Target contract.
    #[clap(value_parser = parse_account)]
    pub target: Address,
    /// Propose removing the target instead of adding it.
    #[clap(long)]
    pub remove: bool,
}

impl PaymasterProposeTarget {
    /// Run the [PaymasterProposeTarget] command.
    pub async fn run(&self, global_config: &GlobalConfig) -> Result<()> {
        let (ledger, session, paymaster) = connect(global_config).await?;
        let change = list_change(self.remove);
        let tx_hash = paymaster.propose_target_update(&session, self.target, change).await?;
        settle_admin(global_config, ledger, &session, tx_hash).await?;
        tracing::info!("Proposed {change:?} of target {}", self.target);
        Ok(())
    }
}

/// Command to propose an action type update.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct PaymasterProposeActionType {
    /// Action name such as `POST`, or its 0x-prefixed hash.
    #[clap(value_parser = parse_action_type)]
    pub action_type: B256,
    /// Propose removing the action type instead of adding it.
    #[clap(long)]
    pub remove: bool,
}

impl PaymasterProposeActionType {
    /// Run the [PaymasterProposeActionType] command.
    pub async fn run(&self, global_config: &GlobalConfig) -> Result<()> {
        let (ledger, session, paymaster) = connect(global_config).await?;
        let change = list_change(self.remove);
        let tx_hash =
            paymaster.propose_action_type_update(&session, self.action_type, change).await?;
        settle_admin(global_config, ledger, &session, tx_hash).await?;
        tracing::info!("Proposed {change:?} of action type {}", self.action_type);
        Ok(())
    }
}

/// Command to propose a function selector update.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct PaymasterProposeSelector {
    /// Function signature such as `post(bytes32,string)`, or its 0x-prefixed selector.
    #[clap(value_parser = parse_function_selector)]
    pub selector: FixedBytes<4>,
    /// Propose removing the selector instead of adding it.
    #[clap(long)]
    pub remove: bool,
}

impl PaymasterProposeSelector {
    /// Run the [PaymasterProposeSelector] command.
    pub async fn run(&self, global_config: &GlobalConfig) -> Result<()> {
        let (ledger, session, paymaster) = connect(global_config).await?;
        let change = list_change(self.remove);
        let tx_hash = paymaster.propose_selector_update(&session, self.selector, change).await?;
        settle_admin(global_config, ledger, &session, tx_hash).await?;
        tracing::info!("Proposed {change:?} of selector {}", self.selector);
        Ok(())
    }
}

/// Command to propose a deposit token update.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct PaymasterProposeToken {
    /// Deposit token.
    #[clap(value_parser = parse_account)]
    pub token: Address,
    /// Propose removing the token instead of adding it.
    #[clap(long)]
    pub remove: bool,
}

impl PaymasterProposeToken {
    /// Run the [PaymasterProposeToken] command.
    pub async fn run(&self, global_config: &GlobalConfig) -> Result<()> {
        let (ledger, session, paymaster) = connect(global_config).await?;
        let change = list_change(self.remove);
        let tx_hash = paymaster.propose_token_update(&session, self.token, change).await?;
        settle_admin(global_config, ledger, &session, tx_hash).await?;
        tracing::info!("Proposed {change:?} of token {}", self.token);
        Ok(())
    }
}

/// Command to authorize or deauthorize a funder.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct PaymasterAuthorizeFunder {
    /// Account allowed to deposit.
    #[clap(value_parser = parse_account)]
    pub funder: Address,
    /// Revoke the authorization instead of granting it.
    #[clap(long)]
    pub remove: bool,
}

impl PaymasterAuthorizeFunder {
    /// Run the [PaymasterAuthorizeFunder] command.
    pub async fn run(&self, global_config: &GlobalConfig) -> Result<()> {
        let (ledger, session, paymaster) = connect(global_config).await?;
        let change = list_change(self.remove);
        let tx_hash = paymaster.update_authorized_funder(&session, self.funder, change).await?;
        settle_admin(global_config, ledger, &session, tx_hash).await?;
        tracing::info!(
            "Funder {} {}",
            self.funder,
            if self.remove { "deauthorized" } else { "authorized" }
        );
        Ok(())
    }
}

/// Command to set the maximum sponsored gas cost.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct PaymasterSetMaxGasCost {
    /// Maximum gas cost per operation, in whole native tokens.
    #[clap(long)]
    pub amount: String,
}

impl PaymasterSetMaxGasCost {
    /// Run the [PaymasterSetMaxGasCost] command.
    pub async fn run(&self, global_config: &GlobalConfig) -> Result<()> {
        let (ledger, session, paymaster) = connect(global_config).await?;
        let amount = parse_amount("max gas cost", &self.amount, 18)?;
        let tx_hash = paymaster.update_max_gas_cost(&session, amount).await?;
        settle_admin(global_config, ledger, &session, tx_hash).await?;
        tracing::info!("Maximum gas cost set to {}", self.amount);
        Ok(())
    }
}

/// Command to set the minimum deposit.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct PaymasterSetMinDepositThreshold {
    /// Minimum deposit, in whole native tokens.
    #[clap(long)]
    pub amount: String,
}

impl PaymasterSetMinDepositThreshold {
    /// Run the [PaymasterSetMinDepositThreshold] command.
    pub async fn run(&self, global_config: &GlobalConfig) -> Result<()> {
        let (ledger, session, paymaster) = connect(global_config).await?;
        let threshold = parse_amount("deposit threshold", &self.amount, 18)?;
        let tx_hash = paymaster.update_min_deposit_threshold(&session, threshold).await?;
        settle_admin(global_config, ledger, &session, tx_hash).await?;
        tracing::info!("Minimum deposit set to {}", self.amount);
        Ok(())
    }
}

/// Command to show the state of the paymaster.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct PaymasterStatus {
    /// Check whether this contract is a sponsored target.
    #[clap(long, value_parser = parse_account)]
    pub target: Option<Address>,
    /// Check whether this action type is sponsored.
    #[clap(long, value_parser = parse_action_type)]
    pub action_type: Option<B256>,
    /// Check whether this function selector is sponsored.
    #[clap(long, value_parser = parse_function_selector)]
    pub selector: Option<FixedBytes<4>>,
    /// Check whether this token is accepted for deposits.
    #[clap(long, value_parser = parse_account)]
    pub token: Option<Address>,
    /// Check whether this account is an authorized funder.
    #[clap(long, value_parser = parse_account)]
    pub funder: Option<Address>,
}

impl PaymasterStatus {
    /// Run the [PaymasterStatus] command.
    pub async fn run(&self, global_config: &GlobalConfig) -> Result<()> {
        let ledger = global_config.connect_ledger().await?;
        let paymaster = global_config.paymaster_gateway(ledger).await?;

        let limits = paymaster.sponsorship_limits().await?;
        tracing::info!("Max gas cost: {} native tokens", format_amount(limits.max_gas_cost, 18)?);
        tracing::info!(
            "Min deposit threshold: {} native tokens",
            format_amount(limits.min_deposit_threshold, 18)?
        );

        if let Some(target) = self.target {
            let valid = paymaster.is_valid_target(target).await?;
            tracing::info!("Target {target} sponsored: {valid}");
        }
        if let Some(action_type) = self.action_type {
            let valid = paymaster.is_valid_action_type(action_type).await?;
            tracing::info!("Action type {action_type} sponsored: {valid}");
        }
        if let Some(selector) = self.selector {
            let valid = paymaster.is_valid_selector(selector).await?;
            tracing::info!("Selector {selector} sponsored: {valid}");
        }
        if let Some(token) = self.token {
            let valid = paymaster.is_valid_token(token).await?;
            tracing::info!("Token {token} accepted: {valid}");
        }
        if let Some(funder) = self.funder {
            let authorized = paymaster.is_authorized_funder(funder).await?;
            tracing::info!("Funder {funder} authorized: {authorized}");
        }
        Ok(())
    }
}

/// Command to compute the hash of an action type.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct PaymasterActionTypeHash {
    /// Action name such as `POST`.
    pub action: String,
}

impl PaymasterActionTypeHash {
    /// Run the [PaymasterActionTypeHash] command.
    pub fn run(&self) -> Result<()> {
        println!("{}", compute_action_type_hash(&self.action));
        Ok(())
    }
}

/// Command to compute a function selector.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct PaymasterSelector {
    /// Function signature such as `post(bytes32,string)`.
    #[clap(value_parser = parse_function_selector)]
    pub signature: FixedBytes<4>,
}

impl PaymasterSelector {
    /// Run the [PaymasterSelector] command.
    pub fn run(&self) -> Result<()> {
        println!("{}", self.signature);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::fixed_bytes;

    use super::*;

    #[test]
    fn selectors_from_signatures_or_hex() {
        let transfer = fixed_bytes!("0xa9059cbb");
        assert_eq!(parse_function_selector("transfer(address,uint256)").unwrap(), transfer);
        assert_eq!(parse_function_selector("0xa9059cbb").unwrap(), transfer);
        assert!(parse_function_selector("transfer").is_err());
        assert!(parse_function_selector("0xa9059c").is_err());
    }

    #[test]
    fn action_types_from_names_or_hex() {
        let post = compute_action_type_hash("POST");
        assert_eq!(parse_action_type("POST").unwrap(), post);
        assert_eq!(parse_action_type(&post.to_string()).unwrap(), post);
        assert!(parse_action_type("0x1234").is_err());
    }
}
