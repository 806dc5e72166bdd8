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

//! Commands of the AfroVibe CLI for the paymaster funder contract.

use std::sync::Arc;

use afrovibe_staking::{
    contracts::{find_tx_log, IPaymasterFunder},
    gateway::funder::{compute_action_id, EMERGENCY_WITHDRAW_ACTION, UPDATE_MAX_FUNDING_ACTION},
    validation::{parse_amount, parse_bytes32},
    Ledger, PaymasterFunderGateway, Session, TxKind, ValidationError,
};
use alloy::primitives::{Address, TxHash, B256, U256};
use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};

use crate::{
    commands::{await_settlement, format_amount},
    config::{parse_account, CliLedger, GlobalConfig},
};

fn parse_action_id(value: &str) -> Result<B256, ValidationError> {
    parse_bytes32("action ID", value)
}

/// Commands for the paymaster funder contract.
#[derive(Subcommand, Clone, Debug)]
pub enum FunderCommands {
    /// Fund the paymaster.
    Fund(FunderFund),
    /// Start the timelock for a new maximum funding amount.
    InitiateMaxFundingUpdate(FunderInitiateMaxFundingUpdate),
    /// Apply a maximum funding amount update once its timelock has passed.
    ExecuteMaxFundingUpdate(FunderExecuteMaxFundingUpdate),
    /// Start the timelock for an emergency withdrawal.
    InitiateEmergencyWithdraw(FunderInitiateEmergencyWithdraw),
    /// Perform an emergency withdrawal once its timelock has passed.
    ExecuteEmergencyWithdraw(FunderExecuteEmergencyWithdraw),
    /// Grant the funder role to an account.
    GrantFunder(FunderRoleChange),
    /// Revoke the funder role from an account.
    RevokeFunder(FunderRoleChange),
    /// Pause funding.
    Pause,
    /// Resume funding.
    Unpause,
    /// Show funding bounds, balances and the roles of an account.
    Status(FunderStatus),
    /// Show the most recent funding records.
    History(FunderHistory),
    /// Show a timelocked action.
    Timelock(FunderTimelock),
    /// Compute the ID of a timelocked action without connecting to the ledger.
    ActionId(FunderActionId),
}

impl FunderCommands {
    /// Run the command.
    pub async fn run(&self, global_config: &GlobalConfig) -> Result<()> {
        match self {
            Self::Fund(cmd) => cmd.run(global_config).await,
            Self::InitiateMaxFundingUpdate(cmd) => cmd.run(global_config).await,
            Self::ExecuteMaxFundingUpdate(cmd) => cmd.run(global_config).await,
            Self::InitiateEmergencyWithdraw(cmd) => cmd.run(global_config).await,
            Self::ExecuteEmergencyWithdraw(cmd) => cmd.run(global_config).await,
            Self::GrantFunder(cmd) => cmd.run(global_config, true).await,
            Self::RevokeFunder(cmd) => cmd.run(global_config, false).await,
            Self::Pause => set_paused(global_config, true).await,
            Self::Unpause => set_paused(global_config, false).await,
            Self::Status(cmd) => cmd.run(global_config).await,
            Self::History(cmd) => cmd.run(global_config).await,
            Self::Timelock(cmd) => cmd.run(global_config).await,
            Self::ActionId(cmd) => cmd.run(),
        }
    }
}

/// Signing ledger, session and funder gateway for an administrative command.
async fn connect(
    global_config: &GlobalConfig,
) -> Result<(Arc<CliLedger>, Session, PaymasterFunderGateway<CliLedger>)> {
    let (ledger, session) = global_config.connect_session().await?;
    let funder = global_config.funder_gateway(ledger.clone()).await?;
    Ok((ledger, session, funder))
}

/// Log the action ID announced by a timelock initiation.
async fn report_timelock(ledger: &CliLedger, funder: Address, tx_hash: TxHash) -> Result<()> {
    let receipt = ledger.receipt(tx_hash).await?;
    let event = receipt
        .as_ref()
        .and_then(|r| find_tx_log::<IPaymasterFunder::TimelockInitiated>(r, funder));
    match event {
        Some(event) => tracing::info!(
            "Timelock initiated for {}: action_id = {}, timestamp = {}",
            event.action,
            event.actionId,
            event.timestamp
        ),
        None => tracing::warn!(%tx_hash, "No TimelockInitiated event found on the receipt"),
    }
    Ok(())
}

/// Command to fund the paymaster.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct FunderFund {
    /// Amount to fund, in whole tokens.
    #[clap(long)]
    pub amount: String,
    /// Do not approve the funder contract to pull the tokens first.
    #[clap(long)]
    pub no_approve: bool,
}

impl FunderFund {
    /// Run the [FunderFund] command.
    pub async fn run(&self, global_config: &GlobalConfig) -> Result<()> {
        let (ledger, session, funder) = connect(global_config).await?;
        let decimals = funder.funding_token_decimals().await?;
        let amount = parse_amount("funding", &self.amount, decimals)?;

        if !self.no_approve {
            let tx_hash = funder.approve_funding_token(&session, funder.address(), amount).await?;
            tracing::info!(%tx_hash, "Sent approval for funding");
            let kind = TxKind::Approve;
            await_settlement(global_config, ledger.clone(), &session, tx_hash, kind, None).await?;
        }

        let tx_hash = funder.fund(&session, amount).await?;
        tracing::info!(%tx_hash, "Sent transaction for funding");
        let tx =
            await_settlement(global_config, ledger, &session, tx_hash, TxKind::Fund, Some(amount))
                .await?;
        tracing::info!(
            "Funding completed: amount = {} tokens",
            format_amount(tx.amount.unwrap_or(amount), decimals)?
        );
        Ok(())
    }
}

/// Command to start a maximum funding amount update.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct FunderInitiateMaxFundingUpdate {
    /// New maximum funding amount, in whole tokens.
    #[clap(long)]
    pub amount: String,
}

impl FunderInitiateMaxFundingUpdate {
    /// Run the [FunderInitiateMaxFundingUpdate] command.
    pub async fn run(&self, global_config: &GlobalConfig) -> Result<()> {
        let (ledger, session, funder) = connect(global_config).await?;
        let decimals = funder.funding_token_decimals().await?;
        let amount = parse_amount("max funding", &self.amount, decimals)?;

        let tx_hash = funder.initiate_update_max_funding_amount(&session, amount).await?;
        let kind = TxKind::FunderAdmin;
        await_settlement(global_config, ledger.clone(), &session, tx_hash, kind, None).await?;
        report_timelock(&ledger, funder.address(), tx_hash).await
    }
}

/// Command to apply a maximum funding amount update.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct FunderExecuteMaxFundingUpdate {
    /// ID of the timelocked action.
    #[clap(long, value_parser = parse_action_id)]
    pub action_id: B256,
}

impl FunderExecuteMaxFundingUpdate {
    /// Run the [FunderExecuteMaxFundingUpdate] command.
    pub async fn run(&self, global_config: &GlobalConfig) -> Result<()> {
        let (ledger, session, funder) = connect(global_config).await?;
        let tx_hash = funder.execute_update_max_funding_amount(&session, self.action_id).await?;
        let kind = TxKind::FunderAdmin;
        await_settlement(global_config, ledger, &session, tx_hash, kind, None).await?;
        tracing::info!("Maximum funding amount updated");
        Ok(())
    }
}

/// Command to start an emergency withdrawal.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct FunderInitiateEmergencyWithdraw {
    /// Recipient of the withdrawn funds.
    #[clap(long, value_parser = parse_account)]
    pub to: Address,
    /// Amount to withdraw, in whole tokens.
    #[clap(long)]
    pub amount: String,
}

impl FunderInitiateEmergencyWithdraw {
    /// Run the [FunderInitiateEmergencyWithdraw] command.
    pub async fn run(&self, global_config: &GlobalConfig) -> Result<()> {
        let (ledger, session, funder) = connect(global_config).await?;
        let decimals = funder.funding_token_decimals().await?;
        let amount = parse_amount("withdrawal", &self.amount, decimals)?;

        let tx_hash = funder.initiate_emergency_withdraw(&session, self.to, amount).await?;
        let kind = TxKind::FunderAdmin;
        await_settlement(global_config, ledger.clone(), &session, tx_hash, kind, None).await?;
        report_timelock(&ledger, funder.address(), tx_hash).await
    }
}

/// Command to perform an emergency withdrawal.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct FunderExecuteEmergencyWithdraw {
    /// ID of the timelocked action.
    #[clap(long, value_parser = parse_action_id)]
    pub action_id: B256,
    /// Recipient of the withdrawn funds.
    #[clap(long, value_parser = parse_account)]
    pub to: Address,
}

impl FunderExecuteEmergencyWithdraw {
    /// Run the [FunderExecuteEmergencyWithdraw] command.
    pub async fn run(&self, global_config: &GlobalConfig) -> Result<()> {
        let (ledger, session, funder) = connect(global_config).await?;
        let tx_hash = funder.execute_emergency_withdraw(&session, self.action_id, self.to).await?;
        let kind = TxKind::FunderAdmin;
        await_settlement(global_config, ledger, &session, tx_hash, kind, None).await?;
        tracing::info!("Emergency withdrawal to {} completed", self.to);
        Ok(())
    }
}

/// Command to grant or revoke the funder role.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct FunderRoleChange {
    /// Account to change the role of.
    #[clap(value_parser = parse_account)]
    pub account: Address,
}

impl FunderRoleChange {
    /// Grant the role when `grant` is set, revoke it otherwise.
    pub async fn run(&self, global_config: &GlobalConfig, grant: bool) -> Result<()> {
        let (ledger, session, funder) = connect(global_config).await?;
        let tx_hash = match grant {
            true => funder.grant_funder_role(&session, self.account).await?,
            false => funder.revoke_funder_role(&session, self.account).await?,
        };
        let kind = TxKind::FunderAdmin;
        await_settlement(global_config, ledger, &session, tx_hash, kind, None).await?;
        tracing::info!(
            "Funder role of {} {}",
            self.account,
            if grant { "granted" } else { "revoked" }
        );
        Ok(())
    }
}

async fn set_paused(global_config: &GlobalConfig, paused: bool) -> Result<()> {
    let (ledger, session, funder) = connect(global_config).await?;
    let tx_hash = match paused {
        true => funder.pause(&session).await?,
        false => funder.unpause(&session).await?,
    };
    await_settlement(global_config, ledger, &session, tx_hash, TxKind::FunderAdmin, None).await?;
    tracing::info!("Funding {}", if paused { "paused" } else { "resumed" });
    Ok(())
}

/// Command to show the state of the funder contract.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct FunderStatus {
    /// Account to show the roles of.
    #[clap(value_parser = parse_account)]
    pub account: Option<Address>,
}

impl FunderStatus {
    /// Run the [FunderStatus] command.
    pub async fn run(&self, global_config: &GlobalConfig) -> Result<()> {
        let ledger = global_config.connect_ledger().await?;
        let funder = global_config.funder_gateway(ledger).await?;

        let (paymaster, bounds, max_balance, balance, paused, decimals) = tokio::try_join!(
            funder.paymaster(),
            funder.funding_bounds(),
            funder.max_contract_balance(),
            funder.paymaster_balance(),
            funder.is_paused(),
            funder.funding_token_decimals(),
        )?;
        tracing::info!("Paymaster: {paymaster}");
        tracing::info!(
            "Funding bounds: [{}, {}] tokens",
            format_amount(bounds.min, decimals)?,
            format_amount(bounds.max, decimals)?
        );
        tracing::info!("Max contract balance: {} tokens", format_amount(max_balance, decimals)?);
        tracing::info!("Paymaster balance: {} tokens", format_amount(balance, decimals)?);
        tracing::info!("Paused: {paused}");

        if let Some(account) = self.account {
            let (funder_role, admin, pauser) = tokio::try_join!(
                funder.is_funder(account),
                funder.is_admin(account),
                funder.is_pauser(account),
            )?;
            tracing::info!(
                "Roles of {account}: funder = {funder_role}, admin = {admin}, pauser = {pauser}"
            );
        }
        Ok(())
    }
}

/// Command to show the most recent funding records.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct FunderHistory {
    /// Number of records to show.
    #[clap(long, default_value_t = 5)]
    pub count: u64,
}

impl FunderHistory {
    /// Run the [FunderHistory] command.
    pub async fn run(&self, global_config: &GlobalConfig) -> Result<()> {
        let ledger = global_config.connect_ledger().await?;
        let funder = global_config.funder_gateway(ledger).await?;

        let (length, decimals) =
            tokio::try_join!(funder.funding_history_length(), funder.funding_token_decimals())?;
        if length == 0 {
            tracing::info!("No funding records");
            return Ok(());
        }
        for index in (length.saturating_sub(self.count)..length).rev() {
            let record = funder.funding_history(index).await?;
            tracing::info!(
                "#{index}: {} funded {} tokens at {}",
                record.funder,
                format_amount(record.amount, decimals)?,
                record.timestamp
            );
        }
        Ok(())
    }
}

/// Command to show a timelocked action.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct FunderTimelock {
    /// ID of the timelocked action.
    #[clap(value_parser = parse_action_id)]
    pub action_id: B256,
}

impl FunderTimelock {
    /// Run the [FunderTimelock] command.
    pub async fn run(&self, global_config: &GlobalConfig) -> Result<()> {
        let ledger = global_config.connect_ledger().await?;
        let funder = global_config.funder_gateway(ledger).await?;

        let action = funder.timelock_action(self.action_id).await?;
        if action.timestamp == 0 {
            tracing::info!("No timelocked action with ID {}", self.action_id);
            return Ok(());
        }
        tracing::info!(
            "{}: amount = {}, initiated at {}, executed = {}",
            action.action,
            action.amount,
            action.timestamp,
            action.executed
        );
        Ok(())
    }
}

/// Timelocked actions of the funder contract.
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum TimelockedAction {
    UpdateMaxFundingAmount,
    EmergencyWithdraw,
}

impl TimelockedAction {
    fn name(&self) -> &'static str {
        match self {
            Self::UpdateMaxFundingAmount => UPDATE_MAX_FUNDING_ACTION,
            Self::EmergencyWithdraw => EMERGENCY_WITHDRAW_ACTION,
        }
    }
}

/// Command to compute the ID of a timelocked action.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct FunderActionId {
    /// The timelocked action.
    #[clap(long, value_enum)]
    pub action: TimelockedAction,
    /// Amount of the action, in the token's smallest unit.
    #[clap(long)]
    pub amount: U256,
    /// Unix timestamp at which the action was initiated.
    #[clap(long)]
    pub timestamp: u64,
}

impl FunderActionId {
    /// Run the [FunderActionId] command.
    pub fn run(&self) -> Result<()> {
        println!("{}", compute_action_id(self.action.name(), self.amount, self.timestamp));
        Ok(())
    }
}
