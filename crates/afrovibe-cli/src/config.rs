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

//! Common configuration options for commands in the AfroVibe CLI.

use std::{num::ParseIntError, sync::Arc, time::Duration};

use afrovibe_staking::{
    validation::parse_address, Deployment, GatewayConfig, PaymasterFunderGateway,
    PaymasterGateway, ProviderLedger, Session, StakingGateway, ValidationError,
};
use alloy::{
    primitives::Address,
    providers::{DynProvider, Provider, ProviderBuilder},
    signers::local::PrivateKeySigner,
};
use anyhow::{Context, Result};
use clap::Args;
use tracing::level_filters::LevelFilter;
use url::Url;

/// [Ledger](afrovibe_staking::Ledger) used by all commands.
pub type CliLedger = ProviderLedger<DynProvider>;

/// How long to wait for a submitted transaction to settle when `--tx-timeout` is not set.
pub const DEFAULT_TX_TIMEOUT: Duration = Duration::from_secs(600);

/// Common configuration options for all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalConfig {
    /// URL of the Ethereum RPC endpoint
    #[clap(short, long, env = "RPC_URL", global = true)]
    pub rpc_url: Option<Url>,

    /// Private key of the wallet (without 0x prefix)
    #[clap(long, env = "PRIVATE_KEY", global = true, hide_env_values = true)]
    pub private_key: Option<PrivateKeySigner>,

    /// Ethereum transaction timeout in seconds.
    #[clap(long, env = "TX_TIMEOUT", global = true, value_parser = |arg: &str| -> Result<Duration, ParseIntError> {Ok(Duration::from_secs(arg.parse()?))})]
    pub tx_timeout: Option<Duration>,

    /// Log level (error, warn, info, debug, trace)
    #[clap(long, env = "LOG_LEVEL", global = true, default_value = "info")]
    pub log_level: LevelFilter,

    /// URL of the GraphQL index service mirroring staking events
    #[clap(long, env = "SUBGRAPH_URL", global = true)]
    pub subgraph_url: Option<Url>,

    /// URL of the variable APR feed
    #[clap(long, env = "APR_URL", global = true)]
    pub apr_url: Option<Url>,

    /// Configuration for the AfroVibe deployment to use.
    #[clap(flatten, next_help_heading = "AfroVibe Deployment")]
    pub deployment: Option<Deployment>,
}

impl GlobalConfig {
    /// Access [Self::rpc_url] or return an error that can be shown to the user.
    pub fn require_rpc_url(&self) -> Result<Url> {
        self.rpc_url
            .clone()
            .context("Blockchain RPC URL not provided; please set --rpc-url or the RPC_URL env var")
    }

    /// Access [Self::private_key] or return an error that can be shown to the user.
    pub fn require_private_key(&self) -> Result<PrivateKeySigner> {
        self.private_key.clone().context(
            "Private key not provided; please set --private-key or the PRIVATE_KEY env var",
        )
    }

    /// Access [Self::deployment] or return an error that can be shown to the user.
    pub fn require_deployment(&self) -> Result<&Deployment> {
        self.deployment.as_ref().context(
            "Deployment not provided; please set --staking-address and --stake-token-address \
             or the STAKING_ADDRESS and STAKE_TOKEN_ADDRESS env vars",
        )
    }

    pub fn require_subgraph_url(&self) -> Result<Url> {
        self.subgraph_url.clone().context(
            "Index service URL not provided; please set --subgraph-url or the SUBGRAPH_URL env var",
        )
    }

    pub fn require_apr_url(&self) -> Result<Url> {
        self.apr_url
            .clone()
            .context("APR feed URL not provided; please set --apr-url or the APR_URL env var")
    }

    pub fn tx_timeout(&self) -> Duration {
        self.tx_timeout.unwrap_or(DEFAULT_TX_TIMEOUT)
    }

    /// Connect a read-only ledger to [Self::rpc_url].
    pub async fn connect_ledger(&self) -> Result<Arc<CliLedger>> {
        let rpc_url = self.require_rpc_url()?;
        let provider = ProviderBuilder::new()
            .connect(rpc_url.as_str())
            .await
            .with_context(|| format!("failed to connect provider to {rpc_url}"))?;
        self.check_chain_id(&provider).await?;
        Ok(Arc::new(ProviderLedger::new(provider.erased())))
    }

    /// Connect a ledger signing with [Self::private_key] and open a session for its account.
    pub async fn connect_session(&self) -> Result<(Arc<CliLedger>, Session)> {
        let rpc_url = self.require_rpc_url()?;
        let signer = self.require_private_key()?;
        let provider = ProviderBuilder::new()
            .wallet(signer.clone())
            .connect(rpc_url.as_str())
            .await
            .with_context(|| format!("failed to connect provider to {rpc_url}"))?;
        let chain_id = self.check_chain_id(&provider).await?;
        let session = Session::new(signer.address(), chain_id);
        Ok((Arc::new(ProviderLedger::new(provider.erased())), session))
    }

    pub async fn staking_gateway(
        &self,
        ledger: Arc<CliLedger>,
    ) -> Result<StakingGateway<CliLedger>> {
        let address = self.require_deployment()?.staking_address;
        StakingGateway::connect(ledger, address, GatewayConfig::default())
            .await
            .with_context(|| format!("failed to connect to the staking contract at {address}"))
    }

    pub async fn funder_gateway(
        &self,
        ledger: Arc<CliLedger>,
    ) -> Result<PaymasterFunderGateway<CliLedger>> {
        let address = self.require_deployment()?.paymaster_funder_address.context(
            "PaymasterFunder address not provided; please set --paymaster-funder-address or the \
             PAYMASTER_FUNDER_ADDRESS env var",
        )?;
        PaymasterFunderGateway::connect(ledger, address, GatewayConfig::default())
            .await
            .with_context(|| format!("failed to connect to the PaymasterFunder contract at {address}"))
    }

    pub async fn paymaster_gateway(
        &self,
        ledger: Arc<CliLedger>,
    ) -> Result<PaymasterGateway<CliLedger>> {
        let address = self.require_deployment()?.paymaster_address.context(
            "AfroVibePaymaster address not provided; please set --paymaster-address or the \
             PAYMASTER_ADDRESS env var",
        )?;
        PaymasterGateway::connect(ledger, address, GatewayConfig::default())
            .await
            .with_context(|| format!("failed to connect to the paymaster contract at {address}"))
    }

    async fn check_chain_id(&self, provider: &impl Provider) -> Result<u64> {
        let chain_id = provider.get_chain_id().await.context("failed to query chain ID")?;
        self.require_deployment()?.check_chain_id(chain_id)?;
        Ok(chain_id)
    }
}

/// Clap value parser for addresses. Mixed-case input must carry a valid EIP-55 checksum.
pub fn parse_account(value: &str) -> Result<Address, ValidationError> {
    parse_address("account", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_account_checks_checksum() {
        assert!(parse_account("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").is_ok());
        assert!(parse_account("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").is_ok());
        assert!(parse_account("0x5AAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").is_err());
        assert!(parse_account("0x1234").is_err());
    }
}
