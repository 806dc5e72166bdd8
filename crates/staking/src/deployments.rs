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

use alloy::primitives::Address;
use clap::Args;
use derive_builder::Builder;
use thiserror::Error;

/// The RPC endpoint serves a different chain than the deployment was configured for.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("deployment targets chain {expected} but the RPC endpoint reports chain {actual}")]
pub struct ChainIdMismatch {
    pub expected: u64,
    pub actual: u64,
}

/// Addresses of a deployment of the AfroVibe staking contracts.
// NOTE: See https://github.com/clap-rs/clap/issues/5092#issuecomment-1703980717 about clap usage.
#[non_exhaustive]
#[derive(Clone, Debug, Builder, Args)]
#[group(requires = "staking_address", requires = "stake_token_address")]
pub struct Deployment {
    /// EIP-155 chain ID of the network.
    #[clap(long, env)]
    #[builder(setter(into, strip_option), default)]
    pub chain_id: Option<u64>,

    /// Address of the [IStaking] contract.
    ///
    /// [IStaking]: crate::contracts::IStaking
    #[clap(long, env, required = false, long_help = "Address of the Staking contract")]
    #[builder(setter(into))]
    pub staking_address: Address,

    /// Address of the ERC-20 token accepted for staking.
    #[clap(long, env, required = false, long_help = "Address of the staked S token")]
    #[builder(setter(into))]
    pub stake_token_address: Address,

    /// Address of the [IPaymasterFunder] contract, if deployed.
    ///
    /// [IPaymasterFunder]: crate::contracts::IPaymasterFunder
    #[clap(long, env, long_help = "Address of the PaymasterFunder contract")]
    #[builder(setter(into, strip_option), default)]
    pub paymaster_funder_address: Option<Address>,

    /// Address of the [IAfroVibePaymaster] contract, if deployed.
    ///
    /// [IAfroVibePaymaster]: crate::contracts::IAfroVibePaymaster
    #[clap(long, env, long_help = "Address of the AfroVibePaymaster contract")]
    #[builder(setter(into, strip_option), default)]
    pub paymaster_address: Option<Address>,
}

impl Deployment {
    /// Create a new [DeploymentBuilder].
    pub fn builder() -> DeploymentBuilder {
        Default::default()
    }

    /// Check that the deployment targets the chain the provider is connected to.
    pub fn check_chain_id(&self, chain_id: u64) -> Result<(), ChainIdMismatch> {
        match self.chain_id {
            Some(expected) if expected != chain_id => {
                Err(ChainIdMismatch { expected, actual: chain_id })
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;

    use super::*;

    #[test]
    fn builder_and_chain_check() {
        let deployment = Deployment::builder()
            .chain_id(57054u64)
            .staking_address(address!("0x00000000000000000000000000000000000000aa"))
            .stake_token_address(address!("0x00000000000000000000000000000000000000bb"))
            .build()
            .unwrap();

        assert!(deployment.paymaster_funder_address.is_none());
        assert!(deployment.paymaster_address.is_none());
        assert!(deployment.check_chain_id(57054).is_ok());
        assert_eq!(
            deployment.check_chain_id(1),
            Err(ChainIdMismatch { expected: 57054, actual: 1 })
        );
        assert_eq!(
            ChainIdMismatch { expected: 57054, actual: 1 }.to_string(),
            "deployment targets chain 57054 but the RPC endpoint reports chain 1"
        );
    }
}
