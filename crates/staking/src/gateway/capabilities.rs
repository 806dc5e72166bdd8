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

//! Capability negotiation against deployed contract bytecode.
//!
//! Solidity dispatches external calls by comparing the first four bytes of calldata with
//! each function selector, so the selectors of every external function appear verbatim in the
//! runtime bytecode. Scanning the code once at construction tells the gateway which operations
//! the remote target supports without issuing any calls.
//!
//! Contracts deployed behind an EIP-1967 proxy only carry the proxy's forwarding code at their
//! address, so the implementation recorded in the proxy's storage is scanned instead.

use alloy::{
    primitives::{b256, Address, Bytes, B256, U256},
    sol_types::SolCall,
};
use serde::Serialize;

use crate::{
    error::GatewayError,
    ledger::Ledger,
    retry::{execute, RetryPolicy},
};

/// EIP-1967 storage slot of a proxy's implementation address,
/// `keccak256("eip1967.proxy.implementation") - 1`.
pub const IMPLEMENTATION_SLOT: B256 =
    b256!("0x360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc");

/// A contract operation identified by its signature and selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub signature: &'static str,
    pub selector: [u8; 4],
}

impl Operation {
    pub const fn of<C: SolCall>() -> Self {
        Self { signature: C::SIGNATURE, selector: C::SELECTOR }
    }
}

/// Optional operations of the staking contract, detected once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Capabilities {
    /// `getTotalStaked(address)` bulk accessor.
    pub total_staked: bool,
    /// `calculateAfrovibeRewards(address,uint256)`.
    pub claimable_rewards: bool,
    /// `paused()`.
    pub paused: bool,
}

pub(crate) fn supports(code: &[u8], operation: Operation) -> bool {
    code.windows(4).any(|window| window == operation.selector)
}

/// Signatures of the operations in `required` not found in `code`.
pub(crate) fn missing_operations(code: &[u8], required: &[Operation]) -> Vec<&'static str> {
    required.iter().filter(|op| !supports(code, **op)).map(|op| op.signature).collect()
}

/// Address of the code serving calls to `address`.
///
/// This is the implementation recorded in the EIP-1967 slot when `address` is a proxy, and
/// `address` itself otherwise.
pub(crate) async fn resolve_implementation<L: Ledger>(
    ledger: &L,
    address: Address,
    retry: &RetryPolicy,
) -> Result<Address, GatewayError> {
    let slot = U256::from_be_bytes(IMPLEMENTATION_SLOT.0);
    let word = execute(retry, move || async move {
        ledger
            .storage_at(address, slot)
            .await
            .map_err(|e| GatewayError::ledger("eth_getStorageAt", e))
    })
    .await?;
    let implementation = Address::from_word(B256::from(word.to_be_bytes::<32>()));
    if implementation.is_zero() {
        return Ok(address);
    }
    tracing::debug!(proxy = %address, %implementation, "resolved implementation behind proxy");
    Ok(implementation)
}

/// Fetch the runtime code serving `address` and fail if any of `required` is absent.
pub(crate) async fn negotiate<L: Ledger>(
    ledger: &L,
    address: Address,
    required: &[Operation],
    retry: &RetryPolicy,
) -> Result<Bytes, GatewayError> {
    let target = resolve_implementation(ledger, address, retry).await?;
    let code = execute(retry, move || async move {
        ledger.code_at(target).await.map_err(|e| GatewayError::ledger("eth_getCode", e))
    })
    .await?;

    let missing = missing_operations(&code, required);
    if !missing.is_empty() {
        tracing::error!(%address, ?missing, "contract is missing required operations");
        return Err(GatewayError::UnsupportedContract { address, missing });
    }
    Ok(code)
}
