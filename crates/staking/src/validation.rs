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

//! Local argument checks applied before any request reaches the ledger.

use std::str::FromStr;

use alloy::primitives::{hex, utils::parse_units, Address, FixedBytes, B256, U256};

use crate::error::ValidationError;

/// Longest lock period accepted by the staking contract, in days.
pub const MAX_LOCK_PERIOD_DAYS: u64 = 365;

/// Parse an account or contract address.
///
/// All-lowercase and all-uppercase hex is accepted as is. Mixed-case input must carry a valid
/// EIP-55 checksum.
pub fn parse_address(field: &'static str, value: &str) -> Result<Address, ValidationError> {
    let invalid = || ValidationError::InvalidAddress { field, value: value.to_string() };
    let trimmed = value.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let mixed_case = digits.chars().any(|c| c.is_ascii_uppercase())
        && digits.chars().any(|c| c.is_ascii_lowercase());
    if mixed_case {
        Address::parse_checksummed(trimmed, None).map_err(|_| invalid())
    } else {
        Address::from_str(trimmed).map_err(|_| invalid())
    }
}

/// Reject the zero address where it would burn funds or brick a contract.
pub fn ensure_non_zero_address(
    field: &'static str,
    address: Address,
) -> Result<Address, ValidationError> {
    if address.is_zero() {
        return Err(ValidationError::InvalidAddress { field, value: address.to_string() });
    }
    Ok(address)
}

/// Parse a decimal token amount (e.g. `"1.5"`) into the token's smallest unit.
pub fn parse_amount(
    field: &'static str,
    value: &str,
    decimals: u8,
) -> Result<U256, ValidationError> {
    let trimmed = value.trim();
    if trimmed.starts_with('-') {
        return Err(ValidationError::InvalidAmount { field, reason: "amount is negative".into() });
    }
    let parsed: U256 = parse_units(trimmed, decimals)
        .map_err(|e| ValidationError::InvalidAmount { field, reason: e.to_string() })?
        .into();
    ensure_positive(field, parsed)
}

pub fn ensure_positive(field: &'static str, amount: U256) -> Result<U256, ValidationError> {
    if amount.is_zero() {
        let reason = "amount must be positive".into();
        return Err(ValidationError::InvalidAmount { field, reason });
    }
    Ok(amount)
}

pub fn ensure_lock_period(days: u64) -> Result<u64, ValidationError> {
    if !(1..=MAX_LOCK_PERIOD_DAYS).contains(&days) {
        return Err(ValidationError::InvalidLockPeriod(days));
    }
    Ok(days)
}

/// Parse a 0x-prefixed 32 byte hex string, e.g. a merkle root or timelock action ID.
pub fn parse_bytes32(field: &'static str, value: &str) -> Result<B256, ValidationError> {
    parse_fixed_hex(field, value)
}

/// Parse a 0x-prefixed 4 byte function selector.
pub fn parse_selector(value: &str) -> Result<FixedBytes<4>, ValidationError> {
    parse_fixed_hex("selector", value)
}

fn parse_fixed_hex<const N: usize>(
    field: &'static str,
    value: &str,
) -> Result<FixedBytes<N>, ValidationError> {
    let digits = value.trim().strip_prefix("0x").ok_or_else(|| ValidationError::InvalidValue {
        field,
        reason: "expected 0x-prefixed hex".into(),
    })?;
    let bytes = hex::decode(digits)
        .map_err(|e| ValidationError::InvalidValue { field, reason: e.to_string() })?;
    if bytes.len() != N {
        return Err(ValidationError::InvalidHashLength { field, expected: N, actual: bytes.len() });
    }
    Ok(FixedBytes::from_slice(&bytes))
}

/// Parse a comma separated list of 32 byte hex nodes into a merkle proof.
pub fn parse_proof(value: &str) -> Result<Vec<B256>, ValidationError> {
    let proof = value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            parse_bytes32("merkle proof node", item)
                .map_err(|e| ValidationError::InvalidProofFormat(e.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    ensure_proof(&proof)?;
    Ok(proof)
}

pub fn ensure_proof(proof: &[B256]) -> Result<(), ValidationError> {
    if proof.is_empty() {
        return Err(ValidationError::InvalidProofFormat("proof is empty".into()));
    }
    Ok(())
}

pub fn ensure_description(description: &str) -> Result<&str, ValidationError> {
    if description.trim().is_empty() {
        return Err(ValidationError::InvalidValue {
            field: "description",
            reason: "description must not be empty".into(),
        });
    }
    Ok(description)
}
