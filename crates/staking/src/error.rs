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

use alloy::primitives::{Address, U256};
use thiserror::Error;

use crate::{
    ledger::LedgerError,
    retry::{Classify, ErrorClass, RetryError},
};

/// Rejected arguments, detected locally before anything is sent to the ledger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid {field} address: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("invalid {field} amount: {reason}")]
    InvalidAmount { field: &'static str, reason: String },

    #[error("{field} amount {amount} outside of allowed range [{min}, {max}]")]
    AmountOutOfRange { field: &'static str, amount: U256, min: U256, max: U256 },

    #[error("lock period must be between 1 and 365 days, got {0}")]
    InvalidLockPeriod(u64),

    #[error("invalid merkle proof: {0}")]
    InvalidProofFormat(String),

    #[error("invalid {field}: expected {expected} bytes of hex, got {actual}")]
    InvalidHashLength { field: &'static str, expected: usize, actual: usize },

    #[error("invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Coarse category of a [GatewayError], for mapping to user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    RemoteCall,
    BusinessRule,
    UnsupportedContract,
    Decode,
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("remote call {method} failed: {source}")]
    Remote {
        method: &'static str,
        #[source]
        source: LedgerError,
    },

    #[error("{method} rejected: {reason}")]
    BusinessRule {
        method: &'static str,
        reason: String,
        #[source]
        source: LedgerError,
    },

    #[error("contract at {address} is missing required operations: {}", .missing.join(", "))]
    UnsupportedContract { address: Address, missing: Vec<&'static str> },

    #[error("contract at {address} does not support {method}")]
    UnsupportedOperation { address: Address, method: &'static str },

    #[error("failed to decode result of {method}: {message}")]
    Decode { method: &'static str, message: String },
}

impl GatewayError {
    /// Wrap a ledger error observed while running `method`, keeping its classification.
    pub fn ledger(method: &'static str, source: LedgerError) -> Self {
        match source.class() {
            ErrorClass::Transient | ErrorClass::Fatal => Self::Remote { method, source },
            ErrorClass::NonTransient => {
                let reason = match &source {
                    LedgerError::Reverted { reason, .. } => reason.clone(),
                    LedgerError::Rpc { message, .. } => message.clone(),
                    other => other.to_string(),
                };
                Self::BusinessRule { method, reason, source }
            }
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Remote { .. } => ErrorKind::RemoteCall,
            Self::BusinessRule { .. } => ErrorKind::BusinessRule,
            Self::UnsupportedContract { .. } | Self::UnsupportedOperation { .. } => {
                ErrorKind::UnsupportedContract
            }
            Self::Decode { .. } => ErrorKind::Decode,
        }
    }
}

impl Classify for GatewayError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::Remote { .. } => ErrorClass::Transient,
            Self::BusinessRule { .. } => ErrorClass::NonTransient,
            Self::Validation(_)
            | Self::UnsupportedContract { .. }
            | Self::UnsupportedOperation { .. }
            | Self::Decode { .. } => ErrorClass::Fatal,
        }
    }
}

impl From<RetryError<GatewayError>> for GatewayError {
    fn from(err: RetryError<GatewayError>) -> Self {
        if err.attempts > 1 {
            tracing::warn!(
                attempts = err.attempts,
                class = %err.class,
                "giving up: {}",
                err.source
            );
        }
        err.into_inner()
    }
}
