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

//! Abstraction over the remote ledger the gateways talk to.

use std::{future::Future, time::Duration};

use alloy::{
    primitives::{Address, Bytes, Log, TxHash, U256},
    providers::Provider,
    rpc::types::{TransactionReceipt, TransactionRequest},
    sol_types::decode_revert_reason,
    transports::{TransportError, TransportResult},
};
use async_trait::async_trait;
use thiserror::Error;

use crate::retry::{Classify, ErrorClass};

/// Default ceiling applied to every individual ledger request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// JSON-RPC error codes that indicate a node-side hiccup rather than a rejected call.
const TRANSIENT_RPC_CODES: [i64; 3] = [-32005, -32603, 429];

/// Error observed while talking to the ledger, classified where it is first seen.
#[derive(Error, Debug, Clone)]
pub enum LedgerError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("execution reverted: {reason}")]
    Reverted { reason: String, data: Option<Bytes> },

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
}

impl Classify for LedgerError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::Transport(_) | Self::Timeout(_) => ErrorClass::Transient,
            Self::Rpc { code, .. } if TRANSIENT_RPC_CODES.contains(code) => ErrorClass::Transient,
            Self::Rpc { .. } | Self::Reverted { .. } => ErrorClass::NonTransient,
        }
    }
}

impl From<TransportError> for LedgerError {
    fn from(err: TransportError) -> Self {
        let Some(payload) = err.as_error_resp() else {
            return Self::Transport(err.to_string());
        };
        if let Some(data) = payload.as_revert_data() {
            let reason =
                decode_revert_reason(&data).unwrap_or_else(|| payload.message.to_string());
            return Self::Reverted { reason, data: Some(data) };
        }
        // Code 3 is the standard "execution reverted" code; some nodes omit the data.
        if payload.code == 3 {
            return Self::Reverted { reason: payload.message.to_string(), data: None };
        }
        Self::Rpc { code: payload.code, message: payload.message.to_string() }
    }
}

/// The parts of a transaction receipt the tracker needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerReceipt {
    pub transaction_hash: TxHash,
    /// Contract the transaction called. `None` for contract creations.
    pub to: Option<Address>,
    pub success: bool,
    pub gas_used: u64,
    pub effective_gas_price: u128,
    pub logs: Vec<Log>,
}

impl LedgerReceipt {
    /// Fee paid for the transaction, in the native token's smallest unit.
    pub fn fee(&self) -> U256 {
        U256::from(self.gas_used) * U256::from(self.effective_gas_price)
    }
}

impl From<TransactionReceipt> for LedgerReceipt {
    fn from(receipt: TransactionReceipt) -> Self {
        Self {
            transaction_hash: receipt.transaction_hash,
            to: receipt.to,
            success: receipt.status(),
            gas_used: receipt.gas_used,
            effective_gas_price: receipt.effective_gas_price,
            logs: receipt.inner.logs().iter().map(|log| log.inner.clone()).collect(),
        }
    }
}

/// Remote ledger operations used by the gateways and the transaction tracker.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Deployed bytecode at `address`. Empty when no contract is deployed.
    async fn code_at(&self, address: Address) -> Result<Bytes, LedgerError>;

    /// Value of the storage `slot` of the contract at `address`.
    async fn storage_at(&self, address: Address, slot: U256) -> Result<U256, LedgerError>;

    /// Execute a read-only call and return the raw return data.
    async fn call(&self, tx: TransactionRequest) -> Result<Bytes, LedgerError>;

    /// Estimate the gas required to execute `tx`.
    async fn estimate_gas(&self, tx: TransactionRequest) -> Result<u64, LedgerError>;

    /// Sign and broadcast `tx`, returning as soon as the ledger accepted it.
    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash, LedgerError>;

    /// Receipt for `hash`, or `None` while the transaction is not yet included.
    async fn receipt(&self, hash: TxHash) -> Result<Option<LedgerReceipt>, LedgerError>;
}

/// [Ledger] backed by an alloy [Provider].
///
/// Transactions are signed by whatever wallet filler the provider was built with.
#[derive(Clone, Debug)]
pub struct ProviderLedger<P> {
    provider: P,
    request_timeout: Duration,
}

impl<P: Provider> ProviderLedger<P> {
    pub fn new(provider: P) -> Self {
        Self { provider, request_timeout: DEFAULT_REQUEST_TIMEOUT }
    }

    /// Override the ceiling applied to each request.
    pub fn with_request_timeout(self, request_timeout: Duration) -> Self {
        Self { request_timeout, ..self }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    async fn bounded<T>(
        &self,
        request: impl Future<Output = TransportResult<T>>,
    ) -> Result<T, LedgerError> {
        match tokio::time::timeout(self.request_timeout, request).await {
            Ok(result) => result.map_err(LedgerError::from),
            Err(_) => Err(LedgerError::Timeout(self.request_timeout)),
        }
    }
}

#[async_trait]
impl<P: Provider> Ledger for ProviderLedger<P> {
    async fn code_at(&self, address: Address) -> Result<Bytes, LedgerError> {
        self.bounded(async { self.provider.get_code_at(address).await }).await
    }

    async fn storage_at(&self, address: Address, slot: U256) -> Result<U256, LedgerError> {
        self.bounded(async { self.provider.get_storage_at(address, slot).await }).await
    }

    async fn call(&self, tx: TransactionRequest) -> Result<Bytes, LedgerError> {
        self.bounded(async { self.provider.call(tx).await }).await
    }

    async fn estimate_gas(&self, tx: TransactionRequest) -> Result<u64, LedgerError> {
        self.bounded(async { self.provider.estimate_gas(tx).await }).await
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash, LedgerError> {
        let pending = self.bounded(async { self.provider.send_transaction(tx).await }).await?;
        Ok(*pending.tx_hash())
    }

    async fn receipt(&self, hash: TxHash) -> Result<Option<LedgerReceipt>, LedgerError> {
        let receipt =
            self.bounded(async { self.provider.get_transaction_receipt(hash).await }).await?;
        Ok(receipt.map(LedgerReceipt::from))
    }
}
