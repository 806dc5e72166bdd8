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

//! In-memory [Ledger] with scripted responses.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use afrovibe_staking::{
    gateway::IMPLEMENTATION_SLOT,
    ledger::{Ledger, LedgerError, LedgerReceipt},
};
use alloy::{
    primitives::{hex, keccak256, Address, Bytes, Log, TxHash, U256},
    rpc::types::TransactionRequest,
    sol_types::{SolCall, SolEvent},
};
use async_trait::async_trait;

/// Gas estimate returned unless overridden with [MockLedger::set_gas_estimate].
pub const DEFAULT_GAS_ESTIMATE: u64 = 100_000;

/// Runtime code containing a solidity-style dispatcher entry for each selector.
pub fn dispatcher_code(selectors: &[[u8; 4]]) -> Bytes {
    // PUSH1 0x80 PUSH1 0x40 MSTORE
    let mut code = vec![0x60, 0x80, 0x60, 0x40, 0x52];
    for selector in selectors {
        // DUP1 PUSH4 <selector> EQ
        code.push(0x80);
        code.push(0x63);
        code.extend_from_slice(selector);
        code.push(0x14);
    }
    code.push(0x00);
    code.into()
}

/// Runtime code of a minimal EIP-1967 proxy delegating every call to its implementation.
pub fn proxy_code() -> Bytes {
    // CALLDATACOPY, then PUSH32 <slot> SLOAD ahead of the DELEGATECALL
    let mut code = hex!("363d3d373d3d363d7f").to_vec();
    code.extend_from_slice(IMPLEMENTATION_SLOT.as_slice());
    code.extend_from_slice(&hex!("545af43d6000803e6038573d6000fd5b3d6000f3"));
    code.into()
}

/// Log emitted by `address` carrying `event`.
pub fn event_log<E: SolEvent>(address: Address, event: &E) -> Log {
    Log { address, data: event.encode_log_data() }
}

/// Receipt for `hash`, a call to `to`, with a gas price of 1 gwei.
pub fn receipt(hash: TxHash, to: Address, success: bool, logs: Vec<Log>) -> LedgerReceipt {
    LedgerReceipt {
        transaction_hash: hash,
        to: Some(to),
        success,
        gas_used: 50_000,
        effective_gas_price: 1_000_000_000,
        logs,
    }
}

#[derive(Debug)]
struct ScriptedReceipt {
    /// Lookups answered with `None` before the receipt is returned.
    pending_polls: usize,
    receipt: LedgerReceipt,
}

#[derive(Debug, Default)]
struct State {
    code: HashMap<Address, Bytes>,
    storage: HashMap<(Address, U256), U256>,
    exact_calls: HashMap<(Address, Bytes), Bytes>,
    calls: HashMap<(Address, [u8; 4]), Bytes>,
    call_failures: VecDeque<LedgerError>,
    call_latency: Option<Duration>,
    gas_estimate: Option<u64>,
    estimate_failures: VecDeque<LedgerError>,
    send_failures: VecDeque<LedgerError>,
    sent: Vec<TransactionRequest>,
    receipts: HashMap<TxHash, ScriptedReceipt>,
    receipt_failures: VecDeque<LedgerError>,
}

/// Scripted ledger for tests.
///
/// Reads are answered from responses registered per contract and selector, or per exact
/// calldata. Failures queued with the `fail_next_*` methods are returned, in order, before any
/// scripted response.
#[derive(Debug, Default)]
pub struct MockLedger {
    state: Mutex<State>,
    code_requests: AtomicUsize,
    call_requests: AtomicUsize,
    calls_in_flight: AtomicUsize,
    max_calls_in_flight: AtomicUsize,
    estimate_requests: AtomicUsize,
    receipt_requests: AtomicUsize,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploy a contract at `address` exposing `selectors`.
    pub fn deploy(&self, address: Address, selectors: &[[u8; 4]]) {
        self.deploy_code(address, dispatcher_code(selectors));
    }

    pub fn deploy_code(&self, address: Address, code: Bytes) {
        tracing::debug!(%address, "deployed {} bytes of mock code", code.len());
        self.state.lock().unwrap().code.insert(address, code);
    }

    /// Deploy an EIP-1967 proxy at `address` delegating to `implementation`.
    pub fn deploy_proxy(&self, address: Address, implementation: Address) {
        self.deploy_code(address, proxy_code());
        let slot = U256::from_be_bytes(IMPLEMENTATION_SLOT.0);
        self.set_storage(address, slot, U256::from_be_slice(implementation.as_slice()));
    }

    pub fn set_storage(&self, address: Address, slot: U256, value: U256) {
        self.state.lock().unwrap().storage.insert((address, slot), value);
    }

    /// Delay every read by `latency`, so concurrent reads overlap.
    pub fn set_call_latency(&self, latency: Duration) {
        self.state.lock().unwrap().call_latency = Some(latency);
    }

    /// Answer every `C` call to `to` with `ret`.
    pub fn on_call<C: SolCall>(&self, to: Address, ret: C::Return) {
        let output = C::abi_encode_returns(&ret).into();
        self.state.lock().unwrap().calls.insert((to, C::SELECTOR), output);
    }

    /// Answer `call` to `to` with `ret`. Takes precedence over [MockLedger::on_call].
    pub fn on_exact_call<C: SolCall>(&self, to: Address, call: C, ret: C::Return) {
        let output = C::abi_encode_returns(&ret).into();
        self.state.lock().unwrap().exact_calls.insert((to, call.abi_encode().into()), output);
    }

    /// Answer every `C` call to `to` with raw `output`.
    pub fn on_call_raw<C: SolCall>(&self, to: Address, output: Bytes) {
        self.state.lock().unwrap().calls.insert((to, C::SELECTOR), output);
    }

    /// Fail the next reads, code and storage lookups included.
    pub fn fail_next_calls(&self, errors: impl IntoIterator<Item = LedgerError>) {
        self.state.lock().unwrap().call_failures.extend(errors);
    }

    pub fn fail_next_estimates(&self, errors: impl IntoIterator<Item = LedgerError>) {
        self.state.lock().unwrap().estimate_failures.extend(errors);
    }

    pub fn fail_next_send(&self, error: LedgerError) {
        self.state.lock().unwrap().send_failures.push_back(error);
    }

    pub fn fail_next_receipts(&self, errors: impl IntoIterator<Item = LedgerError>) {
        self.state.lock().unwrap().receipt_failures.extend(errors);
    }

    pub fn set_gas_estimate(&self, gas: u64) {
        self.state.lock().unwrap().gas_estimate = Some(gas);
    }

    /// Make `receipt` available for `hash` after `pending_polls` empty lookups.
    pub fn set_receipt(&self, hash: TxHash, receipt: LedgerReceipt, pending_polls: usize) {
        let scripted = ScriptedReceipt { pending_polls, receipt };
        self.state.lock().unwrap().receipts.insert(hash, scripted);
    }

    /// Transactions sent so far, in order.
    pub fn sent(&self) -> Vec<TransactionRequest> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Hash assigned to the `n`th sent transaction, starting at zero.
    pub fn tx_hash(n: usize) -> TxHash {
        keccak256(U256::from(n).to_be_bytes::<32>())
    }

    pub fn code_requests(&self) -> usize {
        self.code_requests.load(Ordering::SeqCst)
    }

    pub fn call_requests(&self) -> usize {
        self.call_requests.load(Ordering::SeqCst)
    }

    /// Highest number of reads observed in flight at the same time.
    pub fn max_calls_in_flight(&self) -> usize {
        self.max_calls_in_flight.load(Ordering::SeqCst)
    }

    pub fn estimate_requests(&self) -> usize {
        self.estimate_requests.load(Ordering::SeqCst)
    }

    pub fn receipt_requests(&self) -> usize {
        self.receipt_requests.load(Ordering::SeqCst)
    }
}

fn calldata(tx: &TransactionRequest) -> Bytes {
    tx.input.input().cloned().unwrap_or_default()
}

fn target(tx: &TransactionRequest) -> Address {
    tx.to.and_then(|kind| kind.to().copied()).unwrap_or_default()
}

fn answer_call(state: &mut State, tx: &TransactionRequest) -> Result<Bytes, LedgerError> {
    if let Some(err) = state.call_failures.pop_front() {
        return Err(err);
    }
    let (to, input) = (target(tx), calldata(tx));
    if let Some(output) = state.exact_calls.get(&(to, input.clone())) {
        return Ok(output.clone());
    }
    let selector: [u8; 4] = input.get(..4).and_then(|s| s.try_into().ok()).unwrap_or_default();
    state.calls.get(&(to, selector)).cloned().ok_or_else(|| LedgerError::Reverted {
        reason: format!("no response scripted for 0x{} on {to}", hex::encode(selector)),
        data: None,
    })
}

#[async_trait]
impl Ledger for MockLedger {
    async fn code_at(&self, address: Address) -> Result<Bytes, LedgerError> {
        self.code_requests.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.call_failures.pop_front() {
            return Err(err);
        }
        Ok(state.code.get(&address).cloned().unwrap_or_default())
    }

    async fn storage_at(&self, address: Address, slot: U256) -> Result<U256, LedgerError> {
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.call_failures.pop_front() {
            return Err(err);
        }
        Ok(state.storage.get(&(address, slot)).copied().unwrap_or_default())
    }

    async fn call(&self, tx: TransactionRequest) -> Result<Bytes, LedgerError> {
        self.call_requests.fetch_add(1, Ordering::SeqCst);
        let in_flight = self.calls_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_calls_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        let (result, latency) = {
            let mut state = self.state.lock().unwrap();
            (answer_call(&mut state, &tx), state.call_latency)
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.calls_in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn estimate_gas(&self, _tx: TransactionRequest) -> Result<u64, LedgerError> {
        self.estimate_requests.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.estimate_failures.pop_front() {
            return Err(err);
        }
        Ok(state.gas_estimate.unwrap_or(DEFAULT_GAS_ESTIMATE))
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash, LedgerError> {
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.send_failures.pop_front() {
            return Err(err);
        }
        let hash = Self::tx_hash(state.sent.len());
        tracing::debug!(%hash, to = %target(&tx), "mock ledger accepted transaction");
        state.sent.push(tx);
        Ok(hash)
    }

    async fn receipt(&self, hash: TxHash) -> Result<Option<LedgerReceipt>, LedgerError> {
        self.receipt_requests.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.receipt_failures.pop_front() {
            return Err(err);
        }
        match state.receipts.get_mut(&hash) {
            Some(scripted) if scripted.pending_polls > 0 => {
                scripted.pending_polls -= 1;
                Ok(None)
            }
            Some(scripted) => Ok(Some(scripted.receipt.clone())),
            None => Ok(None),
        }
    }
}
