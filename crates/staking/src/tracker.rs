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

//! Lifecycle tracking of submitted transactions.
//!
//! The tracker keeps a bounded, newest-first [TxHistory] of recent transactions. Each tracked
//! transaction is polled by its own task until a receipt is available, at which point the entry
//! settles as [TxStatus::Confirmed] or [TxStatus::Failed] and is enriched from the events the
//! transaction emitted. The history is published through a [watch] channel and every update
//! replaces it as a whole, so readers never observe a partially applied change.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use alloy::primitives::{TxHash, U256};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::{
    contracts::{find_tx_log, IAfroVibePaymaster, IPaymasterFunder, IStaking},
    ledger::{Ledger, LedgerReceipt},
    session::Session,
};

/// Number of transactions retained by default.
pub const DEFAULT_HISTORY_CAPACITY: usize = 5;
/// Delay between receipt lookups by default.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Operation a tracked transaction performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TxKind {
    /// ERC-20 allowance granted ahead of a stake or funding.
    Approve,
    Stake,
    Unstake,
    ClaimRewards,
    Bridge,
    Delegate,
    CreateProposal,
    VerifyVoter,
    ProposeUpgrade,
    ConfirmUpgrade,
    /// Funding of the paymaster through the funder contract.
    Fund,
    /// Timelock, role and pause administration of the funder contract.
    FunderAdmin,
    /// Native or ERC-20 deposit into the paymaster.
    Deposit,
    /// Allow-list proposals and parameter updates of the paymaster.
    PaymasterAdmin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TxStatus {
    Pending,
    Confirmed,
    Failed,
}

impl TxStatus {
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackedTransaction {
    pub handle: TxHash,
    pub kind: TxKind,
    pub submitted_at: DateTime<Utc>,
    pub status: TxStatus,
    /// Amount moved by the transaction, taken from its events once confirmed.
    pub amount: Option<U256>,
    /// `gas_used * effective_gas_price` once a receipt is available.
    pub fee_consumed: Option<U256>,
}

impl TrackedTransaction {
    pub fn pending(handle: TxHash, kind: TxKind, amount: Option<U256>) -> Self {
        Self {
            handle,
            kind,
            submitted_at: Utc::now(),
            status: TxStatus::Pending,
            amount,
            fee_consumed: None,
        }
    }

    /// Settle the transaction from its receipt.
    pub fn apply_receipt(&mut self, receipt: &LedgerReceipt) {
        self.fee_consumed = Some(receipt.fee());
        if !receipt.success {
            self.status = TxStatus::Failed;
            return;
        }
        self.status = TxStatus::Confirmed;
        if let Some(amount) = event_amount(self.kind, receipt) {
            self.amount = Some(amount);
        }
    }
}

/// Amount reported by the event `kind` emits, if it was found on the receipt.
///
/// Only events emitted by the contract the transaction called are considered.
fn event_amount(kind: TxKind, receipt: &LedgerReceipt) -> Option<U256> {
    let to = receipt.to?;
    match kind {
        TxKind::Stake => find_tx_log::<IStaking::Staked>(receipt, to).map(|e| e.amount),
        TxKind::Unstake => find_tx_log::<IStaking::Unstaked>(receipt, to).map(|e| e.amount),
        TxKind::ClaimRewards => {
            find_tx_log::<IStaking::RewardsClaimed>(receipt, to).map(|e| e.amount)
        }
        TxKind::Bridge => find_tx_log::<IStaking::Bridged>(receipt, to)
            .map(|e| e.amount)
            .or_else(|| find_tx_log::<IStaking::TokensBridged>(receipt, to).map(|e| e.amount)),
        TxKind::Delegate => {
            find_tx_log::<IStaking::ValidatorDelegated>(receipt, to).map(|e| e.amount)
        }
        TxKind::Fund => find_tx_log::<IPaymasterFunder::Funded>(receipt, to).map(|e| e.amount),
        TxKind::Deposit => find_tx_log::<IAfroVibePaymaster::DepositFunded>(receipt, to)
            .map(|e| e.amount)
            .or_else(|| {
                find_tx_log::<IAfroVibePaymaster::TokenDepositFunded>(receipt, to).map(|e| e.amount)
            }),
        TxKind::Approve
        | TxKind::CreateProposal
        | TxKind::VerifyVoter
        | TxKind::ProposeUpgrade
        | TxKind::ConfirmUpgrade
        | TxKind::FunderAdmin
        | TxKind::PaymasterAdmin => None,
    }
}

/// Which entry to drop when the history grows past its capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum EvictionPolicy {
    /// Drop the least recently inserted entry regardless of its status.
    #[default]
    Recency,
    /// Drop the least recently inserted settled entry, falling back to [EvictionPolicy::Recency]
    /// when every entry is still pending.
    PreferSettled,
}

/// Bounded collection of tracked transactions, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxHistory {
    entries: Vec<TrackedTransaction>,
    capacity: usize,
    eviction: EvictionPolicy,
}

impl Default for TxHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY, EvictionPolicy::default())
    }
}

impl TxHistory {
    pub fn new(capacity: usize, eviction: EvictionPolicy) -> Self {
        Self { entries: Vec::with_capacity(capacity + 1), capacity: capacity.max(1), eviction }
    }

    pub fn entries(&self) -> &[TrackedTransaction] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, handle: &TxHash) -> Option<&TrackedTransaction> {
        self.entries.iter().find(|tx| tx.handle == *handle)
    }

    pub fn contains(&self, handle: &TxHash) -> bool {
        self.get(handle).is_some()
    }

    /// Prepend `tx`, returning the entry evicted to stay within capacity.
    ///
    /// Inserting a handle that is already present leaves the history unchanged.
    pub fn insert(&mut self, tx: TrackedTransaction) -> Option<TrackedTransaction> {
        if self.contains(&tx.handle) {
            tracing::warn!(handle = %tx.handle, "transaction is already tracked");
            return None;
        }
        self.entries.insert(0, tx);
        if self.entries.len() <= self.capacity {
            return None;
        }
        let victim = match self.eviction {
            EvictionPolicy::Recency => self.entries.len() - 1,
            EvictionPolicy::PreferSettled => self
                .entries
                .iter()
                .rposition(|tx| tx.status.is_settled())
                .unwrap_or(self.entries.len() - 1),
        };
        Some(self.entries.remove(victim))
    }

    /// Apply `update` to the entry for `handle`. Returns false if it is not tracked.
    pub fn update(
        &mut self,
        handle: &TxHash,
        update: impl FnOnce(&mut TrackedTransaction),
    ) -> bool {
        match self.entries.iter_mut().find(|tx| tx.handle == *handle) {
            Some(tx) => {
                update(tx);
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerConfig {
    pub poll_interval: Duration,
    pub capacity: usize,
    pub eviction: EvictionPolicy,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            capacity: DEFAULT_HISTORY_CAPACITY,
            eviction: EvictionPolicy::default(),
        }
    }
}

/// Follows submitted transactions to finality.
pub struct TransactionTracker<L> {
    ledger: Arc<L>,
    poll_interval: Duration,
    history: Arc<watch::Sender<TxHistory>>,
    /// Cancellation token of the poll loop of each transaction in the history.
    polls: Arc<Mutex<HashMap<TxHash, CancellationToken>>>,
}

impl<L> Clone for TransactionTracker<L> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
            poll_interval: self.poll_interval,
            history: self.history.clone(),
            polls: self.polls.clone(),
        }
    }
}

impl<L: Ledger + 'static> TransactionTracker<L> {
    pub fn new(ledger: Arc<L>, config: TrackerConfig) -> Self {
        let (history, _) = watch::channel(TxHistory::new(config.capacity, config.eviction));
        Self {
            ledger,
            poll_interval: config.poll_interval,
            history: Arc::new(history),
            polls: Default::default(),
        }
    }

    /// Snapshot of the current history.
    pub fn history(&self) -> TxHistory {
        self.history.borrow().clone()
    }

    /// Receiver notified on every change to the history.
    pub fn subscribe(&self) -> watch::Receiver<TxHistory> {
        self.history.subscribe()
    }

    pub fn get(&self, handle: &TxHash) -> Option<TrackedTransaction> {
        self.history.borrow().get(handle).cloned()
    }

    /// Start tracking `handle` as a pending `kind` transaction.
    ///
    /// Polling stops once the transaction settles, when the returned handle is cancelled, when
    /// `session` ends, or when the entry is evicted from the history. Tracking a transaction that
    /// is already in the history starts no new poll loop; the returned handle shares the running
    /// loop's cancellation.
    pub fn track(
        &self,
        session: &Session,
        handle: TxHash,
        kind: TxKind,
        amount: Option<U256>,
    ) -> TrackHandle {
        let updates = self.history.subscribe();
        let mut polls = self.polls.lock().unwrap_or_else(PoisonError::into_inner);
        let cancel = session.child_token();

        let mut inserted = false;
        self.history.send_if_modified(|history| {
            if history.contains(&handle) {
                return false;
            }
            let evicted = history.insert(TrackedTransaction::pending(handle, kind, amount));
            if let Some(evicted) = evicted {
                tracing::debug!(
                    handle = %evicted.handle,
                    status = ?evicted.status,
                    "evicted from history"
                );
            }
            inserted = true;
            true
        });

        if !inserted {
            tracing::warn!(%handle, "transaction is already tracked");
            let cancel = polls.get(&handle).cloned().unwrap_or(cancel);
            return TrackHandle { handle, cancel, updates };
        }

        {
            let history = self.history.borrow();
            polls.retain(|tracked, _| history.contains(tracked));
        }
        // a loop left over from before the entry was evicted
        if let Some(stale) = polls.insert(handle, cancel.clone()) {
            stale.cancel();
        }
        drop(polls);

        tracing::info!(%handle, ?kind, "tracking transaction");
        tokio::spawn(poll(
            self.ledger.clone(),
            self.history.clone(),
            handle,
            self.poll_interval,
            cancel.clone(),
        ));
        TrackHandle { handle, cancel, updates }
    }
}

async fn poll<L: Ledger>(
    ledger: Arc<L>,
    history: Arc<watch::Sender<TxHistory>>,
    handle: TxHash,
    interval: Duration,
    cancel: CancellationToken,
) {
    loop {
        let tracked = history.borrow().contains(&handle);
        if !tracked {
            tracing::debug!(%handle, "transaction no longer in history; stopped polling");
            return;
        }

        let lookup = tokio::select! {
            _ = cancel.cancelled() => break,
            lookup = ledger.receipt(handle) => lookup,
        };
        match lookup {
            Ok(Some(receipt)) => {
                settle(&history, handle, &receipt);
                return;
            }
            Ok(None) => tracing::trace!(%handle, "receipt not yet available"),
            Err(err) => tracing::warn!(%handle, "failed to fetch receipt, retrying: {err}"),
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
    tracing::debug!(%handle, "tracking cancelled");
}

fn settle(history: &watch::Sender<TxHistory>, handle: TxHash, receipt: &LedgerReceipt) {
    let mut settled = None;
    history.send_if_modified(|history| {
        history.update(&handle, |tx| {
            tx.apply_receipt(receipt);
            settled = Some(tx.clone());
        })
    });
    match settled {
        Some(tx) => tracing::info!(
            %handle,
            status = ?tx.status,
            amount = ?tx.amount,
            fee = ?tx.fee_consumed,
            "transaction settled"
        ),
        None => tracing::debug!(%handle, "transaction settled after leaving the history"),
    }
}

/// Handle to one tracked transaction.
#[derive(Debug)]
pub struct TrackHandle {
    handle: TxHash,
    cancel: CancellationToken,
    updates: watch::Receiver<TxHistory>,
}

impl TrackHandle {
    pub fn handle(&self) -> TxHash {
        self.handle
    }

    /// Stop polling for this transaction. Its entry stays in the history as is.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait until the transaction settles.
    ///
    /// Returns `None` if tracking was cancelled first, or if the entry was evicted from the
    /// history before it settled.
    pub async fn wait(&mut self) -> Option<TrackedTransaction> {
        let handle = self.handle;
        tokio::select! {
            biased;
            history = self.updates.wait_for(|history| {
                history.get(&handle).map(|tx| tx.status.is_settled()).unwrap_or(true)
            }) => history.ok().and_then(|history| history.get(&handle).cloned()),
            _ = self.cancel.cancelled() => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy::{
        primitives::{address, Address, Log, B256},
        sol_types::SolEvent,
    };

    use super::*;

    fn hash(n: u8) -> TxHash {
        B256::repeat_byte(n)
    }

    const STAKING: Address = address!("0x00000000000000000000000000000000000000aa");

    fn receipt(success: bool, logs: Vec<Log>) -> LedgerReceipt {
        LedgerReceipt {
            transaction_hash: hash(0xff),
            to: Some(STAKING),
            success,
            gas_used: 100_000,
            effective_gas_price: 3,
            logs,
        }
    }

    #[test]
    fn sixth_insert_evicts_oldest() {
        let mut history = TxHistory::default();
        for n in 1..=5 {
            let evicted = history.insert(TrackedTransaction::pending(hash(n), TxKind::Stake, None));
            assert_eq!(evicted, None);
        }
        let evicted = history.insert(TrackedTransaction::pending(hash(6), TxKind::Bridge, None));

        assert_eq!(evicted.map(|tx| tx.handle), Some(hash(1)));
        assert_eq!(history.len(), 5);
        let order: Vec<_> = history.entries().iter().map(|tx| tx.handle).collect();
        assert_eq!(order, vec![hash(6), hash(5), hash(4), hash(3), hash(2)]);
    }

    #[test]
    fn prefer_settled_protects_pending() {
        let mut history = TxHistory::new(3, EvictionPolicy::PreferSettled);
        for n in 1..=3 {
            history.insert(TrackedTransaction::pending(hash(n), TxKind::Stake, None));
        }
        history.update(&hash(2), |tx| tx.status = TxStatus::Confirmed);

        let evicted = history.insert(TrackedTransaction::pending(hash(4), TxKind::Stake, None));
        assert_eq!(evicted.map(|tx| tx.handle), Some(hash(2)));

        // all pending: fall back to recency
        let evicted = history.insert(TrackedTransaction::pending(hash(5), TxKind::Stake, None));
        assert_eq!(evicted.map(|tx| tx.handle), Some(hash(1)));
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn duplicate_insert_is_ignored() {
        let mut history = TxHistory::default();
        history.insert(TrackedTransaction::pending(hash(1), TxKind::Stake, None));
        let duplicate = TrackedTransaction::pending(hash(1), TxKind::Bridge, None);
        assert_eq!(history.insert(duplicate), None);
        assert_eq!(history.len(), 1);
        assert_eq!(history.get(&hash(1)).map(|tx| tx.kind), Some(TxKind::Stake));
    }

    #[test]
    fn confirmed_receipt_enriches_amount() {
        let user = address!("0x00000000000000000000000000000000000000bb");
        let staked = IStaking::Staked { user, amount: U256::from(100), lockPeriod: U256::from(30) };
        let mut tx = TrackedTransaction::pending(hash(1), TxKind::Stake, None);
        let log = Log { address: STAKING, data: staked.encode_log_data() };
        tx.apply_receipt(&receipt(true, vec![log]));

        assert_eq!(tx.status, TxStatus::Confirmed);
        assert_eq!(tx.amount, Some(U256::from(100)));
        assert_eq!(tx.fee_consumed, Some(U256::from(300_000)));
    }

    #[test]
    fn events_from_other_contracts_do_not_enrich() {
        let user = address!("0x00000000000000000000000000000000000000bb");
        let router = address!("0x00000000000000000000000000000000000000cc");
        let staked = IStaking::Staked { user, amount: U256::from(999), lockPeriod: U256::from(30) };
        let mut tx = TrackedTransaction::pending(hash(1), TxKind::Stake, Some(U256::from(100)));
        let log = Log { address: router, data: staked.encode_log_data() };
        tx.apply_receipt(&receipt(true, vec![log]));

        assert_eq!(tx.status, TxStatus::Confirmed);
        assert_eq!(tx.amount, Some(U256::from(100)));
    }

    #[test]
    fn bridge_falls_back_to_tokens_bridged() {
        let user = address!("0x00000000000000000000000000000000000000bb");
        let event = IStaking::TokensBridged { user, amount: U256::from(42) };
        let mut tx = TrackedTransaction::pending(hash(1), TxKind::Bridge, Some(U256::from(40)));
        let log = Log { address: STAKING, data: event.encode_log_data() };
        tx.apply_receipt(&receipt(true, vec![log]));
        assert_eq!(tx.amount, Some(U256::from(42)));

        let mut without_event =
            TrackedTransaction::pending(hash(2), TxKind::Bridge, Some(U256::from(40)));
        without_event.apply_receipt(&receipt(true, vec![]));
        assert_eq!(without_event.amount, Some(U256::from(40)));
    }

    #[test]
    fn token_deposit_enriches_amount() {
        let funder = address!("0x00000000000000000000000000000000000000bb");
        let token = address!("0x00000000000000000000000000000000000000dd");
        let event = IAfroVibePaymaster::TokenDepositFunded { funder, token, amount: U256::from(5) };
        let mut tx = TrackedTransaction::pending(hash(1), TxKind::Deposit, None);
        let log = Log { address: STAKING, data: event.encode_log_data() };
        tx.apply_receipt(&receipt(true, vec![log]));
        assert_eq!(tx.amount, Some(U256::from(5)));

        let mut admin = TrackedTransaction::pending(hash(2), TxKind::PaymasterAdmin, None);
        admin.apply_receipt(&receipt(true, vec![]));
        assert_eq!(admin.status, TxStatus::Confirmed);
        assert_eq!(admin.amount, None);
    }

    #[test]
    fn failed_receipt_records_fee() {
        let mut tx = TrackedTransaction::pending(hash(1), TxKind::Unstake, None);
        tx.apply_receipt(&receipt(false, vec![]));
        assert_eq!(tx.status, TxStatus::Failed);
        assert_eq!(tx.amount, None);
        assert_eq!(tx.fee_consumed, Some(U256::from(300_000)));
    }
}
