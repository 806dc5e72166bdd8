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

//! Integration tests for the transaction lifecycle tracker.

use std::time::Duration;

use afrovibe_staking::{
    contracts::IStaking, EvictionPolicy, LedgerError, TrackerConfig, TransactionTracker, TxKind,
    TxStatus,
};
use afrovibe_test_utils::{
    ledger::{event_log, receipt},
    test_ctx, MockLedger, STAKING_ADDRESS,
};
use alloy::primitives::{utils::parse_ether, B256, U256};
use tracing_test::traced_test;

fn tracker(ctx: &afrovibe_test_utils::TestCtx) -> TransactionTracker<MockLedger> {
    TransactionTracker::new(ctx.ledger.clone(), TrackerConfig::default())
}

#[tokio::test(start_paused = true)]
async fn test_stake_confirms_with_event_amount() -> anyhow::Result<()> {
    let ctx = test_ctx()?;
    let gateway = ctx.staking_gateway(ctx.gateway_config()).await?;
    let tracker = tracker(&ctx);

    let amount = parse_ether("100")?;
    let hash = gateway.stake(&ctx.session, amount, 30).await?;
    let mut handle = tracker.track(&ctx.session, hash, TxKind::Stake, None);

    let pending = tracker.get(&hash).unwrap();
    assert_eq!(pending.status, TxStatus::Pending);
    assert_eq!(pending.amount, None);

    let staked = IStaking::Staked { user: ctx.account(), amount, lockPeriod: U256::from(30) };
    let logs = vec![event_log(ctx.deployment.staking_address, &staked)];
    ctx.ledger.set_receipt(hash, receipt(hash, STAKING_ADDRESS, true, logs), 2);

    let settled = handle.wait().await.unwrap();
    assert_eq!(settled.status, TxStatus::Confirmed);
    assert_eq!(settled.amount, Some(amount));
    assert_eq!(settled.fee_consumed, Some(U256::from(50_000u64 * 1_000_000_000)));
    assert_eq!(ctx.ledger.receipt_requests(), 3);
    assert_eq!(tracker.get(&hash), Some(settled));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_failed_receipt() -> anyhow::Result<()> {
    let ctx = test_ctx()?;
    let tracker = tracker(&ctx);
    let hash = B256::repeat_byte(0xf1);
    ctx.ledger.set_receipt(hash, receipt(hash, STAKING_ADDRESS, false, vec![]), 0);

    let mut handle = tracker.track(&ctx.session, hash, TxKind::Unstake, None);
    let settled = handle.wait().await.unwrap();
    assert_eq!(settled.status, TxStatus::Failed);
    assert_eq!(settled.amount, None);
    assert!(settled.fee_consumed.is_some());
    Ok(())
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn test_receipt_errors_keep_polling() -> anyhow::Result<()> {
    let ctx = test_ctx()?;
    let tracker = tracker(&ctx);
    let hash = B256::repeat_byte(0xf2);
    ctx.ledger.fail_next_receipts([
        LedgerError::Transport("connection refused".into()),
        LedgerError::Rpc { code: -32603, message: "internal error".into() },
    ]);
    ctx.ledger.set_receipt(hash, receipt(hash, STAKING_ADDRESS, true, vec![]), 0);

    let start = tokio::time::Instant::now();
    let mut handle = tracker.track(&ctx.session, hash, TxKind::ClaimRewards, None);
    let settled = handle.wait().await.unwrap();
    assert_eq!(settled.status, TxStatus::Confirmed);
    assert_eq!(start.elapsed(), Duration::from_secs(10));
    assert!(logs_contain("failed to fetch receipt"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_session_end_stops_polling() -> anyhow::Result<()> {
    let ctx = test_ctx()?;
    let tracker = tracker(&ctx);
    let hash = B256::repeat_byte(0xf3);

    let mut handle = tracker.track(&ctx.session, hash, TxKind::Delegate, None);
    ctx.session.end();
    assert!(handle.is_cancelled());
    assert_eq!(handle.wait().await, None);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(ctx.ledger.receipt_requests() <= 1);
    assert_eq!(tracker.get(&hash).map(|tx| tx.status), Some(TxStatus::Pending));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_cancel_is_per_transaction() -> anyhow::Result<()> {
    let ctx = test_ctx()?;
    let tracker = tracker(&ctx);
    let (first, second) = (B256::repeat_byte(0xa1), B256::repeat_byte(0xa2));

    let mut cancelled = tracker.track(&ctx.session, first, TxKind::Stake, None);
    let mut tracked = tracker.track(&ctx.session, second, TxKind::Stake, None);
    cancelled.cancel();
    ctx.ledger.set_receipt(first, receipt(first, STAKING_ADDRESS, true, vec![]), 1);
    ctx.ledger.set_receipt(second, receipt(second, STAKING_ADDRESS, true, vec![]), 1);

    assert_eq!(tracked.wait().await.map(|tx| tx.status), Some(TxStatus::Confirmed));
    assert_eq!(cancelled.wait().await, None);
    assert_eq!(tracker.get(&first).map(|tx| tx.status), Some(TxStatus::Pending));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_tracking_twice_shares_cancellation() -> anyhow::Result<()> {
    let ctx = test_ctx()?;
    let tracker = tracker(&ctx);
    let hash = B256::repeat_byte(0xb1);

    let mut first = tracker.track(&ctx.session, hash, TxKind::Stake, None);
    let second = tracker.track(&ctx.session, hash, TxKind::Stake, None);
    assert_eq!(tracker.history().len(), 1);

    second.cancel();
    assert!(first.is_cancelled());
    assert_eq!(first.wait().await, None);

    ctx.ledger.set_receipt(hash, receipt(hash, STAKING_ADDRESS, true, vec![]), 0);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(ctx.ledger.receipt_requests() <= 1);
    assert_eq!(tracker.get(&hash).map(|tx| tx.status), Some(TxStatus::Pending));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_event_from_other_contract_is_ignored() -> anyhow::Result<()> {
    let ctx = test_ctx()?;
    let tracker = tracker(&ctx);
    let hash = B256::repeat_byte(0xb2);

    let amount = parse_ether("100")?;
    let spoofed = IStaking::Staked {
        user: ctx.account(),
        amount: amount * U256::from(10),
        lockPeriod: U256::from(30),
    };
    let logs = vec![event_log(ctx.deployment.stake_token_address, &spoofed)];
    ctx.ledger.set_receipt(hash, receipt(hash, STAKING_ADDRESS, true, logs), 0);

    let mut handle = tracker.track(&ctx.session, hash, TxKind::Stake, Some(amount));
    let settled = handle.wait().await.unwrap();
    assert_eq!(settled.status, TxStatus::Confirmed);
    assert_eq!(settled.amount, Some(amount));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_history_keeps_five_most_recent() -> anyhow::Result<()> {
    let ctx = test_ctx()?;
    let tracker = tracker(&ctx);
    let mut updates = tracker.subscribe();

    let hashes: Vec<_> = (1..=6u8).map(B256::repeat_byte).collect();
    let mut handles: Vec<_> = hashes
        .iter()
        .map(|hash| tracker.track(&ctx.session, *hash, TxKind::Bridge, None))
        .collect();
    assert!(updates.has_changed()?);

    let history = updates.borrow_and_update().clone();
    assert_eq!(history.len(), 5);
    assert!(!history.contains(&hashes[0]));
    assert_eq!(history.entries()[0].handle, hashes[5]);

    // the evicted transaction stops tracking without settling
    assert_eq!(handles[0].wait().await, None);
    ctx.ledger.set_receipt(hashes[1], receipt(hashes[1], STAKING_ADDRESS, true, vec![]), 0);
    assert_eq!(handles[1].wait().await.map(|tx| tx.status), Some(TxStatus::Confirmed));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_prefer_settled_eviction() -> anyhow::Result<()> {
    let ctx = test_ctx()?;
    let config = TrackerConfig { eviction: EvictionPolicy::PreferSettled, ..Default::default() };
    let tracker = TransactionTracker::new(ctx.ledger.clone(), config);

    let settled = B256::repeat_byte(0x10);
    ctx.ledger.set_receipt(settled, receipt(settled, STAKING_ADDRESS, true, vec![]), 0);
    tracker.track(&ctx.session, B256::repeat_byte(0x01), TxKind::Stake, None);
    tracker.track(&ctx.session, settled, TxKind::Stake, None).wait().await;
    for n in 2..=5u8 {
        tracker.track(&ctx.session, B256::repeat_byte(n), TxKind::Stake, None);
    }

    let history = tracker.history();
    assert_eq!(history.len(), 5);
    assert!(!history.contains(&settled));
    assert!(history.contains(&B256::repeat_byte(0x01)));
    Ok(())
}
