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

//! Integration tests for the reconciliation of ledger reads with the index.

use std::{sync::Arc, time::Duration};

use afrovibe_staking::{
    Backoff, GraphQlIndex, IndexService, Reconciler, RetryPolicy, TotalStakedSource,
};
use afrovibe_test_utils::{
    required_staking_selectors,
    servers::{index_activity, IndexMockServer},
    test_ctx, test_ctx_with, MockLedger, ScriptedStake, TestCtx,
};
use alloy::primitives::{utils::parse_ether, U256};
use tracing_test::traced_test;

fn index(server: &IndexMockServer) -> Arc<dyn IndexService> {
    Arc::new(GraphQlIndex::new(server.url()).with_retry(RetryPolicy::never()))
}

async fn reconciler(ctx: &TestCtx, index: Arc<dyn IndexService>) -> Reconciler<MockLedger> {
    let gateway = ctx.staking_gateway(ctx.gateway_config_without_retry()).await.unwrap();
    Reconciler::new(Arc::new(gateway), index)
}

fn script_positions(ctx: &TestCtx) -> anyhow::Result<()> {
    ctx.script_account(
        ctx.account(),
        parse_ether("12")?,
        &[
            ScriptedStake::new(parse_ether("100")?, 30, 1_700_000_000),
            ScriptedStake::new(U256::ZERO, 90, 0),
            ScriptedStake::new(parse_ether("50")?, 365, 1_700_000_000),
        ],
    );
    Ok(())
}

#[tokio::test]
async fn test_snapshot_from_index() -> anyhow::Result<()> {
    let ctx = test_ctx()?;
    script_positions(&ctx)?;
    let server = IndexMockServer::new().await;
    let user = ctx.account().to_string().to_lowercase();
    let stakes = [("0x01", "100000000000000000000"), ("0x02", "25000000000000000000")];
    let activity = index_activity(&user, &stakes);
    server.respond_with_data(activity).await;

    let snapshot = reconciler(&ctx, index(&server)).await.user_snapshot(ctx.account()).await?;
    assert_eq!(snapshot.sonic_points, parse_ether("12")?);
    assert_eq!(snapshot.total_staked, parse_ether("125")?);
    assert_eq!(snapshot.total_staked_source, TotalStakedSource::Index);
    assert_eq!(snapshot.ledger_total_staked, parse_ether("150")?);
    assert_eq!(snapshot.recent_stakes.len(), 2);
    assert_eq!(snapshot.positions.len(), 2);
    assert_eq!(snapshot.index_unavailable, None);

    let queries = server.received_queries().await;
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0]["variables"]["user"], user.as_str());
    assert_eq!(queries[0]["variables"]["first"], 5);
    Ok(())
}

#[tokio::test]
#[traced_test]
async fn test_index_failure_falls_back_to_ledger() -> anyhow::Result<()> {
    let ctx = test_ctx_with(&required_staking_selectors())?;
    script_positions(&ctx)?;
    let server = IndexMockServer::new().await;
    server.respond_with_status(500).await;

    let snapshot = reconciler(&ctx, index(&server)).await.user_snapshot(ctx.account()).await?;
    assert_eq!(snapshot.sonic_points, parse_ether("12")?);
    assert_eq!(snapshot.total_staked, parse_ether("150")?);
    assert_eq!(snapshot.total_staked_source, TotalStakedSource::Ledger);
    assert!(snapshot.recent_stakes.is_empty());
    assert!(snapshot.delegations.is_empty());
    assert!(snapshot.proposals.is_empty());
    let unavailable = snapshot.index_unavailable.unwrap();
    assert!(unavailable.reason.contains("500"), "{}", unavailable.reason);
    assert!(logs_contain("index unavailable"));
    Ok(())
}

#[tokio::test]
async fn test_index_transport_failures_are_retried() -> anyhow::Result<()> {
    let ctx = test_ctx()?;
    script_positions(&ctx)?;
    let server = IndexMockServer::new().await;
    server.respond_with_status(503).await;
    let retry = RetryPolicy {
        transient: Backoff::new(3, Duration::from_millis(10)),
        non_transient: Backoff::new(1, Duration::ZERO),
    };
    let index = Arc::new(GraphQlIndex::new(server.url()).with_retry(retry));

    let snapshot = reconciler(&ctx, index).await.user_snapshot(ctx.account()).await?;
    assert!(snapshot.index_unavailable.is_some());
    // bulk accessor is available on this deployment
    assert_eq!(snapshot.total_staked, parse_ether("150")?);
    assert_eq!(server.received_queries().await.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_graphql_errors_mark_index_unavailable() -> anyhow::Result<()> {
    let ctx = test_ctx()?;
    script_positions(&ctx)?;
    let server = IndexMockServer::new().await;
    server.respond_with_errors(&["indexing_error"]).await;
    let index = Arc::new(GraphQlIndex::new(server.url()));

    let snapshot = reconciler(&ctx, index).await.user_snapshot(ctx.account()).await?;
    let unavailable = snapshot.index_unavailable.unwrap();
    assert!(unavailable.reason.contains("indexing_error"));
    assert_eq!(snapshot.total_staked_source, TotalStakedSource::Ledger);
    // graphql errors are not retried
    assert_eq!(server.received_queries().await.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_ledger_failure_fails_snapshot() -> anyhow::Result<()> {
    let ctx = test_ctx()?;
    let server = IndexMockServer::new().await;
    server.respond_with_data(index_activity("0xacc0", &[])).await;

    // nothing scripted for the account
    let result = reconciler(&ctx, index(&server)).await.user_snapshot(ctx.account()).await;
    assert!(result.is_err());
    Ok(())
}
