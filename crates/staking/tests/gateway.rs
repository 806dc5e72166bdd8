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

//! Integration tests for the staking, paymaster and paymaster funder gateways.

use std::time::Duration;

use afrovibe_staking::{
    contracts::{IAfroVibePaymaster, IPaymasterFunder, IStaking, IERC20},
    gateway::{
        funder::{compute_action_id, Role, UPDATE_MAX_FUNDING_ACTION},
        paymaster::{compute_action_type_hash, compute_selector},
        MAX_CONCURRENT_POSITION_READS,
    },
    ErrorKind, GatewayError, LedgerError, ListChange, StakingGateway, ValidationError,
};
use afrovibe_test_utils::{
    full_staking_selectors, required_staking_selectors, test_ctx, test_ctx_with, MockLedger,
    ScriptedStake, TestCtx, PAYMASTER_ADDRESS, PAYMASTER_IMPLEMENTATION_ADDRESS, STAKING_ADDRESS,
};
use alloy::{
    primitives::{address, keccak256, utils::parse_ether, Address, B256, U256},
    rpc::types::TransactionRequest,
    sol_types::SolCall,
};
use tracing_test::traced_test;

async fn gateway(ctx: &TestCtx) -> StakingGateway<MockLedger> {
    ctx.staking_gateway(ctx.gateway_config_without_retry()).await.unwrap()
}

fn input(tx: &TransactionRequest) -> Vec<u8> {
    tx.input.input().cloned().unwrap_or_default().to_vec()
}

#[tokio::test]
async fn test_missing_required_operation() -> anyhow::Result<()> {
    let mut selectors = required_staking_selectors();
    selectors.retain(|selector| *selector != IStaking::unstakeCall::SELECTOR);
    let ctx = test_ctx_with(&selectors)?;

    let err = ctx.staking_gateway(ctx.gateway_config()).await.unwrap_err();
    let err = err.downcast::<GatewayError>()?;
    assert_eq!(err.kind(), ErrorKind::UnsupportedContract);
    match err {
        GatewayError::UnsupportedContract { missing, .. } => {
            assert_eq!(missing, vec!["unstake(uint256,uint256)"])
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(ctx.ledger.sent().is_empty());
    assert_eq!(ctx.ledger.estimate_requests(), 0);
    Ok(())
}

#[tokio::test]
async fn test_no_contract_deployed() -> anyhow::Result<()> {
    let ctx = test_ctx()?;
    let address = Address::repeat_byte(0x77);
    let err = StakingGateway::connect(ctx.ledger.clone(), address, ctx.gateway_config())
        .await
        .err()
        .unwrap();
    match err {
        GatewayError::UnsupportedContract { missing, .. } => assert_eq!(missing.len(), 12),
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_optional_operations_degrade() -> anyhow::Result<()> {
    let ctx = test_ctx_with(&required_staking_selectors())?;
    let gateway = gateway(&ctx).await;
    assert!(!gateway.capabilities().total_staked);
    assert!(!gateway.capabilities().claimable_rewards);

    ctx.script_account(
        ctx.account(),
        U256::ZERO,
        &[
            ScriptedStake::new(parse_ether("100")?, 30, 1_700_000_000),
            ScriptedStake::new(U256::ZERO, 30, 0),
            ScriptedStake::new(parse_ether("2.5")?, 365, 1_700_000_000),
        ],
    );
    assert_eq!(gateway.total_staked(ctx.account()).await?, parse_ether("102.5")?);

    let positions = gateway.positions(ctx.account()).await?;
    assert_eq!(positions.iter().map(|p| p.index).collect::<Vec<_>>(), vec![0, 2]);
    assert_eq!(positions[0].end_time, 1_700_000_000 + 30 * 86_400);

    let err = gateway.claimable_rewards(ctx.account(), 0).await.unwrap_err();
    assert!(matches!(err, GatewayError::UnsupportedOperation { .. }));
    assert!(matches!(gateway.is_paused().await, Err(GatewayError::UnsupportedOperation { .. })));
    Ok(())
}

#[tokio::test]
async fn test_capabilities_resolve_through_proxy() -> anyhow::Result<()> {
    let ctx = test_ctx_with(&required_staking_selectors())?;
    let implementation = address!("0x5a1e000000000000000000000000000000000011");
    ctx.ledger.deploy(implementation, &full_staking_selectors());
    ctx.ledger.deploy_proxy(STAKING_ADDRESS, implementation);

    let gateway = gateway(&ctx).await;
    assert!(gateway.capabilities().total_staked);
    assert!(gateway.capabilities().claimable_rewards);
    assert!(gateway.capabilities().paused);

    // reads are still addressed to the proxy
    ctx.ledger.on_exact_call(
        STAKING_ADDRESS,
        IStaking::getTotalStakedCall { user: ctx.account() },
        parse_ether("7")?,
    );
    assert_eq!(gateway.total_staked(ctx.account()).await?, parse_ether("7")?);
    Ok(())
}

#[tokio::test]
async fn test_proxy_implementation_missing_operation() -> anyhow::Result<()> {
    let ctx = test_ctx()?;
    let mut selectors = full_staking_selectors();
    selectors.retain(|selector| *selector != IStaking::claimRewardsCall::SELECTOR);
    let implementation = address!("0x5a1e000000000000000000000000000000000011");
    ctx.ledger.deploy(implementation, &selectors);
    ctx.ledger.deploy_proxy(STAKING_ADDRESS, implementation);

    let err = ctx.staking_gateway(ctx.gateway_config()).await.unwrap_err();
    match err.downcast::<GatewayError>()? {
        GatewayError::UnsupportedContract { missing, .. } => {
            assert_eq!(missing, vec!["claimRewards()"])
        }
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_positions_read_with_bounded_concurrency() -> anyhow::Result<()> {
    let ctx = test_ctx()?;
    let gateway = gateway(&ctx).await;
    let stakes: Vec<_> = (1..=12u64)
        .map(|n| ScriptedStake::new(U256::from(n), 30, 1_700_000_000 + n))
        .collect();
    ctx.script_account(ctx.account(), U256::ZERO, &stakes);
    ctx.ledger.set_call_latency(Duration::from_millis(100));

    let positions = gateway.positions(ctx.account()).await?;
    let indices: Vec<_> = positions.iter().map(|position| position.index).collect();
    assert_eq!(indices, (0..12).collect::<Vec<u64>>());
    assert_eq!(positions[11].principal, U256::from(12));

    let max_in_flight = ctx.ledger.max_calls_in_flight();
    assert!(max_in_flight > 1);
    assert!(max_in_flight <= MAX_CONCURRENT_POSITION_READS);
    Ok(())
}

#[tokio::test]
async fn test_total_staked_uses_bulk_accessor() -> anyhow::Result<()> {
    let ctx = test_ctx()?;
    let gateway = gateway(&ctx).await;
    ctx.ledger.on_exact_call(
        ctx.deployment.staking_address,
        IStaking::getTotalStakedCall { user: ctx.account() },
        parse_ether("42")?,
    );
    assert_eq!(gateway.total_staked(ctx.account()).await?, parse_ether("42")?);
    // one read, no per-position iteration
    assert_eq!(ctx.ledger.call_requests(), 1);
    Ok(())
}

#[tokio::test]
async fn test_stake_applies_gas_margin() -> anyhow::Result<()> {
    let ctx = test_ctx()?;
    let gateway = gateway(&ctx).await;
    ctx.ledger.set_gas_estimate(150_000);

    let amount = parse_ether("100")?;
    let hash = gateway.stake(&ctx.session, amount, 30).await?;
    assert_eq!(hash, MockLedger::tx_hash(0));

    let sent = ctx.ledger.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].gas, Some(180_000));
    assert_eq!(sent[0].from, Some(ctx.account()));
    assert_eq!(
        input(&sent[0]),
        IStaking::stakeCall { amount, lockPeriod: U256::from(30) }.abi_encode()
    );
    Ok(())
}

#[tokio::test]
async fn test_approve_targets_stake_token() -> anyhow::Result<()> {
    let ctx = test_ctx()?;
    let gateway = gateway(&ctx).await;

    let amount = parse_ether("100")?;
    gateway.approve_stake_token(&ctx.session, ctx.deployment.stake_token_address, amount).await?;

    let sent = ctx.ledger.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, Some(ctx.deployment.stake_token_address.into()));
    assert_eq!(
        input(&sent[0]),
        IERC20::approveCall { spender: ctx.deployment.staking_address, amount }.abi_encode()
    );
    Ok(())
}

#[tokio::test]
async fn test_validation_never_reaches_ledger() -> anyhow::Result<()> {
    let ctx = test_ctx()?;
    let gateway = gateway(&ctx).await;
    let session = &ctx.session;

    let err = gateway.stake(session, U256::ZERO, 30).await.unwrap_err();
    assert!(matches!(err, GatewayError::Validation(ValidationError::InvalidAmount { .. })));

    let err = gateway.stake(session, U256::from(1), 366).await.unwrap_err();
    assert!(matches!(err, GatewayError::Validation(ValidationError::InvalidLockPeriod(366))));

    let token = ctx.deployment.stake_token_address;
    let err = gateway
        .bridge_tokens(session, token, U256::from(1), Address::ZERO, true)
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Validation(ValidationError::InvalidAddress { .. })));

    let err = gateway.verify_proposal_voter(session, U256::from(1), &[]).await.unwrap_err();
    assert!(matches!(err, GatewayError::Validation(ValidationError::InvalidProofFormat(_))));

    let err = gateway.create_proposal(session, "", B256::ZERO, 1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert_eq!(ctx.ledger.estimate_requests(), 0);
    assert!(ctx.ledger.sent().is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn test_estimate_retried_on_transient_failure() -> anyhow::Result<()> {
    let ctx = test_ctx()?;
    let gateway = ctx.staking_gateway(ctx.gateway_config()).await?;
    ctx.ledger.fail_next_estimates([
        LedgerError::Transport("connection reset".into()),
        LedgerError::Timeout(std::time::Duration::from_secs(30)),
    ]);

    gateway.claim_rewards(&ctx.session).await?;
    assert_eq!(ctx.ledger.estimate_requests(), 3);
    assert_eq!(ctx.ledger.sent().len(), 1);
    assert!(logs_contain("operation failed, retrying"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_business_rule_rejection_surfaces_reason() -> anyhow::Result<()> {
    let ctx = test_ctx()?;
    let gateway = ctx.staking_gateway(ctx.gateway_config()).await?;
    let rejection =
        || LedgerError::Reverted { reason: "Lock period not expired".into(), data: None };
    ctx.ledger.fail_next_estimates([rejection(), rejection(), rejection()]);

    let err = gateway.unstake(&ctx.session, 0, U256::ZERO).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BusinessRule);
    assert_eq!(err.to_string(), "unstake(uint256,uint256) rejected: Lock period not expired");
    // non-transient budget is two attempts
    assert_eq!(ctx.ledger.estimate_requests(), 2);
    assert!(ctx.ledger.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_failed_send_is_not_resent() -> anyhow::Result<()> {
    let ctx = test_ctx()?;
    let gateway = ctx.staking_gateway(ctx.gateway_config()).await?;
    ctx.ledger.fail_next_send(LedgerError::Transport("broken pipe".into()));

    let err = gateway.claim_rewards(&ctx.session).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RemoteCall);
    assert!(ctx.ledger.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_governance_submissions() -> anyhow::Result<()> {
    let ctx = test_ctx()?;
    let gateway = gateway(&ctx).await;
    let merkle_root = B256::repeat_byte(0x42);

    gateway.create_proposal(&ctx.session, "Raise validator cap", merkle_root, 1_700_000_000).await?;
    let proof = [B256::repeat_byte(1), B256::repeat_byte(2)];
    gateway.verify_proposal_voter(&ctx.session, U256::from(3), &proof).await?;
    let implementation = Address::repeat_byte(0x99);
    gateway.propose_upgrade(&ctx.session, implementation, "v2").await?;
    gateway.confirm_upgrade(&ctx.session, U256::from(1)).await?;

    let sent = ctx.ledger.sent();
    assert_eq!(
        input(&sent[0]),
        IStaking::createProposalCall {
            descriptionHash: keccak256("Raise validator cap"),
            merkleRoot: merkle_root,
            snapshotTimestamp: U256::from(1_700_000_000u64),
        }
        .abi_encode()
    );
    assert_eq!(
        input(&sent[1]),
        IStaking::verifyProposalVoterCall { proposalId: U256::from(3), proof: proof.to_vec() }
            .abi_encode()
    );
    assert_eq!(
        input(&sent[2]),
        IStaking::proposeUpgradeCall {
            newImplementation: implementation,
            descriptionHash: keccak256("v2"),
        }
        .abi_encode()
    );
    assert_eq!(sent.len(), 4);
    Ok(())
}

#[tokio::test]
async fn test_funder_checks_bounds_locally() -> anyhow::Result<()> {
    let ctx = test_ctx()?;
    let funder = ctx.funder_gateway(ctx.gateway_config_without_retry()).await?;
    let address = funder.address();
    ctx.ledger.on_call::<IPaymasterFunder::minFundingAmountCall>(address, parse_ether("1")?);
    ctx.ledger.on_call::<IPaymasterFunder::maxFundingAmountCall>(address, parse_ether("10")?);

    let err = funder.fund(&ctx.session, parse_ether("11")?).await.unwrap_err();
    assert!(matches!(err, GatewayError::Validation(ValidationError::AmountOutOfRange { .. })));
    assert_eq!(ctx.ledger.estimate_requests(), 0);

    funder.fund(&ctx.session, parse_ether("5")?).await?;
    let sent = ctx.ledger.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        input(&sent[0]),
        IPaymasterFunder::fundCall { amount: parse_ether("5")? }.abi_encode()
    );
    Ok(())
}

#[tokio::test]
async fn test_funder_reads() -> anyhow::Result<()> {
    let ctx = test_ctx()?;
    let funder = ctx.funder_gateway(ctx.gateway_config_without_retry()).await?;
    let address = funder.address();
    let funder_role = keccak256("FUNDER_ROLE");
    let pauser_role = keccak256("PAUSER_ROLE");
    ctx.ledger.on_call::<IPaymasterFunder::FUNDER_ROLECall>(address, funder_role);
    ctx.ledger.on_call::<IPaymasterFunder::PAUSER_ROLECall>(address, pauser_role);
    ctx.ledger.on_exact_call(
        address,
        IPaymasterFunder::hasRoleCall { role: funder_role, account: ctx.account() },
        true,
    );
    ctx.ledger.on_exact_call(
        address,
        IPaymasterFunder::hasRoleCall { role: pauser_role, account: ctx.account() },
        false,
    );
    ctx.ledger.on_call::<IPaymasterFunder::fundingHistoryCall>(
        address,
        IPaymasterFunder::fundingHistoryReturn {
            funder: ctx.account(),
            amount: parse_ether("3")?,
            timestamp: U256::from(1_700_000_000u64),
        },
    );

    assert!(funder.is_funder(ctx.account()).await?);
    assert!(!funder.has_role(Role::Pauser, ctx.account()).await?);
    assert_eq!(funder.funding_token().await?, ctx.deployment.stake_token_address);
    assert_eq!(funder.funding_token_decimals().await?, 18);
    let record = funder.funding_history(0).await?;
    assert_eq!(record.amount, parse_ether("3")?);
    assert_eq!(record.timestamp, 1_700_000_000);

    let action_id = compute_action_id(UPDATE_MAX_FUNDING_ACTION, parse_ether("20")?, 1_700_086_400);
    ctx.ledger.on_exact_call(
        address,
        IPaymasterFunder::timelockActionsCall { actionId: action_id },
        IPaymasterFunder::timelockActionsReturn {
            action: UPDATE_MAX_FUNDING_ACTION.to_string(),
            amount: parse_ether("20")?,
            timestamp: U256::from(1_700_086_400u64),
            executed: false,
        },
    );
    let action = funder.timelock_action(action_id).await?;
    assert_eq!(action.action, UPDATE_MAX_FUNDING_ACTION);
    assert!(!action.executed);

    funder.execute_update_max_funding_amount(&ctx.session, action_id).await?;
    assert_eq!(
        input(&ctx.ledger.sent()[0]),
        IPaymasterFunder::executeUpdateMaxFundingAmountCall { actionId: action_id }.abi_encode()
    );
    Ok(())
}

#[tokio::test]
async fn test_funder_reads_paymaster() -> anyhow::Result<()> {
    let ctx = test_ctx()?;
    let funder = ctx.funder_gateway(ctx.gateway_config_without_retry()).await?;
    ctx.ledger.on_call::<IPaymasterFunder::paymasterCall>(funder.address(), PAYMASTER_ADDRESS);
    assert_eq!(funder.paymaster().await?, PAYMASTER_ADDRESS);
    Ok(())
}

#[tokio::test]
async fn test_paymaster_connects_through_proxy() -> anyhow::Result<()> {
    let ctx = test_ctx()?;
    let paymaster = ctx.paymaster_gateway(ctx.gateway_config_without_retry()).await?;
    assert_eq!(paymaster.address(), PAYMASTER_ADDRESS);

    // without the proxy's implementation the paymaster exposes nothing
    ctx.ledger.deploy(PAYMASTER_IMPLEMENTATION_ADDRESS, &[]);
    let err = ctx.paymaster_gateway(ctx.gateway_config_without_retry()).await.unwrap_err();
    let err = err.downcast::<GatewayError>()?;
    assert_eq!(err.kind(), ErrorKind::UnsupportedContract);
    Ok(())
}

#[tokio::test]
async fn test_paymaster_deposits() -> anyhow::Result<()> {
    let ctx = test_ctx()?;
    let paymaster = ctx.paymaster_gateway(ctx.gateway_config_without_retry()).await?;
    let token = ctx.deployment.stake_token_address;

    paymaster.deposit(&ctx.session, parse_ether("2")?).await?;
    paymaster.approve_deposit_token(&ctx.session, token, parse_ether("50")?).await?;
    paymaster.deposit_token(&ctx.session, token, parse_ether("50")?).await?;

    let sent = ctx.ledger.sent();
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[0].to, Some(PAYMASTER_ADDRESS.into()));
    assert_eq!(sent[0].value, Some(parse_ether("2")?));
    assert_eq!(input(&sent[0]), IAfroVibePaymaster::depositCall {}.abi_encode());

    assert_eq!(sent[1].to, Some(token.into()));
    assert_eq!(
        input(&sent[1]),
        IERC20::approveCall { spender: PAYMASTER_ADDRESS, amount: parse_ether("50")? }
            .abi_encode()
    );

    assert_eq!(sent[2].to, Some(PAYMASTER_ADDRESS.into()));
    assert_eq!(sent[2].value, None);
    assert_eq!(
        input(&sent[2]),
        IAfroVibePaymaster::depositTokenCall { token, amount: parse_ether("50")? }.abi_encode()
    );
    Ok(())
}

#[tokio::test]
async fn test_paymaster_allow_list_proposals() -> anyhow::Result<()> {
    let ctx = test_ctx()?;
    let paymaster = ctx.paymaster_gateway(ctx.gateway_config_without_retry()).await?;
    let session = &ctx.session;
    let target = Address::repeat_byte(0x21);
    let action_type = compute_action_type_hash("POST");
    let selector = compute_selector("post(bytes32,string)");

    paymaster.propose_target_update(session, target, ListChange::Add).await?;
    paymaster.propose_action_type_update(session, action_type, ListChange::Remove).await?;
    paymaster.propose_selector_update(session, selector, ListChange::Add).await?;
    paymaster.propose_token_update(session, target, ListChange::Remove).await?;
    paymaster.update_authorized_funder(session, ctx.account(), ListChange::Add).await?;
    paymaster.update_max_gas_cost(session, parse_ether("0.01")?).await?;
    paymaster.update_min_deposit_threshold(session, parse_ether("1")?).await?;

    let sent = ctx.ledger.sent();
    assert_eq!(sent.len(), 7);
    assert_eq!(
        input(&sent[0]),
        IAfroVibePaymaster::proposeTargetUpdateCall { target, isAdd: true }.abi_encode()
    );
    assert_eq!(
        input(&sent[1]),
        IAfroVibePaymaster::proposeActionTypeUpdateCall { actionType: action_type, isAdd: false }
            .abi_encode()
    );
    assert_eq!(
        input(&sent[2]),
        IAfroVibePaymaster::proposeSelectorUpdateCall { selector, isAdd: true }.abi_encode()
    );
    assert_eq!(
        input(&sent[3]),
        IAfroVibePaymaster::proposeTokenUpdateCall { token: target, isAdd: false }.abi_encode()
    );
    assert_eq!(
        input(&sent[4]),
        IAfroVibePaymaster::updateAuthorizedFunderCall { funder: ctx.account(), isAdd: true }
            .abi_encode()
    );
    assert_eq!(
        input(&sent[5]),
        IAfroVibePaymaster::updateMaxGasCostCall { newMaxGasCost: parse_ether("0.01")? }
            .abi_encode()
    );
    assert_eq!(
        input(&sent[6]),
        IAfroVibePaymaster::updateMinDepositThresholdCall { newThreshold: parse_ether("1")? }
            .abi_encode()
    );
    Ok(())
}

#[tokio::test]
async fn test_paymaster_validation_never_reaches_ledger() -> anyhow::Result<()> {
    let ctx = test_ctx()?;
    let paymaster = ctx.paymaster_gateway(ctx.gateway_config_without_retry()).await?;
    let session = &ctx.session;

    let err = paymaster.deposit(session, U256::ZERO).await.unwrap_err();
    assert!(matches!(err, GatewayError::Validation(ValidationError::InvalidAmount { .. })));

    let err = paymaster.deposit_token(session, Address::ZERO, U256::from(1)).await.unwrap_err();
    assert!(matches!(err, GatewayError::Validation(ValidationError::InvalidAddress { .. })));

    let err = paymaster
        .propose_target_update(session, Address::ZERO, ListChange::Add)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = paymaster.update_max_gas_cost(session, U256::ZERO).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = paymaster.is_authorized_funder(Address::ZERO).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert_eq!(ctx.ledger.estimate_requests(), 0);
    assert_eq!(ctx.ledger.call_requests(), 0);
    assert!(ctx.ledger.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_paymaster_reads() -> anyhow::Result<()> {
    let ctx = test_ctx()?;
    let paymaster = ctx.paymaster_gateway(ctx.gateway_config_without_retry()).await?;
    let selector = compute_selector("post(bytes32,string)");
    let (max_gas_cost, threshold) = (parse_ether("0.01")?, parse_ether("1")?);
    ctx.ledger.on_call::<IAfroVibePaymaster::maxGasCostCall>(PAYMASTER_ADDRESS, max_gas_cost);
    ctx.ledger.on_call::<IAfroVibePaymaster::minDepositThresholdCall>(PAYMASTER_ADDRESS, threshold);
    ctx.ledger.on_exact_call(
        PAYMASTER_ADDRESS,
        IAfroVibePaymaster::validSelectorsCall { selector },
        true,
    );
    ctx.ledger.on_exact_call(
        PAYMASTER_ADDRESS,
        IAfroVibePaymaster::authorizedFundersCall { funder: ctx.account() },
        false,
    );

    let limits = paymaster.sponsorship_limits().await?;
    assert_eq!(limits.max_gas_cost, max_gas_cost);
    assert_eq!(limits.min_deposit_threshold, threshold);
    assert!(paymaster.is_valid_selector(selector).await?);
    assert!(!paymaster.is_authorized_funder(ctx.account()).await?);
    let token = ctx.deployment.stake_token_address;
    assert_eq!(paymaster.token_decimals(token).await?, 18);
    Ok(())
}
