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

//! Solidity interfaces of the AfroVibe contracts consumed by this crate.

use alloy::{primitives::Address, sol_types::SolEvent};

use crate::ledger::LedgerReceipt;

alloy::sol! {
    #![sol(all_derives)]

    interface IStaking {
        event Staked(address indexed user, uint256 amount, uint256 lockPeriod);
        event Unstaked(address indexed user, uint256 index, uint256 amount);
        event RewardsClaimed(address indexed user, uint256 amount);
        event SonicPointsRedeemed(address indexed user, uint256 points);
        event Bridged(address indexed user, uint256 amount, address recipient, bool toEthereum);
        event TokensBridged(address indexed user, uint256 amount);
        event ValidatorDelegated(address indexed user, address indexed validator, uint256 amount);
        event ProposalCreated(uint256 indexed proposalId, bytes32 descriptionHash, bytes32 merkleRoot, uint256 snapshotTimestamp);

        function stake(uint256 amount, uint256 lockPeriod) external;
        function unstake(uint256 index, uint256 pointsToUse) external;
        function claimRewards() external;
        function bridgeTokens(address token, uint256 amount, address recipient, bool toEthereum) external;
        function delegateToValidator(address validator, uint256 amount) external;
        function createProposal(bytes32 descriptionHash, bytes32 merkleRoot, uint256 snapshotTimestamp) external;
        function verifyProposalVoter(uint256 proposalId, bytes32[] calldata proof) external;
        function proposeUpgrade(address newImplementation, bytes32 descriptionHash) external;
        function confirmUpgrade(uint256 proposalId) external;

        function sonicPoints(address user) external view returns (uint256);
        function stakeCount(address user) external view returns (uint256);
        function stakes(address user, uint256 index) external view returns (uint256 amount, uint256 lockPeriod, uint256 startTime, uint256 endTime, uint256 accumulatedRewards);
        function getTotalStaked(address user) external view returns (uint256);
        function calculateAfrovibeRewards(address user, uint256 stakeIndex) external view returns (uint256);
        function paused() external view returns (bool);
    }

    interface IPaymasterFunder {
        event Funded(address indexed paymaster, address indexed funder, uint256 amount);
        event TimelockInitiated(bytes32 indexed actionId, string action, uint256 amount, uint256 timestamp);
        event TimelockExecuted(bytes32 indexed actionId, string action, uint256 amount);

        function fund(uint256 amount) external;
        function initiateUpdateMaxFundingAmount(uint256 newAmount) external;
        function executeUpdateMaxFundingAmount(bytes32 actionId) external;
        function initiateEmergencyWithdraw(address to, uint256 amount) external;
        function executeEmergencyWithdraw(bytes32 actionId, address to) external;
        function grantFunderRole(address account) external;
        function revokeFunderRole(address account) external;
        function pause() external;
        function unpause() external;

        function FUNDER_ROLE() external view returns (bytes32);
        function PAUSER_ROLE() external view returns (bytes32);
        function DEFAULT_ADMIN_ROLE() external view returns (bytes32);
        function hasRole(bytes32 role, address account) external view returns (bool);
        function minFundingAmount() external view returns (uint256);
        function maxFundingAmount() external view returns (uint256);
        function maxContractBalance() external view returns (uint256);
        function getPaymasterBalance() external view returns (uint256);
        function getFundingHistoryLength() external view returns (uint256);
        function fundingHistory(uint256 index) external view returns (address funder, uint256 amount, uint256 timestamp);
        function timelockActions(bytes32 actionId) external view returns (string action, uint256 amount, uint256 timestamp, bool executed);
        function paused() external view returns (bool);
        function paymaster() external view returns (address);
        function sonicSToken() external view returns (address);
    }

    interface IAfroVibePaymaster {
        event GasSponsored(address indexed user, uint256 nonce, uint256 gasUsed, address target, bytes32 actionType);
        event DepositFunded(address indexed funder, uint256 amount);
        event TokenDepositFunded(address indexed funder, address indexed token, uint256 amount);
        event TargetUpdated(address indexed target, bool isAdd);

        function deposit() external payable;
        function depositToken(address token, uint256 amount) external;
        function proposeTargetUpdate(address target, bool isAdd) external;
        function proposeActionTypeUpdate(bytes32 actionType, bool isAdd) external;
        function proposeSelectorUpdate(bytes4 selector, bool isAdd) external;
        function proposeTokenUpdate(address token, bool isAdd) external;
        function updateAuthorizedFunder(address funder, bool isAdd) external;
        function updateMaxGasCost(uint256 newMaxGasCost) external;
        function updateMinDepositThreshold(uint256 newThreshold) external;

        function maxGasCost() external view returns (uint256);
        function minDepositThreshold() external view returns (uint256);
        function validTargets(address target) external view returns (bool);
        function validActionTypes(bytes32 actionType) external view returns (bool);
        function validSelectors(bytes4 selector) external view returns (bool);
        function validTokens(address token) external view returns (bool);
        function authorizedFunders(address funder) external view returns (bool);
    }

    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

/// Decode the first log on the receipt emitted by `emitter` matching the event `E`.
///
/// Logs with a matching topic that fail to decode are skipped, as are events of the same
/// signature emitted by other contracts. Returns `None` when `emitter` did not emit the event.
pub fn find_tx_log<E: SolEvent>(receipt: &LedgerReceipt, emitter: Address) -> Option<E> {
    receipt
        .logs
        .iter()
        .filter(|log| log.address == emitter)
        .filter(|log| log.data.topics().first().map(|t| *t == E::SIGNATURE_HASH).unwrap_or(false))
        .find_map(|log| match E::decode_log_data(&log.data) {
            Ok(event) => Some(event),
            Err(err) => {
                tracing::debug!(
                    "skipping log on receipt 0x{:x}; failed to decode {}: {err}",
                    receipt.transaction_hash,
                    E::SIGNATURE
                );
                None
            }
        })
}
