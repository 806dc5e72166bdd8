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

use alloy::primitives::Address;
use tokio_util::sync::CancellationToken;

/// An active wallet session.
///
/// Carries the signing account and a cancellation token that every transaction poll loop
/// started under this session is tied to. Ending the session (e.g. on wallet disconnect) stops
/// all of them.
#[derive(Clone, Debug)]
pub struct Session {
    account: Address,
    chain_id: u64,
    cancel: CancellationToken,
}

impl Session {
    pub fn new(account: Address, chain_id: u64) -> Self {
        Self { account, chain_id, cancel: CancellationToken::new() }
    }

    /// Account that signs transactions submitted in this session.
    pub fn account(&self) -> Address {
        self.account
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// End the session, abandoning all polling started under it.
    pub fn end(&self) {
        tracing::debug!(account = %self.account, "ending session");
        self.cancel.cancel();
    }

    /// Token cancelled when this session ends.
    pub fn child_token(&self) -> CancellationToken {
        self.cancel.child_token()
    }
}
