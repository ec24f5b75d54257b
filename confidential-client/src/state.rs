//! Balance State Cache
//!
//! Holds the last-synchronized confidential balance for one account. The
//! snapshot is only ever replaced wholesale with freshly read chain state;
//! readers see either the previous snapshot or the new one, never a mix.

use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Balance fields as read from the contract, in confidential units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    /// Spendable balance
    pub balance: u128,
    /// Received but not yet rolled over
    pub pending: u128,
    /// Replay-protection counter maintained by the contract
    pub nonce: u64,
}

/// Everything `refresh()` reads in one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    pub snapshot: BalanceSnapshot,
    /// Token base units per confidential unit
    pub rate: u128,
    /// Bit width of range proofs enforced by the contract
    pub bit_size: u32,
}

impl AccountState {
    pub fn current_balance(&self) -> u128 {
        self.snapshot.balance
    }

    pub fn pending_balance(&self) -> u128 {
        self.snapshot.pending
    }
}

/// Single-owner cache of the last good [`AccountState`]
#[derive(Debug, Default)]
pub struct BalanceCache {
    state: RwLock<Option<AccountState>>,
}

impl BalanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last synchronized state, if any refresh has succeeded
    pub fn get(&self) -> Option<AccountState> {
        // A poisoned lock still holds a whole snapshot since writes are a
        // single assignment
        match self.state.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Swap in a new snapshot
    pub fn replace(&self, next: AccountState) {
        match self.state.write() {
            Ok(mut guard) => *guard = Some(next),
            Err(poisoned) => *poisoned.into_inner() = Some(next),
        }
    }

    pub fn is_synced(&self) -> bool {
        self.get().is_some()
    }
}
