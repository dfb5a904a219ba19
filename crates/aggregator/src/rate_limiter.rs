// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::TallyError;
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt};

/// Actions throttled independently of each other
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Submission,
    DecryptionRequest,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Submission => f.write_str("submission"),
            ActionKind::DecryptionRequest => f.write_str("decryption_request"),
        }
    }
}

/// Minimum interval between two actions of the same kind by the same identity. Timestamps are
/// seconds supplied by the caller.
#[derive(Clone, Debug, Default)]
pub struct RateLimiter {
    cooldown_secs: u64,
    last_action: HashMap<(Address, ActionKind), u64>,
}

impl RateLimiter {
    pub fn new(cooldown_secs: u64) -> Self {
        Self {
            cooldown_secs,
            last_action: HashMap::new(),
        }
    }

    pub fn cooldown(&self) -> u64 {
        self.cooldown_secs
    }

    /// Replace the cooldown and return the previous value. Applies to every later check.
    pub fn set_cooldown(&mut self, cooldown_secs: u64) -> u64 {
        std::mem::replace(&mut self.cooldown_secs, cooldown_secs)
    }

    pub fn last_action(&self, identity: &Address, kind: ActionKind) -> Option<u64> {
        self.last_action.get(&(*identity, kind)).copied()
    }

    /// Fails when the identity acted too recently. Does not record anything.
    pub fn check(&self, identity: &Address, kind: ActionKind, now: u64) -> Result<(), TallyError> {
        let Some(last) = self.last_action(identity, kind) else {
            return Ok(());
        };
        let retry_at = last.saturating_add(self.cooldown_secs);
        if now < retry_at {
            return Err(TallyError::CooldownActive { retry_at });
        }
        Ok(())
    }

    pub fn record(&mut self, identity: Address, kind: ActionKind, now: u64) {
        self.last_action.insert((identity, kind), now);
    }

    pub fn check_and_record(
        &mut self,
        identity: Address,
        kind: ActionKind,
        now: u64,
    ) -> Result<(), TallyError> {
        self.check(&identity, kind, now)?;
        self.record(identity, kind, now);
        Ok(())
    }
}
