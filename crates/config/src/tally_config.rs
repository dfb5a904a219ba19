// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// Construction parameters of the tally state machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyConfig {
    /// Identity of this deployment, mixed into every decryption fingerprint
    pub system_tag: Address,
    pub administrator: Address,
    /// Providers authorized from the start
    pub providers: Vec<Address>,
    /// Minimum seconds between two actions of the same kind by the same identity
    pub cooldown_secs: u64,
}

impl TallyConfig {
    pub fn new(system_tag: Address, administrator: Address) -> Self {
        Self {
            system_tag,
            administrator,
            providers: vec![],
            cooldown_secs: 0,
        }
    }

    pub fn with_providers(mut self, providers: impl IntoIterator<Item = Address>) -> Self {
        self.providers = providers.into_iter().collect();
        self
    }

    pub fn with_cooldown(mut self, cooldown_secs: u64) -> Self {
        self.cooldown_secs = cooldown_secs;
        self
    }
}
