// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::TallyError;
use alloy_primitives::Address;
use confide_events::{AdministratorChanged, Paused, ProviderAdded, ProviderRemoved, Unpaused};
use std::collections::BTreeSet;

/// Holds the administrator, the provider set and the pause flag. Every gated operation checks
/// the role first and the pause flag second.
#[derive(Clone, Debug)]
pub struct AccessRegistry {
    administrator: Address,
    providers: BTreeSet<Address>,
    paused: bool,
}

impl AccessRegistry {
    pub fn new(administrator: Address) -> Result<Self, TallyError> {
        if administrator.is_zero() {
            return Err(TallyError::InvalidAdministrator(administrator));
        }
        Ok(Self {
            administrator,
            providers: BTreeSet::new(),
            paused: false,
        })
    }

    pub fn administrator(&self) -> Address {
        self.administrator
    }

    pub fn is_provider(&self, address: &Address) -> bool {
        self.providers.contains(address)
    }

    pub fn providers(&self) -> impl Iterator<Item = &Address> {
        self.providers.iter()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn ensure_administrator(&self, caller: &Address) -> Result<(), TallyError> {
        if *caller != self.administrator {
            return Err(TallyError::Unauthorized(*caller));
        }
        Ok(())
    }

    pub fn ensure_provider(&self, caller: &Address) -> Result<(), TallyError> {
        if !self.is_provider(caller) {
            return Err(TallyError::NotAuthorizedSubmitter(*caller));
        }
        Ok(())
    }

    pub fn ensure_not_paused(&self) -> Result<(), TallyError> {
        if self.paused {
            return Err(TallyError::SystemPaused);
        }
        Ok(())
    }

    /// Administrator gate for operations that are blocked while paused
    pub fn ensure_active_administrator(&self, caller: &Address) -> Result<(), TallyError> {
        self.ensure_administrator(caller)?;
        self.ensure_not_paused()
    }

    pub fn transfer_administrator(
        &mut self,
        caller: &Address,
        new_administrator: Address,
    ) -> Result<AdministratorChanged, TallyError> {
        self.ensure_active_administrator(caller)?;
        if new_administrator.is_zero() {
            return Err(TallyError::InvalidAdministrator(new_administrator));
        }
        let previous = std::mem::replace(&mut self.administrator, new_administrator);
        Ok(AdministratorChanged {
            previous,
            current: new_administrator,
        })
    }

    /// Returns an event only when membership actually changed
    pub fn add_provider(
        &mut self,
        caller: &Address,
        provider: Address,
    ) -> Result<Option<ProviderAdded>, TallyError> {
        self.ensure_active_administrator(caller)?;
        Ok(self
            .providers
            .insert(provider)
            .then_some(ProviderAdded { provider }))
    }

    /// Returns an event only when membership actually changed
    pub fn remove_provider(
        &mut self,
        caller: &Address,
        provider: Address,
    ) -> Result<Option<ProviderRemoved>, TallyError> {
        self.ensure_active_administrator(caller)?;
        Ok(self
            .providers
            .remove(&provider)
            .then_some(ProviderRemoved { provider }))
    }

    pub fn pause(&mut self, caller: &Address) -> Result<Paused, TallyError> {
        self.ensure_administrator(caller)?;
        if self.paused {
            return Err(TallyError::AlreadyPaused);
        }
        self.paused = true;
        Ok(Paused { by: *caller })
    }

    pub fn unpause(&mut self, caller: &Address) -> Result<Unpaused, TallyError> {
        self.ensure_administrator(caller)?;
        if !self.paused {
            return Err(TallyError::NotPaused);
        }
        self.paused = false;
        Ok(Unpaused { by: *caller })
    }
}
