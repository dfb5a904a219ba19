// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{
    AccessRegistry, ActionKind, AggregationEngine, Batch, BatchManager, DecryptionAuthority,
    DecryptionContext, DecryptionHandler, RateLimiter, RevealedTally, TallyError,
};
use alloy_primitives::Address;
use confide_config::TallyConfig;
use confide_events::{
    BatchId, CooldownChanged, RequestId, SubmissionAccepted, TallyEvent,
};
use confide_fhe::HomomorphicBackend;
use std::sync::Arc;
use tracing::debug;

/// The whole tally as one sequential state machine.
///
/// Every operation validates completely before it mutates anything so a failed call leaves the
/// state exactly as it was. Successful operations queue events which the owner drains with
/// [`Tally::drain_events`].
pub struct Tally {
    access: AccessRegistry,
    limiter: RateLimiter,
    batches: BatchManager,
    engine: AggregationEngine,
    decryption: DecryptionHandler,
    events: Vec<TallyEvent>,
}

impl Tally {
    /// Set up the registry with the configured providers and open batch 1
    pub fn new(
        config: &TallyConfig,
        backend: Arc<dyn HomomorphicBackend>,
        authority: Box<dyn DecryptionAuthority>,
    ) -> Result<Self, TallyError> {
        let mut tally = Self {
            access: AccessRegistry::new(config.administrator)?,
            limiter: RateLimiter::new(config.cooldown_secs),
            batches: BatchManager::new(),
            engine: AggregationEngine::new(backend),
            decryption: DecryptionHandler::new(config.system_tag, authority),
            events: vec![],
        };

        for provider in &config.providers {
            if let Some(added) = tally
                .access
                .add_provider(&config.administrator, *provider)?
            {
                tally.emit(added);
            }
        }

        let zero = tally.engine.zero_totals()?;
        let opened = tally.batches.open_next(zero)?;
        tally.emit(opened);
        Ok(tally)
    }

    fn emit(&mut self, event: impl Into<TallyEvent>) {
        let event = event.into();
        debug!(evt = %event, "Queued event");
        self.events.push(event);
    }

    /// Take the events produced since the last drain, oldest first
    pub fn drain_events(&mut self) -> Vec<TallyEvent> {
        std::mem::take(&mut self.events)
    }

    ////////////////////////////////////////////////////////////////////////////
    // Administration
    ////////////////////////////////////////////////////////////////////////////

    pub fn transfer_administrator(
        &mut self,
        caller: Address,
        new_administrator: Address,
    ) -> Result<(), TallyError> {
        let changed = self
            .access
            .transfer_administrator(&caller, new_administrator)?;
        self.emit(changed);
        Ok(())
    }

    /// Returns whether membership changed
    pub fn add_provider(&mut self, caller: Address, provider: Address) -> Result<bool, TallyError> {
        let added = self.access.add_provider(&caller, provider)?;
        let changed = added.is_some();
        if let Some(added) = added {
            self.emit(added);
        }
        Ok(changed)
    }

    /// Returns whether membership changed
    pub fn remove_provider(
        &mut self,
        caller: Address,
        provider: Address,
    ) -> Result<bool, TallyError> {
        let removed = self.access.remove_provider(&caller, provider)?;
        let changed = removed.is_some();
        if let Some(removed) = removed {
            self.emit(removed);
        }
        Ok(changed)
    }

    pub fn pause(&mut self, caller: Address) -> Result<(), TallyError> {
        let paused = self.access.pause(&caller)?;
        self.emit(paused);
        Ok(())
    }

    pub fn unpause(&mut self, caller: Address) -> Result<(), TallyError> {
        let unpaused = self.access.unpause(&caller)?;
        self.emit(unpaused);
        Ok(())
    }

    pub fn set_cooldown(&mut self, caller: Address, cooldown_secs: u64) -> Result<(), TallyError> {
        self.access.ensure_active_administrator(&caller)?;
        let previous_secs = self.limiter.set_cooldown(cooldown_secs);
        self.emit(CooldownChanged {
            previous_secs,
            cooldown_secs,
        });
        Ok(())
    }

    ////////////////////////////////////////////////////////////////////////////
    // Batch lifecycle
    ////////////////////////////////////////////////////////////////////////////

    pub fn open_next_batch(&mut self, caller: Address) -> Result<BatchId, TallyError> {
        self.access.ensure_active_administrator(&caller)?;
        let zero = self.engine.zero_totals()?;
        let opened = self.batches.open_next(zero)?;
        let batch_id = opened.batch_id;
        self.emit(opened);
        Ok(batch_id)
    }

    pub fn close_batch(&mut self, caller: Address, batch_id: BatchId) -> Result<(), TallyError> {
        self.access.ensure_active_administrator(&caller)?;
        let closed = self.batches.close(batch_id)?;
        self.emit(closed);
        Ok(())
    }

    /// Fold an encrypted (score, weight) pair into the current batch. Returns the submission
    /// count of the batch afterwards.
    pub fn submit(
        &mut self,
        caller: Address,
        batch_id: BatchId,
        encrypted_score: &[u8],
        encrypted_weight: &[u8],
        now: u64,
    ) -> Result<u64, TallyError> {
        self.access.ensure_provider(&caller)?;
        self.access.ensure_not_paused()?;
        let batch = self.batches.accepting(batch_id)?;
        self.limiter.check(&caller, ActionKind::Submission, now)?;

        let totals = self
            .engine
            .combine_totals(&batch.totals, encrypted_score, encrypted_weight)?;

        let submissions = self.batches.apply_submission(batch_id, totals)?;
        self.limiter.record(caller, ActionKind::Submission, now);
        self.emit(SubmissionAccepted {
            batch_id,
            provider: caller,
            submissions,
            submitted_at: now,
        });
        Ok(submissions)
    }

    ////////////////////////////////////////////////////////////////////////////
    // Decryption
    ////////////////////////////////////////////////////////////////////////////

    pub fn request_decryption(
        &mut self,
        caller: Address,
        batch_id: BatchId,
        now: u64,
    ) -> Result<RequestId, TallyError> {
        self.access.ensure_active_administrator(&caller)?;
        let batch = self.batches.frozen(batch_id)?;
        self.limiter
            .check(&caller, ActionKind::DecryptionRequest, now)?;

        let requested = self.decryption.request(batch)?;
        self.limiter
            .record(caller, ActionKind::DecryptionRequest, now);

        let request_id = requested.request_id;
        self.emit(requested);
        Ok(request_id)
    }

    /// Accept the authority's answer. Not caller authenticated: the request id, the stored
    /// fingerprint and the proof carry all the trust.
    pub fn on_decryption_callback(
        &mut self,
        request_id: RequestId,
        cleartexts: &[u8],
        proof: &[u8],
    ) -> Result<RevealedTally, TallyError> {
        let completed =
            self.decryption
                .complete(&mut self.batches, request_id, cleartexts, proof)?;
        let revealed = RevealedTally {
            request_id,
            score: completed.score,
            weight: completed.weight,
        };
        self.emit(completed);
        Ok(revealed)
    }

    ////////////////////////////////////////////////////////////////////////////
    // Queries
    ////////////////////////////////////////////////////////////////////////////

    pub fn batch(&self, batch_id: BatchId) -> Option<&Batch> {
        self.batches.get(batch_id)
    }

    pub fn current_batch_id(&self) -> BatchId {
        self.batches.current_id()
    }

    pub fn open_batch_count(&self) -> usize {
        self.batches.open_count()
    }

    pub fn decryption_context(&self, request_id: RequestId) -> Option<&DecryptionContext> {
        self.decryption.context(request_id)
    }

    pub fn revealed(&self, batch_id: BatchId) -> Option<&RevealedTally> {
        self.batches.get(batch_id).and_then(|b| b.revealed.as_ref())
    }

    pub fn is_provider(&self, address: &Address) -> bool {
        self.access.is_provider(address)
    }

    pub fn administrator(&self) -> Address {
        self.access.administrator()
    }

    pub fn is_paused(&self) -> bool {
        self.access.is_paused()
    }

    pub fn cooldown(&self) -> u64 {
        self.limiter.cooldown()
    }

    pub fn system_tag(&self) -> Address {
        self.decryption.system_tag()
    }

    #[cfg(test)]
    pub(crate) fn overwrite_totals(&mut self, batch_id: BatchId, totals: crate::EncryptedTotals) {
        self.batches.overwrite_totals(batch_id, totals);
    }
}
