// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{
    Batch, DecryptionAuthority, DecryptionContext, ErrorCategory, RevealedTally, Tally,
    TallyError,
};
use actix::prelude::*;
use alloy_primitives::Address;
use confide_config::TallyConfig;
use confide_events::{BatchId, EventBus, RequestId, TallyEvent, TallyFailure};
use confide_fhe::HomomorphicBackend;
use confide_utils::ArcBytes;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Owns the [`Tally`] and serializes every operation on it through the actor mailbox. Events
/// produced by the tally are published on the bus after each message.
pub struct TallyCoordinator {
    tally: Tally,
    bus: Addr<EventBus<TallyEvent>>,
}

impl Actor for TallyCoordinator {
    type Context = Context<Self>;
}

impl TallyCoordinator {
    pub fn new(tally: Tally, bus: Addr<EventBus<TallyEvent>>) -> Self {
        Self { tally, bus }
    }

    /// Build the tally from config, publish its setup events and start the actor
    #[instrument(name = "tally_attach", skip_all)]
    pub fn attach(
        config: &TallyConfig,
        backend: Arc<dyn HomomorphicBackend>,
        authority: Box<dyn DecryptionAuthority>,
        bus: &Addr<EventBus<TallyEvent>>,
    ) -> Result<Addr<Self>, TallyError> {
        let tally = Tally::new(config, backend, authority)?;
        let mut coordinator = TallyCoordinator::new(tally, bus.clone());
        coordinator.publish();
        info!(
            administrator = %config.administrator,
            providers = config.providers.len(),
            cooldown_secs = config.cooldown_secs,
            "Tally coordinator started"
        );
        Ok(coordinator.start())
    }

    fn publish(&mut self) {
        for event in self.tally.drain_events() {
            self.bus.do_send(event);
        }
    }

    /// Publish whatever the operation produced and log a rejection
    fn settle<T>(&mut self, op: &str, result: Result<T, TallyError>) -> Result<T, TallyError> {
        self.publish();
        if let Err(err) = &result {
            match err.category() {
                ErrorCategory::RateLimit => info!(op, "Rejected: {err}"),
                ErrorCategory::ProtocolIntegrity if err.is_attack_indicator() => {
                    error!(op, "Possible attack: {err}")
                }
                _ => warn!(op, "Rejected: {err}"),
            }
        }
        result
    }
}

//////////////////////////////////////////////////////////////////////////////
// Administration
//////////////////////////////////////////////////////////////////////////////

#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<(), TallyError>")]
pub struct TransferAdministrator {
    pub caller: Address,
    pub new_administrator: Address,
}

#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<bool, TallyError>")]
pub struct AddProvider {
    pub caller: Address,
    pub provider: Address,
}

#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<bool, TallyError>")]
pub struct RemoveProvider {
    pub caller: Address,
    pub provider: Address,
}

#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<(), TallyError>")]
pub struct Pause {
    pub caller: Address,
}

#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<(), TallyError>")]
pub struct Unpause {
    pub caller: Address,
}

#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<(), TallyError>")]
pub struct SetCooldown {
    pub caller: Address,
    pub cooldown_secs: u64,
}

impl Handler<TransferAdministrator> for TallyCoordinator {
    type Result = Result<(), TallyError>;

    fn handle(&mut self, msg: TransferAdministrator, _: &mut Self::Context) -> Self::Result {
        let result = self
            .tally
            .transfer_administrator(msg.caller, msg.new_administrator);
        self.settle("transfer_administrator", result)
    }
}

impl Handler<AddProvider> for TallyCoordinator {
    type Result = Result<bool, TallyError>;

    fn handle(&mut self, msg: AddProvider, _: &mut Self::Context) -> Self::Result {
        let result = self.tally.add_provider(msg.caller, msg.provider);
        self.settle("add_provider", result)
    }
}

impl Handler<RemoveProvider> for TallyCoordinator {
    type Result = Result<bool, TallyError>;

    fn handle(&mut self, msg: RemoveProvider, _: &mut Self::Context) -> Self::Result {
        let result = self.tally.remove_provider(msg.caller, msg.provider);
        self.settle("remove_provider", result)
    }
}

impl Handler<Pause> for TallyCoordinator {
    type Result = Result<(), TallyError>;

    fn handle(&mut self, msg: Pause, _: &mut Self::Context) -> Self::Result {
        let result = self.tally.pause(msg.caller);
        self.settle("pause", result)
    }
}

impl Handler<Unpause> for TallyCoordinator {
    type Result = Result<(), TallyError>;

    fn handle(&mut self, msg: Unpause, _: &mut Self::Context) -> Self::Result {
        let result = self.tally.unpause(msg.caller);
        self.settle("unpause", result)
    }
}

impl Handler<SetCooldown> for TallyCoordinator {
    type Result = Result<(), TallyError>;

    fn handle(&mut self, msg: SetCooldown, _: &mut Self::Context) -> Self::Result {
        let result = self.tally.set_cooldown(msg.caller, msg.cooldown_secs);
        self.settle("set_cooldown", result)
    }
}

//////////////////////////////////////////////////////////////////////////////
// Batches and submissions
//////////////////////////////////////////////////////////////////////////////

#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<BatchId, TallyError>")]
pub struct OpenNextBatch {
    pub caller: Address,
}

#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<(), TallyError>")]
pub struct CloseBatch {
    pub caller: Address,
    pub batch_id: BatchId,
}

/// An encrypted (score, weight) contribution. `now` is the submission time in seconds.
#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<u64, TallyError>")]
pub struct Submit {
    pub caller: Address,
    pub batch_id: BatchId,
    pub encrypted_score: ArcBytes,
    pub encrypted_weight: ArcBytes,
    pub now: u64,
}

impl Handler<OpenNextBatch> for TallyCoordinator {
    type Result = Result<BatchId, TallyError>;

    #[instrument(name = "tally", skip_all)]
    fn handle(&mut self, msg: OpenNextBatch, _: &mut Self::Context) -> Self::Result {
        let result = self.tally.open_next_batch(msg.caller);
        if let Ok(batch_id) = &result {
            info!(batch_id, "Batch opened");
        }
        self.settle("open_next_batch", result)
    }
}

impl Handler<CloseBatch> for TallyCoordinator {
    type Result = Result<(), TallyError>;

    #[instrument(name = "tally", skip_all, fields(batch_id = msg.batch_id))]
    fn handle(&mut self, msg: CloseBatch, _: &mut Self::Context) -> Self::Result {
        let result = self.tally.close_batch(msg.caller, msg.batch_id);
        if result.is_ok() {
            info!("Batch closed");
        }
        self.settle("close_batch", result)
    }
}

impl Handler<Submit> for TallyCoordinator {
    type Result = Result<u64, TallyError>;

    #[instrument(name = "tally", skip_all, fields(batch_id = msg.batch_id, provider = %msg.caller))]
    fn handle(&mut self, msg: Submit, _: &mut Self::Context) -> Self::Result {
        let result = self.tally.submit(
            msg.caller,
            msg.batch_id,
            &msg.encrypted_score,
            &msg.encrypted_weight,
            msg.now,
        );
        self.settle("submit", result)
    }
}

//////////////////////////////////////////////////////////////////////////////
// Decryption
//////////////////////////////////////////////////////////////////////////////

#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<RequestId, TallyError>")]
pub struct RequestDecryption {
    pub caller: Address,
    pub batch_id: BatchId,
    pub now: u64,
}

/// The decryption authority's answer. Anyone may deliver it.
#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<RevealedTally, TallyError>")]
pub struct DecryptionCallback {
    pub request_id: RequestId,
    pub cleartexts: ArcBytes,
    pub proof: ArcBytes,
}

impl Handler<RequestDecryption> for TallyCoordinator {
    type Result = Result<RequestId, TallyError>;

    #[instrument(name = "tally", skip_all, fields(batch_id = msg.batch_id))]
    fn handle(&mut self, msg: RequestDecryption, _: &mut Self::Context) -> Self::Result {
        let result = self
            .tally
            .request_decryption(msg.caller, msg.batch_id, msg.now);
        if let Ok(request_id) = &result {
            info!(request_id, "Decryption requested");
        }
        self.settle("request_decryption", result)
    }
}

impl Handler<DecryptionCallback> for TallyCoordinator {
    type Result = Result<RevealedTally, TallyError>;

    #[instrument(name = "tally", skip_all, fields(request_id = msg.request_id))]
    fn handle(&mut self, msg: DecryptionCallback, _: &mut Self::Context) -> Self::Result {
        let result =
            self.tally
                .on_decryption_callback(msg.request_id, &msg.cleartexts, &msg.proof);

        match &result {
            Ok(revealed) => info!(score = %revealed.score, weight = %revealed.weight, "Tally revealed"),
            Err(err) => {
                if let Some(kind) = err.failure_kind() {
                    self.bus.do_send(TallyEvent::from(TallyFailure::new(
                        msg.request_id,
                        kind,
                        err.to_string(),
                    )));
                }
            }
        }
        self.settle("decryption_callback", result)
    }
}

//////////////////////////////////////////////////////////////////////////////
// Queries
//////////////////////////////////////////////////////////////////////////////

#[derive(Message, Clone, Debug)]
#[rtype(result = "Option<Batch>")]
pub struct GetBatch(pub BatchId);

#[derive(Message, Clone, Debug)]
#[rtype(result = "BatchId")]
pub struct GetCurrentBatchId;

#[derive(Message, Clone, Debug)]
#[rtype(result = "Option<DecryptionContext>")]
pub struct GetDecryptionContext(pub RequestId);

#[derive(Message, Clone, Debug)]
#[rtype(result = "Option<RevealedTally>")]
pub struct GetRevealedTally(pub BatchId);

#[derive(Message, Clone, Debug)]
#[rtype(result = "bool")]
pub struct IsProvider(pub Address);

#[derive(Message, Clone, Debug)]
#[rtype(result = "Address")]
pub struct GetAdministrator;

#[derive(Message, Clone, Debug)]
#[rtype(result = "bool")]
pub struct IsPaused;

#[derive(Message, Clone, Debug)]
#[rtype(result = "u64")]
pub struct GetCooldown;

impl Handler<GetBatch> for TallyCoordinator {
    type Result = Option<Batch>;

    fn handle(&mut self, msg: GetBatch, _: &mut Self::Context) -> Self::Result {
        self.tally.batch(msg.0).cloned()
    }
}

impl Handler<GetCurrentBatchId> for TallyCoordinator {
    type Result = BatchId;

    fn handle(&mut self, _: GetCurrentBatchId, _: &mut Self::Context) -> Self::Result {
        self.tally.current_batch_id()
    }
}

impl Handler<GetDecryptionContext> for TallyCoordinator {
    type Result = Option<DecryptionContext>;

    fn handle(&mut self, msg: GetDecryptionContext, _: &mut Self::Context) -> Self::Result {
        self.tally.decryption_context(msg.0).cloned()
    }
}

impl Handler<GetRevealedTally> for TallyCoordinator {
    type Result = Option<RevealedTally>;

    fn handle(&mut self, msg: GetRevealedTally, _: &mut Self::Context) -> Self::Result {
        self.tally.revealed(msg.0).cloned()
    }
}

impl Handler<IsProvider> for TallyCoordinator {
    type Result = bool;

    fn handle(&mut self, msg: IsProvider, _: &mut Self::Context) -> Self::Result {
        self.tally.is_provider(&msg.0)
    }
}

impl Handler<GetAdministrator> for TallyCoordinator {
    type Result = MessageResult<GetAdministrator>;

    fn handle(&mut self, _: GetAdministrator, _: &mut Self::Context) -> Self::Result {
        MessageResult(self.tally.administrator())
    }
}

impl Handler<IsPaused> for TallyCoordinator {
    type Result = bool;

    fn handle(&mut self, _: IsPaused, _: &mut Self::Context) -> Self::Result {
        self.tally.is_paused()
    }
}

impl Handler<GetCooldown> for TallyCoordinator {
    type Result = u64;

    fn handle(&mut self, _: GetCooldown, _: &mut Self::Context) -> Self::Result {
        self.tally.cooldown()
    }
}
