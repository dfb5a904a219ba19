// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use alloy_primitives::Address;
use confide_events::{BatchId, FailureKind, RequestId};
use thiserror::Error;

/// Broad classes of failure. Callers pick their retry strategy from the category, never from
/// individual variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The caller lacks the required role
    Authorization,
    /// The operation does not fit the current lifecycle state
    Lifecycle,
    /// Transient, retry once the cooldown has elapsed
    RateLimit,
    /// Security relevant decryption protocol failure
    ProtocolIntegrity,
    /// The homomorphic backend or decryption authority rejected the input
    Backend,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TallyError {
    #[error("caller {0} is not the administrator")]
    Unauthorized(Address),

    #[error("caller {0} is not an authorized provider")]
    NotAuthorizedSubmitter(Address),

    #[error("system is paused")]
    SystemPaused,

    #[error("system is not paused")]
    NotPaused,

    #[error("system is already paused")]
    AlreadyPaused,

    #[error("batch {0} is not a valid target for this operation")]
    InvalidBatch(BatchId),

    #[error("batch {0} is closed")]
    BatchClosed(BatchId),

    #[error("batch {0} is already closed")]
    AlreadyClosed(BatchId),

    #[error("batch {0} is still open")]
    BatchStillOpen(BatchId),

    #[error("batch {0} has already been revealed")]
    BatchAlreadyRevealed(BatchId),

    #[error("{0} cannot become administrator")]
    InvalidAdministrator(Address),

    #[error("cooldown active until {retry_at}")]
    CooldownActive { retry_at: u64 },

    #[error("unknown decryption request {0}")]
    UnknownRequest(RequestId),

    #[error("decryption request {0} has already been processed")]
    ReplayDetected(RequestId),

    #[error("aggregate of batch {batch_id} does not match the state bound to request {request_id}")]
    StateMismatch {
        request_id: RequestId,
        batch_id: BatchId,
    },

    #[error("invalid decryption proof for request {0}")]
    InvalidProof(RequestId),

    #[error("malformed cleartext for request {request_id}: expected {expected} bytes, got {actual}")]
    MalformedCleartext {
        request_id: RequestId,
        expected: usize,
        actual: usize,
    },

    #[error("invalid ciphertext: {0}")]
    InvalidCiphertext(String),

    #[error("decryption dispatch failed: {0}")]
    DispatchFailed(String),
}

impl TallyError {
    pub fn category(&self) -> ErrorCategory {
        use TallyError::*;
        match self {
            Unauthorized(_) | NotAuthorizedSubmitter(_) => ErrorCategory::Authorization,
            SystemPaused
            | NotPaused
            | AlreadyPaused
            | InvalidBatch(_)
            | BatchClosed(_)
            | AlreadyClosed(_)
            | BatchStillOpen(_)
            | BatchAlreadyRevealed(_)
            | InvalidAdministrator(_) => ErrorCategory::Lifecycle,
            CooldownActive { .. } => ErrorCategory::RateLimit,
            UnknownRequest(_)
            | ReplayDetected(_)
            | StateMismatch { .. }
            | InvalidProof(_)
            | MalformedCleartext { .. } => ErrorCategory::ProtocolIntegrity,
            InvalidCiphertext(_) | DispatchFailed(_) => ErrorCategory::Backend,
        }
    }

    /// Replays and state substitutions should be alerted on, not treated as benign errors
    pub fn is_attack_indicator(&self) -> bool {
        self.failure_kind()
            .is_some_and(|kind| kind.is_attack_indicator())
    }

    /// The monitoring kind for protocol integrity failures
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            TallyError::UnknownRequest(_) => Some(FailureKind::UnknownRequest),
            TallyError::ReplayDetected(_) => Some(FailureKind::ReplayDetected),
            TallyError::StateMismatch { .. } => Some(FailureKind::StateMismatch),
            TallyError::InvalidProof(_) => Some(FailureKind::InvalidProof),
            TallyError::MalformedCleartext { .. } => Some(FailureKind::MalformedCleartext),
            _ => None,
        }
    }
}
