// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::RequestId;
use actix::Message;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Protocol integrity failures surfaced for monitoring.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    UnknownRequest,
    ReplayDetected,
    StateMismatch,
    InvalidProof,
    MalformedCleartext,
}

impl FailureKind {
    /// Failures that should page someone rather than be treated as noise
    pub fn is_attack_indicator(&self) -> bool {
        matches!(self, FailureKind::ReplayDetected | FailureKind::StateMismatch)
    }
}

#[derive(Message, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[rtype(result = "()")]
pub struct TallyFailure {
    pub request_id: RequestId,
    pub kind: FailureKind,
    pub message: String,
}

impl TallyFailure {
    pub fn new(request_id: RequestId, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            request_id,
            kind,
            message: message.into(),
        }
    }
}

impl Display for TallyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "request_id: {}, kind: {:?}, message: {}",
            self.request_id, self.kind, self.message
        )
    }
}
