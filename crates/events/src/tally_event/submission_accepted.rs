// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::BatchId;
use actix::Message;
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// A provider's encrypted judgment was folded into the batch aggregate. The ciphertexts themselves
/// are deliberately not part of the event.
#[derive(Message, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[rtype(result = "()")]
pub struct SubmissionAccepted {
    pub batch_id: BatchId,
    pub provider: Address,
    /// Submission count of the batch including this one
    pub submissions: u64,
    pub submitted_at: u64,
}

impl Display for SubmissionAccepted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "batch_id: {}, provider: {}, submissions: {}",
            self.batch_id, self.provider, self.submissions
        )
    }
}
