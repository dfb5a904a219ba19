// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod administrator_changed;
mod batch_closed;
mod batch_opened;
mod cooldown_changed;
mod decryption_completed;
mod decryption_requested;
mod pause_changed;
mod provider_changed;
mod submission_accepted;
mod tally_failure;

pub use administrator_changed::*;
pub use batch_closed::*;
pub use batch_opened::*;
pub use cooldown_changed::*;
pub use decryption_completed::*;
pub use decryption_requested::*;
pub use pause_changed::*;
pub use provider_changed::*;
pub use submission_accepted::*;
pub use tally_failure::*;

use crate::{BatchId, ErrorEvent, Event, EventId, RequestId};
use actix::Message;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to help define From traits for TallyEvent
macro_rules! impl_from_event {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for TallyEvent {
                fn from(data: $variant) -> Self {
                    TallyEvent::$variant {
                        id: EventId::hash(&data),
                        data,
                    }
                }
            }
        )*
    };
}

#[derive(Message, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[rtype(result = "()")]
pub enum TallyEvent {
    AdministratorChanged {
        id: EventId,
        data: AdministratorChanged,
    },
    ProviderAdded {
        id: EventId,
        data: ProviderAdded,
    },
    ProviderRemoved {
        id: EventId,
        data: ProviderRemoved,
    },
    Paused {
        id: EventId,
        data: Paused,
    },
    Unpaused {
        id: EventId,
        data: Unpaused,
    },
    CooldownChanged {
        id: EventId,
        data: CooldownChanged,
    },
    BatchOpened {
        id: EventId,
        data: BatchOpened,
    },
    BatchClosed {
        id: EventId,
        data: BatchClosed,
    },
    SubmissionAccepted {
        id: EventId,
        data: SubmissionAccepted,
    },
    DecryptionRequested {
        id: EventId,
        data: DecryptionRequested,
    },
    DecryptionCompleted {
        id: EventId,
        data: DecryptionCompleted,
    },
    TallyFailure {
        id: EventId,
        data: TallyFailure,
    },
}

impl TallyEvent {
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }

    pub fn get_id(&self) -> EventId {
        match self {
            TallyEvent::AdministratorChanged { id, .. } => id,
            TallyEvent::ProviderAdded { id, .. } => id,
            TallyEvent::ProviderRemoved { id, .. } => id,
            TallyEvent::Paused { id, .. } => id,
            TallyEvent::Unpaused { id, .. } => id,
            TallyEvent::CooldownChanged { id, .. } => id,
            TallyEvent::BatchOpened { id, .. } => id,
            TallyEvent::BatchClosed { id, .. } => id,
            TallyEvent::SubmissionAccepted { id, .. } => id,
            TallyEvent::DecryptionRequested { id, .. } => id,
            TallyEvent::DecryptionCompleted { id, .. } => id,
            TallyEvent::TallyFailure { id, .. } => id,
        }
        .clone()
    }

    /// The batch an event relates to, when there is one
    pub fn get_batch_id(&self) -> Option<BatchId> {
        match self {
            TallyEvent::BatchOpened { data, .. } => Some(data.batch_id),
            TallyEvent::BatchClosed { data, .. } => Some(data.batch_id),
            TallyEvent::SubmissionAccepted { data, .. } => Some(data.batch_id),
            TallyEvent::DecryptionRequested { data, .. } => Some(data.batch_id),
            TallyEvent::DecryptionCompleted { data, .. } => Some(data.batch_id),
            _ => None,
        }
    }

    /// The decryption request an event relates to, when there is one
    pub fn get_request_id(&self) -> Option<RequestId> {
        match self {
            TallyEvent::DecryptionRequested { data, .. } => Some(data.request_id),
            TallyEvent::DecryptionCompleted { data, .. } => Some(data.request_id),
            TallyEvent::TallyFailure { data, .. } => Some(data.request_id),
            _ => None,
        }
    }

    pub fn get_data(&self) -> String {
        match self {
            TallyEvent::AdministratorChanged { data, .. } => format!("{}", data),
            TallyEvent::ProviderAdded { data, .. } => format!("{}", data),
            TallyEvent::ProviderRemoved { data, .. } => format!("{}", data),
            TallyEvent::Paused { data, .. } => format!("{}", data),
            TallyEvent::Unpaused { data, .. } => format!("{}", data),
            TallyEvent::CooldownChanged { data, .. } => format!("{}", data),
            TallyEvent::BatchOpened { data, .. } => format!("{}", data),
            TallyEvent::BatchClosed { data, .. } => format!("{}", data),
            TallyEvent::SubmissionAccepted { data, .. } => format!("{}", data),
            TallyEvent::DecryptionRequested { data, .. } => format!("{}", data),
            TallyEvent::DecryptionCompleted { data, .. } => format!("{}", data),
            TallyEvent::TallyFailure { data, .. } => format!("{}", data),
        }
    }
}

impl Event for TallyEvent {
    type Id = EventId;

    fn event_type(&self) -> String {
        let s = format!("{:?}", self);
        extract_tally_event_name(&s).to_string()
    }

    fn event_id(&self) -> Self::Id {
        self.get_id()
    }
}

impl ErrorEvent for TallyEvent {
    type Error = TallyFailure;

    fn as_error(&self) -> Option<&Self::Error> {
        match self {
            TallyEvent::TallyFailure { data, .. } => Some(data),
            _ => None,
        }
    }
}

impl_from_event!(
    AdministratorChanged,
    ProviderAdded,
    ProviderRemoved,
    Paused,
    Unpaused,
    CooldownChanged,
    BatchOpened,
    BatchClosed,
    SubmissionAccepted,
    DecryptionRequested,
    DecryptionCompleted,
    TallyFailure
);

impl fmt::Display for TallyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format!("{}({})", self.event_type(), self.get_data()))
    }
}

fn extract_tally_event_name(s: &str) -> &str {
    let bytes = s.as_bytes();
    for (i, &item) in bytes.iter().enumerate() {
        if item == b' ' || item == b'(' {
            return &s[..i];
        }
    }
    s
}
