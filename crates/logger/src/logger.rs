// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use actix::{Actor, Addr, Context, Handler};
use confide_events::{Event, EventBus, Subscribe, TallyEvent};
use std::marker::PhantomData;
use tracing::{error, info, warn};

pub trait EventLogging: Event {
    fn log(&self, logger_name: &str);
}

/// Logs every event published on the bus
pub struct SimpleLogger<E: EventLogging> {
    name: String,
    _p: PhantomData<E>,
}

impl<E: EventLogging> SimpleLogger<E> {
    pub fn attach(name: &str, bus: Addr<EventBus<E>>) -> Addr<Self> {
        let addr = Self {
            name: name.to_owned(),
            _p: PhantomData,
        }
        .start();
        bus.do_send(Subscribe::<E>::new("*", addr.clone().recipient()));
        info!(logger = %name, "READY!");
        addr
    }
}

impl<E: EventLogging> Actor for SimpleLogger<E> {
    type Context = Context<Self>;
}

impl<E: EventLogging> Handler<E> for SimpleLogger<E> {
    type Result = ();

    fn handle(&mut self, msg: E, _: &mut Self::Context) -> Self::Result {
        msg.log(&self.name);
    }
}

impl EventLogging for TallyEvent {
    fn log(&self, logger_name: &str) {
        match self {
            TallyEvent::TallyFailure { data, .. } if data.kind.is_attack_indicator() => {
                error!(me = logger_name, evt = %self, "ATTACK INDICATOR!")
            }
            TallyEvent::TallyFailure { .. } => warn!(me = logger_name, evt = %self, "FAILURE"),
            _ => match self.get_batch_id() {
                Some(batch_id) => {
                    info!(me = logger_name, evt = %self, batch_id, "Event Broadcasted")
                }
                None => info!(me = logger_name, evt = %self, "Event Broadcasted"),
            },
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;
    use confide_events::{BatchOpened, FailureKind, GetEvents, ProviderAdded, TallyFailure};

    #[actix::test]
    async fn logger_receives_everything() -> anyhow::Result<()> {
        let bus = EventBus::<TallyEvent>::default().start();
        let logger = SimpleLogger::<TallyEvent>::attach("test", bus.clone());
        let history = EventBus::history(&bus);

        bus.send(TallyEvent::from(ProviderAdded {
            provider: Address::repeat_byte(1),
        }))
        .await?;
        bus.send(TallyEvent::from(BatchOpened { batch_id: 1 })).await?;
        bus.send(TallyEvent::from(TallyFailure::new(
            1,
            FailureKind::StateMismatch,
            "fingerprint differs",
        )))
        .await?;

        assert!(logger.connected());
        assert_eq!(history.send(GetEvents::new()).await?.len(), 3);
        Ok(())
    }
}
