// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::traits::{ErrorEvent, Event};
use actix::prelude::*;
use bloom::{BloomFilter, ASMS};
use std::collections::{HashMap, VecDeque};
use std::marker::PhantomData;
use tracing::{debug, info};

//////////////////////////////////////////////////////////////////////////////
// Configuration
//////////////////////////////////////////////////////////////////////////////

/// Configuration for EventBus behavior
pub struct EventBusConfig {
    /// Drop events whose id has been seen before. Tally events are content addressed so two
    /// legitimately identical events (eg. re-adding the same provider) would collide, hence this
    /// is off by default.
    pub deduplicate: bool,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self { deduplicate: false }
    }
}

fn default_bloomfilter() -> BloomFilter {
    let num_items = 1_000_000;
    let fp_rate = 0.001;
    BloomFilter::with_rate(fp_rate, num_items)
}

//////////////////////////////////////////////////////////////////////////////
// EventBus Implementation
//////////////////////////////////////////////////////////////////////////////

/// Fan-out bus for events produced by the tally coordinator. Events are only ever consumed by
/// external observers (loggers, monitors, tests); the coordinator never reads them back.
pub struct EventBus<E: Event> {
    config: EventBusConfig,
    ids: BloomFilter,
    listeners: HashMap<String, Vec<Recipient<E>>>,
}

impl<E: Event> Actor for EventBus<E> {
    type Context = Context<Self>;
}

impl<E: Event> EventBus<E> {
    pub fn new(config: EventBusConfig) -> Self {
        EventBus {
            config,
            listeners: HashMap::new(),
            ids: default_bloomfilter(),
        }
    }

    /// Attach a collector that records every event published on the bus
    pub fn history(source: &Addr<EventBus<E>>) -> Addr<HistoryCollector<E>> {
        let addr = HistoryCollector::<E>::new().start();
        source.do_send(Subscribe::new("*", addr.clone().recipient()));
        addr
    }

    fn track(&mut self, event: &E) {
        self.ids.insert(&event.event_id());
    }

    fn is_duplicate(&self, event: &E) -> bool {
        self.config.deduplicate && self.ids.contains(&event.event_id())
    }
}

impl<E: ErrorEvent> EventBus<E> {
    /// Attach a collector that records only events of the given failure type
    pub fn error(source: &Addr<EventBus<E>>, event_type: &str) -> Addr<HistoryCollector<E>> {
        let addr = HistoryCollector::<E>::new().start();
        source.do_send(Subscribe::new(event_type, addr.clone().recipient()));
        addr
    }
}

impl<E: Event> Default for EventBus<E> {
    fn default() -> Self {
        Self::new(EventBusConfig::default())
    }
}

impl<E: Event> Handler<E> for EventBus<E> {
    type Result = ();

    fn handle(&mut self, event: E, _: &mut Context<Self>) {
        if self.is_duplicate(&event) {
            debug!(evt = %event, "Dropping duplicate event");
            return;
        }
        if let Some(listeners) = self.listeners.get("*") {
            for listener in listeners {
                listener.do_send(event.clone());
            }
        }

        if let Some(listeners) = self.listeners.get(&event.event_type()) {
            for listener in listeners {
                listener.do_send(event.clone());
            }
        }

        info!(">>> {}", event);
        if self.config.deduplicate {
            self.track(&event);
        }
    }
}

//////////////////////////////////////////////////////////////////////////////
// Subscribe Message
//////////////////////////////////////////////////////////////////////////////

#[derive(Message)]
#[rtype(result = "()")]
pub struct Subscribe<E: Event> {
    pub event_type: String,
    pub listener: Recipient<E>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Unsubscribe<E: Event> {
    pub event_type: String,
    pub listener: Recipient<E>,
}

impl<E: Event> Subscribe<E> {
    pub fn new(event_type: impl Into<String>, listener: Recipient<E>) -> Self {
        Self {
            event_type: event_type.into(),
            listener,
        }
    }
}

impl<E: Event> Unsubscribe<E> {
    pub fn new(event_type: impl Into<String>, listener: Recipient<E>) -> Self {
        Self {
            event_type: event_type.into(),
            listener,
        }
    }
}

impl<E: Event> Handler<Subscribe<E>> for EventBus<E> {
    type Result = ();

    fn handle(&mut self, msg: Subscribe<E>, _: &mut Context<Self>) {
        self.listeners
            .entry(msg.event_type)
            .or_default()
            .push(msg.listener);
    }
}

impl<E: Event> Handler<Unsubscribe<E>> for EventBus<E> {
    type Result = ();

    fn handle(&mut self, msg: Unsubscribe<E>, _: &mut Context<Self>) {
        if let Some(listeners) = self.listeners.get_mut(&msg.event_type) {
            listeners.retain(|listener| listener != &msg.listener);
        }
    }
}

//////////////////////////////////////////////////////////////////////////////
// History Management
//////////////////////////////////////////////////////////////////////////////

#[derive(Message)]
#[rtype(result = "Vec<E>")]
pub struct GetEvents<E: Event>(PhantomData<E>);

impl<E: Event> GetEvents<E> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

#[derive(Message)]
#[rtype(result = "Vec<E>")]
pub struct TakeEvents<E: Event> {
    amount: usize,
    _d: PhantomData<E>,
}

impl<E: Event> TakeEvents<E> {
    pub fn new(amount: usize) -> Self {
        Self {
            amount,
            _d: PhantomData,
        }
    }
}

#[derive(Message)]
#[rtype(result = "Vec<E::Error>")]
pub struct GetErrors<E: ErrorEvent>(PhantomData<E>);

impl<E: ErrorEvent> GetErrors<E> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

struct PendingTake<E: Event> {
    count: usize,
    collected: Vec<E>,
    responder: tokio::sync::oneshot::Sender<Vec<E>>,
}

//////////////////////////////////////////////////////////////////////////////
// History Collector
//////////////////////////////////////////////////////////////////////////////

/// Actor to subscribe to EventBus to capture all history
pub struct HistoryCollector<E: Event> {
    history: VecDeque<E>,
    /// Outstanding takes, served oldest first. History stays empty while any are waiting.
    pending_takes: VecDeque<PendingTake<E>>,
}

impl<E: Event> HistoryCollector<E> {
    pub fn new() -> Self {
        Self {
            history: VecDeque::new(),
            pending_takes: VecDeque::new(),
        }
    }

    fn add_event(&mut self, event: E) {
        let Some(pending) = self.pending_takes.front_mut() else {
            self.history.push_back(event);
            return;
        };

        pending.collected.push(event);
        if pending.collected.len() < pending.count {
            return;
        }
        if let Some(done) = self.pending_takes.pop_front() {
            let _ = done.responder.send(done.collected);
        }
    }
}

impl<E: Event> Default for HistoryCollector<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> Actor for HistoryCollector<E> {
    type Context = Context<Self>;
}

impl<E: Event> Handler<E> for HistoryCollector<E> {
    type Result = ();
    fn handle(&mut self, msg: E, _ctx: &mut Self::Context) -> Self::Result {
        self.add_event(msg);
    }
}

impl<E: Event> Handler<GetEvents<E>> for HistoryCollector<E> {
    type Result = Vec<E>;

    fn handle(&mut self, _: GetEvents<E>, _: &mut Context<Self>) -> Vec<E> {
        self.history.iter().cloned().collect()
    }
}

impl<E: ErrorEvent> Handler<GetErrors<E>> for HistoryCollector<E> {
    type Result = Vec<E::Error>;

    fn handle(&mut self, _: GetErrors<E>, _: &mut Context<Self>) -> Self::Result {
        self.history
            .iter()
            .filter_map(|evt| evt.as_error())
            .cloned()
            .collect()
    }
}

impl<E: Event> Handler<TakeEvents<E>> for HistoryCollector<E> {
    type Result = ResponseActFuture<Self, Vec<E>>;

    /// Remove and return the oldest `amount` events, waiting for more to arrive when the buffer is
    /// short. Concurrent takes are queued and receive consecutive events in the order they were
    /// sent.
    fn handle(&mut self, msg: TakeEvents<E>, _: &mut Context<Self>) -> Self::Result {
        let count = msg.amount;

        if self.pending_takes.is_empty() && self.history.len() >= count {
            let events: Vec<E> = self.history.drain(..count).collect();
            return Box::pin(async move { events }.into_actor(self));
        }

        info!(
            "Requesting {} events but only {} in the buffer. waiting for more...",
            count,
            self.history.len()
        );

        let (tx, rx) = tokio::sync::oneshot::channel();
        self.pending_takes.push_back(PendingTake {
            count,
            collected: self.history.drain(..).collect(),
            responder: tx,
        });

        Box::pin(async move { rx.await.unwrap_or_default() }.into_actor(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BatchClosed, BatchOpened, FailureKind, TallyEvent, TallyFailure};
    use anyhow::Result;

    #[actix::test]
    async fn history_collects_everything_published() -> Result<()> {
        let bus = EventBus::<TallyEvent>::default().start();
        let history = EventBus::history(&bus);

        bus.send(TallyEvent::from(BatchOpened { batch_id: 1 })).await?;
        bus.send(TallyEvent::from(BatchClosed {
            batch_id: 1,
            submissions: 2,
        }))
        .await?;

        let events = history.send(GetEvents::new()).await?;
        assert_eq!(
            events
                .iter()
                .map(|e| e.event_type())
                .collect::<Vec<_>>(),
            vec!["BatchOpened", "BatchClosed"]
        );
        Ok(())
    }

    #[actix::test]
    async fn error_collector_only_sees_failures() -> Result<()> {
        let bus = EventBus::<TallyEvent>::default().start();
        let errors = EventBus::error(&bus, "TallyFailure");

        bus.send(TallyEvent::from(BatchOpened { batch_id: 1 })).await?;
        bus.send(TallyEvent::from(TallyFailure::new(
            1,
            FailureKind::StateMismatch,
            "fingerprint differs",
        )))
        .await?;

        let found = errors.send(GetErrors::new()).await?;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, FailureKind::StateMismatch);
        Ok(())
    }

    #[actix::test]
    async fn deduplication_is_opt_in() -> Result<()> {
        let evt = TallyEvent::from(BatchOpened { batch_id: 9 });

        let bus = EventBus::<TallyEvent>::default().start();
        let history = EventBus::history(&bus);
        bus.send(evt.clone()).await?;
        bus.send(evt.clone()).await?;
        assert_eq!(history.send(GetEvents::new()).await?.len(), 2);

        let bus = EventBus::<TallyEvent>::new(EventBusConfig { deduplicate: true }).start();
        let history = EventBus::history(&bus);
        bus.send(evt.clone()).await?;
        bus.send(evt).await?;
        assert_eq!(history.send(GetEvents::new()).await?.len(), 1);
        Ok(())
    }

    #[actix::test]
    async fn take_waits_for_events() -> Result<()> {
        let bus = EventBus::<TallyEvent>::default().start();
        let history = EventBus::history(&bus);

        bus.send(TallyEvent::from(BatchOpened { batch_id: 1 })).await?;
        let pending = history.send(TakeEvents::new(2));
        bus.send(TallyEvent::from(BatchOpened { batch_id: 2 })).await?;

        let taken = pending.await?;
        assert_eq!(taken.len(), 2);
        assert_eq!(taken[1].get_batch_id(), Some(2));
        Ok(())
    }

    #[actix::test]
    async fn concurrent_takes_are_served_in_order() -> Result<()> {
        let bus = EventBus::<TallyEvent>::default().start();
        let history = EventBus::history(&bus);

        let first = history.send(TakeEvents::new(2));
        let second = history.send(TakeEvents::new(1));
        for batch_id in 1..=3 {
            bus.send(TallyEvent::from(BatchOpened { batch_id })).await?;
        }

        let first = first.await?;
        let second = second.await?;
        assert_eq!(
            first.iter().map(|e| e.get_batch_id()).collect::<Vec<_>>(),
            vec![Some(1), Some(2)]
        );
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].get_batch_id(), Some(3));
        assert!(history.send(GetEvents::new()).await?.is_empty());
        Ok(())
    }
}
