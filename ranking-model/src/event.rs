//! FILENAME: ranking-model/src/event.rs
//! Typed publish/subscribe bus with namespaced handler removal.
//!
//! Every mutable entity (column, ranking) announces changes through one
//! bus owned by its ranking. Subscriptions are keyed by
//! (emitter id, event type, tag): the tag is the consumer's namespace, so
//! independent layers listening on the same channel can remove exactly
//! their own handlers. Handlers run synchronously, in subscription order,
//! on the thread that triggered the mutation; they receive a shared
//! reference to the event only, so re-entrant mutation of the model from
//! inside a handler is impossible by construction.

/// Every announced change, including the four dirty buckets a change is
/// classified into:
/// - `Dirty` — anything changed (coarsest bucket)
/// - `DirtyHeader` — header/metadata re-render only
/// - `DirtyValues` — cell data changed; orders may need recomputation
/// - `DirtyCaches` — derived caches (histograms, color scales) stale,
///   independent of a value change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    WidthChanged,
    LabelChanged,
    MetadataChanged,
    VisibilityChanged,
    FilterChanged,
    RendererChanged,
    GroupRendererChanged,
    SummaryRendererChanged,
    MappingChanged,
    SortMethodChanged,
    GroupingChanged,
    WeightsChanged,
    ReduceChanged,
    AddColumn,
    RemoveColumn,
    MoveColumn,
    SortCriteriaChanged,
    GroupCriteriaChanged,
    GroupSortCriteriaChanged,
    DirtyOrder,
    OrderChanged,
    Dirty,
    DirtyHeader,
    DirtyValues,
    DirtyCaches,
}

/// Old/new data carried alongside an event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    None,
    Number { previous: f64, current: f64 },
    Text { previous: String, current: String },
    Flag { previous: bool, current: bool },
    /// Structural add/remove: the affected column and its index, so a
    /// renderer can patch incrementally instead of rebuilding.
    Structural { column: String, index: usize },
    Moved { column: String, old_index: usize, new_index: usize },
}

/// A single dispatched event.
#[derive(Debug, Clone)]
pub struct Event {
    /// Id of the column or ranking announcing the change.
    pub emitter: String,
    /// The channel this dispatch targets.
    pub kind: EventType,
    /// The primary event of a multi-channel fire (the first entry of the
    /// classified list), for handlers subscribed to a dirty bucket that
    /// want to know what actually happened.
    pub primary: EventType,
    pub payload: EventPayload,
}

pub type Handler = Box<dyn FnMut(&Event)>;

struct Subscription {
    emitter: String,
    event: EventType,
    tag: String,
    handler: Handler,
}

/// The bus. Subscription order is dispatch order; re-subscribing under an
/// existing (emitter, event, tag) key replaces the handler in place.
#[derive(Default)]
pub struct EventBus {
    subs: Vec<Subscription>,
}

impl EventBus {
    pub fn new() -> Self {
        EventBus { subs: Vec::new() }
    }

    /// Subscribes `handler` to `event` on `emitter` under `tag`.
    pub fn on(&mut self, emitter: &str, event: EventType, tag: &str, handler: Handler) {
        if let Some(existing) = self
            .subs
            .iter_mut()
            .find(|s| s.emitter == emitter && s.event == event && s.tag == tag)
        {
            existing.handler = handler;
            return;
        }
        self.subs.push(Subscription {
            emitter: emitter.to_string(),
            event,
            tag: tag.to_string(),
            handler,
        });
    }

    /// Removes the one subscription under (emitter, event, tag).
    pub fn off(&mut self, emitter: &str, event: EventType, tag: &str) {
        self.subs
            .retain(|s| !(s.emitter == emitter && s.event == event && s.tag == tag));
    }

    /// Removes every subscription carrying `tag`, across all emitters and
    /// events. This is how a consumer layer detaches wholesale.
    pub fn off_tag(&mut self, tag: &str) {
        self.subs.retain(|s| s.tag != tag);
    }

    /// Clears a destroyed entity's channels; no further events may fire
    /// for it afterwards.
    pub fn off_emitter(&mut self, emitter: &str) {
        self.subs.retain(|s| s.emitter != emitter);
    }

    pub fn has_listeners(&self, emitter: &str, event: EventType) -> bool {
        self.subs
            .iter()
            .any(|s| s.emitter == emitter && s.event == event)
    }

    /// Dispatches to all handlers of (event.emitter, event.kind), in
    /// subscription order.
    pub fn fire(&mut self, event: &Event) {
        for sub in &mut self.subs {
            if sub.emitter == event.emitter && sub.event == event.kind {
                (sub.handler)(event);
            }
        }
    }

    /// Fires the classified event list for one logical change: the first
    /// entry is the primary event, the remainder are the dirty buckets it
    /// maps to. The payload travels on the primary channel only.
    pub fn fire_all(&mut self, emitter: &str, events: &[EventType], payload: EventPayload) {
        if events.is_empty() {
            return;
        }
        let primary = events[0];
        for (i, kind) in events.iter().enumerate() {
            self.fire(&Event {
                emitter: emitter.to_string(),
                kind: *kind,
                primary,
                payload: if i == 0 { payload.clone() } else { EventPayload::None },
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder(log: &Rc<RefCell<Vec<String>>>, name: &str) -> Handler {
        let log = Rc::clone(log);
        let name = name.to_string();
        Box::new(move |e| log.borrow_mut().push(format!("{}:{:?}", name, e.kind)))
    }

    #[test]
    fn test_handlers_run_in_subscription_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        bus.on("c1", EventType::Dirty, "a", recorder(&log, "first"));
        bus.on("c1", EventType::Dirty, "b", recorder(&log, "second"));
        bus.fire_all("c1", &[EventType::Dirty], EventPayload::None);
        assert_eq!(*log.borrow(), vec!["first:Dirty", "second:Dirty"]);
    }

    #[test]
    fn test_off_tag_leaves_siblings_intact() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        bus.on("c1", EventType::WidthChanged, "renderer", recorder(&log, "r"));
        bus.on("c1", EventType::WidthChanged, "provider", recorder(&log, "p"));
        bus.off_tag("renderer");
        bus.fire_all("c1", &[EventType::WidthChanged], EventPayload::None);
        assert_eq!(*log.borrow(), vec!["p:WidthChanged"]);
    }

    #[test]
    fn test_resubscribe_replaces_handler() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        bus.on("c1", EventType::Dirty, "x", recorder(&log, "old"));
        bus.on("c1", EventType::Dirty, "x", recorder(&log, "new"));
        bus.fire_all("c1", &[EventType::Dirty], EventPayload::None);
        assert_eq!(*log.borrow(), vec!["new:Dirty"]);
    }

    #[test]
    fn test_emitter_channels_are_independent() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        bus.on("c1", EventType::Dirty, "x", recorder(&log, "c1"));
        bus.on("c2", EventType::Dirty, "x", recorder(&log, "c2"));
        bus.fire_all("c2", &[EventType::Dirty], EventPayload::None);
        assert_eq!(*log.borrow(), vec!["c2:Dirty"]);
    }

    #[test]
    fn test_primary_type_travels_with_buckets() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen2 = Rc::clone(&seen);
        let mut bus = EventBus::new();
        bus.on(
            "c1",
            EventType::Dirty,
            "x",
            Box::new(move |e| seen2.borrow_mut().push(e.primary)),
        );
        bus.fire_all(
            "c1",
            &[EventType::WidthChanged, EventType::DirtyHeader, EventType::Dirty],
            EventPayload::Number { previous: 100.0, current: 120.0 },
        );
        assert_eq!(*seen.borrow(), vec![EventType::WidthChanged]);
    }
}
