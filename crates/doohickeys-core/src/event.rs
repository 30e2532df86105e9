//! Typed simulation events with per-kind ring buffers.
//!
//! The propagation step emits events in the order things happen during a
//! tick. The controller returns them from `update` and then hands them to the
//! [`EventBus`], which buffers them per kind and delivers them to registered
//! listeners at the end of the tick.
//!
//! # Suppression
//!
//! Event kinds can be suppressed via [`EventBus::suppress`]. Suppressed kinds
//! are never buffered or delivered; [`EventKind::PartStateChanged`] is the
//! usual candidate since every trigger produces one per neighbour.

use serde::{Deserialize, Serialize};

use crate::id::PartId;
use crate::part::PartType;
use crate::physics::Vec2;
use crate::sim::SimulationState;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A simulation event. All events carry the tick at which they occurred.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// A trigger effect was applied to `part`.
    PartStateChanged { part: PartId, tick: u64 },
    Explosion {
        part: PartId,
        part_type: PartType,
        position: Vec2,
        radius: f64,
        tick: u64,
    },
    /// A tesla discharge. `to` is `None` for an arc into the ground.
    ElectricalArc {
        from: PartId,
        to: Option<PartId>,
        start: Vec2,
        end: Vec2,
        tick: u64,
    },
    SteamRelease {
        part: PartId,
        position: Vec2,
        direction: Vec2,
        tick: u64,
    },
    CannonFired {
        part: PartId,
        /// Muzzle position of the projectile.
        position: Vec2,
        velocity: Vec2,
        tick: u64,
    },
    CharacterDamaged {
        part: PartId,
        durability: f64,
        tick: u64,
    },
    CharacterDestroyed { part: PartId, tick: u64 },
    GoalReached { tick: u64 },
    /// Any part leaving the graph during a run.
    PartDestroyed {
        part: PartId,
        part_type: PartType,
        tick: u64,
    },
    StateChanged {
        from: SimulationState,
        to: SimulationState,
        tick: u64,
    },
}

/// Discriminant tag for event types, used for suppression and subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    PartStateChanged,
    Explosion,
    ElectricalArc,
    SteamRelease,
    CannonFired,
    CharacterDamaged,
    CharacterDestroyed,
    GoalReached,
    PartDestroyed,
    StateChanged,
}

const EVENT_KIND_COUNT: usize = 10;

impl EventKind {
    pub const ALL: [EventKind; EVENT_KIND_COUNT] = [
        EventKind::PartStateChanged,
        EventKind::Explosion,
        EventKind::ElectricalArc,
        EventKind::SteamRelease,
        EventKind::CannonFired,
        EventKind::CharacterDamaged,
        EventKind::CharacterDestroyed,
        EventKind::GoalReached,
        EventKind::PartDestroyed,
        EventKind::StateChanged,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::PartStateChanged { .. } => EventKind::PartStateChanged,
            Event::Explosion { .. } => EventKind::Explosion,
            Event::ElectricalArc { .. } => EventKind::ElectricalArc,
            Event::SteamRelease { .. } => EventKind::SteamRelease,
            Event::CannonFired { .. } => EventKind::CannonFired,
            Event::CharacterDamaged { .. } => EventKind::CharacterDamaged,
            Event::CharacterDestroyed { .. } => EventKind::CharacterDestroyed,
            Event::GoalReached { .. } => EventKind::GoalReached,
            Event::PartDestroyed { .. } => EventKind::PartDestroyed,
            Event::StateChanged { .. } => EventKind::StateChanged,
        }
    }

    pub fn tick(&self) -> u64 {
        match self {
            Event::PartStateChanged { tick, .. }
            | Event::Explosion { tick, .. }
            | Event::ElectricalArc { tick, .. }
            | Event::SteamRelease { tick, .. }
            | Event::CannonFired { tick, .. }
            | Event::CharacterDamaged { tick, .. }
            | Event::CharacterDestroyed { tick, .. }
            | Event::GoalReached { tick }
            | Event::PartDestroyed { tick, .. }
            | Event::StateChanged { tick, .. } => *tick,
        }
    }

    /// The part the event is about, if any.
    pub fn part(&self) -> Option<PartId> {
        match self {
            Event::PartStateChanged { part, .. }
            | Event::Explosion { part, .. }
            | Event::SteamRelease { part, .. }
            | Event::CannonFired { part, .. }
            | Event::CharacterDamaged { part, .. }
            | Event::CharacterDestroyed { part, .. }
            | Event::PartDestroyed { part, .. } => Some(*part),
            Event::ElectricalArc { from, .. } => Some(*from),
            Event::GoalReached { .. } | Event::StateChanged { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// EventBuffer: pre-allocated ring buffer
// ---------------------------------------------------------------------------

/// A fixed-capacity ring buffer. When full, the oldest events are dropped.
#[derive(Debug)]
pub struct EventBuffer {
    events: Vec<Option<Event>>,
    /// Next write position.
    head: usize,
    len: usize,
    /// Total events ever written, including dropped ones.
    total_written: u64,
}

impl EventBuffer {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_written: 0,
        }
    }

    pub fn push(&mut self, event: Event) {
        self.events[self.head] = Some(event);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Events overwritten because the buffer was full.
    pub fn dropped_count(&self) -> u64 {
        self.total_written.saturating_sub(self.capacity() as u64)
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        let start = if self.len < self.capacity() { 0 } else { self.head };
        let capacity = self.capacity();
        (0..self.len).filter_map(move |i| self.events[(start + i) % capacity].as_ref())
    }

    pub fn clear(&mut self) {
        for slot in &mut self.events {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

// ---------------------------------------------------------------------------
// Listeners
// ---------------------------------------------------------------------------

/// A listener receives events read-only.
pub type Listener = Box<dyn FnMut(&Event)>;

/// Optional predicate narrowing what a listener sees.
pub type EventFilter = Box<dyn Fn(&Event) -> bool>;

/// Priority level for listeners. Lower priorities run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SubscriberPriority {
    Pre = 0,
    Normal = 1,
    Post = 2,
}

struct SubscriberEntry {
    listener: Listener,
    priority: SubscriberPriority,
    filter: Option<EventFilter>,
    insertion_order: u64,
}

impl std::fmt::Debug for SubscriberEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberEntry")
            .field("priority", &self.priority)
            .field("filtered", &self.filter.is_some())
            .field("insertion_order", &self.insertion_order)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// One ring buffer per event kind, listener lists, and suppression flags.
///
/// The ring buffers are bounded history for inspection. Delivery reads a
/// separate unbounded queue, so every emitted event reaches its listeners
/// in emission order.
pub struct EventBus {
    /// Allocated lazily on first emit.
    buffers: [Option<EventBuffer>; EVENT_KIND_COUNT],
    /// Events awaiting delivery, in emission order.
    pending: Vec<Event>,
    suppressed: [bool; EVENT_KIND_COUNT],
    subscribers: [Vec<SubscriberEntry>; EVENT_KIND_COUNT],
    default_capacity: usize,
    next_insertion_order: u64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("buffers", &self.buffers)
            .field("suppressed", &self.suppressed)
            .field("default_capacity", &self.default_capacity)
            .finish_non_exhaustive()
    }
}

impl EventBus {
    pub fn new(default_capacity: usize) -> Self {
        Self {
            buffers: Default::default(),
            pending: Vec::new(),
            suppressed: [false; EVENT_KIND_COUNT],
            subscribers: std::array::from_fn(|_| Vec::new()),
            default_capacity,
            next_insertion_order: 0,
        }
    }

    /// Stop buffering and delivering `kind`. Its buffer is freed.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
        self.buffers[kind.index()] = None;
    }

    pub fn unsuppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = false;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Buffer an event for the next delivery. No-op for suppressed kinds.
    pub fn emit(&mut self, event: Event) {
        let idx = event.kind().index();
        if self.suppressed[idx] {
            return;
        }
        let capacity = self.default_capacity;
        self.buffers[idx]
            .get_or_insert_with(|| EventBuffer::new(capacity))
            .push(event.clone());
        self.pending.push(event);
    }

    /// Register a listener with normal priority and no filter.
    pub fn on(&mut self, kind: EventKind, listener: Listener) {
        self.on_filtered(kind, SubscriberPriority::Normal, None, listener);
    }

    pub fn on_filtered(
        &mut self,
        kind: EventKind,
        priority: SubscriberPriority,
        filter: Option<EventFilter>,
        listener: Listener,
    ) {
        let order = self.next_insertion_order;
        self.next_insertion_order += 1;
        self.subscribers[kind.index()].push(SubscriberEntry {
            listener,
            priority,
            filter,
            insertion_order: order,
        });
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.subscribers[kind.index()].len()
    }

    /// Deliver every pending event in emission order. Each event goes to the
    /// listeners of its kind ordered by `(priority, insertion_order)`. The
    /// history buffers are cleared afterwards.
    pub fn deliver(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        for subscribers in &mut self.subscribers {
            subscribers.sort_by_key(|entry| (entry.priority, entry.insertion_order));
        }

        for event in std::mem::take(&mut self.pending) {
            let idx = event.kind().index();
            if self.suppressed[idx] {
                continue;
            }
            for entry in &mut self.subscribers[idx] {
                if let Some(filter) = &entry.filter
                    && !filter(&event)
                {
                    continue;
                }
                (entry.listener)(&event);
            }
        }

        for buffer in self.buffers.iter_mut().flatten() {
            buffer.clear();
        }
    }

    /// Events emitted since the last delivery.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn buffer(&self, kind: EventKind) -> Option<&EventBuffer> {
        self.buffers[kind.index()].as_ref()
    }

    pub fn buffered_count(&self, kind: EventKind) -> usize {
        self.buffer(kind).map(EventBuffer::len).unwrap_or(0)
    }

    /// Total events ever emitted for a kind, including dropped ones.
    pub fn total_emitted(&self, kind: EventKind) -> u64 {
        self.buffer(kind)
            .map(EventBuffer::total_written)
            .unwrap_or(0)
    }

    /// Clear every buffer and drop undelivered events. Listeners and
    /// suppression settings stay.
    pub fn clear_all(&mut self) {
        self.pending.clear();
        for buffer in self.buffers.iter_mut().flatten() {
            buffer.clear();
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn make_part_id() -> PartId {
        use slotmap::SlotMap;
        let mut sm = SlotMap::<PartId, ()>::with_key();
        sm.insert(())
    }

    fn changed(part: PartId, tick: u64) -> Event {
        Event::PartStateChanged { part, tick }
    }

    #[test]
    fn kind_table_matches_discriminants() {
        for (i, kind) in EventKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn buffer_wraps_and_drops_oldest() {
        let mut buf = EventBuffer::new(3);
        let part = make_part_id();
        for tick in 0..5 {
            buf.push(changed(part, tick));
        }
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.total_written(), 5);
        assert_eq!(buf.dropped_count(), 2);
        let ticks: Vec<u64> = buf.iter().map(Event::tick).collect();
        assert_eq!(ticks, vec![2, 3, 4]);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut buf = EventBuffer::new(0);
        assert_eq!(buf.capacity(), 1);
        buf.push(Event::GoalReached { tick: 1 });
        buf.push(Event::GoalReached { tick: 2 });
        assert_eq!(buf.iter().map(Event::tick).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn deliver_calls_listeners_and_clears() {
        let mut bus = EventBus::new(16);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.on(
            EventKind::GoalReached,
            Box::new(move |e| sink.borrow_mut().push(e.tick())),
        );

        bus.emit(Event::GoalReached { tick: 7 });
        assert_eq!(bus.buffered_count(EventKind::GoalReached), 1);
        bus.deliver();

        assert_eq!(*seen.borrow(), vec![7]);
        assert_eq!(bus.buffered_count(EventKind::GoalReached), 0);
        assert_eq!(bus.total_emitted(EventKind::GoalReached), 1);
    }

    #[test]
    fn suppressed_kinds_are_never_buffered() {
        let mut bus = EventBus::default();
        let hits = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&hits);
        bus.on(
            EventKind::PartStateChanged,
            Box::new(move |_| *counter.borrow_mut() += 1),
        );
        bus.suppress(EventKind::PartStateChanged);
        bus.emit(changed(make_part_id(), 1));
        bus.deliver();
        assert_eq!(*hits.borrow(), 0);
        assert!(bus.buffer(EventKind::PartStateChanged).is_none());

        bus.unsuppress(EventKind::PartStateChanged);
        bus.emit(changed(make_part_id(), 2));
        bus.deliver();
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn priority_orders_listeners() {
        let mut bus = EventBus::default();
        let order = Rc::new(RefCell::new(Vec::new()));
        for (label, priority) in [
            ("post", SubscriberPriority::Post),
            ("normal", SubscriberPriority::Normal),
            ("pre", SubscriberPriority::Pre),
        ] {
            let sink = Rc::clone(&order);
            bus.on_filtered(
                EventKind::GoalReached,
                priority,
                None,
                Box::new(move |_| sink.borrow_mut().push(label)),
            );
        }
        bus.emit(Event::GoalReached { tick: 0 });
        bus.deliver();
        assert_eq!(*order.borrow(), vec!["pre", "normal", "post"]);
    }

    #[test]
    fn filters_skip_events() {
        let mut bus = EventBus::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.on_filtered(
            EventKind::CharacterDamaged,
            SubscriberPriority::Normal,
            Some(Box::new(|e| {
                matches!(e, Event::CharacterDamaged { durability, .. } if *durability < 50.0)
            })),
            Box::new(move |e| sink.borrow_mut().push(e.tick())),
        );
        let part = make_part_id();
        bus.emit(Event::CharacterDamaged { part, durability: 80.0, tick: 1 });
        bus.emit(Event::CharacterDamaged { part, durability: 30.0, tick: 2 });
        bus.deliver();
        assert_eq!(*seen.borrow(), vec![2]);
    }

    #[test]
    fn overflowing_history_still_reaches_listeners() {
        let mut bus = EventBus::new(4);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.on(
            EventKind::PartStateChanged,
            Box::new(move |e| sink.borrow_mut().push(e.tick())),
        );
        let part = make_part_id();
        for tick in 0..10 {
            bus.emit(changed(part, tick));
        }
        assert_eq!(bus.buffered_count(EventKind::PartStateChanged), 4);
        assert_eq!(bus.pending_count(), 10);
        bus.deliver();

        assert_eq!(*seen.borrow(), (0..10).collect::<Vec<u64>>());
        assert_eq!(bus.total_emitted(EventKind::PartStateChanged), 10);
        assert_eq!(bus.pending_count(), 0);
    }

    #[test]
    fn delivery_follows_emission_order_across_kinds() {
        let mut bus = EventBus::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for kind in [EventKind::GoalReached, EventKind::PartStateChanged] {
            let sink = Rc::clone(&seen);
            bus.on(kind, Box::new(move |e| sink.borrow_mut().push(e.kind())));
        }
        let part = make_part_id();
        bus.emit(Event::GoalReached { tick: 1 });
        bus.emit(changed(part, 1));
        bus.emit(Event::GoalReached { tick: 1 });
        bus.deliver();
        assert_eq!(
            *seen.borrow(),
            vec![
                EventKind::GoalReached,
                EventKind::PartStateChanged,
                EventKind::GoalReached,
            ]
        );
    }

    #[test]
    fn event_part_accessor() {
        let part = make_part_id();
        assert_eq!(changed(part, 0).part(), Some(part));
        assert_eq!(Event::GoalReached { tick: 0 }.part(), None);
        let arc = Event::ElectricalArc {
            from: part,
            to: None,
            start: Vec2::ZERO,
            end: Vec2::new(0.0, -64.0),
            tick: 3,
        };
        assert_eq!(arc.part(), Some(part));
        assert_eq!(arc.kind(), EventKind::ElectricalArc);
        assert_eq!(arc.tick(), 3);
    }
}
