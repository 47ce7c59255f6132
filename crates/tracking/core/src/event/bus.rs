//! Ordered in-process listener registry.

use core::fmt;

use tracing::trace;

use super::{ChangeBlockEvent, ChangeBlockPostEvent, DropItemEvent, EventSink, SpawnEntityEvent};

/// Listener ordering. Listeners run from `First` to `Last`; listeners with the
/// same order run in registration order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Order {
    First,
    Early,
    #[default]
    Default,
    Late,
    Last,
}

type ChangeBlockListener = Box<dyn FnMut(&mut ChangeBlockEvent<'_>)>;
type ChangeBlockPostListener = Box<dyn FnMut(&mut ChangeBlockPostEvent<'_>)>;
type DropItemListener = Box<dyn FnMut(&mut DropItemEvent)>;
type SpawnEntityListener = Box<dyn FnMut(&mut SpawnEntityEvent)>;

struct ListenerList<L> {
    entries: Vec<(Order, L)>,
}

impl<L> ListenerList<L> {
    const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn register(&mut self, order: Order, listener: L) {
        let index = self.entries.partition_point(|(existing, _)| *existing <= order);
        self.entries.insert(index, (order, listener));
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut L> + '_ {
        self.entries.iter_mut().map(|(_, listener)| listener)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// [`EventSink`] that dispatches each event kind to its registered closures.
///
/// Every listener sees the event, including after an earlier listener
/// cancelled it; listeners that only care about live events check
/// `is_cancelled` themselves.
pub struct ListenerBus {
    change_block: ListenerList<ChangeBlockListener>,
    change_block_post: ListenerList<ChangeBlockPostListener>,
    drop_item: ListenerList<DropItemListener>,
    spawn_entity: ListenerList<SpawnEntityListener>,
}

impl ListenerBus {
    pub const fn new() -> Self {
        Self {
            change_block: ListenerList::new(),
            change_block_post: ListenerList::new(),
            drop_item: ListenerList::new(),
            spawn_entity: ListenerList::new(),
        }
    }

    pub fn on_change_block<F>(&mut self, order: Order, listener: F) -> &mut Self
    where
        F: FnMut(&mut ChangeBlockEvent<'_>) + 'static,
    {
        self.change_block.register(order, Box::new(listener));
        self
    }

    pub fn on_change_block_post<F>(&mut self, order: Order, listener: F) -> &mut Self
    where
        F: FnMut(&mut ChangeBlockPostEvent<'_>) + 'static,
    {
        self.change_block_post.register(order, Box::new(listener));
        self
    }

    pub fn on_drop_item<F>(&mut self, order: Order, listener: F) -> &mut Self
    where
        F: FnMut(&mut DropItemEvent) + 'static,
    {
        self.drop_item.register(order, Box::new(listener));
        self
    }

    pub fn on_spawn_entity<F>(&mut self, order: Order, listener: F) -> &mut Self
    where
        F: FnMut(&mut SpawnEntityEvent) + 'static,
    {
        self.spawn_entity.register(order, Box::new(listener));
        self
    }

    /// Total number of registered listeners across all event kinds.
    pub fn len(&self) -> usize {
        self.change_block.len()
            + self.change_block_post.len()
            + self.drop_item.len()
            + self.spawn_entity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ListenerBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ListenerBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerBus")
            .field("change_block", &self.change_block.len())
            .field("change_block_post", &self.change_block_post.len())
            .field("drop_item", &self.drop_item.len())
            .field("spawn_entity", &self.spawn_entity.len())
            .finish()
    }
}

impl EventSink for ListenerBus {
    fn post_change_block(&mut self, event: &mut ChangeBlockEvent<'_>) {
        trace!(
            target: "tracking::event",
            bucket = %event.bucket(),
            transactions = event.transactions().len(),
            listeners = self.change_block.len(),
            "posting change block event"
        );
        for listener in self.change_block.iter_mut() {
            listener(&mut *event);
        }
    }

    fn post_change_block_post(&mut self, event: &mut ChangeBlockPostEvent<'_>) {
        trace!(
            target: "tracking::event",
            transactions = event.transactions().len(),
            listeners = self.change_block_post.len(),
            "posting change block post event"
        );
        for listener in self.change_block_post.iter_mut() {
            listener(&mut *event);
        }
    }

    fn post_drop_item(&mut self, event: &mut DropItemEvent) {
        trace!(
            target: "tracking::event",
            kind = %event.kind(),
            entities = event.entities().len(),
            "posting drop item event"
        );
        for listener in self.drop_item.iter_mut() {
            listener(&mut *event);
        }
    }

    fn post_spawn_entity(&mut self, event: &mut SpawnEntityEvent) {
        trace!(
            target: "tracking::event",
            entities = event.entities().len(),
            "posting spawn entity event"
        );
        for listener in self.spawn_entity.iter_mut() {
            listener(&mut *event);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::cause::{Cause, CauseValue};
    use crate::event::{Cancellable, DropKind};
    use crate::world::UserId;

    #[test]
    fn listeners_run_by_order_then_registration() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = ListenerBus::new();

        for (order, label) in [
            (Order::Late, "late"),
            (Order::First, "first"),
            (Order::Default, "default-a"),
            (Order::Default, "default-b"),
        ] {
            let seen = Rc::clone(&seen);
            bus.on_spawn_entity(order, move |_| seen.borrow_mut().push(label));
        }

        let cause = Cause::builder(CauseValue::Player(UserId(1))).build();
        bus.post_spawn_entity(&mut SpawnEntityEvent::new(cause, Vec::new()));

        assert_eq!(*seen.borrow(), vec!["first", "default-a", "default-b", "late"]);
        assert_eq!(bus.len(), 4);
    }

    #[test]
    fn later_listener_sees_earlier_cancellation() {
        let mut bus = ListenerBus::new();
        let observed = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&observed);

        bus.on_drop_item(Order::Early, |event| event.cancel());
        bus.on_drop_item(Order::Last, move |event| {
            *sink.borrow_mut() = Some(event.is_cancelled());
        });

        let cause = Cause::builder(CauseValue::Plugin("test".into())).build();
        let mut event = DropItemEvent::new(DropKind::Custom, cause, Vec::new());
        bus.post_drop_item(&mut event);

        assert!(event.is_cancelled());
        assert_eq!(*observed.borrow(), Some(true));
    }
}
