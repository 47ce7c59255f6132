//! Cancellable events fired while a phase unwinds.
//!
//! Events carry the cause chain built from the unwinding phase's context.
//! Cancellation is plain data: the processor reads it back after each event
//! has been posted and decides what to roll back.
mod bus;

pub use bus::{ListenerBus, Order};

use crate::cause::Cause;
use crate::transaction::ChangeBucket;
use crate::world::{EntitySnapshot, Transaction};

/// Event whose outcome can be vetoed by a listener.
pub trait Cancellable {
    fn is_cancelled(&self) -> bool;

    fn set_cancelled(&mut self, cancelled: bool);

    fn cancel(&mut self) {
        self.set_cancelled(true);
    }
}

/// Fired once per non-empty change bucket.
///
/// The transactions borrowed here are the same values later carried by the
/// aggregate [`ChangeBlockPostEvent`], so a custom replacement set by a
/// bucket listener is visible to post listeners.
#[derive(Debug)]
pub struct ChangeBlockEvent<'a> {
    bucket: ChangeBucket,
    cause: &'a Cause,
    transactions: &'a mut [Transaction],
    cancelled: bool,
}

impl<'a> ChangeBlockEvent<'a> {
    pub fn new(bucket: ChangeBucket, cause: &'a Cause, transactions: &'a mut [Transaction]) -> Self {
        Self {
            bucket,
            cause,
            transactions,
            cancelled: false,
        }
    }

    pub fn bucket(&self) -> ChangeBucket {
        self.bucket
    }

    pub fn cause(&self) -> &Cause {
        self.cause
    }

    pub fn transactions(&self) -> &[Transaction] {
        self.transactions
    }

    pub fn transactions_mut(&mut self) -> &mut [Transaction] {
        self.transactions
    }

    /// Invalidates every transaction for which `keep` returns false.
    /// Returns how many were invalidated.
    pub fn filter(&mut self, mut keep: impl FnMut(&Transaction) -> bool) -> usize {
        let mut invalidated = 0;
        for transaction in self.transactions.iter_mut() {
            if transaction.is_valid() && !keep(transaction) {
                transaction.invalidate();
                invalidated += 1;
            }
        }
        invalidated
    }
}

impl Cancellable for ChangeBlockEvent<'_> {
    fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    fn set_cancelled(&mut self, cancelled: bool) {
        self.cancelled = cancelled;
    }
}

/// Aggregate event covering every transaction of one drain pass, in bucket
/// order and then submission order.
#[derive(Debug)]
pub struct ChangeBlockPostEvent<'a> {
    cause: &'a Cause,
    transactions: &'a mut [Transaction],
    cancelled: bool,
}

impl<'a> ChangeBlockPostEvent<'a> {
    pub fn new(cause: &'a Cause, transactions: &'a mut [Transaction]) -> Self {
        Self {
            cause,
            transactions,
            cancelled: false,
        }
    }

    pub fn cause(&self) -> &Cause {
        self.cause
    }

    pub fn transactions(&self) -> &[Transaction] {
        self.transactions
    }

    pub fn transactions_mut(&mut self) -> &mut [Transaction] {
        self.transactions
    }
}

impl Cancellable for ChangeBlockPostEvent<'_> {
    fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    fn set_cancelled(&mut self, cancelled: bool) {
        self.cancelled = cancelled;
    }
}

/// Why a batch of item entities is being dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum DropKind {
    /// Items ejected by a dispensing block.
    Dispense,
    /// Items a block dropped when it was broken.
    Destruct,
    /// Any other captured item spawn.
    Custom,
}

/// Fired before captured item entities are spawned. Listeners may remove
/// entries or cancel the whole batch.
#[derive(Clone, Debug)]
pub struct DropItemEvent {
    kind: DropKind,
    cause: Cause,
    entities: Vec<EntitySnapshot>,
    cancelled: bool,
}

impl DropItemEvent {
    pub fn new(kind: DropKind, cause: Cause, entities: Vec<EntitySnapshot>) -> Self {
        Self {
            kind,
            cause,
            entities,
            cancelled: false,
        }
    }

    pub fn kind(&self) -> DropKind {
        self.kind
    }

    pub fn cause(&self) -> &Cause {
        &self.cause
    }

    pub fn entities(&self) -> &[EntitySnapshot] {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut Vec<EntitySnapshot> {
        &mut self.entities
    }

    pub fn into_entities(self) -> Vec<EntitySnapshot> {
        self.entities
    }
}

impl Cancellable for DropItemEvent {
    fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    fn set_cancelled(&mut self, cancelled: bool) {
        self.cancelled = cancelled;
    }
}

/// Fired before captured non-item entities are spawned.
#[derive(Clone, Debug)]
pub struct SpawnEntityEvent {
    cause: Cause,
    entities: Vec<EntitySnapshot>,
    cancelled: bool,
}

impl SpawnEntityEvent {
    pub fn new(cause: Cause, entities: Vec<EntitySnapshot>) -> Self {
        Self {
            cause,
            entities,
            cancelled: false,
        }
    }

    pub fn cause(&self) -> &Cause {
        &self.cause
    }

    pub fn entities(&self) -> &[EntitySnapshot] {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut Vec<EntitySnapshot> {
        &mut self.entities
    }

    pub fn into_entities(self) -> Vec<EntitySnapshot> {
        self.entities
    }
}

impl Cancellable for SpawnEntityEvent {
    fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    fn set_cancelled(&mut self, cancelled: bool) {
        self.cancelled = cancelled;
    }
}

/// Receives every event the tracker fires.
///
/// All methods default to doing nothing, which leaves every event
/// uncancelled.
pub trait EventSink {
    fn post_change_block(&mut self, _event: &mut ChangeBlockEvent<'_>) {}

    fn post_change_block_post(&mut self, _event: &mut ChangeBlockPostEvent<'_>) {}

    fn post_drop_item(&mut self, _event: &mut DropItemEvent) {}

    fn post_spawn_entity(&mut self, _event: &mut SpawnEntityEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cause::CauseValue;
    use crate::world::{BlockId, BlockPos, BlockSnapshot, BlockState, UserId, WorldId};

    fn transaction(x: i32) -> Transaction {
        let original = BlockSnapshot::new(WorldId(0), BlockPos::new(x, 0, 0), BlockState::AIR);
        let placed = original.with_state(BlockState::of(BlockId(1)));
        Transaction::new(original, placed)
    }

    #[test]
    fn filter_invalidates_rejected_transactions_only() {
        let cause = Cause::builder(CauseValue::Player(UserId(1))).build();
        let mut transactions = vec![transaction(0), transaction(1), transaction(2)];
        let mut event = ChangeBlockEvent::new(ChangeBucket::Place, &cause, &mut transactions);

        let invalidated = event.filter(|tx| tx.pos().x != 1);

        assert_eq!(invalidated, 1);
        assert!(!event.is_cancelled());
        let valid: Vec<bool> = transactions.iter().map(Transaction::is_valid).collect();
        assert_eq!(valid, vec![true, false, true]);
    }

    #[test]
    fn cancel_is_sticky_until_reset() {
        let cause = Cause::builder(CauseValue::Command("kill".into())).build();
        let mut event = SpawnEntityEvent::new(cause, Vec::new());
        event.cancel();
        assert!(event.is_cancelled());
        event.set_cancelled(false);
        assert!(!event.is_cancelled());
    }
}
