//! Turning captured entities and drops into spawn events and real spawns.

use tracing::debug;

use crate::cause::{Cause, NamedCauses};
use crate::error::TrackingError;
use crate::event::{Cancellable, DropItemEvent, DropKind, SpawnEntityEvent};
use crate::tracker::CauseTracker;
use crate::world::{EntitySnapshot, TrackerHost, UserId};

/// Users stamped onto entities that survive their spawn event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Attribution {
    pub creator: Option<UserId>,
    pub notifier: Option<UserId>,
}

impl Attribution {
    pub const NONE: Self = Self {
        creator: None,
        notifier: None,
    };

    /// The notifier is credited first, falling back to the owner.
    pub fn from_causes(causes: &NamedCauses) -> Self {
        let notifier = causes.notifier();
        Self {
            creator: notifier.or_else(|| causes.owner()),
            notifier,
        }
    }

    fn apply(self, entity: &mut EntitySnapshot) {
        if entity.creator.is_none() {
            entity.creator = self.creator;
        }
        if entity.notifier.is_none() {
            entity.notifier = self.notifier;
        }
    }
}

pub(crate) fn spawn_entities<H: TrackerHost + ?Sized>(
    tracker: &mut CauseTracker,
    host: &mut H,
    cause: &Cause,
    entities: Vec<EntitySnapshot>,
    attribution: Attribution,
) -> Result<usize, TrackingError> {
    let mut event = SpawnEntityEvent::new(cause.clone(), entities);
    host.post_spawn_entity(&mut event);
    if event.is_cancelled() {
        debug!(
            target: "tracking::spawn",
            entities = event.entities().len(),
            "spawn entity event cancelled"
        );
        return Ok(0);
    }
    spawn_all(tracker, host, event.into_entities(), attribution)
}

pub(crate) fn drop_items<H: TrackerHost + ?Sized>(
    tracker: &mut CauseTracker,
    host: &mut H,
    kind: DropKind,
    cause: &Cause,
    items: Vec<EntitySnapshot>,
    attribution: Attribution,
) -> Result<usize, TrackingError> {
    let mut event = DropItemEvent::new(kind, cause.clone(), items);
    host.post_drop_item(&mut event);
    if event.is_cancelled() {
        debug!(
            target: "tracking::spawn",
            kind = %kind,
            items = event.entities().len(),
            "drop item event cancelled"
        );
        return Ok(0);
    }
    spawn_all(tracker, host, event.into_entities(), attribution)
}

fn spawn_all<H: TrackerHost + ?Sized>(
    tracker: &mut CauseTracker,
    host: &mut H,
    entities: Vec<EntitySnapshot>,
    attribution: Attribution,
) -> Result<usize, TrackingError> {
    let count = entities.len();
    for mut entity in entities {
        attribution.apply(&mut entity);
        host.spawn_entity(tracker, entity)?;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cause::{CauseKey, CauseValue};
    use crate::world::{BlockPos, EntityId, EntityKind};

    #[test]
    fn notifier_takes_precedence_over_owner() {
        let mut causes = NamedCauses::new();
        causes.insert_once(CauseKey::Owner, CauseValue::User(UserId(1)));
        causes.insert_once(CauseKey::Notifier, CauseValue::User(UserId(2)));

        let attribution = Attribution::from_causes(&causes);
        assert_eq!(attribution.creator, Some(UserId(2)));
        assert_eq!(attribution.notifier, Some(UserId(2)));
    }

    #[test]
    fn existing_creator_is_kept() {
        let mut entity =
            EntitySnapshot::new(EntityId(1), EntityKind::Creature(3), BlockPos::ORIGIN);
        entity.creator = Some(UserId(9));

        Attribution {
            creator: Some(UserId(1)),
            notifier: Some(UserId(1)),
        }
        .apply(&mut entity);

        assert_eq!(entity.creator, Some(UserId(9)));
        assert_eq!(entity.notifier, Some(UserId(1)));
    }
}
