//! Named causes and event cause chains.
//!
//! A phase context holds a [`NamedCauses`] bag describing who or what started
//! the phase. When captured mutations are replayed, that bag is turned into a
//! [`Cause`] attached to every event fired for the phase.
use core::fmt;

use tracing::debug;

use crate::world::{BlockSnapshot, EntityId, UserId};

/// Key of a named cause or event-context entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CauseKey {
    Source,
    Notifier,
    Owner,
    PlayerSimulated,
    SpawnType,
    Named(&'static str),
}

impl CauseKey {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Notifier => "notifier",
            Self::Owner => "owner",
            Self::PlayerSimulated => "player_simulated",
            Self::SpawnType => "spawn_type",
            Self::Named(name) => name,
        }
    }
}

impl fmt::Display for CauseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a spawned entity came into existence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum SpawnType {
    Dispense,
    BlockSpawning,
    Explosion,
    Command,
    Plugin,
    Custom,
}

/// A value stored under a [`CauseKey`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CauseValue {
    Player(UserId),
    User(UserId),
    Block(BlockSnapshot),
    Entity(EntityId),
    Plugin(String),
    Command(String),
    BlockSpawn {
        block: BlockSnapshot,
        spawn_type: SpawnType,
    },
    SpawnType(SpawnType),
}

impl CauseValue {
    /// The user behind this value, if it names one.
    pub fn user(&self) -> Option<UserId> {
        match self {
            Self::Player(user) | Self::User(user) => Some(*user),
            _ => None,
        }
    }

    /// Short human-readable description used in logs and audit records.
    pub fn label(&self) -> String {
        match self {
            Self::Player(user) => format!("player {user}"),
            Self::User(user) => format!("user {user}"),
            Self::Block(snapshot) => format!("block {} at {}", snapshot.state, snapshot.pos),
            Self::Entity(id) => format!("{id}"),
            Self::Plugin(name) => format!("plugin {name}"),
            Self::Command(name) => format!("command {name}"),
            Self::BlockSpawn { block, spawn_type } => {
                format!("{spawn_type} by block {} at {}", block.state, block.pos)
            }
            Self::SpawnType(spawn_type) => spawn_type.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamedCause {
    pub key: CauseKey,
    pub value: CauseValue,
}

/// Ordered bag of named causes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NamedCauses {
    entries: Vec<NamedCause>,
}

impl NamedCauses {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Inserts `value` unless `key` is already present. Returns whether the
    /// value was stored.
    pub fn insert_once(&mut self, key: CauseKey, value: CauseValue) -> bool {
        if self.contains(key) {
            return false;
        }
        self.entries.push(NamedCause { key, value });
        true
    }

    pub fn contains(&self, key: CauseKey) -> bool {
        self.entries.iter().any(|entry| entry.key == key)
    }

    pub fn first_named(&self, key: CauseKey) -> Option<&CauseValue> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| &entry.value)
    }

    pub fn source(&self) -> Option<&CauseValue> {
        self.first_named(CauseKey::Source)
    }

    pub fn notifier(&self) -> Option<UserId> {
        self.first_named(CauseKey::Notifier).and_then(CauseValue::user)
    }

    pub fn owner(&self) -> Option<UserId> {
        self.first_named(CauseKey::Owner).and_then(CauseValue::user)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedCause> + '_ {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for NamedCauses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (index, entry) in self.entries.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", entry.key, entry.value.label())?;
        }
        f.write_str("]")
    }
}

/// Attribution attached to a fired event.
///
/// `chain` starts with the source and holds named causes; `context` holds
/// the notifier/owner style entries that qualify the chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cause {
    chain: NamedCauses,
    context: NamedCauses,
}

impl Cause {
    pub fn builder(source: CauseValue) -> CauseBuilder {
        CauseBuilder::new(source)
    }

    pub fn source(&self) -> Option<&CauseValue> {
        self.chain.source()
    }

    pub fn first_named(&self, key: CauseKey) -> Option<&CauseValue> {
        self.chain.first_named(key)
    }

    pub fn context_value(&self, key: CauseKey) -> Option<&CauseValue> {
        self.context.first_named(key)
    }

    pub fn notifier(&self) -> Option<UserId> {
        self.context.notifier()
    }

    pub fn owner(&self) -> Option<UserId> {
        self.context.owner()
    }

    pub fn chain(&self) -> &NamedCauses {
        &self.chain
    }

    pub fn context(&self) -> &NamedCauses {
        &self.context
    }
}

/// Builds a [`Cause`]. Each key can be written once; later writes for the
/// same key are ignored.
#[derive(Clone, Debug)]
pub struct CauseBuilder {
    chain: NamedCauses,
    context: NamedCauses,
}

impl CauseBuilder {
    fn new(source: CauseValue) -> Self {
        let mut chain = NamedCauses::new();
        chain.insert_once(CauseKey::Source, source);
        Self {
            chain,
            context: NamedCauses::new(),
        }
    }

    #[must_use]
    pub fn named(mut self, key: CauseKey, value: CauseValue) -> Self {
        if !self.chain.insert_once(key, value) {
            debug!(target: "tracking::cause", key = %key, "named cause already set, keeping first value");
        }
        self
    }

    #[must_use]
    pub fn context(mut self, key: CauseKey, value: CauseValue) -> Self {
        if !self.context.insert_once(key, value) {
            debug!(target: "tracking::cause", key = %key, "context entry already set, keeping first value");
        }
        self
    }

    /// Adds notifier and owner context entries when present.
    #[must_use]
    pub fn attribution(self, notifier: Option<UserId>, owner: Option<UserId>) -> Self {
        let builder = match notifier {
            Some(user) => self.context(CauseKey::Notifier, CauseValue::User(user)),
            None => self,
        };
        match owner {
            Some(user) => builder.context(CauseKey::Owner, CauseValue::User(user)),
            None => builder,
        }
    }

    pub fn build(self) -> Cause {
        Cause {
            chain: self.chain,
            context: self.context,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_write_wins() {
        let cause = Cause::builder(CauseValue::Player(UserId(1)))
            .named(CauseKey::Source, CauseValue::Player(UserId(2)))
            .context(CauseKey::Notifier, CauseValue::User(UserId(3)))
            .context(CauseKey::Notifier, CauseValue::User(UserId(4)))
            .build();

        assert_eq!(cause.source(), Some(&CauseValue::Player(UserId(1))));
        assert_eq!(cause.notifier(), Some(UserId(3)));
        assert_eq!(cause.owner(), None);
    }

    #[test]
    fn attribution_skips_missing_users() {
        let cause = Cause::builder(CauseValue::Command("fill".into()))
            .attribution(None, Some(UserId(9)))
            .build();

        assert_eq!(cause.notifier(), None);
        assert_eq!(cause.owner(), Some(UserId(9)));
        assert_eq!(cause.context().len(), 1);
    }

    #[test]
    fn named_causes_render_in_insertion_order() {
        let mut causes = NamedCauses::new();
        causes.insert_once(CauseKey::Source, CauseValue::Plugin("builder".into()));
        causes.insert_once(CauseKey::Named("region"), CauseValue::Command("spawn".into()));

        assert_eq!(
            causes.to_string(),
            "[source=plugin builder, region=command spawn]"
        );
    }
}
