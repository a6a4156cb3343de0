//! Named events and the listener bus.
//!
//! Every entity owns an [`EventBus`]; the simulation owns one more for
//! engine-wide listeners. An emission from an entity reaches the entity's
//! own listeners first and then the simulation-wide ones. Both lists are
//! snapshotted before the first handler runs.

mod bus;

pub use bus::{EventBus, Handler, ListenerSnapshot, NativeHandler};

use crate::entity::EntityId;
use crate::value::{Bindings, Table, Value};

pub const DAMAGE_TAKEN: &str = "damage_taken";
pub const CHARACTER_DIED: &str = "character_died";
pub const CHARACTER_RESURRECTED: &str = "character_resurrected";
pub const CHARACTER_ACTED: &str = "character_acted";
pub const ATTACK_HIT: &str = "attack_hit";
pub const HIT_BY_ATTACK: &str = "hit_by_attack";
pub const ATTACK_MISSED: &str = "attack_missed";
pub const MISSED_BY_ATTACK: &str = "missed_by_attack";
pub const STATUS_ADDED: &str = "status_added";
pub const STATUS_REMOVED: &str = "status_removed";
pub const ITEM_ADDED: &str = "item_added";
pub const ITEM_REMOVED: &str = "item_removed";
pub const ABILITY_ADDED: &str = "ability_added";
pub const ABILITY_REMOVED: &str = "ability_removed";
pub const ENCOUNTER_STARTED: &str = "encounter_started";
pub const ENCOUNTER_ENDED: &str = "encounter_ended";
pub const STAGE_CHANGED: &str = "stage_changed";

/// Reaction hooks evaluated while an attack resolves.
pub const IS_ATTACKING: &str = "is_attacking";
pub const IS_BEING_ATTACKED: &str = "is_being_attacked";

/// A single emission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub name: String,
    /// Entity the event was emitted from; `None` for simulation-wide events.
    pub source: Option<EntityId>,
    pub context: Table,
}

impl Event {
    pub fn new(name: impl Into<String>, source: Option<EntityId>, context: Table) -> Self {
        Self {
            name: name.into(),
            source,
            context,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.context.get(key)
    }

    pub fn entity(&self, key: &str) -> Option<EntityId> {
        self.get(key).and_then(Value::as_entity)
    }

    /// Bindings handed to a scripted listener: the context entries plus
    /// `event` (the name) and `source`.
    pub fn bindings(&self) -> Bindings {
        let mut bindings = Bindings::from(self.context.clone());
        bindings.insert("event", self.name.as_str());
        bindings.insert("source", self.source);
        bindings
    }
}
