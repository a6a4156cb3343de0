//! Deterministic rules core for an idle RPG.
//!
//! `idle-core` owns the rules: attributes and their bonus stacks, reversible
//! modifiers, entities with per-entity event buses, attack resolution and
//! the encounter lifecycle. All state lives in a [`Simulation`] that is
//! advanced by [`Simulation::update`]; content formulas run through the
//! [`ScriptHost`] boundary and every random draw goes through
//! [`RandomSource`], so a seeded run replays exactly.
pub mod character;
pub mod combat;
pub mod config;
pub mod content;
pub mod encounter;
pub mod entity;
pub mod error;
pub mod events;
pub mod modifier;
pub mod rng;
pub mod script;
pub mod sim;
pub mod stats;
pub mod timer;
pub mod value;

pub use character::{Character, CharacterAction, CharacterSnapshot, Role, StatusTimer};
pub use combat::AttackOutcome;
pub use config::{CreatureConfig, PlayerConfig, RulesConfig};
pub use content::{
    AbilityDefinition, AbilityId, CreatureDefinition, CreatureId, CreatureOption, Definitions,
    EncounterDefId, EncounterDefinition, ItemDefinition, ItemId, StatusDefinition, StatusId,
};
pub use encounter::{Encounter, EncounterId, EncounterState, Resolution};
pub use entity::{Entity, EntityId, EntitySnapshot, IdAllocator, Modifiable};
pub use error::{ConfigError, ErrorKind, RulesError, ScriptError};
pub use events::{Event, EventBus, Handler, ListenerSnapshot};
pub use modifier::{Modifier, ModifierId, ModifierRegistry, Transform};
pub use rng::{RandomSource, SeededRng, SequenceRng};
pub use script::{Formula, NativeScripts, ScriptHost, Shape};
pub use sim::{ActionPhase, Simulation, SimulationBuilder, SimulationSnapshot};
pub use stats::{Attribute, AttributeBonus, AttributeKind, AttributeSet};
pub use timer::{Callback, Scheduler, Timer, TimerQueue};
pub use value::{Bindings, Table, Value};
