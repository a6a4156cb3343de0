//! Entities: the identity, flags, modifier bookkeeping, calculated
//! properties and listeners shared by everything the rules touch.

mod snapshot;

use std::collections::BTreeSet;
use std::fmt;

use crate::error::RulesError;
use crate::events::{EventBus, Handler};
use crate::modifier::{FieldRegistry, ModifierId};
use crate::script::{Formula, ScriptHost};
use crate::value::{Table, Value};

pub use snapshot::EntitySnapshot;

/// Unique identifier for any entity tracked by a simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out entity ids in increasing order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub const fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next_id(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next += 1;
        id
    }

    /// Ensures ids handed out later never collide with `id`.
    pub fn reserve(&mut self, id: EntityId) {
        self.next = self.next.max(id.0 + 1);
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Modifier ids an entity currently has applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AppliedModifiers {
    Tracked(Vec<ModifierId>),
    /// Adding or removing a modifier on this entity is silently ignored.
    Disabled,
}

/// A field recomputed from a formula on every tick.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CalculatedProperty {
    pub field: String,
    pub formula: Formula,
}

/// Common entity state.
#[derive(Clone, Debug)]
pub struct Entity {
    id: EntityId,
    flags: BTreeSet<String>,
    modifiers: AppliedModifiers,
    calculated: Vec<CalculatedProperty>,
    listeners: EventBus,
    extra: Table,
}

impl Entity {
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            flags: BTreeSet::new(),
            modifiers: AppliedModifiers::Tracked(Vec::new()),
            calculated: Vec::new(),
            listeners: EventBus::new(),
            extra: Table::new(),
        }
    }

    /// An entity that cannot carry modifiers.
    pub fn without_modifiers(id: EntityId) -> Self {
        Self {
            modifiers: AppliedModifiers::Disabled,
            ..Self::new(id)
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    // ===== flags =====

    pub fn set_flag(&mut self, name: &str) {
        self.flags.insert(name.to_owned());
    }

    /// Removes the flag; clearing an absent flag is a no-op.
    pub fn clear_flag(&mut self, name: &str) {
        self.flags.remove(name);
    }

    pub fn has_flag(&self, name: &str) -> bool {
        self.flags.contains(name)
    }

    pub fn flags(&self) -> impl Iterator<Item = &str> {
        self.flags.iter().map(String::as_str)
    }

    // ===== modifier bookkeeping =====

    pub fn applied_modifiers(&self) -> &AppliedModifiers {
        &self.modifiers
    }

    pub fn has_modifier(&self, id: ModifierId) -> bool {
        match &self.modifiers {
            AppliedModifiers::Tracked(ids) => ids.contains(&id),
            AppliedModifiers::Disabled => false,
        }
    }

    pub fn modifiers_enabled(&self) -> bool {
        matches!(self.modifiers, AppliedModifiers::Tracked(_))
    }

    pub(crate) fn record_modifier(&mut self, id: ModifierId) {
        if let AppliedModifiers::Tracked(ids) = &mut self.modifiers {
            ids.push(id);
        }
    }

    /// Drops the id; `true` only if it was applied.
    pub(crate) fn forget_modifier(&mut self, id: ModifierId) -> bool {
        match &mut self.modifiers {
            AppliedModifiers::Tracked(ids) => match ids.iter().position(|applied| *applied == id) {
                Some(index) => {
                    ids.remove(index);
                    true
                }
                None => false,
            },
            AppliedModifiers::Disabled => false,
        }
    }

    // ===== calculated properties =====

    /// Binds `field` to `formula`, replacing any formula already bound to it.
    pub fn calculate(&mut self, field: impl Into<String>, formula: Formula) {
        let field = field.into();
        match self.calculated.iter_mut().find(|p| p.field == field) {
            Some(property) => property.formula = formula,
            None => self.calculated.push(CalculatedProperty { field, formula }),
        }
    }

    pub fn uncalculate(&mut self, field: &str) -> bool {
        let before = self.calculated.len();
        self.calculated.retain(|p| p.field != field);
        self.calculated.len() != before
    }

    pub fn calculated(&self) -> &[CalculatedProperty] {
        &self.calculated
    }

    // ===== listeners =====

    pub fn watch(&mut self, event: &str, subscriber: &str, handler: Handler) {
        self.listeners.watch(event, subscriber, handler);
    }

    pub fn unwatch(&mut self, event: &str, subscriber: &str) -> bool {
        self.listeners.unwatch(event, subscriber)
    }

    pub fn listeners(&self) -> &EventBus {
        &self.listeners
    }

    // ===== extra properties =====

    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    pub fn set_extra(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.extra.insert(key.into(), value.into());
    }

    pub fn remove_extra(&mut self, key: &str) -> Option<Value> {
        self.extra.remove(key)
    }

    /// Read-only table exposed to formulas.
    pub fn view(&self) -> Table {
        let mut view = Table::new();
        view.insert("id".into(), Value::Entity(self.id));
        let flags = self
            .flags
            .iter()
            .map(|flag| (flag.clone(), Value::Bool(true)))
            .collect();
        view.insert("flags".into(), Value::Table(flags));
        view.insert("extra".into(), Value::Table(self.extra.clone()));
        view
    }
}

/// Anything that carries an [`Entity`] and can be the target of modifiers
/// and calculated properties.
pub trait Modifiable: Sized + 'static {
    /// Type name used in error messages.
    const KIND: &'static str;

    fn entity(&self) -> &Entity;

    fn entity_mut(&mut self) -> &mut Entity;

    /// Named fields beyond the `flags.*` and `extra.*` every entity has.
    fn fields() -> &'static FieldRegistry<Self>;

    /// Table handed to formulas as `this`.
    fn view(&self, scripts: &dyn ScriptHost) -> Result<Table, RulesError>;
}

impl Modifiable for Entity {
    const KIND: &'static str = "entity";

    fn entity(&self) -> &Entity {
        self
    }

    fn entity_mut(&mut self) -> &mut Entity {
        self
    }

    fn fields() -> &'static FieldRegistry<Self> {
        static FIELDS: std::sync::OnceLock<FieldRegistry<Entity>> = std::sync::OnceLock::new();
        FIELDS.get_or_init(FieldRegistry::new)
    }

    fn view(&self, _scripts: &dyn ScriptHost) -> Result<Table, RulesError> {
        Ok(Entity::view(self))
    }
}
