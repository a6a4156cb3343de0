//! Modifiers: reversible, targeted transformations of entity fields.
//!
//! A [`Modifier`] names a field selector and carries an apply transform and
//! an optional unapply transform. Modifiers are registered once in a
//! [`ModifierRegistry`]; entities only record the ids they have applied.

mod apply;
mod target;

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;

use crate::error::ConfigError;
use crate::script::Formula;
use crate::value::Value;

pub use apply::{add_modifier, apply_initializer, recalculate, remove_modifier};
pub use target::{AttributeField, FieldRegistry, NumberField, Target};

/// Identifier of a registered modifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ModifierId(pub u64);

impl fmt::Display for ModifierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Effect on the targeted field.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Transform {
    /// `value + amount`
    Offset(Decimal),
    /// `value × ratio`
    Scale(Decimal),
    /// `value ÷ ratio`, the inverse of [`Transform::Scale`].
    Unscale(Decimal),
    /// Replace the value outright.
    Assign(Value),
    /// Formula receiving `value` and `this`, returning the new value.
    Script(Formula),
}

/// A registered modifier definition.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Modifier {
    pub id: ModifierId,
    /// Field selector: a registered field name, `flags.<name>` or
    /// `extra.<name>`.
    pub target: String,
    pub apply: Transform,
    /// `None` makes the modifier one-way: removing it forgets the id but
    /// leaves the field as it is.
    pub unapply: Option<Transform>,
}

impl Modifier {
    pub fn new(
        id: ModifierId,
        target: impl Into<String>,
        apply: Transform,
        unapply: Option<Transform>,
    ) -> Self {
        Self {
            id,
            target: target.into(),
            apply,
            unapply,
        }
    }

    /// Adds `amount`; removal subtracts it again.
    pub fn additive(id: ModifierId, target: impl Into<String>, amount: Decimal) -> Self {
        Self::new(
            id,
            target,
            Transform::Offset(amount),
            Some(Transform::Offset(-amount)),
        )
    }

    /// Multiplies by `ratio`; removal divides by it again.
    pub fn multiplicative(id: ModifierId, target: impl Into<String>, ratio: Decimal) -> Self {
        Self::new(
            id,
            target,
            Transform::Scale(ratio),
            Some(Transform::Unscale(ratio)),
        )
    }

    /// Sets the flag while applied.
    pub fn flag(id: ModifierId, name: &str) -> Self {
        Self::new(
            id,
            format!("flags.{name}"),
            Transform::Assign(Value::Bool(true)),
            Some(Transform::Assign(Value::Bool(false))),
        )
    }

    /// Clears the flag while applied.
    pub fn clear_flag(id: ModifierId, name: &str) -> Self {
        Self::new(
            id,
            format!("flags.{name}"),
            Transform::Assign(Value::Bool(false)),
            Some(Transform::Assign(Value::Bool(true))),
        )
    }

    pub fn one_way(id: ModifierId, target: impl Into<String>, apply: Transform) -> Self {
        Self::new(id, target, apply, None)
    }

    pub fn scripted(
        id: ModifierId,
        target: impl Into<String>,
        apply: Formula,
        unapply: Option<Formula>,
    ) -> Self {
        Self::new(
            id,
            target,
            Transform::Script(apply),
            unapply.map(Transform::Script),
        )
    }
}

/// Arena of modifier definitions addressed by id.
#[derive(Clone, Debug, Default)]
pub struct ModifierRegistry {
    modifiers: BTreeMap<ModifierId, Modifier>,
}

impl ModifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, modifier: Modifier) -> Result<(), ConfigError> {
        if self.modifiers.contains_key(&modifier.id) {
            return Err(ConfigError::DuplicateModifier(modifier.id));
        }
        self.modifiers.insert(modifier.id, modifier);
        Ok(())
    }

    pub fn get(&self, id: ModifierId) -> Option<&Modifier> {
        self.modifiers.get(&id)
    }

    pub fn resolve(&self, id: ModifierId) -> Result<&Modifier, ConfigError> {
        self.get(id).ok_or(ConfigError::UnknownModifier(id))
    }

    pub fn contains(&self, id: ModifierId) -> bool {
        self.modifiers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.modifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modifiers.is_empty()
    }
}
