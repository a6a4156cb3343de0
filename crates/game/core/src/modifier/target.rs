//! Field selectors resolved against a per-type registry.
//!
//! Each modifiable type builds its [`FieldRegistry`] once. Resolution maps a
//! selector string onto a typed accessor so applying a modifier never goes
//! through string-keyed reflection.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::entity::Modifiable;
use crate::error::ConfigError;
use crate::script::Shape;
use crate::stats::Attribute;
use crate::value::Value;

const FLAG_PREFIX: &str = "flags.";
const EXTRA_PREFIX: &str = "extra.";

type Getter<T> = Box<dyn Fn(&T) -> Decimal + Send + Sync>;
type Setter<T> = Box<dyn Fn(&mut T, Decimal) + Send + Sync>;
type AttributeRef<T> = Box<dyn Fn(&T) -> &Attribute + Send + Sync>;
type AttributeMut<T> = Box<dyn Fn(&mut T) -> &mut Attribute + Send + Sync>;

/// Plain numeric field.
pub struct NumberField<T> {
    get: Getter<T>,
    set: Option<Setter<T>>,
}

impl<T> NumberField<T> {
    pub fn get(&self, target: &T) -> Decimal {
        (self.get)(target)
    }

    pub fn is_writable(&self) -> bool {
        self.set.is_some()
    }
}

/// A whole [`Attribute`]; modifiers attach to its bonus stack.
pub struct AttributeField<T> {
    get: AttributeRef<T>,
    get_mut: AttributeMut<T>,
}

impl<T> AttributeField<T> {
    pub fn get<'a>(&self, target: &'a T) -> &'a Attribute {
        (self.get)(target)
    }

    pub fn get_mut<'a>(&self, target: &'a mut T) -> &'a mut Attribute {
        (self.get_mut)(target)
    }
}

/// Resolved selector.
pub enum Target<'a, T> {
    Number(&'a NumberField<T>),
    Attribute(&'a AttributeField<T>),
    Flag(&'a str),
    Extra(&'a str),
}

/// Named fields of a modifiable type.
pub struct FieldRegistry<T> {
    numbers: BTreeMap<String, NumberField<T>>,
    attributes: BTreeMap<String, AttributeField<T>>,
}

impl<T> Default for FieldRegistry<T> {
    fn default() -> Self {
        Self {
            numbers: BTreeMap::new(),
            attributes: BTreeMap::new(),
        }
    }
}

impl<T> FieldRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn number<G, S>(mut self, name: impl Into<String>, get: G, set: S) -> Self
    where
        G: Fn(&T) -> Decimal + Send + Sync + 'static,
        S: Fn(&mut T, Decimal) + Send + Sync + 'static,
    {
        self.numbers.insert(
            name.into(),
            NumberField {
                get: Box::new(get),
                set: Some(Box::new(set)),
            },
        );
        self
    }

    #[must_use]
    pub fn read_only<G>(mut self, name: impl Into<String>, get: G) -> Self
    where
        G: Fn(&T) -> Decimal + Send + Sync + 'static,
    {
        self.numbers.insert(
            name.into(),
            NumberField {
                get: Box::new(get),
                set: None,
            },
        );
        self
    }

    #[must_use]
    pub fn attribute<G, M>(mut self, name: impl Into<String>, get: G, get_mut: M) -> Self
    where
        G: Fn(&T) -> &Attribute + Send + Sync + 'static,
        M: Fn(&mut T) -> &mut Attribute + Send + Sync + 'static,
    {
        self.attributes.insert(
            name.into(),
            AttributeField {
                get: Box::new(get),
                get_mut: Box::new(get_mut),
            },
        );
        self
    }

    pub fn contains(&self, selector: &str) -> bool {
        selector.starts_with(FLAG_PREFIX)
            || selector.starts_with(EXTRA_PREFIX)
            || self.numbers.contains_key(selector)
            || self.attributes.contains_key(selector)
    }
}

impl<T: Modifiable> FieldRegistry<T> {
    pub fn resolve<'a>(&'a self, selector: &'a str) -> Result<Target<'a, T>, ConfigError> {
        if let Some(flag) = selector.strip_prefix(FLAG_PREFIX) {
            return Ok(Target::Flag(flag));
        }
        if let Some(key) = selector.strip_prefix(EXTRA_PREFIX) {
            return Ok(Target::Extra(key));
        }
        if let Some(field) = self.numbers.get(selector) {
            return Ok(Target::Number(field));
        }
        if let Some(field) = self.attributes.get(selector) {
            return Ok(Target::Attribute(field));
        }
        Err(ConfigError::UnknownField {
            selector: selector.to_owned(),
            target: T::KIND,
        })
    }
}

/// Why a value could not be written to a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum WriteError {
    Expected(Shape),
    ReadOnly,
}

impl<T: Modifiable> Target<'_, T> {
    /// Current value as seen by transforms. Attributes have no scalar value.
    pub(crate) fn read(&self, target: &T) -> Option<Value> {
        match self {
            Self::Number(field) => Some(Value::Number(field.get(target))),
            Self::Attribute(_) => None,
            Self::Flag(name) => Some(Value::Bool(target.entity().has_flag(name))),
            Self::Extra(key) => Some(target.entity().extra(key).cloned().unwrap_or_default()),
        }
    }

    pub(crate) fn write(&self, target: &mut T, value: Value) -> Result<(), WriteError> {
        match self {
            Self::Number(field) => {
                let setter = field.set.as_ref().ok_or(WriteError::ReadOnly)?;
                let number = value
                    .as_number()
                    .ok_or(WriteError::Expected(Shape::Number))?;
                setter(target, number);
                Ok(())
            }
            Self::Attribute(_) => Err(WriteError::ReadOnly),
            Self::Flag(name) => {
                match value.as_bool().ok_or(WriteError::Expected(Shape::Bool))? {
                    true => target.entity_mut().set_flag(name),
                    false => target.entity_mut().clear_flag(name),
                }
                Ok(())
            }
            Self::Extra(key) => {
                let entity = target.entity_mut();
                if value.is_nil() {
                    entity.remove_extra(key);
                } else {
                    entity.set_extra(*key, value);
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, EntityId};

    #[test]
    fn entity_resolves_flags_and_extras_only() {
        let fields = Entity::fields();

        assert!(matches!(fields.resolve("flags.hasted"), Ok(Target::Flag("hasted"))));
        assert!(matches!(fields.resolve("extra.power"), Ok(Target::Extra("power"))));
        assert_eq!(
            fields.resolve("damage").err(),
            Some(ConfigError::UnknownField {
                selector: "damage".into(),
                target: "entity",
            })
        );
    }

    #[test]
    fn flag_write_requires_bool() {
        let mut entity = Entity::new(EntityId(1));
        let target: Target<'_, Entity> = Target::Flag("hasted");

        target.write(&mut entity, Value::Bool(true)).unwrap();
        assert!(entity.has_flag("hasted"));
        assert_eq!(
            target.write(&mut entity, Value::from(1i64)),
            Err(WriteError::Expected(Shape::Bool))
        );
    }
}
