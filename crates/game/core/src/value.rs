//! Dynamic values exchanged with formulas and carried in event payloads.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::entity::EntityId;
use crate::error::ScriptError;
use crate::script::{Formula, Shape};

/// Ordered string-keyed table.
pub type Table = BTreeMap<String, Value>;

/// A value crossing the scripting boundary.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Number(Decimal),
    Text(String),
    Entity(EntityId),
    Table(Table),
}

impl Value {
    pub fn shape(&self) -> Shape {
        match self {
            Self::Nil => Shape::Nil,
            Self::Bool(_) => Shape::Bool,
            Self::Number(_) => Shape::Number,
            Self::Text(_) => Shape::Text,
            Self::Entity(_) => Shape::Entity,
            Self::Table(_) => Shape::Table,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Follows a dotted path (`attacker.damage`) through nested tables.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        path.split('.').try_fold(self, |value, key| match value {
            Self::Table(table) => table.get(key),
            _ => None,
        })
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<EntityId> {
        match self {
            Self::Entity(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Self::Table(t) => Some(t),
            _ => None,
        }
    }

    // ===== shape-checked conversions for formula results =====

    pub fn expect_number(self, formula: &Formula) -> Result<Decimal, ScriptError> {
        match self {
            Self::Number(n) => Ok(n),
            other => Err(ScriptError::wrong_shape(formula, Shape::Number, other.shape())),
        }
    }

    pub fn expect_bool(self, formula: &Formula) -> Result<bool, ScriptError> {
        match self {
            Self::Bool(b) => Ok(b),
            other => Err(ScriptError::wrong_shape(formula, Shape::Bool, other.shape())),
        }
    }

    pub fn expect_text(self, formula: &Formula) -> Result<String, ScriptError> {
        match self {
            Self::Text(s) => Ok(s),
            other => Err(ScriptError::wrong_shape(formula, Shape::Text, other.shape())),
        }
    }

    pub fn expect_table(self, formula: &Formula) -> Result<Table, ScriptError> {
        match self {
            Self::Table(t) => Ok(t),
            other => Err(ScriptError::wrong_shape(formula, Shape::Table, other.shape())),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Number(Decimal::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<EntityId> for Value {
    fn from(value: EntityId) -> Self {
        Self::Entity(value)
    }
}

impl From<Option<EntityId>> for Value {
    fn from(value: Option<EntityId>) -> Self {
        value.map_or(Self::Nil, Self::Entity)
    }
}

impl From<Table> for Value {
    fn from(value: Table) -> Self {
        Self::Table(value)
    }
}

/// Named inputs handed to a formula.
///
/// Formulas address nested values with dotted paths, e.g. `attacker.damage`
/// or `configuration.minimum_attack_damage`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Bindings {
    values: Table,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Copies every entry of `table` into the bindings.
    pub fn extend(&mut self, table: &Table) {
        for (key, value) in table {
            self.values.insert(key.clone(), value.clone());
        }
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let root = self.values.get(head)?;
        match rest {
            Some(rest) => root.lookup(rest),
            None => Some(root),
        }
    }

    /// Numeric lookup; missing or non-numeric paths fail as a wrong shape.
    pub fn number(&self, formula: &Formula, path: &str) -> Result<Decimal, ScriptError> {
        let value = self.get(path).cloned().unwrap_or_default();
        value.expect_number(formula)
    }

    pub fn entity(&self, path: &str) -> Option<EntityId> {
        self.get(path).and_then(Value::as_entity)
    }

    pub fn into_table(self) -> Table {
        self.values
    }
}

impl From<Table> for Bindings {
    fn from(values: Table) -> Self {
        Self { values }
    }
}

/// Builds a [`Table`] from `key => value` pairs.
#[macro_export]
macro_rules! table {
    ($($key:expr => $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut table = $crate::value::Table::new();
        $( table.insert(::std::string::String::from($key), $crate::value::Value::from($value)); )*
        table
    }};
}
