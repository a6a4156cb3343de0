use rust_decimal::Decimal;

use crate::entity::EntityId;
use crate::error::ScriptError;
use crate::script::Formula;
use crate::value::{Table, Value};

/// Result of one attack after outcome formulas and reactions.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttackOutcome {
    pub is_hit: bool,
    pub description: String,
    pub damage_to_defender: Decimal,
    pub damage_to_attacker: Decimal,
    pub attacker: EntityId,
}

impl AttackOutcome {
    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.insert("hit".into(), Value::Bool(self.is_hit));
        table.insert("description".into(), Value::from(self.description.as_str()));
        table.insert(
            "damage_to_defender".into(),
            Value::Number(self.damage_to_defender),
        );
        table.insert(
            "damage_to_attacker".into(),
            Value::Number(self.damage_to_attacker),
        );
        table.insert("attacker".into(), Value::Entity(self.attacker));
        table
    }

    pub fn to_value(&self) -> Value {
        Value::Table(self.to_table())
    }

    /// Reads an outcome table returned by `formula`.
    ///
    /// `hit` and `description` are required. Missing damage entries count as
    /// zero and a missing `attacker` falls back to `default_attacker`.
    pub fn from_value(
        value: Value,
        formula: &Formula,
        default_attacker: EntityId,
    ) -> Result<Self, ScriptError> {
        let table = value.expect_table(formula)?;
        let field = |key: &str| table.get(key).cloned().unwrap_or_default();

        let damage = |key: &str| -> Result<Decimal, ScriptError> {
            match table.get(key) {
                None | Some(Value::Nil) => Ok(Decimal::ZERO),
                Some(other) => other.clone().expect_number(formula),
            }
        };

        let attacker = match table.get("attacker") {
            None | Some(Value::Nil) => default_attacker,
            Some(Value::Entity(id)) => *id,
            Some(_) => return Err(ScriptError::rejected(formula, "`attacker` must be an entity")),
        };

        Ok(Self {
            is_hit: field("hit").expect_bool(formula)?,
            description: field("description").expect_text(formula)?,
            damage_to_defender: damage("damage_to_defender")?,
            damage_to_attacker: damage("damage_to_attacker")?,
            attacker,
        })
    }
}
