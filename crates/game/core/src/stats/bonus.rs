//! Modifier stack attached to a single attribute.
//!
//! The stack is evaluated in a fixed order:
//! `(scaled base + Σ additive) × Π multiplicative`, then every scripted
//! transform is folded over that value in the order it was attached.
//!
//! Additive and multiplicative entries commute with each other. Scripted
//! entries do not, so their registration order is significant.

use rust_decimal::Decimal;

use crate::error::RulesError;
use crate::modifier::ModifierId;
use crate::script::{Formula, ScriptHost};
use crate::value::Bindings;

/// How an attached modifier changes the attribute total.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AttributeBonus {
    /// Summed onto the scaled base.
    Additive(Decimal),
    /// Multiplied into the total after all additive bonuses.
    Multiplicative(Decimal),
    /// Receives `value`, `base` and `level`, returns the new value.
    Scripted(Formula),
}

/// A bonus attached to an attribute, keyed by the modifier that attached it.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttributeModifier {
    pub id: ModifierId,
    pub bonus: AttributeBonus,
}

/// Ordered collection of attribute modifiers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct BonusStack {
    entries: Vec<AttributeModifier>,
}

impl BonusStack {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Attaches `bonus` under `id`. An existing entry with the same id is
    /// replaced in place and keeps its position.
    pub fn attach(&mut self, id: ModifierId, bonus: AttributeBonus) {
        match self.entries.iter_mut().find(|entry| entry.id == id) {
            Some(entry) => entry.bonus = bonus,
            None => self.entries.push(AttributeModifier { id, bonus }),
        }
    }

    /// Detaches the entry keyed by `id`. Returns `false` if none was attached.
    pub fn detach(&mut self, id: ModifierId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    pub fn contains(&self, id: ModifierId) -> bool {
        self.entries.iter().any(|entry| entry.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeModifier> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Applies the stack to `base` (already scaled by level).
    ///
    /// # Formula
    /// ```text
    /// value = (base + Σ additive) × Π multiplicative
    /// value = scripted_n(... scripted_1(value))
    /// ```
    ///
    /// Leaving the decimal range is [`RulesError::Overflow`].
    pub fn apply(
        &self,
        base: Decimal,
        level: Decimal,
        scripts: &dyn ScriptHost,
    ) -> Result<Decimal, RulesError> {
        let additive = self
            .entries
            .iter()
            .filter_map(|entry| match entry.bonus {
                AttributeBonus::Additive(amount) => Some(amount),
                _ => None,
            })
            .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(amount))
            .ok_or(RulesError::overflow("additive bonus sum"))?;

        let ratio = self
            .entries
            .iter()
            .filter_map(|entry| match entry.bonus {
                AttributeBonus::Multiplicative(ratio) => Some(ratio),
                _ => None,
            })
            .try_fold(Decimal::ONE, |acc, ratio| acc.checked_mul(ratio))
            .ok_or(RulesError::overflow("multiplicative bonus product"))?;

        let combined = base
            .checked_add(additive)
            .and_then(|value| value.checked_mul(ratio))
            .ok_or(RulesError::overflow("attribute total"))?;

        self.entries
            .iter()
            .filter_map(|entry| match &entry.bonus {
                AttributeBonus::Scripted(formula) => Some(formula),
                _ => None,
            })
            .try_fold(combined, |value, formula| -> Result<Decimal, RulesError> {
                let bindings = Bindings::new()
                    .with("value", value)
                    .with("base", base)
                    .with("level", level);
                Ok(scripts.evaluate(formula, &bindings)?.expect_number(formula)?)
            })
    }
}
