//! Numeric attribute: a level-scaled base plus an ordered modifier stack.

use rust_decimal::Decimal;

use super::bonus::{AttributeBonus, BonusStack};
use crate::error::RulesError;
use crate::modifier::ModifierId;
use crate::script::ScriptHost;

/// A numeric quantity on a character.
///
/// The total is never cached; [`Attribute::total`] recomputes it from the
/// base, the owner's current level and every attached modifier.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Attribute {
    pub base_value: Decimal,
    pub change_per_level: Decimal,
    modifiers: BonusStack,
}

impl Attribute {
    pub fn new(base_value: Decimal, change_per_level: Decimal) -> Self {
        Self {
            base_value,
            change_per_level,
            modifiers: BonusStack::new(),
        }
    }

    pub const fn empty() -> Self {
        Self {
            base_value: Decimal::ZERO,
            change_per_level: Decimal::ZERO,
            modifiers: BonusStack::new(),
        }
    }

    pub fn with_base(base_value: Decimal) -> Self {
        Self::new(base_value, Decimal::ZERO)
    }

    /// `base_value + level × change_per_level`, before modifiers.
    pub fn scaled_base(&self, level: Decimal) -> Result<Decimal, RulesError> {
        level
            .checked_mul(self.change_per_level)
            .and_then(|growth| self.base_value.checked_add(growth))
            .ok_or(RulesError::overflow("level-scaled base"))
    }

    /// Current total at `level`. See [`BonusStack::apply`] for the order.
    pub fn total(&self, level: Decimal, scripts: &dyn ScriptHost) -> Result<Decimal, RulesError> {
        self.modifiers.apply(self.scaled_base(level)?, level, scripts)
    }

    /// Attaches a modifier. Re-attaching an id replaces its bonus.
    pub fn add_modifier(&mut self, id: ModifierId, bonus: AttributeBonus) {
        self.modifiers.attach(id, bonus);
    }

    /// Detaches a modifier; a no-op returning `false` if it is not attached.
    pub fn remove_modifier(&mut self, id: ModifierId) -> bool {
        self.modifiers.detach(id)
    }

    pub fn has_modifier(&self, id: ModifierId) -> bool {
        self.modifiers.contains(id)
    }

    pub fn modifiers(&self) -> &BonusStack {
        &self.modifiers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScriptError;
    use crate::script::{Formula, NativeScripts};
    use crate::value::Value;

    fn d(n: i64) -> Decimal {
        Decimal::from(n)
    }

    #[test]
    fn total_scales_base_by_level() {
        let scripts = NativeScripts::new();
        let attribute = Attribute::new(d(10), d(2));

        // 10 + 3 * 2 = 16
        assert_eq!(attribute.total(d(3), &scripts).unwrap(), d(16));
    }

    #[test]
    fn additive_then_multiplicative() {
        let scripts = NativeScripts::new();
        let mut attribute = Attribute::with_base(d(10));
        attribute.add_modifier(ModifierId(1), AttributeBonus::Multiplicative(d(2)));
        attribute.add_modifier(ModifierId(2), AttributeBonus::Additive(d(5)));

        // (10 + 5) * 2 = 30, regardless of attach order
        assert_eq!(attribute.total(d(1), &scripts).unwrap(), d(30));

        let mut reordered = Attribute::with_base(d(10));
        reordered.add_modifier(ModifierId(2), AttributeBonus::Additive(d(5)));
        reordered.add_modifier(ModifierId(1), AttributeBonus::Multiplicative(d(2)));
        assert_eq!(reordered.total(d(1), &scripts).unwrap(), d(30));
    }

    #[test]
    fn scripted_transforms_fold_in_attach_order() {
        let scripts = NativeScripts::new()
            .with("plus_three", |f, b| Ok(Value::Number(b.number(f, "value")? + d(3))))
            .with("triple", |f, b| Ok(Value::Number(b.number(f, "value")? * d(3))));

        let mut attribute = Attribute::with_base(d(2));
        attribute.add_modifier(ModifierId(1), AttributeBonus::Scripted(Formula::new("plus_three")));
        attribute.add_modifier(ModifierId(2), AttributeBonus::Scripted(Formula::new("triple")));
        // (2 + 3) * 3 = 15
        assert_eq!(attribute.total(Decimal::ZERO, &scripts).unwrap(), d(15));

        let mut reversed = Attribute::with_base(d(2));
        reversed.add_modifier(ModifierId(2), AttributeBonus::Scripted(Formula::new("triple")));
        reversed.add_modifier(ModifierId(1), AttributeBonus::Scripted(Formula::new("plus_three")));
        // 2 * 3 + 3 = 9
        assert_eq!(reversed.total(Decimal::ZERO, &scripts).unwrap(), d(9));
    }

    #[test]
    fn scripted_transforms_run_after_ratios() {
        let scripts =
            NativeScripts::new().with("plus_one", |f, b| Ok(Value::Number(b.number(f, "value")? + d(1))));

        let mut attribute = Attribute::with_base(d(4));
        attribute.add_modifier(ModifierId(1), AttributeBonus::Scripted(Formula::new("plus_one")));
        attribute.add_modifier(ModifierId(2), AttributeBonus::Multiplicative(d(2)));

        // 4 * 2 + 1 = 9
        assert_eq!(attribute.total(Decimal::ZERO, &scripts).unwrap(), d(9));
    }

    #[test]
    fn remove_restores_total() {
        let scripts = NativeScripts::new();
        let mut attribute = Attribute::with_base(d(10));
        attribute.add_modifier(ModifierId(7), AttributeBonus::Additive(d(4)));
        assert_eq!(attribute.total(Decimal::ZERO, &scripts).unwrap(), d(14));

        assert!(attribute.remove_modifier(ModifierId(7)));
        assert!(!attribute.remove_modifier(ModifierId(7)));
        assert_eq!(attribute.total(Decimal::ZERO, &scripts).unwrap(), d(10));
    }

    #[test]
    fn scripted_transform_with_wrong_shape_fails() {
        let scripts = NativeScripts::new().with_constant("broken", "ten");
        let mut attribute = Attribute::with_base(d(1));
        attribute.add_modifier(ModifierId(1), AttributeBonus::Scripted(Formula::new("broken")));

        assert!(matches!(
            attribute.total(Decimal::ZERO, &scripts),
            Err(RulesError::Script(ScriptError::WrongShape { .. }))
        ));
    }

    #[test]
    fn overflowing_total_is_an_error() {
        let scripts = NativeScripts::new();
        let mut attribute = Attribute::with_base(Decimal::MAX / d(2));
        attribute.add_modifier(ModifierId(1), AttributeBonus::Multiplicative(d(3)));

        let err = attribute.total(Decimal::ZERO, &scripts).unwrap_err();
        assert_eq!(err, RulesError::overflow("attribute total"));
        assert_eq!(err.error_code(), "NUMERIC_OVERFLOW");

        let stacked = {
            let mut attribute = Attribute::with_base(d(1));
            attribute.add_modifier(ModifierId(1), AttributeBonus::Additive(Decimal::MAX));
            attribute.add_modifier(ModifierId(2), AttributeBonus::Additive(Decimal::MAX));
            attribute
        };
        assert_eq!(
            stacked.total(Decimal::ZERO, &scripts).unwrap_err(),
            RulesError::overflow("additive bonus sum")
        );
    }

    #[test]
    fn overflowing_level_growth_is_an_error() {
        let scripts = NativeScripts::new();
        let attribute = Attribute::new(d(1), Decimal::MAX);

        assert_eq!(
            attribute.total(d(2), &scripts).unwrap_err(),
            RulesError::overflow("level-scaled base")
        );
    }
}
