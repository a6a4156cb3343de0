use tracing::debug;

use super::target::{Target, WriteError};
use super::{Modifier, Transform};
use crate::entity::Modifiable;
use crate::error::{ConfigError, RulesError, ScriptError};
use crate::script::{Formula, ScriptHost, Shape};
use crate::stats::AttributeBonus;
use crate::value::{Bindings, Value};

/// Applies `modifier` to `target` and records its id.
///
/// Returns `Ok(false)` without touching anything when the target cannot
/// carry modifiers or already has this one applied.
pub fn add_modifier<T: Modifiable>(
    target: &mut T,
    modifier: &Modifier,
    scripts: &dyn ScriptHost,
) -> Result<bool, RulesError> {
    let entity = target.entity();
    if !entity.modifiers_enabled() || entity.has_modifier(modifier.id) {
        return Ok(false);
    }

    let slot = T::fields().resolve(&modifier.target)?;
    match &slot {
        Target::Attribute(field) => {
            let bonus = attribute_bonus(modifier)?;
            field.get_mut(target).add_modifier(modifier.id, bonus);
        }
        _ => apply_transform(target, &slot, modifier, &modifier.apply, scripts)?,
    }

    target.entity_mut().record_modifier(modifier.id);
    debug!(
        target: "rules::modifier",
        entity = %target.entity().id(),
        modifier = %modifier.id,
        selector = %modifier.target,
        "applied"
    );
    Ok(true)
}

/// Reverses `modifier` on `target` if it is applied.
///
/// The unapply transform runs only when the id was actually recorded;
/// otherwise this is a no-op returning `Ok(false)`.
pub fn remove_modifier<T: Modifiable>(
    target: &mut T,
    modifier: &Modifier,
    scripts: &dyn ScriptHost,
) -> Result<bool, RulesError> {
    if !target.entity().has_modifier(modifier.id) {
        return Ok(false);
    }

    if let Some(unapply) = &modifier.unapply {
        let slot = T::fields().resolve(&modifier.target)?;
        match &slot {
            Target::Attribute(field) => {
                field.get_mut(target).remove_modifier(modifier.id);
            }
            _ => apply_transform(target, &slot, modifier, unapply, scripts)?,
        }
    }

    target.entity_mut().forget_modifier(modifier.id);
    debug!(
        target: "rules::modifier",
        entity = %target.entity().id(),
        modifier = %modifier.id,
        "removed"
    );
    Ok(true)
}

/// Recomputes every calculated property of `target`.
///
/// All formulas see the same `this` view, taken before any property is
/// written, so the outcome does not depend on declaration order.
pub fn recalculate<T: Modifiable>(
    target: &mut T,
    scripts: &dyn ScriptHost,
) -> Result<(), RulesError> {
    if target.entity().calculated().is_empty() {
        return Ok(());
    }

    let properties = target.entity().calculated().to_vec();
    let this = Value::Table(target.view(scripts)?);
    let fields = T::fields();

    let mut results = Vec::with_capacity(properties.len());
    for property in &properties {
        let slot = fields.resolve(&property.field)?;
        let current = slot.read(target).ok_or_else(|| ConfigError::ReadOnlyField {
            selector: property.field.clone(),
        })?;
        let bindings = Bindings::new()
            .with("this", this.clone())
            .with("value", current);
        let value = scripts.evaluate(&property.formula, &bindings)?;
        results.push((slot, &property.formula, &property.field, value));
    }

    for (slot, formula, field, value) in results {
        write_scripted(target, &slot, formula, field, value)?;
    }
    Ok(())
}

/// Evaluates an initializer and writes each `selector => value` entry of the
/// returned table onto `target`.
pub fn apply_initializer<T: Modifiable>(
    target: &mut T,
    initializer: &Formula,
    bindings: &Bindings,
    scripts: &dyn ScriptHost,
) -> Result<(), RulesError> {
    let assignments = scripts
        .evaluate(initializer, bindings)?
        .expect_table(initializer)?;
    let fields = T::fields();
    for (selector, value) in assignments {
        let slot = fields.resolve(&selector)?;
        write_scripted(target, &slot, initializer, &selector, value)?;
    }
    Ok(())
}

fn attribute_bonus(modifier: &Modifier) -> Result<AttributeBonus, RulesError> {
    match &modifier.apply {
        Transform::Offset(amount) => Ok(AttributeBonus::Additive(*amount)),
        Transform::Scale(ratio) => Ok(AttributeBonus::Multiplicative(*ratio)),
        Transform::Unscale(ratio) => rust_decimal::Decimal::ONE
            .checked_div(*ratio)
            .map(AttributeBonus::Multiplicative)
            .ok_or_else(|| invalid(modifier, "division by zero")),
        Transform::Script(formula) => Ok(AttributeBonus::Scripted(formula.clone())),
        Transform::Assign(_) => Err(invalid(modifier, "attributes cannot be assigned")),
    }
}

fn apply_transform<T: Modifiable>(
    target: &mut T,
    slot: &Target<'_, T>,
    modifier: &Modifier,
    transform: &Transform,
    scripts: &dyn ScriptHost,
) -> Result<(), RulesError> {
    let current = slot.read(target).unwrap_or_default();

    let next = match transform {
        Transform::Offset(amount) => number(modifier, &current)?
            .checked_add(*amount)
            .map(Value::Number)
            .ok_or_else(|| invalid(modifier, "result overflows"))?,
        Transform::Scale(ratio) => number(modifier, &current)?
            .checked_mul(*ratio)
            .map(Value::Number)
            .ok_or_else(|| invalid(modifier, "result overflows"))?,
        Transform::Unscale(ratio) => number(modifier, &current)?
            .checked_div(*ratio)
            .map(Value::Number)
            .ok_or_else(|| invalid(modifier, "division by zero"))?,
        Transform::Assign(value) => value.clone(),
        Transform::Script(formula) => {
            let this = Value::Table(target.view(scripts)?);
            let bindings = Bindings::new().with("this", this).with("value", current);
            let value = scripts.evaluate(formula, &bindings)?;
            return write_scripted(target, slot, formula, &modifier.target, value);
        }
    };

    slot.write(target, next).map_err(|err| match err {
        WriteError::Expected(Shape::Bool) => invalid(modifier, "flag fields take booleans"),
        WriteError::Expected(_) => invalid(modifier, "field takes a different value type"),
        WriteError::ReadOnly => ConfigError::ReadOnlyField {
            selector: modifier.target.clone(),
        }
        .into(),
    })
}

fn write_scripted<T: Modifiable>(
    target: &mut T,
    slot: &Target<'_, T>,
    formula: &Formula,
    selector: &str,
    value: Value,
) -> Result<(), RulesError> {
    let found = value.shape();
    slot.write(target, value).map_err(|err| match err {
        WriteError::Expected(expected) => ScriptError::wrong_shape(formula, expected, found).into(),
        WriteError::ReadOnly => ConfigError::ReadOnlyField {
            selector: selector.to_owned(),
        }
        .into(),
    })
}

fn number(modifier: &Modifier, value: &Value) -> Result<rust_decimal::Decimal, RulesError> {
    value
        .as_number()
        .ok_or_else(|| invalid(modifier, "numeric transforms need a numeric field"))
}

fn invalid(modifier: &Modifier, reason: &'static str) -> RulesError {
    RulesError::InvalidModifier {
        modifier: modifier.id,
        selector: modifier.target.clone(),
        reason,
    }
}
