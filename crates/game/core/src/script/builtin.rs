//! Built-in rules formulas.
//!
//! These reproduce the default content of the rules module: the standard
//! attack roll, the three outcome formulas, the creature and player
//! validators, level scaling, and kill rewards. Content may override any of
//! them by registering a closure under the same name.

use rust_decimal::Decimal;

use super::{Formula, NativeScripts};
use crate::combat::{AttackOutcome, damage, hit};
use crate::error::ScriptError;
use crate::value::{Bindings, Value};

pub const ATTACK: &str = "rpg.attack";
pub const OUTCOME_HIT: &str = "rpg.outcome.hit";
pub const OUTCOME_MISS: &str = "rpg.outcome.miss";
pub const OUTCOME_CRITICAL_HIT: &str = "rpg.outcome.critical_hit";
pub const CREATURE_VALIDATE: &str = "rpg.creature.validate";
pub const CREATURE_SCALE: &str = "rpg.creature.scale";
pub const CREATURE_XP: &str = "rpg.creature.xp";
pub const CREATURE_GOLD: &str = "rpg.creature.gold";
pub const PLAYER_VALIDATE: &str = "rpg.player.validate";

const REWARD_PER_LEVEL: i64 = 10;

pub(crate) fn register(scripts: &mut NativeScripts) {
    scripts
        .register(ATTACK, |formula, b| {
            let chance = hit::calculate_hit_chance(
                b.number(formula, "configuration.base_tohit")?,
                b.number(formula, "attacker.accuracy")?,
                b.number(formula, "defender.evasion")?,
            );
            let tag = hit::select_tag(
                chance,
                b.number(formula, "roll")?,
                b.number(formula, "attacker.critical_hit_chance")?,
                b.number(formula, "critical_roll")?,
            );
            Ok(Value::from(tag))
        })
        .register(OUTCOME_HIT, |formula, b| {
            let amount = damage::hit_damage(
                b.number(formula, "attacker.damage")?,
                b.number(formula, "defender.defense")?,
                b.number(formula, "configuration.minimum_attack_damage")?,
            );
            outcome(formula, b, true, hit::HIT, amount)
        })
        .register(OUTCOME_MISS, |formula, b| {
            outcome(formula, b, false, hit::MISS, Decimal::ZERO)
        })
        .register(OUTCOME_CRITICAL_HIT, |formula, b| {
            let amount = damage::critical_damage(
                b.number(formula, "attacker.damage")?,
                b.number(formula, "defender.defense")?,
                b.number(formula, "attacker.critical_damage_multiplier")?,
            );
            outcome(formula, b, true, hit::CRITICAL_HIT, amount)
        })
        .register(CREATURE_VALIDATE, |formula, b| {
            positive_health(formula, b, "creature")
        })
        .register(PLAYER_VALIDATE, |formula, b| {
            positive_health(formula, b, "player")
        })
        .register(CREATURE_SCALE, |formula, b| {
            let scaled = b
                .number(formula, "value")?
                .checked_mul(b.number(formula, "level")?)
                .ok_or_else(|| overflow(formula))?;
            Ok(Value::Number(scaled))
        })
        .register(CREATURE_XP, |formula, b| reward(formula, b))
        .register(CREATURE_GOLD, |formula, b| reward(formula, b));
}

fn outcome(
    formula: &Formula,
    bindings: &Bindings,
    is_hit: bool,
    description: &str,
    damage_to_defender: Decimal,
) -> Result<Value, ScriptError> {
    let attacker = bindings
        .entity("attacker.id")
        .ok_or_else(|| ScriptError::rejected(formula, "attacker.id is not bound"))?;
    let outcome = AttackOutcome {
        is_hit,
        description: description.to_owned(),
        damage_to_defender,
        damage_to_attacker: Decimal::ZERO,
        attacker,
    };
    Ok(outcome.to_value())
}

fn positive_health(
    formula: &Formula,
    bindings: &Bindings,
    subject: &str,
) -> Result<Value, ScriptError> {
    let health = bindings.number(formula, &format!("{subject}.maximum_health"))?;
    Ok(Value::Bool(health > Decimal::ZERO))
}

fn reward(formula: &Formula, bindings: &Bindings) -> Result<Value, ScriptError> {
    let level = bindings.number(formula, "creature.level")?;
    level
        .checked_mul(Decimal::from(REWARD_PER_LEVEL))
        .map(Value::Number)
        .ok_or_else(|| overflow(formula))
}

fn overflow(formula: &Formula) -> ScriptError {
    ScriptError::rejected(formula, "result overflows the decimal range")
}
