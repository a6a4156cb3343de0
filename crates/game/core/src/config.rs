//! Rules configuration constants and tunable parameters.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use strum::IntoEnumIterator;

use crate::script::{Formula, builtin};
use crate::stats::AttributeKind;
use crate::value::{Table, Value};

/// Player generation settings.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PlayerConfig {
    pub name: String,
    pub starting_level: Decimal,
    pub base_attributes: BTreeMap<AttributeKind, Decimal>,
    /// Growth per level, copied into each attribute's `change_per_level`.
    pub attributes_per_level: BTreeMap<AttributeKind, Decimal>,
    pub attack: Formula,
    /// Returns a table of field selector to value written onto the freshly
    /// generated player.
    pub initializer: Option<Formula>,
    /// Must return `true` for the generated player to be accepted.
    pub validator: Option<Formula>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        let per_level = AttributeKind::iter()
            .map(|kind| {
                let growth = match kind {
                    AttributeKind::MaximumHealth => Decimal::from(5),
                    AttributeKind::Regeneration | AttributeKind::ResurrectionMultiplier => {
                        Decimal::new(5, 1)
                    }
                    _ => Decimal::ONE,
                };
                (kind, growth)
            })
            .collect();

        Self {
            name: "player".to_owned(),
            starting_level: Decimal::ONE,
            base_attributes: RulesConfig::creature_base_attributes()
                .into_iter()
                .map(|(kind, value)| (kind, value * Decimal::TWO))
                .collect(),
            attributes_per_level: per_level,
            attack: Formula::new(builtin::ATTACK),
            initializer: None,
            validator: Some(Formula::new(builtin::PLAYER_VALIDATE)),
        }
    }
}

/// Creature generation settings.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CreatureConfig {
    pub base_attributes: BTreeMap<AttributeKind, Decimal>,
    /// Receives `value`, `level` and `attribute`, returns the scaled base.
    pub scaling: Formula,
    /// Same contract as [`PlayerConfig::initializer`], run per creature.
    pub initializer: Option<Formula>,
    pub validator: Formula,
    pub attack: Formula,
    /// Experience awarded to the player on a kill. `None` awards nothing.
    pub xp_value: Option<Formula>,
    pub gold_value: Option<Formula>,
}

impl Default for CreatureConfig {
    fn default() -> Self {
        Self {
            base_attributes: RulesConfig::creature_base_attributes(),
            scaling: Formula::new(builtin::CREATURE_SCALE),
            initializer: None,
            validator: Formula::new(builtin::CREATURE_VALIDATE),
            attack: Formula::new(builtin::ATTACK),
            xp_value: Some(Formula::new(builtin::CREATURE_XP)),
            gold_value: Some(Formula::new(builtin::CREATURE_GOLD)),
        }
    }
}

/// Rules configuration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RulesConfig {
    /// Meter a character must accumulate before it acts.
    pub action_meter_required_to_act: Decimal,
    pub base_tohit: Decimal,
    pub minimum_attack_damage: Decimal,
    /// Seconds between one encounter resolving and the next starting.
    pub next_encounter_delay: f64,
    /// Equipment slot name to capacity.
    pub item_slots: BTreeMap<String, u32>,
    pub player: PlayerConfig,
    pub creatures: CreatureConfig,
    /// Attack tag to outcome formula.
    pub outcomes: BTreeMap<String, Formula>,
}

impl RulesConfig {
    // ===== runtime-tunable defaults =====
    pub const DEFAULT_ACTION_METER_REQUIRED_TO_ACT: i64 = 2;
    pub const DEFAULT_BASE_TOHIT: i64 = 90;
    pub const DEFAULT_MINIMUM_ATTACK_DAMAGE: i64 = 1;
    pub const DEFAULT_NEXT_ENCOUNTER_DELAY: f64 = 0.5;
    pub const DEFAULT_ITEM_SLOTS: [&'static str; 9] = [
        "head", "neck", "body", "back", "arms", "hands", "legs", "feet", "fingers",
    ];

    pub fn new() -> Self {
        Self {
            action_meter_required_to_act: Decimal::from(Self::DEFAULT_ACTION_METER_REQUIRED_TO_ACT),
            base_tohit: Decimal::from(Self::DEFAULT_BASE_TOHIT),
            minimum_attack_damage: Decimal::from(Self::DEFAULT_MINIMUM_ATTACK_DAMAGE),
            next_encounter_delay: Self::DEFAULT_NEXT_ENCOUNTER_DELAY,
            item_slots: Self::DEFAULT_ITEM_SLOTS
                .iter()
                .map(|slot| ((*slot).to_owned(), 1))
                .collect(),
            player: PlayerConfig::default(),
            creatures: CreatureConfig::default(),
            outcomes: [
                ("hit", builtin::OUTCOME_HIT),
                ("miss", builtin::OUTCOME_MISS),
                ("critical hit", builtin::OUTCOME_CRITICAL_HIT),
            ]
            .into_iter()
            .map(|(tag, formula)| (tag.to_owned(), Formula::new(formula)))
            .collect(),
        }
    }

    /// Base attributes of a level-one creature before definition multipliers.
    pub fn creature_base_attributes() -> BTreeMap<AttributeKind, Decimal> {
        AttributeKind::iter()
            .filter_map(|kind| {
                let value = match kind {
                    AttributeKind::ActionSpeed => 5,
                    AttributeKind::CriticalDamageMultiplier => 10,
                    AttributeKind::CriticalHitChance => 2,
                    AttributeKind::Regeneration | AttributeKind::ResurrectionMultiplier => {
                        return None;
                    }
                    _ => 10,
                };
                Some((kind, Decimal::from(value)))
            })
            .collect()
    }

    pub fn outcome(&self, tag: &str) -> Option<&Formula> {
        self.outcomes.get(tag)
    }

    /// Capacity of an equipment slot; unknown slots hold nothing.
    pub fn slot_capacity(&self, slot: &str) -> u32 {
        self.item_slots.get(slot).copied().unwrap_or(0)
    }

    /// Numeric settings exposed to formulas as `configuration`.
    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.insert(
            "action_meter_required_to_act".into(),
            Value::Number(self.action_meter_required_to_act),
        );
        table.insert("base_tohit".into(), Value::Number(self.base_tohit));
        table.insert(
            "minimum_attack_damage".into(),
            Value::Number(self.minimum_attack_damage),
        );
        let delay = Decimal::try_from(self.next_encounter_delay).unwrap_or_default();
        table.insert("next_encounter_delay".into(), Value::Number(delay));
        table
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self::new()
    }
}
