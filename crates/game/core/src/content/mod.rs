//! Content definitions: creatures, encounters, statuses, items and abilities.
//!
//! Definitions are validated when registered so that a simulation built from
//! a [`Definitions`] registry never meets a dangling reference mid-tick.

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;

use crate::error::ConfigError;
use crate::modifier::{ModifierId, ModifierRegistry};
use crate::script::Formula;
use crate::stats::AttributeKind;
use crate::value::Table;

macro_rules! definition_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

definition_id!(
    /// Identifier of a [`CreatureDefinition`].
    CreatureId
);
definition_id!(
    /// Identifier of an [`EncounterDefinition`].
    EncounterDefId
);
definition_id!(StatusId);
definition_id!(ItemId);
definition_id!(AbilityId);

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CreatureDefinition {
    pub id: CreatureId,
    pub name: String,
    /// Multipliers over the configured creature base attributes. Kinds that
    /// are absent keep a multiplier of one.
    #[cfg_attr(feature = "serde", serde(default))]
    pub attributes: BTreeMap<AttributeKind, Decimal>,
    /// Copied into the generated creature's extra properties.
    #[cfg_attr(feature = "serde", serde(default))]
    pub properties: Table,
    /// Overrides the configured creature attack formula.
    #[cfg_attr(feature = "serde", serde(default))]
    pub attack: Option<Formula>,
    /// Applied to every generated creature.
    #[cfg_attr(feature = "serde", serde(default))]
    pub modifiers: Vec<ModifierId>,
}

impl CreatureDefinition {
    pub fn new(id: CreatureId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            attributes: BTreeMap::new(),
            properties: Table::new(),
            attack: None,
            modifiers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_attribute(mut self, kind: AttributeKind, multiplier: Decimal) -> Self {
        self.attributes.insert(kind, multiplier);
        self
    }

    pub fn multiplier(&self, kind: AttributeKind) -> Decimal {
        self.attributes.get(&kind).copied().unwrap_or(Decimal::ONE)
    }
}

/// One creature slot of an encounter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CreatureOption {
    pub creature: CreatureId,
    /// Added to the current stage to obtain the creature level.
    #[cfg_attr(feature = "serde", serde(default))]
    pub level_offset: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EncounterDefinition {
    pub id: EncounterDefId,
    pub creatures: Vec<CreatureOption>,
}

impl EncounterDefinition {
    pub fn new(id: EncounterDefId) -> Self {
        Self {
            id,
            creatures: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_creature(mut self, creature: CreatureId, level_offset: Decimal) -> Self {
        self.creatures.push(CreatureOption {
            creature,
            level_offset,
        });
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusDefinition {
    pub id: StatusId,
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub modifiers: Vec<ModifierId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemDefinition {
    pub id: ItemId,
    pub name: String,
    /// Equipment slots the item occupies. An item without slots always fits.
    #[cfg_attr(feature = "serde", serde(default))]
    pub slots: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub modifiers: Vec<ModifierId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AbilityDefinition {
    pub id: AbilityId,
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub modifiers: Vec<ModifierId>,
    /// Reaction formulas keyed by hook name (`is_attacking`,
    /// `is_being_attacked`). Each receives the pending attack outcome.
    #[cfg_attr(feature = "serde", serde(default))]
    pub triggers: BTreeMap<String, Vec<Formula>>,
}

impl AbilityDefinition {
    pub fn new(id: AbilityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            modifiers: Vec::new(),
            triggers: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_trigger(mut self, hook: &str, formula: Formula) -> Self {
        self.triggers.entry(hook.to_owned()).or_default().push(formula);
        self
    }

    pub fn triggers(&self, hook: &str) -> &[Formula] {
        self.triggers.get(hook).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Registry of all content definitions.
#[derive(Clone, Debug, Default)]
pub struct Definitions {
    creatures: BTreeMap<CreatureId, CreatureDefinition>,
    encounters: BTreeMap<EncounterDefId, EncounterDefinition>,
    statuses: BTreeMap<StatusId, StatusDefinition>,
    items: BTreeMap<ItemId, ItemDefinition>,
    abilities: BTreeMap<AbilityId, AbilityDefinition>,
}

impl Definitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_creature(&mut self, creature: CreatureDefinition) {
        self.creatures.insert(creature.id, creature);
    }

    /// Registers an encounter whose creatures are all already registered.
    pub fn add_encounter(&mut self, encounter: EncounterDefinition) -> Result<(), ConfigError> {
        if encounter.creatures.is_empty() {
            return Err(ConfigError::EmptyEncounter {
                encounter: encounter.id.0,
            });
        }
        if let Some(option) = encounter
            .creatures
            .iter()
            .find(|option| !self.creatures.contains_key(&option.creature))
        {
            return Err(ConfigError::UnknownCreature {
                encounter: encounter.id.0,
                creature: option.creature.0,
            });
        }
        self.encounters.insert(encounter.id, encounter);
        Ok(())
    }

    pub fn add_status(
        &mut self,
        status: StatusDefinition,
        modifiers: &ModifierRegistry,
    ) -> Result<(), ConfigError> {
        check_modifiers(&status.modifiers, modifiers)?;
        self.statuses.insert(status.id, status);
        Ok(())
    }

    pub fn add_item(
        &mut self,
        item: ItemDefinition,
        modifiers: &ModifierRegistry,
    ) -> Result<(), ConfigError> {
        check_modifiers(&item.modifiers, modifiers)?;
        self.items.insert(item.id, item);
        Ok(())
    }

    pub fn add_ability(
        &mut self,
        ability: AbilityDefinition,
        modifiers: &ModifierRegistry,
    ) -> Result<(), ConfigError> {
        check_modifiers(&ability.modifiers, modifiers)?;
        self.abilities.insert(ability.id, ability);
        Ok(())
    }

    /// At least one encounter must exist before a simulation can run.
    pub fn assert_ready(&self) -> Result<(), ConfigError> {
        if self.encounters.is_empty() {
            return Err(ConfigError::MissingEncounters);
        }
        Ok(())
    }

    pub fn creature(&self, id: CreatureId) -> Result<&CreatureDefinition, ConfigError> {
        self.creatures
            .get(&id)
            .ok_or(ConfigError::MissingCreature(id.0))
    }

    pub fn encounter(&self, id: EncounterDefId) -> Option<&EncounterDefinition> {
        self.encounters.get(&id)
    }

    /// Encounter definitions in id order.
    pub fn encounters(&self) -> impl Iterator<Item = &EncounterDefinition> {
        self.encounters.values()
    }

    pub fn encounter_count(&self) -> usize {
        self.encounters.len()
    }

    pub fn status(&self, id: StatusId) -> Result<&StatusDefinition, ConfigError> {
        self.statuses
            .get(&id)
            .ok_or(ConfigError::UnknownStatus(id.0))
    }

    pub fn item(&self, id: ItemId) -> Result<&ItemDefinition, ConfigError> {
        self.items.get(&id).ok_or(ConfigError::UnknownItem(id.0))
    }

    pub fn ability(&self, id: AbilityId) -> Result<&AbilityDefinition, ConfigError> {
        self.abilities
            .get(&id)
            .ok_or(ConfigError::UnknownAbility(id.0))
    }
}

fn check_modifiers(ids: &[ModifierId], registry: &ModifierRegistry) -> Result<(), ConfigError> {
    match ids.iter().find(|id| !registry.contains(**id)) {
        Some(missing) => Err(ConfigError::UnknownModifier(*missing)),
        None => Ok(()),
    }
}
