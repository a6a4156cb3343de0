//! Content packs: modifiers and definitions authored as RON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use idle_core::{
    AbilityDefinition, CreatureDefinition, Definitions, EncounterDefinition, ItemDefinition,
    Modifier, ModifierRegistry, StatusDefinition,
};

use crate::error::{Result, RuntimeError};

/// Everything a simulation needs besides configuration.
///
/// Registration order matters: modifiers first, then creatures, so that
/// encounters, statuses, items and abilities can be checked against them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentPack {
    pub modifiers: Vec<Modifier>,
    pub creatures: Vec<CreatureDefinition>,
    pub encounters: Vec<EncounterDefinition>,
    pub statuses: Vec<StatusDefinition>,
    pub items: Vec<ItemDefinition>,
    pub abilities: Vec<AbilityDefinition>,
}

impl ContentPack {
    pub fn from_ron_str(source: &str) -> Result<Self> {
        ron::from_str(source).map_err(|e| RuntimeError::Ron(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path.as_ref())?;
        Self::from_ron_str(&source)
    }

    /// Registers the pack, rejecting duplicate modifiers and dangling
    /// references.
    pub fn into_registries(self) -> Result<(ModifierRegistry, Definitions)> {
        let mut modifiers = ModifierRegistry::new();
        for modifier in self.modifiers {
            modifiers.register(modifier).map_err(idle_core::RulesError::from)?;
        }

        let mut definitions = Definitions::new();
        for creature in self.creatures {
            definitions.add_creature(creature);
        }
        for encounter in self.encounters {
            definitions
                .add_encounter(encounter)
                .map_err(idle_core::RulesError::from)?;
        }
        for status in self.statuses {
            definitions
                .add_status(status, &modifiers)
                .map_err(idle_core::RulesError::from)?;
        }
        for item in self.items {
            definitions
                .add_item(item, &modifiers)
                .map_err(idle_core::RulesError::from)?;
        }
        for ability in self.abilities {
            definitions
                .add_ability(ability, &modifiers)
                .map_err(idle_core::RulesError::from)?;
        }

        tracing::debug!(
            target: "runtime::content",
            modifiers = modifiers.len(),
            encounters = definitions.encounter_count(),
            "content registered"
        );
        Ok((modifiers, definitions))
    }
}

#[cfg(test)]
mod tests {
    use idle_core::{ConfigError, RulesError};

    use super::*;

    const PACK: &str = r#"(
        modifiers: [
            (id: 1, target: "damage", apply: offset(3), unapply: Some(offset(-3))),
        ],
        creatures: [
            (id: 1, name: "slime", attributes: { maximum_health: 2 }),
        ],
        encounters: [
            (id: 1, creatures: [(creature: 1, level_offset: 0)]),
        ],
        items: [
            (id: 1, name: "club", slots: ["hands"], modifiers: [1]),
        ],
    )"#;

    #[test]
    fn pack_registers_content() {
        let pack = ContentPack::from_ron_str(PACK).unwrap();
        let (modifiers, definitions) = pack.into_registries().unwrap();

        assert_eq!(modifiers.len(), 1);
        assert_eq!(definitions.encounter_count(), 1);
        assert!(definitions.item(idle_core::ItemId(1)).is_ok());
    }

    #[test]
    fn dangling_modifier_reference_is_rejected() {
        let mut pack = ContentPack::from_ron_str(PACK).unwrap();
        pack.modifiers.clear();

        let err = pack.into_registries().unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Rules(RulesError::Config(ConfigError::UnknownModifier(_)))
        ));
    }
}
