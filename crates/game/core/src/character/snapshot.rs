use std::collections::BTreeMap;

use rust_decimal::Decimal;

use super::{Character, CharacterAction, Role, StatusTimer};
use crate::content::{AbilityId, CreatureId, ItemId, StatusId};
use crate::entity::{Entity, EntitySnapshot};
use crate::error::{ConfigError, RulesError};
use crate::modifier::ModifierRegistry;
use crate::script::Formula;
use crate::stats::AttributeSet;

/// Persistent form of a [`Character`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CharacterSnapshot {
    pub entity: EntitySnapshot,
    pub role: Role,
    pub name: String,
    pub level: Decimal,
    pub current_health: Decimal,
    pub action_meter: Decimal,
    pub xp: Decimal,
    pub gold: Decimal,
    pub attributes: AttributeSet,
    pub attack: Formula,
    pub action: CharacterAction,
    pub creature: Option<CreatureId>,
    pub statuses: BTreeMap<StatusId, StatusTimer>,
    pub items: BTreeMap<String, Vec<ItemId>>,
    pub abilities: Vec<AbilityId>,
}

impl Character {
    pub fn snapshot(&self) -> CharacterSnapshot {
        CharacterSnapshot {
            entity: self.entity.snapshot(),
            role: self.role,
            name: self.name.clone(),
            level: self.level,
            current_health: self.current_health,
            action_meter: self.action_meter,
            xp: self.xp,
            gold: self.gold,
            attributes: self.attributes.clone(),
            attack: self.attack.clone(),
            action: self.action,
            creature: self.creature,
            statuses: self.statuses.clone(),
            items: self.items.clone(),
            abilities: self.abilities.clone(),
        }
    }

    /// Rebuilds a character. Modifier ids attached to attributes must resolve
    /// just like the entity's own applied list.
    pub fn restore(
        snapshot: CharacterSnapshot,
        registry: &ModifierRegistry,
    ) -> Result<Self, RulesError> {
        if let Some(missing) = snapshot
            .attributes
            .iter()
            .flat_map(|(_, attribute)| attribute.modifiers().iter())
            .map(|attached| attached.id)
            .find(|id| !registry.contains(*id))
        {
            return Err(ConfigError::UnknownModifier(missing).into());
        }

        Ok(Self {
            entity: Entity::restore(snapshot.entity, registry)?,
            role: snapshot.role,
            name: snapshot.name,
            level: snapshot.level,
            current_health: snapshot.current_health,
            action_meter: snapshot.action_meter,
            xp: snapshot.xp,
            gold: snapshot.gold,
            attributes: snapshot.attributes,
            attack: snapshot.attack,
            action: snapshot.action,
            creature: snapshot.creature,
            statuses: snapshot.statuses,
            items: snapshot.items,
            abilities: snapshot.abilities,
        })
    }
}
