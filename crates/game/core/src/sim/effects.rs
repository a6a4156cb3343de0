//! Statuses, items and abilities. Each carries a list of modifiers applied
//! while the character holds it.

use rust_decimal::Decimal;
use tracing::debug;

use super::Simulation;
use crate::character::{StatusTimer, UNSLOTTED};
use crate::content::{AbilityId, ItemId, StatusId};
use crate::entity::EntityId;
use crate::error::RulesError;
use crate::events::{
    ABILITY_ADDED, ABILITY_REMOVED, ITEM_ADDED, ITEM_REMOVED, STATUS_ADDED, STATUS_REMOVED,
};
use crate::table;

impl Simulation {
    /// Applies a status for `duration` seconds. A non-positive duration never
    /// expires. Re-adding a held status only restarts its timer and returns
    /// `false`.
    pub fn add_status(
        &mut self,
        target: EntityId,
        status: StatusId,
        duration: Decimal,
    ) -> Result<bool, RulesError> {
        let modifiers = self.definitions.status(status)?.modifiers.clone();
        let character = self.require_mut(target)?;
        if let Some(timer) = character.statuses_mut().get_mut(&status) {
            *timer = StatusTimer::new(duration);
            return Ok(false);
        }
        character.statuses_mut().insert(status, StatusTimer::new(duration));

        self.apply_modifiers(target, &modifiers)?;
        debug!(target: "rules::effects", %target, %status, duration = %duration, "status added");
        self.emit_from(
            target,
            STATUS_ADDED,
            table! {
                "character" => target,
                "status" => Decimal::from(status.0),
                "duration" => duration,
            },
        )?;
        Ok(true)
    }

    pub fn remove_status(&mut self, target: EntityId, status: StatusId) -> Result<bool, RulesError> {
        let modifiers = self.definitions.status(status)?.modifiers.clone();
        if self.require_mut(target)?.statuses_mut().remove(&status).is_none() {
            return Ok(false);
        }

        self.unapply_modifiers(target, &modifiers)?;
        debug!(target: "rules::effects", %target, %status, "status removed");
        self.emit_from(
            target,
            STATUS_REMOVED,
            table! { "character" => target, "status" => Decimal::from(status.0) },
        )?;
        Ok(true)
    }

    /// Equips an item in every slot it occupies.
    ///
    /// Returns `false` when the item is already equipped or one of its slots
    /// is full. Items without slots go to the unlimited bag.
    pub fn add_item(&mut self, target: EntityId, item: ItemId) -> Result<bool, RulesError> {
        let definition = self.definitions.item(item)?;
        let modifiers = definition.modifiers.clone();
        let slots = if definition.slots.is_empty() {
            vec![UNSLOTTED.to_owned()]
        } else {
            definition.slots.clone()
        };

        let character = self.roster.get_mut(target).ok_or(RulesError::UnknownEntity(target))?;
        if character.has_item(item) {
            return Ok(false);
        }
        let full = slots.iter().find(|slot| {
            slot.as_str() != UNSLOTTED
                && character.items(slot).len() >= self.config.slot_capacity(slot) as usize
        });
        if let Some(slot) = full {
            debug!(target: "rules::effects", %target, %item, slot = %slot, "slot full");
            return Ok(false);
        }
        for slot in &slots {
            character.items_mut().entry(slot.clone()).or_default().push(item);
        }

        self.apply_modifiers(target, &modifiers)?;
        debug!(target: "rules::effects", %target, %item, "item added");
        self.emit_from(
            target,
            ITEM_ADDED,
            table! { "character" => target, "item" => Decimal::from(item.0) },
        )?;
        Ok(true)
    }

    pub fn remove_item(&mut self, target: EntityId, item: ItemId) -> Result<bool, RulesError> {
        let modifiers = self.definitions.item(item)?.modifiers.clone();
        let character = self.require_mut(target)?;
        if !character.has_item(item) {
            return Ok(false);
        }
        let items = character.items_mut();
        for held in items.values_mut() {
            held.retain(|equipped| *equipped != item);
        }
        items.retain(|_, held| !held.is_empty());

        self.unapply_modifiers(target, &modifiers)?;
        debug!(target: "rules::effects", %target, %item, "item removed");
        self.emit_from(
            target,
            ITEM_REMOVED,
            table! { "character" => target, "item" => Decimal::from(item.0) },
        )?;
        Ok(true)
    }

    pub fn add_ability(&mut self, target: EntityId, ability: AbilityId) -> Result<bool, RulesError> {
        let modifiers = self.definitions.ability(ability)?.modifiers.clone();
        let character = self.require_mut(target)?;
        if character.has_ability(ability) {
            return Ok(false);
        }
        character.abilities_mut().push(ability);

        self.apply_modifiers(target, &modifiers)?;
        debug!(target: "rules::effects", %target, %ability, "ability added");
        self.emit_from(
            target,
            ABILITY_ADDED,
            table! { "character" => target, "ability" => Decimal::from(ability.0) },
        )?;
        Ok(true)
    }

    pub fn remove_ability(
        &mut self,
        target: EntityId,
        ability: AbilityId,
    ) -> Result<bool, RulesError> {
        let modifiers = self.definitions.ability(ability)?.modifiers.clone();
        let character = self.require_mut(target)?;
        if !character.has_ability(ability) {
            return Ok(false);
        }
        character.abilities_mut().retain(|held| *held != ability);

        self.unapply_modifiers(target, &modifiers)?;
        debug!(target: "rules::effects", %target, %ability, "ability removed");
        self.emit_from(
            target,
            ABILITY_REMOVED,
            table! { "character" => target, "ability" => Decimal::from(ability.0) },
        )?;
        Ok(true)
    }
}
