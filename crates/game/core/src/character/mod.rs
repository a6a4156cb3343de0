//! Characters: the player and the creatures it fights.

mod snapshot;

use std::collections::BTreeMap;
use std::sync::OnceLock;

use rust_decimal::Decimal;
use strum::IntoEnumIterator;

use crate::content::{AbilityId, CreatureId, ItemId, StatusId};
use crate::entity::{Entity, EntityId, Modifiable};
use crate::error::RulesError;
use crate::modifier::FieldRegistry;
use crate::script::{Formula, ScriptHost};
use crate::stats::{Attribute, AttributeKind, AttributeSet};
use crate::value::{Table, Value};

pub use snapshot::CharacterSnapshot;

/// Which side of an encounter a character fights on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Role {
    Player,
    Creature,
}

/// What a character is currently doing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CharacterAction {
    Fighting,
    /// Dead and waiting for resurrection.
    Reincarnating,
}

/// Remaining duration of an applied status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusTimer {
    pub initial_time: Decimal,
    pub remaining_time: Decimal,
}

impl StatusTimer {
    pub fn new(duration: Decimal) -> Self {
        Self {
            initial_time: duration,
            remaining_time: duration,
        }
    }
}

/// Equipment slot used for items that occupy no named slot.
pub const UNSLOTTED: &str = "bag";

#[derive(Clone, Debug)]
pub struct Character {
    entity: Entity,
    pub role: Role,
    pub name: String,
    pub level: Decimal,
    pub current_health: Decimal,
    pub action_meter: Decimal,
    pub xp: Decimal,
    pub gold: Decimal,
    pub attributes: AttributeSet,
    /// Formula producing this character's attack tag.
    pub attack: Formula,
    pub action: CharacterAction,
    /// Definition the creature was generated from.
    pub creature: Option<CreatureId>,
    statuses: BTreeMap<StatusId, StatusTimer>,
    items: BTreeMap<String, Vec<ItemId>>,
    abilities: Vec<AbilityId>,
}

impl Character {
    pub fn new(id: EntityId, role: Role, level: Decimal, attack: Formula) -> Self {
        Self {
            entity: Entity::new(id),
            role,
            name: role.to_string(),
            level,
            current_health: Decimal::ZERO,
            action_meter: Decimal::ZERO,
            xp: Decimal::ZERO,
            gold: Decimal::ZERO,
            attributes: AttributeSet::new(),
            attack,
            action: CharacterAction::Fighting,
            creature: None,
            statuses: BTreeMap::new(),
            items: BTreeMap::new(),
            abilities: Vec::new(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.entity.id()
    }

    pub fn is_player(&self) -> bool {
        self.role == Role::Player
    }

    /// Alive while current health is above zero.
    pub fn is_alive(&self) -> bool {
        self.current_health > Decimal::ZERO
    }

    /// Current health clamped at zero for display.
    pub fn display_health(&self) -> Decimal {
        self.current_health.max(Decimal::ZERO)
    }

    pub fn attribute(&self, kind: AttributeKind) -> &Attribute {
        self.attributes.get(kind)
    }

    pub fn attribute_mut(&mut self, kind: AttributeKind) -> &mut Attribute {
        self.attributes.get_mut(kind)
    }

    /// Attribute total at the current level.
    pub fn total(&self, kind: AttributeKind, scripts: &dyn ScriptHost) -> Result<Decimal, RulesError> {
        self.attributes.get(kind).total(self.level, scripts)
    }

    /// Restores health to the maximum health total.
    pub fn restore_health(&mut self, scripts: &dyn ScriptHost) -> Result<(), RulesError> {
        self.current_health = self.total(AttributeKind::MaximumHealth, scripts)?;
        Ok(())
    }

    // ===== statuses =====

    pub fn statuses(&self) -> impl Iterator<Item = (StatusId, &StatusTimer)> {
        self.statuses.iter().map(|(id, timer)| (*id, timer))
    }

    pub fn status(&self, id: StatusId) -> Option<&StatusTimer> {
        self.statuses.get(&id)
    }

    pub fn has_status(&self, id: StatusId) -> bool {
        self.statuses.contains_key(&id)
    }

    pub(crate) fn statuses_mut(&mut self) -> &mut BTreeMap<StatusId, StatusTimer> {
        &mut self.statuses
    }

    // ===== items =====

    pub fn items(&self, slot: &str) -> &[ItemId] {
        self.items.get(slot).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn has_item(&self, id: ItemId) -> bool {
        self.items.values().any(|items| items.contains(&id))
    }

    pub fn equipped(&self) -> impl Iterator<Item = (&str, ItemId)> {
        self.items
            .iter()
            .flat_map(|(slot, items)| items.iter().map(move |id| (slot.as_str(), *id)))
    }

    pub(crate) fn items_mut(&mut self) -> &mut BTreeMap<String, Vec<ItemId>> {
        &mut self.items
    }

    // ===== abilities =====

    pub fn abilities(&self) -> &[AbilityId] {
        &self.abilities
    }

    pub fn has_ability(&self, id: AbilityId) -> bool {
        self.abilities.contains(&id)
    }

    pub(crate) fn abilities_mut(&mut self) -> &mut Vec<AbilityId> {
        &mut self.abilities
    }
}

impl Modifiable for Character {
    const KIND: &'static str = "character";

    fn entity(&self) -> &Entity {
        &self.entity
    }

    fn entity_mut(&mut self) -> &mut Entity {
        &mut self.entity
    }

    fn fields() -> &'static FieldRegistry<Self> {
        static FIELDS: OnceLock<FieldRegistry<Character>> = OnceLock::new();
        FIELDS.get_or_init(character_fields)
    }

    fn view(&self, scripts: &dyn ScriptHost) -> Result<Table, RulesError> {
        let mut view = self.entity.view();
        let role: &'static str = self.role.into();
        view.insert("role".into(), Value::from(role));
        view.insert("name".into(), Value::from(self.name.as_str()));
        view.insert("level".into(), Value::Number(self.level));
        view.insert("current_health".into(), Value::Number(self.current_health));
        view.insert("action_meter".into(), Value::Number(self.action_meter));
        view.insert("xp".into(), Value::Number(self.xp));
        view.insert("gold".into(), Value::Number(self.gold));
        view.insert("alive".into(), Value::Bool(self.is_alive()));
        for kind in AttributeKind::iter() {
            view.insert(kind.name().into(), Value::Number(self.total(kind, scripts)?));
        }
        Ok(view)
    }
}

fn character_fields() -> FieldRegistry<Character> {
    let registry = FieldRegistry::new()
        .number(
            "current_health",
            |c: &Character| c.current_health,
            |c: &mut Character, v| c.current_health = v,
        )
        .number(
            "action_meter",
            |c: &Character| c.action_meter,
            |c: &mut Character, v| c.action_meter = v,
        )
        .number("level", |c: &Character| c.level, |c: &mut Character, v| c.level = v)
        .number("xp", |c: &Character| c.xp, |c: &mut Character, v| c.xp = v)
        .number("gold", |c: &Character| c.gold, |c: &mut Character, v| c.gold = v);

    AttributeKind::iter().fold(registry, |registry, kind| {
        let name = kind.name();
        registry
            .attribute(
                name,
                move |c| c.attributes.get(kind),
                move |c| c.attributes.get_mut(kind),
            )
            .number(
                format!("{name}.base"),
                move |c: &Character| c.attributes.get(kind).base_value,
                move |c: &mut Character, v| c.attributes.get_mut(kind).base_value = v,
            )
            .number(
                format!("{name}.per_level"),
                move |c: &Character| c.attributes.get(kind).change_per_level,
                move |c: &mut Character, v| c.attributes.get_mut(kind).change_per_level = v,
            )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifier::{Modifier, ModifierId, add_modifier, recalculate, remove_modifier};
    use crate::script::NativeScripts;

    fn d(n: i64) -> Decimal {
        Decimal::from(n)
    }

    fn character() -> Character {
        let mut character = Character::new(EntityId(1), Role::Player, d(1), Formula::new("attack"));
        *character.attribute_mut(AttributeKind::MaximumHealth) = Attribute::new(d(20), d(5));
        character
    }

    #[test]
    fn aliveness_tracks_health() {
        let mut character = character();
        assert!(!character.is_alive());

        character.current_health = d(1);
        assert!(character.is_alive());

        character.current_health = d(-4);
        assert!(!character.is_alive());
        assert_eq!(character.display_health(), Decimal::ZERO);
    }

    #[test]
    fn restore_health_uses_level_scaled_total() {
        let scripts = NativeScripts::new();
        let mut character = character();
        character.level = d(2);

        character.restore_health(&scripts).unwrap();
        // 20 + 2 * 5 = 30
        assert_eq!(character.current_health, d(30));
    }

    #[test]
    fn attribute_selector_attaches_to_bonus_stack() {
        let scripts = NativeScripts::new();
        let mut character = character();
        let modifier = Modifier::additive(ModifierId(1), "maximum_health", d(10));

        add_modifier(&mut character, &modifier, &scripts).unwrap();
        // 20 + 1 * 5 + 10 = 35
        assert_eq!(
            character.total(AttributeKind::MaximumHealth, &scripts).unwrap(),
            d(35)
        );
        assert!(character.attribute(AttributeKind::MaximumHealth).has_modifier(ModifierId(1)));

        remove_modifier(&mut character, &modifier, &scripts).unwrap();
        assert_eq!(
            character.total(AttributeKind::MaximumHealth, &scripts).unwrap(),
            d(25)
        );
    }

    #[test]
    fn base_selector_edits_base_value() {
        let scripts = NativeScripts::new();
        let mut character = character();
        let modifier = Modifier::additive(ModifierId(1), "damage.base", d(3));

        add_modifier(&mut character, &modifier, &scripts).unwrap();
        assert_eq!(character.attribute(AttributeKind::Damage).base_value, d(3));
    }

    #[test]
    fn view_exposes_attribute_totals() {
        let scripts = NativeScripts::new();
        let mut character = character();
        character.current_health = d(12);
        let view = character.view(&scripts).unwrap();

        assert_eq!(view.get("maximum_health"), Some(&Value::Number(d(25))));
        assert_eq!(view.get("current_health"), Some(&Value::Number(d(12))));
        assert_eq!(view.get("role"), Some(&Value::from("player")));
        assert_eq!(view.get("alive"), Some(&Value::Bool(true)));
    }

    #[test]
    fn calculated_health_regenerates() {
        let scripts = NativeScripts::new().with("regen", |f, b| {
            let max = b.number(f, "this.maximum_health")?;
            Ok(Value::Number((b.number(f, "value")? + d(2)).min(max)))
        });
        let mut character = character();
        character.current_health = d(20);
        character
            .entity_mut()
            .calculate("current_health", Formula::new("regen"));

        recalculate(&mut character, &scripts).unwrap();
        assert_eq!(character.current_health, d(22));
        for _ in 0..5 {
            recalculate(&mut character, &scripts).unwrap();
        }
        // capped at 20 + 1 * 5
        assert_eq!(character.current_health, d(25));
    }
}
