//! Player and creature generation.

use rust_decimal::Decimal;
use strum::IntoEnumIterator;
use tracing::debug;

use crate::character::{Character, Role};
use crate::config::RulesConfig;
use crate::content::CreatureId;
use crate::entity::{EntityId, Modifiable};
use crate::error::{ConfigError, RulesError, ScriptError};
use crate::modifier;
use crate::script::{Formula, ScriptHost};
use crate::sim::Simulation;
use crate::stats::{Attribute, AttributeKind};
use crate::value::Bindings;

/// Builds the player from configuration: starting level, base attributes
/// with per-level growth, initializer, then validator.
pub(crate) fn generate_player(
    config: &RulesConfig,
    scripts: &dyn ScriptHost,
    id: EntityId,
) -> Result<Character, RulesError> {
    let settings = &config.player;
    let mut player = Character::new(id, Role::Player, settings.starting_level, settings.attack.clone());
    player.name = settings.name.clone();

    for kind in AttributeKind::iter() {
        let base = settings.base_attributes.get(&kind).copied().unwrap_or_default();
        let growth = settings
            .attributes_per_level
            .get(&kind)
            .copied()
            .unwrap_or_default();
        *player.attribute_mut(kind) = Attribute::new(base, growth);
    }

    if let Some(initializer) = &settings.initializer {
        let bindings = Bindings::new().with("player", player.view(scripts)?);
        modifier::apply_initializer(&mut player, initializer, &bindings, scripts)?;
    }
    player.restore_health(scripts)?;

    if let Some(validator) = &settings.validator {
        let bindings = Bindings::new().with("player", player.view(scripts)?);
        validate(scripts, validator, &bindings, "player")?;
    }
    debug!(target: "rules::encounter", player = %id, level = %player.level, "player generated");
    Ok(player)
}

impl Simulation {
    /// Generates one creature at `level`. The creature is not yet part of
    /// the roster.
    pub(crate) fn generate_creature(
        &mut self,
        creature: CreatureId,
        level: Decimal,
    ) -> Result<Character, RulesError> {
        if level < Decimal::ONE {
            return Err(ConfigError::InvalidLevel(level).into());
        }

        let scripts = &*self.scripts;
        let settings = &self.config.creatures;
        let definition = self.definitions.creature(creature)?;
        let id = self.ids.next_id();
        let attack = definition
            .attack
            .clone()
            .unwrap_or_else(|| settings.attack.clone());

        let mut generated = Character::new(id, Role::Creature, level, attack);
        generated.name = definition.name.clone();
        generated.creature = Some(creature);

        for (kind, base) in &settings.base_attributes {
            let value = base
                .checked_mul(definition.multiplier(*kind))
                .ok_or(RulesError::overflow("creature base attribute"))?;
            let bindings = Bindings::new()
                .with("value", value)
                .with("level", level)
                .with("attribute", kind.name());
            let scaled = scripts
                .evaluate(&settings.scaling, &bindings)?
                .expect_number(&settings.scaling)?;
            *generated.attribute_mut(*kind) = Attribute::with_base(scaled);
        }

        for (key, value) in &definition.properties {
            generated.entity_mut().set_extra(key.clone(), value.clone());
        }
        for modifier_id in &definition.modifiers {
            let applied = self.modifiers.resolve(*modifier_id)?;
            modifier::add_modifier(&mut generated, applied, scripts)?;
        }

        if let Some(initializer) = &settings.initializer {
            let bindings = Bindings::new()
                .with("creature", generated.view(scripts)?)
                .with("level", level);
            modifier::apply_initializer(&mut generated, initializer, &bindings, scripts)?;
        }
        generated.restore_health(scripts)?;

        let bindings = Bindings::new().with("creature", generated.view(scripts)?);
        validate(
            scripts,
            &settings.validator,
            &bindings,
            &format!("creature `{}`", definition.name),
        )?;

        debug!(
            target: "rules::encounter",
            creature = %id,
            name = %generated.name,
            level = %level,
            health = %generated.current_health,
            "creature generated"
        );
        Ok(generated)
    }
}

fn validate(
    scripts: &dyn ScriptHost,
    validator: &Formula,
    bindings: &Bindings,
    subject: &str,
) -> Result<(), RulesError> {
    let accepted = scripts
        .evaluate(validator, bindings)
        .and_then(|value| value.expect_bool(validator))
        .map_err(|err| RulesError::validation(subject, err))?;
    if !accepted {
        return Err(RulesError::validation(
            subject,
            ScriptError::rejected(validator, "validator returned false"),
        ));
    }
    Ok(())
}
