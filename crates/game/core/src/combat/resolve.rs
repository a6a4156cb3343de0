use rust_decimal::Decimal;
use tracing::{debug, info};

use super::AttackOutcome;
use crate::character::{Character, CharacterAction};
use crate::entity::{EntityId, Modifiable};
use crate::error::RulesError;
use crate::events::{
    ATTACK_HIT, ATTACK_MISSED, CHARACTER_DIED, DAMAGE_TAKEN, HIT_BY_ATTACK, IS_ATTACKING,
    IS_BEING_ATTACKED, MISSED_BY_ATTACK,
};
use crate::sim::Simulation;
use crate::table;
use crate::value::{Bindings, Value};

impl Simulation {
    /// Resolves one attack from `attacker` against `defender`.
    ///
    /// The attacker's attack formula picks a tag, the tag's outcome formula
    /// builds the outcome, then the attacker's `is_attacking` and the
    /// defender's `is_being_attacked` reactions may rewrite it. Hit or miss
    /// events fire from both sides before any damage lands.
    pub fn make_attack(
        &mut self,
        attacker: EntityId,
        defender: EntityId,
    ) -> Result<AttackOutcome, RulesError> {
        let scripts = &*self.scripts;
        let attacking = self.require(attacker)?;
        let defending = self.require(defender)?;
        let attack = attacking.attack.clone();

        let mut bindings = Bindings::new()
            .with("attacker", attacking.view(scripts)?)
            .with("defender", defending.view(scripts)?)
            .with("configuration", self.config.to_table());
        bindings.insert("roll", self.rng.percent());
        bindings.insert("critical_roll", self.rng.percent());

        let tag = scripts.evaluate(&attack, &bindings)?.expect_text(&attack)?;
        let formula = self
            .config
            .outcome(&tag)
            .ok_or_else(|| Self::missing_outcome(&tag))?;
        let value = scripts.evaluate(formula, &bindings)?;
        let outcome = AttackOutcome::from_value(value, formula, attacker)?;

        let outcome = self.react(attacker, IS_ATTACKING, outcome, &bindings)?;
        let outcome = self.react(defender, IS_BEING_ATTACKED, outcome, &bindings)?;

        debug!(
            target: "rules::combat",
            %attacker,
            %defender,
            tag = %tag,
            hit = outcome.is_hit,
            damage_to_defender = %outcome.damage_to_defender,
            damage_to_attacker = %outcome.damage_to_attacker,
            "attack resolved"
        );

        let context = table! {
            "attacker" => attacker,
            "defender" => defender,
            "attack" => outcome.to_table(),
        };
        let (outgoing, incoming) = if outcome.is_hit {
            (ATTACK_HIT, HIT_BY_ATTACK)
        } else {
            (ATTACK_MISSED, MISSED_BY_ATTACK)
        };
        self.emit_from(attacker, outgoing, context.clone())?;
        self.emit_from(defender, incoming, context)?;

        if !outcome.damage_to_attacker.is_zero() {
            self.inflict_damage(attacker, outcome.damage_to_attacker, Some(defender))?;
        }
        if !outcome.damage_to_defender.is_zero() {
            self.inflict_damage(defender, outcome.damage_to_defender, Some(attacker))?;
        }
        Ok(outcome)
    }

    /// Folds `character`'s ability triggers for `hook` over `outcome`. Each
    /// trigger sees the current outcome as `attack` and returns its
    /// replacement.
    fn react(
        &self,
        character: EntityId,
        hook: &str,
        mut outcome: AttackOutcome,
        bindings: &Bindings,
    ) -> Result<AttackOutcome, RulesError> {
        let reacting = self.require(character)?;
        let mut triggers = Vec::new();
        for ability in reacting.abilities() {
            triggers.extend(self.definitions.ability(*ability)?.triggers(hook).iter());
        }
        if triggers.is_empty() {
            return Ok(outcome);
        }

        let this = Value::Table(reacting.view(&*self.scripts)?);
        for formula in triggers {
            let mut scoped = bindings.clone();
            scoped.insert("this", this.clone());
            scoped.insert("attack", outcome.to_value());
            let value = self.scripts.evaluate(formula, &scoped)?;
            outcome = AttackOutcome::from_value(value, formula, outcome.attacker)?;
        }
        Ok(outcome)
    }

    /// Subtracts `amount` from `target`'s health.
    ///
    /// Emits `damage_taken`, and `character_died` only on the update that
    /// takes the character from alive to dead. A dying player switches to
    /// [`CharacterAction::Reincarnating`].
    pub fn inflict_damage(
        &mut self,
        target: EntityId,
        amount: Decimal,
        source: Option<EntityId>,
    ) -> Result<(), RulesError> {
        let character = self.require_mut(target)?;
        let was_alive = character.is_alive();
        character.current_health = character.current_health.saturating_sub(amount);
        let died = was_alive && !character.is_alive();
        if died && character.is_player() {
            character.action = CharacterAction::Reincarnating;
        }

        debug!(
            target: "rules::combat",
            %target,
            amount = %amount,
            health = %character.current_health,
            "damage taken"
        );

        self.emit_from(
            target,
            DAMAGE_TAKEN,
            table! { "character" => target, "amount" => amount, "source" => source },
        )?;
        if died {
            info!(target: "rules::combat", character = %target, "character died");
            self.emit_from(
                target,
                CHARACTER_DIED,
                table! { "character" => target, "source" => source },
            )?;
        }
        Ok(())
    }

    /// Reduces `target` to zero health through the usual damage path.
    pub fn kill(&mut self, target: EntityId) -> Result<(), RulesError> {
        let health = self.require(target)?.current_health;
        self.inflict_damage(target, health.max(Decimal::ZERO), None)
    }

    /// Whether `id` names a character that can still take part in combat.
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.roster.get(id).is_some_and(Character::is_alive)
    }
}
