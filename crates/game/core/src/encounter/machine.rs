use rust_decimal::Decimal;
use tracing::{debug, info};

use super::{Encounter, EncounterId, EncounterState, Resolution};
use crate::character::{Character, CharacterAction};
use crate::content::EncounterDefId;
use crate::entity::{EntityId, Modifiable};
use crate::error::{ConfigError, RulesError};
use crate::events::{
    CHARACTER_RESURRECTED, ENCOUNTER_ENDED, ENCOUNTER_STARTED, Event, STAGE_CHANGED,
};
use crate::script::Formula;
use crate::sim::{ActionPhase, Simulation};
use crate::table;
use crate::timer::{Callback, Scheduler};
use crate::value::Bindings;

const NEXT_ENCOUNTER_TIMER: &str = "Timer to start new encounter.";

impl Simulation {
    /// Starts a new encounter.
    ///
    /// With `definition` unset one is picked uniformly from the registered
    /// encounter definitions. Creatures of the previous encounter leave the
    /// roster before the new ones are generated.
    pub fn start_encounter(
        &mut self,
        definition: Option<EncounterDefId>,
    ) -> Result<EncounterId, RulesError> {
        self.definitions.assert_ready()?;
        let definition = match definition {
            Some(id) => self
                .definitions
                .encounter(id)
                .ok_or(ConfigError::UnknownEncounter(id.0))?,
            None => {
                let index = self.rng.index(self.definitions.encounter_count());
                self.definitions
                    .encounters()
                    .nth(index)
                    .ok_or(ConfigError::MissingEncounters)?
            }
        }
        .clone();

        let mut generated = Vec::with_capacity(definition.creatures.len());
        for option in &definition.creatures {
            let level = self
                .stage
                .checked_add(option.level_offset)
                .ok_or(RulesError::overflow("creature level"))?;
            generated.push(self.generate_creature(option.creature, level)?);
        }

        if let Some(previous) = self.encounter.take() {
            for creature in previous.creatures {
                self.roster.remove_creature(creature);
            }
        }

        let id = EncounterId(self.ids.next_id().0);
        let creatures: Vec<EntityId> = generated.iter().map(Character::id).collect();
        for creature in generated {
            self.roster.insert_creature(creature);
        }
        self.encounter = Some(Encounter {
            id,
            definition: definition.id,
            stage: self.stage,
            creatures: creatures.clone(),
            is_active: true,
            resolution: None,
        });
        self.phase = ActionPhase::Combat;

        info!(
            target: "rules::encounter",
            encounter = %id,
            definition = %definition.id,
            stage = %self.stage,
            creatures = creatures.len(),
            "encounter started"
        );
        self.emit(
            ENCOUNTER_STARTED,
            table! {
                "encounter" => Decimal::from(id.0),
                "definition" => Decimal::from(definition.id.0),
                "stage" => self.stage,
            },
        )?;
        Ok(id)
    }

    /// Moves to `stage` and starts a fresh encounter there.
    pub fn set_stage(&mut self, stage: Decimal) -> Result<EncounterId, RulesError> {
        self.stage = stage;
        self.emit(STAGE_CHANGED, table! { "stage" => stage })?;
        self.start_encounter(None)
    }

    /// The outcome of a resolved encounter is the one recorded when it ended;
    /// later deaths or resurrections do not change it.
    pub fn encounter_state(&self) -> EncounterState {
        match &self.encounter {
            None => EncounterState::NoEncounter,
            Some(encounter) => match encounter.resolution {
                Some(resolution) if !encounter.is_active => {
                    EncounterState::Resolved(encounter.id, resolution)
                }
                _ => EncounterState::Active(encounter.id),
            },
        }
    }

    /// Brings a dead character back: statuses are removed, health restored
    /// and the action meter cleared. Emits `character_resurrected`.
    pub fn resurrect(&mut self, id: EntityId) -> Result<(), RulesError> {
        self.reset_character(id)?;
        info!(target: "rules::encounter", character = %id, "character resurrected");
        self.emit_from(id, CHARACTER_RESURRECTED, table! { "character" => id })
    }

    /// Clears statuses, restores health, empties the action meter and
    /// returns the character to fighting.
    pub fn reset_character(&mut self, id: EntityId) -> Result<(), RulesError> {
        let statuses: Vec<_> = self.require(id)?.statuses().map(|(status, _)| status).collect();
        for status in statuses {
            self.remove_status(id, status)?;
        }

        let scripts = &*self.scripts;
        let character = self
            .roster
            .get_mut(id)
            .ok_or(RulesError::UnknownEntity(id))?;
        character.restore_health(scripts)?;
        character.action_meter = Decimal::ZERO;
        character.action = CharacterAction::Fighting;
        Ok(())
    }

    /// Listener for `character_died`.
    pub(crate) fn on_character_died(&mut self, event: &Event) -> Result<(), RulesError> {
        let Some(dead) = event.entity("character") else {
            return Ok(());
        };
        let Some(encounter) = self.encounter.as_ref().filter(|e| e.is_active) else {
            return Ok(());
        };
        let player = self.roster.player().id();
        if dead != player && !encounter.creatures.contains(&dead) {
            return Ok(());
        }

        if dead != player {
            self.award_kill(dead)?;
        }

        let Some(encounter) = self.encounter.as_ref() else {
            return Ok(());
        };
        let player_alive = self.roster.player().is_alive();
        let creatures_alive = encounter
            .creatures
            .iter()
            .any(|id| self.roster.get(*id).is_some_and(Character::is_alive));
        if player_alive && creatures_alive {
            return Ok(());
        }

        let id = encounter.id;
        let resolution = if player_alive {
            Resolution::Victory
        } else {
            Resolution::Defeat
        };
        if let Some(encounter) = self.encounter.as_mut() {
            encounter.resolve(resolution);
        }
        self.phase = ActionPhase::Idle;

        info!(target: "rules::encounter", encounter = %id, %resolution, "encounter ended");
        let outcome: &'static str = resolution.into();
        self.emit(
            ENCOUNTER_ENDED,
            table! { "encounter" => Decimal::from(id.0), "outcome" => outcome },
        )?;

        if player_alive {
            let delay = self.config.next_encounter_delay;
            self.timers.schedule(
                delay,
                Callback::StartEncounter {
                    replacing: Some(id),
                },
                NEXT_ENCOUNTER_TIMER,
            );
        }
        Ok(())
    }

    /// Listener for `character_resurrected`: a revived player gets a fresh
    /// encounter.
    pub(crate) fn on_character_resurrected(&mut self, event: &Event) -> Result<(), RulesError> {
        if event.entity("character") != Some(self.roster.player().id()) {
            return Ok(());
        }
        self.start_encounter(None).map(|_| ())
    }

    /// Credits the player with the configured rewards for `creature`.
    fn award_kill(&mut self, creature: EntityId) -> Result<(), RulesError> {
        let scripts = &*self.scripts;
        let settings = &self.config.creatures;
        let bindings = Bindings::new()
            .with("creature", self.require(creature)?.view(scripts)?)
            .with("player", self.roster.player().view(scripts)?);

        let reward = |formula: &Option<Formula>| -> Result<Decimal, RulesError> {
            match formula {
                Some(formula) => Ok(scripts.evaluate(formula, &bindings)?.expect_number(formula)?),
                None => Ok(Decimal::ZERO),
            }
        };
        let xp = reward(&settings.xp_value)?;
        let gold = reward(&settings.gold_value)?;

        let player = self.roster.player_mut();
        let total_xp = player
            .xp
            .checked_add(xp)
            .ok_or(RulesError::overflow("player xp"))?;
        let total_gold = player
            .gold
            .checked_add(gold)
            .ok_or(RulesError::overflow("player gold"))?;
        player.xp = total_xp;
        player.gold = total_gold;
        debug!(target: "rules::encounter", %creature, xp = %xp, gold = %gold, "kill rewarded");
        Ok(())
    }

    /// Runs a due timer callback.
    pub(crate) fn run_callback(&mut self, callback: Callback) -> Result<(), RulesError> {
        match callback {
            Callback::StartEncounter { replacing } => {
                let current = self.encounter.as_ref().map(|e| (e.id, e.is_active));
                let stale = match (replacing, current) {
                    (_, Some((_, true))) => true,
                    (Some(expected), Some((id, false))) => expected != id,
                    (Some(_), None) => true,
                    (None, _) => false,
                };
                if stale || !self.roster.player().is_alive() {
                    debug!(target: "rules::timer", ?replacing, "stale encounter timer skipped");
                    return Ok(());
                }
                self.start_encounter(None).map(|_| ())
            }
            Callback::Script(formula) => {
                let bindings = Bindings::new()
                    .with("player", self.roster.player().view(&*self.scripts)?)
                    .with("stage", self.stage);
                self.scripts.evaluate(&formula, &bindings)?;
                Ok(())
            }
        }
    }

    /// Schedules a scripted callback on the simulation's timer queue.
    pub fn schedule(&mut self, delay: f64, formula: Formula, description: &str) {
        self.timers.schedule(delay, Callback::Script(formula), description);
    }
}
