use rust_decimal::Decimal;
use tracing::info;

use super::{ActionPhase, RULES_SUBSCRIBER, Roster, Simulation};
use crate::config::RulesConfig;
use crate::content::Definitions;
use crate::encounter::generate_player;
use crate::entity::IdAllocator;
use crate::error::RulesError;
use crate::events::{CHARACTER_DIED, CHARACTER_RESURRECTED, EventBus, Handler};
use crate::modifier::ModifierRegistry;
use crate::rng::{RandomSource, SeededRng};
use crate::script::{NativeScripts, ScriptHost};
use crate::timer::TimerQueue;

/// Assembles a [`Simulation`] from its collaborators.
///
/// Defaults: [`RulesConfig::default`], the built-in native scripts, a
/// [`SeededRng`] seeded with zero, empty registries and stage 1.
pub struct SimulationBuilder {
    pub(crate) config: RulesConfig,
    pub(crate) scripts: Box<dyn ScriptHost>,
    pub(crate) rng: Box<dyn RandomSource>,
    pub(crate) modifiers: ModifierRegistry,
    pub(crate) definitions: Definitions,
    pub(crate) stage: Decimal,
}

impl SimulationBuilder {
    pub fn new() -> Self {
        Self {
            config: RulesConfig::default(),
            scripts: Box::new(NativeScripts::with_defaults()),
            rng: Box::new(SeededRng::new(0)),
            modifiers: ModifierRegistry::new(),
            definitions: Definitions::new(),
            stage: Decimal::ONE,
        }
    }

    pub fn config(mut self, config: RulesConfig) -> Self {
        self.config = config;
        self
    }

    pub fn scripts(mut self, scripts: impl ScriptHost + 'static) -> Self {
        self.scripts = Box::new(scripts);
        self
    }

    pub fn rng(mut self, rng: impl RandomSource + 'static) -> Self {
        self.rng = Box::new(rng);
        self
    }

    /// Shorthand for `rng(SeededRng::new(seed))`.
    pub fn seed(self, seed: u64) -> Self {
        self.rng(SeededRng::new(seed))
    }

    pub fn modifiers(mut self, modifiers: ModifierRegistry) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn definitions(mut self, definitions: Definitions) -> Self {
        self.definitions = definitions;
        self
    }

    pub fn stage(mut self, stage: Decimal) -> Self {
        self.stage = stage;
        self
    }

    /// Generates the player and wires the rules listeners. No encounter is
    /// started.
    pub fn build(self) -> Result<Simulation, RulesError> {
        self.definitions.assert_ready()?;

        let mut ids = IdAllocator::new();
        let player = generate_player(&self.config, &*self.scripts, ids.next_id())?;

        let mut simulation = Simulation {
            config: self.config,
            scripts: self.scripts,
            rng: self.rng,
            modifiers: self.modifiers,
            definitions: self.definitions,
            roster: Roster::new(player),
            encounter: None,
            bus: EventBus::new(),
            timers: TimerQueue::new(),
            ids,
            phase: ActionPhase::Idle,
            stage: self.stage,
            clock: 0.0,
        };
        simulation.register_rules_listeners();

        info!(
            target: "rules::sim",
            player = %simulation.player().id(),
            stage = %simulation.stage,
            encounters = simulation.definitions.encounter_count(),
            modifiers = simulation.modifiers.len(),
            "simulation ready"
        );
        Ok(simulation)
    }
}

impl Default for SimulationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulation {
    pub(crate) fn register_rules_listeners(&mut self) {
        self.bus.watch(
            CHARACTER_DIED,
            RULES_SUBSCRIBER,
            Handler::native(Simulation::on_character_died),
        );
        self.bus.watch(
            CHARACTER_RESURRECTED,
            RULES_SUBSCRIBER,
            Handler::native(Simulation::on_character_resurrected),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::sim::fixture;

    #[test]
    fn build_requires_encounters() {
        let err = SimulationBuilder::new().build().unwrap_err();
        assert_eq!(err, ConfigError::MissingEncounters.into());
    }

    #[test]
    fn build_generates_player_without_encounter() {
        let sim = fixture::builder().build().unwrap();

        assert!(sim.player().is_alive());
        assert!(sim.encounter().is_none());
        assert_eq!(sim.phase(), ActionPhase::Idle);
        assert!(sim.listeners().is_watching(CHARACTER_DIED, RULES_SUBSCRIBER));
        assert!(sim.listeners().is_watching(CHARACTER_RESURRECTED, RULES_SUBSCRIBER));
    }
}
