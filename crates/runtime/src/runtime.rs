//! Fixed-step driver around a [`Simulation`].
//!
//! The runtime owns the simulation and its [`RuntimeConfig`], advances it in
//! `tick_seconds` increments and exposes snapshot persistence. A builder
//! assembles configuration, content, scripts and the random source.

use idle_core::{
    Definitions, ModifierRegistry, RandomSource, ScriptHost, Simulation, SimulationBuilder,
    SimulationSnapshot,
};

use crate::config::RuntimeConfig;
use crate::content::ContentPack;
use crate::error::{Result, RuntimeError};
use crate::store::{self, SnapshotStore};

/// Owns a running simulation.
pub struct Runtime {
    simulation: Simulation,
    config: RuntimeConfig,
    steps: u64,
}

impl Runtime {
    /// Create a new runtime builder
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub fn simulation_mut(&mut self) -> &mut Simulation {
        &mut self.simulation
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Number of fixed steps taken since the runtime was built or restored.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Advances the simulation by one tick.
    pub fn step(&mut self) -> Result<()> {
        self.simulation.update(self.config.tick_seconds)?;
        self.steps += 1;
        tracing::trace!(
            target: "runtime::driver",
            step = self.steps,
            clock = self.simulation.clock(),
            "step"
        );
        Ok(())
    }

    /// Advances by as many whole ticks as fit in `seconds` and returns how
    /// many were taken.
    pub fn run_for(&mut self, seconds: f64) -> Result<u64> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(RuntimeError::InvalidTick(seconds));
        }
        let ticks = (seconds / self.config.tick_seconds).floor() as u64;
        for _ in 0..ticks {
            self.step()?;
        }
        tracing::debug!(
            target: "runtime::driver",
            ticks,
            clock = self.simulation.clock(),
            "ran"
        );
        Ok(ticks)
    }

    pub fn snapshot(&self) -> SimulationSnapshot {
        self.simulation.snapshot()
    }

    /// Hex digest of the current snapshot.
    pub fn digest(&self) -> Result<String> {
        store::digest(&self.snapshot())
    }

    pub fn save(&self, store: &SnapshotStore, name: &str) -> Result<()> {
        store.save(name, &self.snapshot())
    }
}

/// Builder for [`Runtime`].
pub struct RuntimeBuilder {
    simulation: SimulationBuilder,
    config: RuntimeConfig,
    rng_set: bool,
}

impl RuntimeBuilder {
    fn new() -> Self {
        Self {
            simulation: SimulationBuilder::new(),
            config: RuntimeConfig::default(),
            rng_set: false,
        }
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn scripts(mut self, scripts: impl ScriptHost + 'static) -> Self {
        self.simulation = self.simulation.scripts(scripts);
        self
    }

    /// Overrides the random source. Without one, a seeded source is built
    /// from [`RuntimeConfig::seed`].
    pub fn rng(mut self, rng: impl RandomSource + 'static) -> Self {
        self.simulation = self.simulation.rng(rng);
        self.rng_set = true;
        self
    }

    pub fn modifiers(mut self, modifiers: ModifierRegistry) -> Self {
        self.simulation = self.simulation.modifiers(modifiers);
        self
    }

    pub fn definitions(mut self, definitions: Definitions) -> Self {
        self.simulation = self.simulation.definitions(definitions);
        self
    }

    /// Registers a content pack, replacing any modifiers and definitions set
    /// earlier.
    pub fn content(self, pack: ContentPack) -> Result<Self> {
        let (modifiers, definitions) = pack.into_registries()?;
        Ok(self.modifiers(modifiers).definitions(definitions))
    }

    /// Builds the simulation and starts its first encounter.
    pub fn build(self) -> Result<Runtime> {
        let (simulation, config) = self.prepare()?;
        let mut simulation = simulation.build()?;
        let encounter = simulation.start_encounter(None)?;

        tracing::info!(
            target: "runtime::driver",
            seed = config.seed,
            tick_seconds = config.tick_seconds,
            %encounter,
            "runtime started"
        );
        Ok(Runtime {
            simulation,
            config,
            steps: 0,
        })
    }

    /// Rebuilds a runtime from a snapshot. No encounter is started; the
    /// snapshot's encounter and timers carry on.
    pub fn restore(self, snapshot: SimulationSnapshot) -> Result<Runtime> {
        let (simulation, config) = self.prepare()?;
        let simulation = simulation.restore(snapshot)?;

        tracing::info!(
            target: "runtime::driver",
            clock = simulation.clock(),
            "runtime restored"
        );
        Ok(Runtime {
            simulation,
            config,
            steps: 0,
        })
    }

    pub fn load(self, store: &SnapshotStore, name: &str) -> Result<Runtime> {
        let snapshot = store.load(name)?;
        self.restore(snapshot)
    }

    fn prepare(self) -> Result<(SimulationBuilder, RuntimeConfig)> {
        self.config.validate()?;
        let mut simulation = self.simulation.config(self.config.rules.clone());
        if !self.rng_set {
            simulation = simulation.seed(self.config.seed);
        }
        Ok((simulation, self.config))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use idle_core::{CreatureDefinition, CreatureId, EncounterDefId, EncounterDefinition};
    use rust_decimal::Decimal;

    use super::*;

    fn definitions() -> Definitions {
        let mut definitions = Definitions::new();
        definitions.add_creature(CreatureDefinition::new(CreatureId(1), "rat"));
        definitions
            .add_encounter(
                EncounterDefinition::new(EncounterDefId(1)).with_creature(CreatureId(1), Decimal::ZERO),
            )
            .unwrap();
        definitions
    }

    #[test]
    fn build_starts_first_encounter() {
        let runtime = Runtime::builder().definitions(definitions()).build().unwrap();

        assert!(runtime.simulation().encounter().is_some_and(|e| e.is_active));
        assert_eq!(runtime.steps(), 0);
    }

    #[test]
    fn run_for_takes_whole_ticks() {
        let config = RuntimeConfig {
            tick_seconds: 0.25,
            ..RuntimeConfig::default()
        };
        let mut runtime = Runtime::builder()
            .config(config)
            .definitions(definitions())
            .build()
            .unwrap();

        assert_eq!(runtime.run_for(1.1).unwrap(), 4);
        assert_eq!(runtime.steps(), 4);
        assert_eq!(runtime.simulation().clock(), 1.0);
    }

    #[test]
    fn invalid_tick_is_rejected_before_build() {
        let config = RuntimeConfig {
            tick_seconds: -1.0,
            ..RuntimeConfig::default()
        };
        let result = Runtime::builder()
            .config(config)
            .definitions(definitions())
            .build();

        assert!(matches!(result, Err(RuntimeError::InvalidTick(_))));
    }
}
