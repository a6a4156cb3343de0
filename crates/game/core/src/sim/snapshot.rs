use rust_decimal::Decimal;
use tracing::info;

use super::{ActionPhase, Roster, Simulation, SimulationBuilder};
use crate::character::{Character, CharacterSnapshot};
use crate::encounter::Encounter;
use crate::entity::IdAllocator;
use crate::error::RulesError;
use crate::events::{EventBus, ListenerSnapshot};
use crate::timer::TimerQueue;

/// Persistent simulation state.
///
/// Configuration, content, scripts and the random source are not part of
/// the snapshot; a restore takes them from the builder.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimulationSnapshot {
    pub player: CharacterSnapshot,
    pub creatures: Vec<CharacterSnapshot>,
    pub encounter: Option<Encounter>,
    /// Scripted simulation-wide listeners. Native listeners are re-created
    /// by the rules on restore.
    pub listeners: Vec<ListenerSnapshot>,
    pub timers: TimerQueue,
    pub ids: IdAllocator,
    pub phase: ActionPhase,
    pub stage: Decimal,
    pub clock: f64,
}

impl Simulation {
    pub fn snapshot(&self) -> SimulationSnapshot {
        SimulationSnapshot {
            player: self.roster.player().snapshot(),
            creatures: self.roster.creatures().map(Character::snapshot).collect(),
            encounter: self.encounter.clone(),
            listeners: self.bus.scripted(),
            timers: self.timers.clone(),
            ids: self.ids,
            phase: self.phase,
            stage: self.stage,
            clock: self.clock,
        }
    }
}

impl SimulationBuilder {
    /// Rebuilds a simulation from `snapshot` using this builder's
    /// configuration, content, scripts and random source. Applied modifiers
    /// are restored as recorded, never re-run.
    pub fn restore(self, snapshot: SimulationSnapshot) -> Result<Simulation, RulesError> {
        self.definitions.assert_ready()?;

        let mut roster = Roster::new(Character::restore(snapshot.player, &self.modifiers)?);
        for creature in snapshot.creatures {
            roster.insert_creature(Character::restore(creature, &self.modifiers)?);
        }
        if let Some(missing) = snapshot
            .encounter
            .iter()
            .flat_map(|encounter| encounter.creatures.iter())
            .find(|id| roster.get(**id).is_none())
        {
            return Err(RulesError::UnknownEntity(*missing));
        }

        let mut ids = snapshot.ids;
        for id in roster.ids() {
            ids.reserve(id);
        }

        let mut simulation = Simulation {
            config: self.config,
            scripts: self.scripts,
            rng: self.rng,
            modifiers: self.modifiers,
            definitions: self.definitions,
            roster,
            encounter: snapshot.encounter,
            bus: EventBus::restore(&snapshot.listeners),
            timers: snapshot.timers,
            ids,
            phase: snapshot.phase,
            stage: snapshot.stage,
            clock: snapshot.clock,
        };
        simulation.register_rules_listeners();

        info!(
            target: "rules::sim",
            clock = simulation.clock,
            stage = %simulation.stage,
            "simulation restored"
        );
        Ok(simulation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{CHARACTER_DIED, Handler};
    use crate::modifier::{Modifier, ModifierId, ModifierRegistry};
    use crate::script::Formula;
    use crate::sim::{RULES_SUBSCRIBER, fixture};
    use crate::stats::AttributeKind;

    #[test]
    fn restore_preserves_state_and_rules_listeners() {
        let mut sim = fixture::simulation();
        sim.update(0.25).unwrap();
        sim.watch(CHARACTER_DIED, "bard", Handler::Script(Formula::new("lament"))).unwrap();
        let snapshot = sim.snapshot();

        let restored = fixture::builder().restore(snapshot.clone()).unwrap();
        assert_eq!(restored.snapshot(), snapshot);
        assert!(restored.listeners().is_watching(CHARACTER_DIED, RULES_SUBSCRIBER));
        assert!(restored.listeners().is_watching(CHARACTER_DIED, "bard"));
    }

    #[test]
    fn restore_keeps_modifier_effects_without_reapplying() {
        let mut modifiers = ModifierRegistry::new();
        modifiers
            .register(Modifier::additive(ModifierId(1), "damage", Decimal::from(5)))
            .unwrap();
        let mut sim = fixture::builder()
            .modifiers(modifiers.clone())
            .build()
            .unwrap();
        let player = sim.player().id();
        sim.add_modifier(player, ModifierId(1)).unwrap();
        let damage = sim.player().total(AttributeKind::Damage, sim.scripts()).unwrap();

        let restored = fixture::builder()
            .modifiers(modifiers)
            .restore(sim.snapshot())
            .unwrap();
        assert_eq!(
            restored
                .player()
                .total(AttributeKind::Damage, restored.scripts())
                .unwrap(),
            damage
        );
    }

    #[test]
    fn restore_rejects_dangling_modifier() {
        let mut modifiers = ModifierRegistry::new();
        modifiers
            .register(Modifier::flag(ModifierId(1), "blessed"))
            .unwrap();
        let mut sim = fixture::builder().modifiers(modifiers).build().unwrap();
        let player = sim.player().id();
        sim.add_modifier(player, ModifierId(1)).unwrap();

        let err = fixture::builder().restore(sim.snapshot()).unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_MODIFIER");
    }

    #[test]
    fn restored_ids_do_not_collide() {
        let sim = fixture::simulation();
        let mut restored = fixture::builder().restore(sim.snapshot()).unwrap();
        let creature = fixture::first_creature(&restored);

        restored.start_encounter(None).unwrap();
        assert!(fixture::first_creature(&restored) > creature);
    }
}
