//! Shared test content: one creature kind and one single-creature encounter.

use rust_decimal::Decimal;

use super::{Simulation, SimulationBuilder};
use crate::content::{CreatureDefinition, CreatureId, Definitions, EncounterDefId, EncounterDefinition};
use crate::entity::EntityId;
use crate::rng::SequenceRng;
use crate::stats::AttributeKind;

pub const RAT: CreatureId = CreatureId(1);
pub const RATS: EncounterDefId = EncounterDefId(1);

pub fn definitions() -> Definitions {
    let mut definitions = Definitions::new();
    definitions.add_creature(
        CreatureDefinition::new(RAT, "rat")
            .with_attribute(AttributeKind::MaximumHealth, Decimal::new(5, 1)),
    );
    definitions
        .add_encounter(EncounterDefinition::new(RATS).with_creature(RAT, Decimal::ZERO))
        .unwrap();
    definitions
}

pub fn builder() -> SimulationBuilder {
    Simulation::builder().definitions(definitions())
}

/// A simulation with the rat encounter already running.
pub fn simulation() -> Simulation {
    let mut sim = builder().build().unwrap();
    sim.start_encounter(Some(RATS)).unwrap();
    sim
}

/// Like [`simulation`], with attack rolls replayed from `rolls`.
pub fn simulation_with_rolls<const N: usize>(rolls: [u32; N]) -> Simulation {
    let mut sim = builder().rng(SequenceRng::new(rolls)).build().unwrap();
    sim.start_encounter(Some(RATS)).unwrap();
    sim
}

pub fn first_creature(sim: &Simulation) -> EntityId {
    sim.encounter().unwrap().creatures[0]
}
