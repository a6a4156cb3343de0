//! Seeded runs replay exactly.

use idle_core::{CreatureDefinition, CreatureId, Definitions, EncounterDefId, EncounterDefinition};
use idle_runtime::{Runtime, RuntimeConfig, digest};
use rust_decimal::Decimal;

fn definitions() -> Definitions {
    let mut definitions = Definitions::new();
    definitions.add_creature(CreatureDefinition::new(CreatureId(1), "rat"));
    definitions.add_creature(CreatureDefinition::new(CreatureId(2), "bat"));
    definitions
        .add_encounter(
            EncounterDefinition::new(EncounterDefId(1))
                .with_creature(CreatureId(1), Decimal::ZERO)
                .with_creature(CreatureId(2), Decimal::ONE),
        )
        .unwrap();
    definitions
        .add_encounter(
            EncounterDefinition::new(EncounterDefId(2)).with_creature(CreatureId(2), Decimal::ZERO),
        )
        .unwrap();
    definitions
}

fn runtime(seed: u64) -> Runtime {
    let config = RuntimeConfig {
        seed,
        tick_seconds: 0.25,
        ..RuntimeConfig::default()
    };
    Runtime::builder()
        .config(config)
        .definitions(definitions())
        .build()
        .unwrap()
}

#[test]
fn same_seed_produces_same_digest() {
    let mut a = runtime(42);
    let mut b = runtime(42);
    assert_eq!(a.digest().unwrap(), b.digest().unwrap());

    for _ in 0..4 {
        a.run_for(5.0).unwrap();
        b.run_for(5.0).unwrap();
        assert_eq!(a.digest().unwrap(), b.digest().unwrap());
    }
    assert_eq!(a.snapshot(), b.snapshot());
}

#[test]
fn digest_tracks_state_changes() {
    let mut runtime = runtime(42);
    let before = runtime.digest().unwrap();

    runtime.step().unwrap();

    let after = runtime.digest().unwrap();
    assert_ne!(before, after);
    assert_eq!(after.len(), 64);
    assert_eq!(after, digest(&runtime.snapshot()).unwrap());
}

#[test]
fn restores_from_one_snapshot_replay_identically() {
    let mut origin = runtime(9);
    origin.run_for(3.0).unwrap();
    let snapshot = origin.snapshot();

    let restore = || {
        Runtime::builder()
            .config(origin.config().clone())
            .definitions(definitions())
            .restore(snapshot.clone())
            .unwrap()
    };
    let mut a = restore();
    let mut b = restore();
    assert_eq!(a.snapshot(), snapshot);

    a.run_for(10.0).unwrap();
    b.run_for(10.0).unwrap();
    assert_eq!(a.digest().unwrap(), b.digest().unwrap());
}
