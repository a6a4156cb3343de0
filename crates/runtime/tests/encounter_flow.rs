//! End-to-end encounter loop driven through the runtime.

use std::cell::RefCell;
use std::rc::Rc;

use idle_core::events::{CHARACTER_DIED, ENCOUNTER_ENDED, ENCOUNTER_STARTED};
use idle_core::{AttributeKind, Event, Handler, ItemId, Value};
use idle_runtime::{ContentPack, Runtime, RuntimeConfig};
use rust_decimal::Decimal;

const PACK: &str = r#"(
    modifiers: [
        (id: 1, target: "damage", apply: offset(5), unapply: Some(offset(-5))),
    ],
    creatures: [
        (id: 1, name: "slime", attributes: { maximum_health: 0.5 }),
    ],
    encounters: [
        (id: 1, creatures: [(creature: 1)]),
    ],
    items: [
        (id: 1, name: "sword", slots: ["hands"], modifiers: [1]),
    ],
)"#;

fn runtime(seed: u64) -> Runtime {
    let config = RuntimeConfig {
        seed,
        tick_seconds: 0.25,
        ..RuntimeConfig::default()
    };
    Runtime::builder()
        .config(config)
        .content(ContentPack::from_ron_str(PACK).unwrap())
        .unwrap()
        .build()
        .unwrap()
}

fn record(runtime: &mut Runtime, events: &[&str]) -> Rc<RefCell<Vec<Event>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    for name in events {
        let log = Rc::clone(&log);
        runtime
            .simulation_mut()
            .watch(
                name,
                "recorder",
                Handler::native(move |_, event| {
                    log.borrow_mut().push(event.clone());
                    Ok(())
                }),
            )
            .unwrap();
    }
    log
}

/// The player clears slimes one after another:
/// 1. the runtime starts the first encounter on build
/// 2. each slime dies to the player and the encounter ends in victory
/// 3. a timer starts the next encounter after the configured delay
/// 4. every kill pays out experience and gold
#[test]
fn player_clears_consecutive_encounters() {
    let mut runtime = runtime(7);
    let log = record(
        &mut runtime,
        &[ENCOUNTER_STARTED, CHARACTER_DIED, ENCOUNTER_ENDED],
    );
    let first = runtime.simulation().encounter().unwrap().id;

    runtime.run_for(5.0).unwrap();

    let log = log.borrow();
    let ended: Vec<&Event> = log.iter().filter(|e| e.name == ENCOUNTER_ENDED).collect();
    assert!(ended.len() >= 3, "expected several victories, got {}", ended.len());
    assert!(
        ended
            .iter()
            .all(|e| e.get("outcome") == Some(&Value::from("victory")))
    );

    // every ended encounter is followed by a fresh start
    let started = log.iter().filter(|e| e.name == ENCOUNTER_STARTED).count();
    assert!(started >= ended.len());

    let sim = runtime.simulation();
    assert!(sim.player().is_alive());
    assert_ne!(sim.encounter().unwrap().id, first);
    assert_eq!(sim.player().xp, Decimal::from(10) * Decimal::from(ended.len()));
    assert_eq!(sim.player().gold, sim.player().xp);
}

#[test]
fn equipping_an_item_raises_damage_until_removed() {
    let mut runtime = runtime(1);
    let player = runtime.simulation().player().id();
    let sim = runtime.simulation_mut();
    let before = sim
        .player()
        .total(AttributeKind::Damage, sim.scripts())
        .unwrap();

    assert!(sim.add_item(player, ItemId(1)).unwrap());
    let equipped = sim
        .player()
        .total(AttributeKind::Damage, sim.scripts())
        .unwrap();
    assert_eq!(equipped, before + Decimal::from(5));

    assert!(sim.remove_item(player, ItemId(1)).unwrap());
    let after = sim
        .player()
        .total(AttributeKind::Damage, sim.scripts())
        .unwrap();
    assert_eq!(after, before);
}

#[test]
fn resurrected_player_starts_a_new_encounter() {
    let mut runtime = runtime(3);
    let player = runtime.simulation().player().id();
    let sim = runtime.simulation_mut();
    let before = sim.encounter().unwrap().id;

    sim.kill(player).unwrap();
    assert!(!sim.player().is_alive());
    assert!(sim.timers().is_empty());

    sim.resurrect(player).unwrap();
    assert!(sim.player().is_alive());
    let encounter = sim.encounter().unwrap();
    assert!(encounter.is_active);
    assert_ne!(encounter.id, before);
}
