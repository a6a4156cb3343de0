//! The per-tick update: timers, calculated properties, status countdowns and
//! action meters.

use rust_decimal::Decimal;
use tracing::{debug, trace};

use super::{ActionPhase, Simulation};
use crate::entity::EntityId;
use crate::error::RulesError;
use crate::events::CHARACTER_ACTED;
use crate::modifier;
use crate::stats::AttributeKind;
use crate::table;

impl Simulation {
    /// Advances the simulation by `dt` seconds.
    ///
    /// Due timers fire first, one at a time in scheduling order. Then the
    /// player and every creature, in that order, recompute calculated
    /// properties, count down statuses and, in combat, fill the action meter.
    /// A character whose meter reaches the threshold spends it on exactly one
    /// action this tick.
    ///
    /// A negative or non-finite `dt` is rejected before anything changes. If
    /// a timer callback fails, timers that came due with it stay queued and
    /// fire on the next update.
    pub fn update(&mut self, dt: f64) -> Result<(), RulesError> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(RulesError::InvalidTick(dt));
        }
        let delta = Decimal::try_from(dt).map_err(|_| RulesError::InvalidTick(dt))?;

        self.clock += dt;
        let due = self.timers.advance(dt);
        if due > 0 {
            trace!(target: "rules::timer", due, "timers due");
        }
        while let Some(callback) = self.timers.pop_due() {
            self.run_callback(callback)?;
        }

        for id in self.roster.ids() {
            self.tick_character(id, delta)?;
        }
        Ok(())
    }

    fn tick_character(&mut self, id: EntityId, delta: Decimal) -> Result<(), RulesError> {
        let scripts = &*self.scripts;
        // a handler earlier this tick may have replaced the encounter
        let Some(character) = self.roster.get_mut(id) else {
            return Ok(());
        };
        modifier::recalculate(character, scripts)?;

        let mut expired = Vec::new();
        for (status, timer) in character.statuses_mut().iter_mut() {
            if timer.initial_time <= Decimal::ZERO {
                continue;
            }
            timer.remaining_time = timer.remaining_time.saturating_sub(delta);
            if timer.remaining_time <= Decimal::ZERO {
                expired.push(*status);
            }
        }
        for status in expired {
            self.remove_status(id, status)?;
        }

        if self.phase != ActionPhase::Combat {
            return Ok(());
        }
        let threshold = self.config.action_meter_required_to_act;
        let scripts = &*self.scripts;
        let Some(character) = self.roster.get_mut(id).filter(|c| c.is_alive()) else {
            return Ok(());
        };
        let speed = character.total(AttributeKind::ActionSpeed, scripts)?;
        character.action_meter = speed
            .checked_mul(delta)
            .and_then(|gain| character.action_meter.checked_add(gain))
            .ok_or(RulesError::overflow("action meter"))?;
        if character.action_meter < threshold {
            return Ok(());
        }
        character.action_meter -= threshold;
        self.act(id)
    }

    fn act(&mut self, id: EntityId) -> Result<(), RulesError> {
        let Some(target) = self.select_target(id) else {
            debug!(target: "rules::sim", character = %id, "no target");
            return Ok(());
        };
        self.make_attack(id, target)?;
        self.emit_from(
            id,
            CHARACTER_ACTED,
            table! { "character" => id, "target" => target },
        )
    }

    /// The player targets a uniformly chosen living creature of the current
    /// encounter; creatures target the living player.
    fn select_target(&mut self, id: EntityId) -> Option<EntityId> {
        let character = self.roster.get(id)?;
        if !character.is_player() {
            let player = self.roster.player();
            return player.is_alive().then(|| player.id());
        }

        let living: Vec<EntityId> = self
            .encounter
            .as_ref()?
            .creatures
            .iter()
            .copied()
            .filter(|creature| self.is_alive(*creature))
            .collect();
        if living.is_empty() {
            return None;
        }
        Some(living[self.rng.index(living.len())])
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::content::{StatusDefinition, StatusId};
    use crate::entity::Modifiable;
    use crate::events::{CHARACTER_DIED, ENCOUNTER_ENDED, Event, Handler};
    use crate::modifier::ModifierRegistry;
    use crate::script::{Formula, NativeScripts};
    use crate::sim::fixture;
    use crate::value::Value;

    fn d(n: i64) -> Decimal {
        Decimal::from(n)
    }

    fn log_events(sim: &mut Simulation, names: &[&'static str]) -> Rc<RefCell<Vec<Event>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        for name in names {
            let log = Rc::clone(&log);
            sim.watch(
                name,
                "test",
                Handler::native(move |_, event| {
                    log.borrow_mut().push(event.clone());
                    Ok(())
                }),
            )
            .unwrap();
        }
        log
    }

    #[test]
    fn meter_overflow_carries_over() {
        let mut sim = fixture::simulation_with_rolls([99, 99]);
        let player = sim.player().id();
        // total = 2 + 1 * 1 = 3 per second
        sim.character_mut(player)
            .unwrap()
            .attribute_mut(AttributeKind::ActionSpeed)
            .base_value = d(2);
        let acted = log_events(&mut sim, &[CHARACTER_ACTED]);

        sim.update(1.0).unwrap();

        assert_eq!(sim.player().action_meter, d(1));
        let from_player = acted
            .borrow()
            .iter()
            .filter(|event| event.source == Some(player))
            .count();
        assert_eq!(from_player, 1);
    }

    #[test]
    fn failing_timer_leaves_other_due_timers_queued() {
        let mut sim = fixture::simulation();
        let first = sim.encounter().unwrap().id;
        let creature = fixture::first_creature(&sim);
        let delay = sim.config().next_encounter_delay;
        sim.schedule(delay, Formula::new("not_registered"), "broken");
        sim.kill(creature).unwrap();
        assert_eq!(sim.timers().pending().len(), 2);

        let err = sim.update(delay).unwrap_err();
        assert_eq!(err.error_code(), "SCRIPT_REJECTED");
        assert_eq!(sim.timers().pending().len(), 1);

        // the encounter timer still fires on the next update
        sim.update(0.0).unwrap();
        let encounter = sim.encounter().unwrap();
        assert_ne!(encounter.id, first);
        assert!(encounter.is_active);
        assert!(sim.timers().is_empty());
    }

    #[test]
    fn invalid_tick_is_rejected_before_anything_changes() {
        let mut sim = fixture::simulation();
        for dt in [f64::NAN, f64::INFINITY, -0.5] {
            let err = sim.update(dt).unwrap_err();
            assert_eq!(err.error_code(), "INVALID_TICK");
        }
        assert_eq!(sim.clock(), 0.0);
        assert_eq!(sim.player().action_meter, Decimal::ZERO);
    }

    #[test]
    fn idle_phase_does_not_fill_meters() {
        let mut sim = fixture::builder().build().unwrap();
        sim.update(10.0).unwrap();
        assert_eq!(sim.player().action_meter, Decimal::ZERO);
        assert_eq!(sim.clock(), 10.0);
    }

    #[test]
    fn lethal_hit_ends_encounter_and_schedules_next() {
        // target index, then roll 0 hits and critical roll 99 does not crit
        let mut sim = fixture::simulation_with_rolls([0, 0, 99]);
        let player = sim.player().id();
        let creature = fixture::first_creature(&sim);
        {
            let hero = sim.character_mut(player).unwrap();
            // 14 + 1 * 1 = 15 damage
            hero.attribute_mut(AttributeKind::Damage).base_value = d(14);
            // act on the first tick
            hero.action_meter = d(2);
        }
        {
            let rat = sim.character_mut(creature).unwrap();
            rat.attribute_mut(AttributeKind::Defense).base_value = Decimal::ZERO;
            rat.current_health = d(10);
        }
        let first = sim.encounter().unwrap().id;
        let log = log_events(&mut sim, &[CHARACTER_DIED, ENCOUNTER_ENDED]);

        sim.update(0.0).unwrap();

        let names: Vec<_> = log.borrow().iter().map(|e| e.name.clone()).collect();
        assert_eq!(names, vec![CHARACTER_DIED, ENCOUNTER_ENDED]);
        assert_eq!(sim.character(creature).unwrap().current_health, d(-5));
        assert_eq!(sim.timers().pending().len(), 1);

        // the next encounter starts once the delay has passed
        sim.update(sim.config().next_encounter_delay).unwrap();
        assert_ne!(sim.encounter().unwrap().id, first);
        assert!(sim.character(creature).is_none());
    }

    #[test]
    fn expired_status_is_removed() {
        let modifiers = ModifierRegistry::new();
        let mut definitions = fixture::definitions();
        definitions
            .add_status(
                StatusDefinition {
                    id: StatusId(1),
                    name: "stunned".into(),
                    modifiers: vec![],
                },
                &modifiers,
            )
            .unwrap();
        let mut sim = fixture::builder().definitions(definitions).build().unwrap();
        let player = sim.player().id();
        sim.add_status(player, StatusId(1), d(1)).unwrap();

        sim.update(0.5).unwrap();
        assert!(sim.player().has_status(StatusId(1)));
        sim.update(0.5).unwrap();
        assert!(!sim.player().has_status(StatusId(1)));
    }

    #[test]
    fn calculated_property_runs_every_tick() {
        let scripts = NativeScripts::with_defaults()
            .with("tick_up", |f, b| Ok(Value::Number(b.number(f, "value")? + Decimal::ONE)));
        let mut sim = fixture::builder().scripts(scripts).build().unwrap();
        let player = sim.player().id();
        sim.calculate(player, "xp", Formula::new("tick_up")).unwrap();

        sim.update(0.1).unwrap();
        sim.update(0.1).unwrap();
        assert_eq!(sim.player().xp, d(2));
        assert_eq!(sim.player().entity().calculated().len(), 1);
    }
}
