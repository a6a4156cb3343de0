//! Simulation context.
//!
//! [`Simulation`] owns everything a rules operation can touch: the roster of
//! characters, the modifier and content registries, the simulation-wide event
//! bus, the script host, the random source, the timer queue and the rules
//! configuration. Every operation receives it explicitly; there is no ambient
//! engine state.

mod builder;
mod effects;
#[cfg(test)]
pub(crate) mod fixture;
mod roster;
mod snapshot;
mod tick;

use rust_decimal::Decimal;
use tracing::trace;

use crate::character::Character;
use crate::config::RulesConfig;
use crate::content::Definitions;
use crate::encounter::Encounter;
use crate::entity::{EntityId, IdAllocator, Modifiable};
use crate::error::{ConfigError, RulesError};
use crate::events::{Event, EventBus, Handler};
use crate::modifier::{self, Modifier, ModifierId, ModifierRegistry};
use crate::rng::RandomSource;
use crate::script::{Formula, ScriptHost};
use crate::timer::TimerQueue;
use crate::value::{Bindings, Table, Value};

pub use builder::SimulationBuilder;
pub use roster::Roster;
pub use snapshot::SimulationSnapshot;

/// Subscriber name used by the rules' own listeners.
pub const RULES_SUBSCRIBER: &str = "rules";

/// Global action phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ActionPhase {
    /// No character accumulates action meter.
    #[default]
    Idle,
    Combat,
}

pub struct Simulation {
    pub(crate) config: RulesConfig,
    pub(crate) scripts: Box<dyn ScriptHost>,
    pub(crate) rng: Box<dyn RandomSource>,
    pub(crate) modifiers: ModifierRegistry,
    pub(crate) definitions: Definitions,
    pub(crate) roster: Roster,
    pub(crate) encounter: Option<Encounter>,
    pub(crate) bus: EventBus,
    pub(crate) timers: TimerQueue,
    pub(crate) ids: IdAllocator,
    pub(crate) phase: ActionPhase,
    pub(crate) stage: Decimal,
    pub(crate) clock: f64,
}

impl Simulation {
    pub fn builder() -> SimulationBuilder {
        SimulationBuilder::new()
    }

    // ===== accessors =====

    pub fn config(&self) -> &RulesConfig {
        &self.config
    }

    pub fn scripts(&self) -> &dyn ScriptHost {
        &*self.scripts
    }

    pub fn modifiers(&self) -> &ModifierRegistry {
        &self.modifiers
    }

    pub fn definitions(&self) -> &Definitions {
        &self.definitions
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn player(&self) -> &Character {
        self.roster.player()
    }

    pub fn character(&self, id: EntityId) -> Option<&Character> {
        self.roster.get(id)
    }

    /// Direct mutable access for engine glue and tests. Rules-relevant
    /// changes should go through the operations on [`Simulation`].
    pub fn character_mut(&mut self, id: EntityId) -> Option<&mut Character> {
        self.roster.get_mut(id)
    }

    pub fn encounter(&self) -> Option<&Encounter> {
        self.encounter.as_ref()
    }

    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    pub fn phase(&self) -> ActionPhase {
        self.phase
    }

    pub fn set_phase(&mut self, phase: ActionPhase) {
        self.phase = phase;
    }

    pub fn stage(&self) -> Decimal {
        self.stage
    }

    /// Seconds simulated so far.
    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// Evaluates `formula` against `bindings` with the simulation's host.
    pub fn evaluate(&self, formula: &Formula, bindings: &Bindings) -> Result<Value, RulesError> {
        Ok(self.scripts.evaluate(formula, bindings)?)
    }

    /// Formula-facing view of a character.
    pub fn view(&self, id: EntityId) -> Result<Table, RulesError> {
        let character = self.roster.get(id).ok_or(RulesError::UnknownEntity(id))?;
        character.view(&*self.scripts)
    }

    // ===== events =====

    /// Registers a simulation-wide listener. [`RULES_SUBSCRIBER`] belongs to
    /// the encounter machine and cannot be replaced.
    pub fn watch(
        &mut self,
        event: &str,
        subscriber: &str,
        handler: Handler,
    ) -> Result<(), RulesError> {
        Self::check_subscriber(subscriber)?;
        self.bus.watch(event, subscriber, handler);
        Ok(())
    }

    pub fn unwatch(&mut self, event: &str, subscriber: &str) -> Result<bool, RulesError> {
        Self::check_subscriber(subscriber)?;
        Ok(self.bus.unwatch(event, subscriber))
    }

    fn check_subscriber(subscriber: &str) -> Result<(), RulesError> {
        if subscriber == RULES_SUBSCRIBER {
            return Err(ConfigError::ReservedSubscriber(subscriber.to_owned()).into());
        }
        Ok(())
    }

    /// Registers a listener on one entity's own bus.
    pub fn watch_entity(
        &mut self,
        id: EntityId,
        event: &str,
        subscriber: &str,
        handler: Handler,
    ) -> Result<(), RulesError> {
        let character = self.roster.get_mut(id).ok_or(RulesError::UnknownEntity(id))?;
        character.entity_mut().watch(event, subscriber, handler);
        Ok(())
    }

    pub fn listeners(&self) -> &EventBus {
        &self.bus
    }

    /// Emits a simulation-wide event.
    pub fn emit(&mut self, name: &str, context: Table) -> Result<(), RulesError> {
        let handlers = self.bus.snapshot(name);
        let event = Event::new(name, None, context);
        trace!(target: "rules::events", event_name = name, handlers = handlers.len(), "emit");
        self.dispatch(handlers, &event)
    }

    /// Emits an event from `source`: its own listeners run first, then the
    /// simulation-wide ones. Both lists are fixed before any handler runs.
    pub fn emit_from(
        &mut self,
        source: EntityId,
        name: &str,
        context: Table,
    ) -> Result<(), RulesError> {
        let mut handlers = self
            .roster
            .get(source)
            .map(|character| character.entity().listeners().snapshot(name))
            .unwrap_or_default();
        handlers.extend(self.bus.snapshot(name));
        let event = Event::new(name, Some(source), context);
        trace!(
            target: "rules::events",
            event_name = name,
            source = %source,
            handlers = handlers.len(),
            "emit"
        );
        self.dispatch(handlers, &event)
    }

    fn dispatch(&mut self, handlers: Vec<Handler>, event: &Event) -> Result<(), RulesError> {
        for handler in handlers {
            match handler {
                Handler::Native(callback) => callback(self, event)?,
                Handler::Script(formula) => {
                    let mut bindings = event.bindings();
                    if let Some(character) = event.source.and_then(|id| self.roster.get(id)) {
                        bindings.insert("this", character.view(&*self.scripts)?);
                    }
                    self.scripts.evaluate(&formula, &bindings)?;
                }
            }
        }
        Ok(())
    }

    // ===== modifiers =====

    pub fn register_modifier(&mut self, modifier: Modifier) -> Result<(), RulesError> {
        Ok(self.modifiers.register(modifier)?)
    }

    /// Applies a registered modifier to a character. See
    /// [`modifier::add_modifier`] for the no-op cases.
    pub fn add_modifier(&mut self, target: EntityId, id: ModifierId) -> Result<bool, RulesError> {
        let modifier = self.modifiers.resolve(id)?;
        let character = self
            .roster
            .get_mut(target)
            .ok_or(RulesError::UnknownEntity(target))?;
        modifier::add_modifier(character, modifier, &*self.scripts)
    }

    pub fn remove_modifier(&mut self, target: EntityId, id: ModifierId) -> Result<bool, RulesError> {
        let modifier = self.modifiers.resolve(id)?;
        let character = self
            .roster
            .get_mut(target)
            .ok_or(RulesError::UnknownEntity(target))?;
        modifier::remove_modifier(character, modifier, &*self.scripts)
    }

    pub(crate) fn apply_modifiers(
        &mut self,
        target: EntityId,
        ids: &[ModifierId],
    ) -> Result<(), RulesError> {
        for id in ids {
            self.add_modifier(target, *id)?;
        }
        Ok(())
    }

    pub(crate) fn unapply_modifiers(
        &mut self,
        target: EntityId,
        ids: &[ModifierId],
    ) -> Result<(), RulesError> {
        for id in ids {
            self.remove_modifier(target, *id)?;
        }
        Ok(())
    }

    /// Binds a character field to a formula recomputed every tick. The
    /// selector is resolved now so a typo fails at registration.
    pub fn calculate(
        &mut self,
        target: EntityId,
        field: &str,
        formula: Formula,
    ) -> Result<(), RulesError> {
        Character::fields().resolve(field)?;
        let character = self
            .roster
            .get_mut(target)
            .ok_or(RulesError::UnknownEntity(target))?;
        character.entity_mut().calculate(field, formula);
        Ok(())
    }

    pub(crate) fn require(&self, id: EntityId) -> Result<&Character, RulesError> {
        self.roster.get(id).ok_or(RulesError::UnknownEntity(id))
    }

    pub(crate) fn require_mut(&mut self, id: EntityId) -> Result<&mut Character, RulesError> {
        self.roster.get_mut(id).ok_or(RulesError::UnknownEntity(id))
    }

    pub(crate) fn missing_outcome(tag: &str) -> RulesError {
        ConfigError::UnknownOutcomeTag(tag.to_owned()).into()
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("player", &self.roster.player().id())
            .field("encounter", &self.encounter)
            .field("phase", &self.phase)
            .field("stage", &self.stage)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::encounter::{EncounterState, Resolution};
    use crate::events::CHARACTER_DIED;
    use crate::script::NativeScripts;
    use crate::table;

    const PING: &str = "ping";

    type Log = Rc<RefCell<Vec<&'static str>>>;

    fn logger(log: &Log, entry: &'static str) -> Handler {
        let log = Rc::clone(log);
        Handler::native(move |_, _| {
            log.borrow_mut().push(entry);
            Ok(())
        })
    }

    #[test]
    fn listener_added_during_emit_waits_for_next_emission() {
        let mut sim = fixture::simulation();
        let log: Log = Rc::default();
        let late = logger(&log, "b");
        let inner = Rc::clone(&log);
        sim.watch(
            PING,
            "a",
            Handler::native(move |sim, _| {
                inner.borrow_mut().push("a");
                sim.watch(PING, "b", late.clone())
            }),
        )
        .unwrap();

        sim.emit(PING, Table::new()).unwrap();
        assert_eq!(*log.borrow(), vec!["a"]);

        sim.emit(PING, Table::new()).unwrap();
        assert_eq!(*log.borrow(), vec!["a", "a", "b"]);
    }

    #[test]
    fn listener_removed_during_emit_still_runs_once() {
        let mut sim = fixture::simulation();
        let log: Log = Rc::default();
        let inner = Rc::clone(&log);
        sim.watch(
            PING,
            "a",
            Handler::native(move |sim, _| {
                inner.borrow_mut().push("a");
                sim.unwatch(PING, "b").map(|_| ())
            }),
        )
        .unwrap();
        sim.watch(PING, "b", logger(&log, "b")).unwrap();

        sim.emit(PING, Table::new()).unwrap();
        sim.emit(PING, Table::new()).unwrap();
        assert_eq!(*log.borrow(), vec!["a", "b", "a"]);
        assert!(!sim.listeners().is_watching(PING, "b"));
    }

    #[test]
    fn entity_listeners_run_before_simulation_listeners() {
        let mut sim = fixture::simulation();
        let player = sim.player().id();
        let log: Log = Rc::default();
        sim.watch(PING, "content", logger(&log, "global")).unwrap();
        sim.watch_entity(player, PING, "content", logger(&log, "entity")).unwrap();

        sim.emit_from(player, PING, Table::new()).unwrap();
        assert_eq!(*log.borrow(), vec!["entity", "global"]);

        log.borrow_mut().clear();
        sim.emit(PING, Table::new()).unwrap();
        assert_eq!(*log.borrow(), vec!["global"]);
    }

    #[test]
    fn failing_listener_stops_dispatch_and_reaches_emitter() {
        let mut sim = fixture::simulation();
        let player = sim.player().id();
        let log: Log = Rc::default();
        sim.watch_entity(
            player,
            PING,
            "content",
            Handler::native(|_, _| Err(ConfigError::UnknownStatus(9).into())),
        )
        .unwrap();
        sim.watch(PING, "later", logger(&log, "later")).unwrap();

        let err = sim.emit_from(player, PING, Table::new()).unwrap_err();
        assert_eq!(err, ConfigError::UnknownStatus(9).into());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn scripted_entity_listener_binds_source_as_this() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let recorded = Rc::clone(&seen);
        let scripts = NativeScripts::with_defaults().with("remember", move |_, bindings| {
            recorded.borrow_mut().push((
                bindings.entity("this.id"),
                bindings.get("amount").and_then(Value::as_number),
            ));
            Ok(Value::Nil)
        });
        let mut sim = fixture::builder().scripts(scripts).build().unwrap();
        let player = sim.player().id();
        sim.watch_entity(player, PING, "content", Handler::Script(Formula::new("remember")))
            .unwrap();

        sim.emit_from(player, PING, table! { "amount" => 3i64 }).unwrap();
        assert_eq!(*seen.borrow(), vec![(Some(player), Some(Decimal::from(3)))]);
    }

    #[test]
    fn rules_subscriber_cannot_be_replaced_by_content() {
        let mut sim = fixture::simulation();
        let encounter = sim.encounter().unwrap().id;
        let creature = fixture::first_creature(&sim);

        let err = sim
            .watch(CHARACTER_DIED, RULES_SUBSCRIBER, Handler::native(|_, _| Ok(())))
            .unwrap_err();
        assert_eq!(err.error_code(), "RESERVED_SUBSCRIBER");
        assert!(sim.unwatch(CHARACTER_DIED, RULES_SUBSCRIBER).is_err());
        assert!(sim.listeners().is_watching(CHARACTER_DIED, RULES_SUBSCRIBER));

        sim.kill(creature).unwrap();
        assert_eq!(
            sim.encounter_state(),
            EncounterState::Resolved(encounter, Resolution::Victory)
        );
    }
}
