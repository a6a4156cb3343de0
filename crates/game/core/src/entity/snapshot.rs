use super::{AppliedModifiers, CalculatedProperty, Entity, EntityId};
use crate::error::{ConfigError, RulesError};
use crate::events::{EventBus, ListenerSnapshot};
use crate::modifier::{ModifierId, ModifierRegistry};
use crate::value::Table;

/// Persistent form of an [`Entity`].
///
/// Applied modifiers are stored by id only. Their effects already live in the
/// owner's fields, so restoring re-resolves the ids against the registry
/// without re-applying them.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub flags: Vec<String>,
    /// `None` when the entity cannot carry modifiers.
    pub modifiers: Option<Vec<ModifierId>>,
    pub calculated: Vec<CalculatedProperty>,
    pub listeners: Vec<ListenerSnapshot>,
    pub extra: Table,
}

impl Entity {
    pub fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            id: self.id,
            flags: self.flags.iter().cloned().collect(),
            modifiers: match &self.modifiers {
                AppliedModifiers::Tracked(ids) => Some(ids.clone()),
                AppliedModifiers::Disabled => None,
            },
            calculated: self.calculated.clone(),
            listeners: self.listeners.scripted(),
            extra: self.extra.clone(),
        }
    }

    /// Rebuilds an entity, failing if any applied modifier id is unknown.
    pub fn restore(
        snapshot: EntitySnapshot,
        registry: &ModifierRegistry,
    ) -> Result<Self, RulesError> {
        let modifiers = match snapshot.modifiers {
            Some(ids) => {
                if let Some(missing) = ids.iter().find(|id| !registry.contains(**id)) {
                    return Err(ConfigError::UnknownModifier(*missing).into());
                }
                AppliedModifiers::Tracked(ids)
            }
            None => AppliedModifiers::Disabled,
        };

        Ok(Self {
            id: snapshot.id,
            flags: snapshot.flags.into_iter().collect(),
            modifiers,
            calculated: snapshot.calculated,
            listeners: EventBus::restore(&snapshot.listeners),
            extra: snapshot.extra,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Handler;
    use crate::modifier::Modifier;
    use crate::script::Formula;

    #[test]
    fn restore_resolves_applied_ids() {
        let mut registry = ModifierRegistry::new();
        registry
            .register(Modifier::flag(ModifierId(1), "blessed"))
            .unwrap();

        let mut entity = Entity::new(EntityId(5));
        entity.set_flag("blessed");
        entity.record_modifier(ModifierId(1));
        entity.set_extra("title", "Warden");
        entity.watch("attack_hit", "content", Handler::Script(Formula::new("cheer")));

        let restored = Entity::restore(entity.snapshot(), &registry).unwrap();
        assert_eq!(restored.id(), EntityId(5));
        assert!(restored.has_flag("blessed"));
        assert!(restored.has_modifier(ModifierId(1)));
        assert_eq!(restored.extra("title"), entity.extra("title"));
        assert!(restored.listeners().is_watching("attack_hit", "content"));
    }

    #[test]
    fn restore_rejects_unknown_modifier() {
        let registry = ModifierRegistry::new();
        let mut entity = Entity::new(EntityId(5));
        entity.record_modifier(ModifierId(9));

        let err = Entity::restore(entity.snapshot(), &registry).unwrap_err();
        assert_eq!(err, ConfigError::UnknownModifier(ModifierId(9)).into());
    }
}
