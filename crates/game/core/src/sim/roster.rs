use std::collections::BTreeMap;

use crate::character::Character;
use crate::entity::EntityId;

/// The player plus every live creature, addressed by entity id.
#[derive(Clone, Debug)]
pub struct Roster {
    player: Character,
    creatures: BTreeMap<EntityId, Character>,
}

impl Roster {
    pub fn new(player: Character) -> Self {
        Self {
            player,
            creatures: BTreeMap::new(),
        }
    }

    pub fn player(&self) -> &Character {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut Character {
        &mut self.player
    }

    pub fn get(&self, id: EntityId) -> Option<&Character> {
        if self.player.id() == id {
            Some(&self.player)
        } else {
            self.creatures.get(&id)
        }
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Character> {
        if self.player.id() == id {
            Some(&mut self.player)
        } else {
            self.creatures.get_mut(&id)
        }
    }

    pub fn insert_creature(&mut self, creature: Character) {
        self.creatures.insert(creature.id(), creature);
    }

    pub fn remove_creature(&mut self, id: EntityId) -> Option<Character> {
        self.creatures.remove(&id)
    }

    pub fn creatures(&self) -> impl Iterator<Item = &Character> {
        self.creatures.values()
    }

    /// Player first, then creatures in id order.
    pub fn ids(&self) -> Vec<EntityId> {
        std::iter::once(self.player.id())
            .chain(self.creatures.keys().copied())
            .collect()
    }
}
