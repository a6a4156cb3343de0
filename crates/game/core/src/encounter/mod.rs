//! Encounter lifecycle.
//!
//! An encounter is one fight between the player and a generated group of
//! creatures. It starts on demand or from a timer, stays active while the
//! player and at least one creature are alive, and on resolution schedules
//! the next encounter when the player survived.

mod generate;
mod machine;

use std::fmt;

use rust_decimal::Decimal;

use crate::content::EncounterDefId;
use crate::entity::EntityId;

pub(crate) use generate::generate_player;

/// Runtime encounter identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct EncounterId(pub u64);

impl fmt::Display for EncounterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "encounter#{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Encounter {
    pub id: EncounterId,
    pub definition: EncounterDefId,
    pub stage: Decimal,
    /// Generated creatures in definition order.
    pub creatures: Vec<EntityId>,
    pub is_active: bool,
    /// Recorded once, when the encounter stops being active.
    pub resolution: Option<Resolution>,
}

impl Encounter {
    pub(crate) fn resolve(&mut self, resolution: Resolution) {
        self.is_active = false;
        self.resolution = Some(resolution);
    }
}

/// How a resolved encounter ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Resolution {
    /// Every creature died.
    Victory,
    /// The player died.
    Defeat,
}

/// Observable encounter state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EncounterState {
    NoEncounter,
    Active(EncounterId),
    Resolved(EncounterId, Resolution),
}
