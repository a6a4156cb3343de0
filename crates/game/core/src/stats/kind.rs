use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Numeric attributes every character carries.
///
/// The snake_case name doubles as the modifier selector and the key under
/// which the attribute total appears in formula bindings.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AttributeKind {
    Accuracy,
    ActionSpeed,
    CriticalDamageMultiplier,
    CriticalHitChance,
    Damage,
    Defense,
    Evasion,
    MaximumHealth,
    Penetration,
    Precision,
    Regeneration,
    Resilience,
    ResurrectionMultiplier,
}

impl AttributeKind {
    pub fn name(self) -> &'static str {
        self.into()
    }
}
