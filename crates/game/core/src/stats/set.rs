use std::collections::BTreeMap;

use strum::IntoEnumIterator;

use super::{Attribute, AttributeKind};

static UNSET: Attribute = Attribute::empty();

/// One [`Attribute`] per [`AttributeKind`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct AttributeSet {
    values: BTreeMap<AttributeKind, Attribute>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self {
            values: AttributeKind::iter()
                .map(|kind| (kind, Attribute::empty()))
                .collect(),
        }
    }

    pub fn get(&self, kind: AttributeKind) -> &Attribute {
        self.values.get(&kind).unwrap_or(&UNSET)
    }

    pub fn get_mut(&mut self, kind: AttributeKind) -> &mut Attribute {
        self.values.entry(kind).or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AttributeKind, &Attribute)> {
        self.values.iter().map(|(kind, attribute)| (*kind, attribute))
    }
}

impl Default for AttributeSet {
    fn default() -> Self {
        Self::new()
    }
}
