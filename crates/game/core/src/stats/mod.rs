//! Numeric attributes.
//!
//! ```text
//! total = ((base + level × per_level) + Σ additive) × Π multiplicative
//!         then scripted transforms, in attach order
//! ```

pub mod attribute;
pub mod bonus;
pub mod kind;
pub mod set;

pub use attribute::Attribute;
pub use bonus::{AttributeBonus, AttributeModifier, BonusStack};
pub use kind::AttributeKind;
pub use set::AttributeSet;
