//! Scripting boundary.
//!
//! Content supplies behavior as [`Formula`] handles that a [`ScriptHost`]
//! evaluates against named [`Bindings`]. The rules core never interprets a
//! formula itself; it only checks that the returned [`Value`] has the shape
//! the call site declared.
//!
//! [`NativeScripts`] is the in-tree host backed by Rust closures. It ships with
//! the built-in formulas in [`builtin`].

pub mod builtin;
mod native;

use std::fmt;

use crate::error::ScriptError;
use crate::value::{Bindings, Value};

pub use native::{NativeScripts, ScriptFn};

/// Opaque handle to a piece of content behavior.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Formula(String);

impl Formula {
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    pub fn source(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Formula {
    fn from(source: &str) -> Self {
        Self::new(source)
    }
}

/// Type of a [`Value`], as declared by call sites and reported in errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Shape {
    Nil,
    Bool,
    Number,
    Text,
    Entity,
    Table,
}

/// Evaluates formulas.
///
/// Implementations must be pure with respect to the bindings: the same
/// formula and inputs yield the same value. Randomness reaches formulas only
/// through pre-drawn bindings.
pub trait ScriptHost {
    fn evaluate(&self, formula: &Formula, bindings: &Bindings) -> Result<Value, ScriptError>;
}

impl<T: ScriptHost + ?Sized> ScriptHost for Box<T> {
    fn evaluate(&self, formula: &Formula, bindings: &Bindings) -> Result<Value, ScriptError> {
        (**self).evaluate(formula, bindings)
    }
}
