use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use super::{Formula, ScriptHost, builtin};
use crate::error::ScriptError;
use crate::value::{Bindings, Value};

/// Native implementation of a formula.
pub type ScriptFn = Rc<dyn Fn(&Formula, &Bindings) -> Result<Value, ScriptError>>;

/// Script host that dispatches formulas to registered Rust closures by name.
#[derive(Clone, Default)]
pub struct NativeScripts {
    scripts: BTreeMap<String, ScriptFn>,
}

impl NativeScripts {
    /// Creates an empty host. Every evaluation is rejected until scripts
    /// are registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a host with the built-in rules formulas registered.
    pub fn with_defaults() -> Self {
        let mut scripts = Self::new();
        builtin::register(&mut scripts);
        scripts
    }

    /// Registers (or replaces) the implementation behind `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, script: F) -> &mut Self
    where
        F: Fn(&Formula, &Bindings) -> Result<Value, ScriptError> + 'static,
    {
        self.scripts.insert(name.into(), Rc::new(script));
        self
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with<F>(mut self, name: impl Into<String>, script: F) -> Self
    where
        F: Fn(&Formula, &Bindings) -> Result<Value, ScriptError> + 'static,
    {
        self.register(name, script);
        self
    }

    /// Registers a formula that ignores its inputs and yields `value`.
    #[must_use]
    pub fn with_constant(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.with(name, move |_, _| Ok(value.clone()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scripts.contains_key(name)
    }
}

impl ScriptHost for NativeScripts {
    fn evaluate(&self, formula: &Formula, bindings: &Bindings) -> Result<Value, ScriptError> {
        let script = self
            .scripts
            .get(formula.source())
            .ok_or_else(|| ScriptError::rejected(formula, "no script is registered"))?;
        trace!(target: "rules::script", formula = %formula, "evaluating");
        script(formula, bindings)
    }
}

impl fmt::Debug for NativeScripts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeScripts")
            .field("scripts", &self.scripts.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn unknown_formula_is_rejected() {
        let scripts = NativeScripts::new();
        let formula = Formula::new("missing");

        let err = scripts.evaluate(&formula, &Bindings::new()).unwrap_err();
        assert!(matches!(err, ScriptError::Rejected { .. }));
    }

    #[test]
    fn registered_closure_receives_bindings() {
        let scripts = NativeScripts::new().with("double", |formula, bindings| {
            Ok(Value::Number(bindings.number(formula, "value")? * Decimal::TWO))
        });

        let result = scripts
            .evaluate(&Formula::new("double"), &Bindings::new().with("value", 21i64))
            .unwrap();
        assert_eq!(result, Value::Number(Decimal::from(42)));
    }
}
