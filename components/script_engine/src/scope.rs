//! Scoped engine entry.
//!
//! Every path that touches the engine must enter an isolate scope, a handle
//! scope, and the context, and must exit on every error path. `Scope` models
//! that as an RAII guard: entry on construction, exit on drop.

use crate::Engine;
use std::ops::{Deref, DerefMut};

/// RAII guard holding the engine entered.
///
/// # Examples
///
/// ```
/// use script_engine::{Engine, Scope, StubEngine};
///
/// let mut engine = StubEngine::default();
/// {
///     let mut scope = Scope::enter(&mut engine);
///     let obj = scope.new_object();
///     scope.set_property(&obj, "ready", core_types::ScriptValue::Boolean(true));
/// } // exited here, on success and error paths alike
/// ```
pub struct Scope<'e> {
    engine: &'e mut dyn Engine,
}

impl<'e> Scope<'e> {
    /// Enters the engine and returns the guard.
    pub fn enter(engine: &'e mut dyn Engine) -> Self {
        engine.enter();
        Self { engine }
    }
}

impl<'e> Deref for Scope<'e> {
    type Target = dyn Engine + 'e;

    fn deref(&self) -> &Self::Target {
        self.engine
    }
}

impl<'e> DerefMut for Scope<'e> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.engine
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        self.engine.exit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StubEngine;

    #[test]
    fn scope_balances_enter_and_exit() {
        let mut engine = StubEngine::default();
        {
            let _scope = Scope::enter(&mut engine);
        }
        assert_eq!(engine.scope_depth(), 0);
        assert_eq!(engine.times_entered(), 1);
    }

    #[test]
    fn scope_exits_on_early_return() {
        fn failing(engine: &mut StubEngine) -> Result<(), ()> {
            let _scope = Scope::enter(engine);
            Err(())
        }
        let mut engine = StubEngine::default();
        let _ = failing(&mut engine);
        assert_eq!(engine.scope_depth(), 0);
        assert_eq!(engine.times_entered(), 1);
    }
}
