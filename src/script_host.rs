//! Sandboxed script interpreter shared by a creation's drivers.
//!
//! One engine plus one persistent scope per creation instance: globals
//! published by one driver survive across ticks and are visible to every
//! other driver of the same creation. The operation budget doubles as the
//! driver execution timeout; a runaway script aborts deterministically when
//! the budget is exhausted instead of hanging a wall clock.

use rhai::{Dynamic, Engine, Scope, AST};

use crate::script_log;

/// Operation budget per script run; rhai aborts execution when exhausted.
pub const DRIVER_OP_BUDGET: u64 = 100_000;

/// The runtime environment driver scripts execute against.
pub struct ScriptHost {
    engine: Engine,
    scope: Scope<'static>,
}

impl ScriptHost {
    /// Create a host with the sandbox limits applied and the script logging
    /// API registered.
    pub fn new() -> Self {
        let mut engine = Engine::new();

        engine.set_max_expr_depths(64, 64);
        engine.set_max_call_levels(64);
        engine.set_max_operations(DRIVER_OP_BUDGET);
        engine.set_max_string_size(10_000);
        engine.set_max_array_size(1_000);
        engine.set_max_map_size(500);

        script_log::register(&mut engine);

        Self {
            engine,
            scope: Scope::new(),
        }
    }

    /// Compile a driver script to an AST, reusable across runs.
    pub fn compile(&self, script: &str) -> Result<AST, rhai::ParseError> {
        self.engine.compile(script)
    }

    /// Run a compiled script to completion against the shared scope.
    pub fn run(&mut self, ast: &AST) -> Result<(), Box<rhai::EvalAltResult>> {
        self.engine.run_ast_with_scope(&mut self.scope, ast)
    }

    /// Publish a global into the shared scope, creating or overwriting it.
    pub fn set_global(&mut self, name: &str, value: Dynamic) {
        if let Some(slot) = self.scope.get_mut(name) {
            *slot = value;
        } else {
            self.scope.push_dynamic(name.to_string(), value);
        }
    }

    /// Read a global back from the shared scope.
    pub fn get_global(&self, name: &str) -> Option<Dynamic> {
        self.scope.get(name).cloned()
    }
}

impl Default for ScriptHost {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_globals_round_trip_through_scripts() {
        let mut host = ScriptHost::new();
        host.set_global("speed", Dynamic::from_float(2.0));
        let ast = host.compile("speed *= 3.0;").unwrap();
        host.run(&ast).unwrap();
        let speed = host.get_global("speed").unwrap().as_float().unwrap();
        assert_eq!(speed, 6.0);
    }

    #[test]
    fn test_set_global_overwrites() {
        let mut host = ScriptHost::new();
        host.set_global("x", Dynamic::from_int(1));
        host.set_global("x", Dynamic::from_int(2));
        assert_eq!(host.get_global("x").unwrap().as_int().unwrap(), 2);
    }

    #[test]
    fn test_scope_persists_across_runs() {
        let mut host = ScriptHost::new();
        let ast = host.compile("let counter = 1;").unwrap();
        host.run(&ast).unwrap();
        assert_eq!(host.get_global("counter").unwrap().as_int().unwrap(), 1);
    }

    #[test]
    fn test_operation_budget_aborts_runaway_scripts() {
        let mut host = ScriptHost::new();
        let ast = host.compile("let i = 0; loop { i += 1; }").unwrap();
        assert!(host.run(&ast).is_err());
    }

    #[test]
    fn test_missing_global() {
        let host = ScriptHost::new();
        assert!(host.get_global("nope").is_none());
    }
}
