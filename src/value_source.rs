//! Stored and computed value strategies behind a variable.
//!
//! A [`ValueSource`] is the slot a variable reads from and writes to when it
//! is not linked to a scene member. [`ValueContainer`] is the trivial stored
//! cell; [`ScriptDriver`] recomputes the slot by running a compiled script
//! against the creation's shared script host, at most once per tick unless
//! marked frame-independent. Driver writes are no-ops: a driven value is
//! read-only by construction.

use rhai::AST;

use crate::diagnostics::{BindingIssue, IssueKind, IssueQueue};
use crate::script_host::ScriptHost;
use crate::value::{Value, ValueKind};
use crate::value_rhai::{from_dynamic, to_dynamic};

/// Strategy for producing (and possibly accepting) a variable's native value.
pub trait ValueSource {
    /// Current slot value without recomputation.
    fn value(&self) -> &Value;

    /// Bring the slot up to date for this tick and return it.
    fn refresh(
        &mut self,
        host: Option<&mut ScriptHost>,
        tick: u64,
        issues: &mut IssueQueue,
    ) -> &Value;

    /// Store a new value. Returns false when the source is computed.
    fn store(&mut self, value: Value) -> bool;

    /// Whether the value is computed rather than stored.
    fn is_computed(&self) -> bool;
}

// ============================================================================
// Stored cell
// ============================================================================

/// The minimal mutable typed cell.
pub struct ValueContainer {
    slot: Value,
}

impl ValueContainer {
    pub fn new(initial: Value) -> Self {
        Self { slot: initial }
    }
}

impl ValueSource for ValueContainer {
    fn value(&self) -> &Value {
        &self.slot
    }

    fn refresh(&mut self, _: Option<&mut ScriptHost>, _: u64, _: &mut IssueQueue) -> &Value {
        &self.slot
    }

    fn store(&mut self, value: Value) -> bool {
        self.slot = value;
        true
    }

    fn is_computed(&self) -> bool {
        false
    }
}

// ============================================================================
// Script driver
// ============================================================================

/// A computed cell: reads re-run a script, writes are ignored.
///
/// Each refresh publishes the slot under the variable's name as a global in
/// the shared scope, runs the compiled script to completion under the
/// engine's operation budget, and reads the global back. Any runtime failure
/// keeps the previous value unchanged.
pub struct ScriptDriver {
    variable: String,
    owner: String,
    ast: AST,
    native: ValueKind,
    slot: Value,
    frame_independent: bool,
    last_tick: Option<u64>,
}

impl ScriptDriver {
    /// Compile the driver script once; parse failures fail the binding.
    pub fn compile(
        host: &ScriptHost,
        variable: &str,
        owner: &str,
        script: &str,
        native: ValueKind,
        initial: Value,
        frame_independent: bool,
    ) -> Result<Self, rhai::ParseError> {
        let ast = host.compile(script)?;
        Ok(Self {
            variable: variable.to_string(),
            owner: owner.to_string(),
            ast,
            native,
            slot: initial,
            frame_independent,
            last_tick: None,
        })
    }

    pub fn is_frame_independent(&self) -> bool {
        self.frame_independent
    }
}

impl ValueSource for ScriptDriver {
    fn value(&self) -> &Value {
        &self.slot
    }

    fn refresh(
        &mut self,
        host: Option<&mut ScriptHost>,
        tick: u64,
        issues: &mut IssueQueue,
    ) -> &Value {
        if !self.frame_independent && self.last_tick == Some(tick) {
            return &self.slot;
        }
        // Mark the tick consumed even if the run fails: at most one attempt
        // per tick.
        self.last_tick = Some(tick);

        let Some(host) = host else {
            return &self.slot;
        };

        host.set_global(&self.variable, to_dynamic(&self.slot));
        if let Err(e) = host.run(&self.ast) {
            let raw = e.to_string();
            issues.push(
                BindingIssue::run(
                    IssueKind::DriverRuntime,
                    &self.variable,
                    format!("driver of '{}' failed: {}", self.owner, raw),
                )
                .with_raw(raw),
            );
            return &self.slot;
        }

        match host
            .get_global(&self.variable)
            .and_then(|d| from_dynamic(&d, self.native.storage()))
        {
            Some(value) => self.slot = value,
            None => {
                log::warn!(
                    "driver '{}' of '{}' produced no {:?} value, keeping previous",
                    self.variable,
                    self.owner,
                    self.native
                );
            }
        }
        &self.slot
    }

    fn store(&mut self, _: Value) -> bool {
        false
    }

    fn is_computed(&self) -> bool {
        true
    }
}
