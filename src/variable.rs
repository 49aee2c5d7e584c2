//! Creation variable definitions and the runtime facade.
//!
//! A [`VariableDefinition`] is the authoring-time description: name, semantic
//! kind, defaults, optional object/member links, conversion method and
//! optional driver script. [`Variable::bind`] resolves it exactly once at
//! instance startup into a [`Variable`], the object client code holds:
//! `get`/`set` plus change tracking, with the storage location, native type
//! and coordinate frame all hidden behind the bound conversion closures.
//!
//! Binding failures are never fatal: the variable degrades to inert (neutral
//! reads, ignored writes) for the lifetime of the instance, and the reason is
//! recorded as a diagnostic.

use serde::{Deserialize, Serialize};

use crate::conversion::{self, ConversionMethod, Converter};
use crate::diagnostics::{BindingIssue, IssueKind, IssueQueue};
use crate::reference_chain::{self, ReferenceChain};
use crate::scene_graph::{NodeId, SceneGraph};
use crate::script_host::ScriptHost;
use crate::value::{Value, ValueKind};
use crate::value_source::{ScriptDriver, ValueContainer, ValueSource};

// ============================================================================
// Definition
// ============================================================================

/// Authoring-time variable description, immutable once bound.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ValueKind,
    /// Default for numeric and boolean kinds (non-zero means true).
    #[serde(default)]
    pub default_value: Option<f64>,
    #[serde(default)]
    pub default_string: Option<String>,
    /// Default for vector, Euler and quaternion kinds; unused trailing
    /// components are ignored. An all-zero quaternion default means identity.
    #[serde(default)]
    pub default_vector: Option<[f32; 4]>,
    #[serde(default)]
    pub default_matrix: Option<[[f32; 4]; 4]>,
    /// Path to a scene node under the creation root; empty = no link.
    #[serde(default)]
    pub object_link: String,
    /// Dotted member path on the linked node; empty = none.
    #[serde(default)]
    pub member_link: String,
    #[serde(default)]
    pub conversion_method: ConversionMethod,
    /// Driver script source; non-empty implies the variable is computed and
    /// read-only.
    #[serde(default)]
    pub driver_script: String,
    #[serde(default)]
    pub read_only: bool,
    /// Driver recomputes on every Get instead of once per tick.
    #[serde(default)]
    pub frame_independent: bool,
    /// Let the chain walker pre-dereference reference members and re-root
    /// the chain. Leave off when the reference may be retargeted later.
    #[serde(default)]
    pub shorten_chain: bool,
}

impl VariableDefinition {
    /// Minimal definition: a self-stored variable of the given kind.
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default_value: None,
            default_string: None,
            default_vector: None,
            default_matrix: None,
            object_link: String::new(),
            member_link: String::new(),
            conversion_method: ConversionMethod::None,
            driver_script: String::new(),
            read_only: false,
            frame_independent: false,
            shorten_chain: false,
        }
    }

    /// Resolve the populated default field for this kind, falling back to
    /// the kind's neutral value.
    pub fn initial_value(&self) -> Value {
        use crate::value::Storage;
        match self.kind.storage() {
            Storage::Double => self
                .default_value
                .map(Value::Double)
                .unwrap_or_else(|| self.kind.neutral()),
            Storage::Float => self
                .default_value
                .map(|v| Value::Float(v as f32))
                .unwrap_or_else(|| self.kind.neutral()),
            Storage::Int => self
                .default_value
                .map(|v| Value::Int(v as i64))
                .unwrap_or_else(|| self.kind.neutral()),
            Storage::Bool => self
                .default_value
                .map(|v| Value::Bool(v != 0.0))
                .unwrap_or_else(|| self.kind.neutral()),
            Storage::Str => self
                .default_string
                .clone()
                .map(Value::Str)
                .unwrap_or_else(|| self.kind.neutral()),
            Storage::Vec2 => self
                .default_vector
                .map(|v| Value::Vec2(glam::Vec2::new(v[0], v[1])))
                .unwrap_or_else(|| self.kind.neutral()),
            Storage::Vec3 => self
                .default_vector
                .map(|v| Value::Vec3(glam::Vec3::new(v[0], v[1], v[2])))
                .unwrap_or_else(|| self.kind.neutral()),
            Storage::Vec4 => self
                .default_vector
                .map(|v| Value::Vec4(glam::Vec4::from_array(v)))
                .unwrap_or_else(|| self.kind.neutral()),
            Storage::Quat => match self.default_vector {
                Some([0.0, 0.0, 0.0, 0.0]) | None => self.kind.neutral(),
                Some(v) => Value::Quat(glam::Quat::from_array(v).normalize()),
            },
            Storage::Mat4 => self
                .default_matrix
                .map(|m| Value::Mat4(glam::Mat4::from_cols_array_2d(&m)))
                .unwrap_or_else(|| self.kind.neutral()),
        }
    }
}

// ============================================================================
// Runtime facade
// ============================================================================

/// Where a bound variable's native value lives.
enum Binding {
    /// Self-owned container or script driver.
    Stored(Box<dyn ValueSource>),
    /// A member on a scene node, reached through a resolved chain.
    Member(ReferenceChain),
    /// Binding failed: neutral reads, ignored writes, forever.
    Inert,
}

/// Per-access context. The tick is an explicit parameter, never ambient
/// state; drivers use it for their once-per-tick memoization.
pub struct VarContext<'a> {
    pub scene: &'a mut SceneGraph,
    pub host: Option<&'a mut ScriptHost>,
    pub tick: u64,
    pub issues: &'a mut IssueQueue,
}

/// A bound creation variable.
pub struct Variable {
    def: VariableDefinition,
    binding: Binding,
    converter: Option<Converter>,
    last_seen: Option<Value>,
    previous: Value,
    changed: bool,
    warned_dangling: bool,
}

impl Variable {
    /// Resolve a definition against the scene, exactly once.
    ///
    /// `root` is the creation root node; `owner` names the creation for
    /// diagnostics. Returns a bound or inert variable, never an error: all
    /// failures degrade and are pushed onto `issues`.
    pub fn bind(
        mut def: VariableDefinition,
        scene: &SceneGraph,
        root: NodeId,
        host: Option<&ScriptHost>,
        owner: &str,
        issues: &mut IssueQueue,
    ) -> Variable {
        let has_driver = !def.driver_script.is_empty();
        if has_driver {
            def.read_only = true;
        }
        let initial = def.initial_value();

        // Resolve the linked node; without a link the creation root is the
        // local frame.
        let linked = if def.object_link.is_empty() {
            root
        } else {
            match scene.find_by_path(root, &def.object_link) {
                Some(id) => id,
                None => {
                    issues.push(BindingIssue::bind(
                        IssueKind::MissingNode,
                        &def.name,
                        format!("node '{}' not found", def.object_link),
                    ));
                    return Variable::inert(def);
                }
            }
        };

        if has_driver && !def.member_link.is_empty() {
            log::warn!(
                "variable '{}': driver takes precedence, memberLink '{}' ignored",
                def.name,
                def.member_link
            );
        }

        if !def.member_link.is_empty() && !has_driver {
            return Variable::bind_member(def, scene, linked, root, issues);
        }

        // Stored: self-owned container, or a driver over the shared host.
        let converter = match conversion::build(
            def.kind,
            def.conversion_method,
            def.kind,
            linked,
            root,
        ) {
            Ok(c) => c,
            Err(e) => {
                issues.push(BindingIssue::bind(
                    IssueKind::UnsupportedType,
                    &def.name,
                    e.to_string(),
                ));
                return Variable::inert(def);
            }
        };

        let source: Box<dyn ValueSource> = if has_driver {
            let Some(host) = host else {
                issues.push(BindingIssue::bind(
                    IssueKind::MissingScriptHost,
                    &def.name,
                    "driver variable bound without a script host",
                ));
                return Variable::inert(def);
            };
            if !is_identifier(&def.name) {
                issues.push(BindingIssue::bind(
                    IssueKind::DriverCompile,
                    &def.name,
                    "name is not usable as a script global",
                ));
                return Variable::inert(def);
            }
            match ScriptDriver::compile(
                host,
                &def.name,
                owner,
                &def.driver_script,
                def.kind,
                initial.clone(),
                def.frame_independent,
            ) {
                Ok(driver) => Box::new(driver),
                Err(e) => {
                    let raw = e.to_string();
                    issues.push(
                        BindingIssue::bind(
                            IssueKind::DriverCompile,
                            &def.name,
                            format!("driver failed to compile: {raw}"),
                        )
                        .with_raw(raw),
                    );
                    return Variable::inert(def);
                }
            }
        } else {
            Box::new(ValueContainer::new(initial.clone()))
        };

        Variable::bound(def, Binding::Stored(source), converter, initial)
    }

    fn bind_member(
        def: VariableDefinition,
        scene: &SceneGraph,
        linked: NodeId,
        root: NodeId,
        issues: &mut IssueQueue,
    ) -> Variable {
        let chain =
            match reference_chain::walk(scene, linked, &def.member_link, def.shorten_chain) {
                Ok(chain) => chain,
                Err(e) => {
                    issues.push(BindingIssue::bind(
                        IssueKind::InvalidMemberPath,
                        &def.name,
                        e.to_string(),
                    ));
                    return Variable::inert(def);
                }
            };
        let converter = match conversion::build(
            def.kind,
            def.conversion_method,
            chain.native_kind(),
            linked,
            root,
        ) {
            Ok(c) => c,
            Err(e) => {
                issues.push(BindingIssue::bind(
                    IssueKind::UnsupportedType,
                    &def.name,
                    e.to_string(),
                ));
                return Variable::inert(def);
            }
        };
        let initial = def.initial_value();
        Variable::bound(def, Binding::Member(chain), converter, initial)
    }

    fn bound(
        def: VariableDefinition,
        binding: Binding,
        converter: Converter,
        initial: Value,
    ) -> Variable {
        Variable {
            def,
            binding,
            converter: Some(converter),
            last_seen: None,
            previous: initial,
            changed: false,
            warned_dangling: false,
        }
    }

    fn inert(def: VariableDefinition) -> Variable {
        let neutral = def.kind.neutral();
        Variable {
            def,
            binding: Binding::Inert,
            converter: None,
            last_seen: None,
            previous: neutral,
            changed: false,
            warned_dangling: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn value_type(&self) -> ValueKind {
        self.def.kind
    }

    /// Driver variables always report read-only.
    pub fn read_only(&self) -> bool {
        self.def.read_only
    }

    pub fn is_inert(&self) -> bool {
        matches!(self.binding, Binding::Inert)
    }

    /// The outer value observed before the most recent change.
    pub fn previous_value(&self) -> &Value {
        &self.previous
    }

    /// Whether the latest `get` observed a different value than the one
    /// before it.
    pub fn changed(&self) -> bool {
        self.changed
    }

    /// Read the variable in its declared representation.
    pub fn get(&mut self, ctx: &mut VarContext<'_>) -> Value {
        let outer = match (&mut self.binding, &self.converter) {
            (Binding::Stored(source), Some(conv)) => {
                let native = source
                    .refresh(ctx.host.as_deref_mut(), ctx.tick, ctx.issues)
                    .clone();
                conv.read(ctx.scene, &native)
            }
            (Binding::Member(chain), Some(conv)) => match chain.read(ctx.scene) {
                Some(native) => conv.read(ctx.scene, &native),
                None => {
                    self.warn_dangling();
                    self.def.kind.neutral()
                }
            },
            _ => self.def.kind.neutral(),
        };

        // Change tracking is lazy: only observed reads move it.
        if let Some(last) = &self.last_seen {
            if *last != outer {
                self.previous = last.clone();
                self.changed = true;
            } else {
                self.changed = false;
            }
        }
        self.last_seen = Some(outer.clone());
        outer
    }

    /// Write the variable from its declared representation. Returns false
    /// when the write was dropped (inert, read-only, driver-bound, storage
    /// mismatch or dangling chain).
    pub fn set(&mut self, ctx: &mut VarContext<'_>, value: Value) -> bool {
        if self.is_inert() || self.def.read_only {
            return false;
        }
        let Some(conv) = &self.converter else {
            return false;
        };
        let Some(outer) = value.coerce(self.def.kind.storage()) else {
            log::warn!(
                "variable '{}': rejected {:?} write, expected {:?} storage",
                self.def.name,
                value.storage(),
                self.def.kind.storage()
            );
            return false;
        };
        let native = conv.write(ctx.scene, &outer);
        match &mut self.binding {
            Binding::Stored(source) => source.store(native),
            Binding::Member(chain) => {
                let ok = chain.write(ctx.scene, &native);
                if !ok {
                    self.warn_dangling();
                }
                ok
            }
            Binding::Inert => false,
        }
    }

    fn warn_dangling(&mut self) {
        if !self.warned_dangling {
            log::warn!(
                "variable '{}': member chain dangles, degrading to neutral",
                self.def.name
            );
            self.warned_dangling = true;
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
