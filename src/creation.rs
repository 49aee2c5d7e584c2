//! Creation definitions and live instances.
//!
//! A [`CreationDefinition`] is the serialized asset: a named bundle of scene
//! nodes and variable definitions. [`CreationInstance::instantiate`] builds
//! the node hierarchy under a fresh root, spins up one shared script host,
//! and binds every variable exactly once. After that the instance is the only
//! API surface a client needs: `advance_tick`, `get`, `set`, and the
//! diagnostics queue.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::conversion;
use crate::diagnostics::{BindingIssue, IssueQueue};
use crate::scene_graph::{NodeId, SceneGraph};
use crate::script_host::ScriptHost;
use crate::script_log;
use crate::value::Value;
use crate::variable::{VarContext, Variable, VariableDefinition};

// ============================================================================
// Definitions
// ============================================================================

fn default_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

fn default_visible() -> bool {
    true
}

fn default_tint() -> [f32; 4] {
    [1.0, 1.0, 1.0, 1.0]
}

fn default_weight() -> f32 {
    1.0
}

/// Follow component in a node definition; the target is a node name resolved
/// after all nodes exist.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowDefinition {
    pub target: String,
    #[serde(default = "default_weight")]
    pub weight: f32,
    #[serde(default)]
    pub offset: [f32; 3],
}

/// One scene node in a creation asset.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDefinition {
    pub name: String,
    /// Name of the parent node; absent means parented to the creation root.
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub position: [f32; 3],
    /// Euler degrees, intrinsic YXZ.
    #[serde(default)]
    pub rotation_euler: [f32; 3],
    #[serde(default = "default_scale")]
    pub scale: [f32; 3],
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default = "default_tint")]
    pub tint: [f32; 4],
    #[serde(default)]
    pub follow: Option<FollowDefinition>,
}

/// The serialized creation asset.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationDefinition {
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<NodeDefinition>,
    #[serde(default)]
    pub variables: Vec<VariableDefinition>,
}

// ============================================================================
// Instance
// ============================================================================

/// A live creation: its scene subtree, script host and bound variables.
pub struct CreationInstance {
    name: String,
    scene: SceneGraph,
    root: NodeId,
    host: ScriptHost,
    variables: Vec<Variable>,
    issues: IssueQueue,
    tick: u64,
}

impl CreationInstance {
    /// Build the node hierarchy and bind every variable.
    ///
    /// Never fails: malformed nodes and unbindable variables degrade with a
    /// diagnostic, and the instance comes up with whatever did bind.
    pub fn instantiate(def: &CreationDefinition) -> CreationInstance {
        let mut scene = SceneGraph::new();
        let root = scene.create(&def.name);

        // First pass: create nodes and stamp their local state.
        let mut by_name: HashMap<&str, NodeId> = HashMap::new();
        let mut created: Vec<(&NodeDefinition, NodeId)> = Vec::with_capacity(def.nodes.len());
        for node_def in &def.nodes {
            if by_name.contains_key(node_def.name.as_str()) {
                log::warn!(
                    "creation '{}': duplicate node name '{}', keeping the first",
                    def.name,
                    node_def.name
                );
                continue;
            }
            let id = scene.create(&node_def.name);
            by_name.insert(&node_def.name, id);
            created.push((node_def, id));

            let node = scene.get_mut(id).expect("node just created");
            node.visible = node_def.visible;
            node.tint = glam::Vec4::from_array(node_def.tint);
            node.transform.position = glam::Vec3::from_array(node_def.position);
            node.transform.rotation =
                conversion::quat_from_euler_deg(glam::Vec3::from_array(node_def.rotation_euler));
            node.transform.scale = glam::Vec3::from_array(node_def.scale);
        }

        // Second pass: wire parents and follow targets, now that every node
        // exists regardless of declaration order.
        for (node_def, id) in created {
            let parent = match &node_def.parent {
                None => root,
                Some(name) => match by_name.get(name.as_str()) {
                    Some(&p) => p,
                    None => {
                        log::warn!(
                            "creation '{}': node '{}' names unknown parent '{}', \
                             parenting to root",
                            def.name,
                            node_def.name,
                            name
                        );
                        root
                    }
                },
            };
            if !scene.set_parent(id, parent) {
                log::warn!(
                    "creation '{}': could not parent '{}', leaving under root",
                    def.name,
                    node_def.name
                );
                scene.set_parent(id, root);
            }

            if let Some(follow_def) = &node_def.follow {
                let target = by_name.get(follow_def.target.as_str()).copied();
                if target.is_none() {
                    log::warn!(
                        "creation '{}': node '{}' follows unknown node '{}'",
                        def.name,
                        node_def.name,
                        follow_def.target
                    );
                }
                let node = scene.get_mut(id).expect("node just created");
                node.follow.target = target;
                node.follow.weight = follow_def.weight;
                node.follow.offset = glam::Vec3::from_array(follow_def.offset);
            }
        }

        let host = ScriptHost::new();
        let mut issues = IssueQueue::new();
        let mut variables = Vec::with_capacity(def.variables.len());
        for var_def in &def.variables {
            if variables
                .iter()
                .any(|v: &Variable| v.name() == var_def.name)
            {
                log::warn!(
                    "creation '{}': duplicate variable '{}', keeping the first",
                    def.name,
                    var_def.name
                );
                continue;
            }
            variables.push(Variable::bind(
                var_def.clone(),
                &scene,
                root,
                Some(&host),
                &def.name,
                &mut issues,
            ));
        }

        CreationInstance {
            name: def.name.clone(),
            scene,
            root,
            host,
            variables,
            issues,
            tick: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneGraph {
        &mut self.scene
    }

    /// Advance the instance clock. Drivers memoize against the tick, so this
    /// is what makes them recompute on their next read.
    pub fn advance_tick(&mut self) {
        self.tick += 1;
        script_log::reset_tick_log_count();
    }

    /// Read a variable by name in its declared representation.
    pub fn get(&mut self, name: &str) -> Option<Value> {
        let idx = self.variables.iter().position(|v| v.name() == name)?;
        let var = &mut self.variables[idx];
        let mut ctx = VarContext {
            scene: &mut self.scene,
            host: Some(&mut self.host),
            tick: self.tick,
            issues: &mut self.issues,
        };
        Some(var.get(&mut ctx))
    }

    /// Write a variable by name. Returns false when the variable does not
    /// exist or dropped the write.
    pub fn set(&mut self, name: &str, value: Value) -> bool {
        let Some(idx) = self.variables.iter().position(|v| v.name() == name) else {
            return false;
        };
        let var = &mut self.variables[idx];
        let mut ctx = VarContext {
            scene: &mut self.scene,
            host: Some(&mut self.host),
            tick: self.tick,
            issues: &mut self.issues,
        };
        var.set(&mut ctx, value)
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name() == name)
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn issues(&self) -> &IssueQueue {
        &self.issues
    }

    /// Drain pending diagnostics.
    pub fn take_issues(&mut self) -> Vec<BindingIssue> {
        self.issues.take_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueKind;
    use glam::Vec3;

    fn turret_def() -> CreationDefinition {
        serde_json::from_str(
            r#"{
                "name": "turret",
                "nodes": [
                    { "name": "base", "position": [0.0, 1.0, 0.0] },
                    {
                        "name": "barrel",
                        "parent": "base",
                        "position": [0.0, 0.0, 2.0],
                        "follow": { "target": "base", "weight": 0.5 }
                    }
                ],
                "variables": [
                    {
                        "name": "muzzle",
                        "type": "PositionRoot",
                        "objectLink": "barrel",
                        "memberLink": "transform.position",
                        "conversionMethod": "RootToWorld"
                    },
                    { "name": "heat", "type": "Double", "defaultValue": 20.0 }
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_instantiate_builds_hierarchy() {
        let mut inst = CreationInstance::instantiate(&turret_def());
        assert!(inst.issues().is_empty());
        assert_eq!(inst.scene().len(), 3);

        let root = inst.root();
        let base = inst.scene().find_by_path(root, "base").unwrap();
        let barrel = inst.scene().find_by_path(root, "base/barrel").unwrap();
        assert_eq!(inst.scene().parent(base), Some(root));
        assert_eq!(inst.scene().parent(barrel), Some(base));

        let node = inst.scene().get(barrel).unwrap();
        assert_eq!(node.follow.target, Some(base));
        assert_eq!(node.follow.weight, 0.5);
        assert_eq!(node.transform.position, Vec3::new(0.0, 0.0, 2.0));

        assert_eq!(inst.get("heat"), Some(Value::Double(20.0)));
        let _ = inst.scene_mut();
    }

    #[test]
    fn test_get_set_round_trip() {
        let mut inst = CreationInstance::instantiate(&turret_def());
        assert!(inst.set("heat", Value::Double(75.0)));
        assert_eq!(inst.get("heat"), Some(Value::Double(75.0)));
        assert_eq!(inst.get("nonexistent"), None);
        assert!(!inst.set("nonexistent", Value::Double(1.0)));
    }

    #[test]
    fn test_member_variable_sees_root_motion() {
        let mut inst = CreationInstance::instantiate(&turret_def());
        // barrel sits at base (0,1,0) + (0,0,2) = world (0,1,2).
        assert_eq!(inst.get("muzzle"), Some(Value::Vec3(Vec3::new(0.0, 1.0, 2.0))));

        let root = inst.root();
        inst.scene_mut().get_mut(root).unwrap().transform.position = Vec3::new(10.0, 0.0, 0.0);
        assert_eq!(
            inst.get("muzzle"),
            Some(Value::Vec3(Vec3::new(10.0, 1.0, 2.0)))
        );
        assert!(inst.variable("muzzle").unwrap().changed());
    }

    #[test]
    fn test_unknown_parent_falls_back_to_root() {
        let def: CreationDefinition = serde_json::from_str(
            r#"{
                "name": "rig",
                "nodes": [{ "name": "arm", "parent": "ghost" }],
                "variables": []
            }"#,
        )
        .unwrap();
        let inst = CreationInstance::instantiate(&def);
        let arm = inst.scene().find_by_path(inst.root(), "arm").unwrap();
        assert_eq!(inst.scene().parent(arm), Some(inst.root()));
    }

    #[test]
    fn test_duplicate_variable_keeps_first() {
        let def = CreationDefinition {
            name: "rig".into(),
            nodes: Vec::new(),
            variables: vec![
                {
                    let mut d = VariableDefinition::new("speed", ValueKind::Double);
                    d.default_value = Some(1.0);
                    d
                },
                {
                    let mut d = VariableDefinition::new("speed", ValueKind::Double);
                    d.default_value = Some(2.0);
                    d
                },
            ],
        };
        let mut inst = CreationInstance::instantiate(&def);
        assert_eq!(inst.variables().len(), 1);
        assert_eq!(inst.get("speed"), Some(Value::Double(1.0)));
    }

    #[test]
    fn test_driver_variable_ticks_with_the_instance() {
        let def = CreationDefinition {
            name: "rig".into(),
            nodes: Vec::new(),
            variables: vec![{
                let mut d = VariableDefinition::new("spin", ValueKind::Double);
                d.driver_script = "spin += 1.0;".into();
                d
            }],
        };
        let mut inst = CreationInstance::instantiate(&def);
        inst.advance_tick();
        assert_eq!(inst.get("spin"), Some(Value::Double(1.0)));
        assert_eq!(inst.get("spin"), Some(Value::Double(1.0)));
        inst.advance_tick();
        assert_eq!(inst.get("spin"), Some(Value::Double(2.0)));
        // Drivers are read-only through the instance surface too.
        assert!(!inst.set("spin", Value::Double(9.0)));
    }

    #[test]
    fn test_missing_link_surfaces_as_issue() {
        let def = CreationDefinition {
            name: "rig".into(),
            nodes: Vec::new(),
            variables: vec![{
                let mut d = VariableDefinition::new("aim", ValueKind::PositionWorld);
                d.object_link = "ghost".into();
                d
            }],
        };
        let mut inst = CreationInstance::instantiate(&def);
        assert_eq!(inst.issues().len(), 1);
        assert_eq!(inst.get("aim"), Some(Value::Vec3(Vec3::ZERO)));
        assert_eq!(inst.take_issues().len(), 1);
        assert!(inst.issues().is_empty());
    }
}
