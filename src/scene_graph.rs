//! Scene graph the creation variables bind against.
//!
//! Nodes are named, carry a local TRS transform plus a handful of addressable
//! components (visibility, tint, follow), and form a parent/child hierarchy.
//! [`SceneGraph::world_pose`] composes transforms down the parent chain into a
//! [`Pose`], which is the transform proxy the conversion layer consumes:
//! point/vector transforms with exact inverses, and the node's world rotation.

use std::collections::HashMap;

use glam::{Quat, Vec3, Vec4};

/// Unique identifier for scene nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// Local TRS transform of a node, relative to its parent.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

/// Follow component: the node tracks a target node with a weight and offset.
///
/// The target is a soft reference; it may dangle after the target node is
/// destroyed, and may be retargeted at any time.
#[derive(Debug, Clone, PartialEq)]
pub struct Follow {
    pub target: Option<NodeId>,
    pub weight: f32,
    pub offset: Vec3,
}

impl Default for Follow {
    fn default() -> Self {
        Self {
            target: None,
            weight: 1.0,
            offset: Vec3::ZERO,
        }
    }
}

/// A scene node.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub visible: bool,
    pub tint: Vec4,
    pub transform: Transform,
    pub follow: Follow,
    /// Parent node, or `None` for roots. Maintained via
    /// [`SceneGraph::set_parent`]; the graph keeps it acyclic.
    pub parent: Option<NodeId>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visible: true,
            tint: Vec4::ONE,
            transform: Transform::default(),
            follow: Follow::default(),
            parent: None,
        }
    }
}

// ============================================================================
// Pose
// ============================================================================

/// A node's resolved world (or ancestor-relative) TRS pose.
///
/// Forward and inverse transforms are exact mirrors of each other: the
/// inverse applies the reversed operations in reverse order, so
/// `inverse_transform_point(transform_point(p)) == p` up to float error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Compose this pose with a child transform (this pose is the parent).
    pub fn compose(&self, child: &Transform) -> Pose {
        Pose {
            position: self.position + self.rotation * (self.scale * child.position),
            rotation: self.rotation * child.rotation,
            scale: self.scale * child.scale,
        }
    }

    /// Transform a point from this pose's frame into the enclosing frame.
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.rotation * (self.scale * p) + self.position
    }

    /// Inverse of [`Pose::transform_point`].
    pub fn inverse_transform_point(&self, p: Vec3) -> Vec3 {
        recip_or_zero(self.scale) * (self.rotation.inverse() * (p - self.position))
    }

    /// Transform a vector (no translation) into the enclosing frame.
    pub fn transform_vector(&self, v: Vec3) -> Vec3 {
        self.rotation * (self.scale * v)
    }

    /// Inverse of [`Pose::transform_vector`].
    pub fn inverse_transform_vector(&self, v: Vec3) -> Vec3 {
        recip_or_zero(self.scale) * (self.rotation.inverse() * v)
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }
}

/// Component-wise reciprocal that maps zero components to zero instead of
/// infinity, so inverse transforms of degenerate frames stay finite.
fn recip_or_zero(v: Vec3) -> Vec3 {
    let r = |c: f32| if c.abs() > f32::EPSILON { 1.0 / c } else { 0.0 };
    Vec3::new(r(v.x), r(v.y), r(v.z))
}

// ============================================================================
// Scene graph
// ============================================================================

/// The scene graph: named nodes in a hierarchy.
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: HashMap<NodeId, Node>,
    next_id: u64,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            next_id: 1,
        }
    }

    fn new_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Create a new root-level node and return its ID.
    pub fn create(&mut self, name: impl Into<String>) -> NodeId {
        let id = self.new_id();
        self.nodes.insert(id, Node::new(name));
        id
    }

    /// Destroy a node. Its children are detached (become roots); references
    /// to it from follow targets are left dangling on purpose.
    pub fn destroy(&mut self, id: NodeId) -> bool {
        if self.nodes.remove(&id).is_none() {
            return false;
        }
        for node in self.nodes.values_mut() {
            if node.parent == Some(id) {
                node.parent = None;
            }
        }
        true
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn exists(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Parent a node under another. Rejects self-parenting and cycles.
    pub fn set_parent(&mut self, child: NodeId, parent: NodeId) -> bool {
        if child == parent || !self.exists(child) || !self.exists(parent) {
            return false;
        }
        // Walking up from the prospective parent must not reach the child.
        let mut cur = Some(parent);
        let mut hops = 0;
        while let Some(c) = cur {
            if c == child {
                return false;
            }
            hops += 1;
            if hops > self.nodes.len() {
                return false;
            }
            cur = self.nodes.get(&c).and_then(|n| n.parent);
        }
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
        true
    }

    pub fn clear_parent(&mut self, child: NodeId) {
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = None;
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    /// Direct children of a node, in stable (creation) order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.parent == Some(id))
            .map(|(child, _)| *child)
            .collect();
        out.sort();
        out
    }

    /// Find a node under `root` by path.
    ///
    /// A `/`-separated path walks direct children by name segment by segment.
    /// A single segment searches the whole subtree depth-first (including
    /// `root` itself).
    pub fn find_by_path(&self, root: NodeId, path: &str) -> Option<NodeId> {
        if path.is_empty() {
            return None;
        }
        if path.contains('/') {
            let mut cur = root;
            for segment in path.split('/') {
                cur = self
                    .children(cur)
                    .into_iter()
                    .find(|&c| self.nodes[&c].name == segment)?;
            }
            Some(cur)
        } else {
            self.find_in_subtree(root, path)
        }
    }

    fn find_in_subtree(&self, root: NodeId, name: &str) -> Option<NodeId> {
        let node = self.nodes.get(&root)?;
        if node.name == name {
            return Some(root);
        }
        for child in self.children(root) {
            if let Some(found) = self.find_in_subtree(child, name) {
                return Some(found);
            }
        }
        None
    }

    /// Resolve a node's world pose by composing transforms from the top of
    /// its parent chain down. Missing nodes resolve to the identity pose.
    pub fn world_pose(&self, id: NodeId) -> Pose {
        let mut chain = Vec::new();
        let mut cur = Some(id);
        while let Some(c) = cur {
            if chain.len() > self.nodes.len() {
                break;
            }
            let Some(node) = self.nodes.get(&c) else {
                break;
            };
            chain.push(c);
            cur = node.parent;
        }
        let mut pose = Pose::IDENTITY;
        for c in chain.iter().rev() {
            pose = pose.compose(&self.nodes[c].transform);
        }
        pose
    }
}
