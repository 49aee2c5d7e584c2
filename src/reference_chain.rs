//! Dotted member-path resolution and cached access chains.
//!
//! A member link like `follow.target.transform.position` is validated once at
//! bind time against the member registry and compiled into a
//! [`ReferenceChain`]: a root node plus a sequence of resolved segments whose
//! accessors are plain fn pointers. Accesses after that never consult the
//! registry again.
//!
//! Reference segments (`parent`, `follow.target`) re-resolve on every access
//! because the referent can change. When the caller enables chain shortening,
//! references are instead dereferenced once during the walk and the chain is
//! re-rooted at the referent, keeping its length bounded by the distance from
//! the last reference hop.

use crate::member_registry::{self, MemberDef};
use crate::scene_graph::{Node, NodeId, SceneGraph};
use crate::value::{Value, ValueKind};

/// Error produced when a member path fails to resolve at bind time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkError {
    pub message: String,
}

impl std::fmt::Display for WalkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid member path: {}", self.message)
    }
}

impl std::error::Error for WalkError {}

fn err(message: impl Into<String>) -> WalkError {
    WalkError {
        message: message.into(),
    }
}

/// One resolved path segment.
#[derive(Clone, Copy)]
pub enum Segment {
    /// A composite hop: pure name scoping, nothing happens at access time.
    Scope,
    /// A reference hop: follow the referent (re-resolved on every access).
    Reference { get: fn(&Node) -> Option<NodeId> },
    /// The value leaf the chain terminates in.
    Leaf {
        kind: ValueKind,
        get: fn(&Node) -> Value,
        set: fn(&mut Node, &Value) -> bool,
    },
}

/// A compiled member path: root node plus resolved segments.
///
/// Invariant: the last segment is always a [`Segment::Leaf`]; every earlier
/// one is a scope or reference hop.
pub struct ReferenceChain {
    root: NodeId,
    segments: Vec<Segment>,
    native: ValueKind,
}

impl ReferenceChain {
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of path segments from the chain root to the leaf.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Native kind of the leaf member the chain terminates in.
    pub fn native_kind(&self) -> ValueKind {
        self.native
    }

    /// Read the leaf value. `None` when a node or referent along the chain
    /// has gone away since binding.
    pub fn read(&self, scene: &SceneGraph) -> Option<Value> {
        let mut id = self.root;
        for segment in &self.segments {
            let node = scene.get(id)?;
            match segment {
                Segment::Scope => {}
                Segment::Reference { get } => id = get(node)?,
                Segment::Leaf { get, .. } => return Some(get(node)),
            }
        }
        None
    }

    /// Write the leaf value. Returns false when the chain dangles or the
    /// value's storage class does not match the member.
    pub fn write(&self, scene: &mut SceneGraph, value: &Value) -> bool {
        let mut id = self.root;
        for segment in &self.segments {
            match segment {
                Segment::Scope => {}
                Segment::Reference { get } => {
                    let Some(next) = scene.get(id).and_then(|n| get(n)) else {
                        return false;
                    };
                    id = next;
                }
                Segment::Leaf { set, .. } => {
                    let Some(node) = scene.get_mut(id) else {
                        return false;
                    };
                    return set(node, value);
                }
            }
        }
        false
    }
}

/// Walk a dotted member path starting at `root`.
///
/// With `shorten` enabled, every reference segment is dereferenced during the
/// walk: accumulated segments are discarded and the chain re-roots at the
/// referent. A reference that dangles at walk time fails the whole walk.
pub fn walk(
    scene: &SceneGraph,
    root: NodeId,
    path: &str,
    shorten: bool,
) -> Result<ReferenceChain, WalkError> {
    if path.is_empty() {
        return Err(err("empty path"));
    }

    let parts: Vec<&str> = path.split('.').collect();
    let mut chain_root = root;
    let mut segments = Vec::with_capacity(parts.len());
    let mut table = member_registry::NODE_MEMBERS;
    let mut native = None;

    for (i, part) in parts.iter().enumerate() {
        let last = i + 1 == parts.len();
        let def = member_registry::lookup(table, part)
            .ok_or_else(|| err(format!("unknown member '{part}' in '{path}'")))?;
        match def {
            MemberDef::Leaf { kind, get, set } => {
                if !last {
                    return Err(err(format!(
                        "value member '{part}' cannot be dereferenced in '{path}'"
                    )));
                }
                native = Some(*kind);
                segments.push(Segment::Leaf {
                    kind: *kind,
                    get: *get,
                    set: *set,
                });
            }
            MemberDef::Composite { table: nested } => {
                if last {
                    return Err(err(format!("path '{path}' ends on composite '{part}'")));
                }
                segments.push(Segment::Scope);
                table = *nested;
            }
            MemberDef::Reference { get } => {
                if last {
                    return Err(err(format!("path '{path}' ends on reference '{part}'")));
                }
                if shorten {
                    // Dereference now and re-root; everything before this hop
                    // becomes unreachable from future accesses.
                    let referent = scene
                        .get(chain_root)
                        .and_then(|n| get(n))
                        .ok_or_else(|| err(format!("reference '{part}' dangles in '{path}'")))?;
                    chain_root = referent;
                    segments.clear();
                } else {
                    segments.push(Segment::Reference { get: *get });
                }
                table = member_registry::NODE_MEMBERS;
            }
        }
    }

    let native = native.ok_or_else(|| err(format!("path '{path}' names no value member")))?;
    Ok(ReferenceChain {
        root: chain_root,
        segments,
        native,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn follow_scene() -> (SceneGraph, NodeId, NodeId) {
        let mut scene = SceneGraph::new();
        let a = scene.create("a");
        let b = scene.create("b");
        scene.get_mut(a).unwrap().follow.target = Some(b);
        scene.get_mut(b).unwrap().transform.position = Vec3::new(3.0, 4.0, 5.0);
        (scene, a, b)
    }

    #[test]
    fn test_plain_leaf_chain() {
        let (scene, a, _) = follow_scene();
        let chain = walk(&scene, a, "transform.position", false).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.native_kind(), ValueKind::Vector3);
        assert_eq!(chain.read(&scene), Some(Value::Vec3(Vec3::ZERO)));
    }

    #[test]
    fn test_shortened_chain_reroots_at_referent() {
        let (scene, a, b) = follow_scene();
        let chain = walk(&scene, a, "follow.target.visible", true).unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.root(), b);
        assert_eq!(chain.read(&scene), Some(Value::Bool(true)));
    }

    #[test]
    fn test_unshortened_chain_keeps_every_segment() {
        let (scene, a, _) = follow_scene();
        let chain = walk(&scene, a, "follow.target.visible", false).unwrap();
        assert_eq!(chain.len(), 3);
        assert_eq!(chain.root(), a);
        assert_eq!(chain.read(&scene), Some(Value::Bool(true)));
    }

    #[test]
    fn test_unshortened_chain_tracks_retargeting() {
        let (mut scene, a, b) = follow_scene();
        let c = scene.create("c");
        scene.get_mut(c).unwrap().visible = false;

        let live = walk(&scene, a, "follow.target.visible", false).unwrap();
        let frozen = walk(&scene, a, "follow.target.visible", true).unwrap();
        assert_eq!(frozen.root(), b);

        scene.get_mut(a).unwrap().follow.target = Some(c);
        assert_eq!(live.read(&scene), Some(Value::Bool(false)));
        assert_eq!(frozen.read(&scene), Some(Value::Bool(true)));
    }

    #[test]
    fn test_read_write_through_reference() {
        let (mut scene, a, b) = follow_scene();
        let chain = walk(&scene, a, "follow.target.transform.position", false).unwrap();
        assert_eq!(chain.len(), 4);
        assert_eq!(chain.read(&scene), Some(Value::Vec3(Vec3::new(3.0, 4.0, 5.0))));

        assert!(chain.write(&mut scene, &Value::Vec3(Vec3::ONE)));
        assert_eq!(
            scene.get(b).unwrap().transform.position,
            Vec3::ONE
        );
    }

    #[test]
    fn test_invalid_paths() {
        let (scene, a, _) = follow_scene();
        assert!(walk(&scene, a, "", false).is_err());
        assert!(walk(&scene, a, "transform.bogus", false).is_err());
        assert!(walk(&scene, a, "visible.x", false).is_err());
        assert!(walk(&scene, a, "transform", false).is_err());
        assert!(walk(&scene, a, "parent", false).is_err());
    }

    #[test]
    fn test_shortening_fails_on_dangling_reference() {
        let mut scene = SceneGraph::new();
        let a = scene.create("a");
        assert!(walk(&scene, a, "follow.target.visible", true).is_err());
        // Unshortened binding succeeds; the dangle surfaces at access time.
        let chain = walk(&scene, a, "follow.target.visible", false).unwrap();
        assert_eq!(chain.read(&scene), None);
        assert!(!chain.write(&mut scene, &Value::Bool(false)));
    }

    #[test]
    fn test_write_rejects_wrong_storage() {
        let (mut scene, a, _) = follow_scene();
        let chain = walk(&scene, a, "visible", false).unwrap();
        assert!(!chain.write(&mut scene, &Value::Int(1)));
    }
}
