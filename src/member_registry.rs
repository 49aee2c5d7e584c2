//! Closed registry of addressable node members.
//!
//! Member links resolve against a hand-written table instead of runtime
//! reflection: each entry pairs a member name with either a typed leaf
//! accessor (plain fn pointers, resolved once at bind time), a composite
//! table that scopes further name resolution, or a reference to another node.

use crate::scene_graph::{Node, NodeId};
use crate::value::{Value, ValueKind};

/// An addressable member of a node.
#[derive(Clone, Copy)]
pub enum MemberDef {
    /// A value-holding leaf. `set` returns false when the value's storage
    /// class does not match the member.
    Leaf {
        kind: ValueKind,
        get: fn(&Node) -> Value,
        set: fn(&mut Node, &Value) -> bool,
    },
    /// A composite member: resolution continues in the nested table.
    Composite { table: MemberTable },
    /// A reference to another node; resolution restarts at the referent's
    /// member table. The referent may dangle or change between accesses.
    Reference { get: fn(&Node) -> Option<NodeId> },
}

pub type MemberTable = &'static [(&'static str, MemberDef)];

/// Look up a member by name in a table.
pub fn lookup(table: MemberTable, name: &str) -> Option<&'static MemberDef> {
    table
        .iter()
        .find(|(member, _)| *member == name)
        .map(|(_, def)| def)
}

/// Top-level members of every scene node.
pub const NODE_MEMBERS: MemberTable = &[
    (
        "name",
        MemberDef::Leaf {
            kind: ValueKind::String,
            get: get_name,
            set: set_name,
        },
    ),
    (
        "visible",
        MemberDef::Leaf {
            kind: ValueKind::Bool,
            get: get_visible,
            set: set_visible,
        },
    ),
    (
        "tint",
        MemberDef::Leaf {
            kind: ValueKind::Vector4,
            get: get_tint,
            set: set_tint,
        },
    ),
    (
        "transform",
        MemberDef::Composite {
            table: TRANSFORM_MEMBERS,
        },
    ),
    (
        "follow",
        MemberDef::Composite {
            table: FOLLOW_MEMBERS,
        },
    ),
    ("parent", MemberDef::Reference { get: get_parent }),
];

const TRANSFORM_MEMBERS: MemberTable = &[
    (
        "position",
        MemberDef::Leaf {
            kind: ValueKind::Vector3,
            get: get_position,
            set: set_position,
        },
    ),
    (
        "rotation",
        MemberDef::Leaf {
            kind: ValueKind::Quaternion,
            get: get_rotation,
            set: set_rotation,
        },
    ),
    (
        "scale",
        MemberDef::Leaf {
            kind: ValueKind::Vector3,
            get: get_scale,
            set: set_scale,
        },
    ),
];

const FOLLOW_MEMBERS: MemberTable = &[
    (
        "target",
        MemberDef::Reference {
            get: get_follow_target,
        },
    ),
    (
        "weight",
        MemberDef::Leaf {
            kind: ValueKind::Float,
            get: get_follow_weight,
            set: set_follow_weight,
        },
    ),
    (
        "offset",
        MemberDef::Leaf {
            kind: ValueKind::Vector3,
            get: get_follow_offset,
            set: set_follow_offset,
        },
    ),
];

// ============================================================================
// Accessors
// ============================================================================

fn get_name(n: &Node) -> Value {
    Value::Str(n.name.clone())
}

fn set_name(n: &mut Node, v: &Value) -> bool {
    match v {
        Value::Str(s) => {
            n.name = s.clone();
            true
        }
        _ => false,
    }
}

fn get_visible(n: &Node) -> Value {
    Value::Bool(n.visible)
}

fn set_visible(n: &mut Node, v: &Value) -> bool {
    match v {
        Value::Bool(b) => {
            n.visible = *b;
            true
        }
        _ => false,
    }
}

fn get_tint(n: &Node) -> Value {
    Value::Vec4(n.tint)
}

fn set_tint(n: &mut Node, v: &Value) -> bool {
    match v {
        Value::Vec4(t) => {
            n.tint = *t;
            true
        }
        _ => false,
    }
}

fn get_position(n: &Node) -> Value {
    Value::Vec3(n.transform.position)
}

fn set_position(n: &mut Node, v: &Value) -> bool {
    match v {
        Value::Vec3(p) => {
            n.transform.position = *p;
            true
        }
        _ => false,
    }
}

fn get_rotation(n: &Node) -> Value {
    Value::Quat(n.transform.rotation)
}

fn set_rotation(n: &mut Node, v: &Value) -> bool {
    match v {
        Value::Quat(q) => {
            n.transform.rotation = *q;
            true
        }
        _ => false,
    }
}

fn get_scale(n: &Node) -> Value {
    Value::Vec3(n.transform.scale)
}

fn set_scale(n: &mut Node, v: &Value) -> bool {
    match v {
        Value::Vec3(s) => {
            n.transform.scale = *s;
            true
        }
        _ => false,
    }
}

fn get_parent(n: &Node) -> Option<NodeId> {
    n.parent
}

fn get_follow_target(n: &Node) -> Option<NodeId> {
    n.follow.target
}

fn get_follow_weight(n: &Node) -> Value {
    Value::Float(n.follow.weight)
}

fn set_follow_weight(n: &mut Node, v: &Value) -> bool {
    match v {
        Value::Float(w) => {
            n.follow.weight = *w;
            true
        }
        _ => false,
    }
}

fn get_follow_offset(n: &Node) -> Value {
    Value::Vec3(n.follow.offset)
}

fn set_follow_offset(n: &mut Node, v: &Value) -> bool {
    match v {
        Value::Vec3(o) => {
            n.follow.offset = *o;
            true
        }
        _ => false,
    }
}
