//! Frame-conversion closures between a variable's outer and native values.
//!
//! A [`Converter`] is a pair of boxed closures built once at bind time:
//! `read` maps the native (stored) value to the representation the variable's
//! declared kind promises, `write` maps the other way. The closures capture
//! the linked node `L` and the creation root `R` by ID and query their poses
//! live on every call, so later node motion is honored and the round-trip
//! laws hold for arbitrary relative poses.
//!
//! Geometric families:
//! - points transform with the full TRS (translation applies),
//! - directions with rotation+scale only,
//! - tangents like directions on xyz with w passed through,
//! - rotations compose by quaternion multiplication, with Euler-typed kinds
//!   wrapping through quaternions at the boundary only,
//! - matrix kinds are identity casts (the frame is named by the kind),
//! - everything else is a pure storage cast and admits no method.

use glam::{EulerRot, Quat, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::scene_graph::{NodeId, Pose, SceneGraph};
use crate::value::{ConversionFamily, Storage, Value, ValueKind};

/// Directed frame transform applied at the variable boundary.
///
/// The method names the read direction: a variable with `RootToWorld` stores
/// root-frame values and reads back world-frame ones. Writes apply the exact
/// inverse composition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConversionMethod {
    #[default]
    None,
    LocalToWorld,
    LocalToRoot,
    WorldToLocal,
    RootToLocal,
    RootToWorld,
    WorldToRoot,
}

impl ConversionMethod {
    pub const ALL: [ConversionMethod; 7] = [
        ConversionMethod::None,
        ConversionMethod::LocalToWorld,
        ConversionMethod::LocalToRoot,
        ConversionMethod::WorldToLocal,
        ConversionMethod::RootToLocal,
        ConversionMethod::RootToWorld,
        ConversionMethod::WorldToRoot,
    ];

    /// The dual method: applying it reads back what this method wrote.
    pub fn inverse(self) -> ConversionMethod {
        match self {
            ConversionMethod::None => ConversionMethod::None,
            ConversionMethod::LocalToWorld => ConversionMethod::WorldToLocal,
            ConversionMethod::WorldToLocal => ConversionMethod::LocalToWorld,
            ConversionMethod::LocalToRoot => ConversionMethod::RootToLocal,
            ConversionMethod::RootToLocal => ConversionMethod::LocalToRoot,
            ConversionMethod::RootToWorld => ConversionMethod::WorldToRoot,
            ConversionMethod::WorldToRoot => ConversionMethod::RootToWorld,
        }
    }

    pub fn is_none(self) -> bool {
        self == ConversionMethod::None
    }
}

/// Error for a `(kind, method, native)` combination the factory cannot serve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedConversion {
    pub kind: ValueKind,
    pub method: ConversionMethod,
    pub native: ValueKind,
}

impl std::fmt::Display for UnsupportedConversion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "type not supported: {:?} via {:?} over native {:?}",
            self.kind, self.method, self.native
        )
    }
}

impl std::error::Error for UnsupportedConversion {}

type ConvertFn = Box<dyn Fn(&SceneGraph, &Value) -> Value>;

/// Bound read/write conversion pair for one variable.
pub struct Converter {
    read: ConvertFn,
    write: ConvertFn,
}

impl Converter {
    /// Native (stored) value to the declared outer representation.
    pub fn read(&self, scene: &SceneGraph, native: &Value) -> Value {
        (self.read)(scene, native)
    }

    /// Declared outer representation to the native (stored) value.
    pub fn write(&self, scene: &SceneGraph, outer: &Value) -> Value {
        (self.write)(scene, outer)
    }
}

/// Build the converter for a declared `kind` accessed through `method` over a
/// member (or slot) of `native` kind. `linked` is the variable's object-link
/// node, `root` the creation root.
pub fn build(
    kind: ValueKind,
    method: ConversionMethod,
    native: ValueKind,
    linked: NodeId,
    root: NodeId,
) -> Result<Converter, UnsupportedConversion> {
    let unsupported = || UnsupportedConversion {
        kind,
        method,
        native,
    };

    match kind.family() {
        ConversionFamily::Cast => {
            if !method.is_none() {
                return Err(unsupported());
            }
            cast_converter(kind, native).ok_or_else(unsupported)
        }
        ConversionFamily::Matrix => {
            // The frame is fixed by the kind name; the method is ignored.
            if native.storage() != Storage::Mat4 {
                return Err(unsupported());
            }
            Ok(identity_converter(kind, native))
        }
        ConversionFamily::Point => {
            if native.storage() != Storage::Vec3 {
                return Err(unsupported());
            }
            Ok(vec3_converter(method, linked, root, Pose::transform_point, Pose::inverse_transform_point))
        }
        ConversionFamily::Direction => {
            if native.storage() != Storage::Vec3 {
                return Err(unsupported());
            }
            Ok(vec3_converter(method, linked, root, Pose::transform_vector, Pose::inverse_transform_vector))
        }
        ConversionFamily::Tangent => {
            if native.storage() != Storage::Vec4 {
                return Err(unsupported());
            }
            Ok(tangent_converter(method, linked, root))
        }
        ConversionFamily::Rotation => {
            if native.storage() != Storage::Quat && !native.is_euler() {
                return Err(unsupported());
            }
            Ok(rotation_converter(kind, method, native, linked, root))
        }
    }
}

// ============================================================================
// Cast and matrix families
// ============================================================================

fn cast_converter(kind: ValueKind, native: ValueKind) -> Option<Converter> {
    let outer_storage = kind.storage();
    let native_storage = native.storage();
    let compatible = outer_storage == native_storage
        || (outer_storage.is_numeric() && native_storage.is_numeric());
    if !compatible {
        return None;
    }
    Some(Converter {
        read: Box::new(move |_, v| {
            v.coerce(outer_storage).unwrap_or_else(|| kind.neutral())
        }),
        write: Box::new(move |_, v| {
            v.coerce(native_storage).unwrap_or_else(|| native.neutral())
        }),
    })
}

fn identity_converter(kind: ValueKind, native: ValueKind) -> Converter {
    Converter {
        read: Box::new(move |_, v| match v {
            Value::Mat4(_) => v.clone(),
            _ => kind.neutral(),
        }),
        write: Box::new(move |_, v| match v {
            Value::Mat4(_) => v.clone(),
            _ => native.neutral(),
        }),
    }
}

// ============================================================================
// Point / direction / tangent families
// ============================================================================

/// Apply one directed frame conversion to a Vec3 using the supplied pose
/// primitives (point or vector flavored).
fn convert_vec3(
    scene: &SceneGraph,
    linked: NodeId,
    root: NodeId,
    method: ConversionMethod,
    fwd: fn(&Pose, Vec3) -> Vec3,
    inv: fn(&Pose, Vec3) -> Vec3,
    v: Vec3,
) -> Vec3 {
    let l = || scene.world_pose(linked);
    let r = || scene.world_pose(root);
    match method {
        ConversionMethod::None => v,
        ConversionMethod::LocalToWorld => fwd(&l(), v),
        ConversionMethod::LocalToRoot => inv(&r(), fwd(&l(), v)),
        ConversionMethod::RootToWorld => fwd(&r(), v),
        ConversionMethod::WorldToLocal => inv(&l(), v),
        ConversionMethod::RootToLocal => inv(&l(), fwd(&r(), v)),
        ConversionMethod::WorldToRoot => inv(&r(), v),
    }
}

fn vec3_converter(
    method: ConversionMethod,
    linked: NodeId,
    root: NodeId,
    fwd: fn(&Pose, Vec3) -> Vec3,
    inv: fn(&Pose, Vec3) -> Vec3,
) -> Converter {
    let apply = move |scene: &SceneGraph, value: &Value, m: ConversionMethod| {
        let v = value.as_vec3().unwrap_or(Vec3::ZERO);
        Value::Vec3(convert_vec3(scene, linked, root, m, fwd, inv, v))
    };
    Converter {
        read: Box::new(move |scene, v| apply(scene, v, method)),
        write: Box::new(move |scene, v| apply(scene, v, method.inverse())),
    }
}

fn tangent_converter(method: ConversionMethod, linked: NodeId, root: NodeId) -> Converter {
    let apply = move |scene: &SceneGraph, value: &Value, m: ConversionMethod| {
        let v = value.as_vec4().unwrap_or(Vec4::ZERO);
        let xyz = convert_vec3(
            scene,
            linked,
            root,
            m,
            Pose::transform_vector,
            Pose::inverse_transform_vector,
            v.truncate(),
        );
        // The w component carries handedness and never transforms.
        Value::Vec4(xyz.extend(v.w))
    };
    Converter {
        read: Box::new(move |scene, v| apply(scene, v, method)),
        write: Box::new(move |scene, v| apply(scene, v, method.inverse())),
    }
}

// ============================================================================
// Rotation family
// ============================================================================

/// Euler angles (degrees, intrinsic YXZ) to a quaternion.
pub fn quat_from_euler_deg(e: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::YXZ,
        e.y.to_radians(),
        e.x.to_radians(),
        e.z.to_radians(),
    )
}

/// Quaternion to Euler angles (degrees, intrinsic YXZ).
pub fn euler_deg_from_quat(q: Quat) -> Vec3 {
    let (y, x, z) = q.to_euler(EulerRot::YXZ);
    Vec3::new(x.to_degrees(), y.to_degrees(), z.to_degrees())
}

fn convert_rotation(
    scene: &SceneGraph,
    linked: NodeId,
    root: NodeId,
    method: ConversionMethod,
    q: Quat,
) -> Quat {
    let l = || scene.world_pose(linked).rotation();
    let r = || scene.world_pose(root).rotation();
    match method {
        ConversionMethod::None => q,
        ConversionMethod::LocalToWorld => l() * q,
        ConversionMethod::LocalToRoot => r().inverse() * (l() * q),
        ConversionMethod::RootToWorld => r() * q,
        ConversionMethod::WorldToLocal => l().inverse() * q,
        ConversionMethod::RootToLocal => l().inverse() * (r() * q),
        ConversionMethod::WorldToRoot => r().inverse() * q,
    }
}

fn side_to_quat(kind: ValueKind, value: &Value) -> Quat {
    if kind.is_euler() {
        quat_from_euler_deg(value.as_vec3().unwrap_or(Vec3::ZERO))
    } else {
        value.as_quat().unwrap_or(Quat::IDENTITY)
    }
}

fn quat_to_side(kind: ValueKind, q: Quat) -> Value {
    if kind.is_euler() {
        Value::Vec3(euler_deg_from_quat(q))
    } else {
        Value::Quat(q)
    }
}

fn rotation_converter(
    kind: ValueKind,
    method: ConversionMethod,
    native: ValueKind,
    linked: NodeId,
    root: NodeId,
) -> Converter {
    Converter {
        read: Box::new(move |scene, v| {
            let q = side_to_quat(native, v);
            quat_to_side(kind, convert_rotation(scene, linked, root, method, q))
        }),
        write: Box::new(move |scene, v| {
            let q = side_to_quat(kind, v);
            quat_to_side(
                native,
                convert_rotation(scene, linked, root, method.inverse(), q),
            )
        }),
    }
}
