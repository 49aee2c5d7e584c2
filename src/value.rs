//! Generic value model for creation variables.
//!
//! Every variable declares a semantic [`ValueKind`] describing what the value
//! means, including the coordinate space the author wants to see it in. Kinds
//! map onto a smaller set of native [`Storage`] classes describing how the
//! value is physically held. [`Value`] is the generic representation that
//! crosses the variable boundary: facade callers, driver scripts and member
//! accessors all traffic in `Value` and never see the storage behind it.

use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

// ============================================================================
// Semantic kinds
// ============================================================================

/// Semantic type of a creation variable, as authored in definitions.
///
/// Space-qualified kinds (`PositionRoot`, `DirectionWorld`, ...) name the
/// frame the author reasons in; which frame the backing storage holds is the
/// conversion method's concern, not the kind's.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Double,
    Float,
    Int,
    Bool,
    String,
    Vector2,
    Vector3,
    Vector4,
    Quaternion,
    Matrix4x4,
    PositionLocal,
    PositionRoot,
    PositionWorld,
    DirectionLocal,
    DirectionRoot,
    DirectionWorld,
    RotationLocal,
    RotationRoot,
    RotationWorld,
    RotationEulerLocal,
    RotationEulerRoot,
    RotationEulerWorld,
    EulerAngles,
    TangentLocal,
    TangentRoot,
    TangentWorld,
    ScaleLocal,
    LocalToRoot,
    LocalToWorld,
    RootToLocal,
    WorldToLocal,
}

impl ValueKind {
    /// Every kind, in declaration order. Handy for exhaustive tests and for
    /// listing supported types in tooling.
    pub const ALL: [ValueKind; 31] = [
        ValueKind::Double,
        ValueKind::Float,
        ValueKind::Int,
        ValueKind::Bool,
        ValueKind::String,
        ValueKind::Vector2,
        ValueKind::Vector3,
        ValueKind::Vector4,
        ValueKind::Quaternion,
        ValueKind::Matrix4x4,
        ValueKind::PositionLocal,
        ValueKind::PositionRoot,
        ValueKind::PositionWorld,
        ValueKind::DirectionLocal,
        ValueKind::DirectionRoot,
        ValueKind::DirectionWorld,
        ValueKind::RotationLocal,
        ValueKind::RotationRoot,
        ValueKind::RotationWorld,
        ValueKind::RotationEulerLocal,
        ValueKind::RotationEulerRoot,
        ValueKind::RotationEulerWorld,
        ValueKind::EulerAngles,
        ValueKind::TangentLocal,
        ValueKind::TangentRoot,
        ValueKind::TangentWorld,
        ValueKind::ScaleLocal,
        ValueKind::LocalToRoot,
        ValueKind::LocalToWorld,
        ValueKind::RootToLocal,
        ValueKind::WorldToLocal,
    ];

    /// Native storage class backing this kind.
    pub fn storage(self) -> Storage {
        match self {
            ValueKind::Double => Storage::Double,
            ValueKind::Float => Storage::Float,
            ValueKind::Int => Storage::Int,
            ValueKind::Bool => Storage::Bool,
            ValueKind::String => Storage::Str,
            ValueKind::Vector2 => Storage::Vec2,
            ValueKind::Vector3
            | ValueKind::PositionLocal
            | ValueKind::PositionRoot
            | ValueKind::PositionWorld
            | ValueKind::DirectionLocal
            | ValueKind::DirectionRoot
            | ValueKind::DirectionWorld
            | ValueKind::RotationEulerLocal
            | ValueKind::RotationEulerRoot
            | ValueKind::RotationEulerWorld
            | ValueKind::EulerAngles
            | ValueKind::ScaleLocal => Storage::Vec3,
            ValueKind::Vector4
            | ValueKind::TangentLocal
            | ValueKind::TangentRoot
            | ValueKind::TangentWorld => Storage::Vec4,
            ValueKind::Quaternion
            | ValueKind::RotationLocal
            | ValueKind::RotationRoot
            | ValueKind::RotationWorld => Storage::Quat,
            ValueKind::Matrix4x4
            | ValueKind::LocalToRoot
            | ValueKind::LocalToWorld
            | ValueKind::RootToLocal
            | ValueKind::WorldToLocal => Storage::Mat4,
        }
    }

    /// Geometric family the kind belongs to for frame conversion.
    pub fn family(self) -> ConversionFamily {
        match self {
            ValueKind::Double
            | ValueKind::Float
            | ValueKind::Int
            | ValueKind::Bool
            | ValueKind::String
            | ValueKind::Vector2
            | ValueKind::ScaleLocal => ConversionFamily::Cast,
            ValueKind::PositionLocal | ValueKind::PositionRoot | ValueKind::PositionWorld => {
                ConversionFamily::Point
            }
            ValueKind::Vector3
            | ValueKind::DirectionLocal
            | ValueKind::DirectionRoot
            | ValueKind::DirectionWorld => ConversionFamily::Direction,
            ValueKind::Vector4
            | ValueKind::TangentLocal
            | ValueKind::TangentRoot
            | ValueKind::TangentWorld => ConversionFamily::Tangent,
            ValueKind::Quaternion
            | ValueKind::RotationLocal
            | ValueKind::RotationRoot
            | ValueKind::RotationWorld
            | ValueKind::RotationEulerLocal
            | ValueKind::RotationEulerRoot
            | ValueKind::RotationEulerWorld
            | ValueKind::EulerAngles => ConversionFamily::Rotation,
            ValueKind::Matrix4x4
            | ValueKind::LocalToRoot
            | ValueKind::LocalToWorld
            | ValueKind::RootToLocal
            | ValueKind::WorldToLocal => ConversionFamily::Matrix,
        }
    }

    /// Whether the kind's boundary representation is Euler degrees rather
    /// than a quaternion. Euler kinds wrap through quaternions at the
    /// conversion boundary only.
    pub fn is_euler(self) -> bool {
        matches!(
            self,
            ValueKind::RotationEulerLocal
                | ValueKind::RotationEulerRoot
                | ValueKind::RotationEulerWorld
                | ValueKind::EulerAngles
        )
    }

    /// Neutral default for the kind: zero/false/empty for most, identity for
    /// rotations and matrices, one for scale.
    pub fn neutral(self) -> Value {
        match self {
            ValueKind::ScaleLocal => Value::Vec3(Vec3::ONE),
            _ => match self.storage() {
                Storage::Double => Value::Double(0.0),
                Storage::Float => Value::Float(0.0),
                Storage::Int => Value::Int(0),
                Storage::Bool => Value::Bool(false),
                Storage::Str => Value::Str(std::string::String::new()),
                Storage::Vec2 => Value::Vec2(Vec2::ZERO),
                Storage::Vec3 => Value::Vec3(Vec3::ZERO),
                Storage::Vec4 => Value::Vec4(Vec4::ZERO),
                Storage::Quat => Value::Quat(Quat::IDENTITY),
                Storage::Mat4 => Value::Mat4(Mat4::IDENTITY),
            },
        }
    }
}

// ============================================================================
// Storage classes
// ============================================================================

/// Native storage class behind a [`ValueKind`]. Several semantic kinds share
/// one storage class; the kind carries the meaning, the storage the bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Storage {
    Double,
    Float,
    Int,
    Bool,
    Str,
    Vec2,
    Vec3,
    Vec4,
    Quat,
    Mat4,
}

impl Storage {
    /// Whether this class holds a scalar coercible among `Double/Float/Int`.
    pub fn is_numeric(self) -> bool {
        matches!(self, Storage::Double | Storage::Float | Storage::Int)
    }
}

/// Geometric family of a kind, used by the conversion closure factory to
/// pick which transform primitives apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConversionFamily {
    /// No geometry: plain storage cast, conversion method must be `None`.
    Cast,
    /// Positions: full point transforms, translation applies.
    Point,
    /// Directions: rotation and scale only, no translation.
    Direction,
    /// Four-component tangents: xyz transforms as a direction, w unchanged.
    Tangent,
    /// Orientations composed by quaternion multiplication.
    Rotation,
    /// Matrix kinds: the frame is named by the kind itself, no transform.
    Matrix,
}

// ============================================================================
// Values
// ============================================================================

/// A runtime value in its generic boundary representation.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Double(f64),
    Float(f32),
    Int(i64),
    Bool(bool),
    Str(String),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Quat(Quat),
    Mat4(Mat4),
}

impl Value {
    /// Storage class of this value.
    pub fn storage(&self) -> Storage {
        match self {
            Value::Double(_) => Storage::Double,
            Value::Float(_) => Storage::Float,
            Value::Int(_) => Storage::Int,
            Value::Bool(_) => Storage::Bool,
            Value::Str(_) => Storage::Str,
            Value::Vec2(_) => Storage::Vec2,
            Value::Vec3(_) => Storage::Vec3,
            Value::Vec4(_) => Storage::Vec4,
            Value::Quat(_) => Storage::Quat,
            Value::Mat4(_) => Storage::Mat4,
        }
    }

    /// Numeric view, if the value is a `Double`, `Float` or `Int`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            Value::Float(v) => Some(*v as f64),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Get as bool, if the value is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as string slice, if the value is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Get as 2D vector, if the value is a `Vec2`.
    pub fn as_vec2(&self) -> Option<Vec2> {
        match self {
            Value::Vec2(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as 3D vector, if the value is a `Vec3`.
    pub fn as_vec3(&self) -> Option<Vec3> {
        match self {
            Value::Vec3(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as 4D vector, if the value is a `Vec4`.
    pub fn as_vec4(&self) -> Option<Vec4> {
        match self {
            Value::Vec4(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as quaternion, if the value is a `Quat`.
    pub fn as_quat(&self) -> Option<Quat> {
        match self {
            Value::Quat(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as 4x4 matrix, if the value is a `Mat4`.
    pub fn as_mat4(&self) -> Option<Mat4> {
        match self {
            Value::Mat4(v) => Some(*v),
            _ => None,
        }
    }

    /// Coerce into the given storage class. Numeric scalars convert among
    /// themselves (`Double` ↔ `Float` ↔ `Int`, truncating toward zero when
    /// narrowing to `Int`); every other class must already match.
    pub fn coerce(&self, into: Storage) -> Option<Value> {
        if self.storage() == into {
            return Some(self.clone());
        }
        let n = self.as_f64()?;
        match into {
            Storage::Double => Some(Value::Double(n)),
            Storage::Float => Some(Value::Float(n as f32)),
            Storage::Int => Some(Value::Int(n as i64)),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Double(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Str(v) => write!(f, "{}", v),
            Value::Vec2(v) => write!(f, "{}", v),
            Value::Vec3(v) => write!(f, "{}", v),
            Value::Vec4(v) => write!(f, "{}", v),
            Value::Quat(v) => write!(f, "{}", v),
            Value::Mat4(v) => write!(f, "{}", v),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec2> for Value {
    fn from(v: Vec2) -> Self {
        Value::Vec2(v)
    }
}

impl From<Vec3> for Value {
    fn from(v: Vec3) -> Self {
        Value::Vec3(v)
    }
}

impl From<Vec4> for Value {
    fn from(v: Vec4) -> Self {
        Value::Vec4(v)
    }
}

impl From<Quat> for Value {
    fn from(v: Quat) -> Self {
        Value::Quat(v)
    }
}

impl From<Mat4> for Value {
    fn from(v: Mat4) -> Self {
        Value::Mat4(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_matches_storage_for_every_kind() {
        for kind in ValueKind::ALL {
            assert_eq!(
                kind.neutral().storage(),
                kind.storage(),
                "neutral/storage mismatch for {:?}",
                kind
            );
        }
    }

    #[test]
    fn test_identity_style_neutrals() {
        assert_eq!(ValueKind::ScaleLocal.neutral(), Value::Vec3(Vec3::ONE));
        assert_eq!(ValueKind::Quaternion.neutral(), Value::Quat(Quat::IDENTITY));
        assert_eq!(
            ValueKind::RotationWorld.neutral(),
            Value::Quat(Quat::IDENTITY)
        );
        assert_eq!(ValueKind::Matrix4x4.neutral(), Value::Mat4(Mat4::IDENTITY));
        assert_eq!(
            ValueKind::LocalToWorld.neutral(),
            Value::Mat4(Mat4::IDENTITY)
        );
        assert_eq!(ValueKind::EulerAngles.neutral(), Value::Vec3(Vec3::ZERO));
    }

    #[test]
    fn test_family_assignment() {
        assert_eq!(ValueKind::PositionRoot.family(), ConversionFamily::Point);
        assert_eq!(ValueKind::Vector3.family(), ConversionFamily::Direction);
        assert_eq!(ValueKind::Vector4.family(), ConversionFamily::Tangent);
        assert_eq!(ValueKind::TangentWorld.family(), ConversionFamily::Tangent);
        assert_eq!(ValueKind::Quaternion.family(), ConversionFamily::Rotation);
        assert_eq!(ValueKind::EulerAngles.family(), ConversionFamily::Rotation);
        assert_eq!(
            ValueKind::RotationEulerRoot.family(),
            ConversionFamily::Rotation
        );
        assert_eq!(ValueKind::LocalToRoot.family(), ConversionFamily::Matrix);
        assert_eq!(ValueKind::ScaleLocal.family(), ConversionFamily::Cast);
        assert_eq!(ValueKind::Vector2.family(), ConversionFamily::Cast);
    }

    #[test]
    fn test_euler_kinds_store_vec3() {
        for kind in ValueKind::ALL {
            if kind.is_euler() {
                assert_eq!(kind.storage(), Storage::Vec3, "{:?}", kind);
            }
        }
    }

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(
            Value::Int(3).coerce(Storage::Double),
            Some(Value::Double(3.0))
        );
        assert_eq!(
            Value::Double(2.75).coerce(Storage::Int),
            Some(Value::Int(2))
        );
        assert_eq!(
            Value::Float(1.5).coerce(Storage::Double),
            Some(Value::Double(1.5))
        );
        // Same class passes through untouched.
        assert_eq!(
            Value::Str("hi".into()).coerce(Storage::Str),
            Some(Value::Str("hi".into()))
        );
        // No cross-class coercion outside the numeric scalars.
        assert_eq!(Value::Bool(true).coerce(Storage::Int), None);
        assert_eq!(Value::Vec3(Vec3::ONE).coerce(Storage::Vec4), None);
    }

    #[test]
    fn test_kind_serde_uses_variant_names() {
        let json = serde_json::to_string(&ValueKind::PositionRoot).unwrap();
        assert_eq!(json, "\"PositionRoot\"");
        let kind: ValueKind = serde_json::from_str("\"RotationEulerWorld\"").unwrap();
        assert_eq!(kind, ValueKind::RotationEulerWorld);
    }
}
