//! Conversions between [`Value`] and the interpreter's `Dynamic`.
//!
//! Scalars map to rhai's native INT/FLOAT/bool/string; vectors and
//! quaternions cross the boundary as object maps (`#{ x, y, z, w }`) so
//! driver scripts can address components directly; matrices travel as flat
//! 16-element arrays in column-major order.

use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
use rhai::Dynamic;

use crate::value::{Storage, Value};

/// Convert a value into the interpreter representation.
pub fn to_dynamic(value: &Value) -> Dynamic {
    match value {
        Value::Double(v) => Dynamic::from_float(*v),
        Value::Float(v) => Dynamic::from_float(*v as f64),
        Value::Int(v) => Dynamic::from_int(*v),
        Value::Bool(v) => Dynamic::from_bool(*v),
        Value::Str(v) => Dynamic::from(v.clone()),
        Value::Vec2(v) => components_map(&[("x", v.x), ("y", v.y)]),
        Value::Vec3(v) => components_map(&[("x", v.x), ("y", v.y), ("z", v.z)]),
        Value::Vec4(v) => components_map(&[("x", v.x), ("y", v.y), ("z", v.z), ("w", v.w)]),
        Value::Quat(v) => components_map(&[("x", v.x), ("y", v.y), ("z", v.z), ("w", v.w)]),
        Value::Mat4(m) => {
            let cells: rhai::Array = m
                .to_cols_array()
                .iter()
                .map(|c| Dynamic::from_float(*c as f64))
                .collect();
            Dynamic::from(cells)
        }
    }
}

/// Convert an interpreter value back into the given storage class.
///
/// Numeric storages accept both INT and FLOAT; everything else must arrive
/// in the exact shape [`to_dynamic`] produces.
pub fn from_dynamic(value: &Dynamic, storage: Storage) -> Option<Value> {
    match storage {
        Storage::Double => number(value).map(Value::Double),
        Storage::Float => number(value).map(|n| Value::Float(n as f32)),
        Storage::Int => {
            if let Ok(i) = value.as_int() {
                Some(Value::Int(i))
            } else {
                value.as_float().ok().map(|f| Value::Int(f as i64))
            }
        }
        Storage::Bool => value.as_bool().ok().map(Value::Bool),
        Storage::Str => value.clone().into_string().ok().map(Value::Str),
        Storage::Vec2 => {
            let map = value.clone().try_cast::<rhai::Map>()?;
            Some(Value::Vec2(Vec2::new(
                field(&map, "x")?,
                field(&map, "y")?,
            )))
        }
        Storage::Vec3 => {
            let map = value.clone().try_cast::<rhai::Map>()?;
            Some(Value::Vec3(Vec3::new(
                field(&map, "x")?,
                field(&map, "y")?,
                field(&map, "z")?,
            )))
        }
        Storage::Vec4 => {
            let map = value.clone().try_cast::<rhai::Map>()?;
            Some(Value::Vec4(Vec4::new(
                field(&map, "x")?,
                field(&map, "y")?,
                field(&map, "z")?,
                field(&map, "w")?,
            )))
        }
        Storage::Quat => {
            let map = value.clone().try_cast::<rhai::Map>()?;
            Some(Value::Quat(Quat::from_xyzw(
                field(&map, "x")?,
                field(&map, "y")?,
                field(&map, "z")?,
                field(&map, "w")?,
            )))
        }
        Storage::Mat4 => {
            let cells = value.clone().try_cast::<rhai::Array>()?;
            if cells.len() != 16 {
                return None;
            }
            let mut cols = [0.0f32; 16];
            for (slot, cell) in cols.iter_mut().zip(cells.iter()) {
                *slot = number(cell)? as f32;
            }
            Some(Value::Mat4(Mat4::from_cols_array(&cols)))
        }
    }
}

fn number(value: &Dynamic) -> Option<f64> {
    if let Ok(f) = value.as_float() {
        return Some(f);
    }
    value.as_int().ok().map(|i| i as f64)
}

fn field(map: &rhai::Map, key: &str) -> Option<f32> {
    number(map.get(key)?).map(|n| n as f32)
}

fn components_map(components: &[(&str, f32)]) -> Dynamic {
    let mut map = rhai::Map::new();
    for (key, component) in components {
        map.insert((*key).into(), Dynamic::from_float(*component as f64));
    }
    Dynamic::from(map)
}
