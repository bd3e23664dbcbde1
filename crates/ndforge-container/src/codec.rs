//! Encoding of values into raw element bytes and back
//!
//! Scalars use native byte order. Composite items follow the C struct
//! layout computed by the descriptor; arrays nested inside an item are
//! packed in the order of their own chain.

use crate::error::{field_path, index_path, ContainerError, Result};
use crate::value::Value;
use ndforge_types::{default_strides, Primitive, TypeDescriptor, TypeError};

fn mismatch(path: &str, expected: impl Into<String>, found: impl Into<String>) -> ContainerError {
    ContainerError::TypeMismatch {
        path: path.to_string(),
        expected: expected.into(),
        found: found.into(),
    }
}

fn fixed<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

/// List items of `value`, which must have exactly `extent` entries
pub(crate) fn expect_list<'v>(value: &'v Value, extent: usize, path: &str) -> Result<&'v [Value]> {
    match value {
        Value::List(items) if items.len() == extent => Ok(items),
        Value::List(items) => Err(ContainerError::ShapeMismatch {
            path: path.to_string(),
            expected: extent,
            found: items.len(),
        }),
        other => Err(mismatch(path, "list", other.kind_name())),
    }
}

/// Check that `value` nests lists with exactly the extents of `shape`.
/// Leaves are not inspected.
pub(crate) fn check_shape(value: &Value, shape: &[usize], path: &str) -> Result<()> {
    let Some((&extent, rest)) = shape.split_first() else {
        return Ok(());
    };
    let items = expect_list(value, extent, path)?;
    if !rest.is_empty() {
        for (i, item) in items.iter().enumerate() {
            check_shape(item, rest, &index_path(path, i))?;
        }
    }
    Ok(())
}

/// Packed strides of `ty`, an array chain with the given shape
pub(crate) fn packed_strides(ty: &TypeDescriptor, shape: &[usize], item_size: usize) -> Result<Vec<isize>> {
    default_strides(shape, item_size, ty.chain_order().unwrap_or_default()).ok_or_else(|| {
        TypeError::TooLarge {
            descriptor: ty.to_string(),
        }
        .into()
    })
}

fn integer<T>(primitive: Primitive, value: &Value, path: &str) -> Result<T>
where
    T: TryFrom<i64> + TryFrom<u64>,
{
    let converted = match *value {
        Value::Int(v) => T::try_from(v).ok(),
        Value::UInt(v) => T::try_from(v).ok(),
        _ => return Err(mismatch(path, primitive.name(), value.kind_name())),
    };
    converted.ok_or_else(|| mismatch(path, primitive.name(), format!("out-of-range value {}", value)))
}

fn real(primitive: Primitive, value: &Value, path: &str) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| mismatch(path, primitive.name(), value.kind_name()))
}

fn complex(primitive: Primitive, value: &Value, path: &str) -> Result<(f64, f64)> {
    match *value {
        Value::Complex(re, im) => Ok((re, im)),
        _ => Ok((real(primitive, value, path)?, 0.0)),
    }
}

fn write_scalar(primitive: Primitive, bytes: &mut [u8], value: &Value, path: &str) -> Result<()> {
    let out = &mut bytes[..primitive.size()];
    match primitive {
        Primitive::Bool => match value {
            Value::Bool(v) => out[0] = *v as u8,
            other => return Err(mismatch(path, "bool", other.kind_name())),
        },
        Primitive::Int8 => out.copy_from_slice(&integer::<i8>(primitive, value, path)?.to_ne_bytes()),
        Primitive::Int16 => out.copy_from_slice(&integer::<i16>(primitive, value, path)?.to_ne_bytes()),
        Primitive::Int32 => out.copy_from_slice(&integer::<i32>(primitive, value, path)?.to_ne_bytes()),
        Primitive::Int64 => out.copy_from_slice(&integer::<i64>(primitive, value, path)?.to_ne_bytes()),
        Primitive::UInt8 => out.copy_from_slice(&integer::<u8>(primitive, value, path)?.to_ne_bytes()),
        Primitive::UInt16 => out.copy_from_slice(&integer::<u16>(primitive, value, path)?.to_ne_bytes()),
        Primitive::UInt32 => out.copy_from_slice(&integer::<u32>(primitive, value, path)?.to_ne_bytes()),
        Primitive::UInt64 => out.copy_from_slice(&integer::<u64>(primitive, value, path)?.to_ne_bytes()),
        Primitive::Float32 => out.copy_from_slice(&(real(primitive, value, path)? as f32).to_ne_bytes()),
        Primitive::Float64 => out.copy_from_slice(&real(primitive, value, path)?.to_ne_bytes()),
        Primitive::Complex64 => {
            let (re, im) = complex(primitive, value, path)?;
            out[..4].copy_from_slice(&(re as f32).to_ne_bytes());
            out[4..].copy_from_slice(&(im as f32).to_ne_bytes());
        }
        Primitive::Complex128 => {
            let (re, im) = complex(primitive, value, path)?;
            out[..8].copy_from_slice(&re.to_ne_bytes());
            out[8..].copy_from_slice(&im.to_ne_bytes());
        }
    }
    Ok(())
}

fn read_scalar(primitive: Primitive, bytes: &[u8]) -> Value {
    match primitive {
        Primitive::Bool => Value::Bool(bytes[0] != 0),
        Primitive::Int8 => Value::Int(i8::from_ne_bytes(fixed(bytes)).into()),
        Primitive::Int16 => Value::Int(i16::from_ne_bytes(fixed(bytes)).into()),
        Primitive::Int32 => Value::Int(i32::from_ne_bytes(fixed(bytes)).into()),
        Primitive::Int64 => Value::Int(i64::from_ne_bytes(fixed(bytes))),
        Primitive::UInt8 => Value::UInt(u8::from_ne_bytes(fixed(bytes)).into()),
        Primitive::UInt16 => Value::UInt(u16::from_ne_bytes(fixed(bytes)).into()),
        Primitive::UInt32 => Value::UInt(u32::from_ne_bytes(fixed(bytes)).into()),
        Primitive::UInt64 => Value::UInt(u64::from_ne_bytes(fixed(bytes))),
        Primitive::Float32 => Value::Float(f32::from_ne_bytes(fixed(bytes)).into()),
        Primitive::Float64 => Value::Float(f64::from_ne_bytes(fixed(bytes))),
        Primitive::Complex64 => Value::Complex(
            f32::from_ne_bytes(fixed(bytes)).into(),
            f32::from_ne_bytes(fixed(&bytes[4..])).into(),
        ),
        Primitive::Complex128 => Value::Complex(
            f64::from_ne_bytes(fixed(bytes)),
            f64::from_ne_bytes(fixed(&bytes[8..])),
        ),
    }
}

/// Write one item of type `ty` at the start of `bytes`
pub(crate) fn write_item(ty: &TypeDescriptor, bytes: &mut [u8], value: &Value, path: &str) -> Result<()> {
    match ty {
        TypeDescriptor::Primitive(primitive) => write_scalar(*primitive, bytes, value, path),
        TypeDescriptor::Tuple(members) => {
            let items = match value {
                Value::Tuple(items) if items.len() == members.len() => items,
                Value::Tuple(items) => {
                    return Err(ContainerError::ShapeMismatch {
                        path: path.to_string(),
                        expected: members.len(),
                        found: items.len(),
                    })
                }
                other => return Err(mismatch(path, "tuple", other.kind_name())),
            };
            let offsets = ty.member_offsets()?;
            for (i, ((member, item), offset)) in members.iter().zip(items).zip(offsets).enumerate() {
                write_item(member, &mut bytes[offset..], item, &index_path(path, i))?;
            }
            Ok(())
        }
        TypeDescriptor::Record(fields) => {
            let entries = match value {
                Value::Record(entries) if entries.len() == fields.len() => entries,
                Value::Record(entries) => {
                    return Err(ContainerError::ShapeMismatch {
                        path: path.to_string(),
                        expected: fields.len(),
                        found: entries.len(),
                    })
                }
                other => return Err(mismatch(path, "record", other.kind_name())),
            };
            let offsets = ty.member_offsets()?;
            for ((field, (name, item)), offset) in fields.iter().zip(entries).zip(offsets) {
                let child = field_path(path, &field.name);
                if *name != field.name {
                    return Err(mismatch(&child, format!("field `{}`", field.name), format!("field `{}`", name)));
                }
                write_item(&field.ty, &mut bytes[offset..], item, &child)?;
            }
            Ok(())
        }
        TypeDescriptor::FixedDim { .. } => {
            let shape = ty.shape()?;
            let dtype = ty.dtype();
            let item_size = dtype.item_layout()?.size;
            let strides = packed_strides(ty, &shape, item_size)?;
            write_strided(bytes, 0, &shape, &strides, dtype, item_size, value, path)
        }
        // Items have a fixed size, so ragged data only appears at the outer
        // dimensions of a container
        TypeDescriptor::VarDim { .. } => Err(ContainerError::Unsupported(format!(
            "ragged dimensions inside element type `{}`",
            ty
        ))),
        other => Err(TypeError::Abstract {
            descriptor: other.to_string(),
        }
        .into()),
    }
}

/// Read one item of type `ty` from the start of `bytes`
pub(crate) fn read_item(ty: &TypeDescriptor, bytes: &[u8]) -> Result<Value> {
    match ty {
        TypeDescriptor::Primitive(primitive) => Ok(read_scalar(*primitive, bytes)),
        TypeDescriptor::Tuple(members) => {
            let offsets = ty.member_offsets()?;
            let items = members
                .iter()
                .zip(offsets)
                .map(|(member, offset)| read_item(member, &bytes[offset..]))
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::Tuple(items))
        }
        TypeDescriptor::Record(fields) => {
            let offsets = ty.member_offsets()?;
            let entries = fields
                .iter()
                .zip(offsets)
                .map(|(field, offset)| Ok((field.name.clone(), read_item(&field.ty, &bytes[offset..])?)))
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::Record(entries))
        }
        TypeDescriptor::FixedDim { .. } => {
            let shape = ty.shape()?;
            let dtype = ty.dtype();
            let item_size = dtype.item_layout()?.size;
            let strides = packed_strides(ty, &shape, item_size)?;
            read_strided(bytes, 0, &shape, &strides, dtype, item_size)
        }
        TypeDescriptor::VarDim { .. } => Err(ContainerError::Unsupported(format!(
            "ragged dimensions inside element type `{}`",
            ty
        ))),
        other => Err(TypeError::Abstract {
            descriptor: other.to_string(),
        }
        .into()),
    }
}

/// Write a nested list over strided dimensions starting at byte `base`
#[allow(clippy::too_many_arguments)]
pub(crate) fn write_strided(
    bytes: &mut [u8],
    base: isize,
    shape: &[usize],
    strides: &[isize],
    dtype: &TypeDescriptor,
    item_size: usize,
    value: &Value,
    path: &str,
) -> Result<()> {
    match shape.split_first() {
        None => {
            let start = base as usize;
            write_item(dtype, &mut bytes[start..start + item_size], value, path)
        }
        Some((&extent, rest)) => {
            let items = expect_list(value, extent, path)?;
            for (i, item) in items.iter().enumerate() {
                let at = base + i as isize * strides[0];
                write_strided(bytes, at, rest, &strides[1..], dtype, item_size, item, &index_path(path, i))?;
            }
            Ok(())
        }
    }
}

/// Read strided dimensions starting at byte `base` into a nested list
pub(crate) fn read_strided(
    bytes: &[u8],
    base: isize,
    shape: &[usize],
    strides: &[isize],
    dtype: &TypeDescriptor,
    item_size: usize,
) -> Result<Value> {
    match shape.split_first() {
        None => {
            let start = base as usize;
            read_item(dtype, &bytes[start..start + item_size])
        }
        Some((&extent, rest)) => {
            let items = (0..extent)
                .map(|i| read_strided(bytes, base + i as isize * strides[0], rest, &strides[1..], dtype, item_size))
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::List(items))
        }
    }
}
