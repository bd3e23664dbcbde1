//! Typed view of a memory region
//!
//! A [`Container`] binds a concrete [`TypeDescriptor`] to a byte region, an
//! offset of the first element and one byte stride per fixed dimension.
//!
//! # Memory Layout
//!
//! For a fixed-shape container the element at `[i, j, ...]` starts at
//! `offset + i * strides[0] + j * strides[1] + ...`. Strides default to
//! packed row-major or column-major according to the descriptor's order
//! flag, but any in-bounds strides may be supplied for borrowed memory.
//!
//! Ragged containers store their leaves packed in row-major order. The
//! extents of each ragged level live in the offsets of the concrete `var`
//! dimensions of the descriptor.
//!
//! # Examples
//!
//! ```
//! use ndforge_container::{Container, Contiguity, Value};
//! use ndforge_types::parse;
//!
//! let f = Container::from_value(
//!     &parse("!2 * 2 * long").unwrap(),
//!     &Value::from(vec![vec![0i64, 1], vec![2, 3]]),
//! ).unwrap();
//! assert_eq!(f.strides(), &[8, 16]);
//! assert_eq!(f.contiguity(), Contiguity::FContiguous);
//! assert_eq!(f.as_slice::<i64>().unwrap(), &[0, 2, 1, 3]);
//! ```

use crate::codec::{check_shape, expect_list, packed_strides, read_item, read_strided, write_item, write_strided};
use crate::error::{index_path, ContainerError, Result, ROOT};
use crate::layout::{contiguity_of, Contiguity};
use crate::storage::{OwnedBuffer, Region, OWNED_ALIGNMENT};
use crate::value::Value;
use ndforge_tracing::performance::record_allocation;
use ndforge_types::{ItemLayout, TypeDescriptor, TypeError};
use std::ops::Range;

/// Descriptor bound to memory
#[derive(Debug)]
pub struct Container<'a> {
    descriptor: TypeDescriptor,
    region: Region<'a>,
    /// Byte offset of the first element
    offset: usize,
    /// Byte strides, one per fixed dimension; empty for ragged containers
    strides: Vec<isize>,
    /// Extents of the fixed dimensions; empty for ragged containers
    shape: Vec<usize>,
    item: ItemLayout,
}

/// Offsets of every ragged level, outermost first
fn ragged_levels(descriptor: &TypeDescriptor) -> Vec<Option<&[usize]>> {
    let mut levels = Vec::new();
    let mut current = descriptor;
    while let TypeDescriptor::VarDim { offsets, element } = current {
        levels.push(offsets.as_deref());
        current = element;
    }
    levels
}

fn require_concrete(descriptor: &TypeDescriptor) -> Result<()> {
    if descriptor.is_concrete() {
        Ok(())
    } else {
        Err(TypeError::Abstract {
            descriptor: descriptor.to_string(),
        }
        .into())
    }
}

fn has_ragged_member(ty: &TypeDescriptor) -> bool {
    match ty {
        TypeDescriptor::VarDim { .. } => true,
        TypeDescriptor::FixedDim { element, .. } => has_ragged_member(element),
        TypeDescriptor::Tuple(members) => members.iter().any(has_ragged_member),
        TypeDescriptor::Record(fields) => fields.iter().any(|field| has_ragged_member(&field.ty)),
        _ => false,
    }
}

/// Items are stored inline, so the element type must have a fixed size
fn require_fixed_items(descriptor: &TypeDescriptor) -> Result<()> {
    let dtype = descriptor.dtype();
    if has_ragged_member(dtype) {
        return Err(ContainerError::Unsupported(format!(
            "ragged dimensions inside element type `{}`",
            dtype
        )));
    }
    Ok(())
}

/// Number of leaves addressed by a concrete ragged descriptor
fn ragged_leaf_count(descriptor: &TypeDescriptor) -> usize {
    ragged_levels(descriptor)
        .last()
        .and_then(|offsets| offsets.and_then(|o| o.last().copied()))
        .unwrap_or(0)
}

/// Lowest and highest byte reached relative to the first element, or
/// `None` if either does not fit in an `isize`. Every extent must be
/// nonzero.
fn strided_extent(shape: &[usize], strides: &[isize]) -> Option<(isize, isize)> {
    shape.iter().zip(strides).try_fold((0isize, 0isize), |(lo, hi), (&extent, &stride)| {
        let reach = isize::try_from(extent - 1).ok()?.checked_mul(stride)?;
        Some((lo.checked_add(reach.min(0))?, hi.checked_add(reach.max(0))?))
    })
}

fn checked_nbytes(descriptor: &TypeDescriptor, count: usize, item_size: usize) -> Result<usize> {
    count
        .checked_mul(item_size)
        .filter(|&nbytes| isize::try_from(nbytes).is_ok())
        .ok_or_else(|| {
            TypeError::TooLarge {
                descriptor: descriptor.to_string(),
            }
            .into()
        })
}

impl Container<'static> {
    /// Allocate a container and fill it from a nested value.
    ///
    /// Abstract `var` dimensions take their offsets from the value; the
    /// resulting container carries the concrete descriptor. Ragged
    /// dimensions are only supported as the outer dimensions of the
    /// container: an element type such as `{a : var * int64}` fails with
    /// [`ContainerError::Unsupported`].
    ///
    /// The nesting of `value` is checked against the shape before any
    /// memory is allocated.
    #[tracing::instrument(skip_all, fields(descriptor = %descriptor))]
    pub fn from_value(descriptor: &TypeDescriptor, value: &Value) -> Result<Self> {
        require_fixed_items(descriptor)?;
        if descriptor.is_ragged() {
            return Self::ragged_from_value(descriptor, value);
        }
        require_concrete(descriptor)?;
        check_shape(value, &descriptor.shape()?, ROOT)?;

        let mut container = Self::zeros(descriptor)?;
        let Container {
            region,
            offset,
            strides,
            shape,
            item,
            descriptor,
        } = &mut container;
        write_strided(
            region.as_bytes_mut(),
            *offset as isize,
            shape,
            strides,
            descriptor.dtype(),
            item.size,
            value,
            ROOT,
        )?;
        Ok(container)
    }

    /// Allocate a zero-filled container for a concrete descriptor
    pub fn zeros(descriptor: &TypeDescriptor) -> Result<Self> {
        require_fixed_items(descriptor)?;
        require_concrete(descriptor)?;
        let item = descriptor.dtype().item_layout()?;

        let (shape, strides, count) = if descriptor.is_ragged() {
            (Vec::new(), Vec::new(), ragged_leaf_count(descriptor))
        } else {
            let shape = descriptor.shape()?;
            let strides = packed_strides(descriptor, &shape, item.size)?;
            let count = shape
                .iter()
                .try_fold(1usize, |count, &extent| count.checked_mul(extent))
                .ok_or_else(|| TypeError::TooLarge {
                    descriptor: descriptor.to_string(),
                })?;
            (shape, strides, count)
        };

        let nbytes = checked_nbytes(descriptor, count, item.size)?;
        record_allocation(nbytes, "owned", OWNED_ALIGNMENT);
        tracing::debug!(descriptor = %descriptor, nbytes, "allocated container");

        Ok(Container {
            descriptor: descriptor.clone(),
            region: Region::Owned(OwnedBuffer::zeroed(nbytes)),
            offset: 0,
            strides,
            shape,
            item,
        })
    }

    fn ragged_from_value(descriptor: &TypeDescriptor, value: &Value) -> Result<Self> {
        let levels = ragged_levels(descriptor);
        let dtype = descriptor.dtype();
        if !dtype.is_concrete() {
            return Err(TypeError::Abstract {
                descriptor: descriptor.to_string(),
            }
            .into());
        }
        let item = dtype.item_layout()?;

        // Walk the value level by level, recording the offsets it implies
        let mut current: Vec<(&Value, String)> = vec![(value, ROOT.to_string())];
        let mut computed = Vec::with_capacity(levels.len());
        for (level, declared) in levels.iter().enumerate() {
            let mut offsets = vec![0usize];
            let mut next = Vec::new();
            for (node, path) in current {
                let items = match node {
                    Value::List(items) => items,
                    other => {
                        return Err(ContainerError::TypeMismatch {
                            path,
                            expected: "list".to_string(),
                            found: other.kind_name().to_string(),
                        })
                    }
                };
                if let Some(declared) = declared {
                    let k = offsets.len() - 1;
                    let expected = declared[k + 1] - declared[k];
                    if expected != items.len() {
                        return Err(ContainerError::ShapeMismatch {
                            path,
                            expected,
                            found: items.len(),
                        });
                    }
                }
                offsets.push(offsets[offsets.len() - 1] + items.len());
                next.extend(items.iter().enumerate().map(|(i, item)| (item, index_path(&path, i))));
            }
            tracing::trace!(level, extents = offsets.len() - 1, "ragged level");
            computed.push(offsets);
            current = next;
        }

        let nbytes = current.len() * item.size;
        let mut buffer = OwnedBuffer::zeroed(nbytes);
        for (k, (leaf, path)) in current.iter().enumerate() {
            write_item(dtype, &mut buffer.as_bytes_mut()[k * item.size..], leaf, path)?;
        }

        let mut concrete = dtype.clone();
        for offsets in computed.into_iter().rev() {
            concrete = TypeDescriptor::var_with_offsets(offsets, concrete)?;
        }
        record_allocation(nbytes, "owned", OWNED_ALIGNMENT);
        tracing::debug!(descriptor = %concrete, nbytes, "allocated ragged container");

        Ok(Container {
            descriptor: concrete,
            region: Region::Owned(buffer),
            offset: 0,
            strides: Vec::new(),
            shape: Vec::new(),
            item,
        })
    }
}

impl<'a> Container<'a> {
    /// Wrap caller memory without copying.
    ///
    /// Without explicit strides the layout is packed in the descriptor's
    /// order. Ragged descriptors accept packed memory only.
    #[tracing::instrument(skip_all, fields(descriptor = %descriptor, len = region.len()))]
    pub fn from_buffer(descriptor: &TypeDescriptor, region: &'a mut [u8], strides: Option<&[isize]>) -> Result<Self> {
        require_fixed_items(descriptor)?;
        require_concrete(descriptor)?;
        let item = descriptor.dtype().item_layout()?;

        if descriptor.is_ragged() {
            if strides.is_some() {
                return Err(ContainerError::Unsupported(
                    "ragged containers do not take explicit strides".to_string(),
                ));
            }
            let required = checked_nbytes(descriptor, ragged_leaf_count(descriptor), item.size)?;
            if region.len() < required {
                return Err(ContainerError::BufferTooSmall {
                    required,
                    available: region.len(),
                });
            }
            record_allocation(region.len(), "borrowed", 1);
            return Ok(Container {
                descriptor: descriptor.clone(),
                region: Region::Borrowed(region),
                offset: 0,
                strides: Vec::new(),
                shape: Vec::new(),
                item,
            });
        }

        let strides = match strides {
            Some(strides) => strides.to_vec(),
            None => packed_strides(descriptor, &descriptor.shape()?, item.size)?,
        };
        Self::from_buffer_at(descriptor, region, 0, &strides)
    }

    /// Wrap caller memory with an explicit first-element offset and byte
    /// strides. Every addressable element must lie inside `region`.
    pub fn from_buffer_at(
        descriptor: &TypeDescriptor,
        region: &'a mut [u8],
        offset: usize,
        strides: &[isize],
    ) -> Result<Self> {
        require_fixed_items(descriptor)?;
        require_concrete(descriptor)?;
        if descriptor.is_ragged() {
            return Err(ContainerError::Unsupported(
                "ragged containers cannot be strided".to_string(),
            ));
        }
        let shape = descriptor.shape()?;
        let item = descriptor.dtype().item_layout()?;
        if strides.len() != shape.len() {
            return Err(ContainerError::StrideMismatch {
                expected: shape.len(),
                found: strides.len(),
            });
        }

        if !shape.contains(&0) {
            let too_large = || TypeError::TooLarge {
                descriptor: format!("{} with strides {:?}", descriptor, strides),
            };
            let (lo, hi) = strided_extent(&shape, strides).ok_or_else(too_large)?;
            let base = isize::try_from(offset).map_err(|_| too_large())?;
            let start = base.checked_add(lo).ok_or_else(too_large)?;
            let end = base
                .checked_add(hi)
                .and_then(|end| end.checked_add(item.size as isize))
                .ok_or_else(too_large)?;
            if start < 0 {
                return Err(ContainerError::Unsupported(format!(
                    "strides reach {} bytes before the start of the region",
                    start.unsigned_abs()
                )));
            }
            if end as usize > region.len() {
                return Err(ContainerError::BufferTooSmall {
                    required: end as usize,
                    available: region.len(),
                });
            }
        }

        record_allocation(region.len(), "borrowed", 1);
        tracing::debug!(descriptor = %descriptor, offset, ?strides, "wrapped borrowed region");

        Ok(Container {
            descriptor: descriptor.clone(),
            region: Region::Borrowed(region),
            offset,
            strides: strides.to_vec(),
            shape,
            item,
        })
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    /// Extents of the fixed dimensions (empty for scalars and ragged data)
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn ndim(&self) -> usize {
        self.descriptor.ndim()
    }

    pub fn item_size(&self) -> usize {
        self.item.size
    }

    pub fn is_owned(&self) -> bool {
        self.region.is_owned()
    }

    pub fn is_ragged(&self) -> bool {
        self.descriptor.is_ragged()
    }

    /// Number of leaf elements
    pub fn len(&self) -> usize {
        if self.is_ragged() {
            ragged_leaf_count(&self.descriptor)
        } else {
            self.shape.iter().product()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes occupied by the elements if packed
    pub fn nbytes(&self) -> usize {
        self.len() * self.item.size
    }

    /// Whole underlying region
    pub fn bytes(&self) -> &[u8] {
        self.region.as_bytes()
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        self.region.as_bytes_mut()
    }

    /// Layout derived from the actual strides. Ragged data is never
    /// reported as contiguous.
    pub fn contiguity(&self) -> Contiguity {
        if self.is_ragged() {
            return Contiguity::Neither;
        }
        contiguity_of(&self.shape, &self.strides, self.item.size)
    }

    pub fn is_c_contiguous(&self) -> bool {
        self.contiguity().is_c()
    }

    pub fn is_f_contiguous(&self) -> bool {
        self.contiguity().is_f()
    }

    /// Byte position of a fully indexed element
    pub fn element_offset(&self, index: &[usize]) -> Result<usize> {
        let needed = if self.is_ragged() {
            ragged_levels(&self.descriptor).len()
        } else {
            self.shape.len()
        };
        if index.len() != needed {
            return Err(ContainerError::Unsupported(format!(
                "element_offset needs {} indices, {} given",
                needed,
                index.len()
            )));
        }
        self.locate(index)
    }

    /// Start of the sub-array selected by a (possibly partial) index:
    /// a byte position for fixed containers, a position in the next
    /// ragged level's offsets table for ragged ones.
    fn locate(&self, index: &[usize]) -> Result<usize> {
        if self.is_ragged() {
            let levels = ragged_levels(&self.descriptor);
            if index.len() > levels.len() {
                return Err(ContainerError::TooManyIndices {
                    given: index.len(),
                    ndim: levels.len(),
                });
            }
            let mut position = 0usize;
            for (axis, (&i, offsets)) in index.iter().zip(&levels).enumerate() {
                let offsets = offsets.unwrap_or(&[]);
                let (start, end) = (offsets[position], offsets[position + 1]);
                if i >= end - start {
                    return Err(ContainerError::IndexOutOfBounds {
                        axis,
                        index: i,
                        extent: end - start,
                    });
                }
                position = start + i;
            }
            if index.len() == levels.len() {
                Ok(self.offset + position * self.item.size)
            } else {
                Ok(position)
            }
        } else {
            if index.len() > self.shape.len() {
                return Err(ContainerError::TooManyIndices {
                    given: index.len(),
                    ndim: self.shape.len(),
                });
            }
            let mut at = self.offset as isize;
            for (axis, ((&i, &extent), &stride)) in index.iter().zip(&self.shape).zip(&self.strides).enumerate() {
                if i >= extent {
                    return Err(ContainerError::IndexOutOfBounds { axis, index: i, extent });
                }
                at += i as isize * stride;
            }
            Ok(at as usize)
        }
    }

    /// Read the whole container as a nested value
    pub fn value(&self) -> Result<Value> {
        self.value_at(&[])
    }

    /// Read an element or, for a partial index, the sub-array below it
    pub fn value_at(&self, index: &[usize]) -> Result<Value> {
        let at = self.locate(index)?;
        let dtype = self.descriptor.dtype();
        if self.is_ragged() {
            let levels = ragged_levels(&self.descriptor);
            if index.len() == levels.len() {
                return read_item(dtype, &self.bytes()[at..]);
            }
            return self.read_ragged(&levels, index.len(), at);
        }
        let depth = index.len();
        read_strided(
            self.bytes(),
            at as isize,
            &self.shape[depth..],
            &self.strides[depth..],
            dtype,
            self.item.size,
        )
    }

    fn read_ragged(&self, levels: &[Option<&[usize]>], level: usize, position: usize) -> Result<Value> {
        if level == levels.len() {
            let at = self.offset + position * self.item.size;
            return read_item(self.descriptor.dtype(), &self.bytes()[at..]);
        }
        let offsets = levels[level].unwrap_or(&[]);
        let items = (offsets[position]..offsets[position + 1])
            .map(|p| self.read_ragged(levels, level + 1, p))
            .collect::<Result<Vec<_>>>()?;
        Ok(Value::List(items))
    }

    /// Overwrite an element or, for a partial index, the sub-array below it.
    ///
    /// The value must have exactly the extents being written. For fixed
    /// containers a value of the wrong shape is rejected before anything
    /// is written. A leaf that fails to convert (wrong kind, out of range)
    /// is only detected when it is reached, so the elements written before
    /// it keep their new values. Ragged containers check each extent as
    /// they go and may also be left partially written.
    pub fn set_at(&mut self, index: &[usize], value: &Value) -> Result<()> {
        let at = self.locate(index)?;
        let dtype = self.descriptor.dtype().clone();
        if self.is_ragged() {
            let descriptor = self.descriptor.clone();
            let levels = ragged_levels(&descriptor);
            if index.len() == levels.len() {
                return write_item(&dtype, &mut self.bytes_mut()[at..], value, ROOT);
            }
            return self.write_ragged(&levels, &dtype, index.len(), at, value, ROOT);
        }
        let depth = index.len();
        let item_size = self.item.size;
        let shape = self.shape[depth..].to_vec();
        let strides = self.strides[depth..].to_vec();
        check_shape(value, &shape, ROOT)?;
        write_strided(
            self.region.as_bytes_mut(),
            at as isize,
            &shape,
            &strides,
            &dtype,
            item_size,
            value,
            ROOT,
        )
    }

    fn write_ragged(
        &mut self,
        levels: &[Option<&[usize]>],
        dtype: &TypeDescriptor,
        level: usize,
        position: usize,
        value: &Value,
        path: &str,
    ) -> Result<()> {
        if level == levels.len() {
            let at = self.offset + position * self.item.size;
            return write_item(dtype, &mut self.bytes_mut()[at..], value, path);
        }
        let offsets = levels[level].unwrap_or(&[]);
        let (start, end) = (offsets[position], offsets[position + 1]);
        let items = expect_list(value, end - start, path)?;
        for (i, item) in items.iter().enumerate() {
            self.write_ragged(levels, dtype, level + 1, start + i, item, &index_path(path, i))?;
        }
        Ok(())
    }

    /// Byte range of the packed elements, for typed views
    fn packed_range<T>(&self) -> Result<Range<usize>> {
        let dtype = self.descriptor.dtype();
        let primitive = match dtype {
            TypeDescriptor::Primitive(p) if p.size() == std::mem::size_of::<T>() => p,
            other => {
                return Err(ContainerError::TypeMismatch {
                    path: ROOT.to_string(),
                    expected: other.to_string(),
                    found: std::any::type_name::<T>().to_string(),
                })
            }
        };
        if !self.is_ragged() && self.contiguity() == Contiguity::Neither {
            return Err(ContainerError::Unsupported(format!(
                "typed view of non-contiguous `{}` data",
                primitive
            )));
        }
        Ok(self.offset..self.offset + self.nbytes())
    }

    /// Elements in memory order as a typed slice
    pub fn as_slice<T: bytemuck::Pod>(&self) -> Result<&[T]> {
        let range = self.packed_range::<T>()?;
        let bytes = &self.bytes()[range];
        bytemuck::try_cast_slice(bytes).map_err(|_| ContainerError::Misaligned {
            address: bytes.as_ptr() as usize,
            required: std::mem::align_of::<T>(),
        })
    }

    /// Elements in memory order as a mutable typed slice
    pub fn as_mut_slice<T: bytemuck::Pod>(&mut self) -> Result<&mut [T]> {
        let range = self.packed_range::<T>()?;
        let bytes = &mut self.bytes_mut()[range];
        let address = bytes.as_ptr() as usize;
        bytemuck::try_cast_slice_mut(bytes).map_err(|_| ContainerError::Misaligned {
            address,
            required: std::mem::align_of::<T>(),
        })
    }

    /// Copy into a new owned container with packed strides in the
    /// descriptor's order
    pub fn to_owned_container(&self) -> Result<Container<'static>> {
        Container::from_value(&self.descriptor, &self.value()?)
    }
}
