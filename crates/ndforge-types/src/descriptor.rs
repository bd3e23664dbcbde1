//! The structural type descriptor
//!
//! A [`TypeDescriptor`] is an immutable tree describing the shape, element
//! type and memory order of a block of data. Concrete descriptors describe
//! real memory; abstract descriptors (symbolic dimensions, ellipses, type
//! variables, kinds, `var` without offsets) only appear in kernel signature
//! patterns.
//!
//! ```text
//! "2 * 3 * int64"        FixedDim(2) -> FixedDim(3) -> int64, row-major
//! "!2 * 3 * int64"       same shape, column-major
//! "var * var * float64"  two ragged levels
//! "N * M * T"            pattern: symbolic dims bound at dispatch time
//! ```

use crate::error::{Result, TypeError};
use crate::primitive::{Kind, Primitive};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use std::sync::Arc;

/// Memory order of a chain of fixed dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Order {
    /// C order: the last dimension varies fastest
    #[default]
    RowMajor,
    /// Fortran order: the first dimension varies fastest
    ColumnMajor,
}

/// Named member of a record type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: String,
    pub ty: TypeDescriptor,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self { name: name.into(), ty }
    }
}

/// Size and alignment of a fixed-size element type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemLayout {
    pub size: usize,
    pub align: usize,
}

/// Recursive type descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    /// Fixed dimension with a concrete extent
    FixedDim {
        count: usize,
        order: Order,
        element: Box<TypeDescriptor>,
    },
    /// Fixed dimension whose extent is a named placeholder (`N * ...`)
    SymbolicDim {
        name: String,
        order: Order,
        element: Box<TypeDescriptor>,
    },
    /// Ragged dimension. `offsets` is present once the extents are known.
    VarDim {
        offsets: Option<Arc<[usize]>>,
        element: Box<TypeDescriptor>,
    },
    /// Zero or more leading dimensions (`... * T`)
    EllipsisDim { element: Box<TypeDescriptor> },
    Primitive(Primitive),
    Tuple(Vec<TypeDescriptor>),
    Record(Vec<Field>),
    Kind(Kind),
    /// Element type placeholder, e.g. `T`
    TypeVar(String),
}

impl TypeDescriptor {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    pub fn primitive(primitive: Primitive) -> Self {
        TypeDescriptor::Primitive(primitive)
    }

    /// Prepend a fixed dimension. The new dimension joins the element's
    /// fixed chain and inherits its order.
    pub fn fixed(count: usize, element: TypeDescriptor) -> Result<Self> {
        let order = element.chain_order().unwrap_or_default();
        let ty = TypeDescriptor::FixedDim {
            count,
            order,
            element: Box::new(element),
        };
        ty.validate()?;
        Ok(ty)
    }

    /// Prepend a symbolic dimension (pattern only)
    pub fn symbolic(name: impl Into<String>, element: TypeDescriptor) -> Result<Self> {
        let order = element.chain_order().unwrap_or_default();
        let ty = TypeDescriptor::SymbolicDim {
            name: name.into(),
            order,
            element: Box::new(element),
        };
        ty.validate()?;
        Ok(ty)
    }

    /// Prepend an abstract ragged dimension
    pub fn var(element: TypeDescriptor) -> Result<Self> {
        let ty = TypeDescriptor::VarDim {
            offsets: None,
            element: Box::new(element),
        };
        ty.validate()?;
        Ok(ty)
    }

    /// Prepend a ragged dimension with explicit offsets
    pub fn var_with_offsets(offsets: Vec<usize>, element: TypeDescriptor) -> Result<Self> {
        let ty = TypeDescriptor::VarDim {
            offsets: Some(offsets.into()),
            element: Box::new(element),
        };
        ty.validate()?;
        Ok(ty)
    }

    /// Prepend `...`
    pub fn ellipsis(element: TypeDescriptor) -> Result<Self> {
        let ty = TypeDescriptor::EllipsisDim {
            element: Box::new(element),
        };
        ty.validate()?;
        Ok(ty)
    }

    /// Build an n-dimensional array type from a shape
    pub fn array(shape: &[usize], order: Order, dtype: TypeDescriptor) -> Result<Self> {
        let mut ty = dtype;
        for &count in shape.iter().rev() {
            ty = TypeDescriptor::FixedDim {
                count,
                order,
                element: Box::new(ty),
            };
        }
        ty.validate()?;
        Ok(ty)
    }

    pub fn tuple(members: Vec<TypeDescriptor>) -> Result<Self> {
        let ty = TypeDescriptor::Tuple(members);
        ty.validate()?;
        Ok(ty)
    }

    pub fn record(fields: Vec<Field>) -> Result<Self> {
        let ty = TypeDescriptor::Record(fields);
        ty.validate()?;
        Ok(ty)
    }

    /// Same descriptor with the outer fixed chain switched to `order`
    pub fn with_order(&self, order: Order) -> Result<Self> {
        fn rewrite(ty: &TypeDescriptor, order: Order) -> Option<TypeDescriptor> {
            match ty {
                TypeDescriptor::FixedDim { count, element, .. } => Some(TypeDescriptor::FixedDim {
                    count: *count,
                    order,
                    element: Box::new(rewrite(element, order).unwrap_or_else(|| (**element).clone())),
                }),
                TypeDescriptor::SymbolicDim { name, element, .. } => Some(TypeDescriptor::SymbolicDim {
                    name: name.clone(),
                    order,
                    element: Box::new(rewrite(element, order).unwrap_or_else(|| (**element).clone())),
                }),
                TypeDescriptor::EllipsisDim { element } => rewrite(element, order).map(|element| {
                    TypeDescriptor::EllipsisDim {
                        element: Box::new(element),
                    }
                }),
                _ => None,
            }
        }

        let ty = rewrite(self, order).ok_or_else(|| {
            TypeError::InvalidDescriptor(format!("`{self}` has no fixed dimension chain to reorder"))
        })?;
        ty.validate()?;
        Ok(ty)
    }

    /// Same descriptor with column-major order on the outer fixed chain
    pub fn column_major(&self) -> Result<Self> {
        self.with_order(Order::ColumnMajor)
    }

    // ------------------------------------------------------------------
    // Structural queries
    // ------------------------------------------------------------------

    /// Whether this node is a dimension of any flavour
    pub fn is_dim(&self) -> bool {
        matches!(
            self,
            TypeDescriptor::FixedDim { .. }
                | TypeDescriptor::SymbolicDim { .. }
                | TypeDescriptor::VarDim { .. }
                | TypeDescriptor::EllipsisDim { .. }
        )
    }

    /// Element below this dimension, `None` for dtypes
    pub fn dim_element(&self) -> Option<&TypeDescriptor> {
        match self {
            TypeDescriptor::FixedDim { element, .. }
            | TypeDescriptor::SymbolicDim { element, .. }
            | TypeDescriptor::VarDim { element, .. }
            | TypeDescriptor::EllipsisDim { element } => Some(element),
            _ => None,
        }
    }

    /// Number of outer dimensions. An ellipsis is not counted.
    pub fn ndim(&self) -> usize {
        let mut ndim = 0;
        let mut current = self;
        while let Some(element) = current.dim_element() {
            if !matches!(current, TypeDescriptor::EllipsisDim { .. }) {
                ndim += 1;
            }
            current = element;
        }
        ndim
    }

    /// Element type below all outer dimensions
    pub fn dtype(&self) -> &TypeDescriptor {
        let mut current = self;
        while let Some(element) = current.dim_element() {
            current = element;
        }
        current
    }

    /// Extents of the outer dimensions
    pub fn shape(&self) -> Result<Vec<usize>> {
        let mut shape = Vec::new();
        let mut current = self;
        loop {
            match current {
                TypeDescriptor::FixedDim { count, element, .. } => {
                    shape.push(*count);
                    current = element;
                }
                other if other.is_dim() => {
                    return Err(TypeError::NotFixedShape {
                        descriptor: self.to_string(),
                    })
                }
                _ => return Ok(shape),
            }
        }
    }

    /// Order of the fixed chain starting at this node
    pub fn chain_order(&self) -> Option<Order> {
        match self {
            TypeDescriptor::FixedDim { order, .. } | TypeDescriptor::SymbolicDim { order, .. } => Some(*order),
            TypeDescriptor::EllipsisDim { element } => element.chain_order(),
            _ => None,
        }
    }

    /// True unless the outer fixed chain is flagged column-major
    pub fn is_c_order(&self) -> bool {
        self.chain_order() != Some(Order::ColumnMajor) || self.ndim() <= 1
    }

    /// True if the outer fixed chain is flagged column-major, or the
    /// descriptor has at most one dimension
    pub fn is_f_order(&self) -> bool {
        self.chain_order() == Some(Order::ColumnMajor) || (self.ndim() <= 1 && !self.is_ragged())
    }

    /// Whether any outer dimension is ragged
    pub fn is_ragged(&self) -> bool {
        let mut current = self;
        while let Some(element) = current.dim_element() {
            if matches!(current, TypeDescriptor::VarDim { .. }) {
                return true;
            }
            current = element;
        }
        false
    }

    /// Whether the descriptor describes real memory: no placeholders,
    /// kinds, ellipses or offset-less ragged dimensions anywhere.
    pub fn is_concrete(&self) -> bool {
        match self {
            TypeDescriptor::FixedDim { element, .. } => element.is_concrete(),
            TypeDescriptor::VarDim { offsets, element } => offsets.is_some() && element.is_concrete(),
            TypeDescriptor::SymbolicDim { .. }
            | TypeDescriptor::EllipsisDim { .. }
            | TypeDescriptor::Kind(_)
            | TypeDescriptor::TypeVar(_) => false,
            TypeDescriptor::Primitive(_) => true,
            TypeDescriptor::Tuple(members) => members.iter().all(TypeDescriptor::is_concrete),
            TypeDescriptor::Record(fields) => fields.iter().all(|field| field.ty.is_concrete()),
        }
    }

    /// Same structure with the offsets of every ragged dimension removed
    pub fn to_abstract(&self) -> TypeDescriptor {
        match self {
            TypeDescriptor::VarDim { element, .. } => TypeDescriptor::VarDim {
                offsets: None,
                element: Box::new(element.to_abstract()),
            },
            TypeDescriptor::FixedDim { count, order, element } => TypeDescriptor::FixedDim {
                count: *count,
                order: *order,
                element: Box::new(element.to_abstract()),
            },
            other => other.clone(),
        }
    }

    // ------------------------------------------------------------------
    // Memory layout
    // ------------------------------------------------------------------

    /// Size and alignment of one item of this type.
    ///
    /// Fixed dimensions are packed; tuples and records use C struct layout
    /// with natural alignment and trailing padding.
    pub fn item_layout(&self) -> Result<ItemLayout> {
        match self {
            TypeDescriptor::Primitive(p) => Ok(ItemLayout {
                size: p.size(),
                align: p.align(),
            }),
            TypeDescriptor::FixedDim { count, element, .. } => {
                let inner = element.item_layout()?;
                let size = inner
                    .size
                    .checked_mul(*count)
                    .filter(|&size| isize::try_from(size).is_ok())
                    .ok_or_else(|| TypeError::TooLarge {
                        descriptor: self.to_string(),
                    })?;
                Ok(ItemLayout {
                    size,
                    align: inner.align,
                })
            }
            TypeDescriptor::Tuple(members) => Ok(struct_layout(members.iter())?.0),
            TypeDescriptor::Record(fields) => Ok(struct_layout(fields.iter().map(|field| &field.ty))?.0),
            TypeDescriptor::VarDim { .. } => Err(TypeError::NotFixedShape {
                descriptor: self.to_string(),
            }),
            _ => Err(TypeError::Abstract {
                descriptor: self.to_string(),
            }),
        }
    }

    pub fn item_size(&self) -> Result<usize> {
        self.item_layout().map(|layout| layout.size)
    }

    pub fn align(&self) -> Result<usize> {
        self.item_layout().map(|layout| layout.align)
    }

    /// Byte offsets of the members of a tuple or record
    pub fn member_offsets(&self) -> Result<Vec<usize>> {
        match self {
            TypeDescriptor::Tuple(members) => Ok(struct_layout(members.iter())?.1),
            TypeDescriptor::Record(fields) => Ok(struct_layout(fields.iter().map(|field| &field.ty))?.1),
            _ => Err(TypeError::InvalidDescriptor(format!("`{self}` is not a tuple or record"))),
        }
    }

    // ------------------------------------------------------------------
    // Invariants
    // ------------------------------------------------------------------

    /// Check the structural invariants.
    ///
    /// - every dimension of one fixed chain shares the same order
    /// - fixed and ragged dimensions never mix within one chain
    /// - no column-major chain appears below a ragged dimension
    /// - at most one ellipsis per chain
    /// - ragged offsets are consistent from level to level
    pub fn validate(&self) -> Result<()> {
        self.validate_node(false, None, false)
    }

    fn validate_node(&self, under_var: bool, parent_offsets: Option<&[usize]>, seen_ellipsis: bool) -> Result<()> {
        match self {
            TypeDescriptor::FixedDim { order, element, .. } | TypeDescriptor::SymbolicDim { order, element, .. } => {
                if under_var && *order == Order::ColumnMajor {
                    return Err(TypeError::InvalidDescriptor(
                        "column-major order is not allowed below a var dimension".to_string(),
                    ));
                }
                match element.as_ref() {
                    TypeDescriptor::FixedDim { order: inner, .. } | TypeDescriptor::SymbolicDim { order: inner, .. }
                        if inner != order =>
                    {
                        return Err(TypeError::InvalidDescriptor(
                            "all dimensions of a fixed chain must share one order".to_string(),
                        ));
                    }
                    TypeDescriptor::VarDim { .. } => {
                        return Err(TypeError::InvalidDescriptor(
                            "fixed and var dimensions cannot be mixed in one chain".to_string(),
                        ));
                    }
                    TypeDescriptor::EllipsisDim { .. } => {
                        return Err(TypeError::InvalidDescriptor(
                            "an ellipsis must lead its dimension chain".to_string(),
                        ));
                    }
                    _ => {}
                }
                element.validate_node(under_var, None, seen_ellipsis)
            }
            TypeDescriptor::VarDim { offsets, element } => {
                if let Some(offsets) = offsets {
                    validate_offsets(offsets, parent_offsets)?;
                } else if parent_offsets.is_some() {
                    return Err(TypeError::InvalidDescriptor(
                        "ragged dimensions of one chain must all carry offsets or none".to_string(),
                    ));
                }
                match element.as_ref() {
                    TypeDescriptor::FixedDim { .. } | TypeDescriptor::SymbolicDim { .. } => {
                        return Err(TypeError::InvalidDescriptor(
                            "fixed and var dimensions cannot be mixed in one chain".to_string(),
                        ));
                    }
                    TypeDescriptor::EllipsisDim { .. } => {
                        return Err(TypeError::InvalidDescriptor(
                            "an ellipsis must lead its dimension chain".to_string(),
                        ));
                    }
                    TypeDescriptor::VarDim { offsets: inner, .. } if inner.is_some() != offsets.is_some() => {
                        return Err(TypeError::InvalidDescriptor(
                            "ragged dimensions of one chain must all carry offsets or none".to_string(),
                        ));
                    }
                    _ => {}
                }
                element.validate_node(true, offsets.as_deref(), seen_ellipsis)
            }
            TypeDescriptor::EllipsisDim { element } => {
                if seen_ellipsis {
                    return Err(TypeError::InvalidDescriptor(
                        "at most one ellipsis is allowed per dimension chain".to_string(),
                    ));
                }
                element.validate_node(under_var, None, true)
            }
            TypeDescriptor::Tuple(members) => members
                .iter()
                .try_for_each(|member| member.validate_node(under_var, None, false)),
            TypeDescriptor::Record(fields) => fields
                .iter()
                .try_for_each(|field| field.ty.validate_node(under_var, None, false)),
            TypeDescriptor::Primitive(_) | TypeDescriptor::Kind(_) | TypeDescriptor::TypeVar(_) => Ok(()),
        }
    }
}

fn validate_offsets(offsets: &[usize], parent: Option<&[usize]>) -> Result<()> {
    if offsets.first() != Some(&0) {
        return Err(TypeError::InvalidDescriptor(
            "var offsets must start at 0".to_string(),
        ));
    }
    if offsets.windows(2).any(|pair| pair[1] < pair[0]) {
        return Err(TypeError::InvalidDescriptor(
            "var offsets must be non-decreasing".to_string(),
        ));
    }
    let expected_len = match parent {
        Some(parent) => parent.last().copied().unwrap_or(0) + 1,
        None => 2,
    };
    if offsets.len() != expected_len {
        return Err(TypeError::InvalidDescriptor(format!(
            "var offsets have {} entries, expected {}",
            offsets.len(),
            expected_len
        )));
    }
    Ok(())
}

fn align_up(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

fn struct_layout<'a>(members: impl Iterator<Item = &'a TypeDescriptor>) -> Result<(ItemLayout, Vec<usize>)> {
    let mut offset = 0;
    let mut align = 1;
    let mut offsets = Vec::new();
    for member in members {
        let layout = member.item_layout()?;
        offset = align_up(offset, layout.align);
        offsets.push(offset);
        offset += layout.size;
        align = align.max(layout.align);
    }
    Ok((
        ItemLayout {
            size: align_up(offset, align),
            align,
        },
        offsets,
    ))
}

/// Byte strides for a packed array of `shape` with the given item size.
///
/// Row-major strides grow from the last dimension inward; column-major
/// strides grow from the first dimension outward. `None` when the packed
/// array would span more than `isize::MAX` bytes.
pub fn default_strides(shape: &[usize], item_size: usize, order: Order) -> Option<Vec<isize>> {
    let mut strides = vec![0isize; shape.len()];
    let mut step = isize::try_from(item_size).ok()?;
    let mut assign = |stride: &mut isize, extent: usize| -> Option<()> {
        *stride = step;
        step = step.checked_mul(isize::try_from(extent.max(1)).ok()?)?;
        Some(())
    };
    match order {
        Order::RowMajor => {
            for (stride, &extent) in strides.iter_mut().zip(shape).rev() {
                assign(stride, extent)?;
            }
        }
        Order::ColumnMajor => {
            for (stride, &extent) in strides.iter_mut().zip(shape) {
                assign(stride, extent)?;
            }
        }
    }
    Some(strides)
}

impl FromStr for TypeDescriptor {
    type Err = TypeError;

    fn from_str(text: &str) -> Result<Self> {
        crate::parser::parse(text)
    }
}

impl Serialize for TypeDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TypeDescriptor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int64() -> TypeDescriptor {
        TypeDescriptor::primitive(Primitive::Int64)
    }

    #[test]
    fn test_array_builder_shape_and_order() -> Result<()> {
        let ty = TypeDescriptor::array(&[2, 3], Order::ColumnMajor, int64())?;
        assert_eq!(ty.shape()?, vec![2, 3]);
        assert_eq!(ty.ndim(), 2);
        assert!(ty.is_f_order());
        assert!(!ty.is_c_order());
        assert_eq!(ty.dtype(), &int64());
        Ok(())
    }

    #[test]
    fn test_fixed_inherits_chain_order() -> Result<()> {
        let inner = TypeDescriptor::array(&[3], Order::ColumnMajor, int64())?;
        let ty = TypeDescriptor::fixed(2, inner)?;
        assert_eq!(ty.chain_order(), Some(Order::ColumnMajor));
        ty.validate()?;
        Ok(())
    }

    #[test]
    fn test_column_major_below_var_is_rejected() -> Result<()> {
        let inner = TypeDescriptor::record(vec![Field::new(
            "a",
            TypeDescriptor::array(&[2, 2], Order::ColumnMajor, int64())?,
        )])?;
        let err = TypeDescriptor::var(inner).unwrap_err();
        assert!(matches!(err, TypeError::InvalidDescriptor(_)));
        Ok(())
    }

    #[test]
    fn test_mixed_chain_is_rejected() -> Result<()> {
        let ragged = TypeDescriptor::var(int64())?;
        assert!(TypeDescriptor::fixed(2, ragged).is_err());
        let fixed = TypeDescriptor::array(&[2], Order::RowMajor, int64())?;
        assert!(TypeDescriptor::var(fixed).is_err());
        Ok(())
    }

    #[test]
    fn test_shape_of_ragged_fails() -> Result<()> {
        let ty = TypeDescriptor::var(int64())?;
        assert!(matches!(ty.shape(), Err(TypeError::NotFixedShape { .. })));
        assert!(ty.is_ragged());
        assert!(!ty.is_concrete());
        Ok(())
    }

    #[test]
    fn test_var_offsets_are_checked() -> Result<()> {
        let inner = TypeDescriptor::var_with_offsets(vec![0, 3, 7], int64())?;
        let ty = TypeDescriptor::var_with_offsets(vec![0, 2], inner)?;
        assert!(ty.is_concrete());

        let bad_inner = TypeDescriptor::VarDim {
            offsets: Some(vec![0, 3].into()),
            element: Box::new(int64()),
        };
        assert!(TypeDescriptor::var_with_offsets(vec![0, 2], bad_inner).is_err());
        assert!(TypeDescriptor::var_with_offsets(vec![1, 2], int64()).is_err());
        Ok(())
    }

    #[test]
    fn test_record_layout_has_padding() -> Result<()> {
        let ty = TypeDescriptor::record(vec![
            Field::new("flag", TypeDescriptor::primitive(Primitive::Bool)),
            Field::new("value", TypeDescriptor::primitive(Primitive::Float64)),
            Field::new("tag", TypeDescriptor::primitive(Primitive::Int16)),
        ])?;
        assert_eq!(ty.member_offsets()?, vec![0, 8, 16]);
        assert_eq!(ty.item_layout()?, ItemLayout { size: 24, align: 8 });
        assert_eq!(ty.item_size()?, 24);
        assert_eq!(ty.align()?, 8);
        Ok(())
    }

    #[test]
    fn test_default_strides() {
        assert_eq!(default_strides(&[2, 3], 8, Order::RowMajor), Some(vec![24, 8]));
        assert_eq!(default_strides(&[2, 3], 8, Order::ColumnMajor), Some(vec![8, 16]));
        assert_eq!(default_strides(&[], 8, Order::RowMajor), Some(Vec::new()));
    }

    #[test]
    fn test_default_strides_overflow() {
        let huge = 1usize << 62;
        assert_eq!(default_strides(&[huge, 4], 8, Order::RowMajor), None);
        assert_eq!(default_strides(&[4, huge], 8, Order::ColumnMajor), None);
        assert_eq!(default_strides(&[huge], 1, Order::RowMajor), Some(vec![1]));
    }

    #[test]
    fn test_oversized_item_layout_fails() {
        let ty = crate::parser::parse("4611686018427387904 * 4 * int64").unwrap();
        assert!(matches!(ty.item_layout(), Err(TypeError::TooLarge { .. })));
    }

    #[test]
    fn test_with_order_round_trip() -> Result<()> {
        let c = TypeDescriptor::array(&[2, 2], Order::RowMajor, int64())?;
        let f = c.column_major()?;
        assert_ne!(c, f);
        assert_eq!(f.with_order(Order::RowMajor)?, c);
        assert!(int64().column_major().is_err());
        Ok(())
    }

    #[test]
    fn test_abstract_item_layout_fails() {
        let ty = TypeDescriptor::Kind(Kind::Any);
        assert!(matches!(ty.item_layout(), Err(TypeError::Abstract { .. })));
    }
}
