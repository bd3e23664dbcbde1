//! Error types for container construction and element access

use ndforge_types::TypeError;

/// Result type for container operations
pub type Result<T> = std::result::Result<T, ContainerError>;

/// Errors that can occur while building or accessing a container
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ContainerError {
    /// Nested value does not have the declared extents
    #[error("shape mismatch at {path}: expected {expected} elements, found {found}")]
    ShapeMismatch { path: String, expected: usize, found: usize },

    /// Value cannot be stored as the declared element type
    #[error("type mismatch at {path}: expected {expected}, found {found}")]
    TypeMismatch { path: String, expected: String, found: String },

    /// Borrowed region cannot hold every addressable element
    #[error("buffer too small: need {required} bytes, have {available}")]
    BufferTooSmall { required: usize, available: usize },

    /// Element index outside its dimension
    #[error("index {index} out of bounds for axis {axis} with extent {extent}")]
    IndexOutOfBounds { axis: usize, index: usize, extent: usize },

    /// More indices than dimensions
    #[error("too many indices: {given} given for {ndim} dimensions")]
    TooManyIndices { given: usize, ndim: usize },

    /// Explicit strides do not line up with the descriptor's dimensions
    #[error("stride mismatch: expected {expected} strides, found {found}")]
    StrideMismatch { expected: usize, found: usize },

    /// Typed view requested on memory not aligned for the element type
    #[error("misaligned data: address {address:#x} is not aligned to {required} bytes")]
    Misaligned { address: usize, required: usize },

    /// Descriptor is malformed, abstract or lacks a layout
    #[error(transparent)]
    Type(#[from] TypeError),

    /// Operation not available for this container
    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// Path of the root element in error messages
pub(crate) const ROOT: &str = "<root>";

pub(crate) fn index_path(parent: &str, index: usize) -> String {
    if parent == ROOT {
        format!("[{}]", index)
    } else {
        format!("{}[{}]", parent, index)
    }
}

pub(crate) fn field_path(parent: &str, name: &str) -> String {
    if parent == ROOT {
        format!(".{}", name)
    } else {
        format!("{}.{}", parent, name)
    }
}
