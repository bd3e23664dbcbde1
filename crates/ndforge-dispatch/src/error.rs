//! Error types for registration and dispatch

use ndforge_container::{ContainerError, LayoutError};
use ndforge_types::TypeError;

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, DispatchError>;

/// Errors raised by the registry and the dispatcher
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Same name, same patterns, same layout requirements
    #[error("duplicate signature for kernel `{name}`: {signature}")]
    DuplicateSignature { name: String, signature: String },

    /// More than one overload of equal precedence accepts the arguments
    #[error("ambiguous dispatch for kernel `{name}`: {} overloads match equally ({})", .candidates.len(), .candidates.join("; "))]
    AmbiguousDispatch { name: String, candidates: Vec<String> },

    /// No overload accepts the arguments
    #[error("no kernel `{name}` matches arguments ({arguments})")]
    NoMatchingKernel { name: String, arguments: String },

    /// An argument fails its parameter's layout requirement
    #[error("{kernel}: {source}")]
    Layout {
        kernel: String,
        #[source]
        source: LayoutError,
    },

    /// An out/inout parameter was given a shared argument
    #[error("{kernel}: argument {index} is an output and must be passed mutably")]
    ArgumentNotMutable { kernel: String, index: usize },

    /// The kernel itself reported a failure
    #[error("kernel `{kernel}` failed: {source}")]
    Kernel {
        kernel: String,
        #[source]
        source: KernelError,
    },

    /// Returned container does not fit the declared return pattern
    #[error("kernel `{kernel}` returned {found}, expected {expected}")]
    ReturnMismatch {
        kernel: String,
        expected: String,
        found: String,
    },

    /// Registration attempted after the registry was sealed
    #[error("registry is sealed; cannot modify kernel `{name}`")]
    RegistrySealed { name: String },

    /// Signature cannot be built as requested
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Errors a kernel body reports back to the dispatcher
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    #[error("argument index {index} out of range for {len} arguments")]
    ArgumentIndex { index: usize, len: usize },

    #[error("argument {index} is not an out/inout parameter")]
    NotMutable { index: usize },

    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("{0}")]
    Failed(String),
}

impl KernelError {
    pub fn failed(message: impl Into<String>) -> Self {
        KernelError::Failed(message.into())
    }
}
