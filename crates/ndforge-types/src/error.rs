//! Error types for type descriptors

/// Result type for descriptor operations
pub type Result<T> = std::result::Result<T, TypeError>;

/// Errors raised while parsing, building or inspecting a descriptor
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    /// Type text is not well formed
    #[error("type grammar error at byte {position}: {message}")]
    TypeGrammar { position: usize, message: String },

    /// A fixed shape was requested from a ragged or symbolic descriptor
    #[error("descriptor `{descriptor}` does not have a fixed shape")]
    NotFixedShape { descriptor: String },

    /// A programmatically built descriptor violates a structural invariant
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),

    /// Memory layout was requested for an abstract descriptor
    #[error("descriptor `{descriptor}` is abstract and has no memory layout")]
    Abstract { descriptor: String },

    /// Packed size of the descriptor does not fit in the address space
    #[error("descriptor `{descriptor}` is too large to address")]
    TooLarge { descriptor: String },
}

impl TypeError {
    pub(crate) fn grammar(position: usize, message: impl Into<String>) -> Self {
        Self::TypeGrammar {
            position,
            message: message.into(),
        }
    }
}
