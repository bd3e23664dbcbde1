//! Kernel signatures: parameter patterns, roles and layout requirements
//!
//! ```
//! use ndforge_container::LayoutRequirement;
//! use ndforge_dispatch::{Role, Signature};
//!
//! let signature = Signature::parse("N * M * int64, N * M * int64 -> int64")
//!     .unwrap()
//!     .with_param(0, |p| p.layout = LayoutRequirement::CContiguous)
//!     .unwrap()
//!     .with_param(1, |p| p.role = Role::InOut)
//!     .unwrap();
//! assert_eq!(signature.arity(), 2);
//! assert!(signature.is_generic());
//! ```

use crate::error::{DispatchError, Result};
use ndforge_container::LayoutRequirement;
use ndforge_types::{parse_function, TypeDescriptor};
use std::fmt;

/// How a kernel uses a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Role {
    #[default]
    In,
    Out,
    InOut,
}

impl Role {
    /// Whether the kernel may write through this parameter
    pub fn is_mutable(self) -> bool {
        matches!(self, Role::Out | Role::InOut)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::In => "in",
            Role::Out => "out",
            Role::InOut => "inout",
        })
    }
}

/// One parameter of a signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub pattern: TypeDescriptor,
    pub role: Role,
    pub layout: LayoutRequirement,
    pub name: Option<String>,
}

impl Param {
    pub fn new(pattern: TypeDescriptor, role: Role) -> Self {
        Self {
            pattern,
            role,
            layout: LayoutRequirement::Any,
            name: None,
        }
    }

    pub fn input(pattern: TypeDescriptor) -> Self {
        Self::new(pattern, Role::In)
    }

    pub fn output(pattern: TypeDescriptor) -> Self {
        Self::new(pattern, Role::Out)
    }

    pub fn inout(pattern: TypeDescriptor) -> Self {
        Self::new(pattern, Role::InOut)
    }

    pub fn with_layout(mut self, layout: LayoutRequirement) -> Self {
        self.layout = layout;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "{}: ", name)?;
        }
        write!(f, "{} [{}", self.pattern, self.role)?;
        if self.layout != LayoutRequirement::Any {
            write!(f, ", {}", self.layout)?;
        }
        f.write_str("]")
    }
}

/// Ordered parameters plus an optional return pattern
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Signature {
    params: Vec<Param>,
    returns: Option<TypeDescriptor>,
}

impl Signature {
    pub fn new(params: Vec<Param>) -> Self {
        Self { params, returns: None }
    }

    /// Build from function text. Every parameter starts as `in` with no
    /// layout requirement; adjust with [`Signature::with_param`].
    pub fn parse(text: &str) -> Result<Self> {
        let function = parse_function(text)?;
        if function.returns.len() > 1 {
            return Err(DispatchError::InvalidSignature(format!(
                "`{}` declares {} return values, at most one is supported",
                text,
                function.returns.len()
            )));
        }
        Ok(Self {
            params: function.params.into_iter().map(Param::input).collect(),
            returns: function.returns.into_iter().next(),
        })
    }

    pub fn returning(mut self, pattern: TypeDescriptor) -> Self {
        self.returns = Some(pattern);
        self
    }

    /// Adjust one parameter in place
    pub fn with_param(mut self, index: usize, update: impl FnOnce(&mut Param)) -> Result<Self> {
        let arity = self.params.len();
        let param = self.params.get_mut(index).ok_or_else(|| {
            DispatchError::InvalidSignature(format!("no parameter {} in a signature of arity {}", index, arity))
        })?;
        update(param);
        Ok(self)
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn returns(&self) -> Option<&TypeDescriptor> {
        self.returns.as_ref()
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Whether any parameter pattern has placeholders, kinds or ellipses
    pub fn is_generic(&self) -> bool {
        self.params.iter().any(|param| !param.pattern.is_concrete())
    }

    /// Two signatures collide when their patterns and layout requirements
    /// agree parameter for parameter. Roles and names do not distinguish.
    pub fn collides_with(&self, other: &Signature) -> bool {
        self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| a.pattern == b.pattern && a.layout == b.layout)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", param)?;
        }
        f.write_str(")")?;
        if let Some(returns) = &self.returns {
            write!(f, " -> {}", returns)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndforge_types::parse;

    #[test]
    fn test_parse_signature() {
        let signature = Signature::parse("2 * 2 * long, !2 * 2 * long -> long").unwrap();
        assert_eq!(signature.arity(), 2);
        assert_eq!(signature.returns(), Some(&parse("int64").unwrap()));
        assert!(signature.params().iter().all(|p| p.role == Role::In));
        assert!(!signature.is_generic());
    }

    #[test]
    fn test_void_returns() {
        let signature = Signature::parse("N * float64 -> void").unwrap();
        assert!(signature.returns().is_none());
        assert!(signature.is_generic());
    }

    #[test]
    fn test_multiple_returns_rejected() {
        let err = Signature::parse("int64 -> int64, int64").unwrap_err();
        assert!(matches!(err, DispatchError::InvalidSignature(_)));
    }

    #[test]
    fn test_with_param_out_of_range() {
        let err = Signature::parse("int64 -> void")
            .unwrap()
            .with_param(3, |p| p.role = Role::Out)
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidSignature(_)));
    }

    #[test]
    fn test_collision_ignores_roles_and_names() {
        let a = Signature::new(vec![Param::input(parse("2 * int64").unwrap()).named("x")]);
        let b = Signature::new(vec![Param::inout(parse("2 * int64").unwrap())]);
        let c = Signature::new(vec![
            Param::input(parse("2 * int64").unwrap()).with_layout(LayoutRequirement::CContiguous)
        ]);
        assert!(a.collides_with(&b));
        assert!(!a.collides_with(&c));
    }

    #[test]
    fn test_display() {
        let signature = Signature::new(vec![
            Param::inout(parse("!2 * 2 * long").unwrap())
                .named("b")
                .with_layout(LayoutRequirement::FContiguous),
        ])
        .returning(parse("long").unwrap());
        assert_eq!(signature.to_string(), "(b: !2 * 2 * int64 [inout, F-contiguous]) -> int64");
    }
}
