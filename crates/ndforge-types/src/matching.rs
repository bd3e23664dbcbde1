//! Structural unification of signature patterns against concrete types
//!
//! Symbolic dimensions and type variables bind on first use and must agree
//! on every later use; bindings are shared across all parameters of one
//! call. The outer dimensions absorbed by `...` bind the same way, so
//! `... * N * T, ... * N * T` requires both arguments to share their outer
//! shape. Order flags are not part of matching: layout is judged separately
//! from the actual strides.

use crate::descriptor::TypeDescriptor;
use crate::primitive::Kind;
use std::collections::BTreeMap;

/// Values bound to the placeholders of a pattern
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    dims: BTreeMap<String, usize>,
    types: BTreeMap<String, TypeDescriptor>,
    ellipsis: Option<Vec<Option<usize>>>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extent bound to a symbolic dimension
    pub fn dim(&self, name: &str) -> Option<usize> {
        self.dims.get(name).copied()
    }

    /// Type bound to a type variable
    pub fn type_var(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    pub fn dims(&self) -> impl Iterator<Item = (&str, usize)> {
        self.dims.iter().map(|(name, &count)| (name.as_str(), count))
    }

    /// Outer dimensions absorbed by `...`, outermost first. Ragged
    /// dimensions appear as `None`.
    pub fn ellipsis(&self) -> Option<&[Option<usize>]> {
        self.ellipsis.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.dims.is_empty() && self.types.is_empty() && self.ellipsis.is_none()
    }

    fn bind_dim(&mut self, name: &str, count: usize) -> bool {
        match self.dims.get(name) {
            Some(&bound) => bound == count,
            None => {
                self.dims.insert(name.to_string(), count);
                true
            }
        }
    }

    fn bind_ellipsis(&mut self, absorbed: &[Option<usize>]) -> bool {
        match &self.ellipsis {
            Some(bound) => bound == absorbed,
            None => {
                self.ellipsis = Some(absorbed.to_vec());
                true
            }
        }
    }

    fn bind_type(&mut self, name: &str, ty: &TypeDescriptor) -> bool {
        match self.types.get(name) {
            Some(bound) => bound == ty,
            None => {
                self.types.insert(name.to_string(), ty.clone());
                true
            }
        }
    }
}

/// Match `candidate` against `pattern`, extending `bindings` on success.
///
/// On failure `bindings` is left as it was.
pub fn matches(pattern: &TypeDescriptor, candidate: &TypeDescriptor, bindings: &mut Bindings) -> bool {
    let mut trial = bindings.clone();
    if unify(pattern, candidate, &mut trial) {
        *bindings = trial;
        true
    } else {
        false
    }
}

fn unify(pattern: &TypeDescriptor, candidate: &TypeDescriptor, bindings: &mut Bindings) -> bool {
    use TypeDescriptor as T;

    match (pattern, candidate) {
        (T::Kind(Kind::Any), _) => true,
        (T::Kind(kind), T::Primitive(primitive)) => kind.admits(*primitive),
        (T::TypeVar(name), other) => !other.is_dim() && bindings.bind_type(name, other),

        // `...` absorbs zero or more leading dimensions, shortest first
        (T::EllipsisDim { element }, _) => {
            let mut absorbed = Vec::new();
            let mut current = candidate;
            loop {
                let mut trial = bindings.clone();
                if trial.bind_ellipsis(&absorbed) && unify(element, current, &mut trial) {
                    *bindings = trial;
                    return true;
                }
                current = match current {
                    T::FixedDim { count, element, .. } => {
                        absorbed.push(Some(*count));
                        element.as_ref()
                    }
                    T::VarDim { element, .. } => {
                        absorbed.push(None);
                        element.as_ref()
                    }
                    _ => return false,
                };
            }
        }

        (
            T::FixedDim { count, element, .. },
            T::FixedDim {
                count: actual,
                element: actual_element,
                ..
            },
        ) => count == actual && unify(element, actual_element, bindings),
        (
            T::SymbolicDim { name, element, .. },
            T::FixedDim {
                count,
                element: actual_element,
                ..
            },
        ) => bindings.bind_dim(name, *count) && unify(element, actual_element, bindings),
        (
            T::VarDim { offsets, element },
            T::VarDim {
                offsets: actual_offsets,
                element: actual_element,
            },
        ) => (offsets.is_none() || offsets == actual_offsets) && unify(element, actual_element, bindings),

        (T::Primitive(a), T::Primitive(b)) => a == b,
        (T::Tuple(members), T::Tuple(actual)) => {
            members.len() == actual.len() && members.iter().zip(actual).all(|(p, c)| unify(p, c, bindings))
        }
        (T::Record(fields), T::Record(actual)) => {
            fields.len() == actual.len()
                && fields
                    .iter()
                    .zip(actual)
                    .all(|(p, c)| p.name == c.name && unify(&p.ty, &c.ty, bindings))
        }
        _ => false,
    }
}
