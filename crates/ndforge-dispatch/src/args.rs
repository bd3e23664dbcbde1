//! Call arguments and the view a kernel gets of them
//!
//! Callers choose per argument whether to lend a container shared or
//! exclusive. Kernels reach arguments through [`KernelArgs`], which hands
//! out `&mut` access only for parameters whose role is `out` or `inout`.

use crate::error::KernelError;
use crate::signature::Signature;
use ndforge_container::Container;
use ndforge_types::{Bindings, TypeDescriptor};

/// One dispatch argument
#[derive(Debug)]
pub enum Arg<'c, 'a> {
    In(&'c Container<'a>),
    Mut(&'c mut Container<'a>),
}

impl<'c, 'a> Arg<'c, 'a> {
    pub fn container(&self) -> &Container<'a> {
        match self {
            Arg::In(container) => container,
            Arg::Mut(container) => container,
        }
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        self.container().descriptor()
    }

    pub fn is_mutable(&self) -> bool {
        matches!(self, Arg::Mut(_))
    }
}

impl<'c, 'a> From<&'c Container<'a>> for Arg<'c, 'a> {
    fn from(container: &'c Container<'a>) -> Self {
        Arg::In(container)
    }
}

impl<'c, 'a> From<&'c mut Container<'a>> for Arg<'c, 'a> {
    fn from(container: &'c mut Container<'a>) -> Self {
        Arg::Mut(container)
    }
}

/// Arguments of one kernel invocation, scoped to the call
pub struct KernelArgs<'s, 'c, 'a> {
    args: &'s mut [Arg<'c, 'a>],
    signature: &'s Signature,
    bindings: &'s Bindings,
}

impl<'s, 'c, 'a> KernelArgs<'s, 'c, 'a> {
    pub(crate) fn new(args: &'s mut [Arg<'c, 'a>], signature: &'s Signature, bindings: &'s Bindings) -> Self {
        Self {
            args,
            signature,
            bindings,
        }
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Shared view of any argument
    pub fn input(&self, index: usize) -> Result<&Container<'a>, KernelError> {
        self.args
            .get(index)
            .map(Arg::container)
            .ok_or(KernelError::ArgumentIndex {
                index,
                len: self.args.len(),
            })
    }

    /// Exclusive view of an `out` or `inout` argument
    pub fn output(&mut self, index: usize) -> Result<&mut Container<'a>, KernelError> {
        let len = self.args.len();
        let mutable = self
            .signature
            .params()
            .get(index)
            .is_some_and(|param| param.role.is_mutable());
        match self.args.get_mut(index) {
            None => Err(KernelError::ArgumentIndex { index, len }),
            Some(Arg::Mut(container)) if mutable => Ok(&mut **container),
            Some(_) => Err(KernelError::NotMutable { index }),
        }
    }

    /// Extent bound to a symbolic dimension of the signature
    pub fn dim(&self, name: &str) -> Option<usize> {
        self.bindings.dim(name)
    }

    pub fn bindings(&self) -> &Bindings {
        self.bindings
    }

    pub fn signature(&self) -> &Signature {
        self.signature
    }
}
