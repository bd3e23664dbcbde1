//! Kernel registry and overload resolution
//!
//! Overloads are grouped by name. Registration takes a write lock; dispatch
//! takes a read lock only long enough to snapshot the overload list, so a
//! kernel may itself dispatch through the same registry.
//!
//! # Resolution
//!
//! 1. keep overloads whose arity equals the argument count
//! 2. keep overloads whose patterns unify with the argument descriptors,
//!    with symbolic dims and type variables bound across all parameters
//! 3. keep the best tier: concrete signatures outrank generic ones; more
//!    than one overload left in that tier is ambiguous
//! 4. check the selected overload's layouts in parameter order, stopping at
//!    the first failure, then check that outputs were passed mutably
//! 5. run the kernel and check its result against the return pattern

use crate::args::{Arg, KernelArgs};
use crate::error::{DispatchError, KernelError, Result};
use crate::signature::Signature;
use ndforge_container::{check, Container};
use ndforge_tracing::{perf_event, perf_span};
use ndforge_tracing::performance::record_resolution;
use ndforge_types::{matches, Bindings};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::Instant;

/// What a kernel body returns
pub type KernelResult = std::result::Result<Option<Container<'static>>, KernelError>;

/// Type-erased kernel body
pub type KernelFn = dyn Fn(&mut KernelArgs<'_, '_, '_>) -> KernelResult + Send + Sync;

/// One registered overload
pub struct Kernel {
    name: String,
    signature: Signature,
    func: Box<KernelFn>,
}

impl Kernel {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kernel")
            .field("name", &self.name)
            .field("signature", &self.signature.to_string())
            .finish_non_exhaustive()
    }
}

/// Overload selected for one call
#[derive(Debug, Clone)]
pub struct Resolution {
    pub kernel: Arc<Kernel>,
    pub bindings: Bindings,
}

/// Registry of named, overloaded kernels
#[derive(Default)]
pub struct KernelRegistry {
    overloads: RwLock<HashMap<String, Vec<Arc<Kernel>>>>,
    sealed: AtomicBool,
}

/// Process-wide registry
static GLOBAL_REGISTRY: LazyLock<KernelRegistry> = LazyLock::new(KernelRegistry::new);

fn describe_args(args: &[Arg<'_, '_>]) -> String {
    args.iter()
        .map(|arg| arg.descriptor().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl KernelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared process-wide instance
    pub fn global() -> &'static KernelRegistry {
        &GLOBAL_REGISTRY
    }

    /// Add an overload under `name`
    pub fn register<F>(&self, name: impl Into<String>, signature: Signature, func: F) -> Result<()>
    where
        F: Fn(&mut KernelArgs<'_, '_, '_>) -> KernelResult + Send + Sync + 'static,
    {
        let name = name.into();
        if self.is_sealed() {
            return Err(DispatchError::RegistrySealed { name });
        }

        let mut overloads = self.overloads.write();
        let entry = overloads.entry(name.clone()).or_default();
        if entry.iter().any(|kernel| kernel.signature.collides_with(&signature)) {
            return Err(DispatchError::DuplicateSignature {
                name,
                signature: signature.to_string(),
            });
        }

        tracing::info!(kernel = %name, signature = %signature, overloads = entry.len() + 1, "registered kernel");
        entry.push(Arc::new(Kernel {
            name,
            signature,
            func: Box::new(func),
        }));
        Ok(())
    }

    /// Remove every overload under `name`, returning how many were removed
    pub fn unregister(&self, name: &str) -> Result<usize> {
        if self.is_sealed() {
            return Err(DispatchError::RegistrySealed { name: name.to_string() });
        }
        let removed = self.overloads.write().remove(name).map_or(0, |kernels| kernels.len());
        tracing::info!(kernel = %name, removed, "unregistered kernel");
        Ok(removed)
    }

    /// End the registration phase. Later registrations fail.
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
        tracing::info!(kernels = self.len(), "registry sealed");
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// Overloads registered under `name`, in registration order
    pub fn kernels(&self, name: &str) -> Vec<Arc<Kernel>> {
        self.overloads.read().get(name).cloned().unwrap_or_default()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.overloads.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Total number of overloads
    pub fn len(&self) -> usize {
        self.overloads.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Select the overload of `name` for these arguments without running it
    pub fn resolve(&self, name: &str, args: &[Arg<'_, '_>]) -> Result<Resolution> {
        let started = Instant::now();
        let candidates = self.kernels(name);
        let candidate_count = candidates.len();

        let matched: Vec<Resolution> = candidates
            .into_iter()
            .filter(|kernel| kernel.signature.arity() == args.len())
            .filter_map(|kernel| {
                let mut bindings = Bindings::new();
                let unified = kernel
                    .signature
                    .params()
                    .iter()
                    .zip(args)
                    .all(|(param, arg)| matches(&param.pattern, arg.descriptor(), &mut bindings));
                tracing::trace!(kernel = %name, signature = %kernel.signature, unified, "candidate");
                unified.then_some(Resolution { kernel, bindings })
            })
            .collect();

        record_resolution(name, candidate_count, matched.len(), started.elapsed().as_micros() as u64);

        let Some(best) = matched.iter().map(|r| r.kernel.signature.is_generic()).min() else {
            return Err(DispatchError::NoMatchingKernel {
                name: name.to_string(),
                arguments: describe_args(args),
            });
        };
        let mut tier: Vec<Resolution> = matched
            .into_iter()
            .filter(|r| r.kernel.signature.is_generic() == best)
            .collect();

        if tier.len() == 1 {
            return Ok(tier.remove(0));
        }
        Err(DispatchError::AmbiguousDispatch {
            name: name.to_string(),
            candidates: tier.iter().map(|r| r.kernel.signature.to_string()).collect(),
        })
    }

    /// Resolve, validate and run `name` on `args`.
    ///
    /// Arguments for `out`/`inout` parameters must be [`Arg::Mut`]; the
    /// kernel may write through them. A kernel that fails part way leaves
    /// whatever it already wrote.
    pub fn dispatch(&self, name: &str, args: &mut [Arg<'_, '_>]) -> Result<Option<Container<'static>>> {
        let _span = perf_span!("dispatch", kernel = name, arity = args.len());
        let Resolution { kernel, bindings } = self.resolve(name, args)?;
        tracing::debug!(kernel = %name, signature = %kernel.signature, "resolved overload");

        for (index, (param, arg)) in kernel.signature.params().iter().zip(args.iter()).enumerate() {
            check(arg.container(), param.layout, index, param.name.as_deref()).map_err(|source| {
                perf_event!(
                    "layout_rejected",
                    kernel = name,
                    parameter = index,
                    required = tracing::field::display(source.required),
                    actual = tracing::field::display(source.actual)
                );
                DispatchError::Layout {
                    kernel: name.to_string(),
                    source,
                }
            })?;
        }
        for (index, (param, arg)) in kernel.signature.params().iter().zip(args.iter()).enumerate() {
            if param.role.is_mutable() && !arg.is_mutable() {
                return Err(DispatchError::ArgumentNotMutable {
                    kernel: name.to_string(),
                    index,
                });
            }
        }

        let result = {
            let _span = perf_span!("kernel", kernel = name);
            (kernel.func)(&mut KernelArgs::new(args, &kernel.signature, &bindings))
        }
        .map_err(|source| DispatchError::Kernel {
            kernel: name.to_string(),
            source,
        })?;

        if let Some(pattern) = kernel.signature.returns() {
            let mut bindings = bindings.clone();
            let found = match &result {
                Some(container) if matches(pattern, container.descriptor(), &mut bindings) => None,
                Some(container) => Some(format!("`{}`", container.descriptor())),
                None => Some("nothing".to_string()),
            };
            if let Some(found) = found {
                return Err(DispatchError::ReturnMismatch {
                    kernel: name.to_string(),
                    expected: format!("`{}`", pattern),
                    found,
                });
            }
        }
        Ok(result)
    }
}
