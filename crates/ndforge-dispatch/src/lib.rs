//! Kernel registry and multiple dispatch over typed containers
//!
//! Kernels are registered under a name with a [`Signature`]: one type
//! pattern per parameter, a role (`in`, `out`, `inout`) and an optional
//! memory layout requirement. [`KernelRegistry::dispatch`] picks the overload
//! whose patterns fit the argument descriptors, verifies layouts and roles,
//! then runs it.
//!
//! ```
//! use ndforge_container::{Container, LayoutRequirement, Value};
//! use ndforge_dispatch::{Arg, KernelRegistry, Signature};
//! use ndforge_types::parse;
//!
//! let registry = KernelRegistry::new();
//! let signature = Signature::parse("N * int64 -> int64")
//!     .unwrap()
//!     .with_param(0, |p| p.layout = LayoutRequirement::CContiguous)
//!     .unwrap();
//! registry
//!     .register("sum", signature, |args| {
//!         let total: i64 = args.input(0)?.as_slice::<i64>()?.iter().sum();
//!         Ok(Some(Container::from_value(&parse("int64")?, &Value::Int(total))?))
//!     })
//!     .unwrap();
//!
//! let xs = Container::from_value(&parse("3 * int64").unwrap(), &Value::from(vec![1i64, 2, 3])).unwrap();
//! let out = registry.dispatch("sum", &mut [Arg::In(&xs)]).unwrap().unwrap();
//! assert_eq!(out.value().unwrap(), Value::Int(6));
//! ```

pub mod args;
pub mod error;
pub mod registry;
pub mod signature;

pub use args::{Arg, KernelArgs};
pub use error::{DispatchError, KernelError, Result};
pub use registry::{Kernel, KernelFn, KernelRegistry, KernelResult, Resolution};
pub use signature::{Param, Role, Signature};
