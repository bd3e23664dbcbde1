//! ndforge: structural n-dimensional types, typed containers and
//! layout-checked kernel dispatch.
//!
//! The workspace is split into layers, each usable on its own:
//!
//! - [`types`]: the datashape-style type grammar, descriptors and pattern matching
//! - [`container`]: containers binding a descriptor to owned or borrowed memory
//! - [`dispatch`]: the kernel registry and overload resolution
//! - [`tracing`]: subscriber setup and performance spans shared by all crates
//!
//! ```
//! use ndforge::prelude::*;
//!
//! let c = Container::from_value(&parse("2 * 2 * long").unwrap(), &Value::from(vec![vec![1i64, 2], vec![3, 4]])).unwrap();
//! let f = Container::from_value(&parse("!2 * 2 * long").unwrap(), &Value::from(vec![vec![1i64, 2], vec![3, 4]])).unwrap();
//! assert!(c.is_c_contiguous());
//! assert!(f.is_f_contiguous());
//! assert_eq!(c.value().unwrap(), f.value().unwrap());
//! ```

pub use ndforge_container as container;
pub use ndforge_dispatch as dispatch;
pub use ndforge_tracing as tracing;
pub use ndforge_types as types;

/// Common imports
pub mod prelude {
    pub use ndforge_container::{Container, ContainerError, Contiguity, LayoutRequirement, Value};
    pub use ndforge_dispatch::{Arg, DispatchError, KernelArgs, KernelError, KernelRegistry, Param, Role, Signature};
    pub use ndforge_types::{parse, parse_function, Order, Primitive, TypeDescriptor, TypeError};
}
