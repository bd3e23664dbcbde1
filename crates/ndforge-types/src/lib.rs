//! # ndforge-types - Structural Type Descriptors
//!
//! Describes multi-dimensional data as an immutable tree: fixed and ragged
//! dimensions, memory order, and primitive, tuple or record elements.
//!
//! ## Grammar
//!
//! Types are written as `*`-separated dimensions ending in an element type:
//!
//! - `2 * 3 * int64` - row-major 2x3 matrix
//! - `!2 * 3 * int64` - the same matrix in column-major order
//! - `var * var * float32` - two ragged levels
//! - `N * M * T` - signature pattern with symbolic dims and a type variable
//! - `... * FloatKind` - any number of leading dims over a float element
//! - `{x : float64, tag : (int8, uint8)}` - records and tuples
//!
//! ## Example
//!
//! ```
//! use ndforge_types::{matches, parse, Bindings};
//!
//! let pattern = parse("N * M * SignedKind").unwrap();
//! let concrete = parse("!2 * 3 * long").unwrap();
//!
//! let mut bindings = Bindings::new();
//! assert!(matches(&pattern, &concrete, &mut bindings));
//! assert_eq!(bindings.dim("M"), Some(3));
//! ```

pub mod descriptor;
mod display;
pub mod error;
pub mod lexer;
pub mod matching;
pub mod parser;
pub mod primitive;

pub use descriptor::{default_strides, Field, ItemLayout, Order, TypeDescriptor};
pub use error::{Result, TypeError};
pub use matching::{matches, Bindings};
pub use parser::{parse, parse_function, FunctionType};
pub use primitive::{Kind, Primitive};
