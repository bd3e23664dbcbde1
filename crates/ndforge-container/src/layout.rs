//! Contiguity classification and layout requirement checks
//!
//! Contiguity is derived from the actual strides, never from the order flag
//! of the descriptor. Dimensions of extent 1 place no constraint on their
//! stride, and an array with no elements is trivially contiguous in both
//! orders.

use crate::container::Container;
use std::fmt;

/// Memory layout of a container as judged from its strides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Contiguity {
    CContiguous,
    FContiguous,
    /// Both orders at once: scalars, 1-d packed arrays, empty arrays
    Both,
    Neither,
}

impl Contiguity {
    pub fn is_c(self) -> bool {
        matches!(self, Contiguity::CContiguous | Contiguity::Both)
    }

    pub fn is_f(self) -> bool {
        matches!(self, Contiguity::FContiguous | Contiguity::Both)
    }
}

impl fmt::Display for Contiguity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Contiguity::CContiguous => "C-contiguous",
            Contiguity::FContiguous => "F-contiguous",
            Contiguity::Both => "C- and F-contiguous",
            Contiguity::Neither => "non-contiguous",
        })
    }
}

/// Classify a strided layout
pub fn contiguity_of(shape: &[usize], strides: &[isize], item_size: usize) -> Contiguity {
    if shape.contains(&0) {
        return Contiguity::Both;
    }

    let packed = |dims: &mut dyn Iterator<Item = (&usize, &isize)>| {
        let mut expected = item_size as isize;
        for (&extent, &stride) in dims {
            if extent == 1 {
                continue;
            }
            if stride != expected {
                return false;
            }
            expected *= extent as isize;
        }
        true
    };

    let c = packed(&mut shape.iter().zip(strides).rev());
    let f = packed(&mut shape.iter().zip(strides));
    match (c, f) {
        (true, true) => Contiguity::Both,
        (true, false) => Contiguity::CContiguous,
        (false, true) => Contiguity::FContiguous,
        (false, false) => Contiguity::Neither,
    }
}

/// Layout a kernel parameter demands of its argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LayoutRequirement {
    #[default]
    Any,
    CContiguous,
    FContiguous,
}

impl LayoutRequirement {
    pub fn is_satisfied_by(self, contiguity: Contiguity) -> bool {
        match self {
            LayoutRequirement::Any => true,
            LayoutRequirement::CContiguous => contiguity.is_c(),
            LayoutRequirement::FContiguous => contiguity.is_f(),
        }
    }
}

impl fmt::Display for LayoutRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LayoutRequirement::Any => "any",
            LayoutRequirement::CContiguous => "C-contiguous",
            LayoutRequirement::FContiguous => "F-contiguous",
        })
    }
}

fn label(name: &Option<String>) -> String {
    match name {
        Some(name) => format!(" ({})", name),
        None => String::new(),
    }
}

/// An argument does not have the layout its parameter requires
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("argument {index}{} must be {required} (actual layout: {actual})", label(.name))]
pub struct LayoutError {
    /// Position of the parameter in the signature
    pub index: usize,
    pub name: Option<String>,
    pub required: LayoutRequirement,
    pub actual: Contiguity,
}

/// Check one argument against a layout requirement.
///
/// `Any` always succeeds. Otherwise the container's actual contiguity must
/// include the requested order.
pub fn check(
    container: &Container<'_>,
    requirement: LayoutRequirement,
    index: usize,
    name: Option<&str>,
) -> Result<(), LayoutError> {
    if requirement == LayoutRequirement::Any {
        return Ok(());
    }
    let actual = container.contiguity();
    if requirement.is_satisfied_by(actual) {
        Ok(())
    } else {
        Err(LayoutError {
            index,
            name: name.map(str::to_string),
            required: requirement,
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use ndforge_types::parse;

    #[test]
    fn test_contiguity_of_two_by_two() {
        assert_eq!(contiguity_of(&[2, 2], &[16, 8], 8), Contiguity::CContiguous);
        assert_eq!(contiguity_of(&[2, 2], &[8, 16], 8), Contiguity::FContiguous);
        assert_eq!(contiguity_of(&[2, 2], &[32, 8], 8), Contiguity::Neither);
    }

    #[test]
    fn test_degenerate_shapes_are_both() {
        assert_eq!(contiguity_of(&[], &[], 8), Contiguity::Both);
        assert_eq!(contiguity_of(&[5], &[8], 8), Contiguity::Both);
        assert_eq!(contiguity_of(&[0, 3], &[999, 1], 8), Contiguity::Both);
        assert_eq!(contiguity_of(&[1, 4], &[0, 8], 8), Contiguity::Both);
        assert_eq!(contiguity_of(&[5], &[-8], 8), Contiguity::Neither);
    }

    #[test]
    fn test_check_error_message() {
        let c = Container::from_value(&parse("2 * 2 * int64").unwrap(), &Value::from(vec![vec![0i64, 1], vec![2, 3]]))
            .unwrap();
        assert!(check(&c, LayoutRequirement::Any, 0, None).is_ok());
        assert!(check(&c, LayoutRequirement::CContiguous, 0, None).is_ok());

        let err = check(&c, LayoutRequirement::FContiguous, 1, Some("b")).unwrap_err();
        assert_eq!(err.to_string(), "argument 1 (b) must be F-contiguous (actual layout: C-contiguous)");
        let err = check(&c, LayoutRequirement::FContiguous, 0, None).unwrap_err();
        assert_eq!(err.to_string(), "argument 0 must be F-contiguous (actual layout: C-contiguous)");
    }

    #[test]
    fn test_actual_strides_override_declared_order() {
        // declared column-major, but a 2x1 array is packed either way
        let ty = parse("!2 * 1 * int64").unwrap();
        let c = Container::from_value(&ty, &Value::from(vec![vec![1i64], vec![2]])).unwrap();
        assert!(check(&c, LayoutRequirement::CContiguous, 0, None).is_ok());
        assert!(check(&c, LayoutRequirement::FContiguous, 0, None).is_ok());
    }
}
