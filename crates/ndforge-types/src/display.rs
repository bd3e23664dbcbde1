//! Canonical text form of a descriptor
//!
//! Printing is the inverse of parsing: aliases print under their canonical
//! names and the `!` marker appears once, at the head of a column-major
//! chain.

use crate::descriptor::{Order, TypeDescriptor};
use std::fmt;

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_type(f, self, true)
    }
}

fn write_type(f: &mut fmt::Formatter<'_>, ty: &TypeDescriptor, chain_head: bool) -> fmt::Result {
    match ty {
        TypeDescriptor::FixedDim { count, order, element } => {
            if chain_head && *order == Order::ColumnMajor {
                f.write_str("!")?;
            }
            write!(f, "{} * ", count)?;
            write_type(f, element, false)
        }
        TypeDescriptor::SymbolicDim { name, order, element } => {
            if chain_head && *order == Order::ColumnMajor {
                f.write_str("!")?;
            }
            write!(f, "{} * ", name)?;
            write_type(f, element, false)
        }
        TypeDescriptor::VarDim { offsets, element } => {
            f.write_str("var")?;
            if let Some(offsets) = offsets {
                f.write_str("(offsets=[")?;
                for (i, offset) in offsets.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", offset)?;
                }
                f.write_str("])")?;
            }
            f.write_str(" * ")?;
            write_type(f, element, false)
        }
        TypeDescriptor::EllipsisDim { element } => {
            f.write_str("... * ")?;
            write_type(f, element, true)
        }
        TypeDescriptor::Primitive(primitive) => write!(f, "{}", primitive),
        TypeDescriptor::Kind(kind) => write!(f, "{}", kind),
        TypeDescriptor::TypeVar(name) => f.write_str(name),
        TypeDescriptor::Tuple(members) => {
            f.write_str("(")?;
            for (i, member) in members.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_type(f, member, true)?;
            }
            f.write_str(")")
        }
        TypeDescriptor::Record(fields) => {
            f.write_str("{")?;
            for (i, field) in fields.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{} : ", field.name)?;
                write_type(f, &field.ty, true)?;
            }
            f.write_str("}")
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::parse;

    fn canonical(input: &str) -> String {
        parse(input).unwrap().to_string()
    }

    #[test]
    fn test_aliases_print_canonically() {
        assert_eq!(canonical("2 * 2 * long"), "2 * 2 * int64");
        assert_eq!(canonical("double"), "float64");
    }

    #[test]
    fn test_order_marker_printed_once() {
        assert_eq!(canonical("!2 * 3 * 4 * int8"), "!2 * 3 * 4 * int8");
        assert_eq!(canonical("... * !N * M * T"), "... * !N * M * T");
    }

    #[test]
    fn test_composites() {
        assert_eq!(canonical("{a:int32,b:(float64,)}"), "{a : int32, b : (float64)}");
        assert_eq!(
            canonical("var(offsets=[0,2]) * var(offsets=[0,1,3]) * Any"),
            "var(offsets=[0, 2]) * var(offsets=[0, 1, 3]) * Any"
        );
    }

    #[test]
    fn test_printed_text_reparses_to_equal_descriptor() {
        for text in [
            "2 * 2 * long",
            "!2 * 2 * long",
            "var * var * float32",
            "N * M * T",
            "... * SignedKind",
            "3 * {x : !2 * 2 * complex128, y : (bool, uint8)}",
            "()",
        ] {
            let ty = parse(text).unwrap();
            assert_eq!(parse(&ty.to_string()).unwrap(), ty, "{}", text);
        }
    }
}
