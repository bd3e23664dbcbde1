//! Property tests for strided containers

use ndforge_container::{Container, Contiguity, Value};
use ndforge_types::{Order, Primitive, TypeDescriptor};
use proptest::prelude::*;

fn nested(shape: &[usize], next: &mut i64) -> Value {
    match shape.split_first() {
        None => {
            *next += 1;
            Value::Int(*next)
        }
        Some((&extent, rest)) => Value::List((0..extent).map(|_| nested(rest, next)).collect()),
    }
}

fn int64_array(shape: &[usize], order: Order) -> TypeDescriptor {
    TypeDescriptor::array(shape, order, TypeDescriptor::Primitive(Primitive::Int64)).unwrap()
}

proptest! {
    #[test]
    fn value_survives_any_order(shape in prop::collection::vec(1usize..5, 0..4), column_major in any::<bool>()) {
        let order = if column_major { Order::ColumnMajor } else { Order::RowMajor };
        let value = nested(&shape, &mut 0);
        let container = Container::from_value(&int64_array(&shape, order), &value).unwrap();
        prop_assert_eq!(container.value().unwrap(), value);
    }

    #[test]
    fn packed_layout_matches_declared_order(shape in prop::collection::vec(2usize..5, 2..4)) {
        let value = nested(&shape, &mut 0);
        let c = Container::from_value(&int64_array(&shape, Order::RowMajor), &value).unwrap();
        let f = Container::from_value(&int64_array(&shape, Order::ColumnMajor), &value).unwrap();
        prop_assert_eq!(c.contiguity(), Contiguity::CContiguous);
        prop_assert_eq!(f.contiguity(), Contiguity::FContiguous);
    }

    #[test]
    fn column_major_bytes_reinterpreted_as_row_major_transpose(rows in 1usize..5, cols in 1usize..5) {
        let value = nested(&[rows, cols], &mut 0);
        let f = Container::from_value(&int64_array(&[rows, cols], Order::ColumnMajor), &value).unwrap();
        let mut bytes = f.bytes().to_vec();

        // the same memory read as a row-major cols x rows array is the transpose
        let t = Container::from_buffer(&int64_array(&[cols, rows], Order::RowMajor), &mut bytes, None).unwrap();
        for i in 0..rows {
            for j in 0..cols {
                prop_assert_eq!(f.value_at(&[i, j]).unwrap(), t.value_at(&[j, i]).unwrap());
            }
        }
    }

    #[test]
    fn undersized_regions_are_rejected(shape in prop::collection::vec(1usize..5, 1..4), missing in 1usize..8) {
        let ty = int64_array(&shape, Order::RowMajor);
        let required = shape.iter().product::<usize>() * 8;
        let mut bytes = vec![0u8; required.saturating_sub(missing)];
        prop_assert!(Container::from_buffer(&ty, &mut bytes, None).is_err());
    }
}
