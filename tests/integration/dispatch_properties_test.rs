//! Property tests for overload resolution and layout checking

use ndforge::container::contiguity_of;
use ndforge::prelude::*;
use ndforge::types::default_strides;
use proptest::prelude::*;

fn filled(rows: usize, cols: usize, column_major: bool) -> Container<'static> {
    let order = if column_major { Order::ColumnMajor } else { Order::RowMajor };
    let ty = TypeDescriptor::array(&[rows, cols], order, TypeDescriptor::Primitive(Primitive::Int64)).unwrap();
    let value = Value::from(
        (0..rows)
            .map(|i| (0..cols).map(|j| (i * cols + j) as i64).collect::<Vec<_>>())
            .collect::<Vec<_>>(),
    );
    Container::from_value(&ty, &value).unwrap()
}

fn tagged(tag: i64) -> impl Fn(&mut KernelArgs<'_, '_, '_>) -> Result<Option<Container<'static>>, KernelError> + Send + Sync + 'static {
    move |_| Ok(Some(Container::from_value(&parse("int64")?, &Value::Int(tag))?))
}

fn requirement_strategy() -> impl Strategy<Value = LayoutRequirement> {
    prop_oneof![
        Just(LayoutRequirement::Any),
        Just(LayoutRequirement::CContiguous),
        Just(LayoutRequirement::FContiguous),
    ]
}

proptest! {
    #[test]
    fn dispatch_is_deterministic(
        shapes in prop::collection::btree_set((1usize..4, 1usize..4), 1..5),
        pick in any::<prop::sample::Index>(),
    ) {
        let shapes: Vec<(usize, usize)> = shapes.into_iter().collect();
        let registry = KernelRegistry::new();
        registry.register("k", Signature::parse("N * M * int64 -> int64").unwrap(), tagged(-1)).unwrap();
        for (tag, (rows, cols)) in shapes.iter().enumerate() {
            let signature = Signature::parse(&format!("{} * {} * int64 -> int64", rows, cols)).unwrap();
            registry.register("k", signature, tagged(tag as i64)).unwrap();
        }

        let chosen = pick.index(shapes.len());
        let (rows, cols) = shapes[chosen];
        let arg = filled(rows, cols, false);
        let first = registry.dispatch("k", &mut [Arg::In(&arg)]).unwrap().unwrap().value().unwrap();
        prop_assert_eq!(first.clone(), Value::Int(chosen as i64));
        for _ in 0..3 {
            let again = registry.dispatch("k", &mut [Arg::In(&arg)]).unwrap().unwrap().value().unwrap();
            prop_assert_eq!(&again, &first);
        }

        let other = filled(4, 4, false);
        let generic = registry.dispatch("k", &mut [Arg::In(&other)]).unwrap().unwrap().value().unwrap();
        prop_assert_eq!(generic, Value::Int(-1));
    }

    #[test]
    fn layout_checks_fail_at_first_violation(
        params in prop::collection::vec((requirement_strategy(), any::<bool>()), 1..5),
    ) {
        let signature = Signature::new(
            params
                .iter()
                .map(|(required, _)| Param::input(parse("2 * 3 * int64").unwrap()).with_layout(*required))
                .collect(),
        );
        let registry = KernelRegistry::new();
        registry.register("k", signature, |_| Ok(None)).unwrap();

        let containers: Vec<Container<'static>> = params.iter().map(|(_, f)| filled(2, 3, *f)).collect();
        let mut args: Vec<Arg<'_, '_>> = containers.iter().map(Arg::In).collect();

        let expected = params.iter().position(|(required, column_major)| match required {
            LayoutRequirement::Any => false,
            LayoutRequirement::CContiguous => *column_major,
            LayoutRequirement::FContiguous => !*column_major,
        });

        match (registry.dispatch("k", &mut args), expected) {
            (Ok(None), None) => {}
            (Err(DispatchError::Layout { source, .. }), Some(index)) => {
                prop_assert_eq!(source.index, index);
                prop_assert_eq!(source.required, params[index].0);
            }
            (other, expected) => prop_assert!(false, "got {:?}, expected failure at {:?}", other, expected),
        }
    }

    #[test]
    fn contiguity_ignores_declared_order(
        shape in prop::collection::vec(1usize..5, 0..4),
        buffer_column_major in any::<bool>(),
    ) {
        let buffer_order = if buffer_column_major { Order::ColumnMajor } else { Order::RowMajor };
        let strides = default_strides(&shape, 8, buffer_order).unwrap();
        let mut bytes = vec![0u8; shape.iter().product::<usize>() * 8];
        let expected = contiguity_of(&shape, &strides, 8);

        for declared in [Order::RowMajor, Order::ColumnMajor] {
            let ty = TypeDescriptor::array(&shape, declared, TypeDescriptor::Primitive(Primitive::Int64)).unwrap();
            let container = Container::from_buffer(&ty, &mut bytes, Some(&strides)).unwrap();
            prop_assert_eq!(container.contiguity(), expected);
        }
        let layout_matches = if buffer_column_major { expected.is_f() } else { expected.is_c() };
        prop_assert!(layout_matches);
    }
}
