//! Kernels that demand specific memory layouts of their in/out arguments.
//!
//! Each `mixed_inout_XY` kernel requires argument 0 in layout X and
//! argument 1 in layout Y, and returns `a[1] + b[2]` read in raw memory
//! order, so the result reveals which layout each argument actually had.

use ndforge::prelude::*;
use ndforge::tracing::{init_global_tracing, TracingConfig};
use serial_test::serial;
use std::sync::Once;

const A: [[i64; 2]; 2] = [[10, 20], [30, 40]];
const B: [[i64; 2]; 2] = [[5, 6], [7, 8]];

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let _ = init_global_tracing(&TracingConfig::for_ci());
    });
}

fn matrix(rows: [[i64; 2]; 2], column_major: bool) -> Container<'static> {
    let text = if column_major { "!2 * 2 * long" } else { "2 * 2 * long" };
    let value = Value::from(rows.iter().map(|row| row.to_vec()).collect::<Vec<_>>());
    Container::from_value(&parse(text).unwrap(), &value).unwrap()
}

fn c(rows: [[i64; 2]; 2]) -> Container<'static> {
    matrix(rows, false)
}

fn f(rows: [[i64; 2]; 2]) -> Container<'static> {
    matrix(rows, true)
}

fn requirement(flag: char) -> LayoutRequirement {
    match flag {
        'C' => LayoutRequirement::CContiguous,
        'F' => LayoutRequirement::FContiguous,
        _ => LayoutRequirement::Any,
    }
}

fn mixed_signature(layouts: &str) -> Signature {
    let mut flags = layouts.chars();
    let (first, second) = (flags.next().unwrap_or('A'), flags.next().unwrap_or('A'));
    Signature::parse("2 * 2 * long, 2 * 2 * long -> long")
        .unwrap()
        .with_param(0, |p| {
            p.role = Role::InOut;
            p.layout = requirement(first);
        })
        .unwrap()
        .with_param(1, |p| {
            p.role = Role::InOut;
            p.layout = requirement(second);
        })
        .unwrap()
}

fn memory_order_sum(args: &mut KernelArgs<'_, '_, '_>) -> Result<Option<Container<'static>>, KernelError> {
    let a = args.output(0)?.as_slice::<i64>()?[1];
    let b = args.output(1)?.as_slice::<i64>()?[2];
    Ok(Some(Container::from_value(&parse("int64")?, &Value::Int(a + b))?))
}

fn fixture_registry() -> KernelRegistry {
    init_tracing();
    let registry = KernelRegistry::new();
    for layouts in ["CF", "FC", "CC", "FF"] {
        registry
            .register(format!("mixed_inout_{}", layouts), mixed_signature(layouts), memory_order_sum)
            .unwrap();
    }
    registry.seal();
    registry
}

fn run(registry: &KernelRegistry, name: &str, mut a: Container<'static>, mut b: Container<'static>) -> Result<i64, DispatchError> {
    let out = registry.dispatch(name, &mut [Arg::Mut(&mut a), Arg::Mut(&mut b)])?;
    Ok(out.and_then(|c| c.value().ok()).and_then(|v| v.as_i64()).unwrap_or(i64::MIN))
}

fn assert_layout_error(result: Result<i64, DispatchError>, expected: &str) {
    match result {
        Err(err @ DispatchError::Layout { .. }) => {
            let message = err.to_string();
            assert!(
                message.contains(&format!(" {} ", expected)),
                "`{}` does not mention `{}`",
                message,
                expected
            );
        }
        other => panic!("expected a layout error mentioning `{}`, got {:?}", expected, other),
    }
}

#[test]
fn test_mixed_inout_cf() {
    let registry = fixture_registry();
    assert_eq!(run(&registry, "mixed_inout_CF", c(A), f(B)).unwrap(), 26);
    assert_layout_error(run(&registry, "mixed_inout_CF", f(A), c(B)), "must be C-contiguous");
    assert_layout_error(run(&registry, "mixed_inout_CF", c(A), c(B)), "must be F-contiguous");
}

#[test]
fn test_mixed_inout_fc() {
    let registry = fixture_registry();
    assert_eq!(run(&registry, "mixed_inout_FC", f(A), c(B)).unwrap(), 37);
    assert_layout_error(run(&registry, "mixed_inout_FC", c(A), f(B)), "must be F-contiguous");
}

#[test]
fn test_mixed_inout_cc() {
    let registry = fixture_registry();
    assert_eq!(run(&registry, "mixed_inout_CC", c(A), c(B)).unwrap(), 27);
    assert_layout_error(run(&registry, "mixed_inout_CC", f(A), f(B)), "must be C-contiguous");
}

#[test]
fn test_mixed_inout_ff() {
    let registry = fixture_registry();
    assert_eq!(run(&registry, "mixed_inout_FF", f(A), f(B)).unwrap(), 36);
    assert_layout_error(run(&registry, "mixed_inout_FF", c(A), c(B)), "must be F-contiguous");
}

#[test]
fn test_layout_overloads_under_one_name_are_ambiguous() {
    init_tracing();
    let registry = KernelRegistry::new();
    for layouts in ["CF", "FC", "CC", "FF"] {
        registry.register("mixed_inout", mixed_signature(layouts), memory_order_sum).unwrap();
    }

    // layout requirements never choose between overloads of equal type
    for (a, b) in [(c(A), f(B)), (f(A), c(B)), (c(A), c(B)), (f(A), f(B))] {
        match run(&registry, "mixed_inout", a, b).unwrap_err() {
            DispatchError::AmbiguousDispatch { name, candidates } => {
                assert_eq!(name, "mixed_inout");
                assert_eq!(candidates.len(), 4);
            }
            other => panic!("expected an ambiguous dispatch, got {:?}", other),
        }
    }
}

#[test]
fn test_same_layout_twice_is_a_duplicate() {
    let registry = fixture_registry();
    let fresh = KernelRegistry::new();
    fresh.register("k", mixed_signature("CF"), memory_order_sum).unwrap();
    let err = fresh.register("k", mixed_signature("CF"), memory_order_sum).unwrap_err();
    assert!(matches!(err, DispatchError::DuplicateSignature { .. }));

    // sealed fixture registry rejects additions outright
    let err = registry.register("mixed_inout_CF", mixed_signature("CF"), memory_order_sum).unwrap_err();
    assert!(matches!(err, DispatchError::RegistrySealed { .. }));
}

#[test]
fn test_layout_error_names_the_parameter() {
    let registry = KernelRegistry::new();
    let signature = mixed_signature("CF").with_param(1, |p| p.name = Some("rhs".into())).unwrap();
    registry.register("named", signature, memory_order_sum).unwrap();
    let err = run(&registry, "named", c(A), c(B)).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("rhs"), "{}", message);
    assert!(message.contains(" must be F-contiguous "), "{}", message);
}

#[test]
fn test_inout_writes_are_visible_to_the_caller() {
    init_tracing();
    let registry = KernelRegistry::new();
    registry
        .register("swap_corners", mixed_signature("CF"), |args| {
            let a = args.output(0)?;
            let corner = a.value_at(&[0, 0])?;
            let other = args.input(1)?.value_at(&[1, 1])?;
            args.output(0)?.set_at(&[0, 0], &other)?;
            args.output(1)?.set_at(&[1, 1], &corner)?;
            Ok(Some(Container::from_value(&parse("int64")?, &Value::Int(0))?))
        })
        .unwrap();

    let mut a = c(A);
    let mut b = f(B);
    registry.dispatch("swap_corners", &mut [Arg::Mut(&mut a), Arg::Mut(&mut b)]).unwrap();

    assert_eq!(a.value_at(&[0, 0]).unwrap(), Value::Int(8));
    assert_eq!(b.value_at(&[1, 1]).unwrap(), Value::Int(10));
    // F order is preserved: b[1][1] is still the last element in memory
    assert_eq!(b.as_slice::<i64>().unwrap(), &[5, 7, 6, 10]);
}

#[test]
fn test_shared_arguments_rejected_for_inout() {
    let registry = fixture_registry();
    let a = c(A);
    let mut b = f(B);
    let err = registry
        .dispatch("mixed_inout_CF", &mut [Arg::In(&a), Arg::Mut(&mut b)])
        .unwrap_err();
    assert!(matches!(err, DispatchError::ArgumentNotMutable { index: 0, .. }));
}

#[test]
fn test_wrong_shape_has_no_kernel() {
    let registry = fixture_registry();
    let mut a = Container::from_value(&parse("3 * long").unwrap(), &Value::from(vec![1i64, 2, 3])).unwrap();
    let mut b = f(B);
    let err = registry
        .dispatch("mixed_inout_CF", &mut [Arg::Mut(&mut a), Arg::Mut(&mut b)])
        .unwrap_err();
    assert!(matches!(err, DispatchError::NoMatchingKernel { .. }));
    assert!(err.to_string().contains("3 * int64"));
}

fn register_globally(layouts: &[&str]) {
    let registry = KernelRegistry::global();
    for layouts in layouts {
        registry
            .register(format!("global_mixed_{}", layouts), mixed_signature(layouts), memory_order_sum)
            .unwrap();
    }
}

fn unregister_globally() {
    let registry = KernelRegistry::global();
    for name in registry.names().into_iter().filter(|n| n.starts_with("global_mixed_")) {
        registry.unregister(&name).unwrap();
    }
}

#[test]
#[serial]
fn test_fixture_kernels_in_the_global_registry() {
    init_tracing();
    register_globally(&["CF", "FC", "CC", "FF"]);
    let registry = KernelRegistry::global();

    assert_eq!(run(registry, "global_mixed_CF", c(A), f(B)).unwrap(), 26);
    assert_eq!(run(registry, "global_mixed_FC", f(A), c(B)).unwrap(), 37);
    assert_eq!(run(registry, "global_mixed_CC", c(A), c(B)).unwrap(), 27);
    assert_eq!(run(registry, "global_mixed_FF", f(A), f(B)).unwrap(), 36);

    unregister_globally();
    assert!(!registry.names().iter().any(|n| n.starts_with("global_mixed_")));
}

#[test]
#[serial]
fn test_global_registration_is_exclusive_per_signature() {
    register_globally(&["CF"]);
    let registry = KernelRegistry::global();
    let err = registry
        .register("global_mixed_CF", mixed_signature("CF"), memory_order_sum)
        .unwrap_err();
    assert!(matches!(err, DispatchError::DuplicateSignature { .. }));
    assert_layout_error(run(registry, "global_mixed_CF", c(A), c(B)), "must be F-contiguous");
    unregister_globally();
}
