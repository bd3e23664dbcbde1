//! Convenience macros for performance instrumentation.

/// Create a [`crate::performance::PerformanceSpan`] guard, optionally
/// recording extra fields on a debug span that stays entered for the
/// guard's lifetime.
///
/// ```rust
/// use ndforge_tracing::perf_span;
///
/// {
///     let _span = perf_span!("dispatch", kernel = "gemm", arity = 3);
///     // ... timed work ...
/// }
/// ```
#[macro_export]
macro_rules! perf_span {
    ($name:expr) => {{
        $crate::performance::PerformanceSpan::new($name, None)
    }};
    ($name:expr, $($field:tt = $value:expr),+ $(,)?) => {{
        $crate::performance::PerformanceSpan::with_fields(
            $name,
            None,
            tracing::debug_span!("perf", name = $name, $($field = $value),+),
        )
    }};
}

/// Emit a standardised debug-level performance event.
///
/// ```rust
/// use ndforge_tracing::perf_event;
///
/// perf_event!("layout_check", parameter = 1, passed = true);
/// ```
#[macro_export]
macro_rules! perf_event {
    ($name:expr, $($field:tt = $value:expr),+ $(,)?) => {
        tracing::debug!(
            event = $name,
            $($field = $value),+
        );
    };
}
