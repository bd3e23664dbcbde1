//! Timing spans and standard performance events.
//!
//! ```rust
//! use ndforge_tracing::performance::{record_allocation, PerformanceSpan};
//!
//! let span = PerformanceSpan::new("parse", Some(100));
//! // ... work ...
//! drop(span); // logged only if it took at least 100µs
//!
//! record_allocation(64, "owned", 16);
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

static ENABLED: AtomicBool = AtomicBool::new(true);
// u64::MAX encodes "no process-wide threshold".
static THRESHOLD_US: AtomicU64 = AtomicU64::new(u64::MAX);

/// Apply the process-wide performance settings from a
/// [`crate::TracingConfig`].
pub fn configure(enabled: bool, threshold_us: Option<u64>) {
    ENABLED.store(enabled, Ordering::Relaxed);
    THRESHOLD_US.store(threshold_us.unwrap_or(u64::MAX), Ordering::Relaxed);
}

/// Whether performance spans currently log on drop.
pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

fn global_threshold() -> Option<u64> {
    match THRESHOLD_US.load(Ordering::Relaxed) {
        u64::MAX => None,
        t => Some(t),
    }
}

/// RAII guard that measures its own lifetime and logs the duration on drop.
///
/// The span is skipped when performance tracing is disabled or when the
/// elapsed time is below the effective threshold (the larger of the
/// per-span and the process-wide threshold).
pub struct PerformanceSpan {
    name: String,
    threshold_us: Option<u64>,
    start_time: Instant,
    span: tracing::Span,
    fields: Option<tracing::span::EnteredSpan>,
}

impl PerformanceSpan {
    pub fn new(name: impl Into<String>, threshold_us: Option<u64>) -> Self {
        let name = name.into();
        let span = tracing::debug_span!("perf", name = %name);
        Self {
            name,
            threshold_us,
            start_time: Instant::now(),
            span,
            fields: None,
        }
    }

    /// Like [`PerformanceSpan::new`], but `fields` stays entered until the
    /// guard drops, so events emitted during the timed work carry its fields.
    pub fn with_fields(name: impl Into<String>, threshold_us: Option<u64>, fields: tracing::Span) -> Self {
        let mut span = Self::new(name, threshold_us);
        span.fields = Some(fields.entered());
        span
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Elapsed time since the span was created.
    pub fn elapsed_us(&self) -> u64 {
        self.start_time.elapsed().as_micros() as u64
    }

    /// Enter this span's context.
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }

    fn effective_threshold(&self) -> Option<u64> {
        match (self.threshold_us, global_threshold()) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }
}

impl Drop for PerformanceSpan {
    fn drop(&mut self) {
        if !is_enabled() {
            return;
        }
        let elapsed_us = self.elapsed_us();
        if self.effective_threshold().is_none_or(|t| elapsed_us >= t) {
            let _entered = self.span.enter();
            tracing::debug!(
                duration_us = elapsed_us,
                duration_ms = elapsed_us as f64 / 1000.0,
                "performance_span_complete"
            );
        }
    }
}

/// Record a container allocation.
pub fn record_allocation(size_bytes: usize, ownership: &str, alignment: usize) {
    tracing::debug!(
        event = "allocation",
        size_bytes = size_bytes,
        ownership = ownership,
        alignment = alignment,
        "container_allocation"
    );
}

/// Record the outcome of one overload resolution.
pub fn record_resolution(kernel: &str, candidates: usize, matched: usize, duration_us: u64) {
    tracing::debug!(
        event = "resolution",
        kernel = kernel,
        candidates = candidates,
        matched = matched,
        duration_us = duration_us,
        "overload_resolution"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn span_keeps_name_and_threshold() {
        let span = PerformanceSpan::new("resolve", Some(1000));
        assert_eq!(span.name(), "resolve");
        assert_eq!(span.threshold_us, Some(1000));
    }

    #[test]
    fn span_measures_elapsed_time() {
        let span = PerformanceSpan::new("sleep", None);
        thread::sleep(Duration::from_millis(5));
        assert!(span.elapsed_us() >= 5_000);
    }

    #[test]
    fn record_helpers_do_not_panic() {
        record_allocation(32, "owned", 16);
        record_resolution("mixed_inout_CF", 2, 1, 3);
    }
}
