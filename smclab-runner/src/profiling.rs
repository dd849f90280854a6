//! Timing scopes for pipeline stages.
//!
//! ```
//! use smclab_runner::profiling::ProfileScope;
//!
//! let _scope = ProfileScope::new("structure");
//! // stage work; timing is reported on drop
//! ```
//!
//! Set `SMCLAB_PROFILE=1` and call [`init`] to report each scope through
//! `tracing::debug!` on the `profile` target.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

static PROFILING_ENABLED: AtomicBool = AtomicBool::new(false);

static TOTAL_SCOPES: AtomicU64 = AtomicU64::new(0);

/// Read `SMCLAB_PROFILE` once at startup.
pub fn init() {
    let enabled = std::env::var("SMCLAB_PROFILE")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    set_enabled(enabled);
}

pub fn set_enabled(enabled: bool) {
    PROFILING_ENABLED.store(enabled, Ordering::Relaxed);
}

#[inline]
pub fn is_enabled() -> bool {
    PROFILING_ENABLED.load(Ordering::Relaxed)
}

/// Drop guard that reports its lifetime.
pub struct ProfileScope {
    stage: &'static str,
    symbol: Option<String>,
    start: Instant,
}

impl ProfileScope {
    #[inline]
    pub fn new(stage: &'static str) -> Self {
        TOTAL_SCOPES.fetch_add(1, Ordering::Relaxed);
        Self {
            stage,
            symbol: None,
            start: Instant::now(),
        }
    }

    /// Scope tagged with the symbol being processed.
    pub fn for_symbol(stage: &'static str, symbol: &str) -> Self {
        let mut scope = Self::new(stage);
        if is_enabled() {
            scope.symbol = Some(symbol.to_string());
        }
        scope
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for ProfileScope {
    fn drop(&mut self) {
        if is_enabled() {
            let ms = self.start.elapsed().as_secs_f64() * 1000.0;
            match &self.symbol {
                Some(symbol) => debug!(target: "profile", stage = self.stage, symbol = %symbol, ms, "stage finished"),
                None => debug!(target: "profile", stage = self.stage, ms, "stage finished"),
            }
        }
    }
}

/// Run `f` under a scope and return its result with the elapsed time.
pub fn profile<F, R>(stage: &'static str, f: F) -> (R, Duration)
where
    F: FnOnce() -> R,
{
    let scope = ProfileScope::new(stage);
    let result = f();
    (result, scope.elapsed())
}

pub fn total_scopes() -> u64 {
    TOTAL_SCOPES.load(Ordering::Relaxed)
}
