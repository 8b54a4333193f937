//! Twin run context for logging
//!
//! A [`TwinContextGuard`] names one scenario run: a twin id, the scenario
//! family and a fresh uuid. The guard also keeps the context in thread-local
//! storage for code further down the stack. Put its ids on the run's span so
//! they reach the formatted output:
//!
//! ```ignore
//! let ctx = TwinContextGuard::for_run("lab", "cascade");
//! let span = tracing::info_span!("chaos_run", twin_id = %ctx.twin_id(), run_id = %ctx.run_id());
//! let _entered = span.enter();
//! ```

use std::cell::RefCell;

use uuid::Uuid;

/// Context data stored in thread-local storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwinContextData {
    /// Identifier of the digital twin
    pub twin_id: String,
    /// Scenario family being run (e.g. "pod_kill"), if any
    pub scenario: Option<String>,
    /// Unique id for this run
    pub run_id: Uuid,
}

thread_local! {
    static TWIN_CONTEXT: RefCell<Option<TwinContextData>> = const { RefCell::new(None) };
}

/// RAII guard for twin context
///
/// Sets the context for the current thread on creation and restores the
/// previous one (if any) on drop.
pub struct TwinContextGuard {
    data: TwinContextData,
    previous: Option<TwinContextData>,
}

impl TwinContextGuard {
    /// Context for a twin with no scenario attached
    pub fn new(twin_id: impl Into<String>) -> Self {
        Self::install(TwinContextData {
            twin_id: twin_id.into(),
            scenario: None,
            run_id: Uuid::new_v4(),
        })
    }

    /// Context for one scenario run against a twin
    pub fn for_run(twin_id: impl Into<String>, scenario: impl Into<String>) -> Self {
        Self::install(TwinContextData {
            twin_id: twin_id.into(),
            scenario: Some(scenario.into()),
            run_id: Uuid::new_v4(),
        })
    }

    fn install(data: TwinContextData) -> Self {
        let previous = TWIN_CONTEXT.with(|ctx| ctx.replace(Some(data.clone())));
        Self { data, previous }
    }

    pub fn twin_id(&self) -> &str {
        &self.data.twin_id
    }

    pub fn run_id(&self) -> Uuid {
        self.data.run_id
    }

    pub fn scenario(&self) -> Option<&str> {
        self.data.scenario.as_deref()
    }

    /// Get the current context (if any)
    pub fn current() -> Option<TwinContextData> {
        TWIN_CONTEXT.with(|ctx| ctx.borrow().clone())
    }

    /// Get the current twin id (if set)
    pub fn current_twin_id() -> Option<String> {
        Self::current().map(|ctx| ctx.twin_id)
    }

    /// Get the current run id (if set)
    pub fn current_run_id() -> Option<Uuid> {
        Self::current().map(|ctx| ctx.run_id)
    }
}

impl Drop for TwinContextGuard {
    fn drop(&mut self) {
        TWIN_CONTEXT.with(|ctx| *ctx.borrow_mut() = self.previous.take());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_twin_context_guard() {
        assert!(TwinContextGuard::current().is_none());

        {
            let _guard = TwinContextGuard::new("lab");
            let ctx = TwinContextGuard::current().unwrap();
            assert_eq!(ctx.twin_id, "lab");
            assert!(ctx.scenario.is_none());
        }

        assert!(TwinContextGuard::current().is_none());
    }

    #[test]
    fn test_nested_runs_restore() {
        let _outer = TwinContextGuard::new("lab");
        let outer_run = TwinContextGuard::current_run_id();

        {
            let inner = TwinContextGuard::for_run("lab", "partition");
            let ctx = TwinContextGuard::current().unwrap();
            assert_eq!(ctx.scenario.as_deref(), Some("partition"));
            assert_eq!(inner.scenario(), Some("partition"));
            assert_eq!(inner.run_id(), ctx.run_id);
            assert_ne!(Some(ctx.run_id), outer_run);
        }

        assert_eq!(TwinContextGuard::current_run_id(), outer_run);
        assert_eq!(TwinContextGuard::current_twin_id(), Some("lab".to_string()));
    }
}
