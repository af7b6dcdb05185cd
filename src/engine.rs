//! The top-level `ValidationEngine`: wires the sandbox, variable store,
//! rule dispatcher, traversal engine and result collector together into one
//! `validate` call, and exposes cooperative cancellation.

use crate::collector::Collector;
use crate::dispatcher::Dispatcher;
use crate::object::ValidationObject;
use crate::policy::EnginePolicy;
use crate::profile::Profile;
use crate::report::{JobEndStatus, ValidationReport};
use crate::sandbox::Sandbox;
use crate::traversal;
use crate::variables::VariableStore;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use validator_errors::ValidationResult;

/// Run-shaping knobs passed explicitly by the embedder at construction time,
/// distinct from the process-wide `EnginePolicy`.
#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    /// Per-rule display cap on FAILED assertions; `-1` means unlimited.
    pub max_displayed_failed_checks: i64,
    /// Whether PASSED assertions are appended to the report at all.
    pub log_passed_checks: bool,
    /// Whether error arguments are evaluated and templates rendered.
    pub show_error_messages: bool,
    /// Whether `progress_string` reports anything beyond "not started".
    pub show_progress: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            max_displayed_failed_checks: crate::collector::DEFAULT_MAX_DISPLAYED_FAILED_CHECKS,
            log_passed_checks: false,
            show_error_messages: false,
            show_progress: false,
        }
    }
}

/// Identity metadata returned by `ValidationEngine::details`.
#[derive(Debug, Clone)]
pub struct ComponentDetails {
    pub crate_name: &'static str,
    pub crate_version: &'static str,
    pub component_id: String,
}

/// A cloneable, `Send + Sync` handle that lets another thread request
/// cancellation while `validate` runs on the engine's own thread.
/// Obtained from `ValidationEngine::cancel_handle`; `ValidationEngine::cancel`
/// is a convenience that goes through the same handle.
#[derive(Clone)]
pub struct CancelHandle {
    abort_flag: Arc<AtomicBool>,
    end_status: Arc<Mutex<JobEndStatus>>,
}

impl CancelHandle {
    /// Request cancellation. Safe to call from any thread holding a clone.
    pub fn cancel(&self, end_status: JobEndStatus) {
        *self.end_status.lock().expect("cancel end-status lock") = end_status;
        self.abort_flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.abort_flag.load(Ordering::SeqCst)
    }
}

/// Shared, thread-safe run counters backing `ValidationEngine::progress_string`:
/// processed, pending, checks and failed-checks. Pushes and pops are updated
/// live by the traversal engine, and check/failed-check totals are updated
/// live by the result collector as each assertion is reported; all four are
/// readable from any thread via atomics mid-run.
pub(crate) struct ProgressCounters {
    processed: AtomicU64,
    pending: AtomicU64,
    checks: AtomicU64,
    failed: AtomicU64,
}

impl ProgressCounters {
    pub(crate) fn new() -> Self {
        ProgressCounters {
            processed: AtomicU64::new(0),
            pending: AtomicU64::new(0),
            checks: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    fn reset(&self) {
        self.processed.store(0, Ordering::SeqCst);
        self.pending.store(0, Ordering::SeqCst);
        self.checks.store(0, Ordering::SeqCst);
        self.failed.store(0, Ordering::SeqCst);
    }

    /// Record that an object was pushed onto the traversal stack.
    pub(crate) fn record_push(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
    }

    /// Record that an object was popped off the traversal stack and dispatched.
    pub(crate) fn record_pop(&self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
        self.processed.fetch_add(1, Ordering::SeqCst);
    }

    /// Record one collector-reported check outcome.
    pub(crate) fn record_check(&self, failed: bool) {
        self.checks.fetch_add(1, Ordering::SeqCst);
        if failed {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub(crate) fn processed(&self) -> u64 {
        self.processed.load(Ordering::SeqCst)
    }

    pub(crate) fn pending(&self) -> u64 {
        self.pending.load(Ordering::SeqCst)
    }

    pub(crate) fn checks(&self) -> u64 {
        self.checks.load(Ordering::SeqCst)
    }

    pub(crate) fn failed(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }
}

/// Orchestrates one or more `validate` calls against a shared, immutable
/// `Profile`. Not `Sync` with itself across concurrent `validate` calls (the
/// sandbox scope it owns during a run is exclusive to that run); separate
/// `ValidationEngine` instances may run concurrently.
pub struct ValidationEngine {
    profile: Arc<Profile>,
    options: EngineOptions,
    sandbox: Sandbox,
    cancel_handle: CancelHandle,
    progress: Arc<ProgressCounters>,
}

impl ValidationEngine {
    pub fn new(profile: Arc<Profile>, options: EngineOptions) -> Self {
        ValidationEngine {
            profile,
            options,
            sandbox: Sandbox::new(),
            cancel_handle: CancelHandle {
                abort_flag: Arc::new(AtomicBool::new(false)),
                end_status: Arc::new(Mutex::new(JobEndStatus::Normal)),
            },
            progress: Arc::new(ProgressCounters::new()),
        }
    }

    /// Run a full validation starting at `root`. May return before the
    /// traversal naturally completes if `cancel` was called first or in the
    /// middle of the run.
    pub fn validate(&mut self, root: Box<dyn ValidationObject>) -> ValidationResult<ValidationReport> {
        let root_type = root.object_type().to_string();
        let policy = EnginePolicy::snapshot();
        self.progress.reset();

        let mut scope = self.sandbox.initialise();
        let variables = VariableStore::new(&self.profile, &self.sandbox);
        variables.seed_defaults(&mut scope)?;

        let mut dispatcher = Dispatcher::new(&self.profile, &self.sandbox);
        let mut collector = Collector::new(
            &self.sandbox,
            &self.options,
            self.cancel_handle.abort_flag.clone(),
            root_type,
        )
        .with_progress(&self.progress);

        let already_cancelled = self.cancel_handle.abort_flag.load(Ordering::SeqCst);
        let traversal_result = if already_cancelled {
            Ok(())
        } else {
            traversal::traverse(
                root,
                &mut scope,
                &variables,
                &mut dispatcher,
                &mut collector,
                &self.cancel_handle.abort_flag,
                &self.progress,
                policy.on_sandbox_fault,
            )
        };

        self.sandbox.exit_scope(scope);

        let job_end_status = if already_cancelled || self.cancel_handle.abort_flag.load(Ordering::SeqCst) {
            let status = self
                .cancel_handle
                .end_status
                .lock()
                .expect("cancel end-status lock")
                .clone();
            if let JobEndStatus::Cancelled(reason) = &status {
                crate::logging::record_cancelled(reason);
            }
            status
        } else {
            JobEndStatus::Normal
        };

        match traversal_result {
            Ok(()) => {
                let (assertions, failed_counts, is_compliant, total_tests) = collector.into_parts();
                Ok(ValidationReport {
                    is_compliant,
                    assertions,
                    failed_counts,
                    total_tests,
                    job_end_status,
                })
            }
            Err(err) => {
                crate::logging::log_validation_error("traversal", &err);
                Err(err)
            }
        }
    }

    /// Request cancellation. Safe to call from any thread.
    pub fn cancel(&self, end_status: JobEndStatus) {
        self.cancel_handle.cancel(end_status);
    }

    /// A cloneable handle that can be sent to another thread to call
    /// `cancel` while `validate` runs here.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel_handle.clone()
    }

    /// A human-readable snapshot of where the current (or last) run stands:
    /// processed, pending, checks and failed-checks.
    pub fn progress_string(&self) -> String {
        if !self.options.show_progress {
            return "progress reporting disabled".to_string();
        }
        format!(
            "processed={} pending={} checks={} failed_checks={} cancelled={}",
            self.progress.processed(),
            self.progress.pending(),
            self.progress.checks(),
            self.progress.failed(),
            self.cancel_handle.abort_flag.load(Ordering::SeqCst)
        )
    }

    pub fn profile(&self) -> &Arc<Profile> {
        &self.profile
    }

    pub fn details(&self) -> ComponentDetails {
        ComponentDetails {
            crate_name: env!("CARGO_PKG_NAME"),
            crate_version: env!("CARGO_PKG_VERSION"),
            component_id: "validation-engine".to_string(),
        }
    }

    /// Release long-lived resources. The sandbox scope is dropped per-`validate`
    /// call already; this exists for symmetry with embedders that hold onto an
    /// engine across many validations and want an explicit teardown point.
    pub fn close(self) {}
}
