//! One-time installation of the interceptor
//!
//! Hosts may trigger plugin loading any number of times. The guard makes sure
//! the interceptor wraps a given submit target exactly once, even when two
//! threads race to install it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::submit::{JobHandle, SubmissionError, SubmissionRequest, Submitter};

/// Atomic test-and-set marker. `const` so a host can keep one in a `static`.
#[derive(Debug, Default)]
pub struct PatchGuard {
    installed: AtomicBool,
}

impl PatchGuard {
    pub const fn new() -> Self {
        Self {
            installed: AtomicBool::new(false),
        }
    }

    /// Run `f` if no caller has claimed the guard yet.
    /// Returns whether `f` ran to completion.
    ///
    /// If `f` panics the claim is released, so a later call can try again.
    pub fn run_once(&self, f: impl FnOnce()) -> bool {
        if self
            .installed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        let release = ReleaseOnUnwind(&self.installed);
        f();
        std::mem::forget(release);
        true
    }

    pub fn is_installed(&self) -> bool {
        self.installed.load(Ordering::Acquire)
    }
}

/// Clears the claim unless forgotten after a successful run
struct ReleaseOnUnwind<'a>(&'a AtomicBool);

impl Drop for ReleaseOnUnwind<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A host's submit entry point.
///
/// Holds the current submitter layer; callers submit through the hook and
/// never see whether an interceptor is installed.
pub struct SubmitHook {
    current: RwLock<Arc<dyn Submitter>>,
    guard: PatchGuard,
}

impl SubmitHook {
    pub fn new(base: Arc<dyn Submitter>) -> Self {
        Self {
            current: RwLock::new(base),
            guard: PatchGuard::new(),
        }
    }

    /// Wrap the current submitter with `factory(current)`, at most once per hook.
    ///
    /// Later calls are no-ops and do not invoke `factory`. Returns whether
    /// this call installed the layer. A panicking `factory` leaves the hook
    /// unwrapped and uninstalled.
    pub fn install_once<F>(&self, factory: F) -> bool
    where
        F: FnOnce(Arc<dyn Submitter>) -> Arc<dyn Submitter>,
    {
        self.guard.run_once(|| {
            let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
            let base = Arc::clone(&current);
            *current = factory(base);
            tracing::info!("Patching submit hook to optimize job configs via Rabbit API");
        })
    }

    pub fn is_installed(&self) -> bool {
        self.guard.is_installed()
    }

    /// The submitter currently serving calls
    pub fn current(&self) -> Arc<dyn Submitter> {
        Arc::clone(&self.current.read().unwrap_or_else(|e| e.into_inner()))
    }
}

impl Submitter for SubmitHook {
    fn submit(&self, request: SubmissionRequest) -> Result<JobHandle, SubmissionError> {
        // Release the lock before submitting; submits block on the network.
        let current = self.current();
        current.submit(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockSubmitter;
    use crate::submit::FnSubmitter;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    /// Layer that counts how many times it is entered
    struct Counting {
        inner: Arc<dyn Submitter>,
        hits: Arc<AtomicUsize>,
    }

    impl Submitter for Counting {
        fn submit(&self, request: SubmissionRequest) -> Result<JobHandle, SubmissionError> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            self.inner.submit(request)
        }
    }

    #[test]
    fn test_guard_runs_once() {
        static GUARD: PatchGuard = PatchGuard::new();
        let mut runs = 0;
        assert!(GUARD.run_once(|| runs += 1));
        assert!(!GUARD.run_once(|| runs += 1));
        assert_eq!(runs, 1);
        assert!(GUARD.is_installed());
    }

    #[test]
    fn test_install_twice_wraps_once() {
        let base = Arc::new(MockSubmitter::new());
        let hook = SubmitHook::new(base.clone());
        let hits = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let hits = hits.clone();
            hook.install_once(move |inner| Arc::new(Counting { inner, hits }) as Arc<dyn Submitter>);
        }

        hook.submit(SubmissionRequest::new(json!({}))).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(base.call_count(), 1);
    }

    #[test]
    fn test_second_factory_not_invoked() {
        let hook = SubmitHook::new(Arc::new(MockSubmitter::new()));
        assert!(hook.install_once(|inner| inner));

        let mut invoked = false;
        assert!(!hook.install_once(|inner| {
            invoked = true;
            inner
        }));
        assert!(!invoked);
    }

    #[test]
    fn test_concurrent_install_wraps_once() {
        let base = Arc::new(MockSubmitter::new());
        let hook = Arc::new(SubmitHook::new(base.clone()));
        let hits = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let hook = hook.clone();
                let hits = hits.clone();
                thread::spawn(move || hook.install_once(move |inner| Arc::new(Counting { inner, hits }) as Arc<dyn Submitter>))
            })
            .collect();

        let installed = handles
            .into_iter()
            .map(|h| h.join().expect("Thread panicked"))
            .filter(|installed| *installed)
            .count();
        assert_eq!(installed, 1);

        hook.submit(SubmissionRequest::new(json!({}))).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(base.call_count(), 1);
    }

    #[test]
    fn test_panicking_factory_can_be_retried() {
        let base = Arc::new(MockSubmitter::new());
        let hook = SubmitHook::new(base.clone());

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            hook.install_once(|_| panic!("optimizer settings unavailable"))
        }));
        assert!(result.is_err());
        assert!(!hook.is_installed());

        hook.submit(SubmissionRequest::new(json!({}))).unwrap();
        assert_eq!(base.call_count(), 1);

        let hits = Arc::new(AtomicUsize::new(0));
        let layer_hits = hits.clone();
        assert!(hook.install_once(move |inner| {
            Arc::new(Counting { inner, hits: layer_hits }) as Arc<dyn Submitter>
        }));
        assert!(hook.is_installed());

        hook.submit(SubmissionRequest::new(json!({}))).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(base.call_count(), 2);
    }

    #[test]
    fn test_uninstalled_hook_delegates() {
        let hook = SubmitHook::new(Arc::new(FnSubmitter(|_req: SubmissionRequest| {
            Ok(JobHandle::new("direct"))
        })));
        assert!(!hook.is_installed());
        assert_eq!(hook.submit(SubmissionRequest::new(json!({}))).unwrap().job_id, "direct");
    }
}
