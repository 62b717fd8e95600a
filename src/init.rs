//! Process-wide library initialization.
//!
//! `init` prepares every registered backend once; `finalize` releases them
//! once. Both are idempotent and serialized by a mutex, so racing callers see
//! exactly one transition each way. [`InitGuard`] ties a lifecycle to a scope.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::backend::{supported_mask, Backend};
use crate::common::{Distribution, Target};
use crate::config::clamp_thread_limit;
use crate::error::{Error, Result};
use crate::gpu::GpuRuntime;
use crate::registry::{self, BackendModule, Registry};
use crate::validate::RawEnum;

/// CPU backend initialization.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CpuInitParameters {
    /// Worker threads for backend thread pools; `0` reads `OMNIFFT_THREADS`
    /// and falls back to every hardware thread.
    pub thread_limit: usize,
}

impl CpuInitParameters {
    /// The thread limit with `0` resolved.
    pub fn effective_thread_limit(&self) -> usize {
        if self.thread_limit == 0 {
            clamp_thread_limit(env_thread_limit())
        } else {
            clamp_thread_limit(self.thread_limit)
        }
    }
}

/// GPU backend initialization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GpuInitParameters {
    /// Allow backends to trade accuracy for speed where the library offers it.
    pub fast_math: bool,
}

impl Default for GpuInitParameters {
    fn default() -> Self {
        Self { fast_math: true }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InitParameters {
    pub cpu: CpuInitParameters,
    pub gpu: GpuInitParameters,
}

static THREADS: OnceLock<usize> = OnceLock::new();

fn env_thread_limit() -> usize {
    *THREADS.get_or_init(|| {
        std::env::var("OMNIFFT_THREADS")
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    })
}

fn runs_on(backend: Backend, target: Target) -> bool {
    Distribution::VARIANTS
        .iter()
        .any(|&d| supported_mask(target, d).contains(backend))
}

/// What a successful init set up, released in reverse by finalize.
struct Active {
    modules: Vec<Arc<dyn BackendModule>>,
    gpu: Option<Arc<dyn GpuRuntime>>,
}

impl Active {
    fn release(self) {
        for module in self.modules.iter().rev() {
            module.finalize();
        }
        if let Some(gpu) = self.gpu {
            gpu.finalize();
        }
    }
}

/// One init/finalize state machine.
///
/// The library uses a single process-wide instance; separate instances
/// drive isolated lifecycles against their own [`Registry`].
#[derive(Default)]
pub struct Lifecycle {
    state: Mutex<Option<Active>>,
}

impl core::fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Lifecycle")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl Lifecycle {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(None),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Initialize the modules of `registry`; a second call is a no-op.
    ///
    /// CPU backends come first, then the GPU runtime and the GPU-only
    /// backends. On failure everything set up so far is released and the
    /// lifecycle stays uninitialized.
    pub fn init(&self, registry: &Registry, params: &InitParameters) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.is_some() {
            return Ok(());
        }

        if let Some(mp) = registry.multi_process_runtime() {
            if !mp.is_initialized() {
                return Err(Error::Runtime(format!(
                    "{} must be initialized before init is called",
                    mp.name()
                )));
            }
        }

        let mut active = Active {
            modules: Vec::new(),
            gpu: None,
        };
        match init_modules(registry, params, &mut active) {
            Ok(()) => {
                debug_log!("initialized {} backends", active.modules.len());
                *state = Some(active);
                Ok(())
            }
            Err(err) => {
                debug_log!("init failed: {err}");
                active.release();
                Err(err)
            }
        }
    }

    /// Release what `init` set up. A no-op when not initialized.
    pub fn finalize(&self) {
        let active = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(active) = active {
            debug_log!("finalizing {} backends", active.modules.len());
            active.release();
        }
    }
}

fn init_modules(registry: &Registry, params: &InitParameters, active: &mut Active) -> Result<()> {
    for module in registry.modules() {
        if runs_on(module.backend(), Target::Cpu) {
            module.init(params)?;
            active.modules.push(module.clone());
        }
    }
    let Some(gpu) = registry.gpu_runtime_shared() else {
        return Ok(());
    };
    Error::check(gpu.init())?;
    active.gpu = Some(gpu);
    for module in registry.modules() {
        let backend = module.backend();
        if runs_on(backend, Target::Gpu) && !runs_on(backend, Target::Cpu) {
            module.init(params)?;
            active.modules.push(module.clone());
        }
    }
    Ok(())
}

static LIFECYCLE: Lifecycle = Lifecycle::new();

/// Initialize the library with the global registry.
pub fn init(params: &InitParameters) -> Result<()> {
    LIFECYCLE.init(&registry::global(), params)
}

/// Finalize the library; safe to call any number of times.
pub fn finalize() {
    LIFECYCLE.finalize();
}

pub fn is_initialized() -> bool {
    LIFECYCLE.is_initialized()
}

/// Finalizes the library when dropped.
#[must_use = "the library is finalized when the guard is dropped"]
#[derive(Debug)]
pub struct InitGuard {
    _private: (),
}

impl Drop for InitGuard {
    fn drop(&mut self) {
        finalize();
    }
}

/// Initialize the library for the lifetime of the returned guard.
pub fn init_scoped(params: &InitParameters) -> Result<InitGuard> {
    init(params)?;
    Ok(InitGuard { _private: () })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desc::Desc;
    use crate::gpu::GpuStatus;
    use crate::mp::MultiProcessRuntime;
    use crate::plan::PlanImpl;
    use core::ffi::c_void;
    use core::ptr::NonNull;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        backend: Option<Backend>,
        inits: AtomicUsize,
        finalizes: AtomicUsize,
        fail: bool,
    }

    impl BackendModule for Counting {
        fn backend(&self) -> Backend {
            self.backend.unwrap_or(Backend::Native)
        }
        fn init(&self, _params: &InitParameters) -> Result<()> {
            self.inits.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(Error::backend(self.backend(), "no threads"))
            } else {
                Ok(())
            }
        }
        fn finalize(&self) {
            self.finalizes.fetch_add(1, Ordering::SeqCst);
        }
        fn make_plan_impl(&self, _desc: &Desc) -> Result<Box<dyn PlanImpl>> {
            Err(Error::backend(self.backend(), "unused"))
        }
    }

    struct Mpi(AtomicBool);

    impl MultiProcessRuntime for Mpi {
        fn name(&self) -> &'static str {
            "MPI"
        }
        fn is_initialized(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    struct FailingGpu;

    impl GpuRuntime for FailingGpu {
        fn name(&self) -> &'static str {
            "test"
        }
        fn init(&self) -> GpuStatus {
            GpuStatus::failure(100, "no device")
        }
        fn current_device(&self) -> core::result::Result<i32, GpuStatus> {
            Ok(0)
        }
        fn is_valid_device(&self, _device: i32) -> bool {
            true
        }
        fn alloc_unified(&self, _size: usize) -> core::result::Result<NonNull<c_void>, GpuStatus> {
            Err(GpuStatus::failure(2, "unsupported"))
        }
        unsafe fn free_unified(&self, _ptr: NonNull<c_void>) -> GpuStatus {
            GpuStatus::success()
        }
    }

    #[test]
    fn multi_process_runtime_must_be_started_first() {
        let mpi = Arc::new(Mpi(AtomicBool::new(false)));
        let mut registry = Registry::empty();
        registry.set_multi_process_runtime(mpi.clone());
        let lifecycle = Lifecycle::new();
        assert_eq!(
            lifecycle.init(&registry, &InitParameters::default()),
            Err(Error::Runtime("MPI must be initialized before init is called".into()))
        );
        assert!(!lifecycle.is_initialized());
        mpi.0.store(true, Ordering::SeqCst);
        assert!(lifecycle.init(&registry, &InitParameters::default()).is_ok());
        assert!(lifecycle.is_initialized());
    }

    #[test]
    fn failed_init_releases_what_it_set_up() {
        let cpu = Arc::new(Counting::default());
        let mut registry = Registry::empty();
        registry.register_shared(cpu.clone());
        registry.set_gpu_runtime(Arc::new(FailingGpu));
        let lifecycle = Lifecycle::new();
        let err = lifecycle.init(&registry, &InitParameters::default()).unwrap_err();
        assert!(matches!(err, Error::Native { code: 100, .. }));
        assert!(!lifecycle.is_initialized());
        assert_eq!(cpu.inits.load(Ordering::SeqCst), 1);
        assert_eq!(cpu.finalizes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failing_backend_leaves_lifecycle_uninitialized() {
        let bad = Arc::new(Counting {
            backend: Some(Backend::Fftw3),
            fail: true,
            ..Default::default()
        });
        let mut registry = Registry::empty();
        registry.register_shared(bad.clone());
        let lifecycle = Lifecycle::new();
        assert!(lifecycle.init(&registry, &InitParameters::default()).is_err());
        assert!(!lifecycle.is_initialized());
        lifecycle.finalize();
        assert_eq!(bad.finalizes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn explicit_thread_limit_is_clamped() {
        let params = CpuInitParameters { thread_limit: 1 };
        assert_eq!(params.effective_thread_limit(), 1);
        let all = CpuInitParameters {
            thread_limit: usize::MAX,
        };
        assert_eq!(all.effective_thread_limit(), crate::config::hardware_concurrency());
    }
}
