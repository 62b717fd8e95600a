//! Runtime capability registry and the plan factory.
//!
//! Which backends exist in this build is a property of the registry, not of
//! the descriptor: a backend is *enabled* when a [`BackendModule`] is
//! registered for it, and *capable* when the (target, distribution) pair of
//! the descriptor lists it. Selection checks both, in that order, then lets
//! the module itself accept or decline the descriptor.

use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use hashbrown::HashMap;

use crate::backend::{
    candidate_order, default_order, supported_mask, Backend, BackendMask, BackendParameters,
    Feedback, SelectStrategy,
};
use crate::desc::Desc;
use crate::error::{Error, Result};
use crate::gpu::GpuRuntime;
use crate::init::InitParameters;
use crate::mp::MultiProcessRuntime;
use crate::plan::{Plan, PlanImpl};

/// One backend library as seen by the factory and by init/finalize.
pub trait BackendModule: Send + Sync {
    fn backend(&self) -> Backend;

    /// Called by [`crate::init`] once per lifecycle.
    fn init(&self, params: &InitParameters) -> Result<()> {
        let _ = params;
        Ok(())
    }

    /// Called by [`crate::finalize`] once per successful init.
    fn finalize(&self) {}

    /// Build the backend half of a plan, or decline the descriptor.
    fn make_plan_impl(&self, desc: &Desc) -> Result<Box<dyn PlanImpl>>;
}

/// Registered backends plus the optional GPU and multi-process runtimes.
#[derive(Clone, Default)]
pub struct Registry {
    modules: HashMap<Backend, Arc<dyn BackendModule>>,
    gpu: Option<Arc<dyn GpuRuntime>>,
    mp: Option<Arc<dyn MultiProcessRuntime>>,
}

impl core::fmt::Debug for Registry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Registry")
            .field("enabled", &self.enabled().iter().collect::<Vec<_>>())
            .field("gpu", &self.gpu.as_ref().map(|rt| rt.name()))
            .field("mp", &self.mp.as_ref().map(|rt| rt.name()))
            .finish()
    }
}

impl Registry {
    /// A registry with nothing registered.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The backends compiled into this build.
    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(crate::backends::native::NativeModule::default());
        #[cfg(feature = "rustfft")]
        registry.register(crate::backends::rustfft::RustFftModule::default());
        registry
    }

    /// Register `module`, replacing any module of the same backend.
    pub fn register(&mut self, module: impl BackendModule + 'static) -> &mut Self {
        self.register_shared(Arc::new(module))
    }

    pub fn register_shared(&mut self, module: Arc<dyn BackendModule>) -> &mut Self {
        self.modules.insert(module.backend(), module);
        self
    }

    pub fn unregister(&mut self, backend: Backend) -> Option<Arc<dyn BackendModule>> {
        self.modules.remove(&backend)
    }

    pub fn set_gpu_runtime(&mut self, runtime: Arc<dyn GpuRuntime>) -> &mut Self {
        self.gpu = Some(runtime);
        self
    }

    pub fn set_multi_process_runtime(&mut self, runtime: Arc<dyn MultiProcessRuntime>) -> &mut Self {
        self.mp = Some(runtime);
        self
    }

    pub fn gpu_runtime(&self) -> Option<&dyn GpuRuntime> {
        self.gpu.as_deref()
    }

    /// Shared handle to the GPU runtime, for owners such as [`crate::UnifiedBuffer`].
    pub fn gpu_runtime_shared(&self) -> Option<Arc<dyn GpuRuntime>> {
        self.gpu.clone()
    }

    pub fn multi_process_runtime(&self) -> Option<&dyn MultiProcessRuntime> {
        self.mp.as_deref()
    }

    /// Backends with a registered module.
    pub fn enabled(&self) -> BackendMask {
        self.modules.keys().copied().collect()
    }

    pub fn module(&self, backend: Backend) -> Option<&Arc<dyn BackendModule>> {
        self.modules.get(&backend)
    }

    /// Registered modules in identifier order.
    pub fn modules(&self) -> impl Iterator<Item = &Arc<dyn BackendModule>> + '_ {
        self.enabled()
            .iter()
            .filter_map(move |backend| self.modules.get(&backend))
    }

    /// Build a plan for `desc` with the first (or cheapest) backend that accepts it.
    pub fn make_plan(&self, desc: Desc, params: &BackendParameters) -> Result<Plan> {
        self.make_plan_with_feedback(desc, params).0
    }

    /// Like [`Registry::make_plan`], also returning why each skipped candidate
    /// was not used.
    pub fn make_plan_with_feedback(
        &self,
        desc: Desc,
        params: &BackendParameters,
    ) -> (Result<Plan>, Vec<Feedback>) {
        let target = desc.target();
        let distribution = desc.distribution();
        let capable = supported_mask(target, distribution);
        let order = if params.order.is_empty() {
            default_order(target, distribution)
        } else {
            &params.order[..]
        };

        let mut feedback = Vec::new();
        let mut viable: Vec<Box<dyn PlanImpl>> = Vec::new();
        for backend in candidate_order(params.mask, order) {
            if !capable.contains(backend) {
                feedback.push(Feedback::new(backend, "backend not supported for target and distribution"));
                continue;
            }
            let Some(module) = self.modules.get(&backend) else {
                feedback.push(Feedback::new(backend, "backend is disabled"));
                continue;
            };
            debug_log!("trying {backend} for {target} {distribution}");
            match module.make_plan_impl(&desc) {
                Ok(imp) => {
                    viable.push(imp);
                    if params.strategy == SelectStrategy::First {
                        break;
                    }
                }
                Err(err) => {
                    debug_log!("{backend} declined: {err}");
                    feedback.push(Feedback::new(backend, err.to_string()));
                }
            }
        }

        let Some(index) = pick(&viable) else {
            return (Err(Error::NoSupportedBackend(feedback.clone())), feedback);
        };
        let imp = viable.swap_remove(index);
        debug_log!("selected {} backend", imp.backend());
        (Ok(Plan::new(desc, imp)), feedback)
    }
}

/// Index of the cheapest estimate, or the first candidate when none estimates.
fn pick(viable: &[Box<dyn PlanImpl>]) -> Option<usize> {
    if viable.is_empty() {
        return None;
    }
    let cheapest = viable
        .iter()
        .enumerate()
        .filter_map(|(i, imp)| imp.cost_estimate().map(|cost| (i, cost)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i);
    Some(cheapest.unwrap_or(0))
}

static GLOBAL: OnceLock<RwLock<Arc<Registry>>> = OnceLock::new();

fn global_cell() -> &'static RwLock<Arc<Registry>> {
    GLOBAL.get_or_init(|| RwLock::new(Arc::new(Registry::with_builtin())))
}

/// The process-wide registry, holding the built-in backends unless replaced.
pub fn global() -> Arc<Registry> {
    global_cell()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Replace the process-wide registry and return the previous one.
///
/// Plans already built keep their backend; call this before [`crate::init`]
/// so the new modules take part in the lifecycle.
pub fn set_global(registry: Registry) -> Arc<Registry> {
    let mut slot = global_cell().write().unwrap_or_else(PoisonError::into_inner);
    core::mem::replace(&mut *slot, Arc::new(registry))
}

/// Build a plan with the global registry.
pub fn make_plan(desc: Desc, params: &BackendParameters) -> Result<Plan> {
    global().make_plan(desc, params)
}

pub fn make_plan_with_feedback(desc: Desc, params: &BackendParameters) -> (Result<Plan>, Vec<Feedback>) {
    global().make_plan_with_feedback(desc, params)
}
