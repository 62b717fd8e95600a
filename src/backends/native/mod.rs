//! The built-in CPU backend.
//!
//! Always available, single process and single target. It handles every
//! transform family the front-end describes (complex, real-to-complex and
//! complex-to-real DFTs, the Hartley transform and all eight DCT/DST types)
//! in `f32` and `f64`, interleaved or planar, with arbitrary strides and in
//! place. Other backends are usually faster; the cost estimate says so, which
//! makes [`crate::SelectStrategy::Best`] prefer them when they are enabled.
//!
//! With the `parallel` feature, [`NativeModule::init`] starts a rayon pool
//! sized by [`crate::init::CpuInitParameters`]. Plans built afterwards run
//! large contiguous axes on it.

pub mod exec;
pub mod fft;
pub mod trig;

#[cfg(feature = "parallel")]
use std::sync::{Arc, Mutex, PoisonError};

use crate::architecture::cpu;
use crate::backend::Backend;
use crate::common::{Distribution, Target};
#[cfg(feature = "parallel")]
use crate::config::TargetConfig;
use crate::desc::Desc;
use crate::error::{Error, Result};
use crate::init::InitParameters;
use crate::plan::{BufferPtr, PlanImpl};
use crate::registry::BackendModule;
use crate::types::Precision;

use exec::{Exec, Pool};

/// Registry entry of the native backend.
#[derive(Default)]
pub struct NativeModule {
    #[cfg(feature = "parallel")]
    pool: Mutex<Option<Arc<Pool>>>,
}

impl core::fmt::Debug for NativeModule {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NativeModule").finish_non_exhaustive()
    }
}

impl BackendModule for NativeModule {
    fn backend(&self) -> Backend {
        Backend::Native
    }

    fn init(&self, params: &InitParameters) -> Result<()> {
        #[cfg(feature = "parallel")]
        {
            let threads = params.cpu.effective_thread_limit();
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("omnifft-native-{i}"))
                .build()
                .map_err(|e| Error::backend(Backend::Native, e.to_string()))?;
            debug_log!("native: started a pool of {threads} threads");
            *self.pool.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(pool));
        }
        #[cfg(not(feature = "parallel"))]
        let _ = params;
        Ok(())
    }

    fn finalize(&self) {
        #[cfg(feature = "parallel")]
        self.pool.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    fn make_plan_impl(&self, desc: &Desc) -> Result<Box<dyn PlanImpl>> {
        let plan = NativePlan::new(desc)?;
        #[cfg(feature = "parallel")]
        let plan = {
            let mut plan = plan;
            let threads = match desc.target_config() {
                TargetConfig::Cpu(c) => c.thread_limit,
                TargetConfig::Gpu(_) => 1,
            };
            if threads > 1 {
                plan.pool = self.pool.lock().unwrap_or_else(PoisonError::into_inner).clone();
            }
            plan
        };
        Ok(Box::new(plan))
    }
}

#[derive(Debug)]
enum Typed {
    F32(Exec<f32>),
    F64(Exec<f64>),
}

/// A native plan for one descriptor.
#[derive(Debug)]
pub struct NativePlan {
    exec: Typed,
    #[cfg(feature = "parallel")]
    pool: Option<Arc<Pool>>,
}

impl NativePlan {
    pub fn new(desc: &Desc) -> Result<Self> {
        if desc.target() != Target::Cpu || desc.distribution() != Distribution::Spst {
            return Err(Error::backend(
                Backend::Native,
                "only single-process CPU transforms are supported",
            ));
        }
        let precision = desc.precision();
        if !precision.is_uniform() {
            return Err(Error::backend(Backend::Native, "mixed precisions are not supported"));
        }
        let exec = match precision.execution {
            Precision::F32 => Typed::F32(Exec::new(desc)?),
            Precision::F64 => Typed::F64(Exec::new(desc)?),
            other => {
                return Err(Error::backend(
                    Backend::Native,
                    format!("unsupported precision {other:?}"),
                ))
            }
        };
        Ok(Self {
            exec,
            #[cfg(feature = "parallel")]
            pool: None,
        })
    }

    fn pool(&self) -> Option<&Pool> {
        #[cfg(feature = "parallel")]
        {
            self.pool.as_deref()
        }
        #[cfg(not(feature = "parallel"))]
        {
            None
        }
    }
}

impl PlanImpl for NativePlan {
    fn backend(&self) -> Backend {
        Backend::Native
    }

    fn cost_estimate(&self) -> Option<f64> {
        Some(match &self.exec {
            Typed::F32(e) => e.cost(),
            Typed::F64(e) => e.cost(),
        })
    }

    fn execute_cpu_spst(
        &mut self,
        desc: &Desc,
        src: &[BufferPtr],
        dst: &[BufferPtr],
        _params: &cpu::ExecutionParameters,
    ) -> Result<()> {
        let (Some(&src), Some(&dst)) = (src.first(), dst.first()) else {
            return Err(Error::backend(Backend::Native, "missing buffer"));
        };
        // SAFETY: the plan checked counts, nulls, element types and, for
        // borrowed buffers, lengths against the descriptor.
        unsafe {
            match &self.exec {
                Typed::F32(e) => e.run(desc, src, dst, self.pool()),
                Typed::F64(e) => e.run(desc, src, dst, self.pool()),
            }
        }
    }
}
