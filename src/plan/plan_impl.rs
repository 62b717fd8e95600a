//! The contract every backend implements.

use crate::architecture::{cpu, gpu, mpst, spmt};
use crate::backend::Backend;
use crate::common::{Distribution, Target};
use crate::desc::Desc;
use crate::error::{Error, Result};

use super::BufferPtr;

/// Backend half of a [`super::Plan`].
///
/// A plan implementation is built from one [`Desc`] and executes only that
/// transform. The plan runs every argument check before calling a hook, so a
/// hook receives exactly `desc.target_count()` non-null buffers per side,
/// laid out as the descriptor says. Hooks a backend never supports keep the
/// default body, which reports [`Error::NotImplemented`].
pub trait PlanImpl: Send {
    fn backend(&self) -> Backend;

    /// Bytes of workspace per target; empty when none is needed.
    fn workspace_size(&self) -> &[usize] {
        &[]
    }

    /// Relative cost used by [`crate::SelectStrategy::Best`]; lower is cheaper.
    fn cost_estimate(&self) -> Option<f64> {
        None
    }

    fn execute_cpu_spst(
        &mut self,
        desc: &Desc,
        src: &[BufferPtr],
        dst: &[BufferPtr],
        params: &cpu::ExecutionParameters,
    ) -> Result<()> {
        let _ = (desc, src, dst, params);
        Err(Error::not_implemented(self.backend(), Target::Cpu, Distribution::Spst))
    }

    fn execute_gpu_spst(
        &mut self,
        desc: &Desc,
        src: &[BufferPtr],
        dst: &[BufferPtr],
        params: &gpu::ExecutionParameters,
    ) -> Result<()> {
        let _ = (desc, src, dst, params);
        Err(Error::not_implemented(self.backend(), Target::Gpu, Distribution::Spst))
    }

    fn execute_gpu_spmt(
        &mut self,
        desc: &Desc,
        src: &[BufferPtr],
        dst: &[BufferPtr],
        params: &spmt::gpu::ExecutionParameters,
    ) -> Result<()> {
        let _ = (desc, src, dst, params);
        Err(Error::not_implemented(self.backend(), Target::Gpu, Distribution::Spmt))
    }

    fn execute_cpu_mpst(
        &mut self,
        desc: &Desc,
        src: &[BufferPtr],
        dst: &[BufferPtr],
        params: &mpst::cpu::ExecutionParameters,
    ) -> Result<()> {
        let _ = (desc, src, dst, params);
        Err(Error::not_implemented(self.backend(), Target::Cpu, Distribution::Mpst))
    }

    fn execute_gpu_mpst(
        &mut self,
        desc: &Desc,
        src: &[BufferPtr],
        dst: &[BufferPtr],
        params: &mpst::gpu::ExecutionParameters,
    ) -> Result<()> {
        let _ = (desc, src, dst, params);
        Err(Error::not_implemented(self.backend(), Target::Gpu, Distribution::Mpst))
    }
}
