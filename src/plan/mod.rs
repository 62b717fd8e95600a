//! The polymorphic plan handle and its execution pipeline.
//!
//! Every call to [`Plan::execute`] runs the same checks in a fixed order:
//! buffer count, placement, source preservation, element types, null
//! addresses, buffer lengths, execution parameters. Only then does the plan
//! forward to the [`PlanImpl`] hook of its (target, distribution) pair.

mod buffer;
mod plan_impl;

pub use buffer::{BufferPtr, Destination, Source};
pub use plan_impl::PlanImpl;

use buffer::Buffers;

use crate::architecture::{ArchitectureParameters, ExecutionParameters};
use crate::backend::Backend;
use crate::common::{Distribution, Placement, PrecisionTriad, Target};
use crate::desc::Desc;
use crate::error::{Error, InvalidArgument, Result, Side};
use crate::transform::{Transform, TransformParameters};
use crate::types::TypeProps;

/// A transform bound to one backend.
///
/// Plans are move-only. Executing takes `&mut self`; run one plan per thread
/// or synchronize externally.
pub struct Plan {
    desc: Desc,
    imp: Box<dyn PlanImpl>,
}

impl core::fmt::Debug for Plan {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Plan")
            .field("backend", &self.imp.backend())
            .field("desc", &self.desc)
            .finish()
    }
}

impl Plan {
    pub(crate) fn new(desc: Desc, imp: Box<dyn PlanImpl>) -> Self {
        Self { desc, imp }
    }

    pub fn desc(&self) -> &Desc {
        &self.desc
    }

    pub fn backend(&self) -> Backend {
        self.imp.backend()
    }

    pub fn transform(&self) -> Transform {
        self.desc.transform()
    }

    pub fn shape(&self) -> &[usize] {
        self.desc.shape()
    }

    pub fn shape_rank(&self) -> usize {
        self.desc.shape_rank()
    }

    pub fn transform_rank(&self) -> usize {
        self.desc.transform_rank()
    }

    pub fn target(&self) -> Target {
        self.desc.target()
    }

    pub fn target_count(&self) -> usize {
        self.desc.target_count()
    }

    pub fn distribution(&self) -> Distribution {
        self.desc.distribution()
    }

    pub fn placement(&self) -> Placement {
        self.desc.placement()
    }

    pub fn precision(&self) -> PrecisionTriad {
        self.desc.precision()
    }

    pub fn transform_parameters(&self) -> TransformParameters {
        self.desc.transform_parameters()
    }

    pub fn architecture_parameters(&self) -> ArchitectureParameters {
        self.desc.architecture_parameters()
    }

    /// Workspace bytes per target the caller must supply when the plan uses
    /// external workspace.
    pub fn workspace_size(&self) -> &[usize] {
        self.imp.workspace_size()
    }

    /// Run the transform from `src` into `dst`.
    pub fn execute(
        &mut self,
        src: Source<'_>,
        dst: Destination<'_>,
        params: impl Into<ExecutionParameters>,
    ) -> Result<()> {
        self.run(src.inner, dst.inner, params.into(), true)
    }

    /// Run an in-place transform; `buf` is read as the source and overwritten
    /// with the result.
    pub fn execute_in_place(
        &mut self,
        buf: Destination<'_>,
        params: impl Into<ExecutionParameters>,
    ) -> Result<()> {
        let src = buf.inner.clone();
        self.run(src, buf.inner, params.into(), true)
    }

    /// Like [`Plan::execute`] without the element type check.
    ///
    /// # Safety
    /// The buffers must hold elements of the precision and complexity the
    /// descriptor names for each side.
    pub unsafe fn execute_unsafe(
        &mut self,
        src: Source<'_>,
        dst: Destination<'_>,
        params: impl Into<ExecutionParameters>,
    ) -> Result<()> {
        self.run(src.inner, dst.inner, params.into(), false)
    }

    fn run(
        &mut self,
        src: Buffers,
        dst: Buffers,
        params: ExecutionParameters,
        check_types: bool,
    ) -> Result<()> {
        self.check_counts(&src, &dst)?;
        let placement = self.check_placement(&src, &dst)?;
        if src.read_only && !self.desc.preserve_source() {
            return Err(InvalidArgument::SourceNotPreserved.into());
        }
        if check_types {
            self.check_types(&src, &dst, placement)?;
        }
        check_nulls(&src.ptrs, Side::Source)?;
        check_nulls(&dst.ptrs, Side::Destination)?;
        self.check_lengths(&src, &dst, placement)?;
        let params = self.resolve_params(params)?;
        self.dispatch(&src.ptrs, &dst.ptrs, &params)
    }

    fn check_counts(&self, src: &Buffers, dst: &Buffers) -> Result<()> {
        let expected = self.desc.target_count();
        for (side, actual) in [(Side::Source, src.ptrs.len()), (Side::Destination, dst.ptrs.len())] {
            if actual != expected {
                return Err(InvalidArgument::BufferCount {
                    side,
                    expected,
                    actual,
                }
                .into());
            }
        }
        Ok(())
    }

    fn check_placement(&self, src: &Buffers, dst: &Buffers) -> Result<Placement> {
        let mut aliased = 0;
        for (index, (s, d)) in src.ptrs.iter().zip(&dst.ptrs).enumerate() {
            if s.aliases(d) {
                aliased += 1;
            } else if s.overlaps(d) {
                return Err(InvalidArgument::PartialOverlap { index }.into());
            }
        }
        let actual = if aliased == 0 {
            Placement::OutOfPlace
        } else if aliased == src.ptrs.len() {
            Placement::InPlace
        } else {
            return Err(InvalidArgument::MixedPlacement.into());
        };
        let expected = self.desc.placement();
        if actual != expected {
            return Err(InvalidArgument::PlacementMismatch { expected, actual }.into());
        }
        Ok(actual)
    }

    fn side_props(&self, side: Side) -> TypeProps {
        let config = self.desc.transform_config();
        TypeProps::new(config.side_precision(side), config.complexity(side))
    }

    fn check_types(&self, src: &Buffers, dst: &Buffers, placement: Placement) -> Result<()> {
        let config = self.desc.transform_config();
        if placement == Placement::InPlace {
            // One buffer plays both roles, so either side's type is acceptable.
            let expected = [self.side_props(Side::Source), self.side_props(Side::Destination)];
            for (side, buffers) in [(Side::Source, src), (Side::Destination, dst)] {
                if let Some(actual) = buffers.props {
                    if !expected.contains(&actual) {
                        return Err(InvalidArgument::TypeMismatch { side, actual }.into());
                    }
                }
            }
            let planar = [config.is_planar(Side::Source), config.is_planar(Side::Destination)];
            if let Some(ptr) = dst.ptrs.iter().find(|p| !planar.contains(&p.is_planar())) {
                return Err(InvalidArgument::FormatMismatch {
                    side: Side::Destination,
                    planar: ptr.is_planar(),
                }
                .into());
            }
            return Ok(());
        }

        for (side, buffers) in [(Side::Source, src), (Side::Destination, dst)] {
            if let Some(actual) = buffers.props {
                if actual != self.side_props(side) {
                    return Err(InvalidArgument::TypeMismatch { side, actual }.into());
                }
            }
            let planar = config.is_planar(side);
            if let Some(ptr) = buffers.ptrs.iter().find(|p| p.is_planar() != planar) {
                return Err(InvalidArgument::FormatMismatch {
                    side,
                    planar: ptr.is_planar(),
                }
                .into());
            }
        }
        Ok(())
    }

    fn check_lengths(&self, src: &Buffers, dst: &Buffers, placement: Placement) -> Result<()> {
        if self.desc.distribution() != Distribution::Spst {
            return Ok(());
        }
        let src_required = self.desc.required_bytes(Side::Source);
        let dst_required = self.desc.required_bytes(Side::Destination);
        let checks = if placement == Placement::InPlace {
            vec![(Side::Destination, dst, src_required.max(dst_required))]
        } else {
            vec![(Side::Source, src, src_required), (Side::Destination, dst, dst_required)]
        };
        for (side, buffers, required) in checks {
            let Some(lengths) = &buffers.lengths else {
                continue;
            };
            if let Some(&actual) = lengths.iter().find(|&&len| len < required) {
                return Err(InvalidArgument::BufferTooSmall {
                    side,
                    required,
                    actual,
                }
                .into());
            }
        }
        Ok(())
    }

    fn resolve_params(&self, params: ExecutionParameters) -> Result<ExecutionParameters> {
        let expected = (self.desc.target(), self.desc.distribution());
        let params = match params.pair() {
            None => ExecutionParameters::defaults_for(expected.0, expected.1),
            Some(actual) if actual != expected => {
                return Err(InvalidArgument::ExecutionTargetMismatch { expected, actual }.into());
            }
            Some(_) => params,
        };
        if self.desc.target_config().external_workspace() {
            check_workspaces(&params, self.desc.target_count())?;
        }
        Ok(params)
    }

    fn dispatch(&mut self, src: &[BufferPtr], dst: &[BufferPtr], params: &ExecutionParameters) -> Result<()> {
        let desc = &self.desc;
        match params {
            ExecutionParameters::CpuSpst(p) => self.imp.execute_cpu_spst(desc, src, dst, p),
            ExecutionParameters::GpuSpst(p) => self.imp.execute_gpu_spst(desc, src, dst, p),
            ExecutionParameters::GpuSpmt(p) => self.imp.execute_gpu_spmt(desc, src, dst, p),
            ExecutionParameters::CpuMpst(p) => self.imp.execute_cpu_mpst(desc, src, dst, p),
            ExecutionParameters::GpuMpst(p) => self.imp.execute_gpu_mpst(desc, src, dst, p),
            ExecutionParameters::Default => Err(Error::not_implemented(
                self.imp.backend(),
                desc.target(),
                desc.distribution(),
            )),
        }
    }
}

fn check_nulls(ptrs: &[BufferPtr], side: Side) -> Result<()> {
    match ptrs.iter().position(BufferPtr::is_null) {
        Some(index) => Err(InvalidArgument::NullBuffer { side, index }.into()),
        None => Ok(()),
    }
}

fn check_workspaces(params: &ExecutionParameters, count: usize) -> Result<()> {
    let single = |workspace: *mut core::ffi::c_void| {
        if workspace.is_null() {
            Err(Error::from(InvalidArgument::MissingWorkspace { index: 0 }))
        } else {
            Ok(())
        }
    };
    match params {
        ExecutionParameters::GpuSpst(p) => single(p.workspace),
        ExecutionParameters::GpuMpst(p) => single(p.workspace),
        ExecutionParameters::CpuMpst(p) => single(p.workspace),
        ExecutionParameters::GpuSpmt(p) => {
            if p.workspaces.len() != count {
                return Err(InvalidArgument::WorkspaceCount {
                    expected: count,
                    actual: p.workspaces.len(),
                }
                .into());
            }
            match p.workspaces.iter().position(|w| w.is_null()) {
                Some(index) => Err(InvalidArgument::MissingWorkspace { index }.into()),
                None => Ok(()),
            }
        }
        ExecutionParameters::CpuSpst(_) | ExecutionParameters::Default => Ok(()),
    }
}
