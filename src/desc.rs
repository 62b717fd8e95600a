//! The canonical description of one transform instance.

use core::hash::{Hash, Hasher};
use std::sync::OnceLock;

use crate::architecture::{cpu, gpu, mpst, spmt, ArchitectureParameters};
use crate::common::{Direction, Distribution, Normalization, Placement, PrecisionTriad, Target};
use crate::config::{
    extent, not_a, DimensionsConfig, DistributionConfig, TargetConfig, TransformConfig,
};
use crate::error::{InvalidArgument, Result, Side};
use crate::gpu::GpuRuntime;
use crate::num::Float;
use crate::transform::{dft, dht, dtt, Transform, TransformParameters};
use crate::types::{Complexity, Element};
use crate::validate::Validate;

/// Validated, immutable description of a transform: what to compute, on
/// which target, with which memory layout.
///
/// A `Desc` is either complete and consistent or never constructed. Plans
/// hold one for their whole lifetime and consult it on every execution.
#[derive(Clone, Debug)]
pub struct Desc {
    transform: TransformConfig,
    dims: DimensionsConfig,
    target: TargetConfig,
    distribution: DistributionConfig,
    placement: Placement,
    preserve_source: bool,
    src_element_size: usize,
    dst_element_size: usize,
    norm_factor: OnceLock<f64>,
}

impl Desc {
    /// Build a descriptor, validating GPU devices against the runtime
    /// installed in the global registry.
    pub fn new(
        transform: impl Into<TransformParameters>,
        arch: impl Into<ArchitectureParameters>,
    ) -> Result<Self> {
        let registry = crate::registry::global();
        Self::with_gpu_runtime(transform, arch, registry.gpu_runtime())
    }

    /// Build a descriptor against an explicit GPU runtime.
    pub fn with_gpu_runtime(
        transform: impl Into<TransformParameters>,
        arch: impl Into<ArchitectureParameters>,
        runtime: Option<&dyn GpuRuntime>,
    ) -> Result<Self> {
        let params = transform.into();
        let arch = arch.into();

        let transform = TransformConfig::make(&params)?;
        let (dimensions, placement) = match &params {
            TransformParameters::Dft(p) => (&p.dimensions, p.placement),
            TransformParameters::Dht(p) => (&p.dimensions, p.placement),
            TransformParameters::Dtt(p) => (&p.dimensions, p.placement),
        };
        placement.validate()?;
        let dims = DimensionsConfig::make(dimensions, &transform, placement)?;
        let target = TargetConfig::make(&arch, runtime)?;
        let distribution = DistributionConfig::make(&arch, dims.shape())?;

        let desc = Self {
            src_element_size: transform.element_size(Side::Source),
            dst_element_size: transform.element_size(Side::Destination),
            transform,
            dims,
            target,
            distribution,
            placement,
            preserve_source: arch.preserve_source(),
            norm_factor: OnceLock::new(),
        };
        debug_log!(
            "desc: {} {:?} over axes {:?}, {} {}, {}",
            desc.transform(),
            desc.shape(),
            desc.transform_axes(),
            desc.target(),
            desc.distribution(),
            desc.placement
        );
        Ok(desc)
    }

    pub fn transform(&self) -> Transform {
        self.transform.transform()
    }

    pub fn transform_config(&self) -> &TransformConfig {
        &self.transform
    }

    pub fn dims(&self) -> &DimensionsConfig {
        &self.dims
    }

    pub fn shape(&self) -> &[usize] {
        self.dims.shape()
    }

    pub fn shape_rank(&self) -> usize {
        self.dims.rank()
    }

    pub fn transform_rank(&self) -> usize {
        self.transform.transform_rank()
    }

    pub fn transform_axes(&self) -> &[usize] {
        self.transform.axes()
    }

    pub fn direction(&self) -> Direction {
        self.transform.direction()
    }

    pub fn precision(&self) -> PrecisionTriad {
        self.transform.precision()
    }

    pub fn normalization(&self) -> Normalization {
        self.transform.normalization()
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn preserve_source(&self) -> bool {
        self.preserve_source
    }

    pub fn target(&self) -> Target {
        self.target.target()
    }

    pub fn target_count(&self) -> usize {
        self.target.target_count()
    }

    pub fn target_config(&self) -> &TargetConfig {
        &self.target
    }

    pub fn distribution(&self) -> Distribution {
        self.distribution.distribution()
    }

    pub fn distribution_config(&self) -> &DistributionConfig {
        &self.distribution
    }

    pub fn src_complexity(&self) -> Complexity {
        self.transform.complexity(Side::Source)
    }

    pub fn dst_complexity(&self) -> Complexity {
        self.transform.complexity(Side::Destination)
    }

    /// Bytes per source element; per half for planar formats.
    pub fn src_element_size(&self) -> usize {
        self.src_element_size
    }

    pub fn dst_element_size(&self) -> usize {
        self.dst_element_size
    }

    pub fn src_strides(&self) -> &[usize] {
        self.dims.src_strides()
    }

    pub fn dst_strides(&self) -> &[usize] {
        self.dims.dst_strides()
    }

    /// Logical extents of one side (Hermitian sides are compressed).
    pub fn logical_shape(&self, side: Side) -> Vec<usize> {
        self.transform.logical_shape(self.shape(), side)
    }

    /// Elements spanned by the source buffer.
    pub fn src_extent(&self) -> usize {
        extent(&self.logical_shape(Side::Source), self.src_strides())
    }

    /// Elements spanned by the destination buffer.
    pub fn dst_extent(&self) -> usize {
        extent(&self.logical_shape(Side::Destination), self.dst_strides())
    }

    /// Bytes a single-target buffer of `side` must provide.
    pub fn required_bytes(&self, side: Side) -> usize {
        match side {
            Side::Source => self.src_extent().saturating_mul(self.src_element_size),
            Side::Destination => self.dst_extent().saturating_mul(self.dst_element_size),
        }
    }

    /// Normalization factor in double precision, computed once.
    pub fn norm_factor_f64(&self) -> f64 {
        *self.norm_factor.get_or_init(|| {
            let n = self.transform.norm_size(self.shape()) as f64;
            match self.normalization() {
                Normalization::None => 1.0,
                Normalization::Orthogonal => 1.0 / n.sqrt(),
                Normalization::Unitary => 1.0 / n,
            }
        })
    }

    /// Normalization factor computed in `T`, which must be the execution precision.
    pub fn norm_factor<T: Float + Element>(&self) -> Result<T> {
        let expected = self.precision().execution;
        if T::PRECISION != expected {
            return Err(InvalidArgument::NormPrecision {
                expected,
                actual: T::PRECISION,
            }
            .into());
        }
        let size = self.transform.norm_size(self.shape());
        let n = T::from_usize(size).ok_or(InvalidArgument::UnrepresentableSize(size))?;
        Ok(match self.normalization() {
            Normalization::None => T::one(),
            Normalization::Orthogonal => T::one() / n.sqrt(),
            Normalization::Unitary => T::one() / n,
        })
    }

    /// The transform parameters, with default strides filled in.
    pub fn transform_parameters(&self) -> TransformParameters {
        self.transform
            .to_parameters(self.dims.to_dimensions(), self.placement)
    }

    pub fn dft_parameters(&self) -> Result<dft::Parameters> {
        match self.transform_parameters() {
            TransformParameters::Dft(p) => Ok(p),
            _ => Err(not_a("dft parameters")),
        }
    }

    pub fn dht_parameters(&self) -> Result<dht::Parameters> {
        match self.transform_parameters() {
            TransformParameters::Dht(p) => Ok(p),
            _ => Err(not_a("dht parameters")),
        }
    }

    pub fn dtt_parameters(&self) -> Result<dtt::Parameters> {
        match self.transform_parameters() {
            TransformParameters::Dtt(p) => Ok(p),
            _ => Err(not_a("dtt parameters")),
        }
    }

    /// Architecture parameters of this descriptor's (target, distribution) pair.
    pub fn architecture_parameters(&self) -> ArchitectureParameters {
        let preserve_source = self.preserve_source;
        match (&self.target, &self.distribution) {
            (TargetConfig::Cpu(c), DistributionConfig::Mpst { communicator, src_block, dst_block }) => {
                mpst::cpu::Parameters {
                    preserve_source,
                    communicator: *communicator,
                    alignment: c.alignment,
                    thread_limit: c.thread_limit,
                    src_block: src_block.clone(),
                    dst_block: dst_block.clone(),
                }
                .into()
            }
            (TargetConfig::Cpu(c), _) => cpu::Parameters {
                preserve_source,
                alignment: c.alignment,
                thread_limit: c.thread_limit,
            }
            .into(),
            (TargetConfig::Gpu(g), DistributionConfig::Spmt { src_blocks, dst_blocks }) => {
                spmt::gpu::Parameters {
                    preserve_source,
                    devices: g.devices.clone(),
                    external_workspace: g.external_workspace,
                    src_blocks: src_blocks.clone(),
                    dst_blocks: dst_blocks.clone(),
                }
                .into()
            }
            (TargetConfig::Gpu(g), DistributionConfig::Mpst { communicator, src_block, dst_block }) => {
                mpst::gpu::Parameters {
                    preserve_source,
                    communicator: *communicator,
                    device: g.devices.first().copied(),
                    external_workspace: g.external_workspace,
                    src_block: src_block.clone(),
                    dst_block: dst_block.clone(),
                }
                .into()
            }
            (TargetConfig::Gpu(g), DistributionConfig::Spst) => gpu::Parameters {
                preserve_source,
                device: g.devices.first().copied(),
                external_workspace: g.external_workspace,
            }
            .into(),
        }
    }

    fn key(&self) -> (&TransformConfig, &DimensionsConfig, &TargetConfig, &DistributionConfig, Placement, bool) {
        (
            &self.transform,
            &self.dims,
            &self.target,
            &self.distribution,
            self.placement,
            self.preserve_source,
        )
    }
}

impl PartialEq for Desc {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Desc {}

impl Hash for Desc {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Axes;
    use crate::error::Error;
    use crate::types::Precision;

    fn cpu() -> cpu::Parameters {
        cpu::Parameters::default()
    }

    #[test]
    fn normalization_factors() {
        let base = dft::Parameters::c2c(Direction::Inverse, [4, 8]);
        let unitary = Desc::new(base.clone().with_normalization(Normalization::Unitary), cpu()).unwrap();
        assert_eq!(unitary.norm_factor_f64(), 1.0 / 32.0);
        assert_eq!(unitary.norm_factor::<f32>(), Ok(1.0f32 / 32.0));

        let ortho = Desc::new(base.clone().with_normalization(Normalization::Orthogonal), cpu()).unwrap();
        assert!((ortho.norm_factor_f64() - 1.0 / 32f64.sqrt()).abs() < 1e-15);

        let none = Desc::new(base, cpu()).unwrap();
        assert_eq!(none.norm_factor_f64(), 1.0);
        assert_eq!(
            none.norm_factor::<f64>(),
            Err(Error::InvalidArgument(InvalidArgument::NormPrecision {
                expected: Precision::F32,
                actual: Precision::F64
            }))
        );
    }

    #[test]
    fn hermitian_extents() {
        let oop = Desc::new(dft::Parameters::r2c([8]), cpu()).unwrap();
        assert_eq!(oop.dst_extent(), 5);
        assert_eq!(oop.src_extent(), 8);
        assert_eq!(oop.dst_element_size(), 8);
        assert_eq!(oop.required_bytes(Side::Destination), 40);

        let inplace = Desc::new(dft::Parameters::r2c([2, 8]).with_placement(Placement::InPlace), cpu()).unwrap();
        assert_eq!(inplace.src_strides(), &[10, 1]);
        assert_eq!(inplace.dst_strides(), &[5, 1]);
        assert_eq!(inplace.required_bytes(Side::Source), 18 * 4);
        assert_eq!(inplace.required_bytes(Side::Destination), 10 * 8);
    }

    #[test]
    fn parameters_round_trip_through_the_descriptor() {
        let params = dft::Parameters::c2c(Direction::Forward, [4, 6]).with_axes(Axes::from([1]));
        let desc = Desc::new(params, cpu()).unwrap();
        let back = desc.dft_parameters().unwrap();
        assert_eq!(back.axes, Axes::List(vec![1]));
        assert_eq!(back.dimensions.src_strides, vec![6, 1]);
        assert!(desc.dtt_parameters().is_err());
        assert_eq!(desc.architecture_parameters(), ArchitectureParameters::CpuSpst(cpu::Parameters {
            thread_limit: crate::config::hardware_concurrency(),
            ..cpu()
        }));
    }

    #[test]
    fn equal_descriptors_hash_alike() {
        use std::collections::hash_map::DefaultHasher;
        let a = Desc::new(dft::Parameters::r2c([16]), cpu()).unwrap();
        let b = Desc::new(dft::Parameters::r2c([16]), cpu()).unwrap();
        a.norm_factor_f64();
        assert_eq!(a, b);
        let hash = |d: &Desc| {
            let mut h = DefaultHasher::new();
            d.hash(&mut h);
            h.finish()
        };
        assert_eq!(hash(&a), hash(&b));
        let c = Desc::new(dft::Parameters::r2c([32]), cpu()).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn first_broken_invariant_is_reported() {
        let mut params = dft::Parameters::c2c(Direction::Forward, [4, 0]).with_axes(Axes::from([0, 0]));
        assert_eq!(
            Desc::new(params.clone(), cpu()).unwrap_err(),
            Error::InvalidArgument(InvalidArgument::DuplicateAxis(0))
        );
        params.axes = Axes::All;
        assert_eq!(
            Desc::new(params, cpu()).unwrap_err(),
            Error::InvalidArgument(InvalidArgument::ZeroExtent { dim: 1 })
        );
    }
}
