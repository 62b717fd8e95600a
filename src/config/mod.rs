//! Normalization of raw parameters into canonical, checked configuration.

mod dimensions;
mod target;
mod transform;

pub use dimensions::{extent, DimensionsConfig};
pub use target::{
    clamp_thread_limit, hardware_concurrency, CpuConfig, DistributionConfig, GpuConfig,
    TargetConfig,
};
pub use transform::{validate_axes, Layout, TransformConfig, TransformKind};

pub(crate) use transform::not_a;
