//! Target and distribution parameters, plus the per-call execution parameters.
//!
//! Each (target, distribution) pair has its own parameter struct. Plans built
//! for one pair only accept execution parameters of the same pair.

use core::ffi::c_void;
use core::ptr;

use crate::common::{Alignment, Distribution, Target};
use crate::error::{Error, InvalidArgument, Result, Side};

/// Opaque handle of a distributed-runtime communicator, passed through to
/// backends untouched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Communicator(pub usize);

impl Communicator {
    pub const WORLD: Communicator = Communicator(0);
}

/// Opaque native stream or queue handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Stream(pub *mut c_void);

impl Stream {
    /// The runtime's default stream.
    pub const DEFAULT: Stream = Stream(ptr::null_mut());
}

impl Default for Stream {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Part of the global shape owned by one target or process.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct MemoryBlock {
    pub starts: Vec<usize>,
    pub sizes: Vec<usize>,
    /// Element strides of the local block; empty means row-major.
    pub strides: Vec<usize>,
}

impl MemoryBlock {
    pub fn new(starts: impl Into<Vec<usize>>, sizes: impl Into<Vec<usize>>) -> Self {
        Self {
            starts: starts.into(),
            sizes: sizes.into(),
            strides: Vec::new(),
        }
    }

    /// Check the block lies inside `shape`.
    pub fn validate_within(&self, shape: &[usize], side: Side) -> Result<()> {
        let rank = shape.len();
        let stride_ok = self.strides.is_empty() || self.strides.len() == rank;
        if self.starts.len() != rank || self.sizes.len() != rank || !stride_ok {
            return Err(Error::InvalidArgument(InvalidArgument::BlockRank {
                side,
                rank,
            }));
        }
        for (dim, ((&start, &size), &extent)) in self
            .starts
            .iter()
            .zip(&self.sizes)
            .zip(shape)
            .enumerate()
        {
            if start.checked_add(size).map_or(true, |end| end > extent) {
                return Err(Error::InvalidArgument(InvalidArgument::BlockOutOfBounds {
                    side,
                    dim,
                }));
            }
        }
        match self.strides.iter().position(|&s| s == 0) {
            Some(index) => Err(Error::InvalidArgument(InvalidArgument::ZeroStride {
                side,
                index,
            })),
            None => Ok(()),
        }
    }
}

pub mod cpu {
    use super::*;

    /// Single process, single CPU.
    #[derive(Clone, Debug, PartialEq, Eq, Hash)]
    pub struct Parameters {
        pub preserve_source: bool,
        pub alignment: Alignment,
        /// Maximum number of threads; `0` uses every hardware thread.
        pub thread_limit: usize,
    }

    impl Default for Parameters {
        fn default() -> Self {
            Self {
                preserve_source: true,
                alignment: Alignment::default(),
                thread_limit: 0,
            }
        }
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct ExecutionParameters;
}

pub mod gpu {
    use super::*;

    /// Single process, single GPU.
    #[derive(Clone, Debug, PartialEq, Eq, Hash)]
    pub struct Parameters {
        pub preserve_source: bool,
        /// Device id; `None` uses the runtime's current device.
        pub device: Option<i32>,
        /// The caller passes workspace memory with every execution.
        pub external_workspace: bool,
    }

    impl Default for Parameters {
        fn default() -> Self {
            Self {
                preserve_source: true,
                device: None,
                external_workspace: false,
            }
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ExecutionParameters {
        pub stream: Stream,
        pub workspace: *mut c_void,
    }

    impl Default for ExecutionParameters {
        fn default() -> Self {
            Self {
                stream: Stream::DEFAULT,
                workspace: ptr::null_mut(),
            }
        }
    }
}

pub mod spmt {
    pub mod gpu {
        use crate::architecture::{MemoryBlock, Stream};
        use core::ffi::c_void;

        /// Single process, several GPUs. Each device owns one buffer.
        #[derive(Clone, Debug, PartialEq, Eq, Hash)]
        pub struct Parameters {
            pub preserve_source: bool,
            pub devices: Vec<i32>,
            pub external_workspace: bool,
            /// Per-device source blocks; empty lets the backend decide.
            pub src_blocks: Vec<MemoryBlock>,
            pub dst_blocks: Vec<MemoryBlock>,
        }

        impl Default for Parameters {
            fn default() -> Self {
                Self {
                    preserve_source: true,
                    devices: Vec::new(),
                    external_workspace: false,
                    src_blocks: Vec::new(),
                    dst_blocks: Vec::new(),
                }
            }
        }

        impl Parameters {
            pub fn with_devices(devices: impl Into<Vec<i32>>) -> Self {
                Self {
                    devices: devices.into(),
                    ..Self::default()
                }
            }
        }

        #[derive(Clone, Debug, Default, PartialEq, Eq)]
        pub struct ExecutionParameters {
            pub stream: Stream,
            /// One workspace per device when the plan uses external workspace.
            pub workspaces: Vec<*mut c_void>,
        }
    }
}

pub mod mpst {
    pub mod cpu {
        use crate::architecture::{Communicator, MemoryBlock};
        use crate::common::Alignment;
        use core::ffi::c_void;
        use core::ptr;

        /// Several processes, one CPU each.
        #[derive(Clone, Debug, PartialEq, Eq, Hash)]
        pub struct Parameters {
            pub preserve_source: bool,
            pub communicator: Communicator,
            pub alignment: Alignment,
            pub thread_limit: usize,
            pub src_block: Option<MemoryBlock>,
            pub dst_block: Option<MemoryBlock>,
        }

        impl Default for Parameters {
            fn default() -> Self {
                Self {
                    preserve_source: true,
                    communicator: Communicator::WORLD,
                    alignment: Alignment::default(),
                    thread_limit: 1,
                    src_block: None,
                    dst_block: None,
                }
            }
        }

        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        pub struct ExecutionParameters {
            pub workspace: *mut c_void,
        }

        impl Default for ExecutionParameters {
            fn default() -> Self {
                Self {
                    workspace: ptr::null_mut(),
                }
            }
        }
    }

    pub mod gpu {
        use crate::architecture::{Communicator, MemoryBlock, Stream};
        use core::ffi::c_void;
        use core::ptr;

        /// Several processes, one GPU each.
        #[derive(Clone, Debug, PartialEq, Eq, Hash)]
        pub struct Parameters {
            pub preserve_source: bool,
            pub communicator: Communicator,
            pub device: Option<i32>,
            pub external_workspace: bool,
            pub src_block: Option<MemoryBlock>,
            pub dst_block: Option<MemoryBlock>,
        }

        impl Default for Parameters {
            fn default() -> Self {
                Self {
                    preserve_source: true,
                    communicator: Communicator::WORLD,
                    device: None,
                    external_workspace: false,
                    src_block: None,
                    dst_block: None,
                }
            }
        }

        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        pub struct ExecutionParameters {
            pub stream: Stream,
            pub workspace: *mut c_void,
        }

        impl Default for ExecutionParameters {
            fn default() -> Self {
                Self {
                    stream: Stream::DEFAULT,
                    workspace: ptr::null_mut(),
                }
            }
        }
    }
}

/// Architecture parameters of any (target, distribution) pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ArchitectureParameters {
    CpuSpst(cpu::Parameters),
    GpuSpst(gpu::Parameters),
    GpuSpmt(spmt::gpu::Parameters),
    CpuMpst(mpst::cpu::Parameters),
    GpuMpst(mpst::gpu::Parameters),
}

impl ArchitectureParameters {
    pub fn target(&self) -> Target {
        match self {
            ArchitectureParameters::CpuSpst(_) | ArchitectureParameters::CpuMpst(_) => Target::Cpu,
            _ => Target::Gpu,
        }
    }

    pub fn distribution(&self) -> Distribution {
        match self {
            ArchitectureParameters::CpuSpst(_) | ArchitectureParameters::GpuSpst(_) => {
                Distribution::Spst
            }
            ArchitectureParameters::GpuSpmt(_) => Distribution::Spmt,
            ArchitectureParameters::CpuMpst(_) | ArchitectureParameters::GpuMpst(_) => {
                Distribution::Mpst
            }
        }
    }

    pub fn preserve_source(&self) -> bool {
        match self {
            ArchitectureParameters::CpuSpst(p) => p.preserve_source,
            ArchitectureParameters::GpuSpst(p) => p.preserve_source,
            ArchitectureParameters::GpuSpmt(p) => p.preserve_source,
            ArchitectureParameters::CpuMpst(p) => p.preserve_source,
            ArchitectureParameters::GpuMpst(p) => p.preserve_source,
        }
    }
}

impl Default for ArchitectureParameters {
    fn default() -> Self {
        ArchitectureParameters::CpuSpst(cpu::Parameters::default())
    }
}

impl From<cpu::Parameters> for ArchitectureParameters {
    fn from(p: cpu::Parameters) -> Self {
        ArchitectureParameters::CpuSpst(p)
    }
}

impl From<gpu::Parameters> for ArchitectureParameters {
    fn from(p: gpu::Parameters) -> Self {
        ArchitectureParameters::GpuSpst(p)
    }
}

impl From<spmt::gpu::Parameters> for ArchitectureParameters {
    fn from(p: spmt::gpu::Parameters) -> Self {
        ArchitectureParameters::GpuSpmt(p)
    }
}

impl From<mpst::cpu::Parameters> for ArchitectureParameters {
    fn from(p: mpst::cpu::Parameters) -> Self {
        ArchitectureParameters::CpuMpst(p)
    }
}

impl From<mpst::gpu::Parameters> for ArchitectureParameters {
    fn from(p: mpst::gpu::Parameters) -> Self {
        ArchitectureParameters::GpuMpst(p)
    }
}

/// Per-call execution parameters. `Default` lets the plan synthesize them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ExecutionParameters {
    #[default]
    Default,
    CpuSpst(cpu::ExecutionParameters),
    GpuSpst(gpu::ExecutionParameters),
    GpuSpmt(spmt::gpu::ExecutionParameters),
    CpuMpst(mpst::cpu::ExecutionParameters),
    GpuMpst(mpst::gpu::ExecutionParameters),
}

impl ExecutionParameters {
    /// Target and distribution the parameters were written for, `None` for `Default`.
    pub fn pair(&self) -> Option<(Target, Distribution)> {
        match self {
            ExecutionParameters::Default => None,
            ExecutionParameters::CpuSpst(_) => Some((Target::Cpu, Distribution::Spst)),
            ExecutionParameters::GpuSpst(_) => Some((Target::Gpu, Distribution::Spst)),
            ExecutionParameters::GpuSpmt(_) => Some((Target::Gpu, Distribution::Spmt)),
            ExecutionParameters::CpuMpst(_) => Some((Target::Cpu, Distribution::Mpst)),
            ExecutionParameters::GpuMpst(_) => Some((Target::Gpu, Distribution::Mpst)),
        }
    }

    /// Default parameters for a (target, distribution) pair.
    pub fn defaults_for(target: Target, distribution: Distribution) -> Self {
        match (target, distribution) {
            (Target::Cpu, Distribution::Spst) => {
                ExecutionParameters::CpuSpst(cpu::ExecutionParameters)
            }
            (Target::Gpu, Distribution::Spst) => {
                ExecutionParameters::GpuSpst(gpu::ExecutionParameters::default())
            }
            (Target::Gpu, Distribution::Spmt) => {
                ExecutionParameters::GpuSpmt(spmt::gpu::ExecutionParameters::default())
            }
            (Target::Cpu, Distribution::Mpst) => {
                ExecutionParameters::CpuMpst(mpst::cpu::ExecutionParameters::default())
            }
            (Target::Gpu, Distribution::Mpst) => {
                ExecutionParameters::GpuMpst(mpst::gpu::ExecutionParameters::default())
            }
            (Target::Cpu, Distribution::Spmt) => ExecutionParameters::Default,
        }
    }
}

impl From<cpu::ExecutionParameters> for ExecutionParameters {
    fn from(p: cpu::ExecutionParameters) -> Self {
        ExecutionParameters::CpuSpst(p)
    }
}

impl From<gpu::ExecutionParameters> for ExecutionParameters {
    fn from(p: gpu::ExecutionParameters) -> Self {
        ExecutionParameters::GpuSpst(p)
    }
}

impl From<spmt::gpu::ExecutionParameters> for ExecutionParameters {
    fn from(p: spmt::gpu::ExecutionParameters) -> Self {
        ExecutionParameters::GpuSpmt(p)
    }
}

impl From<mpst::cpu::ExecutionParameters> for ExecutionParameters {
    fn from(p: mpst::cpu::ExecutionParameters) -> Self {
        ExecutionParameters::CpuMpst(p)
    }
}

impl From<mpst::gpu::ExecutionParameters> for ExecutionParameters {
    fn from(p: mpst::gpu::ExecutionParameters) -> Self {
        ExecutionParameters::GpuMpst(p)
    }
}
