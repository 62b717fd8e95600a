//! Validated target and distribution configuration.

use crate::architecture::{ArchitectureParameters, Communicator, MemoryBlock};
use crate::common::{Alignment, Distribution, Target};
use crate::error::{Error, InvalidArgument, Result, Side};
use crate::gpu::GpuRuntime;
use crate::validate::Validate;

/// Number of hardware threads available to the process.
pub fn hardware_concurrency() -> usize {
    #[cfg(feature = "std")]
    {
        num_cpus::get().max(1)
    }
    #[cfg(not(feature = "std"))]
    {
        1
    }
}

/// Thread limit with `0` meaning every hardware thread, clamped to the hardware.
pub fn clamp_thread_limit(limit: usize) -> usize {
    let hw = hardware_concurrency();
    if limit == 0 {
        hw
    } else {
        limit.min(hw)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CpuConfig {
    pub alignment: Alignment,
    pub thread_limit: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GpuConfig {
    /// One device per target.
    pub devices: Vec<i32>,
    pub external_workspace: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TargetConfig {
    Cpu(CpuConfig),
    Gpu(GpuConfig),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DistributionConfig {
    Spst,
    Spmt {
        src_blocks: Vec<MemoryBlock>,
        dst_blocks: Vec<MemoryBlock>,
    },
    Mpst {
        communicator: Communicator,
        src_block: Option<MemoryBlock>,
        dst_block: Option<MemoryBlock>,
    },
}

fn cpu_config(alignment: Alignment, thread_limit: usize) -> Result<CpuConfig> {
    alignment.validate()?;
    Ok(CpuConfig {
        alignment,
        thread_limit: clamp_thread_limit(thread_limit),
    })
}

fn resolve_device(device: Option<i32>, runtime: Option<&dyn GpuRuntime>) -> Result<i32> {
    let runtime = runtime.ok_or_else(|| Error::Runtime("no gpu runtime installed".into()))?;
    let device = match device {
        Some(device) => device,
        None => runtime.current_device().map_err(|status| Error::Native {
            source: runtime.name(),
            code: status.code as i64,
            message: status.message,
        })?,
    };
    if runtime.is_valid_device(device) {
        Ok(device)
    } else {
        Err(InvalidArgument::InvalidDevice(device).into())
    }
}

impl TargetConfig {
    /// Validate the target part of `arch`; GPU devices are checked against `runtime`.
    pub fn make(arch: &ArchitectureParameters, runtime: Option<&dyn GpuRuntime>) -> Result<Self> {
        Ok(match arch {
            ArchitectureParameters::CpuSpst(p) => TargetConfig::Cpu(cpu_config(p.alignment, p.thread_limit)?),
            ArchitectureParameters::CpuMpst(p) => TargetConfig::Cpu(cpu_config(p.alignment, p.thread_limit)?),
            ArchitectureParameters::GpuSpst(p) => TargetConfig::Gpu(GpuConfig {
                devices: vec![resolve_device(p.device, runtime)?],
                external_workspace: p.external_workspace,
            }),
            ArchitectureParameters::GpuMpst(p) => TargetConfig::Gpu(GpuConfig {
                devices: vec![resolve_device(p.device, runtime)?],
                external_workspace: p.external_workspace,
            }),
            ArchitectureParameters::GpuSpmt(p) => {
                if p.devices.is_empty() {
                    return Err(InvalidArgument::NoDevices.into());
                }
                let mut devices = Vec::with_capacity(p.devices.len());
                for &device in &p.devices {
                    if devices.contains(&device) {
                        return Err(InvalidArgument::DuplicateDevice(device).into());
                    }
                    devices.push(resolve_device(Some(device), runtime)?);
                }
                TargetConfig::Gpu(GpuConfig {
                    devices,
                    external_workspace: p.external_workspace,
                })
            }
        })
    }

    pub fn target(&self) -> Target {
        match self {
            TargetConfig::Cpu(_) => Target::Cpu,
            TargetConfig::Gpu(_) => Target::Gpu,
        }
    }

    pub fn target_count(&self) -> usize {
        match self {
            TargetConfig::Cpu(_) => 1,
            TargetConfig::Gpu(gpu) => gpu.devices.len(),
        }
    }

    pub fn external_workspace(&self) -> bool {
        matches!(self, TargetConfig::Gpu(gpu) if gpu.external_workspace)
    }
}

fn check_blocks(blocks: &[MemoryBlock], count: usize, shape: &[usize], side: Side) -> Result<()> {
    if blocks.is_empty() {
        return Ok(());
    }
    if blocks.len() != count {
        return Err(InvalidArgument::BlockCount {
            side,
            expected: count,
            actual: blocks.len(),
        }
        .into());
    }
    blocks.iter().try_for_each(|b| b.validate_within(shape, side))
}

impl DistributionConfig {
    /// Validate the distribution part of `arch` against the global `shape`.
    pub fn make(arch: &ArchitectureParameters, shape: &[usize]) -> Result<Self> {
        Ok(match arch {
            ArchitectureParameters::CpuSpst(_) | ArchitectureParameters::GpuSpst(_) => {
                DistributionConfig::Spst
            }
            ArchitectureParameters::GpuSpmt(p) => {
                check_blocks(&p.src_blocks, p.devices.len(), shape, Side::Source)?;
                check_blocks(&p.dst_blocks, p.devices.len(), shape, Side::Destination)?;
                DistributionConfig::Spmt {
                    src_blocks: p.src_blocks.clone(),
                    dst_blocks: p.dst_blocks.clone(),
                }
            }
            ArchitectureParameters::CpuMpst(p) => {
                mpst(p.communicator, &p.src_block, &p.dst_block, shape)?
            }
            ArchitectureParameters::GpuMpst(p) => {
                mpst(p.communicator, &p.src_block, &p.dst_block, shape)?
            }
        })
    }

    pub fn distribution(&self) -> Distribution {
        match self {
            DistributionConfig::Spst => Distribution::Spst,
            DistributionConfig::Spmt { .. } => Distribution::Spmt,
            DistributionConfig::Mpst { .. } => Distribution::Mpst,
        }
    }
}

fn mpst(
    communicator: Communicator,
    src_block: &Option<MemoryBlock>,
    dst_block: &Option<MemoryBlock>,
    shape: &[usize],
) -> Result<DistributionConfig> {
    if let Some(block) = src_block {
        block.validate_within(shape, Side::Source)?;
    }
    if let Some(block) = dst_block {
        block.validate_within(shape, Side::Destination)?;
    }
    Ok(DistributionConfig::Mpst {
        communicator,
        src_block: src_block.clone(),
        dst_block: dst_block.clone(),
    })
}
