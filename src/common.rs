//! Enumerations and small value types shared by every transform family and target.

use crate::error::{Error, InvalidArgument, Result};
use crate::types::Precision;
use crate::validate::Validate;

/// Maximum rank of a shape and maximum number of transformed axes.
pub const MAX_DIM_COUNT: usize = 4;

const _: () = assert!(MAX_DIM_COUNT <= u32::BITS as usize);

raw_enum! {
    /// Sign of the transform exponent.
    #[derive(Default)]
    pub enum Direction: "direction" {
        #[default]
        Forward = 0,
        Inverse = 1,
    }
}

impl Direction {
    pub const BACKWARD: Direction = Direction::Inverse;

    pub fn inverse(self) -> Self {
        match self {
            Direction::Forward => Direction::Inverse,
            Direction::Inverse => Direction::Forward,
        }
    }
}

raw_enum! {
    /// Whether the destination reuses the source memory.
    #[derive(Default)]
    pub enum Placement: "placement" {
        InPlace = 0,
        #[default]
        OutOfPlace = 1,
    }
}

raw_enum! {
    /// Scaling applied to the transform result.
    ///
    /// `Orthogonal` scales both directions by `1/sqrt(n)`; `Unitary` scales the
    /// inverse transform by `1/n`.
    #[derive(Default)]
    pub enum Normalization: "normalization" {
        #[default]
        None = 0,
        Orthogonal = 1,
        Unitary = 2,
    }
}

raw_enum! {
    /// Hardware the transform runs on.
    pub enum Target: "target" {
        Cpu = 0,
        Gpu = 1,
    }
}

raw_enum! {
    /// How many processes and targets share one transform.
    pub enum Distribution: "distribution" {
        /// single process, single target
        Spst = 0,
        /// single process, multiple targets
        Spmt = 1,
        /// multiple processes, single target each
        Mpst = 2,
    }
}

impl core::fmt::Display for Direction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Direction::Forward => "forward",
            Direction::Inverse => "inverse",
        })
    }
}

impl core::fmt::Display for Placement {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Placement::InPlace => "in-place",
            Placement::OutOfPlace => "out-of-place",
        })
    }
}

impl core::fmt::Display for Target {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Target::Cpu => "cpu",
            Target::Gpu => "gpu",
        })
    }
}

impl core::fmt::Display for Distribution {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Distribution::Spst => "spst",
            Distribution::Spmt => "spmt",
            Distribution::Mpst => "mpst",
        })
    }
}

/// Execution, source and destination precision of one transform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PrecisionTriad {
    pub execution: Precision,
    pub source: Precision,
    pub destination: Precision,
}

impl PrecisionTriad {
    /// All three members set to `precision`.
    pub const fn uniform(precision: Precision) -> Self {
        Self {
            execution: precision,
            source: precision,
            destination: precision,
        }
    }

    pub fn is_uniform(&self) -> bool {
        self.execution == self.source && self.execution == self.destination
    }
}

impl Default for PrecisionTriad {
    fn default() -> Self {
        Self::uniform(Precision::F32)
    }
}

impl Validate for PrecisionTriad {
    fn validate(&self) -> Result<()> {
        self.execution.validate()?;
        self.source.validate()?;
        self.destination.validate()
    }
}

/// Memory alignment in bytes. Valid when it is a power of two.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Alignment(pub usize);

impl Alignment {
    pub const DEFAULT_NEW: Alignment = Alignment(16);
    pub const SIMD128: Alignment = Alignment(16);
    pub const SIMD256: Alignment = Alignment(32);
    pub const SIMD512: Alignment = Alignment(64);
    pub const PAGE: Alignment = Alignment(4096);

    pub const fn bytes(self) -> usize {
        self.0
    }
}

impl Default for Alignment {
    fn default() -> Self {
        Self::DEFAULT_NEW
    }
}

impl Validate for Alignment {
    fn validate(&self) -> Result<()> {
        if self.0.is_power_of_two() {
            Ok(())
        } else {
            Err(Error::InvalidArgument(InvalidArgument::InvalidAlignment(self.0)))
        }
    }
}

/// Axes a transform runs over.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Axes {
    /// Every dimension of the shape, in order.
    #[default]
    All,
    /// An explicit list of dimension indices.
    List(Vec<usize>),
}

impl Axes {
    /// Resolve against a shape of rank `rank`.
    pub fn resolve(&self, rank: usize) -> Vec<usize> {
        match self {
            Axes::All => (0..rank).collect(),
            Axes::List(axes) => axes.clone(),
        }
    }
}

impl From<Vec<usize>> for Axes {
    fn from(axes: Vec<usize>) -> Self {
        Axes::List(axes)
    }
}

impl From<&[usize]> for Axes {
    fn from(axes: &[usize]) -> Self {
        Axes::List(axes.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Axes {
    fn from(axes: [usize; N]) -> Self {
        Axes::List(axes.to_vec())
    }
}
