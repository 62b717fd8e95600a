//! Validated shape and strides.

use super::transform::TransformConfig;
use crate::common::{Placement, MAX_DIM_COUNT};
use crate::error::{InvalidArgument, Result, Side};
use crate::transform::Dimensions;

/// Shape and per-side strides, all in elements of the respective buffer.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DimensionsConfig {
    shape: Vec<usize>,
    src_strides: Vec<usize>,
    dst_strides: Vec<usize>,
}

fn check_strides(strides: &[usize], rank: usize, side: Side) -> Result<()> {
    if !strides.is_empty() && strides.len() != rank {
        return Err(InvalidArgument::StrideCount {
            side,
            expected: rank,
            actual: strides.len(),
        }
        .into());
    }
    if let Some(index) = strides.iter().position(|&s| s == 0) {
        return Err(InvalidArgument::ZeroStride { side, index }.into());
    }
    Ok(())
}

impl DimensionsConfig {
    /// Validate `dims` and fill in default strides chosen by `transform`.
    pub fn make(dims: &Dimensions, transform: &TransformConfig, placement: Placement) -> Result<Self> {
        let rank = dims.shape.len();
        if rank == 0 {
            return Err(InvalidArgument::EmptyShape.into());
        }
        if rank > MAX_DIM_COUNT {
            return Err(InvalidArgument::TooManyDimensions(rank).into());
        }
        if let Some(dim) = dims.shape.iter().position(|&n| n == 0) {
            return Err(InvalidArgument::ZeroExtent { dim }.into());
        }
        check_strides(&dims.src_strides, rank, Side::Source)?;
        check_strides(&dims.dst_strides, rank, Side::Destination)?;

        let fill = |given: &[usize], side| {
            if given.is_empty() {
                transform.default_strides(&dims.shape, side, placement)
            } else {
                given.to_vec()
            }
        };
        Ok(Self {
            shape: dims.shape.clone(),
            src_strides: fill(&dims.src_strides, Side::Source),
            dst_strides: fill(&dims.dst_strides, Side::Destination),
        })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn strides(&self, side: Side) -> &[usize] {
        match side {
            Side::Source => &self.src_strides,
            Side::Destination => &self.dst_strides,
        }
    }

    pub fn src_strides(&self) -> &[usize] {
        &self.src_strides
    }

    pub fn dst_strides(&self) -> &[usize] {
        &self.dst_strides
    }

    pub(crate) fn to_dimensions(&self) -> Dimensions {
        Dimensions {
            shape: self.shape.clone(),
            src_strides: self.src_strides.clone(),
            dst_strides: self.dst_strides.clone(),
        }
    }
}

/// Number of elements spanned by `shape` laid out with `strides`.
pub fn extent(shape: &[usize], strides: &[usize]) -> usize {
    shape
        .iter()
        .zip(strides)
        .fold(1usize, |acc, (&n, &s)| {
            acc.saturating_add((n - 1).saturating_mul(s))
        })
}
