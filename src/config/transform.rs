//! Canonical, validated transform configuration.

use crate::common::{Direction, Normalization, Placement, PrecisionTriad, MAX_DIM_COUNT};
use crate::error::{Error, InvalidArgument, Result, Side};
use crate::transform::{dft, dht, dtt, Dimensions, Transform, TransformParameters};
use crate::types::{Complexity, Precision};
use crate::validate::Validate;

/// Family specific part of a [`TransformConfig`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TransformKind {
    Dft {
        src_format: dft::Format,
        dst_format: dft::Format,
    },
    Dht {
        kind: dht::Type,
    },
    /// One type per transform axis.
    Dtt {
        types: Vec<dtt::Type>,
    },
}

/// Stride policy of one buffer side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layout {
    /// Plain row-major.
    Plain,
    /// The last transform axis holds `n/2 + 1` complex elements.
    Hermitian,
    /// Real data padded to `2 * (n/2 + 1)` along the last transform axis.
    PaddedReal,
}

/// Validated transform family, direction, precision, normalization and axes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TransformConfig {
    direction: Direction,
    precision: PrecisionTriad,
    normalization: Normalization,
    axes: Vec<usize>,
    kind: TransformKind,
}

/// Check transform axes against a shape of rank `rank`.
///
/// Stages run in order and the first violated one is reported: non-empty,
/// at most `MAX_DIM_COUNT`, at most `rank`, every index in range, no duplicates.
pub fn validate_axes(axes: &[usize], rank: usize) -> Result<()> {
    if axes.is_empty() {
        return Err(InvalidArgument::EmptyAxes.into());
    }
    if axes.len() > MAX_DIM_COUNT {
        return Err(InvalidArgument::TooManyAxes { count: axes.len() }.into());
    }
    if axes.len() > rank {
        return Err(InvalidArgument::AxesExceedRank {
            count: axes.len(),
            rank,
        }
        .into());
    }
    if let Some(&axis) = axes.iter().find(|&&axis| axis >= rank) {
        return Err(InvalidArgument::AxisOutOfRange { axis, rank }.into());
    }
    for (i, &axis) in axes.iter().enumerate() {
        if axes[..i].contains(&axis) {
            return Err(InvalidArgument::DuplicateAxis(axis).into());
        }
    }
    Ok(())
}

impl TransformConfig {
    /// Validate the family specific part of `params`.
    ///
    /// Axes are checked against the rank of the shape only; the shape itself
    /// is validated by [`super::DimensionsConfig`].
    pub fn make(params: &TransformParameters) -> Result<Self> {
        let (direction, precision, normalization, axes, dims) = match params {
            TransformParameters::Dft(p) => {
                (p.direction, p.precision, p.normalization, &p.axes, &p.dimensions)
            }
            TransformParameters::Dht(p) => {
                (p.direction, p.precision, p.normalization, &p.axes, &p.dimensions)
            }
            TransformParameters::Dtt(p) => {
                (p.direction, p.precision, p.normalization, &p.axes, &p.dimensions)
            }
        };
        direction.validate()?;
        precision.validate()?;
        normalization.validate()?;

        let rank = dims.shape.len();
        let axes = axes.resolve(rank);
        validate_axes(&axes, rank)?;

        let kind = match params {
            TransformParameters::Dft(p) => {
                p.src_format.validate()?;
                p.dst_format.validate()?;
                if !p.src_format.compatible_destinations().contains(&p.dst_format) {
                    return Err(InvalidArgument::IncompatibleFormats {
                        src: p.src_format,
                        dst: p.dst_format,
                    }
                    .into());
                }
                TransformKind::Dft {
                    src_format: p.src_format,
                    dst_format: p.dst_format,
                }
            }
            TransformParameters::Dht(p) => {
                p.kind.validate()?;
                TransformKind::Dht { kind: p.kind }
            }
            TransformParameters::Dtt(p) => {
                crate::validate::validate_all(&p.types)?;
                let types = match p.types.len() {
                    1 => vec![p.types[0]; axes.len()],
                    n if n == axes.len() => p.types.clone(),
                    n => {
                        return Err(InvalidArgument::DttTypeCount {
                            expected: axes.len(),
                            actual: n,
                        }
                        .into())
                    }
                };
                // Zero extents are left to the dimensions check.
                if let Some((&axis, _)) = axes
                    .iter()
                    .zip(&types)
                    .find(|&(&axis, &ty)| ty == dtt::Type::Dct1 && dims.shape[axis] == 1)
                {
                    return Err(InvalidArgument::DctOneTooShort { axis }.into());
                }
                TransformKind::Dtt { types }
            }
        };

        Ok(Self {
            direction,
            precision,
            normalization,
            axes,
            kind,
        })
    }

    pub fn transform(&self) -> Transform {
        match self.kind {
            TransformKind::Dft { .. } => Transform::Dft,
            TransformKind::Dht { .. } => Transform::Dht,
            TransformKind::Dtt { .. } => Transform::Dtt,
        }
    }

    pub fn kind(&self) -> &TransformKind {
        &self.kind
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn precision(&self) -> PrecisionTriad {
        self.precision
    }

    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    pub fn axes(&self) -> &[usize] {
        &self.axes
    }

    pub fn transform_rank(&self) -> usize {
        self.axes.len()
    }

    /// The axis whose length is halved by Hermitian symmetry.
    pub fn last_axis(&self) -> usize {
        self.axes[self.axes.len() - 1]
    }

    pub fn dtt_types(&self) -> Option<&[dtt::Type]> {
        match &self.kind {
            TransformKind::Dtt { types } => Some(types),
            _ => None,
        }
    }

    pub fn format(&self, side: Side) -> Option<dft::Format> {
        match self.kind {
            TransformKind::Dft {
                src_format,
                dst_format,
            } => Some(match side {
                Side::Source => src_format,
                Side::Destination => dst_format,
            }),
            _ => None,
        }
    }

    pub fn side_precision(&self, side: Side) -> Precision {
        match side {
            Side::Source => self.precision.source,
            Side::Destination => self.precision.destination,
        }
    }

    pub fn complexity(&self, side: Side) -> Complexity {
        match self.format(side) {
            Some(dft::Format::Real) | None => Complexity::Real,
            Some(_) => Complexity::Complex,
        }
    }

    /// Whether the DFT has a real leg, making the complex leg Hermitian.
    pub fn is_real_dft(&self) -> bool {
        matches!(
            self.kind,
            TransformKind::Dft { src_format, dst_format }
                if src_format.is_real() || dst_format.is_real()
        )
    }

    pub fn is_planar(&self, side: Side) -> bool {
        self.format(side).map_or(false, dft::Format::is_planar)
    }

    /// Size in bytes of one element of a buffer. Planar buffers report the
    /// size of one half.
    pub fn element_size(&self, side: Side) -> usize {
        let scalar = self.side_precision(side).size();
        match self.format(side) {
            Some(dft::Format::ComplexInterleaved) | Some(dft::Format::HermitianComplexInterleaved) => {
                2 * scalar
            }
            _ => scalar,
        }
    }

    /// Stride policy for one side of the transform.
    pub fn layout(&self, side: Side, placement: Placement) -> Layout {
        if !self.is_real_dft() {
            return Layout::Plain;
        }
        match self.complexity(side) {
            Complexity::Complex => Layout::Hermitian,
            Complexity::Real if placement == Placement::InPlace => Layout::PaddedReal,
            Complexity::Real => Layout::Plain,
        }
    }

    /// Extent of dimension `dim` used to step to the next-outer stride.
    fn effective_size(&self, layout: Layout, dim: usize, size: usize) -> usize {
        if dim != self.last_axis() {
            return size;
        }
        match layout {
            Layout::Plain => size,
            Layout::Hermitian => size / 2 + 1,
            Layout::PaddedReal => 2 * (size / 2 + 1),
        }
    }

    /// Row-major default strides for one side.
    pub fn default_strides(&self, shape: &[usize], side: Side, placement: Placement) -> Vec<usize> {
        let layout = self.layout(side, placement);
        let mut strides = vec![0usize; shape.len()];
        let mut stride = 1usize;
        for dim in (0..shape.len()).rev() {
            strides[dim] = stride;
            stride = stride.saturating_mul(self.effective_size(layout, dim, shape[dim]));
        }
        strides
    }

    /// Logical extents of one side: the Hermitian side holds `n/2 + 1`
    /// elements along the last transform axis.
    pub fn logical_shape(&self, shape: &[usize], side: Side) -> Vec<usize> {
        let mut out = shape.to_vec();
        if self.is_real_dft() && self.complexity(side) == Complexity::Complex {
            let axis = self.last_axis();
            out[axis] = shape[axis] / 2 + 1;
        }
        out
    }

    /// Length `n` of the normalization factor.
    pub fn norm_size(&self, shape: &[usize]) -> usize {
        match &self.kind {
            TransformKind::Dft { .. } | TransformKind::Dht { .. } => self
                .axes
                .iter()
                .fold(1usize, |n, &axis| n.saturating_mul(shape[axis])),
            TransformKind::Dtt { types } => self
                .axes
                .iter()
                .zip(types)
                .fold(1usize, |n, (&axis, ty)| n.saturating_mul(ty.logical_size(shape[axis]))),
        }
    }

    /// Rebuild user parameters from the canonical configuration.
    pub(crate) fn to_parameters(&self, dimensions: Dimensions, placement: Placement) -> TransformParameters {
        let axes = self.axes.clone().into();
        match &self.kind {
            TransformKind::Dft {
                src_format,
                dst_format,
            } => dft::Parameters {
                direction: self.direction,
                precision: self.precision,
                dimensions,
                axes,
                normalization: self.normalization,
                placement,
                src_format: *src_format,
                dst_format: *dst_format,
            }
            .into(),
            TransformKind::Dht { kind } => dht::Parameters {
                direction: self.direction,
                precision: self.precision,
                dimensions,
                axes,
                normalization: self.normalization,
                placement,
                kind: *kind,
            }
            .into(),
            TransformKind::Dtt { types } => dtt::Parameters {
                direction: self.direction,
                precision: self.precision,
                dimensions,
                axes,
                normalization: self.normalization,
                placement,
                types: types.clone(),
            }
            .into(),
        }
    }
}

pub(crate) fn not_a(expected: &'static str) -> Error {
    Error::InvalidArgument(InvalidArgument::ParametersKind { expected })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Axes;

    fn err(cause: InvalidArgument) -> Result<()> {
        Err(Error::InvalidArgument(cause))
    }

    #[test]
    fn axes_validation_order() {
        assert_eq!(validate_axes(&[], 3), err(InvalidArgument::EmptyAxes));
        assert_eq!(
            validate_axes(&[0, 1, 2, 3, 0], 8),
            err(InvalidArgument::TooManyAxes { count: 5 })
        );
        assert_eq!(
            validate_axes(&[0, 1, 2], 2),
            err(InvalidArgument::AxesExceedRank { count: 3, rank: 2 })
        );
        assert_eq!(
            validate_axes(&[1, 1, 5], 3),
            err(InvalidArgument::AxisOutOfRange { axis: 5, rank: 3 })
        );
        assert_eq!(validate_axes(&[2, 0, 2], 3), err(InvalidArgument::DuplicateAxis(2)));
        assert_eq!(validate_axes(&[2, 0], 3), Ok(()));
    }

    #[test]
    fn real_to_hermitian_needs_real_leg() {
        let params = dft::Parameters::c2c(Direction::Forward, [8])
            .with_formats(dft::Format::HermitianComplexInterleaved, dft::Format::ComplexPlanar);
        assert_eq!(
            TransformConfig::make(&params.into()),
            Err(Error::InvalidArgument(InvalidArgument::IncompatibleFormats {
                src: dft::Format::HermitianComplexInterleaved,
                dst: dft::Format::ComplexPlanar
            }))
        );
    }

    #[test]
    fn dtt_types_broadcast_or_match_axes() {
        let mut params = dtt::Parameters::new(Direction::Forward, dtt::Type::Dct1, [4, 6]);
        let config = TransformConfig::make(&params.clone().into()).unwrap();
        assert_eq!(config.dtt_types(), Some(&[dtt::Type::Dct1, dtt::Type::Dct1][..]));

        params.types = vec![dtt::Type::Dct2, dtt::Type::Dst3, dtt::Type::Dst1];
        assert_eq!(
            TransformConfig::make(&params.into()),
            Err(Error::InvalidArgument(InvalidArgument::DttTypeCount {
                expected: 2,
                actual: 3
            }))
        );
    }

    #[test]
    fn dft_and_dtt_normalization_sizes_are_separate() {
        let dft = TransformConfig::make(&dft::Parameters::c2c(Direction::Forward, [4, 8]).into()).unwrap();
        assert_eq!(dft.norm_size(&[4, 8]), 32);
        let mut dtt = dtt::Parameters::new(Direction::Forward, dtt::Type::Dct1, [5, 3]);
        dtt.types = vec![dtt::Type::Dct1, dtt::Type::Dst1];
        let dtt = TransformConfig::make(&dtt.into()).unwrap();
        assert_eq!(dtt.norm_size(&[5, 3]), 8 * 8);
    }

    #[test]
    fn hermitian_and_padded_strides() {
        let r2c = TransformConfig::make(&dft::Parameters::r2c([3, 8]).into()).unwrap();
        assert_eq!(r2c.default_strides(&[3, 8], Side::Destination, Placement::OutOfPlace), vec![5, 1]);
        assert_eq!(r2c.default_strides(&[3, 8], Side::Source, Placement::OutOfPlace), vec![8, 1]);
        assert_eq!(r2c.default_strides(&[3, 8], Side::Source, Placement::InPlace), vec![10, 1]);
        assert_eq!(r2c.logical_shape(&[3, 8], Side::Destination), vec![3, 5]);
    }

    #[test]
    fn explicit_axes_choose_the_hermitian_axis() {
        let params = dft::Parameters::r2c([6, 4]).with_axes(Axes::from([1, 0]));
        let config = TransformConfig::make(&params.into()).unwrap();
        assert_eq!(config.last_axis(), 0);
        assert_eq!(config.default_strides(&[6, 4], Side::Destination, Placement::OutOfPlace), vec![4, 1]);
        assert_eq!(config.logical_shape(&[6, 4], Side::Destination), vec![4, 4]);
    }
}
