//! Transform parameters the caller fills in: DFT, DHT and DTT families.

use crate::common::{Axes, Direction, Normalization, Placement, PrecisionTriad};

raw_enum! {
    /// Transform family.
    pub enum Transform: "transform" {
        /// discrete Fourier transform
        Dft = 0,
        /// discrete Hartley transform
        Dht = 1,
        /// discrete trigonometric (cosine/sine) transform
        Dtt = 2,
    }
}

impl core::fmt::Display for Transform {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Transform::Dft => "dft",
            Transform::Dht => "dht",
            Transform::Dtt => "dtt",
        })
    }
}

/// Shape of the data and optional element strides of both buffers.
///
/// Empty stride vectors request row-major defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub shape: Vec<usize>,
    pub src_strides: Vec<usize>,
    pub dst_strides: Vec<usize>,
}

impl Dimensions {
    pub fn new(shape: impl Into<Vec<usize>>) -> Self {
        Self {
            shape: shape.into(),
            ..Self::default()
        }
    }

    pub fn with_strides(
        mut self,
        src_strides: impl Into<Vec<usize>>,
        dst_strides: impl Into<Vec<usize>>,
    ) -> Self {
        self.src_strides = src_strides.into();
        self.dst_strides = dst_strides.into();
        self
    }
}

pub mod dft {
    use super::*;

    raw_enum! {
        /// Storage format of one side of a DFT.
        #[derive(Default)]
        pub enum Format: "dft format" {
            Real = 0,
            #[default]
            ComplexInterleaved = 1,
            ComplexPlanar = 2,
            HermitianComplexInterleaved = 3,
            HermitianComplexPlanar = 4,
        }
    }

    impl Format {
        pub fn is_real(self) -> bool {
            self == Format::Real
        }

        pub fn is_planar(self) -> bool {
            matches!(self, Format::ComplexPlanar | Format::HermitianComplexPlanar)
        }

        pub fn is_hermitian(self) -> bool {
            matches!(
                self,
                Format::HermitianComplexInterleaved | Format::HermitianComplexPlanar
            )
        }

        /// Destination formats a source in this format may be paired with.
        ///
        /// A real source may produce a Hermitian half spectrum, and a complex
        /// source paired with a real side uses the Hermitian-compressed layout,
        /// so only a Hermitian source is restricted to a real destination.
        pub fn compatible_destinations(self) -> &'static [Format] {
            match self {
                Format::Real => &[
                    Format::ComplexInterleaved,
                    Format::ComplexPlanar,
                    Format::HermitianComplexInterleaved,
                    Format::HermitianComplexPlanar,
                ],
                Format::ComplexInterleaved | Format::ComplexPlanar => &[
                    Format::ComplexInterleaved,
                    Format::ComplexPlanar,
                    Format::Real,
                ],
                Format::HermitianComplexInterleaved | Format::HermitianComplexPlanar => {
                    &[Format::Real]
                }
            }
        }
    }

    /// Shorthand for the three DFT kinds.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub enum Type {
        ComplexToComplex,
        RealToComplex,
        ComplexToReal,
    }

    /// Parameters of a discrete Fourier transform.
    #[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Parameters {
        pub direction: Direction,
        pub precision: PrecisionTriad,
        pub dimensions: Dimensions,
        pub axes: Axes,
        pub normalization: Normalization,
        pub placement: Placement,
        pub src_format: Format,
        pub dst_format: Format,
    }

    impl Parameters {
        /// Complex-to-complex interleaved transform over all axes of `shape`.
        pub fn c2c(direction: Direction, shape: impl Into<Vec<usize>>) -> Self {
            Self {
                direction,
                dimensions: Dimensions::new(shape),
                ..Self::default()
            }
        }

        /// Forward real-to-complex transform; the last axis is Hermitian-compressed.
        pub fn r2c(shape: impl Into<Vec<usize>>) -> Self {
            Self {
                direction: Direction::Forward,
                dimensions: Dimensions::new(shape),
                src_format: Format::Real,
                dst_format: Format::ComplexInterleaved,
                ..Self::default()
            }
        }

        /// Inverse complex-to-real transform; the last axis is Hermitian-compressed.
        pub fn c2r(shape: impl Into<Vec<usize>>) -> Self {
            Self {
                direction: Direction::Inverse,
                dimensions: Dimensions::new(shape),
                src_format: Format::ComplexInterleaved,
                dst_format: Format::Real,
                ..Self::default()
            }
        }

        pub fn kind(&self) -> Type {
            match (self.src_format.is_real(), self.dst_format.is_real()) {
                (true, _) => Type::RealToComplex,
                (false, true) => Type::ComplexToReal,
                (false, false) => Type::ComplexToComplex,
            }
        }

        pub fn with_precision(mut self, precision: PrecisionTriad) -> Self {
            self.precision = precision;
            self
        }

        pub fn with_axes(mut self, axes: impl Into<Axes>) -> Self {
            self.axes = axes.into();
            self
        }

        pub fn with_normalization(mut self, normalization: Normalization) -> Self {
            self.normalization = normalization;
            self
        }

        pub fn with_placement(mut self, placement: Placement) -> Self {
            self.placement = placement;
            self
        }

        pub fn with_formats(mut self, src: Format, dst: Format) -> Self {
            self.src_format = src;
            self.dst_format = dst;
            self
        }
    }
}

pub mod dht {
    use super::*;

    raw_enum! {
        /// Discrete Hartley transform variant.
        #[derive(Default)]
        pub enum Type: "dht type" {
            /// one 1D Hartley transform per axis
            #[default]
            Separable = 0,
        }
    }

    /// Parameters of a discrete Hartley transform. Both sides are real.
    #[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Parameters {
        pub direction: Direction,
        pub precision: PrecisionTriad,
        pub dimensions: Dimensions,
        pub axes: Axes,
        pub normalization: Normalization,
        pub placement: Placement,
        pub kind: Type,
    }

    impl Parameters {
        pub fn new(direction: Direction, shape: impl Into<Vec<usize>>) -> Self {
            Self {
                direction,
                dimensions: Dimensions::new(shape),
                ..Self::default()
            }
        }
    }
}

pub mod dtt {
    use super::*;

    raw_enum! {
        /// Discrete cosine or sine transform variant, FFTW conventions.
        pub enum Type: "dtt type" {
            Dct1 = 0,
            Dct2 = 1,
            Dct3 = 2,
            Dct4 = 3,
            Dst1 = 4,
            Dst2 = 5,
            Dst3 = 6,
            Dst4 = 7,
        }
    }

    impl Type {
        pub const DCT: Type = Type::Dct2;
        pub const DST: Type = Type::Dst2;

        /// The type whose transform undoes this one up to scaling.
        pub fn inverse(self) -> Type {
            match self {
                Type::Dct2 => Type::Dct3,
                Type::Dct3 => Type::Dct2,
                Type::Dst2 => Type::Dst3,
                Type::Dst3 => Type::Dst2,
                other => other,
            }
        }

        /// Length of the equivalent real DFT, used for normalization.
        pub fn logical_size(self, size: usize) -> usize {
            match self {
                Type::Dct1 => 2 * size.saturating_sub(1),
                Type::Dst1 => 2 * (size + 1),
                _ => 2 * size,
            }
        }
    }

    /// Parameters of a discrete trigonometric transform. Both sides are real.
    ///
    /// `types` holds either one type for every axis or one type per axis.
    #[derive(Clone, Debug, PartialEq, Eq, Hash)]
    pub struct Parameters {
        pub direction: Direction,
        pub precision: PrecisionTriad,
        pub dimensions: Dimensions,
        pub axes: Axes,
        pub normalization: Normalization,
        pub placement: Placement,
        pub types: Vec<Type>,
    }

    impl Default for Parameters {
        fn default() -> Self {
            Self {
                direction: Direction::default(),
                precision: PrecisionTriad::default(),
                dimensions: Dimensions::default(),
                axes: Axes::default(),
                normalization: Normalization::default(),
                placement: Placement::default(),
                types: vec![Type::DCT],
            }
        }
    }

    impl Parameters {
        pub fn new(direction: Direction, kind: Type, shape: impl Into<Vec<usize>>) -> Self {
            Self {
                direction,
                dimensions: Dimensions::new(shape),
                types: vec![kind],
                ..Self::default()
            }
        }
    }
}

/// Parameters of any transform family.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TransformParameters {
    Dft(dft::Parameters),
    Dht(dht::Parameters),
    Dtt(dtt::Parameters),
}

impl TransformParameters {
    pub fn transform(&self) -> Transform {
        match self {
            TransformParameters::Dft(_) => Transform::Dft,
            TransformParameters::Dht(_) => Transform::Dht,
            TransformParameters::Dtt(_) => Transform::Dtt,
        }
    }
}

impl From<dft::Parameters> for TransformParameters {
    fn from(params: dft::Parameters) -> Self {
        TransformParameters::Dft(params)
    }
}

impl From<dht::Parameters> for TransformParameters {
    fn from(params: dht::Parameters) -> Self {
        TransformParameters::Dht(params)
    }
}

impl From<dtt::Parameters> for TransformParameters {
    fn from(params: dtt::Parameters) -> Self {
        TransformParameters::Dtt(params)
    }
}
