//! Error types.

use core::fmt;

use crate::backend::{Backend, Feedback};
use crate::common::{Distribution, Placement, Target};
use crate::transform::dft;
use crate::types::{Precision, TypeProps};

pub type Result<T> = core::result::Result<T, Error>;

/// Which buffer of a transform an argument refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Source,
    Destination,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::Source => "source",
            Side::Destination => "destination",
        })
    }
}

/// The precondition a caller-supplied value violated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvalidArgument {
    /// Raw value is not one of the enumerators of `what`.
    InvalidValue { what: &'static str, raw: u8 },
    /// Element `index` of a sequence of `what` is invalid.
    InvalidElement { what: &'static str, index: usize },
    InvalidAlignment(usize),

    EmptyAxes,
    TooManyAxes { count: usize },
    AxesExceedRank { count: usize, rank: usize },
    AxisOutOfRange { axis: usize, rank: usize },
    DuplicateAxis(usize),

    EmptyShape,
    TooManyDimensions(usize),
    ZeroExtent { dim: usize },
    StrideCount { side: Side, expected: usize, actual: usize },
    ZeroStride { side: Side, index: usize },

    IncompatibleFormats { src: dft::Format, dst: dft::Format },
    DttTypeCount { expected: usize, actual: usize },
    /// DCT-I needs at least two points along each of its axes.
    DctOneTooShort { axis: usize },

    InvalidDevice(i32),
    NoDevices,
    DuplicateDevice(i32),
    BlockCount { side: Side, expected: usize, actual: usize },
    BlockRank { side: Side, rank: usize },
    BlockOutOfBounds { side: Side, dim: usize },

    ParametersKind { expected: &'static str },
    NormPrecision { expected: Precision, actual: Precision },
    UnrepresentableSize(usize),

    BufferCount { side: Side, expected: usize, actual: usize },
    PlacementMismatch { expected: Placement, actual: Placement },
    /// Some source/destination pairs alias and others do not.
    MixedPlacement,
    /// Pair `index` shares some but not all of its addresses.
    PartialOverlap { index: usize },
    SourceNotPreserved,
    TypeMismatch { side: Side, actual: TypeProps },
    /// Planar buffer given for an interleaved side, or the other way round.
    FormatMismatch { side: Side, planar: bool },
    NullBuffer { side: Side, index: usize },
    BufferTooSmall { side: Side, required: usize, actual: usize },
    ExecutionTargetMismatch {
        expected: (Target, Distribution),
        actual: (Target, Distribution),
    },
    WorkspaceCount { expected: usize, actual: usize },
    MissingWorkspace { index: usize },
}

impl fmt::Display for InvalidArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use InvalidArgument::*;
        match self {
            InvalidValue { what, raw } => write!(f, "invalid {what} value {raw}"),
            InvalidElement { what, index } => write!(f, "invalid {what} at index {index}"),
            InvalidAlignment(a) => write!(f, "alignment {a} is not a power of two"),
            EmptyAxes => write!(f, "transform axes are empty"),
            TooManyAxes { count } => write!(
                f,
                "{count} transform axes exceed the maximum of {}",
                crate::common::MAX_DIM_COUNT
            ),
            AxesExceedRank { count, rank } => {
                write!(f, "{count} transform axes exceed shape rank {rank}")
            }
            AxisOutOfRange { axis, rank } => {
                write!(f, "transform axis {axis} is out of range for shape rank {rank}")
            }
            DuplicateAxis(axis) => write!(f, "transform axis {axis} appears more than once"),
            EmptyShape => write!(f, "shape is empty"),
            TooManyDimensions(rank) => write!(
                f,
                "shape rank {rank} exceeds the maximum of {}",
                crate::common::MAX_DIM_COUNT
            ),
            ZeroExtent { dim } => write!(f, "shape dimension {dim} is zero"),
            StrideCount {
                side,
                expected,
                actual,
            } => write!(f, "{side} strides have {actual} entries, expected 0 or {expected}"),
            ZeroStride { side, index } => write!(f, "{side} stride {index} is zero"),
            IncompatibleFormats { src, dst } => {
                write!(f, "dft formats {src:?} -> {dst:?} are incompatible")
            }
            DttTypeCount { expected, actual } => write!(
                f,
                "invalid dtt transform types: got {actual}, expected 1 or {expected}"
            ),
            DctOneTooShort { axis } => {
                write!(f, "dct-i axis {axis} has fewer than 2 points")
            }
            InvalidDevice(device) => write!(f, "invalid device {device}"),
            NoDevices => write!(f, "no devices given"),
            DuplicateDevice(device) => write!(f, "device {device} given more than once"),
            BlockCount {
                side,
                expected,
                actual,
            } => write!(f, "{actual} {side} memory blocks given, expected {expected}"),
            BlockRank { side, rank } => {
                write!(f, "{side} memory block does not match shape rank {rank}")
            }
            BlockOutOfBounds { side, dim } => {
                write!(f, "{side} memory block exceeds the shape in dimension {dim}")
            }
            ParametersKind { expected } => write!(f, "descriptor does not hold {expected}"),
            NormPrecision { expected, actual } => write!(
                f,
                "normalization factor requested in {actual}, execution precision is {expected}"
            ),
            UnrepresentableSize(n) => {
                write!(f, "transform size {n} is not representable in the execution precision")
            }
            BufferCount {
                side,
                expected,
                actual,
            } => write!(f, "invalid {side} buffer count {actual}, expected {expected}"),
            PlacementMismatch { expected, actual } => write!(
                f,
                "placement does not match plan placement: buffers are {actual}, plan is {expected}"
            ),
            MixedPlacement => write!(
                f,
                "source and destination buffers are neither all in-place nor all out-of-place"
            ),
            PartialOverlap { index } => write!(
                f,
                "source and destination buffer {index} partially overlap"
            ),
            SourceNotPreserved => write!(f, "running destructive transform on const source data"),
            TypeMismatch { side, actual } => {
                write!(f, "{side} element type {actual} does not match the plan")
            }
            FormatMismatch { side, planar } => write!(
                f,
                "{side} buffer is {} but the plan expects {}",
                if *planar { "planar" } else { "interleaved" },
                if *planar { "interleaved" } else { "planar" }
            ),
            NullBuffer { side, index } => write!(f, "{side} buffer {index} is null"),
            BufferTooSmall {
                side,
                required,
                actual,
            } => write!(f, "{side} buffer holds {actual} bytes, {required} required"),
            ExecutionTargetMismatch { expected, actual } => write!(
                f,
                "execution parameters are for {} {}, plan is {} {}",
                actual.0, actual.1, expected.0, expected.1
            ),
            WorkspaceCount { expected, actual } => {
                write!(f, "{actual} workspaces given, expected {expected}")
            }
            MissingWorkspace { index } => write!(f, "external workspace {index} is null"),
        }
    }
}

/// Errors returned by descriptor construction, plan creation and execution.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    InvalidArgument(InvalidArgument),
    /// Every candidate backend declined the descriptor.
    NoSupportedBackend(Vec<Feedback>),
    /// A backend declined or its library reported a failure.
    Backend { backend: Backend, message: String },
    /// A native runtime call returned a failure status.
    Native {
        source: &'static str,
        code: i64,
        message: String,
    },
    Runtime(String),
    /// The backend never implements execution for this target and distribution.
    NotImplemented {
        backend: Backend,
        target: Target,
        distribution: Distribution,
    },
    OutOfMemory { size: usize, alignment: usize },
}

impl Error {
    pub fn backend(backend: Backend, message: impl Into<String>) -> Self {
        Error::Backend {
            backend,
            message: message.into(),
        }
    }

    pub fn not_implemented(backend: Backend, target: Target, distribution: Distribution) -> Self {
        Error::NotImplemented {
            backend,
            target,
            distribution,
        }
    }

    /// Translate a native status into `Ok(())` or `Error::Native`.
    pub fn check<S: NativeStatus>(status: S) -> Result<()> {
        if status.is_ok() {
            Ok(())
        } else {
            Err(Error::Native {
                source: S::SOURCE,
                code: status.code(),
                message: status.message(),
            })
        }
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument(cause) => write!(f, "invalid argument: {cause}"),
            Error::NoSupportedBackend(feedback) => {
                write!(f, "failed to create plan implementation")?;
                for item in feedback {
                    write!(f, "; {}: {}", item.backend, item.message)?;
                }
                Ok(())
            }
            Error::Backend { backend, message } => write!(f, "[{backend} error] {message}"),
            Error::Native {
                source,
                code,
                message,
            } => write!(f, "[{source} error] {message} (code {code})"),
            Error::Runtime(message) => f.write_str(message),
            Error::NotImplemented {
                backend,
                target,
                distribution,
            } => write!(
                f,
                "{backend} backend does not implement {distribution} {target} execution"
            ),
            Error::OutOfMemory { size, alignment } => write!(
                f,
                "out of memory allocating {size} bytes aligned to {alignment}"
            ),
        }
    }
}

impl std::error::Error for Error {}

impl From<InvalidArgument> for Error {
    fn from(cause: InvalidArgument) -> Self {
        Error::InvalidArgument(cause)
    }
}

/// Result code of a native library or runtime call.
pub trait NativeStatus {
    /// Library name used in error messages.
    const SOURCE: &'static str;
    fn is_ok(&self) -> bool;
    fn code(&self) -> i64;
    fn message(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    // FFTW reports success with a non-zero return value.
    struct FftwInitStatus(i32);

    impl NativeStatus for FftwInitStatus {
        const SOURCE: &'static str = "FFTW3";
        fn is_ok(&self) -> bool {
            self.0 != 0
        }
        fn code(&self) -> i64 {
            self.0 as i64
        }
        fn message(&self) -> String {
            "failed to initialize threads".into()
        }
    }

    #[test]
    fn check_translates_native_failure() {
        assert_eq!(Error::check(FftwInitStatus(1)), Ok(()));
        let err = Error::check(FftwInitStatus(0)).unwrap_err();
        assert_eq!(err.to_string(), "[FFTW3 error] failed to initialize threads (code 0)");
    }

    #[test]
    fn backend_error_names_the_backend() {
        let err = Error::backend(Backend::PocketFft, "unsupported precision");
        assert_eq!(err.to_string(), "[PocketFFT error] unsupported precision");
    }

    #[test]
    fn not_implemented_is_descriptive() {
        let err = Error::not_implemented(Backend::Native, Target::Gpu, Distribution::Spmt);
        assert_eq!(
            err.to_string(),
            "native backend does not implement spmt gpu execution"
        );
    }
}
