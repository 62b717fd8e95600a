//! # omnifft - one front-end over many FFT libraries
//!
//! Describe a transform once, let the library pick a backend that can run
//! it, and execute it through a single checked entry point.
//!
//! ## Overview
//!
//! - **Descriptors**: [`Desc`] turns user parameters (transform family,
//!   shape, strides, axes, formats, precision, target) into a validated,
//!   hashable value. Invalid combinations are rejected with a precise
//!   [`InvalidArgument`].
//! - **Backend selection**: [`make_plan`] walks the enabled backends in
//!   preference order and keeps the first (or cheapest) that accepts the
//!   descriptor. [`make_plan_with_feedback`] also reports why each skipped
//!   backend declined.
//! - **Execution**: [`Plan::execute`] checks buffer count, placement, element
//!   types, null addresses and buffer sizes before the backend touches memory.
//! - **Reuse**: [`PlanCache`] keeps recently used plans keyed by descriptor.
//!
//! ## Transforms
//!
//! | Family | Formats | Notes |
//! |--------|---------|-------|
//! | DFT    | complex interleaved/planar, real, Hermitian | r2c forward, c2r inverse |
//! | DHT    | real | separable |
//! | DTT    | real | DCT-I..IV, DST-I..IV, per-axis types |
//!
//! ## Cargo Features
//!
//! - `std` (default): hardware thread detection
//! - `parallel`: run the native backend on a rayon pool
//! - `rustfft`: register a backend over `rustfft` and `realfft`
//! - `verbose-logging`: debug logs through the `log` facade
//! - `internal-tests`: property tests
//!
//! ## Example
//!
//! ```
//! use omnifft::{dft, cpu, make_plan, BackendParameters, Complex32, Desc, Destination, Direction, Source};
//!
//! let desc = Desc::new(dft::Parameters::c2c(Direction::Forward, [8]), cpu::Parameters::default())?;
//! let mut plan = make_plan(desc, &BackendParameters::default())?;
//! let input = vec![Complex32::new(1.0, 0.0); 8];
//! let mut output = vec![Complex32::default(); 8];
//! plan.execute(Source::slice(&input), Destination::slice_mut(&mut output), cpu::ExecutionParameters)?;
//! assert!((output[0].re - 8.0).abs() < 1e-5);
//! # Ok::<(), omnifft::Error>(())
//! ```

#[macro_use]
mod macros;

/// Scalar and complex numbers
pub mod num;

/// Element types and their precision and complexity
pub mod types;

/// Enumerations and small types shared by every layer
pub mod common;

/// Transform parameters: DFT, DHT and DTT
pub mod transform;

/// Target and distribution parameters, execution parameters
pub mod architecture;

/// Validation of typed and raw enumeration values
pub mod validate;

pub mod error;

/// Canonical configuration built from user parameters
pub mod config;

pub mod desc;

/// Backend identifiers, masks and preference tables
pub mod backend;

/// Backend modules and the plan factory
pub mod registry;

/// Plans and their execution checks
pub mod plan;

/// Library initialization and shutdown
pub mod init;

/// GPU runtime abstraction
pub mod gpu;

/// Multi-process runtime abstraction
pub mod mp;

/// Aligned host and unified memory
pub mod memory;

/// Plan cache and handle table
pub mod cache;

/// Backends shipped with the crate
pub mod backends;

pub use architecture::{
    cpu, gpu as gpu_arch, mpst, spmt, ArchitectureParameters, Communicator, ExecutionParameters,
    MemoryBlock, Stream,
};
pub use backend::{
    Backend, BackendMask, BackendParameters, Feedback, SelectStrategy, BACKEND_COUNT,
};
pub use cache::{PlanArena, PlanCache, PlanHandle};
pub use common::{
    Alignment, Axes, Direction, Distribution, Normalization, Placement, PrecisionTriad, Target,
    MAX_DIM_COUNT,
};
pub use desc::Desc;
pub use error::{Error, InvalidArgument, Result, Side};
pub use gpu::{GpuRuntime, GpuStatus};
pub use init::{
    finalize, init, init_scoped, is_initialized, CpuInitParameters, GpuInitParameters, InitGuard,
    InitParameters,
};
pub use memory::{AlignedBuffer, UnifiedBuffer};
pub use mp::MultiProcessRuntime;
pub use num::{Complex, Complex32, Complex64, Float};
pub use plan::{BufferPtr, Destination, Plan, PlanImpl, Source};
pub use registry::{make_plan, make_plan_with_feedback, BackendModule, Registry};
pub use transform::{dft, dht, dtt, Dimensions, Transform, TransformParameters};
pub use types::{Complexity, Element, Precision, RealElement, TypeProps};
pub use validate::{RawEnum, Validate};

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(params: impl Into<TransformParameters>) -> Plan {
        let desc = Desc::new(params, cpu::Parameters::default()).unwrap();
        make_plan(desc, &BackendParameters::only(Backend::Native)).unwrap()
    }

    #[test]
    fn impulse_has_a_flat_spectrum() {
        let mut plan = plan(dft::Parameters::c2c(Direction::Forward, [16]));
        let mut input = vec![Complex32::default(); 16];
        input[0] = Complex32::new(1.0, 0.0);
        let mut output = vec![Complex32::default(); 16];
        plan.execute(Source::slice(&input), Destination::slice_mut(&mut output), cpu::ExecutionParameters)
            .unwrap();
        assert!(output.iter().all(|c| (c.re - 1.0).abs() < 1e-6 && c.im.abs() < 1e-6));
    }

    #[test]
    fn unitary_round_trip_restores_the_signal() {
        let n = 12;
        let x: Vec<Complex64> = (0..n).map(|i| Complex64::new(i as f64, 1.0 - i as f64)).collect();
        let mut spectrum = vec![Complex64::default(); n];
        let mut back = vec![Complex64::default(); n];
        let precision = PrecisionTriad::uniform(Precision::F64);
        let mut fwd = plan(dft::Parameters::c2c(Direction::Forward, [n]).with_precision(precision));
        let mut inv = plan(
            dft::Parameters::c2c(Direction::Inverse, [n])
                .with_precision(precision)
                .with_normalization(Normalization::Unitary),
        );
        fwd.execute(Source::slice(&x), Destination::slice_mut(&mut spectrum), ExecutionParameters::Default)
            .unwrap();
        inv.execute(Source::slice(&spectrum), Destination::slice_mut(&mut back), ExecutionParameters::Default)
            .unwrap();
        for (a, b) in back.iter().zip(&x) {
            assert!((a.re - b.re).abs() < 1e-9 && (a.im - b.im).abs() < 1e-9);
        }
    }

    #[test]
    fn real_input_gives_the_hermitian_half() {
        let mut plan = plan(dft::Parameters::r2c([8]));
        let input = [1.0f32; 8];
        let mut output = vec![Complex32::default(); 5];
        plan.execute(Source::slice(&input), Destination::slice_mut(&mut output), cpu::ExecutionParameters)
            .unwrap();
        assert!((output[0].re - 8.0).abs() < 1e-5);
        assert!(output[1..].iter().all(|c| c.re.abs() < 1e-5 && c.im.abs() < 1e-5));
    }
}
