//! CPU backend over the `rustfft` and `realfft` crates.
//!
//! Handles interleaved DFTs only: complex-to-complex through `rustfft`,
//! real-to-complex and complex-to-real through `realfft` along the last
//! transform axis. Hartley and trigonometric transforms, planar formats and
//! non-uniform precisions are declined so the factory falls back to another
//! backend.

use std::sync::Arc;

use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftDirection, FftNum, FftPlanner};

use crate::architecture::cpu;
use crate::backend::Backend;
use crate::backends::lines;
use crate::common::{Direction, Distribution, Normalization, Target};
use crate::config::TransformKind;
use crate::desc::Desc;
use crate::error::{Error, Result, Side};
use crate::init::InitParameters;
use crate::num::Float;
use crate::plan::{BufferPtr, PlanImpl};
use crate::registry::BackendModule;
use crate::types::{Element, Precision};

fn decline(message: impl Into<String>) -> Error {
    Error::backend(Backend::RustFft, message)
}

/// Registry entry of the `rustfft` backend.
#[derive(Debug, Default)]
pub struct RustFftModule;

impl BackendModule for RustFftModule {
    fn backend(&self) -> Backend {
        Backend::RustFft
    }

    fn init(&self, _params: &InitParameters) -> Result<()> {
        debug_log!("rustfft backend ready");
        Ok(())
    }

    fn make_plan_impl(&self, desc: &Desc) -> Result<Box<dyn PlanImpl>> {
        Ok(Box::new(RustFftPlan::new(desc)?))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    C2c,
    R2c,
    C2r,
}

struct Engine<T: FftNum> {
    kind: Kind,
    axes: Vec<usize>,
    /// Complex kernels of every axis the complex pass covers: all axes for
    /// c2c, all but the last for r2c and c2r.
    complex: Vec<Arc<dyn Fft<T>>>,
    r2c: Option<Arc<dyn RealToComplex<T>>>,
    c2r: Option<Arc<dyn ComplexToReal<T>>>,
    scale: Option<T>,
    cost: f64,
}

impl<T> Engine<T>
where
    T: FftNum + Float + Element + Default,
{
    fn new(desc: &Desc) -> Result<Self> {
        let TransformKind::Dft {
            src_format,
            dst_format,
        } = desc.transform_config().kind()
        else {
            return Err(decline("only discrete Fourier transforms are supported"));
        };
        if src_format.is_planar() || dst_format.is_planar() {
            return Err(decline("planar formats are not supported"));
        }
        let direction = desc.direction();
        let kind = match (src_format.is_real(), dst_format.is_real(), direction) {
            (false, false, _) => Kind::C2c,
            (true, _, Direction::Forward) => Kind::R2c,
            (_, true, Direction::Inverse) => Kind::C2r,
            _ => return Err(decline("real transforms must run forward from real or inverse to real")),
        };

        let shape = desc.shape();
        let axes = desc.transform_axes().to_vec();
        let fft_direction = match direction {
            Direction::Forward => FftDirection::Forward,
            Direction::Inverse => FftDirection::Inverse,
        };
        let points = shape.iter().product::<usize>() as f64;
        let cost = axes
            .iter()
            .map(|&axis| points * (shape[axis].max(2) as f64).log2())
            .sum();

        let mut planner = FftPlanner::<T>::new();
        let complex_axes = match kind {
            Kind::C2c => &axes[..],
            Kind::R2c | Kind::C2r => &axes[..axes.len() - 1],
        };
        let complex = complex_axes
            .iter()
            .map(|&axis| planner.plan_fft(shape[axis], fft_direction))
            .collect();

        let last = desc.transform_config().last_axis();
        let mut real_planner = RealFftPlanner::<T>::new();
        let r2c = (kind == Kind::R2c).then(|| real_planner.plan_fft_forward(shape[last]));
        let c2r = (kind == Kind::C2r).then(|| real_planner.plan_fft_inverse(shape[last]));

        let applies = match desc.normalization() {
            Normalization::None => false,
            Normalization::Orthogonal => true,
            Normalization::Unitary => direction == Direction::Inverse,
        };
        let scale = if applies {
            Some(desc.norm_factor::<T>()?)
        } else {
            None
        };

        Ok(Self {
            kind,
            axes,
            complex,
            r2c,
            c2r,
            scale,
            cost,
        })
    }

    /// # Safety
    /// `src` and `dst` must be valid interleaved buffers for `desc`.
    unsafe fn run(&self, desc: &Desc, src: BufferPtr, dst: BufferPtr) -> Result<()> {
        let shape = desc.shape();
        let src_shape = desc.logical_shape(Side::Source);
        let dst_shape = desc.logical_shape(Side::Destination);
        let last = desc.transform_config().last_axis();
        match self.kind {
            Kind::C2c => {
                let mut data: Vec<Complex<T>> =
                    lines::gather(src.real() as *const Complex<T>, &src_shape, desc.src_strides());
                for (&axis, fft) in self.axes.iter().zip(&self.complex) {
                    complex_axis(&mut data, shape, axis, fft.as_ref());
                }
                self.scale_complex(&mut data);
                lines::scatter(&data, dst.real() as *mut Complex<T>, &dst_shape, desc.dst_strides());
            }
            Kind::R2c => {
                let r2c = self.r2c.as_ref().ok_or_else(|| decline("missing real kernel"))?;
                let real: Vec<T> = lines::gather(src.real() as *const T, &src_shape, desc.src_strides());
                let zero = <T as Float>::zero();
                let mut half = vec![Complex::new(zero, zero); dst_shape.iter().product()];
                let mut input = r2c.make_input_vec();
                let mut output = r2c.make_output_vec();
                let mut scratch = r2c.make_scratch_vec();
                let (in_stride, out_stride) = (stride_of(shape, last), stride_of(&dst_shape, last));
                let starts = lines::line_starts(shape, last)
                    .into_iter()
                    .zip(lines::line_starts(&dst_shape, last));
                for (i, o) in starts {
                    for (k, v) in input.iter_mut().enumerate() {
                        *v = real[i + k * in_stride];
                    }
                    r2c.process_with_scratch(&mut input, &mut output, &mut scratch)
                        .map_err(|e| decline(e.to_string()))?;
                    for (k, v) in output.iter().enumerate() {
                        half[o + k * out_stride] = *v;
                    }
                }
                for (&axis, fft) in self.axes.iter().zip(&self.complex) {
                    complex_axis(&mut half, &dst_shape, axis, fft.as_ref());
                }
                self.scale_complex(&mut half);
                lines::scatter(&half, dst.real() as *mut Complex<T>, &dst_shape, desc.dst_strides());
            }
            Kind::C2r => {
                let c2r = self.c2r.as_ref().ok_or_else(|| decline("missing real kernel"))?;
                let mut half: Vec<Complex<T>> =
                    lines::gather(src.real() as *const Complex<T>, &src_shape, desc.src_strides());
                for (&axis, fft) in self.axes.iter().zip(&self.complex) {
                    complex_axis(&mut half, &src_shape, axis, fft.as_ref());
                }
                let n = shape[last];
                let mut out = vec![<T as Float>::zero(); shape.iter().product()];
                let mut input = c2r.make_input_vec();
                let mut output = c2r.make_output_vec();
                let mut scratch = c2r.make_scratch_vec();
                let (in_stride, out_stride) = (stride_of(&src_shape, last), stride_of(shape, last));
                let starts = lines::line_starts(&src_shape, last)
                    .into_iter()
                    .zip(lines::line_starts(shape, last));
                for (h, o) in starts {
                    for (k, v) in input.iter_mut().enumerate() {
                        *v = half[h + k * in_stride];
                    }
                    // The DC term, and the Nyquist term of even lengths, are
                    // real in a Hermitian spectrum.
                    input[0].im = <T as Float>::zero();
                    if n % 2 == 0 {
                        if let Some(nyquist) = input.last_mut() {
                            nyquist.im = <T as Float>::zero();
                        }
                    }
                    c2r.process_with_scratch(&mut input, &mut output, &mut scratch)
                        .map_err(|e| decline(e.to_string()))?;
                    for (k, v) in output.iter().enumerate() {
                        out[o + k * out_stride] = *v;
                    }
                }
                if let Some(scale) = self.scale {
                    for x in &mut out {
                        *x = *x * scale;
                    }
                }
                lines::scatter(&out, dst.real() as *mut T, shape, desc.dst_strides());
            }
        }
        Ok(())
    }

    fn scale_complex(&self, data: &mut [Complex<T>]) {
        if let Some(scale) = self.scale {
            for c in data {
                *c = Complex::new(c.re * scale, c.im * scale);
            }
        }
    }
}

fn stride_of(shape: &[usize], axis: usize) -> usize {
    lines::dense_strides(shape)[axis]
}

/// Transform every line of `data` along `axis` with `fft`.
fn complex_axis<T: FftNum + Default>(data: &mut [Complex<T>], shape: &[usize], axis: usize, fft: &dyn Fft<T>) {
    let mut scratch = vec![Complex::new(T::zero(), T::zero()); fft.get_inplace_scratch_len()];
    if axis + 1 == shape.len() {
        // rustfft transforms consecutive chunks of its length in one call.
        fft.process_with_scratch(data, &mut scratch);
    } else {
        let mut line = Vec::with_capacity(shape[axis]);
        lines::for_each_line(data, shape, axis, &mut line, |l| {
            fft.process_with_scratch(l, &mut scratch)
        });
    }
}

enum Typed {
    F32(Engine<f32>),
    F64(Engine<f64>),
}

/// A plan bound to the `rustfft` backend.
pub struct RustFftPlan {
    engine: Typed,
}

impl core::fmt::Debug for RustFftPlan {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RustFftPlan")
            .field("cost", &self.cost_estimate())
            .finish_non_exhaustive()
    }
}

impl RustFftPlan {
    pub fn new(desc: &Desc) -> Result<Self> {
        if desc.target() != Target::Cpu || desc.distribution() != Distribution::Spst {
            return Err(decline("only single-process CPU transforms are supported"));
        }
        let precision = desc.precision();
        if !precision.is_uniform() {
            return Err(decline("mixed precisions are not supported"));
        }
        let engine = match precision.execution {
            Precision::F32 => Typed::F32(Engine::new(desc)?),
            Precision::F64 => Typed::F64(Engine::new(desc)?),
            other => return Err(decline(format!("unsupported precision {other:?}"))),
        };
        Ok(Self { engine })
    }
}

impl PlanImpl for RustFftPlan {
    fn backend(&self) -> Backend {
        Backend::RustFft
    }

    fn cost_estimate(&self) -> Option<f64> {
        Some(match &self.engine {
            Typed::F32(e) => e.cost,
            Typed::F64(e) => e.cost,
        })
    }

    fn execute_cpu_spst(
        &mut self,
        desc: &Desc,
        src: &[BufferPtr],
        dst: &[BufferPtr],
        _params: &cpu::ExecutionParameters,
    ) -> Result<()> {
        let (Some(&src), Some(&dst)) = (src.first(), dst.first()) else {
            return Err(decline("missing buffer"));
        };
        // SAFETY: the plan validated the buffers against the descriptor.
        unsafe {
            match &self.engine {
                Typed::F32(e) => e.run(desc, src, dst),
                Typed::F64(e) => e.run(desc, src, dst),
            }
        }
    }
}
