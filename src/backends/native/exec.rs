//! Precision-generic execution of one native plan.

use std::sync::Arc;

use super::fft::{Fft, FftPlanner};
use super::trig::{hartley, Dtt, DttPlanner};
use crate::backend::Backend;
use crate::backends::lines;
use crate::common::{Direction, Normalization};
use crate::config::TransformKind;
use crate::desc::Desc;
use crate::error::{Error, Result, Side};
use crate::num::{Complex, Float};
use crate::plan::BufferPtr;
use crate::types::Element;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Scalar type the native kernels run in.
pub trait Scalar: Float + Element + Default {}

impl Scalar for f32 {}
impl Scalar for f64 {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Op {
    C2c,
    R2c,
    C2r,
    Dht,
    Dtt,
}

/// Per-thread buffers reused across lines.
struct Scratch<T> {
    fft: Vec<Complex<T>>,
    work: Vec<Complex<T>>,
    real: Vec<T>,
}

impl<T> Default for Scratch<T> {
    fn default() -> Self {
        Self {
            fft: Vec::new(),
            work: Vec::new(),
            real: Vec::new(),
        }
    }
}

/// Kernel of one transform axis.
#[derive(Debug)]
enum AxisKernel<T> {
    Fft(Arc<Fft<T>>),
    Dtt(Arc<Dtt<T>>),
}

/// Everything a native plan precomputes for one precision.
#[derive(Debug)]
pub struct Exec<T> {
    op: Op,
    direction: Direction,
    axes: Vec<usize>,
    kernels: Vec<AxisKernel<T>>,
    /// `None` when no normalization applies in this direction.
    scale: Option<T>,
    cost: f64,
}

fn decline(message: &str) -> Error {
    Error::backend(Backend::Native, message)
}

impl<T: Scalar> Exec<T> {
    pub fn new(desc: &Desc) -> Result<Self> {
        let config = desc.transform_config();
        let direction = desc.direction();
        let shape = desc.shape();
        let axes = desc.transform_axes().to_vec();

        let op = match config.kind() {
            TransformKind::Dft {
                src_format,
                dst_format,
            } => match (src_format.is_real(), dst_format.is_real()) {
                (false, false) => Op::C2c,
                (true, _) if direction == Direction::Forward => Op::R2c,
                (true, _) => return Err(decline("real-to-complex transforms run forward only")),
                (_, true) if direction == Direction::Inverse => Op::C2r,
                (_, true) => return Err(decline("complex-to-real transforms run inverse only")),
            },
            TransformKind::Dht { .. } => Op::Dht,
            TransformKind::Dtt { .. } => Op::Dtt,
        };

        let mut kernels = Vec::with_capacity(axes.len());
        let mut cost = 0.0;
        let points = shape.iter().product::<usize>() as f64;
        if op == Op::Dtt {
            let types = config.dtt_types().unwrap_or(&[]);
            let mut planner = DttPlanner::<T>::new();
            for (&axis, &ty) in axes.iter().zip(types) {
                let ty = match direction {
                    Direction::Forward => ty,
                    Direction::Inverse => ty.inverse(),
                };
                let dtt = planner
                    .plan(ty, shape[axis])
                    .ok_or_else(|| decline("DCT-I needs at least two points"))?;
                cost += points * shape[axis] as f64;
                kernels.push(AxisKernel::Dtt(dtt));
            }
        } else {
            let mut planner = FftPlanner::<T>::new();
            for &axis in &axes {
                let n = shape[axis];
                let fft = planner.plan(n);
                let log = (n.max(2) as f64).log2();
                let factor = if n.is_power_of_two() { 5.0 } else { 15.0 };
                cost += points * factor * log;
                kernels.push(AxisKernel::Fft(fft));
            }
        }

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
            op,
            direction,
            axes,
            kernels,
            scale,
            cost,
        })
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Run the transform from `src` into `dst`.
    ///
    /// # Safety
    /// Both buffers must be valid for the extents and strides of `desc`, with
    /// elements of this precision.
    pub unsafe fn run(&self, desc: &Desc, src: BufferPtr, dst: BufferPtr, pool: Option<&Pool>) -> Result<()> {
        let shape = desc.shape();
        let src_shape = desc.logical_shape(Side::Source);
        let dst_shape = desc.logical_shape(Side::Destination);
        match self.op {
            Op::C2c => {
                let mut data = read_complex::<T>(src, &src_shape, desc.src_strides());
                for (&axis, kernel) in self.axes.iter().zip(&self.kernels) {
                    if let AxisKernel::Fft(fft) = kernel {
                        let direction = self.direction;
                        along_axis(pool, &mut data, shape, axis, |line, s: &mut Scratch<T>| {
                            fft.process(line, direction, &mut s.fft)
                        });
                    }
                }
                self.apply_scale_complex(&mut data);
                write_complex(dst, &data, &dst_shape, desc.dst_strides());
            }
            Op::R2c => {
                let real = lines::gather(src.real() as *const T, &src_shape, desc.src_strides());
                let mut data: Vec<Complex<T>> =
                    real.into_iter().map(|x| Complex::new(x, T::zero())).collect();
                for (&axis, kernel) in self.axes.iter().zip(&self.kernels) {
                    if let AxisKernel::Fft(fft) = kernel {
                        along_axis(pool, &mut data, shape, axis, |line, s: &mut Scratch<T>| {
                            fft.process(line, Direction::Forward, &mut s.fft)
                        });
                    }
                }
                // Keep the non-redundant half along the last transform axis.
                let full = lines::dense_strides(shape);
                let mut half = vec![Complex::zero(); dst_shape.iter().product()];
                lines::for_each_offset(&dst_shape, &full, |dense, offset| {
                    half[dense] = data[offset];
                });
                self.apply_scale_complex(&mut half);
                write_complex(dst, &half, &dst_shape, desc.dst_strides());
            }
            Op::C2r => {
                let mut half = read_complex::<T>(src, &src_shape, desc.src_strides());
                let (&last, outer) = match self.axes.split_last() {
                    Some(split) => split,
                    None => return Ok(()),
                };
                for (&axis, kernel) in outer.iter().zip(&self.kernels) {
                    if let AxisKernel::Fft(fft) = kernel {
                        along_axis(pool, &mut half, &src_shape, axis, |line, s: &mut Scratch<T>| {
                            fft.process(line, Direction::Inverse, &mut s.fft)
                        });
                    }
                }
                let Some(AxisKernel::Fft(fft)) = self.kernels.last() else {
                    return Err(decline("missing kernel for the last axis"));
                };
                let mut out = expand_hermitian(fft, &half, &src_shape, shape, last);
                self.apply_scale_real(&mut out);
                lines::scatter(&out, dst.real() as *mut T, shape, desc.dst_strides());
            }
            Op::Dht => {
                let mut data = lines::gather(src.real() as *const T, &src_shape, desc.src_strides());
                for (&axis, kernel) in self.axes.iter().zip(&self.kernels) {
                    if let AxisKernel::Fft(fft) = kernel {
                        along_axis(pool, &mut data, shape, axis, |line, s: &mut Scratch<T>| {
                            hartley(fft, line, &mut s.work, &mut s.fft)
                        });
                    }
                }
                self.apply_scale_real(&mut data);
                lines::scatter(&data, dst.real() as *mut T, &dst_shape, desc.dst_strides());
            }
            Op::Dtt => {
                let mut data = lines::gather(src.real() as *const T, &src_shape, desc.src_strides());
                for (&axis, kernel) in self.axes.iter().zip(&self.kernels) {
                    if let AxisKernel::Dtt(dtt) = kernel {
                        along_axis(pool, &mut data, shape, axis, |line, s: &mut Scratch<T>| {
                            s.real.clear();
                            s.real.resize(line.len(), T::zero());
                            dtt.process(line, &mut s.real);
                            line.copy_from_slice(&s.real);
                        });
                    }
                }
                self.apply_scale_real(&mut data);
                lines::scatter(&data, dst.real() as *mut T, &dst_shape, desc.dst_strides());
            }
        }
        Ok(())
    }

    fn apply_scale_complex(&self, data: &mut [Complex<T>]) {
        if let Some(scale) = self.scale {
            for c in data {
                *c = c.scale(scale);
            }
        }
    }

    fn apply_scale_real(&self, data: &mut [T]) {
        if let Some(scale) = self.scale {
            for x in data {
                *x = *x * scale;
            }
        }
    }
}

/// Rebuild each line of the last axis from its `n/2 + 1` Hermitian half,
/// inverse transform it and keep the real part.
fn expand_hermitian<T: Scalar>(
    fft: &Fft<T>,
    half: &[Complex<T>],
    half_shape: &[usize],
    shape: &[usize],
    axis: usize,
) -> Vec<T> {
    let n = shape[axis];
    let m = half_shape[axis];
    let half_stride = lines::dense_strides(half_shape)[axis];
    let out_stride = lines::dense_strides(shape)[axis];
    let mut out = vec![T::zero(); shape.iter().product()];
    let mut line = vec![Complex::zero(); n];
    let mut scratch = Vec::new();
    let starts = lines::line_starts(half_shape, axis)
        .into_iter()
        .zip(lines::line_starts(shape, axis));
    for (h, o) in starts {
        for k in 0..n {
            line[k] = if k < m {
                half[h + k * half_stride]
            } else {
                half[h + (n - k) * half_stride].conj()
            };
        }
        fft.process(&mut line, Direction::Inverse, &mut scratch);
        for (k, c) in line.iter().enumerate() {
            out[o + k * out_stride] = c.re;
        }
    }
    out
}

#[cfg(feature = "parallel")]
pub type Pool = rayon::ThreadPool;

/// Placeholder so sequential builds share the signatures.
#[cfg(not(feature = "parallel"))]
pub enum Pool {}

#[cfg(feature = "parallel")]
fn parallel_threshold() -> usize {
    use std::sync::OnceLock;
    static THRESHOLD: OnceLock<usize> = OnceLock::new();
    *THRESHOLD.get_or_init(|| {
        std::env::var("OMNIFFT_PARALLEL_THRESHOLD")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(1 << 14)
    })
}

/// Run `f` on every line of `data` along `axis`. Lines of the innermost axis
/// are contiguous and go to the pool when the array is large enough.
fn along_axis<E, T, F>(pool: Option<&Pool>, data: &mut [E], shape: &[usize], axis: usize, f: F)
where
    E: Copy + Default + Send + Sync,
    T: Scalar,
    F: Fn(&mut [E], &mut Scratch<T>) + Send + Sync,
{
    let n = shape[axis];
    #[cfg(feature = "parallel")]
    if let Some(pool) = pool {
        if axis + 1 == shape.len() && data.len() >= parallel_threshold() {
            pool.install(|| {
                data.par_chunks_mut(n)
                    .for_each_init(Scratch::<T>::default, |s, line| f(line, s))
            });
            return;
        }
    }
    #[cfg(not(feature = "parallel"))]
    let _ = pool;

    let mut scratch = Scratch::<T>::default();
    if axis + 1 == shape.len() {
        for line in data.chunks_mut(n) {
            f(line, &mut scratch);
        }
    } else {
        let mut line = Vec::with_capacity(n);
        lines::for_each_line(data, shape, axis, &mut line, |l| f(l, &mut scratch));
    }
}

unsafe fn read_complex<T: Scalar>(ptr: BufferPtr, shape: &[usize], strides: &[usize]) -> Vec<Complex<T>> {
    match ptr {
        BufferPtr::Interleaved(p) => lines::gather(p as *const Complex<T>, shape, strides),
        BufferPtr::Planar { real, imag } => {
            lines::gather_planar(real as *const T, imag as *const T, shape, strides)
        }
    }
}

unsafe fn write_complex<T: Scalar>(ptr: BufferPtr, data: &[Complex<T>], shape: &[usize], strides: &[usize]) {
    match ptr {
        BufferPtr::Interleaved(p) => lines::scatter(data, p as *mut Complex<T>, shape, strides),
        BufferPtr::Planar { real, imag } => {
            lines::scatter_planar(data, real as *mut T, imag as *mut T, shape, strides)
        }
    }
}
