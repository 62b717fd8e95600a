//! One-dimensional complex FFT kernels for the native backend.
//!
//! Powers of two use a double-buffered Stockham radix-2 pass; every other
//! length goes through Bluestein's chirp-z algorithm on top of it. Kernels are
//! planned once and are immutable afterwards, so the lines of one axis can be
//! transformed concurrently.

use std::sync::Arc;

use hashbrown::HashMap;

use crate::common::Direction;
use crate::num::{Complex, Float};

type Table<T> = Arc<[Complex<T>]>;

/// A planned transform of one length.
#[derive(Debug)]
pub enum Fft<T> {
    /// Lengths 0 and 1.
    Identity,
    Radix2 {
        n: usize,
        /// `exp(-2πi k / n)` for `k = 0..n/2`.
        twiddles: Table<T>,
    },
    Bluestein {
        n: usize,
        chirp: Table<T>,
        /// Forward transform of the conjugate chirp, zero padded to `inner.len()`.
        kernel: Table<T>,
        inner: Arc<Fft<T>>,
    },
}

impl<T: Float> Fft<T> {
    pub fn len(&self) -> usize {
        match self {
            Fft::Identity => 1,
            Fft::Radix2 { n, .. } | Fft::Bluestein { n, .. } => *n,
        }
    }

    /// Unnormalized transform of `data` in place. The inverse is computed as
    /// the conjugate of the forward transform of the conjugate.
    pub fn process(&self, data: &mut [Complex<T>], direction: Direction, scratch: &mut Vec<Complex<T>>) {
        if direction == Direction::Inverse {
            conjugate(data);
        }
        self.forward(data, scratch);
        if direction == Direction::Inverse {
            conjugate(data);
        }
    }

    fn forward(&self, data: &mut [Complex<T>], scratch: &mut Vec<Complex<T>>) {
        match self {
            Fft::Identity => {}
            Fft::Radix2 { n, twiddles } => stockham(&mut data[..*n], twiddles, scratch),
            Fft::Bluestein {
                n,
                chirp,
                kernel,
                inner,
            } => {
                let m = kernel.len();
                let mut a = vec![Complex::zero(); m];
                for (i, slot) in a.iter_mut().take(*n).enumerate() {
                    *slot = data[i] * chirp[i];
                }
                inner.forward(&mut a, scratch);
                for (ai, &bi) in a.iter_mut().zip(kernel.iter()) {
                    *ai = *ai * bi;
                }
                conjugate(&mut a);
                inner.forward(&mut a, scratch);
                conjugate(&mut a);
                let scale = T::one() / T::from_f64(m as f64);
                for (i, out) in data.iter_mut().take(*n).enumerate() {
                    *out = a[i].scale(scale) * chirp[i];
                }
            }
        }
    }
}

fn conjugate<T: Float>(data: &mut [Complex<T>]) {
    for c in data {
        c.im = -c.im;
    }
}

fn stockham<T: Float>(data: &mut [Complex<T>], twiddles: &[Complex<T>], scratch: &mut Vec<Complex<T>>) {
    let n = data.len();
    if scratch.len() < n {
        scratch.resize(n, Complex::zero());
    }
    let mut in_data = true;
    // n1 groups of 2 * n2 points per pass.
    let mut n1 = 1usize;
    let mut n2 = n;
    while n1 < n {
        n2 >>= 1;
        let (src, dst): (&[Complex<T>], &mut [Complex<T>]) = if in_data {
            (&*data, &mut scratch[..n])
        } else {
            (&scratch[..n], &mut *data)
        };
        for k in 0..n1 {
            let w = twiddles[k * n2];
            let base0 = 2 * k * n2;
            let base1 = base0 + n2;
            for j in 0..n2 {
                let u = src[base0 + j];
                let v = src[base1 + j] * w;
                dst[k * n2 + j] = u + v;
                dst[(k + n1) * n2 + j] = u - v;
            }
        }
        in_data = !in_data;
        n1 <<= 1;
    }
    if !in_data {
        data.copy_from_slice(&scratch[..n]);
    }
}

/// Builds [`Fft`] kernels, sharing twiddle tables and Bluestein chirps
/// between lengths.
#[derive(Debug)]
pub struct FftPlanner<T> {
    twiddles: HashMap<usize, Table<T>>,
    plans: HashMap<usize, Arc<Fft<T>>>,
}

impl<T> Default for FftPlanner<T> {
    fn default() -> Self {
        Self {
            twiddles: HashMap::new(),
            plans: HashMap::new(),
        }
    }
}

impl<T: Float> FftPlanner<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn twiddles(&mut self, n: usize) -> Table<T> {
        self.twiddles
            .entry(n)
            .or_insert_with(|| {
                let step = -T::from_f64(2.0) * T::pi() / T::from_f64(n as f64);
                (0..n / 2)
                    .map(|k| Complex::expi(step * T::from_f64(k as f64)))
                    .collect()
            })
            .clone()
    }

    /// The kernel for length `n`.
    pub fn plan(&mut self, n: usize) -> Arc<Fft<T>> {
        if let Some(plan) = self.plans.get(&n) {
            return plan.clone();
        }
        let plan = Arc::new(if n <= 1 {
            Fft::Identity
        } else if n.is_power_of_two() {
            Fft::Radix2 {
                n,
                twiddles: self.twiddles(n),
            }
        } else {
            self.bluestein(n)
        });
        debug_log!("native fft: planned length {n}");
        self.plans.insert(n, plan.clone());
        plan
    }

    fn bluestein(&mut self, n: usize) -> Fft<T> {
        let m = (2 * n - 1).next_power_of_two();
        let inner = self.plan(m);
        // i^2 mod 2n keeps the chirp argument small for long transforms.
        let angle = |i: usize| T::pi() * T::from_f64(((i * i) % (2 * n)) as f64) / T::from_f64(n as f64);
        let chirp: Vec<Complex<T>> = (0..n).map(|i| Complex::expi(-angle(i))).collect();
        let mut kernel = vec![Complex::zero(); m];
        for i in 0..n {
            kernel[i] = Complex::expi(angle(i));
        }
        for i in 1..n {
            kernel[m - i] = kernel[i];
        }
        let mut scratch = Vec::new();
        inner.forward(&mut kernel, &mut scratch);
        Fft::Bluestein {
            n,
            chirp: chirp.into(),
            kernel: kernel.into(),
            inner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive(x: &[Complex<f64>]) -> Vec<Complex<f64>> {
        let n = x.len();
        (0..n)
            .map(|k| {
                x.iter().enumerate().fold(Complex::zero(), |acc, (j, &v)| {
                    let theta = -2.0 * core::f64::consts::PI * ((j * k) % n) as f64 / n as f64;
                    acc + v * Complex::expi(theta)
                })
            })
            .collect()
    }

    fn signal(n: usize) -> Vec<Complex<f64>> {
        (0..n)
            .map(|i| Complex::new((i as f64 * 0.37).sin(), (i as f64 * 1.3).cos() - 0.2))
            .collect()
    }

    #[test]
    fn matches_naive_dft() {
        let mut planner = FftPlanner::<f64>::new();
        let mut scratch = Vec::new();
        for n in [1, 2, 3, 5, 8, 12, 17, 64, 100] {
            let x = signal(n);
            let mut y = x.clone();
            planner.plan(n).process(&mut y, Direction::Forward, &mut scratch);
            for (a, b) in y.iter().zip(naive(&x)) {
                assert!((a.re - b.re).abs() < 1e-9 && (a.im - b.im).abs() < 1e-9, "n = {n}");
            }
        }
    }

    #[test]
    fn inverse_undoes_forward_up_to_n() {
        let mut planner = FftPlanner::<f32>::new();
        let mut scratch = Vec::new();
        let n = 24;
        let x: Vec<Complex<f32>> = (0..n).map(|i| Complex::new(i as f32, -(i as f32) * 0.5)).collect();
        let mut y = x.clone();
        let fft = planner.plan(n);
        fft.process(&mut y, Direction::Forward, &mut scratch);
        fft.process(&mut y, Direction::Inverse, &mut scratch);
        for (a, b) in y.iter().zip(&x) {
            assert!((a.re / n as f32 - b.re).abs() < 1e-3);
            assert!((a.im / n as f32 - b.im).abs() < 1e-3);
        }
    }

    #[test]
    fn planner_shares_kernels() {
        let mut planner = FftPlanner::<f64>::new();
        let a = planner.plan(12);
        let b = planner.plan(12);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.len(), 12);
    }
}

#[cfg(all(feature = "internal-tests", test))]
mod coverage_tests {
    use super::*;
    use proptest::prop_assert;
    use proptest::proptest;

    proptest! {
        #[test]
        fn prop_parseval(ref re in proptest::collection::vec(-100.0f64..100.0, 1..96)) {
            let n = re.len();
            let x: Vec<Complex<f64>> = re.iter().enumerate().map(|(i, &v)| Complex::new(v, v * 0.5 - i as f64)).collect();
            let mut y = x.clone();
            FftPlanner::<f64>::new().plan(n).process(&mut y, Direction::Forward, &mut Vec::new());
            let ex: f64 = x.iter().map(|c| c.norm_sqr()).sum();
            let ey: f64 = y.iter().map(|c| c.norm_sqr()).sum::<f64>() / n as f64;
            prop_assert!((ex - ey).abs() <= 1e-9 * ex.max(1.0));
        }

        #[test]
        fn prop_linearity(n in 1usize..70, a in -4.0f64..4.0, b in -4.0f64..4.0) {
            let x: Vec<Complex<f64>> = (0..n).map(|i| Complex::new((i as f64).sin(), 1.0)).collect();
            let y: Vec<Complex<f64>> = (0..n).map(|i| Complex::new(0.5, (i as f64 * 0.3).cos())).collect();
            let fft = FftPlanner::<f64>::new().plan(n);
            let mut scratch = Vec::new();
            let mut mixed: Vec<Complex<f64>> = x.iter().zip(&y).map(|(&p, &q)| p.scale(a) + q.scale(b)).collect();
            let (mut fx, mut fy) = (x.clone(), y.clone());
            fft.process(&mut mixed, Direction::Forward, &mut scratch);
            fft.process(&mut fx, Direction::Forward, &mut scratch);
            fft.process(&mut fy, Direction::Forward, &mut scratch);
            for ((m, p), q) in mixed.iter().zip(&fx).zip(&fy) {
                let expected = p.scale(a) + q.scale(b);
                prop_assert!((m.re - expected.re).abs() < 1e-8 && (m.im - expected.im).abs() < 1e-8);
            }
        }
    }
}
