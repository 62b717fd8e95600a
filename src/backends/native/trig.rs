//! Real trigonometric transforms: the eight DCT/DST types and the Hartley
//! transform.
//!
//! DCT and DST follow the FFTW definitions, unnormalized, so a type followed
//! by [`dtt::Type::inverse`] scales by the logical size. Every type reduces to
//! `2π·m / period` for an integer `m`, so one cosine or sine table of
//! `period` entries per length serves every output.

use std::sync::Arc;

use hashbrown::HashMap;

use super::fft::Fft;
use crate::common::Direction;
use crate::num::{Complex, Float};
use crate::transform::dtt;

/// A planned DCT or DST of one length.
#[derive(Debug)]
pub struct Dtt<T> {
    ty: dtt::Type,
    n: usize,
    period: usize,
    table: Arc<[T]>,
}

impl<T: Float> Dtt<T> {
    pub fn kind(&self) -> dtt::Type {
        self.ty
    }

    pub fn len(&self) -> usize {
        self.n
    }

    #[inline(always)]
    fn w(&self, a: usize, b: usize) -> T {
        let p = self.period;
        self.table[((a % p) * (b % p)) % p]
    }

    /// Transform `input` into `output`; both hold `len()` values.
    pub fn process(&self, input: &[T], output: &mut [T]) {
        use dtt::Type::*;
        let n = self.n;
        let two = T::from_f64(2.0);
        let sign = |k: usize| if k % 2 == 0 { T::one() } else { -T::one() };
        for (k, out) in output.iter_mut().enumerate().take(n) {
            let (base, range) = match self.ty {
                Dct1 => (input[0] + sign(k) * input[n - 1], 1..n - 1),
                Dct3 => (input[0], 1..n),
                Dst3 => (sign(k) * input[n - 1], 0..n - 1),
                _ => (T::zero(), 0..n),
            };
            let mut sum = T::zero();
            for j in range {
                let (p, q) = phase(self.ty, j, k);
                sum = input[j].mul_add(self.w(p, q), sum);
            }
            *out = two.mul_add(sum, base);
        }
    }
}

/// Factors whose product is the table index of input `j`, output `k`.
#[inline(always)]
fn phase(ty: dtt::Type, j: usize, k: usize) -> (usize, usize) {
    use dtt::Type::*;
    match ty {
        Dct1 => (j, k),
        Dct2 => (2 * j + 1, k),
        Dct3 => (j, 2 * k + 1),
        Dct4 | Dst4 => (2 * j + 1, 2 * k + 1),
        Dst1 => (j + 1, k + 1),
        Dst2 => (2 * j + 1, k + 1),
        Dst3 => (j + 1, 2 * k + 1),
    }
}

/// Caches trig tables and [`Dtt`] kernels by type and length.
#[derive(Debug)]
pub struct DttPlanner<T> {
    tables: HashMap<(usize, bool), Arc<[T]>>,
    plans: HashMap<(dtt::Type, usize), Arc<Dtt<T>>>,
}

impl<T> Default for DttPlanner<T> {
    fn default() -> Self {
        Self {
            tables: HashMap::new(),
            plans: HashMap::new(),
        }
    }
}

impl<T: Float> DttPlanner<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&mut self, period: usize, sine: bool) -> Arc<[T]> {
        self.tables
            .entry((period, sine))
            .or_insert_with(|| {
                let step = T::from_f64(2.0) * T::pi() / T::from_f64(period as f64);
                (0..period)
                    .map(|m| {
                        let (s, c) = (step * T::from_f64(m as f64)).sin_cos();
                        if sine {
                            s
                        } else {
                            c
                        }
                    })
                    .collect()
            })
            .clone()
    }

    /// The kernel for `ty` over `n` points, or `None` for a DCT-I of fewer
    /// than two points.
    pub fn plan(&mut self, ty: dtt::Type, n: usize) -> Option<Arc<Dtt<T>>> {
        use dtt::Type::*;
        if n == 0 || (ty == Dct1 && n < 2) {
            return None;
        }
        if let Some(plan) = self.plans.get(&(ty, n)) {
            return Some(plan.clone());
        }
        let (period, sine) = match ty {
            Dct1 => (2 * (n - 1), false),
            Dct2 | Dct3 => (4 * n, false),
            Dct4 => (8 * n, false),
            Dst1 => (2 * (n + 1), true),
            Dst2 | Dst3 => (4 * n, true),
            Dst4 => (8 * n, true),
        };
        let plan = Arc::new(Dtt {
            ty,
            n,
            period,
            table: self.table(period, sine),
        });
        self.plans.insert((ty, n), plan.clone());
        Some(plan)
    }
}

/// Hartley transform of one line: `H_k = Re(X_k) - Im(X_k)` of the forward
/// DFT. The transform is its own inverse up to `n`.
pub fn hartley<T: Float>(
    fft: &Fft<T>,
    line: &mut [T],
    work: &mut Vec<Complex<T>>,
    scratch: &mut Vec<Complex<T>>,
) {
    work.clear();
    work.extend(line.iter().map(|&x| Complex::new(x, T::zero())));
    fft.process(work, Direction::Forward, scratch);
    for (out, c) in line.iter_mut().zip(work.iter()) {
        *out = c.re - c.im;
    }
}

#[cfg(test)]
mod tests {
    use super::super::fft::FftPlanner;
    use super::*;

    fn close(a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    #[test]
    fn dct2_and_dst1_known_values() {
        let mut planner = DttPlanner::<f64>::new();
        let mut out = [0.0; 4];
        planner.plan(dtt::Type::Dct2, 4).unwrap().process(&[1.0, 2.0, 3.0, 4.0], &mut out);
        assert!(close(&out, &[20.0, -6.308644059797899, 0.0, -0.44834152916796777]));

        let mut out = [0.0; 3];
        planner.plan(dtt::Type::Dst1, 3).unwrap().process(&[1.0, 2.0, 3.0], &mut out);
        assert!(close(&out, &[9.65685424949238, -4.0, 1.6568542494923788]));
    }

    #[test]
    fn every_type_inverts_up_to_the_logical_size() {
        let mut planner = DttPlanner::<f64>::new();
        let x = [0.3, -1.2, 2.0, 0.7, 0.1];
        for &ty in <dtt::Type as crate::validate::RawEnum>::VARIANTS {
            let fwd = planner.plan(ty, x.len()).unwrap();
            let inv = planner.plan(ty.inverse(), x.len()).unwrap();
            let mut y = [0.0; 5];
            let mut z = [0.0; 5];
            fwd.process(&x, &mut y);
            inv.process(&y, &mut z);
            let scale = ty.logical_size(x.len()) as f64;
            let back: Vec<f64> = z.iter().map(|v| v / scale).collect();
            assert!(close(&back, &x), "{ty:?}");
        }
    }

    #[test]
    fn single_point_dct1_is_declined() {
        let mut planner = DttPlanner::<f32>::new();
        assert!(planner.plan(dtt::Type::Dct1, 1).is_none());
        assert!(planner.plan(dtt::Type::Dct2, 1).is_some());
    }

    #[test]
    fn hartley_is_an_involution() {
        let mut ffts = FftPlanner::<f64>::new();
        let fft = ffts.plan(6);
        let x = [1.0, -2.0, 0.5, 3.0, 0.0, -1.5];
        let mut line = x;
        let (mut work, mut scratch) = (Vec::new(), Vec::new());
        hartley(&fft, &mut line, &mut work, &mut scratch);
        assert!((line[0] - x.iter().sum::<f64>()).abs() < 1e-12);
        hartley(&fft, &mut line, &mut work, &mut scratch);
        let back: Vec<f64> = line.iter().map(|v| v / 6.0).collect();
        assert!(close(&back, &x));
    }
}

#[cfg(all(feature = "internal-tests", test))]
mod coverage_tests {
    use super::*;
    use crate::validate::RawEnum;
    use proptest::prop_assert;
    use proptest::proptest;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn random_lines_round_trip() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut planner = DttPlanner::<f64>::new();
        for &ty in dtt::Type::VARIANTS {
            for n in 2..20 {
                let x: Vec<f64> = (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect();
                let (mut y, mut z) = (vec![0.0; n], vec![0.0; n]);
                planner.plan(ty, n).unwrap().process(&x, &mut y);
                planner.plan(ty.inverse(), n).unwrap().process(&y, &mut z);
                let scale = ty.logical_size(n) as f64;
                for (a, b) in z.iter().zip(&x) {
                    assert!((a / scale - b).abs() < 1e-9, "{ty:?} n={n}");
                }
            }
        }
    }

    proptest! {
        #[test]
        fn prop_dct2_of_constant_is_an_impulse(n in 1usize..40, c in -50.0f64..50.0) {
            let x = vec![c; n];
            let mut y = vec![0.0; n];
            DttPlanner::<f64>::new().plan(dtt::Type::Dct2, n).unwrap().process(&x, &mut y);
            prop_assert!((y[0] - 2.0 * n as f64 * c).abs() < 1e-8 * (1.0 + c.abs() * n as f64));
            for v in &y[1..] {
                prop_assert!(v.abs() < 1e-8 * (1.0 + c.abs() * n as f64));
            }
        }
    }
}
