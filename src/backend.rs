//! Backend identifiers, masks, and the static capability and preference tables.

use core::fmt;
use core::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, Not};
use core::str::FromStr;
use std::sync::OnceLock;

use crate::common::{Distribution, Target};
use crate::error::{Error, Result};
use crate::validate::{RawEnum, Validate};

raw_enum! {
    /// Transform library a plan can be bound to.
    pub enum Backend: "backend" {
        ClFft = 0,
        CuFft = 1,
        Fftw3 = 2,
        HipFft = 3,
        Mkl = 4,
        PocketFft = 5,
        RocFft = 6,
        VkFft = 7,
        HeFfte = 8,
        Native = 9,
        RustFft = 10,
    }
}

pub const BACKEND_COUNT: usize = Backend::VARIANTS.len();

const _: () = assert!(BACKEND_COUNT <= u16::BITS as usize);

impl Backend {
    pub const fn name(self) -> &'static str {
        match self {
            Backend::ClFft => "clFFT",
            Backend::CuFft => "cuFFT",
            Backend::Fftw3 => "FFTW3",
            Backend::HipFft => "hipFFT",
            Backend::Mkl => "Intel MKL",
            Backend::PocketFft => "PocketFFT",
            Backend::RocFft => "rocFFT",
            Backend::VkFft => "VkFFT",
            Backend::HeFfte => "HeFFTe",
            Backend::Native => "native",
            Backend::RustFft => "rustfft",
        }
    }

    pub const fn bit(self) -> BackendMask {
        BackendMask(1 << self as u16)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = Error;

    /// Case-insensitive; accepts display names and short ids like `mkl`.
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Backend::VARIANTS
            .iter()
            .copied()
            .find(|b| {
                let name = b.name().to_ascii_lowercase();
                name == wanted || name.trim_start_matches("intel ") == wanted
            })
            .ok_or_else(|| Error::Runtime(format!("unknown backend name '{s}'")))
    }
}

/// Set of backends, one bit per [`Backend`]. Any bit pattern is valid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BackendMask(pub u16);

impl BackendMask {
    pub const EMPTY: BackendMask = BackendMask(0);
    pub const ALL: BackendMask = BackendMask(u16::MAX);

    pub const fn contains(self, backend: Backend) -> bool {
        self.0 & backend.bit().0 != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, backend: Backend) {
        self.0 |= backend.bit().0;
    }

    pub fn remove(&mut self, backend: Backend) {
        self.0 &= !backend.bit().0;
    }

    /// Known backends in the mask, in identifier order.
    pub fn iter(self) -> impl Iterator<Item = Backend> {
        Backend::VARIANTS
            .iter()
            .copied()
            .filter(move |&b| self.contains(b))
    }
}

impl Validate for BackendMask {
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

impl From<Backend> for BackendMask {
    fn from(backend: Backend) -> Self {
        backend.bit()
    }
}

impl FromIterator<Backend> for BackendMask {
    fn from_iter<I: IntoIterator<Item = Backend>>(iter: I) -> Self {
        iter.into_iter()
            .fold(BackendMask::EMPTY, |mask, b| mask | b)
    }
}

impl<R: Into<BackendMask>> BitOr<R> for BackendMask {
    type Output = BackendMask;
    fn bitor(self, rhs: R) -> BackendMask {
        BackendMask(self.0 | rhs.into().0)
    }
}

impl<R: Into<BackendMask>> BitAnd<R> for BackendMask {
    type Output = BackendMask;
    fn bitand(self, rhs: R) -> BackendMask {
        BackendMask(self.0 & rhs.into().0)
    }
}

impl<R: Into<BackendMask>> BitXor<R> for BackendMask {
    type Output = BackendMask;
    fn bitxor(self, rhs: R) -> BackendMask {
        BackendMask(self.0 ^ rhs.into().0)
    }
}

impl<R: Into<BackendMask>> BitOrAssign<R> for BackendMask {
    fn bitor_assign(&mut self, rhs: R) {
        self.0 |= rhs.into().0;
    }
}

impl<R: Into<BackendMask>> BitAndAssign<R> for BackendMask {
    fn bitand_assign(&mut self, rhs: R) {
        self.0 &= rhs.into().0;
    }
}

impl Not for BackendMask {
    type Output = BackendMask;
    fn not(self) -> BackendMask {
        BackendMask(!self.0)
    }
}

impl BitOr for Backend {
    type Output = BackendMask;
    fn bitor(self, rhs: Backend) -> BackendMask {
        self.bit() | rhs
    }
}

impl BitOr<BackendMask> for Backend {
    type Output = BackendMask;
    fn bitor(self, rhs: BackendMask) -> BackendMask {
        self.bit() | rhs
    }
}

impl Not for Backend {
    type Output = BackendMask;
    fn not(self) -> BackendMask {
        !self.bit()
    }
}

raw_enum! {
    /// How the plan factory chooses among viable backends.
    #[derive(Default)]
    pub enum SelectStrategy: "select strategy" {
        /// first candidate that accepts the descriptor
        #[default]
        First = 0,
        /// cheapest candidate by the backends' own cost estimate
        Best = 1,
    }
}

/// Caller preferences for backend selection.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BackendParameters {
    pub strategy: SelectStrategy,
    /// Backends allowed to be tried.
    pub mask: BackendMask,
    /// Preferred order; empty uses the preference table of the target and distribution.
    pub order: Vec<Backend>,
}

impl Default for BackendParameters {
    fn default() -> Self {
        Self {
            strategy: SelectStrategy::First,
            mask: BackendMask::ALL,
            order: Vec::new(),
        }
    }
}

impl BackendParameters {
    /// Only ever try `backend`.
    pub fn only(backend: Backend) -> Self {
        Self {
            mask: backend.bit(),
            order: vec![backend],
            ..Self::default()
        }
    }

    /// Try exactly these backends in this order.
    pub fn ordered(order: impl Into<Vec<Backend>>) -> Self {
        let order = order.into();
        Self {
            mask: order.iter().copied().collect(),
            order,
            ..Self::default()
        }
    }

    pub fn with_strategy(strategy: SelectStrategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }
}

/// Why a candidate backend was not used.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Feedback {
    pub backend: Backend,
    pub message: String,
}

impl Feedback {
    pub fn new(backend: Backend, message: impl Into<String>) -> Self {
        Self {
            backend,
            message: message.into(),
        }
    }
}

/// Backends able to run a (target, distribution) pair at all.
pub fn supported_mask(target: Target, distribution: Distribution) -> BackendMask {
    use Backend::*;
    match (target, distribution) {
        (Target::Cpu, Distribution::Spst) => Fftw3 | Mkl | PocketFft | Native | RustFft,
        (Target::Cpu, Distribution::Mpst) => Fftw3 | Mkl | HeFfte,
        (Target::Cpu, Distribution::Spmt) => BackendMask::EMPTY,
        (Target::Gpu, Distribution::Spst) => ClFft | CuFft | HipFft | RocFft | VkFft,
        (Target::Gpu, Distribution::Spmt) => CuFft | HipFft | RocFft,
        (Target::Gpu, Distribution::Mpst) => CuFft | HeFfte,
    }
}

static CPU_ORDER_OVERRIDE: OnceLock<Option<Vec<Backend>>> = OnceLock::new();

fn cpu_order_override() -> Option<&'static [Backend]> {
    CPU_ORDER_OVERRIDE
        .get_or_init(|| {
            let value = std::env::var("OMNIFFT_CPU_BACKENDS").ok()?;
            let order: Vec<Backend> = value
                .split(',')
                .filter_map(|name| name.parse().ok())
                .collect();
            if order.is_empty() {
                None
            } else {
                Some(order)
            }
        })
        .as_deref()
}

/// Preference order for a (target, distribution) pair, faster libraries first.
///
/// `OMNIFFT_CPU_BACKENDS` replaces the CPU single-target order.
pub fn default_order(target: Target, distribution: Distribution) -> &'static [Backend] {
    use Backend::*;
    match (target, distribution) {
        (Target::Cpu, Distribution::Spst) => {
            cpu_order_override().unwrap_or(&[Mkl, Fftw3, RustFft, PocketFft, Native])
        }
        (Target::Cpu, Distribution::Mpst) => &[Mkl, Fftw3, HeFfte],
        (Target::Cpu, Distribution::Spmt) => &[],
        (Target::Gpu, Distribution::Spst) => &[CuFft, HipFft, VkFft, RocFft, ClFft],
        (Target::Gpu, Distribution::Spmt) => &[CuFft, HipFft, RocFft],
        (Target::Gpu, Distribution::Mpst) => &[CuFft, HeFfte],
    }
}

/// Order in which backends of `mask` are tried: `order` first (those in the
/// mask, each once), then the remaining mask bits in identifier order.
pub fn candidate_order(mask: BackendMask, order: &[Backend]) -> Vec<Backend> {
    let mut remaining = mask;
    let mut out = Vec::with_capacity(BACKEND_COUNT);
    for &backend in order {
        if remaining.contains(backend) {
            remaining.remove(backend);
            out.push(backend);
        }
    }
    out.extend(remaining.iter());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_operations() {
        let mask = Backend::Fftw3 | Backend::Mkl;
        assert!(mask.contains(Backend::Mkl));
        assert!(!mask.contains(Backend::CuFft));
        assert_eq!((mask & Backend::Mkl), Backend::Mkl.bit());
        assert_eq!((mask ^ Backend::Mkl), Backend::Fftw3.bit());
        assert!(!(!Backend::Native).contains(Backend::Native));
        assert_eq!(mask.iter().collect::<Vec<_>>(), vec![Backend::Fftw3, Backend::Mkl]);
    }

    #[test]
    fn candidate_order_puts_preferences_first() {
        let mask = Backend::Native | Backend::PocketFft | Backend::Fftw3;
        assert_eq!(
            candidate_order(mask, &[Backend::Native, Backend::CuFft, Backend::Native]),
            vec![Backend::Native, Backend::Fftw3, Backend::PocketFft]
        );
    }

    #[test]
    fn names_round_trip() {
        for &b in Backend::VARIANTS {
            assert_eq!(b.name().parse::<Backend>(), Ok(b));
        }
        assert_eq!("mkl".parse::<Backend>(), Ok(Backend::Mkl));
        assert!("cufftw".parse::<Backend>().is_err());
    }

    #[test]
    fn preference_tables_are_within_capabilities() {
        use crate::common::{Distribution::*, Target::*};
        for (t, d) in [(Cpu, Mpst), (Gpu, Spst), (Gpu, Spmt), (Gpu, Mpst)] {
            let supported = supported_mask(t, d);
            assert!(default_order(t, d).iter().all(|&b| supported.contains(b)));
        }
        assert!(supported_mask(Cpu, Spst).contains(Backend::Native));
        assert!(!supported_mask(Gpu, Spmt).contains(Backend::VkFft));
    }
}
