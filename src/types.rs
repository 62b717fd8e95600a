//! Precision and complexity tags, and the mapping from Rust element types to them.

use half::{bf16, f16};

use crate::num::Complex;

raw_enum! {
    /// Floating point precision of a buffer or of the execution.
    pub enum Precision: "precision" {
        /// Google brain float
        Bf16 = 0,
        /// IEEE 754 half
        F16 = 1,
        /// IEEE 754 single
        F32 = 2,
        /// IEEE 754 double
        F64 = 3,
        /// double-double arithmetic
        F64F64 = 4,
        /// x87 extended precision
        F80 = 5,
        /// IEEE 754 quadruple
        F128 = 6,
    }
}

raw_enum! {
    /// Whether a buffer holds real or complex values.
    pub enum Complexity: "complexity" {
        Real = 0,
        Complex = 1,
    }
}

impl Precision {
    /// Size in bytes of one real scalar of this precision.
    pub const fn size(self) -> usize {
        match self {
            Precision::Bf16 | Precision::F16 => 2,
            Precision::F32 => 4,
            Precision::F64 => 8,
            Precision::F64F64 | Precision::F80 | Precision::F128 => 16,
        }
    }

    /// Whether a Rust element type exists for this precision.
    pub const fn has_element_type(self) -> bool {
        matches!(
            self,
            Precision::Bf16 | Precision::F16 | Precision::F32 | Precision::F64
        )
    }
}

impl core::fmt::Display for Precision {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Precision::Bf16 => "bf16",
            Precision::F16 => "f16",
            Precision::F32 => "f32",
            Precision::F64 => "f64",
            Precision::F64F64 => "f64f64",
            Precision::F80 => "f80",
            Precision::F128 => "f128",
        };
        f.write_str(name)
    }
}

impl core::fmt::Display for Complexity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Complexity::Real => "real",
            Complexity::Complex => "complex",
        })
    }
}

/// Size in bytes of one real scalar of `precision`.
pub const fn precision_size(precision: Precision) -> usize {
    precision.size()
}

/// Element type of one buffer as seen by the execution checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TypeProps {
    pub precision: Precision,
    pub complexity: Complexity,
}

impl TypeProps {
    pub const fn new(precision: Precision, complexity: Complexity) -> Self {
        Self {
            precision,
            complexity,
        }
    }

    pub fn of<T: Element>() -> Self {
        Self::new(T::PRECISION, T::COMPLEXITY)
    }
}

impl core::fmt::Display for TypeProps {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} {}", self.complexity, self.precision)
    }
}

mod sealed {
    pub trait Sealed {}
}

/// A Rust type that can be stored in a transform buffer.
///
/// Complex elements are interleaved (`re` followed by `im`). Every element
/// type is a plain floating point aggregate for which all-zero bytes are a
/// valid value.
pub trait Element: sealed::Sealed + Copy + Send + Sync + 'static {
    const PRECISION: Precision;
    const COMPLEXITY: Complexity;
}

/// Real scalar element. Two slices of it form one planar complex buffer.
pub trait RealElement: Element {}

macro_rules! element {
    ($real:ty => $prec:expr) => {
        impl sealed::Sealed for $real {}
        impl sealed::Sealed for Complex<$real> {}
        impl Element for $real {
            const PRECISION: Precision = $prec;
            const COMPLEXITY: Complexity = Complexity::Real;
        }
        impl RealElement for $real {}
        impl Element for Complex<$real> {
            const PRECISION: Precision = $prec;
            const COMPLEXITY: Complexity = Complexity::Complex;
        }
    };
}

element!(bf16 => Precision::Bf16);
element!(f16 => Precision::F16);
element!(f32 => Precision::F32);
element!(f64 => Precision::F64);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::RawEnum;

    #[test]
    fn element_tags_follow_rust_types() {
        assert_eq!(TypeProps::of::<f32>(), TypeProps::new(Precision::F32, Complexity::Real));
        assert_eq!(
            TypeProps::of::<Complex<f64>>(),
            TypeProps::new(Precision::F64, Complexity::Complex)
        );
        assert_eq!(<half::f16 as Element>::PRECISION, Precision::F16);
        assert_eq!(<Complex<half::bf16> as Element>::PRECISION, Precision::Bf16);
    }

    #[test]
    fn sizes_match_element_types() {
        assert_eq!(Precision::F32.size(), core::mem::size_of::<f32>());
        assert_eq!(Precision::F64.size(), core::mem::size_of::<f64>());
        assert_eq!(Precision::F16.size(), core::mem::size_of::<half::f16>());
        assert_eq!(precision_size(Precision::F128), 16);
    }

    #[test]
    fn discriminants_are_stable() {
        assert_eq!(Precision::Bf16.to_raw(), 0);
        assert_eq!(Precision::F128.to_raw(), 6);
        assert_eq!(Precision::from_raw(3), Some(Precision::F64));
        assert_eq!(Precision::from_raw(7), None);
        assert_eq!(Complexity::from_raw(1), Some(Complexity::Complex));
    }
}
