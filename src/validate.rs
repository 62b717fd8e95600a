//! Validation layer.
//!
//! Typed values implement [`Validate`]. Raw integer values, as handed over by
//! foreign callers, go through [`validate_raw`] and friends, which reject any
//! value that is not a known enumerator.

use crate::error::{Error, InvalidArgument, Result};

/// Enumeration with stable small-integer discriminants.
pub trait RawEnum: Copy + Sized + 'static {
    /// Name used in error messages.
    const NAME: &'static str;
    /// Every enumerator in discriminant order.
    const VARIANTS: &'static [Self];
    fn from_raw(raw: u8) -> Option<Self>;
    fn to_raw(self) -> u8;
}

/// Validation of a typed value.
pub trait Validate {
    /// `Ok(())` when valid, otherwise the reason it is not.
    fn validate(&self) -> Result<()>;

    fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Whether `raw` names an enumerator of `E`.
pub fn is_valid_raw<E: RawEnum>(raw: u8) -> bool {
    E::from_raw(raw).is_some()
}

/// Convert `raw` into `E` or fail with an invalid-argument error.
pub fn validate_raw<E: RawEnum>(raw: u8) -> Result<E> {
    E::from_raw(raw).ok_or(Error::InvalidArgument(InvalidArgument::InvalidValue {
        what: E::NAME,
        raw,
    }))
}

/// Convert every raw value left to right, failing on the first invalid one.
pub fn validate_raw_all<E: RawEnum>(raws: &[u8]) -> Result<Vec<E>> {
    raws.iter()
        .enumerate()
        .map(|(index, &raw)| {
            E::from_raw(raw).ok_or(Error::InvalidArgument(InvalidArgument::InvalidElement {
                what: E::NAME,
                index,
            }))
        })
        .collect()
}

/// Validate every value left to right, returning the first failure.
pub fn validate_all<T: Validate>(values: &[T]) -> Result<()> {
    values.iter().try_for_each(Validate::validate)
}

/// Whether every value is valid.
pub fn all_valid<T: Validate>(values: &[T]) -> bool {
    values.iter().all(Validate::is_valid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Alignment, Direction, Normalization};
    use crate::types::Precision;

    #[test]
    fn raw_values_outside_the_enumeration_are_rejected() {
        assert!(is_valid_raw::<Direction>(1));
        assert!(!is_valid_raw::<Direction>(2));
        assert_eq!(
            validate_raw::<Normalization>(9),
            Err(Error::InvalidArgument(InvalidArgument::InvalidValue {
                what: "normalization",
                raw: 9
            }))
        );
        assert_eq!(validate_raw::<Precision>(3), Ok(Precision::F64));
    }

    #[test]
    fn sequences_report_the_first_invalid_index() {
        assert_eq!(
            validate_raw_all::<Precision>(&[0, 2, 40, 50]),
            Err(Error::InvalidArgument(InvalidArgument::InvalidElement {
                what: "precision",
                index: 2
            }))
        );
        assert_eq!(
            validate_all(&[Alignment(8), Alignment(3), Alignment(5)]),
            Err(Error::InvalidArgument(InvalidArgument::InvalidAlignment(3)))
        );
        assert!(all_valid(&[Alignment(8), Alignment(64)]));
    }

    #[test]
    fn typed_enumerators_are_valid() {
        for &p in Precision::VARIANTS {
            assert!(p.is_valid());
            assert_eq!(Precision::from_raw(p.to_raw()), Some(p));
        }
    }
}
