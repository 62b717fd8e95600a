//! Backend implementations shipped with the crate.

pub mod lines;
pub mod native;
#[cfg(feature = "rustfft")]
pub mod rustfft;
