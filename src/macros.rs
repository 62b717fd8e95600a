// Crate-private macros. Declared first in lib.rs so every module can use them.

/// Debug logging that compiles away unless `verbose-logging` is enabled.
#[cfg(feature = "verbose-logging")]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        log::debug!($($arg)*)
    };
}

#[cfg(not(feature = "verbose-logging"))]
macro_rules! debug_log {
    ($($arg:tt)*) => {{
        if false {
            let _ = format_args!($($arg)*);
        }
    }};
}

/// Declares a closed enumeration with stable `u8` discriminants and wires it
/// into the validation layer (`RawEnum` + `Validate`).
macro_rules! raw_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $what:literal {
            $( $(#[$vmeta:meta])* $variant:ident = $value:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(u8)]
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant = $value ),+
        }

        impl $crate::validate::RawEnum for $name {
            const NAME: &'static str = $what;
            const VARIANTS: &'static [Self] = &[$(Self::$variant),+];

            fn from_raw(raw: u8) -> Option<Self> {
                match raw {
                    $( $value => Some(Self::$variant), )+
                    _ => None,
                }
            }

            fn to_raw(self) -> u8 {
                self as u8
            }
        }

        impl $crate::validate::Validate for $name {
            fn validate(&self) -> $crate::error::Result<()> {
                $crate::validate::validate_raw::<$name>(*self as u8).map(|_| ())
            }
        }
    };
}
