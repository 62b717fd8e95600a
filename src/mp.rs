//! Multi-process runtime bootstrap check.
//!
//! The library never bootstraps a distributed runtime. When one is installed,
//! `init` only asks whether the caller already started it.

pub trait MultiProcessRuntime: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the caller already initialized the runtime.
    fn is_initialized(&self) -> bool;
}
