//! GPU runtime bindings.
//!
//! The crate does not link a GPU framework. A caller that drives CUDA, HIP or
//! OpenCL installs a [`GpuRuntime`] into the registry; device validation,
//! unified allocation and init/finalize go through it.

use core::ffi::c_void;
use core::ptr::NonNull;

use crate::error::NativeStatus;

/// Native status of a GPU runtime call; code `0` is success.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GpuStatus {
    pub code: i32,
    pub message: String,
}

impl GpuStatus {
    pub fn success() -> Self {
        Self {
            code: 0,
            message: String::new(),
        }
    }

    pub fn failure(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl NativeStatus for GpuStatus {
    const SOURCE: &'static str = "gpu runtime";

    fn is_ok(&self) -> bool {
        self.code == 0
    }

    fn code(&self) -> i64 {
        self.code as i64
    }

    fn message(&self) -> String {
        self.message.clone()
    }
}

/// Thin driver interface used by target configuration, allocation and init.
pub trait GpuRuntime: Send + Sync {
    fn name(&self) -> &'static str;

    /// Called once by library init.
    fn init(&self) -> GpuStatus {
        GpuStatus::success()
    }

    /// Called once by library finalize.
    fn finalize(&self) {}

    fn current_device(&self) -> Result<i32, GpuStatus>;

    fn is_valid_device(&self, device: i32) -> bool;

    fn alloc_unified(&self, size: usize) -> Result<NonNull<c_void>, GpuStatus>;

    /// # Safety
    /// `ptr` must come from `alloc_unified` of this runtime and not be freed twice.
    unsafe fn free_unified(&self, ptr: NonNull<c_void>) -> GpuStatus;
}
