//! Aligned host allocation and unified GPU allocation.

use core::ffi::c_void;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};
use core::ptr::NonNull;
use std::alloc::{self, Layout};
use std::sync::Arc;

use crate::common::Alignment;
use crate::error::{Error, Result};
use crate::gpu::GpuRuntime;
use crate::types::Element;
use crate::validate::Validate;

/// Zero-initialized host buffer aligned to at least `alignment`.
pub struct AlignedBuffer<T: Element> {
    ptr: NonNull<T>,
    len: usize,
    layout: Layout,
    _owns: PhantomData<T>,
}

// SAFETY: the buffer uniquely owns its allocation and `T: Send + Sync`.
unsafe impl<T: Element> Send for AlignedBuffer<T> {}
unsafe impl<T: Element> Sync for AlignedBuffer<T> {}

impl<T: Element> AlignedBuffer<T> {
    pub fn zeroed(len: usize, alignment: Alignment) -> Result<Self> {
        alignment.validate()?;
        let align = alignment.bytes().max(core::mem::align_of::<T>());
        let size = len
            .checked_mul(core::mem::size_of::<T>())
            .ok_or(Error::OutOfMemory {
                size: usize::MAX,
                alignment: align,
            })?;
        let layout = Layout::from_size_align(size, align)
            .map_err(|_| Error::OutOfMemory { size, alignment: align })?;
        let ptr = if size == 0 {
            // Dangling but aligned; never dereferenced for a zero-sized slice.
            NonNull::new(align as *mut T)
        } else {
            // SAFETY: layout has a non-zero size.
            NonNull::new(unsafe { alloc::alloc_zeroed(layout) } as *mut T)
        }
        .ok_or(Error::OutOfMemory { size, alignment: align })?;
        Ok(Self {
            ptr,
            len,
            layout,
            _owns: PhantomData,
        })
    }

    pub fn alignment(&self) -> usize {
        self.layout.align()
    }
}

impl<T: Element> Deref for AlignedBuffer<T> {
    type Target = [T];
    fn deref(&self) -> &[T] {
        // SAFETY: `ptr` points to `len` initialized (zeroed) elements.
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: Element> DerefMut for AlignedBuffer<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        // SAFETY: as above, and `&mut self` guarantees exclusive access.
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: Element> Drop for AlignedBuffer<T> {
    fn drop(&mut self) {
        if self.layout.size() != 0 {
            // SAFETY: allocated in `zeroed` with this exact layout.
            unsafe { alloc::dealloc(self.ptr.as_ptr() as *mut u8, self.layout) };
        }
    }
}

impl<T: Element + core::fmt::Debug> core::fmt::Debug for AlignedBuffer<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AlignedBuffer")
            .field("len", &self.len)
            .field("alignment", &self.layout.align())
            .finish()
    }
}

/// Memory reachable from host and device, owned by a GPU runtime.
pub struct UnifiedBuffer {
    runtime: Arc<dyn GpuRuntime>,
    ptr: NonNull<c_void>,
    size: usize,
}

// SAFETY: the buffer uniquely owns its allocation and the runtime is `Send + Sync`.
unsafe impl Send for UnifiedBuffer {}

impl UnifiedBuffer {
    pub fn new(runtime: Arc<dyn GpuRuntime>, size: usize) -> Result<Self> {
        let ptr = runtime.alloc_unified(size).map_err(|status| {
            debug_log!("unified allocation of {size} bytes failed: {}", status.message);
            Error::OutOfMemory { size, alignment: 1 }
        })?;
        Ok(Self { runtime, ptr, size })
    }

    pub fn as_ptr(&self) -> *mut c_void {
        self.ptr.as_ptr()
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

impl Drop for UnifiedBuffer {
    fn drop(&mut self) {
        // SAFETY: `ptr` came from `alloc_unified` of the same runtime.
        let status = unsafe { self.runtime.free_unified(self.ptr) };
        if status.code != 0 {
            debug_log!("unified free failed: {}", status.message);
        }
    }
}
