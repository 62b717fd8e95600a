//! Buffer views passed to [`super::Plan::execute`].
//!
//! A view is a sequence of addresses, one per execution target, plus what is
//! known about them: element type, byte length of each buffer and whether the
//! caller handed them out read-only. Borrowed constructors tie the view to the
//! lifetime of the slices; raw constructors are `unsafe` and carry no length.

use core::ffi::c_void;
use core::marker::PhantomData;
use core::mem::size_of;

use crate::types::{Complexity, Element, RealElement, TypeProps};

/// Address of one buffer as seen by a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferPtr {
    Interleaved(*mut c_void),
    /// Separate real and imaginary arrays.
    Planar { real: *mut c_void, imag: *mut c_void },
}

impl BufferPtr {
    pub fn is_planar(&self) -> bool {
        matches!(self, BufferPtr::Planar { .. })
    }

    /// Whether any address of the buffer is null.
    pub fn is_null(&self) -> bool {
        match *self {
            BufferPtr::Interleaved(ptr) => ptr.is_null(),
            BufferPtr::Planar { real, imag } => real.is_null() || imag.is_null(),
        }
    }

    /// The interleaved address, or the real half of a planar buffer.
    pub fn real(&self) -> *mut c_void {
        match *self {
            BufferPtr::Interleaved(ptr) => ptr,
            BufferPtr::Planar { real, .. } => real,
        }
    }

    pub fn imag(&self) -> Option<*mut c_void> {
        match *self {
            BufferPtr::Interleaved(_) => None,
            BufferPtr::Planar { imag, .. } => Some(imag),
        }
    }

    /// Whether two buffers occupy the same memory. Planar pairs alias when
    /// both halves match; mixed kinds compare the leading address.
    pub fn aliases(&self, other: &BufferPtr) -> bool {
        match (*self, *other) {
            (BufferPtr::Planar { real: r1, imag: i1 }, BufferPtr::Planar { real: r2, imag: i2 }) => {
                r1 == r2 && i1 == i2
            }
            (a, b) => a.real() == b.real(),
        }
    }
}

impl BufferPtr {
    /// Whether the two buffers share any address.
    pub fn overlaps(&self, other: &BufferPtr) -> bool {
        let ours = [Some(self.real()), self.imag()];
        let theirs = [Some(other.real()), other.imag()];
        ours.iter()
            .flatten()
            .any(|p| theirs.iter().flatten().any(|q| p == q))
    }
}

/// Contents shared by [`Source`] and [`Destination`].
#[derive(Clone, Debug)]
pub(crate) struct Buffers {
    pub(crate) ptrs: Vec<BufferPtr>,
    pub(crate) props: Option<TypeProps>,
    /// Bytes of each buffer (of each half for planar buffers), when known.
    pub(crate) lengths: Option<Vec<usize>>,
    pub(crate) read_only: bool,
}

impl Buffers {
    fn interleaved<T: Element>(data: &[T], read_only: bool) -> Self {
        Self {
            ptrs: vec![BufferPtr::Interleaved(data.as_ptr() as *mut c_void)],
            props: Some(TypeProps::of::<T>()),
            lengths: Some(vec![data.len() * size_of::<T>()]),
            read_only,
        }
    }

    fn planar<T: RealElement>(real: &[T], imag: &[T], read_only: bool) -> Self {
        Self {
            ptrs: vec![BufferPtr::Planar {
                real: real.as_ptr() as *mut c_void,
                imag: imag.as_ptr() as *mut c_void,
            }],
            props: Some(TypeProps::new(T::PRECISION, Complexity::Complex)),
            lengths: Some(vec![real.len().min(imag.len()) * size_of::<T>()]),
            read_only,
        }
    }

    fn per_target<T: Element>(parts: &[&[T]], read_only: bool) -> Self {
        Self {
            ptrs: parts
                .iter()
                .map(|p| BufferPtr::Interleaved(p.as_ptr() as *mut c_void))
                .collect(),
            props: Some(TypeProps::of::<T>()),
            lengths: Some(parts.iter().map(|p| p.len() * size_of::<T>()).collect()),
            read_only,
        }
    }

    fn per_target_planar<T: RealElement>(parts: &[(&[T], &[T])]) -> Self {
        Self {
            ptrs: parts
                .iter()
                .map(|(re, im)| BufferPtr::Planar {
                    real: re.as_ptr() as *mut c_void,
                    imag: im.as_ptr() as *mut c_void,
                })
                .collect(),
            props: Some(TypeProps::new(T::PRECISION, Complexity::Complex)),
            lengths: Some(
                parts
                    .iter()
                    .map(|(re, im)| re.len().min(im.len()) * size_of::<T>())
                    .collect(),
            ),
            read_only: false,
        }
    }

    fn raw(ptrs: Vec<BufferPtr>, props: Option<TypeProps>) -> Self {
        Self {
            ptrs,
            props,
            lengths: None,
            read_only: false,
        }
    }
}

/// Input buffers of an execution.
#[derive(Debug)]
pub struct Source<'a> {
    pub(crate) inner: Buffers,
    _borrow: PhantomData<&'a mut [u8]>,
}

/// Output buffers of an execution. In-place executions pass a single
/// `Destination` that serves both roles.
#[derive(Debug)]
pub struct Destination<'a> {
    pub(crate) inner: Buffers,
    _borrow: PhantomData<&'a mut [u8]>,
}

impl<'a> Source<'a> {
    fn wrap(inner: Buffers) -> Self {
        Self {
            inner,
            _borrow: PhantomData,
        }
    }

    /// Read-only input; the plan must preserve its source.
    pub fn slice<T: Element>(data: &'a [T]) -> Self {
        Self::wrap(Buffers::interleaved(data, true))
    }

    /// Input the backend may overwrite when the plan does not preserve its source.
    pub fn slice_mut<T: Element>(data: &'a mut [T]) -> Self {
        Self::wrap(Buffers::interleaved(data, false))
    }

    pub fn planar<T: RealElement>(real: &'a mut [T], imag: &'a mut [T]) -> Self {
        Self::wrap(Buffers::planar(real, imag, false))
    }

    pub fn planar_ref<T: RealElement>(real: &'a [T], imag: &'a [T]) -> Self {
        Self::wrap(Buffers::planar(real, imag, true))
    }

    /// One read-only buffer per execution target.
    pub fn per_target<T: Element>(parts: Vec<&'a [T]>) -> Self {
        Self::wrap(Buffers::per_target(&parts, true))
    }

    pub fn per_target_mut<T: Element>(parts: Vec<&'a mut [T]>) -> Self {
        let parts: Vec<&[T]> = parts.into_iter().map(|p| &*p).collect();
        Self::wrap(Buffers::per_target(&parts, false))
    }

    pub fn per_target_planar<T: RealElement>(parts: Vec<(&'a mut [T], &'a mut [T])>) -> Self {
        let parts: Vec<(&[T], &[T])> = parts.into_iter().map(|(re, im)| (&*re, &*im)).collect();
        Self::wrap(Buffers::per_target_planar(&parts))
    }

    /// Untyped raw buffers; the element type is not checked.
    ///
    /// # Safety
    /// Every pointer must be valid for the reads (and, unless the plan
    /// preserves its source, writes) the plan performs for the duration of
    /// the execute call.
    pub unsafe fn from_raw(ptrs: Vec<BufferPtr>) -> Self {
        Self::wrap(Buffers::raw(ptrs, None))
    }

    /// Raw buffers whose element type is checked against the plan.
    ///
    /// # Safety
    /// As for [`Source::from_raw`].
    pub unsafe fn from_raw_typed(ptrs: Vec<BufferPtr>, props: TypeProps) -> Self {
        Self::wrap(Buffers::raw(ptrs, Some(props)))
    }

    /// Declare the buffers read-only.
    pub fn read_only(mut self) -> Self {
        self.inner.read_only = true;
        self
    }

    pub fn ptrs(&self) -> &[BufferPtr] {
        &self.inner.ptrs
    }

    pub fn props(&self) -> Option<TypeProps> {
        self.inner.props
    }

    pub fn is_read_only(&self) -> bool {
        self.inner.read_only
    }
}

impl<'a> Destination<'a> {
    fn wrap(inner: Buffers) -> Self {
        Self {
            inner,
            _borrow: PhantomData,
        }
    }

    pub fn slice_mut<T: Element>(data: &'a mut [T]) -> Self {
        Self::wrap(Buffers::interleaved(data, false))
    }

    pub fn planar<T: RealElement>(real: &'a mut [T], imag: &'a mut [T]) -> Self {
        Self::wrap(Buffers::planar(real, imag, false))
    }

    pub fn per_target<T: Element>(parts: Vec<&'a mut [T]>) -> Self {
        let parts: Vec<&[T]> = parts.into_iter().map(|p| &*p).collect();
        Self::wrap(Buffers::per_target(&parts, false))
    }

    pub fn per_target_planar<T: RealElement>(parts: Vec<(&'a mut [T], &'a mut [T])>) -> Self {
        let parts: Vec<(&[T], &[T])> = parts.into_iter().map(|(re, im)| (&*re, &*im)).collect();
        Self::wrap(Buffers::per_target_planar(&parts))
    }

    /// # Safety
    /// Every pointer must be valid for the writes the plan performs for the
    /// duration of the execute call.
    pub unsafe fn from_raw(ptrs: Vec<BufferPtr>) -> Self {
        Self::wrap(Buffers::raw(ptrs, None))
    }

    /// # Safety
    /// As for [`Destination::from_raw`].
    pub unsafe fn from_raw_typed(ptrs: Vec<BufferPtr>, props: TypeProps) -> Self {
        Self::wrap(Buffers::raw(ptrs, Some(props)))
    }

    pub fn ptrs(&self) -> &[BufferPtr] {
        &self.inner.ptrs
    }

    pub fn props(&self) -> Option<TypeProps> {
        self.inner.props
    }
}
