//! Strided gather/scatter and line iteration for the CPU backends.
//!
//! Backends copy a buffer into a dense row-major work array, transform it
//! one axis at a time and copy the result out with the destination strides.
//! Gathering everything before scattering anything makes in-place execution
//! safe whatever the strides are.

use crate::num::{Complex, Float};

/// Row-major strides of a dense array of `shape`.
pub fn dense_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1usize; shape.len()];
    for dim in (0..shape.len().saturating_sub(1)).rev() {
        strides[dim] = strides[dim + 1] * shape[dim + 1];
    }
    strides
}

/// Calls `f(dense_index, strided_offset)` for every element of `shape` in
/// row-major order.
pub fn for_each_offset(shape: &[usize], strides: &[usize], mut f: impl FnMut(usize, usize)) {
    let total: usize = shape.iter().product();
    if total == 0 {
        return;
    }
    let rank = shape.len();
    let mut index = vec![0usize; rank];
    let mut offset = 0usize;
    for dense in 0..total {
        f(dense, offset);
        for dim in (0..rank).rev() {
            index[dim] += 1;
            offset += strides[dim];
            if index[dim] < shape[dim] {
                break;
            }
            offset -= strides[dim] * shape[dim];
            index[dim] = 0;
        }
    }
}

/// Dense start offsets of every line along `axis`, ordered row-major over
/// the remaining dimensions. Arrays whose shapes differ only along `axis`
/// yield matching line orders.
pub fn line_starts(shape: &[usize], axis: usize) -> Vec<usize> {
    let strides = dense_strides(shape);
    let mut outer = shape.to_vec();
    outer[axis] = 1;
    let mut starts = Vec::with_capacity(outer.iter().product());
    for_each_offset(&outer, &strides, |_, offset| starts.push(offset));
    starts
}

/// Apply `f` to every line of `data` along `axis`; `data` is dense over `shape`.
pub fn for_each_line<T: Copy + Default>(
    data: &mut [T],
    shape: &[usize],
    axis: usize,
    line: &mut Vec<T>,
    mut f: impl FnMut(&mut [T]),
) {
    let n = shape[axis];
    let stride = dense_strides(shape)[axis];
    line.clear();
    line.resize(n, T::default());
    for start in line_starts(shape, axis) {
        for (i, v) in line.iter_mut().enumerate() {
            *v = data[start + i * stride];
        }
        f(line);
        for (i, v) in line.iter().enumerate() {
            data[start + i * stride] = *v;
        }
    }
}

/// Read `shape` elements laid out with `strides` into a dense vector.
///
/// # Safety
/// `src` must be valid for reads at every offset `shape` and `strides` reach.
pub unsafe fn gather<T: Copy + Default>(src: *const T, shape: &[usize], strides: &[usize]) -> Vec<T> {
    let mut out = vec![T::default(); shape.iter().product()];
    for_each_offset(shape, strides, |dense, offset| {
        out[dense] = *src.add(offset);
    });
    out
}

/// Write the dense `data` of `shape` with `strides`.
///
/// # Safety
/// `dst` must be valid for writes at every offset `shape` and `strides` reach.
pub unsafe fn scatter<T: Copy>(data: &[T], dst: *mut T, shape: &[usize], strides: &[usize]) {
    for_each_offset(shape, strides, |dense, offset| {
        *dst.add(offset) = data[dense];
    });
}

/// Gather a planar complex buffer.
///
/// # Safety
/// As for [`gather`], for both halves.
pub unsafe fn gather_planar<T: Float + Default>(
    real: *const T,
    imag: *const T,
    shape: &[usize],
    strides: &[usize],
) -> Vec<Complex<T>> {
    let mut out = vec![Complex::zero(); shape.iter().product()];
    for_each_offset(shape, strides, |dense, offset| {
        out[dense] = Complex::new(*real.add(offset), *imag.add(offset));
    });
    out
}

/// Scatter into a planar complex buffer.
///
/// # Safety
/// As for [`scatter`], for both halves.
pub unsafe fn scatter_planar<T: Float>(
    data: &[Complex<T>],
    real: *mut T,
    imag: *mut T,
    shape: &[usize],
    strides: &[usize],
) {
    for_each_offset(shape, strides, |dense, offset| {
        *real.add(offset) = data[dense].re;
        *imag.add(offset) = data[dense].im;
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_strides_are_row_major() {
        assert_eq!(dense_strides(&[4, 8, 16]), vec![128, 16, 1]);
        assert_eq!(dense_strides(&[7]), vec![1]);
    }

    #[test]
    fn offsets_follow_strides() {
        let mut seen = Vec::new();
        for_each_offset(&[2, 3], &[1, 2], |dense, offset| seen.push((dense, offset)));
        assert_eq!(seen, vec![(0, 0), (1, 2), (2, 4), (3, 1), (4, 3), (5, 5)]);
    }

    #[test]
    fn lines_along_inner_and_outer_axes() {
        assert_eq!(line_starts(&[2, 3], 1), vec![0, 3]);
        assert_eq!(line_starts(&[2, 3], 0), vec![0, 1, 2]);

        let mut data: Vec<u32> = (0..6).collect();
        let mut line = Vec::new();
        for_each_line(&mut data, &[2, 3], 0, &mut line, |l| l.reverse());
        assert_eq!(data, vec![3, 4, 5, 0, 1, 2]);
    }

    #[test]
    fn gather_then_scatter_transposes() {
        let src: Vec<f32> = (0..6).map(|x| x as f32).collect();
        let dense = unsafe { gather(src.as_ptr(), &[3, 2], &[1, 3]) };
        assert_eq!(dense, vec![0.0, 3.0, 1.0, 4.0, 2.0, 5.0]);
        let mut back = vec![0f32; 6];
        unsafe { scatter(&dense, back.as_mut_ptr(), &[3, 2], &[1, 3]) };
        assert_eq!(back, src);
    }
}
