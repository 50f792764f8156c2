//! Stride algebra: canonical strides, contiguity and logical-order traversal.

use smallvec::SmallVec;

/// Tensor shape. Most tensors have at most six axes.
pub type Shape = SmallVec<[usize; 6]>;

/// Element strides, one per axis.
pub type Strides = SmallVec<[isize; 6]>;

/// Number of elements in `shape`. The empty shape holds one element.
#[inline]
pub fn numel(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Like [`numel`], but `None` when the product overflows `usize`.
///
/// A zero extent anywhere makes the product zero regardless of the other axes.
pub fn checked_numel(shape: &[usize]) -> Option<usize> {
    if shape.contains(&0) {
        return Some(0);
    }
    shape.iter().try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
}

/// Row-major strides for `shape`.
pub fn contiguous_strides(shape: &[usize]) -> Strides {
    let mut strides: Strides = SmallVec::from_elem(0, shape.len());
    let mut stride = 1isize;
    for axis in (0..shape.len()).rev() {
        strides[axis] = stride;
        stride *= shape[axis].max(1) as isize;
    }
    strides
}

/// Column-major strides for `shape`.
pub fn fortran_strides(shape: &[usize]) -> Strides {
    let mut strides: Strides = SmallVec::from_elem(0, shape.len());
    let mut stride = 1isize;
    for (axis, &dim) in shape.iter().enumerate() {
        strides[axis] = stride;
        stride *= dim.max(1) as isize;
    }
    strides
}

/// Returns true if `strides` walk `shape` in row-major order.
///
/// Axes of extent 1 may carry any stride. Empty tensors are contiguous.
pub fn is_c_contiguous(shape: &[usize], strides: &[isize]) -> bool {
    if shape.contains(&0) {
        return true;
    }
    let mut expected = 1isize;
    for axis in (0..shape.len()).rev() {
        if shape[axis] == 1 {
            continue;
        }
        if strides[axis] != expected {
            return false;
        }
        expected *= shape[axis] as isize;
    }
    true
}

/// Returns true if `strides` walk `shape` in column-major order.
pub fn is_f_contiguous(shape: &[usize], strides: &[isize]) -> bool {
    if shape.contains(&0) {
        return true;
    }
    let mut expected = 1isize;
    for (&dim, &stride) in shape.iter().zip(strides) {
        if dim == 1 {
            continue;
        }
        if stride != expected {
            return false;
        }
        expected *= dim as isize;
    }
    true
}

/// Returns true if any axis of extent > 1 has stride 0 (a broadcast axis).
pub fn has_broadcast(shape: &[usize], strides: &[isize]) -> bool {
    shape.iter().zip(strides).any(|(&dim, &stride)| dim > 1 && stride == 0)
}

/// Lowest and highest buffer positions reachable from `offset`, or `None` for
/// empty tensors. The lower bound may be negative for negative strides.
/// Bounds beyond the `isize` range are clamped to it.
pub fn reachable_range(shape: &[usize], strides: &[isize], offset: usize) -> Option<(isize, isize)> {
    if shape.contains(&0) {
        return None;
    }
    let mut low = offset as i128;
    let mut high = offset as i128;
    for (&dim, &stride) in shape.iter().zip(strides) {
        let span = (dim as i128 - 1).saturating_mul(stride as i128);
        if span < 0 {
            low = low.saturating_add(span);
        } else {
            high = high.saturating_add(span);
        }
    }
    let clamp = |value: i128| value.clamp(isize::MIN as i128, isize::MAX as i128) as isize;
    Some((clamp(low), clamp(high)))
}

/// Iterates buffer positions of a strided tensor in logical row-major order.
///
/// The last axis varies fastest regardless of how the strides are laid out in
/// memory.
#[derive(Debug, Clone)]
pub struct LogicalOffsets<'a> {
    shape: &'a [usize],
    strides: &'a [isize],
    index: Shape,
    current: isize,
    remaining: usize,
}

impl<'a> LogicalOffsets<'a> {
    pub fn new(shape: &'a [usize], strides: &'a [isize], offset: usize) -> Self {
        Self {
            shape,
            strides,
            index: SmallVec::from_elem(0, shape.len()),
            current: offset as isize,
            remaining: numel(shape),
        }
    }
}

impl Iterator for LogicalOffsets<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let position = self.current as usize;
        self.remaining -= 1;

        if self.remaining > 0 {
            for axis in (0..self.shape.len()).rev() {
                self.index[axis] += 1;
                self.current += self.strides[axis];
                if self.index[axis] < self.shape[axis] {
                    break;
                }
                // Carry into the next slower axis.
                self.current -= self.strides[axis] * self.shape[axis] as isize;
                self.index[axis] = 0;
            }
        }

        Some(position)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for LogicalOffsets<'_> {}
