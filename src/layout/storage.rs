//! Strided tensor storage.
//!
//! A [`TensorStorage`] is a typed buffer plus the shape, strides and offset that
//! map logical indices onto it. Metadata operations (permute, transpose, expand,
//! narrow, reshape of a contiguous source) return views that share the buffer.
//! Anything that cannot be expressed as a stride rewrite materializes a fresh
//! contiguous buffer, read in logical row-major order.

use alloc::format;
use alloc::sync::Arc;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use super::copy::{copy_reshape, materialize};
use super::dtype::{DType, Element};
use super::reduce::reduce;
use super::strides::{
    LogicalOffsets, Shape, Strides, checked_numel, contiguous_strides, has_broadcast,
    is_c_contiguous, is_f_contiguous, numel, reachable_range,
};
use crate::error::{EinopsError, EinopsResult};
use crate::planning::{Operation, check_permutation};

/// Layout properties of a [`TensorStorage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayoutFlags {
    /// Strides are canonical row-major (extent-1 axes excepted).
    pub c_contiguous: bool,
    /// Strides are canonical column-major (extent-1 axes excepted).
    pub f_contiguous: bool,
    /// The buffer was not allocated for this tensor.
    pub is_view: bool,
    /// Element writes are allowed. Broadcast views are read-only.
    pub writeable: bool,
}

impl LayoutFlags {
    fn compute(shape: &[usize], strides: &[isize], is_view: bool, writeable: bool) -> Self {
        Self {
            c_contiguous: is_c_contiguous(shape, strides),
            f_contiguous: is_f_contiguous(shape, strides),
            is_view,
            writeable,
        }
    }
}

/// A typed, strided view onto a shared buffer.
#[derive(Debug, Clone)]
pub struct TensorStorage<E: Element> {
    buffer: Arc<Vec<E>>,
    shape: Shape,
    strides: Strides,
    offset: usize,
    flags: LayoutFlags,
}

impl<E: Element> TensorStorage<E> {
    /// Wraps a row-major buffer.
    ///
    /// # Errors
    ///
    /// [`EinopsError::LayoutError`] if `data.len()` does not match the shape, or
    /// if the shape's element count overflows `usize`.
    pub fn from_vec(data: Vec<E>, shape: &[usize]) -> EinopsResult<Self> {
        if data.len() != element_count(shape)? {
            return Err(EinopsError::layout(format!(
                "buffer of {} elements does not match shape {:?}",
                data.len(),
                shape
            )));
        }
        Ok(Self::owned(data, shape))
    }

    /// Builds a view over an existing buffer.
    ///
    /// # Errors
    ///
    /// [`EinopsError::LayoutError`] if `strides` and `shape` differ in rank, if the
    /// element count overflows `usize`, or if any reachable position falls outside
    /// the buffer.
    pub fn from_parts(
        buffer: Arc<Vec<E>>,
        shape: &[usize],
        strides: &[isize],
        offset: usize,
    ) -> EinopsResult<Self> {
        if shape.len() != strides.len() {
            return Err(EinopsError::layout(format!(
                "shape {:?} and strides {:?} differ in rank",
                shape, strides
            )));
        }
        element_count(shape)?;
        if let Some((low, high)) = reachable_range(shape, strides, offset) {
            if low < 0 || high >= buffer.len() as isize {
                return Err(EinopsError::layout(format!(
                    "view (shape {:?}, strides {:?}, offset {}) exceeds buffer of {} elements",
                    shape,
                    strides,
                    offset,
                    buffer.len()
                )));
            }
        }
        let writeable = !has_broadcast(shape, strides);
        Ok(Self {
            buffer,
            shape: Shape::from_slice(shape),
            strides: Strides::from_slice(strides),
            offset,
            flags: LayoutFlags::compute(shape, strides, true, writeable),
        })
    }

    /// A rank-0 tensor holding one value.
    pub fn scalar(value: E) -> Self {
        Self::owned(alloc::vec![value], &[])
    }

    pub(crate) fn owned(data: Vec<E>, shape: &[usize]) -> Self {
        let strides = contiguous_strides(shape);
        let flags = LayoutFlags::compute(shape, &strides, false, true);
        Self {
            buffer: Arc::new(data),
            shape: Shape::from_slice(shape),
            strides,
            offset: 0,
            flags,
        }
    }

    fn view(&self, shape: Shape, strides: Strides, offset: usize, writeable: bool) -> Self {
        let flags = LayoutFlags::compute(&shape, &strides, true, writeable);
        Self {
            buffer: Arc::clone(&self.buffer),
            shape,
            strides,
            offset,
            flags,
        }
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn dtype(&self) -> DType {
        E::DTYPE
    }

    #[inline]
    pub fn flags(&self) -> LayoutFlags {
        self.flags
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    #[inline]
    pub fn numel(&self) -> usize {
        numel(&self.shape)
    }

    #[inline]
    pub fn is_contiguous(&self) -> bool {
        self.flags.c_contiguous
    }

    /// The backing buffer, which may hold elements outside this view.
    #[inline]
    pub fn buffer(&self) -> &[E] {
        &self.buffer
    }

    /// Returns true if both tensors read the same buffer.
    #[inline]
    pub fn shares_buffer(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.buffer, &other.buffer)
    }

    fn position(&self, index: &[usize]) -> EinopsResult<usize> {
        if index.len() != self.rank() {
            return Err(EinopsError::layout(format!(
                "index {:?} has rank {}, tensor has rank {}",
                index,
                index.len(),
                self.rank()
            )));
        }
        let mut position = self.offset as isize;
        for (axis, (&i, &dim)) in index.iter().zip(self.shape.iter()).enumerate() {
            if i >= dim {
                return Err(EinopsError::layout(format!(
                    "index {} out of bounds for axis {} of extent {}",
                    i, axis, dim
                )));
            }
            position += i as isize * self.strides[axis];
        }
        Ok(position as usize)
    }

    /// Reads the element at a logical index.
    pub fn get(&self, index: &[usize]) -> EinopsResult<E> {
        let position = self.position(index)?;
        Ok(self.buffer[position])
    }

    /// Writes the element at a logical index.
    ///
    /// A buffer shared with other tensors is cloned first, so the write is never
    /// visible through them.
    ///
    /// # Errors
    ///
    /// [`EinopsError::LayoutError`] for out-of-bounds indices and read-only
    /// (broadcast) views.
    pub fn set(&mut self, index: &[usize], value: E) -> EinopsResult<()> {
        if !self.flags.writeable {
            return Err(EinopsError::layout("cannot write through a broadcast view"));
        }
        let position = self.position(index)?;
        Arc::make_mut(&mut self.buffer)[position] = value;
        Ok(())
    }

    /// Buffer positions in logical row-major order.
    pub fn offsets(&self) -> LogicalOffsets<'_> {
        LogicalOffsets::new(&self.shape, &self.strides, self.offset)
    }

    /// Elements in logical row-major order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = E> + '_ {
        self.offsets().map(move |position| self.buffer[position])
    }

    /// Copies the elements out in logical row-major order.
    pub fn to_vec(&self) -> Vec<E> {
        materialize(self)
    }

    /// Returns a contiguous copy. Always allocates.
    pub fn to_contiguous(&self) -> Self {
        Self::owned(materialize(self), &self.shape)
    }

    /// Reorders axes: output axis `i` is input axis `order[i]`. Never copies.
    pub fn permute(&self, order: &[usize]) -> EinopsResult<Self> {
        check_permutation(order, self.rank())?;
        let shape = order.iter().map(|&axis| self.shape[axis]).collect();
        let strides = order.iter().map(|&axis| self.strides[axis]).collect();
        Ok(self.view(shape, strides, self.offset, self.flags.writeable))
    }

    /// Reverses all axes. Never copies.
    pub fn transpose(&self) -> Self {
        let shape = self.shape.iter().rev().copied().collect();
        let strides = self.strides.iter().rev().copied().collect();
        self.view(shape, strides, self.offset, self.flags.writeable)
    }

    /// Reinterprets the tensor with a new shape of the same element count.
    ///
    /// Contiguous (and single-element) sources become views, as do reshapes that
    /// only insert or drop extent-1 axes. Other sources are first copied in
    /// logical order.
    pub fn reshape(&self, target: &[usize]) -> EinopsResult<Self> {
        let count = element_count(target)?;
        if count != self.numel() {
            return Err(EinopsError::layout(format!(
                "cannot reshape {:?} ({} elements) into {:?} ({} elements)",
                self.shape(),
                self.numel(),
                target,
                count
            )));
        }
        if self.flags.c_contiguous || self.numel() <= 1 {
            let strides = contiguous_strides(target);
            return Ok(self.view(
                Shape::from_slice(target),
                strides,
                self.offset,
                self.flags.writeable,
            ));
        }
        if let Some(strides) = self.unit_axis_strides(target) {
            return Ok(self.view(
                Shape::from_slice(target),
                strides,
                self.offset,
                self.flags.writeable,
            ));
        }
        copy_reshape(self, target)
    }

    /// Strides for `target` when it differs from the current shape only by
    /// extent-1 axes. Inserted axes get stride 0.
    fn unit_axis_strides(&self, target: &[usize]) -> Option<Strides> {
        let mut source = self
            .shape
            .iter()
            .zip(self.strides.iter())
            .filter(|&(&dim, _)| dim != 1);
        let mut strides = Strides::with_capacity(target.len());
        for &dim in target {
            if dim == 1 {
                strides.push(0);
                continue;
            }
            match source.next() {
                Some((&from, &stride)) if from == dim => strides.push(stride),
                _ => return None,
            }
        }
        match source.next() {
            Some(_) => None,
            None => Some(strides),
        }
    }

    /// Broadcasts extent-1 axes to `target`. The result is read-only when any
    /// axis grows.
    pub fn expand(&self, target: &[usize]) -> EinopsResult<Self> {
        if target.len() != self.rank() {
            return Err(EinopsError::layout(format!(
                "cannot expand rank {} to rank {}",
                self.rank(),
                target.len()
            )));
        }
        element_count(target)?;
        let mut strides = self.strides.clone();
        let mut grown = false;
        for (axis, (&from, &to)) in self.shape.iter().zip(target).enumerate() {
            if from == to {
                continue;
            }
            if from != 1 {
                return Err(EinopsError::layout(format!(
                    "cannot expand axis {} from {} to {}",
                    axis, from, to
                )));
            }
            strides[axis] = 0;
            grown = true;
        }
        let writeable = self.flags.writeable && !grown;
        Ok(self.view(Shape::from_slice(target), strides, self.offset, writeable))
    }

    /// Restricts `axis` to `start..start + len`. Never copies.
    pub fn narrow(&self, axis: usize, start: usize, len: usize) -> EinopsResult<Self> {
        let Some(&extent) = self.shape.get(axis) else {
            return Err(EinopsError::layout(format!(
                "axis {} out of range for rank {}",
                axis,
                self.rank()
            )));
        };
        if start.checked_add(len).is_none_or(|end| end > extent) {
            return Err(EinopsError::layout(format!(
                "range {}..{}+{} out of bounds for axis {} of extent {}",
                start, start, len, axis, extent
            )));
        }
        let mut shape = self.shape.clone();
        shape[axis] = len;
        let offset = if len == 0 {
            self.offset
        } else {
            (self.offset as isize + start as isize * self.strides[axis]) as usize
        };
        Ok(self.view(shape, self.strides.clone(), offset, self.flags.writeable))
    }

    /// Applies one planned operation.
    ///
    /// `Identity` returns `self` untouched.
    pub fn apply(self, operation: &Operation) -> EinopsResult<Self> {
        match operation {
            Operation::Reshape(target) => self.reshape(target),
            Operation::Permute(order) => self.permute(order),
            Operation::Transpose => Ok(self.transpose()),
            Operation::Expand(target) => self.expand(target),
            Operation::Reduce {
                op,
                axes,
                keep_dims,
            } => reduce(&self, *op, axes, *keep_dims),
            Operation::Identity => Ok(self),
        }
    }
}

impl<E: Element> PartialEq for TensorStorage<E> {
    /// Logical equality: same shape and same elements in row-major order.
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape && self.iter().eq(other.iter())
    }
}

fn element_count(shape: &[usize]) -> EinopsResult<usize> {
    checked_numel(shape).ok_or_else(|| {
        EinopsError::layout(format!("element count of shape {:?} overflows usize", shape))
    })
}
