//! Materialization of strided tensors into contiguous buffers.
//!
//! When a tensor has been permuted, narrowed or broadcast via stride
//! manipulation and then needs to be reshaped, its elements must be copied into
//! a fresh row-major buffer in logical order before the reshape is valid.

use alloc::format;
use alloc::vec::Vec;

use super::dtype::Element;
use super::storage::TensorStorage;
use super::strides::numel;
use crate::error::{EinopsError, EinopsResult};

/// Copies the elements of `source` in logical row-major order.
///
/// Contiguous sources are copied as one slice.
pub fn materialize<E: Element>(source: &TensorStorage<E>) -> Vec<E> {
    let count = source.numel();
    if source.is_contiguous() {
        let start = source.offset();
        if let Some(slice) = source.buffer().get(start..start + count) {
            return slice.to_vec();
        }
    }
    source.iter().collect()
}

/// Copies `source` into a fresh contiguous tensor with shape `target`.
///
/// # Errors
///
/// [`EinopsError::LayoutError`] if the element counts differ.
pub fn copy_reshape<E: Element>(
    source: &TensorStorage<E>,
    target: &[usize],
) -> EinopsResult<TensorStorage<E>> {
    let count = source.numel();
    if count != numel(target) {
        return Err(EinopsError::layout(format!(
            "copy_reshape: element count mismatch {} vs {}",
            count,
            numel(target)
        )));
    }

    tracing::debug!(
        from = ?source.shape(),
        strides = ?source.strides(),
        to = ?target,
        elements = count,
        "materializing non-contiguous tensor"
    );

    Ok(TensorStorage::owned(materialize(source), target))
}
