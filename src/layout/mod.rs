//! Reference layout engine.
//!
//! Applies planned [`Operation`](crate::planning::Operation)s to strided,
//! possibly non-contiguous, CPU buffers.

mod copy;
mod dtype;
mod reduce;
mod storage;
mod strides;

pub use copy::{copy_reshape, materialize};
pub use dtype::{DType, Element};
pub use reduce::reduce;
pub use storage::{LayoutFlags, TensorStorage};
pub use strides::{
    LogicalOffsets, Shape, Strides, checked_numel, contiguous_strides, fortran_strides,
    has_broadcast, is_c_contiguous, is_f_contiguous, numel, reachable_range,
};
