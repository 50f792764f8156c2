//! Layout engine tests: views, materialization and reductions.

use std::sync::Arc;

use cubek_einops::layout::{DType, TensorStorage, contiguous_strides, reduce};
use cubek_einops::planning::{Operation, ReductionOp};
use cubek_einops::{EinopsError, ErrorClass};
use half::f16;
use pretty_assertions::assert_eq;

fn matrix() -> TensorStorage<f32> {
    TensorStorage::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap()
}

#[test]
fn test_transpose_then_flatten_reads_logical_order() {
    let t = matrix().transpose();
    assert_eq!(t.shape(), &[3, 2]);
    assert_eq!(t.strides(), &[1, 3]);

    let flat = t.reshape(&[6]).unwrap();
    assert_eq!(flat.to_vec(), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
}

#[test]
fn test_permute_never_copies() {
    let t = TensorStorage::from_vec((0..24).collect::<Vec<i64>>(), &[2, 3, 4]).unwrap();
    let p = t.permute(&[2, 0, 1]).unwrap();
    assert!(p.shares_buffer(&t));
    assert_eq!(p.shape(), &[4, 2, 3]);
    assert_eq!(p.strides(), &[1, 12, 4]);
    assert!(p.flags().is_view);
    assert_eq!(p.get(&[3, 1, 2]).unwrap(), 23);
    assert!(t.permute(&[0, 1]).is_err());
}

#[test]
fn test_permute_round_trip_is_contiguous() {
    let t = matrix();
    let back = t.permute(&[1, 0]).unwrap().permute(&[1, 0]).unwrap();
    assert!(back.is_contiguous());
    assert_eq!(back, t);
}

#[test]
fn test_reshape_contiguous_shares_buffer() {
    let t = matrix();
    let r = t.reshape(&[3, 1, 2]).unwrap();
    assert!(r.shares_buffer(&t));
    assert_eq!(r.strides(), contiguous_strides(&[3, 1, 2]).as_slice());
}

#[test]
fn test_reshape_element_count_mismatch() {
    let err = matrix().reshape(&[4, 2]).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Layout);
}

#[test]
fn test_narrow_then_reshape_copies() {
    let t = TensorStorage::from_vec((0..16).collect::<Vec<u32>>(), &[4, 4]).unwrap();
    let block = t.narrow(0, 1, 2).unwrap().narrow(1, 1, 2).unwrap();
    assert_eq!(block.offset(), 5);
    assert_eq!(block.to_vec(), vec![5, 6, 9, 10]);

    let flat = block.reshape(&[4]).unwrap();
    assert!(!flat.shares_buffer(&t));
    assert_eq!(flat.to_vec(), vec![5, 6, 9, 10]);
}

#[test]
fn test_expand_and_materialize() {
    let row = TensorStorage::from_vec(vec![1u8, 2, 3], &[1, 3]).unwrap();
    let grid = row.expand(&[2, 3]).unwrap();
    assert_eq!(grid.strides(), &[0, 1]);
    assert!(!grid.flags().writeable);
    assert!(!grid.is_contiguous());

    let owned = grid.to_contiguous();
    assert!(owned.flags().writeable);
    assert!(!owned.flags().is_view);
    assert_eq!(owned.to_vec(), vec![1, 2, 3, 1, 2, 3]);
}

#[test]
fn test_write_through_broadcast_rejected() {
    let row = TensorStorage::from_vec(vec![1u8, 2, 3], &[1, 3]).unwrap();
    let mut grid = row.expand(&[2, 3]).unwrap();
    assert!(matches!(
        grid.set(&[1, 1], 0),
        Err(EinopsError::LayoutError { .. })
    ));
}

#[test]
fn test_view_write_does_not_leak() {
    let source = matrix();
    let mut view = source.reshape(&[6]).unwrap();
    view.set(&[0], 100.0).unwrap();
    assert_eq!(source.get(&[0, 0]).unwrap(), 1.0);
    assert_eq!(view.get(&[0]).unwrap(), 100.0);
}

#[test]
fn test_from_parts_column_major() {
    let buffer = Arc::new(vec![1, 4, 2, 5, 3, 6]);
    let t = TensorStorage::from_parts(buffer, &[2, 3], &[1, 2], 0).unwrap();
    assert!(t.flags().f_contiguous);
    assert!(!t.flags().c_contiguous);
    assert_eq!(t.to_vec(), vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn test_apply_sequence() {
    let ops = [
        Operation::Reshape(vec![2, 3, 1]),
        Operation::Expand(vec![2, 3, 2]),
        Operation::Transpose,
        Operation::Reshape(vec![12]),
    ];
    let mut t = TensorStorage::from_vec((0..6).collect::<Vec<i32>>(), &[6]).unwrap();
    for op in &ops {
        t = t.apply(op).unwrap();
    }
    assert_eq!(t.to_vec(), vec![0, 3, 1, 4, 2, 5, 0, 3, 1, 4, 2, 5]);
}

#[test]
fn test_reduce_keep_dims_and_dtype() {
    let data: Vec<f16> = [1.0f32, 2.0, 3.0, 4.0].iter().map(|&v| f16::from_f32(v)).collect();
    let t = TensorStorage::from_vec(data, &[2, 2]).unwrap();
    let mean = reduce(&t, ReductionOp::Mean, &[1], true).unwrap();
    assert_eq!(mean.dtype(), DType::F16);
    assert_eq!(mean.shape(), &[2, 1]);
    assert_eq!(mean.to_vec(), vec![f16::from_f32(1.5), f16::from_f32(3.5)]);
}

#[test]
fn test_reduce_empty_axis() {
    let t = TensorStorage::<i32>::from_vec(Vec::new(), &[3, 0]).unwrap();
    assert_eq!(reduce(&t, ReductionOp::Sum, &[1], false).unwrap().to_vec(), vec![0, 0, 0]);
    assert_eq!(reduce(&t, ReductionOp::Prod, &[1], false).unwrap().to_vec(), vec![1, 1, 1]);
    assert_eq!(
        reduce(&t, ReductionOp::Mean, &[1], false).unwrap_err().class(),
        ErrorClass::Shape
    );
}
