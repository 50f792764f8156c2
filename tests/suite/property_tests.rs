//! Property-based tests for the pattern compiler and layout engine.

use cubek_einops::layout::TensorStorage;
use cubek_einops::notation::{TransformKind, parse_pattern, resolve, tokenize};
use cubek_einops::planning::{ReductionOp, compile};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

/// Shapes of rank 1..=4 with small extents.
fn shape_strategy() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(1usize..5, 1..=4)
}

/// A shape together with a permutation of its axes.
fn shape_and_permutation() -> impl Strategy<Value = (Vec<usize>, Vec<usize>)> {
    shape_strategy().prop_flat_map(|shape| {
        let order: Vec<usize> = (0..shape.len()).collect();
        (Just(shape), Just(order).prop_shuffle())
    })
}

const NAMES: [&str; 4] = ["a", "b", "c", "d"];

fn side(order: &[usize]) -> String {
    order.iter().map(|&i| NAMES[i]).collect::<Vec<_>>().join(" ")
}

fn iota(shape: &[usize]) -> TensorStorage<i64> {
    let n: usize = shape.iter().product();
    TensorStorage::from_vec((0..n as i64).collect(), shape).unwrap()
}

/// Reference transpose: reads `input` through explicit nested indices.
fn permuted_reference(input: &TensorStorage<i64>, order: &[usize]) -> Vec<i64> {
    let out_shape: Vec<usize> = order.iter().map(|&a| input.shape()[a]).collect();
    let n: usize = out_shape.iter().product();
    let mut values = Vec::with_capacity(n);
    let mut out_index = vec![0usize; out_shape.len()];
    for _ in 0..n {
        let mut in_index = vec![0usize; order.len()];
        for (i, &axis) in order.iter().enumerate() {
            in_index[axis] = out_index[i];
        }
        values.push(input.get(&in_index).unwrap());
        for axis in (0..out_shape.len()).rev() {
            out_index[axis] += 1;
            if out_index[axis] < out_shape[axis] {
                break;
            }
            out_index[axis] = 0;
        }
    }
    values
}

// ============================================================================
// Compiler Properties
// ============================================================================

proptest! {
    /// Property: token spans reconstruct the pattern exactly
    #[test]
    fn prop_tokenize_round_trip(
        words in prop::collection::vec("[a-z_][a-z0-9_]{0,3}|1|\\.\\.\\.|\\(|\\)|->", 0..12),
        gaps in prop::collection::vec("[ \t\n]{1,2}", 12),
    ) {
        let pattern: String = words
            .iter()
            .zip(gaps.iter())
            .map(|(w, g)| format!("{}{}", w, g))
            .collect();
        let tokens = tokenize(&pattern).unwrap();
        let rebuilt: String = tokens.iter().map(|t| t.span.slice(&pattern)).collect();
        prop_assert_eq!(rebuilt, pattern);
    }

    /// Property: resolving twice gives structurally identical results
    #[test]
    fn prop_resolve_deterministic((shape, order) in shape_and_permutation()) {
        let input = side(&(0..shape.len()).collect::<Vec<_>>());
        let pattern = parse_pattern(&format!("{} -> {}", input, side(&order))).unwrap();
        let first = resolve(&pattern, &shape, &[], TransformKind::Rearrange).unwrap();
        let second = resolve(&pattern, &shape, &[], TransformKind::Rearrange).unwrap();
        prop_assert_eq!(first, second);
    }

    /// Property: rearrange preserves the element count, merges included
    #[test]
    fn prop_rearrange_preserves_numel((shape, order) in shape_and_permutation()) {
        let input = side(&(0..shape.len()).collect::<Vec<_>>());
        let output = format!("({})", side(&order));
        let recipe = compile(
            &format!("{} -> {}", input, output),
            &shape,
            &[],
            TransformKind::Rearrange,
        )
        .unwrap();
        let numel: usize = shape.iter().product();
        prop_assert_eq!(recipe.output_shape(), &[numel][..]);
    }

    /// Property: reduce divides the element count by the reduced extents
    #[test]
    fn prop_reduce_shape_product(shape in shape_strategy(), keep in 0usize..4) {
        let keep = keep.min(shape.len() - 1);
        let all: Vec<usize> = (0..shape.len()).collect();
        let pattern = format!("{} -> {}", side(&all), side(&all[..=keep]));
        let recipe = compile(
            &pattern,
            &shape,
            &[],
            TransformKind::Reduce(ReductionOp::Sum),
        )
        .unwrap();
        let kept: usize = shape[..=keep].iter().product();
        prop_assert_eq!(recipe.output_shape().iter().product::<usize>(), kept);
    }

    /// Property: repeat multiplies the element count by the new axis size
    #[test]
    fn prop_repeat_shape_product(shape in shape_strategy(), times in 1usize..4) {
        let all: Vec<usize> = (0..shape.len()).collect();
        let pattern = format!("{} -> {} r", side(&all), side(&all));
        let recipe = compile(&pattern, &shape, &[("r", times)], TransformKind::Repeat).unwrap();
        let numel: usize = shape.iter().product();
        prop_assert_eq!(recipe.output_shape().iter().product::<usize>(), numel * times);
    }
}

// ============================================================================
// Layout Properties
// ============================================================================

proptest! {
    /// Property: flattening a permuted view reads elements in logical order
    #[test]
    fn prop_flatten_follows_logical_order((shape, order) in shape_and_permutation()) {
        let input = iota(&shape);
        let view = input.permute(&order).unwrap();
        let expected = permuted_reference(&input, &order);

        let flat = view.reshape(&[expected.len()]).unwrap();
        prop_assert_eq!(flat.to_vec(), expected);
    }

    /// Property: executing a rearrange matches the reference permutation
    #[test]
    fn prop_rearrange_matches_reference((shape, order) in shape_and_permutation()) {
        let input = iota(&shape);
        let all: Vec<usize> = (0..shape.len()).collect();
        let pattern = format!("{} -> {}", side(&all), side(&order));
        let output = cubek_einops::rearrange(input.clone(), &pattern, &[]).unwrap();
        prop_assert_eq!(output.to_vec(), permuted_reference(&input, &order));
    }

    /// Property: sum over all axes equals the sum of the buffer
    #[test]
    fn prop_sum_all(shape in shape_strategy()) {
        let input = iota(&shape);
        let all: Vec<usize> = (0..shape.len()).collect();
        let pattern = format!("{} ->", side(&all));
        let total = cubek_einops::reduce(input.clone(), &pattern, ReductionOp::Sum, &[]).unwrap();
        prop_assert_eq!(total.get(&[]).unwrap(), input.iter().sum::<i64>());
    }
}
