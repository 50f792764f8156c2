//! Axis resolution and planning tests.

use cubek_einops::notation::{AxisId, TransformKind, parse_pattern, resolve};
use cubek_einops::planning::{Operation, ReductionOp, compile};
use cubek_einops::{EinopsError, ErrorClass, ResolvedPattern};
use pretty_assertions::assert_eq;

const REARRANGE: TransformKind = TransformKind::Rearrange;
const SUM: TransformKind = TransformKind::Reduce(ReductionOp::Sum);

fn resolved(pattern: &str, shape: &[usize], axes: &[(&str, usize)], kind: TransformKind) -> ResolvedPattern {
    resolve(&parse_pattern(pattern).unwrap(), shape, axes, kind).unwrap()
}

fn error(pattern: &str, shape: &[usize], axes: &[(&str, usize)], kind: TransformKind) -> EinopsError {
    resolve(&parse_pattern(pattern).unwrap(), shape, axes, kind).unwrap_err()
}

#[test]
fn test_resolve_patch_extraction() {
    let r = resolved(
        "(h ph) (w pw) -> h w (ph pw)",
        &[4, 4],
        &[("ph", 2), ("pw", 2)],
        REARRANGE,
    );
    assert_eq!(r.output_shape, vec![2, 2, 4]);
    assert_eq!(r.axis_dimensions["h"], 2);
    assert_eq!(r.axis_dimensions["w"], 2);
    assert_eq!(r.decomposed_shape().unwrap(), vec![2, 2, 2, 2]);
}

#[test]
fn test_resolve_ellipsis() {
    let r = resolved("b ... c -> b c ...", &[2, 3, 4, 5], &[], REARRANGE);
    assert_eq!(r.ellipsis_dimensions, vec![3, 4]);
    assert_eq!(r.output_shape, vec![2, 5, 3, 4]);
    assert_eq!(r.output_axes[2], AxisId::Anonymous(0));

    // The ellipsis may capture nothing.
    let empty = resolved("b ... -> ... b", &[7], &[], REARRANGE);
    assert_eq!(empty.output_shape, vec![7]);
}

#[test]
fn test_resolve_ellipsis_merged_in_output() {
    let r = resolved("b ... -> b (...)", &[2, 3, 4], &[], REARRANGE);
    assert_eq!(r.output_shape, vec![2, 12]);
}

#[test]
fn test_resolve_singletons() {
    let r = resolved("h 1 w -> 1 h w 1", &[2, 1, 3], &[], REARRANGE);
    assert_eq!(r.output_shape, vec![1, 2, 3, 1]);
    assert!(matches!(
        error("h 1 -> h", &[2, 3], &[], REARRANGE),
        EinopsError::ShapeError { .. }
    ));
}

#[test]
fn test_ambiguous_composite_rejected() {
    let err = error("(h w) -> h w", &[6], &[], REARRANGE);
    assert_eq!(err.class(), ErrorClass::Shape);
    let r = resolved("(h w) -> h w", &[6], &[("h", 2)], REARRANGE);
    assert_eq!(r.output_shape, vec![2, 3]);
}

#[test]
fn test_composite_not_divisible() {
    assert!(matches!(
        error("(h w) -> h w", &[7], &[("w", 2)], REARRANGE),
        EinopsError::ShapeError { .. }
    ));
    // Fully specified but wrong product.
    assert!(matches!(
        error("(h w) -> h w", &[6], &[("h", 2), ("w", 2)], REARRANGE),
        EinopsError::ShapeError { .. }
    ));
}

#[test]
fn test_rank_mismatch() {
    assert_eq!(error("a b -> b a", &[2, 3, 4], &[], REARRANGE).class(), ErrorClass::Shape);
    assert_eq!(error("a b ... -> a b ...", &[2], &[], REARRANGE).class(), ErrorClass::Shape);
    assert_eq!(error(" -> ", &[2], &[], REARRANGE).class(), ErrorClass::Shape);
}

#[test]
fn test_axis_errors() {
    let cases: &[(&str, &[usize], &[(&str, usize)], TransformKind)] = &[
        ("a a -> a", &[2, 2], &[], SUM),
        ("a b -> a a", &[2, 2], &[], REARRANGE),
        ("a -> a c", &[2], &[], REARRANGE),
        ("a b -> a", &[2, 3], &[], REARRANGE),
        ("a -> a", &[2], &[("z", 3)], REARRANGE),
        ("(a b) -> a b", &[6], &[("a", 0)], REARRANGE),
        ("(a b) -> a b", &[6], &[("a", 2), ("a", 3)], REARRANGE),
        ("(a ...) -> a ...", &[6], &[], REARRANGE),
        ("a -> a ...", &[2], &[], REARRANGE),
        ("a ... -> a", &[2, 3], &[], REARRANGE),
        ("a -> a r", &[2], &[], TransformKind::Repeat),
    ];
    for (pattern, shape, axes, kind) in cases {
        let err = error(pattern, shape, axes, *kind);
        assert_eq!(err.class(), ErrorClass::Axis, "pattern '{}' gave {:?}", pattern, err);
    }
}

#[test]
fn test_provided_axis_must_match_shape() {
    assert!(matches!(
        error("a b -> b a", &[2, 3], &[("a", 4)], REARRANGE),
        EinopsError::ShapeError { .. }
    ));
    let ok = resolved("a b -> b a", &[2, 3], &[("a", 2)], REARRANGE);
    assert_eq!(ok.output_shape, vec![3, 2]);
}

#[test]
fn test_reduce_drops_axes() {
    let r = resolved("b c h w -> b c", &[2, 3, 4, 5], &[], SUM);
    assert_eq!(r.output_shape, vec![2, 3]);
    assert_eq!(r.reduced_positions(), vec![2, 3]);

    // An unmatched input ellipsis is reduced away.
    let all = resolved("b ... -> b", &[2, 3, 4], &[], SUM);
    assert_eq!(all.output_shape, vec![2]);

    let scalar = resolved("a b ->", &[2, 3], &[], SUM);
    assert!(scalar.output_shape.is_empty());
}

#[test]
fn test_repeat_new_axes() {
    let r = resolved("h w -> h w c", &[2, 3], &[("c", 4)], TransformKind::Repeat);
    assert_eq!(r.output_shape, vec![2, 3, 4]);
    assert_eq!(r.new_axes(), vec![&AxisId::Named("c".into())]);
}

#[test]
fn test_resolve_is_deterministic() {
    let pattern = parse_pattern("b (h ph) w -> b h (ph w)").unwrap();
    let a = resolve(&pattern, &[2, 6, 5], &[("ph", 3)], REARRANGE).unwrap();
    let b = resolve(&pattern, &[2, 6, 5], &[("ph", 3)], REARRANGE).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_plans() {
    let ops = |pattern: &str, shape: &[usize], axes: &[(&str, usize)], kind| {
        compile(pattern, shape, axes, kind).unwrap().operations().to_vec()
    };

    assert_eq!(ops("a b c -> a b c", &[2, 3, 4], &[], REARRANGE), vec![Operation::Identity]);
    assert_eq!(ops("a 1 b -> a 1 b", &[2, 1, 3], &[], REARRANGE), vec![Operation::Identity]);
    assert_eq!(ops("(h w) -> (h w)", &[6], &[("h", 2)], REARRANGE), vec![Operation::Identity]);
    assert!(compile("(h w) -> (h w)", &[6], &[("h", 2)], REARRANGE).unwrap().is_identity());
    assert_eq!(ops("a b -> b a", &[2, 3], &[], REARRANGE), vec![Operation::Transpose]);
    assert_eq!(
        ops("a b c -> b c a", &[2, 3, 4], &[], REARRANGE),
        vec![Operation::Permute(vec![1, 2, 0])]
    );
    assert_eq!(
        ops("a b c -> a (b c)", &[2, 3, 4], &[], REARRANGE),
        vec![Operation::Reshape(vec![2, 12])]
    );
    assert_eq!(
        ops("(h ph) (w pw) -> h w (ph pw)", &[4, 4], &[("ph", 2), ("pw", 2)], REARRANGE),
        vec![
            Operation::Reshape(vec![2, 2, 2, 2]),
            Operation::Permute(vec![0, 2, 1, 3]),
            Operation::Reshape(vec![2, 2, 4]),
        ]
    );
    assert_eq!(
        ops("a b c -> a c", &[2, 3, 4], &[], SUM),
        vec![Operation::Reduce {
            op: ReductionOp::Sum,
            axes: vec![1],
            keep_dims: false
        }]
    );
    assert_eq!(
        ops("a b -> a b r", &[2, 3], &[("r", 4)], TransformKind::Repeat),
        vec![Operation::Reshape(vec![2, 3, 1]), Operation::Expand(vec![2, 3, 4])]
    );
}

#[test]
fn test_overflowing_shapes_are_shape_errors() {
    let big = 1usize << 40;
    let err = compile("a b -> (a b)", &[big, big], &[], REARRANGE).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Shape);

    let err = error("(a b c) -> a b c", &[8], &[("a", big), ("b", big)], REARRANGE);
    assert_eq!(err.class(), ErrorClass::Shape);

    let err = compile("a -> a r s", &[2], &[("r", big), ("s", big)], TransformKind::Repeat)
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Shape);
}
