//! Property tests over generated matrices

use proptest::prelude::*;

use spbool::prelude::*;

/// Strategy: dimensions plus a coordinate list inside them
fn coords(
    max_dim: usize,
    max_nvals: usize,
) -> impl Strategy<Value = (usize, usize, Vec<(Index, Index)>)> {
    (1..=max_dim, 1..=max_dim).prop_flat_map(move |(nrows, ncols)| {
        let pair = (0..nrows as Index, 0..ncols as Index);
        (
            Just(nrows),
            Just(ncols),
            prop::collection::vec(pair, 0..=max_nvals),
        )
    })
}

fn ready_context() -> Context {
    let ctx = Context::new();
    ctx.initialize(InitHints {
        force_cpu: true,
        ..Default::default()
    })
    .unwrap();
    ctx
}

fn build(ctx: &Context, nrows: usize, ncols: usize, pairs: &[(Index, Index)]) -> Matrix {
    let rows: Vec<Index> = pairs.iter().map(|p| p.0).collect();
    let cols: Vec<Index> = pairs.iter().map(|p| p.1).collect();
    let m = ctx.matrix_new(nrows, ncols).unwrap();
    ctx.matrix_build(m, &rows, &cols, BuildHints::default())
        .unwrap();
    m
}

fn dense(ctx: &Context, m: Matrix) -> Vec<Vec<bool>> {
    let nrows = ctx.matrix_nrows(m).unwrap();
    let ncols = ctx.matrix_ncols(m).unwrap();
    let (rows, cols) = ctx.matrix_pairs(m).unwrap();
    let mut out = vec![vec![false; ncols]; nrows];
    for (r, c) in rows.into_iter().zip(cols) {
        out[r as usize][c as usize] = true;
    }
    out
}

proptest! {
    #[test]
    fn prop_build_idempotent((nrows, ncols, mut pairs) in coords(12, 48)) {
        let ctx = ready_context();
        let a = build(&ctx, nrows, ncols, &pairs);
        pairs.reverse();
        let b = build(&ctx, nrows, ncols, &pairs);
        prop_assert_eq!(ctx.matrix_pairs(a).unwrap(), ctx.matrix_pairs(b).unwrap());
    }

    #[test]
    fn prop_transpose_involution((nrows, ncols, pairs) in coords(12, 48)) {
        let ctx = ready_context();
        let a = build(&ctx, nrows, ncols, &pairs);
        let t = ctx.matrix_new(ncols, nrows).unwrap();
        ctx.transpose(t, a).unwrap();
        let tt = ctx.matrix_new(nrows, ncols).unwrap();
        ctx.transpose(tt, t).unwrap();
        prop_assert_eq!(ctx.matrix_pairs(a).unwrap(), ctx.matrix_pairs(tt).unwrap());
    }

    #[test]
    fn prop_multiply_matches_naive(
        (m, t, a_pairs) in coords(10, 40),
        (_t2, n, b_raw) in coords(10, 40),
    ) {
        // Rescale B's rows into A's inner dimension so shapes compose
        let ctx = ready_context();
        let a = build(&ctx, m, t, &a_pairs);
        let b_pairs: Vec<(Index, Index)> = b_raw
            .iter()
            .map(|&(r, c)| (r % t as Index, c))
            .collect();
        let b = build(&ctx, t, n, &b_pairs);

        let c = ctx.matrix_new(m, n).unwrap();
        ctx.multiply(c, a, b, MultiplyHints::default()).unwrap();

        let d_a = dense(&ctx, a);
        let d_b = dense(&ctx, b);
        let d_c = dense(&ctx, c);
        for i in 0..m {
            for j in 0..n {
                let mut expected = false;
                for k in 0..t {
                    expected |= d_a[i][k] && d_b[k][j];
                }
                prop_assert_eq!(d_c[i][j], expected);
            }
        }
    }

    #[test]
    fn prop_ewise_union_and_intersection(
        (nrows, ncols, a_pairs) in coords(10, 40),
        b_raw in prop::collection::vec((0u32..64, 0u32..64), 0..40),
    ) {
        let ctx = ready_context();
        let a = build(&ctx, nrows, ncols, &a_pairs);
        let b_pairs: Vec<(Index, Index)> = b_raw
            .iter()
            .map(|&(r, c)| (r % nrows as Index, c % ncols as Index))
            .collect();
        let b = build(&ctx, nrows, ncols, &b_pairs);

        let union = ctx.matrix_new(nrows, ncols).unwrap();
        ctx.ewise_add(union, a, b).unwrap();
        let inter = ctx.matrix_new(nrows, ncols).unwrap();
        ctx.ewise_mult(inter, a, b).unwrap();

        let d_a = dense(&ctx, a);
        let d_b = dense(&ctx, b);
        let d_union = dense(&ctx, union);
        let d_inter = dense(&ctx, inter);
        for i in 0..nrows {
            for j in 0..ncols {
                prop_assert_eq!(d_union[i][j], d_a[i][j] || d_b[i][j]);
                prop_assert_eq!(d_inter[i][j], d_a[i][j] && d_b[i][j]);
            }
        }
    }

    #[test]
    fn prop_kronecker_size_law(
        (m, n, a_pairs) in coords(6, 12),
        (k, t, b_pairs) in coords(6, 12),
    ) {
        let ctx = ready_context();
        let a = build(&ctx, m, n, &a_pairs);
        let b = build(&ctx, k, t, &b_pairs);
        let c = ctx.matrix_new(m * k, n * t).unwrap();
        ctx.kronecker(c, a, b).unwrap();
        prop_assert_eq!(
            ctx.matrix_nvals(c).unwrap(),
            ctx.matrix_nvals(a).unwrap() * ctx.matrix_nvals(b).unwrap()
        );
    }
}
