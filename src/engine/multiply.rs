//! Boolean-semiring sparse product (Gustavson row expansion)
//!
//! Over the boolean semiring, AND with a present left entry is identity and
//! AND with an absent one annihilates, so row `i` of the product is just the
//! set union of the right-matrix rows selected by the nonzero columns of
//! `left.row(i)`. Union is commutative, associative and idempotent, which is
//! what permits computing output rows in any order and in parallel.
//!
//! Work per output row is proportional to the sum of the selected right-row
//! sizes, not to the dense dimension.

use super::{assemble_rows, Pattern};
use crate::error::Result;
use crate::storage::{CsrStorage, Index};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

// Below this many left rows the fork/join overhead outweighs the kernel.
#[cfg(feature = "rayon")]
const PAR_ROW_THRESHOLD: usize = 256;

/// Compute the fresh product pattern of `left * right`.
///
/// Dimension compatibility (`left.ncols == right.nrows`) must already be
/// checked. Accumulation into prior result content is layered on top by the
/// caller as a union with the fresh product.
pub(crate) fn multiply(left: &CsrStorage, right: &CsrStorage) -> Result<Pattern> {
    debug_assert_eq!(left.ncols(), right.nrows());
    let nrows = left.nrows();

    #[cfg(feature = "rayon")]
    let rows: Vec<Vec<Index>> = if nrows >= PAR_ROW_THRESHOLD {
        (0..nrows)
            .into_par_iter()
            .map(|i| product_row(left.row(i), right))
            .collect()
    } else {
        (0..nrows).map(|i| product_row(left.row(i), right)).collect()
    };

    #[cfg(not(feature = "rayon"))]
    let rows: Vec<Vec<Index>> = (0..nrows).map(|i| product_row(left.row(i), right)).collect();

    assemble_rows(rows)
}

/// Union of the right rows selected by one left row: gather, sort, dedupe
fn product_row(left_row: &[Index], right: &CsrStorage) -> Vec<Index> {
    let mut gathered: Vec<Index> = Vec::new();
    for &k in left_row {
        gathered.extend_from_slice(right.row(k as usize));
    }
    gathered.sort_unstable();
    gathered.dedup();
    gathered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::{AllocRef, SystemAllocator};
    use std::sync::Arc;

    fn alloc() -> AllocRef {
        Arc::new(SystemAllocator)
    }

    fn storage(nrows: usize, ncols: usize, row_ptrs: &[Index], cols: &[Index]) -> CsrStorage {
        CsrStorage::from_pattern(nrows, ncols, row_ptrs, cols, &alloc()).unwrap()
    }

    #[test]
    fn test_identity_times_b_reproduces_b() {
        // A = identity pattern [2, 2], B:
        // [1, 1]
        // [0, 0]
        let a = storage(2, 2, &[0, 1, 2], &[0, 1]);
        let b = storage(2, 2, &[0, 2, 2], &[0, 1]);
        let p = multiply(&a, &b).unwrap();
        assert_eq!(p.row_ptrs, b.row_ptrs());
        assert_eq!(p.cols, b.cols());
    }

    #[test]
    fn test_row_union_dedupes() {
        // Row 0 of A selects both rows of B, whose column sets overlap
        // A [1, 2]: [1, 1]
        // B [2, 3]: [1, 1, 0]
        //           [0, 1, 1]
        let a = storage(1, 2, &[0, 2], &[0, 1]);
        let b = storage(2, 3, &[0, 2, 4], &[0, 1, 1, 2]);
        let p = multiply(&a, &b).unwrap();
        assert_eq!(p.cols, vec![0, 1, 2]);
    }

    #[test]
    fn test_empty_left_row_yields_empty_output_row() {
        // A [2, 2]: row 0 empty, row 1 = [1]
        let a = storage(2, 2, &[0, 0, 1], &[1]);
        let b = storage(2, 2, &[0, 1, 2], &[0, 1]);
        let p = multiply(&a, &b).unwrap();
        assert_eq!(p.row_ptrs, vec![0, 0, 1]);
        assert_eq!(p.cols, vec![1]);
    }

    #[test]
    fn test_matches_naive_triple_loop() {
        // A [3, 2]:        B [2, 3]:
        // [1, 0]           [0, 1, 1]
        // [1, 1]           [1, 0, 1]
        // [0, 1]
        let a = storage(3, 2, &[0, 1, 3, 4], &[0, 0, 1, 1]);
        let b = storage(2, 3, &[0, 2, 4], &[1, 2, 0, 2]);
        let p = multiply(&a, &b).unwrap();

        let dense_a = [[true, false], [true, true], [false, true]];
        let dense_b = [[false, true, true], [true, false, true]];
        let mut expected: Vec<(Index, Index)> = Vec::new();
        for i in 0..3 {
            for j in 0..3 {
                let mut any = false;
                for (k, b_row) in dense_b.iter().enumerate() {
                    any |= dense_a[i][k] && b_row[j];
                }
                if any {
                    expected.push((i as Index, j as Index));
                }
            }
        }

        let mut got: Vec<(Index, Index)> = Vec::new();
        for i in 0..3 {
            for pos in p.row_ptrs[i] as usize..p.row_ptrs[i + 1] as usize {
                got.push((i as Index, p.cols[pos]));
            }
        }
        assert_eq!(got, expected);
    }
}
