//! Kronecker product of boolean patterns
//!
//! Every entry (i, j) of the left operand stamps a shifted copy of the right
//! operand into the output block at (i*K, j*T). Because each left row is
//! sorted, the per-block column runs are emitted in strictly increasing
//! order, so the output is produced directly in CSR order with no sort.

use super::{checked_count, Pattern};
use crate::error::Result;
use crate::storage::{CsrStorage, Index};

/// Kronecker product pattern of shape `(M*K) x (N*T)`.
///
/// The result dimension products must already be validated against the
/// destination matrix. Output size is exactly `nvals(a) * nvals(b)`.
pub(crate) fn kronecker(a: &CsrStorage, b: &CsrStorage) -> Result<Pattern> {
    let k = b.nrows();
    let t = b.ncols() as u64;
    let out_rows = a.nrows() * k;

    let total = a.nvals().checked_mul(b.nvals()).unwrap_or(usize::MAX);
    checked_count(total)?;

    let mut row_ptrs = Vec::with_capacity(out_rows + 1);
    row_ptrs.push(0);
    let mut cols = Vec::with_capacity(total);

    for i in 0..a.nrows() {
        let a_row = a.row(i);
        for kk in 0..k {
            let b_row = b.row(kk);
            for &j in a_row {
                let base = j as u64 * t;
                for &l in b_row {
                    cols.push((base + l as u64) as Index);
                }
            }
            row_ptrs.push(checked_count(cols.len())?);
        }
    }

    Ok(Pattern { row_ptrs, cols })
}
