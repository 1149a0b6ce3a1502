//! Transpose by counting scatter
//!
//! CSR is row-major, so a transpose has to re-derive the per-row sorted
//! order for the swapped coordinate set; there is no cheap pointer swap.
//! Scanning the source rows in order keeps the scatter stable, which leaves
//! every output row sorted without a second pass.

use super::Pattern;
use crate::error::Result;
use crate::storage::{CsrStorage, Index};

/// Transpose `src` into a pattern of shape `ncols x nrows`
pub(crate) fn transpose(src: &CsrStorage) -> Result<Pattern> {
    let out_rows = src.ncols();

    let mut row_ptrs = vec![0 as Index; out_rows + 1];
    for &c in src.cols() {
        row_ptrs[c as usize + 1] += 1;
    }
    for i in 0..out_rows {
        row_ptrs[i + 1] += row_ptrs[i];
    }

    let mut next = row_ptrs.clone();
    let mut cols = vec![0 as Index; src.nvals()];
    for (r, c) in src.pairs() {
        cols[next[c as usize] as usize] = r;
        next[c as usize] += 1;
    }

    Ok(Pattern { row_ptrs, cols })
}
