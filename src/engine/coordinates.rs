//! Build path: coordinate pairs to CSR
//!
//! Bounds-check, order, dedupe, compress. The scatter is a counting sort by
//! row, so it tolerates a lying `sorted` flag without panicking (the result
//! is undefined in that case, per the build contract).

use super::{checked_count, Pattern};
use crate::error::{Error, Result};
use crate::storage::Index;

/// Compress an unordered coordinate set into a CSR pattern.
///
/// Every `(row, col)` pair denotes one true entry; duplicates are always
/// collapsed. When `sorted` is false the pairs are sorted by (row, col)
/// first; when true the caller asserts that order and the sort is skipped.
pub(crate) fn compress(
    nrows: usize,
    ncols: usize,
    rows: &[Index],
    cols: &[Index],
    sorted: bool,
) -> Result<Pattern> {
    if rows.len() != cols.len() {
        return Err(Error::invalid_argument(
            "rows/cols",
            format!(
                "coordinate slices differ in length: {} vs {}",
                rows.len(),
                cols.len()
            ),
        ));
    }
    for &r in rows {
        if r as usize >= nrows {
            return Err(Error::IndexOutOfBounds {
                index: r as usize,
                size: nrows,
            });
        }
    }
    for &c in cols {
        if c as usize >= ncols {
            return Err(Error::IndexOutOfBounds {
                index: c as usize,
                size: ncols,
            });
        }
    }
    checked_count(rows.len())?;

    let mut pairs: Vec<(Index, Index)> = rows.iter().copied().zip(cols.iter().copied()).collect();
    if !sorted {
        pairs.sort_unstable();
    }
    pairs.dedup();

    // Counting scatter by row; stable, so sorted input stays column-sorted
    // within each row.
    let mut counts = vec![0 as Index; nrows + 1];
    for &(r, _) in &pairs {
        counts[r as usize + 1] += 1;
    }
    let mut row_ptrs = counts;
    for i in 0..nrows {
        row_ptrs[i + 1] += row_ptrs[i];
    }

    let mut next = row_ptrs.clone();
    let mut out_cols = vec![0 as Index; pairs.len()];
    for (r, c) in pairs {
        out_cols[next[r as usize] as usize] = c;
        next[r as usize] += 1;
    }

    Ok(Pattern {
        row_ptrs,
        cols: out_cols,
    })
}
