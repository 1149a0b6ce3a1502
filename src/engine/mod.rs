//! Host kernels over CSR patterns
//!
//! Every structural operation is implemented here once, as a pure function
//! from input storage to a fresh output pattern. Both backends execute these
//! kernels; the accelerator backend additionally stages operands through
//! device memory. Kernels never mutate their inputs, which is what lets the
//! context commit results with a plain swap.

pub(crate) mod coordinates;
pub(crate) mod ewise;
pub(crate) mod kronecker;
pub(crate) mod multiply;
pub(crate) mod transpose;

use crate::error::{Error, Result};
use crate::storage::Index;

/// An assembled CSR pattern, not yet materialized into allocator-owned
/// storage
pub(crate) struct Pattern {
    pub row_ptrs: Vec<Index>,
    pub cols: Vec<Index>,
}

impl Pattern {
    /// Number of entries in the pattern
    pub fn nvals(&self) -> usize {
        self.cols.len()
    }
}

/// Narrow an entry count to the index type.
///
/// Structural results are addressed with 32-bit indices; a result that does
/// not fit cannot be represented.
pub(crate) fn checked_count(count: usize) -> Result<Index> {
    Index::try_from(count)
        .map_err(|_| Error::MemOp(format!("result of {} entries exceeds 32-bit index range", count)))
}

/// Assemble per-row column lists into a CSR pattern
pub(crate) fn assemble_rows(rows: Vec<Vec<Index>>) -> Result<Pattern> {
    let mut row_ptrs = Vec::with_capacity(rows.len() + 1);
    let mut total = 0usize;
    row_ptrs.push(0);
    for row in &rows {
        total += row.len();
        row_ptrs.push(checked_count(total)?);
    }
    let mut cols = Vec::with_capacity(total);
    for row in rows {
        cols.extend(row);
    }
    Ok(Pattern { row_ptrs, cols })
}
