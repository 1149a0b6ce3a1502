//! Compressed sparse row storage for boolean matrices
//!
//! A boolean matrix stores only the positions of its `true` entries: per row,
//! a sorted run of column indices. There is no values array; presence is the
//! value.

use crate::alloc::{AllocRef, IndexBuf};
use crate::error::{Error, Result};

/// Index type used for rows, columns and entry counts
pub type Index = u32;

/// CSR pattern of one boolean matrix.
///
/// Invariants:
/// - `row_ptrs` has length `nrows + 1`, is non-decreasing, starts at 0 and
///   ends at `nvals`
/// - within every row, column indices are strictly increasing
/// - every column index is `< ncols`
#[derive(Debug)]
pub struct CsrStorage {
    nrows: usize,
    ncols: usize,
    row_ptrs: IndexBuf,
    cols: IndexBuf,
}

impl CsrStorage {
    /// Create an empty matrix of the given dimensions
    pub fn empty(nrows: usize, ncols: usize, alloc: &AllocRef) -> Result<Self> {
        validate_dims(nrows, ncols)?;
        Ok(Self {
            nrows,
            ncols,
            row_ptrs: IndexBuf::zeroed(alloc, nrows + 1)?,
            cols: IndexBuf::zeroed(alloc, 0)?,
        })
    }

    /// Materialize storage from an assembled CSR pattern.
    ///
    /// The pattern must already satisfy the storage invariants; this only
    /// moves it into allocator-owned buffers.
    pub(crate) fn from_pattern(
        nrows: usize,
        ncols: usize,
        row_ptrs: &[Index],
        cols: &[Index],
        alloc: &AllocRef,
    ) -> Result<Self> {
        validate_dims(nrows, ncols)?;
        debug_assert_eq!(row_ptrs.len(), nrows + 1);
        debug_assert_eq!(*row_ptrs.last().unwrap_or(&0) as usize, cols.len());
        Ok(Self {
            nrows,
            ncols,
            row_ptrs: IndexBuf::from_slice(alloc, row_ptrs)?,
            cols: IndexBuf::from_slice(alloc, cols)?,
        })
    }

    /// Number of rows
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Number of columns
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Shape as `[nrows, ncols]`
    pub fn shape(&self) -> [usize; 2] {
        [self.nrows, self.ncols]
    }

    /// Number of true entries
    pub fn nvals(&self) -> usize {
        self.cols.len()
    }

    /// Row pointer array, length `nrows + 1`
    pub fn row_ptrs(&self) -> &[Index] {
        self.row_ptrs.as_slice()
    }

    /// Column indices of all entries, row-major
    pub fn cols(&self) -> &[Index] {
        self.cols.as_slice()
    }

    /// Sorted column indices of one row
    pub fn row(&self, row: usize) -> &[Index] {
        debug_assert!(row < self.nrows);
        let ptrs = self.row_ptrs.as_slice();
        let start = ptrs[row] as usize;
        let end = ptrs[row + 1] as usize;
        &self.cols.as_slice()[start..end]
    }

    /// Deep copy, independent of the source
    pub fn duplicate(&self) -> Result<Self> {
        Ok(Self {
            nrows: self.nrows,
            ncols: self.ncols,
            row_ptrs: self.row_ptrs.duplicate()?,
            cols: self.cols.duplicate()?,
        })
    }

    /// Iterate all true entries as `(row, col)` pairs, row-major,
    /// column-ascending within each row
    pub fn pairs(&self) -> Pairs<'_> {
        Pairs {
            storage: self,
            row: 0,
            pos: 0,
        }
    }

    /// Copy all entries into caller-provided coordinate buffers.
    ///
    /// Fails with `InvalidArgument` if either buffer is smaller than the
    /// current `nvals`; buffers are untouched on failure. Returns the number
    /// of pairs written.
    pub fn extract_pairs(&self, out_rows: &mut [Index], out_cols: &mut [Index]) -> Result<usize> {
        let nvals = self.nvals();
        if out_rows.len() < nvals || out_cols.len() < nvals {
            return Err(Error::invalid_argument(
                "out_rows/out_cols",
                format!(
                    "buffers of size {}/{} cannot hold {} pairs",
                    out_rows.len(),
                    out_cols.len(),
                    nvals
                ),
            ));
        }
        for (i, (row, col)) in self.pairs().enumerate() {
            out_rows[i] = row;
            out_cols[i] = col;
        }
        Ok(nvals)
    }
}

fn validate_dims(nrows: usize, ncols: usize) -> Result<()> {
    if nrows == 0 || ncols == 0 {
        return Err(Error::invalid_argument(
            "nrows/ncols",
            "matrix dimensions must be greater than zero",
        ));
    }
    if nrows > Index::MAX as usize || ncols > Index::MAX as usize {
        return Err(Error::invalid_argument(
            "nrows/ncols",
            "matrix dimensions exceed the 32-bit index range",
        ));
    }
    Ok(())
}

/// Iterator over the `(row, col)` pairs of a [`CsrStorage`]
pub struct Pairs<'a> {
    storage: &'a CsrStorage,
    row: usize,
    pos: usize,
}

impl Iterator for Pairs<'_> {
    type Item = (Index, Index);

    fn next(&mut self) -> Option<Self::Item> {
        let ptrs = self.storage.row_ptrs();
        while self.row < self.storage.nrows() {
            if self.pos < ptrs[self.row + 1] as usize {
                let col = self.storage.cols()[self.pos];
                let row = self.row as Index;
                self.pos += 1;
                return Some((row, col));
            }
            self.row += 1;
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest = self.storage.nvals() - self.pos;
        (rest, Some(rest))
    }
}
