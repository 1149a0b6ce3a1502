//! Element-wise kernels: linear merges of sorted per-row column lists
//!
//! OR is a sorted union, AND a sorted intersection, AND-NOT a sorted
//! difference. All three walk both operand rows once, so each output row
//! costs the sum of the operand row lengths.

use super::{checked_count, Pattern};
use crate::error::Result;
use crate::storage::{CsrStorage, Index};

/// How a merge combines the two operand rows
#[derive(Clone, Copy)]
enum MergeKind {
    /// Keep columns present in either operand (logical OR)
    Union,
    /// Keep columns present in both operands (logical AND)
    Intersection,
    /// Keep columns of `a` absent from `b` (logical AND-NOT)
    Difference,
}

/// `a OR b`; shapes must already match
pub(crate) fn union_rows(a: &CsrStorage, b: &CsrStorage) -> Result<Pattern> {
    merge(a, b, MergeKind::Union)
}

/// `a AND b`; shapes must already match
pub(crate) fn intersect_rows(a: &CsrStorage, b: &CsrStorage) -> Result<Pattern> {
    merge(a, b, MergeKind::Intersection)
}

/// `a AND NOT b`; shapes must already match
pub(crate) fn difference_rows(a: &CsrStorage, b: &CsrStorage) -> Result<Pattern> {
    merge(a, b, MergeKind::Difference)
}

fn merge(a: &CsrStorage, b: &CsrStorage, kind: MergeKind) -> Result<Pattern> {
    debug_assert_eq!(a.shape(), b.shape());
    let nrows = a.nrows();

    let mut row_ptrs = Vec::with_capacity(nrows + 1);
    row_ptrs.push(0);
    let mut cols = Vec::with_capacity(match kind {
        MergeKind::Union => a.nvals() + b.nvals(),
        MergeKind::Intersection => a.nvals().min(b.nvals()),
        MergeKind::Difference => a.nvals(),
    });

    for row in 0..nrows {
        merge_row(a.row(row), b.row(row), kind, &mut cols);
        row_ptrs.push(checked_count(cols.len())?);
    }

    Ok(Pattern { row_ptrs, cols })
}

fn merge_row(a: &[Index], b: &[Index], kind: MergeKind, out: &mut Vec<Index>) {
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => {
                if matches!(kind, MergeKind::Union | MergeKind::Difference) {
                    out.push(a[i]);
                }
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                if matches!(kind, MergeKind::Union) {
                    out.push(b[j]);
                }
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                if matches!(kind, MergeKind::Union | MergeKind::Intersection) {
                    out.push(a[i]);
                }
                i += 1;
                j += 1;
            }
        }
    }
    if matches!(kind, MergeKind::Union | MergeKind::Difference) {
        out.extend_from_slice(&a[i..]);
    }
    if matches!(kind, MergeKind::Union) {
        out.extend_from_slice(&b[j..]);
    }
}
