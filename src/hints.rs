//! Caller-supplied hints, decoded at the API boundary
//!
//! The wire form of a hint set is a small bitmask. It is decoded exactly once,
//! here, into plain option structs; internal code never sees raw bits.

/// No hints passed
pub const HINT_NO: u32 = 0x0;
/// Force CPU backend usage (evaluated at context initialization only)
pub const HINT_CPU_BACKEND: u32 = 0x1;
/// Use managed accelerator memory instead of default device memory
pub const HINT_MANAGED_MEMORY: u32 = 0x2;
/// Mark build input as already sorted by (row, col)
pub const HINT_VALUES_SORTED: u32 = 0x4;
/// OR the operation result into the result matrix instead of replacing it
pub const HINT_ACCUMULATE: u32 = 0x8;

/// Hints evaluated once, at context initialization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InitHints {
    /// Select the CPU backend unconditionally, even if a device is present
    pub force_cpu: bool,
    /// Prefer managed device memory on the accelerator backend
    pub managed_memory: bool,
}

impl InitHints {
    /// Decode from a raw hint bitmask; irrelevant bits are ignored
    pub fn from_bits(bits: u32) -> Self {
        Self {
            force_cpu: bits & HINT_CPU_BACKEND != 0,
            managed_memory: bits & HINT_MANAGED_MEMORY != 0,
        }
    }
}

/// Per-call hints for [`Context::matrix_build`](crate::context::Context::matrix_build)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildHints {
    /// Caller asserts the coordinate pairs arrive sorted by (row, col).
    ///
    /// Skips the sort step. Passing `true` for unsorted input yields an
    /// undefined result, never an error. Duplicates are collapsed either way.
    pub values_sorted: bool,
}

impl BuildHints {
    /// Decode from a raw hint bitmask; irrelevant bits are ignored
    pub fn from_bits(bits: u32) -> Self {
        Self {
            values_sorted: bits & HINT_VALUES_SORTED != 0,
        }
    }
}

/// Per-call hints for [`Context::multiply`](crate::context::Context::multiply)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MultiplyHints {
    /// OR the product into the result's prior content instead of replacing it
    pub accumulate: bool,
}

impl MultiplyHints {
    /// Decode from a raw hint bitmask; irrelevant bits are ignored
    pub fn from_bits(bits: u32) -> Self {
        Self {
            accumulate: bits & HINT_ACCUMULATE != 0,
        }
    }
}
