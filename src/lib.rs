//! # spbool
//!
//! **Sparse boolean matrix engine with interchangeable CPU and CUDA
//! backends.**
//!
//! spbool stores matrices whose entries are presence/absence booleans in a
//! compressed sparse-row layout and evaluates boolean-semiring linear
//! algebra over them: multiply, element-wise add/mult, transpose and
//! Kronecker product. It is a primitive layer for graph-algorithm workloads
//! (reachability, path querying) expressed as repeated sparse boolean
//! products.
//!
//! ## Design
//!
//! - **Explicit context**: a [`Context`] value owns the backend selection,
//!   the matrix arena and the callback bindings; nothing is a hidden
//!   singleton, so multi-context and test-isolated usage just work.
//! - **One backend per context**: selected once at initialization from the
//!   init hints and device availability, then injected into every handle.
//!   Results are backend-independent.
//! - **Copy-then-swap results**: operations compute into fresh storage and
//!   commit by swapping, so aliasing a result with an operand is safe and
//!   failed operations leave operands untouched.
//!
//! ## Quick Start
//!
//! ```
//! use spbool::prelude::*;
//!
//! let ctx = Context::new();
//! ctx.initialize(InitHints::default())?;
//!
//! // A 2x2 identity pattern and a second operand
//! let a = ctx.matrix_new(2, 2)?;
//! ctx.matrix_build(a, &[0, 1], &[0, 1], BuildHints::default())?;
//! let b = ctx.matrix_new(2, 2)?;
//! ctx.matrix_build(b, &[0, 0], &[0, 1], BuildHints::default())?;
//!
//! let c = ctx.matrix_new(2, 2)?;
//! ctx.multiply(c, a, b, MultiplyHints::default())?;
//!
//! let (rows, cols) = ctx.matrix_pairs(c)?;
//! assert_eq!(rows, vec![0, 0]);
//! assert_eq!(cols, vec![0, 1]);
//!
//! ctx.finalize()?;
//! # Ok::<(), spbool::error::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `rayon` (default): multi-threaded per-row kernels on the CPU backend
//! - `cuda`: NVIDIA CUDA backend via cudarc

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod alloc;
pub mod backend;
pub mod context;
pub(crate) mod engine;
pub mod error;
pub mod hints;
pub mod storage;

pub use context::{Context, Matrix, MessageObserver};
pub use error::{Error, Result, Status};
pub use storage::Index;

/// Library version as `(major, minor, composite)`.
///
/// The composite form is `major * 1000 + minor`, a single integer suitable
/// for ordering comparisons.
pub fn version() -> (u32, u32, u32) {
    let major: u32 = env!("CARGO_PKG_VERSION_MAJOR").parse().unwrap_or(0);
    let minor: u32 = env!("CARGO_PKG_VERSION_MINOR").parse().unwrap_or(0);
    (major, minor, major * 1000 + minor)
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::backend::DeviceCaps;
    pub use crate::context::{Context, Matrix, MessageObserver};
    pub use crate::error::{Error, Result, Status};
    pub use crate::hints::{BuildHints, InitHints, MultiplyHints};
    pub use crate::storage::Index;
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_version_composite() {
        let (major, minor, composite) = super::version();
        assert_eq!(composite, major * 1000 + minor);
    }
}
