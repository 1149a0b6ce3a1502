//! Computation backends
//!
//! A backend executes every structural operation over [`CsrStorage`]. The
//! CPU backend runs the host kernels directly; the CUDA backend stages
//! operands through device memory first. Both produce identical results, so
//! callers observe no behavioral difference beyond throughput.

mod cpu;
#[cfg(feature = "cuda")]
mod cuda;

pub use cpu::CpuBackend;
#[cfg(feature = "cuda")]
pub use cuda::CudaBackend;

use crate::alloc::AllocRef;
use crate::error::Result;
use crate::hints::{BuildHints, InitHints};
use crate::storage::{CsrStorage, Index};

/// Capability record of the selected accelerator device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCaps {
    /// Device name
    pub name: String,
    /// Compute capability, major part
    pub major: u32,
    /// Compute capability, minor part
    pub minor: u32,
    /// Threads per warp
    pub warp: u32,
    /// Global device memory in KiB
    pub global_memory_kibs: u64,
    /// Shared memory per multiprocessor in KiB
    pub shared_memory_per_mp_kibs: u64,
    /// Shared memory per block in KiB
    pub shared_memory_per_block_kibs: u64,
}

/// Uniform executor over the structural operation set.
///
/// One backend is selected per context at initialization and injected into
/// every operation; implementations never branch on hardware per call.
/// Operations return freshly materialized storage and never mutate their
/// operands, so results can be committed by swapping.
pub trait Backend: Send + Sync {
    /// Human-readable backend name, used in diagnostics
    fn name(&self) -> &'static str;

    /// Capability record of the underlying device.
    ///
    /// Fails with `DeviceNotPresent` on backends without an accelerator.
    fn device_caps(&self) -> Result<DeviceCaps>;

    /// Compress a coordinate set into fresh storage of the given dimensions
    fn build(
        &self,
        nrows: usize,
        ncols: usize,
        rows: &[Index],
        cols: &[Index],
        hints: BuildHints,
        alloc: &AllocRef,
    ) -> Result<CsrStorage>;

    /// Deep copy of `src`
    fn duplicate(&self, src: &CsrStorage) -> Result<CsrStorage>;

    /// Transpose of `src`, shape `ncols x nrows`
    fn transpose(&self, src: &CsrStorage, alloc: &AllocRef) -> Result<CsrStorage>;

    /// `a OR b`; shapes already validated equal
    fn ewise_add(&self, a: &CsrStorage, b: &CsrStorage, alloc: &AllocRef) -> Result<CsrStorage>;

    /// `a AND b`; shapes already validated equal
    fn ewise_mult(&self, a: &CsrStorage, b: &CsrStorage, alloc: &AllocRef) -> Result<CsrStorage>;

    /// `a AND NOT b`; shapes already validated equal
    fn ewise_mult_inverted(
        &self,
        a: &CsrStorage,
        b: &CsrStorage,
        alloc: &AllocRef,
    ) -> Result<CsrStorage>;

    /// Fresh boolean-semiring product `a * b`; dimensions already validated
    fn multiply(&self, a: &CsrStorage, b: &CsrStorage, alloc: &AllocRef) -> Result<CsrStorage>;

    /// Kronecker product; result dimension products already validated
    fn kronecker(&self, a: &CsrStorage, b: &CsrStorage, alloc: &AllocRef) -> Result<CsrStorage>;
}

/// Backend selection policy, fixed at context initialization:
/// force-cpu wins, then a present accelerator, then silent CPU fallback.
pub(crate) fn select(hints: &InitHints) -> std::sync::Arc<dyn Backend> {
    if hints.force_cpu {
        tracing::debug!("CPU backend forced by init hint");
        return std::sync::Arc::new(CpuBackend);
    }

    #[cfg(feature = "cuda")]
    match CudaBackend::open(0, hints.managed_memory) {
        Ok(backend) => {
            tracing::info!(device = %backend.caps().name, "selected CUDA backend");
            return std::sync::Arc::new(backend);
        }
        Err(err) => {
            tracing::warn!(error = %err, "no usable CUDA device, falling back to CPU backend");
        }
    }

    tracing::debug!("selected CPU backend");
    std::sync::Arc::new(CpuBackend)
}
