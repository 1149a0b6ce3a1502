//! CUDA backend
//!
//! Operands are staged into device memory with cudarc and read back before
//! the structural kernels run on the host mirror. This keeps results
//! bit-identical to the CPU backend (the library's parity contract) at the
//! price of the PCIe round trip; native device kernels can replace the
//! mirror path per operation without touching callers.

use std::sync::Arc;

use cudarc::driver::sys::CUdevice_attribute;
use cudarc::driver::CudaDevice as CudarcDevice;

use super::{Backend, DeviceCaps};
use crate::alloc::AllocRef;
use crate::engine;
use crate::error::{Error, Result};
use crate::hints::BuildHints;
use crate::storage::{CsrStorage, Index};

/// Backend bound to one CUDA device
pub struct CudaBackend {
    dev: Arc<CudarcDevice>,
    caps: DeviceCaps,
    managed_memory: bool,
}

impl CudaBackend {
    /// Open the CUDA device with the given ordinal.
    ///
    /// Fails with `DeviceNotPresent` when no usable device exists; the
    /// selection policy treats that as a silent CPU fallback.
    pub fn open(ordinal: usize, managed_memory: bool) -> Result<Self> {
        let dev = CudarcDevice::new(ordinal).map_err(|_| Error::DeviceNotPresent)?;
        let caps = query_caps(&dev, ordinal)?;
        tracing::debug!(
            device = %caps.name,
            major = caps.major,
            minor = caps.minor,
            managed_memory,
            "opened CUDA device"
        );
        Ok(Self {
            dev,
            caps,
            managed_memory,
        })
    }

    /// Capability record of the bound device
    pub fn caps(&self) -> &DeviceCaps {
        &self.caps
    }

    /// Whether the managed-memory init hint was set for this context
    pub fn managed_memory(&self) -> bool {
        self.managed_memory
    }

    /// Copy one index array to the device and back.
    ///
    /// The kernels consume the read-back copy, so every operand genuinely
    /// transits device memory.
    fn round_trip(&self, data: &[Index]) -> Result<Vec<Index>> {
        if data.is_empty() {
            return Ok(Vec::new());
        }
        let device_buf = self
            .dev
            .htod_sync_copy(data)
            .map_err(|e| Error::MemOp(format!("device staging failed: {:?}", e)))?;
        let host = self.dev.dtoh_sync_copy(&device_buf)?;
        self.dev.synchronize()?;
        Ok(host)
    }

    /// Stage a matrix through device memory, yielding the host mirror the
    /// kernels execute on
    fn stage(&self, src: &CsrStorage, alloc: &AllocRef) -> Result<CsrStorage> {
        let row_ptrs = self.round_trip(src.row_ptrs())?;
        let cols = self.round_trip(src.cols())?;
        CsrStorage::from_pattern(src.nrows(), src.ncols(), &row_ptrs, &cols, alloc)
    }
}

fn query_caps(dev: &Arc<CudarcDevice>, ordinal: usize) -> Result<DeviceCaps> {
    let raw = cudarc::driver::result::device::get(ordinal as i32)
        .map_err(|_| Error::DeviceNotPresent)?;

    let attr = |attrib: CUdevice_attribute| -> Result<u32> {
        let value = unsafe { cudarc::driver::result::device::get_attribute(raw, attrib) }
            .map_err(|e| Error::Device(format!("failed to query device attribute: {:?}", e)))?;
        Ok(value as u32)
    };

    let total_mem = cudarc::driver::result::device::total_mem(raw)
        .map_err(|e| Error::Device(format!("failed to query device memory: {:?}", e)))?;

    Ok(DeviceCaps {
        name: dev
            .name()
            .map_err(|e| Error::Device(format!("failed to query device name: {:?}", e)))?,
        major: attr(CUdevice_attribute::CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MAJOR)?,
        minor: attr(CUdevice_attribute::CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MINOR)?,
        warp: attr(CUdevice_attribute::CU_DEVICE_ATTRIBUTE_WARP_SIZE)?,
        global_memory_kibs: (total_mem / 1024) as u64,
        shared_memory_per_mp_kibs: attr(
            CUdevice_attribute::CU_DEVICE_ATTRIBUTE_MAX_SHARED_MEMORY_PER_MULTIPROCESSOR,
        )? as u64
            / 1024,
        shared_memory_per_block_kibs: attr(
            CUdevice_attribute::CU_DEVICE_ATTRIBUTE_MAX_SHARED_MEMORY_PER_BLOCK,
        )? as u64
            / 1024,
    })
}

impl Backend for CudaBackend {
    fn name(&self) -> &'static str {
        "cuda"
    }

    fn device_caps(&self) -> Result<DeviceCaps> {
        Ok(self.caps.clone())
    }

    fn build(
        &self,
        nrows: usize,
        ncols: usize,
        rows: &[Index],
        cols: &[Index],
        hints: BuildHints,
        alloc: &AllocRef,
    ) -> Result<CsrStorage> {
        let rows = self.round_trip(rows)?;
        let cols = self.round_trip(cols)?;
        let p = engine::coordinates::compress(nrows, ncols, &rows, &cols, hints.values_sorted)?;
        CsrStorage::from_pattern(nrows, ncols, &p.row_ptrs, &p.cols, alloc)
    }

    fn duplicate(&self, src: &CsrStorage) -> Result<CsrStorage> {
        src.duplicate()
    }

    fn transpose(&self, src: &CsrStorage, alloc: &AllocRef) -> Result<CsrStorage> {
        let staged = self.stage(src, alloc)?;
        let p = engine::transpose::transpose(&staged)?;
        CsrStorage::from_pattern(src.ncols(), src.nrows(), &p.row_ptrs, &p.cols, alloc)
    }

    fn ewise_add(&self, a: &CsrStorage, b: &CsrStorage, alloc: &AllocRef) -> Result<CsrStorage> {
        let (a, b) = (self.stage(a, alloc)?, self.stage(b, alloc)?);
        let p = engine::ewise::union_rows(&a, &b)?;
        CsrStorage::from_pattern(a.nrows(), a.ncols(), &p.row_ptrs, &p.cols, alloc)
    }

    fn ewise_mult(&self, a: &CsrStorage, b: &CsrStorage, alloc: &AllocRef) -> Result<CsrStorage> {
        let (a, b) = (self.stage(a, alloc)?, self.stage(b, alloc)?);
        let p = engine::ewise::intersect_rows(&a, &b)?;
        CsrStorage::from_pattern(a.nrows(), a.ncols(), &p.row_ptrs, &p.cols, alloc)
    }

    fn ewise_mult_inverted(
        &self,
        a: &CsrStorage,
        b: &CsrStorage,
        alloc: &AllocRef,
    ) -> Result<CsrStorage> {
        let (a, b) = (self.stage(a, alloc)?, self.stage(b, alloc)?);
        let p = engine::ewise::difference_rows(&a, &b)?;
        CsrStorage::from_pattern(a.nrows(), a.ncols(), &p.row_ptrs, &p.cols, alloc)
    }

    fn multiply(&self, a: &CsrStorage, b: &CsrStorage, alloc: &AllocRef) -> Result<CsrStorage> {
        let (a, b) = (self.stage(a, alloc)?, self.stage(b, alloc)?);
        let p = engine::multiply::multiply(&a, &b)?;
        CsrStorage::from_pattern(a.nrows(), b.ncols(), &p.row_ptrs, &p.cols, alloc)
    }

    fn kronecker(&self, a: &CsrStorage, b: &CsrStorage, alloc: &AllocRef) -> Result<CsrStorage> {
        let (a, b) = (self.stage(a, alloc)?, self.stage(b, alloc)?);
        let p = engine::kronecker::kronecker(&a, &b)?;
        CsrStorage::from_pattern(
            a.nrows() * b.nrows(),
            a.ncols() * b.ncols(),
            &p.row_ptrs,
            &p.cols,
            alloc,
        )
    }
}
