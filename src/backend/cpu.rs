//! CPU backend: host kernels over host memory

use super::{Backend, DeviceCaps};
use crate::alloc::AllocRef;
use crate::engine;
use crate::error::{Error, Result};
use crate::hints::BuildHints;
use crate::storage::{CsrStorage, Index};

/// Backend executing every operation with the host kernels.
///
/// Always available; selected when the CPU is forced by hint or no
/// accelerator device is present.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuBackend;

impl Backend for CpuBackend {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn device_caps(&self) -> Result<DeviceCaps> {
        Err(Error::DeviceNotPresent)
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
        let p = engine::coordinates::compress(nrows, ncols, rows, cols, hints.values_sorted)?;
        CsrStorage::from_pattern(nrows, ncols, &p.row_ptrs, &p.cols, alloc)
    }

    fn duplicate(&self, src: &CsrStorage) -> Result<CsrStorage> {
        src.duplicate()
    }

    fn transpose(&self, src: &CsrStorage, alloc: &AllocRef) -> Result<CsrStorage> {
        let p = engine::transpose::transpose(src)?;
        CsrStorage::from_pattern(src.ncols(), src.nrows(), &p.row_ptrs, &p.cols, alloc)
    }

    fn ewise_add(&self, a: &CsrStorage, b: &CsrStorage, alloc: &AllocRef) -> Result<CsrStorage> {
        let p = engine::ewise::union_rows(a, b)?;
        CsrStorage::from_pattern(a.nrows(), a.ncols(), &p.row_ptrs, &p.cols, alloc)
    }

    fn ewise_mult(&self, a: &CsrStorage, b: &CsrStorage, alloc: &AllocRef) -> Result<CsrStorage> {
        let p = engine::ewise::intersect_rows(a, b)?;
        CsrStorage::from_pattern(a.nrows(), a.ncols(), &p.row_ptrs, &p.cols, alloc)
    }

    fn ewise_mult_inverted(
        &self,
        a: &CsrStorage,
        b: &CsrStorage,
        alloc: &AllocRef,
    ) -> Result<CsrStorage> {
        let p = engine::ewise::difference_rows(a, b)?;
        CsrStorage::from_pattern(a.nrows(), a.ncols(), &p.row_ptrs, &p.cols, alloc)
    }

    fn multiply(&self, a: &CsrStorage, b: &CsrStorage, alloc: &AllocRef) -> Result<CsrStorage> {
        let p = engine::multiply::multiply(a, b)?;
        CsrStorage::from_pattern(a.nrows(), b.ncols(), &p.row_ptrs, &p.cols, alloc)
    }

    fn kronecker(&self, a: &CsrStorage, b: &CsrStorage, alloc: &AllocRef) -> Result<CsrStorage> {
        let p = engine::kronecker::kronecker(a, b)?;
        CsrStorage::from_pattern(
            a.nrows() * b.nrows(),
            a.ncols() * b.ncols(),
            &p.row_ptrs,
            &p.cols,
            alloc,
        )
    }
}
