//! Library context: backend selection, matrix arena, operation surface
//!
//! A [`Context`] is an explicit value, never a hidden singleton; every
//! operation goes through it. Matrices are opaque [`Matrix`] handles into a
//! slot-and-token arena owned by the context, so freeing a matrix or
//! finalizing the context invalidates handles instead of leaving dangling
//! references.
//!
//! Results are committed by copy-then-swap: an operation computes into fresh
//! storage while holding no lock, then swaps it into the result slot. A
//! result that aliases an operand (including accumulate-into-self) therefore
//! never observes a partially written structure, and a mid-operation fault
//! unwinds without touching the result.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::alloc::{AllocRef, SystemAllocator};
use crate::backend::{self, Backend, DeviceCaps};
use crate::error::{Error, Result, Status};
use crate::hints::{BuildHints, InitHints, MultiplyHints};
use crate::storage::{CsrStorage, Index};

/// Caller-supplied observer invoked with the status and text of every
/// reported error or diagnostic.
///
/// Shared, read-only after initialization, and invoked from whichever thread
/// executes an operation; implementations must be reentrant-safe.
pub type MessageObserver = Arc<dyn Fn(Status, &str) + Send + Sync>;

/// Opaque handle to one matrix, valid while its owning context is Ready and
/// the matrix has not been freed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Matrix {
    slot: usize,
    token: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Uninitialized,
    Ready,
    Finalized,
}

struct Slot {
    storage: Option<Arc<CsrStorage>>,
    token: u64,
}

struct Inner {
    phase: Phase,
    backend: Option<Arc<dyn Backend>>,
    alloc: AllocRef,
    observer: Option<MessageObserver>,
    slots: Vec<Slot>,
    free_slots: Vec<usize>,
    // Tokens are never reused, so stale handles can't collide with slots
    // recycled after free or re-initialization.
    next_token: u64,
}

/// Process-wide library state: selected backend, matrix arena, callbacks.
///
/// State machine: Uninitialized -> Ready -> Finalized, with
/// re-initialization after finalize permitted (it recomputes the backend
/// selection). All matrix operations require the Ready state.
pub struct Context {
    inner: RwLock<Inner>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Create a context in the Uninitialized state
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                phase: Phase::Uninitialized,
                backend: None,
                alloc: Arc::new(SystemAllocator),
                observer: None,
                slots: Vec::new(),
                free_slots: Vec::new(),
                next_token: 1,
            }),
        }
    }

    /// Transition to Ready with the default allocator and no observer.
    ///
    /// Backend selection policy: `force_cpu` wins unconditionally; otherwise
    /// a present accelerator device is used; otherwise the CPU backend is a
    /// silent fallback. Fails with `InvalidState` if already Ready.
    pub fn initialize(&self, hints: InitHints) -> Result<()> {
        self.observed(self.init_inner(hints, None, None))
    }

    /// Transition to Ready with a caller-supplied host allocator and an
    /// optional message observer
    pub fn initialize_with(
        &self,
        hints: InitHints,
        alloc: AllocRef,
        observer: Option<MessageObserver>,
    ) -> Result<()> {
        self.observed(self.init_inner(hints, Some(alloc), observer))
    }

    fn init_inner(
        &self,
        hints: InitHints,
        alloc: Option<AllocRef>,
        observer: Option<MessageObserver>,
    ) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.phase == Phase::Ready {
            return Err(Error::invalid_state("context is already initialized"));
        }
        inner.backend = Some(backend::select(&hints));
        if let Some(alloc) = alloc {
            inner.alloc = alloc;
        }
        inner.observer = observer;
        inner.phase = Phase::Ready;
        Ok(())
    }

    /// Transition Ready -> Finalized, releasing the backend and callback
    /// bindings and invalidating every outstanding handle.
    ///
    /// Subsequent operations on handles created under this context fail
    /// with `InvalidState`. Re-initialization afterwards is permitted.
    pub fn finalize(&self) -> Result<()> {
        let r = {
            let mut inner = self.inner.write();
            if inner.phase != Phase::Ready {
                Err(Error::invalid_state("context is not initialized"))
            } else {
                // Best-effort release happens regardless of what state the
                // arena is in: dropping the slots frees every buffer.
                inner.slots.clear();
                inner.free_slots.clear();
                inner.backend = None;
                inner.observer = None;
                inner.alloc = Arc::new(SystemAllocator);
                inner.phase = Phase::Finalized;
                tracing::info!("context finalized");
                Ok(())
            }
        };
        self.observed(r)
    }

    /// Library version as `(major, minor, composite)`
    pub fn version(&self) -> (u32, u32, u32) {
        crate::version()
    }

    /// Capability record of the selected accelerator device.
    ///
    /// Fails with `DeviceNotPresent` when the CPU backend is active; device
    /// absence is only an error for this explicit query, never at
    /// initialization.
    pub fn device_caps(&self) -> Result<DeviceCaps> {
        let r = (|| {
            let inner = self.inner.read();
            Self::backend_of(&inner)?.device_caps()
        })();
        self.observed(r)
    }

    /// Name of the selected backend (`"cpu"` or `"cuda"`)
    pub fn backend_name(&self) -> Result<&'static str> {
        let inner = self.inner.read();
        Ok(Self::backend_of(&inner)?.name())
    }

    // ------------------------------------------------------------------
    // Matrix lifecycle
    // ------------------------------------------------------------------

    /// Create an empty matrix of fixed dimensions.
    ///
    /// Dimensions must be nonzero and fit the 32-bit index range.
    pub fn matrix_new(&self, nrows: usize, ncols: usize) -> Result<Matrix> {
        let r = (|| {
            let mut inner = self.inner.write();
            if inner.phase != Phase::Ready {
                return Err(Error::invalid_state("context is not initialized"));
            }
            let storage = CsrStorage::empty(nrows, ncols, &inner.alloc)?;
            Ok(Self::insert(&mut inner, storage))
        })();
        self.observed(r)
    }

    /// Free a matrix, invalidating its handle.
    ///
    /// Freeing an already-freed handle, or any handle after finalize, is a
    /// safe no-op.
    pub fn matrix_free(&self, m: Matrix) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.phase != Phase::Ready {
            return Ok(());
        }
        let mut freed = false;
        if let Some(slot) = inner.slots.get_mut(m.slot) {
            if slot.token == m.token && slot.storage.is_some() {
                slot.storage = None;
                slot.token = 0;
                freed = true;
            }
        }
        if freed {
            inner.free_slots.push(m.slot);
        }
        Ok(())
    }

    /// Deep copy into a fresh, independent matrix
    pub fn matrix_duplicate(&self, m: Matrix) -> Result<Matrix> {
        let r = (|| {
            let (backend, _alloc, src) = self.snapshot1(m)?;
            let copy = backend.duplicate(&src)?;
            let mut inner = self.inner.write();
            if inner.phase != Phase::Ready {
                return Err(Error::invalid_state("context is not initialized"));
            }
            Ok(Self::insert(&mut inner, copy))
        })();
        self.observed(r)
    }

    // ------------------------------------------------------------------
    // Matrix content
    // ------------------------------------------------------------------

    /// Replace the matrix content with the given coordinate set.
    ///
    /// Duplicates are collapsed. Fails with `InvalidArgument` before any
    /// mutation if an index is out of range.
    pub fn matrix_build(
        &self,
        m: Matrix,
        rows: &[Index],
        cols: &[Index],
        hints: BuildHints,
    ) -> Result<()> {
        let r = (|| {
            let (backend, alloc, dst) = self.snapshot1(m)?;
            let fresh = backend.build(dst.nrows(), dst.ncols(), rows, cols, hints, &alloc)?;
            self.commit(m, fresh)
        })();
        self.observed(r)
    }

    /// Copy all entries into caller-provided buffers, row-major and
    /// column-ascending. Returns the number of pairs written.
    ///
    /// Fails with `InvalidArgument` if either buffer is smaller than the
    /// current `nvals`; buffers are untouched on failure.
    pub fn matrix_extract_pairs(
        &self,
        m: Matrix,
        out_rows: &mut [Index],
        out_cols: &mut [Index],
    ) -> Result<usize> {
        let r = (|| {
            let (_backend, _alloc, src) = self.snapshot1(m)?;
            src.extract_pairs(out_rows, out_cols)
        })();
        self.observed(r)
    }

    /// All entries as freshly allocated `(rows, cols)` vectors
    pub fn matrix_pairs(&self, m: Matrix) -> Result<(Vec<Index>, Vec<Index>)> {
        let r = (|| {
            let (_backend, _alloc, src) = self.snapshot1(m)?;
            Ok(src.pairs().unzip())
        })();
        self.observed(r)
    }

    /// Number of true entries
    pub fn matrix_nvals(&self, m: Matrix) -> Result<usize> {
        let r = self.snapshot1(m).map(|(_, _, s)| s.nvals());
        self.observed(r)
    }

    /// Number of rows
    pub fn matrix_nrows(&self, m: Matrix) -> Result<usize> {
        let r = self.snapshot1(m).map(|(_, _, s)| s.nrows());
        self.observed(r)
    }

    /// Number of columns
    pub fn matrix_ncols(&self, m: Matrix) -> Result<usize> {
        let r = self.snapshot1(m).map(|(_, _, s)| s.ncols());
        self.observed(r)
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// `result = transpose(src)`; result dimensions must be the swapped
    /// source dimensions
    pub fn transpose(&self, result: Matrix, src: Matrix) -> Result<()> {
        let r = (|| {
            let (backend, alloc, [src, dst]) = self.snapshot(&[src, result])?;
            let expected = [src.ncols(), src.nrows()];
            if dst.shape() != expected {
                return Err(Error::shape_mismatch("transpose", expected, dst.shape()));
            }
            let fresh = backend.transpose(&src, &alloc)?;
            self.commit(result, fresh)
        })();
        self.observed(r)
    }

    /// `result = a OR b`; all three shapes must match
    pub fn ewise_add(&self, result: Matrix, a: Matrix, b: Matrix) -> Result<()> {
        let r = (|| {
            let (backend, alloc, [a, b, dst]) = self.snapshot(&[a, b, result])?;
            Self::check_same_shape("ewise_add", &a, &b, &dst)?;
            let fresh = backend.ewise_add(&a, &b, &alloc)?;
            self.commit(result, fresh)
        })();
        self.observed(r)
    }

    /// `result = a AND b`; all three shapes must match
    pub fn ewise_mult(&self, result: Matrix, a: Matrix, b: Matrix) -> Result<()> {
        let r = (|| {
            let (backend, alloc, [a, b, dst]) = self.snapshot(&[a, b, result])?;
            Self::check_same_shape("ewise_mult", &a, &b, &dst)?;
            let fresh = backend.ewise_mult(&a, &b, &alloc)?;
            self.commit(result, fresh)
        })();
        self.observed(r)
    }

    /// `result = a AND NOT b`; all three shapes must match.
    ///
    /// The complement of `b` is never materialized; the kernel is a per-row
    /// sorted difference.
    pub fn ewise_mult_inverted(&self, result: Matrix, a: Matrix, b: Matrix) -> Result<()> {
        let r = (|| {
            let (backend, alloc, [a, b, dst]) = self.snapshot(&[a, b, result])?;
            Self::check_same_shape("ewise_mult_inverted", &a, &b, &dst)?;
            let fresh = backend.ewise_mult_inverted(&a, &b, &alloc)?;
            self.commit(result, fresh)
        })();
        self.observed(r)
    }

    /// Boolean-semiring product `result = a * b`.
    ///
    /// With the accumulate hint the fresh product is OR-ed into the result's
    /// prior content; otherwise the result is fully replaced. Aliasing
    /// (`result` also being `a` or `b`) is safe.
    pub fn multiply(&self, result: Matrix, a: Matrix, b: Matrix, hints: MultiplyHints) -> Result<()> {
        let r = (|| {
            let (backend, alloc, [a, b, dst]) = self.snapshot(&[a, b, result])?;
            if a.ncols() != b.nrows() {
                return Err(Error::shape_mismatch(
                    "multiply",
                    [a.ncols(), b.ncols()],
                    b.shape(),
                ));
            }
            let expected = [a.nrows(), b.ncols()];
            if dst.shape() != expected {
                return Err(Error::shape_mismatch("multiply", expected, dst.shape()));
            }
            let mut fresh = backend.multiply(&a, &b, &alloc)?;
            if hints.accumulate {
                fresh = backend.ewise_add(&fresh, &dst, &alloc)?;
            }
            self.commit(result, fresh)
        })();
        self.observed(r)
    }

    /// Kronecker product `result = a (x) b`.
    ///
    /// For `a` of shape MxN and `b` of shape KxT the result must be
    /// (M*K)x(N*T); it is always fully replaced.
    pub fn kronecker(&self, result: Matrix, a: Matrix, b: Matrix) -> Result<()> {
        let r = (|| {
            let (backend, alloc, [a, b, dst]) = self.snapshot(&[a, b, result])?;
            let out_rows = a.nrows().checked_mul(b.nrows());
            let out_cols = a.ncols().checked_mul(b.ncols());
            let expected = match (out_rows, out_cols) {
                (Some(r), Some(c)) => [r, c],
                _ => {
                    return Err(Error::invalid_argument(
                        "a/b",
                        "kronecker result dimensions overflow",
                    ))
                }
            };
            if dst.shape() != expected {
                return Err(Error::shape_mismatch("kronecker", expected, dst.shape()));
            }
            let fresh = backend.kronecker(&a, &b, &alloc)?;
            self.commit(result, fresh)
        })();
        self.observed(r)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn backend_of(inner: &Inner) -> Result<&Arc<dyn Backend>> {
        if inner.phase != Phase::Ready {
            return Err(Error::invalid_state("context is not initialized"));
        }
        inner
            .backend
            .as_ref()
            .ok_or(Error::BackendSelection)
    }

    fn resolve(inner: &Inner, m: Matrix) -> Result<Arc<CsrStorage>> {
        let slot = inner
            .slots
            .get(m.slot)
            .filter(|s| s.token == m.token)
            .ok_or_else(|| Error::invalid_state("matrix handle is no longer valid"))?;
        slot.storage
            .clone()
            .ok_or_else(|| Error::invalid_state("matrix handle is no longer valid"))
    }

    /// Snapshot the backend, allocator and N operand storages under one
    /// read lock. Kernels then run without any lock held.
    fn snapshot<const N: usize>(
        &self,
        handles: &[Matrix; N],
    ) -> Result<(Arc<dyn Backend>, AllocRef, [Arc<CsrStorage>; N])> {
        let inner = self.inner.read();
        let backend = Arc::clone(Self::backend_of(&inner)?);
        let alloc = Arc::clone(&inner.alloc);
        let mut storages = Vec::with_capacity(N);
        for &m in handles {
            storages.push(Self::resolve(&inner, m)?);
        }
        let storages: [Arc<CsrStorage>; N] = storages
            .try_into()
            .map_err(|_| Error::Internal("snapshot arity mismatch".to_string()))?;
        Ok((backend, alloc, storages))
    }

    fn snapshot1(&self, m: Matrix) -> Result<(Arc<dyn Backend>, AllocRef, Arc<CsrStorage>)> {
        let (backend, alloc, [s]) = self.snapshot(&[m])?;
        Ok((backend, alloc, s))
    }

    /// Swap freshly computed storage into the result slot.
    ///
    /// Re-validates the handle: the result may have been freed, or the
    /// context finalized, while the kernel ran.
    fn commit(&self, m: Matrix, fresh: CsrStorage) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.phase != Phase::Ready {
            return Err(Error::invalid_state("context is not initialized"));
        }
        let slot = inner
            .slots
            .get_mut(m.slot)
            .filter(|s| s.token == m.token && s.storage.is_some())
            .ok_or_else(|| Error::invalid_state("matrix handle is no longer valid"))?;
        slot.storage = Some(Arc::new(fresh));
        Ok(())
    }

    fn insert(inner: &mut Inner, storage: CsrStorage) -> Matrix {
        let token = inner.next_token;
        inner.next_token += 1;
        let slot = match inner.free_slots.pop() {
            Some(idx) => {
                inner.slots[idx] = Slot {
                    storage: Some(Arc::new(storage)),
                    token,
                };
                idx
            }
            None => {
                inner.slots.push(Slot {
                    storage: Some(Arc::new(storage)),
                    token,
                });
                inner.slots.len() - 1
            }
        };
        Matrix { slot, token }
    }

    fn check_same_shape(
        op: &'static str,
        a: &CsrStorage,
        b: &CsrStorage,
        dst: &CsrStorage,
    ) -> Result<()> {
        if a.shape() != b.shape() {
            return Err(Error::shape_mismatch(op, a.shape(), b.shape()));
        }
        if dst.shape() != a.shape() {
            return Err(Error::shape_mismatch(op, a.shape(), dst.shape()));
        }
        Ok(())
    }

    /// Route an error through the message observer and tracing before
    /// handing it back to the caller
    fn observed<T>(&self, r: Result<T>) -> Result<T> {
        if let Err(err) = &r {
            tracing::warn!(status = ?err.status(), error = %err, "operation failed");
            let observer = self.inner.read().observer.clone();
            if let Some(cb) = observer {
                cb(err.status(), &err.to_string());
            }
        }
        r
    }
}
