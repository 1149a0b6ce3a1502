//! Host memory allocation
//!
//! Matrix index buffers are carved out of a caller-replaceable allocator so
//! embedders can route every host allocation the library makes through their
//! own memory pools. [`SystemAllocator`] is the default.

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::ptr::NonNull;
use std::sync::Arc;

use crate::error::{Error, Result};

/// Alignment of every host allocation, in bytes.
///
/// 64-byte alignment keeps index buffers SIMD-friendly and cache-line sized.
pub const HOST_ALIGN: usize = 64;

/// Shared handle to the context's host allocator
pub type AllocRef = Arc<dyn HostAllocator>;

/// Caller-replaceable host memory allocator.
///
/// Implementations must hand out blocks aligned to [`HOST_ALIGN`] and valid
/// for the requested size. `deallocate` is called with the same size that was
/// passed to `allocate`. Implementations are invoked from whichever thread
/// executes an operation and must be reentrant-safe.
pub trait HostAllocator: Send + Sync {
    /// Allocate a zero-initialized block of `size_bytes` bytes
    fn allocate(&self, size_bytes: usize) -> Result<NonNull<u8>>;

    /// Release a block previously returned by `allocate`
    fn deallocate(&self, ptr: NonNull<u8>, size_bytes: usize);
}

/// Default allocator backed by the global Rust allocator
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

impl HostAllocator for SystemAllocator {
    fn allocate(&self, size_bytes: usize) -> Result<NonNull<u8>> {
        let layout = Layout::from_size_align(size_bytes, HOST_ALIGN)
            .map_err(|e| Error::MemOp(format!("invalid allocation layout: {}", e)))?;
        let ptr = unsafe { alloc_zeroed(layout) };
        NonNull::new(ptr)
            .ok_or_else(|| Error::MemOp(format!("failed to allocate {} bytes", size_bytes)))
    }

    fn deallocate(&self, ptr: NonNull<u8>, size_bytes: usize) {
        let layout = Layout::from_size_align(size_bytes, HOST_ALIGN)
            .expect("deallocate called with a size that was never allocated");
        unsafe { dealloc(ptr.as_ptr(), layout) };
    }
}

/// Owned `u32` index buffer carved out of a [`HostAllocator`].
///
/// The compressed storage arrays (row pointers, column indices) live in these
/// buffers, so a custom allocator observes every index allocation the engine
/// makes. Zero-length buffers perform no allocation.
pub(crate) struct IndexBuf {
    ptr: NonNull<u8>,
    len: usize,
    alloc: AllocRef,
}

// Exclusive owner of its block; the allocator itself is Send + Sync.
unsafe impl Send for IndexBuf {}
unsafe impl Sync for IndexBuf {}

impl IndexBuf {
    /// Allocate a buffer holding a copy of `data`
    pub fn from_slice(alloc: &AllocRef, data: &[u32]) -> Result<Self> {
        if data.is_empty() {
            return Ok(Self::empty(alloc));
        }
        let size_bytes = std::mem::size_of_val(data);
        let ptr = alloc.allocate(size_bytes)?;
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr() as *const u8, ptr.as_ptr(), size_bytes);
        }
        Ok(Self {
            ptr,
            len: data.len(),
            alloc: Arc::clone(alloc),
        })
    }

    /// Allocate a zero-filled buffer of `len` indices
    pub fn zeroed(alloc: &AllocRef, len: usize) -> Result<Self> {
        if len == 0 {
            return Ok(Self::empty(alloc));
        }
        let ptr = alloc.allocate(len * std::mem::size_of::<u32>())?;
        Ok(Self {
            ptr,
            len,
            alloc: Arc::clone(alloc),
        })
    }

    fn empty(alloc: &AllocRef) -> Self {
        Self {
            ptr: NonNull::dangling(),
            len: 0,
            alloc: Arc::clone(alloc),
        }
    }

    /// Number of indices held
    pub fn len(&self) -> usize {
        self.len
    }

    /// View the buffer as an index slice
    pub fn as_slice(&self) -> &[u32] {
        if self.len == 0 {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr() as *const u32, self.len) }
    }

    /// Deep copy into a fresh buffer from the same allocator
    pub fn duplicate(&self) -> Result<Self> {
        Self::from_slice(&self.alloc, self.as_slice())
    }
}

impl Drop for IndexBuf {
    fn drop(&mut self) {
        if self.len != 0 {
            self.alloc
                .deallocate(self.ptr, self.len * std::mem::size_of::<u32>());
        }
    }
}

impl std::fmt::Debug for IndexBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexBuf").field("len", &self.len).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_from_slice_round_trip() {
        let alloc: AllocRef = Arc::new(SystemAllocator);
        let buf = IndexBuf::from_slice(&alloc, &[3, 1, 4, 1, 5]).unwrap();
        assert_eq!(buf.len(), 5);
        assert_eq!(buf.as_slice(), &[3, 1, 4, 1, 5]);
    }

    #[test]
    fn test_empty_buffer_no_alloc() {
        let alloc: AllocRef = Arc::new(SystemAllocator);
        let buf = IndexBuf::from_slice(&alloc, &[]).unwrap();
        assert_eq!(buf.len(), 0);
        assert_eq!(buf.as_slice(), &[] as &[u32]);
    }

    #[test]
    fn test_duplicate_is_independent() {
        let alloc: AllocRef = Arc::new(SystemAllocator);
        let a = IndexBuf::from_slice(&alloc, &[7, 8, 9]).unwrap();
        let b = a.duplicate().unwrap();
        drop(a);
        assert_eq!(b.as_slice(), &[7, 8, 9]);
    }

    #[test]
    fn test_custom_allocator_observes_traffic() {
        struct Counting {
            live: AtomicUsize,
            inner: SystemAllocator,
        }
        impl HostAllocator for Counting {
            fn allocate(&self, size_bytes: usize) -> Result<NonNull<u8>> {
                self.live.fetch_add(size_bytes, Ordering::SeqCst);
                self.inner.allocate(size_bytes)
            }
            fn deallocate(&self, ptr: NonNull<u8>, size_bytes: usize) {
                self.live.fetch_sub(size_bytes, Ordering::SeqCst);
                self.inner.deallocate(ptr, size_bytes);
            }
        }

        let counting = Arc::new(Counting {
            live: AtomicUsize::new(0),
            inner: SystemAllocator,
        });
        let alloc: AllocRef = counting.clone();

        let buf = IndexBuf::from_slice(&alloc, &[1, 2, 3, 4]).unwrap();
        assert_eq!(counting.live.load(Ordering::SeqCst), 16);
        drop(buf);
        assert_eq!(counting.live.load(Ordering::SeqCst), 0);
    }
}
