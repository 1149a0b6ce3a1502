//! Context state machine, handle invalidation, callbacks

use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use spbool::alloc::{AllocRef, HostAllocator, SystemAllocator};
use spbool::prelude::*;

#[test]
fn test_state_machine() {
    let ctx = Context::new();

    // Uninitialized: matrix operations are rejected
    assert_eq!(
        ctx.matrix_new(2, 2).unwrap_err().status(),
        Status::InvalidState
    );
    assert_eq!(ctx.finalize().unwrap_err().status(), Status::InvalidState);

    // Ready
    ctx.initialize(InitHints::default()).unwrap();
    assert_eq!(
        ctx.initialize(InitHints::default()).unwrap_err().status(),
        Status::InvalidState
    );
    let m = ctx.matrix_new(2, 2).unwrap();
    assert_eq!(ctx.matrix_nrows(m).unwrap(), 2);

    // Finalized: operations rejected again
    ctx.finalize().unwrap();
    assert_eq!(
        ctx.matrix_new(2, 2).unwrap_err().status(),
        Status::InvalidState
    );
    assert_eq!(ctx.finalize().unwrap_err().status(), Status::InvalidState);
}

#[test]
fn test_finalize_invalidates_live_handles() {
    let ctx = Context::new();
    ctx.initialize(InitHints::default()).unwrap();

    let m = ctx.matrix_new(3, 3).unwrap();
    ctx.matrix_build(m, &[0, 1], &[1, 2], BuildHints::default())
        .unwrap();
    let other = ctx.matrix_new(3, 3).unwrap();

    ctx.finalize().unwrap();

    // Every operation on the stale handles reports InvalidState, never
    // crashes; free is a safe no-op.
    assert_eq!(
        ctx.matrix_nvals(m).unwrap_err().status(),
        Status::InvalidState
    );
    assert_eq!(
        ctx.transpose(other, m).unwrap_err().status(),
        Status::InvalidState
    );
    ctx.matrix_free(m).unwrap();
    ctx.matrix_free(m).unwrap();
}

#[test]
fn test_reinitialize_after_finalize() {
    let ctx = Context::new();
    ctx.initialize(InitHints::default()).unwrap();
    let stale = ctx.matrix_new(2, 2).unwrap();
    ctx.finalize().unwrap();

    // Re-init establishes a fresh Ready state with a new backend selection
    ctx.initialize(InitHints { force_cpu: true, ..Default::default() }).unwrap();
    assert_eq!(ctx.backend_name().unwrap(), "cpu");

    let fresh = ctx.matrix_new(4, 4).unwrap();
    assert_eq!(ctx.matrix_ncols(fresh).unwrap(), 4);

    // Handles from the previous generation stay dead
    assert_eq!(
        ctx.matrix_nvals(stale).unwrap_err().status(),
        Status::InvalidState
    );
}

#[test]
fn test_force_cpu_hint() {
    let ctx = Context::new();
    ctx.initialize(InitHints { force_cpu: true, ..Default::default() }).unwrap();
    assert_eq!(ctx.backend_name().unwrap(), "cpu");
}

#[test]
fn test_device_caps_without_accelerator() {
    let ctx = Context::new();
    ctx.initialize(InitHints { force_cpu: true, ..Default::default() }).unwrap();
    // Device absence is only an error for the explicit capability query
    assert_eq!(
        ctx.device_caps().unwrap_err().status(),
        Status::DeviceNotPresent
    );
}

#[test]
fn test_version_query() {
    let ctx = Context::new();
    let (major, minor, composite) = ctx.version();
    assert_eq!(composite, major * 1000 + minor);
}

#[test]
fn test_message_observer_sees_failures() {
    let seen: Arc<Mutex<Vec<(Status, String)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let observer: MessageObserver = Arc::new(move |status, message| {
        sink.lock().unwrap().push((status, message.to_string()));
    });

    let ctx = Context::new();
    ctx.initialize_with(
        InitHints { force_cpu: true, ..Default::default() },
        Arc::new(SystemAllocator),
        Some(observer),
    )
    .unwrap();

    let a = ctx.matrix_new(2, 2).unwrap();
    let b = ctx.matrix_new(3, 3).unwrap();
    let c = ctx.matrix_new(2, 2).unwrap();
    ctx.ewise_add(c, a, b).unwrap_err();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, Status::InvalidArgument);
    assert!(seen[0].1.contains("ewise_add"));
}

#[test]
fn test_custom_allocator_carries_matrix_storage() {
    struct Counting {
        allocations: AtomicUsize,
        live_bytes: AtomicUsize,
        inner: SystemAllocator,
    }
    impl HostAllocator for Counting {
        fn allocate(&self, size_bytes: usize) -> spbool::Result<NonNull<u8>> {
            self.allocations.fetch_add(1, Ordering::SeqCst);
            self.live_bytes.fetch_add(size_bytes, Ordering::SeqCst);
            self.inner.allocate(size_bytes)
        }
        fn deallocate(&self, ptr: NonNull<u8>, size_bytes: usize) {
            self.live_bytes.fetch_sub(size_bytes, Ordering::SeqCst);
            self.inner.deallocate(ptr, size_bytes);
        }
    }

    let counting = Arc::new(Counting {
        allocations: AtomicUsize::new(0),
        live_bytes: AtomicUsize::new(0),
        inner: SystemAllocator,
    });
    let alloc: AllocRef = counting.clone();

    let ctx = Context::new();
    ctx.initialize_with(
        InitHints { force_cpu: true, ..Default::default() },
        alloc,
        None,
    )
    .unwrap();

    let m = ctx.matrix_new(8, 8).unwrap();
    ctx.matrix_build(m, &[0, 3, 7], &[1, 2, 4], BuildHints::default())
        .unwrap();
    assert!(counting.allocations.load(Ordering::SeqCst) > 0);

    // Finalize releases every buffer carved out of the allocator
    ctx.finalize().unwrap();
    assert_eq!(counting.live_bytes.load(Ordering::SeqCst), 0);
}

#[test]
fn test_distinct_handles_usable_from_threads() {
    let ctx = Arc::new(Context::new());
    ctx.initialize(InitHints { force_cpu: true, ..Default::default() }).unwrap();

    let mut handles = Vec::new();
    for t in 0..4u32 {
        let ctx = Arc::clone(&ctx);
        handles.push(std::thread::spawn(move || {
            let a = ctx.matrix_new(16, 16).unwrap();
            let rows: Vec<Index> = (0..16).collect();
            let cols: Vec<Index> = (0..16).map(|i| (i + t) % 16).collect();
            ctx.matrix_build(a, &rows, &cols, BuildHints::default())
                .unwrap();
            let b = ctx.matrix_new(16, 16).unwrap();
            ctx.multiply(b, a, a, MultiplyHints::default()).unwrap();
            assert_eq!(ctx.matrix_nvals(b).unwrap(), 16);
            ctx.matrix_free(a).unwrap();
            ctx.matrix_free(b).unwrap();
        }));
    }
    for h in handles {
        h.join().unwrap();
    }
}
