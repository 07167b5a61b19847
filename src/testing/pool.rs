//! An in-memory stand-in for the hardware user page pool.
use alloc::boxed::Box;
use alloc::vec::Vec;

use addr::KernAddr;
use sync::Mutex;

use crate::config::PAGE_SIZE;

const _: () = assert!(PAGE_SIZE == 4096, "AlignedPage's repr(align) must match PAGE_SIZE");

#[repr(align(4096))]
struct AlignedPage([u8; PAGE_SIZE]);

/// A fixed-capacity pool of page-aligned buffers, standing in for
/// `palloc_get_page(USER)` / `palloc_free_page` (§6).
pub struct FakePagePool {
    // Kept alive for the pool's lifetime; never reallocated once created, so
    // the addresses handed out below stay valid.
    _frames: Vec<Box<AlignedPage>>,
    free: Mutex<Vec<KernAddr>>,
}

impl FakePagePool {
    pub fn new(capacity: usize) -> Self {
        let mut frames = Vec::with_capacity(capacity);
        let mut free = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            let mut page = Box::new(AlignedPage([0u8; PAGE_SIZE]));
            free.push(KernAddr::new(page.0.as_mut_ptr() as usize));
            frames.push(page);
        }
        Self {
            _frames: frames,
            free: Mutex::new(free),
        }
    }

    pub fn alloc(&self) -> Option<KernAddr> {
        let kva = self.free.lock().pop()?;
        // SAFETY: kva came from a live entry in `_frames`, exclusively
        // owned while outside the free list.
        unsafe {
            core::ptr::write_bytes(kva.as_mut_ptr(), 0, PAGE_SIZE);
        }
        Some(kva)
    }

    pub fn free(&self, kva: KernAddr) {
        self.free.lock().push(kva);
    }
}
