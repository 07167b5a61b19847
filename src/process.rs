//! A process's address-space state (SPT, hardware page table) and the
//! process-global VM subsystem handle (§5, §9 "global mutable state").
use alloc::sync::Arc;

use addr::UserAddr;
use sync::Mutex;

use crate::frame::FrameTable;
use crate::hal::Hal;
use crate::page::{Aux, InitFn, Page, PageFlags, PageOpError, PageType};
use crate::spt::Spt;
use crate::swap::SwapTable;

/// The frame table, swap allocator and hardware abstraction shared by every
/// process. Created once at boot and handed to every [`Process`] as an
/// `Arc`, standing in for the "pass it implicitly through a process-wide
/// handle" design note: the embedding kernel has no ambient global state to
/// smuggle it through, so the handle is carried explicitly instead.
pub struct VmSubsystem<H: Hal> {
    pub hal: H,
    pub frames: FrameTable<H>,
    pub swap: SwapTable,
}

impl<H: Hal> VmSubsystem<H> {
    pub fn new(hal: H) -> Self {
        let swap = SwapTable::new(hal.disk_sector_count());
        Self {
            hal,
            frames: FrameTable::new(),
            swap,
        }
    }
}

/// One process's address-space state. Stands in for the collaborator the
/// specification calls "Thread": its hardware page table, saved user stack
/// pointer and supplemental page table.
pub struct Process<H: Hal> {
    pub id: u64,
    page_table: H::PageTable,
    pub spt: Mutex<Spt<H>>,
    /// The user `rsp` captured on the last syscall entry, used by the fault
    /// handler when a page fault is taken from kernel mode (§4.6).
    pub saved_user_rsp: Mutex<UserAddr>,
    pub vm: Arc<VmSubsystem<H>>,
}

impl<H: Hal> Process<H> {
    pub fn new(id: u64, page_table: H::PageTable, vm: Arc<VmSubsystem<H>>) -> Arc<Self> {
        Arc::new(Self {
            id,
            page_table,
            spt: Mutex::new(Spt::new()),
            saved_user_rsp: Mutex::new(UserAddr::new(0)),
            vm,
        })
    }

    pub fn page_table(&self) -> &H::PageTable {
        &self.page_table
    }
}

/// Failure of the claim protocol (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimError {
    NoFrame,
    MapFailed,
    Init(PageOpError),
}

/// Claims `page`: acquires a frame (evicting if necessary), binds it, installs
/// the hardware mapping, and restores its contents. Each step undoes the
/// prior ones on failure, returning the page to its original unmapped state.
pub fn claim<H: Hal>(process: &Arc<Process<H>>, page: &Arc<Mutex<Page<H>>>) -> Result<(), ClaimError> {
    let vm = &process.vm;
    let kva = vm.frames.get_frame(&vm.hal, &vm.swap).map_err(|_| ClaimError::NoFrame)?;

    let mut guard = page.lock();
    let va = guard.va;
    let writable = guard.writable;

    vm.frames.bind(kva, Arc::downgrade(page), Arc::downgrade(process), va);
    guard.frame = Some(kva);

    if process.page_table().map(va, kva, writable).is_err() {
        rollback(process, kva, &mut guard, false);
        return Err(ClaimError::MapFailed);
    }

    if let Err(e) = guard.swap_in(kva, &vm.hal, &vm.swap) {
        rollback(process, kva, &mut guard, true);
        return Err(ClaimError::Init(e));
    }

    log::trace!("claim: {va:?} bound to {kva:?}");
    Ok(())
}

/// Undoes a partially completed claim: clears the hardware mapping (if it
/// was installed), breaks both back-pointers, and frees the frame.
fn rollback<H: Hal>(process: &Arc<Process<H>>, kva: addr::KernAddr, page: &mut Page<H>, mapping_installed: bool) {
    if mapping_installed {
        process.page_table().unmap(page.va);
    }
    process.vm.frames.unbind(kva);
    page.frame = None;
    process.vm.frames.free_frame(&process.vm.hal, kva);
}

/// Creates a page descriptor in the `Uninit` state and inserts it into
/// `process`'s SPT (§6). Fails if `va` is already mapped.
pub fn alloc_page_with_initializer<H: Hal>(
    process: &Arc<Process<H>>,
    page_type: PageType,
    va: UserAddr,
    writable: bool,
    init: Option<InitFn<H>>,
    aux: Aux,
    flags: PageFlags,
) -> bool {
    if process.spt.lock().find(va).is_some() {
        return false;
    }
    let page = Page::new(va, writable, Arc::downgrade(process), page_type, init, aux, flags);
    process.spt.lock().insert(Arc::new(Mutex::new(page)))
}

/// Convenience wrapper for the common case: no custom initializer, no aux,
/// no marker flags. Used for plain anonymous allocations and stack growth.
pub fn alloc_page<H: Hal>(process: &Arc<Process<H>>, page_type: PageType, va: UserAddr, writable: bool) -> bool {
    alloc_page_with_initializer(process, page_type, va, writable, None, Aux::None, PageFlags::empty())
}

/// Finds the page at `va` and claims it.
pub fn claim_page<H: Hal>(process: &Arc<Process<H>>, va: UserAddr) -> bool {
    let page = process.spt.lock().find(va);
    match page {
        Some(page) => claim(process, &page).is_ok(),
        None => false,
    }
}

/// Removes and destroys the page at `va` (§6).
pub fn dealloc_page<H: Hal>(process: &Arc<Process<H>>, va: UserAddr) -> bool {
    crate::spt::remove(process, va)
}
