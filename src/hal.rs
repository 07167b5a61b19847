//! External collaborators (§6): the narrow interfaces the VM subsystem is
//! built against instead of raw hardware. The embedding kernel implements
//! these against its real page-table walker, disk driver and filesystem; the
//! [`crate::testing`] module implements them in memory for tests.
use crate::config::SECTOR_SIZE;
use addr::{KernAddr, UserAddr};

/// A unique identifier for an open file handle, as reopened by
/// [`Hal::file_reopen`]. Opaque to the VM subsystem; only used for identity
/// comparisons (e.g. `munmap`'s "same file" contiguous-region check) and as a
/// token passed back into [`Hal::file_read_at`] / [`Hal::file_write_at`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId(pub u64);

/// Failure installing a hardware mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapError {
    /// The page table itself could not allocate the metadata needed to
    /// install the mapping (e.g. a missing intermediate page-table level).
    OutOfMemory,
}

/// The hardware page table of a single process. Mirrors `pml4_get_page`,
/// `pml4_set_page`, `pml4_clear_page` and the accessed/dirty bit operations
/// from §6.
pub trait PageTable: Send + Sync {
    /// Returns the frame currently mapped at `va`, if any.
    fn translate(&self, va: UserAddr) -> Option<KernAddr>;

    /// Installs a mapping from `va` to `frame`. Fails only if the page table
    /// itself cannot allocate the metadata for the mapping; the caller
    /// guarantees `va` is not already mapped.
    fn map(&self, va: UserAddr, frame: KernAddr, writable: bool) -> Result<(), MapError>;

    /// Clears the mapping at `va`, if any. A no-op if `va` is not mapped.
    fn unmap(&self, va: UserAddr);

    /// Reads the PTE's accessed bit. Undefined if `va` is not mapped.
    fn is_accessed(&self, va: UserAddr) -> bool;

    /// Sets the PTE's accessed bit. Undefined if `va` is not mapped.
    fn set_accessed(&self, va: UserAddr, value: bool);

    /// Reads the PTE's dirty bit. Undefined if `va` is not mapped.
    fn is_dirty(&self, va: UserAddr) -> bool;

    /// Sets the PTE's dirty bit. Undefined if `va` is not mapped.
    fn set_dirty(&self, va: UserAddr, value: bool);
}

/// The remaining collaborators: the user page pool, the swap disk and the
/// filesystem. Bundled into one trait so [`crate::VmSubsystem`] only needs a
/// single type parameter.
pub trait Hal: 'static {
    /// The concrete hardware page table type used by every process sharing
    /// this subsystem.
    type PageTable: PageTable;

    /// Hands out one zeroed, unused physical frame from the user pool, or
    /// `None` if the pool is exhausted.
    fn alloc_user_page(&self) -> Option<KernAddr>;

    /// Returns a frame to the user pool. The caller guarantees no process
    /// still maps it.
    fn free_user_page(&self, addr: KernAddr);

    /// The number of 512-byte sectors on the swap disk.
    fn disk_sector_count(&self) -> u64;

    /// Reads one sector from the swap disk.
    fn disk_read(&self, sector: u64, buf: &mut [u8; SECTOR_SIZE]);

    /// Writes one sector to the swap disk.
    fn disk_write(&self, sector: u64, buf: &[u8; SECTOR_SIZE]);

    /// Reopens a file, returning an independent handle so that a later close
    /// of the caller's own fd does not invalidate the mapping.
    fn file_reopen(&self, file: FileId) -> FileId;

    /// Reads up to `buf.len()` bytes starting at `offset`, returning the
    /// number of bytes actually read.
    fn file_read_at(&self, file: FileId, buf: &mut [u8], offset: u64) -> usize;

    /// Writes `buf` at `offset`, returning the number of bytes actually
    /// written.
    fn file_write_at(&self, file: FileId, buf: &[u8], offset: u64) -> usize;

    /// Closes a file handle previously returned by [`Hal::file_reopen`].
    fn file_close(&self, file: FileId);
}

/// The subset of a trap frame the fault handler needs (§6): the faulting
/// thread's stack pointer and whether the fault happened while running user
/// code. The rest of the hardware trap frame (registers, error code) is
/// irrelevant to the VM subsystem and is not modeled here.
#[derive(Debug, Clone, Copy)]
pub struct InterruptFrame {
    /// `rsp` at the moment of the fault if `from_user` is true, otherwise the
    /// thread's saved user `rsp` from its last syscall entry.
    pub rsp: UserAddr,
    /// Whether the fault was taken while executing user code.
    pub from_user: bool,
}
