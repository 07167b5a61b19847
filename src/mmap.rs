//! `mmap`/`munmap` (§4.3.4): lay down a file-backed mapping, tear it down
//! flushing dirty pages on the way out.
use alloc::sync::Arc;

use addr::{KernAddr, UserAddr};

use crate::config::PAGE_SIZE;
use crate::hal::{FileId, Hal};
use crate::page::{self, Aux, PageOpError, PageType};
use crate::process::{alloc_page_with_initializer, dealloc_page, Process};

/// Failure of [`do_mmap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MmapError {
    /// A page descriptor could not be created for one of the range's pages;
    /// any pages already created for this mapping have been undone.
    AllocFailed,
}

/// The `init` callback installed on every `Uninit` page created by
/// [`do_mmap`]: reads its slice of the file and zero-fills the tail (§4.3.1,
/// §4.3.3). Identical in effect to `PageBody::File`'s own `swap_in`, which
/// runs on any later reload after eviction.
pub fn file_init<H: Hal>(aux: &Aux, kva: KernAddr, hal: &H) -> Result<(), PageOpError> {
    let Aux::File { file, offset, read_bytes } = *aux else {
        unreachable!("file_init invoked on a page with non-file aux");
    };
    page::file::swap_in(file, offset, read_bytes, kva, hal)
}

/// Maps `length` bytes of `file` starting at `offset` into `process`'s
/// address space at `addr`, as `⌈length / PAGE_SIZE⌉` file-backed pages.
pub fn do_mmap<H: Hal>(
    process: &Arc<Process<H>>,
    addr: UserAddr,
    length: usize,
    writable: bool,
    file: FileId,
    offset: u64,
) -> Result<UserAddr, MmapError> {
    let reopened = process.vm.hal.file_reopen(file);
    let page_count = length.div_ceil(PAGE_SIZE);
    let mut remaining = length;
    let mut file_offset = offset;

    for i in 0..page_count {
        let read_bytes = remaining.min(PAGE_SIZE);
        let va = addr + i * PAGE_SIZE;
        let aux = Aux::File {
            file: reopened,
            offset: file_offset,
            read_bytes,
        };

        let ok = alloc_page_with_initializer(
            process,
            PageType::File,
            va,
            writable,
            Some(file_init::<H>),
            aux,
            crate::page::PageFlags::empty(),
        );
        if !ok {
            do_munmap(process, addr);
            return Err(MmapError::AllocFailed);
        }

        file_offset += read_bytes as u64;
        remaining -= read_bytes;
    }

    log::info!("mmap: {addr:?}+{length:#x} -> {page_count} page(s)");
    Ok(addr)
}

/// Unmaps the file-backed region starting at `addr`, removing pages
/// contiguously for as long as they share the same underlying file handle as
/// the first page, flushing dirty content on the way, then closing that
/// handle once.
pub fn do_munmap<H: Hal>(process: &Arc<Process<H>>, addr: UserAddr) {
    let first = match process.spt.lock().find(addr) {
        Some(page) => page,
        None => return,
    };
    let Some(finding_file) = first.lock().file_identity() else {
        return;
    };
    drop(first);

    let mut cursor = addr;
    loop {
        let page = match process.spt.lock().find(cursor) {
            Some(page) => page,
            None => break,
        };
        if page.lock().file_identity() != Some(finding_file) {
            break;
        }
        dealloc_page(process, cursor);
        cursor = cursor + PAGE_SIZE;
    }

    log::info!("munmap: {addr:?}");
    process.vm.hal.file_close(finding_file);
}
