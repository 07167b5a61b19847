//! File-backed page variant (§4.3.3): content comes from, and dirty pages
//! flush back to, a region of an open file.
use addr::{KernAddr, UserAddr};

use crate::config::PAGE_SIZE;
use crate::hal::{FileId, Hal, PageTable};

use super::PageOpError;

pub fn swap_in<H: Hal>(file: FileId, offset: u64, length: usize, kva: KernAddr, hal: &H) -> Result<(), PageOpError> {
    // SAFETY: kva refers to a full, exclusively-owned PAGE_SIZE frame.
    let buf = unsafe { core::slice::from_raw_parts_mut(kva.as_mut_ptr(), PAGE_SIZE) };
    let read = hal.file_read_at(file, &mut buf[..length], offset);
    if read != length {
        return Err(PageOpError::ShortRead);
    }
    buf[length..].fill(0);
    Ok(())
}

pub fn swap_out<H: Hal>(
    file: FileId,
    offset: u64,
    length: usize,
    kva: KernAddr,
    va: UserAddr,
    hal: &H,
    pt: &H::PageTable,
) -> Result<(), PageOpError> {
    if pt.is_dirty(va) {
        flush(file, offset, length, kva, hal);
    }
    pt.unmap(va);
    Ok(())
}

pub fn destroy<H: Hal>(
    file: FileId,
    offset: u64,
    length: usize,
    kva: Option<KernAddr>,
    va: UserAddr,
    hal: &H,
    pt: &H::PageTable,
) {
    if let Some(kva) = kva {
        if pt.is_dirty(va) {
            flush(file, offset, length, kva, hal);
            pt.set_dirty(va, false);
        }
        pt.unmap(va);
    }
}

fn flush<H: Hal>(file: FileId, offset: u64, length: usize, kva: KernAddr, hal: &H) {
    // SAFETY: kva refers to a full, exclusively-owned PAGE_SIZE frame.
    let buf = unsafe { core::slice::from_raw_parts(kva.as_ptr(), PAGE_SIZE) };
    hal.file_write_at(file, &buf[..length], offset);
}
