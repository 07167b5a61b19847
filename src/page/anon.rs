//! Anonymous page variant (§4.3.2): backed by swap, not by any file.
use addr::{KernAddr, UserAddr};

use crate::config::SECTORS_PER_SLOT;
use crate::hal::{Hal, PageTable};
use crate::swap::{SwapSlot, SwapTable};

use super::PageOpError;

/// `slot = NONE` means the page is resident (its frame holds the only copy).
pub type Slot = Option<SwapSlot>;

pub fn swap_in<H: Hal>(slot: &mut Slot, kva: KernAddr, hal: &H, swap: &SwapTable) -> Result<(), PageOpError> {
    let Some(s) = *slot else {
        // First-time zero-fill: the frame table hands out zeroed frames for
        // both fresh and recycled (evicted) kva's, so there is nothing to
        // write here.
        return Ok(());
    };

    let mut sector_buf = [0u8; crate::config::SECTOR_SIZE];
    for i in 0..SECTORS_PER_SLOT {
        hal.disk_read(s.first_sector() + i, &mut sector_buf);
        let offset = (i as usize) * crate::config::SECTOR_SIZE;
        // SAFETY: kva refers to a full, exclusively-owned PAGE_SIZE frame.
        unsafe {
            core::ptr::copy_nonoverlapping(
                sector_buf.as_ptr(),
                kva.as_mut_ptr().add(offset),
                crate::config::SECTOR_SIZE,
            );
        }
    }

    swap.free(s);
    *slot = None;
    Ok(())
}

pub fn swap_out<H: Hal>(
    slot: &mut Slot,
    kva: KernAddr,
    va: UserAddr,
    hal: &H,
    swap: &SwapTable,
    pt: &H::PageTable,
) -> Result<(), PageOpError> {
    let s = swap.alloc().map_err(|_| PageOpError::SwapFull)?;

    let mut sector_buf = [0u8; crate::config::SECTOR_SIZE];
    for i in 0..SECTORS_PER_SLOT {
        let offset = (i as usize) * crate::config::SECTOR_SIZE;
        // SAFETY: kva refers to a full, exclusively-owned PAGE_SIZE frame.
        unsafe {
            core::ptr::copy_nonoverlapping(
                kva.as_ptr().add(offset),
                sector_buf.as_mut_ptr(),
                crate::config::SECTOR_SIZE,
            );
        }
        hal.disk_write(s.first_sector() + i, &sector_buf);
    }

    *slot = Some(s);
    pt.unmap(va);
    Ok(())
}

pub fn destroy<H: Hal>(slot: &mut Slot, kva: Option<KernAddr>, va: UserAddr, swap: &SwapTable, pt: &H::PageTable) {
    if kva.is_some() {
        pt.unmap(va);
    }
    if let Some(s) = slot.take() {
        swap.free(s);
    }
}
