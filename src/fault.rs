//! The page fault handler (§4.6): classifies a trap and turns it into a
//! stack growth, a claim, or a hard failure.
use alloc::sync::Arc;

use addr::UserAddr;

use crate::config::{KERNEL_BASE, STACK_MAX_SIZE, USER_STACK_TOP};
use crate::hal::{Hal, InterruptFrame};
use crate::page::{Aux, PageFlags, PageType};
use crate::process::{alloc_page_with_initializer, claim, Process};

/// Why a fault could not be resolved. At the syscall boundary this
/// collapses to the single bool `try_handle_fault` returns in the original
/// design (§7); the dispatcher that owns that boundary (out of scope here)
/// translates any of these into process termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultError {
    /// Null pointer, a kernel-space address, or a write to a read-only page.
    BadAddress,
    /// The fault was a protection violation on an already-present page.
    /// Write-protect (COW) handling is out of scope; see design notes.
    WriteProtectUnsupported,
    /// No SPT entry covers the faulting address, and it did not qualify for
    /// stack growth.
    NotFound,
    /// The page was found (or just grown) but its claim failed.
    ClaimFailed,
}

/// Attempts to resolve a page fault, classifying it per §4.6.
pub fn try_handle_fault<H: Hal>(
    process: &Arc<Process<H>>,
    frame: InterruptFrame,
    addr: UserAddr,
    write: bool,
    not_present: bool,
) -> Result<(), FaultError> {
    if addr.as_usize() == 0 || addr.as_usize() >= KERNEL_BASE {
        return Err(FaultError::BadAddress);
    }

    if !not_present {
        log::warn!("fault: protection violation at {addr:?}, write-protect unsupported");
        return Err(FaultError::WriteProtectUnsupported);
    }

    let rsp = if frame.from_user {
        frame.rsp
    } else {
        *process.saved_user_rsp.lock()
    };

    if should_grow_stack(addr, rsp) {
        let page_va = addr.page_base();
        if process.spt.lock().find(page_va).is_none() {
            log::debug!("fault: growing stack to {page_va:?}");
            alloc_page_with_initializer(
                process,
                PageType::Anon,
                page_va,
                true,
                None,
                Aux::None,
                PageFlags::STACK,
            );
        }
    }

    let page = {
        let spt = process.spt.lock();
        spt.find(addr.page_base()).ok_or(FaultError::NotFound)?
    };

    if write && !page.lock().writable {
        log::warn!("fault: write to read-only page at {addr:?}");
        return Err(FaultError::BadAddress);
    }

    claim(process, &page).map_err(|_| FaultError::ClaimFailed)
}

/// The stack-growth predicate of §4.6/§9: an OR of two conditions, kept
/// exactly as specified even though the second is permissive enough to
/// over-grow in edge cases (see design notes).
fn should_grow_stack(addr: UserAddr, rsp: UserAddr) -> bool {
    let stack_bottom = USER_STACK_TOP - STACK_MAX_SIZE;
    let a = addr.as_usize();
    let r = rsp.as_usize();

    if a > USER_STACK_TOP {
        return false;
    }

    let push_before_decrement = r.checked_sub(8).is_some_and(|r8| stack_bottom <= r8 && r8 == a);
    let within_window = stack_bottom <= r && r <= a;

    push_before_decrement || within_window
}
