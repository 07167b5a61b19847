//! Supplemental page table, frame eviction, swap and mmap for a teaching
//! kernel's virtual-memory subsystem.
//!
//! The crate is built against the narrow [`hal::Hal`] interface rather than
//! real hardware, a real disk or a real filesystem, so the whole thing is
//! runnable and testable on the host; see [`testing`] for the in-memory
//! doubles used by this crate's own test suite.
#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod config;
pub mod fault;
pub mod frame;
pub mod hal;
pub mod mmap;
pub mod page;
pub mod process;
pub mod spt;
pub mod swap;

#[cfg(test)]
pub mod testing;


pub use fault::{try_handle_fault, FaultError};
pub use frame::{FrameError, FrameTable};
pub use hal::{FileId, Hal, InterruptFrame, MapError, PageTable};
pub use mmap::{do_mmap, do_munmap, MmapError};
pub use page::{Aux, InitFn, Page, PageBody, PageFlags, PageOpError, PageType};
pub use process::{
    alloc_page, alloc_page_with_initializer, claim, claim_page, dealloc_page, ClaimError, Process, VmSubsystem,
};
pub use spt::Spt;
pub use swap::{SwapFull, SwapSlot, SwapTable};
