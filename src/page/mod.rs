//! Page descriptors and the uninit/anon/file variant dispatch (§3, §4.3).
pub mod anon;
pub mod file;

use alloc::sync::Weak;

use bitflags::bitflags;

use addr::{KernAddr, UserAddr};

use crate::frame::FrameTable;
use crate::hal::{FileId, Hal};
use crate::process::Process;
use crate::swap::SwapTable;

bitflags! {
    /// Marker flags carried alongside the page type tag (§3).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PageFlags: u8 {
        /// Set on pages created by the stack-growth heuristic (§4.6).
        const STACK = 1 << 0;
    }
}

/// The type a `Uninit` page becomes on its first fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    Anon,
    File,
}

/// The payload handed to a `Uninit` page's target-specific initializer and
/// its user-supplied `init` callback (§4.3.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aux {
    None,
    File { file: FileId, offset: u64, read_bytes: usize },
}

/// A caller-supplied hook invoked once, on first fault, after the
/// target-specific initializer has run. Built-in callers use
/// [`mmap::file_init`](crate::mmap::file_init) and plain `None` (for
/// zero-fill anonymous pages); callers outside this crate (e.g. a program
/// loader) may supply their own.
pub type InitFn<H> = fn(&Aux, KernAddr, &H) -> Result<(), PageOpError>;

/// Failure of a page's `swap_in`/`swap_out`/initializer step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOpError {
    /// A file-backed read returned fewer bytes than the page expected.
    ShortRead,
    /// The swap device has no free slot.
    SwapFull,
}

/// The three page variants (§3). `Uninit` is transient: `swap_in` promotes
/// it in place to `Anon` or `File` on first use.
pub enum PageBody<H: Hal> {
    Uninit {
        target: PageType,
        init: Option<InitFn<H>>,
        aux: Aux,
    },
    Anon {
        slot: anon::Slot,
    },
    File {
        file: FileId,
        offset: u64,
        length: usize,
        writable: bool,
    },
}

/// One page of a process's address space (§3).
pub struct Page<H: Hal> {
    pub va: UserAddr,
    pub writable: bool,
    pub owner: Weak<Process<H>>,
    pub frame: Option<KernAddr>,
    pub flags: PageFlags,
    pub body: PageBody<H>,
}

impl<H: Hal> Page<H> {
    pub fn new(
        va: UserAddr,
        writable: bool,
        owner: Weak<Process<H>>,
        target: PageType,
        init: Option<InitFn<H>>,
        aux: Aux,
        flags: PageFlags,
    ) -> Self {
        Self {
            va,
            writable,
            owner,
            frame: None,
            flags,
            body: PageBody::Uninit { target, init, aux },
        }
    }

    pub fn page_type(&self) -> PageType {
        match &self.body {
            PageBody::Uninit { target, .. } => *target,
            PageBody::Anon { .. } => PageType::Anon,
            PageBody::File { .. } => PageType::File,
        }
    }

    /// The file identity backing this page, if it is (or will become, once
    /// promoted) file-backed. Used by `munmap`'s contiguous-region check.
    pub fn file_identity(&self) -> Option<FileId> {
        match &self.body {
            PageBody::File { file, .. } => Some(*file),
            PageBody::Uninit {
                target: PageType::File,
                aux: Aux::File { file, .. },
                ..
            } => Some(*file),
            _ => None,
        }
    }

    /// Promotes an `Uninit` body in place, returning the data its initializer
    /// needs. No-op (returns `None`) for an already-materialized page.
    fn promote(&mut self) -> Option<(Option<InitFn<H>>, Aux)> {
        let (target, init, aux) = match &self.body {
            PageBody::Uninit { target, init, aux } => (*target, *init, *aux),
            _ => return None,
        };
        self.body = match target {
            PageType::Anon => PageBody::Anon { slot: None },
            PageType::File => {
                let Aux::File { file, offset, read_bytes } = aux else {
                    unreachable!("file-typed uninit page carries non-file aux");
                };
                PageBody::File {
                    file,
                    offset,
                    length: read_bytes,
                    writable: self.writable,
                }
            }
        };
        Some((init, aux))
    }

    /// The claim protocol's restore step (§4.3.1, §4.5 step 5).
    pub fn swap_in(&mut self, kva: KernAddr, hal: &H, swap: &SwapTable) -> Result<(), PageOpError> {
        if let Some((init, aux)) = self.promote() {
            if let Some(init_fn) = init {
                init_fn(&aux, kva, hal)?;
            }
            return Ok(());
        }

        match &mut self.body {
            PageBody::Uninit { .. } => unreachable!("just promoted out of Uninit"),
            PageBody::Anon { slot } => anon::swap_in(slot, kva, hal, swap),
            PageBody::File { file, offset, length, .. } => file::swap_in(*file, *offset, *length, kva, hal),
        }
    }

    /// Evicts this page: writes it out (if needed) and clears its frame
    /// binding and hardware mapping. The caller (the frame table) clears the
    /// frame's own back-pointer.
    pub fn swap_out(&mut self, hal: &H, pt: &H::PageTable, swap: &SwapTable) -> Result<(), PageOpError> {
        let kva = self.frame.expect("swap_out on a page with no bound frame");
        let va = self.va;
        match &mut self.body {
            PageBody::Uninit { .. } => unreachable!("uninit page has no frame to evict"),
            PageBody::Anon { slot } => anon::swap_out(slot, kva, va, hal, swap, pt)?,
            PageBody::File { file, offset, length, .. } => {
                file::swap_out(*file, *offset, *length, kva, va, hal, pt)?
            }
        }
        self.frame = None;
        Ok(())
    }

    /// Tears down this page permanently: flushes dirty content, releases its
    /// swap slot or file region, clears the hardware mapping, and returns its
    /// frame to the pool.
    pub fn destroy(&mut self, hal: &H, pt: &H::PageTable, swap: &SwapTable, frames: &FrameTable<H>) {
        let kva = self.frame;
        let va = self.va;
        match &mut self.body {
            PageBody::Uninit { .. } => {}
            PageBody::Anon { slot } => anon::destroy(slot, kva, va, swap, pt),
            PageBody::File { file, offset, length, .. } => file::destroy(*file, *offset, *length, kva, va, hal, pt),
        }
        if let Some(kva) = kva {
            frames.unbind(kva);
            frames.free_frame(hal, kva);
        }
        self.frame = None;
    }
}
