//! The supplemental page table (§4.4): per-process map from user VA to page
//! descriptor, plus fork copy and teardown.
use alloc::collections::btree_map::{BTreeMap, Entry};
use alloc::sync::Arc;
use alloc::vec::Vec;

use addr::UserAddr;
use sync::Mutex;

use crate::config::PAGE_SIZE;
use crate::hal::Hal;
use crate::page::{Aux, InitFn, Page, PageBody, PageType};
use crate::process::{claim, Process};

/// Per-process map from page-aligned user VA to page descriptor.
pub struct Spt<H: Hal> {
    pages: BTreeMap<UserAddr, Arc<Mutex<Page<H>>>>,
}

impl<H: Hal> Spt<H> {
    pub fn new() -> Self {
        Self { pages: BTreeMap::new() }
    }

    /// Looks up the page containing `va`.
    pub fn find(&self, va: UserAddr) -> Option<Arc<Mutex<Page<H>>>> {
        self.pages.get(&va.page_base()).cloned()
    }

    /// Inserts `page`, keyed by its own (already page-aligned) VA. Fails if
    /// an entry for that VA already exists.
    pub fn insert(&mut self, page: Arc<Mutex<Page<H>>>) -> bool {
        let va = page.lock().va;
        match self.pages.entry(va) {
            Entry::Vacant(e) => {
                e.insert(page);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    fn take(&mut self, va: UserAddr) -> Option<Arc<Mutex<Page<H>>>> {
        self.pages.remove(&va.page_base())
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl<H: Hal> Default for Spt<H> {
    fn default() -> Self {
        Self::new()
    }
}

/// Removes and destroys the page at `va`. Returns whether an entry existed.
pub fn remove<H: Hal>(process: &Process<H>, va: UserAddr) -> bool {
    let page = process.spt.lock().take(va);
    match page {
        Some(page) => {
            destroy_one(process, &page);
            true
        }
        None => false,
    }
}

/// Tears down every page in `process`'s SPT. The hardware address space
/// itself is torn down separately by the caller once this returns.
pub fn kill<H: Hal>(process: &Process<H>) {
    let drained: Vec<_> = {
        let mut spt = process.spt.lock();
        core::mem::take(&mut spt.pages).into_values().collect()
    };
    for page in drained {
        destroy_one(process, &page);
    }
}

fn destroy_one<H: Hal>(process: &Process<H>, page: &Arc<Mutex<Page<H>>>) {
    page.lock()
        .destroy(&process.vm.hal, process.page_table(), &process.vm.swap, &process.vm.frames);
}

enum CopyKind<H: Hal> {
    /// File-backed, materialized or not: the child does not inherit mmaps.
    Skip,
    Uninit { init: Option<InitFn<H>>, aux: Aux },
    Anon,
}

fn classify<H: Hal>(page: &Page<H>) -> CopyKind<H> {
    match &page.body {
        PageBody::File { .. } => CopyKind::Skip,
        PageBody::Uninit {
            target: PageType::File, ..
        } => CopyKind::Skip,
        PageBody::Uninit {
            target: PageType::Anon,
            init,
            aux,
        } => CopyKind::Uninit { init: *init, aux: *aux },
        PageBody::Anon { .. } => CopyKind::Anon,
    }
}

/// Populates `dst`'s SPT from `src`'s (§4.4, used by fork). File-backed
/// pages are skipped; uninitialized anonymous pages are recreated with a
/// copy of their aux payload; materialized anonymous pages are claimed in
/// both address spaces and their contents copied byte-for-byte.
pub fn copy<H: Hal>(dst: &Arc<Process<H>>, src: &Arc<Process<H>>) -> bool {
    let entries: Vec<Arc<Mutex<Page<H>>>> = src.spt.lock().pages.values().cloned().collect();

    for src_page in entries {
        let (va, writable, flags, kind) = {
            let guard = src_page.lock();
            (guard.va, guard.writable, guard.flags, classify(&guard))
        };

        match kind {
            CopyKind::Skip => continue,
            CopyKind::Uninit { init, aux } => {
                let page = Page::new(va, writable, Arc::downgrade(dst), PageType::Anon, init, aux, flags);
                if !dst.spt.lock().insert(Arc::new(Mutex::new(page))) {
                    return false;
                }
            }
            CopyKind::Anon => {
                if src_page.lock().frame.is_none() && claim(src, &src_page).is_err() {
                    return false;
                }

                let dst_page = Arc::new(Mutex::new(Page::new(
                    va,
                    writable,
                    Arc::downgrade(dst),
                    PageType::Anon,
                    None,
                    Aux::None,
                    flags,
                )));
                // Skip the zero-fill the Uninit trampoline would perform:
                // the claim below binds a frame and we overwrite it anyway.
                dst_page.lock().body = PageBody::Anon { slot: None };

                if !dst.spt.lock().insert(dst_page.clone()) {
                    return false;
                }
                if claim(dst, &dst_page).is_err() {
                    return false;
                }

                let src_kva = src_page.lock().frame.expect("claimed above");
                let dst_kva = dst_page.lock().frame.expect("claimed above");
                // SAFETY: both addresses refer to distinct, exclusively-owned
                // PAGE_SIZE frames.
                unsafe {
                    core::ptr::copy_nonoverlapping(src_kva.as_ptr(), dst_kva.as_mut_ptr(), PAGE_SIZE);
                }
            }
        }
    }

    true
}
