//! An in-memory stand-in for one process's hardware page table.
use hashbrown::HashMap;

use addr::{KernAddr, UserAddr};
use sync::Mutex;

use crate::hal::{MapError, PageTable};

#[derive(Clone, Copy)]
struct Entry {
    frame: KernAddr,
    accessed: bool,
    dirty: bool,
}

/// Standing in for `pml4_*` (§6): one page table per process.
pub struct FakePageTable {
    entries: Mutex<HashMap<UserAddr, Entry>>,
}

impl FakePageTable {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for FakePageTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PageTable for FakePageTable {
    fn translate(&self, va: UserAddr) -> Option<KernAddr> {
        self.entries.lock().get(&va).map(|e| e.frame)
    }

    fn map(&self, va: UserAddr, frame: KernAddr, _writable: bool) -> Result<(), MapError> {
        self.entries.lock().insert(
            va,
            Entry {
                frame,
                accessed: false,
                dirty: false,
            },
        );
        Ok(())
    }

    fn unmap(&self, va: UserAddr) {
        self.entries.lock().remove(&va);
    }

    fn is_accessed(&self, va: UserAddr) -> bool {
        self.entries.lock().get(&va).is_some_and(|e| e.accessed)
    }

    fn set_accessed(&self, va: UserAddr, value: bool) {
        if let Some(e) = self.entries.lock().get_mut(&va) {
            e.accessed = value;
        }
    }

    fn is_dirty(&self, va: UserAddr) -> bool {
        self.entries.lock().get(&va).is_some_and(|e| e.dirty)
    }

    fn set_dirty(&self, va: UserAddr, value: bool) {
        if let Some(e) = self.entries.lock().get_mut(&va) {
            e.dirty = value;
        }
    }
}
