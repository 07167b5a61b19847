//! Frame pool and frame table (§4.1) plus the clock evictor (§4.2).
use alloc::sync::Weak;
use alloc::vec::Vec;

use hashbrown::HashMap;

use addr::{KernAddr, UserAddr};
use sync::Mutex;

use crate::hal::Hal;
use crate::page::Page;
use crate::process::Process;

/// No frame could be freed: every resident frame survived both clock sweeps.
/// Only possible if the frame table itself is empty, since a nonempty table
/// always yields a victim within two passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    NoVictim,
    SwapFull,
}

/// One physical user-pool frame. Owned by the frame table while resident;
/// `page` is the back-reference to its current occupant, cleared together
/// with the hardware mapping on swap-out (§3).
pub struct Frame<H: Hal> {
    pub kva: KernAddr,
    pub page: Option<Weak<Mutex<Page<H>>>>,
    pub owner: Option<Weak<Process<H>>>,
    pub va: UserAddr,
}

struct Inner<H: Hal> {
    ring: Vec<KernAddr>,
    cursor: usize,
    by_kva: HashMap<KernAddr, Frame<H>>,
}

impl<H: Hal> Inner<H> {
    /// Runs the clock policy of §4.2, returning the ring index of the chosen
    /// victim. Advances `self.cursor` past it so the next eviction starts
    /// where this one left off.
    fn select_victim(&mut self) -> Option<usize> {
        let len = self.ring.len();
        if len == 0 {
            return None;
        }

        for _ in 0..len {
            let idx = self.cursor;
            let kva = self.ring[idx];
            let frame = self.by_kva.get(&kva).expect("ring entry missing from index");
            match resident_owner(frame) {
                None => {
                    self.cursor = (idx + 1) % len;
                    return Some(idx);
                }
                Some((owner, va)) => {
                    if owner.page_table().is_accessed(va) {
                        owner.page_table().set_accessed(va, false);
                        self.cursor = (idx + 1) % len;
                    } else if !owner.page_table().is_dirty(va) {
                        self.cursor = (idx + 1) % len;
                        return Some(idx);
                    } else {
                        self.cursor = (idx + 1) % len;
                    }
                }
            }
        }

        for _ in 0..len {
            let idx = self.cursor;
            let kva = self.ring[idx];
            let frame = self.by_kva.get(&kva).expect("ring entry missing from index");
            match resident_owner(frame) {
                None => {
                    self.cursor = (idx + 1) % len;
                    return Some(idx);
                }
                Some((owner, va)) => {
                    if !owner.page_table().is_accessed(va) {
                        self.cursor = (idx + 1) % len;
                        return Some(idx);
                    }
                    owner.page_table().set_accessed(va, false);
                    self.cursor = (idx + 1) % len;
                }
            }
        }

        None
    }
}

/// Resolves a frame's owning process, if both it and the page it backs are
/// still alive. A frame whose page or owner has already been torn down
/// (destroy raced ahead of an in-flight eviction) is treated the same as an
/// unbound frame: free to take.
fn resident_owner<H: Hal>(frame: &Frame<H>) -> Option<(alloc::sync::Arc<Process<H>>, UserAddr)> {
    let page = frame.page.as_ref()?.upgrade()?;
    let owner = frame.owner.as_ref()?.upgrade()?;
    drop(page);
    Some((owner, frame.va))
}

/// Zeroes a frame before it is handed to a new page (§4.1, §4.3.2). Needed
/// for every recycled (evicted) frame: only the page pool's own allocation
/// path zeroes on its own.
fn zero_frame(kva: KernAddr) {
    // SAFETY: kva refers to a full PAGE_SIZE frame this call exclusively
    // owns until it is bound to a new page below.
    unsafe { core::ptr::write_bytes(kva.as_mut_ptr(), 0, crate::config::PAGE_SIZE) };
}

/// The process-global table of resident frames, guarded by `frame_lock`
/// (§5). All insertion, removal and the clock sweep itself take this lock;
/// swap I/O runs with it released.
pub struct FrameTable<H: Hal> {
    inner: Mutex<Inner<H>>,
}

impl<H: Hal> FrameTable<H> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                ring: Vec::new(),
                cursor: 0,
                by_kva: HashMap::new(),
            }),
        }
    }

    /// Returns a usable frame, evicting one if the pool is exhausted. The
    /// returned frame is zeroed and not yet bound to any page; the caller
    /// (the claim protocol) installs the binding via [`FrameTable::bind`].
    pub fn get_frame(&self, hal: &H, swap: &crate::swap::SwapTable) -> Result<KernAddr, FrameError> {
        if let Some(kva) = hal.alloc_user_page() {
            log::trace!("frame: fresh frame {kva:?} from pool");
            return Ok(kva);
        }

        let (kva, page_weak, owner_weak) = {
            let mut inner = self.inner.lock();
            let idx = inner.select_victim().ok_or(FrameError::NoVictim)?;
            let kva = inner.ring[idx];
            let frame = inner.by_kva.get_mut(&kva).expect("victim index missing from table");
            // Detach under the lock, before any I/O: a concurrent `get_frame`
            // must not be able to select this same victim while its
            // swap-out runs with the lock released (§5).
            (kva, frame.page.take(), frame.owner.take())
        };

        let bound = page_weak
            .clone()
            .and_then(|w| w.upgrade())
            .zip(owner_weak.clone().and_then(|w| w.upgrade()));

        if let Some((page_arc, owner_arc)) = bound {
            log::trace!("frame: evicting {kva:?}");
            let mut page = page_arc.lock();
            if page.swap_out(hal, owner_arc.page_table(), swap).is_err() {
                log::error!("frame: swap device full while evicting {kva:?}");
                drop(page);
                // The page is still resident here; undo the detach above.
                let mut inner = self.inner.lock();
                if let Some(frame) = inner.by_kva.get_mut(&kva) {
                    frame.page = page_weak;
                    frame.owner = owner_weak;
                }
                return Err(FrameError::SwapFull);
            }
        }
        // else: the victim was already unbound, or its page/process had
        // already been torn down — either way it was detached above and
        // there is nothing left to write back.

        zero_frame(kva);
        Ok(kva)
    }

    /// Binds `kva` to `page`/`owner`/`va`, inserting it into the table if
    /// this is its first claim (the `in_table` rule of §4.1: a recycled,
    /// evicted frame is already a member and is only updated in place).
    pub fn bind(&self, kva: KernAddr, page: Weak<Mutex<Page<H>>>, owner: Weak<Process<H>>, va: UserAddr) {
        let mut inner = self.inner.lock();
        if let Some(frame) = inner.by_kva.get_mut(&kva) {
            frame.page = Some(page);
            frame.owner = Some(owner);
            frame.va = va;
        } else {
            inner.by_kva.insert(
                kva,
                Frame {
                    kva,
                    page: Some(page),
                    owner: Some(owner),
                    va,
                },
            );
            inner.ring.push(kva);
        }
    }

    /// Releases `kva`: frees the backing page and drops it from the table.
    /// The caller guarantees the binding has already been cleared.
    pub fn free_frame(&self, hal: &H, kva: KernAddr) {
        let mut inner = self.inner.lock();
        if let Some(pos) = inner.ring.iter().position(|&k| k == kva) {
            // `remove`, not `swap_remove`: keeps the ring insertion-ordered
            // (§3), which is what makes the cursor adjustment below correct.
            inner.ring.remove(pos);
            if inner.cursor > pos {
                inner.cursor -= 1;
            } else if inner.cursor >= inner.ring.len() && !inner.ring.is_empty() {
                inner.cursor = 0;
            }
        }
        inner.by_kva.remove(&kva);
        drop(inner);
        hal.free_user_page(kva);
    }

    /// Clears a frame's binding without freeing it back to the pool. Used by
    /// the claim rollback path: the frame stays a member of the table (it
    /// may be immediately handed back out by a concurrent claim) but no
    /// longer belongs to any page.
    pub fn unbind(&self, kva: KernAddr) {
        let mut inner = self.inner.lock();
        if let Some(frame) = inner.by_kva.get_mut(&kva) {
            frame.page = None;
            frame.owner = None;
        }
    }
}

impl<H: Hal> Default for FrameTable<H> {
    fn default() -> Self {
        Self::new()
    }
}
