//! An in-memory stand-in for the filesystem, keyed by opaque [`FileId`]
//! handles rather than real file descriptors.
use alloc::vec::Vec;

use hashbrown::HashMap;
use sync::Mutex;

use crate::hal::FileId;

struct Inner {
    next_handle: u64,
    handles: HashMap<FileId, usize>,
    files: Vec<Vec<u8>>,
}

/// Standing in for `file_reopen`/`file_read_at`/`file_write_at`/`file_close`
/// (§6). Every open handle is independent, matching the real filesystem's
/// contract that closing one handle does not invalidate another reopened
/// from the same underlying file.
pub struct FakeFilesystem {
    inner: Mutex<Inner>,
}

impl FakeFilesystem {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_handle: 0,
                handles: HashMap::new(),
                files: Vec::new(),
            }),
        }
    }

    /// Creates a file with the given contents and returns its first handle.
    pub fn create(&self, content: Vec<u8>) -> FileId {
        let mut inner = self.inner.lock();
        let inode = inner.files.len();
        inner.files.push(content);
        let handle = FileId(inner.next_handle);
        inner.next_handle += 1;
        inner.handles.insert(handle, inode);
        handle
    }

    pub fn reopen(&self, file: FileId) -> FileId {
        let mut inner = self.inner.lock();
        let inode = inner.handles[&file];
        let handle = FileId(inner.next_handle);
        inner.next_handle += 1;
        inner.handles.insert(handle, inode);
        handle
    }

    pub fn read_at(&self, file: FileId, buf: &mut [u8], offset: u64) -> usize {
        let inner = self.inner.lock();
        let content = &inner.files[inner.handles[&file]];
        let offset = offset as usize;
        if offset >= content.len() {
            return 0;
        }
        let n = (content.len() - offset).min(buf.len());
        buf[..n].copy_from_slice(&content[offset..offset + n]);
        n
    }

    pub fn write_at(&self, file: FileId, buf: &[u8], offset: u64) -> usize {
        let mut inner = self.inner.lock();
        let inode = inner.handles[&file];
        let offset = offset as usize;
        let content = &mut inner.files[inode];
        if content.len() < offset + buf.len() {
            content.resize(offset + buf.len(), 0);
        }
        content[offset..offset + buf.len()].copy_from_slice(buf);
        buf.len()
    }

    pub fn close(&self, file: FileId) {
        self.inner.lock().handles.remove(&file);
    }

    /// Test-only accessor: the current contents of the underlying file.
    pub fn contents(&self, file: FileId) -> Vec<u8> {
        let inner = self.inner.lock();
        inner.files[inner.handles[&file]].clone()
    }
}

impl Default for FakeFilesystem {
    fn default() -> Self {
        Self::new()
    }
}
