//! An in-memory stand-in for the swap disk.
use alloc::vec;
use alloc::vec::Vec;

use sync::Mutex;

use crate::config::SECTOR_SIZE;

/// Standing in for `disk_get`/`disk_size`/`disk_read`/`disk_write` (§6).
pub struct FakeDisk {
    sectors: Mutex<Vec<[u8; SECTOR_SIZE]>>,
}

impl FakeDisk {
    pub fn new(sector_count: u64) -> Self {
        Self {
            sectors: Mutex::new(vec![[0u8; SECTOR_SIZE]; sector_count as usize]),
        }
    }

    pub fn sector_count(&self) -> u64 {
        self.sectors.lock().len() as u64
    }

    pub fn read(&self, sector: u64, buf: &mut [u8; SECTOR_SIZE]) {
        *buf = self.sectors.lock()[sector as usize];
    }

    pub fn write(&self, sector: u64, buf: &[u8; SECTOR_SIZE]) {
        self.sectors.lock()[sector as usize] = *buf;
    }
}
