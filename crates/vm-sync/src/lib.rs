//! Synchronization primitives used by the VM subsystem.
//!
//! Currently just re-exports objects from the `spin` crate: `frame_lock` and
//! `swap_lock` must be usable before any scheduler exists to put a thread to
//! sleep, which rules out a blocking mutex.
#![no_std]

pub use spin::*;

pub type Mutex<T> = spin::Mutex<T>;
pub type Lazy<T> = spin::Lazy<T>;
pub type Once<T> = spin::Once<T>;
