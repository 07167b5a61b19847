//! Tunables fixed by the specification, kept in one place the way the teacher
//! keeps kernel-wide constants in a single `config.rs`.
use addr::PAGE_SIZE as ADDR_PAGE_SIZE;

/// The size of a page, in bytes.
pub const PAGE_SIZE: usize = ADDR_PAGE_SIZE;

/// The size of a disk sector, in bytes.
pub const SECTOR_SIZE: usize = 512;

/// The number of sectors occupied by one swap slot (one page).
pub const SECTORS_PER_SLOT: u64 = (PAGE_SIZE / SECTOR_SIZE) as u64;

/// The top of the user stack. Growth is permitted below this address, down to
/// `USER_STACK_TOP - STACK_MAX_SIZE`.
pub const USER_STACK_TOP: usize = 0x0000_7FFF_FFFF_F000;

/// The maximum size a stack is allowed to grow to, starting from
/// `USER_STACK_TOP`.
pub const STACK_MAX_SIZE: usize = 1024 * 1024;

/// The first address the kernel half of the address space starts at. Any
/// fault at or above this address is a kernel-space access and is always
/// rejected by the fault handler.
pub const KERNEL_BASE: usize = 0xFFFF_8000_0000_0000;
