//! The capability interface shared by every memory-backed component
//!
//! A device sees absolute 16-bit addresses. The composer only forwards
//! addresses that fall inside the range the device was registered for, so a
//! device never has to validate that itself.
//!
//! Besides the byte-level calls, a device may grant the CPU core a direct view
//! of a [`CACHE_LINE_SIZE`]-byte aligned chunk. Such a view is only handed out
//! when accessing that chunk has no side effects, and stays valid until the
//! device reports an invalidation for it.

use std::fmt;

use crate::time::EmuTime;

/// log2 of the cache line size
pub const CACHE_LINE_BITS: u32 = 8;

/// Size of one direct-access cache line in bytes
pub const CACHE_LINE_SIZE: usize = 1 << CACHE_LINE_BITS;

/// Mask selecting the offset inside a cache line
pub const CACHE_LINE_LOW: u16 = (CACHE_LINE_SIZE - 1) as u16;

/// Mask selecting the aligned start of a cache line
pub const CACHE_LINE_HIGH: u16 = !CACHE_LINE_LOW;

/// Number of cache lines covering the whole 64KB address space
pub const NUM_CACHE_LINES: u32 = 0x10000 / CACHE_LINE_SIZE as u32;

/// Value seen on an unconnected data bus
pub const UNMAPPED_BYTE: u8 = 0xFF;

/// Direct-access view of one cache line
pub type CacheLine = [u8; CACHE_LINE_SIZE];

/// A cache line reading as an unconnected bus
pub static UNMAPPED_LINE: CacheLine = [UNMAPPED_BYTE; CACHE_LINE_SIZE];

/// Check whether `addr` is the start of a cache line
#[inline]
pub fn is_line_aligned(addr: u16) -> bool {
    addr & CACHE_LINE_LOW == 0
}

/// Borrow a cache-line sized window out of a byte slice, if it is long enough
#[inline]
pub fn line_of(bytes: &[u8], offset: usize) -> Option<&CacheLine> {
    bytes
        .get(offset..offset + CACHE_LINE_SIZE)
        .and_then(|chunk| chunk.try_into().ok())
}

/// Mutable variant of [`line_of`]
#[inline]
pub fn line_of_mut(bytes: &mut [u8], offset: usize) -> Option<&mut CacheLine> {
    bytes
        .get_mut(offset..offset + CACHE_LINE_SIZE)
        .and_then(|chunk| chunk.try_into().ok())
}

/// Trait for anything that can be placed in the 64KB address space
pub trait MemoryDevice {
    /// Short human readable name, used in logs and diagnostics
    fn name(&self) -> &str;

    /// Read a byte; may change internal latches
    fn read_byte(&mut self, addr: u16, time: EmuTime) -> u8;

    /// Write a byte; read-only devices ignore this
    fn write_byte(&mut self, addr: u16, value: u8, time: EmuTime);

    /// Read a byte without side effects and independent of time.
    ///
    /// The default derives the value from the read cache line. Devices that
    /// cannot grant one and have no safe way to peek answer [`UNMAPPED_BYTE`]
    /// rather than performing a side-effecting read.
    fn peek_byte(&self, addr: u16) -> u8 {
        match self.read_cache_line(addr & CACHE_LINE_HIGH) {
            Some(line) => line[(addr & CACHE_LINE_LOW) as usize],
            None => UNMAPPED_BYTE,
        }
    }

    /// Direct read access to the line starting at `start`.
    ///
    /// Must only return `Some` when reads in the whole line are side-effect
    /// free and time independent.
    fn read_cache_line(&self, _start: u16) -> Option<&CacheLine> {
        None
    }

    /// Direct write access to the line starting at `start`.
    ///
    /// Devices whose writes carry protocol meaning (bank switching, register
    /// writes) must return `None`.
    fn write_cache_line(&mut self, _start: u16) -> Option<&mut CacheLine> {
        None
    }

    /// Return the device to its power-on state
    fn reset(&mut self, _time: EmuTime) {}
}

impl fmt::Debug for dyn MemoryDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryDevice")
            .field("name", &self.name())
            .finish()
    }
}

/// Sentinel device covering otherwise unmapped addresses
#[derive(Debug, Default, Clone, Copy)]
pub struct DummyDevice;

impl MemoryDevice for DummyDevice {
    fn name(&self) -> &str {
        "unmapped"
    }

    #[inline]
    fn read_byte(&mut self, _addr: u16, _time: EmuTime) -> u8 {
        UNMAPPED_BYTE
    }

    #[inline]
    fn write_byte(&mut self, _addr: u16, _value: u8, _time: EmuTime) {}

    #[inline]
    fn peek_byte(&self, _addr: u16) -> u8 {
        UNMAPPED_BYTE
    }

    fn read_cache_line(&self, _start: u16) -> Option<&CacheLine> {
        Some(&UNMAPPED_LINE)
    }
}
