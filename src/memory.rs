//! Address space composition for the MSX memory bus
//!
//! The Z80 sees a flat 64KB address space built out of independent devices:
//! RAM, system ROM, mapped cartridges and memory-mapped I/O windows. This
//! module composes them into a single [`MemoryDevice`] and resolves every
//! address to exactly one of them.
//!
//! Registration rejects overlapping ranges, so lookup never has to validate
//! anything. Addresses no device claims fall through to a [`DummyDevice`]
//! that reads as an unconnected bus. The most recently added range is checked
//! first.
//!
//! Mounting or unmounting a device changes what the CPU sees in that window,
//! so both report the affected cache lines to the invalidator.

use std::fmt;

use log::{debug, info, trace};
use thiserror::Error;

use crate::device::{CacheLine, DummyDevice, MemoryDevice};
use crate::invalidate::{line_span, InvalidatorRef};
use crate::time::EmuTime;

/// Size of the full address space
pub const ADDRESS_SPACE_SIZE: u32 = 0x10000;

/// Errors that can occur when configuring the memory bus
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("range ${base:04X}+${size:X} overlaps {existing} at ${existing_base:04X}+${existing_size:X}")]
    Overlap {
        base: u16,
        size: u32,
        existing: String,
        existing_base: u16,
        existing_size: u32,
    },

    #[error("range ${base:04X}+${size:X} is empty or extends past the 64KB address space")]
    InvalidRange { base: u16, size: u32 },

    #[error("unknown mapper type: {0}")]
    UnknownMapperType(String),
}

/// Handle identifying a registered device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(u32);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One registered `[base, base + size)` window
struct AddressRange {
    id: DeviceId,
    base: u16,
    size: u32,
    device: Box<dyn MemoryDevice>,
}

impl AddressRange {
    /// Half-open membership; wrapping subtraction covers `addr < base` too
    #[inline]
    fn contains(&self, addr: u16) -> bool {
        (addr as u32).wrapping_sub(self.base as u32) < self.size
    }

    #[inline]
    fn overlaps(&self, base: u16, size: u32) -> bool {
        let (a0, a1) = (self.base as u32, self.base as u32 + self.size);
        let (b0, b1) = (base as u32, base as u32 + size);
        a0 < b1 && b0 < a1
    }
}

/// Summary of a registered range, for diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeInfo {
    pub id: DeviceId,
    pub base: u16,
    pub size: u32,
    pub name: String,
}

/// Composes devices into one 64KB address space
pub struct MultiMemDevice {
    /// Registered ranges, most recent first
    ranges: Vec<AddressRange>,

    /// Fallback for addresses no range claims
    unmapped: DummyDevice,

    /// Told about every window whose device changes
    invalidator: InvalidatorRef,

    next_id: u32,
}

impl MultiMemDevice {
    /// Create an address space where every address is unmapped
    pub fn new(invalidator: InvalidatorRef) -> Self {
        MultiMemDevice {
            ranges: Vec::new(),
            unmapped: DummyDevice,
            invalidator,
            next_id: 0,
        }
    }

    /// Drop cached lines for a window whose device just changed
    fn invalidate_window(&self, base: u16, size: u32) {
        let (start, num_lines) = line_span(base, size);
        self.invalidator.invalidate_range(start, num_lines);
    }

    /// Register `device` for `[base, base + size)`.
    ///
    /// Fails without touching the address space if the range is empty, runs
    /// past 0xFFFF or overlaps any registered range. On success the range
    /// takes precedence over everything registered before it.
    pub fn add(
        &mut self,
        device: Box<dyn MemoryDevice>,
        base: u16,
        size: u32,
    ) -> Result<DeviceId, MemoryError> {
        if size == 0 || size > ADDRESS_SPACE_SIZE - base as u32 {
            return Err(MemoryError::InvalidRange { base, size });
        }
        if let Some(existing) = self.ranges.iter().find(|r| r.overlaps(base, size)) {
            debug!(
                "Rejected {} at ${:04X}+${:X}: overlaps {}",
                device.name(),
                base,
                size,
                existing.device.name()
            );
            return Err(MemoryError::Overlap {
                base,
                size,
                existing: existing.device.name().to_string(),
                existing_base: existing.base,
                existing_size: existing.size,
            });
        }

        let id = DeviceId(self.next_id);
        self.next_id += 1;
        info!("Mapped {} {} at ${:04X}-${:04X}", device.name(), id, base, base as u32 + size - 1);
        self.ranges.insert(
            0,
            AddressRange {
                id,
                base,
                size,
                device,
            },
        );
        self.invalidate_window(base, size);
        Ok(id)
    }

    /// Unregister the range previously added as `(id, base, size)` and hand
    /// the device back to its owner.
    ///
    /// # Panics
    ///
    /// Panics if no range was registered with exactly that triple.
    pub fn remove(&mut self, id: DeviceId, base: u16, size: u32) -> Box<dyn MemoryDevice> {
        let index = self
            .ranges
            .iter()
            .position(|r| r.id == id && r.base == base && r.size == size)
            .unwrap_or_else(|| {
                panic!(
                    "remove of unregistered range {} at ${:04X}+${:X}",
                    id, base, size
                )
            });
        let range = self.ranges.remove(index);
        info!("Unmapped {} {} at ${:04X}", range.device.name(), id, base);
        self.invalidate_window(base, size);
        range.device
    }

    /// True when only the unmapped fallback remains
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Registered ranges, in lookup order
    pub fn ranges(&self) -> Vec<RangeInfo> {
        self.ranges
            .iter()
            .map(|r| RangeInfo {
                id: r.id,
                base: r.base,
                size: r.size,
                name: r.device.name().to_string(),
            })
            .collect()
    }

    /// Borrow a registered device
    pub fn device(&self, id: DeviceId) -> Option<&dyn MemoryDevice> {
        self.ranges
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.device.as_ref())
    }

    /// Mutably borrow a registered device
    pub fn device_mut(&mut self, id: DeviceId) -> Option<&mut (dyn MemoryDevice + 'static)> {
        self.ranges
            .iter_mut()
            .find(|r| r.id == id)
            .map(|r| r.device.as_mut())
    }

    /// The device answering for `addr`
    #[inline]
    pub fn resolve(&self, addr: u16) -> &dyn MemoryDevice {
        match self.ranges.iter().find(|r| r.contains(addr)) {
            Some(range) => range.device.as_ref(),
            None => &self.unmapped,
        }
    }

    /// Mutable variant of [`resolve`](Self::resolve)
    #[inline]
    pub fn resolve_mut(&mut self, addr: u16) -> &mut dyn MemoryDevice {
        match self.ranges.iter_mut().find(|r| r.contains(addr)) {
            Some(range) => range.device.as_mut(),
            None => &mut self.unmapped,
        }
    }
}

impl MemoryDevice for MultiMemDevice {
    fn name(&self) -> &str {
        "address space"
    }

    #[inline]
    fn read_byte(&mut self, addr: u16, time: EmuTime) -> u8 {
        self.resolve_mut(addr).read_byte(addr, time)
    }

    #[inline]
    fn write_byte(&mut self, addr: u16, value: u8, time: EmuTime) {
        self.resolve_mut(addr).write_byte(addr, value, time)
    }

    #[inline]
    fn peek_byte(&self, addr: u16) -> u8 {
        self.resolve(addr).peek_byte(addr)
    }

    fn read_cache_line(&self, start: u16) -> Option<&CacheLine> {
        self.resolve(start).read_cache_line(start)
    }

    fn write_cache_line(&mut self, start: u16) -> Option<&mut CacheLine> {
        self.resolve_mut(start).write_cache_line(start)
    }

    fn reset(&mut self, time: EmuTime) {
        for range in self.ranges.iter_mut() {
            trace!("Reset {}", range.device.name());
            range.device.reset(time);
        }
    }
}

impl Drop for MultiMemDevice {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            debug_assert!(
                self.is_empty(),
                "address space dropped with {} devices still mapped",
                self.ranges.len()
            );
        }
    }
}

impl fmt::Debug for MultiMemDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiMemDevice")
            .field("ranges", &self.ranges())
            .finish()
    }
}
