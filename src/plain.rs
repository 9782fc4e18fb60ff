//! Plain (unmapped) memory devices
//!
//! RAM and ROM that sit at a fixed base address with no bank switching. Both
//! are backed by a [`BankedStorage`] so the CPU core can be granted direct
//! cache lines into them.

use log::trace;

use crate::device::{line_of, line_of_mut, CacheLine, MemoryDevice, UNMAPPED_BYTE};
use crate::storage::BankedStorage;
use crate::time::EmuTime;

/// Bank granularity used for plain devices (8KB)
const PLAIN_BANK_BITS: u8 = 13;

/// Read/write memory at a fixed base address
pub struct RamDevice {
    name: String,
    base: u16,
    storage: BankedStorage,
}

impl RamDevice {
    /// Create `size` bytes of zeroed RAM visible from `base`
    pub fn new(name: impl Into<String>, base: u16, size: usize) -> Self {
        RamDevice {
            name: name.into(),
            base,
            storage: BankedStorage::zeroed(size, PLAIN_BANK_BITS),
        }
    }

    /// Base address this device was configured for
    pub fn base(&self) -> u16 {
        self.base
    }

    /// Size of the RAM in bytes
    pub fn size(&self) -> usize {
        self.storage.len()
    }

    /// Raw contents
    pub fn contents(&self) -> &[u8] {
        self.storage.as_slice()
    }

    #[inline]
    fn offset(&self, addr: u16) -> usize {
        addr.wrapping_sub(self.base) as usize
    }
}

impl MemoryDevice for RamDevice {
    fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    fn read_byte(&mut self, addr: u16, _time: EmuTime) -> u8 {
        self.peek_byte(addr)
    }

    #[inline]
    fn write_byte(&mut self, addr: u16, value: u8, _time: EmuTime) {
        let offset = self.offset(addr);
        if !self.storage.write_flat(offset, value) {
            trace!("{}: write past end of RAM at ${:04X}", self.name, addr);
        }
    }

    #[inline]
    fn peek_byte(&self, addr: u16) -> u8 {
        self.storage
            .read_flat(self.offset(addr))
            .unwrap_or(UNMAPPED_BYTE)
    }

    fn read_cache_line(&self, start: u16) -> Option<&CacheLine> {
        line_of(self.storage.as_slice(), self.offset(start))
    }

    fn write_cache_line(&mut self, start: u16) -> Option<&mut CacheLine> {
        let offset = self.offset(start);
        line_of_mut(self.storage.as_mut_slice(), offset)
    }
}

/// Read-only memory at a fixed base address
pub struct RomDevice {
    name: String,
    base: u16,
    storage: BankedStorage,
}

impl RomDevice {
    /// Map `image` starting at `base`
    pub fn new(name: impl Into<String>, base: u16, image: Vec<u8>) -> Self {
        RomDevice {
            name: name.into(),
            base,
            storage: BankedStorage::new(image, PLAIN_BANK_BITS),
        }
    }

    /// Base address this device was configured for
    pub fn base(&self) -> u16 {
        self.base
    }

    /// Size of the populated image in bytes
    pub fn size(&self) -> usize {
        self.storage.len()
    }

    #[inline]
    fn offset(&self, addr: u16) -> usize {
        addr.wrapping_sub(self.base) as usize
    }
}

impl MemoryDevice for RomDevice {
    fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    fn read_byte(&mut self, addr: u16, _time: EmuTime) -> u8 {
        self.peek_byte(addr)
    }

    #[inline]
    fn write_byte(&mut self, addr: u16, value: u8, _time: EmuTime) {
        trace!("{}: ignored ROM write ${:04X} = ${:02X}", self.name, addr, value);
    }

    #[inline]
    fn peek_byte(&self, addr: u16) -> u8 {
        self.storage
            .read_flat(self.offset(addr))
            .unwrap_or(UNMAPPED_BYTE)
    }

    fn read_cache_line(&self, start: u16) -> Option<&CacheLine> {
        line_of(self.storage.as_slice(), self.offset(start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::CACHE_LINE_SIZE;

    #[test]
    fn ram_read_write_roundtrip() {
        let mut ram = RamDevice::new("ram", 0xC000, 0x4000);
        ram.write_byte(0xC000, 0x42, EmuTime::ZERO);
        ram.write_byte(0xFFFF, 0xAB, EmuTime::ZERO);
        assert_eq!(ram.read_byte(0xC000, EmuTime::ZERO), 0x42);
        assert_eq!(ram.peek_byte(0xFFFF), 0xAB);
        assert_eq!(ram.contents()[0x3FFF], 0xAB);
    }

    #[test]
    fn ram_write_line_is_visible_through_reads() {
        let mut ram = RamDevice::new("ram", 0x8000, 0x2000);
        {
            let line = ram.write_cache_line(0x8100).expect("RAM grants write lines");
            line[0x10] = 0x99;
        }
        assert_eq!(ram.read_byte(0x8110, EmuTime::ZERO), 0x99);
        let line = ram.read_cache_line(0x8100).expect("RAM grants read lines");
        assert_eq!(line[0x10], 0x99);
    }

    #[test]
    fn rom_ignores_writes_and_grants_no_write_line() {
        let mut rom = RomDevice::new("rom", 0x0000, vec![0x11; 0x8000]);
        rom.write_byte(0x0000, 0x22, EmuTime::ZERO);
        assert_eq!(rom.read_byte(0x0000, EmuTime::ZERO), 0x11);
        assert!(rom.write_cache_line(0x0000).is_none());
    }

    #[test]
    fn short_rom_reads_open_bus_past_its_end() {
        let mut rom = RomDevice::new("rom", 0x4000, vec![0x5A; 0x1080]);
        assert_eq!(rom.read_byte(0x507F, EmuTime::ZERO), 0x5A);
        assert_eq!(rom.read_byte(0x5080, EmuTime::ZERO), 0xFF);
        assert_eq!(rom.peek_byte(0x7FFF), 0xFF);
        // the partial line is not handed out
        assert!(rom.read_cache_line(0x5000).is_none());
        assert_eq!(rom.read_cache_line(0x4F00).map(|l| l.len()), Some(CACHE_LINE_SIZE));
    }

    #[test]
    fn cache_line_matches_reads() {
        let image: Vec<u8> = (0..0x4000u32).map(|i| (i * 7) as u8).collect();
        let mut rom = RomDevice::new("rom", 0x4000, image);
        let line = *rom.read_cache_line(0x4300).expect("line");
        for (i, &byte) in line.iter().enumerate() {
            assert_eq!(byte, rom.read_byte(0x4300 + i as u16, EmuTime::from_ticks(i as u64)));
        }
    }
}
