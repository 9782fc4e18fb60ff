//! MSX cartridge implementation
//!
//! This module handles loading cartridge ROM images and the mega-ROM device:
//! a ROM image larger than the slot window, paged into the address space by
//! one of the mapper state machines in [`crate::mappers`].
//!
//! The device owns the image once, as 8KB banks, and keeps only bank indices
//! per page. Every remap is reported to the CPU core through the
//! [`CacheInvalidator`](crate::invalidate::CacheInvalidator) before the
//! triggering write returns.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use log::{debug, info, trace};
use serde::Deserialize;
use thiserror::Error;

use crate::device::{
    line_of, CacheLine, MemoryDevice, CACHE_LINE_LOW, UNMAPPED_BYTE, UNMAPPED_LINE,
};
use crate::invalidate::{lines_for, InvalidatorRef};
use crate::mappers::{
    create_mapper, guess_mapper_type, in_scc_window, page_of, page_start, Mapper, MapperState,
    MapperType, PAGE_BITS, PAGE_SIZE, SCC_WINDOW_SIZE, SCC_WINDOW_START,
};
use crate::scc::SccRegisters;
use crate::storage::BankedStorage;
use crate::time::EmuTime;
use crate::util::parse_number;

/// Errors that can occur when loading ROM images
#[derive(Error, Debug)]
pub enum RomError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ROM image is empty")]
    Empty,

    #[error("header of {skip} bytes does not fit in a {len} byte image")]
    HeaderTooLarge { skip: usize, len: usize },

    #[error("invalid patch '{0}', expected OFFSET=VALUE")]
    InvalidPatch(String),
}

/// A single byte patch applied after loading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RomPatch {
    pub offset: usize,
    pub value: u8,
}

impl FromStr for RomPatch {
    type Err = RomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RomError::InvalidPatch(s.to_string());
        let (offset, value) = s.split_once('=').ok_or_else(invalid)?;
        let offset = parse_number(offset).ok_or_else(invalid)? as usize;
        let value = parse_number(value)
            .and_then(|v| u8::try_from(v).ok())
            .ok_or_else(invalid)?;
        Ok(RomPatch { offset, value })
    }
}

/// Cartridge ROM contents, header stripped and patches applied
#[derive(Clone, PartialEq, Eq)]
pub struct RomImage {
    data: Vec<u8>,
}

impl RomImage {
    /// Build an image from raw bytes.
    ///
    /// The first `skip_header` bytes are dropped, then every patch whose
    /// offset falls inside the image is applied; the others are ignored.
    pub fn from_bytes(bytes: &[u8], skip_header: usize, patches: &[RomPatch]) -> Result<Self, RomError> {
        if skip_header > bytes.len() {
            return Err(RomError::HeaderTooLarge {
                skip: skip_header,
                len: bytes.len(),
            });
        }
        let mut data = bytes[skip_header..].to_vec();
        if data.is_empty() {
            return Err(RomError::Empty);
        }

        for patch in patches {
            match data.get_mut(patch.offset) {
                Some(byte) => *byte = patch.value,
                None => trace!("Ignoring patch past end of image at ${:X}", patch.offset),
            }
        }
        Ok(RomImage { data })
    }

    /// Load an image from a file
    pub fn from_file<P: AsRef<Path>>(path: P, skip_header: usize, patches: &[RomPatch]) -> Result<Self, RomError> {
        let bytes = std::fs::read(path.as_ref())?;
        let image = Self::from_bytes(&bytes, skip_header, patches)?;
        info!(
            "Loaded ROM {} - {}KB",
            path.as_ref().display(),
            image.len() / 1024
        );
        Ok(image)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Configured mapper, or the auto-detected one
    pub fn mapper_type(&self, configured: Option<MapperType>) -> MapperType {
        configured.unwrap_or_else(|| guess_mapper_type(&self.data))
    }
}

impl fmt::Debug for RomImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RomImage").field("len", &self.data.len()).finish()
    }
}

/// A bank-switched cartridge ROM
pub struct MegaRomDevice {
    name: String,

    /// ROM image as 8KB banks
    storage: BankedStorage,

    /// Bank-switch protocol of this cartridge
    mapper: Box<dyn Mapper>,

    /// Current page mapping
    state: MapperState,

    /// Device shown in the SCC window while enabled
    overlay: Option<Box<dyn MemoryDevice>>,

    invalidator: InvalidatorRef,
}

impl MegaRomDevice {
    /// Create a cartridge over `image` using `mapper_type`.
    ///
    /// Families with a sound chip get an [`SccRegisters`] overlay.
    pub fn new(
        name: impl Into<String>,
        image: RomImage,
        mapper_type: MapperType,
        invalidator: InvalidatorRef,
    ) -> Self {
        let overlay: Option<Box<dyn MemoryDevice>> = if mapper_type.has_scc() {
            Some(Box::new(SccRegisters::new()))
        } else {
            None
        };
        Self::with_overlay(name, image, mapper_type, overlay, invalidator)
    }

    /// Create a cartridge with an explicit overlay device (or none)
    pub fn with_overlay(
        name: impl Into<String>,
        image: RomImage,
        mapper_type: MapperType,
        overlay: Option<Box<dyn MemoryDevice>>,
        invalidator: InvalidatorRef,
    ) -> Self {
        let name = name.into();
        let storage = BankedStorage::new(image.into_bytes(), PAGE_BITS as u8);
        let mapper = create_mapper(mapper_type, storage.bank_mask());
        let state = mapper.reset_state();

        info!(
            "Cartridge {} - Mapper: {}, ROM: {}KB, banks: {}, mask: ${:02X}",
            name,
            mapper_type,
            storage.len() / 1024,
            storage.num_banks(),
            storage.bank_mask()
        );

        MegaRomDevice {
            name,
            storage,
            mapper,
            state,
            overlay,
            invalidator,
        }
    }

    /// Mapper family of this cartridge
    pub fn mapper_type(&self) -> MapperType {
        self.mapper.mapper_type()
    }

    /// Current page mapping
    pub fn state(&self) -> &MapperState {
        &self.state
    }

    /// Bank currently visible at `addr`
    pub fn bank_at(&self, addr: u16) -> Option<u32> {
        self.state.bank(page_of(addr))
    }

    /// Whether the SCC window currently answers at 0x9800-0x9FFF
    pub fn scc_active(&self) -> bool {
        self.state.scc_enabled() && self.overlay.is_some()
    }

    #[inline]
    fn overlay_hit(&self, addr: u16) -> bool {
        self.state.scc_enabled() && in_scc_window(addr) && self.overlay.is_some()
    }

    /// ROM byte visible at `addr` under the current mapping
    #[inline]
    fn rom_byte(&self, addr: u16) -> u8 {
        self.state
            .bank(page_of(addr))
            .and_then(|bank| self.storage.read(bank, (addr as u32 & (PAGE_SIZE - 1)) as usize))
            .unwrap_or(UNMAPPED_BYTE)
    }

    /// Switch to `next`, invalidating exactly the windows that changed
    fn apply(&mut self, next: MapperState) {
        let previous = std::mem::replace(&mut self.state, next);

        for page in self.state.changed_pages(&previous) {
            debug!(
                "{}: page ${:04X} bank {:?} -> {:?}",
                self.name,
                page_start(page),
                previous.bank(page),
                self.state.bank(page)
            );
            self.invalidator
                .invalidate_range(page_start(page), lines_for(PAGE_SIZE));
        }

        if previous.scc_enabled() != self.state.scc_enabled() {
            debug!(
                "{}: SCC window {}",
                self.name,
                if self.state.scc_enabled() { "enabled" } else { "disabled" }
            );
            self.invalidator
                .invalidate_range(SCC_WINDOW_START, lines_for(SCC_WINDOW_SIZE));
        }
    }
}

impl MemoryDevice for MegaRomDevice {
    fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    fn read_byte(&mut self, addr: u16, time: EmuTime) -> u8 {
        if self.overlay_hit(addr) {
            if let Some(overlay) = self.overlay.as_mut() {
                return overlay.read_byte(addr, time);
            }
        }
        self.rom_byte(addr)
    }

    fn write_byte(&mut self, addr: u16, value: u8, time: EmuTime) {
        if self.overlay_hit(addr) {
            if let Some(overlay) = self.overlay.as_mut() {
                overlay.write_byte(addr, value, time);
                return;
            }
        }

        let next = self.mapper.on_write(&self.state, addr, value);
        if next != self.state {
            self.apply(next);
        }
    }

    fn peek_byte(&self, addr: u16) -> u8 {
        match self.overlay.as_ref() {
            Some(overlay) if self.overlay_hit(addr) => overlay.peek_byte(addr),
            _ => self.rom_byte(addr),
        }
    }

    fn read_cache_line(&self, start: u16) -> Option<&CacheLine> {
        if self.overlay_hit(start) {
            return None;
        }
        let Some(bank) = self.state.bank(page_of(start)) else {
            return Some(&UNMAPPED_LINE);
        };
        match self.storage.bank(bank) {
            Some(bytes) => line_of(bytes, (start as u32 & (PAGE_SIZE - 1) & !(CACHE_LINE_LOW as u32)) as usize),
            None => Some(&UNMAPPED_LINE),
        }
    }

    fn reset(&mut self, time: EmuTime) {
        let initial = self.mapper.reset_state();
        if initial != self.state {
            self.apply(initial);
        }
        if let Some(overlay) = self.overlay.as_mut() {
            overlay.reset(time);
        }
    }
}

impl fmt::Debug for MegaRomDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MegaRomDevice")
            .field("name", &self.name)
            .field("mapper", &self.mapper_type())
            .field("storage", &self.storage)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::CACHE_LINE_SIZE;
    use crate::invalidate::{InvalidatedRange, InvalidationLog};
    use std::rc::Rc;

    /// Image of `banks` 8KB banks, every byte holding its bank number
    fn numbered_image(banks: usize) -> RomImage {
        let mut data = Vec::with_capacity(banks * 0x2000);
        for bank in 0..banks {
            data.extend(std::iter::repeat(bank as u8).take(0x2000));
        }
        RomImage::from_bytes(&data, 0, &[]).expect("image")
    }

    fn cartridge(banks: usize, ty: MapperType) -> (MegaRomDevice, Rc<InvalidationLog>) {
        let log = InvalidationLog::new();
        let rom = MegaRomDevice::new("cart", numbered_image(banks), ty, log.clone());
        (rom, log)
    }

    fn read(rom: &mut MegaRomDevice, addr: u16) -> u8 {
        rom.read_byte(addr, EmuTime::ZERO)
    }

    fn write(rom: &mut MegaRomDevice, addr: u16, value: u8) {
        rom.write_byte(addr, value, EmuTime::ZERO)
    }

    #[test]
    fn rom_image_skips_header_and_applies_patches() {
        let bytes = [0xAA, 0xBB, 1, 2, 3, 4];
        let patches = [
            RomPatch { offset: 1, value: 0x20 },
            RomPatch { offset: 99, value: 0x30 },
        ];
        let image = RomImage::from_bytes(&bytes, 2, &patches).expect("image");
        assert_eq!(image.as_bytes(), &[1, 0x20, 3, 4]);
    }

    #[test]
    fn rom_image_rejects_bad_headers() {
        assert!(matches!(
            RomImage::from_bytes(&[1, 2], 3, &[]),
            Err(RomError::HeaderTooLarge { skip: 3, len: 2 })
        ));
        assert!(matches!(RomImage::from_bytes(&[1, 2], 2, &[]), Err(RomError::Empty)));
    }

    #[test]
    fn patch_parsing() {
        assert_eq!(
            "0x10=0xC9".parse::<RomPatch>().expect("patch"),
            RomPatch { offset: 0x10, value: 0xC9 }
        );
        assert_eq!(
            "16=201".parse::<RomPatch>().expect("patch"),
            RomPatch { offset: 16, value: 201 }
        );
        assert!("16".parse::<RomPatch>().is_err());
        assert!("16=256".parse::<RomPatch>().is_err());
    }

    #[test]
    fn konami_bank_switch_and_reset_roundtrip() {
        // 256KB image: 32 banks
        let (mut rom, _log) = cartridge(32, MapperType::Konami4);
        write(&mut rom, 0x6000, 0x05);
        assert_eq!(read(&mut rom, 0x6000), rom.storage.as_slice()[0x05 * 0x2000]);
        assert_eq!(read(&mut rom, 0x6000), 5);

        rom.reset(EmuTime::ZERO);
        assert_eq!(read(&mut rom, 0x6000), rom.storage.as_slice()[0]);
    }

    #[test]
    fn reset_restores_default_mapping_for_every_family() {
        for ty in MapperType::ALL {
            let (mut rom, _log) = cartridge(16, ty);
            let initial = *rom.state();
            for addr in [0x5000u16, 0x6000, 0x6800, 0x7000, 0x7800, 0x8000, 0x9000, 0xA000, 0xB000] {
                write(&mut rom, addr, 0x0B);
            }
            rom.reset(EmuTime::ZERO);
            assert_eq!(*rom.state(), initial, "{}", ty);
        }
    }

    #[test]
    fn mirroring_differs_between_konami_families() {
        let (mut konami, _) = cartridge(16, MapperType::Konami4);
        let (mut scc, _) = cartridge(16, MapperType::Konami5);

        write(&mut konami, 0x6000, 0x07);
        write(&mut scc, 0x7000, 0x07);
        assert_eq!(read(&mut konami, 0x6000), 7);
        assert_eq!(read(&mut scc, 0x6000), 7);

        // 0x4000-0x7FFF shows at 0x0000 on Konami, at 0xC000 with SCC
        assert_eq!(read(&mut konami, 0x2000), 7);
        assert_ne!(read(&mut konami, 0xE000), 7);
        assert_eq!(read(&mut scc, 0xE000), 7);
        assert_ne!(read(&mut scc, 0x2000), 7);

        // 0x8000-0xBFFF shows at 0xC000 on Konami, at 0x0000 with SCC
        write(&mut konami, 0x8000, 0x09);
        write(&mut scc, 0x9000, 0x09);
        assert_eq!(read(&mut konami, 0xC000), 9);
        assert_eq!(read(&mut scc, 0x0000), 9);
    }

    #[test]
    fn ascii_cartridges_leave_mirrors_unmapped() {
        let (mut rom, _) = cartridge(16, MapperType::Ascii8k);
        assert_eq!(read(&mut rom, 0x0000), 0xFF);
        assert_eq!(read(&mut rom, 0xFFFF), 0xFF);
        assert_eq!(rom.read_cache_line(0xC000).map(|l| l[0]), Some(0xFF));
    }

    #[test]
    fn invalidates_only_changed_pages() {
        let (mut rom, log) = cartridge(32, MapperType::Konami4);
        write(&mut rom, 0x8000, 0x03);
        assert_eq!(
            log.drain(),
            vec![
                InvalidatedRange { start: 0x8000, num_lines: 32 },
                InvalidatedRange { start: 0xC000, num_lines: 32 },
            ]
        );

        // same bank again: nothing changes, nothing invalidated
        write(&mut rom, 0x8000, 0x03);
        assert!(log.is_empty());

        // a write the mapper does not decode
        write(&mut rom, 0x4000, 0x03);
        assert!(log.is_empty());
    }

    #[test]
    fn small_images_wrap_around() {
        // 4 banks: bank 5 is bank 1
        let (mut rom, _) = cartridge(4, MapperType::Ascii8k);
        write(&mut rom, 0x6000, 0x05);
        assert_eq!(read(&mut rom, 0x4000), 1);
    }

    #[test]
    fn missing_banks_read_as_open_bus() {
        // 3 banks, mask 3: bank 3 is not populated
        let (mut rom, _) = cartridge(3, MapperType::Ascii8k);
        write(&mut rom, 0x6800, 0x03);
        assert_eq!(read(&mut rom, 0x6000), 0xFF);
        assert_eq!(rom.read_cache_line(0x6000).map(|l| l[0]), Some(0xFF));
    }

    #[test]
    fn scc_overlay_redirects_and_bypasses_the_cache() {
        let (mut rom, log) = cartridge(16, MapperType::Konami5);
        write(&mut rom, 0x9000, 0x02);
        log.drain();
        assert!(rom.read_cache_line(0x9800).is_some());

        write(&mut rom, 0x9000, 0x3F);
        assert!(rom.scc_active());
        assert!(log.entries().contains(&InvalidatedRange { start: 0x9800, num_lines: 8 }));

        // the window is no longer cacheable, the rest of the page still is
        for start in (0x9800..0xA000u32).step_by(CACHE_LINE_SIZE) {
            assert!(rom.read_cache_line(start as u16).is_none(), "line ${:04X}", start);
        }
        assert!(rom.read_cache_line(0x9700).is_some());

        // reads and writes now reach the SCC, not the ROM
        write(&mut rom, 0x9800, 0x80);
        assert_eq!(read(&mut rom, 0x9800), 0x80);
        assert_eq!(rom.peek_byte(0x9800), 0x80);
        assert_ne!(read(&mut rom, 0x9880), rom.storage.read(0x3F & 0x0F, 0x1880).unwrap_or(0));
        assert_eq!(rom.bank_at(0x9000), Some(0x3F & 0x0F));

        // disabling hands the window back to ROM
        write(&mut rom, 0x9000, 0x00);
        assert!(!rom.scc_active());
        assert_eq!(read(&mut rom, 0x9800), 0);
    }

    #[test]
    fn generic_8k_scc_toggle() {
        let (mut rom, _) = cartridge(64, MapperType::Generic8k);
        write(&mut rom, 0x8000, 0x3F);
        assert!(rom.scc_active());
        write(&mut rom, 0x9810, 0x55);
        assert_eq!(read(&mut rom, 0x9810), 0x55);
        // a write inside the active window does not switch banks
        assert_eq!(rom.bank_at(0x8000), Some(0x3F));
    }

    #[test]
    fn cartridges_without_scc_ignore_the_enable_value() {
        let (mut rom, _) = cartridge(64, MapperType::Ascii8k);
        write(&mut rom, 0x7000, 0x3F);
        assert!(!rom.scc_active());
        assert_eq!(read(&mut rom, 0x9800), 0x3F);
        assert!(rom.read_cache_line(0x9800).is_some());
    }

    #[test]
    fn cache_lines_match_reads_and_no_write_lines() {
        for ty in MapperType::ALL {
            let (mut rom, _) = cartridge(8, ty);
            write(&mut rom, 0x6000, 0x02);
            write(&mut rom, 0x7000, 0x05);
            assert!(rom.write_cache_line(0x4000).is_none());
            for start in (0u32..0x10000).step_by(CACHE_LINE_SIZE * 4) {
                let start = start as u16;
                let Some(line) = rom.read_cache_line(start).copied() else {
                    continue;
                };
                for (i, &byte) in line.iter().enumerate() {
                    let addr = start + i as u16;
                    assert_eq!(byte, read(&mut rom, addr), "{} at ${:04X}", ty, addr);
                }
            }
        }
    }

    #[test]
    fn peek_has_no_side_effects() {
        let (mut rom, log) = cartridge(16, MapperType::Generic8k);
        let before = *rom.state();
        for addr in [0x4000u16, 0x6000, 0x9800, 0xB000] {
            let _ = rom.peek_byte(addr);
        }
        assert_eq!(*rom.state(), before);
        assert!(log.is_empty());
        assert_eq!(rom.peek_byte(0x6000), read(&mut rom, 0x6000));
    }
}
