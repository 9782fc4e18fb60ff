//! Mapper implementations for MSX mega-ROM cartridges
//!
//! A mega-ROM cartridge is larger than the 32KB it can show at once. Writes
//! to trigger addresses select which 8KB bank of the image is visible in each
//! 8KB page of the slot. Every cartridge family decodes those writes
//! differently; this module provides one state machine per family.
//!
//! A mapper is a pure transition function: given the current [`MapperState`]
//! and a write `(address, value)` it produces the next state. The owning
//! device diffs the two states to know which pages need invalidating.
//!
//! Memory map of a cartridge slot (8 pages of 8KB):
//! - 0x0000 - 0x3FFF: pages 0-1, mirrors for some families
//! - 0x4000 - 0xBFFF: pages 2-5, the switchable area
//! - 0xC000 - 0xFFFF: pages 6-7, mirrors for some families

mod ascii16k;
mod ascii8k;
pub mod detect;
mod generic16k;
mod generic8k;
mod konami4;
mod konami5;

pub use ascii16k::Ascii16k;
pub use ascii8k::Ascii8k;
pub use detect::guess_mapper_type;
pub use generic16k::Generic16k;
pub use generic8k::Generic8k;
pub use konami4::Konami4;
pub use konami5::Konami5;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::memory::MemoryError;

/// log2 of the page / bank size handled by every mapper (8KB)
pub const PAGE_BITS: u32 = 13;

/// Size of one page and of one bank
pub const PAGE_SIZE: u32 = 1 << PAGE_BITS;

/// Number of 8KB pages in the 64KB address space
pub const NUM_PAGES: usize = 8;

/// Page holding 0x9800 - 0x9FFF, where the SCC window lives
pub const SCC_PAGE: usize = 4;

/// Sound overlay window
pub const SCC_WINDOW_START: u16 = 0x9800;
pub const SCC_WINDOW_SIZE: u32 = 0x0800;

/// Check whether `addr` falls inside the sound overlay window
#[inline]
pub fn in_scc_window(addr: u16) -> bool {
    (addr as u32).wrapping_sub(SCC_WINDOW_START as u32) < SCC_WINDOW_SIZE
}

/// Page index for an address
#[inline]
pub fn page_of(addr: u16) -> usize {
    (addr >> PAGE_BITS) as usize
}

/// Start address of a page
#[inline]
pub fn page_start(page: usize) -> u16 {
    (page << PAGE_BITS) as u16
}

/// Known cartridge families
///
/// The numeric ids are stable; auto-detection breaks ties toward the lowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapperType {
    /// 8KB pages, bank selected by writing anywhere in the page, SCC
    Generic8k = 0,
    /// 16KB windows, bank selected by writing anywhere in the window
    Generic16k = 1,
    /// Konami with SCC: triggers at 0x5000/0x7000/0x9000/0xB000
    Konami5 = 2,
    /// Konami without SCC: fixed page at 0x4000, triggers 0x6000-0xBFFF
    Konami4 = 3,
    /// ASCII 8KB: triggers at 0x6000/0x6800/0x7000/0x7800
    Ascii8k = 4,
    /// ASCII 16KB: triggers at 0x6000/0x7000
    Ascii16k = 5,
}

impl MapperType {
    /// All types, in id order
    pub const ALL: [MapperType; 6] = [
        MapperType::Generic8k,
        MapperType::Generic16k,
        MapperType::Konami5,
        MapperType::Konami4,
        MapperType::Ascii8k,
        MapperType::Ascii16k,
    ];

    /// Stable numeric id
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Configuration name
    pub fn as_str(self) -> &'static str {
        match self {
            MapperType::Generic8k => "generic8k",
            MapperType::Generic16k => "generic16k",
            MapperType::Konami5 => "konami5",
            MapperType::Konami4 => "konami4",
            MapperType::Ascii8k => "ascii8k",
            MapperType::Ascii16k => "ascii16k",
        }
    }

    /// Whether cartridges of this family carry a sound chip window
    pub fn has_scc(self) -> bool {
        matches!(self, MapperType::Generic8k | MapperType::Konami5)
    }
}

impl TryFrom<u8> for MapperType {
    type Error = MemoryError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        MapperType::ALL
            .get(id as usize)
            .copied()
            .ok_or_else(|| MemoryError::UnknownMapperType(id.to_string()))
    }
}

impl FromStr for MapperType {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        match lower.as_str() {
            "generic8k" | "8k" => Ok(MapperType::Generic8k),
            "generic16k" | "16k" => Ok(MapperType::Generic16k),
            "konami5" | "konamiscc" | "scc" => Ok(MapperType::Konami5),
            "konami4" | "konami" => Ok(MapperType::Konami4),
            "ascii8k" | "ascii8" => Ok(MapperType::Ascii8k),
            "ascii16k" | "ascii16" => Ok(MapperType::Ascii16k),
            _ => match lower.parse::<u8>() {
                Ok(id) => MapperType::try_from(id),
                Err(_) => Err(MemoryError::UnknownMapperType(s.to_string())),
            },
        }
    }
}

impl fmt::Display for MapperType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How pages outside 0x4000-0xBFFF follow the switchable area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMirroring {
    /// 0x0000-0x3FFF and 0xC000-0xFFFF are unmapped
    None,
    /// Page `p` also shows at `p ^ 4`: 0x4000 -> 0xC000, 0x8000 -> 0x0000
    Xor8000,
    /// 0x4000-0x7FFF shows at 0x0000, 0x8000-0xBFFF shows at 0xC000
    Konami4,
}

impl PageMirroring {
    /// Page that mirrors switchable page `page` (2..=5)
    #[inline]
    pub fn mirror_of(self, page: usize) -> Option<usize> {
        match self {
            PageMirroring::None => None,
            PageMirroring::Xor8000 => Some(page ^ 4),
            PageMirroring::Konami4 => match page {
                2 | 3 => Some(page - 2),
                4 | 5 => Some(page + 2),
                _ => None,
            },
        }
    }
}

/// Which bank is visible in which page, plus overlay state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapperState {
    /// Bank index per page; `None` reads as open bus
    pages: [Option<u32>; NUM_PAGES],

    /// Sound overlay window enabled
    scc_enabled: bool,
}

impl MapperState {
    /// Nothing mapped, overlay off
    pub const fn unmapped() -> Self {
        MapperState {
            pages: [None; NUM_PAGES],
            scc_enabled: false,
        }
    }

    /// Bank visible in `page`
    #[inline]
    pub fn bank(&self, page: usize) -> Option<u32> {
        self.pages[page]
    }

    /// All pages
    pub fn pages(&self) -> &[Option<u32>; NUM_PAGES] {
        &self.pages
    }

    #[inline]
    pub fn scc_enabled(&self) -> bool {
        self.scc_enabled
    }

    pub fn set_scc_enabled(&mut self, enabled: bool) {
        self.scc_enabled = enabled;
    }

    /// Map `bank` into switchable `page` and into its mirror, if any
    pub fn select(&mut self, page: usize, bank: u32, mirroring: PageMirroring) {
        self.pages[page] = Some(bank);
        if let Some(mirror) = mirroring.mirror_of(page) {
            self.pages[mirror] = Some(bank);
        }
    }

    /// Pages whose bank differs between `self` and `other`
    pub fn changed_pages(&self, other: &MapperState) -> impl Iterator<Item = usize> + '_ {
        let other = other.pages;
        (0..NUM_PAGES).filter(move |&page| self.pages[page] != other[page])
    }
}

impl Default for MapperState {
    fn default() -> Self {
        Self::unmapped()
    }
}

/// Trait for MSX cartridge bank-switching state machines
pub trait Mapper {
    /// Family implemented by this mapper
    fn mapper_type(&self) -> MapperType;

    /// Mirroring of the switchable pages
    fn mirroring(&self) -> PageMirroring;

    /// Mask applied to selected bank numbers
    fn bank_mask(&self) -> u32;

    /// Deterministic power-on mapping
    fn reset_state(&self) -> MapperState {
        let mut state = MapperState::unmapped();
        for page in 2..6 {
            state.select(page, (page as u32 - 2) & self.bank_mask(), self.mirroring());
        }
        state
    }

    /// Next state after the CPU writes `value` to `addr`.
    ///
    /// Writes the family does not decode return `state` unchanged.
    fn on_write(&self, state: &MapperState, addr: u16, value: u8) -> MapperState;
}

/// Round-to-even bank selection shared by the 16KB families.
///
/// This is the hardware's arithmetic, not `value & !1`; the two differ.
#[inline]
pub(crate) fn even_bank(value: u8, mask: u32) -> u32 {
    let value = value as u32;
    value & (2 * value) & mask
}

/// Create a mapper for `mapper_type` over an image whose bank mask is `bank_mask`
pub fn create_mapper(mapper_type: MapperType, bank_mask: u32) -> Box<dyn Mapper> {
    match mapper_type {
        MapperType::Generic8k => Box::new(Generic8k::new(bank_mask)),
        MapperType::Generic16k => Box::new(Generic16k::new(bank_mask)),
        MapperType::Konami5 => Box::new(Konami5::new(bank_mask)),
        MapperType::Konami4 => Box::new(Konami4::new(bank_mask)),
        MapperType::Ascii8k => Box::new(Ascii8k::new(bank_mask)),
        MapperType::Ascii16k => Box::new(Ascii16k::new(bank_mask)),
    }
}
