//! Konami mapper without SCC (sometimes called Konami4)
//!
//! Used by Nemesis, Penguin Adventure, Usas, Metal Gear, The Maze of Galious...
//!
//! The page at 0x4000 is hard-wired; the three pages from 0x6000 to 0xBFFF
//! take their bank from any write inside them.
//!
//! Memory map:
//! - 0x4000 - 0x5FFF: fixed page
//! - 0x6000 - 0xBFFF: three switchable 8KB pages
//! - 0x0000 - 0x3FFF / 0xC000 - 0xFFFF: mirrors of 0x4000 / 0x8000

use log::debug;

use crate::util::{format_addr, format_byte};

use super::{page_of, Mapper, MapperState, MapperType, PageMirroring};

pub struct Konami4 {
    /// Mask applied to the written bank number
    bank_mask: u32,
}

impl Konami4 {
    /// Create a new Konami4 instance
    pub fn new(bank_mask: u32) -> Self {
        Konami4 { bank_mask }
    }
}

impl Mapper for Konami4 {
    fn mapper_type(&self) -> MapperType {
        MapperType::Konami4
    }

    fn mirroring(&self) -> PageMirroring {
        PageMirroring::Konami4
    }

    fn bank_mask(&self) -> u32 {
        self.bank_mask
    }

    /// Every page powers up on bank 0
    fn reset_state(&self) -> MapperState {
        let mut state = MapperState::unmapped();
        for page in 2..6 {
            state.select(page, 0, self.mirroring());
        }
        state
    }

    fn on_write(&self, state: &MapperState, addr: u16, value: u8) -> MapperState {
        let mut next = *state;
        if !(0x6000..0xC000).contains(&addr) {
            return next;
        }

        let page = page_of(addr);
        let bank = value as u32 & self.bank_mask;
        next.select(page, bank, self.mirroring());
        debug!("Konami4: page {} <- bank {} ({} = {})", page, bank, format_addr(addr), format_byte(value));
        next
    }
}
