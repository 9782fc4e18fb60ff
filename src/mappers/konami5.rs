//! Konami mapper with SCC (sometimes called Konami5)
//!
//! Used by Nemesis 2, Nemesis 3, King's Valley 2, Space Manbow, Quarth...
//!
//! Only the first 2KB of every 8KB page decodes bank-select writes, at
//! 0x5000, 0x7000, 0x9000 and 0xB000. The 0x9000 register additionally
//! enables the SCC window when the low six bits are all set.
//!
//! Memory map:
//! - 0x4000 - 0xBFFF: four switchable 8KB pages
//! - 0xC000 - 0xFFFF / 0x0000 - 0x3FFF: mirrors of 0x4000 / 0x8000
//! - 0x9800 - 0x9FFF: SCC registers while enabled

use log::debug;

use crate::util::{format_addr, format_byte};

use super::{page_of, page_start, Mapper, MapperState, MapperType, PageMirroring, SCC_PAGE};

pub struct Konami5 {
    /// Mask applied to the written bank number
    bank_mask: u32,
}

impl Konami5 {
    /// Create a new Konami5 instance
    pub fn new(bank_mask: u32) -> Self {
        Konami5 { bank_mask }
    }
}

impl Mapper for Konami5 {
    fn mapper_type(&self) -> MapperType {
        MapperType::Konami5
    }

    fn mirroring(&self) -> PageMirroring {
        PageMirroring::Xor8000
    }

    fn bank_mask(&self) -> u32 {
        self.bank_mask
    }

    fn on_write(&self, state: &MapperState, addr: u16, value: u8) -> MapperState {
        let mut next = *state;
        if !(0x5000..0xC000).contains(&addr) {
            return next;
        }

        let page = page_of(addr);
        let offset = addr - page_start(page);
        if offset & 0x1800 != 0x1000 {
            return next;
        }

        if page == SCC_PAGE {
            next.set_scc_enabled(value & 0x3F == 0x3F);
        }
        let bank = value as u32 & self.bank_mask;
        next.select(page, bank, self.mirroring());
        debug!("Konami5: page {} <- bank {} ({} = {})", page, bank, format_addr(addr), format_byte(value));
        next
    }
}
