//! ASCII 8KB mapper
//!
//! Used by many Japan-only cartridges: Valis, Dragon Slayer, Outrun...
//!
//! Four 2KB register windows between 0x6000 and 0x7FFF each select the bank
//! of one 8KB page:
//! - 0x6000 - 0x67FF: page 0x4000
//! - 0x6800 - 0x6FFF: page 0x6000
//! - 0x7000 - 0x77FF: page 0x8000
//! - 0x7800 - 0x7FFF: page 0xA000
//!
//! Nothing is mapped outside 0x4000-0xBFFF.

use log::debug;

use crate::util::{format_addr, format_byte};

use super::{Mapper, MapperState, MapperType, PageMirroring};

pub struct Ascii8k {
    /// Mask applied to the written bank number
    bank_mask: u32,
}

impl Ascii8k {
    /// Create a new Ascii8k instance
    pub fn new(bank_mask: u32) -> Self {
        Ascii8k { bank_mask }
    }
}

impl Mapper for Ascii8k {
    fn mapper_type(&self) -> MapperType {
        MapperType::Ascii8k
    }

    fn mirroring(&self) -> PageMirroring {
        PageMirroring::None
    }

    fn bank_mask(&self) -> u32 {
        self.bank_mask
    }

    fn on_write(&self, state: &MapperState, addr: u16, value: u8) -> MapperState {
        let mut next = *state;
        if !(0x6000..0x8000).contains(&addr) {
            return next;
        }

        let page = 2 + ((addr >> 11) & 3) as usize;
        let bank = value as u32 & self.bank_mask;
        next.select(page, bank, self.mirroring());
        debug!("Ascii8k: page {} <- bank {} ({} = {})", page, bank, format_addr(addr), format_byte(value));
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_windows() {
        let mapper = Ascii8k::new(0xFF);
        let state = mapper.reset_state();
        for (addr, page) in [(0x6000u16, 2usize), (0x67FF, 2), (0x6800, 3), (0x7000, 4), (0x7FFF, 5)] {
            assert_eq!(mapper.on_write(&state, addr, 0x42).bank(page), Some(0x42));
        }
        for addr in [0x4000u16, 0x5FFF, 0x8000, 0xB000] {
            assert_eq!(mapper.on_write(&state, addr, 0x42), state);
        }
    }

    #[test]
    fn no_mirrors_and_no_overlay() {
        let mapper = Ascii8k::new(0xFF);
        let state = mapper.on_write(&mapper.reset_state(), 0x7000, 0x3F);
        assert_eq!(state.bank(0), None);
        assert_eq!(state.bank(6), None);
        assert!(!state.scc_enabled());
    }
}
