//! Generic 8KB mapper
//!
//! Each 8KB page of 0x4000-0xBFFF selects its own bank: a write anywhere in
//! the page picks the bank for that page. Writing to the 0x8000-0x9FFF page
//! also switches the SCC window on or off.
//!
//! Memory map:
//! - 0x4000 - 0xBFFF: four switchable 8KB pages
//! - 0xC000 - 0xFFFF / 0x0000 - 0x3FFF: mirrors of 0x4000 / 0x8000
//! - 0x9800 - 0x9FFF: SCC registers while enabled

use log::debug;

use crate::util::{format_addr, format_byte};

use super::{page_of, Mapper, MapperState, MapperType, PageMirroring, SCC_PAGE};

pub struct Generic8k {
    /// Mask applied to the written bank number
    bank_mask: u32,
}

impl Generic8k {
    /// Create a new Generic8k instance
    pub fn new(bank_mask: u32) -> Self {
        Generic8k { bank_mask }
    }
}

impl Mapper for Generic8k {
    fn mapper_type(&self) -> MapperType {
        MapperType::Generic8k
    }

    fn mirroring(&self) -> PageMirroring {
        PageMirroring::Xor8000
    }

    fn bank_mask(&self) -> u32 {
        self.bank_mask
    }

    fn on_write(&self, state: &MapperState, addr: u16, value: u8) -> MapperState {
        let mut next = *state;
        if !(0x4000..0xC000).contains(&addr) {
            return next;
        }

        let page = page_of(addr);
        if page == SCC_PAGE {
            next.set_scc_enabled(value & 0x3F == 0x3F);
        }
        let bank = value as u32 & self.bank_mask;
        next.select(page, bank, self.mirroring());
        debug!("Generic8k: page {} <- bank {} ({} = {})", page, bank, format_addr(addr), format_byte(value));
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_write_in_a_page_selects_its_bank() {
        let mapper = Generic8k::new(0x1F);
        let state = mapper.reset_state();
        for (addr, page) in [(0x4000u16, 2usize), (0x7FFF, 3), (0x8123, 4), (0xBFFF, 5)] {
            let next = mapper.on_write(&state, addr, 0x11);
            assert_eq!(next.bank(page), Some(0x11), "write at ${:04X}", addr);
        }
    }

    #[test]
    fn bank_is_masked() {
        let mapper = Generic8k::new(0x07);
        let next = mapper.on_write(&mapper.reset_state(), 0x6000, 0xFD);
        assert_eq!(next.bank(3), Some(5));
    }

    #[test]
    fn outside_the_switchable_area_is_ignored() {
        let mapper = Generic8k::new(0x1F);
        let state = mapper.reset_state();
        assert_eq!(mapper.on_write(&state, 0x3FFF, 9), state);
        assert_eq!(mapper.on_write(&state, 0xC000, 9), state);
    }

    #[test]
    fn mirrors_follow_the_xor_8000_rule() {
        let mapper = Generic8k::new(0x1F);
        let state = mapper.on_write(&mapper.reset_state(), 0x4000, 7);
        assert_eq!(state.bank(6), Some(7));
        let state = mapper.on_write(&state, 0xA000, 9);
        assert_eq!(state.bank(1), Some(9));
    }

    #[test]
    fn scc_page_toggles_the_overlay() {
        let mapper = Generic8k::new(0x3F);
        let on = mapper.on_write(&mapper.reset_state(), 0x9000, 0x3F);
        assert!(on.scc_enabled());
        assert_eq!(on.bank(4), Some(0x3F));
        let still_on = mapper.on_write(&on, 0x8000, 0xFF);
        assert!(still_on.scc_enabled());
        let off = mapper.on_write(&still_on, 0x8000, 0x02);
        assert!(!off.scc_enabled());
        // other pages leave the overlay alone
        assert!(mapper.on_write(&on, 0x6000, 0x00).scc_enabled());
    }
}
