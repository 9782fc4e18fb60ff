//! Generic 16KB mapper
//!
//! 0x4000-0xBFFF is split into two 16KB windows; a write anywhere in a window
//! selects the bank pair shown there. The written value is rounded down to
//! an even 8KB bank with the hardware's `value & 2*value` arithmetic.
//!
//! Memory map:
//! - 0x4000 - 0x7FFF: switchable 16KB window 0
//! - 0x8000 - 0xBFFF: switchable 16KB window 1
//! - 0xC000 - 0xFFFF / 0x0000 - 0x3FFF: mirrors of window 0 / window 1

use log::debug;

use crate::util::{format_addr, format_byte};

use super::{even_bank, Mapper, MapperState, MapperType, PageMirroring};

pub struct Generic16k {
    /// Mask applied to the written bank number
    bank_mask: u32,
}

impl Generic16k {
    /// Create a new Generic16k instance
    pub fn new(bank_mask: u32) -> Self {
        Generic16k { bank_mask }
    }
}

impl Mapper for Generic16k {
    fn mapper_type(&self) -> MapperType {
        MapperType::Generic16k
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

        let window = ((addr >> 15) & 1) as usize;
        let bank = even_bank(value, self.bank_mask);
        let page = 2 + 2 * window;
        next.select(page, bank, self.mirroring());
        next.select(page + 1, (bank + 1) & self.bank_mask, self.mirroring());
        debug!(
            "Generic16k: window {} <- banks {}/{} ({} = {})",
            window,
            bank,
            (bank + 1) & self.bank_mask,
            format_addr(addr),
            format_byte(value)
        );
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_decoding() {
        let mapper = Generic16k::new(0x1F);
        let state = mapper.reset_state();
        let low = mapper.on_write(&state, 0x7FFF, 3);
        assert_eq!((low.bank(2), low.bank(3)), (Some(2), Some(3)));
        assert_eq!((low.bank(4), low.bank(5)), (Some(2), Some(3)));

        let high = mapper.on_write(&state, 0x8000, 6);
        assert_eq!((high.bank(4), high.bank(5)), (Some(4), Some(5)));
        assert_eq!((high.bank(0), high.bank(1)), (Some(4), Some(5)));
    }

    #[test]
    fn odd_values_use_the_and_doubled_rule() {
        let mapper = Generic16k::new(0x1F);
        let state = mapper.reset_state();
        // 5 & 10 == 0, not 4
        let next = mapper.on_write(&state, 0x4000, 5);
        assert_eq!((next.bank(2), next.bank(3)), (Some(0), Some(1)));
        // 7 & 14 == 6
        let next = mapper.on_write(&state, 0x4000, 7);
        assert_eq!((next.bank(2), next.bank(3)), (Some(6), Some(7)));
    }

    #[test]
    fn mirror_pages_follow_window_zero() {
        let mapper = Generic16k::new(0x0F);
        let next = mapper.on_write(&mapper.reset_state(), 0x5000, 0x0E);
        assert_eq!(next.bank(6), Some(0x0C));
        assert_eq!(next.bank(7), Some(0x0D));
    }
}
