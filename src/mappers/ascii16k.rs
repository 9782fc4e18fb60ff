//! ASCII 16KB mapper
//!
//! Used by Xevious, Fantasy Zone 2, Androgynus, Gall Force...
//!
//! Two 2KB register windows select the 16KB bank shown in each half of the
//! cartridge area:
//! - 0x6000 - 0x67FF: window 0x4000 - 0x7FFF
//! - 0x7000 - 0x77FF: window 0x8000 - 0xBFFF
//!
//! The written value goes through the same round-to-even arithmetic as the
//! generic 16KB mapper. Nothing is mapped outside 0x4000-0xBFFF.

use log::debug;

use crate::util::{format_addr, format_byte};

use super::{even_bank, Mapper, MapperState, MapperType, PageMirroring};

pub struct Ascii16k {
    /// Mask applied to the written bank number
    bank_mask: u32,
}

impl Ascii16k {
    /// Create a new Ascii16k instance
    pub fn new(bank_mask: u32) -> Self {
        Ascii16k { bank_mask }
    }
}

impl Mapper for Ascii16k {
    fn mapper_type(&self) -> MapperType {
        MapperType::Ascii16k
    }

    fn mirroring(&self) -> PageMirroring {
        PageMirroring::None
    }

    fn bank_mask(&self) -> u32 {
        self.bank_mask
    }

    fn on_write(&self, state: &MapperState, addr: u16, value: u8) -> MapperState {
        let mut next = *state;
        if !(0x6000..0x7800).contains(&addr) || addr & 0x0800 != 0 {
            return next;
        }

        let window = ((addr >> 12) & 1) as usize;
        let bank = even_bank(value, self.bank_mask);
        let page = 2 + 2 * window;
        next.select(page, bank, self.mirroring());
        next.select(page + 1, (bank + 1) & self.bank_mask, self.mirroring());
        debug!(
            "Ascii16k: window {} <- banks {}/{} ({} = {})",
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
    fn register_windows() {
        let mapper = Ascii16k::new(0x1F);
        let state = mapper.reset_state();
        let low = mapper.on_write(&state, 0x6000, 3);
        assert_eq!((low.bank(2), low.bank(3)), (Some(2), Some(3)));
        let high = mapper.on_write(&state, 0x77FF, 6);
        assert_eq!((high.bank(4), high.bank(5)), (Some(4), Some(5)));
        for addr in [0x5FFFu16, 0x6800, 0x6FFF, 0x7800, 0x8000] {
            assert_eq!(mapper.on_write(&state, addr, 6), state, "write at ${:04X}", addr);
        }
    }

    #[test]
    fn round_to_even_arithmetic() {
        let mapper = Ascii16k::new(0x1F);
        let next = mapper.on_write(&mapper.reset_state(), 0x6000, 1);
        assert_eq!((next.bank(2), next.bank(3)), (Some(0), Some(1)));
        assert_eq!(next.bank(0), None);
    }
}
