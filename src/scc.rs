//! SCC register window
//!
//! Konami's SCC sound chip appears inside the cartridge's ROM area at
//! 0x9800-0x9FFF while the mapper has it enabled. Sound synthesis is not part
//! of the memory core; this device only decodes the register file so reads
//! and writes land somewhere meaningful and time is forwarded to it.
//!
//! Register map (repeats every 256 bytes of the window):
//! - 0x00 - 0x7F: waveform RAM, channels 1-4 (channel 5 shares channel 4)
//! - 0x80 - 0x89: frequency, channels 1-5 (write-only)
//! - 0x8A - 0x8E: volume, channels 1-5 (write-only)
//! - 0x8F:        channel enable mask (write-only)
//! - 0x90 - 0x9F: mirror of 0x80 - 0x8F
//! - 0xA0 - 0xDF: unmapped
//! - 0xE0 - 0xFF: deformation register (write-only)

use log::trace;

use crate::device::{MemoryDevice, UNMAPPED_BYTE};
use crate::time::EmuTime;

/// Bytes of waveform RAM
const WAVE_RAM_SIZE: usize = 0x80;

/// Number of sound channels
pub const NUM_CHANNELS: usize = 5;

/// SCC register file
pub struct SccRegisters {
    /// 32 signed samples per channel, channels 1-4
    wave_ram: [u8; WAVE_RAM_SIZE],

    /// 12-bit period per channel
    frequency: [u16; NUM_CHANNELS],

    /// 4-bit volume per channel
    volume: [u8; NUM_CHANNELS],

    /// One bit per channel
    channel_enable: u8,

    deformation: u8,

    /// Time of the most recent register write
    last_write: Option<EmuTime>,
}

impl SccRegisters {
    pub fn new() -> Self {
        SccRegisters {
            wave_ram: [0; WAVE_RAM_SIZE],
            frequency: [0; NUM_CHANNELS],
            volume: [0; NUM_CHANNELS],
            channel_enable: 0,
            deformation: 0,
            last_write: None,
        }
    }

    /// Period register of `channel`
    pub fn frequency(&self, channel: usize) -> u16 {
        self.frequency[channel]
    }

    /// Volume of `channel`
    pub fn volume(&self, channel: usize) -> u8 {
        self.volume[channel]
    }

    /// Channel enable mask
    pub fn channel_enable(&self) -> u8 {
        self.channel_enable
    }

    /// Deformation register
    pub fn deformation(&self) -> u8 {
        self.deformation
    }

    /// Waveform RAM contents
    pub fn wave_ram(&self) -> &[u8] {
        &self.wave_ram
    }

    /// When the register file was last written
    pub fn last_write(&self) -> Option<EmuTime> {
        self.last_write
    }

    fn write_register(&mut self, reg: u8, value: u8) {
        match reg {
            0x00..=0x7F => self.wave_ram[reg as usize] = value,
            0x80..=0x9F => match reg & 0x0F {
                r @ 0x0..=0x9 => {
                    let channel = (r >> 1) as usize;
                    let period = &mut self.frequency[channel];
                    *period = if r & 1 == 0 {
                        (*period & 0xF00) | value as u16
                    } else {
                        (*period & 0x0FF) | ((value as u16 & 0x0F) << 8)
                    };
                }
                r @ 0xA..=0xE => self.volume[(r - 0xA) as usize] = value & 0x0F,
                _ => self.channel_enable = value & 0x1F,
            },
            0xA0..=0xDF => {}
            _ => self.deformation = value,
        }
    }
}

impl Default for SccRegisters {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDevice for SccRegisters {
    fn name(&self) -> &str {
        "SCC"
    }

    fn read_byte(&mut self, addr: u16, _time: EmuTime) -> u8 {
        self.peek_byte(addr)
    }

    fn write_byte(&mut self, addr: u16, value: u8, time: EmuTime) {
        let reg = (addr & 0xFF) as u8;
        trace!("SCC write reg ${:02X} = ${:02X} at {}", reg, value, time);
        self.write_register(reg, value);
        self.last_write = Some(time);
    }

    /// Only waveform RAM can be read back
    fn peek_byte(&self, addr: u16) -> u8 {
        let reg = (addr & 0xFF) as usize;
        if reg < WAVE_RAM_SIZE {
            self.wave_ram[reg]
        } else {
            UNMAPPED_BYTE
        }
    }

    fn reset(&mut self, _time: EmuTime) {
        *self = SccRegisters::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wave_ram_reads_back_and_repeats_every_256_bytes() {
        let mut scc = SccRegisters::new();
        scc.write_byte(0x9810, 0xA5, EmuTime::from_ticks(10));
        assert_eq!(scc.read_byte(0x9810, EmuTime::ZERO), 0xA5);
        assert_eq!(scc.read_byte(0x9F10, EmuTime::ZERO), 0xA5);
        assert_eq!(scc.last_write(), Some(EmuTime::from_ticks(10)));
    }

    #[test]
    fn control_registers_are_write_only() {
        let mut scc = SccRegisters::new();
        scc.write_byte(0x9880, 0x34, EmuTime::ZERO);
        scc.write_byte(0x9881, 0x12, EmuTime::ZERO);
        scc.write_byte(0x988A, 0x1F, EmuTime::ZERO);
        scc.write_byte(0x989F, 0x3F, EmuTime::ZERO);
        assert_eq!(scc.frequency(0), 0x234);
        assert_eq!(scc.volume(0), 0x0F);
        assert_eq!(scc.channel_enable(), 0x1F);
        assert_eq!(scc.read_byte(0x9880, EmuTime::ZERO), 0xFF);
        assert_eq!(scc.peek_byte(0x988F), 0xFF);
    }

    #[test]
    fn deformation_and_reset() {
        let mut scc = SccRegisters::new();
        scc.write_byte(0x98E0, 0x20, EmuTime::ZERO);
        scc.write_byte(0x9800, 0x01, EmuTime::ZERO);
        assert_eq!(scc.deformation(), 0x20);
        scc.reset(EmuTime::from_ticks(5));
        assert_eq!(scc.deformation(), 0);
        assert_eq!(scc.peek_byte(0x9800), 0);
        assert!(scc.last_write().is_none());
    }

    #[test]
    fn no_cache_lines() {
        let mut scc = SccRegisters::new();
        assert!(scc.read_cache_line(0x9800).is_none());
        assert!(scc.write_cache_line(0x9800).is_none());
    }
}
