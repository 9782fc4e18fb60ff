//! Utility functions and helpers for the memory core
//!
//! This module contains formatting and parsing helpers shared by the
//! configuration layer and the command line front end.

use std::fmt::Write;

use crate::memory::ADDRESS_SPACE_SIZE;

/// Combine two 8-bit values into a 16-bit value (little-endian)
#[inline]
pub fn combine_bytes(low: u8, high: u8) -> u16 {
    u16::from_le_bytes([low, high])
}

/// Parse a number written as decimal, `0x`-prefixed hex, `$`-prefixed hex
/// or `h`-suffixed hex
pub fn parse_number(text: &str) -> Option<u32> {
    let text = text.trim();
    if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .or_else(|| text.strip_prefix('$'))
    {
        return u32::from_str_radix(hex, 16).ok();
    }
    if let Some(hex) = text.strip_suffix('h').or_else(|| text.strip_suffix('H')) {
        return u32::from_str_radix(hex, 16).ok();
    }
    text.parse().ok()
}

/// Parse a 16-bit address, see [`parse_number`]
pub fn parse_addr(text: &str) -> Option<u16> {
    parse_number(text).and_then(|value| u16::try_from(value).ok())
}

/// Parse a window size, which must be between 1 byte and the whole 64KB
pub fn parse_size(text: &str) -> Option<u32> {
    parse_number(text).filter(|size| (1..=ADDRESS_SPACE_SIZE).contains(size))
}

/// Hexdump of a memory region, one 16-byte row per line
pub fn hexdump(data: &[u8], start_addr: u16) -> String {
    let mut out = String::new();
    for (i, chunk) in data.chunks(16).enumerate() {
        let addr = start_addr.wrapping_add((i * 16) as u16);
        let _ = write!(out, "{:04X}: ", addr);

        for (j, byte) in chunk.iter().enumerate() {
            let _ = write!(out, "{:02X} ", byte);
            if j == 7 {
                out.push(' ');
            }
        }

        // Padding for incomplete lines
        for _ in chunk.len()..16 {
            out.push_str("   ");
        }
        if chunk.len() <= 8 {
            out.push(' ');
        }

        out.push_str(" |");
        for &byte in chunk {
            if (0x20..0x7F).contains(&byte) {
                out.push(byte as char);
            } else {
                out.push('.');
            }
        }
        out.push_str("|\n");
    }
    out
}

/// Format a 16-bit address as a hex string
pub fn format_addr(addr: u16) -> String {
    format!("${:04X}", addr)
}

/// Format an 8-bit value as a hex string
pub fn format_byte(value: u8) -> String {
    format!("${:02X}", value)
}
