//! Mega-ROM mapper type detection
//!
//! Cartridge programs switch banks with the Z80 instruction `ld (nn),a`
//! (opcode 0x32) aimed at a mapper register. Counting how often each family's
//! register addresses show up as the operand of that instruction gives a good
//! guess of the mapper type when none is configured.

use log::debug;

use super::MapperType;
use crate::util::combine_bytes;

/// Z80 `ld (nn),a`
const LD_NN_A: u8 = 0x32;

/// Families voting for a register address.
///
/// Generic 8KB cartridges accept writes anywhere, so no address is evidence
/// for them; they only win when nothing else scores.
fn candidates(addr: u16) -> &'static [MapperType] {
    use MapperType::*;
    match addr {
        0x4000 | 0x8000 | 0xA000 => &[Konami4],
        0x5000 | 0x9000 | 0xB000 => &[Konami5],
        0x6000 => &[Konami4, Ascii8k, Ascii16k],
        0x6800 | 0x7800 => &[Ascii8k],
        0x7000 => &[Konami5, Ascii8k, Ascii16k],
        0x77FF => &[Ascii16k],
        _ => &[],
    }
}

/// Tally of `ld (nn),a` hits per mapper type, indexed by type id
pub fn score_mapper_types(rom: &[u8]) -> [u32; MapperType::ALL.len()] {
    let mut scores = [0u32; MapperType::ALL.len()];
    for window in rom.windows(3) {
        if window[0] != LD_NN_A {
            continue;
        }
        let addr = combine_bytes(window[1], window[2]);
        for ty in candidates(addr) {
            scores[ty.id() as usize] += 1;
        }
    }
    scores
}

/// Guess the mapper type of a mega-ROM image.
///
/// Never fails: the highest score wins, ties go to the lowest type id, and an
/// image with no evidence at all is treated as [`MapperType::Generic8k`].
/// ASCII 8KB shares most of its register addresses with other families, so
/// it loses one point before the comparison.
pub fn guess_mapper_type(rom: &[u8]) -> MapperType {
    let mut scores = score_mapper_types(rom);
    let ascii8 = MapperType::Ascii8k.id() as usize;
    scores[ascii8] = scores[ascii8].saturating_sub(1);

    let mut best = MapperType::Generic8k;
    for ty in MapperType::ALL {
        if scores[ty.id() as usize] > scores[best.id() as usize] {
            best = ty;
        }
    }
    debug!("Mapper scores {:?} -> {}", scores, best);
    best
}
