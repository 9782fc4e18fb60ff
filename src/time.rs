//! Emulated time
//!
//! The memory core never advances time itself. It only threads the value the
//! CPU loop hands it through to devices that care (the SCC register window).

use std::fmt;
use std::ops::Add;

/// Opaque, monotonically non-decreasing emulated time in master clock ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EmuTime(u64);

impl EmuTime {
    /// The moment the machine is powered on
    pub const ZERO: EmuTime = EmuTime(0);

    /// Create a time value from a raw tick count
    pub const fn from_ticks(ticks: u64) -> Self {
        EmuTime(ticks)
    }

    /// Raw tick count
    pub const fn ticks(self) -> u64 {
        self.0
    }
}

impl Add<u64> for EmuTime {
    type Output = EmuTime;

    fn add(self, ticks: u64) -> EmuTime {
        EmuTime(self.0.saturating_add(ticks))
    }
}

impl fmt::Display for EmuTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}t", self.0)
    }
}
