//! Banked backing storage
//!
//! Owns one contiguous byte buffer (a ROM image or RAM) and slices it into
//! fixed-size banks. Bank indices are masked before use so that an image
//! smaller than the addressable bank space wraps around, the way a
//! cartridge with unconnected high address lines does.

/// Fixed-size banks over a single owned buffer
#[derive(Clone)]
pub struct BankedStorage {
    /// Backing bytes; never resized after construction
    buffer: Vec<u8>,

    /// log2 of the bank size
    bank_size_log2: u8,

    /// next_power_of_two(num_banks) - 1
    bank_mask: u32,
}

impl BankedStorage {
    /// Wrap `buffer` in banks of `1 << bank_size_log2` bytes.
    ///
    /// A trailing partial bank still counts as a bank; bytes beyond the end
    /// of the buffer read as absent.
    pub fn new(buffer: Vec<u8>, bank_size_log2: u8) -> Self {
        assert!(
            (1..=16).contains(&bank_size_log2),
            "bank size 2^{} outside the 64KB address space",
            bank_size_log2
        );
        let bank_size = 1usize << bank_size_log2;
        let num_banks = buffer.len().div_ceil(bank_size).max(1);
        let bank_mask = (num_banks.next_power_of_two() - 1) as u32;

        BankedStorage {
            buffer,
            bank_size_log2,
            bank_mask,
        }
    }

    /// Zero-filled storage of `size` bytes
    pub fn zeroed(size: usize, bank_size_log2: u8) -> Self {
        Self::new(vec![0; size], bank_size_log2)
    }

    /// Size of a bank in bytes
    #[inline]
    pub fn bank_size(&self) -> usize {
        1 << self.bank_size_log2
    }

    /// log2 of the bank size
    #[inline]
    pub fn bank_size_log2(&self) -> u8 {
        self.bank_size_log2
    }

    /// Mask applied to every requested bank index
    #[inline]
    pub fn bank_mask(&self) -> u32 {
        self.bank_mask
    }

    /// Number of (possibly partial) banks actually backed by the buffer
    #[inline]
    pub fn num_banks(&self) -> u32 {
        self.buffer.len().div_ceil(self.bank_size()) as u32
    }

    /// Total size of the backing buffer
    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// The whole backing buffer
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Byte offset of a (masked) bank inside the buffer
    #[inline]
    fn bank_offset(&self, bank: u32) -> usize {
        ((bank & self.bank_mask) as usize) << self.bank_size_log2
    }

    /// Get the bytes of bank `bank`, masked with the bank mask.
    ///
    /// Returns `None` when the masked index lands past the populated image
    /// (e.g. bank 3 of a three-bank ROM); such a bank reads as open bus.
    /// The last bank may be shorter than [`bank_size`](Self::bank_size).
    pub fn bank(&self, bank: u32) -> Option<&[u8]> {
        let start = self.bank_offset(bank);
        if start >= self.buffer.len() {
            return None;
        }
        let end = (start + self.bank_size()).min(self.buffer.len());
        Some(&self.buffer[start..end])
    }

    /// Mutable variant of [`bank`](Self::bank)
    pub fn bank_mut(&mut self, bank: u32) -> Option<&mut [u8]> {
        let start = self.bank_offset(bank);
        if start >= self.buffer.len() {
            return None;
        }
        let end = (start + self.bank_size()).min(self.buffer.len());
        Some(&mut self.buffer[start..end])
    }

    /// Read the byte at `offset` inside bank `bank`, if backed
    #[inline]
    pub fn read(&self, bank: u32, offset: usize) -> Option<u8> {
        self.bank(bank).and_then(|b| b.get(offset).copied())
    }

    /// Write the byte at `offset` inside bank `bank`; returns whether it was backed
    #[inline]
    pub fn write(&mut self, bank: u32, offset: usize, value: u8) -> bool {
        match self.bank_mut(bank).and_then(|b| b.get_mut(offset)) {
            Some(byte) => {
                *byte = value;
                true
            }
            None => false,
        }
    }

    /// Read the byte at a flat offset into the buffer
    #[inline]
    pub fn read_flat(&self, offset: usize) -> Option<u8> {
        self.buffer.get(offset).copied()
    }

    /// Write the byte at a flat offset; returns whether it was backed
    #[inline]
    pub fn write_flat(&mut self, offset: usize, value: u8) -> bool {
        match self.buffer.get_mut(offset) {
            Some(byte) => {
                *byte = value;
                true
            }
            None => false,
        }
    }

    /// Mutable access to the whole buffer (RAM devices only)
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.buffer
    }
}

impl std::fmt::Debug for BankedStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BankedStorage")
            .field("len", &self.buffer.len())
            .field("bank_size", &self.bank_size())
            .field("bank_mask", &self.bank_mask)
            .finish()
    }
}
