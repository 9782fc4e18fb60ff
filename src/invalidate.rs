//! Cache-line invalidation channel
//!
//! Whenever a device changes what is visible in part of the address space it
//! must tell the CPU core, before the triggering access returns, to drop any
//! direct pointers it holds for that window. The CPU core is the implementor;
//! devices receive it as an explicit constructor parameter.

use std::cell::RefCell;
use std::rc::Rc;

use log::trace;

use crate::device::{CACHE_LINE_BITS, CACHE_LINE_HIGH, CACHE_LINE_SIZE};

/// Receiver of invalidation requests (implemented by the CPU core)
pub trait CacheInvalidator {
    /// Discard cached lines `[start, start + num_lines * CACHE_LINE_SIZE)`.
    ///
    /// `start` is always cache-line aligned.
    fn invalidate_range(&self, start: u16, num_lines: u32);
}

/// Shared handle passed to devices at construction
pub type InvalidatorRef = Rc<dyn CacheInvalidator>;

/// Number of cache lines spanning `len` bytes
#[inline]
pub const fn lines_for(len: u32) -> u32 {
    len >> CACHE_LINE_BITS
}

/// Aligned start and line count covering `[base, base + size)`
#[inline]
pub fn line_span(base: u16, size: u32) -> (u16, u32) {
    let start = base & CACHE_LINE_HIGH;
    let end = base as u32 + size;
    let num_lines = (end - start as u32).div_ceil(CACHE_LINE_SIZE as u32);
    (start, num_lines)
}

/// Invalidator that drops every request
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInvalidation;

impl CacheInvalidator for NoInvalidation {
    fn invalidate_range(&self, _start: u16, _num_lines: u32) {}
}

/// One recorded invalidation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidatedRange {
    pub start: u16,
    pub num_lines: u32,
}

impl InvalidatedRange {
    /// First address past the range
    pub fn end(&self) -> u32 {
        self.start as u32 + self.num_lines * CACHE_LINE_SIZE as u32
    }

    /// Check whether `addr` lies inside the range
    pub fn contains(&self, addr: u16) -> bool {
        (addr as u32) >= self.start as u32 && (addr as u32) < self.end()
    }
}

/// Invalidator that records every request, in order
#[derive(Debug, Default)]
pub struct InvalidationLog {
    entries: RefCell<Vec<InvalidatedRange>>,
}

impl InvalidationLog {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Take all requests recorded so far
    pub fn drain(&self) -> Vec<InvalidatedRange> {
        std::mem::take(&mut *self.entries.borrow_mut())
    }

    /// Copy of the requests recorded so far
    pub fn entries(&self) -> Vec<InvalidatedRange> {
        self.entries.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl CacheInvalidator for InvalidationLog {
    fn invalidate_range(&self, start: u16, num_lines: u32) {
        trace!("invalidate ${:04X} +{} lines", start, num_lines);
        self.entries
            .borrow_mut()
            .push(InvalidatedRange { start, num_lines });
    }
}
