//! Volatile register window over a mapped device frame.
//!
//! This is the production [`RegisterPort`]: the platform maps a device frame
//! uncached into the server's address space and wraps the resulting virtual
//! address here.  Every access is a single volatile load or store of the
//! requested width.

use core::ptr::{self, NonNull};

use crate::app::ports::RegisterPort;

/// A mapped, uncached peripheral register window.
#[derive(Debug)]
pub struct MmioWindow {
    base: NonNull<u8>,
    size: usize,
}

// SAFETY: the window is plain device memory with no thread affinity; the
// owner moves it into the listener thread and is its only user from then on.
unsafe impl Send for MmioWindow {}

impl MmioWindow {
    /// Wrap a mapped window.
    ///
    /// # Safety
    ///
    /// `base` must point to `size` bytes of mapped device memory that stays
    /// mapped for the lifetime of the returned value, and no other code may
    /// access that memory while it is alive.
    pub unsafe fn new(base: NonNull<u8>, size: usize) -> Self {
        Self { base, size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    fn reg<T>(&self, offset: usize) -> *mut T {
        let width = core::mem::size_of::<T>();
        assert!(
            offset % width == 0 && offset + width <= self.size,
            "register access at {offset:#x} outside {:#x}-byte window",
            self.size
        );
        // SAFETY: bounds checked above; `base` covers `size` bytes.
        unsafe { self.base.as_ptr().add(offset).cast::<T>() }
    }
}

impl RegisterPort for MmioWindow {
    fn read32(&self, offset: usize) -> u32 {
        // SAFETY: aligned, in-bounds, mapped device memory (see `new`).
        unsafe { ptr::read_volatile(self.reg::<u32>(offset)) }
    }

    fn write32(&mut self, offset: usize, value: u32) {
        // SAFETY: as above.
        unsafe { ptr::write_volatile(self.reg::<u32>(offset), value) }
    }

    fn read16(&self, offset: usize) -> u16 {
        // SAFETY: as above.
        unsafe { ptr::read_volatile(self.reg::<u16>(offset)) }
    }

    fn write16(&mut self, offset: usize, value: u16) {
        // SAFETY: as above.
        unsafe { ptr::write_volatile(self.reg::<u16>(offset), value) }
    }
}
