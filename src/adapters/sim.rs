//! In-memory register window.
//!
//! Stands in for a mapped device frame on the host.  Handles are cheap
//! clones sharing one backing page, so a test can keep a handle for
//! inspection after moving another into a driver.
//!
//! Two models:
//! - **plain**: every register is ordinary memory.
//! - **GPIO bank**: emulates the side effects the GPIO driver depends on
//!   (atomic set/clear of the output latch, input sampling through OE,
//!   self-clearing soft reset).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::app::ports::RegisterPort;
use crate::board::PAGE_SIZE;
use crate::drivers::gpio::{SYSCONFIG_SOFTRESET, SYSSTATUS_RESETDONE, reg as gpio};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Model {
    Plain,
    GpioBank,
}

/// One recorded store.  16-bit stores are widened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegWrite {
    pub offset: usize,
    pub value: u32,
}

#[derive(Debug)]
struct SimState {
    model: Model,
    mem: Vec<u8>,
    writes: Vec<RegWrite>,
    /// Externally driven levels seen on input lines.
    inputs: u32,
    /// When set, a soft reset never reports completion.
    hold_reset: bool,
}

impl SimState {
    fn load32(&self, offset: usize) -> u32 {
        let mut b = [0u8; 4];
        b.copy_from_slice(&self.mem[offset..offset + 4]);
        u32::from_le_bytes(b)
    }

    fn store32(&mut self, offset: usize, value: u32) {
        self.mem[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn load16(&self, offset: usize) -> u16 {
        u16::from_le_bytes([self.mem[offset], self.mem[offset + 1]])
    }

    fn store16(&mut self, offset: usize, value: u16) {
        self.mem[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    }

    fn gpio_reset(&mut self) {
        self.mem.fill(0);
        self.store32(gpio::OE, u32::MAX);
        let done = if self.hold_reset { 0 } else { SYSSTATUS_RESETDONE };
        self.store32(gpio::SYSSTATUS, done);
    }

    fn gpio_write(&mut self, offset: usize, value: u32) {
        match offset {
            gpio::SETDATAOUT => {
                let out = self.load32(gpio::DATAOUT) | value;
                self.store32(gpio::DATAOUT, out);
            }
            gpio::CLEARDATAOUT => {
                let out = self.load32(gpio::DATAOUT) & !value;
                self.store32(gpio::DATAOUT, out);
            }
            gpio::SYSCONFIG if value & SYSCONFIG_SOFTRESET != 0 => self.gpio_reset(),
            // Read-only.
            gpio::DATAIN | gpio::SYSSTATUS | gpio::REVISION => {}
            _ => self.store32(offset, value),
        }
    }

    fn gpio_read(&self, offset: usize) -> u32 {
        match offset {
            gpio::DATAIN => {
                let oe = self.load32(gpio::OE);
                (self.load32(gpio::DATAOUT) & !oe) | (self.inputs & oe)
            }
            gpio::SETDATAOUT | gpio::CLEARDATAOUT => self.load32(gpio::DATAOUT),
            _ => self.load32(offset),
        }
    }
}

/// Shared handle to one simulated register page.
#[derive(Debug, Clone)]
pub struct SimRegisters {
    inner: Arc<Mutex<SimState>>,
}

impl SimRegisters {
    fn with_model(model: Model) -> Self {
        let mut state = SimState {
            model,
            mem: vec![0; PAGE_SIZE],
            writes: Vec::new(),
            inputs: 0,
            hold_reset: false,
        };
        if model == Model::GpioBank {
            state.gpio_reset();
        }
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    /// A page of plain memory, all zero.
    pub fn plain() -> Self {
        Self::with_model(Model::Plain)
    }

    /// A GPIO bank in its reset state (all lines input).
    pub fn gpio_bank() -> Self {
        Self::with_model(Model::GpioBank)
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn model(&self) -> Model {
        self.state().model
    }

    /// Every store since creation (or the last [`clear_writes`](Self::clear_writes)).
    pub fn writes(&self) -> Vec<RegWrite> {
        self.state().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.state().writes.clear();
    }

    /// Raw memory, bypassing the model.
    pub fn peek32(&self, offset: usize) -> u32 {
        self.state().load32(offset)
    }

    pub fn peek16(&self, offset: usize) -> u16 {
        self.state().load16(offset)
    }

    /// Set raw memory without recording a write.
    pub fn poke32(&self, offset: usize, value: u32) {
        self.state().store32(offset, value);
    }

    pub fn poke16(&self, offset: usize, value: u16) {
        self.state().store16(offset, value);
    }

    /// Drive the levels seen on lines configured as inputs.
    pub fn set_input_levels(&self, levels: u32) {
        self.state().inputs = levels;
    }

    /// Make the next soft reset hang.
    pub fn hold_reset(&self) {
        self.state().hold_reset = true;
    }
}

impl RegisterPort for SimRegisters {
    fn read32(&self, offset: usize) -> u32 {
        let state = self.state();
        match state.model {
            Model::Plain => state.load32(offset),
            Model::GpioBank => state.gpio_read(offset),
        }
    }

    fn write32(&mut self, offset: usize, value: u32) {
        let mut state = self.state();
        state.writes.push(RegWrite { offset, value });
        match state.model {
            Model::Plain => state.store32(offset, value),
            Model::GpioBank => state.gpio_write(offset, value),
        }
    }

    fn read16(&self, offset: usize) -> u16 {
        self.state().load16(offset)
    }

    fn write16(&mut self, offset: usize, value: u16) {
        let mut state = self.state();
        state.writes.push(RegWrite {
            offset,
            value: u32::from(value),
        });
        state.store16(offset, value);
    }
}
