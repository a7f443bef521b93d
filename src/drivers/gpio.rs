//! GPIO v2 bank driver.
//!
//! One instance per bank; each bank owns 32 lines.  The driver is a dumb
//! register programmer: addressing and authorization happen upstream.
//!
//! Output levels go through the atomic SETDATAOUT / CLEARDATAOUT registers,
//! so writing one line never read-modify-writes the shared output latch.

use log::{debug, info};

use crate::app::ports::RegisterPort;

// ── Register map ──────────────────────────────────────────────

/// Byte offsets within a bank's register window.
pub mod reg {
    pub const REVISION: usize = 0x000;
    pub const SYSCONFIG: usize = 0x010;
    pub const SYSSTATUS: usize = 0x114;
    pub const CTRL: usize = 0x130;
    pub const OE: usize = 0x134;
    pub const DATAIN: usize = 0x138;
    pub const DATAOUT: usize = 0x13C;
    pub const DEBOUNCENABLE: usize = 0x150;
    pub const DEBOUNCINGTIME: usize = 0x154;
    pub const CLEARDATAOUT: usize = 0x190;
    pub const SETDATAOUT: usize = 0x194;
}

pub const SYSCONFIG_AUTOIDLE: u32 = 1 << 0;
pub const SYSCONFIG_SOFTRESET: u32 = 1 << 1;
pub const SYSCONFIG_IDLEMODE_SHIFT: u32 = 3;
pub const SYSCONFIG_IDLEMODE_MASK: u32 = 0b11 << SYSCONFIG_IDLEMODE_SHIFT;
pub const SYSSTATUS_RESETDONE: u32 = 1 << 0;
pub const CTRL_DISABLEMODULE: u32 = 1 << 0;
pub const DEBOUNCINGTIME_MASK: u32 = 0xFF;

/// Polls of SYSSTATUS before a soft reset is declared stuck.
pub const RESET_POLL_LIMIT: u32 = 10_000;

/// Mode argument selecting output; every other value selects input.
pub const OUTPUT_MODE: u32 = 1;

// ── Types ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    pub fn from_mode(mode: u32) -> Self {
        if mode == OUTPUT_MODE { Self::Output } else { Self::Input }
    }
}

/// SYSCONFIG.IDLEMODE values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum IdleMode {
    ForceIdle = 0,
    NoIdle = 1,
    SmartIdle = 2,
    SmartIdleWakeup = 3,
}

/// The bank never reported RESETDONE after a soft reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetTimeout;

impl core::fmt::Display for ResetTimeout {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "soft reset did not complete after {RESET_POLL_LIMIT} polls")
    }
}

// ── Driver ────────────────────────────────────────────────────

pub struct GpioBank<R> {
    regs: R,
}

impl<R: RegisterPort> GpioBank<R> {
    pub fn new(regs: R) -> Self {
        Self { regs }
    }

    /// Bring the bank into a known state: disable, soft reset, auto-idle off,
    /// no-idle, enable.
    pub fn init(&mut self) -> Result<(), ResetTimeout> {
        self.module_disable();
        self.soft_reset()?;
        self.set_auto_idle(false);
        self.set_idle_mode(IdleMode::NoIdle);
        self.module_enable();
        info!(
            "gpio: bank initialised (rev {:#x})",
            self.regs.read32(reg::REVISION)
        );
        Ok(())
    }

    pub fn module_enable(&mut self) {
        self.regs.modify32(reg::CTRL, CTRL_DISABLEMODULE, 0);
    }

    pub fn module_disable(&mut self) {
        self.regs.modify32(reg::CTRL, 0, CTRL_DISABLEMODULE);
    }

    /// Trigger a soft reset and wait (bounded) for RESETDONE.
    pub fn soft_reset(&mut self) -> Result<(), ResetTimeout> {
        self.regs.modify32(reg::SYSCONFIG, 0, SYSCONFIG_SOFTRESET);
        for _ in 0..RESET_POLL_LIMIT {
            if self.regs.read32(reg::SYSSTATUS) & SYSSTATUS_RESETDONE != 0 {
                return Ok(());
            }
            core::hint::spin_loop();
        }
        Err(ResetTimeout)
    }

    pub fn set_auto_idle(&mut self, enable: bool) {
        let set = if enable { SYSCONFIG_AUTOIDLE } else { 0 };
        self.regs.modify32(reg::SYSCONFIG, SYSCONFIG_AUTOIDLE, set);
    }

    pub fn set_idle_mode(&mut self, mode: IdleMode) {
        self.regs.modify32(
            reg::SYSCONFIG,
            SYSCONFIG_IDLEMODE_MASK,
            (mode as u32) << SYSCONFIG_IDLEMODE_SHIFT,
        );
    }

    /// OE bit set means input.
    pub fn set_direction(&mut self, line: u32, dir: Direction) {
        let mask = 1 << line;
        match dir {
            Direction::Output => self.regs.modify32(reg::OE, mask, 0),
            Direction::Input => self.regs.modify32(reg::OE, 0, mask),
        }
        debug!("gpio: line {line} -> {dir:?}");
    }

    pub fn direction(&self, line: u32) -> Direction {
        if self.regs.read32(reg::OE) & (1 << line) == 0 {
            Direction::Output
        } else {
            Direction::Input
        }
    }

    pub fn set_debounce(&mut self, line: u32, enable: bool) {
        let mask = 1 << line;
        if enable {
            self.regs.modify32(reg::DEBOUNCENABLE, 0, mask);
        } else {
            self.regs.modify32(reg::DEBOUNCENABLE, mask, 0);
        }
    }

    /// Bank-wide debounce time; only the low 8 bits are significant.
    pub fn set_debounce_time(&mut self, time: u32) {
        self.regs.write32(reg::DEBOUNCINGTIME, time & DEBOUNCINGTIME_MASK);
    }

    /// Sampled input level of `line`, normalised to 0 or 1.
    pub fn read(&self, line: u32) -> u32 {
        (self.regs.read32(reg::DATAIN) >> line) & 1
    }

    pub fn write(&mut self, line: u32, high: bool) {
        let mask = 1 << line;
        if high {
            self.regs.write32(reg::SETDATAOUT, mask);
        } else {
            self.regs.write32(reg::CLEARDATAOUT, mask);
        }
    }

    /// Latched output level of `line`, normalised to 0 or 1.
    pub fn output_level(&self, line: u32) -> u32 {
        (self.regs.read32(reg::DATAOUT) >> line) & 1
    }

    pub fn registers(&self) -> &R {
        &self.regs
    }
}
