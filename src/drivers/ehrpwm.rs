//! Enhanced high-resolution PWM (ePWM) driver for one PWM subsystem.
//!
//! ```text
//!  PWMSS window (one page)
//!  ┌────────────┬────────┬────────┬──────────────────────────┐
//!  │ SS config  │ eCAP   │ eQEP   │ ePWM  (+0x200)           │
//!  │ CLKCONFIG  │        │        │ TB ─ CC ─ AQ ─ DB ─ PC   │
//!  └────────────┴────────┴────────┴──────────────────────────┘
//! ```
//!
//! The counter runs in up-count mode.  Both outputs go high when the counter
//! wraps to zero and low when it reaches their compare value, so output A's
//! duty cycle is `CMPA / TBPRD` (B likewise with CMPB).  Period and compare
//! values are written through their shadow registers and take effect at the
//! next counter-equals-zero event, so a running waveform never glitches.
//!
//! ePWM registers are 16 bits wide; subsystem config registers are 32 bits.

use log::{debug, info, warn};

use crate::addressing::PwmChannel;
use crate::app::ports::RegisterPort;
use crate::board::EPWM_OFFSET;

// ── Register map ──────────────────────────────────────────────

/// PWMSS config registers, offsets from the subsystem base.
pub mod ss {
    pub const IDVER: usize = 0x00;
    pub const CLKCONFIG: usize = 0x08;
    pub const CLKSTATUS: usize = 0x0C;

    pub const CLKCONFIG_EPWM_EN: u32 = 1 << 8;
    pub const CLKCONFIG_EPWM_STOP_REQ: u32 = 1 << 9;
}

/// ePWM registers, offsets from the ePWM block.
pub mod reg {
    pub const TBCTL: usize = 0x00;
    pub const TBSTS: usize = 0x02;
    pub const TBPHS: usize = 0x06;
    pub const TBCNT: usize = 0x08;
    pub const TBPRD: usize = 0x0A;
    pub const CMPCTL: usize = 0x0E;
    pub const CMPA: usize = 0x12;
    pub const CMPB: usize = 0x14;
    pub const AQCTLA: usize = 0x16;
    pub const AQCTLB: usize = 0x18;
    pub const AQSFRC: usize = 0x1A;
    pub const DBCTL: usize = 0x1E;
    pub const TZSEL: usize = 0x24;
    pub const TZEINT: usize = 0x2A;
    pub const ETSEL: usize = 0x32;
    pub const ETCLR: usize = 0x38;
    pub const PCCTL: usize = 0x3C;
    pub const HRCNFG: usize = 0xC0;
}

// TBCTL
pub const TBCTL_CTRMODE_MASK: u16 = 0b11;
pub const TBCTL_CTRMODE_UP: u16 = 0;
pub const TBCTL_PHSEN: u16 = 1 << 2;
/// Clear: period writes go to the shadow register.
pub const TBCTL_PRDLD_IMMEDIATE: u16 = 1 << 3;
pub const TBCTL_SYNCOSEL_MASK: u16 = 0b11 << 4;
pub const TBCTL_SYNCOSEL_DISABLE: u16 = 0b11 << 4;
pub const TBCTL_HSPCLKDIV_SHIFT: u16 = 7;
pub const TBCTL_HSPCLKDIV_MASK: u16 = 0b111 << TBCTL_HSPCLKDIV_SHIFT;
pub const TBCTL_CLKDIV_SHIFT: u16 = 10;
pub const TBCTL_CLKDIV_MASK: u16 = 0b111 << TBCTL_CLKDIV_SHIFT;
pub const TBCTL_FREE_SOFT_MASK: u16 = 0b11 << 14;

// CMPCTL
pub const CMPCTL_LOADAMODE_MASK: u16 = 0b11;
pub const CMPCTL_LOADBMODE_SHIFT: u16 = 2;
pub const CMPCTL_LOADBMODE_MASK: u16 = 0b11 << CMPCTL_LOADBMODE_SHIFT;
/// Set: CMPA writes bypass the shadow register.
pub const CMPCTL_SHDWAMODE_IMMEDIATE: u16 = 1 << 4;
pub const CMPCTL_SHDWBMODE_IMMEDIATE: u16 = 1 << 6;

// AQCTLx event fields
pub const AQ_ZRO_SHIFT: u16 = 0;
pub const AQ_PRD_SHIFT: u16 = 2;
pub const AQ_CAU_SHIFT: u16 = 4;
pub const AQ_CAD_SHIFT: u16 = 6;
pub const AQ_CBU_SHIFT: u16 = 8;
pub const AQ_CBD_SHIFT: u16 = 10;

// AQSFRC one-time software force fields
pub const AQSFRC_ACTSFA_MASK: u16 = 0b11;
pub const AQSFRC_ACTSFB_MASK: u16 = 0b11 << 3;

pub const DBCTL_OUT_MODE_MASK: u16 = 0b11;
pub const TZSEL_CBC_MASK: u16 = 0x00FF;
pub const TZSEL_OSHT_MASK: u16 = 0xFF00;
pub const ETSEL_INTEN: u16 = 1 << 3;
pub const ETCLR_INT: u16 = 1 << 0;
pub const PCCTL_CHPEN: u16 = 1 << 0;
pub const HRCNFG_EDGMODE_MASK: u16 = 0b11;

/// Largest prescale the timebase can apply (CLKDIV /128 × HSPCLKDIV /14).
pub const MAX_TIMEBASE_DIVIDER: u32 = 128 * 14;

// ── Types ─────────────────────────────────────────────────────

/// Action-qualifier output action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum AqAction {
    DoNothing = 0,
    Low = 1,
    High = 2,
    Toggle = 3,
}

/// Actions for one output across the counter events it reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AqConfig {
    pub zero: AqAction,
    pub period: AqAction,
    pub cmpa_up: AqAction,
    pub cmpa_down: AqAction,
    pub cmpb_up: AqAction,
    pub cmpb_down: AqAction,
}

impl AqConfig {
    /// High at zero, low when the channel's own compare matches on the way up.
    pub const fn edge_aligned(channel: PwmChannel) -> Self {
        let (cmpa_up, cmpb_up) = match channel {
            PwmChannel::A => (AqAction::Low, AqAction::DoNothing),
            PwmChannel::B => (AqAction::DoNothing, AqAction::Low),
        };
        Self {
            zero: AqAction::High,
            period: AqAction::DoNothing,
            cmpa_up,
            cmpa_down: AqAction::DoNothing,
            cmpb_up,
            cmpb_down: AqAction::DoNothing,
        }
    }

    pub const fn bits(self) -> u16 {
        ((self.zero as u16) << AQ_ZRO_SHIFT)
            | ((self.period as u16) << AQ_PRD_SHIFT)
            | ((self.cmpa_up as u16) << AQ_CAU_SHIFT)
            | ((self.cmpa_down as u16) << AQ_CAD_SHIFT)
            | ((self.cmpb_up as u16) << AQ_CBU_SHIFT)
            | ((self.cmpb_down as u16) << AQ_CBD_SHIFT)
    }
}

/// Encoded prescaler selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prescale {
    /// TBCTL.CLKDIV field (divide by `2^clkdiv`).
    pub clkdiv: u16,
    /// TBCTL.HSPCLKDIV field (divide by 1, or `2 × hspclkdiv`).
    pub hspclkdiv: u16,
}

impl Prescale {
    pub const fn divider(self) -> u32 {
        let hsp = if self.hspclkdiv == 0 { 1 } else { 2 * self.hspclkdiv as u32 };
        (1u32 << self.clkdiv) * hsp
    }

    /// Smallest prescale that brings `module_clk` down to at most `tb_clk`.
    ///
    /// Exact when the ratio is representable; clamps to the largest divider
    /// otherwise.
    pub fn for_clocks(module_clk: u32, tb_clk: u32) -> Self {
        let wanted = module_clk.div_ceil(tb_clk.max(1)).clamp(1, MAX_TIMEBASE_DIVIDER);
        let mut best = Self { clkdiv: 7, hspclkdiv: 7 };
        for clkdiv in 0..8 {
            for hspclkdiv in 0..8 {
                let candidate = Self { clkdiv, hspclkdiv };
                let div = candidate.divider();
                if div >= wanted && div < best.divider() {
                    best = candidate;
                }
            }
        }
        best
    }
}

// ── Driver ────────────────────────────────────────────────────

/// Register programmer for the ePWM block of one PWM subsystem.
pub struct EhrPwm<R> {
    regs: R,
}

impl<R: RegisterPort> EhrPwm<R> {
    /// `regs` must cover the whole subsystem window.
    pub fn new(regs: R) -> Self {
        Self { regs }
    }

    fn read(&self, offset: usize) -> u16 {
        self.regs.read16(EPWM_OFFSET + offset)
    }

    fn write(&mut self, offset: usize, value: u16) {
        self.regs.write16(EPWM_OFFSET + offset, value);
    }

    fn modify(&mut self, offset: usize, clear: u16, set: u16) {
        self.regs.modify16(EPWM_OFFSET + offset, clear, set);
    }

    /// Full bring-up: every auxiliary sub-module off, edge-aligned action
    /// qualifiers, zero duty on both outputs, clock running.
    pub fn init(&mut self, tb_clk: u32, module_clk: u32) {
        self.clock_disable();
        let prescale = self.configure_timebase_clock(tb_clk, module_clk);
        self.disable_sync_in();
        self.disable_sync_out();
        self.bypass_dead_band();
        self.disable_trip_zones();
        self.disable_chopper();
        self.disable_high_resolution();
        self.stop_after_next_increment();
        self.clear_event_interrupt();
        self.disable_event_interrupt();
        for channel in PwmChannel::ALL {
            self.configure_action_qualifier(channel, AqConfig::edge_aligned(channel));
        }
        for channel in PwmChannel::ALL {
            self.load_compare(channel, 0);
        }
        self.clock_enable();
        info!(
            "ehrpwm: initialised (module {module_clk} Hz / {} -> tb {tb_clk} Hz)",
            prescale.divider()
        );
    }

    // ── Subsystem clock ──────────────────────────────────────

    pub fn clock_enable(&mut self) {
        self.regs
            .modify32(ss::CLKCONFIG, ss::CLKCONFIG_EPWM_STOP_REQ, ss::CLKCONFIG_EPWM_EN);
    }

    pub fn clock_disable(&mut self) {
        self.regs
            .modify32(ss::CLKCONFIG, ss::CLKCONFIG_EPWM_EN, ss::CLKCONFIG_EPWM_STOP_REQ);
    }

    pub fn clock_enabled(&self) -> bool {
        self.regs.read32(ss::CLKCONFIG) & ss::CLKCONFIG_EPWM_EN != 0
    }

    // ── Timebase ─────────────────────────────────────────────

    pub fn configure_timebase_clock(&mut self, tb_clk: u32, module_clk: u32) -> Prescale {
        let prescale = Prescale::for_clocks(module_clk, tb_clk);
        if prescale.divider() * tb_clk != module_clk {
            warn!(
                "ehrpwm: tb clock {tb_clk} Hz not reachable from {module_clk} Hz, using /{}",
                prescale.divider()
            );
        }
        self.modify(
            reg::TBCTL,
            TBCTL_CLKDIV_MASK | TBCTL_HSPCLKDIV_MASK,
            (prescale.clkdiv << TBCTL_CLKDIV_SHIFT) | (prescale.hspclkdiv << TBCTL_HSPCLKDIV_SHIFT),
        );
        prescale
    }

    /// Lowest frequency whose period count fits TBPRD at `tb_clk`.
    pub const fn min_exact_frequency(tb_clk: u32) -> u32 {
        tb_clk / (u16::MAX as u32 + 1) + 1
    }

    /// Program the period for `freq` in up-count mode with shadow loading.
    ///
    /// Returns the period count written, or `None` when `freq` is 0 and
    /// nothing was touched.  Below [`min_exact_frequency`](Self::min_exact_frequency)
    /// the count saturates at 65535, so the output runs faster than `freq`.
    pub fn set_frequency(&mut self, tb_clk: u32, freq: u32) -> Option<u16> {
        if freq == 0 {
            return None;
        }
        let count = tb_clk / freq;
        let period = u16::try_from(count).unwrap_or_else(|_| {
            warn!(
                "ehrpwm: period {count} for {freq} Hz exceeds 16 bits, saturating (lowest exact {} Hz)",
                Self::min_exact_frequency(tb_clk)
            );
            u16::MAX
        });
        self.modify(reg::TBCTL, TBCTL_PRDLD_IMMEDIATE, 0);
        self.modify(reg::TBCTL, TBCTL_CTRMODE_MASK, TBCTL_CTRMODE_UP);
        self.write(reg::TBPRD, period);
        debug!("ehrpwm: {freq} Hz -> TBPRD {period}");
        Some(period)
    }

    pub fn period(&self) -> u16 {
        self.read(reg::TBPRD)
    }

    pub fn counter(&self) -> u16 {
        self.read(reg::TBCNT)
    }

    pub fn disable_sync_in(&mut self) {
        self.modify(reg::TBCTL, TBCTL_PHSEN, 0);
        self.write(reg::TBPHS, 0);
    }

    pub fn disable_sync_out(&mut self) {
        self.modify(reg::TBCTL, TBCTL_SYNCOSEL_MASK, TBCTL_SYNCOSEL_DISABLE);
    }

    /// Emulation: stop the counter after the next timebase increment when
    /// the debugger halts the core.
    pub fn stop_after_next_increment(&mut self) {
        self.modify(reg::TBCTL, TBCTL_FREE_SOFT_MASK, 0);
    }

    // ── Counter-compare ──────────────────────────────────────

    /// Write a compare threshold through the shadow register, to be applied
    /// at the next counter-equals-zero event.  A pending shadow value is
    /// overwritten.
    pub fn load_compare(&mut self, channel: PwmChannel, value: u16) {
        match channel {
            PwmChannel::A => {
                self.modify(reg::CMPCTL, CMPCTL_SHDWAMODE_IMMEDIATE, 0);
                self.modify(reg::CMPCTL, CMPCTL_LOADAMODE_MASK, 0);
                self.write(reg::CMPA, value);
            }
            PwmChannel::B => {
                self.modify(reg::CMPCTL, CMPCTL_SHDWBMODE_IMMEDIATE, 0);
                self.modify(reg::CMPCTL, CMPCTL_LOADBMODE_MASK, 0);
                self.write(reg::CMPB, value);
            }
        }
    }

    pub fn compare(&self, channel: PwmChannel) -> u16 {
        match channel {
            PwmChannel::A => self.read(reg::CMPA),
            PwmChannel::B => self.read(reg::CMPB),
        }
    }

    // ── Action qualifier ─────────────────────────────────────

    pub fn configure_action_qualifier(&mut self, channel: PwmChannel, config: AqConfig) {
        match channel {
            PwmChannel::A => {
                self.write(reg::AQCTLA, config.bits());
                self.modify(reg::AQSFRC, AQSFRC_ACTSFA_MASK, 0);
            }
            PwmChannel::B => {
                self.write(reg::AQCTLB, config.bits());
                self.modify(reg::AQSFRC, AQSFRC_ACTSFB_MASK, 0);
            }
        }
    }

    // ── Auxiliary sub-modules ────────────────────────────────

    pub fn bypass_dead_band(&mut self) {
        self.modify(reg::DBCTL, DBCTL_OUT_MODE_MASK, 0);
    }

    /// Disable both one-shot and cycle-by-cycle trip sources.
    pub fn disable_trip_zones(&mut self) {
        self.modify(reg::TZSEL, TZSEL_OSHT_MASK | TZSEL_CBC_MASK, 0);
        self.write(reg::TZEINT, 0);
    }

    pub fn disable_chopper(&mut self) {
        self.modify(reg::PCCTL, PCCTL_CHPEN, 0);
    }

    pub fn disable_high_resolution(&mut self) {
        self.modify(reg::HRCNFG, HRCNFG_EDGMODE_MASK, 0);
    }

    // ── Event trigger ────────────────────────────────────────

    pub fn clear_event_interrupt(&mut self) {
        self.write(reg::ETCLR, ETCLR_INT);
    }

    pub fn disable_event_interrupt(&mut self) {
        self.modify(reg::ETSEL, ETSEL_INTEN, 0);
    }

    pub fn registers(&self) -> &R {
        &self.regs
    }
}
