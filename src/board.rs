//! AM335x physical memory map and board-level constants.
//!
//! Single source of truth: every driver and the startup path reference this
//! module rather than hard-coding addresses.  Addresses match the AM335x
//! Technical Reference Manual memory map (L4_WKUP / L4_PER regions).

use crate::app::ports::DeviceFrame;

/// Size of one MMU page; every peripheral window is mapped as a single page.
pub const PAGE_SIZE: usize = 4096;

// ---------------------------------------------------------------------------
// GPIO banks (GPIO v2 IP)
// ---------------------------------------------------------------------------

pub const GPIO0_PADDR: usize = 0x44e0_7000;
pub const GPIO1_PADDR: usize = 0x4804_c000;
pub const GPIO2_PADDR: usize = 0x481a_c000;
pub const GPIO3_PADDR: usize = 0x481a_e000;

/// Number of GPIO banks on the SoC.
pub const NUM_GPIO_BANKS: usize = 4;

/// Lines handled by one bank.
pub const PINS_PER_BANK: u32 = 32;

/// Highest valid flat pin index.
pub const MAX_FLAT_PIN: u32 = NUM_GPIO_BANKS as u32 * PINS_PER_BANK - 1;

/// Register frames for GPIO0..GPIO3, in controller order.
pub const GPIO_FRAMES: [DeviceFrame; NUM_GPIO_BANKS] = [
    DeviceFrame::page(GPIO0_PADDR),
    DeviceFrame::page(GPIO1_PADDR),
    DeviceFrame::page(GPIO2_PADDR),
    DeviceFrame::page(GPIO3_PADDR),
];

// ---------------------------------------------------------------------------
// PWM subsystems (PWMSS: eCAP + eQEP + ePWM)
// ---------------------------------------------------------------------------

pub const PWMSS0_PADDR: usize = 0x4830_0000;
pub const PWMSS1_PADDR: usize = 0x4830_2000;
pub const PWMSS2_PADDR: usize = 0x4830_4000;

/// Candidate PWM subsystems, probed in this order at startup.  Only one is
/// handed to a given server instance.
pub const PWM_FRAMES: [DeviceFrame; 3] = [
    DeviceFrame::page(PWMSS0_PADDR),
    DeviceFrame::page(PWMSS1_PADDR),
    DeviceFrame::page(PWMSS2_PADDR),
];

/// The ePWM register set sits past the subsystem config, eCAP and eQEP blocks.
pub const EPWM_OFFSET: usize = 0x200;

// ---------------------------------------------------------------------------
// Clocks
// ---------------------------------------------------------------------------

/// PWMSS functional clock feeding the ePWM timebase prescaler.
///
/// The timebase clock gate itself lives in the control module (offset 0x664,
/// bits 0..2) and needs privileged access, so it is assumed enabled by boot
/// firmware.
pub const PWM_MODULE_CLK_HZ: u32 = 100_000_000;

/// Timebase (reference) clock the ePWM counter runs at.
pub const PWM_TB_CLK_HZ: u32 = 100_000_000;
