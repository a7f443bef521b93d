//! Duty-cycle / frequency model for one PWM controller.
//!
//! Pure state: the cached duty percentage of each channel, the one frequency
//! both channels share, and the rule that derives compare thresholds from
//! them.  Thresholds always come from the *current* frequency, so a
//! frequency change recomputes both channels.
//!
//! ```text
//!   periodCount = referenceClock / freq
//!   threshold   = round(percent × periodCount / 100)
//! ```
//!
//! With `freq == 0` nothing can be derived and no threshold is produced;
//! duty cycles are still cached for when a frequency arrives.

use crate::addressing::PwmChannel;
use crate::error::{Result, Status};

pub const MAX_PERCENT: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DutyCycleModel {
    reference_clock: u32,
    frequency: u32,
    duty: [u8; 2],
}

impl DutyCycleModel {
    /// Both channels at 0 %, frequency 0.
    pub fn new(reference_clock: u32) -> Self {
        Self {
            reference_clock,
            frequency: 0,
            duty: [0; 2],
        }
    }

    pub fn reference_clock(&self) -> u32 {
        self.reference_clock
    }

    pub fn frequency(&self) -> u32 {
        self.frequency
    }

    pub fn duty(&self, channel: PwmChannel) -> u8 {
        self.duty[channel.index()]
    }

    /// Counter ticks per period at the current frequency.
    pub fn period_count(&self) -> Option<u32> {
        (self.frequency != 0).then(|| self.reference_clock / self.frequency)
    }

    /// Compare threshold for `channel` at the current frequency.
    pub fn threshold(&self, channel: PwmChannel) -> Option<u32> {
        let period = u64::from(self.period_count()?);
        let percent = u64::from(self.duty(channel));
        Some(((percent * period + 50) / 100) as u32)
    }

    /// Cache `percent` for `channel`.  Returns the threshold to program, if
    /// a frequency is set.
    pub fn set_duty(&mut self, channel: PwmChannel, percent: u32) -> Result<Option<u32>> {
        if percent > MAX_PERCENT {
            return Err(Status::BadRequest);
        }
        self.duty[channel.index()] = percent as u8;
        Ok(self.threshold(channel))
    }

    /// Cache `freq`.  Returns the recomputed thresholds of both channels, or
    /// `None` when `freq` is 0.
    pub fn set_frequency(&mut self, freq: u32) -> Option<[(PwmChannel, u32); 2]> {
        self.frequency = freq;
        let a = self.threshold(PwmChannel::A)?;
        let b = self.threshold(PwmChannel::B)?;
        Some([(PwmChannel::A, a), (PwmChannel::B, b)])
    }
}
