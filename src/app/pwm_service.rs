//! PWM service: the duty-cycle model driving one ePWM controller.
//!
//! ```text
//!   setDutyCycle(ch, %) ──▶ DutyCycleModel ──threshold──▶ EhrPwm::load_compare
//!   setFrequency(f)     ──▶ EhrPwm::set_frequency (period)
//!                       └─▶ DutyCycleModel ──both thresholds──▶ load_compare ×2
//! ```

use log::{debug, warn};

use crate::addressing::PwmChannel;
use crate::app::duty_cycle::DutyCycleModel;
use crate::app::ports::RegisterPort;
use crate::drivers::ehrpwm::EhrPwm;
use crate::error::{Result, Status};
use crate::rpc::dispatcher::Peripheral;
use crate::rpc::message::{ReplyPayload, Word};

/// PWM protocol operations, by label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum PwmOp {
    SetFrequency = 1,
    SetDutyCycle = 2,
}

impl PwmOp {
    pub fn from_label(label: Word) -> Option<Self> {
        match label {
            1 => Some(Self::SetFrequency),
            2 => Some(Self::SetDutyCycle),
            _ => None,
        }
    }

    pub const fn label(self) -> Word {
        self as Word
    }

    pub const fn arg_count(self) -> usize {
        match self {
            Self::SetFrequency => 1,
            Self::SetDutyCycle => 2,
        }
    }
}

pub struct PwmService<R> {
    pwm: EhrPwm<R>,
    model: DutyCycleModel,
}

impl<R: RegisterPort> PwmService<R> {
    /// Takes an already-initialised controller; both channels start at 0 %.
    pub fn new(pwm: EhrPwm<R>, reference_clock: u32) -> Self {
        Self {
            pwm,
            model: DutyCycleModel::new(reference_clock),
        }
    }

    /// Program the period and reload both thresholds.
    ///
    /// Thresholds always follow `reference_clock / freq`.  Below
    /// [`EhrPwm::min_exact_frequency`] (1526 Hz at 100 MHz) TBPRD saturates
    /// while the thresholds do not, so the delivered duty no longer matches
    /// the requested percentage; the request still succeeds.
    pub fn set_frequency(&mut self, freq: Word) -> Result<()> {
        self.pwm.set_frequency(self.model.reference_clock(), freq);
        if let Some(thresholds) = self.model.set_frequency(freq) {
            for (channel, threshold) in thresholds {
                self.load(channel, threshold);
            }
        } else {
            debug!("pwm: frequency 0, outputs left as they are");
        }
        Ok(())
    }

    pub fn set_duty_cycle(&mut self, channel: Word, percent: Word) -> Result<()> {
        let channel = PwmChannel::from_word(channel)?;
        if let Some(threshold) = self.model.set_duty(channel, percent)? {
            self.load(channel, threshold);
        }
        Ok(())
    }

    fn load(&mut self, channel: PwmChannel, threshold: u32) {
        let value = u16::try_from(threshold).unwrap_or_else(|_| {
            warn!("pwm: threshold {threshold} on {channel:?} exceeds 16 bits, saturating");
            u16::MAX
        });
        self.pwm.load_compare(channel, value);
    }

    pub fn model(&self) -> &DutyCycleModel {
        &self.model
    }

    pub fn controller(&self) -> &EhrPwm<R> {
        &self.pwm
    }
}

impl<R: RegisterPort> Peripheral for PwmService<R> {
    type Op = PwmOp;
    const NAME: &'static str = "pwm";

    fn decode(label: Word) -> Option<PwmOp> {
        PwmOp::from_label(label)
    }

    fn arg_count(op: PwmOp) -> usize {
        op.arg_count()
    }

    fn execute(&mut self, op: PwmOp, args: &[Word]) -> Result<ReplyPayload> {
        match (op, args) {
            (PwmOp::SetFrequency, &[freq]) => self.set_frequency(freq)?,
            (PwmOp::SetDutyCycle, &[channel, percent]) => self.set_duty_cycle(channel, percent)?,
            _ => return Err(Status::BadRequest),
        }
        Ok(ReplyPayload::new())
    }
}
