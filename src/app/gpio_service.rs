//! GPIO service: flat-pin operations over the four banks.
//!
//! Every operation resolves the flat pin first, so an out-of-range pin is a
//! `BadRequest` before any bank is selected.  The same service backs both
//! the authenticated server (through [`Peripheral`]) and the direct binding.

use log::debug;

use crate::addressing::{ControllerId, ControllerMap, PinAddress, decompose};
use crate::app::ports::RegisterPort;
use crate::drivers::gpio::{Direction, GpioBank};
use crate::error::{Result, Status};
use crate::rpc::dispatcher::Peripheral;
use crate::rpc::message::{ReplyPayload, Word};

/// GPIO protocol operations, by label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum GpioOp {
    ConfigurePin = 1,
    SetDebounce = 2,
    SetDebounceTiming = 3,
    Read = 4,
    Write = 5,
}

impl GpioOp {
    pub fn from_label(label: Word) -> Option<Self> {
        match label {
            1 => Some(Self::ConfigurePin),
            2 => Some(Self::SetDebounce),
            3 => Some(Self::SetDebounceTiming),
            4 => Some(Self::Read),
            5 => Some(Self::Write),
            _ => None,
        }
    }

    pub const fn label(self) -> Word {
        self as Word
    }

    pub const fn arg_count(self) -> usize {
        match self {
            Self::Read => 1,
            _ => 2,
        }
    }
}

pub struct GpioService<R> {
    banks: ControllerMap<GpioBank<R>>,
}

impl<R: RegisterPort> GpioService<R> {
    /// Takes already-initialised banks.
    pub fn new(banks: ControllerMap<GpioBank<R>>) -> Self {
        Self { banks }
    }

    pub(crate) fn bank(&mut self, pin: Word) -> Result<(&mut GpioBank<R>, PinAddress)> {
        let addr = decompose(pin)?;
        Ok((self.banks.get_mut(addr.controller), addr))
    }

    /// Mode 1 selects output; every other mode selects input.
    pub fn configure_pin(&mut self, pin: Word, mode: Word) -> Result<()> {
        let (bank, addr) = self.bank(pin)?;
        bank.set_direction(addr.line, Direction::from_mode(mode));
        Ok(())
    }

    pub fn set_debounce(&mut self, pin: Word, enable: Word) -> Result<()> {
        let (bank, addr) = self.bank(pin)?;
        bank.set_debounce(addr.line, enable != 0);
        Ok(())
    }

    /// The debounce time is per bank; `pin` only selects which bank.
    pub fn set_debounce_time(&mut self, pin: Word, time: Word) -> Result<()> {
        let (bank, _) = self.bank(pin)?;
        bank.set_debounce_time(time);
        Ok(())
    }

    pub fn read(&mut self, pin: Word) -> Result<Word> {
        let (bank, addr) = self.bank(pin)?;
        Ok(bank.read(addr.line))
    }

    pub fn write(&mut self, pin: Word, level: Word) -> Result<()> {
        let (bank, addr) = self.bank(pin)?;
        bank.write(addr.line, level != 0);
        Ok(())
    }

    pub fn direction(&mut self, pin: Word) -> Result<Direction> {
        let (bank, addr) = self.bank(pin)?;
        Ok(bank.direction(addr.line))
    }

    /// Latched output level, as opposed to the sampled input [`read`](Self::read).
    pub fn output_level(&mut self, pin: Word) -> Result<Word> {
        let (bank, addr) = self.bank(pin)?;
        Ok(bank.output_level(addr.line))
    }

    pub fn bank_registers(&self, id: ControllerId) -> &R {
        self.banks.get(id).registers()
    }
}

impl<R: RegisterPort> Peripheral for GpioService<R> {
    type Op = GpioOp;
    const NAME: &'static str = "gpio";

    fn decode(label: Word) -> Option<GpioOp> {
        GpioOp::from_label(label)
    }

    fn arg_count(op: GpioOp) -> usize {
        op.arg_count()
    }

    fn execute(&mut self, op: GpioOp, args: &[Word]) -> Result<ReplyPayload> {
        let mut out = ReplyPayload::new();
        match (op, args) {
            (GpioOp::ConfigurePin, &[pin, mode]) => self.configure_pin(pin, mode)?,
            (GpioOp::SetDebounce, &[pin, enable]) => self.set_debounce(pin, enable)?,
            (GpioOp::SetDebounceTiming, &[pin, time]) => self.set_debounce_time(pin, time)?,
            (GpioOp::Read, &[pin]) => {
                let level = self.read(pin)?;
                debug!("gpio: read pin {pin} = {level}");
                // Capacity is at least one word.
                let _ = out.push(level);
            }
            (GpioOp::Write, &[pin, level]) => self.write(pin, level)?,
            _ => return Err(Status::BadRequest),
        }
        Ok(out)
    }
}
