//! Direct, in-process access to the control logic.
//!
//! For a single embedding runtime that links the crate instead of talking
//! to a server.  The embedder is implicitly trusted: there is no badge, no
//! registration and no caller check.  Addressing and register control are
//! the same as the servers', so out-of-range pins still come back as
//! `BadRequest`.
//!
//! Also exposes GPIO lines and PWM channels through the `embedded-hal` 1.0
//! traits so generic drivers can use them.

use core::convert::Infallible;

use embedded_hal::digital::{self, InputPin, OutputPin, StatefulOutputPin};
use embedded_hal::pwm::{self, SetDutyCycle};

use crate::addressing::PwmChannel;
use crate::app::duty_cycle::MAX_PERCENT;
use crate::app::gpio_service::GpioService;
use crate::app::ports::{DeviceFramePort, RegisterPort};
use crate::app::pwm_service::PwmService;
use crate::drivers::gpio::{Direction, GpioBank};
use crate::error::{Result, StartupError, Status};
use crate::rpc::message::Word;
use crate::startup;

// ── DirectGpio ────────────────────────────────────────────────

pub struct DirectGpio<R> {
    gpio: GpioService<R>,
}

impl<R: RegisterPort> DirectGpio<R> {
    pub fn new(gpio: GpioService<R>) -> Self {
        Self { gpio }
    }

    /// Map and initialise all four banks.
    pub fn load<F>(frames: &mut F) -> core::result::Result<Self, StartupError>
    where
        F: DeviceFramePort<Window = R>,
    {
        startup::bring_up_gpio(frames).map(Self::new)
    }

    pub fn configure_pin(&mut self, pin: Word, mode: Word) -> Result<()> {
        self.gpio.configure_pin(pin, mode)
    }

    pub fn read(&mut self, pin: Word) -> Result<Word> {
        self.gpio.read(pin)
    }

    pub fn write(&mut self, pin: Word, level: Word) -> Result<()> {
        self.gpio.write(pin, level)
    }

    pub fn set_debounce(&mut self, pin: Word, enable: Word) -> Result<()> {
        self.gpio.set_debounce(pin, enable)
    }

    pub fn set_debounce_time(&mut self, pin: Word, time: Word) -> Result<()> {
        self.gpio.set_debounce_time(pin, time)
    }

    /// Borrow one line as an `embedded-hal` pin.
    pub fn line(&mut self, pin: Word) -> Result<GpioLine<'_, R>> {
        let (bank, addr) = self.gpio.bank(pin)?;
        Ok(GpioLine {
            bank,
            line: addr.line,
        })
    }

    pub fn into_inner(self) -> GpioService<R> {
        self.gpio
    }
}

// ── embedded-hal digital ──────────────────────────────────────

/// One GPIO line.  Direction is not changed implicitly; configure the pin
/// first.
pub struct GpioLine<'a, R> {
    bank: &'a mut GpioBank<R>,
    line: u32,
}

impl<R: RegisterPort> GpioLine<'_, R> {
    pub fn into_output(self) -> Self {
        self.bank.set_direction(self.line, Direction::Output);
        self
    }

    pub fn into_input(self) -> Self {
        self.bank.set_direction(self.line, Direction::Input);
        self
    }
}

impl<R> digital::ErrorType for GpioLine<'_, R> {
    type Error = Infallible;
}

impl<R: RegisterPort> InputPin for GpioLine<'_, R> {
    fn is_high(&mut self) -> core::result::Result<bool, Infallible> {
        Ok(self.bank.read(self.line) == 1)
    }

    fn is_low(&mut self) -> core::result::Result<bool, Infallible> {
        Ok(self.bank.read(self.line) == 0)
    }
}

impl<R: RegisterPort> OutputPin for GpioLine<'_, R> {
    fn set_low(&mut self) -> core::result::Result<(), Infallible> {
        self.bank.write(self.line, false);
        Ok(())
    }

    fn set_high(&mut self) -> core::result::Result<(), Infallible> {
        self.bank.write(self.line, true);
        Ok(())
    }
}

impl<R: RegisterPort> StatefulOutputPin for GpioLine<'_, R> {
    fn is_set_high(&mut self) -> core::result::Result<bool, Infallible> {
        Ok(self.bank.output_level(self.line) == 1)
    }

    fn is_set_low(&mut self) -> core::result::Result<bool, Infallible> {
        Ok(self.bank.output_level(self.line) == 0)
    }
}

// ── embedded-hal PWM ──────────────────────────────────────────

/// One ePWM output with duty expressed in percent (max 100).
pub struct PwmOutput<'a, R> {
    service: &'a mut PwmService<R>,
    channel: PwmChannel,
}

impl<'a, R: RegisterPort> PwmOutput<'a, R> {
    pub fn new(service: &'a mut PwmService<R>, channel: PwmChannel) -> Self {
        Self { service, channel }
    }

    pub fn channel(&self) -> PwmChannel {
        self.channel
    }
}

impl<R> pwm::ErrorType for PwmOutput<'_, R> {
    type Error = Status;
}

impl<R: RegisterPort> SetDutyCycle for PwmOutput<'_, R> {
    fn max_duty_cycle(&self) -> u16 {
        MAX_PERCENT as u16
    }

    fn set_duty_cycle(&mut self, duty: u16) -> core::result::Result<(), Status> {
        self.service
            .set_duty_cycle(self.channel.index() as Word, Word::from(duty))
    }
}
