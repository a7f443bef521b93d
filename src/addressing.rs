//! Flat pin / channel addressing.
//!
//! Clients name GPIO lines with a flat index 0..=127.  Each of the four banks
//! owns 32 consecutive lines:
//!
//! ```text
//!   flat   0 ..  31  ->  GPIO0 line 0..31
//!   flat  32 ..  63  ->  GPIO1 line 0..31
//!   flat  64 ..  95  ->  GPIO2 line 0..31
//!   flat  96 .. 127  ->  GPIO3 line 0..31
//! ```
//!
//! Out-of-range indices are rejected here, before anything is looked up, and
//! per-controller state lives in a [`ControllerMap`] keyed by [`ControllerId`]
//! rather than a raw array index.

use crate::board::{MAX_FLAT_PIN, NUM_GPIO_BANKS, PINS_PER_BANK};
use crate::error::{Result, Status};
use crate::rpc::message::Word;

// ---------------------------------------------------------------------------
// Controller identity
// ---------------------------------------------------------------------------

/// One physical GPIO bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ControllerId {
    Gpio0 = 0,
    Gpio1 = 1,
    Gpio2 = 2,
    Gpio3 = 3,
}

impl ControllerId {
    pub const ALL: [Self; NUM_GPIO_BANKS] = [Self::Gpio0, Self::Gpio1, Self::Gpio2, Self::Gpio3];

    pub fn from_index(idx: u32) -> Option<Self> {
        match idx {
            0 => Some(Self::Gpio0),
            1 => Some(Self::Gpio1),
            2 => Some(Self::Gpio2),
            3 => Some(Self::Gpio3),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Bounds-checked storage of one `T` per GPIO bank.
#[derive(Debug, Clone)]
pub struct ControllerMap<T> {
    slots: [T; NUM_GPIO_BANKS],
}

impl<T> ControllerMap<T> {
    /// Build the map by calling `f` once per controller, in order.
    pub fn from_fn(mut f: impl FnMut(ControllerId) -> T) -> Self {
        Self {
            slots: core::array::from_fn(|i| f(ControllerId::ALL[i])),
        }
    }

    /// Fallible variant of [`from_fn`](Self::from_fn); stops at the first error.
    pub fn try_from_fn<E>(
        mut f: impl FnMut(ControllerId) -> core::result::Result<T, E>,
    ) -> core::result::Result<Self, E> {
        Ok(Self {
            slots: [
                f(ControllerId::Gpio0)?,
                f(ControllerId::Gpio1)?,
                f(ControllerId::Gpio2)?,
                f(ControllerId::Gpio3)?,
            ],
        })
    }

    pub fn get(&self, id: ControllerId) -> &T {
        &self.slots[id.index()]
    }

    pub fn get_mut(&mut self, id: ControllerId) -> &mut T {
        &mut self.slots[id.index()]
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ControllerId, &mut T)> {
        ControllerId::ALL.into_iter().zip(self.slots.iter_mut())
    }
}

// ---------------------------------------------------------------------------
// Pin decomposition
// ---------------------------------------------------------------------------

/// A validated (controller, line) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinAddress {
    pub controller: ControllerId,
    /// Line within the bank, 0..=31.
    pub line: u32,
}

impl PinAddress {
    /// Single-bit mask for this line in the bank's 32-bit registers.
    pub const fn mask(self) -> u32 {
        1 << self.line
    }
}

/// Split a flat pin index into its bank and line.
///
/// Fails with [`Status::BadRequest`] for anything above 127.
pub fn decompose(flat_pin: Word) -> Result<PinAddress> {
    if flat_pin > MAX_FLAT_PIN {
        return Err(Status::BadRequest);
    }
    let controller = ControllerId::from_index(flat_pin / PINS_PER_BANK).ok_or(Status::BadRequest)?;
    Ok(PinAddress {
        controller,
        line: flat_pin % PINS_PER_BANK,
    })
}

// ---------------------------------------------------------------------------
// PWM channels
// ---------------------------------------------------------------------------

/// One of the two ePWM outputs of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PwmChannel {
    A = 0,
    B = 1,
}

impl PwmChannel {
    pub const ALL: [Self; 2] = [Self::A, Self::B];

    /// Decode a channel argument: 0 is A, 1 is B, anything else is rejected.
    pub fn from_word(word: Word) -> Result<Self> {
        match word {
            0 => Ok(Self::A),
            1 => Ok(Self::B),
            _ => Err(Status::BadRequest),
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }
}
