//! Simulated board: device frames and protocol directory for host runs.
//!
//! [`SimBoard`] implements [`DeviceFramePort`] over a set of "granted"
//! frames, each backed by a [`SimRegisters`] page.  [`SimDirectory`]
//! implements [`DirectoryPort`] and records what was published so tests can
//! observe startup from outside the listener thread.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use log::info;

use crate::adapters::sim::SimRegisters;
use crate::app::ports::{
    DeviceFrame, DeviceFramePort, DirectoryPort, MapError, ProtocolDescriptor, PublishError,
};
use crate::board::{GPIO_FRAMES, PWM_FRAMES};

// ── Device frames ─────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct SimBoard {
    frames: BTreeMap<usize, SimRegisters>,
    directory: SimDirectory,
}

impl SimBoard {
    /// No frames granted.
    pub fn empty() -> Self {
        Self::default()
    }

    /// All four GPIO banks, each with the GPIO bank model.
    pub fn am335x_gpio() -> Self {
        GPIO_FRAMES
            .iter()
            .fold(Self::empty(), |board, frame| board.with_frame(frame, SimRegisters::gpio_bank()))
    }

    /// A single PWM subsystem, the `instance`-th candidate (0..=2).
    pub fn am335x_pwm(instance: usize) -> Self {
        match PWM_FRAMES.get(instance) {
            Some(frame) => Self::empty().with_frame(frame, SimRegisters::plain()),
            None => Self::empty(),
        }
    }

    pub fn with_frame(mut self, frame: &DeviceFrame, regs: SimRegisters) -> Self {
        self.frames.insert(frame.paddr, regs);
        self
    }

    pub fn without_frame(mut self, frame: &DeviceFrame) -> Self {
        self.frames.remove(&frame.paddr);
        self
    }

    /// Inspection handle for the page behind `paddr`.
    pub fn window(&self, paddr: usize) -> Option<SimRegisters> {
        self.frames.get(&paddr).cloned()
    }

    /// Directory handle sharing this board's publication record.
    pub fn directory(&self) -> SimDirectory {
        self.directory.clone()
    }
}

impl DeviceFramePort for SimBoard {
    type Window = SimRegisters;

    fn find(&self, frame: &DeviceFrame) -> bool {
        self.frames.contains_key(&frame.paddr)
    }

    fn map(&mut self, frame: &DeviceFrame) -> Result<SimRegisters, MapError> {
        self.frames.get(&frame.paddr).cloned().ok_or(MapError::NotFound)
    }
}

// ── Directory ─────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct SimDirectory {
    published: Arc<Mutex<Vec<(String, ProtocolDescriptor)>>>,
    ready: Arc<AtomicBool>,
}

impl SimDirectory {
    pub fn published(&self) -> Vec<(String, ProtocolDescriptor)> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn lookup(&self, name: &str) -> Option<ProtocolDescriptor> {
        self.published()
            .into_iter()
            .find_map(|(n, d)| (n == name).then_some(d))
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}

impl DirectoryPort for SimDirectory {
    fn publish(&mut self, name: &str, descriptor: &ProtocolDescriptor) -> Result<(), PublishError> {
        let mut published = self.published.lock().unwrap_or_else(PoisonError::into_inner);
        if published.iter().any(|(n, _)| n == name) {
            return Err(PublishError::Duplicate);
        }
        published.push((name.to_owned(), *descriptor));
        info!("directory(sim): published '{name}' badge={:#x}", descriptor.badge);
        Ok(())
    }

    fn signal_ready(&mut self) {
        self.ready.store(true, Ordering::Release);
    }
}
