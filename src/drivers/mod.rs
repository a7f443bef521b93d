//! Peripheral register drivers and the memory-mapped register backend.

pub mod ehrpwm;
pub mod gpio;
pub mod mmio;
