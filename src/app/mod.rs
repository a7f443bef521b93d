//! Application core: peripheral control logic behind port traits.
//!
//! The services here hold no platform code: register access flows through
//! [`ports::RegisterPort`], so the same logic runs against mapped hardware
//! and against the in-memory doubles in `adapters::sim`.

pub mod duty_cycle;
pub mod gpio_service;
pub mod ports;
pub mod pwm_service;
