//! AM335x peripheral servers.
//!
//! Two single-tenant control servers, one for the GPIO banks and one for a
//! PWM subsystem, each serving exactly one registered client over a
//! capability-gated request/response protocol.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │   SimBoard / SimDirectory      LineTransport     MmioWindow    │
//! │   (DeviceFrame + Directory)    (Transport)       (RegisterPort)│
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │ rpc::Dispatcher ─ Handshake                            │    │
//! │  │      │                                                 │    │
//! │  │      ▼                                                 │    │
//! │  │ GpioService / PwmService ─ DutyCycleModel              │    │
//! │  │      │                                                 │    │
//! │  │      ▼                                                 │    │
//! │  │ drivers::gpio::GpioBank / drivers::ehrpwm::EhrPwm      │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```

#![deny(unused_must_use)]

pub mod adapters;
pub mod addressing;
pub mod app;
pub mod binding;
pub mod board;
pub mod config;
pub mod drivers;
pub mod error;
pub mod rpc;
pub mod startup;
