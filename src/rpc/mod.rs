//! Capability-gated request/response protocol shared by both servers.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        RPC Stack                             │
//! │                                                              │
//! │  ┌───────────┐   ┌────────────────────────────────────────┐  │
//! │  │ Transport │──▶│ Dispatcher                             │  │
//! │  │ (trait)   │   │  badge → label → caller → payload size │  │
//! │  └───────────┘   │        │                 │             │  │
//! │       ▲          │        ▼                 ▼             │  │
//! │       │          │   Handshake         Peripheral (trait) │  │
//! │       │          │   (bind, mint)      GPIO / PWM service │  │
//! │       │          └────────────────────────────────────────┘  │
//! │       └──────────── reply on next receive ◀──────┘           │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod dispatcher;
pub mod handshake;
pub mod message;
pub mod transport;
