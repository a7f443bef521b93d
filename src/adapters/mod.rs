//! Adapters: concrete implementations of the platform port traits.
//!
//! | Adapter      | Implements         | Connects to                  |
//! |--------------|--------------------|------------------------------|
//! | `sim`        | RegisterPort       | In-memory register page      |
//! | `sim_board`  | DeviceFramePort    | Simulated granted frames     |
//! |              | DirectoryPort      | In-process protocol registry |
//!
//! The memory-mapped [`RegisterPort`](crate::app::ports::RegisterPort) lives
//! in [`drivers::mmio`](crate::drivers::mmio); the JSON-lines transport in
//! [`rpc::transport`](crate::rpc::transport).

pub mod sim;
pub mod sim_board;
