//! Port traits: the boundary between the control logic and the platform.
//!
//! ```text
//!   Platform adapter ──▶ Port trait ──▶ drivers / services (domain)
//! ```
//!
//! Driven adapters (register windows, device-frame mapping, the protocol
//! directory) implement these traits.  Drivers and services consume them via
//! generics, so the control logic never dereferences a raw address directly
//! and can run against the in-memory doubles in `adapters::sim`.
//!
//! The IPC transport port lives with the rest of the protocol stack in
//! [`rpc::transport`](crate::rpc::transport).

use core::fmt;

use crate::board::PAGE_SIZE;
use crate::rpc::message::Word;

// ───────────────────────────────────────────────────────────────
// Register port (driven adapter: domain → peripheral registers)
// ───────────────────────────────────────────────────────────────

/// Access to one mapped peripheral register window.
///
/// Offsets are byte offsets from the start of the window.  Implementations
/// must perform exactly one bus access per call (no caching, no merging), so
/// write-one-to-set/clear registers behave as the hardware expects.
pub trait RegisterPort {
    fn read32(&self, offset: usize) -> u32;

    fn write32(&mut self, offset: usize, value: u32);

    fn read16(&self, offset: usize) -> u16;

    fn write16(&mut self, offset: usize, value: u16);

    /// Read-modify-write: clear `clear` bits, then set `set` bits.
    fn modify32(&mut self, offset: usize, clear: u32, set: u32) {
        let value = (self.read32(offset) & !clear) | set;
        self.write32(offset, value);
    }

    /// 16-bit variant of [`modify32`](Self::modify32).
    fn modify16(&mut self, offset: usize, clear: u16, set: u16) {
        let value = (self.read16(offset) & !clear) | set;
        self.write16(offset, value);
    }
}

// ───────────────────────────────────────────────────────────────
// Device frames (driven adapter: physical → virtual mapping)
// ───────────────────────────────────────────────────────────────

/// A physical register frame handed to this process by the system
/// configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceFrame {
    pub paddr: usize,
    pub size: usize,
}

impl DeviceFrame {
    /// A single-page frame at `paddr`.
    pub const fn page(paddr: usize) -> Self {
        Self {
            paddr,
            size: PAGE_SIZE,
        }
    }
}

/// Resolves device frames into register windows.
pub trait DeviceFramePort {
    type Window: RegisterPort + Send + 'static;

    /// Whether `frame` was granted to this process.  Used for first-match
    /// probing when only one of several instances is present.
    fn find(&self, frame: &DeviceFrame) -> bool;

    /// Map `frame` read/write, uncached.
    fn map(&mut self, frame: &DeviceFrame) -> Result<Self::Window, MapError>;
}

// ───────────────────────────────────────────────────────────────
// Directory port (driven adapter: protocol publication)
// ───────────────────────────────────────────────────────────────

/// How a server advertises itself to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolDescriptor {
    /// Label a client must use to register.
    pub request_label: Word,
    /// Badge stamped on every message sent over this protocol.
    pub badge: Word,
    /// Message flags granted to clients (payload sending).
    pub flags: u8,
}

/// The system directory where servers publish named protocols.
pub trait DirectoryPort {
    fn publish(&mut self, name: &str, descriptor: &ProtocolDescriptor) -> Result<(), PublishError>;

    /// Tell the supervisor that initialisation is complete.
    fn signal_ready(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`DeviceFramePort::map`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapError {
    /// The frame was not granted to this process.
    NotFound,
    /// Mapping the frame into the address space failed.
    NoMemory,
}

/// Errors from [`DirectoryPort::publish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishError {
    /// A protocol with the same name already exists.
    Duplicate,
    /// The directory could not be reached.
    Unavailable,
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "frame not found"),
            Self::NoMemory => write!(f, "no virtual memory for mapping"),
        }
    }
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Duplicate => write!(f, "protocol already published"),
            Self::Unavailable => write!(f, "directory unavailable"),
        }
    }
}
