//! Unified error types for the peripheral servers.
//!
//! Two families, mirroring how failures are handled at runtime:
//!
//! - [`Status`] is what a request handler answers with.  Every variant other
//!   than [`Status::Ok`] is per-request and non-fatal: the dispatcher replies
//!   and keeps serving.
//! - [`StartupError`] covers everything that can go wrong before the dispatch
//!   loop starts (or when it unexpectedly stops).  These abort the process.
//!
//! All variants are `Copy` so they can be passed through handlers without
//! allocation.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::rpc::message::Word;

// ---------------------------------------------------------------------------
// Wire status
// ---------------------------------------------------------------------------

/// Result code carried in the label of every reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum Status {
    Ok = 0,
    /// Badge or label not recognised by this protocol.
    NotImplemented = 1,
    /// Malformed payload or out-of-range argument.
    BadRequest = 2,
    /// Caller is not the bound client.
    Unauthorized = 3,
    /// A second, distinct client tried to register.
    Full = 4,
}

impl Status {
    /// Numeric code placed in the reply label.
    pub const fn code(self) -> Word {
        self as Word
    }

    /// Inverse of [`code`](Self::code).
    pub fn from_code(code: Word) -> Option<Self> {
        match code {
            0 => Some(Self::Ok),
            1 => Some(Self::NotImplemented),
            2 => Some(Self::BadRequest),
            3 => Some(Self::Unauthorized),
            4 => Some(Self::Full),
            _ => None,
        }
    }

    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::NotImplemented => write!(f, "not implemented"),
            Self::BadRequest => write!(f, "bad request"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::Full => write!(f, "full"),
        }
    }
}

impl embedded_hal::pwm::Error for Status {
    fn kind(&self) -> embedded_hal::pwm::ErrorKind {
        embedded_hal::pwm::ErrorKind::Other
    }
}

/// Handler-level result: `Err` carries the status to reply with.
pub type Result<T> = core::result::Result<T, Status>;

// ---------------------------------------------------------------------------
// Handshake errors
// ---------------------------------------------------------------------------

/// Reasons a registration attempt is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterError {
    /// The message did not arrive under this server's protocol badge.
    ProtocolMismatch,
    /// Null caller identity, or a payload was attached.
    BadRequest,
    /// Another client is already bound.
    Full,
}

impl fmt::Display for RegisterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProtocolMismatch => write!(f, "protocol badge mismatch"),
            Self::BadRequest => write!(f, "malformed registration"),
            Self::Full => write!(f, "another client is already bound"),
        }
    }
}

impl From<RegisterError> for Status {
    fn from(e: RegisterError) -> Self {
        match e {
            RegisterError::ProtocolMismatch => Self::NotImplemented,
            RegisterError::BadRequest => Self::BadRequest,
            RegisterError::Full => Self::Full,
        }
    }
}

// ---------------------------------------------------------------------------
// Fatal startup errors
// ---------------------------------------------------------------------------

/// Failures that stop the server before (or instead of) serving requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupError {
    /// Wrong number of process arguments.
    ArgumentCount { expected: usize, got: usize },
    /// Configuration failed validation.
    Config(&'static str),
    /// A required register window could not be mapped.
    MapFailed { paddr: usize },
    /// None of the candidate PWM subsystems is present.
    NoPwmController,
    /// A GPIO bank never reported reset completion.
    ResetTimeout { paddr: usize },
    /// The protocol could not be published in the directory.
    PublishFailed,
    /// The listener thread could not be created.
    ThreadSpawn,
    /// The dispatch loop returned.
    ListenerExited,
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArgumentCount { expected, got } => {
                write!(f, "unexpected argument count (expected {expected}, got {got})")
            }
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::MapFailed { paddr } => write!(f, "failed to map device frame {paddr:#010x}"),
            Self::NoPwmController => write!(f, "failed to map a PWM controller"),
            Self::ResetTimeout { paddr } => {
                write!(f, "controller at {paddr:#010x} did not complete soft reset")
            }
            Self::PublishFailed => write!(f, "failed to publish protocol"),
            Self::ThreadSpawn => write!(f, "failed to create listener thread"),
            Self::ListenerExited => write!(f, "listener exited unexpectedly"),
        }
    }
}

impl std::error::Error for StartupError {}
