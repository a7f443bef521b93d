//! Request / reply message model.
//!
//! Every IPC carries three header words plus a payload that lives in the
//! shared transfer buffer:
//!
//! ```text
//! ┌──────────┬──────────┬────────────────────────────────────────┐
//! │ label    │ param    │ metadata                               │
//! │ op / rc  │ op arg   │ bits 0..16  payload length in bytes    │
//! │          │          │ bits 16..24 transferred token slot     │
//! └──────────┴──────────┴────────────────────────────────────────┘
//! ```
//!
//! The transport additionally supplies the caller identity and the protocol
//! badge of the endpoint the message arrived on.

use serde::{Deserialize, Serialize};

use crate::error::{Result, Status};

/// Machine word on the 32-bit AM335x.
pub type Word = u32;

/// Label a client uses to register with a server.
pub const REGISTRATION_LABEL: Word = Word::MAX;

/// Token flag: holder may attach a payload to its messages.
pub const FLAG_SEND_PAYLOAD: u8 = 0b0000_0001;

/// Slot where the server's own receive token is installed.
pub const RECEIVE_TOKEN_SLOT: u8 = 1;

/// Slot used to hand a freshly minted token back to a registering client.
pub const TRANSFER_TOKEN_SLOT: u8 = 2;

/// Capacity of the request payload buffer, in words.
pub const MAX_REQUEST_WORDS: usize = 8;

/// Capacity of the reply payload buffer, in words.
pub const MAX_REPLY_WORDS: usize = 4;

const WORD_BYTES: Word = 4;
const PAYLOAD_SIZE_MASK: Word = 0xFFFF;
const TOKEN_SLOT_SHIFT: u32 = 16;
const TOKEN_SLOT_MASK: Word = 0xFF;

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Packed metadata word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(pub Word);

impl Metadata {
    pub const fn new(payload_bytes: Word, token_slot: u8) -> Self {
        Self((payload_bytes & PAYLOAD_SIZE_MASK) | ((token_slot as Word) << TOKEN_SLOT_SHIFT))
    }

    /// Like [`new`](Self::new), but `None` when `payload_bytes` does not fit
    /// the 16-bit size field instead of truncating it.
    pub const fn try_new(payload_bytes: Word, token_slot: u8) -> Option<Self> {
        if payload_bytes > PAYLOAD_SIZE_MASK {
            return None;
        }
        Some(Self::new(payload_bytes, token_slot))
    }

    /// Metadata describing `words` payload words and no token.
    pub const fn for_words(words: usize) -> Self {
        Self::new(words as Word * WORD_BYTES, 0)
    }

    pub const fn payload_size(self) -> Word {
        self.0 & PAYLOAD_SIZE_MASK
    }

    pub const fn token_slot(self) -> u8 {
        ((self.0 >> TOKEN_SLOT_SHIFT) & TOKEN_SLOT_MASK) as u8
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

pub type RequestPayload = heapless::Vec<Word, MAX_REQUEST_WORDS>;

/// An incoming request as read from the transfer buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub label: Word,
    pub param: Word,
    pub metadata: Metadata,
    pub payload: RequestPayload,
}

impl Request {
    /// Build a request whose metadata matches its payload exactly.
    pub fn new(label: Word, args: &[Word]) -> Self {
        let mut payload = RequestPayload::new();
        let take = args.len().min(MAX_REQUEST_WORDS);
        // Cannot fail: `take` is bounded by capacity.
        let _ = payload.extend_from_slice(&args[..take]);
        Self {
            label,
            param: 0,
            metadata: Metadata::for_words(args.len()),
            payload,
        }
    }

    /// Return exactly `expected` argument words, or `BadRequest` if the
    /// declared payload size is anything other than `expected` words.
    pub fn args(&self, expected: usize) -> Result<&[Word]> {
        if self.metadata.payload_size() != expected as Word * WORD_BYTES {
            return Err(Status::BadRequest);
        }
        self.payload.get(..expected).ok_or(Status::BadRequest)
    }
}

/// A request together with the transport-supplied identity fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Protocol badge of the endpoint the message arrived on.
    pub badge: Word,
    /// Kernel-assigned identity of the sender; 0 means anonymous.
    pub caller_id: Word,
    pub request: Request,
}

// ---------------------------------------------------------------------------
// Capability token
// ---------------------------------------------------------------------------

/// A send capability minted for the registered client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CapabilityToken {
    pub badge: Word,
    pub flags: u8,
    /// Slot the token is transferred through.
    pub slot: u8,
    /// Monotonic issue number; every registration gets a new one.
    pub serial: u64,
}

// ---------------------------------------------------------------------------
// Reply
// ---------------------------------------------------------------------------

pub type ReplyPayload = heapless::Vec<Word, MAX_REPLY_WORDS>;

/// Outgoing reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub status: Status,
    pub param: Word,
    pub payload: ReplyPayload,
    pub token: Option<CapabilityToken>,
}

impl Reply {
    /// Bare status reply.
    pub fn status(status: Status) -> Self {
        Self {
            status,
            param: 0,
            payload: ReplyPayload::new(),
            token: None,
        }
    }

    pub fn ok() -> Self {
        Self::status(Status::Ok)
    }

    /// Successful reply carrying result words.
    pub fn ok_with(payload: ReplyPayload) -> Self {
        Self {
            payload,
            ..Self::ok()
        }
    }

    /// Successful reply transferring a capability.
    pub fn with_token(token: CapabilityToken) -> Self {
        Self {
            token: Some(token),
            ..Self::ok()
        }
    }

    /// Packed metadata as it goes on the wire.
    pub fn metadata(&self) -> Metadata {
        let slot = self.token.map_or(0, |t| t.slot);
        Metadata::new(self.payload.len() as Word * WORD_BYTES, slot)
    }
}
