//! Transport abstraction: the blocking reply-then-receive primitive.
//!
//! On the target this is the kernel's combined reply/receive call on the
//! server endpoint: the reply for the previous caller and the wait for the
//! next request happen in one blocking step.  The dispatcher is generic over
//! `Transport`, so the protocol logic never touches the kernel directly.
//!
//! Concrete implementations:
//! - [`LineTransport`]: one JSON request per input line, one JSON reply per
//!   output line.  Drives the servers on a development host.

use core::fmt;
use std::io::{self, BufRead, Read, Write};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::Status;

use super::message::{CapabilityToken, Envelope, Metadata, Reply, Request, RequestPayload, Word};

/// Blocking request/response channel.
pub trait Transport {
    type Error: fmt::Debug + fmt::Display;

    /// Send `reply` to the caller of the previous request (if any), then block
    /// until the next request arrives.
    fn reply_recv(&mut self, reply: Option<Reply>) -> Result<Envelope, Self::Error>;
}

// ── JSON-lines transport ─────────────────────────────────────

/// Request as written on one input line.
///
/// `payload_bytes` overrides the size declared in the metadata; when absent it
/// matches the payload exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireRequest {
    pub badge: Word,
    pub caller: Word,
    pub label: Word,
    #[serde(default)]
    pub param: Word,
    #[serde(default)]
    pub payload: Vec<Word>,
    #[serde(default)]
    pub payload_bytes: Option<Word>,
}

impl WireRequest {
    fn into_envelope(self) -> Result<Envelope, Status> {
        let payload = RequestPayload::from_slice(&self.payload).map_err(|()| Status::BadRequest)?;
        let declared = self.payload_bytes.unwrap_or(self.payload.len() as Word * 4);
        let metadata = Metadata::try_new(declared, 0).ok_or_else(|| {
            warn!("transport: declared payload size {declared} exceeds the size field");
            Status::BadRequest
        })?;
        Ok(Envelope {
            badge: self.badge,
            caller_id: self.caller,
            request: Request {
                label: self.label,
                param: self.param,
                metadata,
                payload,
            },
        })
    }
}

/// Reply as written on one output line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireReply {
    pub code: Word,
    pub status: Status,
    pub param: Word,
    pub metadata: Word,
    pub payload: Vec<Word>,
    pub token: Option<CapabilityToken>,
}

impl From<&Reply> for WireReply {
    fn from(reply: &Reply) -> Self {
        Self {
            code: reply.status.code(),
            status: reply.status,
            param: reply.param,
            metadata: reply.metadata().0,
            payload: reply.payload.to_vec(),
            token: reply.token,
        }
    }
}

/// Longest accepted request line, newline included.
pub const MAX_LINE_BYTES: usize = 1024;

/// Errors that end a [`LineTransport`].
#[derive(Debug)]
pub enum LineTransportError {
    /// Input reached end of file.
    Closed,
    Io(io::Error),
}

impl fmt::Display for LineTransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "input closed"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl From<io::Error> for LineTransportError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// JSON-lines transport over any reader/writer pair (stdin/stdout on host).
///
/// Lines that are too long, not UTF-8, or do not parse as a
/// [`WireRequest`] are answered with `BadRequest` directly and never reach
/// the dispatcher.
pub struct LineTransport<R, W> {
    input: R,
    output: W,
    line: Vec<u8>,
}

impl<R: BufRead, W: Write> LineTransport<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            line: Vec::new(),
        }
    }

    pub fn into_inner(self) -> (R, W) {
        (self.input, self.output)
    }

    fn send(&mut self, reply: &Reply) -> Result<(), LineTransportError> {
        let wire = WireReply::from(reply);
        let text = serde_json::to_string(&wire)
            .map_err(|e| LineTransportError::Io(io::Error::new(io::ErrorKind::InvalidData, e.to_string())))?;
        writeln!(self.output, "{text}")?;
        self.output.flush()?;
        Ok(())
    }
}

impl<R: BufRead, W: Write> Transport for LineTransport<R, W> {
    type Error = LineTransportError;

    fn reply_recv(&mut self, reply: Option<Reply>) -> Result<Envelope, Self::Error> {
        if let Some(reply) = reply {
            self.send(&reply)?;
        }

        loop {
            self.line.clear();
            let read = (&mut self.input)
                .take(MAX_LINE_BYTES as u64)
                .read_until(b'\n', &mut self.line)?;
            if read == 0 {
                return Err(LineTransportError::Closed);
            }
            if read == MAX_LINE_BYTES && self.line.last() != Some(&b'\n') {
                self.input.skip_until(b'\n')?;
                warn!("transport: request line longer than {MAX_LINE_BYTES} bytes");
                self.send(&Reply::status(Status::BadRequest))?;
                continue;
            }

            let parsed = match core::str::from_utf8(&self.line) {
                Ok(text) if text.trim().is_empty() => continue,
                Ok(text) => serde_json::from_str::<WireRequest>(text.trim())
                    .map_err(|e| {
                        warn!("transport: unparsable request ({e})");
                        Status::BadRequest
                    })
                    .and_then(WireRequest::into_envelope),
                Err(e) => {
                    warn!("transport: request is not UTF-8 ({e})");
                    Err(Status::BadRequest)
                }
            };

            match parsed {
                Ok(envelope) => {
                    debug!(
                        "transport: label={:#x} caller={} badge={:#x}",
                        envelope.request.label, envelope.caller_id, envelope.badge
                    );
                    return Ok(envelope);
                }
                Err(status) => self.send(&Reply::status(status))?,
            }
        }
    }
}
