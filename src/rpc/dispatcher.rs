//! Request dispatcher: the server's main loop.
//!
//! Every message passes through a fixed gate sequence before any register is
//! touched:
//!
//! 1. **Badge**: the endpoint badge must match this protocol, else
//!    `NotImplemented`.
//! 2. **Label**: the registration label goes to the [`Handshake`]; unknown
//!    labels get `NotImplemented`.
//! 3. **Caller**: only the bound client may invoke operations, else
//!    `Unauthorized`.
//! 4. **Payload shape**: the declared payload must be exactly the operation's
//!    argument count, else `BadRequest`.
//!
//! [`Dispatcher::handle`] is the pure per-request step; [`Dispatcher::run`]
//! wraps it around a blocking [`Transport`] and only returns when the
//! transport fails.

use core::fmt;

use log::{debug, warn};

use crate::error::{Result, Status};

use super::handshake::Handshake;
use super::message::{Envelope, REGISTRATION_LABEL, Reply, ReplyPayload, Word};
use super::transport::Transport;

// ── Peripheral seam ──────────────────────────────────────────

/// A peripheral family served over the protocol (GPIO, PWM).
///
/// Implementors provide their operation table; the dispatcher owns the
/// shared authentication and validation logic.
pub trait Peripheral {
    /// Operation selector decoded from the request label.
    type Op: Copy + fmt::Debug;

    /// Family name used in log lines.
    const NAME: &'static str;

    /// Map a label to an operation, `None` if unknown.
    fn decode(label: Word) -> Option<Self::Op>;

    /// Exact number of payload words `op` takes.
    fn arg_count(op: Self::Op) -> usize;

    /// Run `op` on already-validated arguments.
    fn execute(&mut self, op: Self::Op, args: &[Word]) -> Result<ReplyPayload>;
}

// ── Dispatcher ───────────────────────────────────────────────

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    WaitingForRequest,
    Processing,
}

/// Owns all mutable server state: the handshake (and with it the bound
/// client) and the peripheral.
pub struct Dispatcher<P> {
    handshake: Handshake,
    peripheral: P,
    state: DispatchState,
    served: u64,
}

impl<P: Peripheral> Dispatcher<P> {
    pub fn new(badge: Word, peripheral: P) -> Self {
        Self {
            handshake: Handshake::new(badge),
            peripheral,
            state: DispatchState::WaitingForRequest,
            served: 0,
        }
    }

    /// Process one request and produce its reply.
    pub fn handle(&mut self, envelope: &Envelope) -> Reply {
        self.served += 1;
        let label = envelope.request.label;

        if envelope.badge != self.handshake.badge() {
            warn!("{}: badge {:#x} not recognised", P::NAME, envelope.badge);
            return Reply::status(Status::NotImplemented);
        }

        if label == REGISTRATION_LABEL {
            return match self.handshake.register(envelope) {
                Ok(token) => Reply::with_token(token),
                Err(e) => Reply::status(e.into()),
            };
        }

        let Some(op) = P::decode(label) else {
            warn!("{}: unknown label {label:#x}", P::NAME);
            return Reply::status(Status::NotImplemented);
        };

        match self.serve(op, envelope) {
            Ok(payload) => {
                debug!("{}[{}]: {op:?} ok", P::NAME, envelope.caller_id);
                Reply::ok_with(payload)
            }
            Err(status) => {
                warn!("{}[{}]: {op:?} -> {status}", P::NAME, envelope.caller_id);
                Reply::status(status)
            }
        }
    }

    fn serve(&mut self, op: P::Op, envelope: &Envelope) -> Result<ReplyPayload> {
        if !self.handshake.binding().is_bound_to(envelope.caller_id) {
            return Err(Status::Unauthorized);
        }
        let args = envelope.request.args(P::arg_count(op))?;
        self.peripheral.execute(op, args)
    }

    /// Serve requests until the transport fails, returning that failure.
    ///
    /// The reply to each request is delivered by the following
    /// `reply_recv`, so the loop holds at most one pending reply.
    pub fn run<T: Transport>(&mut self, transport: &mut T) -> T::Error {
        let mut pending: Option<Reply> = None;
        loop {
            self.state = DispatchState::WaitingForRequest;
            let envelope = match transport.reply_recv(pending.take()) {
                Ok(envelope) => envelope,
                Err(e) => return e,
            };
            self.state = DispatchState::Processing;
            pending = Some(self.handle(&envelope));
        }
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// Requests handled since startup.
    pub fn served(&self) -> u64 {
        self.served
    }

    pub fn handshake(&self) -> &Handshake {
        &self.handshake
    }

    pub fn peripheral(&self) -> &P {
        &self.peripheral
    }

    pub fn peripheral_mut(&mut self) -> &mut P {
        &mut self.peripheral
    }
}
