//! Client registration handshake.
//!
//! A server accepts exactly one client for its whole lifetime:
//!
//! 1. Client sends the registration label over the published protocol.
//! 2. Server checks the badge, rejects the anonymous identity, and refuses
//!    anyone but the already-bound client (`Full`).
//! 3. The caller is bound with a single compare-and-set and receives a freshly
//!    minted send token for the protocol.
//!
//! Re-registration by the bound client is accepted and yields a new token;
//! the binding itself never changes.

use core::sync::atomic::{AtomicU32, Ordering};

use log::{info, warn};

use crate::error::RegisterError;

use super::message::{CapabilityToken, Envelope, FLAG_SEND_PAYLOAD, TRANSFER_TOKEN_SLOT, Word};

/// Identity value meaning "no client".
pub const UNBOUND: Word = 0;

/// Registration takes no arguments.
const REGISTRATION_ARGS: usize = 0;

// ── Single-assignment binding ────────────────────────────────

/// The bound client identity.  Transitions once from [`UNBOUND`] to a
/// non-zero caller id and is never cleared.
#[derive(Debug, Default)]
pub struct ClientBinding {
    bound: AtomicU32,
}

impl ClientBinding {
    pub const fn new() -> Self {
        Self {
            bound: AtomicU32::new(UNBOUND),
        }
    }

    /// The bound caller, if any.
    pub fn bound(&self) -> Option<Word> {
        match self.bound.load(Ordering::Acquire) {
            UNBOUND => None,
            id => Some(id),
        }
    }

    /// True only for the non-zero caller that holds the binding.
    pub fn is_bound_to(&self, caller_id: Word) -> bool {
        caller_id != UNBOUND && self.bound.load(Ordering::Acquire) == caller_id
    }

    /// Bind `caller_id` if nobody is bound yet.
    ///
    /// Succeeds when the binding now holds `caller_id` (fresh or already
    /// bound); otherwise returns the identity that owns it.
    pub fn try_bind(&self, caller_id: Word) -> Result<(), Word> {
        debug_assert_ne!(caller_id, UNBOUND);
        match self
            .bound
            .compare_exchange(UNBOUND, caller_id, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => Ok(()),
            Err(current) if current == caller_id => Ok(()),
            Err(current) => Err(current),
        }
    }
}

// ── Handshake state ──────────────────────────────────────────

/// Registration state of one server: its badge, the binding, and the token
/// serial counter.
#[derive(Debug)]
pub struct Handshake {
    badge: Word,
    binding: ClientBinding,
    next_serial: u64,
}

impl Handshake {
    pub fn new(badge: Word) -> Self {
        Self {
            badge,
            binding: ClientBinding::new(),
            next_serial: 1,
        }
    }

    pub fn badge(&self) -> Word {
        self.badge
    }

    pub fn binding(&self) -> &ClientBinding {
        &self.binding
    }

    /// Process a registration request.
    pub fn register(&mut self, envelope: &Envelope) -> Result<CapabilityToken, RegisterError> {
        let caller_id = envelope.caller_id;

        if envelope.badge != self.badge {
            warn!("register: badge {:#x} does not match protocol", envelope.badge);
            return Err(RegisterError::ProtocolMismatch);
        }
        if caller_id == UNBOUND {
            warn!("register: anonymous caller rejected");
            return Err(RegisterError::BadRequest);
        }
        if let Some(owner) = self.binding.bound() {
            if owner != caller_id {
                warn!("register: caller {caller_id} refused, already bound to {owner}");
                return Err(RegisterError::Full);
            }
        }
        if envelope.request.args(REGISTRATION_ARGS).is_err() {
            warn!("register: caller {caller_id} sent a payload");
            return Err(RegisterError::BadRequest);
        }

        let token = self.mint();
        if let Err(owner) = self.binding.try_bind(caller_id) {
            warn!("register: caller {caller_id} lost binding race to {owner}");
            return Err(RegisterError::Full);
        }

        info!("register: client {caller_id} bound (token serial {})", token.serial);
        Ok(token)
    }

    fn mint(&mut self) -> CapabilityToken {
        let serial = self.next_serial;
        self.next_serial = self.next_serial.wrapping_add(1);
        CapabilityToken {
            badge: self.badge,
            flags: FLAG_SEND_PAYLOAD,
            slot: TRANSFER_TOKEN_SLOT,
            serial,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────
