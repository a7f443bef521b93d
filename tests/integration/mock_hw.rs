//! Mock platform adapters for integration tests.
//!
//! A scripted transport that replays envelopes and records every reply, a
//! directory that can be told to fail, a frame port with failure injection,
//! and a small client helper for building requests.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use am335x_periph::adapters::sim::SimRegisters;
use am335x_periph::adapters::sim_board::SimBoard;
use am335x_periph::app::ports::{
    DeviceFrame, DeviceFramePort, DirectoryPort, MapError, ProtocolDescriptor, PublishError,
};
use am335x_periph::rpc::message::{Envelope, Metadata, REGISTRATION_LABEL, Reply, Request, Word};
use am335x_periph::rpc::transport::Transport;

pub const BADGE: Word = 0x100;

// ── Client helper ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct Client {
    pub badge: Word,
    pub caller: Word,
}

#[allow(dead_code)]
impl Client {
    pub fn new(caller: Word) -> Self {
        Self { badge: BADGE, caller }
    }

    pub fn call(&self, label: Word, args: &[Word]) -> Envelope {
        Envelope {
            badge: self.badge,
            caller_id: self.caller,
            request: Request::new(label, args),
        }
    }

    /// Request whose declared payload size disagrees with its contents.
    pub fn call_declaring(&self, label: Word, args: &[Word], bytes: Word) -> Envelope {
        let mut env = self.call(label, args);
        env.request.metadata = Metadata::new(bytes, 0);
        env
    }

    pub fn register(&self) -> Envelope {
        self.call(REGISTRATION_LABEL, &[])
    }
}

// ── Scripted transport ────────────────────────────────────────

pub type ReplyLog = Arc<Mutex<Vec<Reply>>>;

#[derive(Debug)]
pub struct ScriptExhausted;

impl fmt::Display for ScriptExhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "script exhausted")
    }
}

pub struct ScriptedTransport {
    inbox: VecDeque<Envelope>,
    replies: ReplyLog,
}

impl ScriptedTransport {
    pub fn new(script: impl IntoIterator<Item = Envelope>) -> (Self, ReplyLog) {
        let replies = ReplyLog::default();
        let transport = Self {
            inbox: script.into_iter().collect(),
            replies: Arc::clone(&replies),
        };
        (transport, replies)
    }

    #[allow(dead_code)]
    pub fn empty() -> (Self, ReplyLog) {
        Self::new(Vec::new())
    }
}

impl Transport for ScriptedTransport {
    type Error = ScriptExhausted;

    fn reply_recv(&mut self, reply: Option<Reply>) -> Result<Envelope, ScriptExhausted> {
        if let Some(reply) = reply {
            self.replies.lock().unwrap().push(reply);
        }
        self.inbox.pop_front().ok_or(ScriptExhausted)
    }
}

// ── Directory ─────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockDirectory {
    pub fail_with: Option<PublishError>,
    pub published: Arc<Mutex<Vec<(String, ProtocolDescriptor)>>>,
    pub ready: Arc<AtomicBool>,
}

#[allow(dead_code)]
impl MockDirectory {
    pub fn failing(e: PublishError) -> Self {
        Self {
            fail_with: Some(e),
            ..Self::default()
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

impl DirectoryPort for MockDirectory {
    fn publish(&mut self, name: &str, descriptor: &ProtocolDescriptor) -> Result<(), PublishError> {
        if let Some(e) = self.fail_with {
            return Err(e);
        }
        self.published.lock().unwrap().push((name.to_owned(), *descriptor));
        Ok(())
    }

    fn signal_ready(&mut self) {
        self.ready.store(true, Ordering::SeqCst);
    }
}

// ── Frames with failure injection ─────────────────────────────

pub struct FlakyFrames {
    pub board: SimBoard,
    /// Frames that `find` reports but `map` refuses.
    pub unmappable: Vec<usize>,
    pub map_calls: usize,
}

#[allow(dead_code)]
impl FlakyFrames {
    pub fn new(board: SimBoard) -> Self {
        Self {
            board,
            unmappable: Vec::new(),
            map_calls: 0,
        }
    }
}

impl DeviceFramePort for FlakyFrames {
    type Window = SimRegisters;

    fn find(&self, frame: &DeviceFrame) -> bool {
        self.board.find(frame)
    }

    fn map(&mut self, frame: &DeviceFrame) -> Result<SimRegisters, MapError> {
        self.map_calls += 1;
        if self.unmappable.contains(&frame.paddr) {
            return Err(MapError::NoMemory);
        }
        self.board.map(frame)
    }
}
