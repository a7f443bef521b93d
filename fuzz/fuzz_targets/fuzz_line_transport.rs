//! Fuzz target: `LineTransport::reply_recv`
//!
//! Feeds arbitrary bytes as the transport's input stream and drains it.
//! Every line must end in either an envelope or a `BadRequest` reply
//! written back; the transport must never panic and must end with
//! `Closed` or an I/O error.
//!
//! cargo fuzz run fuzz_line_transport

#![no_main]

use am335x_periph::rpc::message::Reply;
use am335x_periph::rpc::transport::{LineTransport, Transport};
use am335x_periph::error::Status;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut transport = LineTransport::new(data, Vec::new());
    let mut reply = None;
    // Bounded: each successful receive consumes at least one line.
    for _ in 0..=data.len() {
        match transport.reply_recv(reply.take()) {
            Ok(_) => reply = Some(Reply::status(Status::Ok)),
            Err(_) => break,
        }
    }
});
