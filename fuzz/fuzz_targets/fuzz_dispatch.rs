//! Fuzz target: `Dispatcher::handle` (GPIO and PWM)
//!
//! Decodes the input into a stream of envelopes (badge, caller, label,
//! declared size, payload words) and drives them through both servers.
//! Asserts that nothing panics, that only the first registered caller is
//! ever served, and that replies never exceed the reply buffer.
//!
//! cargo fuzz run fuzz_dispatch

#![no_main]

use am335x_periph::adapters::sim_board::SimBoard;
use am335x_periph::config::ServerConfig;
use am335x_periph::error::Status;
use am335x_periph::rpc::dispatcher::Dispatcher;
use am335x_periph::rpc::message::{
    Envelope, MAX_REPLY_WORDS, MAX_REQUEST_WORDS, Metadata, REGISTRATION_LABEL, Reply, Request,
    RequestPayload, Word,
};
use am335x_periph::startup;
use libfuzzer_sys::fuzz_target;

const BADGE: Word = 0x100;

fn word(bytes: &[u8]) -> Word {
    let mut b = [0u8; 4];
    b[..bytes.len()].copy_from_slice(bytes);
    Word::from_le_bytes(b)
}

fn decode(data: &[u8]) -> Vec<Envelope> {
    let mut out = Vec::new();
    let mut rest = data;
    while rest.len() >= 4 {
        let (head, tail) = rest.split_at(4);
        // Small alphabets so interesting collisions happen often.
        let badge = if head[0] & 0x80 == 0 { BADGE } else { BADGE + 1 };
        let caller = Word::from(head[0] & 0x03);
        let label = match head[1] {
            0xFF => REGISTRATION_LABEL,
            l => Word::from(l % 8),
        };
        let declared = Word::from(head[2] % 40);
        let words = usize::from(head[3]) % (MAX_REQUEST_WORDS + 1);

        let take = (words * 4).min(tail.len());
        let payload: RequestPayload = tail[..take]
            .chunks(4)
            .map(word)
            .collect();
        rest = &tail[take..];

        out.push(Envelope {
            badge,
            caller_id: caller,
            request: Request {
                label,
                param: 0,
                metadata: Metadata::new(declared, 0),
                payload,
            },
        });
    }
    out
}

fn check(reply: &Reply, env: &Envelope, bound: Option<Word>) {
    assert!(reply.payload.len() <= MAX_REPLY_WORDS);
    if reply.status != Status::Ok {
        assert!(reply.token.is_none());
        assert!(reply.payload.is_empty());
        return;
    }
    assert_eq!(env.badge, BADGE);
    assert_eq!(bound, Some(env.caller_id));
    if env.request.label == REGISTRATION_LABEL {
        assert!(reply.token.is_some());
    }
}

fuzz_target!(|data: &[u8]| {
    let envelopes = decode(data);

    let mut gpio_board = SimBoard::am335x_gpio();
    let mut gpio = Dispatcher::new(BADGE, startup::bring_up_gpio(&mut gpio_board).unwrap());

    let config = ServerConfig::from_args(["fuzz".to_string(), "pwm".to_string()]).unwrap();
    let mut pwm_board = SimBoard::am335x_pwm(0);
    let mut pwm = Dispatcher::new(BADGE, startup::bring_up_pwm(&mut pwm_board, &config).unwrap());

    for env in &envelopes {
        let reply = gpio.handle(env);
        check(&reply, env, gpio.handshake().binding().bound());
        let reply = pwm.handle(env);
        check(&reply, env, pwm.handshake().binding().bound());
    }
});
