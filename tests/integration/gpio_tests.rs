//! GPIO server protocol tests: registration, authorization, payload shape
//! and the five pin operations, driven through the dispatcher.

use am335x_periph::adapters::sim::SimRegisters;
use am335x_periph::adapters::sim_board::SimBoard;
use am335x_periph::app::gpio_service::{GpioOp, GpioService};
use am335x_periph::board::{GPIO0_PADDR, GPIO1_PADDR, GPIO3_PADDR};
use am335x_periph::drivers::gpio::reg;
use am335x_periph::error::Status;
use am335x_periph::rpc::dispatcher::Dispatcher;
use am335x_periph::rpc::message::Word;
use am335x_periph::startup;

use crate::mock_hw::{BADGE, Client};

const OWNER: Client = Client { badge: BADGE, caller: 7 };
const INTRUDER: Client = Client { badge: BADGE, caller: 8 };

fn server() -> (Dispatcher<GpioService<SimRegisters>>, SimBoard) {
    let mut board = SimBoard::am335x_gpio();
    let gpio = startup::bring_up_gpio(&mut board).unwrap();
    (Dispatcher::new(BADGE, gpio), board)
}

fn registered() -> (Dispatcher<GpioService<SimRegisters>>, SimBoard) {
    let (mut d, board) = server();
    let reply = d.handle(&OWNER.register());
    assert_eq!(reply.status, Status::Ok);
    assert!(reply.token.is_some());
    (d, board)
}

fn label(op: GpioOp) -> Word {
    op.label()
}

// ── Registration ──────────────────────────────────────────────

#[test]
fn first_registrant_binds_and_second_is_full() {
    let (mut d, _) = registered();
    assert_eq!(d.handle(&INTRUDER.register()).status, Status::Full);
    assert_eq!(d.handshake().binding().bound(), Some(OWNER.caller));
}

#[test]
fn re_registration_issues_fresh_token() {
    let (mut d, _) = server();
    let t1 = d.handle(&OWNER.register()).token.unwrap();
    let t2 = d.handle(&OWNER.register()).token.unwrap();
    assert_ne!(t1.serial, t2.serial);
    assert_eq!(t1.badge, BADGE);
}

#[test]
fn anonymous_registration_is_bad_request() {
    let (mut d, _) = server();
    assert_eq!(d.handle(&Client::new(0).register()).status, Status::BadRequest);
    assert_eq!(d.handshake().binding().bound(), None);
}

#[test]
fn wrong_badge_is_not_implemented() {
    let (mut d, _) = registered();
    let stranger = Client { badge: BADGE + 1, caller: OWNER.caller };
    assert_eq!(d.handle(&stranger.register()).status, Status::NotImplemented);
    assert_eq!(
        d.handle(&stranger.call(label(GpioOp::Read), &[0])).status,
        Status::NotImplemented
    );
}

// ── Authorization ─────────────────────────────────────────────

#[test]
fn every_operation_requires_the_bound_client() {
    let (mut d, board) = registered();
    let before = board.window(GPIO0_PADDR).unwrap().writes().len();
    let requests: [(GpioOp, &[Word]); 5] = [
        (GpioOp::ConfigurePin, &[1, 1]),
        (GpioOp::SetDebounce, &[1, 1]),
        (GpioOp::SetDebounceTiming, &[1, 4]),
        (GpioOp::Read, &[1]),
        (GpioOp::Write, &[1, 1]),
    ];
    for (op, args) in requests {
        assert_eq!(d.handle(&INTRUDER.call(label(op), args)).status, Status::Unauthorized, "{op:?}");
        // Shape is irrelevant when unauthorised.
        assert_eq!(d.handle(&INTRUDER.call(label(op), &[])).status, Status::Unauthorized, "{op:?}");
    }
    assert_eq!(board.window(GPIO0_PADDR).unwrap().writes().len(), before);
}

#[test]
fn operations_before_registration_are_unauthorized() {
    let (mut d, _) = server();
    assert_eq!(
        d.handle(&OWNER.call(label(GpioOp::Write), &[1, 1])).status,
        Status::Unauthorized
    );
    assert_eq!(
        d.handle(&Client::new(0).call(label(GpioOp::Read), &[1])).status,
        Status::Unauthorized
    );
}

// ── Payload shape ─────────────────────────────────────────────

#[test]
fn payload_length_must_match_exactly() {
    let (mut d, _) = registered();
    let l = label(GpioOp::ConfigurePin);
    assert_eq!(d.handle(&OWNER.call(l, &[1])).status, Status::BadRequest);
    assert_eq!(d.handle(&OWNER.call(l, &[1, 1, 1])).status, Status::BadRequest);
    assert_eq!(d.handle(&OWNER.call_declaring(l, &[1, 1], 7)).status, Status::BadRequest);
    assert_eq!(d.handle(&OWNER.call(l, &[1, 1])).status, Status::Ok);
}

#[test]
fn unknown_label_is_not_implemented() {
    let (mut d, _) = registered();
    assert_eq!(d.handle(&OWNER.call(0, &[])).status, Status::NotImplemented);
    assert_eq!(d.handle(&OWNER.call(6, &[1, 1])).status, Status::NotImplemented);
}

#[test]
fn pin_out_of_range_is_bad_request() {
    let (mut d, _) = registered();
    assert_eq!(
        d.handle(&OWNER.call(label(GpioOp::Write), &[128, 1])).status,
        Status::BadRequest
    );
    assert_eq!(
        d.handle(&OWNER.call(label(GpioOp::Read), &[Word::MAX])).status,
        Status::BadRequest
    );
}

// ── Pin operations ────────────────────────────────────────────

#[test]
fn write_read_loopback_over_protocol() {
    let (mut d, _) = registered();
    assert_eq!(d.handle(&OWNER.call(label(GpioOp::ConfigurePin), &[127, 1])).status, Status::Ok);
    assert_eq!(d.handle(&OWNER.call(label(GpioOp::Write), &[127, 1])).status, Status::Ok);
    let reply = d.handle(&OWNER.call(label(GpioOp::Read), &[127]));
    assert_eq!(reply.status, Status::Ok);
    assert_eq!(&reply.payload[..], &[1]);
    assert_eq!(reply.metadata().payload_size(), 4);

    d.handle(&OWNER.call(label(GpioOp::Write), &[127, 0]));
    let reply = d.handle(&OWNER.call(label(GpioOp::Read), &[127]));
    assert_eq!(&reply.payload[..], &[0]);
}

#[test]
fn input_pin_reads_external_level() {
    let (mut d, board) = registered();
    board.window(GPIO1_PADDR).unwrap().set_input_levels(1 << 2);
    d.handle(&OWNER.call(label(GpioOp::ConfigurePin), &[34, 0]));
    let reply = d.handle(&OWNER.call(label(GpioOp::Read), &[34]));
    assert_eq!(&reply.payload[..], &[1]);
}

#[test]
fn configure_output_twice_equals_once() {
    let (mut d, board) = registered();
    let regs = board.window(GPIO3_PADDR).unwrap();
    d.handle(&OWNER.call(label(GpioOp::ConfigurePin), &[100, 1]));
    let once = regs.peek32(reg::OE);
    d.handle(&OWNER.call(label(GpioOp::ConfigurePin), &[100, 1]));
    assert_eq!(regs.peek32(reg::OE), once);
    assert_eq!(once & (1 << 4), 0);
}

#[test]
fn debounce_enable_and_timing() {
    let (mut d, board) = registered();
    let regs = board.window(GPIO0_PADDR).unwrap();
    d.handle(&OWNER.call(label(GpioOp::SetDebounce), &[5, 1]));
    d.handle(&OWNER.call(label(GpioOp::SetDebounceTiming), &[5, 0x1FF]));
    assert_eq!(regs.peek32(reg::DEBOUNCENABLE), 1 << 5);
    assert_eq!(regs.peek32(reg::DEBOUNCINGTIME), 0xFF);
    d.handle(&OWNER.call(label(GpioOp::SetDebounce), &[5, 0]));
    assert_eq!(regs.peek32(reg::DEBOUNCENABLE), 0);
}
