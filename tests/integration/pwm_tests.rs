//! PWM server protocol tests: frequency and duty-cycle requests driven
//! through the dispatcher against a simulated PWM subsystem.

use am335x_periph::adapters::sim::SimRegisters;
use am335x_periph::adapters::sim_board::SimBoard;
use am335x_periph::addressing::PwmChannel;
use am335x_periph::app::pwm_service::{PwmOp, PwmService};
use am335x_periph::board::{EPWM_OFFSET, PWMSS0_PADDR};
use am335x_periph::config::ServerConfig;
use am335x_periph::drivers::ehrpwm::reg;
use am335x_periph::error::Status;
use am335x_periph::rpc::dispatcher::Dispatcher;
use am335x_periph::startup;

use crate::mock_hw::{BADGE, Client};

const OWNER: Client = Client { badge: BADGE, caller: 3 };

fn server() -> (Dispatcher<PwmService<SimRegisters>>, SimRegisters) {
    let mut board = SimBoard::am335x_pwm(0);
    let config = ServerConfig::from_args(["pwm".to_string(), "pwm0".to_string()]).unwrap();
    let pwm = startup::bring_up_pwm(&mut board, &config).unwrap();
    let regs = board.window(PWMSS0_PADDR).unwrap();
    let mut d = Dispatcher::new(BADGE, pwm);
    assert_eq!(d.handle(&OWNER.register()).status, Status::Ok);
    regs.clear_writes();
    (d, regs)
}

fn cmp(regs: &SimRegisters, channel: PwmChannel) -> u16 {
    let offset = match channel {
        PwmChannel::A => reg::CMPA,
        PwmChannel::B => reg::CMPB,
    };
    regs.peek16(EPWM_OFFSET + offset)
}

#[test]
fn duty_then_frequency_sets_threshold() {
    let (mut d, regs) = server();
    let duty = OWNER.call(PwmOp::SetDutyCycle.label(), &[0, 50]);
    assert_eq!(d.handle(&duty).status, Status::Ok);
    let freq = OWNER.call(PwmOp::SetFrequency.label(), &[1000]);
    assert_eq!(d.handle(&freq).status, Status::Ok);
    // round(0.5 * 100 MHz / 1 kHz)
    assert_eq!(cmp(&regs, PwmChannel::A), 50_000);
    assert_eq!(cmp(&regs, PwmChannel::B), 0);
}

#[test]
fn frequency_change_rewrites_both_channels() {
    let (mut d, regs) = server();
    d.handle(&OWNER.call(PwmOp::SetFrequency.label(), &[10_000]));
    d.handle(&OWNER.call(PwmOp::SetDutyCycle.label(), &[0, 20]));
    d.handle(&OWNER.call(PwmOp::SetDutyCycle.label(), &[1, 60]));
    assert_eq!((cmp(&regs, PwmChannel::A), cmp(&regs, PwmChannel::B)), (2_000, 6_000));

    d.handle(&OWNER.call(PwmOp::SetFrequency.label(), &[5_000]));
    assert_eq!(regs.peek16(EPWM_OFFSET + reg::TBPRD), 20_000);
    assert_eq!((cmp(&regs, PwmChannel::A), cmp(&regs, PwmChannel::B)), (4_000, 12_000));
}

#[test]
fn zero_frequency_leaves_compare_registers_unchanged() {
    let (mut d, regs) = server();
    d.handle(&OWNER.call(PwmOp::SetFrequency.label(), &[10_000]));
    d.handle(&OWNER.call(PwmOp::SetDutyCycle.label(), &[0, 50]));
    regs.clear_writes();

    assert_eq!(d.handle(&OWNER.call(PwmOp::SetFrequency.label(), &[0])).status, Status::Ok);
    assert_eq!(d.handle(&OWNER.call(PwmOp::SetDutyCycle.label(), &[1, 90])).status, Status::Ok);
    assert!(regs.writes().is_empty());
    assert_eq!(cmp(&regs, PwmChannel::A), 5_000);
    assert_eq!(d.peripheral().model().duty(PwmChannel::B), 90);
}

#[test]
fn invalid_channel_and_percent_rejected() {
    let (mut d, regs) = server();
    let l = PwmOp::SetDutyCycle.label();
    assert_eq!(d.handle(&OWNER.call(l, &[2, 10])).status, Status::BadRequest);
    assert_eq!(d.handle(&OWNER.call(l, &[0, 101])).status, Status::BadRequest);
    assert!(regs.writes().is_empty());
}

#[test]
fn payload_shape_and_authorization() {
    let (mut d, _) = server();
    let l = PwmOp::SetFrequency.label();
    assert_eq!(d.handle(&OWNER.call(l, &[])).status, Status::BadRequest);
    assert_eq!(d.handle(&OWNER.call(l, &[1, 2])).status, Status::BadRequest);
    assert_eq!(d.handle(&Client::new(4).call(l, &[1000])).status, Status::Unauthorized);
    assert_eq!(d.handle(&Client::new(4).register()).status, Status::Full);
    assert_eq!(d.handle(&OWNER.call(3, &[1])).status, Status::NotImplemented);
}
