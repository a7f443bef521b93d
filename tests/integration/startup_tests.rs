//! Bring-up and listener lifecycle: protocol publication, readiness, fatal
//! paths, and config override loading.

use std::fs;

use am335x_periph::adapters::sim::SimRegisters;
use am335x_periph::adapters::sim_board::SimBoard;
use am335x_periph::app::ports::PublishError;
use am335x_periph::board::{GPIO1_PADDR, PWM_FRAMES, PWMSS0_PADDR, PWMSS1_PADDR, PWMSS2_PADDR};
use am335x_periph::config::ServerConfig;
use am335x_periph::drivers::gpio::reg;
use am335x_periph::error::{StartupError, Status};
use am335x_periph::rpc::message::REGISTRATION_LABEL;
use am335x_periph::startup;

use crate::mock_hw::{Client, FlakyFrames, MockDirectory, ScriptedTransport};

fn config(name: &str) -> ServerConfig {
    ServerConfig::from_args(["server".to_string(), name.to_string()]).unwrap()
}

#[test]
fn listener_publishes_serves_and_reports_exit() {
    let cfg = config("am335x_gpio");
    let mut board = SimBoard::am335x_gpio();
    let gpio = startup::bring_up_gpio(&mut board).unwrap();
    let client = Client::new(11);
    let (transport, replies) = ScriptedTransport::new([
        client.register(),
        client.call(1, &[40, 1]),
        client.call(5, &[40, 1]),
        client.call(4, &[40]),
    ]);
    let directory = MockDirectory::default();

    let err = startup::serve(&cfg, gpio, transport, directory.clone());
    assert_eq!(err, StartupError::ListenerExited);

    let published = directory.published.lock().unwrap().clone();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0, "am335x_gpio");
    assert_eq!(published[0].1.request_label, REGISTRATION_LABEL);
    assert!(directory.is_ready());

    let replies = replies.lock().unwrap();
    assert_eq!(replies.len(), 4);
    assert!(replies.iter().all(|r| r.status == Status::Ok));
    assert_eq!(&replies[3].payload[..], &[1]);
    assert!(board.window(GPIO1_PADDR).unwrap().peek32(reg::DATAOUT) & (1 << 8) != 0);
}

#[test]
fn publish_failure_is_fatal() {
    let cfg = config("pwm");
    let mut board = SimBoard::am335x_pwm(0);
    let pwm = startup::bring_up_pwm(&mut board, &cfg).unwrap();
    let (transport, replies) = ScriptedTransport::empty();
    let directory = MockDirectory::failing(PublishError::Duplicate);

    assert_eq!(
        startup::serve(&cfg, pwm, transport, directory.clone()),
        StartupError::PublishFailed
    );
    assert!(!directory.is_ready());
    assert!(replies.lock().unwrap().is_empty());
}

#[test]
fn sim_directory_observes_publication() {
    let cfg = config("am335x_pwm");
    let mut board = SimBoard::am335x_pwm(0);
    let pwm = startup::bring_up_pwm(&mut board, &cfg).unwrap();
    let (transport, _) = ScriptedTransport::empty();
    let directory = board.directory();

    assert_eq!(
        startup::serve(&cfg, pwm, transport, board.directory()),
        StartupError::ListenerExited
    );
    assert!(directory.is_ready());
    assert_eq!(directory.lookup("am335x_pwm").map(|d| d.badge), Some(cfg.protocol_badge));
}

#[test]
fn pwm_probe_skips_absent_subsystems() {
    let mut frames = FlakyFrames::new(SimBoard::am335x_pwm(1));
    let svc = startup::bring_up_pwm(&mut frames, &config("pwm")).unwrap();
    assert!(svc.controller().clock_enabled());
    assert_eq!(frames.map_calls, 1);
    assert!(frames.board.window(PWMSS1_PADDR).is_some());
}

#[test]
fn pwm_probe_prefers_lowest_present_subsystem() {
    let board = SimBoard::empty()
        .with_frame(&PWM_FRAMES[2], SimRegisters::plain())
        .with_frame(&PWM_FRAMES[1], SimRegisters::plain());
    let mut frames = FlakyFrames::new(board);
    let svc = startup::bring_up_pwm(&mut frames, &config("pwm")).unwrap();
    assert!(svc.controller().clock_enabled());
    assert_eq!(frames.map_calls, 1);
    assert!(!frames.board.window(PWMSS1_PADDR).unwrap().writes().is_empty());
    assert!(frames.board.window(PWMSS2_PADDR).unwrap().writes().is_empty());
}

#[test]
fn pwm_map_failure_names_the_frame() {
    let board = SimBoard::am335x_pwm(0);
    let mut frames = FlakyFrames::new(board);
    frames.unmappable.push(PWMSS0_PADDR);
    assert_eq!(
        startup::bring_up_pwm(&mut frames, &config("pwm")).err(),
        Some(StartupError::MapFailed { paddr: PWM_FRAMES[0].paddr })
    );
}

#[test]
fn gpio_map_failure_stops_at_first_bank() {
    let mut frames = FlakyFrames::new(SimBoard::am335x_gpio());
    frames.unmappable.push(GPIO1_PADDR);
    assert_eq!(
        startup::bring_up_gpio(&mut frames).err(),
        Some(StartupError::MapFailed { paddr: GPIO1_PADDR })
    );
    assert_eq!(frames.map_calls, 2);
}

#[test]
fn config_overrides_loaded_from_file() {
    let path = std::env::temp_dir().join(format!("am335x-periph-{}.json", std::process::id()));
    fs::write(&path, r#"{"protocol_badge": 4096}"#).unwrap();
    let cfg = startup::load_config_from(
        ["server".to_string(), "gpio".to_string()],
        Some(path.as_path()),
    )
    .unwrap();
    fs::remove_file(&path).unwrap();
    assert_eq!(cfg.protocol_badge, 4096);
    assert_eq!(cfg.protocol_name, "gpio");
}

#[test]
fn argument_count_and_missing_file_are_fatal() {
    let err = startup::load_config_from(["server".to_string()], None).unwrap_err();
    assert_eq!(
        err.downcast_ref::<StartupError>(),
        Some(&StartupError::ArgumentCount { expected: 2, got: 1 })
    );

    let missing = std::env::temp_dir().join("am335x-periph-does-not-exist.json");
    assert!(
        startup::load_config_from(["s".to_string(), "n".to_string()], Some(missing.as_path())).is_err()
    );
}
