//! AM335x PWM server.
//!
//! Usage: `pwm-server <protocol-name>`
//!
//! The host build simulates PWMSS0 only; set `PERIPH_CONFIG` to a JSON file
//! to override the badge or clocks.

use std::io::{self, BufReader};

use anyhow::{Context, Result, anyhow};
use log::{error, info};

use am335x_periph::adapters::sim_board::SimBoard;
use am335x_periph::rpc::transport::LineTransport;
use am335x_periph::startup;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("╔══════════════════════════════════════╗");
    info!("║  AM335x PWM server v{}            ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = startup::load_config(std::env::args()).context("invalid startup arguments")?;

    let mut board = SimBoard::am335x_pwm(0);
    let pwm = startup::bring_up_pwm(&mut board, &config).context("PWM bring-up failed")?;

    let transport = LineTransport::new(BufReader::new(io::stdin()), io::stdout());
    let err = startup::serve(&config, pwm, transport, board.directory());

    error!("AM335x PWM server exited unexpectedly: {err}");
    Err(anyhow!(err)).context("AM335x PWM server exited unexpectedly")
}
