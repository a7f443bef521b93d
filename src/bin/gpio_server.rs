//! AM335x GPIO server.
//!
//! Usage: `gpio-server <protocol-name>`
//!
//! On the host the four banks are simulated and requests arrive as JSON
//! lines on stdin; replies go to stdout.  Logging goes to stderr
//! (`RUST_LOG` selects the level).

use std::io::{self, BufReader};

use anyhow::{Context, Result, anyhow};
use log::{error, info};

use am335x_periph::adapters::sim_board::SimBoard;
use am335x_periph::rpc::transport::LineTransport;
use am335x_periph::startup;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("╔══════════════════════════════════════╗");
    info!("║  AM335x GPIO server v{}           ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = startup::load_config(std::env::args()).context("invalid startup arguments")?;

    let mut board = SimBoard::am335x_gpio();
    let gpio = startup::bring_up_gpio(&mut board).context("GPIO bring-up failed")?;

    let transport = LineTransport::new(BufReader::new(io::stdin()), io::stdout());
    let err = startup::serve(&config, gpio, transport, board.directory());

    error!("AM335x GPIO server exited unexpectedly: {err}");
    Err(anyhow!(err)).context("AM335x GPIO server exited unexpectedly")
}
