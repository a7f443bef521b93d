//! Server bring-up and the listener thread.
//!
//! ```text
//!  main thread                         listener thread
//!  ───────────                         ───────────────
//!  load_config
//!  bring_up_gpio / bring_up_pwm
//!  serve ──spawn──────────────────────▶ publish protocol
//!    │                                  signal ready
//!    │                                  Dispatcher::run (forever)
//!    ◀──────────join──────────────────  transport failed
//!  ListenerExited
//! ```
//!
//! Everything here is fatal on failure: the caller logs the error and exits.

use std::fs;
use std::path::Path;
use std::thread;

use anyhow::Context;
use log::{error, info};

use crate::addressing::{ControllerId, ControllerMap};
use crate::app::gpio_service::GpioService;
use crate::app::ports::{DeviceFramePort, DirectoryPort};
use crate::app::pwm_service::PwmService;
use crate::board::{EPWM_OFFSET, GPIO_FRAMES, PWM_FRAMES};
use crate::config::{CONFIG_ENV_VAR, ServerConfig};
use crate::drivers::ehrpwm::EhrPwm;
use crate::drivers::gpio::GpioBank;
use crate::error::StartupError;
use crate::rpc::dispatcher::{Dispatcher, Peripheral};
use crate::rpc::transport::Transport;

// ── Configuration ─────────────────────────────────────────────

/// Parse process arguments and apply the override file named by
/// `PERIPH_CONFIG`, if set.
pub fn load_config<I>(args: I) -> anyhow::Result<ServerConfig>
where
    I: IntoIterator<Item = String>,
{
    let path = std::env::var_os(CONFIG_ENV_VAR);
    load_config_from(args, path.as_deref().map(Path::new))
}

pub fn load_config_from<I>(args: I, overrides: Option<&Path>) -> anyhow::Result<ServerConfig>
where
    I: IntoIterator<Item = String>,
{
    let config = ServerConfig::from_args(args)?;
    let Some(path) = overrides else {
        return Ok(config);
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading config overrides from {}", path.display()))?;
    let config = config
        .with_overrides_json(&text)
        .with_context(|| format!("applying config overrides from {}", path.display()))?;
    info!("config: overrides applied from {}", path.display());
    Ok(config)
}

// ── Controller bring-up ───────────────────────────────────────

/// Map all four GPIO banks and initialise each one.
pub fn bring_up_gpio<F: DeviceFramePort>(
    frames: &mut F,
) -> Result<GpioService<F::Window>, StartupError> {
    let mut banks = ControllerMap::try_from_fn(|id: ControllerId| {
        let frame = &GPIO_FRAMES[id.index()];
        frames
            .map(frame)
            .map(GpioBank::new)
            .map_err(|e| {
                error!("gpio: cannot map {id:?} at {:#010x}: {e}", frame.paddr);
                StartupError::MapFailed { paddr: frame.paddr }
            })
    })?;

    for (id, bank) in banks.iter_mut() {
        let paddr = GPIO_FRAMES[id.index()].paddr;
        bank.init().map_err(|e| {
            error!("gpio: {id:?}: {e}");
            StartupError::ResetTimeout { paddr }
        })?;
    }
    info!("gpio: {} banks ready", GPIO_FRAMES.len());
    Ok(GpioService::new(banks))
}

/// Probe the PWM subsystems in order, map the first one present and
/// initialise its ePWM block.
pub fn bring_up_pwm<F: DeviceFramePort>(
    frames: &mut F,
    config: &ServerConfig,
) -> Result<PwmService<F::Window>, StartupError> {
    let frame = PWM_FRAMES
        .into_iter()
        .find(|f| frames.find(f))
        .ok_or(StartupError::NoPwmController)?;
    let window = frames.map(&frame).map_err(|e| {
        error!("pwm: cannot map {:#010x}: {e}", frame.paddr);
        StartupError::MapFailed { paddr: frame.paddr }
    })?;
    info!(
        "pwm: using subsystem at {:#010x} (ePWM at {:#010x})",
        frame.paddr,
        frame.paddr + EPWM_OFFSET
    );

    let mut pwm = EhrPwm::new(window);
    pwm.init(config.tb_clk_hz, config.module_clk_hz);
    Ok(PwmService::new(pwm, config.tb_clk_hz))
}

// ── Listener ──────────────────────────────────────────────────

/// Publish the protocol, run the dispatcher on a dedicated thread and wait
/// for it.
///
/// Never returns under normal operation; the returned error says why the
/// server stopped.
pub fn serve<P, T, D>(config: &ServerConfig, peripheral: P, transport: T, directory: D) -> StartupError
where
    P: Peripheral + Send + 'static,
    T: Transport + Send + 'static,
    D: DirectoryPort + Send + 'static,
{
    let name = config.protocol_name.clone();
    let descriptor = config.descriptor();

    let spawned = thread::Builder::new()
        .name(format!("{}-listener", P::NAME))
        .spawn(move || {
            let mut directory = directory;
            let mut transport = transport;
            if let Err(e) = directory.publish(&name, &descriptor) {
                error!("{}: publishing '{name}' failed: {e}", P::NAME);
                return StartupError::PublishFailed;
            }
            directory.signal_ready();
            info!("{}: serving '{name}' (badge {:#x})", P::NAME, descriptor.badge);

            let mut dispatcher = Dispatcher::new(descriptor.badge, peripheral);
            let err = dispatcher.run(&mut transport);
            error!(
                "{}: transport failed after {} requests: {err}",
                P::NAME,
                dispatcher.served()
            );
            StartupError::ListenerExited
        });

    let handle = match spawned {
        Ok(handle) => handle,
        Err(e) => {
            error!("{}: cannot spawn listener: {e}", P::NAME);
            return StartupError::ThreadSpawn;
        }
    };

    handle.join().unwrap_or_else(|_| {
        error!("{}: listener panicked", P::NAME);
        StartupError::ListenerExited
    })
}
