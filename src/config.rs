//! Server configuration parameters
//!
//! Every server takes exactly one process argument: the name under which it
//! publishes its protocol.  The remaining parameters have board defaults and
//! can be overridden from a JSON file named by [`CONFIG_ENV_VAR`].

use serde::{Deserialize, Serialize};

use crate::app::ports::ProtocolDescriptor;
use crate::board::{PWM_MODULE_CLK_HZ, PWM_TB_CLK_HZ};
use crate::drivers::ehrpwm::MAX_TIMEBASE_DIVIDER;
use crate::error::StartupError;
use crate::rpc::message::{FLAG_SEND_PAYLOAD, REGISTRATION_LABEL, Word};

/// Environment variable naming an optional JSON override file.
pub const CONFIG_ENV_VAR: &str = "PERIPH_CONFIG";

/// Program name plus the protocol name.
pub const EXPECTED_ARGC: usize = 2;

/// Badge stamped on messages sent over a server's protocol.
pub const DEFAULT_PROTOCOL_BADGE: Word = 0x100;

/// Runtime configuration of one server process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Name the protocol is published under
    pub protocol_name: String,
    /// Badge clients' messages carry
    pub protocol_badge: Word,
    /// ePWM timebase (reference) clock in Hz
    pub tb_clk_hz: u32,
    /// PWMSS functional clock in Hz
    pub module_clk_hz: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            protocol_name: String::new(),
            protocol_badge: DEFAULT_PROTOCOL_BADGE,
            tb_clk_hz: PWM_TB_CLK_HZ,
            module_clk_hz: PWM_MODULE_CLK_HZ,
        }
    }
}

/// Fields an override file may set.  Absent fields keep their value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverrides {
    pub protocol_badge: Option<Word>,
    pub tb_clk_hz: Option<u32>,
    pub module_clk_hz: Option<u32>,
}

impl ServerConfig {
    /// Build the configuration from the process arguments.
    ///
    /// Anything other than exactly one argument after the program name is
    /// fatal.
    pub fn from_args<I>(args: I) -> Result<Self, StartupError>
    where
        I: IntoIterator<Item = String>,
    {
        let args: Vec<String> = args.into_iter().collect();
        if args.len() != EXPECTED_ARGC {
            return Err(StartupError::ArgumentCount {
                expected: EXPECTED_ARGC,
                got: args.len(),
            });
        }
        let config = Self {
            protocol_name: args[1].clone(),
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Apply a JSON override document and re-validate.
    pub fn with_overrides_json(mut self, json: &str) -> Result<Self, StartupError> {
        let overrides: ConfigOverrides =
            serde_json::from_str(json).map_err(|_| StartupError::Config("override file is not valid JSON"))?;
        self.apply(&overrides);
        self.validate()?;
        Ok(self)
    }

    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(badge) = overrides.protocol_badge {
            self.protocol_badge = badge;
        }
        if let Some(hz) = overrides.tb_clk_hz {
            self.tb_clk_hz = hz;
        }
        if let Some(hz) = overrides.module_clk_hz {
            self.module_clk_hz = hz;
        }
    }

    pub fn validate(&self) -> Result<(), StartupError> {
        if self.protocol_name.is_empty() {
            return Err(StartupError::Config("protocol name is empty"));
        }
        if self.protocol_badge == 0 {
            return Err(StartupError::Config("protocol badge must be non-zero"));
        }
        if self.tb_clk_hz == 0 {
            return Err(StartupError::Config("timebase clock must be non-zero"));
        }
        if self.module_clk_hz < self.tb_clk_hz {
            return Err(StartupError::Config("timebase clock exceeds module clock"));
        }
        if self.module_clk_hz / self.tb_clk_hz > MAX_TIMEBASE_DIVIDER {
            return Err(StartupError::Config("timebase clock below prescaler range"));
        }
        Ok(())
    }

    /// What gets published in the directory.
    pub fn descriptor(&self) -> ProtocolDescriptor {
        ProtocolDescriptor {
            request_label: REGISTRATION_LABEL,
            badge: self.protocol_badge,
            flags: FLAG_SEND_PAYLOAD,
        }
    }
}
