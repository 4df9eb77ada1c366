use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serial_session::SerialConfig;

// =============================================================================
// File config (figment-deserialized from defaults / irriga.toml / env vars)
// =============================================================================
//
//   irriga.toml:   [serial]
//                  path = "/dev/ttyUSB0"
//
//   env var:       IRRIGA_SERIAL__PATH=/dev/ttyUSB0   (double underscore = nesting)

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "irriga.toml";

/// Top-level tunable configuration, deserialized by figment.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub panel: PanelFileConfig,
}

/// Panel tunables (lives under `[panel]` in irriga.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PanelFileConfig {
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
    /// Hold partial lines until their newline arrives
    #[serde(default = "default_reassemble_lines")]
    pub reassemble_lines: bool,
    /// Valve time used by `/irrigate <plant>` without a duration
    #[serde(default = "default_irrigation_secs")]
    pub default_irrigation_secs: u32,
    #[serde(default = "default_color")]
    pub color: bool,
}

impl Default for PanelFileConfig {
    fn default() -> Self {
        Self {
            log_capacity: default_log_capacity(),
            reassemble_lines: default_reassemble_lines(),
            default_irrigation_secs: default_irrigation_secs(),
            color: default_color(),
        }
    }
}

fn default_log_capacity() -> usize {
    irrigation_protocol::DEFAULT_LOG_CAPACITY
}
fn default_reassemble_lines() -> bool {
    true
}
fn default_irrigation_secs() -> u32 {
    5
}
fn default_color() -> bool {
    true
}

/// Build a figment that layers: defaults → config file → IRRIGA_* env vars.
///
/// Env vars use double-underscore for nesting into sections:
///   `IRRIGA_SERIAL__BAUD_RATE=9600`  →  `serial.baud_rate = 9600`
///   `IRRIGA_PANEL__COLOR=false`      →  `panel.color = false`
pub fn load_config(config_file: &Path) -> figment::Figment {
    use figment::{
        Figment,
        providers::{Env, Format, Serialized, Toml},
    };

    Figment::from(Serialized::defaults(FileConfig::default()))
        .merge(Toml::file(config_file))
        .merge(Env::prefixed("IRRIGA_").split("__"))
}

/// Extract the layered config. CLI overrides are applied by the caller.
pub fn resolve(config_file: &Path) -> Result<FileConfig> {
    load_config(config_file)
        .extract()
        .with_context(|| format!("Invalid configuration in {}", config_file.display()))
}

// =============================================================================
// Runtime view
// =============================================================================

/// Panel behavior knobs, derived from [`PanelFileConfig`].
#[derive(Clone, Debug)]
pub struct PanelOptions {
    pub log_capacity: usize,
    pub reassemble_lines: bool,
}

impl Default for PanelOptions {
    fn default() -> Self {
        Self::from_file(&PanelFileConfig::default())
    }
}

impl PanelOptions {
    pub fn from_file(fc: &PanelFileConfig) -> Self {
        Self {
            log_capacity: fc.log_capacity,
            reassemble_lines: fc.reassemble_lines,
        }
    }
}
