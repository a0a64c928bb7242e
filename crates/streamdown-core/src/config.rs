//! User settings: the emergency banner, error suppression, history size,
//! logging and render width. Stored as TOML in `config.toml` under the
//! streamdown home; every key is optional.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::stream::{DEFAULT_EMERGENCY_BANNER, DEFAULT_SUPPRESSED_ERROR_MARKER, StreamPolicy};

/// Commented copy of every setting at its built-in value.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! `STREAMDOWN_HOME` overrides the default `~/.config/streamdown`.

    use std::path::PathBuf;

    /// Falls back to `./.streamdown` when no home directory can be found.
    pub fn streamdown_home() -> PathBuf {
        if let Ok(home) = std::env::var("STREAMDOWN_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".streamdown"),
            |h| h.join(".config").join("streamdown"),
        )
    }

    pub fn config_path() -> PathBuf {
        streamdown_home().join("config.toml")
    }
}

/// Rendering options for the plain-text renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Column width used for wrapping and rules.
    pub width: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: Config::DEFAULT_RENDER_WIDTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Markdown prepended to a reply once the server flags an emergency.
    pub emergency_banner: String,
    /// Error messages containing this text end the stream quietly.
    /// Empty disables suppression.
    pub suppressed_error_marker: String,
    /// Number of prior messages sent with an outbound chat request.
    pub history_limit: usize,
    /// Write logs to this file instead of stderr.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            emergency_banner: DEFAULT_EMERGENCY_BANNER.to_string(),
            suppressed_error_marker: DEFAULT_SUPPRESSED_ERROR_MARKER.to_string(),
            history_limit: Self::DEFAULT_HISTORY_LIMIT,
            log_file: None,
            render: RenderConfig::default(),
        }
    }
}

impl Config {
    pub const DEFAULT_HISTORY_LIMIT: usize = 10;
    const DEFAULT_RENDER_WIDTH: usize = 80;
    const MIN_RENDER_WIDTH: usize = 20;

    /// Reads `config.toml` under the streamdown home.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// A missing file means every setting keeps its built-in value.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Config::default()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Failed to read config from {}", path.display()));
            }
        };
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Writes the commented template. Refuses to touch an existing file.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    pub fn stream_policy(&self) -> StreamPolicy {
        StreamPolicy::new(&self.emergency_banner, &self.suppressed_error_marker)
    }

    /// Render width, never narrower than a usable minimum.
    pub fn render_width(&self) -> usize {
        self.render.width.max(Self::MIN_RENDER_WIDTH)
    }

    /// The file only appears once its content is fully on disk.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let staging = path.with_extension("toml.partial");
        fs::write(&staging, content)
            .with_context(|| format!("Failed to write config to {}", staging.display()))?;
        fs::rename(&staging, path)
            .with_context(|| format!("Failed to move config into place at {}", path.display()))
    }
}
