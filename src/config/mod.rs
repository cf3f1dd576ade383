//! Configuration management for slop
//!
//! Settings are read from a TOML file (by default
//! `~/.config/slop/slop.toml`). Every section is optional; missing keys take
//! the built-in defaults and command-line flags override whatever the file
//! says.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::rectangle::Color;
use crate::selection::DEFAULT_FORMAT;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "~/.config/slop/slop.toml";

/// Main configuration struct containing all slop settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SlopConfig {
    /// X display connection
    #[serde(default)]
    pub display: DisplayConfig,

    /// Selection appearance and behaviour
    #[serde(default)]
    pub selection: SelectionConfig,

    /// Output and logging
    #[serde(default)]
    pub general: GeneralConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DisplayConfig {
    /// Display name such as `:0`; unset means `$DISPLAY`
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SelectionConfig {
    /// Thickness of the selection frame in pixels (0 draws nothing)
    pub border_size: u32,

    /// Grow (positive) or shrink (negative) the selection by this many pixels
    pub padding: i32,

    /// Pixels the pointer may travel after a press before it counts as a drag
    pub tolerance: u32,

    /// Frame colour as `[r, g, b]`, each in 0.0-1.0
    pub color: [f32; 3],

    /// Frame the window under the pointer before the drag starts
    pub highlight: bool,

    /// Leave the keyboard alone; keys then cannot cancel
    pub no_keyboard: bool,

    /// Include window-manager decorations when a window is clicked
    pub decorations: bool,

    /// Click once to start and again to finish instead of dragging
    pub nodrag: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable debug logging
    pub debug: bool,

    /// Sleep between engine ticks (milliseconds)
    pub poll_interval_ms: u64,

    /// Output template, see `selection::format_selection`
    pub format: String,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            border_size: 1,
            padding: 0,
            tolerance: 2,
            color: [0.5, 0.5, 0.5],
            highlight: false,
            no_keyboard: false,
            decorations: true,
            nodrag: false,
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            debug: false,
            poll_interval_ms: 10,
            format: DEFAULT_FORMAT.to_string(),
        }
    }
}

/// Expand a leading `~` to `$HOME`
pub fn expand_home(path: &Path) -> Result<PathBuf> {
    match path.strip_prefix("~") {
        Ok(rest) => {
            let home = std::env::var("HOME").context("Failed to get HOME environment variable")?;
            Ok(Path::new(&home).join(rest))
        }
        Err(_) => Ok(path.to_path_buf()),
    }
}

impl SlopConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let expanded_path = expand_home(path.as_ref())?;

        let contents = fs::read_to_string(&expanded_path)
            .with_context(|| format!("Failed to read config file: {}", expanded_path.display()))?;

        let config: SlopConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", expanded_path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !Color::from(self.selection.color).is_valid() {
            anyhow::bail!(
                "Invalid color {:?}: each channel must be between 0.0 and 1.0",
                self.selection.color
            );
        }

        if self.selection.border_size > 256 {
            anyhow::bail!(
                "Invalid border_size {}: must be at most 256",
                self.selection.border_size
            );
        }

        if self.general.poll_interval_ms > 1000 {
            anyhow::bail!(
                "Invalid poll_interval_ms {}: must be at most 1000",
                self.general.poll_interval_ms
            );
        }

        if self.general.format.is_empty() {
            anyhow::bail!("Invalid format: must not be empty");
        }

        Ok(())
    }
}
