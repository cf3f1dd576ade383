//! # slop - select operation
//!
//! Lets the user drag out a region of the screen (or click a window) and
//! prints its geometry on stdout using a configurable format.
//!
//! Exit status is 0 when something was selected and 1 when the user
//! cancelled or an error occurred.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, error, info};

use slop::config::{SlopConfig, DEFAULT_CONFIG_PATH};
use slop::logging::{self, LogConfig};
use slop::{format_selection, select, Color, SelectOptions, SlopError, X11Display, XEngine};

#[derive(Parser, Debug)]
#[command(name = "slop")]
#[command(about = "Select a region of the screen and print its geometry")]
#[command(version)]
struct Cli {
    /// X display to connect to (defaults to $DISPLAY)
    #[arg(long)]
    display: Option<String>,

    /// Path to configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Thickness of the selection frame in pixels
    #[arg(short = 'b', long = "bordersize")]
    border_size: Option<u32>,

    /// Grow (or with a negative value shrink) the selection
    #[arg(short, long, allow_negative_numbers = true)]
    padding: Option<i32>,

    /// Pixels the pointer may move after a click before it is a drag
    #[arg(short, long)]
    tolerance: Option<u32>,

    /// Frame colour as r,g,b with each channel in 0.0-1.0
    #[arg(short, long)]
    color: Option<Color>,

    /// Frame the window under the pointer before the drag starts
    #[arg(long)]
    highlight: bool,

    /// Do not grab the keyboard; keys then cannot cancel
    #[arg(short = 'k', long = "nokeyboard")]
    no_keyboard: bool,

    /// Strip window-manager decorations from clicked windows
    #[arg(short = 'n', long = "nodecorations")]
    no_decorations: bool,

    /// Click once to start and again to finish instead of dragging
    #[arg(short = 'D', long = "nodrag")]
    nodrag: bool,

    /// Output format (%x %y %w %h %g %i %c %d)
    #[arg(short, long)]
    format: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

impl Cli {
    /// Override configuration values with the flags that were given
    fn apply(&self, config: &mut SlopConfig) {
        if let Some(display) = &self.display {
            config.display.name = Some(display.clone());
        }
        if let Some(border_size) = self.border_size {
            config.selection.border_size = border_size;
        }
        if let Some(padding) = self.padding {
            config.selection.padding = padding;
        }
        if let Some(tolerance) = self.tolerance {
            config.selection.tolerance = tolerance;
        }
        if let Some(color) = self.color {
            config.selection.color = [color.r, color.g, color.b];
        }
        if let Some(format) = &self.format {
            config.general.format = format.clone();
        }
        config.selection.highlight |= self.highlight;
        config.selection.no_keyboard |= self.no_keyboard;
        config.selection.nodrag |= self.nodrag;
        config.general.debug |= self.debug;
        if self.no_decorations {
            config.selection.decorations = false;
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logging depends on the config's debug flag, so load it first and
    // report the outcome once the logger is up.
    let loaded = SlopConfig::load(&cli.config);
    let debug = cli.debug || loaded.as_ref().map(|c| c.general.debug).unwrap_or(false);
    let log_config = if debug {
        LogConfig::debug()
    } else {
        LogConfig::default()
    };
    if let Err(e) = logging::init(&log_config) {
        eprintln!("slop: failed to initialize logging: {}", e);
    }

    info!("🚀 Starting slop {}", env!("CARGO_PKG_VERSION"));

    let mut config = match loaded {
        Ok(config) => {
            info!("✅ Configuration loaded from: {}", cli.config);
            config
        }
        Err(e) => {
            // A missing file at the default location is the common case
            if cli.config == DEFAULT_CONFIG_PATH {
                debug!("No usable configuration at {}: {:#}", cli.config, e);
            } else {
                error!("❌ Failed to load configuration: {:#}", e);
            }
            info!("📝 Using default configuration");
            SlopConfig::default()
        }
    };
    cli.apply(&mut config);

    match run(&config) {
        Ok(code) => code,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

fn run(config: &SlopConfig) -> Result<ExitCode> {
    config.validate().context("Invalid settings")?;
    let options = SelectOptions::from(config);
    debug!("Selection options: {:?}", options);

    let mut engine: XEngine<X11Display> = XEngine::new();
    engine
        .init(config.display.name.as_deref())
        .context("Failed to start selection")?;

    let selection = select(&mut engine, &options)?;
    // Tear down overlays and grabs before anything is printed
    drop(engine);

    print!("{}", format_selection(&selection, &config.general.format));

    if selection.is_cancelled() {
        info!("🚫 Selection cancelled");
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Print an error the way the user expects to see it
///
/// Fatal protocol errors get the classic X error report on stderr.
fn report(err: &anyhow::Error) {
    match err.downcast_ref::<SlopError>() {
        Some(SlopError::Server(server)) if server.class() == slop::ErrorClass::Fatal => {
            eprintln!("{}", server);
        }
        _ => error!("❌ {:#}", err),
    }
}
