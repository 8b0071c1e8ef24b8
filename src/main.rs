//! Mouse-to-Gamepad Bridge
//!
//! Main entry point: CLI, logging and signal wiring around the translation loop.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use mouse_gamepad::config::BridgeConfig;
use mouse_gamepad::gamepad::{GamepadOutput, VirtualGamepad};
use mouse_gamepad::source::{self, EventSource, MouseSource};
use mouse_gamepad::translate::Translator;

#[derive(Parser)]
#[command(name = "mouse-gamepad")]
#[command(version, about = "Use a mouse as the left stick of a virtual gamepad")]
struct Cli {
    /// Config file path (default: ~/.config/mouse-gamepad/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Mouse event device, overrides the config file (e.g. /dev/input/event5)
    #[arg(short, long, global = true)]
    device: Option<PathBuf>,

    /// Stick sensitivity in [0, 1], overrides the config file
    #[arg(short, long, global = true)]
    sensitivity: Option<f64>,

    /// Grab the mouse exclusively so the cursor stays put
    #[arg(long, global = true)]
    grab: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Map the mouse onto the virtual gamepad until interrupted (default)
    Run,

    /// List input devices and mark mouse candidates
    #[command(visible_aliases = ["ls"])]
    List,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(BridgeConfig::default_path);

    match &cli.command {
        None | Some(Commands::Run) => run(&cli, &config_path).await,
        Some(Commands::List) => {
            list_devices();
            Ok(())
        }
        Some(Commands::Init { force }) => init_config(&config_path, *force),
    }
}

/// Load config, open both devices and run the loop
async fn run(cli: &Cli, config_path: &Path) -> Result<()> {
    info!("Loading config from {:?}", config_path);
    let mut config = BridgeConfig::load(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;

    if let Some(device) = &cli.device {
        config.mouse_device = Some(device.clone());
    }
    if let Some(sensitivity) = cli.sensitivity {
        config.sensitivity = sensitivity;
    }
    config.grab |= cli.grab;
    config.validate()?;

    let buttons = config.button_map()?;
    let sensitivity = config.sensitivity();
    info!(
        "Sensitivity: {} ({:.2} units per count)",
        sensitivity.factor(),
        sensitivity.multiplier()
    );

    let mouse_path = source::resolve_mouse_path(config.mouse_device.as_deref())?;
    let mut mouse = MouseSource::open(&mouse_path, config.grab)?;

    let mut gamepad = match VirtualGamepad::create(&config.gamepad_spec(&buttons)) {
        Ok(gamepad) => gamepad,
        Err(e) => {
            if let Err(close_err) = mouse.close() {
                warn!("Failed to close mouse device: {}", close_err);
            }
            return Err(e.into());
        }
    };
    if let Some(path) = gamepad.device_path() {
        info!("Gamepad device path: {}", path.display());
    }

    let output = GamepadOutput::new(gamepad, config.axis_max)?;
    let mut translator = Translator::new(mouse, output, sensitivity, buttons);

    info!("Mapping mouse movements to gamepad left stick. Press Ctrl+C to exit.");
    let summary = translator.run(shutdown_signal()).await?;
    info!(
        "Exiting ({} events read, {} frames emitted)",
        summary.events_read, summary.frames_emitted
    );
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

fn list_devices() {
    let devices = source::list_devices();
    if devices.is_empty() {
        println!("No input devices found (is /dev/input readable?)");
        return;
    }

    let picked = source::pick_mouse(&devices).map(|d| d.path.clone());
    for device in &devices {
        let marker = if picked.as_ref() == Some(&device.path) {
            "*"
        } else if device.looks_like_mouse() {
            "+"
        } else {
            " "
        };
        println!("{} {} - {}", marker, device.path.display(), device.name);
    }
    println!();
    println!("* auto-detected mouse   + has pointer motion and a left button");
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    BridgeConfig::default()
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}
