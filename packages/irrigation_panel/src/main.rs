use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

use irrigation_panel::config::{self, DEFAULT_CONFIG_FILE};
use irrigation_panel::input::HELP;
use irrigation_panel::{Panel, PanelOptions, Renderer, UserAction, parse_input};
use serial_session::{NativePortOpener, PortOpener, SerialSession};

const TICK_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Parser)]
#[command(name = "irriga")]
#[command(about = "Serial control panel for the irrigation controller")]
struct Args {
    /// Serial device (default: auto-detect a single USB adapter)
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate
    #[arg(short, long)]
    baud: Option<u32>,

    /// Config file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// List serial ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Start disconnected
    #[arg(long)]
    no_connect: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Diagnostics go to stderr; stdout belongs to the panel
    let default_directive = if args.debug {
        "irriga=debug,irrigation_panel=debug,serial_session=debug,irrigation_protocol=debug"
    } else {
        "irriga=info,serial_session=info,warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(env_filter)
        .init();

    let mut file_config = config::resolve(&args.config)?;
    if let Some(port) = args.port {
        file_config.serial.path = Some(port);
    }
    if let Some(baud) = args.baud {
        file_config.serial.baud_rate = baud;
    }

    let mut renderer = Renderer::new(io::stdout(), file_config.panel.color);

    if args.list_ports {
        let ports = NativePortOpener
            .list()
            .context("Failed to enumerate serial ports")?;
        renderer.ports(&ports)?;
        return Ok(());
    }

    info!(
        "Starting irrigation panel (port: {}, {} baud)",
        file_config.serial.path.as_deref().unwrap_or("auto"),
        file_config.serial.baud_rate
    );

    let (session, mut events) = SerialSession::new(NativePortOpener, file_config.serial.clone());
    let mut panel = Panel::new(session, PanelOptions::from_file(&file_config.panel));
    let default_secs = file_config.panel.default_irrigation_secs;

    panel.startup();
    if !args.no_connect && panel.state().connect_enabled {
        panel.connect().await;
    }
    renderer.entries(&panel.take_new_entries())?;
    renderer.message("Type /help for panel commands")?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(TICK_INTERVAL);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        info!("Input closed, shutting down");
                        break;
                    }
                    Err(e) => {
                        warn!("Failed to read input: {}", e);
                        break;
                    }
                };
                match parse_input(&line, default_secs) {
                    Ok(UserAction::Quit) => break,
                    Ok(UserAction::Help) => renderer.message(HELP)?,
                    Ok(UserAction::Status) => {
                        renderer.status(panel.state(), panel.session().port_name())?
                    }
                    Ok(UserAction::Log(n)) => {
                        let recent: Vec<_> = panel.log().recent(n).cloned().collect();
                        panel.take_new_entries();
                        renderer.entries(&recent)?;
                    }
                    Ok(UserAction::ListPorts) => {
                        let ports = panel.list_ports();
                        renderer.ports(&ports)?;
                    }
                    Ok(action) => panel.perform(action).await,
                    Err(e) => renderer.message(&e.to_string())?,
                }
            }
            Some(event) = events.recv() => panel.handle_session_event(event),
            _ = ticker.tick() => panel.tick(Instant::now()),
            _ = &mut ctrl_c => {
                info!("Interrupted, shutting down");
                break;
            }
        }

        renderer.entries(&panel.take_new_entries())?;
    }

    panel.shutdown().await;
    renderer.entries(&panel.take_new_entries())?;
    Ok(())
}
