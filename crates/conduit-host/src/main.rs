//! # conduit-host
//!
//! Host runtime binary: runs the command loop, compiles stored custom
//! commands, and keeps a session open to the remote controller.

#![deny(unsafe_code)]

mod console;
mod host_loop;
mod roster;

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use conduit_commands::{CommandStore, Dispatcher, Interpreter, Sender, compile};
use conduit_core::{EventSink, HostError, OutboundEvent, event_types};
use conduit_rpc::{HandlerTable, ProtocolContext, register_all};
use conduit_session::{Outbox, Session, SessionConfig, SessionError};
use conduit_settings::{ConduitSettings, load_settings_from_path, settings_path};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::host_loop::HostHandle;
use crate::roster::Roster;

/// Host runtime bridged to a remote controller.
#[derive(Parser, Debug)]
#[command(name = "conduit-host", about = "Host runtime bridged to a remote controller")]
struct Cli {
    /// Settings file (defaults to `$CONDUIT_CONFIG` or `conduit.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Custom command registry file (overrides settings).
    #[arg(long)]
    commands_file: Option<String>,

    /// Reconnect after losing the controller instead of stopping.
    #[arg(long)]
    lenient: bool,

    /// Log level (overrides settings; `RUST_LOG` still wins).
    #[arg(long)]
    log_level: Option<String>,

    /// Player online at startup. Repeatable.
    #[arg(long = "player", value_name = "NAME")]
    players: Vec<String>,
}

impl Cli {
    fn settings(&self) -> Result<ConduitSettings> {
        let path = self.config.clone().unwrap_or_else(settings_path);
        let mut settings = load_settings_from_path(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;
        self.apply(&mut settings);
        settings.validate().context("Invalid settings")?;
        Ok(settings)
    }

    fn apply(&self, settings: &mut ConduitSettings) {
        if let Some(ref file) = self.commands_file {
            settings.commands.file.clone_from(file);
        }
        if self.lenient {
            settings.connection.strict_mode = false;
        }
        if let Some(ref level) = self.log_level {
            settings.logging.level.clone_from(level);
        }
    }
}

/// Feed stdin lines to the host as console commands.
///
/// Reading happens on a plain thread so a pending read never holds up
/// runtime shutdown.
fn spawn_console(host: HostHandle) -> tokio::task::JoinHandle<()> {
    let (tx, mut rx) = mpsc::channel::<String>(16);
    let reader = std::thread::Builder::new()
        .name("conduit-console".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(e) = reader {
        warn!(error = %e, "console input unavailable");
    }

    tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            if line.trim().is_empty() {
                continue;
            }
            match host.run(&line, Sender::console()).await {
                Ok(output) if output.is_empty() => {}
                Ok(output) => println!("{output}"),
                Err(HostError::NotRunning) => break,
                Err(e) => println!("{e}"),
            }
        }
        debug!("console input closed");
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.settings()?;
    conduit_core::logging::init_subscriber(&settings.logging.level);

    // Outbox is the event sink for compiled commands and lifecycle events
    let outbox = Arc::new(Outbox::new());
    let roster = Arc::new(Roster::new(cli.players));

    let store = Arc::new(CommandStore::new(&settings.commands.file));
    let loaded = store.load();
    let mut interpreter = Interpreter::new(Dispatcher::new(outbox.clone()), roster.clone());
    for spec in store.specs() {
        interpreter.install(compile(&spec));
    }
    info!(loaded, file = %settings.commands.file, "custom commands compiled");

    let (host, host_thread) =
        host_loop::spawn(interpreter, roster).context("Failed to start host loop")?;
    let shared = Arc::new(host.clone());
    let ctx = ProtocolContext {
        host: shared.clone(),
        registrar: shared,
        store,
    };

    let mut table = HandlerTable::new();
    register_all(&mut table);
    info!(message_types = table.message_types().len(), "protocol handlers registered");

    let config = SessionConfig::from_settings(&settings.connection);
    let session = Session::new(config, ctx, table, outbox.clone());

    match session.connect().await {
        Ok(()) => {}
        Err(e @ (SessionError::MissingOrigin | SessionError::InvalidRequest(_))) => {
            host.stop_loop();
            let _ = tokio::task::spawn_blocking(move || host_thread.join()).await;
            return Err(anyhow::Error::new(e).context("Cannot connect to controller"));
        }
        // the failure policy already decided between stopping and retrying
        Err(e) => warn!(error = %e, "initial connection failed"),
    }

    outbox.emit(OutboundEvent::new(event_types::SERVER_STARTED, None));
    info!("host started");
    let console = spawn_console(host.clone());

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                warn!(error = %e, "failed to listen for ctrl-c");
            }
            info!("interrupt received");
        }
        () = host.stopping() => {}
    }

    info!("shutting down");
    outbox.emit(OutboundEvent::new(event_types::SERVER_STOPPING, None));
    session.shutdown().await;
    console.abort();
    host.stop_loop();
    tokio::task::spawn_blocking(move || host_thread.join())
        .await
        .context("Failed to join host loop")?
        .map_err(|_| anyhow!("host loop panicked"))?;

    info!("shutdown complete");
    Ok(())
}
