// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! setpointd: evaluates the zone setpoint on a fixed interval and answers
//! setpoint queries from clients over a Unix domain socket.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{Mutex, Notify};
use tokio::time::{self, Duration};
use zone_setpoint::SetpointEngine;
use zone_setpoint::config::{self, Config};
use zone_setpoint::protocol::{self, Reading, Request, Response};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "setpointd", about = "Zone setpoint daemon")]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: String,

    /// Override the socket path.
    #[arg(short, long)]
    socket: Option<String>,

    /// Start in optimization mode.
    #[arg(long)]
    optimization: bool,
}

// ---------------------------------------------------------------------------
// Shared daemon state
// ---------------------------------------------------------------------------

struct DaemonState {
    config: Config,
    engine: SetpointEngine,
    optimization: bool,
    last: Option<Reading>,
    config_path: PathBuf,
}

type SharedState = Arc<Mutex<DaemonState>>;

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config_path = config::resolve_config_path(Some(&cli.config));
    let cfg = config::load_config(&config_path)?;
    let engine = SetpointEngine::from_config(&cfg)?;

    let socket_path = cli
        .socket
        .clone()
        .unwrap_or_else(|| cfg.daemon.socket_path.clone());
    let poll_interval = cfg.daemon.poll_interval_ms;
    let optimization = cli.optimization || cfg.daemon.optimization;
    if optimization {
        log::info!("Optimization mode enabled");
    }

    let state: SharedState = Arc::new(Mutex::new(DaemonState {
        config: cfg,
        engine,
        optimization,
        last: None,
        config_path,
    }));

    // Clean up old socket file
    let _ = std::fs::remove_file(&socket_path);
    let listener = UnixListener::bind(&socket_path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o666);
        std::fs::set_permissions(&socket_path, perms)?;
    }

    log::info!("Listening on {socket_path}");

    let shutdown = Arc::new(Notify::new());
    let shutdown_signal = shutdown.clone();

    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        log::info!("Received shutdown signal");
        shutdown_signal.notify_waiters();
    });

    // Setpoint polling loop
    let state_for_poll = state.clone();
    let shutdown_for_poll = shutdown.clone();
    tokio::spawn(async move {
        let mut interval = time::interval(Duration::from_millis(poll_interval));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let mut st = state_for_poll.lock().await;
                    poll_setpoint(&mut st);
                }
                _ = shutdown_for_poll.notified() => {
                    break;
                }
            }
        }
    });

    // Accept client connections
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let state_clone = state.clone();
                        tokio::spawn(handle_client(stream, state_clone));
                    }
                    Err(e) => {
                        log::error!("Failed to accept connection: {e}");
                    }
                }
            }
            _ = shutdown.notified() => {
                log::info!("Daemon shutting down");
                break;
            }
        }
    }

    let _ = std::fs::remove_file(&socket_path);
    Ok(())
}

// ---------------------------------------------------------------------------
// Client connection handler
// ---------------------------------------------------------------------------

async fn handle_client(stream: UnixStream, state: SharedState) {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let response = match protocol::decode::<Request>(&line) {
            Ok(req) => process_request(req, &state).await,
            Err(e) => Response::Error {
                message: format!("Invalid request: {e}"),
            },
        };

        let encoded = match protocol::encode(&response) {
            Ok(s) => s,
            Err(e) => {
                log::error!("Failed to encode response: {e}");
                continue;
            }
        };

        if writer.write_all(encoded.as_bytes()).await.is_err() {
            break; // Client disconnected
        }
    }
}

async fn process_request(req: Request, state: &SharedState) -> Response {
    let mut st = state.lock().await;

    match req {
        Request::GetSetpoint { at, optimization } => {
            let at = at.unwrap_or_else(|| st.engine.now());
            let optimization = optimization.unwrap_or(st.optimization);
            match Reading::take(&st.engine, at, optimization) {
                Ok(reading) => Response::Setpoint(reading),
                Err(e) => Response::Error {
                    message: format!("Failed to resolve setpoint: {e}"),
                },
            }
        }

        Request::GetDayType { at, optimization } => {
            let at = at.unwrap_or_else(|| st.engine.now());
            let optimization = optimization.unwrap_or(st.optimization);
            match st.engine.day_type(at, optimization) {
                Ok(day_type) => Response::DayType { at, day_type },
                Err(e) => Response::Error {
                    message: format!("Failed to classify {at}: {e}"),
                },
            }
        }

        Request::SetOptimization { enabled } => {
            st.optimization = enabled;
            log::info!("Optimization mode {}", if enabled { "enabled" } else { "disabled" });
            poll_setpoint(&mut st);
            Response::Ok {
                message: format!("Optimization mode set to {enabled}"),
            }
        }

        Request::GetStatus => Response::Status {
            timezone: st.config.zone.timezone.clone(),
            country: st.engine.zone().calendar.country().iso_code().to_string(),
            transition: st.engine.transition(),
            optimization: st.optimization,
            last: st.last,
        },

        Request::ReloadConfig => {
            let reloaded = config::load_config(&st.config_path)
                .and_then(|cfg| SetpointEngine::from_config(&cfg).map(|engine| (cfg, engine)));
            match reloaded {
                Ok((cfg, engine)) => {
                    st.config = cfg;
                    st.engine = engine;
                    poll_setpoint(&mut st);
                    Response::Ok {
                        message: "Config reloaded".to_string(),
                    }
                }
                Err(e) => Response::Error {
                    message: format!("Failed to reload config: {e}"),
                },
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Polling
// ---------------------------------------------------------------------------

fn poll_setpoint(st: &mut DaemonState) {
    let now = st.engine.now();
    match Reading::take(&st.engine, now, st.optimization) {
        Ok(reading) => {
            let changed = st.last.is_none_or(|last| last.setpoint != reading.setpoint);
            if changed {
                log::info!(
                    "Setpoint {:.2} ({}, raw {:.2})",
                    reading.setpoint,
                    reading.day_type,
                    reading.raw
                );
            } else {
                log::debug!("Setpoint unchanged at {:.2}", reading.setpoint);
            }
            st.last = Some(reading);
        }
        Err(e) => log::error!("Failed to resolve setpoint for {now}: {e}"),
    }
}
