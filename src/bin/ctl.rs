// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! setpointctl: evaluate setpoints locally or query a running setpointd.

use anyhow::{Context, bail};
use chrono::NaiveDateTime;
use clap::{ArgAction, Parser, Subcommand};
use std::io::{self, BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;
use zone_setpoint::config::{self, Config};
use zone_setpoint::engine::shift;
use zone_setpoint::protocol::{self, Reading, Request, Response};
use zone_setpoint::{OffsetPolicy, SetpointEngine, SmoothingKind, Transition, WindowSmoothing};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "setpointctl", about = "Zone setpoint client")]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: String,

    /// Path to the daemon socket.
    #[arg(short, long, default_value = config::DEFAULT_SOCKET_PATH)]
    socket: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate setpoints locally from the configuration file.
    Resolve {
        /// Local wall-clock instant, e.g. 2024-01-08T07:55 (default: now).
        #[arg(long)]
        at: Option<String>,
        /// Print this many consecutive minutes.
        #[arg(long, default_value_t = 1)]
        minutes: u32,
        /// Force the optimization-day profile.
        #[arg(long)]
        optimization: bool,
        /// Override the transition mode with window smoothing.
        #[arg(long)]
        strategy: Option<SmoothingKind>,
        /// Window length in minutes (odd) for --strategy.
        #[arg(long, default_value_t = 31)]
        window: u32,
        /// Offset policy for --strategy.
        #[arg(long, default_value = "centered")]
        offset: OffsetPolicy,
        /// Override the transition mode with a lookahead ramp.
        #[arg(long, conflicts_with = "strategy")]
        lookahead: Option<u32>,
    },
    /// Ask the daemon for the setpoint.
    Query {
        #[arg(long)]
        at: Option<String>,
        #[arg(long)]
        optimization: Option<bool>,
    },
    /// Ask the daemon how a day is classified.
    DayType {
        #[arg(long)]
        at: Option<String>,
        #[arg(long)]
        optimization: Option<bool>,
    },
    /// Turn the daemon's optimization mode on or off.
    Optimize {
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },
    /// Show the daemon's state.
    Status,
    /// Make the daemon reload its configuration.
    Reload,
    /// Write the default configuration.
    InitConfig {
        /// Destination (default: the --config path).
        #[arg(long)]
        output: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// Daemon connection
// ---------------------------------------------------------------------------

struct Connection {
    stream: UnixStream,
    reader: BufReader<UnixStream>,
}

impl Connection {
    fn connect(path: &str) -> io::Result<Self> {
        let stream = UnixStream::connect(path)?;
        stream.set_read_timeout(Some(Duration::from_secs(2)))?;
        let reader = BufReader::new(stream.try_clone()?);
        Ok(Self { stream, reader })
    }

    fn send_request(&mut self, req: &Request) -> io::Result<Response> {
        let encoded = protocol::encode(req).map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("Encode error: {e}"))
        })?;
        self.stream.write_all(encoded.as_bytes())?;
        self.stream.flush()?;

        let mut line = String::new();
        self.reader.read_line(&mut line)?;
        protocol::decode(&line).map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("Decode error: {e}"))
        })
    }
}

fn request(socket: &str, req: Request) -> anyhow::Result<Response> {
    let mut conn =
        Connection::connect(socket).with_context(|| format!("Cannot connect to daemon at {socket}"))?;
    Ok(conn.send_request(&req)?)
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config_path = config::resolve_config_path(Some(&cli.config));

    match cli.command {
        Command::Resolve {
            at,
            minutes,
            optimization,
            strategy,
            window,
            offset,
            lookahead,
        } => {
            let cfg = config::load_config(&config_path)?;
            let transition = match (strategy, lookahead) {
                (Some(strategy), _) => Transition::Window(WindowSmoothing::new(strategy, window, offset)?),
                (None, Some(lookahead_minutes)) => Transition::Lookahead { lookahead_minutes },
                (None, None) => cfg.transition,
            };
            let engine = SetpointEngine::from_config(&Config { transition, ..cfg })?;
            let start = match at {
                Some(s) => parse_instant(&s)?,
                None => engine.now(),
            };
            for reading in trace(&engine, start, minutes, optimization)? {
                print_reading(&reading);
            }
        }

        Command::Query { at, optimization } => {
            let at = at.as_deref().map(parse_instant).transpose()?;
            print_response(request(&cli.socket, Request::GetSetpoint { at, optimization })?)?;
        }

        Command::DayType { at, optimization } => {
            let at = at.as_deref().map(parse_instant).transpose()?;
            print_response(request(&cli.socket, Request::GetDayType { at, optimization })?)?;
        }

        Command::Optimize { enabled } => {
            print_response(request(&cli.socket, Request::SetOptimization { enabled })?)?;
        }

        Command::Status => print_response(request(&cli.socket, Request::GetStatus)?)?,

        Command::Reload => print_response(request(&cli.socket, Request::ReloadConfig)?)?,

        Command::InitConfig { output } => {
            let path = output
                .map(std::path::PathBuf::from)
                .unwrap_or(config_path);
            write_default_config(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Accepts `YYYY-MM-DDTHH:MM[:SS]` or the same with a space separator.
fn parse_instant(s: &str) -> anyhow::Result<NaiveDateTime> {
    const FORMATS: [&str; 4] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s.trim(), fmt).ok())
        .with_context(|| format!("Invalid instant '{s}', expected YYYY-MM-DDTHH:MM"))
}

/// One reading per minute starting at `start` (at least one).
fn trace(
    engine: &SetpointEngine,
    start: NaiveDateTime,
    minutes: u32,
    optimization: bool,
) -> zone_setpoint::Result<Vec<Reading>> {
    (0..minutes.max(1))
        .map(|minute| Reading::take(engine, shift(start, minute.into())?, optimization))
        .collect()
}

fn write_default_config(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    config::save_config(path, &Config::default())?;
    Ok(())
}

fn print_reading(reading: &Reading) {
    let marker = if reading.setpoint != reading.raw { " *" } else { "" };
    println!(
        "{}  {:<16}  {:>6.2}  (raw {:.2}){marker}",
        reading.at.format("%Y-%m-%d %H:%M"),
        reading.day_type,
        reading.setpoint,
        reading.raw
    );
}

fn print_response(response: Response) -> anyhow::Result<()> {
    match response {
        Response::Setpoint(reading) => print_reading(&reading),
        Response::DayType { at, day_type } => println!("{}  {day_type}", at.format("%Y-%m-%d %H:%M")),
        Response::Status {
            timezone,
            country,
            transition,
            optimization,
            last,
        } => {
            println!("Zone:         {timezone} ({country})");
            println!("Transition:   {transition:?}");
            println!("Optimization: {optimization}");
            match last {
                Some(reading) => print_reading(&reading),
                None => println!("No reading yet"),
            }
        }
        Response::Ok { message } => println!("{message}"),
        Response::Error { message } => bail!("Daemon error: {message}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_instant_formats() {
        let expected = NaiveDateTime::parse_from_str("2024-01-08 07:55:00", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(parse_instant("2024-01-08T07:55").unwrap(), expected);
        assert_eq!(parse_instant("2024-01-08 07:55").unwrap(), expected);
        assert_eq!(parse_instant("2024-01-08T07:55:00").unwrap(), expected);
        assert!(parse_instant("08.01.2024 07:55").is_err());
    }

    #[test]
    fn test_trace_stops_at_end_of_calendar() {
        let engine = SetpointEngine::from_config(&Config {
            transition: Transition::Step,
            ..Config::default()
        })
        .unwrap();
        let start = parse_instant("2024-01-08T07:58").unwrap();
        let readings = trace(&engine, start, 3, false).unwrap();
        assert_eq!(readings.len(), 3);
        assert_eq!(readings.last().unwrap().at, parse_instant("2024-01-08T08:00").unwrap());
        assert_eq!(trace(&engine, start, 0, false).unwrap().len(), 1);

        let last = chrono::NaiveDate::MAX.and_hms_opt(23, 58, 0).unwrap();
        assert!(matches!(
            trace(&engine, last, 5, false),
            Err(zone_setpoint::SetpointError::InstantOutOfRange { .. })
        ));
    }

    #[test]
    fn test_cli_parses_resolve_overrides() {
        let cli = Cli::try_parse_from([
            "setpointctl",
            "resolve",
            "--at",
            "2024-01-08T07:55",
            "--strategy",
            "gauss",
            "--window",
            "21",
        ])
        .unwrap();
        match cli.command {
            Command::Resolve { strategy, window, offset, .. } => {
                assert_eq!(strategy, Some(SmoothingKind::GaussianConvolution));
                assert_eq!(window, 21);
                assert_eq!(offset, OffsetPolicy::Centered);
            }
            other => panic!("unexpected {other:?}"),
        }

        assert!(Cli::try_parse_from(["setpointctl", "resolve", "--strategy", "gauss2"]).is_err());
    }
}
