mod call;
mod stream;
mod watch;

use std::time::Duration;

use clap::{Args, Subcommand};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send one request on the control channel and print the response.
    Call(CallArgs),
    /// Print every inbound control message (correlated or not).
    Watch(WatchArgs),
    /// Receive binary frames from the stream channel.
    Stream(StreamArgs),
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Control channel URL, e.g. ws://10.0.0.2/data.
    pub url: String,
    /// Endpoint path, e.g. /app/servos/getAll.
    pub endpoint: String,
    /// Request method.
    #[arg(long, default_value = "GET")]
    pub method: armlink_wire::Method,
    /// Request payload as JSON.
    #[arg(long, default_value = "{}")]
    pub payload: String,
    /// Give up after this long, e.g. 10s or 500ms.
    #[arg(long, default_value = "30s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Control channel URL.
    pub url: String,
    /// Stop after N messages (default: until interrupted).
    #[arg(long)]
    pub count: Option<u64>,
}

#[derive(Args, Debug)]
pub struct StreamArgs {
    /// Stream channel URL, e.g. ws://10.0.0.3:8766.
    pub url: String,
    /// Stop after N frames (default: until interrupted).
    #[arg(long)]
    pub count: Option<u64>,
}

pub async fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Call(args) => call::run(args, format).await,
        Command::Watch(args) => watch::run(args, format).await,
        Command::Stream(args) => stream::run(args, format).await,
    }
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        _ => Err(CliError::new(
            USAGE,
            format!("unsupported duration unit: {unit}"),
        )),
    }
}
