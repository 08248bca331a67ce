use armlink_client::{ClientConfig, ControlChannel};
use serde_json::Value;

use crate::cmd::{parse_duration, CallArgs};
use crate::exit::{client_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_response, OutputFormat};

pub async fn run(args: CallArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let payload: Value = serde_json::from_str(&args.payload)
        .map_err(|err| CliError::new(USAGE, format!("--payload is not valid JSON: {err}")))?;

    let config = ClientConfig {
        request_timeout: timeout,
        ..ClientConfig::default()
    };
    let channel = ControlChannel::new(config);
    channel
        .connect(&args.url)
        .await
        .map_err(|err| client_error("connect failed", err))?;

    let result = channel
        .send_request(&args.endpoint, args.method, payload)
        .await;
    channel.disconnect().await;

    let response = result.map_err(|err| client_error("request failed", err))?;
    print_response(&args.endpoint, &response, format);
    Ok(SUCCESS)
}
