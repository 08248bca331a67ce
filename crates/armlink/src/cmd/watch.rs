use armlink_client::{ConnectionState, ControlChannel};

use crate::cmd::WatchArgs;
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_notification, OutputFormat};

pub async fn run(args: WatchArgs, format: OutputFormat) -> CliResult<i32> {
    let channel = ControlChannel::default();
    let mut tap = channel.subscribe_raw();
    channel
        .connect(&args.url)
        .await
        .map_err(|err| client_error("connect failed", err))?;

    let mut state = channel.state();
    let mut seen = 0u64;
    loop {
        tokio::select! {
            message = tap.recv() => match message {
                Ok(text) => {
                    print_notification(&text, format);
                    seen += 1;
                    if args.count.is_some_and(|count| seen >= count) {
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "watch fell behind, messages were dropped");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *state.borrow();
                if matches!(
                    current,
                    ConnectionState::Disconnected | ConnectionState::Failed
                ) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    if let Some(error) = channel.last_error().borrow().as_deref() {
        tracing::warn!(error, "control channel reported an error");
    }

    channel.disconnect().await;
    Ok(SUCCESS)
}
