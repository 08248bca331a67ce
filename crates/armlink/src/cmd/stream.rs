use armlink_client::{ConnectionState, StreamChannel};

use crate::cmd::StreamArgs;
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_frame_info, print_raw, OutputFormat};

pub async fn run(args: StreamArgs, format: OutputFormat) -> CliResult<i32> {
    let channel = StreamChannel::default();
    let mut frames = channel.subscribe_frames();
    channel
        .connect(&args.url)
        .await
        .map_err(|err| client_error("connect failed", err))?;

    let mut state = channel.state();
    let mut seen = 0u64;
    loop {
        tokio::select! {
            frame = frames.recv() => match frame {
                Ok(data) => {
                    if matches!(format, OutputFormat::Raw) {
                        print_raw(&data);
                    } else {
                        print_frame_info(seen, data.len(), format);
                    }
                    seen += 1;
                    if args.count.is_some_and(|count| seen >= count) {
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "stream fell behind, frames were dropped");
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
        tracing::warn!(error, "stream channel reported an error");
    }

    channel.disconnect().await;
    Ok(SUCCESS)
}
