use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ResponseOutput<'a> {
    schema_id: &'a str,
    endpoint: &'a str,
    payload: &'a Value,
    timestamp: String,
}

pub fn print_response(endpoint: &str, payload: &Value, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = ResponseOutput {
                schema_id: "https://armlink.dev/schemas/cli/v1/call-response.schema.json",
                endpoint,
                payload,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ENDPOINT", "PAYLOAD"])
                .add_row(vec![endpoint.to_string(), payload.to_string()]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("endpoint={endpoint} payload={payload}");
        }
        OutputFormat::Raw => {
            println!("{payload}");
        }
    }
}

pub fn print_notification(text: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let preview = serde_json::from_str::<Value>(text)
                .unwrap_or_else(|_| Value::String(text.to_string()));
            println!(
                "{}",
                serde_json::json!({
                    "schema_id": "https://armlink.dev/schemas/cli/v1/notification.schema.json",
                    "message": preview,
                    "timestamp": now_unix_seconds(),
                })
            );
        }
        _ => println!("{text}"),
    }
}

pub fn print_frame_info(index: u64, size: usize, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "schema_id": "https://armlink.dev/schemas/cli/v1/stream-frame.schema.json",
                    "frame": index,
                    "size": size,
                    "timestamp": now_unix_seconds(),
                })
            );
        }
        _ => println!("frame={index} size={size}"),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
