use std::fmt;

use armlink_client::ClientError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const REMOTE_ERROR: i32 = 10;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn client_error(context: &str, err: ClientError) -> CliError {
    let code = match &err {
        ClientError::Ws(_) => TRANSPORT_ERROR,
        ClientError::Wire(_) => DATA_INVALID,
        ClientError::Remote(_) => REMOTE_ERROR,
        ClientError::Timeout(_) => TIMEOUT,
        ClientError::AlreadyConnected | ClientError::DuplicateRequestId(_) => USAGE,
        ClientError::NotConnected | ClientError::ConnectionClosed => FAILURE,
    };
    CliError::new(code, format!("{context}: {err}"))
}
