//! Error kinds, grouped the way §7 of the design groups them: framing and
//! transport failures are terminal for a session; fatal startup failures are
//! terminal for the process. Invalid intents and server-full are ordinary
//! control flow, not errors, and are not represented here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("payload length {len} exceeds the {max} byte limit")]
    PayloadTooLarge { len: u32, max: u32 },

    #[error("checksum mismatch: expected {expected:#06x}, got {actual:#06x}")]
    ChecksumMismatch { expected: u16, actual: u16 },

    #[error("peer closed the connection")]
    TransportClosed,

    #[error("timed out waiting for a frame")]
    Timeout,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl WireError {
    /// True for the read-timeout case a session's steady-state poll loop
    /// treats as "nothing to do this cycle", not as a terminal failure.
    pub fn is_timeout(&self) -> bool {
        match self {
            WireError::Timeout => true,
            WireError::Io(e) => {
                matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut)
            }
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind to port {port}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect to {host}:{port}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("server rejected login: {0}")]
    LoginRejected(String),

    #[error("server closed the connection before responding to login")]
    NoLoginResponse,

    #[error(transparent)]
    Wire(#[from] WireError),
}
