//! Bridge error types

use thiserror::Error;

/// Errors that can stop the mouse-to-gamepad bridge
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Opening or reading the physical mouse failed (missing, EACCES, unplugged)
    #[error("Input device unavailable: {0}")]
    SourceUnavailable(#[source] std::io::Error),

    /// Creating the virtual gamepad or writing a frame to it failed
    #[error("Virtual gamepad unavailable: {0}")]
    SinkUnavailable(#[source] std::io::Error),

    #[error("No mouse device found")]
    NoMouseFound,

    #[error("Invalid configuration: {0}")]
    Config(String),
}
