//! Errors shared by the capture, insight and output stages.
//!
//! None of these are recovered from: they travel up to `main`, get logged, and end the run.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// tshark could not be started, or it failed while decoding the capture.
    #[error("decode error: {0}")]
    Decode(String),

    /// No credential available for the insight service.
    #[error("auth error: {0}")]
    Auth(String),

    /// The insight service failed, timed out, or answered without any content.
    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
