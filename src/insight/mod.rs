//! Talking to the language model that turns a capture summary into prose.
pub mod client;
pub mod prompt;

#[cfg(test)]
pub mod testing;

use std::{env, fmt};
use crate::error::{Error, Result};

pub use client::OpenAiClient;
pub use prompt::Prompt;

/// Environment variable holding the API credential.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
/// Environment variable overriding the API endpoint.
pub const BASE_URL_ENV: &str = "OPENAI_BASE_URL";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Something that can answer a [Prompt] about serialized capture data.
pub trait InsightClient {
    fn analyse(&self, data: &str, prompt: Prompt) -> Result<String>;
}

/// API credential. Never printed.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    /// Rejects a missing or blank key.
    pub fn new(value: Option<String>) -> Result<Self> {
        match value {
            Some(key) if !key.trim().is_empty() => Ok(ApiKey(key.trim().to_string())),
            _ => Err(Error::Auth(format!("{API_KEY_ENV} is not set"))),
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ApiKey(****)")
    }
}

/// Endpoint from [BASE_URL_ENV], falling back to [DEFAULT_BASE_URL].
pub fn base_url_from_env() -> String {
    env::var(BASE_URL_ENV)
        .ok()
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
}
