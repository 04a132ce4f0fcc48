//! Where the backend lives and how long to wait for it.

use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;

use crate::Error;

/// The backend the client talks to when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/";

/// How long to wait for a response before giving up on a request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for the HTTP transport.
///
/// Can be deserialized from a host application's own configuration, e.g.
/// `{"base_url": "https://example.com/api", "timeout_secs": 10}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawClientConfig")]
pub struct ClientConfig {
    base_url: Url,
    timeout: Duration,
}

impl ClientConfig {
    /// Create a config for the backend at `base_url` with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidConfig] if `base_url` is not an absolute HTTP(S) URL.
    pub fn new(base_url: &str) -> Result<Self, Error> {
        let mut base_url = Url::parse(base_url).map_err(|error| {
            Error::InvalidConfig(format!("invalid base URL {base_url}: {error}"))
        })?;

        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(Error::InvalidConfig(format!(
                "unsupported URL scheme {}",
                base_url.scheme()
            )));
        }

        // Request paths are joined onto the base URL, which only keeps the
        // base's path if it ends with a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            base_url,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Set the network timeout for each request.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidConfig] if `timeout` is zero.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, Error> {
        if timeout.is_zero() {
            return Err(Error::InvalidConfig("timeout must be greater than zero".to_owned()));
        }

        self.timeout = timeout;
        Ok(self)
    }

    /// The URL that request paths are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The network timeout for each request.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Deserialize)]
struct RawClientConfig {
    base_url: String,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

impl TryFrom<RawClientConfig> for ClientConfig {
    type Error = Error;

    fn try_from(raw: RawClientConfig) -> Result<Self, Self::Error> {
        Self::new(&raw.base_url)?.with_timeout(Duration::from_secs(raw.timeout_secs))
    }
}
