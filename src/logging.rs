//! Logging for requests to and responses from the backend.

use serde_json::Value;
use tracing_subscriber::{
    Layer, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
    util::TryInitError,
};

use crate::http_client::{HttpRequest, HttpResponse};

/// Bodies longer than this many characters are truncated at the `info` level
/// and logged in full at the `debug` level.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

const REDACTED: &str = "********";

/// Install a pretty-printing subscriber that logs events at `level` and above.
///
/// # Errors
///
/// Returns an error if a global subscriber has already been installed.
pub fn init_logging(level: LevelFilter) -> Result<(), TryInitError> {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    tracing_subscriber::registry()
        .with(stdout_log.with_filter(level))
        .try_init()
}

/// Log a request before it is sent.
///
/// The password field of JSON bodies is never logged.
pub(crate) fn log_request(request: &HttpRequest) {
    let body = request
        .body
        .as_ref()
        .map(|body| redact_password(body).to_string())
        .unwrap_or_default();

    match truncate(&body) {
        Some(truncated) => {
            tracing::info!(
                method = %request.method,
                path = %request.path,
                "Sending request, body: {truncated}..."
            );
            tracing::debug!("Full request body: {body:?}");
        }
        None => {
            tracing::info!(
                method = %request.method,
                path = %request.path,
                "Sending request, body: {body:?}"
            );
        }
    }
}

/// Log a response once its body has been read.
pub(crate) fn log_response(response: &HttpResponse) {
    let content_type = response.content_type.as_deref().unwrap_or("none");

    match truncate(&response.body) {
        Some(truncated) => {
            tracing::info!(
                status = %response.status,
                content_type,
                "Received response, body: {truncated}..."
            );
            tracing::debug!("Full response body: {:?}", response.body);
        }
        None => {
            tracing::info!(
                status = %response.status,
                content_type,
                "Received response, body: {:?}",
                response.body
            );
        }
    }
}

fn redact_password(body: &Value) -> Value {
    let mut body = body.clone();

    if let Some(password) = body.get_mut("password") {
        *password = Value::String(REDACTED.to_owned());
    }

    body
}

/// Get the first [LOG_BODY_LENGTH_LIMIT] characters of `body`, or `None` if
/// the body is short enough to log in full.
fn truncate(body: &str) -> Option<&str> {
    body.char_indices()
        .nth(LOG_BODY_LENGTH_LIMIT)
        .map(|(end, _)| &body[..end])
}
