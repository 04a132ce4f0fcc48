//! Ledger client is the client side of a personal finance app.
//!
//! It provides two self-contained views that talk to the backend over HTTP:
//! - [Authenticator]: submits log-in credentials, fetches the user's profile
//!   and navigates to the user's dashboard.
//! - [TransactionsViewer]: loads and renders the transactions of one of a
//!   user's accounts.
//!
//! Both views track their requests with a [RequestState] and ignore responses
//! to requests that have since been superseded.

#![warn(missing_docs)]

mod config;
mod endpoints;
mod http_client;
mod log_in;
mod logging;
mod navigation;
mod request_state;
mod transaction;
mod transactions_page;
mod user;

#[cfg(test)]
mod test_utils;

pub use config::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use endpoints::format_endpoint;
pub use http_client::{
    HttpClient, HttpRequest, HttpResponse, JSON_CONTENT_TYPE, ReqwestClient, TransportError,
};
pub use log_in::{AuthSnapshot, Authenticator, log_in_form};
pub use logging::{LOG_BODY_LENGTH_LIMIT, init_logging};
pub use navigation::{Navigator, Route};
pub use request_state::{Phase, RequestCycle, RequestState, RequestToken};
pub use transaction::Transaction;
pub use transactions_page::{
    TransactionRow, TransactionsSnapshot, TransactionsViewer, transactions_list,
};
pub use user::{AccountId, CredentialField, Credentials, User, UserId};

/// The message shown when the backend could not be reached.
pub const RETRY_MESSAGE: &str = "Something went wrong. Please try again.";

/// The broad category of an [Error].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The backend answered with a non-2xx status.
    RemoteRejection,
    /// The backend answered with a body of an unexpected shape or content type.
    MalformedResponse,
    /// The request failed below the HTTP layer.
    TransportFault,
    /// The client was configured incorrectly.
    InvalidConfig,
}

/// The errors that may occur in the client.
///
/// The display text of each variant is the message shown to the user.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum Error {
    /// The log-in response body could not be parsed.
    #[error("Malformed server response. Please check your server response.")]
    MalformedCredentialsResponse,

    /// The log-in succeeded but the response did not identify the user.
    #[error("User ID not found in the response.")]
    MissingUserId,

    /// The backend rejected the credentials, the string is its reason.
    #[error("Login failed: {0}")]
    LoginRejected(String),

    /// The backend failed with status 500 while fetching the user's profile.
    #[error("Internal Server Error. Please try again later.")]
    ProfileServerError,

    /// The backend rejected the profile request with a non-2xx status other than 500.
    #[error("Error fetching user data.")]
    ProfileFetchRejected,

    /// The profile response was not JSON or did not contain a user.
    #[error("Error fetching user data.")]
    ProfileFetchMalformed,

    /// The backend rejected the transactions request, the string is the response body.
    #[error("Error fetching transactions: {0}")]
    TransactionsRejected(String),

    /// The transactions response did not contain a valid list of transactions.
    #[error("Error fetching transactions: malformed response.")]
    TransactionsMalformed,

    /// The request failed below the HTTP layer.
    ///
    /// The details are logged but not shown to the user.
    #[error("Something went wrong. Please try again.")]
    Transport(#[from] TransportError),

    /// The client configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// The category of the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::LoginRejected(_)
            | Error::ProfileServerError
            | Error::ProfileFetchRejected
            | Error::TransactionsRejected(_) => ErrorKind::RemoteRejection,
            Error::MalformedCredentialsResponse
            | Error::MissingUserId
            | Error::ProfileFetchMalformed
            | Error::TransactionsMalformed => ErrorKind::MalformedResponse,
            Error::Transport(_) => ErrorKind::TransportFault,
            Error::InvalidConfig(_) => ErrorKind::InvalidConfig,
        }
    }
}
