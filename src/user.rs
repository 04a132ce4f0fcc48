//! The user-facing identifiers, credentials and profile returned by the backend.

use std::fmt::{self, Display};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A raw identifier as it appears in a response body.
///
/// Backends emit identifiers as either JSON strings or JSON numbers. Both are
/// normalized to their text form.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(serde_json::Number),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(text) => text,
            RawId::Number(number) => number.to_string(),
        }
    }
}

/// Deserialize an identifier that may be either a JSON string or a JSON number.
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(deserializer).map(String::from)
}

/// A newtype wrapper for user IDs.
///
/// This helps disambiguate user IDs from account and transaction IDs when
/// building request paths.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(#[serde(deserialize_with = "deserialize_id")] String);

impl UserId {
    /// Create a new user ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The ID as it is sent to the backend.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the ID is the empty string, which the backend never issues.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A newtype wrapper for the ID of one of a user's accounts.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(#[serde(deserialize_with = "deserialize_id")] String);

impl AccountId {
    /// Create a new account ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The ID as it is sent to the backend.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The fields of the log-in form.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialField {
    /// The `username` input.
    Username,
    /// The `password` input.
    Password,
}

/// The raw data entered by the user in the log-in form.
///
/// There is no validation here, empty fields are sent as-is and the backend
/// decides whether they are acceptable. Credentials are consumed by
/// [crate::Authenticator::submit] and never stored.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Username entered during log-in.
    pub username: String,
    /// Password entered during log-in.
    pub password: String,
}

impl Credentials {
    /// Create credentials from a username and password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Replace the username.
    pub fn set_username(&mut self, username: impl Into<String>) {
        self.username = username.into();
    }

    /// Replace the password.
    pub fn set_password(&mut self, password: impl Into<String>) {
        self.password = password.into();
    }

    /// Replace the value of a single form field.
    pub fn update(&mut self, field: CredentialField, value: impl Into<String>) {
        match field {
            CredentialField::Username => self.set_username(value),
            CredentialField::Password => self.set_password(value),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// A logged in user of the application.
///
/// Only the ID is interpreted by the client. The remaining profile fields are
/// kept as-is for the view that takes over after log-in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    /// The user's ID on the backend.
    pub id: UserId,
    /// All other fields of the user's profile.
    pub profile: Map<String, Value>,
}

impl User {
    /// Create a user from the profile object returned by the backend.
    ///
    /// The `id` the profile was requested for wins over any `id` field in the
    /// profile itself.
    pub fn from_profile(id: UserId, mut profile: Map<String, Value>) -> Self {
        profile.remove("id");

        Self { id, profile }
    }

    /// Get a profile field by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.profile.get(name)
    }
}
