//! The log-in form: submits credentials, fetches the user's profile and then
//! navigates to the user's dashboard.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use maud::{Markup, html};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{Instrument, Span};

use crate::{
    Error, endpoints,
    endpoints::format_endpoint,
    http_client::{HttpClient, HttpRequest, dispatch},
    navigation::{Navigator, Route},
    request_state::{LoadingGuard, RequestCycle, RequestState, RequestToken},
    user::{Credentials, User, UserId},
};

/// The body of a successful log-in response.
///
/// Every level is optional so that a missing ID can be reported as such
/// rather than as an unparsable body.
#[derive(Debug, Deserialize)]
struct LogInResponse {
    #[serde(default)]
    user: Option<LogInUser>,
}

#[derive(Debug, Deserialize)]
struct LogInUser {
    #[serde(default)]
    id: Option<UserId>,
}

/// The body of a rejected log-in response.
#[derive(Debug, Deserialize)]
struct LogInErrorBody {
    error: String,
}

/// The body of a successful profile response.
#[derive(Debug, Deserialize)]
struct ProfileResponse {
    user: Map<String, Value>,
}

#[derive(Debug, Default)]
struct AuthState {
    cycle: RequestCycle,
    user: Option<User>,
}

impl AuthState {
    fn begin(&mut self) -> RequestToken {
        self.user = None;
        self.cycle.begin()
    }
}

impl AsMut<RequestCycle> for AuthState {
    fn as_mut(&mut self) -> &mut RequestCycle {
        &mut self.cycle
    }
}

/// A point-in-time copy of the log-in form's state.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSnapshot {
    /// The state of the most recent log-in attempt.
    pub request: RequestState,
    /// The user, once log-in and the profile fetch have both succeeded.
    pub user: Option<User>,
}

/// Converts credentials into a logged in user, then navigates to the dashboard.
///
/// The handle is cheap to clone and all clones share the same state. Submitting
/// again while a previous attempt is in flight supersedes that attempt: its
/// response is discarded and it will not navigate.
#[derive(Clone)]
pub struct Authenticator {
    state: Arc<Mutex<AuthState>>,
    client: Arc<dyn HttpClient>,
    navigator: Arc<dyn Navigator>,
    span: Span,
}

impl Authenticator {
    /// Create an idle log-in form.
    pub fn new(client: Arc<dyn HttpClient>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            state: Arc::default(),
            client,
            navigator,
            span: tracing::info_span!("log_in"),
        }
    }

    /// Record this form's events under `span` instead of its own span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    fn lock(&self) -> MutexGuard<'_, AuthState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get a copy of the current state.
    pub fn state(&self) -> AuthSnapshot {
        let state = self.lock();

        AuthSnapshot {
            request: state.cycle.state().clone(),
            user: state.user.clone(),
        }
    }

    /// Whether a log-in attempt is in flight.
    pub fn is_loading(&self) -> bool {
        self.lock().cycle.state().is_loading()
    }

    /// The logged in user, if log-in has succeeded.
    pub fn user(&self) -> Option<User> {
        self.lock().user.clone()
    }

    /// Hand the logged in user over to the next view.
    pub fn take_user(&self) -> Option<User> {
        self.lock().user.take()
    }

    /// Submit `credentials` to the backend.
    ///
    /// On success the user's profile is stored and the navigator is asked to
    /// show the user's dashboard. On failure the error message is stored in
    /// the request state and the form can be submitted again. The credentials
    /// are dropped once the attempt is over.
    pub async fn submit(&self, credentials: Credentials) {
        let token = self.lock().begin();
        let _guard = LoadingGuard::new(Arc::clone(&self.state), token);
        let span = tracing::info_span!(
            parent: &self.span,
            "submit",
            request = token.epoch(),
            username = %credentials.username
        );

        async {
            let outcome = self.log_in(credentials).await;
            self.complete(token, outcome);
        }
        .instrument(span)
        .await;
    }

    async fn log_in(&self, credentials: Credentials) -> Result<User, Error> {
        let body = json!({
            "username": credentials.username,
            "password": credentials.password,
        });
        let response = dispatch(
            self.client.as_ref(),
            HttpRequest::post_json(endpoints::LOG_IN, body),
        )
        .await?;

        if !response.is_success() {
            let error_body: LogInErrorBody =
                serde_json::from_str(&response.body).map_err(|error| {
                    tracing::error!("could not parse log-in error body: {error}");
                    Error::MalformedCredentialsResponse
                })?;

            return Err(Error::LoginRejected(error_body.error));
        }

        let log_in_response: LogInResponse =
            serde_json::from_str(&response.body).map_err(|error| {
                tracing::error!("could not parse log-in response body: {error}");
                Error::MalformedCredentialsResponse
            })?;

        let user_id = log_in_response
            .user
            .and_then(|user| user.id)
            .filter(|id| !id.is_empty())
            .ok_or(Error::MissingUserId)?;

        self.fetch_profile(user_id).await
    }

    async fn fetch_profile(&self, user_id: UserId) -> Result<User, Error> {
        let path = format_endpoint(endpoints::USER, &[user_id.as_str()]);
        let response = dispatch(self.client.as_ref(), HttpRequest::get(path)).await?;

        if !response.is_success() {
            tracing::error!("Error fetching user data: {}", response.status);

            return Err(if response.status == StatusCode::INTERNAL_SERVER_ERROR {
                Error::ProfileServerError
            } else {
                Error::ProfileFetchRejected
            });
        }

        if !response.is_json() {
            tracing::error!(
                "Invalid or empty JSON response, content type: {:?}",
                response.content_type
            );
            return Err(Error::ProfileFetchMalformed);
        }

        let profile: ProfileResponse = serde_json::from_str(&response.body).map_err(|error| {
            tracing::error!("could not parse profile body: {error}");
            Error::ProfileFetchMalformed
        })?;

        Ok(User::from_profile(user_id, profile.user))
    }

    fn complete(&self, token: RequestToken, outcome: Result<User, Error>) {
        let route = {
            let mut state = self.lock();

            if !state.cycle.is_current(token) {
                tracing::debug!("discarding response for a superseded log-in attempt");
                return;
            }

            match outcome {
                Ok(user) => {
                    let route = Route::Dashboard(user.id.clone());
                    state.user = Some(user);
                    state.cycle.finish(token, Ok(()));
                    route
                }
                Err(error) => {
                    tracing::warn!("Login failed: {error}");
                    state.cycle.finish(token, Err(error.to_string()));
                    return;
                }
            }
        };

        tracing::info!(%route, "log-in succeeded");
        self.navigator.navigate(route);
    }
}

/// Render the log-in form for `state`.
///
/// The username is kept in the form, the password is never rendered.
pub fn log_in_form(state: &AuthSnapshot, credentials: &Credentials) -> Markup {
    let is_loading = state.request.is_loading();

    html! {
        form method="post" action=(endpoints::LOG_IN) {
            h2 { "Login" }

            label {
                "Username:"
                input type="text" name="username" value=(credentials.username);
            }

            label {
                "Password:"
                input type="password" name="password";
            }

            button type="submit" disabled[is_loading] {
                @if is_loading { "Logging in..." } @else { "Login" }
            }

            @if let Some(message) = state.request.error_message() {
                p role="alert" { (message) }
            }
        }
    }
}
