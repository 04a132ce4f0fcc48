//! The backend and view routes used by the client.
//!
//! For routes that take parameters, e.g., '/user/{user_id}', use [format_endpoint].

/// The route for submitting log-in credentials.
pub const LOG_IN: &str = "/login";
/// The route for fetching a user's profile.
pub const USER: &str = "/user/{user_id}";
/// The route for fetching the transactions of one of a user's accounts.
pub const ACCOUNT_TRANSACTIONS: &str = "/user/{user_id}/accounts/{account_id}/transactions";
/// The view the navigator activates once a user has logged in.
pub const DASHBOARD_VIEW: &str = "/dashboard/{user_id}";

/// Replace the parameters in `endpoint_path` with `params`, in order.
///
/// A parameter is a string that starts with a left brace and ends with a right
/// brace. For example, in the endpoint path '/user/{user_id}', '{user_id}' is
/// the parameter.
///
/// Each value is percent-encoded so that it always lands in a single path
/// segment. Parameters without a matching value are left in place and extra
/// values are ignored.
pub fn format_endpoint(endpoint_path: &str, params: &[&str]) -> String {
    let mut formatted = String::with_capacity(endpoint_path.len());
    let mut rest = endpoint_path;
    let mut params = params.iter();

    while let Some(start) = rest.find('{') {
        let Some(end) = rest[start..].find('}').map(|end| start + end + 1) else {
            break;
        };

        let Some(value) = params.next() else {
            break;
        };

        formatted.push_str(&rest[..start]);
        formatted.push_str(&urlencoding::encode(value));
        rest = &rest[end..];
    }

    formatted.push_str(rest);
    formatted
}
