//! The views the client can switch to and the collaborator that switches them.

use std::fmt::{self, Display};

use crate::{
    endpoints::{self, format_endpoint},
    user::UserId,
};

/// A view that can be activated after a flow completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// The landing page for a logged in user.
    Dashboard(UserId),
}

impl Route {
    /// The path of the view, e.g. '/dashboard/42'.
    pub fn path(&self) -> String {
        match self {
            Route::Dashboard(user_id) => {
                format_endpoint(endpoints::DASHBOARD_VIEW, &[user_id.as_str()])
            }
        }
    }
}

impl Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Switches the active view.
pub trait Navigator: Send + Sync {
    /// Activate the view for `route`.
    fn navigate(&self, route: Route);
}
