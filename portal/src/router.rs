//! Role based route guarding
//!
//! [`guard`] decides a single navigation step: either a view renders, or the request is redirected
//! elsewhere. Denials are always redirects. The [`Navigator`] applies those decisions to a history
//! stack, following redirects until something renders.

use std::borrow::Cow;
use std::fmt;

use derivative::Derivative;
use tracing::{debug, error, warn};

use crate::role::Role;
use crate::session::SessionState;

pub const LOGIN_PATH: &str = "/login";
pub const CHOOSE_ROLE_PATH: &str = "/choose-role";
pub const DASHBOARD_PATH: &str = "/dashboard";

/// Upper bound of redirects followed for a single navigation
///
/// Every state settles in at most three steps (e.g. mismatched dashboard → login → own
/// dashboard), anything above that is a routing table bug.
const MAX_REDIRECTS: usize = 4;

/// Number of history entries a navigator keeps
pub const MAX_HISTORY: usize = 64;

/// Navigation target
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    /// `/login`
    Login,
    /// `/choose-role`
    ChooseRole,
    /// `/dashboard`, which only forwards to the role dashboard
    DashboardIndex,
    /// `/dashboard/{role}`
    Dashboard(Role),
    /// Any path not matching the routes above
    Unknown(String),
}

impl Route {
    /// Matches a path to a route
    ///
    /// Matching ignores ASCII case, a trailing slash and any query or fragment.
    pub fn parse(path: &str) -> Self {
        let normalized = path
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_end_matches('/')
            .to_ascii_lowercase();

        match normalized.as_str() {
            LOGIN_PATH => Self::Login,
            CHOOSE_ROLE_PATH => Self::ChooseRole,
            DASHBOARD_PATH => Self::DashboardIndex,
            other => other
                .strip_prefix("/dashboard/")
                .and_then(Role::from_dashboard_segment)
                .map(Self::Dashboard)
                .unwrap_or_else(|| Self::Unknown(path.to_owned())),
        }
    }

    /// Path of the route
    pub fn path(&self) -> Cow<'_, str> {
        match self {
            Self::Login => LOGIN_PATH.into(),
            Self::ChooseRole => CHOOSE_ROLE_PATH.into(),
            Self::DashboardIndex => DASHBOARD_PATH.into(),
            Self::Dashboard(role) => role.dashboard_path().into(),
            Self::Unknown(path) => path.as_str().into(),
        }
    }

    /// Route a user lands on right after logging in
    ///
    /// Guests are asked to pick a proper role first. An unrecognized role is sent to the role
    /// selection as well.
    pub fn landing(role: Option<Role>) -> Self {
        match role {
            Some(Role::Guest) => Self::ChooseRole,
            Some(role) => Self::Dashboard(role),
            None => {
                warn!("Unknown role, landing on role selection");
                Self::ChooseRole
            }
        }
    }
}

impl From<&str> for Route {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Page that can be rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Login,
    ChooseRole,
    Dashboard(Role),
}

impl View {
    /// Route under which the view renders
    pub fn route(self) -> Route {
        match self {
            Self::Login => Route::Login,
            Self::ChooseRole => Route::ChooseRole,
            Self::Dashboard(role) => Route::Dashboard(role),
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Login => f.write_str("Login"),
            Self::ChooseRole => f.write_str("Role selection"),
            Self::Dashboard(role) => write!(f, "{} dashboard", role.label()),
        }
    }
}

/// Decision taken for a single navigation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Render the view
    Render(View),
    /// Go elsewhere. With `replace` the requested entry is replaced in the history instead of
    /// kept below the target.
    Redirect { to: Route, replace: bool },
}

impl Outcome {
    fn redirect(to: Route) -> Self {
        Self::Redirect { to, replace: true }
    }
}

/// Decides what happens when `route` is requested in the given session state
pub fn guard(state: SessionState, route: &Route) -> Outcome {
    use SessionState::*;

    match (route, state) {
        (Route::Login, AuthenticatedWithRole(role)) => Outcome::Redirect {
            to: Route::Dashboard(role),
            replace: false,
        },
        (Route::Login, _) => Outcome::Render(View::Login),

        (Route::ChooseRole, Unauthenticated) => Outcome::redirect(Route::Login),
        (Route::ChooseRole, _) => Outcome::Render(View::ChooseRole),

        (Route::DashboardIndex | Route::Dashboard(_), Unauthenticated) => {
            Outcome::redirect(Route::Login)
        }
        (Route::DashboardIndex | Route::Dashboard(_), AuthenticatedNoRole) => {
            Outcome::redirect(Route::ChooseRole)
        }
        (Route::DashboardIndex, AuthenticatedWithRole(role)) => {
            Outcome::redirect(Route::Dashboard(role))
        }
        (Route::Dashboard(requested), AuthenticatedWithRole(role)) if *requested == role => {
            Outcome::Render(View::Dashboard(role))
        }
        // Fails closed: a foreign dashboard sends the user to login, not to their own dashboard.
        (Route::Dashboard(_), AuthenticatedWithRole(_)) => Outcome::redirect(Route::Login),

        (Route::Unknown(_), AuthenticatedWithRole(role)) => {
            Outcome::redirect(Route::Dashboard(role))
        }
        (Route::Unknown(_), _) => Outcome::redirect(Route::Login),
    }
}

/// Result of a navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Rendered view
    pub view: View,
    /// Redirects followed to reach the view, in order
    pub redirects: Vec<Route>,
}

/// Navigation history of a single context
#[derive(Derivative, Clone, PartialEq, Eq)]
#[derivative(Debug, Default(new = "true"))]
pub struct Navigator {
    /// Visited routes, current location last
    history: Vec<Route>,
}

impl Navigator {
    /// Current location, if anything was visited
    pub fn location(&self) -> Option<&Route> {
        self.history.last()
    }

    /// Visited routes, oldest first
    pub fn history(&self) -> &[Route] {
        &self.history
    }

    /// Navigates to a route, following redirects until a view renders
    pub fn navigate(&mut self, state: SessionState, route: impl Into<Route>) -> Resolution {
        self.push(route.into());
        self.settle(state)
    }

    /// Re-evaluates the current location, e.g. after the session changed
    ///
    /// With empty history this lands on the login page.
    pub fn refresh(&mut self, state: SessionState) -> Resolution {
        if self.history.is_empty() {
            self.push(Route::Login);
        }
        self.settle(state)
    }

    /// Returns to the previous entry and re-evaluates it
    ///
    /// Returns `None` if there is nowhere to go back to.
    pub fn back(&mut self, state: SessionState) -> Option<Resolution> {
        if self.history.len() < 2 {
            return None;
        }
        self.history.pop();
        Some(self.settle(state))
    }

    /// Adds a history entry, forgetting the oldest one past `MAX_HISTORY`
    fn push(&mut self, route: Route) {
        self.history.push(route);
        if self.history.len() > MAX_HISTORY {
            let excess = self.history.len() - MAX_HISTORY;
            self.history.drain(..excess);
        }
    }

    fn settle(&mut self, state: SessionState) -> Resolution {
        let mut redirects = Vec::new();

        loop {
            let Some(current) = self.history.last() else {
                self.push(Route::Login);
                continue;
            };

            match guard(state, current) {
                Outcome::Render(view) => {
                    debug!(?state, %view, redirects = redirects.len(), "Navigation settled");
                    return Resolution { view, redirects };
                }
                Outcome::Redirect { to, replace } => {
                    if redirects.len() >= MAX_REDIRECTS {
                        error!(?state, ?redirects, "Redirect limit exceeded, falling back to login");
                        self.push(Route::Login);
                        return Resolution {
                            view: View::Login,
                            redirects,
                        };
                    }

                    debug!(from = %current, %to, replace, "Redirecting");
                    if replace {
                        self.history.pop();
                    }
                    self.push(to.clone());
                    redirects.push(to);
                }
            }
        }
    }
}
