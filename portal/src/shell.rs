//! Session aware navigation of a single context
//!
//! The shell owns the session store and the navigator of one context and keeps them consistent:
//! every local mutation navigates to where the user belongs, and every change coming from another
//! context re-runs the guard on the current location.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use crate::role::Role;
use crate::router::{Navigator, Resolution, Route};
use crate::session::{self, Session, SessionStore};
use crate::storage::{LocalStorage, Subscription};

#[derive(Debug)]
pub struct Shell {
    store: SessionStore,
    navigator: Arc<Mutex<Navigator>>,
    current: Arc<Mutex<Option<Resolution>>>,
    _subscription: Subscription,
}

impl Shell {
    /// Opens the shell over a context storage, hydrating the session
    pub fn open(storage: LocalStorage) -> Result<Self, session::Error> {
        let store = SessionStore::open(storage)?;
        let navigator = Arc::new(Mutex::new(Navigator::new()));
        let current = Arc::new(Mutex::new(None));

        let subscription = store.on_external_change({
            let navigator = navigator.clone();
            let current = current.clone();
            move |session: &Session| {
                let resolution = navigator.lock().refresh(session.state());
                info!(view = %resolution.view, "Session changed in another context");
                *current.lock() = Some(resolution);
            }
        });

        Ok(Self {
            store,
            navigator,
            current,
            _subscription: subscription,
        })
    }

    /// Session store of this context
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Last navigation result, `None` before the first navigation
    pub fn current(&self) -> Option<Resolution> {
        self.current.lock().clone()
    }

    /// Current location
    pub fn location(&self) -> Option<Route> {
        self.navigator.lock().location().cloned()
    }

    /// Navigates to a path or route
    pub fn navigate(&self, route: impl Into<Route>) -> Resolution {
        let resolution = self.navigator.lock().navigate(self.store.state(), route);
        self.settled(resolution)
    }

    /// Re-runs the guard on the current location
    pub fn refresh(&self) -> Resolution {
        let resolution = self.navigator.lock().refresh(self.store.state());
        self.settled(resolution)
    }

    /// Stores a login and lands on the page for its role
    pub fn login(
        &self,
        token: &str,
        role: Option<Role>,
        user_id: Option<&str>,
    ) -> Result<Resolution, session::Error> {
        self.store.login(token, role, user_id)?;
        Ok(self.navigate(Route::landing(role)))
    }

    /// Selects a role and opens its dashboard
    pub fn choose_role(&self, role: Role) -> Result<Resolution, session::Error> {
        self.store.set_role(role)?;
        Ok(self.navigate(Route::Dashboard(role)))
    }

    /// Clears the session and returns to the login page
    pub fn logout(&self) -> Result<Resolution, session::Error> {
        self.store.logout()?;
        Ok(self.navigate(Route::Login))
    }

    fn settled(&self, resolution: Resolution) -> Resolution {
        *self.current.lock() = Some(resolution.clone());
        resolution
    }
}
