//! Client side session
//!
//! The [`SessionStore`] is the only owner of the credential state of a context. It mirrors three
//! keys of the persisted storage: `token`, `role` and `userId`. Every mutation writes the storage
//! first and memory second, so memory is never ahead of what other contexts can observe.
//!
//! A login writes the token last and is undone as a whole when any key fails to store, so no
//! context ever sees a new token next to the role of the previous user.

use std::fmt;
use std::sync::Arc;

use derivative::Derivative;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::role::Role;
use crate::storage::{self, LocalStorage, Subscription};

/// Storage key of the credential token
pub const TOKEN_KEY: &str = "token";
/// Storage key of the user role
pub const ROLE_KEY: &str = "role";
/// Storage key of the user identifier
pub const USER_ID_KEY: &str = "userId";

#[derive(Debug, Error)]
pub enum Error {
    #[error("Credential token is empty")]
    EmptyToken,
    #[error("User id is empty")]
    EmptyUserId,
    #[error("Role can only be selected with an active session")]
    NotAuthenticated,
    #[error(transparent)]
    Storage(#[from] storage::Error),
}

fn redacted(token: &Option<String>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match token {
        Some(_) => f.write_str("Some(<redacted>)"),
        None => f.write_str("None"),
    }
}

/// Authentication state of a context
#[derive(Derivative, Clone, Default, PartialEq, Eq)]
#[derivative(Debug)]
pub struct Session {
    /// Bearer credential
    #[derivative(Debug(format_with = "redacted"))]
    pub token: Option<String>,
    /// Role of the user, if known
    pub role: Option<Role>,
    /// User identifier derived from the token
    pub user_id: Option<String>,
}

/// Routing relevant classification of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No credential
    Unauthenticated,
    /// Credential present, but no recognized role
    AuthenticatedNoRole,
    /// Credential with a role
    AuthenticatedWithRole(Role),
}

impl Session {
    /// Classifies the session
    pub fn state(&self) -> SessionState {
        match (&self.token, self.role) {
            (None, _) => SessionState::Unauthenticated,
            (Some(_), None) => SessionState::AuthenticatedNoRole,
            (Some(_), Some(role)) => SessionState::AuthenticatedWithRole(role),
        }
    }

    /// Whether a credential is present
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Reads the session from storage
    ///
    /// Absent keys are a valid, logged out state. An empty token counts as no token and an
    /// unrecognized role as no role.
    fn load(storage: &LocalStorage) -> Result<Self, storage::Error> {
        let token = storage.get(TOKEN_KEY)?.filter(|token| !token.is_empty());
        let role = storage
            .get(ROLE_KEY)?
            .and_then(|role| match role.parse::<Role>() {
                Ok(role) => Some(role),
                Err(err) => {
                    debug!(%err, "Ignoring stored role");
                    None
                }
            });
        let user_id = storage.get(USER_ID_KEY)?.filter(|id| !id.is_empty());

        Ok(Self {
            token,
            role,
            user_id,
        })
    }
}

/// Writes or removes a single key
fn store(storage: &LocalStorage, key: &str, value: Option<&str>) -> Result<(), storage::Error> {
    match value {
        Some(value) => storage.set(key, value),
        None => storage.remove(key),
    }
}

/// Writes keys in order, all of them or none
///
/// On failure the keys already written are restored to their previous values, newest first.
fn store_all(storage: &LocalStorage, writes: &[(&str, Option<&str>)]) -> Result<(), storage::Error> {
    let mut written = Vec::with_capacity(writes.len());

    for &(key, value) in writes {
        let result = storage
            .get(key)
            .and_then(|previous| store(storage, key, value).map(|()| previous));

        match result {
            Ok(previous) => written.push((key, previous)),
            Err(err) => {
                warn!(%key, %err, "Session write failed, restoring previous values");
                for (key, previous) in written.into_iter().rev() {
                    if let Err(err) = store(storage, key, previous.as_deref()) {
                        error!(%key, %err, "Cannot restore session key");
                    }
                }
                return Err(err);
            }
        }
    }

    Ok(())
}

/// Session state of a single context kept in sync with the persisted storage
#[derive(Debug, Clone)]
pub struct SessionStore {
    storage: LocalStorage,
    current: Arc<RwLock<Session>>,
}

impl SessionStore {
    /// Creates a store over the context storage. The store starts empty until hydrated.
    pub fn new(storage: LocalStorage) -> Self {
        Self {
            storage,
            current: Arc::new(RwLock::new(Session::default())),
        }
    }

    /// Creates a store and hydrates it right away
    pub fn open(storage: LocalStorage) -> Result<Self, Error> {
        let store = Self::new(storage);
        store.hydrate()?;
        Ok(store)
    }

    /// Storage this store works on
    pub fn storage(&self) -> &LocalStorage {
        &self.storage
    }

    /// Snapshot of the current session
    pub fn session(&self) -> Session {
        self.current.read().clone()
    }

    /// Current routing state
    pub fn state(&self) -> SessionState {
        self.current.read().state()
    }

    /// Reloads the session from storage
    pub fn hydrate(&self) -> Result<Session, Error> {
        let session = Session::load(&self.storage)?;
        *self.current.write() = session.clone();
        debug!(state = ?session.state(), "Session hydrated");
        Ok(session)
    }

    /// Stores a fresh login
    ///
    /// `role` and `user_id` may be unknown, in which case their keys are cleared. Empty values are
    /// rejected before anything is written.
    pub fn login(&self, token: &str, role: Option<Role>, user_id: Option<&str>) -> Result<(), Error> {
        if token.is_empty() {
            return Err(Error::EmptyToken);
        }
        if user_id.is_some_and(str::is_empty) {
            return Err(Error::EmptyUserId);
        }

        let writes = [
            (ROLE_KEY, role.map(Role::as_str)),
            (USER_ID_KEY, user_id),
            (TOKEN_KEY, Some(token)),
        ];
        if let Err(err) = store_all(&self.storage, &writes) {
            self.resync();
            return Err(err.into());
        }

        *self.current.write() = Session {
            token: Some(token.to_owned()),
            role,
            user_id: user_id.map(str::to_owned),
        };

        info!(?role, ?user_id, "Logged in");
        Ok(())
    }

    /// Changes the role of the logged in user
    pub fn set_role(&self, role: Role) -> Result<(), Error> {
        if !self.current.read().is_authenticated() {
            warn!(%role, "Role selected without an active session");
            return Err(Error::NotAuthenticated);
        }

        self.storage.set(ROLE_KEY, role.as_str())?;
        self.current.write().role = Some(role);

        info!(%role, "Role selected");
        Ok(())
    }

    /// Clears the session
    ///
    /// The token goes first. If a later key cannot be removed the session is already logged out
    /// and memory follows what is left in storage.
    pub fn logout(&self) -> Result<(), Error> {
        for key in [TOKEN_KEY, ROLE_KEY, USER_ID_KEY] {
            if let Err(err) = self.storage.remove(key) {
                self.resync();
                return Err(err.into());
            }
        }
        *self.current.write() = Session::default();

        info!("Logged out");
        Ok(())
    }

    /// Reloads memory after a failed mutation, keeping it in line with storage
    fn resync(&self) {
        if let Err(err) = self.hydrate() {
            error!(%err, "Cannot reload session after failed write");
        }
    }

    /// Follows changes made to the session by other contexts
    ///
    /// On every change notification the store re-hydrates from storage, which is authoritative,
    /// and passes the fresh session to `callback`. Changes stop being followed once the returned
    /// subscription is dropped.
    pub fn on_external_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Session) + Send + Sync + 'static,
    {
        let store = self.clone();
        self.storage.subscribe(move |event| {
            if ![TOKEN_KEY, ROLE_KEY, USER_ID_KEY].contains(&event.key.as_str()) {
                return;
            }

            debug!(key = %event.key, source = %event.source, "Session changed externally");
            match store.hydrate() {
                Ok(session) => callback(&session),
                Err(err) => warn!(%err, "Cannot hydrate session after external change"),
            }
        })
    }
}
