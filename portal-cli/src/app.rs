//! Portal client: the session shell of a single context backed by the REST API

use chrono::{DateTime, Utc};
use color_eyre::Result;
use color_eyre::eyre::ensure;
use portal::{Claims, LocalStorage, Profile, ProfileStore, Resolution, Role, Session, Shell, View};
use tracing::{info, instrument, warn};

use crate::api::{self, Api, Credentials, Registration};

/// Snapshot of the client state
#[derive(Debug, Clone)]
pub struct Status {
    pub session: Session,
    pub profile: Profile,
    /// View the current location resolves to
    pub view: View,
    /// Claims of the session token, if it decodes
    pub claims: Option<Claims>,
}

impl Status {
    /// Token expiration, if the token carries one
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.claims.as_ref().and_then(Claims::expires_at)
    }

    pub fn is_expired(&self) -> bool {
        self.claims
            .as_ref()
            .is_some_and(|claims| claims.is_expired_at(Utc::now()))
    }
}

/// Role offered on the role selection page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleChoice {
    pub role: Role,
    pub label: &'static str,
    /// Accent colour, `#RRGGBB`
    pub color: &'static str,
    pub dashboard: &'static str,
}

/// Roles a user may pick for themselves, in display order
pub fn role_choices() -> Vec<RoleChoice> {
    Role::SELECTABLE
        .into_iter()
        .map(|role| RoleChoice {
            role,
            label: role.label(),
            color: role.color(),
            dashboard: role.dashboard_path(),
        })
        .collect()
}

#[derive(Debug)]
pub struct App {
    shell: Shell,
    profiles: ProfileStore,
    api: Api,
}

impl App {
    /// Opens the client over a context storage
    pub fn open(storage: LocalStorage, api: Api) -> Result<Self> {
        let profiles = ProfileStore::new(storage.clone());
        let shell = Shell::open(storage)?;

        Ok(Self {
            shell,
            profiles,
            api,
        })
    }

    /// Logs in through the backend and lands on the page for the returned role
    ///
    /// A role the client doesn't know is dropped, sending the user to role selection.
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn login(&self, credentials: &Credentials) -> Result<Resolution> {
        let response = self.api.login(credentials).await?;

        let role = match response.role.as_deref().map(str::parse::<Role>) {
            None => None,
            Some(Ok(role)) => Some(role),
            Some(Err(err)) => {
                warn!(%err, "Backend returned a role this client doesn't support");
                None
            }
        };
        let user_id = portal::user_id_from_token(&response.token);

        let resolution = self
            .shell
            .login(&response.token, role, user_id.as_deref())?;

        self.profiles.save(&Profile {
            email: response.email.or_else(|| Some(credentials.email.clone())),
            user_name: response.user_name,
        })?;

        info!(?role, ?user_id, view = %resolution.view, "Logged in");
        Ok(resolution)
    }

    /// Registers a new account; the session is left untouched
    pub async fn register(&self, registration: &Registration) -> Result<()> {
        self.api.register(registration).await?;
        info!(email = %registration.email, role = %registration.role, "Registered");
        Ok(())
    }

    /// Picks one of the self-selectable roles
    pub fn choose_role(&self, role: Role) -> Result<Resolution> {
        ensure!(role.is_selectable(), api::Error::RoleNotSelectable(role));
        Ok(self.shell.choose_role(role)?)
    }

    /// Ends the session and forgets the profile
    pub fn logout(&self) -> Result<Resolution> {
        let resolution = self.shell.logout()?;
        self.profiles.clear()?;
        info!("Logged out");
        Ok(resolution)
    }

    /// Opens a path as the current session allows
    pub fn open_path(&self, path: &str) -> Resolution {
        self.shell.navigate(path)
    }

    pub fn status(&self) -> Result<Status> {
        let session = self.shell.store().session();
        let claims = session
            .token
            .as_deref()
            .and_then(|token| Claims::decode(token).ok());

        Ok(Status {
            profile: self.profiles.load()?,
            view: self.shell.refresh().view,
            session,
            claims,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use portal::{Origin, SessionState};
    use serde_json::{Value, json};

    use crate::api::tests::{EMAIL, MockBackend, PASSWORD, token};

    fn credentials() -> Credentials {
        Credentials {
            email: EMAIL.to_owned(),
            password: PASSWORD.to_owned(),
        }
    }

    fn app(backend: &MockBackend) -> App {
        App::open(Origin::memory().context(), backend.api()).unwrap()
    }

    fn login_response(role: &str, claims: Value) -> Value {
        json!({
            "token": token(claims),
            "role": role,
            "email": EMAIL,
            "userName": "Jane",
        })
    }

    #[tokio::test]
    async fn login_lands_on_role_dashboard() {
        let backend = MockBackend::start(login_response("ADMIN", json!({ "jti": "42" })));
        let app = app(&backend);

        let resolution = app.login(&credentials()).await.unwrap();
        assert_eq!(resolution.view, View::Dashboard(Role::Admin));

        let status = app.status().unwrap();
        assert_eq!(status.session.state(), SessionState::AuthenticatedWithRole(Role::Admin));
        assert_eq!(status.session.user_id.as_deref(), Some("42"));
        assert_eq!(status.profile.display_name(), "Jane");
        assert_eq!(status.view, View::Dashboard(Role::Admin));
        assert_eq!(status.expires_at(), None);
        assert!(!status.is_expired());
    }

    #[tokio::test]
    async fn guest_picks_a_role() {
        let backend = MockBackend::start(login_response("GUEST", json!({ "sub": 7 })));
        let app = app(&backend);

        let resolution = app.login(&credentials()).await.unwrap();
        assert_eq!(resolution.view, View::ChooseRole);

        let resolution = app.choose_role(Role::Employer).unwrap();
        assert_eq!(resolution.view, View::Dashboard(Role::Employer));
        assert_eq!(app.status().unwrap().session.user_id.as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn unknown_role_requires_selection() {
        let backend = MockBackend::start(login_response("RECRUITER", json!({ "jti": "9" })));
        let app = app(&backend);

        let resolution = app.login(&credentials()).await.unwrap();
        assert_eq!(resolution.view, View::ChooseRole);
        assert_eq!(app.status().unwrap().session.role, None);
    }

    #[tokio::test]
    async fn rejected_login_keeps_session() {
        let backend = MockBackend::start(login_response("ADMIN", json!({ "jti": "42" })));
        let app = app(&backend);

        let credentials = Credentials {
            email: EMAIL.to_owned(),
            password: "guess".to_owned(),
        };
        let err = app.login(&credentials).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<api::Error>(),
            Some(api::Error::Rejected { status: 401, .. })
        ));

        let status = app.status().unwrap();
        assert_eq!(status.session, Session::default());
        assert_eq!(status.view, View::Login);
    }

    #[tokio::test]
    async fn role_selection_rules() {
        let backend = MockBackend::start(login_response("GUEST", json!({ "jti": "3" })));
        let app = app(&backend);

        let err = app.choose_role(Role::Trainer).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<portal::session::Error>(),
            Some(portal::session::Error::NotAuthenticated)
        ));

        app.login(&credentials()).await.unwrap();
        let err = app.choose_role(Role::Admin).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<api::Error>(),
            Some(api::Error::RoleNotSelectable(Role::Admin))
        ));
        assert_eq!(app.status().unwrap().session.role, Some(Role::Guest));
    }

    #[tokio::test]
    async fn logout_forgets_profile() {
        let backend = MockBackend::start(login_response("TRAINER", json!({ "jti": "5" })));
        let app = app(&backend);

        app.login(&credentials()).await.unwrap();
        let resolution = app.logout().unwrap();
        assert_eq!(resolution.view, View::Login);

        let status = app.status().unwrap();
        assert_eq!(status.session, Session::default());
        assert_eq!(status.profile, Profile::default());
        assert_eq!(app.open_path("/dashboard/trainer").view, View::Login);
    }

    #[tokio::test]
    async fn expired_token_is_reported() {
        let backend = MockBackend::start(login_response(
            "EMPLOYER",
            json!({ "jti": "8", "exp": 1_000_000_000 }),
        ));
        let app = app(&backend);

        app.login(&credentials()).await.unwrap();
        let status = app.status().unwrap();
        assert_eq!(
            status.expires_at(),
            DateTime::from_timestamp(1_000_000_000, 0)
        );
        assert!(status.is_expired());
    }

    #[tokio::test]
    async fn token_without_expiry_never_expires() {
        let backend = MockBackend::start(login_response("TRAINER", json!({ "jti": "4" })));
        let app = app(&backend);

        app.login(&credentials()).await.unwrap();
        let status = app.status().unwrap();
        assert!(status.claims.is_some());
        assert!(!status.is_expired());
    }

    #[test]
    fn role_choices_match_selection_page() {
        let choices = role_choices();
        assert_eq!(
            choices.iter().map(|choice| choice.role).collect::<Vec<_>>(),
            Role::SELECTABLE
        );
        assert!(choices.iter().all(|choice| choice.role != Role::Admin));

        let employer = choices[0];
        assert_eq!(employer.label, "Employer");
        assert_eq!(employer.color, "#FF6B6B");
        assert_eq!(employer.dashboard, "/dashboard/employer");
        assert_eq!(choices[2].color, "#4CAF50");
    }

    #[tokio::test]
    async fn session_survives_restart() {
        use portal::storage::FileBackend;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        let backend = MockBackend::start(login_response("JOBSEEKER", json!({ "jti": "11" })));

        {
            let origin = Origin::new(FileBackend::open(&path).unwrap());
            let app = App::open(origin.context(), backend.api()).unwrap();
            app.login(&credentials()).await.unwrap();
        }

        let origin = Origin::new(FileBackend::open(&path).unwrap());
        let app = App::open(origin.context(), backend.api()).unwrap();
        assert_eq!(
            app.open_path("/dashboard").view,
            View::Dashboard(Role::Jobseeker)
        );
        assert_eq!(app.status().unwrap().profile.email.as_deref(), Some(EMAIL));
    }
}
