//! Job portal REST backend client
//!
//! Covers the user endpoints the session depends on: login and self-registration.

use derivative::Derivative;
use portal::Role;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config;

#[cfg(test)]
pub(crate) mod tests;

#[derive(Debug, Error)]
pub enum Error {
    #[error("All fields are required")]
    MissingFields,
    #[error("Role {0} cannot be chosen at registration")]
    RoleNotSelectable(Role),
    #[error("Backend rejected the request ({status}): {}", .message.as_deref().unwrap_or("no details"))]
    Rejected {
        status: u16,
        message: Option<String>,
    },
    #[error("Backend request failed")]
    Http(#[from] reqwest::Error),
}

/// Login form
#[derive(Derivative, Clone, Serialize)]
#[derivative(Debug)]
pub struct Credentials {
    pub email: String,
    #[derivative(Debug = "ignore")]
    pub password: String,
}

/// Successful login
#[derive(Derivative, Clone, Deserialize, PartialEq, Eq)]
#[derivative(Debug)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Bearer credential
    #[derivative(Debug = "ignore")]
    pub token: String,
    /// Role as named by the backend; kept raw as the backend may know roles this client doesn't
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
}

/// Self-registration form
#[derive(Derivative, Clone, Serialize)]
#[derivative(Debug)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub user_name: String,
    pub email: String,
    #[derivative(Debug = "ignore")]
    pub password: String,
    pub role: Role,
}

impl Registration {
    /// Checks the form before it is sent
    pub fn validate(&self) -> Result<(), Error> {
        let fields = [&self.user_name, &self.email, &self.password];
        if fields.iter().any(|field| field.trim().is_empty()) {
            return Err(Error::MissingFields);
        }

        if !self.role.is_selectable() {
            return Err(Error::RoleNotSelectable(self.role));
        }

        Ok(())
    }
}

/// Error body returned by the backend
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Backend client
#[derive(Debug, Clone)]
pub struct Api {
    client: Client,
    base_url: String,
}

impl Api {
    /// Creates a client for the configured backend
    pub fn new(config: &config::Backend) -> Result<Self, Error> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
        })
    }

    /// Authenticates with email and password
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, Error> {
        let response = self.post("/user/login", credentials).await?;
        let login: LoginResponse = response.json().await?;

        debug!(role = ?login.role, user_name = ?login.user_name, "Login accepted");
        Ok(login)
    }

    /// Registers a new account
    ///
    /// The form is validated first; nothing is sent if it is incomplete.
    #[instrument(skip(self, registration), fields(email = %registration.email, role = %registration.role))]
    pub async fn register(&self, registration: &Registration) -> Result<(), Error> {
        registration.validate()?;

        let response = self.post("/user/register", registration).await?;
        let body = response.text().await?;

        debug!(%body, "Registration accepted");
        Ok(())
    }

    async fn post(&self, path: &str, body: &impl Serialize) -> Result<Response, Error> {
        let url = format!("{}{path}", self.base_url);
        let response = self.client.post(url).json(body).send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message);

        Err(Error::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}
