//! Backend client tests against an in-process mock backend

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Value, json};
use warp::Filter;
use warp::http::StatusCode;

use super::Api;
use crate::config;

mod register;

pub(crate) const EMAIL: &str = "jane@example.com";
pub(crate) const PASSWORD: &str = "secret";
pub(crate) const TAKEN_EMAIL: &str = "taken@example.com";

/// Builds an unsigned token carrying given claims
pub(crate) fn token(payload: Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(json!({ "alg": "HS256", "typ": "JWT" }).to_string());
    let payload = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{payload}.signature")
}

/// Mock of the portal backend user endpoints
///
/// Accepts a single account (`EMAIL` / `PASSWORD`) answering with the configured login body, and
/// refuses to register `TAKEN_EMAIL`. Every request body is recorded.
pub(crate) struct MockBackend {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<(String, Value)>>>,
}

impl MockBackend {
    pub(crate) fn start(login_response: Value) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));

        let login = warp::post()
            .and(warp::path!("user" / "login"))
            .and(warp::body::json())
            .map({
                let requests = requests.clone();
                move |body: Value| {
                    requests
                        .lock()
                        .unwrap()
                        .push(("/user/login".to_owned(), body.clone()));

                    if body["email"] == EMAIL && body["password"] == PASSWORD {
                        warp::reply::with_status(warp::reply::json(&login_response), StatusCode::OK)
                    } else {
                        warp::reply::with_status(
                            warp::reply::json(&json!({ "message": "Invalid credentials" })),
                            StatusCode::UNAUTHORIZED,
                        )
                    }
                }
            });

        let register = warp::post()
            .and(warp::path!("user" / "register"))
            .and(warp::body::json())
            .map({
                let requests = requests.clone();
                move |body: Value| {
                    requests
                        .lock()
                        .unwrap()
                        .push(("/user/register".to_owned(), body.clone()));

                    if body["email"] == TAKEN_EMAIL {
                        warp::reply::with_status(
                            warp::reply::json(&json!({ "message": "Email already registered" })),
                            StatusCode::CONFLICT,
                        )
                    } else {
                        warp::reply::with_status(
                            warp::reply::json(&"User registered successfully"),
                            StatusCode::CREATED,
                        )
                    }
                }
            });

        let (addr, server) = warp::serve(login.or(register)).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        Self { addr, requests }
    }

    /// Backend configuration pointing at the mock
    pub(crate) fn config(&self) -> config::Backend {
        config::Backend {
            base_url: format!("http://{}/", self.addr),
            timeout_secs: 5,
        }
    }

    pub(crate) fn api(&self) -> Api {
        Api::new(&self.config()).unwrap()
    }

    /// Received requests as `(path, body)`, oldest first
    pub(crate) fn requests(&self) -> Vec<(String, Value)> {
        self.requests.lock().unwrap().clone()
    }
}
