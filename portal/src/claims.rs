//! Credential token payload decoding
//!
//! The backend hands out JWT-shaped bearer tokens: `{header}.{payload}.{signature}` where the
//! payload is base64 encoded JSON. Claims are read optimistically - the signature is never checked
//! here, the token is only a carrier of the identity the backend assigned.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::prelude::*;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum Error {
    #[error("Token has no payload segment")]
    MissingPayload,
    #[error("Token payload is not valid base64")]
    InvalidEncoding(#[from] base64::DecodeError),
    #[error("Token payload is not valid JSON")]
    InvalidJson(#[from] serde_json::Error),
    #[error("Token payload is not a JSON object")]
    NotAnObject,
}

/// URL-safe alphabet that accepts payloads with or without padding
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Claims carried by a credential token
#[derive(Debug, Clone, PartialEq)]
pub struct Claims(Map<String, Value>);

impl Claims {
    /// Decodes the payload segment of a token
    ///
    /// Both the URL-safe and the standard base64 alphabets are accepted, padded or not.
    pub fn decode(token: &str) -> Result<Self, Error> {
        let payload = token
            .split('.')
            .nth(1)
            .filter(|segment| !segment.is_empty())
            .ok_or(Error::MissingPayload)?;

        let payload: String = payload
            .chars()
            .map(|c| match c {
                '+' => '-',
                '/' => '_',
                c => c,
            })
            .collect();
        let payload = URL_SAFE_LENIENT.decode(payload)?;

        match serde_json::from_slice(&payload)? {
            Value::Object(claims) => Ok(Self(claims)),
            _ => Err(Error::NotAnObject),
        }
    }

    /// Raw claim access
    pub fn get(&self, claim: &str) -> Option<&Value> {
        self.0.get(claim)
    }

    /// Identifier of the user the token was issued for
    ///
    /// The backend puts the user id in `jti`, older tokens only carry it as `sub`. Both string and
    /// numeric ids are accepted.
    pub fn user_id(&self) -> Option<String> {
        ["jti", "sub"]
            .into_iter()
            .filter_map(|claim| self.get(claim))
            .find_map(|value| match value {
                Value::String(id) if !id.is_empty() => Some(id.clone()),
                Value::Number(id) => Some(id.to_string()),
                _ => None,
            })
    }

    /// Token expiration time, if the token has one
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let exp = self.get("exp")?.as_i64()?;
        DateTime::from_timestamp(exp, 0)
    }

    /// Checks the expiration time against `now`; tokens without `exp` never expire
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|exp| exp <= now)
    }
}

/// Derives the user id from a credential token
///
/// Failures are never fatal: they are logged and result in no user id.
pub fn user_id_from_token(token: &str) -> Option<String> {
    let claims = match Claims::decode(token) {
        Ok(claims) => claims,
        Err(err) => {
            error!(%err, "Failed to decode credential token for user id");
            return None;
        }
    };

    let user_id = claims.user_id();
    if user_id.is_none() {
        warn!(claims = ?claims.0.keys().collect::<Vec<_>>(), "User id not found in token payload");
    }

    user_id
}
