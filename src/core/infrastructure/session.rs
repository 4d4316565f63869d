//! The identity precondition for queries and mutations.
//!
//! A session either carries an access token issued by the hosted backend
//! (the identity is read from its `sub`, `email` and `exp` claims) or a bare
//! local user id for the embedded backend.

use chrono::{DateTime, TimeZone, Utc};
use data_encoding::BASE64URL_NOPAD;
use serde::Deserialize;
use tracing::debug;

use crate::error::{HerdbookError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub email: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    identity: Option<Identity>,
    access_token: Option<String>,
}

#[derive(Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    exp: Option<i64>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn local(user_id: impl Into<String>) -> Self {
        Self {
            identity: Some(Identity {
                user_id: user_id.into(),
                email: None,
                expires_at: None,
            }),
            access_token: None,
        }
    }

    /// Read the identity from a JWT without verifying its signature; the
    /// backend verifies it on every request.
    pub fn from_access_token(token: &str) -> Result<Self> {
        let payload = token
            .split('.')
            .nth(1)
            .filter(|part| !part.is_empty())
            .ok_or_else(|| HerdbookError::Validation("Access token is not a JWT".to_string()))?;

        let bytes = BASE64URL_NOPAD
            .decode(payload.trim_end_matches('=').as_bytes())
            .map_err(|e| HerdbookError::Validation(format!("Access token payload is not base64url: {}", e)))?;
        let claims: Claims = serde_json::from_slice(&bytes)
            .map_err(|e| HerdbookError::Validation(format!("Access token claims unreadable: {}", e)))?;

        let expires_at = claims.exp.and_then(|exp| Utc.timestamp_opt(exp, 0).single());
        debug!("Session for user {} (expires {:?})", claims.sub, expires_at);

        Ok(Self {
            identity: Some(Identity {
                user_id: claims.sub,
                email: claims.email,
                expires_at,
            }),
            access_token: Some(token.to_string()),
        })
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// An identity is present and not past its expiry.
    pub fn is_authenticated(&self) -> bool {
        match &self.identity {
            Some(identity) => identity.expires_at.map_or(true, |exp| exp > Utc::now()),
            None => false,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.identity.as_ref().map(|identity| identity.user_id.as_str())
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn token(claims: serde_json::Value) -> String {
        let header = BASE64URL_NOPAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = BASE64URL_NOPAD.encode(claims.to_string().as_bytes());
        format!("{}.{}.signature", header, payload)
    }

    #[test]
    fn test_anonymous_session() {
        let session = Session::anonymous();
        assert!(!session.is_authenticated());
        assert_eq!(session.user_id(), None);
    }

    #[test]
    fn test_local_session() {
        let session = Session::local("user-1");
        assert!(session.is_authenticated());
        assert_eq!(session.user_id(), Some("user-1"));
        assert_eq!(session.access_token(), None);
    }

    #[test]
    fn test_access_token_claims() {
        let exp = Utc::now().timestamp() + 3600;
        let jwt = token(json!({"sub": "8d1c", "email": "a@farm.test", "exp": exp}));
        let session = Session::from_access_token(&jwt).unwrap();

        assert!(session.is_authenticated());
        assert_eq!(session.user_id(), Some("8d1c"));
        assert_eq!(session.identity().unwrap().email.as_deref(), Some("a@farm.test"));
        assert_eq!(session.access_token(), Some(jwt.as_str()));
    }

    #[test]
    fn test_expired_token_is_not_authenticated() {
        let jwt = token(json!({"sub": "8d1c", "exp": 1_000_000}));
        let session = Session::from_access_token(&jwt).unwrap();
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_malformed_tokens() {
        assert!(Session::from_access_token("not-a-jwt").is_err());
        assert!(Session::from_access_token("a.!!!.c").is_err());
        let no_sub = token(json!({"email": "x"}));
        assert!(Session::from_access_token(&no_sub).is_err());
    }
}
