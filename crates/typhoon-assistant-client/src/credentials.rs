//! Bearer credentials and local expiry checks.
//!
//! The client never verifies token signatures; the backend does that. It
//! only peeks at the `exp` claim so an expired session fails fast instead of
//! round-tripping to the server.

use std::fmt;

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;

/// Whether the held credentials can be used for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialState {
    /// No token configured.
    Missing,
    /// The token's `exp` claim is in the past.
    Expired,
    /// Usable (or opaque, in which case the server decides).
    Valid,
}

#[derive(Debug, Deserialize)]
struct ExpiryClaims {
    #[serde(default)]
    exp: Option<i64>,
}

/// Bearer token holder.
#[derive(Clone, Default)]
pub struct Credentials {
    token: Option<String>,
}

impl Credentials {
    /// Wrap an optional token; blank tokens count as missing.
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        let token = token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        Self { token }
    }

    /// Credentials with a bearer token.
    #[must_use]
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::new(Some(token.into()))
    }

    /// Credentials with no token.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// The raw token, if any.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Expiry from the token's `exp` claim, when the token is a JWT that has one.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let exp = jwt_expiry(self.token.as_deref()?)?;
        DateTime::from_timestamp(exp, 0)
    }

    /// Evaluate the credentials at `now`.
    #[must_use]
    pub fn state(&self, now: DateTime<Utc>) -> CredentialState {
        if self.token.is_none() {
            return CredentialState::Missing;
        }
        match self.expires_at() {
            Some(expires_at) if expires_at <= now => CredentialState::Expired,
            _ => CredentialState::Valid,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn jwt_expiry(token: &str) -> Option<i64> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    match decode::<ExpiryClaims>(token, &DecodingKey::from_secret(&[]), &validation) {
        Ok(data) => data.claims.exp,
        Err(e) => {
            tracing::debug!(error = %e, "token is not a readable JWT; treating as opaque");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn jwt_with_exp(exp: i64) -> String {
        let claims = serde_json::json!({ "sub": "forecaster-7", "exp": exp });
        encode(&Header::default(), &claims, &EncodingKey::from_secret(b"server-secret")).unwrap()
    }

    #[test]
    fn missing_token() {
        assert_eq!(Credentials::anonymous().state(Utc::now()), CredentialState::Missing);
        assert_eq!(
            Credentials::new(Some("   ".into())).state(Utc::now()),
            CredentialState::Missing
        );
    }

    #[test]
    fn unexpired_jwt_is_valid() {
        let now = Utc::now();
        let creds = Credentials::bearer(jwt_with_exp(now.timestamp() + 3600));
        assert_eq!(creds.state(now), CredentialState::Valid);
        assert!(creds.expires_at().is_some());
    }

    #[test]
    fn expired_jwt_is_expired() {
        let now = Utc::now();
        let creds = Credentials::bearer(jwt_with_exp(now.timestamp() - 60));
        assert_eq!(creds.state(now), CredentialState::Expired);
    }

    #[test]
    fn opaque_token_is_valid() {
        let creds = Credentials::bearer("not-a-jwt");
        assert_eq!(creds.state(Utc::now()), CredentialState::Valid);
        assert!(creds.expires_at().is_none());
    }

    #[test]
    fn debug_redacts_token() {
        let creds = Credentials::bearer("secret-token");
        let debug = format!("{creds:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("redacted"));
    }
}
