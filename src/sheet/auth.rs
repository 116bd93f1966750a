//! Service-account OAuth for the Sheets API
//!
//! Exchanges a signed RS256 assertion for a short-lived bearer token
//! (JWT bearer grant) and caches the token until shortly before it expires.

use crate::config::ServiceAccountKey;
use crate::error::{MailerError, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

/// Scope needed to read values and update cells
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for each assertion (Google caps this at one hour)
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Refresh this long before the token actually expires
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now
    }
}

/// Token source for a Google service account
pub struct ServiceAccountAuth {
    client: Client,
    client_email: String,
    token_uri: String,
    signing_key: EncodingKey,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    /// Create a token source, validating the private key up front
    pub fn new(client: Client, key: &ServiceAccountKey) -> Result<Self> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
            MailerError::Config(format!("Service account private_key is not a valid RSA PEM: {}", e))
        })?;

        Ok(Self {
            client,
            client_email: key.client_email.clone(),
            token_uri: key.token_uri.clone(),
            signing_key,
            cached: Mutex::new(None),
        })
    }

    /// Return a valid bearer token, fetching a new one when needed
    pub async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();

        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.token.clone());
        }

        debug!("Requesting new access token for {}", self.client_email);
        let assertion = self.assertion(now)?;
        let response = self
            .client
            .post(&self.token_uri)
            .form(&[("grant_type", GRANT_TYPE), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailerError::SheetAuth(format!(
                "token endpoint returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        let token: TokenResponse = response.json().await?;
        let fresh = CachedToken {
            token: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        };
        let value = fresh.token.clone();
        *cached = Some(fresh);

        Ok(value)
    }

    /// Sign the JWT assertion sent to the token endpoint
    fn assertion(&self, now: DateTime<Utc>) -> Result<String> {
        let iat = now.timestamp();
        let claims = Claims {
            iss: &self.client_email,
            scope: SHEETS_SCOPE,
            aud: &self.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        Ok(encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_pem_is_config_error() {
        let key = ServiceAccountKey {
            client_email: "mailer@project.iam.gserviceaccount.com".to_string(),
            private_key: "not a key".to_string(),
            token_uri: crate::config::DEFAULT_TOKEN_URI.to_string(),
        };

        let err = ServiceAccountAuth::new(Client::new(), &key)
            .err()
            .expect("invalid key must be rejected");
        assert!(matches!(err, MailerError::Config(_)));
    }

    #[test]
    fn test_token_freshness_margin() {
        let now = Utc::now();
        let fresh = CachedToken {
            token: "t".to_string(),
            expires_at: now + Duration::seconds(600),
        };
        let stale = CachedToken {
            token: "t".to_string(),
            expires_at: now + Duration::seconds(30),
        };

        assert!(fresh.is_fresh(now));
        assert!(!stale.is_fresh(now));
    }
}
