//! Startup configuration loaded from the environment

use crate::error::{MailerError, Result};
use serde::Deserialize;
use std::fmt;

/// Default listen port for the health endpoint
pub const DEFAULT_PORT: u16 = 5000;

/// Default OAuth token endpoint for Google service accounts
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Secrets and identifiers required to start the worker
#[derive(Clone)]
pub struct Settings {
    /// Spreadsheet key (the id in the sheet URL)
    pub spreadsheet_id: String,

    /// Google service account used for Sheets access
    pub credentials: ServiceAccountKey,

    /// SMTP relay login
    pub smtp_user: String,

    /// SMTP relay password
    pub smtp_password: String,

    /// Health endpoint port
    pub port: u16,
}

impl Settings {
    /// Load settings from process environment variables
    ///
    /// Reads `SPREADSHEET_ID`, `GOOGLE_CREDENTIALS_JSON`, `SMTP_USER`,
    /// `SMTP_PASSWORD` and optionally `PORT`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| MailerError::Config(format!("{} not found", key)))
        };

        let spreadsheet_id = required("SPREADSHEET_ID")?;
        let credentials = ServiceAccountKey::from_json(&required("GOOGLE_CREDENTIALS_JSON")?)?;
        let smtp_user = required("SMTP_USER")?;
        let smtp_password = required("SMTP_PASSWORD")?;

        let port = match lookup("PORT").map(|v| v.trim().to_string()) {
            Some(raw) if !raw.is_empty() => raw
                .parse::<u16>()
                .map_err(|_| MailerError::Config(format!("PORT is not a valid port: {}", raw)))?,
            _ => DEFAULT_PORT,
        };

        Ok(Self {
            spreadsheet_id,
            credentials,
            smtp_user,
            smtp_password,
            port,
        })
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("credentials", &self.credentials)
            .field("smtp_user", &self.smtp_user)
            .field("smtp_password", &"<redacted>")
            .field("port", &self.port)
            .finish()
    }
}

/// Google service-account credential bundle
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    /// Parse the JSON credential bundle and normalize the private key
    ///
    /// Hosting dashboards often store the key with literal `\n` sequences;
    /// those are turned back into line breaks before the PEM is used.
    pub fn from_json(raw: &str) -> Result<Self> {
        let mut key: ServiceAccountKey = serde_json::from_str(raw).map_err(|e| {
            MailerError::Config(format!("GOOGLE_CREDENTIALS_JSON is invalid: {}", e))
        })?;

        key.private_key = key.private_key.replace("\\n", "\n").trim().to_string();

        if key.private_key.is_empty() {
            return Err(MailerError::Config(
                "GOOGLE_CREDENTIALS_JSON has an empty private_key".to_string(),
            ));
        }
        if key.client_email.trim().is_empty() {
            return Err(MailerError::Config(
                "GOOGLE_CREDENTIALS_JSON has an empty client_email".to_string(),
            ));
        }

        Ok(key)
    }
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}
