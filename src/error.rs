//! Error types for guest-mailer

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MailerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Google authentication failed: {0}")]
    SheetAuth(String),

    #[error("Sheets API error {status}: {body}")]
    SheetApi { status: u16, body: String },

    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    #[error("Template file {} not found", .0.display())]
    TemplateMissing(PathBuf),

    #[error("Invalid email address: {0}")]
    Address(String),

    #[error("Failed to build message")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("SMTP error")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("File system error")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to sign service account assertion")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, MailerError>;

/// Render an error together with its `source()` chain on one line.
///
/// Used wherever an error is logged and swallowed, so the log line carries the
/// underlying transport or I/O cause.
pub fn report(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_includes_source_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = MailerError::from(io);
        assert_eq!(report(&err), "File system error: denied");
    }

    #[test]
    fn test_template_missing_message() {
        let err = MailerError::TemplateMissing(PathBuf::from("Alaru.html"));
        assert_eq!(err.to_string(), "Template file Alaru.html not found");
    }
}
