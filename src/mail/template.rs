//! HTML template loading and per-send personalization

use crate::error::{MailerError, Result};
use rand::Rng;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Marker replaced with a fresh random number on every render
pub const UNIQUE_PLACEHOLDER: &str = "<!--UNIQUE_PLACEHOLDER-->";

/// Content id the logo is attached under
pub const LOGO_CONTENT_ID: &str = "logo";

/// Image embedded in the message and referenced by content id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub content_id: String,
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Template text ready to be sent
#[derive(Debug, Clone)]
pub struct RenderedTemplate {
    pub html: String,
    /// Random number substituted for the placeholder
    pub token: String,
    pub logo: Option<InlineImage>,
}

/// Loads templates and the logo from disk on every call
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    template_dir: PathBuf,
    logo_path: PathBuf,
}

impl TemplateRenderer {
    pub fn new<P: AsRef<Path>, L: AsRef<Path>>(template_dir: P, logo_path: L) -> Self {
        Self {
            template_dir: template_dir.as_ref().to_path_buf(),
            logo_path: logo_path.as_ref().to_path_buf(),
        }
    }

    pub fn template_path(&self, template_name: &str) -> PathBuf {
        self.template_dir.join(template_name)
    }

    /// Render a template by file name
    ///
    /// Fails with `TemplateMissing` when the file does not exist. A missing
    /// logo only produces a warning.
    pub fn render(&self, template_name: &str) -> Result<RenderedTemplate> {
        let path = self.template_path(template_name);
        if !path.is_file() {
            return Err(MailerError::TemplateMissing(path));
        }

        let source = std::fs::read_to_string(&path)?;
        let token = unique_token();
        let mut html = source.replace(UNIQUE_PLACEHOLDER, &token);

        let logo = self.load_logo();
        match &logo {
            Some(image) => {
                html = html.replace(
                    &format!("src=\"{}\"", image.file_name),
                    &format!("src=\"cid:{}\"", image.content_id),
                );
            }
            None => warn!("Logo not found. Sending email without logo."),
        }

        debug!("Rendered {} with token {}", path.display(), token);
        Ok(RenderedTemplate { html, token, logo })
    }

    fn load_logo(&self) -> Option<InlineImage> {
        if !self.logo_path.is_file() {
            return None;
        }

        let bytes = match std::fs::read(&self.logo_path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to read logo {}: {}", self.logo_path.display(), e);
                return None;
            }
        };

        let file_name = self
            .logo_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Some(InlineImage {
            content_id: LOGO_CONTENT_ID.to_string(),
            content_type: image_content_type(&self.logo_path),
            file_name,
            bytes,
        })
    }
}

/// Six-digit random number as text
pub fn unique_token() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

fn image_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "image/png",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TEMPLATE: &str = r#"<html><body><img src="logo2.png"><p>Ticket <!--UNIQUE_PLACEHOLDER--></p></body></html>"#;

    fn fixture(with_logo: bool) -> (TempDir, TemplateRenderer) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Alaru.html"), TEMPLATE).unwrap();
        if with_logo {
            std::fs::write(dir.path().join("logo2.png"), [0x89, b'P', b'N', b'G']).unwrap();
        }
        let renderer = TemplateRenderer::new(dir.path(), dir.path().join("logo2.png"));
        (dir, renderer)
    }

    #[test]
    fn test_token_is_six_digits() {
        for _ in 0..50 {
            let token = unique_token();
            assert_eq!(token.len(), 6);
            assert!(token.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_renders_differ_only_in_token() {
        let (_dir, renderer) = fixture(true);
        let first = renderer.render("Alaru.html").unwrap();
        let second = renderer.render("Alaru.html").unwrap();

        assert!(!first.html.contains(UNIQUE_PLACEHOLDER));
        assert_eq!(
            first.html.replace(&first.token, "#"),
            second.html.replace(&second.token, "#")
        );
    }

    #[test]
    fn test_logo_is_inlined() {
        let (_dir, renderer) = fixture(true);
        let rendered = renderer.render("Alaru.html").unwrap();

        assert!(rendered.html.contains(r#"src="cid:logo""#));
        let logo = rendered.logo.unwrap();
        assert_eq!(logo.content_id, "logo");
        assert_eq!(logo.file_name, "logo2.png");
        assert_eq!(logo.content_type, "image/png");
    }

    #[test]
    fn test_missing_logo_keeps_original_reference() {
        let (_dir, renderer) = fixture(false);
        let rendered = renderer.render("Alaru.html").unwrap();

        assert!(rendered.logo.is_none());
        assert!(rendered.html.contains(r#"src="logo2.png""#));
        assert!(!rendered.html.contains("cid:"));
    }

    #[test]
    fn test_missing_template() {
        let (_dir, renderer) = fixture(true);
        let err = renderer.render("Alaen.html").unwrap_err();
        assert!(matches!(err, MailerError::TemplateMissing(p) if p.ends_with("Alaen.html")));
    }

    #[test]
    fn test_image_content_type() {
        assert_eq!(image_content_type(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(image_content_type(Path::new("logo")), "image/png");
    }
}
