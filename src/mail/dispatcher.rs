//! Mail dispatcher - builds and sends one guest email

use crate::error::{report, MailerError, Result};
use crate::mail::template::{RenderedTemplate, TemplateRenderer};
use crate::mail::transport::Mailer;
use crate::mail::variant::VariantTable;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::Message;
use tracing::{error, info};

/// Default sender address
pub const DEFAULT_FROM: &str = "noreply@biecosystem.kz";

pub struct MailDispatcher<M> {
    mailer: M,
    renderer: TemplateRenderer,
    variants: VariantTable,
    from: Mailbox,
}

impl<M: Mailer> MailDispatcher<M> {
    pub fn new(mailer: M, renderer: TemplateRenderer, variants: VariantTable, from: &str) -> Result<Self> {
        let from = from
            .parse::<Mailbox>()
            .map_err(|e| MailerError::Config(format!("Invalid sender address {}: {}", from, e)))?;

        Ok(Self {
            mailer,
            renderer,
            variants,
            from,
        })
    }

    pub fn mailer(&self) -> &M {
        &self.mailer
    }

    /// Build the message for one recipient without sending it
    pub fn compose(&self, email: &str, variant: Option<&str>) -> Result<Message> {
        let choice = self.variants.resolve(variant);
        let rendered = self.renderer.render(&choice.template)?;

        let to = email
            .parse::<Mailbox>()
            .map_err(|e| MailerError::Address(format!("{}: {}", email, e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(choice.subject)
            .multipart(related_body(rendered)?)?;

        Ok(message)
    }

    /// Send one guest email, reporting success as a boolean
    ///
    /// Every failure (template, address, connection, authentication,
    /// transmission) is logged here and never propagated.
    pub async fn dispatch(&self, email: &str, variant: Option<&str>) -> bool {
        match self.try_dispatch(email, variant).await {
            Ok(()) => {
                info!("Email sent to {}", email);
                true
            }
            Err(MailerError::TemplateMissing(path)) => {
                error!("Template file {} not found, skipping {}", path.display(), email);
                false
            }
            Err(e) => {
                error!(error = ?e, "Error sending email to {}: {}", email, report(&e));
                false
            }
        }
    }

    async fn try_dispatch(&self, email: &str, variant: Option<&str>) -> Result<()> {
        let message = self.compose(email, variant)?;
        self.mailer.deliver(message).await
    }
}

/// `multipart/related` body: the HTML part plus the inline logo when present
fn related_body(rendered: RenderedTemplate) -> Result<MultiPart> {
    let mut body = MultiPart::related().singlepart(SinglePart::html(rendered.html));

    if let Some(logo) = rendered.logo {
        let content_type = ContentType::parse(logo.content_type)
            .map_err(|e| MailerError::Config(format!("Bad logo content type: {}", e)))?;
        body = body.singlepart(Attachment::new_inline(logo.content_id).body(logo.bytes, content_type));
    }

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::transport::RecordingMailer;
    use crate::mail::variant::TemplateNaming;
    use tempfile::TempDir;

    fn fixture(with_logo: bool) -> (TempDir, MailDispatcher<RecordingMailer>) {
        let dir = tempfile::tempdir().unwrap();
        for lang in ["ru", "kz"] {
            std::fs::write(
                dir.path().join(format!("Ala{}.html", lang)),
                format!(r#"<p lang="{}"><img src="logo2.png"> <!--UNIQUE_PLACEHOLDER--></p>"#, lang),
            )
            .unwrap();
        }
        if with_logo {
            std::fs::write(dir.path().join("logo2.png"), b"png-bytes").unwrap();
        }

        let variants = VariantTable {
            primary_subject: "Primary".to_string(),
            fallback_subject: "Fallback".to_string(),
            naming: TemplateNaming::PerVariant("Ala{variant}.html".to_string()),
            ..Default::default()
        };
        let renderer = TemplateRenderer::new(dir.path(), dir.path().join("logo2.png"));
        let dispatcher =
            MailDispatcher::new(RecordingMailer::new(), renderer, variants, DEFAULT_FROM).unwrap();
        (dir, dispatcher)
    }

    fn raw(message: &Message) -> String {
        String::from_utf8_lossy(&message.formatted()).into_owned()
    }

    #[test]
    fn test_compose_primary_variant() {
        let (_dir, dispatcher) = fixture(true);
        let message = dispatcher.compose("guest@example.com", Some("ru")).unwrap();
        let text = raw(&message);

        assert!(text.contains("Subject: Primary"));
        assert!(text.contains("multipart/related"));
        assert!(text.contains(r#"lang=3D"ru""#) || text.contains(r#"lang="ru""#));
        assert!(text.contains("Content-ID: <logo>"));
    }

    #[test]
    fn test_compose_fallback_variant() {
        let (_dir, dispatcher) = fixture(true);
        let message = dispatcher.compose("guest@example.com", Some("kz")).unwrap();
        let text = raw(&message);

        assert!(text.contains("Subject: Fallback"));
        assert!(text.contains(r#"lang=3D"kz""#) || text.contains(r#"lang="kz""#));
    }

    #[test]
    fn test_compose_without_logo_has_single_part() {
        let (_dir, dispatcher) = fixture(false);
        let message = dispatcher.compose("guest@example.com", Some("ru")).unwrap();
        let text = raw(&message);

        assert!(!text.contains("Content-ID"));
        assert!(!text.contains("cid:logo"));
    }

    #[tokio::test]
    async fn test_dispatch_success() {
        let (_dir, dispatcher) = fixture(true);
        assert!(dispatcher.dispatch("guest@example.com", Some("ru")).await);
        assert_eq!(dispatcher.mailer().recipients(), vec!["guest@example.com"]);
    }

    #[tokio::test]
    async fn test_dispatch_invalid_address_fails_quietly() {
        let (_dir, dispatcher) = fixture(true);
        assert!(!dispatcher.dispatch("not-an-address", Some("ru")).await);
        assert!(dispatcher.mailer().sent().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_missing_template_fails_quietly() {
        let (_dir, dispatcher) = fixture(true);
        assert!(!dispatcher.dispatch("guest@example.com", Some("en")).await);
        assert!(dispatcher.mailer().sent().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_transport_failure() {
        let (_dir, dispatcher) = fixture(true);
        dispatcher.mailer().fail_for("guest@example.com");
        assert!(!dispatcher.dispatch("guest@example.com", None).await);
    }

    #[test]
    fn test_invalid_sender_rejected() {
        let renderer = TemplateRenderer::new(".", "logo2.png");
        let result = MailDispatcher::new(
            RecordingMailer::new(),
            renderer,
            VariantTable::default(),
            "nobody",
        );
        assert!(matches!(result, Err(MailerError::Config(_))));
    }
}
