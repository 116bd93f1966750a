//! Guest email composition and delivery

pub mod dispatcher;
pub mod template;
pub mod transport;
pub mod variant;

pub use dispatcher::{MailDispatcher, DEFAULT_FROM};
pub use template::{InlineImage, RenderedTemplate, TemplateRenderer, UNIQUE_PLACEHOLDER};
pub use transport::{Mailer, RecordingMailer, SmtpRelay, DEFAULT_SMTP_HOST, DEFAULT_SMTP_PORT};
pub use variant::{EmailVariant, TemplateNaming, VariantTable};
