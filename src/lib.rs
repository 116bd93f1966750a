//! Guest Mailer - polls a registration spreadsheet and emails each new guest once
//!
//! Every cycle the worker reads the whole sheet, picks the rows whose status
//! column is not "Done", sends each guest a localized HTML email with the
//! logo embedded inline, and writes "Done" back into the row once the relay
//! accepted the message. Failures are logged and the row is retried on the
//! next cycle.
//!
//! A tiny HTTP server answers liveness checks next to the worker.

pub mod config;
pub mod error;
pub mod mail;
pub mod server;
pub mod sheet;
pub mod worker;

pub use config::{ServiceAccountKey, Settings};
pub use error::{MailerError, Result};
pub use mail::{MailDispatcher, Mailer, SmtpRelay, TemplateRenderer, VariantTable};
pub use sheet::{GoogleSheet, GuestRow, InMemorySheet, RowScanner, SheetSchema, SheetStore};
pub use worker::{CycleReport, DispatchLoop, Profile, WorkerConfig};
