//! Guest Mailer CLI
//!
//! Runs the sheet-polling mail worker next to a health endpoint, and offers
//! dry-run helpers to inspect the sheet and preview messages.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use guest_mailer::config::ServiceAccountKey;
use guest_mailer::mail::{
    RecordingMailer, TemplateNaming, DEFAULT_FROM, DEFAULT_SMTP_HOST, DEFAULT_SMTP_PORT,
};
use guest_mailer::sheet::schema::parse_column;
use guest_mailer::{
    server, DispatchLoop, GoogleSheet, InMemorySheet, MailDispatcher, Profile, RowScanner,
    Settings, SheetSchema, SheetStore, SmtpRelay, TemplateRenderer, VariantTable, WorkerConfig,
};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "guest-mailer")]
#[command(about = "Email every new guest in a registration spreadsheet exactly once")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the mail worker and the health endpoint
    Serve {
        #[command(flatten)]
        campaign: CampaignArgs,

        /// Run a single cycle and exit (no health endpoint)
        #[arg(long)]
        once: bool,
    },

    /// List the rows the worker would email, without sending anything
    Scan {
        #[command(flatten)]
        layout: LayoutArgs,

        /// Read rows from a JSON snapshot instead of the live sheet
        #[arg(long)]
        fixture: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the raw message a guest would receive
    Preview {
        /// Recipient address
        #[arg(long)]
        to: String,

        /// Variant key, as it appears in the sheet
        #[arg(long)]
        variant: Option<String>,

        #[command(flatten)]
        message: MessageArgs,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ProfileArg {
    Registration,
    Compact,
}

impl From<ProfileArg> for Profile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Registration => Profile::Registration,
            ProfileArg::Compact => Profile::Compact,
        }
    }
}

/// Sheet layout options
#[derive(Args)]
struct LayoutArgs {
    /// Preset for columns and delays
    #[arg(long, value_enum, env = "MAILER_PROFILE", default_value = "registration")]
    profile: ProfileArg,

    /// Email column letter (overrides the profile)
    #[arg(long, env = "MAILER_EMAIL_COLUMN")]
    email_column: Option<String>,

    /// Language column letter (overrides the profile)
    #[arg(long, env = "MAILER_VARIANT_COLUMN", conflicts_with = "no_variant_column")]
    variant_column: Option<String>,

    /// Status column letter (overrides the profile)
    #[arg(long, env = "MAILER_STATUS_COLUMN")]
    status_column: Option<String>,

    /// Sheet has no language column
    #[arg(long)]
    no_variant_column: bool,
}

impl LayoutArgs {
    fn schema(&self) -> Result<SheetSchema> {
        let mut schema = Profile::from(self.profile).schema();

        if let Some(col) = &self.email_column {
            schema.email = parse_column(col)?;
        }
        if let Some(col) = &self.variant_column {
            schema.variant = Some(parse_column(col)?);
        }
        if self.no_variant_column {
            schema.variant = None;
        }
        if let Some(col) = &self.status_column {
            schema.status = parse_column(col)?;
        }

        Ok(schema)
    }
}

/// Message content options
#[derive(Args)]
struct MessageArgs {
    /// Directory holding the HTML templates
    #[arg(long, env = "MAILER_TEMPLATE_DIR", default_value = ".")]
    template_dir: PathBuf,

    /// Template file name pattern; `{variant}` is replaced by the language key
    #[arg(long, env = "MAILER_TEMPLATE_PATTERN", default_value = "Ala{variant}.html")]
    template_pattern: String,

    /// Use this one template for every guest
    #[arg(long, env = "MAILER_FIXED_TEMPLATE", conflicts_with = "template_pattern")]
    fixed_template: Option<String>,

    /// Logo embedded inline when present
    #[arg(long, env = "MAILER_LOGO", default_value = "logo2.png")]
    logo: PathBuf,

    /// Sender address
    #[arg(long, env = "MAILER_FROM", default_value = DEFAULT_FROM)]
    from: String,

    /// Variant key that selects the primary subject
    #[arg(long, env = "MAILER_PRIMARY_VARIANT")]
    primary_variant: Option<String>,

    /// Variant key used for templates when a row has none
    #[arg(long, env = "MAILER_FALLBACK_VARIANT")]
    fallback_variant: Option<String>,

    /// Subject for the primary variant
    #[arg(long, env = "MAILER_PRIMARY_SUBJECT")]
    primary_subject: Option<String>,

    /// Subject for every other variant
    #[arg(long, env = "MAILER_FALLBACK_SUBJECT")]
    fallback_subject: Option<String>,
}

impl MessageArgs {
    fn variants(&self) -> VariantTable {
        let mut table = VariantTable::default();

        if let Some(key) = &self.primary_variant {
            table.primary_key = key.trim().to_lowercase();
        }
        if let Some(key) = &self.fallback_variant {
            table.fallback_key = key.trim().to_lowercase();
        }
        if let Some(subject) = &self.primary_subject {
            table.primary_subject = subject.clone();
        }
        if let Some(subject) = &self.fallback_subject {
            table.fallback_subject = subject.clone();
        }
        table.naming = match &self.fixed_template {
            Some(name) => TemplateNaming::Fixed(name.clone()),
            None => TemplateNaming::PerVariant(self.template_pattern.clone()),
        };

        table
    }

    fn renderer(&self) -> TemplateRenderer {
        TemplateRenderer::new(&self.template_dir, &self.logo)
    }
}

/// Everything the worker needs besides secrets
#[derive(Args)]
struct CampaignArgs {
    #[command(flatten)]
    layout: LayoutArgs,

    #[command(flatten)]
    message: MessageArgs,

    /// Seconds between cycles (overrides the profile)
    #[arg(short, long, env = "MAILER_POLL_INTERVAL")]
    poll_interval: Option<u64>,

    /// Milliseconds to pause after each row (overrides the profile)
    #[arg(long, env = "MAILER_ROW_DELAY_MS")]
    row_delay_ms: Option<u64>,

    /// SMTP relay host
    #[arg(long, env = "SMTP_HOST", default_value = DEFAULT_SMTP_HOST)]
    smtp_host: String,

    /// SMTP relay port (STARTTLS)
    #[arg(long, env = "SMTP_PORT", default_value_t = DEFAULT_SMTP_PORT)]
    smtp_port: u16,
}

impl CampaignArgs {
    fn worker_config(&self) -> Result<WorkerConfig> {
        let mut builder = WorkerConfig::builder()
            .profile(self.layout.profile.into())
            .schema(self.layout.schema()?);

        if let Some(secs) = self.poll_interval {
            builder = builder.poll_interval_secs(secs);
        }
        if let Some(ms) = self.row_delay_ms {
            builder = builder.row_delay(Duration::from_millis(ms));
        }

        Ok(builder.build())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present, before clap reads env-backed flags
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Serve { campaign, once } => {
            info!("Initializing worker...");

            let settings = Settings::from_env().context("Invalid configuration")?;
            let config = campaign.worker_config()?;

            let sheet = GoogleSheet::open(&settings.spreadsheet_id, &settings.credentials)
                .await
                .context("Error connecting to Google Sheets")?;

            let relay = SmtpRelay::new(
                &campaign.smtp_host,
                campaign.smtp_port,
                &settings.smtp_user,
                &settings.smtp_password,
            );
            let dispatcher = MailDispatcher::new(
                relay,
                campaign.message.renderer(),
                campaign.message.variants(),
                &campaign.message.from,
            )?;
            let worker = DispatchLoop::new(sheet, dispatcher, config);

            if once {
                let report = worker.run_once().await?;
                println!(
                    "Cycle finished: {} eligible, {} sent, {} failed, {} status writes failed",
                    report.eligible, report.sent, report.failed, report.write_failed
                );
                return Ok(());
            }

            // Detached; ends when the process exits
            tokio::spawn(async move { worker.run().await });

            server::serve(settings.port, server::shutdown_signal()).await?;
        }

        Commands::Scan {
            layout,
            fixture,
            json,
        } => {
            let scanner = RowScanner::new(layout.schema()?);
            let sheet: Box<dyn SheetStore> = match fixture {
                Some(path) => Box::new(
                    InMemorySheet::from_json_file(&path)
                        .with_context(|| format!("Failed to load {}", path.display()))?,
                ),
                None => {
                    let spreadsheet_id = std::env::var("SPREADSHEET_ID")
                        .context("SPREADSHEET_ID not found")?;
                    let credentials = ServiceAccountKey::from_json(
                        &std::env::var("GOOGLE_CREDENTIALS_JSON")
                            .context("GOOGLE_CREDENTIALS_JSON not found")?,
                    )?;
                    Box::new(GoogleSheet::open(&spreadsheet_id, &credentials).await?)
                }
            };

            let guests = scanner.scan(sheet.as_ref()).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&guests)?);
            } else {
                println!("=== Pending guests ({}) ===", guests.len());
                for guest in &guests {
                    println!(
                        "  row {:>4}  {:<40} {:<4} {}",
                        guest.row_number,
                        guest.email,
                        guest.variant.as_deref().unwrap_or("-"),
                        if guest.status.is_empty() { "(blank)" } else { guest.status.as_str() }
                    );
                }
            }
        }

        Commands::Preview {
            to,
            variant,
            message,
        } => {
            let dispatcher = MailDispatcher::new(
                RecordingMailer::new(),
                message.renderer(),
                message.variants(),
                &message.from,
            )?;
            let variant = variant.map(|v| v.trim().to_lowercase());
            let email = dispatcher.compose(to.trim(), variant.as_deref())?;

            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&email.formatted())?;
            stdout.flush()?;
        }
    }

    Ok(())
}
