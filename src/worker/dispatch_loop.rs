//! Dispatch loop - main worker loop

use crate::error::{report, Result};
use crate::mail::{MailDispatcher, Mailer};
use crate::sheet::{RowScanner, SheetStore, DONE_MARKER};
use crate::worker::WorkerConfig;
use serde::Serialize;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Counters for one pass over the sheet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Eligible rows found by the scanner
    pub eligible: usize,
    /// Rows whose email went out and whose status was written
    pub sent: usize,
    /// Rows whose email could not be sent
    pub failed: usize,
    /// Rows whose email went out but whose status write failed
    pub write_failed: usize,
}

/// Polls the sheet and emails every eligible guest
pub struct DispatchLoop<S, M> {
    sheet: S,
    dispatcher: MailDispatcher<M>,
    scanner: RowScanner,
    config: WorkerConfig,
}

impl<S, M> DispatchLoop<S, M>
where
    S: SheetStore,
    M: Mailer,
{
    /// Create a new dispatch loop
    pub fn new(sheet: S, dispatcher: MailDispatcher<M>, config: WorkerConfig) -> Self {
        Self {
            sheet,
            dispatcher,
            scanner: RowScanner::new(config.schema),
            config,
        }
    }

    pub fn sheet(&self) -> &S {
        &self.sheet
    }

    pub fn dispatcher(&self) -> &MailDispatcher<M> {
        &self.dispatcher
    }

    /// Main worker loop
    ///
    /// Runs one cycle, sleeps the poll interval, repeats. A failed cycle is
    /// logged and the next one starts after the usual interval. This never
    /// returns; the loop ends when the process does.
    pub async fn run(&self) {
        info!("Starting guest-mailer worker...");
        info!("Poll interval: {:?}", self.config.poll_interval);
        info!("Row delay: {:?}", self.config.row_delay);
        info!("Sheet layout: {:?}", self.config.schema);

        loop {
            match self.run_cycle().await {
                Ok(summary) if summary.eligible > 0 => {
                    info!(
                        "Cycle finished: {} sent, {} failed, {} status writes failed",
                        summary.sent, summary.failed, summary.write_failed
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    error!(error = ?e, "Error processing guests: {}", report(&e));
                }
            }

            sleep(self.config.poll_interval).await;
        }
    }

    /// Run a single cycle (useful for testing with --once flag)
    pub async fn run_once(&self) -> Result<CycleReport> {
        info!("Running worker in single-cycle mode...");
        self.run_cycle().await
    }

    /// One pass: scan, send each eligible row, mark successes as done
    ///
    /// Returns Err only when the sheet itself could not be read; in that case
    /// nothing has been sent or written.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let guests = self.scanner.scan(&self.sheet).await?;
        let mut summary = CycleReport {
            eligible: guests.len(),
            ..Default::default()
        };

        let status_col = self.config.schema.status_column_number();

        for guest in guests {
            if self
                .dispatcher
                .dispatch(&guest.email, guest.variant.as_deref())
                .await
            {
                match self
                    .sheet
                    .write_cell(guest.row_number, status_col, DONE_MARKER)
                    .await
                {
                    Ok(()) => summary.sent += 1,
                    Err(e) => {
                        // the email is out; the row will be sent again next cycle
                        warn!(
                            "Sent to {} but failed to mark row {} done: {}",
                            guest.email,
                            guest.row_number,
                            report(&e)
                        );
                        summary.write_failed += 1;
                    }
                }
            } else {
                warn!(
                    "Row {} ({}) not sent, will retry next cycle",
                    guest.row_number, guest.email
                );
                summary.failed += 1;
            }

            if !self.config.row_delay.is_zero() {
                sleep(self.config.row_delay).await;
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::{RecordingMailer, TemplateRenderer, VariantTable, DEFAULT_FROM};
    use crate::sheet::{CellWrite, InMemorySheet};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn registration_row(email: &str, lang: &str, status: &str) -> Vec<String> {
        let mut cells = vec![String::new(); 11];
        cells[1] = email.to_string();
        cells[3] = lang.to_string();
        cells[10] = status.to_string();
        cells
    }

    fn build(
        rows: Vec<Vec<String>>,
    ) -> (TempDir, Arc<RecordingMailer>, DispatchLoop<InMemorySheet, Arc<RecordingMailer>>) {
        let dir = tempfile::tempdir().unwrap();
        for lang in ["ru", "kz"] {
            std::fs::write(
                dir.path().join(format!("Ala{}.html", lang)),
                "<p><!--UNIQUE_PLACEHOLDER--></p>",
            )
            .unwrap();
        }

        let mailer = Arc::new(RecordingMailer::new());
        let dispatcher = MailDispatcher::new(
            Arc::clone(&mailer),
            TemplateRenderer::new(dir.path(), dir.path().join("logo2.png")),
            VariantTable::default(),
            DEFAULT_FROM,
        )
        .unwrap();

        let config = WorkerConfig::builder().row_delay(Duration::ZERO).build();
        let worker = DispatchLoop::new(InMemorySheet::new(rows), dispatcher, config);
        (dir, mailer, worker)
    }

    #[tokio::test]
    async fn test_success_writes_done_once() {
        let (_dir, mailer, worker) = build(vec![
            registration_row("Email", "Lang", "Status"),
            registration_row("guest@example.com", "ru", ""),
        ]);

        let report = worker.run_cycle().await.unwrap();

        assert_eq!(report.sent, 1);
        assert_eq!(mailer.recipients(), vec!["guest@example.com"]);
        assert_eq!(
            worker.sheet().writes(),
            vec![CellWrite {
                row: 2,
                col: 11,
                value: "Done".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_failed_send_writes_nothing_and_retries() {
        let (_dir, mailer, worker) = build(vec![
            registration_row("Email", "Lang", "Status"),
            registration_row("bounce@example.com", "kz", "pending"),
        ]);
        mailer.fail_for("bounce@example.com");

        let first = worker.run_cycle().await.unwrap();
        let second = worker.run_cycle().await.unwrap();

        assert_eq!(first.failed, 1);
        assert_eq!(second.eligible, 1);
        assert!(worker.sheet().writes().is_empty());
    }

    #[tokio::test]
    async fn test_bad_row_does_not_abort_cycle() {
        let (_dir, mailer, worker) = build(vec![
            registration_row("Email", "Lang", "Status"),
            registration_row("not-an-address", "ru", ""),
            registration_row("second@example.com", "kz", ""),
        ]);

        let report = worker.run_cycle().await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.sent, 1);
        assert_eq!(mailer.recipients(), vec!["second@example.com"]);
        assert_eq!(worker.sheet().writes()[0].row, 3);
    }

    #[tokio::test]
    async fn test_sent_rows_skipped_next_cycle() {
        let (_dir, mailer, worker) = build(vec![
            registration_row("Email", "Lang", "Status"),
            registration_row("guest@example.com", "ru", ""),
        ]);

        worker.run_cycle().await.unwrap();
        let report = worker.run_cycle().await.unwrap();

        assert_eq!(report.eligible, 0);
        assert_eq!(mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_scan_failure_aborts_cycle() {
        let (_dir, mailer, worker) = build(vec![
            registration_row("Email", "Lang", "Status"),
            registration_row("guest@example.com", "ru", ""),
        ]);
        worker.sheet().fail_next_reads(1);

        assert!(worker.run_cycle().await.is_err());
        assert!(mailer.sent().is_empty());
        assert!(worker.sheet().writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_row_delay_between_rows() {
        let (_dir, _mailer, worker) = build(vec![
            registration_row("Email", "Lang", "Status"),
            registration_row("a@example.com", "ru", ""),
            registration_row("b@example.com", "ru", ""),
        ]);
        let worker = DispatchLoop {
            config: WorkerConfig::builder().row_delay(Duration::from_secs(1)).build(),
            ..worker
        };

        let started = tokio::time::Instant::now();
        worker.run_cycle().await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }
}
