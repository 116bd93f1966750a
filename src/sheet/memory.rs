//! In-memory sheet store
//!
//! Holds a grid of cells and records every write. Used for dry runs against a
//! JSON snapshot and as the table double in tests.

use crate::error::{MailerError, Result};
use crate::sheet::SheetStore;
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A single recorded cell write (1-based coordinates)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellWrite {
    pub row: usize,
    pub col: usize,
    pub value: String,
}

#[derive(Debug, Default)]
pub struct InMemorySheet {
    rows: Mutex<Vec<Vec<String>>>,
    writes: Mutex<Vec<CellWrite>>,
    failing_reads: AtomicUsize,
    reads: AtomicUsize,
}

impl InMemorySheet {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Default::default()
        }
    }

    /// Build from string slices, convenient for fixtures
    pub fn from_rows(rows: &[&[&str]]) -> Self {
        Self::new(
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    /// Load a snapshot stored as a JSON array of string arrays
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let rows: Vec<Vec<String>> = serde_json::from_str(&raw)?;
        Ok(Self::new(rows))
    }

    /// Make the next `count` reads fail as if the backend were unreachable
    pub fn fail_next_reads(&self, count: usize) {
        self.failing_reads.store(count, Ordering::SeqCst);
    }

    /// Every write performed so far, in order
    pub fn writes(&self) -> Vec<CellWrite> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }

    /// Number of `read_all_rows` calls, failed ones included
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Current grid contents
    pub fn snapshot(&self) -> Vec<Vec<String>> {
        self.rows.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SheetStore for InMemorySheet {
    async fn read_all_rows(&self) -> Result<Vec<Vec<String>>> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        let failing = self.failing_reads.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_reads.store(failing - 1, Ordering::SeqCst);
            return Err(MailerError::SheetApi {
                status: 503,
                body: "backend unavailable".to_string(),
            });
        }

        Ok(self.snapshot())
    }

    async fn write_cell(&self, row: usize, col: usize, value: &str) -> Result<()> {
        if row == 0 || col == 0 {
            return Err(MailerError::SheetApi {
                status: 400,
                body: format!("Invalid cell coordinates ({}, {})", row, col),
            });
        }

        let mut rows = self
            .rows
            .lock()
            .map_err(|_| MailerError::Config("sheet lock poisoned".to_string()))?;
        if rows.len() < row {
            rows.resize(row, Vec::new());
        }
        let cells = &mut rows[row - 1];
        if cells.len() < col {
            cells.resize(col, String::new());
        }
        cells[col - 1] = value.to_string();
        drop(rows);

        if let Ok(mut writes) = self.writes.lock() {
            writes.push(CellWrite {
                row,
                col,
                value: value.to_string(),
            });
        }

        Ok(())
    }
}
