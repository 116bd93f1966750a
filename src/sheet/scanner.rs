//! Row scanner - picks the guests that still need an email

use crate::error::Result;
use crate::sheet::{SheetSchema, SheetStore};
use serde::Serialize;
use tracing::debug;

/// Status marker written after a successful send
pub const DONE_MARKER: &str = "Done";

/// One registration row that has not been marked done
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuestRow {
    /// 1-based physical row number (the header is row 1)
    pub row_number: usize,

    /// Recipient address, trimmed
    pub email: String,

    /// Language / variant key, trimmed and lower-cased
    pub variant: Option<String>,

    /// Current status marker, trimmed and lower-cased
    pub status: String,
}

/// Walks a sheet snapshot and yields eligible rows
#[derive(Debug, Clone)]
pub struct RowScanner {
    schema: SheetSchema,
}

impl RowScanner {
    pub fn new(schema: SheetSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &SheetSchema {
        &self.schema
    }

    /// Read the whole sheet in one call and return its eligible rows
    pub async fn scan(&self, sheet: &dyn SheetStore) -> Result<Vec<GuestRow>> {
        let rows = sheet.read_all_rows().await?;
        debug!("Fetched {} rows (including header)", rows.len());
        Ok(self.eligible_rows(&rows))
    }

    /// Filter a sheet snapshot down to rows that still need an email
    ///
    /// Row 0 is the header. Rows shorter than the schema requires are skipped
    /// without error, as are rows whose status reads "done" in any casing.
    pub fn eligible_rows(&self, rows: &[Vec<String>]) -> Vec<GuestRow> {
        let min_len = self.schema.min_row_len();

        rows.iter()
            .enumerate()
            .skip(1)
            .filter(|(_, row)| row.len() >= min_len)
            .filter_map(|(index, row)| {
                let status = row[self.schema.status].trim().to_lowercase();
                if status == DONE_MARKER.to_lowercase() {
                    return None;
                }

                Some(GuestRow {
                    row_number: index + 1,
                    email: row[self.schema.email].trim().to_string(),
                    variant: self
                        .schema
                        .variant
                        .map(|col| row[col].trim().to_lowercase()),
                    status,
                })
            })
            .collect()
    }
}
