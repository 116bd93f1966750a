//! Registration sheet access
//!
//! This module provides:
//! - SheetStore: the read-all / write-one-cell seam over the backing table
//! - GoogleSheet: Google Sheets v4 implementation
//! - InMemorySheet: grid-backed implementation for dry runs and tests
//! - RowScanner: picks the rows that still need an email

pub mod auth;
pub mod google;
pub mod memory;
pub mod scanner;
pub mod schema;

use crate::error::Result;
use async_trait::async_trait;

pub use google::GoogleSheet;
pub use memory::{CellWrite, InMemorySheet};
pub use scanner::{GuestRow, RowScanner, DONE_MARKER};
pub use schema::SheetSchema;

/// Tabular store holding the guest registrations
#[async_trait]
pub trait SheetStore: Send + Sync {
    /// Fetch every row of the sheet, header included
    async fn read_all_rows(&self) -> Result<Vec<Vec<String>>>;

    /// Overwrite a single cell; `row` and `col` are 1-based
    async fn write_cell(&self, row: usize, col: usize, value: &str) -> Result<()>;
}

#[async_trait]
impl<T: SheetStore + ?Sized> SheetStore for std::sync::Arc<T> {
    async fn read_all_rows(&self) -> Result<Vec<Vec<String>>> {
        (**self).read_all_rows().await
    }

    async fn write_cell(&self, row: usize, col: usize, value: &str) -> Result<()> {
        (**self).write_cell(row, col, value).await
    }
}
