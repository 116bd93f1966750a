//! Worker module for polling the sheet and mailing guests
//!
//! This module provides:
//! - DispatchLoop: Main worker loop that scans the sheet and sends emails
//! - WorkerConfig: Configuration for the worker
//! - Profile: Presets for the known sheet layouts

pub mod config;
pub mod dispatch_loop;

pub use config::{Profile, WorkerConfig};
pub use dispatch_loop::{CycleReport, DispatchLoop};
