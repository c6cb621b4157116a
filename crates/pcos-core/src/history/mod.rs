//! Durable prediction history
//!
//! This module provides:
//! - Append-only CSV log of prediction records
//! - Full-log reads for display
//! - Raw byte export for download

mod store;

pub use store::{
    HistoryLog, HistoryStore, HISTORY_FILE_NAME, HISTORY_MIME, LABEL_COLUMN,
    PROBABILITY_NEGATIVE_COLUMN, PROBABILITY_POSITIVE_COLUMN,
};
