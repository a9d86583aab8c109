//! Spreadsheet rows to client records: header reconciliation and row normalization.

mod normalizer;
mod resolver;

pub use normalizer::{normalize_row, ImportRowError, RawRow};
pub use resolver::{headers_of, is_known, plan_import, unknown_headers, ImportPlan, PendingImport};
