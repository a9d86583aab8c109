pub mod analytics;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod import;
pub mod models;
pub mod query;
pub mod spreadsheet;
pub mod store;
pub mod ui;

pub use error::{Error, Result};
pub use store::{ClientStore, ImportOutcome, LoadStatus};
