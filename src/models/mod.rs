mod client;
mod column_mapping;
mod note;

pub use client::Client;
pub use column_mapping::{ColumnMapping, ColumnTarget};
pub use note::Note;
