//! Repository for MX blocklist entries.

mod models;
mod queries;

pub use models::MxblEntry;
pub use queries::MxblRepository;
