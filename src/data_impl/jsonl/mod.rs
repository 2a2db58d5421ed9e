//! Repositories kept in memory and mirrored to JSONL files
//!
//! Each table lives in `<data_dir>/<table>.jsonl`, one record per line.
//! Every write rewrites the table file before the in-memory copy is
//! replaced, so a failed write leaves both sides unchanged.

mod database;
mod organization_repository;
mod profile_repository;

pub use database::*;
pub use organization_repository::*;
pub use profile_repository::*;
