// Module declarations
pub mod api;
pub mod cache;
pub mod commands;
pub mod config;
pub mod constants;
pub mod data;
pub mod data_impl;
pub mod error;
pub mod init_tracing;
pub mod templates;
pub mod utils;

pub use api::{build_app, AppState};
pub use error::{AppError, ErrorCode};
