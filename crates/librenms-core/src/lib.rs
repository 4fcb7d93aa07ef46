//! Core library for librenms-mcp.
//!
//! - [`config`]: settings from `LIBRENMS_*` environment variables with a
//!   `~/.config/librenms/credentials.json` fallback
//! - [`api`]: authenticated client for the LibreNMS REST API v0

pub mod api;
pub mod config;

pub use api::{ApiClient, ApiError, ResponseBody};
pub use config::{Credentials, Settings};
