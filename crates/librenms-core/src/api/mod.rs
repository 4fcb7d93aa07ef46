//! REST API client module for LibreNMS.
//!
//! This module provides the `ApiClient` for talking to the LibreNMS
//! API v0 (`/api/v0/...`). Requests authenticate with the
//! `X-Auth-Token` header.

pub mod client;
pub mod error;

pub use client::{ApiClient, ResponseBody};
pub use error::ApiError;
