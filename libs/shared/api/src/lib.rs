//! Typed HTTP client for the telehealth platform REST API.
//!
//! Every cell talks to the backend through [`ApiClient::request`], so the
//! status-code-to-[`shared_models::error::ApiError`] mapping lives in exactly
//! one place.

pub mod client;

pub use client::ApiClient;
