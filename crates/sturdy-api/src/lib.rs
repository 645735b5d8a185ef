//! # sturdy-api
//!
//! Authenticated HTTP client for the CodeSturdy platform API.
//!
//! Every request carries the current bearer token when one is held, and a
//! 401 response triggers exactly one refresh-and-retry cycle before failure
//! is surfaced to the caller.

pub mod client;
pub mod multipart;
mod response;

pub use client::ApiClient;
pub use multipart::{FilePart, UploadForm};
