//! HTTP middleware specific to the gateway.
//!
//! Request ids, CORS, tracing and body limits come from `tower-http` and are
//! wired in [`crate::routes`]. This module holds what `tower-http` does not
//! provide.

pub mod error_details;

pub use error_details::expose_error_details;
