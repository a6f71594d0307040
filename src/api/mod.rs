//! REST API client module for the Oma Helen service.
//!
//! This module provides the `HelenClient` for fetching contract,
//! measurement and spot-price data, plus the `ApiError` taxonomy every
//! operation in the crate reports through.
//!
//! The API uses bearer token authentication; the token is obtained by the
//! web login choreography in [`crate::auth`] and checked lazily for
//! expiry before each request.

pub mod client;
pub mod error;

pub use client::{ApiEndpoints, HelenClient};
pub use error::ApiError;
