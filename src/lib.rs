//! Client library for the Oma Helen electricity portal.
//!
//! The crate logs in through the portal's web login choreography, resolves
//! the caller's active contract, fetches metered consumption and hourly
//! spot prices, and derives billing figures from the series:
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use omahelen::HelenClient;
//!
//! # async fn run() -> Result<(), omahelen::ApiError> {
//! let mut client = HelenClient::new()?;
//! client.login("username", "password").await?;
//!
//! let start = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
//! let end = NaiveDate::from_ymd_opt(2023, 6, 30).unwrap();
//! let cost = client.spot_cost(start, end).await?;
//! println!("June spot cost: {cost:.2} EUR");
//! client.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! Measurement and price reads are cached in memory for an hour and are
//! scoped to the resolved delivery site; see [`api::HelenClient`] for the
//! full operation surface.

pub mod api;
pub mod auth;
pub mod billing;
pub mod cache;
pub mod contracts;
pub mod models;
pub mod utils;

pub use api::{ApiEndpoints, ApiError, HelenClient};
pub use auth::{AuthEndpoints, Authenticator, Session};
pub use models::{
    Contract, ContractDomain, MeasurementPoint, MeasurementResponse, SpotPriceResponse,
};
