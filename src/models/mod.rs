//! Data models for Oma Helen API payloads.
//!
//! This module contains the typed shapes the loosely-structured JSON
//! payloads are deserialized into at the API boundary:
//!
//! - `Contract`, `Product`, `Component`, `DeliverySite`: contract-list data
//! - `MeasurementSeries`, `MeasurementPoint`: consumption time series
//! - `SpotPriceResponse`: hourly exchange prices, same series shape
//!
//! Unknown JSON fields are ignored; unknown enum values map to explicit
//! catch-all variants rather than failing deserialization.

pub mod contract;
pub mod measurement;

pub use contract::{Component, Contract, ContractDomain, ContractListResponse, DeliverySite, Product};
pub use measurement::{
    MeasurementIntervals, MeasurementPoint, MeasurementResponse, MeasurementSeries,
    MeasurementStatus, SpotPriceResponse,
};
