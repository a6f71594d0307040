//! API client for the Oma Helen REST API.
//!
//! This module provides the `HelenClient` struct: it owns the login
//! session, resolves the working contract, serves measurement and
//! spot-price series through small TTL caches, and exposes the billing
//! figures derived from them.

use chrono::{Duration, NaiveDate, Utc};
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::auth::{AuthEndpoints, Authenticator, Session};
use crate::billing;
use crate::cache::TtlCache;
use crate::contracts;
use crate::models::{
    Component, Contract, ContractDomain, ContractListResponse, MeasurementResponse,
    SpotPriceResponse,
};
use crate::utils::window;

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Base URL for the data API
const API_BASE_URL: &str = "https://api.omahelen.fi/v7";

/// Base URL for the spot-price endpoint (one API generation ahead)
const SPOT_API_BASE_URL: &str = "https://api.omahelen.fi/v8";

const MEASUREMENTS_ENDPOINT: &str = "/measurements/electricity";
const TRANSFER_MEASUREMENTS_ENDPOINT: &str = "/measurements/electricity-transfer";
const SPOT_PRICES_ENDPOINT: &str = "/measurements/electricity/spot-prices";
const CONTRACT_ENDPOINT: &str = "/contract/list";

/// HTTP request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Series caches hold the windows a caller flips between; contract and
/// yearly data change rarely and need less room.
const SERIES_CACHE_CAPACITY: usize = 4;
const YEARLY_CACHE_CAPACITY: usize = 2;

/// Cache entries go stale after an hour, same horizon as the session.
const CACHE_TTL_MINUTES: i64 = 60;

/// Default VAT rate applied to spot costs
const DEFAULT_TAX_RATE: f64 = 0.255;

/// Default exchange-contract margin in ct/kWh
const DEFAULT_MARGIN_CT_PER_KWH: f64 = 0.38;

/// Component name carrying the energy unit price in energy products
const ENERGY_UNIT_COMPONENT: &str = "Energia";

/// Data-API entry points, overridable for tests.
#[derive(Debug, Clone)]
pub struct ApiEndpoints {
    pub api_base: String,
    pub spot_base: String,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            api_base: API_BASE_URL.to_string(),
            spot_base: SPOT_API_BASE_URL.to_string(),
        }
    }
}

/// Client for the Oma Helen API.
///
/// Holds one authenticated principal and one working delivery-site
/// selection at a time. All state (session, selection, caches) lives on
/// the value itself, so independent clients coexist in one process.
/// Methods take `&mut self`; concurrent callers must bring their own
/// lock.
pub struct HelenClient {
    auth: Authenticator,
    auth_endpoints: AuthEndpoints,
    client: Client,
    endpoints: ApiEndpoints,
    session: Option<Session>,
    tax: f64,
    margin: f64,
    selected_delivery_site: Option<String>,
    daily_cache: TtlCache<(NaiveDate, NaiveDate), MeasurementResponse>,
    hourly_cache: TtlCache<(NaiveDate, NaiveDate), MeasurementResponse>,
    monthly_cache: TtlCache<i32, MeasurementResponse>,
    spot_cache: TtlCache<(NaiveDate, NaiveDate), SpotPriceResponse>,
    contract_cache: TtlCache<(), Vec<Contract>>,
}

impl HelenClient {
    pub fn new() -> Result<Self, ApiError> {
        Self::with_rates(DEFAULT_TAX_RATE, DEFAULT_MARGIN_CT_PER_KWH)
    }

    /// Create a client with a specific tax rate (e.g. `0.255`) and
    /// exchange margin in ct/kWh.
    pub fn with_rates(tax: f64, margin: f64) -> Result<Self, ApiError> {
        Self::with_config(
            ApiEndpoints::default(),
            AuthEndpoints::default(),
            tax,
            margin,
        )
    }

    pub fn with_config(
        endpoints: ApiEndpoints,
        auth_endpoints: AuthEndpoints,
        tax: f64,
        margin: f64,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        let ttl = Duration::minutes(CACHE_TTL_MINUTES);
        Ok(Self {
            auth: Authenticator::with_endpoints(auth_endpoints.clone())?,
            auth_endpoints,
            client,
            endpoints,
            session: None,
            tax,
            margin,
            selected_delivery_site: None,
            daily_cache: TtlCache::new(SERIES_CACHE_CAPACITY, ttl),
            hourly_cache: TtlCache::new(SERIES_CACHE_CAPACITY, ttl),
            monthly_cache: TtlCache::new(YEARLY_CACHE_CAPACITY, ttl),
            spot_cache: TtlCache::new(SERIES_CACHE_CAPACITY, ttl),
            contract_cache: TtlCache::new(YEARLY_CACHE_CAPACITY, ttl),
        })
    }

    // ===== Session =====

    /// Log in to Oma Helen. Replaces any existing session.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<(), ApiError> {
        let session = self.auth.login(username, password).await?;
        self.session = Some(session);
        Ok(())
    }

    /// Whether a login has happened within the validity horizon.
    pub fn is_session_valid(&self) -> bool {
        self.session.as_ref().map(|s| !s.is_expired()).unwrap_or(false)
    }

    /// The bearer token of the current session.
    pub fn access_token(&self) -> Result<&str, ApiError> {
        match &self.session {
            None => Err(ApiError::NotLoggedIn),
            Some(session) if session.is_expired() => Err(ApiError::SessionExpired),
            Some(session) => Ok(&session.access_token),
        }
    }

    /// Drop the session and its cookie store. Idempotent; safe to call
    /// without a prior login.
    pub fn close(&mut self) -> Result<(), ApiError> {
        self.session = None;
        self.auth = Authenticator::with_endpoints(self.auth_endpoints.clone())?;
        self.invalidate_caches();
        debug!("session closed");
        Ok(())
    }

    /// Adjust the exchange margin used for spot-cost calculations.
    pub fn set_margin(&mut self, margin: f64) {
        self.margin = margin;
    }

    // ===== Contracts =====

    /// The full contract list, including ended contracts. Cached.
    pub async fn contracts(&mut self) -> Result<Vec<Contract>, ApiError> {
        if let Some(contracts) = self.contract_cache.get(&()) {
            return Ok(contracts);
        }
        let token = self.bearer_token()?;
        let url = format!("{}{}", self.endpoints.api_base, CONTRACT_ENDPOINT);
        let response: ContractListResponse = self.get_json(&url, &[], &token).await?;
        debug!(count = response.contracts.len(), "fetched contract list");
        self.contract_cache.insert((), response.contracts.clone());
        Ok(response.contracts)
    }

    /// Technical delivery-site ids across the active contracts.
    pub async fn delivery_site_ids(&mut self) -> Result<Vec<u64>, ApiError> {
        let contracts = self.contracts().await?;
        Ok(contracts::delivery_site_ids(&contracts, Utc::now().naive_utc()))
    }

    /// GSRN ids across the active contracts.
    pub async fn gsrn_ids(&mut self) -> Result<Vec<String>, ApiError> {
        let contracts = self.contracts().await?;
        Ok(contracts::gsrn_ids(&contracts, Utc::now().naive_utc()))
    }

    /// Scope all subsequent measurement reads to the given delivery site.
    /// `site` may be the technical id or the GSRN. Validation happens
    /// first: an id unknown to the active contracts fails with
    /// `InvalidDeliverySite` and mutates nothing. On success every cache
    /// is dropped, since the old entries were scoped to the previous site.
    pub async fn select_delivery_site(&mut self, site: &str) -> Result<(), ApiError> {
        let all = self.contracts().await?;
        contracts::resolve_active(&all, Some(site), Utc::now().naive_utc())?;
        self.selected_delivery_site = Some(site.to_string());
        self.invalidate_caches();
        debug!(site, "delivery site selected");
        Ok(())
    }

    /// The contract measurement reads are scoped to: the explicitly
    /// selected site's contract, or the most recently started active one.
    pub async fn resolved_contract(&mut self) -> Result<Contract, ApiError> {
        let all = self.contracts().await?;
        let selected = self.selected_delivery_site.clone();
        let contract = contracts::resolve_active(&all, selected.as_deref(), Utc::now().naive_utc())?;
        Ok(contract.clone())
    }

    // ===== Measurements and spot prices =====

    /// Day-resolution consumption over local calendar days `start..=end`.
    pub async fn daily_measurements(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<MeasurementResponse, ApiError> {
        if let Some(hit) = self.daily_cache.get(&(start, end)) {
            debug!("daily measurements served from cache");
            return Ok(hit);
        }
        let (begin, stop) = window::day_window(start, end);
        let response = self.fetch_measurements(&begin, &stop, "day").await?;
        self.daily_cache.insert((start, end), response.clone());
        Ok(response)
    }

    /// Hour-resolution consumption over local calendar days `start..=end`.
    pub async fn hourly_measurements(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<MeasurementResponse, ApiError> {
        if let Some(hit) = self.hourly_cache.get(&(start, end)) {
            debug!("hourly measurements served from cache");
            return Ok(hit);
        }
        let (begin, stop) = window::day_window(start, end);
        let response = self.fetch_measurements(&begin, &stop, "hour").await?;
        self.hourly_cache.insert((start, end), response.clone());
        Ok(response)
    }

    /// Month-resolution consumption for a full calendar year.
    pub async fn monthly_measurements(&mut self, year: i32) -> Result<MeasurementResponse, ApiError> {
        if let Some(hit) = self.monthly_cache.get(&year) {
            debug!("monthly measurements served from cache");
            return Ok(hit);
        }
        let (begin, stop) = window::year_window(year);
        let response = self.fetch_measurements(&begin, &stop, "month").await?;
        self.monthly_cache.insert(year, response.clone());
        Ok(response)
    }

    /// Hour-resolution spot prices over local calendar days `start..=end`.
    pub async fn hourly_spot_prices(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<SpotPriceResponse, ApiError> {
        if let Some(hit) = self.spot_cache.get(&(start, end)) {
            debug!("spot prices served from cache");
            return Ok(hit);
        }
        let token = self.bearer_token()?;
        let contract = self.resolved_contract().await?;
        let (begin, stop) = window::day_window(start, end);
        let url = format!("{}{}", self.endpoints.spot_base, SPOT_PRICES_ENDPOINT);
        let query = measurement_query(&begin, &stop, "hour", contract.delivery_site.id);
        let response: SpotPriceResponse = self.get_json(&url, &query, &token).await?;
        self.spot_cache.insert((start, end), response.clone());
        Ok(response)
    }

    // ===== Contract figures =====

    /// Monthly base price of the energy product, in euros. `0.0` when the
    /// contract has no such component.
    pub async fn contract_base_price(&mut self) -> Result<f64, ApiError> {
        let contract = self.figure_contract().await?;
        Ok(component_price(
            contract
                .energy_product()
                .and_then(|p| p.base_price_component()),
            "contract base price",
        ))
    }

    /// Per-kWh energy price of the contract, in ct/kWh. `0.0` when the
    /// contract has no such component.
    pub async fn energy_unit_price(&mut self) -> Result<f64, ApiError> {
        let contract = self.figure_contract().await?;
        Ok(component_price(
            contract
                .energy_product()
                .and_then(|p| p.component_named(ENERGY_UNIT_COMPONENT)),
            "energy unit price",
        ))
    }

    /// Per-kWh grid transfer fee, in ct/kWh. `0.0` for contracts without
    /// a transfer product.
    pub async fn transfer_fee(&mut self) -> Result<f64, ApiError> {
        let contract = self.figure_contract().await?;
        let component = contract
            .transfer_product()
            .and_then(|p| p.components.iter().find(|c| !c.is_base_price));
        if let Some(component) = component {
            debug!(name = %component.name, "transfer fee component");
        }
        Ok(component_price(component, "transfer fee"))
    }

    /// Monthly base price of the transfer product, in euros. `0.0` for
    /// contracts without one.
    pub async fn transfer_base_price(&mut self) -> Result<f64, ApiError> {
        let contract = self.figure_contract().await?;
        Ok(component_price(
            contract
                .transfer_product()
                .and_then(|p| p.base_price_component()),
            "transfer base price",
        ))
    }

    /// Product type of the resolved contract's energy product.
    pub async fn contract_type(&mut self) -> Result<Option<String>, ApiError> {
        let contract = self.figure_contract().await?;
        Ok(contract
            .energy_product()
            .and_then(|p| p.product_type.clone()))
    }

    // ===== Derived billing figures =====

    /// Total cost of consumption in the window priced at hourly spot
    /// prices plus the configured margin, including tax. Euros.
    pub async fn spot_cost(&mut self, start: NaiveDate, end: NaiveDate) -> Result<f64, ApiError> {
        let prices = self.hourly_spot_prices(start, end).await?;
        let measurements = self.hourly_measurements(start, end).await?;
        Ok(billing::total_spot_cost(
            prices.points(),
            measurements.points(),
            self.margin,
            self.tax,
        ))
    }

    /// ct/kWh delta between the consumption-weighted and plain average
    /// price over the window.
    pub async fn usage_impact(&mut self, start: NaiveDate, end: NaiveDate) -> Result<f64, ApiError> {
        let prices = self.hourly_spot_prices(start, end).await?;
        let measurements = self.hourly_measurements(start, end).await?;
        Ok(billing::usage_impact(prices.points(), measurements.points()))
    }

    /// Total grid-transfer charge over the window: daily consumption at
    /// the contract's transfer fee plus its base price. Euros.
    pub async fn transfer_fees(&mut self, start: NaiveDate, end: NaiveDate) -> Result<f64, ApiError> {
        let daily = self.daily_measurements(start, end).await?;
        let fee = self.transfer_fee().await?;
        let base_price = self.transfer_base_price().await?;
        Ok(billing::transfer_fee_total(daily.points(), fee, base_price))
    }

    // ===== Internals =====

    fn bearer_token(&self) -> Result<String, ApiError> {
        self.access_token().map(str::to_string)
    }

    fn invalidate_caches(&mut self) {
        self.daily_cache.clear();
        self.hourly_cache.clear();
        self.monthly_cache.clear();
        self.spot_cache.clear();
        self.contract_cache.clear();
    }

    /// Contract used by figure lookups: contract data missing entirely is
    /// an error here, not a `0.0` default.
    async fn figure_contract(&mut self) -> Result<Contract, ApiError> {
        let all = self.contracts().await?;
        if all.is_empty() {
            return Err(ApiError::MissingContractData(
                "contract list is empty".to_string(),
            ));
        }
        let selected = self.selected_delivery_site.clone();
        let contract = contracts::resolve_active(&all, selected.as_deref(), Utc::now().naive_utc())?;
        Ok(contract.clone())
    }

    async fn fetch_measurements(
        &mut self,
        begin: &str,
        end: &str,
        resolution: &str,
    ) -> Result<MeasurementResponse, ApiError> {
        let token = self.bearer_token()?;
        let contract = self.resolved_contract().await?;
        let endpoint = match contract.domain {
            ContractDomain::ElectricityTransfer => TRANSFER_MEASUREMENTS_ENDPOINT,
            _ => MEASUREMENTS_ENDPOINT,
        };
        let url = format!("{}{}", self.endpoints.api_base, endpoint);
        let query = measurement_query(begin, end, resolution, contract.delivery_site.id);
        self.get_json(&url, &query, &token).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        token: &str,
    ) -> Result<T, ApiError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .bearer_auth(token)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::from_status(status, &text));
        }
        serde_json::from_str(&text).map_err(|e| {
            warn!(url, error = %e, "unparseable API response");
            ApiError::InvalidResponse(format!("failed to parse response from {}: {}", url, e))
        })
    }
}

fn measurement_query(
    begin: &str,
    end: &str,
    resolution: &str,
    delivery_site_id: u64,
) -> Vec<(&'static str, String)> {
    vec![
        ("begin", begin.to_string()),
        ("end", end.to_string()),
        ("resolution", resolution.to_string()),
        ("delivery_site_id", delivery_site_id.to_string()),
        ("allow_transfer", "true".to_string()),
    ]
}

fn component_price(component: Option<&Component>, figure: &str) -> f64 {
    match component {
        Some(component) => component.price,
        None => {
            warn!(figure, "figure not present in contract data, defaulting to 0.0");
            0.0
        }
    }
}
