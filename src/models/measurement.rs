use serde::Deserialize;

/// Validity flag attached to every measurement point by the API.
/// Anything other than `valid` (missing meter data, estimates the API
/// refuses to stand behind) is treated as an absent point, never as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementStatus {
    Valid,
    #[serde(other)]
    Invalid,
}

/// A single metered value: consumption in kWh for measurement series,
/// ct/kWh for spot-price series.
#[derive(Debug, Clone, Deserialize)]
pub struct MeasurementPoint {
    #[serde(default)]
    pub value: f64,
    pub status: MeasurementStatus,
}

impl MeasurementPoint {
    pub fn new(value: f64, status: MeasurementStatus) -> Self {
        Self { value, status }
    }

    pub fn valid(value: f64) -> Self {
        Self::new(value, MeasurementStatus::Valid)
    }

    pub fn is_valid(&self) -> bool {
        self.status == MeasurementStatus::Valid
    }

    /// The value if the point is valid, `None` otherwise.
    pub fn valid_value(&self) -> Option<f64> {
        self.is_valid().then_some(self.value)
    }
}

/// One resolution-tagged series of points. Ordering is significant:
/// point `i` corresponds to hour/day/month `i` of the requested window.
#[derive(Debug, Clone, Deserialize)]
pub struct MeasurementSeries {
    pub start: Option<String>,
    pub stop: Option<String>,
    pub resolution_s: Option<i64>,
    pub resolution: Option<String>,
    pub unit: Option<String>,
    #[serde(default)]
    pub measurements: Vec<MeasurementPoint>,
}

/// `intervals` object of a measurements response. Which array is populated
/// depends on the endpoint the request was routed to.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeasurementIntervals {
    #[serde(default)]
    pub electricity: Vec<MeasurementSeries>,
    #[serde(default)]
    pub electricity_transfer: Vec<MeasurementSeries>,
}

/// Response body of the measurements endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct MeasurementResponse {
    #[serde(default)]
    pub intervals: MeasurementIntervals,
}

impl MeasurementResponse {
    /// First series of whichever interval array the API populated.
    pub fn first_series(&self) -> Option<&MeasurementSeries> {
        self.intervals
            .electricity
            .first()
            .or_else(|| self.intervals.electricity_transfer.first())
    }

    /// Points of the first series, or an empty slice when the window
    /// produced no data at all.
    pub fn points(&self) -> &[MeasurementPoint] {
        self.first_series()
            .map(|series| series.measurements.as_slice())
            .unwrap_or(&[])
    }
}

/// Response body of the spot-price endpoint: a single `interval` object
/// shaped like a measurement series, with prices in ct/kWh.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotPriceResponse {
    pub interval: Option<MeasurementSeries>,
}

impl SpotPriceResponse {
    pub fn points(&self) -> &[MeasurementPoint] {
        self.interval
            .as_ref()
            .map(|series| series.measurements.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_measurement_response() {
        let json = r#"{
            "intervals": {
                "electricity": [{
                    "start": "2023-05-31T22:00:00+00:00",
                    "stop": "2023-06-30T21:59:59+00:00",
                    "resolution_s": 3600,
                    "resolution": "hour",
                    "unit": "kWh",
                    "measurements": [
                        {"value": 0.52, "status": "valid"},
                        {"value": 0.0, "status": "missing"}
                    ]
                }]
            }
        }"#;

        let response: MeasurementResponse = serde_json::from_str(json).unwrap();
        let points = response.points();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].valid_value(), Some(0.52));
        assert_eq!(points[1].valid_value(), None);
        assert_eq!(
            response.first_series().unwrap().resolution.as_deref(),
            Some("hour")
        );
    }

    #[test]
    fn transfer_intervals_are_found() {
        let json = r#"{
            "intervals": {
                "electricity_transfer": [{
                    "start": null, "stop": null,
                    "resolution_s": 86400, "resolution": "day", "unit": "kWh",
                    "measurements": [{"value": 12.1, "status": "valid"}]
                }]
            }
        }"#;

        let response: MeasurementResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.points().len(), 1);
    }

    #[test]
    fn empty_intervals_yield_no_points() {
        let response: MeasurementResponse = serde_json::from_str(r#"{"intervals": {}}"#).unwrap();
        assert!(response.points().is_empty());
        assert!(response.first_series().is_none());
    }

    #[test]
    fn spot_prices_without_interval_are_empty() {
        let response: SpotPriceResponse = serde_json::from_str(r#"{"interval": null}"#).unwrap();
        assert!(response.points().is_empty());
    }

    #[test]
    fn unknown_status_maps_to_invalid() {
        let point: MeasurementPoint =
            serde_json::from_str(r#"{"value": 1.0, "status": "estimated"}"#).unwrap();
        assert!(!point.is_valid());
    }
}
