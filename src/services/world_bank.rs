// src/services/world_bank.rs
use async_trait::async_trait;
use chrono::NaiveDate;
use log::{debug, error, info, warn};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::config::AppConfig;
use crate::models::{SeriesError, SeriesLabel, TimeSeries, TimeSeriesPoint};

/// Kenya, real GDP in constant 2015 US$.
pub const COUNTRY_CODE: &str = "KE";
pub const INDICATOR_CODE: &str = "NY.GDP.MKTP.KD";
pub const PER_PAGE: u32 = 1000;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("request to World Bank API failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("World Bank API returned HTTP {0}")]
    Status(u16),
    #[error("World Bank API response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("World Bank API error: {0}")]
    Api(String),
    #[error("unexpected World Bank API response: {0}")]
    Malformed(String),
}

impl From<SeriesError> for LoadError {
    fn from(e: SeriesError) -> Self {
        LoadError::Malformed(e.to_string())
    }
}

/// Anything that can produce the GDP series. The HTTP client is the production
/// source; tests inject fixed series.
#[async_trait]
pub trait SeriesSource: Send + Sync {
    async fn fetch(&self) -> Result<TimeSeries, LoadError>;
}

pub struct WorldBankClient {
    client: Client,
    base_url: String,
}

impl WorldBankClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LoadError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, LoadError> {
        Self::new(config.world_bank_base_url.clone(), config.http_timeout)
    }

    pub fn url(&self) -> String {
        format!(
            "{}/v2/country/{}/indicator/{}?format=json&per_page={}",
            self.base_url, COUNTRY_CODE, INDICATOR_CODE, PER_PAGE
        )
    }
}

#[async_trait]
impl SeriesSource for WorldBankClient {
    async fn fetch(&self) -> Result<TimeSeries, LoadError> {
        let url = self.url();
        info!("Fetching GDP series from URL: {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            error!("World Bank API answered {} for {}", status, url);
            return Err(LoadError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let series = parse_response(&body)?;
        info!(
            "Loaded {} observations for {} ({:?}..{:?})",
            series.len(),
            series.country.value,
            series.first_year(),
            series.last_year()
        );
        Ok(series)
    }
}

/// Parses a World Bank v2 indicator response: `[metadata, records]`.
pub fn parse_response(body: &str) -> Result<TimeSeries, LoadError> {
    let root: Value = serde_json::from_str(body)?;
    let items = root
        .as_array()
        .ok_or_else(|| LoadError::Malformed(format!("expected a top-level array, got {}", kind(&root))))?;

    if let Some(message) = api_error_message(items) {
        error!("World Bank API rejected the request: {}", message);
        return Err(LoadError::Api(message));
    }

    let meta = items.first().ok_or_else(|| LoadError::Malformed("empty top-level array".into()))?;
    let pages = meta.get("pages").and_then(as_u64_lenient).unwrap_or(1);
    if pages > 1 {
        warn!("Response spans {} pages, only the first one is read", pages);
    }
    let last_updated = meta
        .get("lastupdated")
        .and_then(Value::as_str)
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());

    let records: &[Value] = match items.get(1) {
        None => return Err(LoadError::Malformed("missing records element".into())),
        Some(Value::Null) => {
            info!("World Bank API returned no observations");
            &[]
        }
        Some(Value::Array(records)) => records,
        Some(other) => {
            return Err(LoadError::Malformed(format!(
                "records element is {}, expected an array",
                kind(other)
            )))
        }
    };

    let mut points = Vec::with_capacity(records.len());
    let mut dropped = 0usize;
    for (i, record) in records.iter().enumerate() {
        let obj = record
            .as_object()
            .ok_or_else(|| LoadError::Malformed(format!("record {} is {}", i, kind(record))))?;

        let date = obj
            .get("date")
            .and_then(Value::as_str)
            .ok_or_else(|| LoadError::Malformed(format!("record {} has no date", i)))?;
        let year = date
            .trim()
            .parse::<i32>()
            .map_err(|_| LoadError::Malformed(format!("record {} has non-year date {:?}", i, date)))?;

        let raw_value = obj
            .get("value")
            .ok_or_else(|| LoadError::Malformed(format!("record {} has no value field", i)))?;
        match coerce_value(raw_value) {
            Some(value) => points.push(TimeSeriesPoint { year, value }),
            None => dropped += 1,
        }
    }
    debug!("Parsed {} observations, dropped {} without a value", points.len(), dropped);

    let first = records.first();
    let country = first.and_then(|r| label(r, "country")).unwrap_or_else(|| SeriesLabel {
        id: COUNTRY_CODE.to_string(),
        value: String::new(),
    });
    let indicator = first.and_then(|r| label(r, "indicator")).unwrap_or_else(|| SeriesLabel {
        id: INDICATOR_CODE.to_string(),
        value: String::new(),
    });

    Ok(TimeSeries::new(country, indicator, last_updated, points)?)
}

/// The API reports bad requests as `[{"message": [{"id", "key", "value"}]}]`.
fn api_error_message(items: &[Value]) -> Option<String> {
    let messages = items.first()?.get("message")?.as_array()?;
    let text = messages
        .iter()
        .map(|m| {
            let key = m.get("key").and_then(Value::as_str).unwrap_or("error");
            match m.get("value").and_then(Value::as_str) {
                Some(value) => format!("{}: {}", key, value.trim()),
                None => key.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("; ");
    Some(text)
}

fn coerce_value(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn as_u64_lenient(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn label(record: &Value, field: &str) -> Option<SeriesLabel> {
    serde_json::from_value(record.get(field)?.clone()).ok()
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(date: &str, value: Value) -> Value {
        json!({
            "indicator": {"id": "NY.GDP.MKTP.KD", "value": "GDP (constant 2015 US$)"},
            "country": {"id": "KE", "value": "Kenya"},
            "countryiso3code": "KEN",
            "date": date,
            "value": value,
            "unit": "",
            "obs_status": "",
            "decimal": 0
        })
    }

    fn meta() -> Value {
        json!({"page": 1, "pages": 1, "per_page": 1000, "total": 4, "sourceid": "2", "lastupdated": "2024-12-16"})
    }

    #[test]
    fn test_parse_sorts_and_drops_nulls() {
        let body = json!([
            meta(),
            [
                record("2023", Value::Null),
                record("2022", json!(103.5)),
                record("2020", json!(100.0)),
                record("2021", json!("101.25")),
            ]
        ])
        .to_string();

        let series = parse_response(&body).unwrap();
        assert_eq!(series.years(), vec![2020, 2021, 2022]);
        assert_eq!(series.values(), vec![100.0, 101.25, 103.5]);
        assert_eq!(series.country.value, "Kenya");
        assert_eq!(series.indicator.id, INDICATOR_CODE);
        assert_eq!(series.last_updated, NaiveDate::from_ymd_opt(2024, 12, 16));
    }

    #[test]
    fn test_unparseable_values_dropped() {
        let body = json!([meta(), [record("2020", json!("n/a")), record("2021", json!(5.0))]]).to_string();
        let series = parse_response(&body).unwrap();
        assert_eq!(series.years(), vec![2021]);
    }

    #[test]
    fn test_missing_records_element_is_error() {
        let body = json!([meta()]).to_string();
        assert!(matches!(parse_response(&body), Err(LoadError::Malformed(_))));
    }

    #[test]
    fn test_null_records_is_empty_series() {
        let body = json!([meta(), null]).to_string();
        let series = parse_response(&body).unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn test_api_error_envelope() {
        let body = json!([{"message": [{"id": "120", "key": "Invalid value", "value": "The provided parameter value is not valid"}]}]).to_string();
        match parse_response(&body) {
            Err(LoadError::Api(message)) => assert!(message.contains("Invalid value")),
            other => panic!("expected api error, got {:?}", other),
        }
    }

    #[test]
    fn test_record_without_value_field_is_error() {
        let body = json!([meta(), [{"date": "2020"}]]).to_string();
        assert!(matches!(parse_response(&body), Err(LoadError::Malformed(_))));
    }

    #[test]
    fn test_bad_date_is_error() {
        let body = json!([meta(), [record("2020Q1", json!(1.0))]]).to_string();
        assert!(matches!(parse_response(&body), Err(LoadError::Malformed(_))));
    }

    #[test]
    fn test_duplicate_year_is_error() {
        let body = json!([meta(), [record("2020", json!(1.0)), record("2020", json!(2.0))]]).to_string();
        assert!(matches!(parse_response(&body), Err(LoadError::Malformed(_))));
    }

    #[test]
    fn test_not_json_is_error() {
        assert!(matches!(parse_response("<html>"), Err(LoadError::Json(_))));
        assert!(matches!(parse_response("{}"), Err(LoadError::Malformed(_))));
    }

    #[test]
    fn test_url() {
        let client = WorldBankClient::new("http://api.worldbank.org/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.url(),
            "http://api.worldbank.org/v2/country/KE/indicator/NY.GDP.MKTP.KD?format=json&per_page=1000"
        );
    }
}
