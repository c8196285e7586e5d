//! HTTP sample source.
//!
//! Talks to a sample service over a small JSON API:
//!
//! ```text
//! GET <base>/samples?keywords=<kw>&timeframe=<tf>&cat=<n>&geo=<region>&gprop=<property>
//!
//! { "columns": ["euro"],
//!   "rows": [ { "time": 1577836800, "values": [42], "partial": false }, ... ] }
//! ```
//!
//! Status codes map onto [`SourceError`] so the fetcher can tell rate limits
//! and server hiccups (retried) from auth and format problems (fatal). This
//! type issues exactly one request per call; retries live in the fetcher.

use serde::Deserialize;
use std::time::Duration;

use super::provider::{FetchRequest, FrameRow, SampleFrame, SampleSource, SourceError};

#[derive(Debug, Deserialize)]
struct SamplesResponse {
    columns: Vec<String>,
    rows: Vec<SamplesRow>,
}

#[derive(Debug, Deserialize)]
struct SamplesRow {
    time: i64,
    values: Vec<Option<f64>>,
    #[serde(default)]
    partial: bool,
}

/// HTTP-backed sample source.
pub struct HttpSource {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self, SourceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("trendstitch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SourceError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn samples_url(&self) -> String {
        format!("{}/samples", self.base_url)
    }

    fn query(request: &FetchRequest) -> Vec<(&'static str, String)> {
        vec![
            ("keywords", request.keywords.join(",")),
            ("timeframe", request.timeframe.to_string()),
            ("cat", request.filters.category.to_string()),
            ("geo", request.filters.region.clone()),
            ("gprop", request.filters.property.clone()),
        ]
    }

    /// Convert the JSON body into a frame. Missing values become 0, which is
    /// how the service encodes "below reporting threshold".
    fn parse_response(body: SamplesResponse) -> Result<SampleFrame, SourceError> {
        let width = body.columns.len();
        let mut rows = Vec::with_capacity(body.rows.len());

        for row in body.rows {
            let timestamp = chrono::DateTime::from_timestamp(row.time, 0)
                .map(|dt| dt.naive_utc())
                .ok_or_else(|| {
                    SourceError::MalformedResponse(format!("invalid timestamp: {}", row.time))
                })?;

            if row.values.len() != width {
                return Err(SourceError::MalformedResponse(format!(
                    "row at {timestamp} has {} values for {width} columns",
                    row.values.len()
                )));
            }

            rows.push(FrameRow {
                timestamp,
                values: row.values.into_iter().map(|v| v.unwrap_or(0.0)).collect(),
                partial: row.partial,
            });
        }

        Ok(SampleFrame {
            columns: body.columns,
            rows,
        })
    }
}

impl SampleSource for HttpSource {
    fn name(&self) -> &str {
        "http"
    }

    fn fetch(&self, request: &FetchRequest) -> Result<SampleFrame, SourceError> {
        let resp = self
            .client
            .get(self.samples_url())
            .query(&Self::query(request))
            .send()
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    SourceError::NetworkUnreachable(e.to_string())
                } else {
                    SourceError::Response(e.to_string())
                }
            })?;

        let status = resp.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            return Err(SourceError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(SourceError::Unauthorized(format!(
                "HTTP {status} for '{}'",
                request.timeframe
            )));
        }

        if status.is_server_error() {
            return Err(SourceError::Response(format!("HTTP {status}")));
        }

        if !status.is_success() {
            return Err(SourceError::Other(format!(
                "HTTP {status} for '{}'",
                request.timeframe
            )));
        }

        let text = resp
            .text()
            .map_err(|e| SourceError::Response(format!("failed to read response body: {e}")))?;
        let body: SamplesResponse = serde_json::from_str(&text)
            .map_err(|e| SourceError::MalformedResponse(format!("failed to parse response: {e}")))?;

        Self::parse_response(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Filters, Timeframe};
    use chrono::NaiveDate;

    fn parse(json: &str) -> Result<SampleFrame, SourceError> {
        let body: SamplesResponse = serde_json::from_str(json).unwrap();
        HttpSource::parse_response(body)
    }

    #[test]
    fn parses_rows_and_partial_flag() {
        let frame = parse(
            r#"{"columns":["euro"],"rows":[
                {"time":1577836800,"values":[42]},
                {"time":1577923200,"values":[null],"partial":true}
            ]}"#,
        )
        .unwrap();

        assert_eq!(frame.columns, vec!["euro".to_string()]);
        assert_eq!(frame.rows.len(), 2);
        assert_eq!(
            frame.rows[0].timestamp,
            NaiveDate::from_ymd_opt(2020, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
        assert_eq!(frame.rows[0].values, vec![42.0]);
        assert!(!frame.rows[0].partial);
        assert_eq!(frame.rows[1].values, vec![0.0]);
        assert!(frame.rows[1].partial);
    }

    #[test]
    fn ragged_rows_are_malformed() {
        let err = parse(r#"{"columns":["a","b"],"rows":[{"time":0,"values":[1]}]}"#).unwrap_err();
        assert!(matches!(err, SourceError::MalformedResponse(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn query_carries_timeframe_and_filters() {
        let request = FetchRequest::single(
            "euro",
            Timeframe::Trailing { days: 7 },
            &Filters {
                category: 7,
                region: "DE".into(),
                property: "news".into(),
            },
        );
        let q = HttpSource::query(&request);
        assert!(q.contains(&("timeframe", "now 7-d".to_string())));
        assert!(q.contains(&("cat", "7".to_string())));
        assert!(q.contains(&("geo", "DE".to_string())));
        assert!(q.contains(&("gprop", "news".to_string())));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let source = HttpSource::new("http://localhost:8080/").unwrap();
        assert_eq!(source.samples_url(), "http://localhost:8080/samples");
    }
}
