//! AMFI (Association of Mutual Funds in India) source.
//!
//! Covers every Indian mutual fund scheme, keyed by AMFI's numeric scheme code.
//!
//! # Endpoints
//!
//! - Listing: `https://www.amfiindia.com/spages/NAVAll.txt`
//! - History: `https://portal.amfiindia.com/DownloadNAVHistoryReport_Po.aspx?frmdt={dd-Mon-yyyy}&todt={dd-Mon-yyyy}`
//!
//! The history report returns NAVs for all schemes at once, so the last report
//! downloaded is kept and reused by fetches for other schemes over the same
//! window.

mod parser;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use log::{debug, warn};
use reqwest::{header, Client};
use tokio::sync::Mutex;

use crate::errors::MarketDataError;
use crate::models::{
    DateRange, QuotePoint, SourceConfig, SourceId, SourceInfo, Ticker, TickerListing, INR,
};
use crate::provider::SourcePlugin;

pub use parser::{parse_listing, parse_navs, NavRow, ATTR_FUND_HOUSE, ATTR_SCHEME_TYPE};

const LISTING_URL: &str = "https://www.amfiindia.com/spages/NAVAll.txt";
const HISTORY_URL: &str = "https://portal.amfiindia.com/DownloadNAVHistoryReport_Po.aspx";

/// Default HTTP request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Largest window AMFI serves in one history report.
const MAX_FETCH_SPAN_DAYS: u32 = 30;

type Report = Arc<HashMap<String, Vec<NavRow>>>;

/// Built-in source for Indian mutual fund NAVs.
pub struct AmfiSource {
    client: Client,
    listing_url: String,
    history_url: String,
    last_report: Mutex<Option<(DateRange, Report)>>,
}

impl AmfiSource {
    pub fn new() -> Self {
        Self::with_urls(LISTING_URL, HISTORY_URL)
    }

    /// Points the source at different endpoints (mirrors, test servers).
    pub fn with_urls(listing_url: impl Into<String>, history_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            listing_url: listing_url.into(),
            history_url: history_url.into(),
            last_report: Mutex::new(None),
        }
    }

    /// Downloads a text/plain body. Anything else is treated as the source
    /// being unavailable, since AMFI serves HTML error pages with status 200.
    async fn download(&self, url: &str) -> Result<String, MarketDataError> {
        let id = self.id();
        debug!("[{}] GET {}", id, url);

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                MarketDataError::Timeout {
                    source_id: id.clone(),
                }
            } else {
                MarketDataError::unavailable(&id, e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(MarketDataError::unavailable(&id, format!("HTTP {}", status)));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.contains("text/plain") {
            return Err(MarketDataError::unavailable(
                &id,
                format!("unexpected content type '{}'", content_type),
            ));
        }

        Ok(response.text().await?)
    }

    fn history_url_for(&self, range: DateRange) -> String {
        format!(
            "{}?frmdt={}&todt={}",
            self.history_url,
            parser::format_report_date(range.start()),
            parser::format_report_date(range.end())
        )
    }

    /// Returns the NAV report for `range`, downloading it unless it is the
    /// report most recently fetched. The lock is held across the download so
    /// concurrent fetches for different schemes share one request.
    async fn report(&self, range: DateRange) -> Result<Report, MarketDataError> {
        let mut last = self.last_report.lock().await;
        if let Some((cached_range, report)) = last.as_ref() {
            if *cached_range == range {
                return Ok(Arc::clone(report));
            }
        }

        let body = self.download(&self.history_url_for(range)).await?;
        let rows = parse_navs(&body)?;
        debug!("[{}] report {} has {} rows", self.id(), range, rows.len());

        let mut by_scheme: HashMap<String, Vec<NavRow>> = HashMap::new();
        for row in rows {
            by_scheme.entry(row.scheme_code.clone()).or_default().push(row);
        }
        let report = Arc::new(by_scheme);
        *last = Some((range, Arc::clone(&report)));
        Ok(report)
    }
}

impl Default for AmfiSource {
    fn default() -> Self {
        Self::new()
    }
}

fn is_scheme_code(symbol: &str) -> bool {
    !symbol.is_empty() && symbol.chars().all(|c| c.is_ascii_digit())
}

#[async_trait]
impl SourcePlugin for AmfiSource {
    fn id(&self) -> SourceId {
        SourceId::amfi()
    }

    fn info(&self) -> SourceInfo {
        SourceInfo {
            key: SourceId::AMFI.to_string(),
            name: "Mutual Fund India".to_string(),
            description: "Data source for all Indian mutual funds, sourced from AMFI."
                .to_string(),
            version: 1,
        }
    }

    fn config(&self) -> SourceConfig {
        SourceConfig {
            ticker_refresh_interval: Some(ChronoDuration::days(7)),
            data_refresh_interval: ChronoDuration::days(1),
            max_fetch_span: Some(MAX_FETCH_SPAN_DAYS),
        }
    }

    async fn list_tickers(&self) -> Result<Vec<TickerListing>, MarketDataError> {
        let body = self.download(&self.listing_url).await?;
        let listings = parse_listing(&body).map_err(|e| {
            warn!("[{}] listing could not be parsed: {}", self.id(), e);
            MarketDataError::unavailable(&self.id(), e.to_string())
        })?;
        debug!("[{}] listed {} schemes", self.id(), listings.len());
        Ok(listings)
    }

    async fn fetch(
        &self,
        symbol: &str,
        range: DateRange,
    ) -> Result<Vec<QuotePoint>, MarketDataError> {
        if !is_scheme_code(symbol) {
            return Err(MarketDataError::InvalidTicker {
                source_id: self.id(),
                symbol: symbol.to_string(),
            });
        }

        let report = self.report(range).await?;
        let ticker = Ticker::new(self.id(), symbol);
        let points = report
            .get(symbol)
            .map(|rows| {
                rows.iter()
                    .map(|row| QuotePoint::new(ticker.clone(), row.date, row.nav, INR))
                    .collect()
            })
            .unwrap_or_default();
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_source_identity() {
        let source = AmfiSource::new();
        assert_eq!(source.id(), SourceId::new("amfi"));
        assert_eq!(source.info().key, "amfi");
        assert_eq!(source.info().version, 1);
    }

    #[test]
    fn test_config() {
        let config = AmfiSource::new().config();
        assert_eq!(config.ticker_refresh_interval, Some(ChronoDuration::days(7)));
        assert_eq!(config.data_refresh_interval, ChronoDuration::days(1));
        assert_eq!(config.max_fetch_span, Some(30));
    }

    #[test]
    fn test_history_url() {
        let source = AmfiSource::with_urls("http://listing", "http://history");
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 30).unwrap(),
        )
        .unwrap();
        assert_eq!(
            source.history_url_for(range),
            "http://history?frmdt=01-Jan-2025&todt=30-Jan-2025"
        );
    }

    #[tokio::test]
    async fn test_non_numeric_symbol_is_invalid() {
        let source = AmfiSource::with_urls("http://127.0.0.1:9", "http://127.0.0.1:9");
        let range = DateRange::single(NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
        let err = source.fetch("INF209KA12Z1", range).await.unwrap_err();
        assert!(matches!(err, MarketDataError::InvalidTicker { .. }));
    }
}
