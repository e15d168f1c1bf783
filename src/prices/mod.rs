//! Day-ahead electricity price feed.
//!
//! The engine only needs "a day-ahead average price or an error"; the
//! concrete implementation queries the ENTSO-E transparency API for
//! yesterday's Berlin-local day and averages the published hourly points.
//! Every failure is recoverable: the caller falls back to the local
//! weighted price (see `engine::price`).

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, TimeZone, Utc};
use chrono_tz::Europe::Berlin;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use std::time::Duration;

use crate::config::PricesConfig;

#[async_trait]
pub trait DayAheadPriceFeed: Send + Sync {
    /// Average day-ahead price in EUR/kWh, or an error.
    async fn fetch_day_ahead_average(&self) -> Result<f64>;
}

pub struct EntsoePriceFeed {
    base_url: String,
    security_token: String,
    area_eic: String,
    client: reqwest::Client,
}

impl EntsoePriceFeed {
    pub fn new(cfg: &PricesConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("circular-meter-controller/0.3"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/xml"));
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.http_timeout_secs))
            .default_headers(headers)
            .build()?;
        Ok(Self {
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            security_token: cfg.security_token.clone(),
            area_eic: cfg.area_eic.clone(),
            client,
        })
    }
}

/// The query window: yesterday 00:00 to today 00:00, Berlin local time,
/// rendered in UTC as the API expects (yyyyMMddHHmm).
fn berlin_yesterday_window(now: DateTime<Utc>) -> Result<(String, String)> {
    let today = now.with_timezone(&Berlin).date_naive();
    let yesterday = today
        .pred_opt()
        .context("date underflow computing yesterday")?;
    let midnight = NaiveTime::MIN;
    let start = Berlin
        .from_local_datetime(&yesterday.and_time(midnight))
        .earliest()
        .context("no valid local midnight for window start")?;
    let end = start + ChronoDuration::days(1);
    let fmt = "%Y%m%d%H%M";
    Ok((
        start.with_timezone(&Utc).format(fmt).to_string(),
        end.with_timezone(&Utc).format(fmt).to_string(),
    ))
}

static PRICE_POINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<price\.amount>\s*(-?\d+(?:\.\d+)?)\s*</price\.amount>").expect("price pattern")
});
static ACK_REASON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<text>([^<]*)</text>").expect("reason pattern"));

/// Pull all published price points (EUR/MWh) out of a market document.
fn extract_price_points(body: &str) -> Result<Vec<f64>> {
    if body.contains("Acknowledgement_MarketDocument") {
        let reason = ACK_REASON
            .captures(body)
            .map(|c| c[1].trim().to_string())
            .unwrap_or_else(|| "no reason given".to_string());
        bail!("ENTSO-E acknowledgement: {reason}");
    }
    let points: Vec<f64> = PRICE_POINT
        .captures_iter(body)
        .filter_map(|c| c[1].parse().ok())
        .collect();
    if points.is_empty() {
        bail!("day-ahead document contained no price points");
    }
    Ok(points)
}

#[async_trait]
impl DayAheadPriceFeed for EntsoePriceFeed {
    async fn fetch_day_ahead_average(&self) -> Result<f64> {
        let (period_start, period_end) = berlin_yesterday_window(Utc::now())?;
        let response = self
            .client
            .get(format!("{}/api", self.base_url))
            .query(&[
                ("securityToken", self.security_token.as_str()),
                ("documentType", "A44"),
                ("in_Domain", self.area_eic.as_str()),
                ("out_Domain", self.area_eic.as_str()),
                ("periodStart", period_start.as_str()),
                ("periodEnd", period_end.as_str()),
            ])
            .send()
            .await
            .context("day-ahead price GET failed")?;
        let status = response.status();
        let body = response
            .text()
            .await
            .context("day-ahead price read failed")?;
        if !status.is_success() {
            bail!("day-ahead price API error: HTTP {status}");
        }
        let points = extract_price_points(&body)?;
        let avg_mwh = points.iter().sum::<f64>() / points.len() as f64;
        Ok(avg_mwh / 1000.0)
    }
}
