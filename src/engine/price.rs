//! Realtime price state and its local fallback.
//!
//! The day-ahead feed runs off the tick path and reports here; any failure
//! degrades to the mix-weighted local price by relabeling the source. No
//! price error is ever fatal.

use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::{info, warn};

/// Where the effective electricity price comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    /// Mix-weighted local price table.
    Local,
    /// Day-ahead average from the realtime feed.
    RealtimeAverage,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PriceState {
    pub use_realtime: bool,
    pub realtime_price_eur_per_kwh: f64,
    pub source: PriceSource,
}

impl Default for PriceState {
    fn default() -> Self {
        Self {
            use_realtime: false,
            realtime_price_eur_per_kwh: 0.15,
            source: PriceSource::Local,
        }
    }
}

impl PriceState {
    /// True when `avg_price` should apply the realtime correction.
    pub fn realtime_active(&self) -> bool {
        self.use_realtime && self.source != PriceSource::Local
    }

    /// Record the outcome of a day-ahead fetch.
    ///
    /// On failure the previous price is kept and the source falls back to
    /// Local, so the engine keeps producing displayable results.
    pub fn apply_fetch(&mut self, result: anyhow::Result<f64>) {
        match result {
            Ok(price) => {
                self.realtime_price_eur_per_kwh = price;
                self.source = PriceSource::RealtimeAverage;
                info!(price_eur_per_kwh = price, "day-ahead average price updated");
            }
            Err(e) => {
                self.source = PriceSource::Local;
                warn!(error = %e, "day-ahead price fetch failed, using local weighted price");
            }
        }
    }

    /// Toggle realtime pricing from the presentation layer.
    pub fn set_realtime_enabled(&mut self, enabled: bool) {
        self.use_realtime = enabled;
        if !enabled {
            self.source = PriceSource::Local;
        }
    }
}
