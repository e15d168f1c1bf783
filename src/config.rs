use anyhow::Result;
use figment::{providers::{Env, Format, Toml}, Figment};
use serde::Deserialize;
use std::net::SocketAddr;

use crate::controller::ramp::RampTimings;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub controller: ControllerConfig,
    pub prices: PricesConfig,
    pub hardware: HardwareConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
    pub request_timeout_secs: u64,
}
impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ControllerConfig {
    pub tick_ms: u64,
    pub solar_ramp_up_secs: f64,
    pub solar_ramp_down_secs: f64,
    pub wind_ramp_secs: f64,
    pub ramp_tolerance_pct: f64,
    pub event_queue_size: usize,
}

impl ControllerConfig {
    pub fn ramp_timings(&self) -> RampTimings {
        RampTimings {
            solar_up_secs: self.solar_ramp_up_secs,
            solar_down_secs: self.solar_ramp_down_secs,
            wind_secs: self.wind_ramp_secs,
            tolerance_pct: self.ramp_tolerance_pct,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PricesConfig {
    pub base_url: String,
    /// ENTSO-E security token; an empty token disables the feed.
    pub security_token: String,
    /// EIC code of the bidding zone (default: Germany-Luxembourg).
    pub area_eic: String,
    pub refresh_secs: u64,
    pub http_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HardwareConfig {
    /// Line-oriented device node; None falls back to simulated sensors
    /// when the `sim` feature is enabled.
    pub device: Option<String>,
    /// Seed for the simulated sensors (None = entropy).
    pub sim_seed: Option<u64>,
    /// Seconds between simulated sensor reports.
    pub sim_period_secs: u64,
}

impl Config {
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("CMC__").split("__"));
        Ok(figment.extract()?)
    }
}
