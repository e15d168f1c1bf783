pub mod api;
pub mod config;
pub mod controller;
pub mod domain;
pub mod engine;
pub mod hardware;
pub mod prices;
pub mod telemetry;

#[cfg(feature = "sim")]
pub mod simulation;
