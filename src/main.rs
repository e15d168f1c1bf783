use anyhow::Result;
use axum::Router;
use circular_meter_controller::{api, config, controller, domain, prices, telemetry};
use config::Config;
use domain::Catalog;
use prices::{DayAheadPriceFeed, EntsoePriceFeed};
use std::sync::Arc;
use std::time::Duration;
use telemetry::init_tracing;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cfg = Config::load()?;
    let catalog = Catalog::load()?;

    let app_state = controller::AppState::new(cfg.clone(), catalog);

    let app: Router = api::router(app_state.clone(), &cfg);

    let addr = cfg.server.socket_addr()?;

    if cfg.server.host == "0.0.0.0" {
        warn!(
            "WARNING: Server binding to 0.0.0.0 - service will be accessible from network! \
            For production, bind to 127.0.0.1 unless behind a firewall/reverse proxy."
        );
    }

    let price_feed: Option<Arc<dyn DayAheadPriceFeed>> = if cfg.prices.security_token.is_empty() {
        warn!("no ENTSO-E security token configured, realtime prices disabled");
        None
    } else {
        Some(Arc::new(EntsoePriceFeed::new(&cfg.prices)?))
    };

    let cancel = CancellationToken::new();
    controller::spawn_controller_tasks(&app_state, price_feed, cancel.clone());
    spawn_hardware_task(&app_state, cancel.clone());

    info!(%addr, "starting circular meter controller");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await?;

    cancel.cancel();
    warn!("shutdown complete");
    Ok(())
}

/// Feed the controller's event queue, either from a real line-oriented
/// device or from the simulated sensors.
fn spawn_hardware_task(
    state: &controller::AppState,
    cancel: CancellationToken,
) {
    let events = state.core.events_sender();
    match state.cfg.hardware.device.clone() {
        Some(device) => {
            tokio::spawn(async move {
                circular_meter_controller::hardware::run_device_reader(device, events, cancel)
                    .await;
            });
        }
        None => {
            #[cfg(feature = "sim")]
            {
                let period = Duration::from_secs(state.cfg.hardware.sim_period_secs.max(1));
                let seed = state.cfg.hardware.sim_seed;
                tokio::spawn(async move {
                    circular_meter_controller::simulation::run_simulated_sensors(
                        events, cancel, period, seed,
                    )
                    .await;
                });
            }
            #[cfg(not(feature = "sim"))]
            {
                let _ = (events, cancel);
                warn!("no hardware device configured and simulation disabled, mix sliders are manual only");
            }
        }
    }
}
