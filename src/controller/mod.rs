pub mod ramp;

use anyhow::Result;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::domain::{Catalog, EnergySource};
use crate::engine::{
    MetricsEngine, MetricsResult, MixState, PriceState, ReuseRecycleInput,
};
use crate::hardware::HardwareEvent;
use crate::prices::DayAheadPriceFeed;

pub use ramp::{RampController, RampTimings};

/// Records the user can pin for side-by-side comparison.
const MAX_RECORDS: usize = 3;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Config,
    pub core: Arc<DashboardCore>,
}

impl AppState {
    pub fn new(cfg: Config, catalog: Catalog) -> Self {
        let core = Arc::new(DashboardCore::new(
            catalog,
            cfg.controller.ramp_timings(),
            cfg.controller.event_queue_size,
        ));
        Self { cfg, core }
    }
}

/// Raw slider readout per source, in percent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MixReadout {
    pub solar_pct: f64,
    pub wind_pct: f64,
    pub fossil_pct: f64,
    pub rest_pct: f64,
}

impl MixReadout {
    fn from_state(mix: &MixState) -> Self {
        Self {
            solar_pct: mix.raw_pct(EnergySource::Solar),
            wind_pct: mix.raw_pct(EnergySource::Wind),
            fossil_pct: mix.raw_pct(EnergySource::Fossil),
            rest_pct: mix.raw_pct(EnergySource::Rest),
        }
    }
}

/// One published view of the whole dashboard. Immutable once built;
/// consumers get it through the watch channel or the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub input: ReuseRecycleInput,
    pub mix: MixReadout,
    pub price: PriceState,
    pub avg_price_eur_per_kwh: f64,
    pub avg_co2_kg_per_kwh: f64,
    pub current: MetricsResult,
    pub baseline: MetricsResult,
}

/// A pinned scenario for comparison against the live view.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioRecord {
    pub id: Uuid,
    pub label: String,
    pub saved_at: DateTime<Utc>,
    pub input: ReuseRecycleInput,
    pub mix: MixReadout,
    pub metrics: MetricsResult,
}

/// Everything the tick loop and the API mutate, behind one writer lock.
/// The ramp controller lives here so slider edits and tick writes are
/// ordered against each other.
struct CoreState {
    input: ReuseRecycleInput,
    mix: MixState,
    price: PriceState,
    ramp: RampController,
}

pub struct DashboardCore {
    engine: MetricsEngine,
    state: RwLock<CoreState>,
    snapshot_tx: watch::Sender<Snapshot>,
    records: RwLock<Vec<ScenarioRecord>>,
    record_counter: Mutex<u64>,
    events_tx: mpsc::Sender<HardwareEvent>,
    events_rx: Mutex<Option<mpsc::Receiver<HardwareEvent>>>,
}

impl DashboardCore {
    pub fn new(catalog: Catalog, timings: RampTimings, event_queue_size: usize) -> Self {
        let engine = MetricsEngine::new(catalog);
        let mix = MixState::from_standard_mix(engine.catalog());
        let ramp = RampController::new(
            mix.raw_pct(EnergySource::Solar),
            mix.raw_pct(EnergySource::Wind),
            timings,
        );
        let state = CoreState {
            input: ReuseRecycleInput::default(),
            mix,
            price: PriceState::default(),
            ramp,
        };
        let snapshot = Self::build_snapshot(&engine, &state);
        let (snapshot_tx, _) = watch::channel(snapshot);
        let (events_tx, events_rx) = mpsc::channel(event_queue_size.max(1));
        Self {
            engine,
            state: RwLock::new(state),
            snapshot_tx,
            records: RwLock::new(Vec::new()),
            record_counter: Mutex::new(0),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
        }
    }

    fn build_snapshot(engine: &MetricsEngine, state: &CoreState) -> Snapshot {
        let fractions = state.mix.normalize();
        let current = engine.compute(&state.input, &fractions, &state.price);
        let baseline = engine.baseline(&state.price);
        Snapshot {
            timestamp: Utc::now(),
            input: state.input,
            mix: MixReadout::from_state(&state.mix),
            price: state.price,
            avg_price_eur_per_kwh: fractions
                .avg_price_eur_per_kwh(engine.catalog(), &state.price),
            avg_co2_kg_per_kwh: fractions.avg_co2_kg_per_kwh(engine.catalog()),
            current,
            baseline,
        }
    }

    /// Recompute under the lock and publish the new snapshot.
    fn recompute_and_publish(&self, state: &CoreState) -> Snapshot {
        let snapshot = Self::build_snapshot(&self.engine, state);
        self.snapshot_tx.send_replace(snapshot.clone());
        snapshot
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Sending side of the hardware event queue, for the device reader or
    /// the simulator.
    pub fn events_sender(&self) -> mpsc::Sender<HardwareEvent> {
        self.events_tx.clone()
    }

    /// The receiving side can be taken exactly once, by the tick loop.
    pub fn take_events_receiver(&self) -> Option<mpsc::Receiver<HardwareEvent>> {
        self.events_rx.lock().take()
    }

    /// Replace the reuse/remanufacture/recycle dials in one step.
    pub fn set_inputs(&self, input: ReuseRecycleInput) -> Snapshot {
        let mut state = self.state.write();
        state.input = input;
        self.recompute_and_publish(&state)
    }

    /// A user moved one mix slider. Renewable edits arm the manual lock
    /// before the redistribution runs, so the ramp controller sees the
    /// user's value, not the redistributed one.
    pub fn slider_change(&self, source: EnergySource, value_pct: f64) -> Snapshot {
        let mut state = self.state.write();
        state.ramp.note_slider_edit(source, value_pct);
        state.mix.apply_slider_change(source, value_pct);
        // Redistribution may have moved the renewable sliders too; the
        // ramp channels must track the displayed values, not stale ones.
        let solar_pct = state.mix.raw_pct(EnergySource::Solar);
        let wind_pct = state.mix.raw_pct(EnergySource::Wind);
        state.ramp.sync_slider_values(solar_pct, wind_pct);
        self.recompute_and_publish(&state)
    }

    pub fn set_realtime_enabled(&self, enabled: bool) -> Snapshot {
        let mut state = self.state.write();
        state.price.set_realtime_enabled(enabled);
        self.recompute_and_publish(&state)
    }

    pub fn set_realtime_price(&self, price_eur_per_kwh: f64) -> Snapshot {
        let mut state = self.state.write();
        state.price.apply_fetch(Ok(price_eur_per_kwh));
        self.recompute_and_publish(&state)
    }

    pub fn apply_price_fetch(&self, result: Result<f64>) -> Snapshot {
        let mut state = self.state.write();
        state.price.apply_fetch(result);
        self.recompute_and_publish(&state)
    }

    /// Pin the current scenario. The oldest record rotates out beyond the
    /// capacity of three.
    pub fn save_record(&self) -> ScenarioRecord {
        let snapshot = self.snapshot();
        let label = {
            let mut counter = self.record_counter.lock();
            *counter += 1;
            format!("Record {counter}")
        };
        let record = ScenarioRecord {
            id: Uuid::new_v4(),
            label,
            saved_at: Utc::now(),
            input: snapshot.input,
            mix: snapshot.mix,
            metrics: snapshot.current,
        };
        let mut records = self.records.write();
        if records.len() >= MAX_RECORDS {
            records.remove(0);
        }
        records.push(record.clone());
        record
    }

    pub fn records(&self) -> Vec<ScenarioRecord> {
        self.records.read().clone()
    }

    pub fn clear_records(&self) {
        self.records.write().clear();
        *self.record_counter.lock() = 0;
    }

    /// One controller tick: drain queued hardware events into the state
    /// machine, advance the ramps, and write any moved percentages back
    /// into the mix. Publishes only when something changed.
    pub fn tick(&self, events: &mut mpsc::Receiver<HardwareEvent>, dt_secs: f64) {
        let mut state = self.state.write();
        let mut dirty = false;
        while let Ok(event) = events.try_recv() {
            state.ramp.apply_event(event);
            dirty = true;
        }
        let moved = state.ramp.tick(dt_secs);
        for (source, value_pct) in &moved {
            state.mix.set_raw_pct(*source, *value_pct);
        }
        dirty |= !moved.is_empty();
        if dirty {
            self.recompute_and_publish(&state);
        }
    }
}

pub fn spawn_controller_tasks(
    state: &AppState,
    price_feed: Option<Arc<dyn DayAheadPriceFeed>>,
    cancel: CancellationToken,
) {
    let core = state.core.clone();
    let tick_ms = state.cfg.controller.tick_ms.max(10);
    let tick_cancel = cancel.clone();
    tokio::spawn(async move {
        let mut events = match core.take_events_receiver() {
            Some(rx) => rx,
            None => {
                warn!("event receiver already taken, tick loop not started");
                return;
            }
        };
        let mut interval = tokio::time::interval(Duration::from_millis(tick_ms));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut last = Instant::now();
        info!(tick_ms, "controller tick loop started");
        loop {
            tokio::select! {
                _ = tick_cancel.cancelled() => {
                    info!("controller tick loop stopping");
                    return;
                }
                _ = interval.tick() => {}
            }
            let now = Instant::now();
            let dt_secs = now.duration_since(last).as_secs_f64();
            last = now;
            core.tick(&mut events, dt_secs);
        }
    });

    match price_feed {
        Some(feed) => {
            let core = state.core.clone();
            let refresh = Duration::from_secs(state.cfg.prices.refresh_secs.max(60));
            let price_cancel = cancel;
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(refresh);
                loop {
                    tokio::select! {
                        _ = price_cancel.cancelled() => {
                            info!("price refresh loop stopping");
                            return;
                        }
                        _ = interval.tick() => {}
                    }
                    let result = feed.fetch_day_ahead_average().await;
                    core.apply_price_fetch(result);
                }
            });
        }
        None => info!("no price feed configured, staying on local weighted prices"),
    }
}
