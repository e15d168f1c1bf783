//! End-to-end scenario tests against the dashboard core: reference
//! figures, ordering properties of the model, and the manual-lock
//! discipline seen through the public surface.

use circular_meter_controller::controller::{DashboardCore, RampTimings};
use circular_meter_controller::domain::{Catalog, EnergySource};
use circular_meter_controller::engine::{
    MetricsEngine, MixFractions, MixState, PriceSource, PriceState, ReuseRecycleInput,
};
use circular_meter_controller::hardware::{HardwareEvent, SolarCondition, WindCondition};
use circular_meter_controller::prices::DayAheadPriceFeed;

use mockall::mock;
use proptest::prelude::*;

fn core() -> DashboardCore {
    DashboardCore::new(Catalog::load().unwrap(), RampTimings::default(), 64)
}

mock! {
    PriceFeed {}

    #[async_trait::async_trait]
    impl DayAheadPriceFeed for PriceFeed {
        async fn fetch_day_ahead_average(&self) -> anyhow::Result<f64>;
    }
}

#[test]
fn worst_case_scenario_matches_reference_figures() {
    let snapshot = core().snapshot();
    let baseline = snapshot.baseline;
    assert!((baseline.energy_kwh - 20.0).abs() < 1e-9);
    assert!((baseline.co2_kg - 16.0).abs() < 1e-9);
    assert!((baseline.brass_kg - 0.5).abs() < 1e-9);
    assert!((baseline.plastic_kg - 0.2).abs() < 1e-9);
    assert!((baseline.component_cost_eur - 4.20).abs() < 1e-9);
    assert!((baseline.total_cost_eur - 7.0).abs() < 1e-9);
}

#[test]
fn full_circularity_scenario() {
    let core = core();
    let snapshot = core.set_inputs(ReuseRecycleInput::clamped(
        100.0, 0.0, 0.0, 0.0, 0.0,
    ));
    assert!((snapshot.current.energy_kwh - 14.0).abs() < 1e-9);
    assert_eq!(snapshot.current.brass_kg, 0.0);
    assert_eq!(snapshot.current.plastic_kg, 0.0);
    assert!((snapshot.current.component_cost_eur - 2.10).abs() < 1e-9);
    // The baseline never moves with the scenario dials.
    assert!((snapshot.baseline.energy_kwh - 20.0).abs() < 1e-9);
}

#[test]
fn greening_the_mix_lowers_co2_not_mass() {
    let core = core();
    let dirty = core.snapshot().current;
    let green = core.slider_change(EnergySource::Solar, 90.0).current;
    assert!(green.co2_kg < dirty.co2_kg);
    assert_eq!(green.brass_kg, dirty.brass_kg);
    assert_eq!(green.plastic_kg, dirty.plastic_kg);
}

#[tokio::test]
async fn failed_feed_degrades_to_local_price() {
    let mut feed = MockPriceFeed::new();
    feed.expect_fetch_day_ahead_average()
        .times(1)
        .returning(|| Ok(0.095));
    let core = core();
    core.set_realtime_enabled(true);

    let snapshot = core.apply_price_fetch(feed.fetch_day_ahead_average().await);
    assert_eq!(snapshot.price.source, PriceSource::RealtimeAverage);
    let with_realtime = snapshot.current.energy_cost_eur;

    let mut broken = MockPriceFeed::new();
    broken
        .expect_fetch_day_ahead_average()
        .times(1)
        .returning(|| Err(anyhow::anyhow!("503 from upstream")));
    let snapshot = core.apply_price_fetch(broken.fetch_day_ahead_average().await);
    assert_eq!(snapshot.price.source, PriceSource::Local);
    // The stale price is retained but no longer applied: the effective
    // price is back to the mix-weighted local table.
    assert_eq!(snapshot.price.realtime_price_eur_per_kwh, 0.095);
    assert_ne!(snapshot.current.energy_cost_eur, with_realtime);
    let catalog = Catalog::load().unwrap();
    assert!((snapshot.avg_price_eur_per_kwh - catalog.standard_mix_price()).abs() < 1e-9);
}

#[test]
fn hardware_ramp_reaches_full_scale_through_the_core() {
    let core = core();
    let tx = core.events_sender();
    let mut rx = core.take_events_receiver().unwrap();
    tx.try_send(HardwareEvent::Solar(SolarCondition::Bright))
        .unwrap();
    tx.try_send(HardwareEvent::Wind(WindCondition::Spinning))
        .unwrap();
    // 10 s full scale; 250 ticks of 50 ms are more than enough.
    for _ in 0..250 {
        core.tick(&mut rx, 0.05);
    }
    let mix = core.snapshot().mix;
    assert!(mix.solar_pct > 99.0);
    assert!(mix.wind_pct > 99.0);
}

proptest! {
    /// Normalized fractions are non-negative and sum to 1 for any slider
    /// values, including the all-zero fallback.
    #[test]
    fn normalize_is_a_distribution(
        solar in 0.0f64..=100.0,
        wind in 0.0f64..=100.0,
        fossil in 0.0f64..=100.0,
        rest in 0.0f64..=100.0,
    ) {
        let catalog = Catalog::load().unwrap();
        let mut mix = MixState::from_standard_mix(&catalog);
        mix.set_raw_pct(EnergySource::Solar, solar);
        mix.set_raw_pct(EnergySource::Wind, wind);
        mix.set_raw_pct(EnergySource::Fossil, fossil);
        mix.set_raw_pct(EnergySource::Rest, rest);
        let fractions = mix.normalize();
        let mut sum = 0.0;
        for source in [EnergySource::Solar, EnergySource::Wind, EnergySource::Fossil, EnergySource::Rest] {
            prop_assert!(fractions.fraction(source) >= 0.0);
            sum += fractions.fraction(source);
        }
        prop_assert!((sum - 1.0).abs() < 1e-9);
    }

    /// Any sequence of slider edits keeps the raw sum at or below 100.
    #[test]
    fn slider_edits_never_exceed_100(
        edits in proptest::collection::vec((0usize..4, 0.0f64..=150.0), 1..30),
    ) {
        let catalog = Catalog::load().unwrap();
        let sources = [EnergySource::Solar, EnergySource::Wind, EnergySource::Fossil, EnergySource::Rest];
        let mut mix = MixState::from_standard_mix(&catalog);
        for (idx, value) in edits {
            mix.apply_slider_change(sources[idx], value);
            prop_assert!(mix.raw_sum() <= 100.0 + 1e-9);
        }
    }

    /// The worst-case reference dominates every scenario on energy and CO₂.
    #[test]
    fn baseline_dominates(
        reuse in 0.0f64..=100.0,
        housing_reman in 0.0f64..=100.0,
        impeller_reman in 0.0f64..=100.0,
        housing_recycle in 0.0f64..=100.0,
        impeller_recycle in 0.0f64..=100.0,
        solar in 0.0f64..=100.0,
        wind in 0.0f64..=100.0,
    ) {
        let engine = MetricsEngine::new(Catalog::load().unwrap());
        let price = PriceState::default();
        let input = ReuseRecycleInput::clamped(
            reuse, housing_reman, impeller_reman, housing_recycle, impeller_recycle,
        );
        let mut mix = MixState::from_standard_mix(engine.catalog());
        mix.apply_slider_change(EnergySource::Solar, solar);
        mix.apply_slider_change(EnergySource::Wind, wind);
        let current = engine.compute(&input, &mix.normalize(), &price);
        let baseline = engine.baseline(&price);
        prop_assert!(baseline.energy_kwh >= current.energy_kwh - 1e-9);
        prop_assert!(baseline.co2_kg >= current.co2_kg - 1e-9);
        prop_assert!(current.brass_kg >= 0.0 && current.plastic_kg >= 0.0);
    }

    /// Raising the fossil slider with the others held fixed never lowers
    /// the mix CO₂ intensity.
    #[test]
    fn avg_co2_monotone_in_fossil(
        solar in 0.0f64..=100.0,
        wind in 0.0f64..=100.0,
        rest in 0.0f64..=100.0,
        fossil_lo in 0.0f64..=100.0,
        fossil_hi in 0.0f64..=100.0,
    ) {
        prop_assume!(solar + wind + rest > 0.0);
        let (fossil_lo, fossil_hi) = if fossil_lo <= fossil_hi {
            (fossil_lo, fossil_hi)
        } else {
            (fossil_hi, fossil_lo)
        };
        let catalog = Catalog::load().unwrap();
        let co2_at = |fossil: f64| {
            let mut mix = MixState::from_standard_mix(&catalog);
            mix.set_raw_pct(EnergySource::Solar, solar);
            mix.set_raw_pct(EnergySource::Wind, wind);
            mix.set_raw_pct(EnergySource::Rest, rest);
            mix.set_raw_pct(EnergySource::Fossil, fossil);
            mix.normalize().avg_co2_kg_per_kwh(&catalog)
        };
        prop_assert!(co2_at(fossil_hi) >= co2_at(fossil_lo) - 1e-12);
    }

    /// Pure fossil is at least as CO₂-intense as any other mix.
    #[test]
    fn fossil_only_is_the_co2_ceiling(
        solar in 0.0f64..=100.0,
        wind in 0.0f64..=100.0,
        fossil in 0.0f64..=100.0,
        rest in 0.0f64..=100.0,
    ) {
        let catalog = Catalog::load().unwrap();
        let mut mix = MixState::from_standard_mix(&catalog);
        mix.set_raw_pct(EnergySource::Solar, solar);
        mix.set_raw_pct(EnergySource::Wind, wind);
        mix.set_raw_pct(EnergySource::Fossil, fossil);
        mix.set_raw_pct(EnergySource::Rest, rest);
        let ceiling = MixFractions::fossil_only().avg_co2_kg_per_kwh(&catalog);
        prop_assert!(mix.normalize().avg_co2_kg_per_kwh(&catalog) <= ceiling + 1e-12);
    }
}
