//! Energy mix state: raw slider percentages, normalization with the
//! worst-case fossil fallback, and the mix-weighted CO₂/price lookups.

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::domain::{clamp_pct, Catalog, EnergySource};

use super::price::PriceState;

/// Normalized share per source, always summing to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MixFractions([f64; EnergySource::COUNT]);

impl MixFractions {
    /// The worst-case reference mix: everything fossil.
    pub fn fossil_only() -> Self {
        let mut fractions = [0.0; EnergySource::COUNT];
        fractions[EnergySource::Fossil.index()] = 1.0;
        Self(fractions)
    }

    pub fn fraction(&self, source: EnergySource) -> f64 {
        self.0[source.index()]
    }

    /// Average CO₂ intensity of the mix in kg/kWh.
    pub fn avg_co2_kg_per_kwh(&self, catalog: &Catalog) -> f64 {
        EnergySource::iter()
            .map(|s| catalog.source(s).co2_g_per_kwh * self.fraction(s))
            .sum::<f64>()
            / 1000.0
    }

    /// Average electricity price of the mix in EUR/kWh.
    ///
    /// With an active realtime price the reading is corrected by the
    /// difference between this mix and the standard reference mix, because
    /// the market price was sampled under the reference mix. This is the
    /// model's defined behavior, not a plain blend.
    pub fn avg_price_eur_per_kwh(&self, catalog: &Catalog, price: &PriceState) -> f64 {
        let custom: f64 = EnergySource::iter()
            .map(|s| catalog.source(s).price_eur_per_kwh * self.fraction(s))
            .sum();
        if price.realtime_active() {
            price.realtime_price_eur_per_kwh + (custom - catalog.standard_mix_price())
        } else {
            custom
        }
    }
}

/// Raw slider percentages for the four sources.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MixState {
    raw: [f64; EnergySource::COUNT],
}

impl MixState {
    /// Seed the sliders from the catalog's standard reference mix.
    pub fn from_standard_mix(catalog: &Catalog) -> Self {
        let mut raw = [0.0; EnergySource::COUNT];
        for source in EnergySource::iter() {
            raw[source.index()] = (catalog.standard_fraction(source) * 100.0).round();
        }
        Self { raw }
    }

    pub fn raw_pct(&self, source: EnergySource) -> f64 {
        self.raw[source.index()]
    }

    pub fn raw_sum(&self) -> f64 {
        self.raw.iter().sum()
    }

    /// Direct write used by the ramp controller's own tick. No
    /// redistribution; normalization absorbs any resulting excess.
    pub fn set_raw_pct(&mut self, source: EnergySource, value: f64) {
        self.raw[source.index()] = clamp_pct(value);
    }

    /// Apply a single user slider edit.
    ///
    /// If the four raw values would exceed 100, the other three shrink
    /// proportionally to their share of their own sum; when they are all
    /// zero the edited slider clamps to 100. The sum never ends above 100.
    pub fn apply_slider_change(&mut self, changed: EnergySource, new_value: f64) {
        self.raw[changed.index()] = clamp_pct(new_value);
        let total = self.raw_sum();
        if total <= 100.0 {
            return;
        }

        let other_sum: f64 = EnergySource::iter()
            .filter(|s| *s != changed)
            .map(|s| self.raw[s.index()])
            .sum();
        if other_sum == 0.0 {
            self.raw[changed.index()] = 100.0;
            return;
        }

        let excess = total - 100.0;
        for source in EnergySource::iter() {
            if source == changed {
                continue;
            }
            let share = self.raw[source.index()] / other_sum;
            self.raw[source.index()] = (self.raw[source.index()] - excess * share).max(0.0);
        }
    }

    /// Normalize the raw percentages into fractions summing to 1. A
    /// zero-sum mix falls back to 100% fossil rather than dividing by zero.
    pub fn normalize(&self) -> MixFractions {
        let total = self.raw_sum();
        if total == 0.0 {
            return MixFractions::fossil_only();
        }
        let mut fractions = [0.0; EnergySource::COUNT];
        for source in EnergySource::iter() {
            fractions[source.index()] = self.raw[source.index()] / total;
        }
        MixFractions(fractions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::load().unwrap()
    }

    fn mix(solar: f64, wind: f64, fossil: f64, rest: f64) -> MixState {
        let mut state = MixState::from_standard_mix(&catalog());
        state.set_raw_pct(EnergySource::Solar, solar);
        state.set_raw_pct(EnergySource::Wind, wind);
        state.set_raw_pct(EnergySource::Fossil, fossil);
        state.set_raw_pct(EnergySource::Rest, rest);
        state
    }

    #[test]
    fn standard_seed_sums_to_100() {
        let state = MixState::from_standard_mix(&catalog());
        assert_eq!(state.raw_sum(), 100.0);
        assert_eq!(state.raw_pct(EnergySource::Wind), 31.0);
    }

    #[test]
    fn normalize_sums_to_one() {
        let fractions = mix(20.0, 30.0, 40.0, 30.0).normalize();
        let sum: f64 = [
            EnergySource::Solar,
            EnergySource::Wind,
            EnergySource::Fossil,
            EnergySource::Rest,
        ]
        .iter()
        .map(|s| fractions.fraction(*s))
        .sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn zero_sum_falls_back_to_fossil() {
        let fractions = mix(0.0, 0.0, 0.0, 0.0).normalize();
        assert_eq!(fractions.fraction(EnergySource::Fossil), 1.0);
        assert_eq!(fractions.fraction(EnergySource::Solar), 0.0);
    }

    #[test]
    fn avg_co2_fossil_only() {
        let fractions = MixFractions::fossil_only();
        assert!((fractions.avg_co2_kg_per_kwh(&catalog()) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn avg_price_local_weighting() {
        let fractions = mix(50.0, 50.0, 0.0, 0.0).normalize();
        let price = PriceState::default();
        assert!((fractions.avg_price_eur_per_kwh(&catalog(), &price) - 0.055).abs() < 1e-12);
    }

    #[test]
    fn avg_price_realtime_correction() {
        let catalog = catalog();
        let fractions = MixFractions::fossil_only();
        let mut price = PriceState::default();
        price.use_realtime = true;
        price.apply_fetch(Ok(0.10));
        let expected = 0.10 + (0.14 - catalog.standard_mix_price());
        assert!(
            (fractions.avg_price_eur_per_kwh(&catalog, &price) - expected).abs() < 1e-12
        );
    }

    #[test]
    fn realtime_price_ignored_when_disabled() {
        let catalog = catalog();
        let fractions = MixFractions::fossil_only();
        let mut price = PriceState::default();
        price.apply_fetch(Ok(0.02));
        price.set_realtime_enabled(false);
        assert!((fractions.avg_price_eur_per_kwh(&catalog, &price) - 0.14).abs() < 1e-12);
    }

    #[test]
    fn slider_edit_redistributes_proportionally() {
        let mut state = mix(40.0, 40.0, 20.0, 0.0);
        state.apply_slider_change(EnergySource::Solar, 70.0);
        // Excess of 30 split 40:20 between wind and fossil.
        assert!((state.raw_pct(EnergySource::Wind) - 20.0).abs() < 1e-9);
        assert!((state.raw_pct(EnergySource::Fossil) - 10.0).abs() < 1e-9);
        assert!((state.raw_sum() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn slider_edit_with_zero_others_clamps_to_100() {
        let mut state = mix(0.0, 0.0, 0.0, 0.0);
        state.apply_slider_change(EnergySource::Wind, 130.0);
        assert_eq!(state.raw_pct(EnergySource::Wind), 100.0);
        assert_eq!(state.raw_sum(), 100.0);
    }

    #[test]
    fn slider_edit_below_100_leaves_others_alone() {
        let mut state = mix(10.0, 20.0, 30.0, 5.0);
        state.apply_slider_change(EnergySource::Rest, 15.0);
        assert_eq!(state.raw_pct(EnergySource::Solar), 10.0);
        assert_eq!(state.raw_pct(EnergySource::Fossil), 30.0);
        assert_eq!(state.raw_pct(EnergySource::Rest), 15.0);
    }
}
