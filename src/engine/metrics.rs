//! The metrics calculation engine: reuse/remanufacture/recycle fractions
//! plus an energy mix become energy, CO₂, material and cost figures.
//!
//! The model, in order of dominance:
//! - whole-unit reuse takes its share of production out of everything else;
//! - remanufacturing splits the remaining share per component;
//! - recycling sources secondary feedstock only for the new-build slice;
//! - secondary content discounts CO₂ linearly, up to 50% at full sourcing.

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::domain::{clamp_pct, Catalog, Component, Material};

use super::mix::MixFractions;
use super::price::PriceState;

/// Scenario fractions in [0, 100], clamped at construction.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ReuseRecycleInput {
    pub meter_reuse_pct: f64,
    pub housing_reman_pct: f64,
    pub impeller_reman_pct: f64,
    pub housing_recycle_pct: f64,
    pub impeller_recycle_pct: f64,
}

impl ReuseRecycleInput {
    pub fn clamped(
        meter_reuse_pct: f64,
        housing_reman_pct: f64,
        impeller_reman_pct: f64,
        housing_recycle_pct: f64,
        impeller_recycle_pct: f64,
    ) -> Self {
        Self {
            meter_reuse_pct: clamp_pct(meter_reuse_pct),
            housing_reman_pct: clamp_pct(housing_reman_pct),
            impeller_reman_pct: clamp_pct(impeller_reman_pct),
            housing_recycle_pct: clamp_pct(housing_recycle_pct),
            impeller_recycle_pct: clamp_pct(impeller_recycle_pct),
        }
    }

    fn reman_fraction(&self, component: Component) -> f64 {
        match component {
            Component::Housing => self.housing_reman_pct / 100.0,
            Component::Impeller => self.impeller_reman_pct / 100.0,
        }
    }

    fn recycle_fraction(&self, component: Component) -> f64 {
        match component {
            Component::Housing => self.housing_recycle_pct / 100.0,
            Component::Impeller => self.impeller_recycle_pct / 100.0,
        }
    }
}

/// One computed scenario. Derived fresh on every recompute, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsResult {
    pub energy_kwh: f64,
    pub energy_cost_eur: f64,
    pub co2_kg: f64,
    pub brass_kg: f64,
    pub plastic_kg: f64,
    pub component_cost_eur: f64,
    pub total_cost_eur: f64,
}

#[derive(Debug, Clone)]
pub struct MetricsEngine {
    catalog: Catalog,
}

impl MetricsEngine {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Compute all metrics for one scenario. Total over clamped inputs;
    /// degenerate states (no new material) resolve to explicit zero shares.
    pub fn compute(
        &self,
        input: &ReuseRecycleInput,
        fractions: &MixFractions,
        price: &PriceState,
    ) -> MetricsResult {
        let q_whole = input.meter_reuse_pct / 100.0;
        let remainder = 1.0 - q_whole;

        let cost_new_total: f64 = Component::iter()
            .map(|c| self.catalog.component(c).cost_new_eur)
            .sum();

        let mut energy_kwh = 0.0;
        let mut component_cost_eur = 0.0;
        let mut brass_kg = 0.0;
        let mut plastic_kg = 0.0;
        let mut material_total_kg = 0.0;
        let mut secondary_total_kg = 0.0;

        for component in Component::iter() {
            let spec = self.catalog.component(component);
            let r_reman = input.reman_fraction(component);
            let r_recycle = input.recycle_fraction(component);

            // Share still requiring genuinely new material and manufacture.
            let q_new = remainder * (1.0 - r_reman);

            // Recycling only applies to the new-build slice; with no new
            // material there is nothing to source.
            let secondary_share = if q_new <= 1e-12 { 0.0 } else { r_recycle };

            let mass_kg = spec.reference_mass_kg * q_new;
            let secondary_kg = mass_kg * secondary_share;
            material_total_kg += mass_kg;
            secondary_total_kg += secondary_kg;
            match spec.material {
                Material::Brass => brass_kg += mass_kg,
                Material::Plastic => plastic_kg += mass_kg,
            }

            // Components weigh into the unit energy by their new-cost share.
            let weight = spec.cost_new_eur / cost_new_total;
            energy_kwh += q_whole * weight * spec.energy_reused_kwh
                + remainder
                    * weight
                    * (r_reman * spec.energy_reman_kwh + (1.0 - r_reman) * spec.energy_new_kwh);

            component_cost_eur += q_whole * spec.cost_reused_eur
                + remainder
                    * (r_reman * spec.cost_reman_eur + (1.0 - r_reman) * spec.cost_new_eur);
        }

        let secondary_share_total = if material_total_kg <= 1e-9 {
            0.0
        } else {
            secondary_total_kg / material_total_kg
        };

        let co2_kg = energy_kwh
            * fractions.avg_co2_kg_per_kwh(&self.catalog)
            * (1.0 - 0.5 * secondary_share_total);
        let energy_cost_eur =
            energy_kwh * fractions.avg_price_eur_per_kwh(&self.catalog, price);

        MetricsResult {
            energy_kwh,
            energy_cost_eur,
            co2_kg,
            brass_kg,
            plastic_kg,
            component_cost_eur,
            total_cost_eur: component_cost_eur + energy_cost_eur,
        }
    }

    /// The worst-case reference the presentation layer compares against:
    /// no reuse, no remanufacturing, no recycling, 100% fossil. The price
    /// state is shared with the current scenario.
    pub fn baseline(&self, price: &PriceState) -> MetricsResult {
        self.compute(
            &ReuseRecycleInput::default(),
            &MixFractions::fossil_only(),
            price,
        )
    }
}
