//! Static model tables: energy sources, component lifecycle profiles and
//! the standard reference mix used for realtime price correction.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use super::types::{Component, EnergySource, Material};

/// Per-source CO₂ intensity and unit price.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EnergySourceSpec {
    pub co2_g_per_kwh: f64,
    pub price_eur_per_kwh: f64,
}

/// Lifecycle profile of one meter component.
///
/// Costs and energies must be ordered reused <= reman <= new; the catalog
/// rejects tables that violate this at startup.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub cost_new_eur: f64,
    pub cost_reman_eur: f64,
    pub cost_reused_eur: f64,
    pub energy_new_kwh: f64,
    pub energy_reman_kwh: f64,
    pub energy_reused_kwh: f64,
    /// Virgin material needed for a brand-new component.
    pub reference_mass_kg: f64,
    pub material: Material,
}

/// Immutable model tables, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Catalog {
    sources: [EnergySourceSpec; EnergySource::COUNT],
    housing: ComponentSpec,
    impeller: ComponentSpec,
    standard_mix: [f64; EnergySource::COUNT],
}

impl Default for Catalog {
    fn default() -> Self {
        let mut sources = [EnergySourceSpec {
            co2_g_per_kwh: 0.0,
            price_eur_per_kwh: 0.0,
        }; EnergySource::COUNT];
        sources[EnergySource::Solar.index()] = EnergySourceSpec {
            co2_g_per_kwh: 50.0,
            price_eur_per_kwh: 0.06,
        };
        sources[EnergySource::Wind.index()] = EnergySourceSpec {
            co2_g_per_kwh: 20.0,
            price_eur_per_kwh: 0.05,
        };
        sources[EnergySource::Fossil.index()] = EnergySourceSpec {
            co2_g_per_kwh: 800.0,
            price_eur_per_kwh: 0.14,
        };
        sources[EnergySource::Rest.index()] = EnergySourceSpec {
            co2_g_per_kwh: 100.0,
            price_eur_per_kwh: 0.11,
        };

        let mut standard_mix = [0.0; EnergySource::COUNT];
        standard_mix[EnergySource::Solar.index()] = 0.13;
        standard_mix[EnergySource::Wind.index()] = 0.31;
        standard_mix[EnergySource::Fossil.index()] = 0.47;
        standard_mix[EnergySource::Rest.index()] = 0.09;

        Self {
            sources,
            housing: ComponentSpec {
                cost_new_eur: 4.00,
                cost_reman_eur: 3.00,
                cost_reused_eur: 2.00,
                energy_new_kwh: 20.0,
                energy_reman_kwh: 16.5,
                energy_reused_kwh: 14.0,
                reference_mass_kg: 0.5,
                material: Material::Brass,
            },
            impeller: ComponentSpec {
                cost_new_eur: 0.20,
                cost_reman_eur: 0.15,
                cost_reused_eur: 0.10,
                energy_new_kwh: 20.0,
                energy_reman_kwh: 16.5,
                energy_reused_kwh: 14.0,
                reference_mass_kg: 0.2,
                material: Material::Plastic,
            },
            standard_mix,
        }
    }
}

impl Catalog {
    /// Build the default catalog, validated.
    pub fn load() -> Result<Self> {
        let catalog = Self::default();
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn source(&self, source: EnergySource) -> &EnergySourceSpec {
        &self.sources[source.index()]
    }

    pub fn component(&self, component: Component) -> &ComponentSpec {
        match component {
            Component::Housing => &self.housing,
            Component::Impeller => &self.impeller,
        }
    }

    /// Normalized fraction of `source` in the standard reference mix.
    pub fn standard_fraction(&self, source: EnergySource) -> f64 {
        self.standard_mix[source.index()]
    }

    /// Mix-weighted cost of the standard reference mix (EUR/kWh).
    pub fn standard_mix_price(&self) -> f64 {
        EnergySource::iter()
            .map(|s| self.source(s).price_eur_per_kwh * self.standard_fraction(s))
            .sum()
    }

    fn validate(&self) -> Result<()> {
        for component in Component::iter() {
            let spec = self.component(component);
            ensure!(
                spec.cost_reused_eur <= spec.cost_reman_eur
                    && spec.cost_reman_eur <= spec.cost_new_eur,
                "{component} cost profile must be ordered reused <= reman <= new"
            );
            ensure!(
                spec.energy_reused_kwh <= spec.energy_reman_kwh
                    && spec.energy_reman_kwh <= spec.energy_new_kwh,
                "{component} energy profile must be ordered reused <= reman <= new"
            );
            ensure!(
                spec.reference_mass_kg > 0.0,
                "{component} reference mass must be positive"
            );
        }
        let mix_sum: f64 = EnergySource::iter().map(|s| self.standard_fraction(s)).sum();
        ensure!(
            (mix_sum - 1.0).abs() < 1e-9,
            "standard reference mix must sum to 1.0, got {mix_sum}"
        );
        Ok(())
    }
}
