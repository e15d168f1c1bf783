use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Electricity generation source in the configurable mix.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum EnergySource {
    Solar,
    Wind,
    Fossil,
    Rest,
}

impl EnergySource {
    pub const COUNT: usize = 4;

    /// Stable index for per-source arrays.
    pub fn index(self) -> usize {
        match self {
            EnergySource::Solar => 0,
            EnergySource::Wind => 1,
            EnergySource::Fossil => 2,
            EnergySource::Rest => 3,
        }
    }

    /// True for the sources the ramp controller animates.
    pub fn is_renewable(self) -> bool {
        matches!(self, EnergySource::Solar | EnergySource::Wind)
    }
}

/// Meter component handled by the reuse/remanufacture/recycle model.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Component {
    Housing,
    Impeller,
}

/// Raw material a component is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Material {
    Brass,
    Plastic,
}

/// Clamp a user-supplied percentage into [0, 100].
///
/// Range errors are handled here at the input boundary; the engine never
/// sees out-of-range fractions.
pub fn clamp_pct(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}
