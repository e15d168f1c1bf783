pub mod metrics;
pub mod mix;
pub mod price;

pub use metrics::{MetricsEngine, MetricsResult, ReuseRecycleInput};
pub use mix::{MixFractions, MixState};
pub use price::{PriceSource, PriceState};
