// Library root: re-exports all modules so integration tests and the binary
// can access the crate's public API.

pub mod config;
pub mod error;
pub mod metrics;
pub mod player;
pub mod provision;
pub mod queries;
pub mod range;
pub mod store;

pub use error::{ProvisionError, StatsError, StoreError};
pub use metrics::{MetricEngine, Statistic, DEFAULT_PRECISION};
pub use player::Player;
pub use range::DateRange;
