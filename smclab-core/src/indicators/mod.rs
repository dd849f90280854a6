//! Indicator helpers shared by the engines.

pub mod atr;
pub mod volume;

pub use atr::{average_true_range, true_range};
pub use volume::trailing_mean_volume;
