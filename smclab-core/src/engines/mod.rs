//! Analytic engines. Each is a pure function of its candle input and exposes
//! a `VERSION` recorded on every result it contributes to.

pub mod gap;
pub mod pattern;
pub mod regime;
pub mod structure;
pub mod volume;

pub use gap::GapEngine;
pub use pattern::{PatternEngine, PatternRule};
pub use regime::{MarketRegime, RegimeFilterEngine};
pub use structure::{StructureAnalysis, StructureEngine};
pub use volume::VolumeSpikeEngine;
