//! Domain types for SMCLab

pub mod candle;
pub mod evidence;
pub mod explanation;
pub mod ids;
pub mod market;
pub mod signal;
pub mod structure;
pub mod timeframe;

pub use candle::{Candle, CandleSeries, SeriesError};
pub use evidence::{FvgResult, PatternKind, PatternResult, VolumeSpike};
pub use explanation::Explanation;
pub use ids::{EngineVersions, IntegrityHash, Symbol};
pub use market::{Direction, MarketBias};
pub use signal::{
    AiValidationResult, ConfluenceSignal, ScoreBreakdown, ScoreMismatch, ScoredSignal, StructuralAnchor,
};
pub use structure::{MarketStructureEvent, OrderBlock, StructureEventKind, SwingKind, SwingPoint};
pub use timeframe::{ParseTimeframeError, Timeframe};
