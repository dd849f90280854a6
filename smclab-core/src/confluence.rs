//! Multi-timeframe confluence: entry-timeframe evidence that agrees with the
//! structural-timeframe bias becomes one directional signal.

use crate::domain::{
    ConfluenceSignal, Direction, EngineVersions, Explanation, FvgResult, IntegrityHash,
    PatternResult, StructuralAnchor, Timeframe, VolumeSpike,
};
use crate::engines::{gap, pattern, regime, structure, volume, MarketRegime, StructureAnalysis};
use crate::integrity;

pub const VERSION: &str = "1.0.0";
pub const NAME: &str = "confluence";

/// Everything the merger reads for one symbol and one scan cycle.
#[derive(Debug, Clone, Copy)]
pub struct ConfluenceInput<'a> {
    pub symbol: &'a str,
    pub timeframe: Timeframe,
    pub entry: &'a StructureAnalysis,
    pub higher: &'a StructureAnalysis,
    pub patterns: &'a [PatternResult],
    pub gaps: &'a [FvgResult],
    /// `None` when the volume engine is disabled.
    pub volume: Option<&'a [VolumeSpike]>,
    /// `None` when the regime filter is disabled.
    pub regime: Option<MarketRegime>,
    pub integrity_hash: &'a IntegrityHash,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConfluenceMerger;

impl ConfluenceMerger {
    pub fn new() -> Self {
        Self
    }

    /// At most one signal: entry bias must equal the higher-timeframe bias
    /// and must not be ranging.
    pub fn merge(&self, input: &ConfluenceInput<'_>) -> Option<ConfluenceSignal> {
        if input.entry.bias != input.higher.bias {
            return None;
        }
        let direction = input.higher.bias.direction()?;
        if let Some(regime) = input.regime {
            if !regime.permits(direction) {
                return None;
            }
        }

        let anchor = select_anchor(input.entry, direction)?;
        let anchor_ts = anchor.timestamp();

        let pattern = input
            .patterns
            .iter()
            .filter(|p| p.direction == direction && p.end_timestamp >= anchor_ts)
            .max_by_key(|p| p.end_timestamp)
            .cloned();

        let gap = input
            .gaps
            .iter()
            .filter(|g| g.direction == direction && g.start_timestamp >= anchor_ts)
            .max_by_key(|g| g.start_timestamp)
            .cloned();

        let volume = input.volume.and_then(|spikes| {
            spikes
                .iter()
                .filter(|s| s.timestamp >= anchor_ts)
                .max_by_key(|s| s.timestamp)
                .copied()
        });

        let engine_versions = engine_versions(input);

        let mut explanation = vec![summary(
            input,
            &anchor,
            pattern.is_some(),
            gap.is_some(),
            volume.is_some(),
        )];
        explanation.push(input.higher.explanation.clone());
        if let Some(p) = &pattern {
            explanation.push(p.explanation.clone());
        }
        if let Some(g) = &gap {
            explanation.push(g.explanation.clone());
        }

        Some(ConfluenceSignal {
            symbol: input.symbol.to_string(),
            timeframe: input.timeframe,
            higher_timeframe_bias: input.higher.bias,
            anchor,
            pattern,
            gap,
            volume,
            engine_versions,
            integrity_hash: input.integrity_hash.clone(),
            explanation,
        })
    }
}

/// Latest unmitigated order block in `direction`, else the latest order
/// block in `direction`, else the latest structure event in `direction`.
fn select_anchor(entry: &StructureAnalysis, direction: Direction) -> Option<StructuralAnchor> {
    let aligned = || entry.order_blocks.iter().filter(|ob| ob.direction == direction);

    aligned()
        .filter(|ob| !ob.mitigated)
        .max_by_key(|ob| ob.timestamp)
        .or_else(|| aligned().max_by_key(|ob| ob.timestamp))
        .map(|ob| StructuralAnchor::OrderBlock(*ob))
        .or_else(|| {
            entry
                .events
                .iter()
                .filter(|ev| ev.direction == direction)
                .max_by_key(|ev| ev.timestamp)
                .map(|ev| StructuralAnchor::Event(*ev))
        })
}

fn engine_versions(input: &ConfluenceInput<'_>) -> EngineVersions {
    let mut versions = EngineVersions::new();
    versions.insert(integrity::NAME.to_string(), integrity::VERSION.to_string());
    versions.insert(structure::NAME.to_string(), structure::VERSION.to_string());
    versions.insert(gap::NAME.to_string(), gap::VERSION.to_string());
    versions.insert(pattern::NAME.to_string(), pattern::VERSION.to_string());
    if input.volume.is_some() {
        versions.insert(volume::NAME.to_string(), volume::VERSION.to_string());
    }
    if input.regime.is_some() {
        versions.insert(regime::NAME.to_string(), regime::VERSION.to_string());
    }
    versions.insert(NAME.to_string(), VERSION.to_string());
    versions
}

fn summary(
    input: &ConfluenceInput<'_>,
    anchor: &StructuralAnchor,
    has_pattern: bool,
    has_gap: bool,
    has_volume: bool,
) -> Explanation {
    let anchor_label = match anchor {
        StructuralAnchor::OrderBlock(_) => "order block",
        StructuralAnchor::Event(_) => "structure event",
    };
    Explanation::new(
        "Confluence",
        format!(
            "{} structure agrees with the higher timeframe on a {} bias, anchored on an {}.",
            input.timeframe, input.higher.bias, anchor_label
        ),
    )
    .with_detail("Anchor Timestamp", anchor.timestamp())
    .with_detail("Pattern Evidence", has_pattern)
    .with_detail("Gap Evidence", has_gap)
    .with_detail("Volume Evidence", has_volume)
}
