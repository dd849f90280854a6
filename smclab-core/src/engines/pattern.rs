//! Multi-candle chart patterns.
//!
//! Each rule looks at a fixed-size window and either matches or not; no state
//! is carried between windows.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::{Candle, CandleSeries, Direction, Explanation, PatternKind, PatternResult};
use crate::engines::gap::body_ratio;

pub const VERSION: &str = "1.0.0";
pub const NAME: &str = "pattern";

/// Body/range at or above which a candle counts as a long body.
const LONG_BODY_RATIO: f64 = 0.5;
/// A star body must be at most this fraction of the first candle's body.
const STAR_BODY_FACTOR: Decimal = dec!(0.3);

/// A fixed-window pattern matcher.
pub trait PatternRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn kind(&self) -> PatternKind;
    /// Number of candles the rule inspects.
    fn window(&self) -> usize;
    /// `window` must be exactly `self.window()` candles long.
    fn evaluate(&self, window: &[Candle]) -> Option<PatternResult>;
}

pub struct PatternEngine {
    rules: Vec<Box<dyn PatternRule>>,
}

impl Default for PatternEngine {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl std::fmt::Debug for PatternEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternEngine")
            .field("rules", &self.rules.iter().map(|r| r.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl PatternEngine {
    pub fn new(rules: Vec<Box<dyn PatternRule>>) -> Self {
        Self { rules }
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// All matches, ordered by end timestamp then rule order.
    pub fn analyze(&self, series: &CandleSeries) -> Vec<PatternResult> {
        let candles = series.candles();
        let mut results = Vec::new();
        for end in 1..=candles.len() {
            for rule in &self.rules {
                let size = rule.window();
                if size == 0 || end < size {
                    continue;
                }
                if let Some(result) = rule.evaluate(&candles[end - size..end]) {
                    results.push(result);
                }
            }
        }
        results
    }
}

pub fn default_rules() -> Vec<Box<dyn PatternRule>> {
    vec![
        Box::new(ThreeSoldiers::new(Direction::Bullish)),
        Box::new(ThreeSoldiers::new(Direction::Bearish)),
        Box::new(Star::new(Direction::Bullish)),
        Box::new(Star::new(Direction::Bearish)),
        Box::new(Engulfing::new(Direction::Bullish)),
        Box::new(Engulfing::new(Direction::Bearish)),
        Box::new(RisingFallingThree::new(Direction::Bullish)),
        Box::new(RisingFallingThree::new(Direction::Bearish)),
    ]
}

// ── Helpers ──────────────────────────────────────────────────────────

fn is_with(candle: &Candle, direction: Direction) -> bool {
    match direction {
        Direction::Bullish => candle.is_bullish(),
        Direction::Bearish => candle.is_bearish(),
    }
}

fn body_low(c: &Candle) -> Decimal {
    c.open.min(c.close)
}

fn body_high(c: &Candle) -> Decimal {
    c.open.max(c.close)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn matched(
    rule: &dyn PatternRule,
    direction: Direction,
    window: &[Candle],
    strength: f64,
    conditions: &[&str],
) -> Option<PatternResult> {
    let (first, last) = (window.first()?, window.last()?);
    let strength = strength.clamp(0.0, 1.0);
    let mut explanation = Explanation::new(
        "Chart Pattern",
        format!("A '{}' {} pattern was identified.", rule.name(), direction),
    )
    .with_detail("Pattern Name", rule.name())
    .with_detail("Strength Score", format!("{strength:.2}"));
    for (i, condition) in conditions.iter().enumerate() {
        explanation = explanation.with_detail(format!("Rule {}", i + 1), format!("Verified: {condition}"));
    }

    Some(PatternResult {
        name: rule.name().to_string(),
        kind: rule.kind(),
        direction,
        strength,
        start_timestamp: first.timestamp,
        end_timestamp: last.timestamp,
        explanation,
    })
}

// ── Three White Soldiers / Three Black Crows ─────────────────────────

/// Three consecutive candles in one direction, each opening inside the
/// previous body and closing further along.
#[derive(Debug, Clone, Copy)]
pub struct ThreeSoldiers {
    direction: Direction,
}

impl ThreeSoldiers {
    pub fn new(direction: Direction) -> Self {
        Self { direction }
    }
}

impl PatternRule for ThreeSoldiers {
    fn name(&self) -> &'static str {
        match self.direction {
            Direction::Bullish => "Three White Soldiers",
            Direction::Bearish => "Three Black Crows",
        }
    }

    fn kind(&self) -> PatternKind {
        PatternKind::Reversal
    }

    fn window(&self) -> usize {
        3
    }

    fn evaluate(&self, window: &[Candle]) -> Option<PatternResult> {
        if window.len() != 3 || !window.iter().all(|c| is_with(c, self.direction)) {
            return None;
        }
        for pair in window.windows(2) {
            let (prev, cur) = (&pair[0], &pair[1]);
            let opens_inside = cur.open >= body_low(prev) && cur.open <= body_high(prev);
            let progresses = match self.direction {
                Direction::Bullish => cur.close > prev.close,
                Direction::Bearish => cur.close < prev.close,
            };
            if !opens_inside || !progresses {
                return None;
            }
        }

        let strength = mean(&window.iter().map(body_ratio).collect::<Vec<_>>());
        matched(
            self,
            self.direction,
            window,
            strength,
            &[
                "Three consecutive candles in the same direction.",
                "Each candle opened within the previous body.",
                "Each candle closed progressively further.",
            ],
        )
    }
}

// ── Morning Star / Evening Star ──────────────────────────────────────

/// Long candle against the new direction, a small star, then a candle that
/// closes beyond the first candle's body midpoint.
#[derive(Debug, Clone, Copy)]
pub struct Star {
    direction: Direction,
}

impl Star {
    pub fn new(direction: Direction) -> Self {
        Self { direction }
    }
}

impl PatternRule for Star {
    fn name(&self) -> &'static str {
        match self.direction {
            Direction::Bullish => "Morning Star",
            Direction::Bearish => "Evening Star",
        }
    }

    fn kind(&self) -> PatternKind {
        PatternKind::Reversal
    }

    fn window(&self) -> usize {
        3
    }

    fn evaluate(&self, window: &[Candle]) -> Option<PatternResult> {
        let [first, star, third] = window else {
            return None;
        };
        if !is_with(first, self.direction.opposite()) || !is_with(third, self.direction) {
            return None;
        }
        if body_ratio(first) < LONG_BODY_RATIO {
            return None;
        }
        if star.body() > first.body() * STAR_BODY_FACTOR {
            return None;
        }
        let recovers = match self.direction {
            Direction::Bullish => third.close > first.midpoint(),
            Direction::Bearish => third.close < first.midpoint(),
        };
        if !recovers {
            return None;
        }

        let strength = mean(&[body_ratio(first), body_ratio(third)]);
        matched(
            self,
            self.direction,
            window,
            strength,
            &[
                "First candle has a long body against the new direction.",
                "Middle candle body is small relative to the first.",
                "Third candle closed beyond the first candle's midpoint.",
            ],
        )
    }
}

// ── Engulfing ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct Engulfing {
    direction: Direction,
}

impl Engulfing {
    pub fn new(direction: Direction) -> Self {
        Self { direction }
    }
}

impl PatternRule for Engulfing {
    fn name(&self) -> &'static str {
        match self.direction {
            Direction::Bullish => "Bullish Engulfing",
            Direction::Bearish => "Bearish Engulfing",
        }
    }

    fn kind(&self) -> PatternKind {
        PatternKind::Reversal
    }

    fn window(&self) -> usize {
        2
    }

    fn evaluate(&self, window: &[Candle]) -> Option<PatternResult> {
        let [prev, cur] = window else {
            return None;
        };
        if !is_with(prev, self.direction.opposite()) || !is_with(cur, self.direction) {
            return None;
        }
        let engulfs = body_low(cur) <= body_low(prev)
            && body_high(cur) >= body_high(prev)
            && cur.body() > prev.body();
        if !engulfs {
            return None;
        }

        matched(
            self,
            self.direction,
            window,
            body_ratio(cur),
            &[
                "Previous candle moved against the new direction.",
                "Current body fully engulfs the previous body.",
            ],
        )
    }
}

// ── Rising Three / Falling Three ─────────────────────────────────────

/// Long trend candle, three small candles held inside its range, then a
/// candle closing beyond the first.
#[derive(Debug, Clone, Copy)]
pub struct RisingFallingThree {
    direction: Direction,
}

impl RisingFallingThree {
    pub fn new(direction: Direction) -> Self {
        Self { direction }
    }
}

impl PatternRule for RisingFallingThree {
    fn name(&self) -> &'static str {
        match self.direction {
            Direction::Bullish => "Rising Three Methods",
            Direction::Bearish => "Falling Three Methods",
        }
    }

    fn kind(&self) -> PatternKind {
        PatternKind::Continuation
    }

    fn window(&self) -> usize {
        5
    }

    fn evaluate(&self, window: &[Candle]) -> Option<PatternResult> {
        let [first, inner @ .., last] = window else {
            return None;
        };
        if inner.len() != 3 {
            return None;
        }
        if !is_with(first, self.direction) || !is_with(last, self.direction) {
            return None;
        }
        if body_ratio(first) < LONG_BODY_RATIO {
            return None;
        }
        let contained = inner
            .iter()
            .all(|c| c.high <= first.high && c.low >= first.low && c.body() < first.body());
        if !contained {
            return None;
        }
        let breaks_out = match self.direction {
            Direction::Bullish => last.close > first.close,
            Direction::Bearish => last.close < first.close,
        };
        if !breaks_out {
            return None;
        }

        let strength = mean(&[body_ratio(first), body_ratio(last)]);
        matched(
            self,
            self.direction,
            window,
            strength,
            &[
                "First candle has a long body in the trend direction.",
                "Three smaller candles stayed within the first candle's range.",
                "Final candle closed beyond the first candle.",
            ],
        )
    }
}
