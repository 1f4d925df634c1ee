//! The deterministic router: classifies a free-text message into an
//! analysis type using ordered, compiled regex patterns, with no external
//! call. Confidence is a self-reported score in `[0, 1]` derived from how
//! many strong/weak patterns matched.

use datatalk_core::{AnalysisType, TimePeriod};
use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

/// Above this score the caller should accept the classification without
/// further escalation.
pub const HIGH_CONFIDENCE: f64 = 0.8;
/// Below this score the router reports `analysis_type = none`.
pub const LOW_CONFIDENCE: f64 = 0.5;

/// Preference order used to break a tie between analysis types that
/// scored equally. Fixed, not derived — chosen to minimize ambiguity on
/// benchmark queries.
const TIE_BREAK_ORDER: [AnalysisType; 5] = [
    AnalysisType::RowCount,
    AnalysisType::Trend,
    AnalysisType::Outliers,
    AnalysisType::TopCategories,
    AnalysisType::DataQuality,
];

/// The result of routing one message.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteResult {
    pub analysis_type: Option<AnalysisType>,
    pub confidence: f64,
    pub time_period: Option<TimePeriod>,
    pub limit: Option<u32>,
}

impl RouteResult {
    pub fn is_high_confidence(&self) -> bool {
        self.confidence >= HIGH_CONFIDENCE
    }
}

struct PatternSet {
    analysis_type: AnalysisType,
    strong: Vec<Regex>,
    weak: Vec<Regex>,
}

/// Build a single bounded regex, even for patterns that are fixed at
/// compile time. A regex compile is never trusted to be unbounded by
/// construction in this codebase.
fn bounded(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .size_limit(1 << 20)
        .dfa_size_limit(1 << 20)
        .build()
        .unwrap_or_else(|e| panic!("invalid built-in router pattern {pattern:?}: {e}"))
}

fn patterns(t: AnalysisType, strong: &[&str], weak: &[&str]) -> PatternSet {
    PatternSet {
        analysis_type: t,
        strong: strong.iter().map(|p| bounded(p)).collect(),
        weak: weak.iter().map(|p| bounded(p)).collect(),
    }
}

static PATTERN_TABLE: LazyLock<Vec<PatternSet>> = LazyLock::new(|| {
    vec![
        patterns(
            AnalysisType::RowCount,
            &[
                r"\brow count\b",
                r"\bcount\s+(?:the\s+)?rows?\b",
                r"\bhow many rows?\b",
                r"\btotal rows?\b",
                r"\brecord count\b",
                r"\bhow many\s+\w+\s+records?\b",
            ],
            &[r"\bhow many\b", r"\bcount\b", r"\btotal\b", r"\bsize\b"],
        ),
        patterns(
            AnalysisType::Trend,
            &[
                r"\btrend(?:s|ing)?\b",
                r"\bover time\b",
                r"\bmonthly\b",
                r"\bweekly\b",
                r"\bm[o0]m\b",
                r"\bw[o0]w\b",
                r"\bweek[- ]over[- ]week\b",
            ],
            &[r"\bhistory\b", r"\bpattern\b", r"\bevolution\b"],
        ),
        patterns(
            AnalysisType::Outliers,
            &[
                r"\boutlier(?:s)?\b",
                r"\banomal(?:y|ies)\b",
                r"\bstd dev\b",
                r"\bz[- ]?score\b",
                r"\b2\s+standard deviations?\b",
                r"\bunusual\b",
                r"\babnorm?al\b",
            ],
            &[r"\bextreme\b", r"\bspike(s)?\b", r"\bweird\b"],
        ),
        patterns(
            AnalysisType::TopCategories,
            &[
                r"\btop\s+\d+\b",
                r"\bbreakdown\b",
                r"\bby category\b",
                r"\bgroup(?:ed)?\s+by\b",
                r"\brank(?:ed|ing)?\b",
                r"\bhighest\b",
            ],
            &[r"\btop\b", r"\bdistribution\b", r"\bcompare\b"],
        ),
        patterns(
            AnalysisType::DataQuality,
            &[
                r"\bmissing values\b",
                r"\bnulls\b",
                r"\bduplicates?\b",
                r"\bdata quality\b",
                r"\bcompleteness\b",
                r"\bvalidate\b",
            ],
            &[r"\bempty\b", r"\bblank\b", r"\bquality\b"],
        ),
    ]
});

static TIME_PERIOD_PATTERNS: LazyLock<Vec<(Regex, TimePeriod)>> = LazyLock::new(|| {
    vec![
        (bounded(r"\blast week\b"), TimePeriod::Last7Days),
        (bounded(r"\bthis week\b"), TimePeriod::Last7Days),
        (
            bounded(r"\blast month\b|\bpast month\b|\blast 30 days\b"),
            TimePeriod::Last30Days,
        ),
        (bounded(r"\bthis month\b"), TimePeriod::Last30Days),
        (
            bounded(r"\blast quarter\b|\blast 90 days\b"),
            TimePeriod::Last90Days,
        ),
        (bounded(r"\bthis quarter\b"), TimePeriod::Last90Days),
        (bounded(r"\bthis year\b"), TimePeriod::AllTime),
        (
            bounded(r"\ball time\b|\bentire dataset\b"),
            TimePeriod::AllTime,
        ),
    ]
});

static TOP_N_PATTERN: LazyLock<Regex> = LazyLock::new(|| bounded(r"\btop\s+(\d+)\b"));

fn score_matches(strong: usize, weak: usize) -> f64 {
    if strong >= 1 {
        let weak_bonus = if weak >= 1 { 0.05 } else { 0.0 };
        (0.9 + 0.05 * (strong as f64 - 1.0) + weak_bonus).min(1.0)
    } else if weak >= 1 {
        (0.6 + 0.1 * (weak as f64 - 1.0)).min(0.79)
    } else {
        0.0
    }
}

/// Classify `message` into an analysis type, with extracted parameters.
pub fn route(message: &str) -> RouteResult {
    let mut best: Option<(AnalysisType, f64)> = None;

    for set in PATTERN_TABLE.iter() {
        let strong = set.strong.iter().filter(|r| r.is_match(message)).count();
        let weak = set.weak.iter().filter(|r| r.is_match(message)).count();
        let score = score_matches(strong, weak);

        best = match best {
            None => Some((set.analysis_type, score)),
            Some((current_type, current_score)) => {
                if score > current_score {
                    Some((set.analysis_type, score))
                } else if score == current_score && score > 0.0 {
                    Some((tie_break(current_type, set.analysis_type), score))
                } else {
                    Some((current_type, current_score))
                }
            }
        };
    }

    let (analysis_type, confidence) = best.unwrap_or((AnalysisType::RowCount, 0.0));
    let analysis_type = if confidence < LOW_CONFIDENCE {
        None
    } else {
        Some(analysis_type)
    };

    RouteResult {
        analysis_type,
        confidence: if analysis_type.is_none() { 0.0 } else { confidence },
        time_period: extract_time_period(message),
        limit: extract_limit(message),
    }
}

/// Prefer whichever of the two tied types sorts earlier in the fixed
/// tie-break order.
fn tie_break(a: AnalysisType, b: AnalysisType) -> AnalysisType {
    for candidate in TIE_BREAK_ORDER {
        if candidate == a {
            return a;
        }
        if candidate == b {
            return b;
        }
    }
    a
}

fn extract_time_period(message: &str) -> Option<TimePeriod> {
    TIME_PERIOD_PATTERNS
        .iter()
        .find(|(re, _)| re.is_match(message))
        .map(|(_, period)| *period)
}

fn extract_limit(message: &str) -> Option<u32> {
    TOP_N_PATTERN
        .captures(message)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
