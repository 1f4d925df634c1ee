//! Conversation context: the closed-set enums and the mutable map the
//! state machine accumulates across turns.

use crate::plan::PlannedQuery;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of analysis types the router and planner understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    RowCount,
    TopCategories,
    Trend,
    Outliers,
    DataQuality,
}

impl AnalysisType {
    pub const ALL: [AnalysisType; 5] = [
        AnalysisType::RowCount,
        AnalysisType::TopCategories,
        AnalysisType::Trend,
        AnalysisType::Outliers,
        AnalysisType::DataQuality,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisType::RowCount => "row_count",
            AnalysisType::TopCategories => "top_categories",
            AnalysisType::Trend => "trend",
            AnalysisType::Outliers => "outliers",
            AnalysisType::DataQuality => "data_quality",
        }
    }

    /// Human-facing label, as shown on a clarification's choice buttons.
    pub fn display_label(&self) -> &'static str {
        match self {
            AnalysisType::RowCount => "Row count",
            AnalysisType::TopCategories => "Top categories",
            AnalysisType::Trend => "Trend",
            AnalysisType::Outliers => "Outliers",
            AnalysisType::DataQuality => "Data quality",
        }
    }

    /// Analysis types that are defined over the whole dataset and so
    /// never require a time period before the readiness predicate is met.
    pub fn is_time_independent(&self) -> bool {
        matches!(self, AnalysisType::RowCount | AnalysisType::DataQuality)
    }

    /// Parse a value from the closed set. Case-sensitive on the internal
    /// snake_case spelling only — display-label mapping is a separate
    /// concern, handled by the intent value mapping table in `datatalk-state`.
    pub fn from_str_strict(s: &str) -> Option<Self> {
        match s {
            "row_count" => Some(AnalysisType::RowCount),
            "top_categories" => Some(AnalysisType::TopCategories),
            "trend" => Some(AnalysisType::Trend),
            "outliers" => Some(AnalysisType::Outliers),
            "data_quality" => Some(AnalysisType::DataQuality),
            _ => None,
        }
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The closed set of time periods. `Unspecified` is a real member of the
/// set (distinct from "absent"), since `row_count`/`data_quality` force
/// `AllTime` over whatever the client sent, including `Unspecified`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimePeriod {
    Last7Days,
    Last30Days,
    Last90Days,
    AllTime,
    Unspecified,
}

impl TimePeriod {
    pub const ALL: [TimePeriod; 4] = [
        TimePeriod::Last7Days,
        TimePeriod::Last30Days,
        TimePeriod::Last90Days,
        TimePeriod::AllTime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimePeriod::Last7Days => "last_7_days",
            TimePeriod::Last30Days => "last_30_days",
            TimePeriod::Last90Days => "last_90_days",
            TimePeriod::AllTime => "all_time",
            TimePeriod::Unspecified => "unspecified",
        }
    }

    pub fn display_label(&self) -> &'static str {
        match self {
            TimePeriod::Last7Days => "Last 7 days",
            TimePeriod::Last30Days => "Last 30 days",
            TimePeriod::Last90Days => "Last 90 days",
            TimePeriod::AllTime => "All time",
            TimePeriod::Unspecified => "Unspecified",
        }
    }

    pub fn from_str_strict(s: &str) -> Option<Self> {
        match s {
            "last_7_days" => Some(TimePeriod::Last7Days),
            "last_30_days" => Some(TimePeriod::Last30Days),
            "last_90_days" => Some(TimePeriod::Last90Days),
            "all_time" => Some(TimePeriod::AllTime),
            "unspecified" => Some(TimePeriod::Unspecified),
            _ => None,
        }
    }
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The per-conversation mutable context the state machine accumulates.
///
/// Fields are additive within a turn: [`Context::merge_analysis_type`] and
/// friends only ever add or overwrite, never remove, matching the
/// monotonicity invariant in the data model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Context {
    pub analysis_type: Option<AnalysisType>,
    pub time_period: Option<TimePeriod>,
    pub metric: Option<String>,
    pub group_by: Option<String>,
    pub date_column: Option<String>,
    #[serde(default)]
    pub last_planned_queries: Vec<PlannedQuery>,
    #[serde(default)]
    pub clarification_asked: bool,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the analysis type, forcing `time_period = AllTime` when the
    /// analysis type is time-independent. This is the single place the
    /// forcing happens; the planner must never re-derive it.
    pub fn set_analysis_type(&mut self, analysis_type: AnalysisType) {
        self.analysis_type = Some(analysis_type);
        if analysis_type.is_time_independent() {
            self.time_period = Some(TimePeriod::AllTime);
        }
    }

    pub fn set_time_period(&mut self, time_period: TimePeriod) {
        // row_count/data_quality always stay pinned to AllTime even if a
        // stale client repeats a time-period intent after the fact.
        if self
            .analysis_type
            .map(|t| t.is_time_independent())
            .unwrap_or(false)
        {
            self.time_period = Some(TimePeriod::AllTime);
        } else {
            self.time_period = Some(time_period);
        }
    }

    /// Enough context exists to generate a plan.
    pub fn is_ready(&self) -> bool {
        match self.analysis_type {
            None => false,
            Some(t) if t.is_time_independent() => true,
            Some(_) => self.time_period.is_some(),
        }
    }
}
