// ── Memorai Atoms: Context Engine Types ────────────────────────────────────
//
// Aggregates produced by ContextEngine: themes, emotional and temporal
// breakdowns, and the assembled agent context.

use serde::{Deserialize, Serialize};

/// A recurring content token ranked by `frequency × importance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub theme: String,
    pub frequency: usize,
    /// Highest importance among memories mentioning the token.
    pub importance: f32,
    pub score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalContext {
    /// Mean of available emotional weights; 0.0 when none are present.
    pub average_weight: f32,
    pub sentiment: Sentiment,
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
    /// Memories carrying no emotional weight.
    pub unweighted: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporalBucket {
    LastHour,
    Today,
    ThisWeek,
    ThisMonth,
    ThisYear,
    Older,
}

impl TemporalBucket {
    pub const ALL: [TemporalBucket; 6] = [
        TemporalBucket::LastHour,
        TemporalBucket::Today,
        TemporalBucket::ThisWeek,
        TemporalBucket::ThisMonth,
        TemporalBucket::ThisYear,
        TemporalBucket::Older,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemporalBucket::LastHour => "last_hour",
            TemporalBucket::Today => "today",
            TemporalBucket::ThisWeek => "this_week",
            TemporalBucket::ThisMonth => "this_month",
            TemporalBucket::ThisYear => "this_year",
            TemporalBucket::Older => "older",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalBucketStats {
    pub bucket: TemporalBucket,
    pub count: usize,
    /// 0.0 for an empty bucket.
    pub average_importance: f32,
}

/// One entry per bucket, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalContext {
    pub buckets: Vec<TemporalBucketStats>,
}

impl TemporalContext {
    pub fn get(&self, bucket: TemporalBucket) -> Option<&TemporalBucketStats> {
        self.buckets.iter().find(|b| b.bucket == bucket)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentContext {
    /// `[TYPE:confidence%] content` lines, best first.
    pub context: String,
    pub summary: String,
    /// Importance-weighted mean of `score × confidence`.
    pub confidence: f32,
    pub memory_count: usize,
}
