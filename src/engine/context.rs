// Memorai Engine: Context Engine
//
// Ranking, diversity selection, and aggregate views over recalled
// memories. Pure computation: no I/O, no shared state.
//
//   composite score = 0.5·similarity + 0.3·importance + 0.2·e^(−age_days/30)
//
// `composite` ages from `last_accessed_at`; temporal buckets age from
// `created_at`. Every time-dependent operation has an `_at(now)` twin.

use crate::atoms::constants::{
    AGENT_CONTEXT_MAX_MEMORIES, AGENT_CONTEXT_SUMMARY_LENGTH, BUCKET_LAST_HOUR_MINS,
    BUCKET_THIS_MONTH_MINS, BUCKET_THIS_WEEK_MINS, BUCKET_THIS_YEAR_MINS, BUCKET_TODAY_MINS,
    COMPOSITE_IMPORTANCE_WEIGHT, COMPOSITE_RECENCY_WEIGHT, COMPOSITE_SIMILARITY_WEIGHT,
    DIVERSITY_DIVISOR, MAX_THEMES, MIN_THEME_TOKEN_LEN, NO_CONTEXT_SENTINEL, RECENCY_DECAY_DAYS,
    SENTIMENT_NEGATIVE_THRESHOLD, SENTIMENT_POSITIVE_THRESHOLD, STOP_WORDS, SUMMARY_ITEMS_PER_TYPE,
    TRUNCATION_MARKER,
};
use crate::atoms::context_types::{
    AgentContext, EmotionalContext, Sentiment, TemporalBucket, TemporalBucketStats,
    TemporalContext, Theme,
};
use crate::atoms::types::{MemoryResult, MemoryType};
use chrono::{DateTime, Utc};
use log::debug;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

static PUNCTUATION: OnceLock<Option<Regex>> = OnceLock::new();

fn strip_punctuation(text: &str) -> String {
    match PUNCTUATION.get_or_init(|| Regex::new(r"[^\w\s]").ok()) {
        Some(re) => re.replace_all(text, "").into_owned(),
        None => text.chars().filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_').collect(),
    }
}

fn type_heading(t: MemoryType) -> String {
    let s = t.as_str();
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ContextEngine;

impl ContextEngine {
    pub fn new() -> Self {
        ContextEngine
    }

    // ── Summary ────────────────────────────────────────────────────────

    /// Group by type (first-seen order), up to five bullets per type,
    /// truncated to `max_length` characters plus a `...` marker.
    pub fn generate_context_summary(
        &self,
        memories: &[MemoryResult],
        max_length: usize,
        include_score: bool,
        include_timestamp: bool,
    ) -> String {
        if memories.is_empty() {
            return NO_CONTEXT_SENTINEL.to_string();
        }

        let mut order: Vec<MemoryType> = Vec::new();
        let mut groups: HashMap<MemoryType, Vec<&MemoryResult>> = HashMap::new();
        for m in memories {
            let t = m.memory.memory_type;
            if !groups.contains_key(&t) {
                order.push(t);
            }
            groups.entry(t).or_default().push(m);
        }

        let sections: Vec<String> = order
            .iter()
            .map(|t| {
                let items = &groups[t];
                let mut section = format!("{} memories:", type_heading(*t));
                for m in items.iter().take(SUMMARY_ITEMS_PER_TYPE) {
                    section.push_str("\n- ");
                    section.push_str(m.memory.content.trim());
                    if include_score {
                        section.push_str(&format!(" (relevance: {:.0}%)", m.score * 100.0));
                    }
                    if include_timestamp {
                        section.push_str(&format!(" [{}]", m.memory.created_at.format("%Y-%m-%d %H:%M UTC")));
                    }
                }
                section
            })
            .collect();

        let text = sections.join("\n\n");
        if text.chars().count() > max_length {
            let mut cut: String = text.chars().take(max_length).collect();
            cut.push_str(TRUNCATION_MARKER);
            cut
        } else {
            text
        }
    }

    // ── Scoring & selection ────────────────────────────────────────────

    pub fn calculate_composite_score(&self, result: &MemoryResult) -> f64 {
        self.calculate_composite_score_at(result, Utc::now())
    }

    pub fn calculate_composite_score_at(&self, result: &MemoryResult, now: DateTime<Utc>) -> f64 {
        let age_ms = (now - result.memory.last_accessed_at).num_milliseconds().max(0) as f64;
        let age_days = age_ms / 86_400_000.0;
        COMPOSITE_SIMILARITY_WEIGHT * result.score as f64
            + COMPOSITE_IMPORTANCE_WEIGHT * result.memory.importance as f64
            + COMPOSITE_RECENCY_WEIGHT * (-age_days / RECENCY_DECAY_DAYS).exp()
    }

    pub fn filter_contextual_memories(
        &self,
        memories: &[MemoryResult],
        max_memories: usize,
        importance_threshold: f32,
    ) -> Vec<MemoryResult> {
        self.filter_contextual_memories_at(memories, max_memories, importance_threshold, Utc::now())
    }

    /// Threshold, rank by composite, take up to `max(1, max/5)` per type,
    /// then backfill by rank until `max_memories`.
    pub fn filter_contextual_memories_at(
        &self,
        memories: &[MemoryResult],
        max_memories: usize,
        importance_threshold: f32,
        now: DateTime<Utc>,
    ) -> Vec<MemoryResult> {
        if max_memories == 0 {
            return Vec::new();
        }

        let mut ranked: Vec<(f64, &MemoryResult)> = memories
            .iter()
            .filter(|m| m.memory.importance >= importance_threshold)
            .map(|m| (self.calculate_composite_score_at(m, now), m))
            .collect();
        ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let per_type = (max_memories / DIVERSITY_DIVISOR).max(1);
        let mut taken = vec![false; ranked.len()];
        let mut per_type_count: HashMap<MemoryType, usize> = HashMap::new();
        let mut selected = 0;

        for (i, (_, m)) in ranked.iter().enumerate() {
            if selected >= max_memories {
                break;
            }
            let count = per_type_count.entry(m.memory.memory_type).or_insert(0);
            if *count < per_type {
                *count += 1;
                taken[i] = true;
                selected += 1;
            }
        }
        for flag in taken.iter_mut() {
            if selected >= max_memories {
                break;
            }
            if !*flag {
                *flag = true;
                selected += 1;
            }
        }

        let out: Vec<MemoryResult> = ranked
            .into_iter()
            .zip(taken)
            .filter(|(_, keep)| *keep)
            .map(|((_, m), _)| m.clone())
            .collect();
        debug!("[context] Selected {} of {} memories", out.len(), memories.len());
        out
    }

    // ── Aggregates ─────────────────────────────────────────────────────

    /// Top content tokens ranked by `frequency × max importance`.
    pub fn extract_themes(&self, memories: &[MemoryResult]) -> Vec<Theme> {
        let mut stats: HashMap<String, (usize, f32)> = HashMap::new();
        for m in memories {
            let text = strip_punctuation(&m.memory.content.to_lowercase());
            for token in text.split_whitespace() {
                if token.chars().count() < MIN_THEME_TOKEN_LEN || STOP_WORDS.contains(&token) {
                    continue;
                }
                let entry = stats.entry(token.to_string()).or_insert((0, 0.0));
                entry.0 += 1;
                entry.1 = entry.1.max(m.memory.importance);
            }
        }

        let mut themes: Vec<Theme> = stats
            .into_iter()
            .map(|(theme, (frequency, importance))| Theme {
                score: frequency as f32 * importance,
                theme,
                frequency,
                importance,
            })
            .collect();
        themes.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.frequency.cmp(&a.frequency))
                .then_with(|| a.theme.cmp(&b.theme))
        });
        themes.truncate(MAX_THEMES);
        themes
    }

    pub fn analyze_emotional_context(&self, memories: &[MemoryResult]) -> EmotionalContext {
        let weights: Vec<f32> = memories.iter().filter_map(|m| m.memory.emotional_weight).collect();
        let average_weight = if weights.is_empty() {
            0.0
        } else {
            weights.iter().sum::<f32>() / weights.len() as f32
        };
        let classify = |w: f32| {
            if w > SENTIMENT_POSITIVE_THRESHOLD {
                Sentiment::Positive
            } else if w < SENTIMENT_NEGATIVE_THRESHOLD {
                Sentiment::Negative
            } else {
                Sentiment::Neutral
            }
        };

        let mut ctx = EmotionalContext {
            average_weight,
            sentiment: classify(average_weight),
            positive: 0,
            negative: 0,
            neutral: 0,
            unweighted: memories.len() - weights.len(),
        };
        for w in weights {
            match classify(w) {
                Sentiment::Positive => ctx.positive += 1,
                Sentiment::Negative => ctx.negative += 1,
                Sentiment::Neutral => ctx.neutral += 1,
            }
        }
        ctx
    }

    pub fn analyze_temporal_context(&self, memories: &[MemoryResult]) -> TemporalContext {
        self.analyze_temporal_context_at(memories, Utc::now())
    }

    pub fn analyze_temporal_context_at(&self, memories: &[MemoryResult], now: DateTime<Utc>) -> TemporalContext {
        let mut acc: HashMap<TemporalBucket, (usize, f32)> = HashMap::new();
        for m in memories {
            let entry = acc.entry(bucket_for(now, m.memory.created_at)).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += m.memory.importance;
        }
        TemporalContext {
            buckets: TemporalBucket::ALL
                .iter()
                .map(|b| {
                    let (count, total) = acc.get(b).copied().unwrap_or((0, 0.0));
                    TemporalBucketStats {
                        bucket: *b,
                        count,
                        average_importance: if count == 0 { 0.0 } else { total / count as f32 },
                    }
                })
                .collect(),
        }
    }

    // ── Agent context ──────────────────────────────────────────────────

    pub fn generate_agent_context(&self, memories: &[MemoryResult]) -> AgentContext {
        self.generate_agent_context_at(memories, Utc::now())
    }

    pub fn generate_agent_context_at(&self, memories: &[MemoryResult], now: DateTime<Utc>) -> AgentContext {
        let top = self.filter_contextual_memories_at(memories, AGENT_CONTEXT_MAX_MEMORIES, 0.0, now);

        let context = top
            .iter()
            .map(|m| {
                format!(
                    "[{}:{:.0}%] {}",
                    m.memory.memory_type.as_str().to_uppercase(),
                    m.memory.confidence * 100.0,
                    m.memory.content.trim()
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let (weighted, total_weight) = top.iter().fold((0.0f64, 0.0f64), |(sum, w), m| {
            let importance = m.memory.importance as f64;
            (sum + importance * m.score as f64 * m.memory.confidence as f64, w + importance)
        });
        let confidence = if total_weight > 0.0 { (weighted / total_weight) as f32 } else { 0.0 };

        AgentContext {
            context,
            summary: self.generate_context_summary(&top, AGENT_CONTEXT_SUMMARY_LENGTH, false, false),
            confidence,
            memory_count: top.len(),
        }
    }
}

fn bucket_for(now: DateTime<Utc>, created_at: DateTime<Utc>) -> TemporalBucket {
    let mins = (now - created_at).num_minutes();
    if mins < BUCKET_LAST_HOUR_MINS {
        TemporalBucket::LastHour
    } else if mins < BUCKET_TODAY_MINS {
        TemporalBucket::Today
    } else if mins < BUCKET_THIS_WEEK_MINS {
        TemporalBucket::ThisWeek
    } else if mins < BUCKET_THIS_MONTH_MINS {
        TemporalBucket::ThisMonth
    } else if mins < BUCKET_THIS_YEAR_MINS {
        TemporalBucket::ThisYear
    } else {
        TemporalBucket::Older
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::types::Memory;
    use chrono::Duration;
    use std::collections::HashSet;

    fn result(content: &str, t: MemoryType, score: f32, importance: f32) -> MemoryResult {
        MemoryResult {
            memory: Memory::new(content, t, "t").with_importance(importance),
            score,
            relevance_reason: String::new(),
        }
    }

    fn aged(mut r: MemoryResult, now: DateTime<Utc>, age: Duration) -> MemoryResult {
        r.memory.created_at = now - age;
        r.memory.last_accessed_at = now - age;
        r
    }

    #[test]
    fn test_empty_summary_sentinel() {
        assert_eq!(ContextEngine::new().generate_context_summary(&[], 100, true, true), NO_CONTEXT_SENTINEL);
    }

    #[test]
    fn test_summary_groups_and_caps_per_type() {
        let engine = ContextEngine::new();
        let mut memories: Vec<MemoryResult> =
            (0..7).map(|i| result(&format!("fact {i}"), MemoryType::Fact, 0.9, 0.5)).collect();
        memories.push(result("buy milk", MemoryType::Task, 0.8, 0.5));

        let s = engine.generate_context_summary(&memories, 10_000, true, false);
        assert!(s.starts_with("Fact memories:"));
        assert!(s.contains("Task memories:\n- buy milk (relevance: 80%)"));
        assert!(s.contains("fact 4"));
        assert!(!s.contains("fact 5"));
    }

    #[test]
    fn test_summary_truncates_with_marker() {
        let engine = ContextEngine::new();
        let memories = vec![result(&"x".repeat(200), MemoryType::Note, 0.9, 0.5)];
        let s = engine.generate_context_summary(&memories, 50, false, true);
        assert_eq!(s.chars().count(), 50 + TRUNCATION_MARKER.len());
        assert!(s.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn test_composite_strictly_decreasing_in_age() {
        let engine = ContextEngine::new();
        let now = Utc::now();
        let base = result("x", MemoryType::Fact, 0.8, 0.6);
        let mut last = f64::INFINITY;
        for days in [0, 1, 7, 30, 365] {
            let s = engine.calculate_composite_score_at(&aged(base.clone(), now, Duration::days(days)), now);
            assert!(s < last);
            last = s;
        }
        let fresh = engine.calculate_composite_score_at(&aged(base, now, Duration::zero()), now);
        assert!((fresh - (0.5 * 0.8f32 as f64 + 0.3 * 0.6f32 as f64 + 0.2)).abs() < 1e-9);
    }

    #[test]
    fn test_filter_caps_and_keeps_type_diversity() {
        let engine = ContextEngine::new();
        let now = Utc::now();
        let mut memories = Vec::new();
        for i in 0..10 {
            memories.push(result(&format!("fact {i}"), MemoryType::Fact, 0.99, 0.9));
        }
        for t in [MemoryType::Task, MemoryType::Note, MemoryType::Preference, MemoryType::Emotion] {
            memories.push(result(t.as_str(), t, 0.3, 0.2));
        }

        let picked = engine.filter_contextual_memories_at(&memories, 10, 0.0, now);
        assert_eq!(picked.len(), 10);
        let types: HashSet<MemoryType> = picked.iter().map(|m| m.memory.memory_type).collect();
        assert_eq!(types.len(), 5);

        assert!(engine.filter_contextual_memories_at(&memories, 3, 0.0, now).len() <= 3);
        assert!(engine.filter_contextual_memories_at(&memories, 0, 0.0, now).is_empty());
    }

    #[test]
    fn test_filter_importance_threshold() {
        let engine = ContextEngine::new();
        let memories = vec![
            result("keep", MemoryType::Fact, 0.5, 0.8),
            result("drop", MemoryType::Fact, 0.99, 0.1),
        ];
        let picked = engine.filter_contextual_memories(&memories, 10, 0.5);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].memory.content, "keep");
    }

    #[test]
    fn test_extract_themes() {
        let engine = ContextEngine::new();
        let memories = vec![
            result("Rust ownership, borrowing!", MemoryType::Fact, 0.9, 0.9),
            result("Ownership rules in Rust", MemoryType::Fact, 0.9, 0.5),
            result("The cat sat", MemoryType::Note, 0.9, 1.0),
        ];
        let themes = engine.extract_themes(&memories);
        assert_eq!(themes[0].theme, "ownership");
        assert_eq!(themes[0].frequency, 2);
        assert!((themes[0].importance - 0.9).abs() < 1e-6);
        assert_eq!(themes[1].theme, "rust");
        assert!(themes.iter().all(|t| t.theme != "the" && t.theme != "cat" && t.theme != "sat"));
        assert!(themes.len() <= MAX_THEMES);
    }

    #[test]
    fn test_emotional_context() {
        let engine = ContextEngine::new();
        let mut a = result("a", MemoryType::Emotion, 0.5, 0.5);
        a.memory.emotional_weight = Some(0.9);
        let mut b = result("b", MemoryType::Emotion, 0.5, 0.5);
        b.memory.emotional_weight = Some(0.1);
        let c = result("c", MemoryType::Note, 0.5, 0.5);

        let ctx = engine.analyze_emotional_context(&[a, b, c]);
        assert_eq!(ctx.sentiment, Sentiment::Positive);
        assert_eq!((ctx.positive, ctx.neutral, ctx.negative, ctx.unweighted), (1, 1, 0, 1));

        let empty = engine.analyze_emotional_context(&[]);
        assert_eq!(empty.sentiment, Sentiment::Neutral);
        assert_eq!(empty.average_weight, 0.0);
    }

    #[test]
    fn test_temporal_buckets() {
        let engine = ContextEngine::new();
        let now = Utc::now();
        let memories = vec![
            aged(result("a", MemoryType::Note, 0.5, 0.2), now, Duration::minutes(5)),
            aged(result("b", MemoryType::Note, 0.5, 0.6), now, Duration::minutes(30)),
            aged(result("c", MemoryType::Note, 0.5, 0.5), now, Duration::hours(3)),
            aged(result("d", MemoryType::Note, 0.5, 0.5), now, Duration::days(3)),
            aged(result("e", MemoryType::Note, 0.5, 0.5), now, Duration::days(20)),
            aged(result("f", MemoryType::Note, 0.5, 0.5), now, Duration::days(100)),
            aged(result("g", MemoryType::Note, 0.5, 0.5), now, Duration::days(400)),
        ];
        let ctx = engine.analyze_temporal_context_at(&memories, now);
        let last_hour = ctx.get(TemporalBucket::LastHour).unwrap();
        assert_eq!(last_hour.count, 2);
        assert!((last_hour.average_importance - 0.4).abs() < 1e-6);
        for b in [
            TemporalBucket::Today,
            TemporalBucket::ThisWeek,
            TemporalBucket::ThisMonth,
            TemporalBucket::ThisYear,
            TemporalBucket::Older,
        ] {
            assert_eq!(ctx.get(b).unwrap().count, 1, "{}", b.as_str());
        }
    }

    #[test]
    fn test_agent_context() {
        let engine = ContextEngine::new();
        let mut a = result("Paris is the capital of France", MemoryType::Fact, 0.9, 1.0);
        a.memory.confidence = 0.8;
        let b = result("zero weight", MemoryType::Note, 0.5, 0.0);

        let ctx = engine.generate_agent_context(&[a, b]);
        assert!(ctx.context.contains("[FACT:80%] Paris is the capital of France"));
        assert!((ctx.confidence - 0.72).abs() < 1e-4);
        assert_eq!(ctx.memory_count, 2);
        assert!(ctx.summary.contains("Fact memories:"));

        let none = engine.generate_agent_context(&[result("x", MemoryType::Note, 0.9, 0.0)]);
        assert_eq!(none.confidence, 0.0);
        let empty = engine.generate_agent_context(&[]);
        assert_eq!(empty.summary, NO_CONTEXT_SENTINEL);
    }
}
