// Memorai Engine: Memory Type Classifier
//
// Keyword heuristics that map free text onto a `MemoryType` when the
// caller did not supply one. Deterministic and model-free, so the same
// text always lands in the same category:
//   "Remind me to renew the cert"   → task
//   "How to rotate the API key: …"  → procedure
//   "I prefer dark roast coffee"    → preference
// Anything without a clear signal is a `note`.

use crate::atoms::constants::STOP_WORDS;
use crate::atoms::types::{MemoryType, TextClassification};
use std::collections::HashMap;

const MAX_TAGS: usize = 5;
const MIN_SIGNAL: f32 = 0.3;
const FALLBACK_CONFIDENCE: f32 = 0.5;

fn starts_with_any(text: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|p| text.starts_with(p))
}

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}

/// Classify `text` into a memory category with a confidence in [0.5, 0.95].
pub fn classify(text: &str) -> TextClassification {
    let t = text.trim().to_lowercase();
    let mut scores: HashMap<MemoryType, f32> = HashMap::new();
    let mut add = |kind: MemoryType, weight: f32| *scores.entry(kind).or_insert(0.0) += weight;

    // ── Task ────────────────────────────────────────────────────────────
    if starts_with_any(&t, &["todo", "to do", "remind me", "don't forget", "remember to"]) {
        add(MemoryType::Task, 0.7);
    }
    if contains_any(&t, &["need to ", "have to ", "deadline", "due ", "by tomorrow", "by friday", "follow up"]) {
        add(MemoryType::Task, 0.4);
    }

    // ── Procedure ───────────────────────────────────────────────────────
    if starts_with_any(&t, &["how to ", "steps to ", "to install", "to configure", "step 1"]) {
        add(MemoryType::Procedure, 0.7);
    }
    if contains_any(&t, &["first,", "then ", "finally", "run `", "install", "configure", "step "]) {
        add(MemoryType::Procedure, 0.3);
    }

    // ── Preference ──────────────────────────────────────────────────────
    if contains_any(&t, &["i prefer", "i'd rather", "i like", "i love", "i hate", "i dislike"]) {
        add(MemoryType::Preference, 0.7);
    }
    if contains_any(&t, &["favorite", "favourite", "prefers", "likes ", "dislikes "]) {
        add(MemoryType::Preference, 0.4);
    }

    // ── Emotion ─────────────────────────────────────────────────────────
    if contains_any(&t, &["i feel", "i'm feeling", "i am feeling", "felt "]) {
        add(MemoryType::Emotion, 0.6);
    }
    if contains_any(&t, &[
        "happy", "sad", "angry", "frustrated", "excited", "anxious", "worried", "upset", "grateful",
    ]) {
        add(MemoryType::Emotion, 0.3);
    }

    // ── Personality ─────────────────────────────────────────────────────
    if contains_any(&t, &["personality", "introvert", "extrovert", "i tend to", "tends to", "by nature"]) {
        add(MemoryType::Personality, 0.6);
    }

    // ── Conversation / thread ───────────────────────────────────────────
    if contains_any(&t, &["we discussed", "we talked", "told me", "asked me", "said that", "in our chat"]) {
        add(MemoryType::Conversation, 0.6);
    }
    if starts_with_any(&t, &["re:", "reply:", "thread:"]) || contains_any(&t, &["in the thread", "follow-up to"]) {
        add(MemoryType::Thread, 0.6);
    }

    // ── Document ────────────────────────────────────────────────────────
    if contains_any(&t, &["http://", "https://", ".pdf", "chapter ", "section ", "the document", "the report"]) {
        add(MemoryType::Document, 0.5);
    }

    // ── Fact ────────────────────────────────────────────────────────────
    if contains_any(&t, &[" is the ", " was born", "capital of", " consists of", " is located", " equals "]) {
        add(MemoryType::Fact, 0.5);
    }
    if t.chars().any(|c| c.is_ascii_digit()) && contains_any(&t, &[" is ", " are ", " was "]) {
        add(MemoryType::Fact, 0.2);
    }

    // Highest score wins; ties break on the fixed category order.
    let best = MemoryType::ALL
        .iter()
        .filter_map(|k| scores.get(k).map(|s| (*k, *s)))
        .fold(None, |acc: Option<(MemoryType, f32)>, (k, s)| match acc {
            Some((_, best)) if best >= s => acc,
            _ => Some((k, s)),
        });

    let (category, confidence) = match best {
        Some((kind, score)) if score >= MIN_SIGNAL => (kind, (0.5 + score * 0.5).min(0.95)),
        _ => (MemoryType::Note, FALLBACK_CONFIDENCE),
    };

    TextClassification {
        category: category.as_str().to_string(),
        confidence,
        tags: extract_tags(&t),
    }
}

/// Most frequent content words, ties broken alphabetically.
fn extract_tags(lower: &str) -> Vec<String> {
    let mut freq: HashMap<String, usize> = HashMap::new();
    for word in lower.split(|c: char| !c.is_alphanumeric() && c != '-') {
        let word = word.trim_matches('-');
        if word.len() > 3 && !STOP_WORDS.contains(&word) && !word.chars().all(|c| c.is_ascii_digit()) {
            *freq.entry(word.to_string()).or_insert(0) += 1;
        }
    }
    let mut ranked: Vec<(String, usize)> = freq.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(MAX_TAGS).map(|(w, _)| w).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task() {
        let c = classify("Remind me to renew the TLS certificate by Friday");
        assert_eq!(c.category, "task");
        assert!(c.confidence > 0.5);
    }

    #[test]
    fn test_procedure() {
        assert_eq!(classify("How to rotate the key: first, revoke it, then issue a new one").category, "procedure");
    }

    #[test]
    fn test_preference_and_emotion() {
        assert_eq!(classify("I prefer dark roast coffee in the morning").category, "preference");
        assert_eq!(classify("I feel really frustrated with the build system").category, "emotion");
    }

    #[test]
    fn test_fallback_is_note() {
        let c = classify("blue green yellow");
        assert_eq!(c.category, "note");
        assert_eq!(c.confidence, 0.5);
    }

    #[test]
    fn test_confidence_bounded() {
        let c = classify("todo: need to finish, deadline due by tomorrow, follow up");
        assert!(c.confidence <= 0.95);
    }

    #[test]
    fn test_tags_skip_stop_words_and_short_tokens() {
        let tags = classify("Kubernetes deploys the kubernetes cluster with helm").tags;
        assert_eq!(tags[0], "kubernetes");
        assert!(!tags.iter().any(|t| t == "the" || t == "with"));
        assert!(tags.len() <= MAX_TAGS);
    }
}
