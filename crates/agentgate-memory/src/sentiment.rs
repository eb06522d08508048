//! Pure, stateless sentiment scoring: text -> scalar in [-1, 1].

const DEFAULT_POSITIVE: &[&str] = &[
    "happy", "great", "good", "wonderful", "excited", "love", "amazing", "excellent", "thank",
    "awesome",
];

const DEFAULT_NEGATIVE: &[&str] = &[
    "sad",
    "bad",
    "terrible",
    "awful",
    "hate",
    "angry",
    "frustrated",
    "disappointed",
    "wrong",
    "fail",
];

/// EWMA smoothing factor: `new = 0.9 * old + 0.1 * sample`.
pub const EWMA_DECAY: f64 = 0.9;

/// Scores text against a closed, fixed lexicon of positive/negative tokens.
///
/// The lexicons are injectable (rather than hardcoded into the scoring
/// function) so tests can substitute fixtures without touching the matching
/// algorithm.
#[derive(Debug, Clone)]
pub struct SentimentScorer {
    positive: Vec<String>,
    negative: Vec<String>,
}

impl Default for SentimentScorer {
    fn default() -> Self {
        Self::new(DEFAULT_POSITIVE, DEFAULT_NEGATIVE)
    }
}

impl SentimentScorer {
    pub fn new(positive: &[&str], negative: &[&str]) -> Self {
        Self {
            positive: positive.iter().map(|s| s.to_lowercase()).collect(),
            negative: negative.iter().map(|s| s.to_lowercase()).collect(),
        }
    }

    /// `clamp(-1, 1, (pos - neg) / 3)` where pos/neg are case-insensitive
    /// substring counts. Whole-word boundaries are intentionally not
    /// required, trading precision for determinism.
    pub fn score(&self, text: &str) -> f64 {
        let lower = text.to_lowercase();
        let pos = count_substring_hits(&lower, &self.positive);
        let neg = count_substring_hits(&lower, &self.negative);
        ((pos as f64 - neg as f64) / 3.0).clamp(-1.0, 1.0)
    }

    /// Fold a new sample into a running EWMA, clamped to [-1, 1].
    pub fn ewma_update(previous: f64, sample: f64) -> f64 {
        (EWMA_DECAY * previous + (1.0 - EWMA_DECAY) * sample).clamp(-1.0, 1.0)
    }
}

fn count_substring_hits(haystack: &str, needles: &[String]) -> usize {
    needles.iter().filter(|n| haystack.contains(n.as_str())).count()
}
