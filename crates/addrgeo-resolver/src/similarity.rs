//! Address text similarity.
//!
//! Two signals are fused into a 0–100 score:
//!
//! - **token overlap**: jieba word segmentation, then a length-weighted
//!   best-match of every token of `a` against the tokens of `b`, tolerant of
//!   partial character overlap (typos, homophones);
//! - **structural overlap**: position-wise comparison of the digit/letter
//!   sequences embedded in building-number keywords (`8号院`, `5号楼`, `D区`),
//!   forward and reversed.

use std::sync::LazyLock;

use addrgeo_core::SimilarityWeights;
use jieba_rs::Jieba;
use regex::Regex;

static JIEBA: LazyLock<Jieba> = LazyLock::new(Jieba::new);

static STRUCTURAL_KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"[A-Z]\d+|\d+号|\d+号楼|\d+号院|\d+单元|\d+室|[A-Z]座|[A-Z]区|[A-Z]馆",
        r"|\d+号|[一二三四五六七八九十]+号楼|[一二三四五六七八九十]+单元",
    ))
    .expect("valid regex")
});

static DIGIT_ALPHA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+|[A-Z]").expect("valid regex"));

/// Element-wise sequence matches below this ratio do not count.
const SEQUENCE_ACCEPT_RATIO: f64 = 0.7;

/// Fuses token and structural overlap with fixed weights.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimilarityScorer {
    weights: SimilarityWeights,
}

impl SimilarityScorer {
    #[must_use]
    pub fn new(weights: SimilarityWeights) -> Self {
        Self { weights }
    }

    #[must_use]
    pub fn weights(&self) -> SimilarityWeights {
        self.weights
    }

    /// Similarity of two address-like strings, in `[0, 100]`.
    #[must_use]
    pub fn score(&self, a: &str, b: &str) -> f64 {
        let token = 100.0 * token_overlap(a, b);
        let structural = core_keyword_overlap_ratio(a, b);
        let fused = self.weights.token * token + self.weights.structural * structural;

        tracing::debug!(a, b, token, structural, fused, "similarity");

        fused.clamp(0.0, 100.0)
    }
}

/// Ratcliff/Obershelp ratio `2·M / (|a| + |b|)` over characters.
///
/// `M` is the total size of the matching blocks found by recursively taking
/// the longest common substring (earliest in `a`, then earliest in `b`) and
/// recursing on both sides. Two empty strings are identical (1.0).
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matched = matching_chars(&a, &b);
    2.0 * matched as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, k) = longest_match(a, b, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            queue.push((i + k, ahi, j + k, bhi));
        }
    }
    matched
}

/// Longest common run of `a[alo..ahi]` and `b[blo..bhi]`.
///
/// Ties resolve to the run starting earliest in `a`, then earliest in `b`.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0);
    // cur[j + 1]: length of the common run ending at (i, j)
    let mut prev = vec![0usize; b.len() + 1];
    let mut cur = vec![0usize; b.len() + 1];
    for i in alo..ahi {
        for j in blo..bhi {
            cur[j + 1] = if a[i] == b[j] { prev[j] + 1 } else { 0 };
            let k = cur[j + 1];
            if k > best_k {
                best_i = i + 1 - k;
                best_j = j + 1 - k;
                best_k = k;
            }
        }
        std::mem::swap(&mut prev, &mut cur);
        cur.iter_mut().for_each(|v| *v = 0);
    }
    (best_i, best_j, best_k)
}

/// Semantic word units of at least two characters.
#[must_use]
pub fn keyword_tokens(text: &str) -> Vec<String> {
    JIEBA
        .cut(text, true)
        .into_iter()
        .map(str::trim)
        .filter(|w| w.chars().count() >= 2)
        .map(str::to_string)
        .collect()
}

/// Length-weighted best-match token overlap in `[0, 1]`, rounded to 4 decimals.
///
/// Both sides without tokens → 1.0; one side without tokens → 0.0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn token_overlap(a: &str, b: &str) -> f64 {
    let tokens_a = keyword_tokens(a);
    let tokens_b = keyword_tokens(b);

    match (tokens_a.is_empty(), tokens_b.is_empty()) {
        (true, true) => return 1.0,
        (true, false) | (false, true) => return 0.0,
        (false, false) => {}
    }

    let total_a: usize = tokens_a.iter().map(|w| w.chars().count()).sum();
    let total_b: usize = tokens_b.iter().map(|w| w.chars().count()).sum();

    let matched: f64 = tokens_a
        .iter()
        .map(|word_a| {
            let best = tokens_b
                .iter()
                .map(|word_b| sequence_ratio(word_a, word_b))
                .fold(0.0_f64, f64::max);
            word_a.chars().count() as f64 * best
        })
        .sum();

    round_to(matched / total_a.max(total_b) as f64, 4)
}

/// Structural keywords (`8号`, `D区`, `3单元`, …) in order of appearance.
#[must_use]
pub fn structural_keywords(text: &str) -> Vec<&str> {
    STRUCTURAL_KEYWORD_RE
        .find_iter(text)
        .map(|m| m.as_str())
        .collect()
}

/// Digit runs and capital letters embedded in the structural keywords.
fn digit_alpha_sequence(keywords: &[&str]) -> Vec<String> {
    keywords
        .iter()
        .flat_map(|kw| {
            let upper = kw.to_uppercase();
            DIGIT_ALPHA_RE
                .find_iter(&upper)
                .map(|m| m.as_str().to_string())
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Position-wise sequence agreement in `[0, 100]`, rounded to 2 decimals.
#[allow(clippy::cast_precision_loss)]
fn match_sequence_score(seq_a: &[String], seq_b: &[String]) -> f64 {
    if seq_a.is_empty() || seq_b.is_empty() {
        return 0.0;
    }
    let max_len = seq_a.len().max(seq_b.len());
    let matched: f64 = seq_a
        .iter()
        .zip(seq_b)
        .map(|(x, y)| sequence_ratio(x, y))
        .filter(|&sim| sim >= SEQUENCE_ACCEPT_RATIO)
        .fold(0.0, |acc, sim| acc + sim);
    round_to(100.0 * matched / max_len as f64, 2)
}

/// Structural (building/unit number) overlap of two addresses in `[0, 100]`.
///
/// Compared forward and reversed; the better alignment wins.
#[must_use]
pub fn core_keyword_overlap_ratio(a: &str, b: &str) -> f64 {
    let seq_a = digit_alpha_sequence(&structural_keywords(a));
    let seq_b = digit_alpha_sequence(&structural_keywords(b));
    if seq_a.is_empty() || seq_b.is_empty() {
        return 0.0;
    }

    let forward = match_sequence_score(&seq_a, &seq_b);
    let rev_a: Vec<String> = seq_a.iter().rev().cloned().collect();
    let rev_b: Vec<String> = seq_b.iter().rev().cloned().collect();
    let backward = match_sequence_score(&rev_a, &rev_b);
    forward.max(backward)
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_ratio_matches_reference_values() {
        assert!((sequence_ratio("abcd", "bcde") - 0.75).abs() < 1e-12);
        assert!((sequence_ratio("集士港", "集仕港") - 2.0 * 2.0 / 6.0).abs() < 1e-12);
        assert!((sequence_ratio("8", "8") - 1.0).abs() < 1e-12);
        assert!((sequence_ratio("", "") - 1.0).abs() < 1e-12);
        assert!(sequence_ratio("abc", "").abs() < 1e-12);
        assert!(sequence_ratio("12", "34").abs() < 1e-12);
    }

    #[test]
    fn longest_match_prefers_earliest_block() {
        let a: Vec<char> = "abxab".chars().collect();
        let b: Vec<char> = "ab".chars().collect();
        assert_eq!(longest_match(&a, &b, 0, a.len(), 0, b.len()), (0, 0, 2));
    }

    #[test]
    fn structural_overlap_tolerates_extra_prefix() {
        let score = core_keyword_overlap_ratio("朝阳区北苑小街8号院5号楼D区", "北苑小街8号5号楼D区");
        assert!((score - 100.0).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn structural_keywords_use_leftmost_first_alternation() {
        assert_eq!(
            structural_keywords("北苑小街8号院5号楼D区3单元"),
            ["8号", "5号", "D区", "3单元"]
        );
    }

    #[test]
    fn structural_overlap_tolerates_reversed_alignment() {
        // Extra leading number on one side: forward alignment fails, reversed succeeds.
        let score = core_keyword_overlap_ratio("2号5号楼D区", "5号楼D区");
        assert!((score - 66.67).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn structural_overlap_without_keywords_is_zero() {
        assert!(core_keyword_overlap_ratio("北苑家园", "北苑小街8号").abs() < 1e-12);
        assert!(core_keyword_overlap_ratio("", "").abs() < 1e-12);
    }

    #[test]
    fn structural_overlap_rejects_dissimilar_numbers() {
        assert!(core_keyword_overlap_ratio("12号楼", "34号楼").abs() < 1e-12);
    }

    #[test]
    fn structural_overlap_without_aligned_numbers_is_positive_zero() {
        let ratio = core_keyword_overlap_ratio("12号楼3单元", "3单元12号楼");
        assert_eq!(ratio, 0.0);
        assert!(ratio.is_sign_positive());
        assert_eq!(serde_json::json!(ratio).to_string(), "0.0");
    }

    #[test]
    fn token_overlap_empty_sides() {
        assert!((token_overlap("", "") - 1.0).abs() < 1e-12);
        assert!(token_overlap("北苑家园", "").abs() < 1e-12);
        assert!(token_overlap("", "北苑家园").abs() < 1e-12);
    }

    #[test]
    fn token_overlap_is_one_for_identical_text() {
        let text = "海曙区集士港镇三江购物";
        assert!((token_overlap(text, text) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn token_overlap_rewards_partial_matches() {
        let score = token_overlap("海曙区集士港镇三江购物", "三江购物(集仕港杰迈广场店)");
        assert!(score > 0.0 && score < 1.0, "got {score}");
    }

    #[test]
    fn score_is_100_for_identical_text() {
        let scorer = SimilarityScorer::default();
        let score = scorer.score("北京市朝阳区北苑小街", "北京市朝阳区北苑小街");
        assert!((score - 100.0).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn score_stays_in_bounds() {
        let scorer = SimilarityScorer::new(SimilarityWeights {
            token: 0.7,
            structural: 0.3,
        });
        let pairs = [
            ("", ""),
            ("", "北苑小街8号"),
            ("BBS-x-dsaf", "北京市朝阳区"),
            ("朝阳区北苑小街8号院5号楼D区", "北苑小街8号5号楼D区"),
            ("A1座", "A1座"),
        ];
        for (a, b) in pairs {
            let s = scorer.score(a, b);
            assert!((0.0..=100.0).contains(&s), "score({a:?}, {b:?}) = {s}");
        }
    }

    #[test]
    fn weighted_score_blends_both_signals() {
        let scorer = SimilarityScorer::new(SimilarityWeights {
            token: 0.7,
            structural: 0.3,
        });
        let a = "北苑小街8号5号楼D区";
        let score = scorer.score(a, a);
        assert!((score - 100.0).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn score_is_deterministic() {
        let scorer = SimilarityScorer::default();
        let a = scorer.score("北京市海淀区六道口西北角的羊肉汤馆", "六道口羊肉汤馆");
        let b = scorer.score("北京市海淀区六道口西北角的羊肉汤馆", "六道口羊肉汤馆");
        assert!((a - b).abs() < f64::EPSILON);
    }
}
