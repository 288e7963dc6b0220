//! The per-candidate scorer.
//!
//! Scoring looks for an optimal assignment of needle bytes to matching
//! haystack bytes. Every needle byte receives a multiplier in `(0, 1]` and the
//! multipliers are combined into a single score in `[0, 1]`: exact substring
//! matches come out at `1.0`, while gaps between matched bytes incur
//! multiplicative penalties. Matches that start a word get cheaper gaps; this
//! covers path components (`a` in `/x/abc`), hyphen/underscore/space/digit
//! boundaries (`a` in `x-a` or `x_a`), dot boundaries, and upper camel-case
//! humps (`A` in `XyzAbc`).
//!
//! The search is a memoized recursion over `(needle index, haystack index)`
//! states, in the family of the classic Levenshtein DP but exploiting that
//! the state space is sparse for realistic queries. The scheme follows Greg
//! Hurrell's command-t matcher, with a right-to-left prefilter that both
//! rejects non-subsequences early and bounds every DP scan.
//!
//! # Example
//!
//! ```
//! use fuzzrank::{score, score_indices, MatchOptions};
//!
//! let options = MatchOptions::default();
//! assert_eq!(score("axbycz", "abx", &options), 0.0);
//! assert!(score("axbycz", "abc", &options) > 0.0);
//!
//! let (_, indices) = score_indices("axbycz", "abc", &options).unwrap();
//! assert_eq!(indices, [0, 2, 4]);
//! ```

use crate::options::MatchOptions;

/// Initial multiplier when a gap is used.
const BASE_DISTANCE_PENALTY: f32 = 0.6;

/// Per-gap decay: `penalty = BASE - (dist - 1) * ADDITIONAL`.
const ADDITIONAL_DISTANCE_PENALTY: f32 = 0.05;

/// The lowest the distance penalty can go. Epsilon guards rounding.
const MIN_DISTANCE_PENALTY: f32 = 0.2 + 1e-9;

/// Bail out to the estimator once the DP state space reaches this size.
const MAX_MEMO_SIZE: usize = 10_000;

/// Memo sentinel; real cell values are always in `[0, 1]`.
const SCORE_UNCOMPUTED: f32 = -1.0;

/// Borrowed views of one (haystack, needle) pair prepared for scoring.
///
/// The `*_case` fields are the effective forms all equality tests run on:
/// the ASCII-lowercased copies in case-insensitive mode, the raw bytes
/// otherwise. The raw fields keep their original case for the boundary
/// lookups and the smart-case comparison.
pub(crate) struct ScorePair<'a> {
    pub haystack: &'a [u8],
    pub haystack_case: &'a [u8],
    pub needle: &'a [u8],
    pub needle_case: &'a [u8],
}

/// Reusable scoring buffers. Workers keep one per thread and reuse it for
/// every candidate of a `find`; buffers grow on demand and are never shrunk
/// mid-scan.
#[derive(Debug, Default)]
pub(crate) struct ScoreScratch {
    last_match: Vec<usize>,
    memo: Vec<f32>,
    best: Vec<usize>,
}

struct MatchContext<'a> {
    haystack: &'a [u8],
    haystack_case: &'a [u8],
    needle: &'a [u8],
    needle_case: &'a [u8],
    smart_case: bool,
    max_gap: usize,
    last_match: &'a [usize],
    memo: &'a mut [f32],
    best_match: Option<&'a mut [usize]>,
}

impl MatchContext<'_> {
    /// Best score for matching the needle suffix starting at `needle_idx`
    /// against the haystack suffix starting at `haystack_idx`.
    fn recursive_match(&mut self, haystack_idx: usize, needle_idx: usize) -> f32 {
        if needle_idx == self.needle.len() {
            return 1.0;
        }

        let haystack_len = self.haystack.len();
        let cell = needle_idx * haystack_len + haystack_idx;
        let memoized = self.memo[cell];
        if memoized != SCORE_UNCOMPUTED {
            return memoized;
        }

        let c = self.needle_case[needle_idx];
        let mut lim = self.last_match[needle_idx];
        if needle_idx > 0 && self.max_gap > 0 {
            lim = lim.min(haystack_idx + self.max_gap);
        }

        let mut score = 0.0_f32;
        let mut best = 0_usize;

        // Only the needle_idx == 0 scan starts at the beginning of the
        // haystack, so last_slash is only accurate on that run.
        let mut last_slash = 0_usize;
        let mut dist_penalty = BASE_DISTANCE_PENALTY;

        for j in haystack_idx..=lim {
            let d = self.haystack_case[j];
            if needle_idx == 0 && (d == b'/' || d == b'\\') {
                last_slash = j;
            }
            if c == d {
                let mut char_score = 1.0_f32;
                if j > haystack_idx {
                    // Boundary lookups run on the raw haystack; case matters.
                    let prev = self.haystack[j - 1];
                    let curr = self.haystack[j];
                    char_score = if prev == b'/' {
                        0.9
                    } else if prev == b'-' || prev == b'_' || prev == b' ' || prev.is_ascii_digit()
                    {
                        0.8
                    } else if prev.is_ascii_lowercase() && curr.is_ascii_uppercase() {
                        0.8
                    } else if prev == b'.' {
                        0.7
                    } else {
                        dist_penalty
                    };
                    // The first needle byte disregards the actual distance.
                    if needle_idx > 0 && dist_penalty > MIN_DISTANCE_PENALTY {
                        dist_penalty -= ADDITIONAL_DISTANCE_PENALTY;
                    }
                }

                if self.smart_case && self.needle[needle_idx] != self.haystack[j] {
                    char_score *= 0.9;
                }

                let mut new_score = char_score * self.recursive_match(j + 1, needle_idx + 1);
                // Scale by how much of the path was actually used, measured
                // in bytes since the last slash.
                if needle_idx == 0 {
                    new_score /= (haystack_len - last_slash) as f32;
                }
                if new_score > score {
                    score = new_score;
                    best = j;
                    // Can't score better than 1.
                    if new_score == 1.0 {
                        break;
                    }
                }
            }
        }

        if let Some(best_match) = self.best_match.as_deref_mut() {
            best_match[cell] = best;
        }
        self.memo[cell] = score;
        score
    }
}

/// Score one prepared pair, reusing `scratch` across calls.
///
/// Returns a score in `[0, 1]`; `0.0` means the needle does not embed in the
/// haystack. When `match_indexes` is given and the score is nonzero, it is
/// filled with one strictly increasing haystack byte index per needle byte.
pub(crate) fn score_candidate(
    pair: &ScorePair<'_>,
    options: &MatchOptions,
    scratch: &mut ScoreScratch,
    match_indexes: Option<&mut Vec<usize>>,
) -> f32 {
    let haystack_len = pair.haystack.len();
    let needle_len = pair.needle.len();

    if needle_len == 0 {
        if let Some(indexes) = match_indexes {
            indexes.clear();
        }
        return 1.0;
    }

    // Check that the needle embeds in the haystack at all. The same
    // right-to-left scan yields the last possible match for each needle byte,
    // which prunes the DP scans by a lot.
    scratch.last_match.clear();
    scratch.last_match.resize(needle_len, 0);
    let mut hindex = haystack_len as isize - 1;
    for i in (0..needle_len).rev() {
        while hindex >= 0 && pair.haystack_case[hindex as usize] != pair.needle_case[i] {
            hindex -= 1;
        }
        if hindex < 0 {
            return 0.0;
        }
        scratch.last_match[i] = hindex as usize;
        hindex -= 1;
    }

    let memo_size = haystack_len * needle_len;
    if memo_size >= MAX_MEMO_SIZE {
        // Estimate from the rightmost embedding alone: charge one gap
        // penalty per break in the run.
        let mut penalty = 1.0_f32;
        for i in 1..needle_len {
            if scratch.last_match[i] != scratch.last_match[i - 1] + 1 {
                penalty *= BASE_DISTANCE_PENALTY;
            }
        }
        if let Some(indexes) = match_indexes {
            indexes.clear();
            indexes.extend_from_slice(&scratch.last_match);
        }
        return penalty * needle_len as f32 / haystack_len as f32;
    }

    scratch.memo.clear();
    scratch.memo.resize(memo_size, SCORE_UNCOMPUTED);
    let record = match_indexes.is_some();
    if record {
        scratch.best.clear();
        scratch.best.resize(memo_size, 0);
    }

    let mut ctx = MatchContext {
        haystack: pair.haystack,
        haystack_case: pair.haystack_case,
        needle: pair.needle,
        needle_case: pair.needle_case,
        smart_case: options.smart_case,
        max_gap: options.max_gap,
        last_match: &scratch.last_match,
        memo: &mut scratch.memo,
        best_match: if record {
            Some(&mut scratch.best)
        } else {
            None
        },
    };

    let root = ctx.recursive_match(0, 0);
    debug_assert!((0.0..=1.0).contains(&root));

    // The recursion scaled by the length of the haystack used; scale back up
    // by the needle length so exact matches land on 1.
    let score = needle_len as f32 * root;
    if score <= 0.0 {
        return 0.0;
    }

    if let Some(indexes) = match_indexes {
        indexes.clear();
        let mut next = 0;
        for i in 0..needle_len {
            let chosen = scratch.best[i * haystack_len + next];
            indexes.push(chosen);
            next = chosen + 1;
        }
    }
    score
}

fn score_with_sink(
    haystack: &str,
    needle: &str,
    options: &MatchOptions,
    sink: Option<&mut Vec<usize>>,
) -> f32 {
    let mut scratch = ScoreScratch::default();
    let (haystack_lower, needle_lower);
    let pair = if options.case_sensitive {
        ScorePair {
            haystack: haystack.as_bytes(),
            haystack_case: haystack.as_bytes(),
            needle: needle.as_bytes(),
            needle_case: needle.as_bytes(),
        }
    } else {
        haystack_lower = haystack.to_ascii_lowercase();
        needle_lower = needle.to_ascii_lowercase();
        ScorePair {
            haystack: haystack.as_bytes(),
            haystack_case: haystack_lower.as_bytes(),
            needle: needle.as_bytes(),
            needle_case: needle_lower.as_bytes(),
        }
    };
    score_candidate(&pair, options, &mut scratch, sink)
}

/// Score `needle` against `haystack`.
///
/// Returns `0.0` when the needle is not an ordered subsequence of the
/// haystack under the active case policy, `1.0` for a perfect match. The
/// empty needle matches everything perfectly.
pub fn score(haystack: &str, needle: &str, options: &MatchOptions) -> f32 {
    score_with_sink(haystack, needle, options, None)
}

/// Score `needle` against `haystack` and report which haystack byte was
/// chosen for each needle byte.
///
/// Returns `None` when the needle does not match. The returned indices are
/// strictly increasing and there is one per needle byte.
pub fn score_indices(haystack: &str, needle: &str, options: &MatchOptions) -> Option<(f32, Vec<usize>)> {
    let mut indexes = Vec::new();
    let score = score_with_sink(haystack, needle, options, Some(&mut indexes));
    if score > 0.0 {
        Some((score, indexes))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insensitive() -> MatchOptions {
        MatchOptions::default()
    }

    fn sensitive() -> MatchOptions {
        MatchOptions {
            case_sensitive: true,
            ..MatchOptions::default()
        }
    }

    fn smart() -> MatchOptions {
        MatchOptions {
            smart_case: true,
            ..MatchOptions::default()
        }
    }

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    fn wrap_matches(line: &str, indices: &[usize]) -> String {
        let mut wrapped = String::new();
        for (i, b) in line.bytes().enumerate() {
            if indices.contains(&i) {
                wrapped.push('[');
                wrapped.push(b as char);
                wrapped.push(']');
            } else {
                wrapped.push(b as char);
            }
        }
        wrapped
    }

    #[test]
    fn empty_needle_is_a_perfect_match() {
        assert_eq!(score("anything", "", &insensitive()), 1.0);
        assert_eq!(score("", "", &insensitive()), 1.0);
    }

    #[test]
    fn non_subsequence_scores_zero() {
        assert_eq!(score("abc", "abx", &insensitive()), 0.0);
        assert_eq!(score("", "a", &insensitive()), 0.0);
        assert_eq!(score("foo/bar.js", "file", &insensitive()), 0.0);
        assert_eq!(score("ab", "abc", &insensitive()), 0.0);
    }

    #[test]
    fn self_match_is_exactly_one() {
        for s in ["a", "abc", "AlphaBetaCappa", "/this/is/a/test/dir", "a-b_c.d"] {
            assert_eq!(score(s, s, &sensitive()), 1.0, "self match of {:?}", s);
        }
    }

    #[test]
    fn scores_stay_in_range() {
        let pairs = [
            ("axbycz", "abc"),
            ("/path1/path2/path3/zzz", "zzz"),
            ("AlphaBetaCappa", "abc"),
            ("a-b-c", "abc"),
            ("thisisatestdir", "tiatd"),
        ];
        for (haystack, needle) in pairs {
            let s = score(haystack, needle, &insensitive());
            assert!((0.0..=1.0).contains(&s), "{:?}/{:?} scored {}", haystack, needle, s);
        }
    }

    #[test]
    fn separator_boundaries_are_rewarded() {
        // Both gaps cross a '-' boundary: 3 * (0.8 * 0.8 / 5).
        assert_close(score("a-b-c", "abc", &insensitive()), 0.384);
        // '_' and digit boundaries weigh the same as '-'.
        assert_close(score("a_b", "ab", &insensitive()), 2.0 * 0.8 / 3.0);
        assert_close(score("a1b", "ab", &insensitive()), 2.0 * 0.8 / 3.0);
        // '.' is a weaker boundary.
        assert_close(score("a.b", "ab", &insensitive()), 2.0 * 0.7 / 3.0);
    }

    #[test]
    fn slash_boundary_beats_plain_gap() {
        let with_slash = score("foo/bar", "fb", &insensitive());
        let without = score("fooxbar", "fb", &insensitive());
        assert_close(with_slash, 2.0 * 0.9 / 7.0);
        assert_close(without, 2.0 * 0.6 / 7.0);
        assert!(with_slash > without);
    }

    #[test]
    fn camel_case_boundary_beats_plain_gap() {
        let camel = score("FooBar", "fb", &insensitive());
        let flat = score("foobar", "fb", &insensitive());
        assert_close(camel, 2.0 * 0.8 / 6.0);
        assert_close(flat, 2.0 * 0.6 / 6.0);
    }

    #[test]
    fn plain_gaps_use_the_distance_penalty() {
        // Gaps of one on both sides: 3 * (0.6 * 0.6 / 6).
        let s = score("abcdef", "ace", &insensitive());
        assert_close(s, 0.18);
        assert!(s < 0.2);
        let (_, indices) = score_indices("abcdef", "ace", &insensitive()).unwrap();
        assert_eq!(indices, [0, 2, 4]);
    }

    #[test]
    fn basename_matches_are_not_diluted_by_leading_path() {
        let deep = score("/path1/path2/path3/zzz", "zzz", &insensitive());
        let shallow = score("/zzz/path2/path3/path4", "zzz", &insensitive());
        assert_close(deep, 3.0 * 0.9 / 4.0);
        assert_close(shallow, 3.0 * 0.9 / 22.0);
        assert!(deep > shallow);
    }

    #[test]
    fn case_sensitive_needs_exact_bytes() {
        assert_eq!(score("abC", "abc", &sensitive()), 0.0);
        assert_eq!(score("abC", "abC", &sensitive()), 1.0);
        assert!(score("abC", "abc", &insensitive()) > 0.0);
    }

    #[test]
    fn smart_case_penalizes_mismatched_case() {
        // 'A' at 0 costs 0.9 for the case mismatch; 'd' hits the camel hump
        // at 3 (0.8) and another 0.9: 2 * (0.9 * 0.72 / 6).
        assert_close(score("AbcDef", "ad", &smart()), 0.216);
        assert!(score("AbcDef", "abc", &smart()) < score("AbcDef", "abc", &insensitive()));
        // Matching case pays no penalty.
        assert_eq!(score("abc", "abc", &smart()), 1.0);
    }

    #[test]
    fn max_gap_caps_the_distance_between_matches() {
        let tight = MatchOptions {
            max_gap: 1,
            ..MatchOptions::default()
        };
        let loose = MatchOptions {
            max_gap: 2,
            ..MatchOptions::default()
        };
        assert_eq!(score("a--b", "ab", &tight), 0.0);
        assert_close(score("a--b", "ab", &loose), 2.0 * 0.8 / 4.0);
    }

    #[test]
    fn indices_wrap_the_matched_bytes() {
        let (_, indices) = score_indices("axbycz", "abc", &insensitive()).unwrap();
        assert_eq!(wrap_matches("axbycz", &indices), "[a]x[b]y[c]z");
        let (_, indices) = score_indices("axbycz", "xyz", &insensitive()).unwrap();
        assert_eq!(wrap_matches("axbycz", &indices), "a[x]b[y]c[z]");
    }

    #[test]
    fn indices_prefer_boundary_alignments() {
        let (_, indices) = score_indices("AlphaBetaCappa", "abc", &insensitive()).unwrap();
        assert_eq!(indices, [0, 5, 9]);
    }

    #[test]
    fn indices_are_strictly_increasing() {
        for (haystack, needle) in [
            ("/this/is/a/test/dir", "tiatd"),
            ("alphabetacappa", "abc"),
            ("a-b-c", "abc"),
        ] {
            let (_, indices) = score_indices(haystack, needle, &insensitive()).unwrap();
            assert_eq!(indices.len(), needle.len());
            assert!(indices.windows(2).all(|w| w[0] < w[1]), "{:?}", indices);
        }
    }

    #[test]
    fn oversized_state_space_falls_back_to_the_estimator() {
        let mut haystack = String::from("a");
        haystack.push_str(&"x".repeat(4999));
        haystack.push('b');
        let (score, indices) = score_indices(&haystack, "ab", &insensitive()).unwrap();
        assert_close(score, 0.6 * 2.0 / 5001.0);
        assert_eq!(indices, [0, 5000]);
    }

    #[test]
    fn long_exact_match_still_scores_one() {
        let haystack = "a".repeat(1000);
        let (score, indices) = score_indices(&haystack, &haystack, &insensitive()).unwrap();
        assert_eq!(score, 1.0);
        assert_eq!(indices, (0..1000).collect::<Vec<_>>());
    }
}
