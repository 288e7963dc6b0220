//! Scoring and corpus-query options.

use derive_builder::Builder;

/// Options consumed by [`score`](crate::score()) for a single
/// (haystack, needle) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOptions {
    /// Compare raw bytes; no ASCII case folding.
    pub case_sensitive: bool,
    /// Multiply a matched byte's score by 0.9 when its raw bytes differ in
    /// case, so mixed-case queries rank exact-case candidates higher.
    pub smart_case: bool,
    /// Upper bound on the haystack distance between consecutive needle
    /// matches. `0` means no bound.
    pub max_gap: usize,
}

/// Options recognized by [`Matcher::find`](crate::Matcher::find).
///
/// All fields default to `false`/`0`. Construct directly or through
/// [`MatcherOptionsBuilder`]:
///
/// ```
/// use fuzzrank::MatcherOptionsBuilder;
///
/// let options = MatcherOptionsBuilder::default()
///     .max_results(10)
///     .record_match_indexes(true)
///     .build()
///     .unwrap();
/// assert_eq!(options.max_results, 10);
/// ```
#[derive(Debug, Clone, Default, Builder)]
#[builder(default)]
pub struct MatcherOptions {
    /// Match the query byte-for-byte instead of case folding.
    pub case_sensitive: bool,
    /// Passed through to the scorer; see [`MatchOptions::smart_case`].
    pub smart_case: bool,
    /// Number of contiguous shards scored in parallel. `0` forces the serial
    /// path regardless of corpus size.
    pub num_threads: usize,
    /// Cap on the number of returned results. `0` means unlimited.
    pub max_results: usize,
    /// Passed through to the scorer; see [`MatchOptions::max_gap`].
    pub max_gap: usize,
    /// Re-score each winner with an index sink and attach the matched byte
    /// indices to the result.
    pub record_match_indexes: bool,
}

impl MatcherOptions {
    /// The scorer-level slice of these options.
    pub(crate) fn match_options(&self) -> MatchOptions {
        MatchOptions {
            case_sensitive: self.case_sensitive,
            smart_case: self.smart_case,
            max_gap: self.max_gap,
        }
    }
}
