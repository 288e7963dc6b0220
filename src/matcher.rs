//! The corpus matcher.
//!
//! Holds a mutable, indexed set of candidate strings and ranks the whole set
//! against a query. Candidates are stored in a flat array so that query-time
//! table scans stay fast; a side map from value to position makes removal
//! O(1). Queries keep the top results in a bounded min-heap and can shard the
//! scan across threads for large corpora.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::collections::HashMap;
use std::fmt;
use std::ops::Range;

use rayon::prelude::*;
use thread_local::ThreadLocal;

use crate::candidate::{letter_bitmask, Candidate};
use crate::options::{MatchOptions, MatcherOptions};
use crate::score::{score_candidate, ScorePair, ScoreScratch};

/// Corpus size at which [`Matcher::find`] starts sharding across threads
/// (given a nonzero `num_threads`). Below this, sharding overhead beats the
/// scan itself.
pub const PARALLEL_THRESHOLD: usize = 10_000;

/// A scored candidate returned by [`Matcher::find`].
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult<'a> {
    /// Match quality in `[0, 1]`; `1.0` is a perfect match.
    pub score: f32,
    /// The stored candidate value. Borrows from the matcher; copy it out
    /// before mutating the corpus again.
    pub value: &'a str,
    /// The haystack byte index chosen for each needle byte, strictly
    /// increasing, with one entry per byte of the normalized query. Present
    /// only when
    /// [`record_match_indexes`](MatcherOptions::record_match_indexes) is set.
    pub match_indexes: Option<Vec<usize>>,
}

/// Entry in the bounded result heap.
///
/// The ordering is inverted so the heap root is the worst retained result:
/// lowest score first, score ties going to the longer value. Draining the
/// heap in sorted order therefore yields the best result first.
struct HeapEntry<'a> {
    score: f32,
    candidate: &'a Candidate,
}

impl PartialEq for HeapEntry<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry<'_> {}

impl PartialOrd for HeapEntry<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.candidate.value.len().cmp(&other.candidate.value.len()))
    }
}

/// Min-heap bounded at `max_results` entries. Once full, a push must beat the
/// current worst score to displace it.
struct ResultHeap<'a> {
    heap: BinaryHeap<HeapEntry<'a>>,
    capacity: usize,
}

impl<'a> ResultHeap<'a> {
    fn new(max_results: usize) -> Self {
        let capacity = if max_results == 0 { usize::MAX } else { max_results };
        ResultHeap {
            heap: BinaryHeap::new(),
            capacity,
        }
    }

    fn push(&mut self, score: f32, candidate: &'a Candidate) {
        let admit = self.heap.len() < self.capacity
            || self.heap.peek().is_some_and(|worst| score > worst.score);
        if admit {
            self.heap.push(HeapEntry { score, candidate });
            if self.heap.len() > self.capacity {
                self.heap.pop();
            }
        }
    }

    fn merge_into(self, combined: &mut ResultHeap<'a>) {
        for entry in self.heap {
            combined.push(entry.score, entry.candidate);
        }
    }

    fn into_sorted(self) -> Vec<HeapEntry<'a>> {
        self.heap.into_sorted_vec()
    }
}

/// Normalized query state shared by every shard of one `find` call.
struct Needle<'a> {
    raw: &'a [u8],
    case: &'a [u8],
    bitmask: u32,
}

/// A mutable corpus of candidate strings with fuzzy ranking.
///
/// ```
/// use fuzzrank::{Matcher, MatcherOptions};
///
/// let mut matcher = Matcher::new();
/// matcher.add("src/matcher.rs");
/// matcher.add("src/options.rs");
/// matcher.add("benches/score_micro.rs");
///
/// let results = matcher.find("mat", &MatcherOptions::default());
/// assert_eq!(results[0].value, "src/matcher.rs");
/// ```
#[derive(Default)]
pub struct Matcher {
    candidates: Vec<Candidate>,
    lookup: HashMap<String, usize>,
    scratch: ThreadLocal<RefCell<ScoreScratch>>,
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matcher")
            .field("candidates", &self.candidates.len())
            .finish()
    }
}

impl Matcher {
    /// Creates an empty matcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of candidates currently stored.
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Whether the corpus is empty.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Grows capacity for at least `additional` more candidates without
    /// inserting anything.
    pub fn reserve(&mut self, additional: usize) {
        self.candidates.reserve(additional);
        self.lookup.reserve(additional);
    }

    /// Adds a candidate. Adding a value that is already present replaces the
    /// stored record.
    pub fn add(&mut self, value: impl Into<String>) {
        let value = value.into();
        match self.lookup.get(&value) {
            Some(&index) => {
                self.candidates[index] = Candidate::new(value);
            }
            None => {
                let index = self.candidates.len();
                self.lookup.insert(value.clone(), index);
                self.candidates.push(Candidate::new(value));
            }
        }
    }

    /// Removes a candidate by value. Returns whether it was present.
    pub fn remove(&mut self, value: &str) -> bool {
        let Some(index) = self.lookup.remove(value) else {
            return false;
        };
        self.candidates.swap_remove(index);
        if index < self.candidates.len() {
            // Re-point the lookup of the element swapped into the hole.
            let moved = self.candidates[index].value.clone();
            self.lookup.insert(moved, index);
        }
        true
    }

    /// Removes every candidate.
    pub fn clear(&mut self) {
        self.candidates.clear();
        self.lookup.clear();
    }

    /// Ranks the corpus against `query` and returns the best matches,
    /// highest score first.
    ///
    /// Whitespace in the query never participates in matching and is
    /// stripped up front. Scores do not depend on insertion order or on
    /// `num_threads`; results are sorted by score descending with ties going
    /// to the shorter value.
    pub fn find(&self, query: &str, options: &MatcherOptions) -> Vec<MatchResult<'_>> {
        let raw: String = query.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let lower = raw.to_ascii_lowercase();
        let needle = Needle {
            raw: raw.as_bytes(),
            case: if options.case_sensitive {
                raw.as_bytes()
            } else {
                lower.as_bytes()
            },
            // The folded mask is correct in both case modes: candidate masks
            // are built from folded bytes, so this can only under-filter.
            bitmask: letter_bitmask(lower.as_bytes()),
        };
        let match_options = options.match_options();

        debug!(
            "find: query {:?}, {} candidates, {} threads",
            raw,
            self.candidates.len(),
            options.num_threads
        );

        let mut combined = ResultHeap::new(options.max_results);
        if options.num_threads == 0 || self.candidates.len() < PARALLEL_THRESHOLD {
            self.scan(&self.candidates, &needle, &match_options, &mut combined);
        } else {
            let shards = shard_ranges(self.candidates.len(), options.num_threads);
            let shard_heaps: Vec<ResultHeap<'_>> = shards
                .into_par_iter()
                .map(|range| {
                    let mut heap = ResultHeap::new(options.max_results);
                    self.scan(&self.candidates[range], &needle, &match_options, &mut heap);
                    heap
                })
                .collect();
            // Shard heaps come back in shard order; the merge reapplies the
            // same push rule, so the final contents match a serial scan.
            for heap in shard_heaps {
                heap.merge_into(&mut combined);
            }
        }

        let entries = combined.into_sorted();
        trace!("find: {} matched", entries.len());

        entries
            .into_iter()
            .map(|entry| {
                let match_indexes = if options.record_match_indexes {
                    Some(self.recompute_indexes(entry.candidate, &needle, &match_options))
                } else {
                    None
                };
                MatchResult {
                    score: entry.score,
                    value: &entry.candidate.value,
                    match_indexes,
                }
            })
            .collect()
    }

    /// Scores one contiguous slice of the corpus into `heap`.
    fn scan<'a>(
        &'a self,
        candidates: &'a [Candidate],
        needle: &Needle<'_>,
        options: &MatchOptions,
        heap: &mut ResultHeap<'a>,
    ) {
        let mut scratch = self.scratch.get_or_default().borrow_mut();
        for candidate in candidates {
            if candidate.bitmask & needle.bitmask != needle.bitmask {
                continue;
            }
            let pair = ScorePair {
                haystack: candidate.value.as_bytes(),
                haystack_case: if options.case_sensitive {
                    candidate.value.as_bytes()
                } else {
                    candidate.lower.as_bytes()
                },
                needle: needle.raw,
                needle_case: needle.case,
            };
            let score = score_candidate(&pair, options, &mut scratch, None);
            if score > 0.0 {
                heap.push(score, candidate);
            }
        }
    }

    /// Index buffers are not carried through the hot path; winners are
    /// re-scored with a sink instead.
    fn recompute_indexes(
        &self,
        candidate: &Candidate,
        needle: &Needle<'_>,
        options: &MatchOptions,
    ) -> Vec<usize> {
        let mut indexes = Vec::with_capacity(needle.raw.len());
        let mut scratch = self.scratch.get_or_default().borrow_mut();
        let pair = ScorePair {
            haystack: candidate.value.as_bytes(),
            haystack_case: if options.case_sensitive {
                candidate.value.as_bytes()
            } else {
                candidate.lower.as_bytes()
            },
            needle: needle.raw,
            needle_case: needle.case,
        };
        let _score = score_candidate(&pair, options, &mut scratch, Some(&mut indexes));
        debug_assert!(_score > 0.0, "re-scoring a winner cannot fail");
        indexes
    }
}

impl Extend<String> for Matcher {
    fn extend<T: IntoIterator<Item = String>>(&mut self, iter: T) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for value in iter {
            self.add(value);
        }
    }
}

impl FromIterator<String> for Matcher {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        let mut matcher = Matcher::new();
        matcher.extend(iter);
        matcher
    }
}

/// Splits `len` items into `shards` contiguous ranges, spreading the
/// remainder over the leading shards.
fn shard_ranges(len: usize, shards: usize) -> Vec<Range<usize>> {
    let base = len / shards;
    let remainder = len % shards;
    let mut ranges = Vec::with_capacity(shards);
    let mut start = 0;
    for i in 0..shards {
        let size = base + usize::from(i < remainder);
        ranges.push(start..start + size);
        start += size;
    }
    ranges
}
