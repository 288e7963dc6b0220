//! fuzzrank is a high-throughput fuzzy string matcher.
//!
//! It ranks a large, mutable corpus of candidate strings (typically file
//! paths) against short queries arriving per keystroke: a query matches a
//! candidate when its bytes appear in order, possibly with gaps, and the
//! score in `[0, 1]` rewards word and path boundaries while penalizing
//! scattered matches. Large corpora can be scored across threads; results
//! come back as a top-K list, best first.
//!
//! # Examples
//!
//! ```
//! use fuzzrank::{Matcher, MatcherOptionsBuilder};
//!
//! let mut matcher = Matcher::new();
//! matcher.add("src/lib.rs");
//! matcher.add("src/matcher.rs");
//! matcher.add("benches/score_micro.rs");
//!
//! let options = MatcherOptionsBuilder::default()
//!     .max_results(10)
//!     .build()
//!     .unwrap();
//! let results = matcher.find("mat", &options);
//! assert_eq!(results[0].value, "src/matcher.rs");
//! ```
//!
//! The per-pair scorer is also exposed directly:
//!
//! ```
//! use fuzzrank::{score, MatchOptions};
//!
//! let options = MatchOptions::default();
//! assert!(score("src/score.rs", "score", &options) > score("src/score.rs", "sc.rs", &options));
//! ```

#![warn(missing_docs)]

#[macro_use]
extern crate log;

mod candidate;
pub mod matcher;
pub mod options;
pub mod score;

pub use crate::matcher::{MatchResult, Matcher, PARALLEL_THRESHOLD};
pub use crate::options::{MatchOptions, MatcherOptions, MatcherOptionsBuilder};
pub use crate::score::{score, score_indices};
