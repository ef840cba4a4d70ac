//! Natural-language fragments → structured booking input.
//!
//! Pure, total functions: they never fail, never touch I/O, and always
//! return a value. Vocabulary is Korean, matching what the recognizer
//! produces for this service.

mod parsers;

pub use parsers::{parse_ordinal, parse_time_range, split_utterance, TimeRange, UtteranceParts};
