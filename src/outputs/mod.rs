//! Output writers.
//!
//! - [`json`]: per-article records from the collector and per-article score
//!   records from the sentiment stage

pub mod json;
