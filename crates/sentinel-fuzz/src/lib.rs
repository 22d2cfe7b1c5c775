//! Fuzzing library for litscout.
//!
//! This crate provides fuzzing targets for testing JSON deserialization
//! of the bibliographic wire records and the model-output JSON extractor.
//!
//! # Usage
//!
//! ```bash
//! cd crates/sentinel-fuzz
//! cargo +nightly fuzz run fuzz_paper_parse -- -max_total_time=60
//! ```

pub use litscout::models;
