//! Fuzz test for the full profile pipeline
//!
//! Any input must either fail with a positioned error or yield a profile
//! that survives a print/parse round trip.
//!
//! Run with: cargo +nightly fuzz run parser_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use malleable_dsl::{parse_with_options, ParseOptions};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let options = ParseOptions::default();

        match parse_with_options(input, &options) {
            Ok(profile) => {
                let printed = profile.to_text();
                match parse_with_options(&printed, &options) {
                    Ok(reparsed) => assert_eq!(reparsed, profile, "Round trip changed the profile"),
                    Err(err) => panic!("Printed profile failed to parse: {}\n{}", err, printed),
                }
            }
            Err(err) => {
                assert!(err.line() >= 1, "Error line should be >= 1");
                assert!(err.column() >= 1, "Error column should be >= 1");
                assert!(!err.to_string().is_empty(), "Error message should not be empty");
            }
        }
    }
});
