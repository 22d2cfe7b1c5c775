#![no_main]

use libfuzzer_sys::fuzz_target;
use litscout::models::parse_publication_date;

fuzz_target!(|data: &[u8]| {
    // Date parsing is best-effort and must never panic
    if let Ok(raw) = std::str::from_utf8(data) {
        let _ = parse_publication_date(raw, 2026);
    }
});
