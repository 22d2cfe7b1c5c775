#![no_main]

use libfuzzer_sys::fuzz_target;
use litscout::genai::extract_json;
use litscout::models::{Paper, SearchPlan};

fuzz_target!(|data: &[u8]| {
    // First try to parse as valid JSON
    if let Ok(json) = serde_json::from_slice::<serde_json::Value>(data) {
        // Then try each model type
        let _ = serde_json::from_value::<Paper>(json.clone());
        let _ = serde_json::from_value::<SearchPlan>(json);
    }
    // The extractor must tolerate arbitrary model output
    if let Ok(raw) = std::str::from_utf8(data) {
        let _ = extract_json(raw);
    }
});
