#![no_main]
use libfuzzer_sys::fuzz_target;
use loadcell_config::PersistedCalibration;

fuzz_target!(|data: &str| {
    for key in ["a", "b"] {
        if let Ok(rec) = PersistedCalibration::from_json(data, key) {
            // Anything that parsed must render and parse back to the same record.
            if let Ok(text) = rec.to_json(key) {
                let again = PersistedCalibration::from_json(&text, key).expect("re-parse");
                assert_eq!(again.offset, rec.offset);
                assert_eq!(again.reference_unit.to_bits(), rec.reference_unit.to_bits());
            }
        }
    }
});
