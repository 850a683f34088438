#![no_main]

use libfuzzer_sys::fuzz_target;
use solis_flux::forecast::{FORECAST_HISTORY_LEN, ForecastHistory};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let history = ForecastHistory::parse(s);
        assert!(history.len() <= FORECAST_HISTORY_LEN);
        let reparsed = ForecastHistory::parse(&history.to_persisted());
        assert_eq!(reparsed.len(), history.len());
    }
});
