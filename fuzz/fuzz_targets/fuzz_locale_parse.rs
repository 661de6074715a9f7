#![no_main]

//! Fuzz locale identifier validation: arbitrary strings must either parse
//! or return an error, never panic.

use libfuzzer_sys::fuzz_target;

use sqlicu_ext_icu::IcuLocale;

fuzz_target!(|data: &[u8]| {
    if data.len() > 256 {
        return;
    }
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(locale) = IcuLocale::parse(text) {
            assert_eq!(locale.requested(), text);
        }
    }
});
