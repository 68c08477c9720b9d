#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Some(amount) = nfse_lote::core::parse_amount(s) {
            let _ = nfse_lote::rps::format_decimal(amount);
        }
        let _ = nfse_lote::core::normalize_text(s);
    }
});
