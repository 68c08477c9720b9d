#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Every body maps to some status.
        let _ = nfse_lote::rps::parse_verification_response(s).label();
    }
});
