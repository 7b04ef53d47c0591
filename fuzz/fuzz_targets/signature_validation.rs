#![no_main]

//! Fuzz target for Stripe signature verification.
//!
//! Splits the input into a header and a payload and checks that the verifier
//! never panics, and that a payload signed with the real secret always
//! verifies.

use std::sync::Arc;

use legalfooter_api::{crypto::signature_header, SignatureVerifier};
use legalfooter_core::TestClock;
use libfuzzer_sys::fuzz_target;

const SECRET: &str = "whsec_fuzz";
const NOW: u64 = 1_700_000_000;

fuzz_target!(|data: &[u8]| {
    let Ok(verifier) = SignatureVerifier::new(SECRET, Arc::new(TestClock::at_unix(NOW))) else {
        return;
    };

    let split = data.first().map_or(0, |&b| usize::from(b)).min(data.len());
    let (header, payload) = data.split_at(split);
    let header = String::from_utf8_lossy(header);

    let _ = verifier.verify(payload, Some(&header));
    let _ = verifier.construct_event(payload, Some(&header));

    if let Ok(valid) = signature_header(payload, SECRET, NOW as i64) {
        assert!(verifier.verify(payload, Some(&valid)).is_ok());

        // Appending fuzzed entries must not invalidate a good signature.
        let extended = format!("{valid},{header}");
        let overrides_timestamp = header
            .split(',')
            .any(|item| item.split_once('=').is_some_and(|(key, _)| key.trim() == "t"));
        if !overrides_timestamp {
            assert!(verifier.verify(payload, Some(&extended)).is_ok());
        }
    }
});
