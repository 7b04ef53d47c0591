//! Property-based tests for signature verification.

use std::sync::Arc;

use legalfooter_api::{
    crypto::{compute_signature, signature_header},
    SignatureError, SignatureVerifier,
};
use legalfooter_core::TestClock;
use proptest::prelude::*;

const SECRET: &str = "whsec_property";
const NOW: u64 = 1_700_000_000;

fn verifier() -> SignatureVerifier {
    SignatureVerifier::new(SECRET, Arc::new(TestClock::at_unix(NOW))).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn signed_payloads_always_verify(
        payload in prop::collection::vec(any::<u8>(), 0..2048),
        age in 0i64..=300,
    ) {
        let header = signature_header(&payload, SECRET, NOW as i64 - age).unwrap();
        prop_assert_eq!(verifier().verify(&payload, Some(&header)), Ok(()));
    }

    #[test]
    fn any_flipped_byte_fails(
        payload in prop::collection::vec(any::<u8>(), 1..512),
        index in any::<prop::sample::Index>(),
        mask in 1u8..=255,
    ) {
        let header = signature_header(&payload, SECRET, NOW as i64).unwrap();
        let mut tampered = payload.clone();
        let i = index.index(tampered.len());
        tampered[i] ^= mask;

        prop_assert_eq!(
            verifier().verify(&tampered, Some(&header)),
            Err(SignatureError::NoMatchingSignature)
        );
    }

    #[test]
    fn stale_signatures_always_fail(
        payload in prop::collection::vec(any::<u8>(), 0..256),
        extra in 1i64..1_000_000,
    ) {
        let header = signature_header(&payload, SECRET, NOW as i64 - 300 - extra).unwrap();
        let is_stale = matches!(
            verifier().verify(&payload, Some(&header)),
            Err(SignatureError::TimestampOutsideTolerance { .. })
        );
        prop_assert!(is_stale);
    }

    #[test]
    fn arbitrary_headers_never_panic(header in ".{0,256}", payload in ".{0,256}") {
        let _ = verifier().verify(payload.as_bytes(), Some(&header));
        let _ = verifier().construct_event(payload.as_bytes(), Some(&header));
    }

    #[test]
    fn signature_depends_on_timestamp(
        payload in prop::collection::vec(any::<u8>(), 0..256),
        t1 in 0i64..2_000_000_000,
        t2 in 0i64..2_000_000_000,
    ) {
        prop_assume!(t1 != t2);
        prop_assert_ne!(
            compute_signature(&payload, SECRET, t1).unwrap(),
            compute_signature(&payload, SECRET, t2).unwrap()
        );
    }
}
