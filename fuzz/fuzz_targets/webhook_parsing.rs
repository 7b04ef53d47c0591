#![no_main]

//! Fuzz target for event parsing and checkout field extraction.
//!
//! Arbitrary bytes must either fail to parse or yield an event whose session
//! extraction completes without panicking.

use legalfooter_core::{NewPolicy, StripeEvent};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(event) = StripeEvent::from_slice(data) else {
        return;
    };

    let _ = event.is_checkout_completed();
    let session = event.checkout_session();
    let _ = session.customer_email();
    let _ = session.protected_domain();

    let policy = NewPolicy::from_session(&session);
    assert_eq!(policy.email.as_deref(), session.customer_email());
    assert_eq!(policy.domain.as_deref(), session.protected_domain());
});
