//! Stripe checkout webhook handler.
//!
//! Reads the raw body and the signature header, verifies, then hands the
//! event to the pipeline. Only verification failures produce a non-200.
//!
//! The pipeline runs in its own task: dropping the request future (client
//! disconnect, outer middleware) cannot stop a verified event between the
//! insert and the email.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use legalfooter_core::WebhookError;
use serde::Serialize;
use tracing::{error, info, instrument, warn, Instrument};

use crate::{
    crypto::{SignatureError, SIGNATURE_HEADER},
    server::AppState,
};

/// Reason returned when verification errors are not exposed.
const GENERIC_VERIFICATION_REASON: &str = "signature verification failed";

/// Body acknowledging a verified delivery.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// Always `true`
    pub received: bool,
}

/// Receives one Stripe event.
///
/// Returns:
/// - 400 `Webhook Error: <reason>` when the signature or payload is invalid
/// - 200 `{"received": true}` otherwise, whatever happened downstream
#[instrument(
    name = "stripe_webhook",
    skip(state, headers, body),
    fields(
        content_length = body.len(),
        has_signature = headers.contains_key(SIGNATURE_HEADER),
    )
)]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let event = match signature_value(&headers)
        .map_err(WebhookError::from)
        .and_then(|signature| state.verifier.construct_event(&body, signature))
    {
        Ok(event) => event,
        Err(err) => {
            warn!(code = err.code(), error = %err, "Rejected webhook");
            return verification_failure(&err, state.expose_verification_errors);
        },
    };

    let processor = Arc::clone(&state.processor);
    let task = tokio::spawn(async move { processor.process(&event).await }.in_current_span());

    match task.await {
        Ok(outcome) => info!(outcome = outcome.label(), "Webhook acknowledged"),
        Err(e) => error!(error = %e, "Webhook pipeline task failed"),
    }

    (StatusCode::OK, Json(WebhookResponse { received: true })).into_response()
}

/// Reads the signature header. A value that is not visible ASCII is a
/// malformed header, not a missing one.
fn signature_value(headers: &HeaderMap) -> Result<Option<&str>, SignatureError> {
    headers
        .get(SIGNATURE_HEADER)
        .map(|value| {
            value.to_str().map_err(|_| {
                SignatureError::InvalidFormat("header contains non-ASCII characters".to_string())
            })
        })
        .transpose()
}

/// Answers any method other than POST on the webhook route.
#[instrument(name = "method_not_allowed", skip_all, fields(method = %method))]
pub async fn method_not_allowed(method: Method) -> Response {
    let err = WebhookError::MethodNotAllowed;
    warn!(code = err.code(), "Rejected webhook request method");

    (StatusCode::METHOD_NOT_ALLOWED, [(header::ALLOW, "POST")], "Method Not Allowed")
        .into_response()
}

fn verification_failure(err: &WebhookError, expose: bool) -> Response {
    let reason = match err {
        WebhookError::Verification { reason } if expose => reason.as_str(),
        _ => GENERIC_VERIFICATION_REASON,
    };

    (StatusCode::BAD_REQUEST, format!("Webhook Error: {reason}")).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn exposed_reason_is_returned_verbatim() {
        let err = WebhookError::Verification { reason: "Timestamp outside the tolerance zone".into() };

        let response = verification_failure(&err, true);

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "Webhook Error: Timestamp outside the tolerance zone");
    }

    #[tokio::test]
    async fn hidden_reason_uses_generic_text() {
        let err = WebhookError::Verification { reason: "detail".into() };

        let response = verification_failure(&err, false);

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "Webhook Error: signature verification failed");
    }

    #[test]
    fn non_ascii_signature_header_is_malformed() {
        let mut headers = HeaderMap::new();
        headers.insert(
            SIGNATURE_HEADER,
            axum::http::HeaderValue::from_bytes(b"t=1,v1=\xff\xfe").unwrap(),
        );

        assert!(matches!(signature_value(&headers), Err(SignatureError::InvalidFormat(_))));
    }

    #[test]
    fn absent_signature_header_is_none() {
        assert_eq!(signature_value(&HeaderMap::new()), Ok(None));
    }

    #[tokio::test]
    async fn method_not_allowed_advertises_post() {
        let response = method_not_allowed(Method::GET).await;

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(header::ALLOW).unwrap(), "POST");
    }
}
