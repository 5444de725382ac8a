use std::panic::{self, AssertUnwindSafe};

use cfn_resource_core::contract::{ResponseEnvelope, RESPONSE_URL_PRINT, RESPONSE_URL_SILENT};
use serde_json::json;

use crate::adapters::response_sender::ResponseSender;
use crate::context::InvocationContext;
use crate::handlers::lifecycle::panic_message;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent,
    /// Silent sentinel address; the envelope is only returned to the caller.
    Discarded,
    /// Print sentinel address; the envelope was written to stderr.
    Printed,
    Skipped { reason: String },
    Failed { message: String },
}

impl DeliveryOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Sends the envelope once, without retry. Never panics and never fails the
/// invocation; the caller decides whether a failure is surfaced.
pub fn deliver_response(
    response_url: Option<&str>,
    envelope: &ResponseEnvelope,
    invocation: &InvocationContext,
    sender: &impl ResponseSender,
) -> DeliveryOutcome {
    let Some(url) = response_url else {
        tracing::error!(
            request_id = %envelope.request_id,
            status = %envelope.status,
            reason = %envelope.reason,
            "no response address available; response not delivered"
        );
        return DeliveryOutcome::Skipped {
            reason: "no response address".to_string(),
        };
    };

    let body = match envelope.to_body() {
        Ok(value) => value,
        Err(error) => {
            let message = format!("failed to serialize response envelope: {error}");
            tracing::error!(
                request_id = %envelope.request_id,
                %message,
                "response delivery failed"
            );
            return DeliveryOutcome::Failed { message };
        }
    };

    if url == RESPONSE_URL_SILENT {
        return DeliveryOutcome::Discarded;
    }

    if url == RESPONSE_URL_PRINT {
        log_captured_response(url, envelope);
        return DeliveryOutcome::Printed;
    }

    if invocation.deadline_passed() {
        tracing::warn!(
            request_id = %envelope.request_id,
            "invocation deadline passed; skipping response delivery"
        );
        return DeliveryOutcome::Skipped {
            reason: "invocation deadline passed".to_string(),
        };
    }

    let attempt = panic::catch_unwind(AssertUnwindSafe(|| sender.send_response(url, &body)));
    let result = attempt.unwrap_or_else(|payload| {
        let message = panic_message(payload.as_ref());
        Err(format!("response sender panicked: {message}"))
    });

    match result {
        Ok(()) => {
            tracing::info!(
                request_id = %envelope.request_id,
                status = %envelope.status,
                content_length = body.len(),
                "response delivered"
            );
            DeliveryOutcome::Sent
        }
        Err(message) => {
            tracing::error!(
                request_id = %envelope.request_id,
                %message,
                "response delivery failed"
            );
            DeliveryOutcome::Failed { message }
        }
    }
}

fn log_captured_response(url: &str, envelope: &ResponseEnvelope) {
    eprintln!(
        "{}",
        json!({
            "component": "response_sender",
            "event": "response_captured",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "url": url,
            "response": envelope,
        })
    );
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::{Duration, SystemTime};

    use cfn_resource_core::contract::{Attributes, RequestIdentity};

    use super::*;

    struct CapturingSender {
        sent: Mutex<Vec<(String, Vec<u8>)>>,
    }

    impl CapturingSender {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
            }
        }

        fn sent(&self) -> Vec<(String, Vec<u8>)> {
            self.sent.lock().expect("poisoned mutex").clone()
        }
    }

    impl ResponseSender for CapturingSender {
        fn send_response(&self, url: &str, body: &[u8]) -> Result<(), String> {
            self.sent
                .lock()
                .expect("poisoned mutex")
                .push((url.to_string(), body.to_vec()));
            Ok(())
        }
    }

    struct RejectingSender;

    impl ResponseSender for RejectingSender {
        fn send_response(&self, _url: &str, _body: &[u8]) -> Result<(), String> {
            Err("response endpoint returned 403 Forbidden".to_string())
        }
    }

    struct PanickingSender;

    impl ResponseSender for PanickingSender {
        fn send_response(&self, _url: &str, _body: &[u8]) -> Result<(), String> {
            panic!("transport exploded");
        }
    }

    fn envelope() -> ResponseEnvelope {
        let identity = RequestIdentity {
            response_url: None,
            stack_id: "stack".to_string(),
            request_id: "request".to_string(),
            logical_resource_id: "Thing".to_string(),
            physical_resource_id: None,
        };
        ResponseEnvelope::success(
            &identity,
            "thing-1".to_string(),
            Attributes::new(),
            String::new(),
        )
    }

    #[test]
    fn sends_exact_serialized_body() {
        let sender = CapturingSender::new();
        let envelope = envelope();
        let outcome = deliver_response(
            Some("https://example.com/callback"),
            &envelope,
            &InvocationContext::default(),
            &sender,
        );

        assert_eq!(outcome, DeliveryOutcome::Sent);
        let sent = sender.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "https://example.com/callback");
        assert_eq!(sent[0].1, envelope.to_body().expect("body"));
    }

    #[test]
    fn sentinel_addresses_are_never_transmitted() {
        let sender = CapturingSender::new();
        let silent = deliver_response(
            Some(RESPONSE_URL_SILENT),
            &envelope(),
            &InvocationContext::default(),
            &sender,
        );
        let printed = deliver_response(
            Some(RESPONSE_URL_PRINT),
            &envelope(),
            &InvocationContext::default(),
            &sender,
        );

        assert_eq!(silent, DeliveryOutcome::Discarded);
        assert_eq!(printed, DeliveryOutcome::Printed);
        assert!(sender.sent().is_empty());
    }

    #[test]
    fn endpoint_rejection_is_reported_not_raised() {
        let outcome = deliver_response(
            Some("https://example.com/callback"),
            &envelope(),
            &InvocationContext::default(),
            &RejectingSender,
        );
        assert!(outcome.is_failure());
        assert_eq!(
            outcome,
            DeliveryOutcome::Failed {
                message: "response endpoint returned 403 Forbidden".to_string(),
            }
        );
    }

    #[test]
    fn sender_panic_is_reported_as_failure() {
        let outcome = deliver_response(
            Some("https://example.com/callback"),
            &envelope(),
            &InvocationContext::default(),
            &PanickingSender,
        );
        assert_eq!(
            outcome,
            DeliveryOutcome::Failed {
                message: "response sender panicked: transport exploded".to_string(),
            }
        );
    }

    #[test]
    fn skips_delivery_after_deadline() {
        let sender = CapturingSender::new();
        let invocation = InvocationContext::default()
            .with_deadline(SystemTime::now() - Duration::from_millis(10));
        let outcome = deliver_response(
            Some("https://example.com/callback"),
            &envelope(),
            &invocation,
            &sender,
        );

        assert!(matches!(outcome, DeliveryOutcome::Skipped { .. }));
        assert!(sender.sent().is_empty());
    }

    #[test]
    fn skips_delivery_without_address() {
        let sender = CapturingSender::new();
        let outcome = deliver_response(None, &envelope(), &InvocationContext::default(), &sender);
        assert_eq!(
            outcome,
            DeliveryOutcome::Skipped {
                reason: "no response address".to_string(),
            }
        );
    }
}
