//! Classification and unwrapping of inbound invocation payloads.
//!
//! Two shapes are accepted: a direct protocol event (an object carrying
//! `RequestType`) and a topic relay envelope whose first record embeds the
//! direct event as a JSON string at `Sns.Message`. Exactly one level of
//! relay unwrapping is performed.

use serde_json::Value;

use crate::contract::{InboundEvent, RequestIdentity};
use crate::error::ProtocolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventShape {
    Direct,
    Relay,
}

pub fn classify_event(event: &Value) -> Option<EventShape> {
    let object = event.as_object()?;
    if object.contains_key("RequestType") {
        return Some(EventShape::Direct);
    }
    match object.get("Records").and_then(Value::as_array) {
        Some(records) if !records.is_empty() => Some(EventShape::Relay),
        _ => None,
    }
}

pub fn normalize_event(event: Value) -> Result<InboundEvent, ProtocolError> {
    let direct = unwrap_event(event)?;
    serde_json::from_value(direct)
        .map_err(|error| ProtocolError::malformed(format!("invalid protocol event: {error}")))
}

/// Best-effort extraction of the fields needed to report a failure for an
/// event that could not be normalized.
pub fn recover_identity(event: &Value) -> RequestIdentity {
    let direct = match classify_event(event) {
        Some(EventShape::Relay) => relay_message(event)
            .ok()
            .and_then(|message| serde_json::from_str::<Value>(message).ok()),
        _ => None,
    };
    let source = direct.as_ref().unwrap_or(event);
    let field = |name: &str| source.get(name).and_then(Value::as_str).map(str::to_string);

    RequestIdentity {
        response_url: field("ResponseURL").filter(|url| !url.trim().is_empty()),
        stack_id: field("StackId").unwrap_or_default(),
        request_id: field("RequestId").unwrap_or_default(),
        logical_resource_id: field("LogicalResourceId").unwrap_or_default(),
        physical_resource_id: field("PhysicalResourceId").filter(|id| !id.is_empty()),
    }
}

fn unwrap_event(event: Value) -> Result<Value, ProtocolError> {
    match classify_event(&event) {
        Some(EventShape::Direct) => Ok(event),
        Some(EventShape::Relay) => {
            let message = relay_message(&event)?;
            let inner: Value = serde_json::from_str(message).map_err(|error| {
                ProtocolError::malformed(format!("relay message is not valid JSON: {error}"))
            })?;
            match classify_event(&inner) {
                Some(EventShape::Direct) => Ok(inner),
                Some(EventShape::Relay) => Err(ProtocolError::malformed(
                    "nested relay envelopes are not supported",
                )),
                None => Err(ProtocolError::malformed(
                    "relay message does not contain a protocol event",
                )),
            }
        }
        None => Err(ProtocolError::malformed(
            "event has neither RequestType nor a Records list",
        )),
    }
}

fn relay_message(event: &Value) -> Result<&str, ProtocolError> {
    event
        .get("Records")
        .and_then(Value::as_array)
        .and_then(|records| records.first())
        .and_then(|record| record.get("Sns"))
        .and_then(|sns| sns.get("Message"))
        .and_then(Value::as_str)
        .ok_or_else(|| ProtocolError::malformed("relay record must carry a string Sns.Message"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn direct_event() -> Value {
        json!({
            "RequestType": "Create",
            "ResponseURL": "https://example.com/callback",
            "StackId": "arn:aws:cloudformation:us-west-2:123456789012:stack/example/guid",
            "RequestId": "request-1",
            "ResourceType": "Custom::Thing",
            "LogicalResourceId": "Thing",
            "ResourceProperties": {"Key": "Value"}
        })
    }

    fn relay(message: String) -> Value {
        json!({
            "Records": [
                {"EventSource": "aws:sns", "Sns": {"Message": message}}
            ]
        })
    }

    #[test]
    fn detects_direct_and_relay_shapes() {
        assert_eq!(classify_event(&direct_event()), Some(EventShape::Direct));
        assert_eq!(
            classify_event(&relay(direct_event().to_string())),
            Some(EventShape::Relay)
        );
        assert_eq!(classify_event(&json!({"Records": []})), None);
        assert_eq!(classify_event(&json!("Create")), None);
    }

    #[test]
    fn relay_and_direct_normalize_identically() {
        let direct = normalize_event(direct_event()).expect("direct event should normalize");
        let relayed = normalize_event(relay(direct_event().to_string()))
            .expect("relay event should normalize");
        assert_eq!(direct, relayed);
    }

    #[test]
    fn only_first_relay_record_is_consulted() {
        let mut event = relay(direct_event().to_string());
        event["Records"]
            .as_array_mut()
            .expect("records")
            .push(json!({"Sns": {"Message": "not json"}}));

        assert!(normalize_event(event).is_ok());
    }

    #[test]
    fn rejects_unparseable_relay_message() {
        let error =
            normalize_event(relay("{not json".to_string())).expect_err("invalid JSON should fail");
        assert!(matches!(error, ProtocolError::MalformedEvent(_)));
        assert!(error.to_string().contains("relay message is not valid JSON"));
    }

    #[test]
    fn rejects_nested_relay_envelopes() {
        let nested = relay(relay(direct_event().to_string()).to_string());
        let error = normalize_event(nested).expect_err("nested relay should fail");
        assert_eq!(
            error,
            ProtocolError::malformed("nested relay envelopes are not supported")
        );
    }

    #[test]
    fn rejects_relay_record_without_message() {
        let event = json!({"Records": [{"Sns": {"Message": 42}}]});
        let error = normalize_event(event).expect_err("non-string message should fail");
        assert!(error.to_string().contains("Sns.Message"));
    }

    #[test]
    fn rejects_direct_event_missing_envelope_fields() {
        let mut event = direct_event();
        event.as_object_mut().expect("object").remove("StackId");
        let error = normalize_event(event).expect_err("missing StackId should fail");
        assert!(matches!(error, ProtocolError::MalformedEvent(_)));
    }

    #[test]
    fn recovers_identity_from_relay_even_when_incomplete() {
        let event = relay(
            json!({
                "RequestType": "Create",
                "ResponseURL": "https://example.com/callback",
                "RequestId": "request-1"
            })
            .to_string(),
        );
        assert!(normalize_event(event.clone()).is_err());

        let identity = recover_identity(&event);
        assert_eq!(
            identity.response_url.as_deref(),
            Some("https://example.com/callback")
        );
        assert_eq!(identity.request_id, "request-1");
        assert_eq!(identity.stack_id, "");
    }
}
