//! Event builders for tests.

use serde_json::{json, Map, Value};

use crate::contract::{Properties, RequestType, RESPONSE_URL_SILENT};

pub const EXAMPLE_STACK_ID: &str =
    "arn:aws:cloudformation:us-west-2:123456789012:stack/example-stack-name/abc9dbf0-43c2-11e3-a6e8-50fa526be49c";
pub const EXAMPLE_REQUEST_ID: &str = "7bfe2d54710d48dcbc6f0b26fb68c9d1";
pub const EXAMPLE_LOGICAL_ID: &str = "MyLogicalResourceId";
pub const EXAMPLE_TOPIC_ARN: &str = "arn:aws:sns:us-east-1:123456789012:example-topic";

/// Builds direct protocol events.
///
/// Resource types without a `Custom::` prefix get one. Update and Delete
/// events default their physical id to the logical id, and Update events
/// default to empty old properties.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    request_type: RequestType,
    resource_type: String,
    properties: Properties,
    response_url: String,
    stack_id: String,
    request_id: String,
    logical_resource_id: String,
    physical_resource_id: Option<String>,
    old_properties: Option<Properties>,
    omit_physical_id: bool,
    omit_old_properties: bool,
}

impl RequestBuilder {
    pub fn new(request_type: RequestType, resource_type: &str) -> Self {
        let resource_type = if resource_type.starts_with("Custom::") {
            resource_type.to_string()
        } else {
            format!("Custom::{resource_type}")
        };
        Self {
            request_type,
            resource_type,
            properties: Map::new(),
            response_url: RESPONSE_URL_SILENT.to_string(),
            stack_id: EXAMPLE_STACK_ID.to_string(),
            request_id: EXAMPLE_REQUEST_ID.to_string(),
            logical_resource_id: EXAMPLE_LOGICAL_ID.to_string(),
            physical_resource_id: None,
            old_properties: None,
            omit_physical_id: false,
            omit_old_properties: false,
        }
    }

    pub fn create(resource_type: &str) -> Self {
        Self::new(RequestType::Create, resource_type)
    }

    pub fn update(resource_type: &str) -> Self {
        Self::new(RequestType::Update, resource_type)
    }

    pub fn delete(resource_type: &str) -> Self {
        Self::new(RequestType::Delete, resource_type)
    }

    /// The canonical example request: a Create with `Key` and `List` properties.
    pub fn example() -> Self {
        Self::create("Custom::ResourceTypeName").properties(json!({
            "Key": "Value",
            "List": ["1", "2", "3"]
        }))
    }

    pub fn properties(mut self, properties: Value) -> Self {
        self.properties = into_properties(properties);
        self
    }

    pub fn old_properties(mut self, properties: Value) -> Self {
        self.old_properties = Some(into_properties(properties));
        self
    }

    pub fn response_url(mut self, url: impl Into<String>) -> Self {
        self.response_url = url.into();
        self
    }

    pub fn stack_id(mut self, stack_id: impl Into<String>) -> Self {
        self.stack_id = stack_id.into();
        self
    }

    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    pub fn logical_resource_id(mut self, logical_resource_id: impl Into<String>) -> Self {
        self.logical_resource_id = logical_resource_id.into();
        self
    }

    pub fn physical_resource_id(mut self, physical_resource_id: impl Into<String>) -> Self {
        self.physical_resource_id = Some(physical_resource_id.into());
        self
    }

    pub fn without_physical_resource_id(mut self) -> Self {
        self.omit_physical_id = true;
        self
    }

    pub fn without_old_properties(mut self) -> Self {
        self.omit_old_properties = true;
        self
    }

    pub fn build(self) -> Value {
        let mut event = json!({
            "RequestType": self.request_type.as_str(),
            "ResponseURL": self.response_url,
            "StackId": self.stack_id,
            "RequestId": self.request_id,
            "ResourceType": self.resource_type,
            "LogicalResourceId": self.logical_resource_id.clone(),
            "ResourceProperties": self.properties,
        });

        if matches!(self.request_type, RequestType::Update | RequestType::Delete)
            && !self.omit_physical_id
        {
            let physical_id = self
                .physical_resource_id
                .unwrap_or(self.logical_resource_id);
            event["PhysicalResourceId"] = Value::String(physical_id);
        }

        if self.request_type == RequestType::Update && !self.omit_old_properties {
            event["OldResourceProperties"] = Value::Object(self.old_properties.unwrap_or_default());
        }

        event
    }
}

/// Wraps a direct event the way a topic subscription delivers it.
pub fn relay_envelope(event: &Value) -> Value {
    json!({
        "Records": [{
            "EventVersion": "1.0",
            "EventSubscriptionArn": format!("{EXAMPLE_TOPIC_ARN}:0b6941c3-f04d-4d3e-a66d-b1df00e1e381"),
            "EventSource": "aws:sns",
            "Sns": {
                "SignatureVersion": "1",
                "Timestamp": "1970-01-01T00:00:00.000Z",
                "Signature": "EXAMPLE",
                "SigningCertUrl": "EXAMPLE",
                "MessageId": "95df01b4-ee98-5cb9-9903-4c221d41eb5e",
                "Message": event.to_string(),
                "MessageAttributes": {},
                "Type": "Notification",
                "UnsubscribeUrl": "EXAMPLE",
                "TopicArn": EXAMPLE_TOPIC_ARN,
                "Subject": "TestInvoke"
            }
        }]
    })
}

fn into_properties(value: Value) -> Properties {
    match value {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => panic!("properties must be a JSON object, got {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::normalize_event;
    use crate::validation::{validate_request, ResourceTypeSpec};

    #[test]
    fn prefixes_custom_resource_type() {
        let event = RequestBuilder::create("Thing").build();
        assert_eq!(event["ResourceType"], json!("Custom::Thing"));
    }

    #[test]
    fn update_defaults_pass_validation() {
        let event = RequestBuilder::update("Thing").build();
        let request = validate_request(
            normalize_event(event).expect("normalizes"),
            &ResourceTypeSpec::exact("Custom::Thing"),
        )
        .expect("validates");
        assert_eq!(
            request.physical_resource_id.as_deref(),
            Some(EXAMPLE_LOGICAL_ID)
        );
        assert_eq!(request.old_properties, Some(Map::new()));
    }

    #[test]
    fn relay_envelope_round_trips_through_normalizer() {
        let event = RequestBuilder::example().build();
        assert_eq!(
            normalize_event(relay_envelope(&event)).expect("relay"),
            normalize_event(event).expect("direct")
        );
    }
}
