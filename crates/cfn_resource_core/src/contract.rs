use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Response address that captures the envelope without any output.
pub const RESPONSE_URL_SILENT: &str = "www.example.com/silent";
/// Response address that captures the envelope and prints it for inspection.
pub const RESPONSE_URL_PRINT: &str = "www.example.com/print";

pub const STATUS_SUCCESS: &str = "SUCCESS";
pub const STATUS_FAILED: &str = "FAILED";

/// Attribute name used when an operation returns a single scalar.
pub const SCALAR_OUTPUT_KEY: &str = "Value";

pub type Properties = Map<String, Value>;
pub type Attributes = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

impl RequestType {
    pub const ALL: [RequestType; 3] = [Self::Create, Self::Update, Self::Delete];

    /// Case-insensitive parse of the wire value.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str().eq_ignore_ascii_case(trimmed))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Update => "Update",
            Self::Delete => "Delete",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A direct protocol event exactly as it appears on the wire.
///
/// Only the envelope fields are typed; the request type stays a string until
/// validation so that casing and unknown values are reported as protocol
/// failures rather than parse errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct InboundEvent {
    pub request_type: String,
    #[serde(rename = "ResponseURL")]
    pub response_url: String,
    pub stack_id: String,
    pub request_id: String,
    pub resource_type: String,
    pub logical_resource_id: String,
    #[serde(default)]
    pub resource_properties: Properties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_resource_properties: Option<Properties>,
}

/// A validated lifecycle request, independent of transport shape.
///
/// `physical_resource_id` is `Some` (and non-empty) exactly for Update and
/// Delete; `old_properties` is `Some` exactly for Update.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRequest {
    pub request_type: RequestType,
    pub response_url: String,
    pub stack_id: String,
    pub request_id: String,
    pub resource_type: String,
    pub logical_resource_id: String,
    pub properties: Properties,
    pub physical_resource_id: Option<String>,
    pub old_properties: Option<Properties>,
}

/// Identifying fields shared by every envelope sent for one request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestIdentity {
    pub response_url: Option<String>,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    pub physical_resource_id: Option<String>,
}

impl From<&CanonicalRequest> for RequestIdentity {
    fn from(request: &CanonicalRequest) -> Self {
        Self {
            response_url: Some(request.response_url.clone()),
            stack_id: request.stack_id.clone(),
            request_id: request.request_id.clone(),
            logical_resource_id: request.logical_resource_id.clone(),
            physical_resource_id: request.physical_resource_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseStatus {
    Success,
    Failed,
}

impl ResponseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => STATUS_SUCCESS,
            Self::Failed => STATUS_FAILED,
        }
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The record delivered to the orchestrator's callback address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ResponseEnvelope {
    pub status: ResponseStatus,
    pub reason: String,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    pub data: Attributes,
}

impl ResponseEnvelope {
    pub fn success(
        identity: &RequestIdentity,
        physical_resource_id: String,
        data: Attributes,
        reason: String,
    ) -> Self {
        Self {
            status: ResponseStatus::Success,
            reason,
            physical_resource_id,
            stack_id: identity.stack_id.clone(),
            request_id: identity.request_id.clone(),
            logical_resource_id: identity.logical_resource_id.clone(),
            data,
        }
    }

    pub fn failure(
        identity: &RequestIdentity,
        physical_resource_id: String,
        reason: String,
    ) -> Self {
        Self {
            status: ResponseStatus::Failed,
            reason,
            physical_resource_id,
            stack_id: identity.stack_id.clone(),
            request_id: identity.request_id.clone(),
            logical_resource_id: identity.logical_resource_id.clone(),
            data: Attributes::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }

    /// Serialized body as sent on the wire.
    pub fn to_body(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
