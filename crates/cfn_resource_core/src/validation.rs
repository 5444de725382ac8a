use std::collections::BTreeSet;

use crate::contract::{CanonicalRequest, InboundEvent, RequestType};
use crate::error::ProtocolError;

/// Which `ResourceType` values a resource implementation accepts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResourceTypeSpec {
    #[default]
    Unchecked,
    Exact(String),
    OneOf(BTreeSet<String>),
}

impl ResourceTypeSpec {
    pub fn exact(resource_type: impl Into<String>) -> Self {
        Self::Exact(resource_type.into())
    }

    pub fn one_of<I, S>(resource_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::OneOf(resource_types.into_iter().map(Into::into).collect())
    }

    pub fn accepts(&self, resource_type: &str) -> bool {
        match self {
            Self::Unchecked => true,
            Self::Exact(expected) => expected == resource_type,
            Self::OneOf(accepted) => accepted.contains(resource_type),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Unchecked => "any".to_string(),
            Self::Exact(expected) => expected.clone(),
            Self::OneOf(accepted) => accepted
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(" | "),
        }
    }
}

pub fn validate_request(
    event: InboundEvent,
    resource_types: &ResourceTypeSpec,
) -> Result<CanonicalRequest, ProtocolError> {
    let request_type = RequestType::parse(&event.request_type)
        .ok_or_else(|| ProtocolError::UnknownRequestType(event.request_type.clone()))?;

    if !resource_types.accepts(&event.resource_type) {
        return Err(ProtocolError::ResourceTypeMismatch {
            expected: resource_types.describe(),
            actual: event.resource_type,
        });
    }

    let supplied_id = event.physical_resource_id.filter(|id| !id.trim().is_empty());
    if request_type != RequestType::Create && supplied_id.is_none() {
        return Err(ProtocolError::MissingField {
            field: "PhysicalResourceId",
            request_type,
        });
    }
    let physical_resource_id = match request_type {
        RequestType::Create => None,
        RequestType::Update | RequestType::Delete => supplied_id,
    };

    let old_properties = match request_type {
        RequestType::Update => event.old_resource_properties,
        RequestType::Create | RequestType::Delete => None,
    };
    if request_type == RequestType::Update && old_properties.is_none() {
        return Err(ProtocolError::MissingField {
            field: "OldResourceProperties",
            request_type,
        });
    }

    Ok(CanonicalRequest {
        request_type,
        response_url: event.response_url,
        stack_id: event.stack_id,
        request_id: event.request_id,
        resource_type: event.resource_type,
        logical_resource_id: event.logical_resource_id,
        properties: event.resource_properties,
        physical_resource_id,
        old_properties,
    })
}
