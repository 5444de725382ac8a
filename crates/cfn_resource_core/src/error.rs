use crate::contract::RequestType;

/// Every way an invocation can end up reporting `FAILED`.
///
/// The `Display` text is what the orchestrator sees as the response `Reason`,
/// so messages are written for a stack operator rather than for a developer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed event: {0}")]
    MalformedEvent(String),
    #[error("Unknown request type: {0}")]
    UnknownRequestType(String),
    #[error("Resource type {actual} does not match expected {expected}")]
    ResourceTypeMismatch { expected: String, actual: String },
    #[error("{field} is required for {request_type} requests")]
    MissingField {
        field: &'static str,
        request_type: RequestType,
    },
    #[error("Request failed validation: {0}")]
    Validation(String),
    #[error("Physical resource id was not set by the {0} operation")]
    PhysicalIdNotSet(RequestType),
    #[error("No operation registered for {0} requests")]
    NoOperationRegistered(RequestType),
    #[error("{0}")]
    UserOperation(String),
    #[error("Failed to deliver response: {0}")]
    Delivery(String),
}

impl ProtocolError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedEvent(message.into())
    }

    /// Stable identifier used in structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedEvent(_) => "malformed_event",
            Self::UnknownRequestType(_) => "unknown_request_type",
            Self::ResourceTypeMismatch { .. } => "resource_type_mismatch",
            Self::MissingField { .. } => "missing_required_field",
            Self::Validation(_) => "validation_rejected",
            Self::PhysicalIdNotSet(_) => "physical_id_not_set",
            Self::NoOperationRegistered(_) => "no_operation_registered",
            Self::UserOperation(_) => "user_operation_error",
            Self::Delivery(_) => "delivery_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_operation_message_is_passed_through_verbatim() {
        let error = ProtocolError::UserOperation("bucket already exists".to_string());
        assert_eq!(error.to_string(), "bucket already exists");
        assert_eq!(error.kind(), "user_operation_error");
    }

    #[test]
    fn missing_field_names_field_and_request_type() {
        let error = ProtocolError::MissingField {
            field: "OldResourceProperties",
            request_type: RequestType::Update,
        };
        assert_eq!(
            error.to_string(),
            "OldResourceProperties is required for Update requests"
        );
    }
}
