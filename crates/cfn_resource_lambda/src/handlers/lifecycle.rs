use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use cfn_resource_core::contract::{CanonicalRequest, Properties, RequestType};
use serde_json::Value;

use crate::context::InvocationContext;

/// Error type user operations return; any error converts into it with `?`.
pub type OperationError = Box<dyn std::error::Error + Send + Sync>;

/// `Value::Null` means no outputs, an object is the attribute set, and any
/// other value becomes the single `Value` attribute.
pub type OperationResult = Result<Value, OperationError>;

/// User logic realizing the three lifecycle transitions of one resource type.
///
/// Implement it directly on a resource type, or register free functions on
/// an [`OperationRegistry`](crate::handlers::registry::OperationRegistry).
pub trait LifecycleOperations {
    fn create(&self, resource: &mut ResourceContext<'_>) -> OperationResult;

    fn update(&self, resource: &mut ResourceContext<'_>) -> OperationResult;

    fn delete(&self, resource: &mut ResourceContext<'_>) -> OperationResult;

    /// Resource-specific checks run after protocol validation and before any
    /// operation. Rejecting the request reports FAILED with the message.
    fn validate(&self, _request: &CanonicalRequest) -> Result<(), OperationError> {
        Ok(())
    }

    fn supports(&self, _request_type: RequestType) -> bool {
        true
    }
}

impl<T: LifecycleOperations + ?Sized> LifecycleOperations for Arc<T> {
    fn create(&self, resource: &mut ResourceContext<'_>) -> OperationResult {
        (**self).create(resource)
    }

    fn update(&self, resource: &mut ResourceContext<'_>) -> OperationResult {
        (**self).update(resource)
    }

    fn delete(&self, resource: &mut ResourceContext<'_>) -> OperationResult {
        (**self).delete(resource)
    }

    fn validate(&self, request: &CanonicalRequest) -> Result<(), OperationError> {
        (**self).validate(request)
    }

    fn supports(&self, request_type: RequestType) -> bool {
        (**self).supports(request_type)
    }
}

/// Text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic payload"
    }
}

/// What an operation sees of the current run: the validated request, the
/// host context, and the physical id it may read or replace.
#[derive(Debug)]
pub struct ResourceContext<'a> {
    request: &'a CanonicalRequest,
    invocation: &'a InvocationContext,
    physical_resource_id: Option<String>,
}

impl<'a> ResourceContext<'a> {
    pub fn new(
        request: &'a CanonicalRequest,
        invocation: &'a InvocationContext,
        physical_resource_id: Option<String>,
    ) -> Self {
        Self {
            request,
            invocation,
            physical_resource_id,
        }
    }

    pub fn request(&self) -> &CanonicalRequest {
        self.request
    }

    pub fn request_type(&self) -> RequestType {
        self.request.request_type
    }

    pub fn resource_type(&self) -> &str {
        &self.request.resource_type
    }

    pub fn logical_resource_id(&self) -> &str {
        &self.request.logical_resource_id
    }

    pub fn stack_id(&self) -> &str {
        &self.request.stack_id
    }

    pub fn properties(&self) -> &Properties {
        &self.request.properties
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.request.properties.get(key)
    }

    /// Previous properties; only present for Update.
    pub fn old_properties(&self) -> Option<&Properties> {
        self.request.old_properties.as_ref()
    }

    pub fn physical_resource_id(&self) -> Option<&str> {
        self.physical_resource_id.as_deref()
    }

    pub fn set_physical_resource_id(&mut self, physical_resource_id: impl Into<String>) {
        self.physical_resource_id = Some(physical_resource_id.into());
    }

    pub fn invocation(&self) -> &InvocationContext {
        self.invocation
    }

    pub fn remaining_time(&self) -> Option<Duration> {
        self.invocation.remaining_time()
    }

    /// Current id, ignoring empty assignments.
    pub(crate) fn assigned_physical_resource_id(&self) -> Option<String> {
        self.physical_resource_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .map(str::to_string)
    }
}
