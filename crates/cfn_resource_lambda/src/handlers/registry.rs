use std::sync::Arc;

use cfn_resource_core::contract::RequestType;

use crate::handlers::lifecycle::{
    LifecycleOperations, OperationError, OperationResult, ResourceContext,
};

pub type LifecycleFn =
    Arc<dyn Fn(&mut ResourceContext<'_>) -> OperationResult + Send + Sync + 'static>;

/// Registration facade: free functions standing in for the three lifecycle
/// operations.
///
/// Registering a phase again replaces the earlier function. The registry is
/// an ordinary value handed to the dispatcher, so a process keeps one
/// instance for its lifetime and tests build or [`reset`](Self::reset) their
/// own.
#[derive(Clone, Default)]
pub struct OperationRegistry {
    create: Option<LifecycleFn>,
    update: Option<LifecycleFn>,
    delete: Option<LifecycleFn>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_create<F>(&mut self, operation: F) -> &mut Self
    where
        F: Fn(&mut ResourceContext<'_>) -> OperationResult + Send + Sync + 'static,
    {
        self.register(RequestType::Create, operation)
    }

    pub fn on_update<F>(&mut self, operation: F) -> &mut Self
    where
        F: Fn(&mut ResourceContext<'_>) -> OperationResult + Send + Sync + 'static,
    {
        self.register(RequestType::Update, operation)
    }

    pub fn on_delete<F>(&mut self, operation: F) -> &mut Self
    where
        F: Fn(&mut ResourceContext<'_>) -> OperationResult + Send + Sync + 'static,
    {
        self.register(RequestType::Delete, operation)
    }

    pub fn register<F>(&mut self, request_type: RequestType, operation: F) -> &mut Self
    where
        F: Fn(&mut ResourceContext<'_>) -> OperationResult + Send + Sync + 'static,
    {
        *self.slot_mut(request_type) = Some(Arc::new(operation));
        self
    }

    pub fn is_registered(&self, request_type: RequestType) -> bool {
        self.slot(request_type).is_some()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn slot(&self, request_type: RequestType) -> &Option<LifecycleFn> {
        match request_type {
            RequestType::Create => &self.create,
            RequestType::Update => &self.update,
            RequestType::Delete => &self.delete,
        }
    }

    fn slot_mut(&mut self, request_type: RequestType) -> &mut Option<LifecycleFn> {
        match request_type {
            RequestType::Create => &mut self.create,
            RequestType::Update => &mut self.update,
            RequestType::Delete => &mut self.delete,
        }
    }

    fn call(
        &self,
        request_type: RequestType,
        resource: &mut ResourceContext<'_>,
    ) -> OperationResult {
        match self.slot(request_type) {
            Some(operation) => operation(resource),
            None => Err(OperationError::from(format!(
                "No operation registered for {request_type} requests"
            ))),
        }
    }
}

impl std::fmt::Debug for OperationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationRegistry")
            .field("create", &self.create.is_some())
            .field("update", &self.update.is_some())
            .field("delete", &self.delete.is_some())
            .finish()
    }
}

impl LifecycleOperations for OperationRegistry {
    fn create(&self, resource: &mut ResourceContext<'_>) -> OperationResult {
        self.call(RequestType::Create, resource)
    }

    fn update(&self, resource: &mut ResourceContext<'_>) -> OperationResult {
        self.call(RequestType::Update, resource)
    }

    fn delete(&self, resource: &mut ResourceContext<'_>) -> OperationResult {
        self.call(RequestType::Delete, resource)
    }

    fn supports(&self, request_type: RequestType) -> bool {
        self.is_registered(request_type)
    }
}
