use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use cfn_resource_core::contract::{
    Attributes, CanonicalRequest, InboundEvent, RequestIdentity, RequestType, ResponseEnvelope,
    ResponseStatus,
};
use cfn_resource_core::error::ProtocolError;
use cfn_resource_core::event::{normalize_event, recover_identity};
use cfn_resource_core::identity::{
    failed_create_placeholder, generate_physical_id, is_failed_create_placeholder,
};
use cfn_resource_core::outputs::normalize_outputs;
use cfn_resource_core::validation::validate_request;
use serde_json::Value;

use crate::adapters::response_sender::ResponseSender;
use crate::config::ResourceConfig;
use crate::context::InvocationContext;
use crate::handlers::delivery::{deliver_response, DeliveryOutcome};
use crate::handlers::lifecycle::{panic_message, LifecycleOperations, ResourceContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Received,
    Validated,
    Dispatching,
    Succeeded,
    Failed,
    Responded,
}

impl RunPhase {
    fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Validated => "validated",
            Self::Dispatching => "dispatching",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Responded => "responded",
        }
    }
}

/// One execution of the dispatcher over a request. Discarded once the
/// response has been sent.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRun {
    pub phase: RunPhase,
    pub physical_resource_id: Option<String>,
    pub outputs: Attributes,
    pub status: Option<ResponseStatus>,
    pub failure_reason: Option<String>,
}

impl ResourceRun {
    fn received() -> Self {
        Self {
            phase: RunPhase::Received,
            physical_resource_id: None,
            outputs: Attributes::new(),
            status: None,
            failure_reason: None,
        }
    }

    fn advance(&mut self, phase: RunPhase, request_id: &str) {
        tracing::debug!(
            request_id,
            from = self.phase.as_str(),
            to = phase.as_str(),
            "run phase changed"
        );
        self.phase = phase;
    }

    fn succeed(&mut self, request_id: &str, physical_resource_id: String, outputs: Attributes) {
        self.physical_resource_id = Some(physical_resource_id);
        self.outputs = outputs;
        self.status = Some(ResponseStatus::Success);
        self.advance(RunPhase::Succeeded, request_id);
    }

    fn fail(&mut self, request_id: &str, physical_resource_id: String, error: &ProtocolError) {
        self.physical_resource_id = Some(physical_resource_id);
        self.outputs = Attributes::new();
        self.status = Some(ResponseStatus::Failed);
        self.failure_reason = Some(error.to_string());
        self.advance(RunPhase::Failed, request_id);
    }

    fn envelope(&self, identity: &RequestIdentity, success_reason: String) -> ResponseEnvelope {
        let physical_resource_id = self.physical_resource_id.clone().unwrap_or_default();
        match self.status {
            Some(ResponseStatus::Success) => ResponseEnvelope::success(
                identity,
                physical_resource_id,
                self.outputs.clone(),
                success_reason,
            ),
            _ => ResponseEnvelope::failure(
                identity,
                physical_resource_id,
                self.failure_reason.clone().unwrap_or_default(),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvocationOutcome {
    pub envelope: ResponseEnvelope,
    pub delivery: DeliveryOutcome,
    /// Why the run failed, when it did; present whether or not it was raised.
    pub error: Option<ProtocolError>,
}

/// Returned only when configuration asks for failures to be surfaced. The
/// response has already been delivered by the time this is produced.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{error}")]
pub struct InvocationError {
    pub error: ProtocolError,
    pub outcome: Box<InvocationOutcome>,
}

struct Dispatched {
    physical_resource_id: String,
    outputs: Attributes,
}

struct Failure {
    error: ProtocolError,
    /// Id held by the run when the failure happened.
    physical_resource_id: Option<String>,
}

impl Failure {
    fn before_dispatch(error: ProtocolError) -> Self {
        Self {
            error,
            physical_resource_id: None,
        }
    }
}

/// Runs one lifecycle event end to end: normalize, validate, dispatch to
/// exactly one operation, and report the outcome to the response address.
///
/// Every failure short of a delivery problem is turned into a FAILED
/// envelope with a non-empty physical id.
pub fn handle_custom_resource_event(
    event: Value,
    invocation: &InvocationContext,
    operations: &impl LifecycleOperations,
    config: &ResourceConfig,
    sender: &impl ResponseSender,
) -> Result<InvocationOutcome, InvocationError> {
    let started_at = Instant::now();
    let mut run = ResourceRun::received();
    tracing::info!(
        aws_request_id = %invocation.aws_request_id,
        "custom resource event received"
    );

    let (identity, result) = match normalize_event(event.clone()) {
        Ok(inbound) => {
            let identity = identity_of(&inbound);
            let result = process(inbound, invocation, operations, config, &mut run);
            (identity, result)
        }
        Err(error) => {
            let failure = Failure::before_dispatch(error);
            (recover_identity(&event), Err(failure))
        }
    };

    let failure = match result {
        Ok(dispatched) => {
            run.succeed(
                &identity.request_id,
                dispatched.physical_resource_id,
                dispatched.outputs,
            );
            None
        }
        Err(failure) => {
            let physical_resource_id = failure
                .physical_resource_id
                .or_else(|| identity.physical_resource_id.clone())
                .unwrap_or_else(|| {
                    failed_create_placeholder(
                        &identity.stack_id,
                        &identity.logical_resource_id,
                        config.physical_id_max_length,
                    )
                });
            tracing::error!(
                request_id = %identity.request_id,
                logical_resource_id = %identity.logical_resource_id,
                error_kind = failure.error.kind(),
                error = %failure.error,
                "custom resource run failed"
            );
            run.fail(&identity.request_id, physical_resource_id, &failure.error);
            Some(failure.error)
        }
    };

    let envelope = run.envelope(&identity, success_reason(invocation));
    let delivery = deliver_response(
        identity.response_url.as_deref(),
        &envelope,
        invocation,
        sender,
    );
    run.advance(RunPhase::Responded, &identity.request_id);
    tracing::info!(
        request_id = %identity.request_id,
        logical_resource_id = %identity.logical_resource_id,
        physical_resource_id = %envelope.physical_resource_id,
        status = %envelope.status,
        duration_ms = started_at.elapsed().as_millis() as u64,
        "custom resource event completed"
    );

    let outcome = InvocationOutcome {
        envelope,
        delivery,
        error: failure,
    };

    if config.raise_on_failure {
        if let Some(error) = outcome.error.clone() {
            return Err(InvocationError {
                error,
                outcome: Box::new(outcome),
            });
        }
    }

    if config.raise_on_delivery_failure {
        if let DeliveryOutcome::Failed { message } = &outcome.delivery {
            return Err(InvocationError {
                error: ProtocolError::Delivery(message.clone()),
                outcome: Box::new(outcome),
            });
        }
    }

    Ok(outcome)
}

fn process(
    inbound: InboundEvent,
    invocation: &InvocationContext,
    operations: &impl LifecycleOperations,
    config: &ResourceConfig,
    run: &mut ResourceRun,
) -> Result<Dispatched, Failure> {
    let request = validate_request(inbound, &config.resource_type)
        .map_err(Failure::before_dispatch)?;
    run.advance(RunPhase::Validated, &request.request_id);

    if let Err(error) = operations.validate(&request) {
        let error = ProtocolError::Validation(error.to_string());
        return Err(Failure::before_dispatch(error));
    }

    let request_type = request.request_type;
    if !operations.supports(request_type) {
        let error = ProtocolError::NoOperationRegistered(request_type);
        return Err(Failure::before_dispatch(error));
    }

    if let Some(placeholder) = skippable_delete(&request, config) {
        tracing::info!(
            request_id = %request.request_id,
            physical_resource_id = %placeholder,
            "delete of a resource whose create failed; nothing to delete"
        );
        return Ok(Dispatched {
            physical_resource_id: placeholder,
            outputs: Attributes::new(),
        });
    }

    let initial_physical_id = match request_type {
        RequestType::Create => config.generate_physical_id.then(|| {
            generate_physical_id(
                &request.stack_id,
                &request.logical_resource_id,
                config.physical_id_max_length,
            )
        }),
        RequestType::Update | RequestType::Delete => request.physical_resource_id.clone(),
    };

    run.physical_resource_id = initial_physical_id.clone();
    run.advance(RunPhase::Dispatching, &request.request_id);
    tracing::info!(
        request_id = %request.request_id,
        logical_resource_id = %request.logical_resource_id,
        request_type = %request_type,
        resource_type = %request.resource_type,
        "dispatching lifecycle operation"
    );

    let mut resource = ResourceContext::new(&request, invocation, initial_physical_id);
    let result = invoke_operation(operations, &mut resource);
    let assigned = resource.assigned_physical_resource_id();
    run.physical_resource_id = assigned.clone();

    let output = result.map_err(|error| Failure {
        error,
        physical_resource_id: assigned.clone(),
    })?;

    let physical_resource_id = match request_type {
        RequestType::Delete => assigned.or_else(|| request.physical_resource_id.clone()),
        RequestType::Create | RequestType::Update => assigned,
    };
    let Some(physical_resource_id) = physical_resource_id else {
        let error = ProtocolError::PhysicalIdNotSet(request_type);
        return Err(Failure::before_dispatch(error));
    };

    Ok(Dispatched {
        physical_resource_id,
        outputs: normalize_outputs(output, config.stringify_output),
    })
}

fn invoke_operation(
    operations: &impl LifecycleOperations,
    resource: &mut ResourceContext<'_>,
) -> Result<Value, ProtocolError> {
    let request_type = resource.request_type();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| match request_type {
        RequestType::Create => operations.create(resource),
        RequestType::Update => operations.update(resource),
        RequestType::Delete => operations.delete(resource),
    }));

    match outcome {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => {
            let message = error.to_string();
            let message = if message.trim().is_empty() {
                format!("{request_type} operation failed")
            } else {
                message
            };
            Err(ProtocolError::UserOperation(message))
        }
        Err(payload) => {
            let message = format!(
                "{request_type} operation panicked: {}",
                panic_message(payload.as_ref())
            );
            Err(ProtocolError::UserOperation(message))
        }
    }
}

fn skippable_delete(request: &CanonicalRequest, config: &ResourceConfig) -> Option<String> {
    if request.request_type != RequestType::Delete || !config.skip_delete_of_failed_create {
        return None;
    }
    request
        .physical_resource_id
        .clone()
        .filter(|id| is_failed_create_placeholder(id))
}

fn identity_of(inbound: &InboundEvent) -> RequestIdentity {
    let carries_identity = !matches!(
        RequestType::parse(&inbound.request_type),
        Some(RequestType::Create)
    );
    RequestIdentity {
        response_url: Some(inbound.response_url.clone()).filter(|url| !url.trim().is_empty()),
        stack_id: inbound.stack_id.clone(),
        request_id: inbound.request_id.clone(),
        logical_resource_id: inbound.logical_resource_id.clone(),
        physical_resource_id: inbound
            .physical_resource_id
            .clone()
            .filter(|id| carries_identity && !id.trim().is_empty()),
    }
}

fn success_reason(invocation: &InvocationContext) -> String {
    invocation
        .log_stream_name
        .as_deref()
        .map(|log_stream| format!("See the details in CloudWatch Log Stream: {log_stream}"))
        .unwrap_or_default()
}
