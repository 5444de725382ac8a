//! `lambda_runtime` entry point wiring the dispatcher to the Lambda service.

use std::sync::Arc;

use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

use crate::adapters::response_sender::{HttpResponseSender, ResponseSender};
use crate::config::ResourceConfig;
use crate::context::InvocationContext;
use crate::handlers::dispatcher::handle_custom_resource_event;
use crate::handlers::lifecycle::LifecycleOperations;
use crate::logging::init_logging;

/// Serves `operations` until the Lambda service shuts the process down,
/// delivering responses over HTTP.
pub async fn run<O>(operations: O, config: ResourceConfig) -> Result<(), Error>
where
    O: LifecycleOperations + Send + Sync + 'static,
{
    run_with_sender(operations, config, HttpResponseSender::new()).await
}

/// Like [`run`], with a caller-supplied sender. Fails before serving if
/// `config` is invalid.
pub async fn run_with_sender<O, S>(
    operations: O,
    config: ResourceConfig,
    sender: S,
) -> Result<(), Error>
where
    O: LifecycleOperations + Send + Sync + 'static,
    S: ResponseSender + Send + Sync + 'static,
{
    init_logging();
    config.validate()?;
    tracing::info!(resource_type = ?config.resource_type, "custom resource handler starting");

    let operations = Arc::new(operations);
    let config = Arc::new(config);
    let sender = Arc::new(sender);

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let operations = Arc::clone(&operations);
        let config = Arc::clone(&config);
        let sender = Arc::clone(&sender);
        async move { handle_lambda_event(event, &*operations, &config, &*sender) }
    }))
    .await
}

/// Handles one Lambda invocation and returns the envelope that was reported.
pub fn handle_lambda_event(
    event: LambdaEvent<Value>,
    operations: &impl LifecycleOperations,
    config: &ResourceConfig,
    sender: &impl ResponseSender,
) -> Result<Value, Error> {
    let invocation = InvocationContext::from(&event.context);
    let outcome =
        handle_custom_resource_event(event.payload, &invocation, operations, config, sender)
            .map_err(|error| Error::from(error.to_string()))?;

    serde_json::to_value(&outcome.envelope)
        .map_err(|error| Error::from(format!("failed to serialize response envelope: {error}")))
}
