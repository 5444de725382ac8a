use cfn_resource_core::validation::ResourceTypeSpec;
use cfn_resource_lambda::config::ResourceConfig;
use cfn_resource_lambda::handlers::lifecycle::{OperationResult, ResourceContext};
use cfn_resource_lambda::handlers::registry::OperationRegistry;
use lambda_runtime::Error;
use serde_json::Value;

const RESOURCE_TYPE: &str = "Custom::Echo";

/// Returns the resource properties as attributes. A `PhysicalResourceId`
/// property pins the id; otherwise the generated one is kept.
fn echo_properties(resource: &mut ResourceContext<'_>) -> OperationResult {
    let pinned_id = resource
        .property("PhysicalResourceId")
        .and_then(Value::as_str)
        .map(str::to_string);
    if let Some(id) = pinned_id {
        resource.set_physical_resource_id(id);
    }
    Ok(Value::Object(resource.properties().clone()))
}

fn forget(_resource: &mut ResourceContext<'_>) -> OperationResult {
    Ok(Value::Null)
}

fn build_registry() -> OperationRegistry {
    let mut registry = OperationRegistry::new();
    registry
        .on_create(echo_properties)
        .on_update(echo_properties)
        .on_delete(forget);
    registry
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = ResourceConfig::new(ResourceTypeSpec::exact(RESOURCE_TYPE)).with_process_env()?;
    cfn_resource_lambda::runtime::run(build_registry(), config).await
}
