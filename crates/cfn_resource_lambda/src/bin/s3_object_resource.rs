//! `Custom::S3Object`: an S3 object whose body is given inline.
//!
//! Properties: `Bucket`, `Key`, and exactly one of `Text` (string), `Binary`
//! (base64) or `Json` (any value). The physical id is the object ARN;
//! `Bucket` and `Key` are returned as attributes.
//!
//! Optional PutObject inputs: `ContentType`, `CacheControl`,
//! `ContentDisposition`, `ContentEncoding`, `ContentLanguage`, `ACL` (a canned
//! ACL name) and `Metadata` (a map of strings). Other PutObject parameters
//! such as encryption, tagging and object lock settings are not supported.

use std::collections::HashMap;

use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use base64::Engine;
use cfn_resource_core::contract::Properties;
use cfn_resource_core::validation::ResourceTypeSpec;
use cfn_resource_lambda::config::ResourceConfig;
use cfn_resource_lambda::handlers::lifecycle::{
    LifecycleOperations, OperationResult, ResourceContext,
};
use lambda_runtime::Error;
use serde_json::{json, Value};

const RESOURCE_TYPE: &str = "Custom::S3Object";
const BODY_PROPERTIES: [&str; 3] = ["Text", "Binary", "Json"];

/// Optional PutObject inputs read from properties of the same name.
#[derive(Debug, Default, PartialEq)]
struct ObjectOptions {
    content_type: Option<String>,
    cache_control: Option<String>,
    content_disposition: Option<String>,
    content_encoding: Option<String>,
    content_language: Option<String>,
    acl: Option<ObjectCannedAcl>,
    metadata: Option<HashMap<String, String>>,
}

struct S3ObjectResource {
    s3_client: aws_sdk_s3::Client,
    default_bucket: Option<String>,
}

impl S3ObjectResource {
    fn put(&self, resource: &mut ResourceContext<'_>) -> OperationResult {
        let bucket = match resource.property("Bucket").and_then(Value::as_str) {
            Some(value) => value.to_string(),
            None => self
                .default_bucket
                .clone()
                .ok_or("Bucket property is required")?,
        };
        let key = required_string(resource.properties(), "Key")?;
        let body = object_body(resource.properties())?;
        let options = object_options(resource.properties())?;

        let client = self.s3_client.clone();
        let target_bucket = bucket.clone();
        let object_key = key.clone();
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .put_object()
                    .bucket(target_bucket)
                    .key(object_key)
                    .set_content_type(options.content_type)
                    .set_cache_control(options.cache_control)
                    .set_content_disposition(options.content_disposition)
                    .set_content_encoding(options.content_encoding)
                    .set_content_language(options.content_language)
                    .set_acl(options.acl)
                    .set_metadata(options.metadata)
                    .body(ByteStream::from(body))
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| format!("failed to write object to s3: {error}"))
            })
        })?;

        resource.set_physical_resource_id(object_arn(&bucket, &key));
        Ok(json!({
            "Bucket": bucket,
            "Key": key,
        }))
    }

    fn remove(&self, resource: &mut ResourceContext<'_>) -> OperationResult {
        let physical_id = resource
            .physical_resource_id()
            .ok_or("physical resource id is required to delete an object")?;
        let (bucket, key) = parse_object_arn(physical_id)
            .ok_or_else(|| format!("not an S3 object ARN: {physical_id}"))?;

        let client = self.s3_client.clone();
        let target_bucket = bucket.to_string();
        let object_key = key.to_string();
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                match client
                    .delete_object()
                    .bucket(&target_bucket)
                    .key(&object_key)
                    .send()
                    .await
                {
                    Ok(_) => Ok(()),
                    Err(error) => {
                        let code = error.as_service_error().and_then(|service| service.code());
                        if matches!(code, Some("NoSuchBucket" | "NoSuchKey")) {
                            tracing::warn!(
                                bucket = %target_bucket,
                                key = %object_key,
                                "object already gone"
                            );
                            Ok(())
                        } else {
                            Err(format!("failed to delete object from s3: {error}"))
                        }
                    }
                }
            })
        })?;

        Ok(Value::Null)
    }
}

impl LifecycleOperations for S3ObjectResource {
    fn create(&self, resource: &mut ResourceContext<'_>) -> OperationResult {
        self.put(resource)
    }

    fn update(&self, resource: &mut ResourceContext<'_>) -> OperationResult {
        self.put(resource)
    }

    fn delete(&self, resource: &mut ResourceContext<'_>) -> OperationResult {
        self.remove(resource)
    }
}

fn required_string(properties: &Properties, name: &str) -> Result<String, String> {
    properties
        .get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| format!("{name} property is required"))
}

fn object_body(properties: &Properties) -> Result<Vec<u8>, String> {
    let present: Vec<&str> = BODY_PROPERTIES
        .into_iter()
        .filter(|name| properties.contains_key(*name))
        .collect();

    match present.as_slice() {
        [] => Err("No body specified; set one of Text, Binary or Json".to_string()),
        ["Text"] => required_string(properties, "Text").map(String::into_bytes),
        ["Binary"] => {
            let encoded = required_string(properties, "Binary")?;
            base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .map_err(|error| format!("Binary must be base64: {error}"))
        }
        ["Json"] => serde_json::to_vec(&properties["Json"])
            .map_err(|error| format!("failed to serialize Json body: {error}")),
        _ => {
            let listed = present.join(", ");
            Err(format!("Body specified multiple times: {listed}"))
        }
    }
}

fn object_options(properties: &Properties) -> Result<ObjectOptions, String> {
    let acl = optional_string(properties, "ACL")?;
    Ok(ObjectOptions {
        content_type: optional_string(properties, "ContentType")?,
        cache_control: optional_string(properties, "CacheControl")?,
        content_disposition: optional_string(properties, "ContentDisposition")?,
        content_encoding: optional_string(properties, "ContentEncoding")?,
        content_language: optional_string(properties, "ContentLanguage")?,
        acl: acl.as_deref().map(ObjectCannedAcl::from),
        metadata: object_metadata(properties)?,
    })
}

fn optional_string(properties: &Properties, name: &str) -> Result<Option<String>, String> {
    match properties.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(_) => Err(format!("{name} must be a string")),
    }
}

fn object_metadata(properties: &Properties) -> Result<Option<HashMap<String, String>>, String> {
    let Some(value) = properties.get("Metadata").filter(|value| !value.is_null()) else {
        return Ok(None);
    };
    let entries = value
        .as_object()
        .ok_or("Metadata must be a map of strings")?;
    entries
        .iter()
        .map(|(key, value)| match value.as_str() {
            Some(text) => Ok((key.clone(), text.to_string())),
            None => Err(format!("Metadata value for {key} must be a string")),
        })
        .collect::<Result<HashMap<_, _>, _>>()
        .map(Some)
}

fn object_arn(bucket: &str, key: &str) -> String {
    format!("arn:aws:s3:::{bucket}/{key}")
}

fn parse_object_arn(arn: &str) -> Option<(&str, &str)> {
    let resource = arn.strip_prefix("arn:aws:s3:::")?;
    let (bucket, key) = resource.split_once('/')?;
    (!bucket.is_empty() && !key.is_empty()).then_some((bucket, key))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let resource = S3ObjectResource {
        s3_client: aws_sdk_s3::Client::new(&aws_config),
        default_bucket: std::env::var("S3_OBJECT_DEFAULT_BUCKET").ok(),
    };

    let config = ResourceConfig::new(ResourceTypeSpec::exact(RESOURCE_TYPE))
        .with_generate_physical_id(false)
        .with_process_env()?;
    cfn_resource_lambda::runtime::run(resource, config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn properties(value: Value) -> Properties {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn text_body_is_used_verbatim() {
        let body = object_body(&properties(json!({"Text": "hello"}))).expect("text body");
        assert_eq!(body, b"hello");
    }

    #[test]
    fn binary_body_is_base64_decoded() {
        let body = object_body(&properties(json!({"Binary": "aGk="}))).expect("binary body");
        assert_eq!(body, b"hi");
    }

    #[test]
    fn json_body_is_serialized() {
        let body = object_body(&properties(json!({"Json": {"a": [1, 2]}}))).expect("json body");
        assert_eq!(body, br#"{"a":[1,2]}"#);
    }

    #[test]
    fn body_must_be_given_exactly_once() {
        let missing = object_body(&properties(json!({"Key": "k"}))).expect_err("no body");
        assert!(missing.contains("No body specified"));

        let both = properties(json!({"Text": "a", "Json": 1}));
        let twice = object_body(&both).expect_err("two bodies");
        assert_eq!(twice, "Body specified multiple times: Text, Json");
    }

    #[test]
    fn object_options_map_put_object_inputs() {
        let input = properties(json!({
            "Text": "a",
            "ContentType": "text/plain",
            "CacheControl": "max-age=60",
            "ContentEncoding": "gzip",
            "ACL": "public-read",
            "Metadata": {"owner": "team-a"}
        }));

        let options = object_options(&input).expect("valid options");
        assert_eq!(options.content_type.as_deref(), Some("text/plain"));
        assert_eq!(options.cache_control.as_deref(), Some("max-age=60"));
        assert_eq!(options.content_encoding.as_deref(), Some("gzip"));
        assert_eq!(options.content_disposition, None);
        assert_eq!(options.acl, Some(ObjectCannedAcl::PublicRead));
        assert_eq!(
            options.metadata,
            Some(HashMap::from([("owner".to_string(), "team-a".to_string())]))
        );
    }

    #[test]
    fn absent_options_are_left_unset() {
        let options = object_options(&properties(json!({"Text": "a"}))).expect("no options");
        assert_eq!(options, ObjectOptions::default());
    }

    #[test]
    fn non_string_options_are_rejected() {
        let error = object_options(&properties(json!({"CacheControl": 60}))).expect_err("number");
        assert_eq!(error, "CacheControl must be a string");

        let error = object_options(&properties(json!({"Metadata": {"size": 1}})))
            .expect_err("numeric metadata");
        assert_eq!(error, "Metadata value for size must be a string");
    }

    #[test]
    fn object_arn_round_trips() {
        let arn = object_arn("my-bucket", "path/to/object.json");
        assert_eq!(arn, "arn:aws:s3:::my-bucket/path/to/object.json");
        assert_eq!(
            parse_object_arn(&arn),
            Some(("my-bucket", "path/to/object.json"))
        );
        assert_eq!(parse_object_arn("arn:aws:s3:::bucket-only"), None);
        assert_eq!(parse_object_arn("not-an-arn"), None);
    }
}
