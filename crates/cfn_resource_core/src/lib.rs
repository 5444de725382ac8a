//! Shared CloudFormation custom resource protocol primitives.
//!
//! This crate owns the wire contract, inbound event normalization, request
//! validation, output normalization and physical id generation. It
//! intentionally excludes the Lambda runtime, HTTP delivery and user
//! lifecycle dispatch; those live in `cfn_resource_lambda`.

pub mod contract;
pub mod error;
pub mod event;
#[cfg(any(test, feature = "test-helpers"))]
pub mod fixtures;
pub mod identity;
pub mod outputs;
pub mod validation;
