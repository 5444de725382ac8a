//! Lambda runtime integration for CloudFormation custom resources.
//!
//! This crate owns lifecycle dispatch, failure reporting, response delivery
//! and the registration facade, plus the `lambda_runtime` entry point. Wire
//! contract and validation primitives come from `cfn_resource_core`.

pub mod adapters;
pub mod config;
pub mod context;
pub mod handlers;
pub mod logging;
pub mod runtime;
