// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! # QScanner Lambda
//!
//! An event-triggered scan orchestrator for AWS Lambda functions.
//!
//! When a Lambda function is created or updated, EventBridge delivers the
//! CloudTrail API event to this function. The handler resolves the target
//! function, runs the Qualys QScanner binary against it, and records the
//! results.
//!
//! ## Architecture
//!
//! ```text
//! EventBridge -> Handler (this crate) -> qscanner (subprocess)
//!                     |
//!                     +-> Secrets Manager (scanner credentials)
//!                     +-> Lambda API / STS (function metadata)
//!                     +-> DynamoDB (scan cache)
//!                     +-> S3 + SNS (results)
//! ```
//!
//! The pipeline is: resolve target, fetch credentials, fetch metadata,
//! consult the scan cache (a fresh record for an unchanged code hash
//! short-circuits the scan), invoke the scanner with a bounded timeout,
//! then update the cache and fan results out to S3 and SNS. Cache writes
//! and result fan-out are best-effort: their failures are logged and never
//! fail the invocation.
//!
//! ## Modules
//!
//! - [`cache`]: scan-cache decision logic and the DynamoDB record store
//! - [`configuration`]: environment-driven options parsed with clap
//! - [`constants`]: fixed defaults for the application
//! - [`credentials`]: scanner credential retrieval and validation
//! - [`errors`]: scan pipeline error types
//! - [`event`]: target resolution from EventBridge payloads
//! - [`handler`]: the orchestrator tying the pipeline together
//! - [`metadata`]: Lambda function metadata retrieval, with assume-role
//!   support for cross-account scanning
//! - [`models`]: domain types shared across the pipeline
//! - [`scanner`]: subprocess invocation of the qscanner binary
//! - [`sink`]: S3 report persistence and SNS summary notification
//!
//! ## Security Considerations
//!
//! - Scanner credentials are fetched fresh per invocation, zeroized on
//!   drop, and never logged
//! - Cross-account access uses explicit short-lived STS credentials rather
//!   than mutated global client state
//! - The scanner subprocess is bounded by a hard wall-clock timeout

pub mod cache;
pub mod configuration;
pub mod constants;
pub mod credentials;
pub mod errors;
pub mod event;
pub mod handler;
pub mod metadata;
pub mod models;
pub mod scanner;
pub mod sink;
