// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

/// Failures of the primary scan pipeline.
///
/// Every variant is fatal to the invocation and surfaces as a 500 response.
/// Post-scan bookkeeping (cache writes, S3 puts, SNS publishes) never maps
/// into this type; those failures are logged and swallowed at the call site.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ScanError {
    #[error("invalid event structure: missing 'detail' field")]
    MalformedEvent,
    #[error("could not extract function ARN from event")]
    UnresolvableTarget,
    #[error("function ARN is empty")]
    EmptyTarget,
    #[error("failed to retrieve scanner credentials: {0}")]
    SecretFetch(String),
    #[error("credential validation failed: {0}")]
    CredentialValidation(String),
    #[error("failed to get function details: {0}")]
    MetadataFetch(String),
    #[error("qscanner failed with exit code {0:?}: {1}")]
    ScanExecution(Option<i32>, String),
    #[error("scan timeout after {0} seconds")]
    ScanTimeout(u64),
}

impl ScanError {
    /// Short classification used as the `message` field of a failure response.
    pub fn summary(&self) -> &'static str {
        match self {
            Self::ScanExecution(_, _) | Self::ScanTimeout(_) => "Scan failed",
            _ => "Internal error",
        }
    }
}
