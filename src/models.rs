// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use zeroize::ZeroizeOnDrop;

use crate::constants::{SECRET_FIELD_ACCESS_TOKEN, SECRET_FIELD_POD};
use crate::errors::ScanError;

/// The function to scan, resolved from the inbound event.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanTarget {
    /// Fully-qualified function ARN.
    pub resource_id: String,
    /// Region the scanner operates in.
    pub region: String,
    /// Role to assume for metadata access, if scanning across accounts.
    pub cross_account_role: Option<String>,
}

/// Current configuration of the function under scan.
///
/// Fetched fresh per invocation and embedded verbatim in the persisted
/// report; only the ARN and code hash feed the cache record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceMetadata {
    pub function_name: String,
    pub function_arn: String,
    pub runtime: String,
    pub package_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    pub code_size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_size: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i32>,
}

#[derive(Deserialize)]
struct RawSecret {
    qualys_pod: Option<String>,
    qualys_access_token: Option<String>,
    registry_username: Option<String>,
    registry_password: Option<String>,
    registry_token: Option<String>,
}

/// Qualys scanner credentials, parsed from the Secrets Manager payload.
///
/// Zeroized on drop. Never cached and never serialized.
#[derive(Clone, ZeroizeOnDrop)]
pub struct QualysCredentials {
    pub pod: String,
    pub access_token: String,
    pub registry_username: Option<String>,
    pub registry_password: Option<String>,
    pub registry_token: Option<String>,
}

// Custom Debug implementation to prevent accidental logging of sensitive data
impl fmt::Debug for QualysCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QualysCredentials")
            .field("pod", &self.pod)
            .field("access_token", &"[REDACTED]")
            .field("registry_username", &"[REDACTED]")
            .field("registry_password", &"[REDACTED]")
            .field("registry_token", &"[REDACTED]")
            .finish()
    }
}

impl QualysCredentials {
    /// Parses the secret payload and validates the mandatory fields.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::CredentialValidation`] naming the first missing
    /// mandatory field, or describing the parse failure when the payload is
    /// not valid JSON.
    pub fn from_secret_string(secret: &str) -> Result<Self, ScanError> {
        let raw: RawSecret = serde_json::from_str(secret)
            .map_err(|_| ScanError::CredentialValidation("secret is not valid JSON".to_string()))?;

        let pod = raw.qualys_pod.filter(|v| !v.is_empty()).ok_or_else(|| {
            ScanError::CredentialValidation(format!("missing required field: {SECRET_FIELD_POD}"))
        })?;
        let access_token = raw
            .qualys_access_token
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                ScanError::CredentialValidation(format!(
                    "missing required field: {SECRET_FIELD_ACCESS_TOKEN}"
                ))
            })?;

        Ok(Self {
            pod,
            access_token,
            registry_username: raw.registry_username,
            registry_password: raw.registry_password,
            registry_token: raw.registry_token,
        })
    }
}

/// One prior-scan record per function ARN, stored in the cache table.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheRecord {
    pub function_arn: String,
    pub code_sha256: String,
    /// Epoch seconds of the recorded scan.
    pub scan_timestamp: i64,
    pub scan_success: bool,
    /// Absolute epoch-seconds expiry, enforced by the table's TTL setting.
    pub expires_at: i64,
}

impl CacheRecord {
    /// A record is a valid cache hit iff the stored hash matches the current
    /// one and the record is no older than the TTL window.
    pub fn is_fresh(&self, current_sha256: &str, now_epoch: i64, ttl_secs: i64) -> bool {
        self.code_sha256 == current_sha256 && now_epoch <= self.scan_timestamp + ttl_secs
    }
}

/// Normalized qscanner stdout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScanOutput {
    /// Stdout that did not parse as JSON, kept verbatim.
    Raw { raw_output: String, stderr: String },
    /// Parsed JSON report. Empty stdout yields an empty object.
    Structured(Value),
}

impl ScanOutput {
    /// The `vulnerabilities` sub-object of a structured report, if any.
    pub fn vulnerability_summary(&self) -> Option<&Value> {
        match self {
            Self::Structured(value) => value.get("vulnerabilities"),
            Self::Raw { .. } => None,
        }
    }
}

/// Outcome of a completed qscanner run.
///
/// Only produced for zero-exit runs; non-zero exits and timeouts surface as
/// [`ScanError`] instead. Both streams are captured in full for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub success: bool,
    pub exit_code: i32,
    pub results: ScanOutput,
    pub stdout: String,
    pub stderr: String,
}

/// The full document persisted to S3 for one scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    /// ISO-8601 UTC timestamp of the scan.
    pub scan_timestamp: String,
    pub lambda_function: ResourceMetadata,
    pub scan_results: ScanResult,
}

/// The handler's terminal output, shaped like an API Gateway proxy response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    /// JSON-encoded response details.
    pub body: String,
}

impl HandlerResponse {
    pub fn completed(target: &ScanTarget, metadata: &ResourceMetadata, result: &ScanResult) -> Self {
        Self {
            status_code: 200,
            body: serde_json::json!({
                "message": "Scan completed successfully",
                "function_arn": target.resource_id,
                "package_type": metadata.package_type,
                "scan_success": result.success,
            })
            .to_string(),
        }
    }

    pub fn skipped(target: &ScanTarget, metadata: &ResourceMetadata) -> Self {
        Self {
            status_code: 200,
            body: serde_json::json!({
                "message": "Scan skipped: cached result is current",
                "function_arn": target.resource_id,
                "package_type": metadata.package_type,
                "scan_success": true,
                "cached": true,
            })
            .to_string(),
        }
    }

    pub fn failure(error: &ScanError) -> Self {
        Self {
            status_code: 500,
            body: serde_json::json!({
                "message": error.summary(),
                "error": error.to_string(),
            })
            .to_string(),
        }
    }
}
