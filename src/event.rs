// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Target resolution from EventBridge payloads.
//!
//! EventBridge delivers CloudTrail API events for `CreateFunction` and
//! `UpdateFunctionCode` calls. The function ARN lives in different places
//! depending on the API call:
//!
//! 1. `detail.responseElements.functionArn` for calls whose response echoes
//!    the ARN directly
//! 2. `detail.requestParameters.functionName` for updates, in which case the
//!    ARN is reconstructed from the event's account and region

use serde_json::Value;

use crate::configuration::ScannerOptions;
use crate::constants::DEFAULT_REGION;
use crate::errors::ScanError;
use crate::models::ScanTarget;

/// Resolves the [`ScanTarget`] from a raw EventBridge payload.
///
/// # Errors
///
/// - [`ScanError::MalformedEvent`] when the payload has no `detail` object
/// - [`ScanError::UnresolvableTarget`] when neither the response ARN nor a
///   request function name is present
/// - [`ScanError::EmptyTarget`] when resolution yields an empty string
pub fn resolve_target(event: &Value, options: &ScannerOptions) -> Result<ScanTarget, ScanError> {
    let detail = event.get("detail").ok_or(ScanError::MalformedEvent)?;
    if !detail.is_object() {
        return Err(ScanError::MalformedEvent);
    }

    let function_arn = match response_arn(detail) {
        Some(arn) => arn.to_string(),
        None => reconstructed_arn(event, detail)?,
    };

    if function_arn.is_empty() {
        return Err(ScanError::EmptyTarget);
    }

    Ok(ScanTarget {
        resource_id: function_arn,
        region: scan_region(event),
        cross_account_role: options.cross_account_role_arn.clone(),
    })
}

/// The ARN echoed in `responseElements`, if present and non-empty.
fn response_arn(detail: &Value) -> Option<&str> {
    detail
        .get("responseElements")?
        .get("functionArn")?
        .as_str()
        .filter(|arn| !arn.is_empty())
}

/// Reconstructs the ARN from `requestParameters.functionName` plus the
/// event's account and region metadata.
fn reconstructed_arn(event: &Value, detail: &Value) -> Result<String, ScanError> {
    let function_name = detail
        .get("requestParameters")
        .and_then(|params| params.get("functionName"))
        .and_then(Value::as_str)
        .ok_or(ScanError::UnresolvableTarget)?;

    if function_name.is_empty() {
        return Err(ScanError::EmptyTarget);
    }

    let account_id = event
        .get("account")
        .and_then(Value::as_str)
        .or_else(|| {
            detail
                .get("userIdentity")
                .and_then(|identity| identity.get("accountId"))
                .and_then(Value::as_str)
        })
        .unwrap_or_default();

    let region = event
        .get("region")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_REGION);

    Ok(format!(
        "arn:aws:lambda:{region}:{account_id}:function:{function_name}"
    ))
}

/// Region the scanner runs against: the event's region, else the execution
/// environment's, else the fixed default.
fn scan_region(event: &Value) -> String {
    event
        .get("region")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| std::env::var(crate::constants::ENV_AWS_REGION).ok())
        .unwrap_or_else(|| DEFAULT_REGION.to_string())
}
