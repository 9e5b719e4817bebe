// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_QSCANNER_PATH: &str = "/opt/qscanner";
/// Sentinel for functions whose configuration reports no runtime
/// (container-image packages).
pub const RUNTIME_NOT_APPLICABLE: &str = "N/A";
pub const DEFAULT_PACKAGE_TYPE: &str = "Zip";
pub const ASSUME_ROLE_SESSION_NAME: &str = "QScannerSession";
/// S3 key prefix for persisted scan reports: `scans/<function>/<timestamp>.json`.
pub const RESULTS_KEY_PREFIX: &str = "scans";

// qscanner CLI contract
pub const SCAN_OUTPUT_FORMAT: &str = "json";
pub const SCAN_SUBCOMMAND: &str = "lambda";
pub const ENV_AWS_REGION: &str = "AWS_REGION";
pub const ENV_REGISTRY_USERNAME: &str = "QSCANNER_REGISTRY_USERNAME";
pub const ENV_REGISTRY_PASSWORD: &str = "QSCANNER_REGISTRY_PASSWORD";
pub const ENV_REGISTRY_TOKEN: &str = "QSCANNER_REGISTRY_TOKEN";

// Mandatory fields of the scanner secret
pub const SECRET_FIELD_POD: &str = "qualys_pod";
pub const SECRET_FIELD_ACCESS_TOKEN: &str = "qualys_access_token";

// DynamoDB cache table attributes
pub const CACHE_ATTR_FUNCTION_ARN: &str = "function_arn";
pub const CACHE_ATTR_CODE_SHA256: &str = "code_sha256";
pub const CACHE_ATTR_SCAN_TIMESTAMP: &str = "scan_timestamp";
pub const CACHE_ATTR_SCAN_SUCCESS: &str = "scan_success";
/// Epoch-seconds attribute the table's TTL setting expires on.
pub const CACHE_ATTR_EXPIRES_AT: &str = "expires_at";
