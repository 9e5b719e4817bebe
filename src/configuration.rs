// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use clap::Parser;

use crate::constants;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct ScannerOptions {
    /// Secrets Manager ARN holding the Qualys credentials.
    #[arg(long, env("QUALYS_SECRET_ARN"))]
    pub qualys_secret_arn: String,
    /// S3 bucket for full scan reports. Persistence is skipped when unset.
    #[arg(long, env("RESULTS_S3_BUCKET"))]
    pub results_bucket: Option<String>,
    /// SNS topic for scan summaries. Notification is skipped when unset.
    #[arg(long, env("SNS_TOPIC_ARN"))]
    pub sns_topic_arn: Option<String>,
    /// DynamoDB table for the scan cache. Every event triggers a scan when unset.
    #[arg(long, env("SCAN_CACHE_TABLE"))]
    pub cache_table: Option<String>,
    /// Wall-clock bound on a single qscanner run, in seconds.
    #[arg(long, default_value = "300", env("SCAN_TIMEOUT"))]
    pub scan_timeout: u64,
    /// Maximum age of a cache record before a rescan regardless of code hash.
    #[arg(long, default_value = "30", env("SCAN_CACHE_TTL_DAYS"))]
    pub cache_ttl_days: i64,
    #[arg(long, default_value = constants::DEFAULT_QSCANNER_PATH, env("QSCANNER_PATH"))]
    pub qscanner_path: String,
    /// Role to assume for metadata access when scanning another account's functions.
    #[arg(long, env("CROSS_ACCOUNT_ROLE_ARN"))]
    pub cross_account_role_arn: Option<String>,
}

impl Default for ScannerOptions {
    fn default() -> Self {
        ScannerOptions {
            qualys_secret_arn: String::new(),
            results_bucket: None,
            sns_topic_arn: None,
            cache_table: None,
            scan_timeout: 300,
            cache_ttl_days: 30,
            qscanner_path: constants::DEFAULT_QSCANNER_PATH.to_string(),
            cross_account_role_arn: None,
        }
    }
}
