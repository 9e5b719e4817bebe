// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Scan-cache decision logic.
//!
//! One record per function ARN lives in a DynamoDB table; a record is a
//! valid hit only while the stored code hash matches the function's current
//! hash and the record is younger than the configured TTL. The policy is
//! deliberately asymmetric: lookup failures are treated as a miss (prefer
//! rescanning over skipping a needed scan), and write failures are logged
//! and swallowed (a failed cache write must not fail the scan).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::Utc;

use crate::constants::{
    CACHE_ATTR_CODE_SHA256, CACHE_ATTR_EXPIRES_AT, CACHE_ATTR_FUNCTION_ARN,
    CACHE_ATTR_SCAN_SUCCESS, CACHE_ATTR_SCAN_TIMESTAMP,
};
use crate::models::{CacheRecord, ResourceMetadata, ScanResult};

const SECS_PER_DAY: i64 = 86_400;

/// Key-value access to the prior-scan records.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, function_arn: &str) -> anyhow::Result<Option<CacheRecord>>;
    async fn put(&self, record: &CacheRecord) -> anyhow::Result<()>;
}

/// The scan cache with its hit/miss policy.
///
/// Unconfigured (no store) means every check is a miss and every update is
/// a no-op.
pub struct ScanCache {
    store: Option<Arc<dyn CacheStore>>,
    ttl_secs: i64,
}

impl ScanCache {
    pub fn new(store: Option<Arc<dyn CacheStore>>, ttl_days: i64) -> Self {
        Self {
            store,
            ttl_secs: ttl_days * SECS_PER_DAY,
        }
    }

    /// Whether a scan can be skipped for this function and code hash.
    ///
    /// Returns `false` (scan) when the cache is unconfigured, the hash is
    /// absent or empty, no record exists, the stored hash differs, the
    /// record has outlived the TTL, or the lookup itself fails.
    #[tracing::instrument(skip(self, code_sha256))]
    pub async fn check(&self, function_arn: &str, code_sha256: Option<&str>) -> bool {
        let Some(store) = self.store.as_ref() else {
            return false;
        };
        let Some(current) = code_sha256.filter(|hash| !hash.is_empty()) else {
            return false;
        };

        let record = match store.get(function_arn).await {
            Ok(record) => record,
            Err(e) => {
                // Fail open: a broken cache must not suppress scans
                tracing::warn!("[scanner] cache lookup failed, forcing scan: {}", e);
                return false;
            }
        };

        match record {
            Some(record) if record.is_fresh(current, Utc::now().timestamp(), self.ttl_secs) => {
                tracing::info!(
                    "[scanner] cache hit for {}, skipping scan",
                    function_arn
                );
                true
            }
            Some(_) => false,
            None => false,
        }
    }

    /// Upserts the record for this function after a completed scan.
    ///
    /// No-op when unconfigured or when the metadata carries no code hash.
    /// Failures are logged, never propagated.
    #[tracing::instrument(skip(self, metadata, result))]
    pub async fn update(&self, metadata: &ResourceMetadata, result: &ScanResult) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        let Some(code_sha256) = metadata.code_sha256.as_deref().filter(|h| !h.is_empty()) else {
            return;
        };

        let now = Utc::now().timestamp();
        let record = CacheRecord {
            function_arn: metadata.function_arn.clone(),
            code_sha256: code_sha256.to_string(),
            scan_timestamp: now,
            scan_success: result.success,
            expires_at: now + self.ttl_secs,
        };

        if let Err(e) = store.put(&record).await {
            tracing::error!("[scanner] failed to update scan cache: {}", e);
        }
    }
}

/// [`CacheStore`] backed by a DynamoDB table with TTL enabled on
/// `expires_at`.
pub struct DynamoCacheStore {
    client: aws_sdk_dynamodb::Client,
    table: String,
}

impl DynamoCacheStore {
    pub fn new(client: aws_sdk_dynamodb::Client, table: String) -> Self {
        Self { client, table }
    }
}

#[async_trait]
impl CacheStore for DynamoCacheStore {
    async fn get(&self, function_arn: &str) -> anyhow::Result<Option<CacheRecord>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table)
            .key(
                CACHE_ATTR_FUNCTION_ARN,
                AttributeValue::S(function_arn.to_string()),
            )
            .send()
            .await?;

        match output.item() {
            Some(item) => Ok(Some(record_from_item(item)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, record: &CacheRecord) -> anyhow::Result<()> {
        let mut request = self.client.put_item().table_name(&self.table);
        for (attr, value) in record_to_item(record) {
            request = request.item(attr, value);
        }
        request.send().await?;
        Ok(())
    }
}

/// Marshals a record into DynamoDB attributes.
pub fn record_to_item(record: &CacheRecord) -> HashMap<String, AttributeValue> {
    HashMap::from([
        (
            CACHE_ATTR_FUNCTION_ARN.to_string(),
            AttributeValue::S(record.function_arn.clone()),
        ),
        (
            CACHE_ATTR_CODE_SHA256.to_string(),
            AttributeValue::S(record.code_sha256.clone()),
        ),
        (
            CACHE_ATTR_SCAN_TIMESTAMP.to_string(),
            AttributeValue::N(record.scan_timestamp.to_string()),
        ),
        (
            CACHE_ATTR_SCAN_SUCCESS.to_string(),
            AttributeValue::Bool(record.scan_success),
        ),
        (
            CACHE_ATTR_EXPIRES_AT.to_string(),
            AttributeValue::N(record.expires_at.to_string()),
        ),
    ])
}

/// Unmarshals DynamoDB attributes into a record.
pub fn record_from_item(item: &HashMap<String, AttributeValue>) -> anyhow::Result<CacheRecord> {
    let string_attr = |attr: &str| -> anyhow::Result<String> {
        item.get(attr)
            .and_then(|value| value.as_s().ok())
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("cache item missing string attribute {attr}"))
    };
    let number_attr = |attr: &str| -> anyhow::Result<i64> {
        item.get(attr)
            .and_then(|value| value.as_n().ok())
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| anyhow::anyhow!("cache item missing numeric attribute {attr}"))
    };

    Ok(CacheRecord {
        function_arn: string_attr(CACHE_ATTR_FUNCTION_ARN)?,
        code_sha256: string_attr(CACHE_ATTR_CODE_SHA256)?,
        scan_timestamp: number_attr(CACHE_ATTR_SCAN_TIMESTAMP)?,
        scan_success: item
            .get(CACHE_ATTR_SCAN_SUCCESS)
            .and_then(|value| value.as_bool().ok())
            .copied()
            .unwrap_or(false),
        expires_at: number_attr(CACHE_ATTR_EXPIRES_AT)?,
    })
}
