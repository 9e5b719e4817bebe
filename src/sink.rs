// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Result persistence and notification fan-out.
//!
//! A completed scan produces a full [`ScanReport`] written to S3 under
//! `scans/<function>/<timestamp>.json` (server-side encryption requested)
//! and a compact summary published to SNS. Both halves are best-effort:
//! either can be unconfigured, and a failure in one is logged without
//! affecting the other or the invocation's outcome.

use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ServerSideEncryption;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;

use crate::constants::{RESULTS_KEY_PREFIX, RUNTIME_NOT_APPLICABLE};
use crate::models::{ResourceMetadata, ScanReport, ScanResult};

/// Durable object storage for full reports.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn put_report(&self, key: &str, body: Vec<u8>) -> anyhow::Result<()>;
}

/// Pub/sub delivery of scan summaries.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, subject: &str, message: String) -> anyhow::Result<()>;
}

/// The fan-out sink for completed scans.
pub struct ResultSink {
    store: Option<Arc<dyn ReportStore>>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl ResultSink {
    pub fn new(store: Option<Arc<dyn ReportStore>>, notifier: Option<Arc<dyn Notifier>>) -> Self {
        Self { store, notifier }
    }

    /// Persists the report and publishes the summary, best-effort.
    #[tracing::instrument(skip(self, metadata, result))]
    pub async fn store(&self, metadata: &ResourceMetadata, result: &ScanResult) {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

        if let Some(store) = self.store.as_ref() {
            let key = report_key(&metadata.function_name, &timestamp);
            let report = ScanReport {
                scan_timestamp: timestamp.clone(),
                lambda_function: metadata.clone(),
                scan_results: result.clone(),
            };
            match serde_json::to_vec_pretty(&report) {
                Ok(body) => match store.put_report(&key, body).await {
                    Ok(()) => tracing::info!("[scanner] stored results at {}", key),
                    Err(e) => tracing::error!("[scanner] failed to store results in S3: {}", e),
                },
                Err(e) => tracing::error!("[scanner] failed to serialize scan report: {}", e),
            }
        }

        if let Some(notifier) = self.notifier.as_ref() {
            let subject = format!("QScanner Results: {}", metadata.function_name);
            let message = summary_message(metadata, result, &timestamp).to_string();
            match notifier.publish(&subject, message).await {
                Ok(()) => tracing::info!("[scanner] sent scan notification"),
                Err(e) => tracing::error!("[scanner] failed to send SNS notification: {}", e),
            }
        }
    }
}

/// Object key for one report: `scans/<function>/<iso8601>.json`.
pub fn report_key(function_name: &str, timestamp: &str) -> String {
    format!("{RESULTS_KEY_PREFIX}/{function_name}/{timestamp}.json")
}

/// The summary published to the notification topic. The vulnerability
/// summary appears only when the structured report carries one.
pub fn summary_message(metadata: &ResourceMetadata, result: &ScanResult, timestamp: &str) -> Value {
    let mut message = serde_json::json!({
        "function_name": metadata.function_name,
        "function_arn": metadata.function_arn,
        "scan_timestamp": timestamp,
        "scan_success": result.success,
        "image_uri": metadata.image_uri.as_deref().unwrap_or(RUNTIME_NOT_APPLICABLE),
    });

    if let Some(summary) = result.results.vulnerability_summary() {
        message["vulnerability_summary"] = summary.clone();
    }

    message
}

/// [`ReportStore`] backed by an S3 bucket, with AES-256 server-side
/// encryption requested on every put.
pub struct S3ReportStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ReportStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl ReportStore for S3ReportStore {
    async fn put_report(&self, key: &str, body: Vec<u8>) -> anyhow::Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type("application/json")
            .server_side_encryption(ServerSideEncryption::Aes256)
            .send()
            .await?;
        Ok(())
    }
}

/// [`Notifier`] backed by an SNS topic.
pub struct SnsNotifier {
    client: aws_sdk_sns::Client,
    topic_arn: String,
}

impl SnsNotifier {
    pub fn new(client: aws_sdk_sns::Client, topic_arn: String) -> Self {
        Self { client, topic_arn }
    }
}

#[async_trait]
impl Notifier for SnsNotifier {
    async fn publish(&self, subject: &str, message: String) -> anyhow::Result<()> {
        self.client
            .publish()
            .topic_arn(&self.topic_arn)
            .subject(subject)
            .message(message)
            .send()
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScanOutput;
    use serde_json::json;
    use std::sync::Mutex;

    struct MemoryReports(Mutex<Vec<(String, Vec<u8>)>>);

    #[async_trait]
    impl ReportStore for MemoryReports {
        async fn put_report(&self, key: &str, body: Vec<u8>) -> anyhow::Result<()> {
            self.0.lock().unwrap().push((key.to_string(), body));
            Ok(())
        }
    }

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn publish(&self, _subject: &str, _message: String) -> anyhow::Result<()> {
            anyhow::bail!("topic gone")
        }
    }

    fn metadata() -> ResourceMetadata {
        ResourceMetadata {
            function_name: "orders".to_string(),
            function_arn: "arn:aws:lambda:us-east-1:123:function:orders".to_string(),
            runtime: "python3.12".to_string(),
            package_type: "Zip".to_string(),
            code_sha256: Some("abc".to_string()),
            image_uri: None,
            last_modified: None,
            code_size: 1024,
            memory_size: Some(128),
            timeout: Some(15),
        }
    }

    fn result(output: ScanOutput) -> ScanResult {
        ScanResult {
            success: true,
            exit_code: 0,
            results: output,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    #[test]
    fn test_report_key_layout() {
        let key = report_key("orders", "2026-08-23T12:00:00.000000Z");
        assert_eq!(key, "scans/orders/2026-08-23T12:00:00.000000Z.json");
    }

    #[test]
    fn test_summary_includes_vulnerabilities_when_present() {
        let result = result(ScanOutput::Structured(
            json!({"vulnerabilities": {"high": 2, "low": 5}}),
        ));
        let message = summary_message(&metadata(), &result, "ts");
        assert_eq!(message["vulnerability_summary"], json!({"high": 2, "low": 5}));
        assert_eq!(message["image_uri"], "N/A");
    }

    #[test]
    fn test_summary_omits_vulnerabilities_when_absent() {
        let result = result(ScanOutput::Structured(json!({"findings": []})));
        let message = summary_message(&metadata(), &result, "ts");
        assert!(message.get("vulnerability_summary").is_none());
    }

    #[tokio::test]
    async fn test_store_writes_timestamped_report() {
        let reports = Arc::new(MemoryReports(Mutex::new(Vec::new())));
        let sink = ResultSink::new(Some(reports.clone()), None);

        sink.store(&metadata(), &result(ScanOutput::Structured(json!({})))).await;

        let stored = reports.0.lock().unwrap();
        assert_eq!(stored.len(), 1);
        let (key, body) = &stored[0];
        assert!(key.starts_with("scans/orders/"));
        assert!(key.ends_with(".json"));

        let report: Value = serde_json::from_slice(body).unwrap();
        assert_eq!(report["lambda_function"]["function_name"], "orders");
        // Timestamp in the key matches the one embedded in the report
        assert!(key.contains(report["scan_timestamp"].as_str().unwrap()));
    }

    #[tokio::test]
    async fn test_notifier_failure_does_not_block_persistence() {
        let reports = Arc::new(MemoryReports(Mutex::new(Vec::new())));
        let sink = ResultSink::new(Some(reports.clone()), Some(Arc::new(FailingNotifier)));

        sink.store(&metadata(), &result(ScanOutput::Structured(json!({})))).await;

        assert_eq!(reports.0.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unconfigured_sink_is_a_noop() {
        let sink = ResultSink::new(None, None);
        sink.store(&metadata(), &result(ScanOutput::Structured(json!({})))).await;
    }
}
