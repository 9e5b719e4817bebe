// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! The orchestrator.
//!
//! Drives one invocation through the pipeline:
//!
//! ```text
//! ResolveTarget -> FetchCredentials -> FetchMetadata -> CacheCheck
//!     -> Invoke -> UpdateCache + Store -> Success
//! ```
//!
//! A fresh cache record short-circuits before invocation with a 200
//! "skipped" response. Credentials are fetched and validated before the
//! cache check, so secret misconfiguration surfaces even for functions
//! whose scans are currently cached. Any pipeline failure terminates the
//! invocation with a 500 response; there are no retries here (the
//! triggering system owns redelivery).

use std::sync::Arc;
use std::time::Duration;

use aws_config::SdkConfig;
use lambda_runtime::LambdaEvent;
use serde_json::Value;

use crate::cache::{CacheStore, DynamoCacheStore, ScanCache};
use crate::configuration::ScannerOptions;
use crate::credentials::{self, SecretsManagerProvider, SecretsProvider};
use crate::errors::ScanError;
use crate::event::resolve_target;
use crate::metadata::{FunctionApi, LambdaFunctionApi};
use crate::models::HandlerResponse;
use crate::scanner::QScanner;
use crate::sink::{Notifier, ReportStore, ResultSink, S3ReportStore, SnsNotifier};

/// Shared per-container state: configuration plus the external
/// collaborators of the pipeline.
pub struct AppState {
    pub options: ScannerOptions,
    pub secrets: Arc<dyn SecretsProvider>,
    pub functions: Arc<dyn FunctionApi>,
    pub cache: ScanCache,
    pub sink: ResultSink,
    pub scanner: QScanner,
}

impl AppState {
    /// Wires the pipeline from explicit collaborators. Production uses
    /// [`AppState::from_aws`]; tests substitute in-memory implementations.
    pub fn new(
        options: ScannerOptions,
        secrets: Arc<dyn SecretsProvider>,
        functions: Arc<dyn FunctionApi>,
        cache_store: Option<Arc<dyn CacheStore>>,
        report_store: Option<Arc<dyn ReportStore>>,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Self {
        let cache = ScanCache::new(cache_store, options.cache_ttl_days);
        let sink = ResultSink::new(report_store, notifier);
        let scanner = QScanner::new(
            options.qscanner_path.clone(),
            Duration::from_secs(options.scan_timeout),
        );

        Self {
            options,
            secrets,
            functions,
            cache,
            sink,
            scanner,
        }
    }

    /// Builds the production state over the AWS SDK clients. Optional
    /// collaborators are wired only when their configuration is present.
    pub fn from_aws(options: ScannerOptions, sdk_config: &SdkConfig) -> Self {
        let secrets: Arc<dyn SecretsProvider> = Arc::new(SecretsManagerProvider::new(
            aws_sdk_secretsmanager::Client::new(sdk_config),
        ));
        let functions: Arc<dyn FunctionApi> = Arc::new(LambdaFunctionApi::new(sdk_config));

        let cache_store: Option<Arc<dyn CacheStore>> = options.cache_table.clone().map(|table| {
            Arc::new(DynamoCacheStore::new(
                aws_sdk_dynamodb::Client::new(sdk_config),
                table,
            )) as Arc<dyn CacheStore>
        });
        let report_store: Option<Arc<dyn ReportStore>> =
            options.results_bucket.clone().map(|bucket| {
                Arc::new(S3ReportStore::new(
                    aws_sdk_s3::Client::new(sdk_config),
                    bucket,
                )) as Arc<dyn ReportStore>
            });
        let notifier: Option<Arc<dyn Notifier>> = options.sns_topic_arn.clone().map(|topic| {
            Arc::new(SnsNotifier::new(
                aws_sdk_sns::Client::new(sdk_config),
                topic,
            )) as Arc<dyn Notifier>
        });

        Self::new(options, secrets, functions, cache_store, report_store, notifier)
    }
}

/// Lambda entry point: maps every pipeline failure into a failure response
/// rather than an invocation error, as the triggering system's redelivery
/// policy should not be driven by scan failures.
pub async fn function_handler(
    event: LambdaEvent<Value>,
    state: &AppState,
) -> Result<HandlerResponse, lambda_runtime::Error> {
    tracing::info!("[scanner] received event: {}", event.payload);

    Ok(match run_scan(&event.payload, state).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("[scanner] {}: {}", e.summary(), e);
            HandlerResponse::failure(&e)
        }
    })
}

/// The scan pipeline for one event.
#[tracing::instrument(skip(event, state))]
pub async fn run_scan(event: &Value, state: &AppState) -> Result<HandlerResponse, ScanError> {
    // 1. Resolve the target function from the event
    let target = resolve_target(event, &state.options)?;
    tracing::info!("[scanner] processing function: {}", target.resource_id);

    // 2. Fetch and validate scanner credentials. Done before the cache
    // check so credential errors surface even on a cache hit.
    let qualys_credentials =
        credentials::fetch_credentials(state.secrets.as_ref(), &state.options.qualys_secret_arn)
            .await?;

    // 3. Fetch the function's current configuration
    let metadata = state
        .functions
        .get_function(&target)
        .await
        .map_err(|e| ScanError::MetadataFetch(e.to_string()))?;
    tracing::info!("[scanner] package type: {}", metadata.package_type);

    // 4. Skip the scan when the cached record covers the current code hash
    if state
        .cache
        .check(&metadata.function_arn, metadata.code_sha256.as_deref())
        .await
    {
        return Ok(HandlerResponse::skipped(&target, &metadata));
    }

    // 5. Run the scanner subprocess
    let result = state
        .scanner
        .invoke(&target.resource_id, &qualys_credentials, &target.region)
        .await?;

    // 6. Post-scan bookkeeping, best-effort by design
    state.cache.update(&metadata, &result).await;
    state.sink.store(&metadata, &result).await;

    Ok(HandlerResponse::completed(&target, &metadata, &result))
}
