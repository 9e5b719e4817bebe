// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use clap::Parser;
use lambda_runtime::{Error, LambdaEvent, run, service_fn};
use qscanner_lambda::configuration::ScannerOptions;
use qscanner_lambda::handler::{AppState, function_handler};
use serde_json::Value;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        // this needs to be set to remove duplicated information in the log.
        .with_current_span(false)
        // this needs to be set to false, otherwise ANSI color codes will
        // show up in a confusing manner in CloudWatch logs.
        .with_ansi(false)
        // disabling time is handy because CloudWatch will add the ingestion time.
        .without_time()
        // remove the name of the function from every log entry
        .with_target(false)
        .init();

    // get configuration options from environment variables
    let options = ScannerOptions::parse();

    tracing::info!("[scanner] {:?}", &options);

    // clients are built once per container lifecycle and shared across invocations
    let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let state = Arc::new(AppState::from_aws(options, &sdk_config));

    run(service_fn(move |event: LambdaEvent<Value>| {
        let state = state.clone();
        async move { function_handler(event, &state).await }
    }))
    .await
}
