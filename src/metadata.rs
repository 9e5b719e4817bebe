// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Function metadata retrieval.
//!
//! Fetches the target function's configuration from the Lambda API and
//! projects it into [`ResourceMetadata`]. For centralized scanning setups
//! the target may live in another account; in that case a cross-account
//! role is exchanged for short-lived STS credentials and a dedicated client
//! is built from them. Credentials are always injected explicitly into the
//! client configuration, never swapped into global state.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_credential_types::Credentials;
use aws_sdk_lambda::types::FunctionConfiguration;

use crate::constants::{ASSUME_ROLE_SESSION_NAME, DEFAULT_PACKAGE_TYPE, RUNTIME_NOT_APPLICABLE};
use crate::models::{ResourceMetadata, ScanTarget};

/// Read access to the function platform API.
#[async_trait]
pub trait FunctionApi: Send + Sync {
    async fn get_function(&self, target: &ScanTarget) -> anyhow::Result<ResourceMetadata>;
}

/// [`FunctionApi`] backed by the Lambda and STS APIs.
pub struct LambdaFunctionApi {
    sdk_config: SdkConfig,
    lambda: aws_sdk_lambda::Client,
    sts: aws_sdk_sts::Client,
}

impl LambdaFunctionApi {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            sdk_config: sdk_config.clone(),
            lambda: aws_sdk_lambda::Client::new(sdk_config),
            sts: aws_sdk_sts::Client::new(sdk_config),
        }
    }

    /// Exchanges the cross-account role for temporary credentials and
    /// returns a Lambda client configured with them.
    async fn assume_role_client(&self, role_arn: &str) -> anyhow::Result<aws_sdk_lambda::Client> {
        tracing::info!("[scanner] assuming cross-account role: {}", role_arn);

        let assumed = self
            .sts
            .assume_role()
            .role_arn(role_arn)
            .role_session_name(ASSUME_ROLE_SESSION_NAME)
            .send()
            .await?;

        let creds = assumed
            .credentials()
            .ok_or_else(|| anyhow::anyhow!("assume-role response carried no credentials"))?;

        Ok(client_with_credentials(
            &self.sdk_config,
            Credentials::new(
                creds.access_key_id(),
                creds.secret_access_key(),
                Some(creds.session_token().to_string()),
                None,
                "cross-account-assume-role",
            ),
        ))
    }
}

/// Builds a Lambda client from an explicit credential set.
pub fn client_with_credentials(
    sdk_config: &SdkConfig,
    credentials: Credentials,
) -> aws_sdk_lambda::Client {
    let config = aws_sdk_lambda::config::Builder::from(sdk_config)
        .credentials_provider(credentials)
        .build();
    aws_sdk_lambda::Client::from_conf(config)
}

#[async_trait]
impl FunctionApi for LambdaFunctionApi {
    #[tracing::instrument(skip(self, target), fields(resource_id = %target.resource_id))]
    async fn get_function(&self, target: &ScanTarget) -> anyhow::Result<ResourceMetadata> {
        let client = match target.cross_account_role.as_deref() {
            Some(role_arn) => self.assume_role_client(role_arn).await?,
            None => self.lambda.clone(),
        };

        let output = client
            .get_function()
            .function_name(&target.resource_id)
            .send()
            .await?;

        let configuration = output
            .configuration()
            .ok_or_else(|| anyhow::anyhow!("function response carried no configuration"))?;
        let image_uri = output.code().and_then(|code| code.image_uri());

        let metadata = project_metadata(configuration, image_uri);
        tracing::info!(
            "[scanner] retrieved details for function: {}",
            metadata.function_name
        );

        Ok(metadata)
    }
}

/// Projects the API response into [`ResourceMetadata`], applying the
/// runtime and package-type defaults.
pub fn project_metadata(
    configuration: &FunctionConfiguration,
    image_uri: Option<&str>,
) -> ResourceMetadata {
    ResourceMetadata {
        function_name: configuration.function_name().unwrap_or_default().to_string(),
        function_arn: configuration.function_arn().unwrap_or_default().to_string(),
        runtime: configuration
            .runtime()
            .map(|runtime| runtime.as_str().to_string())
            .unwrap_or_else(|| RUNTIME_NOT_APPLICABLE.to_string()),
        package_type: configuration
            .package_type()
            .map(|package_type| package_type.as_str().to_string())
            .unwrap_or_else(|| DEFAULT_PACKAGE_TYPE.to_string()),
        code_sha256: configuration.code_sha256().map(str::to_string),
        image_uri: image_uri.map(str::to_string),
        last_modified: configuration.last_modified().map(str::to_string),
        code_size: configuration.code_size(),
        memory_size: configuration.memory_size(),
        timeout: configuration.timeout(),
    }
}
