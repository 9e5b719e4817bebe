// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Scanner credential retrieval.
//!
//! The Qualys credentials live in a Secrets Manager secret whose payload is
//! JSON with two mandatory fields (`qualys_pod`, `qualys_access_token`) and
//! optional registry credentials for container-packaged functions. The
//! secret is fetched fresh on every invocation; parsing and validation live
//! on [`QualysCredentials::from_secret_string`].

use async_trait::async_trait;

use crate::errors::ScanError;
use crate::models::QualysCredentials;

/// Read access to the secret store.
#[async_trait]
pub trait SecretsProvider: Send + Sync {
    async fn get_secret_string(&self, secret_id: &str) -> anyhow::Result<String>;
}

/// [`SecretsProvider`] backed by AWS Secrets Manager.
pub struct SecretsManagerProvider {
    client: aws_sdk_secretsmanager::Client,
}

impl SecretsManagerProvider {
    pub fn new(client: aws_sdk_secretsmanager::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretsProvider for SecretsManagerProvider {
    async fn get_secret_string(&self, secret_id: &str) -> anyhow::Result<String> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .send()
            .await?;

        output
            .secret_string()
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("secret has no string payload"))
    }
}

/// Fetches and validates the scanner credentials.
///
/// The secret value itself is never logged; only the pod identifier is.
///
/// # Errors
///
/// - [`ScanError::SecretFetch`] when the secret store call fails
/// - [`ScanError::CredentialValidation`] when a mandatory field is missing
#[tracing::instrument(skip(provider))]
pub async fn fetch_credentials(
    provider: &dyn SecretsProvider,
    secret_id: &str,
) -> Result<QualysCredentials, ScanError> {
    let secret = provider
        .get_secret_string(secret_id)
        .await
        .map_err(|e| ScanError::SecretFetch(e.to_string()))?;

    let credentials = QualysCredentials::from_secret_string(&secret)?;

    tracing::info!(
        "[scanner] retrieved Qualys credentials for pod: {}",
        credentials.pod
    );

    Ok(credentials)
}
