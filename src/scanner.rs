// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Subprocess invocation of the qscanner binary.
//!
//! The scanner is an opaque external tool with a fixed CLI contract:
//!
//! ```text
//! qscanner --pod <pod> --access-token <token> --output-format json lambda <arn>
//! ```
//!
//! `AWS_REGION` is set in the child's environment; the execution role's
//! ambient `AWS_*` credentials are inherited for the platform calls the
//! binary performs itself. Registry credentials, when present in the
//! secret, are forwarded through `QSCANNER_REGISTRY_*` variables for
//! container-packaged functions.
//!
//! Both output streams are captured in full (downstream persistence needs
//! the complete report) and the run is bounded by a hard wall-clock
//! timeout, after which the child is killed.

use std::path::PathBuf;
use std::time::Duration;

use tokio::process::Command;

use crate::constants::{
    ENV_AWS_REGION, ENV_REGISTRY_PASSWORD, ENV_REGISTRY_TOKEN, ENV_REGISTRY_USERNAME,
    SCAN_OUTPUT_FORMAT, SCAN_SUBCOMMAND,
};
use crate::errors::ScanError;
use crate::models::{QualysCredentials, ScanOutput, ScanResult};

pub struct QScanner {
    path: PathBuf,
    timeout: Duration,
}

impl QScanner {
    pub fn new(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
        }
    }

    /// Runs the scanner against one function.
    ///
    /// # Errors
    ///
    /// - [`ScanError::ScanTimeout`] when the wall-clock bound elapses
    /// - [`ScanError::ScanExecution`] when the process cannot be spawned or
    ///   exits non-zero; captured stderr is carried in the error
    ///
    /// A zero exit whose stdout fails to parse as JSON is not a failure:
    /// the verbatim output is kept as [`ScanOutput::Raw`].
    #[tracing::instrument(skip(self, credentials))]
    pub async fn invoke(
        &self,
        resource_id: &str,
        credentials: &QualysCredentials,
        region: &str,
    ) -> Result<ScanResult, ScanError> {
        let mut command = Command::new(&self.path);
        command
            .args(["--pod", credentials.pod.as_str()])
            .args(["--access-token", credentials.access_token.as_str()])
            .args(["--output-format", SCAN_OUTPUT_FORMAT])
            .args([SCAN_SUBCOMMAND, resource_id])
            .env(ENV_AWS_REGION, region)
            .kill_on_drop(true);

        if let Some(username) = &credentials.registry_username {
            command.env(ENV_REGISTRY_USERNAME, username);
        }
        if let Some(password) = &credentials.registry_password {
            command.env(ENV_REGISTRY_PASSWORD, password);
        }
        if let Some(token) = &credentials.registry_token {
            command.env(ENV_REGISTRY_TOKEN, token);
        }

        tracing::info!(
            "[scanner] executing: {} --pod {} --access-token [REDACTED] --output-format {} {} {}",
            self.path.display(),
            credentials.pod,
            SCAN_OUTPUT_FORMAT,
            SCAN_SUBCOMMAND,
            resource_id
        );

        // kill_on_drop reaps the child when the timeout drops the future
        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| {
                tracing::error!(
                    "[scanner] qscanner timed out after {} seconds",
                    self.timeout.as_secs()
                );
                ScanError::ScanTimeout(self.timeout.as_secs())
            })?
            .map_err(|e| ScanError::ScanExecution(None, e.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            tracing::error!(
                "[scanner] qscanner failed with exit code {:?}",
                output.status.code()
            );
            tracing::error!("[scanner] stdout: {}", stdout);
            tracing::error!("[scanner] stderr: {}", stderr);
            return Err(ScanError::ScanExecution(output.status.code(), stderr));
        }

        tracing::info!("[scanner] qscanner completed successfully");

        Ok(ScanResult {
            success: true,
            exit_code: output.status.code().unwrap_or(0),
            results: parse_output(&stdout, &stderr),
            stdout,
            stderr,
        })
    }
}

/// Normalizes scanner stdout: JSON parses into a structured report, empty
/// stdout becomes an empty report, anything else is kept verbatim.
pub fn parse_output(stdout: &str, stderr: &str) -> ScanOutput {
    if stdout.trim().is_empty() {
        return ScanOutput::Structured(serde_json::json!({}));
    }
    match serde_json::from_str(stdout) {
        Ok(value) => ScanOutput::Structured(value),
        Err(_) => {
            tracing::warn!("[scanner] failed to parse qscanner output as JSON, storing raw output");
            ScanOutput::Raw {
                raw_output: stdout.to_string(),
                stderr: stderr.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use tempfile::TempDir;

    fn credentials() -> QualysCredentials {
        QualysCredentials {
            pod: "US2".to_string(),
            access_token: "tok".to_string(),
            registry_username: None,
            registry_password: None,
            registry_token: None,
        }
    }

    fn fake_scanner(dir: &TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("qscanner");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[test]
    fn test_parse_empty_stdout_is_empty_report() {
        assert_eq!(parse_output("", ""), ScanOutput::Structured(json!({})));
        assert_eq!(parse_output("  \n", ""), ScanOutput::Structured(json!({})));
    }

    #[test]
    fn test_parse_json_stdout_is_structured() {
        let parsed = parse_output(r#"{"vulnerabilities": {"high": 1}}"#, "");
        assert_eq!(
            parsed,
            ScanOutput::Structured(json!({"vulnerabilities": {"high": 1}}))
        );
    }

    #[test]
    fn test_parse_non_json_stdout_kept_verbatim() {
        let parsed = parse_output("scan report v2\nall clear", "warning: slow");
        assert_eq!(
            parsed,
            ScanOutput::Raw {
                raw_output: "scan report v2\nall clear".to_string(),
                stderr: "warning: slow".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_invoke_parses_json_stdout() {
        let dir = TempDir::new().unwrap();
        let path = fake_scanner(&dir, r#"echo '{"vulnerabilities": {"critical": 0}}'"#);
        let scanner = QScanner::new(path, Duration::from_secs(10));

        let result = scanner.invoke("arn:fn", &credentials(), "us-east-1").await.unwrap();
        assert!(result.success);
        assert_eq!(result.exit_code, 0);
        assert_eq!(
            result.results,
            ScanOutput::Structured(json!({"vulnerabilities": {"critical": 0}}))
        );
    }

    #[tokio::test]
    async fn test_invoke_non_json_stdout_is_still_success() {
        let dir = TempDir::new().unwrap();
        let path = fake_scanner(&dir, "echo not json at all");
        let scanner = QScanner::new(path, Duration::from_secs(10));

        let result = scanner.invoke("arn:fn", &credentials(), "us-east-1").await.unwrap();
        assert!(result.success);
        assert!(matches!(result.results, ScanOutput::Raw { .. }));
    }

    #[tokio::test]
    async fn test_invoke_nonzero_exit_captures_stderr() {
        let dir = TempDir::new().unwrap();
        let path = fake_scanner(&dir, "echo 'auth failure' >&2\nexit 3");
        let scanner = QScanner::new(path, Duration::from_secs(10));

        let err = scanner
            .invoke("arn:fn", &credentials(), "us-east-1")
            .await
            .unwrap_err();
        match err {
            ScanError::ScanExecution(code, stderr) => {
                assert_eq!(code, Some(3));
                assert!(stderr.contains("auth failure"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invoke_timeout_never_partial_success() {
        let dir = TempDir::new().unwrap();
        let path = fake_scanner(&dir, "sleep 5\necho '{}'");
        let scanner = QScanner::new(path, Duration::from_millis(100));

        let err = scanner
            .invoke("arn:fn", &credentials(), "us-east-1")
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::ScanTimeout(_)));
    }

    #[tokio::test]
    async fn test_invoke_missing_binary_is_execution_error() {
        let scanner = QScanner::new(
            Path::new("/nonexistent/qscanner"),
            Duration::from_secs(1),
        );
        let err = scanner
            .invoke("arn:fn", &credentials(), "us-east-1")
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::ScanExecution(None, _)));
    }

    #[tokio::test]
    async fn test_invoke_sets_region_and_registry_env() {
        let dir = TempDir::new().unwrap();
        let path = fake_scanner(
            &dir,
            r#"printf '{"region": "%s", "registry_user": "%s"}' "$AWS_REGION" "$QSCANNER_REGISTRY_USERNAME""#,
        );
        let scanner = QScanner::new(path, Duration::from_secs(10));
        let creds = QualysCredentials {
            pod: "US2".to_string(),
            access_token: "tok".to_string(),
            registry_username: Some("svc-user".to_string()),
            registry_password: None,
            registry_token: None,
        };

        let result = scanner.invoke("arn:fn", &creds, "eu-central-1").await.unwrap();
        assert_eq!(
            result.results,
            ScanOutput::Structured(json!({"region": "eu-central-1", "registry_user": "svc-user"}))
        );
    }
}
