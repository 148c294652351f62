//! External timestamping authority boundary.
//!
//! The authority is trusted as an oracle: it is invoked, never re-implemented.
//! The production implementation shells out to the OpenTimestamps client
//! (`ots stamp` / `ots verify`), bounded by a timeout so an unresponsive
//! authority can never stall a request.

use std::path::Path;
use std::process::Output;
use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tracing::debug;

use crate::infra::{LedgerError, Result};

/// Raw outcome of an authority invocation.
#[derive(Debug, Clone)]
pub struct AuthorityResponse {
    /// Whether the authority confirmed the proof
    pub attested: bool,
    /// Combined stdout/stderr of the authority
    pub output: String,
}

/// Boundary to the external timestamping authority.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TimestampAuthority: Send + Sync {
    /// Request a timestamp proof for the payload file. The authority writes
    /// the proof next to the payload (`<payload>.ots`).
    async fn stamp(&self, payload: &Path) -> Result<()>;

    /// Ask the authority to confirm a stored proof.
    async fn verify(&self, proof: &Path) -> Result<AuthorityResponse>;
}

/// OpenTimestamps CLI authority.
pub struct OtsAuthority {
    binary: String,
    timeout: Duration,
}

impl OtsAuthority {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    /// Read `OTS_BINARY` and `ANCHOR_TIMEOUT_SECS` from the environment.
    pub fn from_env() -> Self {
        let binary = std::env::var("OTS_BINARY").unwrap_or_else(|_| "ots".to_string());
        let timeout = std::env::var("ANCHOR_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);
        Self::new(binary, Duration::from_secs(timeout))
    }

    async fn run(&self, subcommand: &str, path: &Path) -> Result<Output> {
        let invocation = tokio::process::Command::new(&self.binary)
            .arg(subcommand)
            .arg(path)
            .output();

        match tokio::time::timeout(self.timeout, invocation).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(LedgerError::AnchorUnavailable(format!(
                "failed to invoke {} {}: {}",
                self.binary, subcommand, e
            ))),
            Err(_) => Err(LedgerError::AnchorUnavailable(format!(
                "{} {} timed out after {:?}",
                self.binary, subcommand, self.timeout
            ))),
        }
    }
}

fn combined_output(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(&stderr);
    }
    text
}

#[async_trait]
impl TimestampAuthority for OtsAuthority {
    async fn stamp(&self, payload: &Path) -> Result<()> {
        let output = self.run("stamp", payload).await?;
        debug!(payload = %payload.display(), status = ?output.status, "ots stamp finished");

        if !output.status.success() {
            return Err(LedgerError::AnchorUnavailable(format!(
                "ots stamp failed: {}",
                combined_output(&output)
            )));
        }
        Ok(())
    }

    async fn verify(&self, proof: &Path) -> Result<AuthorityResponse> {
        let output = self.run("verify", proof).await?;
        debug!(proof = %proof.display(), status = ?output.status, "ots verify finished");

        // A non-zero exit is the authority reporting an unconfirmed or bad
        // proof, not an invocation failure.
        Ok(AuthorityResponse {
            attested: output.status.success(),
            output: combined_output(&output),
        })
    }
}
