//! Remote install-script fetching.
//!
//! Downloads installer scripts over HTTPS, optionally verifies them
//! against a declared SHA-256 digest, and runs them through an
//! interpreter. Verification happens before the script is written
//! anywhere executable.

use crate::error::{Result, RigupError};
use crate::shell::{execute, CommandOptions, CommandResult};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;
use tracing::{debug, info};

/// Fetches and runs installer scripts.
pub struct ScriptFetcher {
    client: reqwest::blocking::Client,
}

impl ScriptFetcher {
    /// Create a fetcher with the specified request timeout.
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::blocking::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    /// Download a script body.
    pub fn fetch(&self, url: &str) -> Result<String> {
        debug!("fetching {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| RigupError::FetchFailed {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(RigupError::FetchFailed {
                url: url.to_string(),
                message: format!("HTTP {}", response.status()),
            });
        }

        response.text().map_err(|e| RigupError::FetchFailed {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// Download, verify, and run a script with the given interpreter.
    ///
    /// The script runs from a freshly created temp file with a random
    /// name. A fixed path under the shared temp directory could be
    /// pre-seeded with a symlink and redirect the write, which is fatal
    /// for a script that may run elevated. The file is removed when the
    /// handle drops, whether or not the interpreter succeeded.
    pub fn fetch_and_run(
        &self,
        url: &str,
        sha256: Option<&str>,
        interpreter: Option<&str>,
        env: &HashMap<String, String>,
        elevated: bool,
    ) -> Result<CommandResult> {
        let body = self.fetch(url)?;

        if let Some(expected) = sha256 {
            verify_sha256(url, body.as_bytes(), expected)?;
        }

        let mut script = tempfile::Builder::new()
            .prefix("rigup-script-")
            .suffix(".sh")
            .tempfile()?;
        script.write_all(body.as_bytes())?;
        script.flush()?;

        let interpreter = interpreter.unwrap_or("sh");
        let command = format!("{} '{}'", interpreter, script.path().display());
        info!("running fetched script from {}", url);

        execute(
            &command,
            &CommandOptions {
                env: env.clone(),
                capture_stdout: true,
                capture_stderr: true,
                elevated,
                ..Default::default()
            },
        )
    }
}

impl Default for ScriptFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

/// Compare a body against its expected SHA-256 digest (hex).
pub fn verify_sha256(url: &str, body: &[u8], expected: &str) -> Result<()> {
    let mut hasher = Sha256::new();
    hasher.update(body);
    let actual = hex::encode(hasher.finalize());

    if !actual.eq_ignore_ascii_case(expected) {
        return Err(RigupError::ChecksumMismatch {
            url: url.to_string(),
            expected: expected.to_string(),
            actual,
        });
    }

    Ok(())
}
