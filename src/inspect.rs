// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Code signature inspection via the system `codesign` tool.

use {
    crate::error::AppStoreValidatorError,
    duct::cmd,
    log::{debug, warn},
    once_cell::sync::Lazy,
    std::{
        path::{Path, PathBuf},
        time::{Duration, Instant},
    },
};

/// Path to the system code signature inspection tool.
pub static CODESIGN_PATH: Lazy<PathBuf> = Lazy::new(|| PathBuf::from("/usr/bin/codesign"));

/// Default bound on how long a single inspection may run.
pub const DEFAULT_INSPECTION_TIMEOUT: Duration = Duration::from_secs(10);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Capability to obtain code signing information for a bundle.
///
/// Production implementations shell out to `codesign`. Tests substitute
/// canned output so no subprocess is spawned.
pub trait SignatureInspector {
    /// Obtain raw signing information lines for the bundle at a path.
    ///
    /// Returns the combined stdout/stderr lines of a successful
    /// inspection. Errors if the tool cannot be launched, exits non-zero,
    /// or exceeds its time bound.
    fn signing_info(&self, bundle_path: &Path) -> Result<Vec<String>, AppStoreValidatorError>;
}

/// [SignatureInspector] backed by `codesign -dv --verbose=4`.
///
/// `codesign` emits signing information on stderr; stdout and stderr are
/// captured as one stream. The subprocess gets a bounded wait and is
/// killed if it does not finish in time, so a misbehaving tool cannot
/// hang the calling thread indefinitely.
#[derive(Clone, Debug)]
pub struct CodesignInspector {
    tool_path: PathBuf,
    timeout: Duration,
}

impl Default for CodesignInspector {
    fn default() -> Self {
        Self {
            tool_path: CODESIGN_PATH.clone(),
            timeout: DEFAULT_INSPECTION_TIMEOUT,
        }
    }
}

impl CodesignInspector {
    /// Construct an instance using an alternative tool path.
    pub fn new(tool_path: impl AsRef<Path>) -> Self {
        Self {
            tool_path: tool_path.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    /// Change the bound on subprocess run time.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl SignatureInspector for CodesignInspector {
    fn signing_info(&self, bundle_path: &Path) -> Result<Vec<String>, AppStoreValidatorError> {
        debug!(
            "invoking {} -dv --verbose=4 {}",
            self.tool_path.display(),
            bundle_path.display()
        );

        let handle = cmd(
            &self.tool_path,
            vec![
                "-dv".to_string(),
                "--verbose=4".to_string(),
                bundle_path.display().to_string(),
            ],
        )
        .stderr_to_stdout()
        .stdout_capture()
        .unchecked()
        .start()
        .map_err(|e| AppStoreValidatorError::InspectorLaunch(e.to_string()))?;

        let deadline = Instant::now() + self.timeout;

        let output = loop {
            if let Some(output) = handle
                .try_wait()
                .map_err(|e| AppStoreValidatorError::InspectorLaunch(e.to_string()))?
            {
                break output.clone();
            }

            if Instant::now() >= deadline {
                warn!(
                    "{} did not finish within {:?}; killing",
                    self.tool_path.display(),
                    self.timeout
                );
                let _ = handle.kill();

                return Err(AppStoreValidatorError::InspectorTimeout(
                    self.timeout.as_secs(),
                ));
            }

            std::thread::sleep(POLL_INTERVAL);
        };

        let text = String::from_utf8_lossy(&output.stdout);

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            warn!("signature inspection exited {}: {}", code, text.trim());

            return Err(AppStoreValidatorError::InspectorExitCode(code));
        }

        Ok(text.lines().map(|line| line.to_string()).collect())
    }
}
