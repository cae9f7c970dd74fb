// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Heuristics classifying how the application was installed.
//!
//! None of the heuristics is individually authoritative: receipt presence
//! is spoofable, the owner UID is an OS convention, and the signature
//! authority check shells out to an external tool and parses unstructured
//! text. Callers select one via [DetectionStrategy]; no attempt is made to
//! combine them into a score.

use {
    crate::{
        bundle::AppBundle,
        error::AppStoreValidatorError,
        inspect::SignatureInspector,
    },
    log::{debug, warn},
    std::{os::unix::fs::MetadataExt, path::Path},
};

/// Certificate authority naming Apple uses for App Store distribution signing.
pub const APP_STORE_SIGNING_AUTHORITY: &str = "Apple Mac OS Application Signing";

/// Owner account ID of the first local user account on macOS.
///
/// Binaries run out of Xcode or copied into place by the user are owned
/// by this account. App Store installs are performed by the system
/// installer and end up owned by root.
pub const DEVELOPER_ACCOUNT_UID: u32 = 501;

/// Classification of how the application reached this machine.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProvenanceVerdict {
    /// Distribution through the Mac App Store.
    AppStore,

    /// Some other channel: direct download, Xcode, TestFlight, etc.
    NotAppStore,

    /// The heuristic could not produce an answer.
    Indeterminate,
}

impl ProvenanceVerdict {
    /// Whether App Store provenance was affirmatively established.
    pub fn is_app_store(&self) -> bool {
        matches!(self, Self::AppStore)
    }
}

/// Which heuristic a check should run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DetectionStrategy {
    /// Receipt presence combined with the executable owner heuristic.
    ReceiptAndOwner,

    /// Parse the signing certificate chain reported by the inspection tool.
    ///
    /// The most reliable of the heuristics, since it looks at the actual
    /// certificate chain rather than file metadata.
    SignatureAuthority,
}

/// Whether the App Store purchase receipt exists at its conventional path.
///
/// Absence means the install definitely did not come through the App
/// Store. Presence is necessary but not sufficient: newer toolchains can
/// place receipts in development builds too.
pub fn receipt_present(bundle: &AppBundle) -> bool {
    let path = bundle.receipt_path();
    let present = path.is_file();

    debug!("receipt at {}: {}", path.display(), present);

    present
}

/// Owner account ID of the bundle's main executable.
fn executable_owner_uid(bundle: &AppBundle) -> Result<u32, AppStoreValidatorError> {
    let exe = bundle.main_executable_path()?;

    let metadata = std::fs::metadata(&exe)
        .map_err(|_| AppStoreValidatorError::UnreadableFileAttributes(exe.clone()))?;

    Ok(metadata.uid())
}

/// Receipt-and-owner heuristic.
///
/// Requires the receipt to exist and the main executable to not be owned
/// by the local developer account.
///
/// When the executable or its attributes cannot be read, this classifies
/// as App Store: it refuses to claim developer ownership it could not
/// observe. Use [owned_by_developer_account] for the strict polarity.
pub fn likely_from_app_store_by_receipt(bundle: &AppBundle) -> bool {
    if !receipt_present(bundle) {
        return false;
    }

    match executable_owner_uid(bundle) {
        Ok(uid) => uid != DEVELOPER_ACCOUNT_UID,
        Err(e) => {
            warn!("{}; classifying as App Store", e);
            true
        }
    }
}

/// Whether the main executable is owned by the local developer account.
///
/// A true result indicates a developer-run or sideloaded build.
/// Unreadable attributes classify as not developer owned.
pub fn owned_by_developer_account(bundle: &AppBundle) -> bool {
    match executable_owner_uid(bundle) {
        Ok(uid) => uid == DEVELOPER_ACCOUNT_UID,
        Err(e) => {
            warn!("{}", e);
            false
        }
    }
}

/// Classify provenance from the code signature authority chain.
///
/// Filters the inspector's output for lines prefixed `Authority`, takes
/// the text after the last `=` trimmed of whitespace, and matches it
/// against [APP_STORE_SIGNING_AUTHORITY] exactly. A clean run without a
/// match is [ProvenanceVerdict::NotAppStore]; a tool that cannot be
/// launched or does not finish yields [ProvenanceVerdict::Indeterminate].
pub fn signature_authority(
    inspector: &dyn SignatureInspector,
    bundle_path: &Path,
) -> ProvenanceVerdict {
    let lines = match inspector.signing_info(bundle_path) {
        Ok(lines) => lines,
        Err(AppStoreValidatorError::InspectorExitCode(code)) => {
            warn!("signature inspection exited {}", code);
            return ProvenanceVerdict::NotAppStore;
        }
        Err(e) => {
            warn!("signature inspection failed: {}", e);
            return ProvenanceVerdict::Indeterminate;
        }
    };

    for line in lines.iter().filter(|line| line.starts_with("Authority")) {
        if let Some(authority) = line.rsplit('=').next().map(|value| value.trim()) {
            if authority == APP_STORE_SIGNING_AUTHORITY {
                debug!("App Store signing authority present");
                return ProvenanceVerdict::AppStore;
            }
        }
    }

    ProvenanceVerdict::NotAppStore
}

/// Run the selected detection strategy against a bundle.
pub fn detect(
    strategy: DetectionStrategy,
    bundle: &AppBundle,
    inspector: &dyn SignatureInspector,
) -> ProvenanceVerdict {
    match strategy {
        DetectionStrategy::ReceiptAndOwner => {
            if likely_from_app_store_by_receipt(bundle) {
                ProvenanceVerdict::AppStore
            } else {
                ProvenanceVerdict::NotAppStore
            }
        }
        DetectionStrategy::SignatureAuthority => {
            signature_authority(inspector, bundle.root_dir())
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::testutil::{create_bundle, create_receipt},
        anyhow::Result,
    };

    struct StaticInspector(Vec<String>);

    impl SignatureInspector for StaticInspector {
        fn signing_info(&self, _: &Path) -> Result<Vec<String>, AppStoreValidatorError> {
            Ok(self.0.clone())
        }
    }

    struct ExitCodeInspector(i32);

    impl SignatureInspector for ExitCodeInspector {
        fn signing_info(&self, _: &Path) -> Result<Vec<String>, AppStoreValidatorError> {
            Err(AppStoreValidatorError::InspectorExitCode(self.0))
        }
    }

    struct LaunchFailureInspector;

    impl SignatureInspector for LaunchFailureInspector {
        fn signing_info(&self, _: &Path) -> Result<Vec<String>, AppStoreValidatorError> {
            Err(AppStoreValidatorError::InspectorLaunch(
                "no such file".to_string(),
            ))
        }
    }

    fn lines(values: &[&str]) -> Vec<String> {
        values.iter().map(|line| line.to_string()).collect()
    }

    #[test]
    fn test_receipt_present() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let bundle = create_bundle(temp.path(), "MyApp")?;

        assert!(!receipt_present(&bundle));

        create_receipt(&bundle)?;
        assert!(receipt_present(&bundle));

        Ok(())
    }

    #[test]
    fn test_receipt_and_owner() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let bundle = create_bundle(temp.path(), "MyApp")?;

        // No receipt is a definitive negative regardless of ownership.
        assert!(!likely_from_app_store_by_receipt(&bundle));

        create_receipt(&bundle)?;

        let uid = std::fs::metadata(bundle.main_executable_path()?)?.uid();
        assert_eq!(
            likely_from_app_store_by_receipt(&bundle),
            uid != DEVELOPER_ACCOUNT_UID
        );
        assert_eq!(owned_by_developer_account(&bundle), uid == DEVELOPER_ACCOUNT_UID);

        Ok(())
    }

    #[test]
    fn test_owner_polarity_on_unreadable_executable() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let bundle = create_bundle(temp.path(), "MyApp")?;

        create_receipt(&bundle)?;
        std::fs::remove_file(bundle.main_executable_path()?)?;

        // The receipt variant fails open; the owner variant does not claim
        // ownership it cannot observe.
        assert!(likely_from_app_store_by_receipt(&bundle));
        assert!(!owned_by_developer_account(&bundle));

        Ok(())
    }

    #[test]
    fn test_signature_authority_match() {
        let inspector = StaticInspector(lines(&[
            "Executable=/Applications/MyApp.app/Contents/MacOS/MyApp",
            "Identifier=com.example.MyApp",
            "Authority=Apple Mac OS Application Signing",
            "Authority=Apple Worldwide Developer Relations Certification Authority",
            "Authority=Apple Root CA",
        ]));

        assert_eq!(
            signature_authority(&inspector, Path::new("/Applications/MyApp.app")),
            ProvenanceVerdict::AppStore
        );
    }

    #[test]
    fn test_signature_authority_trims_whitespace() {
        let inspector = StaticInspector(lines(&[
            "Authority=  Apple Mac OS Application Signing  ",
        ]));

        assert_eq!(
            signature_authority(&inspector, Path::new("/tmp/x.app")),
            ProvenanceVerdict::AppStore
        );
    }

    #[test]
    fn test_signature_authority_developer_id() {
        let inspector = StaticInspector(lines(&[
            "Authority=Developer ID Application: Example Corp (ABCDE12345)",
            "Authority=Developer ID Certification Authority",
            "Authority=Apple Root CA",
        ]));

        assert_eq!(
            signature_authority(&inspector, Path::new("/tmp/x.app")),
            ProvenanceVerdict::NotAppStore
        );
    }

    #[test]
    fn test_signature_authority_ignores_unprefixed_lines() {
        // The magic string appearing outside an Authority line must not count.
        let inspector = StaticInspector(lines(&[
            "TeamIdentifier=Apple Mac OS Application Signing",
            "Info=Authority=Apple Mac OS Application Signing",
        ]));

        assert_eq!(
            signature_authority(&inspector, Path::new("/tmp/x.app")),
            ProvenanceVerdict::NotAppStore
        );
    }

    #[test]
    fn test_signature_authority_failures() {
        assert_eq!(
            signature_authority(&ExitCodeInspector(1), Path::new("/tmp/x.app")),
            ProvenanceVerdict::NotAppStore
        );
        assert_eq!(
            signature_authority(&LaunchFailureInspector, Path::new("/tmp/x.app")),
            ProvenanceVerdict::Indeterminate
        );
    }

    #[test]
    fn test_detect_dispatch() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let bundle = create_bundle(temp.path(), "MyApp")?;

        let inspector = StaticInspector(lines(&["Authority=Apple Mac OS Application Signing"]));

        // No receipt, so the receipt strategy is negative even though the
        // signature strategy is positive.
        assert_eq!(
            detect(DetectionStrategy::ReceiptAndOwner, &bundle, &inspector),
            ProvenanceVerdict::NotAppStore
        );
        assert_eq!(
            detect(DetectionStrategy::SignatureAuthority, &bundle, &inspector),
            ProvenanceVerdict::AppStore
        );

        Ok(())
    }
}
