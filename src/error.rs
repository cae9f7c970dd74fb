// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {std::path::PathBuf, thiserror::Error};

/// Unified error type for App Store source validation.
#[derive(Debug, Error)]
pub enum AppStoreValidatorError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("error parsing plist: {0}")]
    PlistParse(plist::Error),

    #[error("error serializing plist: {0}")]
    PlistSerialize(plist::Error),

    #[error("{0} is not a valid application bundle")]
    BundleNotFound(PathBuf),

    #[error("bundle Info.plist does not define CFBundleIdentifier: {0}")]
    BundleNoIdentifier(PathBuf),

    #[error("bundle Info.plist does not define CFBundleExecutable: {0}")]
    BundleNoMainExecutable(PathBuf),

    #[error("App Store receipt not present at {0}")]
    MissingReceipt(PathBuf),

    #[error("unable to read file attributes of {0}")]
    UnreadableFileAttributes(PathBuf),

    #[error("failed to launch signature inspection tool: {0}")]
    InspectorLaunch(String),

    #[error("signature inspection tool exited {0}")]
    InspectorExitCode(i32),

    #[error("signature inspection timed out after {0} seconds")]
    InspectorTimeout(u64),

    #[error("{year:04}-{month:02}-{day:02} is not a valid calendar date")]
    InvalidCutoffDate { year: i32, month: u32, day: u32 },

    #[error("invalid App Store URL: {0}")]
    InvalidUrl(String),

    #[error("no App Store application ID configured")]
    EmptyAppId,
}
